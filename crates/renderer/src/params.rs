use shaderdoc::ParameterSpec;

use crate::backend::UniformValue;

pub const TIME: &str = "time";
pub const RESOLUTION: &str = "resolution";
pub const COLOR: &str = "color";
pub const ALPHA: &str = "alpha";

/// Current value of one named uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Vec2([f32; 2]),
    Rgb([f32; 3]),
}

impl ParamValue {
    /// Value written to the GPU. Colours are bound fully opaque; `alpha` is a
    /// separate uniform.
    pub fn to_uniform(self) -> UniformValue {
        match self {
            ParamValue::Float(value) => UniformValue::Float(value),
            ParamValue::Vec2(value) => UniformValue::Vec2(value),
            ParamValue::Rgb([r, g, b]) => UniformValue::Vec4([r, g, b, 1.0]),
        }
    }

    fn same_kind(&self, other: &ParamValue) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Named uniform values for one preview.
///
/// Entries keep insertion order: the built-ins first, then each parameter in
/// the order the metadata declares it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    entries: Vec<(String, ParamValue)>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl ParameterStore {
    pub fn new(params: &[ParameterSpec]) -> Self {
        let mut entries = vec![
            (TIME.to_string(), ParamValue::Float(0.0)),
            (RESOLUTION.to_string(), ParamValue::Vec2([0.0, 0.0])),
            (COLOR.to_string(), ParamValue::Rgb([1.0, 1.0, 1.0])),
            (ALPHA.to_string(), ParamValue::Float(1.0)),
        ];
        for param in params {
            if entries.iter().any(|(name, _)| *name == param.name) {
                continue;
            }
            entries.push((param.name.clone(), ParamValue::Float(param.initial_value())));
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, value)| *value)
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            ParamValue::Float(value) => Some(value),
            _ => None,
        }
    }

    /// Writes `value` under a known name.
    ///
    /// Returns false, leaving the store untouched, for unknown names and for a
    /// value of the wrong kind.
    pub fn set(&mut self, name: &str, value: ParamValue) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|(candidate, current)| candidate == name && current.same_kind(&value))
        {
            Some((_, current)) => {
                *current = value;
                true
            }
            None => false,
        }
    }

    /// Lazy `(name, value)` sequence; clone it to walk the values again.
    pub fn values(&self) -> impl Iterator<Item = (&str, ParamValue)> + Clone + '_ {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    pub fn time(&self) -> f32 {
        self.get_float(TIME).unwrap_or(0.0)
    }

    pub(crate) fn set_time(&mut self, seconds: f32) {
        self.set(TIME, ParamValue::Float(seconds));
    }

    pub(crate) fn set_resolution(&mut self, width: u32, height: u32) {
        self.set(RESOLUTION, ParamValue::Vec2([width as f32, height as f32]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ParameterStore {
        ParameterStore::new(&[
            ParameterSpec::new("speed", 0.0, 5.0, Some(1.5)),
            ParameterSpec::new("zoom", 0.0, 1.0, None),
        ])
    }

    #[test]
    fn initial_values_follow_defaults() {
        let store = store();
        assert_eq!(store.get(TIME), Some(ParamValue::Float(0.0)));
        assert_eq!(store.get(COLOR), Some(ParamValue::Rgb([1.0, 1.0, 1.0])));
        assert_eq!(store.get_float(ALPHA), Some(1.0));
        assert_eq!(store.get_float("speed"), Some(1.5));
        assert_eq!(store.get_float("zoom"), Some(0.0));
    }

    #[test]
    fn set_then_get_returns_the_new_value() {
        let mut store = store();
        assert!(store.set("speed", ParamValue::Float(3.0)));
        assert_eq!(store.get_float("speed"), Some(3.0));
        assert!(store.set(COLOR, ParamValue::Rgb([0.2, 0.4, 0.6])));
        assert_eq!(store.get(COLOR), Some(ParamValue::Rgb([0.2, 0.4, 0.6])));
    }

    #[test]
    fn unknown_names_are_ignored() {
        let mut store = store();
        let before = store.clone();
        assert!(!store.set("nope", ParamValue::Float(9.0)));
        assert_eq!(store, before);
        assert_eq!(store.get("nope"), None);
    }

    #[test]
    fn built_ins_accept_values_of_their_kind() {
        let mut store = store();
        assert!(store.set(TIME, ParamValue::Float(5.0)));
        assert_eq!(store.get(TIME), Some(ParamValue::Float(5.0)));
        assert!(store.set(RESOLUTION, ParamValue::Vec2([3.0, 4.0])));
        assert_eq!(store.get(RESOLUTION), Some(ParamValue::Vec2([3.0, 4.0])));

        store.set_time(2.5);
        assert_eq!(store.time(), 2.5);
    }

    #[test]
    fn kind_mismatches_are_refused() {
        let mut store = store();
        let before = store.clone();
        assert!(!store.set(TIME, ParamValue::Vec2([1.0, 1.0])));
        assert!(!store.set(RESOLUTION, ParamValue::Float(1.0)));
        assert!(!store.set(COLOR, ParamValue::Float(0.5)));
        assert!(!store.set("speed", ParamValue::Rgb([0.0, 0.0, 0.0])));
        assert_eq!(store, before);
    }

    #[test]
    fn values_iterate_in_declaration_order_and_restart() {
        let store = store();
        let values = store.values();
        let names: Vec<_> = values.clone().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["time", "resolution", "color", "alpha", "speed", "zoom"]);
        assert_eq!(values.count(), 6);
    }

    #[test]
    fn duplicate_parameters_keep_the_first() {
        let store = ParameterStore::new(&[
            ParameterSpec::new("gain", 0.0, 1.0, Some(0.25)),
            ParameterSpec::new("gain", 0.0, 1.0, Some(0.75)),
        ]);
        assert_eq!(store.get_float("gain"), Some(0.25));
        assert_eq!(store.values().count(), 5);
    }

    #[test]
    fn colour_binds_opaque() {
        assert_eq!(
            ParamValue::Rgb([0.1, 0.2, 0.3]).to_uniform(),
            UniformValue::Vec4([0.1, 0.2, 0.3, 1.0])
        );
    }
}
