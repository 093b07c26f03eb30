use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Float precision injected into shaders that do not declare one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Lowp,
    Mediump,
    #[default]
    Highp,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PreviewConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    /// File extensions accepted as shader documents, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub transpile: TranspileSection,
    #[serde(default)]
    pub playback: PlaybackSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranspileSection {
    pub version_directive: String,
    pub default_precision: Precision,
    pub output_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaybackSection {
    #[serde(
        default = "default_fps_window",
        deserialize_with = "deserialize_duration"
    )]
    pub fps_window: Duration,
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,
}

fn default_version() -> u32 {
    1
}

fn default_extensions() -> Vec<String> {
    vec!["frag".to_string()]
}

fn default_fps_window() -> Duration {
    Duration::from_secs(1)
}

fn default_autoplay() -> bool {
    true
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            extensions: default_extensions(),
            transpile: TranspileSection::default(),
            playback: PlaybackSection::default(),
        }
    }
}

impl Default for TranspileSection {
    fn default() -> Self {
        Self {
            version_directive: "#version 100".to_string(),
            default_precision: Precision::default(),
            output_identifier: "gl_FragColor".to_string(),
        }
    }
}

impl Default for PlaybackSection {
    fn default() -> Self {
        Self {
            fps_window: default_fps_window(),
            autoplay: default_autoplay(),
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Duration::try_from_secs_f64(v)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl PreviewConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: PreviewConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "config must accept at least one shader extension".into(),
            ));
        }

        if self
            .extensions
            .iter()
            .any(|ext| ext.trim_start_matches('.').trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "shader extensions may not be empty".into(),
            ));
        }

        if !self.transpile.version_directive.trim_start().starts_with("#version") {
            return Err(ConfigError::Invalid(format!(
                "transpile.version_directive '{}' must start with '#version'",
                self.transpile.version_directive
            )));
        }

        if self.transpile.output_identifier.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "transpile.output_identifier may not be empty".into(),
            ));
        }

        if self.playback.fps_window.is_zero() {
            return Err(ConfigError::Invalid(
                "playback.fps_window must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
version = 1
extensions = ["frag", "glsl"]

[transpile]
version_directive = "#version 100"
default_precision = "mediump"
output_identifier = "gl_FragColor"

[playback]
fps_window = "500ms"
autoplay = false
"##;

    #[test]
    fn parses_sample_config() {
        let config = PreviewConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.extensions, vec!["frag", "glsl"]);
        assert_eq!(config.transpile.default_precision, Precision::Mediump);
        assert_eq!(config.playback.fps_window, Duration::from_millis(500));
        assert!(!config.playback.autoplay);
    }

    #[test]
    fn empty_input_uses_defaults() {
        let config = PreviewConfig::from_toml_str("").unwrap();
        assert_eq!(config, PreviewConfig::default());
        assert_eq!(config.extensions, vec!["frag"]);
    }

    #[test]
    fn partial_sections_fill_in_defaults() {
        let config = PreviewConfig::from_toml_str(
            r#"
[transpile]
default_precision = "lowp"

[playback]
fps_window = 2
"#,
        )
        .unwrap();
        assert_eq!(config.transpile.version_directive, "#version 100");
        assert_eq!(config.transpile.default_precision, Precision::Lowp);
        assert_eq!(config.playback.fps_window, Duration::from_secs(2));
        assert!(config.playback.autoplay);
    }

    #[test]
    fn rejects_unknown_version() {
        let err = PreviewConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_fps_window() {
        let err = PreviewConfig::from_toml_str("[playback]\nfps_window = \"0s\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn fractional_seconds_parse() {
        let config = PreviewConfig::from_toml_str("[playback]\nfps_window = 0.25").unwrap();
        assert_eq!(config.playback.fps_window, Duration::from_millis(250));
    }

    #[test]
    fn rejects_out_of_range_fps_window() {
        let err = PreviewConfig::from_toml_str("[playback]\nfps_window = 1e30").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = PreviewConfig::from_toml_str("[playback]\nfps_window = inf").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_empty_extension_list() {
        let err = PreviewConfig::from_toml_str("extensions = []").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_unknown_precision() {
        let err = PreviewConfig::from_toml_str("[transpile]\ndefault_precision = \"ultra\"")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
