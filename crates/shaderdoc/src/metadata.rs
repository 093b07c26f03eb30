//! Defines the metadata schema embedded at the top of Visual Synth shader
//! documents, giving the renderer a predictable list of tunable parameters and
//! the host a display name for the author.
//!
//! Types:
//!
//! - `Metadata` captures the author and the ordered parameter list. Every field
//!   carries a serde default so sparse blocks parse.
//! - `ParameterSpec` stores a parameter name, its slider range and the value
//!   it starts from.
//! - `MetadataParseError` wraps the JSON failure; callers log it and fall back
//!   to `Metadata::default()`.
//!
//! Functions:
//!
//! - `Metadata::validate` returns human-readable issues so hosts can warn about
//!   parameters that would never reach the shader, without failing the preview.
//! - `Metadata::bindable_parameters` filters the list down to parameters that
//!   can safely be declared as uniforms.
use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifiers the previewer declares itself. Parameters may not reuse them.
pub const RESERVED_NAMES: [&str; 5] = ["time", "resolution", "color", "alpha", "texCoord"];

#[derive(Debug, Error)]
#[error("failed to parse shader metadata: {0}")]
pub struct MetadataParseError(#[from] serde_json::Error);

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Metadata {
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

fn default_author() -> String {
    "Unknown".to_string()
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            author: default_author(),
            parameters: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default)]
    pub min: f32,
    #[serde(default = "default_max")]
    pub max: f32,
    #[serde(default, rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<f32>,
}

fn default_max() -> f32 {
    1.0
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, min: f32, max: f32, default_value: Option<f32>) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            default_value,
        }
    }

    /// Value the parameter holds before the user touches it.
    pub fn initial_value(&self) -> f32 {
        self.default_value.unwrap_or(0.0)
    }

    /// Slider increment: one hundredth of the range.
    ///
    /// Returns `None` when `max <= min` (or either bound is not finite); hosts
    /// render such parameters without a stepped slider.
    pub fn slider_step(&self) -> Option<f32> {
        let span = self.max - self.min;
        if span.is_finite() && span > 0.0 {
            Some(span / 100.0)
        } else {
            None
        }
    }

    fn is_bindable(&self) -> bool {
        is_valid_identifier(&self.name) && !RESERVED_NAMES.contains(&self.name.as_str())
    }
}

/// Checks that `name` can be used as a GLSL uniform identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    let ident = IDENT.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid")
    });
    ident.is_match(name) && !name.starts_with("gl_") && !name.contains("__")
}

/// Parses the JSON text of a metadata block.
pub fn parse_metadata(json: &str) -> Result<Metadata, MetadataParseError> {
    Ok(serde_json::from_str(json)?)
}

impl Metadata {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        for param in &self.parameters {
            if !is_valid_identifier(&param.name) {
                issues.push(format!(
                    "parameter '{}' is not a valid uniform identifier",
                    param.name
                ));
            } else if RESERVED_NAMES.contains(&param.name.as_str()) {
                issues.push(format!(
                    "parameter '{}' shadows a built-in uniform",
                    param.name
                ));
            }
            if !seen.insert(param.name.as_str()) {
                issues.push(format!("parameter '{}' is declared more than once", param.name));
            }
            if param.slider_step().is_none() {
                issues.push(format!(
                    "parameter '{}' has an empty range ({}..{})",
                    param.name, param.min, param.max
                ));
            }
        }
        issues
    }

    /// Parameters that can be declared as uniforms, first occurrence wins.
    pub fn bindable_parameters(&self) -> Vec<ParameterSpec> {
        let mut seen = HashSet::new();
        self.parameters
            .iter()
            .filter(|param| param.is_bindable() && seen.insert(param.name.as_str()))
            .cloned()
            .collect()
    }
}
