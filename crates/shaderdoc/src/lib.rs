mod extract;
mod metadata;

pub use extract::{extract, ExtractedShader};
pub use metadata::{
    is_valid_identifier, parse_metadata, Metadata, MetadataParseError, ParameterSpec,
    RESERVED_NAMES,
};

use std::fs;
use std::path::Path;

/// Raw shader text as read from the editor or disk.
///
/// Documents are never edited in place; an update replaces the whole value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDocument {
    name: String,
    text: String,
}

impl ShaderDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, text })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Returns true when `path` carries one of the accepted shader extensions.
pub fn has_shader_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|candidate| candidate.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
