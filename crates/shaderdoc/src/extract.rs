//! Splits a shader document into its metadata block and executable body.
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::metadata::{parse_metadata, Metadata};
use crate::ShaderDocument;

fn metadata_comment() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)/\*\s*(\{.*?\})\s*\*/").expect("metadata comment regex is valid")
    })
}

fn block_comment() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment regex is valid"))
}

/// Result of running the extractor over a document.
#[derive(Debug, Clone)]
pub struct ExtractedShader {
    pub metadata: Metadata,
    pub body: String,
    /// Document line (1-based) for every body line.
    body_lines: Vec<usize>,
}

impl ExtractedShader {
    /// Maps a 1-based body line back to the 1-based document line it came from.
    pub fn document_line(&self, body_line: usize) -> Option<usize> {
        body_line
            .checked_sub(1)
            .and_then(|index| self.body_lines.get(index))
            .copied()
    }
}

/// Pulls the metadata block out of `document` and returns the trimmed body.
///
/// Metadata comes from the first block comment whose interior starts with `{`.
/// The body is the document with the first block comment removed, whether or
/// not that comment held valid JSON. A malformed block is logged and replaced
/// by `Metadata::default()`.
pub fn extract(document: &ShaderDocument) -> ExtractedShader {
    let text = document.text();

    let metadata = match metadata_comment().captures(text).and_then(|caps| caps.get(1)) {
        Some(json) => match parse_metadata(json.as_str()) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(
                    document = document.name(),
                    error = %err,
                    "ignoring malformed shader metadata"
                );
                Metadata::default()
            }
        },
        None => {
            tracing::debug!(document = document.name(), "no metadata block found");
            Metadata::default()
        }
    };

    let removed = block_comment().find(text).map(|found| found.range());
    let stripped = match &removed {
        Some(range) => {
            let mut joined = String::with_capacity(text.len() - range.len());
            joined.push_str(&text[..range.start]);
            joined.push_str(&text[range.end..]);
            joined
        }
        None => text.to_string(),
    };

    let body = stripped.trim();
    let leading = stripped.len() - stripped.trim_start().len();
    let body_lines = map_body_lines(text, body, leading, removed);

    ExtractedShader {
        metadata,
        body: body.to_string(),
        body_lines,
    }
}

fn map_body_lines(
    text: &str,
    body: &str,
    leading: usize,
    removed: Option<Range<usize>>,
) -> Vec<usize> {
    let newlines: Vec<usize> = text
        .bytes()
        .enumerate()
        .filter_map(|(index, byte)| (byte == b'\n').then_some(index))
        .collect();

    let line_starts = std::iter::once(0).chain(
        body.bytes()
            .enumerate()
            .filter_map(|(index, byte)| (byte == b'\n').then_some(index + 1)),
    );

    line_starts
        .map(|start| {
            let mut offset = leading + start;
            if let Some(range) = &removed {
                if offset >= range.start {
                    offset += range.len();
                }
            }
            newlines.partition_point(|&newline| newline < offset) + 1
        })
        .collect()
}
