//! JSON messages exchanged with the host UI.
//!
//! Inbound, the panel sends `{"control": <name>, "value": <v>}` when a slider
//! or the colour picker moves and `{"action": "play" | "pause" | "reset"}`
//! for the playback buttons. Outbound, each session reports `{"fps": n}` once
//! per FPS window and `{"error": "..."}` when a build fails.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InputEvent {
    Control { control: String, value: ControlValue },
    Action { action: PlaybackAction },
}

impl InputEvent {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackAction {
    Play,
    Pause,
    Reset,
}

/// Payload of a control change: a slider value or an RGB colour.
///
/// Colours arrive either as a `#rrggbb` string or as an `[r, g, b]` array of
/// channel values in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawControlValue")]
pub enum ControlValue {
    Number(f32),
    Color([f32; 3]),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawControlValue {
    Number(f32),
    Hex(String),
    Rgb([f32; 3]),
}

impl TryFrom<RawControlValue> for ControlValue {
    type Error = String;

    fn try_from(raw: RawControlValue) -> Result<Self, Self::Error> {
        match raw {
            RawControlValue::Number(value) => Ok(ControlValue::Number(value)),
            RawControlValue::Rgb(rgb) => Ok(ControlValue::Color(rgb)),
            RawControlValue::Hex(hex) => parse_hex_color(&hex)
                .map(ControlValue::Color)
                .ok_or_else(|| format!("invalid colour '{hex}'; expected #rrggbb")),
        }
    }
}

/// Parses `#rrggbb` into channel values in `0..=1`.
pub fn parse_hex_color(raw: &str) -> Option<[f32; 3]> {
    let digits = raw.trim().strip_prefix('#')?;
    if digits.len() != 6 || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .ok()
            .map(|value| f32::from(value) / 255.0)
    };
    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Notification {
    Fps { fps: u32 },
    Error { error: String },
}
