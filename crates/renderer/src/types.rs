use std::time::Duration;

use crate::compile::TranspileOptions;

/// Drawable size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Knobs for one render loop, usually filled from the preview config.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOptions {
    pub transpile: TranspileOptions,
    /// Length of the window FPS figures are averaged over.
    pub fps_window: Duration,
    /// Start playing as soon as a build succeeds; otherwise start paused.
    pub autoplay: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            transpile: TranspileOptions::default(),
            fps_window: Duration::from_secs(1),
            autoplay: true,
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    /// Playback time bound to `time`, in seconds.
    pub time: f32,
    /// Set when the viewport changed before this frame was drawn.
    pub resized: Option<Viewport>,
    /// Present when the FPS window closed on this tick.
    pub fps: Option<u32>,
    /// Uniforms written this frame.
    pub bound_uniforms: usize,
}
