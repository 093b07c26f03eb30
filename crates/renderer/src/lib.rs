//! Renderer crate for Synthview, the live GLSL previewer.
//!
//! A shader document goes through the following stages on every update:
//!
//! ```text
//!   ShaderDocument
//!        │ shaderdoc::extract
//!        ▼
//!   metadata + body ──▶ transpile_fragment ──▶ build_program ──▶ CompiledProgram
//!                                                                     │
//!   host scheduler ── tick(now) ──▶ RenderLoop ── bind ParameterStore ┘──▶ draw quad
//! ```
//!
//! [`RenderLoop`] owns the backend, the compiled program, the parameter
//! values and the playback clock for one preview. It talks to the GPU only
//! through the [`Backend`] trait: [`GlowBackend`] drives a real GL ES 2 /
//! WebGL context and [`HeadlessBackend`] is an in-memory stand-in used for
//! dry runs and tests.

mod backend;
mod compile;
mod error;
#[cfg(feature = "glow")]
mod glow_backend;
mod headless;
mod params;
mod program;
mod render_loop;
mod timeline;
mod types;

pub use backend::{Backend, StageKind, UniformValue};
pub use compile::{
    remap_diagnostic, transpile_fragment, transpile_fragment_with, uniform_block, LineMap,
    Precision, SourceLine, TranspileOptions, TranspiledShader, BUILTIN_UNIFORMS, FULLSCREEN_QUAD,
    VERTEX_SHADER,
};
pub use error::{BuildError, LoopError};
#[cfg(feature = "glow")]
pub use glow_backend::GlowBackend;
pub use headless::HeadlessBackend;
pub use params::{ParamValue, ParameterStore, ALPHA, COLOR, RESOLUTION, TIME};
pub use program::{build_program, CompiledProgram, UniformSlot};
pub use render_loop::{LoopState, RenderLoop};
pub use types::{FrameResult, LoopOptions, Viewport};
