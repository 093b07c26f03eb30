use thiserror::Error;

use crate::backend::StageKind;
use crate::render_loop::LoopState;

/// Fatal outcome of building a preview program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("{stage} shader compilation failed:\n{log}")]
    ShaderCompile { stage: StageKind, log: String },
    #[error("program linking failed:\n{log}")]
    ProgramLink { log: String },
    #[error("no rendering context available: {0}")]
    BackendUnavailable(String),
}

impl BuildError {
    /// Driver log carried by the error, if any.
    pub fn log(&self) -> Option<&str> {
        match self {
            BuildError::ShaderCompile { log, .. } | BuildError::ProgramLink { log } => Some(log),
            BuildError::BackendUnavailable(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoopError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: LoopState,
    },
    #[error("no program has been built")]
    NotBuilt,
    #[error(transparent)]
    Build(#[from] BuildError),
}
