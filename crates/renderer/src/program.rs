use crate::backend::{Backend, StageKind};
use crate::compile::{BUILTIN_UNIFORMS, FULLSCREEN_QUAD};
use crate::error::BuildError;

/// Resolution state of one uniform in a linked program.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformSlot<L> {
    Resolved(L),
    /// The program has no active uniform of this name; it is never bound.
    Absent,
}

/// Linked program plus the uniform locations resolved against it.
pub struct CompiledProgram<B: Backend> {
    handle: B::Program,
    uniforms: Vec<(String, UniformSlot<B::Location>)>,
}

impl<B: Backend> CompiledProgram<B> {
    pub fn handle(&self) -> &B::Program {
        &self.handle
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, &UniformSlot<B::Location>)> + '_ {
        self.uniforms
            .iter()
            .map(|(name, slot)| (name.as_str(), slot))
    }

    pub fn slot(&self, name: &str) -> Option<&UniformSlot<B::Location>> {
        self.uniforms
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, slot)| slot)
    }

    pub fn resolved_names(&self) -> Vec<&str> {
        self.uniforms()
            .filter(|(_, slot)| matches!(slot, UniformSlot::Resolved(_)))
            .map(|(name, _)| name)
            .collect()
    }

    /// Hands the program back to the backend.
    pub fn release(self, backend: &mut B) {
        backend.release_program(self.handle);
    }
}

/// Compiles both stages, links them and resolves the uniform table.
///
/// Lookups cover the built-in uniforms followed by `parameter_names`. Stage
/// objects are released once linking finishes either way, and nothing is left
/// allocated on the backend when an error is returned.
pub fn build_program<B: Backend>(
    backend: &mut B,
    vertex_source: &str,
    fragment_source: &str,
    parameter_names: &[&str],
) -> Result<CompiledProgram<B>, BuildError> {
    let vertex = backend
        .compile_stage(StageKind::Vertex, vertex_source)
        .map_err(|log| BuildError::ShaderCompile {
            stage: StageKind::Vertex,
            log,
        })?;

    let fragment = match backend.compile_stage(StageKind::Fragment, fragment_source) {
        Ok(stage) => stage,
        Err(log) => {
            backend.release_stage(vertex);
            return Err(BuildError::ShaderCompile {
                stage: StageKind::Fragment,
                log,
            });
        }
    };

    let linked = backend.link_program(&vertex, &fragment);
    backend.release_stage(vertex);
    backend.release_stage(fragment);
    let handle = linked.map_err(|log| BuildError::ProgramLink { log })?;

    let names = BUILTIN_UNIFORMS
        .iter()
        .map(|(_, name)| *name)
        .chain(parameter_names.iter().copied());
    let mut uniforms: Vec<(String, UniformSlot<B::Location>)> = Vec::new();
    for name in names {
        if uniforms.iter().any(|(seen, _)| seen == name) {
            continue;
        }
        let slot = match backend.uniform_location(&handle, name) {
            Some(location) => UniformSlot::Resolved(location),
            None => {
                tracing::debug!(uniform = name, "uniform not active in program");
                UniformSlot::Absent
            }
        };
        uniforms.push((name.to_string(), slot));
    }

    backend.bind_quad(&handle, &FULLSCREEN_QUAD);

    Ok(CompiledProgram { handle, uniforms })
}
