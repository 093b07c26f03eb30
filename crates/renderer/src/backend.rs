use std::fmt;

/// Pipeline stage a shader object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Value written to a uniform location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
}

/// Narrow interface onto the GPU driver that the previewer renders through.
///
/// Implementations own the driver objects behind the handles they return.
/// A failing [`Backend::compile_stage`] or [`Backend::link_program`] must
/// already have released whatever object it created; the caller only ever
/// releases handles it successfully received.
pub trait Backend {
    type Stage;
    type Program;
    type Location;

    /// Compiles one stage, returning the driver's info log on failure.
    fn compile_stage(&mut self, kind: StageKind, source: &str) -> Result<Self::Stage, String>;

    fn release_stage(&mut self, stage: Self::Stage);

    /// Links two compiled stages, returning the driver's info log on failure.
    fn link_program(
        &mut self,
        vertex: &Self::Stage,
        fragment: &Self::Stage,
    ) -> Result<Self::Program, String>;

    fn release_program(&mut self, program: Self::Program);

    /// Looks up a uniform. `None` means the program has no active uniform of
    /// that name, which is not an error.
    fn uniform_location(&mut self, program: &Self::Program, name: &str) -> Option<Self::Location>;

    /// Uploads the vertex positions drawn by [`Backend::draw`] and wires them
    /// to the program's `position` attribute.
    fn bind_quad(&mut self, program: &Self::Program, vertices: &[[f32; 2]]);

    fn use_program(&mut self, program: &Self::Program);

    fn set_uniform(&mut self, location: &Self::Location, value: UniformValue);

    /// Draws `vertex_count` vertices of the bound quad as a triangle strip.
    fn draw(&mut self, vertex_count: u32);

    fn resize_viewport(&mut self, width: u32, height: u32);
}
