//! [`Backend`] implementation on top of a `glow` GL ES 2 / WebGL context.
//!
//! The host creates the context (window, canvas, or offscreen surface) and
//! keeps it current on the thread that drives the render loop; every call in
//! this module assumes that.

use glow::HasContext;

use crate::backend::{Backend, StageKind, UniformValue};

const POSITION_ATTRIBUTE: &str = "position";

pub struct GlowBackend<C: HasContext> {
    gl: C,
    quad: Option<C::Buffer>,
}

impl<C: HasContext> GlowBackend<C> {
    pub fn new(gl: C) -> Self {
        Self { gl, quad: None }
    }

    pub fn context(&self) -> &C {
        &self.gl
    }
}

fn gl_size(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl<C: HasContext> Backend for GlowBackend<C> {
    type Stage = C::Shader;
    type Program = C::Program;
    type Location = C::UniformLocation;

    fn compile_stage(&mut self, kind: StageKind, source: &str) -> Result<Self::Stage, String> {
        let shader_type = match kind {
            StageKind::Vertex => glow::VERTEX_SHADER,
            StageKind::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = self.gl.create_shader(shader_type)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);

            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(log);
            }
            Ok(shader)
        }
    }

    fn release_stage(&mut self, stage: Self::Stage) {
        unsafe { self.gl.delete_shader(stage) }
    }

    fn link_program(
        &mut self,
        vertex: &Self::Stage,
        fragment: &Self::Stage,
    ) -> Result<Self::Program, String> {
        unsafe {
            let program = self.gl.create_program()?;
            self.gl.attach_shader(program, *vertex);
            self.gl.attach_shader(program, *fragment);
            self.gl.link_program(program);

            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(log);
            }

            // Stages are deleted by the caller right after linking.
            self.gl.detach_shader(program, *vertex);
            self.gl.detach_shader(program, *fragment);
            Ok(program)
        }
    }

    fn release_program(&mut self, program: Self::Program) {
        unsafe { self.gl.delete_program(program) }
    }

    fn uniform_location(&mut self, program: &Self::Program, name: &str) -> Option<Self::Location> {
        unsafe { self.gl.get_uniform_location(*program, name) }
    }

    fn bind_quad(&mut self, program: &Self::Program, vertices: &[[f32; 2]]) {
        unsafe {
            let buffer = match self.quad {
                Some(buffer) => buffer,
                None => match self.gl.create_buffer() {
                    Ok(buffer) => {
                        self.quad = Some(buffer);
                        buffer
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "failed to allocate quad buffer");
                        return;
                    }
                },
            };

            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(vertices),
                glow::STATIC_DRAW,
            );

            match self.gl.get_attrib_location(*program, POSITION_ATTRIBUTE) {
                Some(index) => {
                    self.gl.enable_vertex_attrib_array(index);
                    self.gl
                        .vertex_attrib_pointer_f32(index, 2, glow::FLOAT, false, 0, 0);
                }
                None => tracing::warn!(
                    attribute = POSITION_ATTRIBUTE,
                    "vertex stage has no position attribute; quad will not be visible"
                ),
            }
        }
    }

    fn use_program(&mut self, program: &Self::Program) {
        unsafe { self.gl.use_program(Some(*program)) }
    }

    fn set_uniform(&mut self, location: &Self::Location, value: UniformValue) {
        unsafe {
            match value {
                UniformValue::Float(x) => self.gl.uniform_1_f32(Some(location), x),
                UniformValue::Vec2([x, y]) => self.gl.uniform_2_f32(Some(location), x, y),
                UniformValue::Vec4([x, y, z, w]) => {
                    self.gl.uniform_4_f32(Some(location), x, y, z, w)
                }
            }
        }
    }

    fn draw(&mut self, vertex_count: u32) {
        unsafe {
            self.gl
                .draw_arrays(glow::TRIANGLE_STRIP, 0, gl_size(vertex_count))
        }
    }

    fn resize_viewport(&mut self, width: u32, height: u32) {
        unsafe { self.gl.viewport(0, 0, gl_size(width), gl_size(height)) }
    }
}

impl<C: HasContext> Drop for GlowBackend<C> {
    fn drop(&mut self) {
        if let Some(buffer) = self.quad.take() {
            unsafe { self.gl.delete_buffer(buffer) }
        }
    }
}
