//! In-memory [`Backend`] used for dry runs and tests.
//!
//! `HeadlessBackend` performs just enough checking to behave like a driver:
//! a stage without `main` fails to compile, `#error` lines fail with a
//! line-numbered log, and a uniform only resolves when the linked program
//! both declares and reads it. Everything the render loop does to it is
//! recorded for inspection.
use std::collections::{BTreeMap, HashMap};

use regex::Regex;

use crate::backend::{Backend, StageKind, UniformValue};

#[derive(Debug, Clone)]
struct StageRecord {
    kind: StageKind,
    source: String,
}

#[derive(Debug, Clone)]
struct ProgramRecord {
    sources: [String; 2],
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u32,
    stages: HashMap<u32, StageRecord>,
    programs: HashMap<u32, ProgramRecord>,
    link_failure: Option<String>,
    in_use: Option<u32>,
    quad: Vec<[f32; 2]>,
    uniforms: BTreeMap<String, UniformValue>,
    viewport: Option<(u32, u32)>,
    draw_calls: u64,
    last_vertex_count: u32,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent link fail with `log` until cleared.
    pub fn fail_links(&mut self, log: Option<String>) {
        self.link_failure = log;
    }

    pub fn live_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn program_in_use(&self) -> Option<u32> {
        self.in_use
    }

    pub fn quad(&self) -> &[[f32; 2]] {
        &self.quad
    }

    /// Last value written to each uniform, keyed by uniform name.
    pub fn uniforms(&self) -> &BTreeMap<String, UniformValue> {
        &self.uniforms
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }

    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    pub fn last_vertex_count(&self) -> u32 {
        self.last_vertex_count
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle = self.next_handle.wrapping_add(1);
        self.next_handle
    }
}

fn check_stage(source: &str) -> Result<(), String> {
    for (index, line) in source.split('\n').enumerate() {
        if let Some(message) = line.trim_start().strip_prefix("#error") {
            return Err(format!(
                "ERROR: 0:{}: '#error' : {}\n",
                index + 1,
                message.trim()
            ));
        }
    }
    if !declares(source, r"void\s+main\s*\(") {
        let last = source.split('\n').count();
        return Err(format!("ERROR: 0:{last}: '' : Missing main()\n"));
    }
    Ok(())
}

fn declares(source: &str, pattern: &str) -> bool {
    Regex::new(pattern)
        .map(|regex| regex.is_match(source))
        .unwrap_or(false)
}

fn is_active_uniform(source: &str, name: &str) -> bool {
    let escaped = regex::escape(name);
    let declared = declares(source, &format!(r"\buniform\s+\w+\s+(\w+\s+)?{escaped}\s*;"));
    let uses = Regex::new(&format!(r"\b{escaped}\b"))
        .map(|regex| regex.find_iter(source).count())
        .unwrap_or(0);
    declared && uses > 1
}

impl Backend for HeadlessBackend {
    type Stage = u32;
    type Program = u32;
    type Location = String;

    fn compile_stage(&mut self, kind: StageKind, source: &str) -> Result<Self::Stage, String> {
        check_stage(source)?;
        let handle = self.allocate();
        self.stages.insert(
            handle,
            StageRecord {
                kind,
                source: source.to_string(),
            },
        );
        Ok(handle)
    }

    fn release_stage(&mut self, stage: Self::Stage) {
        self.stages.remove(&stage);
    }

    fn link_program(
        &mut self,
        vertex: &Self::Stage,
        fragment: &Self::Stage,
    ) -> Result<Self::Program, String> {
        if let Some(log) = &self.link_failure {
            return Err(log.clone());
        }
        let vertex = self
            .stages
            .get(vertex)
            .filter(|stage| stage.kind == StageKind::Vertex)
            .ok_or_else(|| "vertex stage handle is invalid".to_string())?;
        let fragment = self
            .stages
            .get(fragment)
            .filter(|stage| stage.kind == StageKind::Fragment)
            .ok_or_else(|| "fragment stage handle is invalid".to_string())?;
        let record = ProgramRecord {
            sources: [vertex.source.clone(), fragment.source.clone()],
        };
        let handle = self.allocate();
        self.programs.insert(handle, record);
        Ok(handle)
    }

    fn release_program(&mut self, program: Self::Program) {
        self.programs.remove(&program);
        if self.in_use == Some(program) {
            self.in_use = None;
        }
    }

    fn uniform_location(&mut self, program: &Self::Program, name: &str) -> Option<Self::Location> {
        let record = self.programs.get(program)?;
        record
            .sources
            .iter()
            .any(|source| is_active_uniform(source, name))
            .then(|| name.to_string())
    }

    fn bind_quad(&mut self, _program: &Self::Program, vertices: &[[f32; 2]]) {
        self.quad = vertices.to_vec();
    }

    fn use_program(&mut self, program: &Self::Program) {
        self.in_use = Some(*program);
    }

    fn set_uniform(&mut self, location: &Self::Location, value: UniformValue) {
        self.uniforms.insert(location.clone(), value);
    }

    fn draw(&mut self, vertex_count: u32) {
        self.draw_calls += 1;
        self.last_vertex_count = vertex_count;
    }

    fn resize_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Some((width, height));
    }
}
