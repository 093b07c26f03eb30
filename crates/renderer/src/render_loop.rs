use std::fmt;
use std::time::Instant;

use shaderdoc::{extract, ExtractedShader, Metadata, ShaderDocument};

use crate::backend::{Backend, StageKind};
use crate::compile::{
    remap_diagnostic, transpile_fragment_with, SourceLine, TranspiledShader, FULLSCREEN_QUAD,
    VERTEX_SHADER,
};
use crate::error::{BuildError, LoopError};
use crate::params::{ParamValue, ParameterStore};
use crate::program::{build_program, CompiledProgram, UniformSlot};
use crate::timeline::{FpsCounter, PlaybackClock};
use crate::types::{FrameResult, LoopOptions, Viewport};

/// Lifecycle of a render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No program, or a program that has not been started. Ticks do nothing.
    Uninitialized,
    Running,
    Paused,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Uninitialized => f.write_str("uninitialized"),
            LoopState::Running => f.write_str("running"),
            LoopState::Paused => f.write_str("paused"),
        }
    }
}

struct Playback {
    clock: PlaybackClock,
    fps: FpsCounter,
}

/// One live preview: a program, its parameters and the playback clock.
///
/// The loop never schedules itself. The host calls [`RenderLoop::tick`] once
/// per display refresh and stops calling it to cancel; dropping the loop
/// releases every backend object it still owns.
pub struct RenderLoop<B: Backend> {
    backend: B,
    options: LoopOptions,
    metadata: Metadata,
    params: ParameterStore,
    program: Option<CompiledProgram<B>>,
    playback: Option<Playback>,
    applied_viewport: Option<Viewport>,
}

impl<B: Backend> RenderLoop<B> {
    pub fn new(backend: B, options: LoopOptions) -> Self {
        Self {
            backend,
            options,
            metadata: Metadata::default(),
            params: ParameterStore::default(),
            program: None,
            playback: None,
            applied_viewport: None,
        }
    }

    pub fn state(&self) -> LoopState {
        match (&self.program, &self.playback) {
            (Some(_), Some(playback)) if playback.clock.is_paused() => LoopState::Paused,
            (Some(_), Some(_)) => LoopState::Running,
            _ => LoopState::Uninitialized,
        }
    }

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn author(&self) -> &str {
        &self.metadata.author
    }

    pub fn program(&self) -> Option<&CompiledProgram<B>> {
        self.program.as_ref()
    }

    pub fn options(&self) -> &LoopOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Replaces the current program with one built from `document`.
    ///
    /// The old program is released before the new one is compiled. On
    /// failure the loop stays `Uninitialized` with nothing allocated, and
    /// fragment diagnostics point at lines of `document`.
    pub fn rebuild(&mut self, document: &ShaderDocument) -> Result<(), BuildError> {
        self.teardown();

        let extracted = extract(document);
        for issue in extracted.metadata.validate() {
            tracing::warn!(document = document.name(), "{issue}");
        }
        let parameters = extracted.metadata.bindable_parameters();
        let transpiled =
            transpile_fragment_with(&extracted.body, &parameters, &self.options.transpile);

        self.params = ParameterStore::new(&parameters);
        let names: Vec<&str> = parameters.iter().map(|param| param.name.as_str()).collect();
        let built = build_program(&mut self.backend, VERTEX_SHADER, &transpiled.source, &names);
        self.metadata = extracted.metadata.clone();

        match built {
            Ok(program) => {
                tracing::info!(
                    document = document.name(),
                    author = %self.metadata.author,
                    uniforms = program.resolved_names().len(),
                    "shader program built"
                );
                self.program = Some(program);
                Ok(())
            }
            Err(err) => {
                let err = attribute(err, &transpiled, &extracted);
                tracing::error!(document = document.name(), error = %err, "shader build failed");
                Err(err)
            }
        }
    }

    /// Builds `document` and starts playback, paused unless autoplay is on.
    pub fn load(&mut self, document: &ShaderDocument, now: Instant) -> Result<(), LoopError> {
        self.rebuild(document)?;
        self.start(now)?;
        if !self.options.autoplay {
            self.pause(now)?;
        }
        Ok(())
    }

    pub fn start(&mut self, now: Instant) -> Result<(), LoopError> {
        if self.program.is_none() {
            return Err(LoopError::NotBuilt);
        }
        if self.playback.is_some() {
            return Err(LoopError::InvalidTransition {
                action: "start",
                state: self.state(),
            });
        }
        self.params.set_time(0.0);
        self.playback = Some(Playback {
            clock: PlaybackClock::started(now),
            fps: FpsCounter::new(self.options.fps_window, now),
        });
        tracing::debug!("render loop started");
        Ok(())
    }

    pub fn pause(&mut self, now: Instant) -> Result<(), LoopError> {
        let playback = self.playing("pause")?;
        playback.clock.pause(now);
        tracing::debug!("render loop paused");
        Ok(())
    }

    pub fn resume(&mut self, now: Instant) -> Result<(), LoopError> {
        let playback = self.playing("resume")?;
        playback.clock.resume(now);
        tracing::debug!("render loop resumed");
        Ok(())
    }

    /// Pauses a running loop or resumes a paused one.
    pub fn toggle(&mut self, now: Instant) -> Result<(), LoopError> {
        match self.state() {
            LoopState::Running => self.pause(now),
            LoopState::Paused => self.resume(now),
            state => Err(LoopError::InvalidTransition {
                action: "toggle",
                state,
            }),
        }
    }

    /// Rewinds playback time to zero in any state, keeping the state.
    pub fn reset(&mut self, now: Instant) {
        if let Some(playback) = self.playback.as_mut() {
            playback.clock.reset(now);
        }
        self.params.set_time(0.0);
    }

    pub fn set_parameter(&mut self, name: &str, value: ParamValue) -> bool {
        let applied = self.params.set(name, value);
        if !applied {
            tracing::debug!(parameter = name, "ignoring update for unknown parameter or mismatched value");
        }
        applied
    }

    /// Renders one frame. Returns `None` while `Uninitialized`.
    pub fn tick(&mut self, now: Instant, viewport: Viewport) -> Option<FrameResult> {
        let program = self.program.as_ref()?;
        let playback = self.playback.as_mut()?;

        let time = playback.clock.elapsed(now).as_secs_f32();
        self.params.set_time(time);

        let resized = if self.applied_viewport != Some(viewport) {
            self.backend.resize_viewport(viewport.width, viewport.height);
            self.params.set_resolution(viewport.width, viewport.height);
            self.applied_viewport = Some(viewport);
            Some(viewport)
        } else {
            None
        };

        self.backend.use_program(program.handle());
        let mut bound_uniforms = 0;
        for (name, value) in self.params.values() {
            if let Some(UniformSlot::Resolved(location)) = program.slot(name) {
                self.backend.set_uniform(location, value.to_uniform());
                bound_uniforms += 1;
            }
        }
        self.backend.draw(FULLSCREEN_QUAD.len() as u32);

        let fps = playback.fps.record(now);
        Some(FrameResult {
            time,
            resized,
            fps,
            bound_uniforms,
        })
    }

    /// Stops playback and releases the program.
    pub fn teardown(&mut self) {
        self.playback = None;
        self.applied_viewport = None;
        if let Some(program) = self.program.take() {
            program.release(&mut self.backend);
            tracing::debug!("released shader program");
        }
    }

    fn playing(&mut self, action: &'static str) -> Result<&mut Playback, LoopError> {
        let state = self.state();
        match self.playback.as_mut() {
            Some(playback) if self.program.is_some() => Ok(playback),
            _ => Err(LoopError::InvalidTransition { action, state }),
        }
    }
}

impl<B: Backend> Drop for RenderLoop<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Points fragment diagnostics at document lines.
fn attribute(err: BuildError, transpiled: &TranspiledShader, extracted: &ExtractedShader) -> BuildError {
    match err {
        BuildError::ShaderCompile {
            stage: StageKind::Fragment,
            log,
        } => BuildError::ShaderCompile {
            stage: StageKind::Fragment,
            log: remap_diagnostic(&log, |line| match transpiled.line_map.source_line(line) {
                Some(SourceLine::Body(body)) => Some(extracted.document_line(body).unwrap_or(body)),
                Some(SourceLine::Injected) => None,
                None => Some(line),
            }),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::UniformValue;
    use crate::headless::HeadlessBackend;

    const SPEED_SHADER: &str = r#"/* {
    "author": "Ada",
    "parameters": [{ "name": "speed", "min": 0, "max": 5, "default": 2 }]
} */
void main() {
    fragColor = vec4(color.rgb * sin(time * speed), alpha);
}
"#;

    fn running_loop(now: Instant) -> RenderLoop<HeadlessBackend> {
        let mut render = RenderLoop::new(HeadlessBackend::new(), LoopOptions::default());
        render
            .load(&ShaderDocument::new("speed.frag", SPEED_SHADER), now)
            .unwrap();
        render
    }

    fn secs(value: u64) -> Duration {
        Duration::from_secs(value)
    }

    #[test]
    fn speed_parameter_is_declared_defaulted_and_bound() {
        let start = Instant::now();
        let mut render = running_loop(start);
        assert_eq!(render.state(), LoopState::Running);
        assert_eq!(render.author(), "Ada");
        assert_eq!(render.params().get_float("speed"), Some(2.0));

        let frame = render.tick(start, Viewport::new(640, 480)).unwrap();
        assert_eq!(frame.bound_uniforms, 4);
        let backend = render.backend();
        assert_eq!(backend.uniform("speed"), Some(UniformValue::Float(2.0)));
        assert_eq!(backend.uniform("color"), Some(UniformValue::Vec4([1.0, 1.0, 1.0, 1.0])));
        assert_eq!(backend.uniform("resolution"), None);
        assert_eq!(backend.draw_calls(), 1);
        assert_eq!(backend.last_vertex_count(), 4);
    }

    #[test]
    fn pause_and_resume_preserve_elapsed_time() {
        let start = Instant::now();
        let viewport = Viewport::new(100, 100);
        let mut render = running_loop(start);

        assert_eq!(render.tick(start + secs(2), viewport).unwrap().time, 2.0);
        render.pause(start + secs(2)).unwrap();
        assert_eq!(render.state(), LoopState::Paused);
        assert_eq!(render.tick(start + secs(10), viewport).unwrap().time, 2.0);

        render.resume(start + secs(10)).unwrap();
        assert_eq!(render.tick(start + secs(11), viewport).unwrap().time, 3.0);
    }

    #[test]
    fn reset_rewinds_and_time_keeps_increasing() {
        let start = Instant::now();
        let viewport = Viewport::new(100, 100);
        let mut render = running_loop(start);
        render.tick(start + secs(5), viewport);

        render.reset(start + secs(5));
        assert_eq!(render.state(), LoopState::Running);
        assert_eq!(render.params().time(), 0.0);
        let mut last = render.tick(start + secs(5), viewport).unwrap().time;
        assert_eq!(last, 0.0);
        for step in 1..5 {
            let frame = render
                .tick(start + secs(5) + Duration::from_millis(step * 100), viewport)
                .unwrap();
            assert!(frame.time > last);
            last = frame.time;
        }
    }

    #[test]
    fn reset_while_paused_stays_paused_at_zero() {
        let start = Instant::now();
        let viewport = Viewport::new(100, 100);
        let mut render = running_loop(start);
        render.pause(start + secs(3)).unwrap();
        render.reset(start + secs(4));

        assert_eq!(render.state(), LoopState::Paused);
        assert_eq!(render.tick(start + secs(9), viewport).unwrap().time, 0.0);
    }

    #[test]
    fn failed_rebuild_stops_rendering_and_leaks_nothing() {
        let start = Instant::now();
        let mut render = running_loop(start);
        let err = render
            .load(&ShaderDocument::new("broken.frag", "float nothing;"), start)
            .unwrap_err();

        assert!(matches!(
            err,
            LoopError::Build(BuildError::ShaderCompile {
                stage: StageKind::Fragment,
                ..
            })
        ));
        assert_eq!(render.state(), LoopState::Uninitialized);
        assert!(render.tick(start + secs(1), Viewport::new(10, 10)).is_none());
        assert_eq!(render.backend().live_programs(), 0);
        assert_eq!(render.backend().live_stages(), 0);
    }

    #[test]
    fn updates_replace_the_program() {
        let start = Instant::now();
        let mut render = running_loop(start);
        render
            .load(&ShaderDocument::new("speed.frag", SPEED_SHADER), start)
            .unwrap();
        assert_eq!(render.backend().live_programs(), 1);

        render.teardown();
        assert_eq!(render.backend().live_programs(), 0);
        assert_eq!(render.state(), LoopState::Uninitialized);
    }

    #[test]
    fn fragment_diagnostics_point_at_document_lines() {
        let document = ShaderDocument::new(
            "err.frag",
            "/* {\"author\": \"Ada\"} */\nvoid main() {\n#error oops\n}\n",
        );
        let mut render = RenderLoop::new(HeadlessBackend::new(), LoopOptions::default());
        let err = render.rebuild(&document).unwrap_err();
        let log = err.log().unwrap();
        assert!(log.starts_with("ERROR: 0:3: '#error' : oops"), "{log}");
    }

    #[test]
    fn viewport_changes_are_applied_once() {
        let start = Instant::now();
        let mut render = running_loop(start);

        let first = render.tick(start, Viewport::new(800, 600)).unwrap();
        assert_eq!(first.resized, Some(Viewport::new(800, 600)));
        assert_eq!(render.params().get(crate::params::RESOLUTION), Some(ParamValue::Vec2([800.0, 600.0])));
        assert_eq!(render.tick(start, Viewport::new(800, 600)).unwrap().resized, None);
        assert!(render.tick(start, Viewport::new(1024, 768)).unwrap().resized.is_some());
        assert_eq!(render.backend().viewport(), Some((1024, 768)));
    }

    #[test]
    fn transitions_require_a_started_program() {
        let start = Instant::now();
        let mut render = RenderLoop::new(HeadlessBackend::new(), LoopOptions::default());
        assert_eq!(render.start(start), Err(LoopError::NotBuilt));
        assert_eq!(
            render.pause(start),
            Err(LoopError::InvalidTransition {
                action: "pause",
                state: LoopState::Uninitialized
            })
        );
        assert!(render.tick(start, Viewport::new(1, 1)).is_none());

        let mut render = running_loop(start);
        assert!(render.start(start).is_err());
        render.toggle(start).unwrap();
        assert_eq!(render.state(), LoopState::Paused);
        render.toggle(start).unwrap();
        assert_eq!(render.state(), LoopState::Running);
    }

    #[test]
    fn without_autoplay_the_loop_loads_paused() {
        let start = Instant::now();
        let options = LoopOptions {
            autoplay: false,
            ..LoopOptions::default()
        };
        let mut render = RenderLoop::new(HeadlessBackend::new(), options);
        render
            .load(&ShaderDocument::new("speed.frag", SPEED_SHADER), start)
            .unwrap();
        assert_eq!(render.state(), LoopState::Paused);
        assert_eq!(render.tick(start + secs(4), Viewport::new(1, 1)).unwrap().time, 0.0);
    }

    #[test]
    fn parameters_reach_the_next_frame() {
        let start = Instant::now();
        let mut render = running_loop(start);
        assert!(render.set_parameter("speed", ParamValue::Float(4.5)));
        assert!(!render.set_parameter("warp", ParamValue::Float(1.0)));
        render.tick(start, Viewport::new(1, 1));
        assert_eq!(render.backend().uniform("speed"), Some(UniformValue::Float(4.5)));
    }
}
