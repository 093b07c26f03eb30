mod events;

pub use events::{parse_hex_color, ControlValue, InputEvent, Notification, PlaybackAction};

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use renderer::{
    Backend, BuildError, LoopOptions, LoopState, ParamValue, RenderLoop, Viewport, COLOR,
    RESOLUTION, TIME,
};
use shaderdoc::ShaderDocument;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    UnknownSession(SessionId),
    #[error(transparent)]
    Backend(#[from] BuildError),
    #[error("malformed input event: {0}")]
    Message(#[from] serde_json::Error),
}

/// Opaque handle the host uses to address one preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One preview panel: its render loop, drawable size and pending messages.
pub struct Session<B: Backend> {
    document: String,
    render: RenderLoop<B>,
    viewport: Viewport,
    outbox: Vec<Notification>,
}

impl<B: Backend> Session<B> {
    /// Name of the document currently shown.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Author from the document metadata, for the panel title.
    pub fn author(&self) -> &str {
        self.render.author()
    }

    pub fn state(&self) -> LoopState {
        self.render.state()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn render_loop(&self) -> &RenderLoop<B> {
        &self.render
    }

    fn load(&mut self, document: &ShaderDocument, now: Instant) {
        self.document = document.name().to_string();
        if let Err(err) = self.render.load(document, now) {
            self.outbox.push(Notification::Error {
                error: err.to_string(),
            });
        }
    }

    fn apply(&mut self, event: InputEvent, now: Instant) {
        match event {
            InputEvent::Control { control, .. } if control == TIME || control == RESOLUTION => {
                tracing::debug!(control = %control, "time and resolution follow the render loop");
            }
            InputEvent::Control { control, value } => {
                let value = match value {
                    ControlValue::Number(value) => ParamValue::Float(value),
                    ControlValue::Color(rgb) => ParamValue::Rgb(rgb),
                };
                if !self.render.set_parameter(&control, value) && control == COLOR {
                    tracing::warn!("colour control expects an RGB value");
                }
            }
            InputEvent::Action { action } => {
                let result = match (action, self.render.state()) {
                    (PlaybackAction::Play, LoopState::Paused) => self.render.resume(now),
                    (PlaybackAction::Pause, LoopState::Running) => self.render.pause(now),
                    (PlaybackAction::Reset, _) => {
                        self.render.reset(now);
                        Ok(())
                    }
                    (action, state) => {
                        tracing::debug!(?action, %state, "playback action has no effect");
                        Ok(())
                    }
                };
                if let Err(err) = result {
                    tracing::warn!(error = %err, "playback action failed");
                }
            }
        }
    }
}

/// Registry of live previews, each driven by the host's refresh callback.
///
/// There is no global session: every preview is opened explicitly and
/// addressed by its [`SessionId`].
pub struct SessionHost<B: Backend> {
    options: LoopOptions,
    sessions: BTreeMap<SessionId, Session<B>>,
    next_id: u64,
}

impl<B: Backend> SessionHost<B> {
    pub fn new(options: LoopOptions) -> Self {
        Self {
            options,
            sessions: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Opens a preview of `document`.
    ///
    /// A backend that cannot be acquired is reported through the returned
    /// error and no session is created. A document that fails to build still
    /// opens a session; the diagnostic is queued for the next [`tick`] and a
    /// later [`update`] can recover it.
    ///
    /// [`tick`]: SessionHost::tick
    /// [`update`]: SessionHost::update
    pub fn open<F>(
        &mut self,
        acquire_backend: F,
        document: &ShaderDocument,
        viewport: Viewport,
        now: Instant,
    ) -> Result<SessionId, SessionError>
    where
        F: FnOnce() -> Result<B, String>,
    {
        let backend = acquire_backend().map_err(|reason| {
            tracing::error!(%reason, "no rendering context available");
            BuildError::BackendUnavailable(reason)
        })?;

        self.next_id += 1;
        let id = SessionId(self.next_id);
        let mut session = Session {
            document: document.name().to_string(),
            render: RenderLoop::new(backend, self.options.clone()),
            viewport,
            outbox: Vec::new(),
        };
        session.load(document, now);
        tracing::info!(session = %id, document = document.name(), "opened preview session");
        self.sessions.insert(id, session);
        Ok(id)
    }

    /// Tears the current program down and rebuilds from `document`.
    pub fn update(
        &mut self,
        id: SessionId,
        document: &ShaderDocument,
        now: Instant,
    ) -> Result<(), SessionError> {
        self.session_mut(id)?.load(document, now);
        Ok(())
    }

    pub fn resize(&mut self, id: SessionId, viewport: Viewport) -> Result<(), SessionError> {
        self.session_mut(id)?.viewport = viewport;
        Ok(())
    }

    pub fn handle_input(
        &mut self,
        id: SessionId,
        event: InputEvent,
        now: Instant,
    ) -> Result<(), SessionError> {
        self.session_mut(id)?.apply(event, now);
        Ok(())
    }

    /// Parses a raw UI message and applies it.
    pub fn handle_message(
        &mut self,
        id: SessionId,
        json: &str,
        now: Instant,
    ) -> Result<(), SessionError> {
        let event = InputEvent::from_json(json)?;
        self.handle_input(id, event, now)
    }

    /// Stops the session and releases its backend objects.
    pub fn close(&mut self, id: SessionId) -> bool {
        let closed = self.sessions.remove(&id).is_some();
        if closed {
            tracing::info!(session = %id, "closed preview session");
        }
        closed
    }

    pub fn session(&self, id: SessionId) -> Option<&Session<B>> {
        self.sessions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Renders one frame of every session and collects outbound messages.
    pub fn tick(&mut self, now: Instant) -> Vec<(SessionId, Notification)> {
        let mut notifications = Vec::new();
        for (id, session) in self.sessions.iter_mut() {
            notifications.extend(session.outbox.drain(..).map(|note| (*id, note)));
            if let Some(frame) = session.render.tick(now, session.viewport) {
                if let Some(fps) = frame.fps {
                    notifications.push((*id, Notification::Fps { fps }));
                }
            }
        }
        notifications
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut Session<B>, SessionError> {
        self.sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id))
    }
}
