use std::time::{Duration, Instant};

/// Playback position; elapsed time accumulates across pauses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PlaybackClock {
    Running { since: Instant, base: Duration },
    Paused { elapsed: Duration },
}

impl PlaybackClock {
    pub fn started(now: Instant) -> Self {
        PlaybackClock::Running {
            since: now,
            base: Duration::ZERO,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match *self {
            PlaybackClock::Running { since, base } => base + now.saturating_duration_since(since),
            PlaybackClock::Paused { elapsed } => elapsed,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackClock::Paused { .. })
    }

    pub fn pause(&mut self, now: Instant) {
        if !self.is_paused() {
            *self = PlaybackClock::Paused {
                elapsed: self.elapsed(now),
            };
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if let PlaybackClock::Paused { elapsed } = *self {
            *self = PlaybackClock::Running {
                since: now,
                base: elapsed,
            };
        }
    }

    /// Rewinds to zero without changing whether the clock runs.
    pub fn reset(&mut self, now: Instant) {
        *self = match *self {
            PlaybackClock::Running { .. } => PlaybackClock::started(now),
            PlaybackClock::Paused { .. } => PlaybackClock::Paused {
                elapsed: Duration::ZERO,
            },
        };
    }
}

/// Counts ticks and reports a rate once per window.
#[derive(Debug, Clone)]
pub(crate) struct FpsCounter {
    window: Duration,
    window_start: Instant,
    frames: u32,
}

impl FpsCounter {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            window: window.max(Duration::from_millis(1)),
            window_start: now,
            frames: 0,
        }
    }

    /// Records one tick. Returns the frames-per-second figure when the
    /// current window closes.
    pub fn record(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }
        let fps = (f64::from(self.frames) / elapsed.as_secs_f64()).round() as u32;
        self.frames = 0;
        self.window_start = now;
        Some(fps)
    }
}
