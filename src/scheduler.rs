//! Refresh scheduler for periodic display updates.
//!
//! E-paper refresh cycles are a scarce resource, so the panel is redrawn only
//! once at startup and then whenever the configured interval has elapsed.
//! New payloads do not trigger a redraw on their own; they show up on the
//! next periodic refresh.

use std::time::Duration;
use tokio::time::Instant;

/// Why a render was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTrigger {
    /// Baseline image after initialization
    Startup,
    /// Refresh interval elapsed
    Interval,
}

/// True once strictly more than `interval` has passed since the last render
pub fn should_render(now: Instant, last_render: Instant, interval: Duration) -> bool {
    now.saturating_duration_since(last_render) > interval
}

/// Scheduler for periodic display refresh
#[derive(Debug)]
pub struct RenderScheduler {
    interval: Duration,
    last_render: Option<Instant>,
}

impl RenderScheduler {
    /// Create a new scheduler
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_render: None,
        }
    }

    /// Decide whether to render at `now`
    ///
    /// The first call always yields [`RenderTrigger::Startup`]; after that a
    /// render is due only when the interval has elapsed.
    pub fn poll(&self, now: Instant) -> Option<RenderTrigger> {
        match self.last_render {
            None => Some(RenderTrigger::Startup),
            Some(last) if should_render(now, last, self.interval) => Some(RenderTrigger::Interval),
            Some(_) => None,
        }
    }

    /// Record a render attempt, successful or not
    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_render = Some(now);
        tracing::debug!("Next refresh in {:?}", self.interval);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
