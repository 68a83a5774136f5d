//! Staleness and screensaver mode tracking
//!
//! Driven by the render task once per cycle from a single question: how
//! long ago was the last telemetry commit? Classification is pure; the
//! edge latch is separate so a skipped render cycle (lock timeout) cannot
//! lose a mode transition; the edge stays pending until a cycle actually
//! applies it.

/// Telemetry older than this is shown dimmed
pub const STALE_TIMEOUT_MS: u64 = 2000;

/// Telemetry older than this switches to the screensaver
pub const SCREENSAVER_TIMEOUT_MS: u64 = 5000;

/// Both timeouts in one place so tests can shrink them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StaleThresholds {
    pub stale_ms: u64,
    pub screensaver_ms: u64,
}

impl StaleThresholds {
    pub const DEFAULT: Self = Self {
        stale_ms: STALE_TIMEOUT_MS,
        screensaver_ms: SCREENSAVER_TIMEOUT_MS,
    };
}

impl Default for StaleThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// What the panels should be showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UiMode {
    /// Fresh telemetry, normal gauges
    Live,
    /// Host quiet; last values shown dimmed
    Stale,
    /// Host gone; full-screen imagery
    Screensaver,
}

impl UiMode {
    /// Classify elapsed time since the last telemetry commit.
    ///
    /// Monotonic in `elapsed_ms`: more silence never moves the mode back
    /// toward `Live`.
    pub fn classify(elapsed_ms: u64, thresholds: &StaleThresholds) -> Self {
        if elapsed_ms > thresholds.screensaver_ms {
            UiMode::Screensaver
        } else if elapsed_ms > thresholds.stale_ms {
            UiMode::Stale
        } else {
            UiMode::Live
        }
    }
}

/// Latches the last mode actually applied to the panels.
///
/// Call [`observe`](ModeTracker::observe) only after the render lock has
/// been acquired: if the cycle is skipped, the tracker still holds the old
/// mode and the transition fires on the next successful cycle.
#[derive(Debug, Clone)]
pub struct ModeTracker {
    applied: UiMode,
}

impl ModeTracker {
    pub const fn new() -> Self {
        Self {
            applied: UiMode::Live,
        }
    }

    /// Latch a newly classified mode; `Some` on a transition edge
    pub fn observe(&mut self, mode: UiMode) -> Option<UiMode> {
        if mode != self.applied {
            self.applied = mode;
            Some(mode)
        } else {
            None
        }
    }

    /// Mode currently applied to the panels
    pub fn current(&self) -> UiMode {
        self.applied
    }
}

impl Default for ModeTracker {
    fn default() -> Self {
        Self::new()
    }
}
