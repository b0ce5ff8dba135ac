//! Engine configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// How often the engine emits a progress tick on its own.
///
/// Ticks carry whatever [`Simulation::progress`](super::Simulation::progress)
/// reports. Computations may post extra ticks through the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProgressInterval {
    /// Every `n` completed steps.
    Steps(u64),
    /// At most once per wall-clock interval.
    Elapsed(Duration),
    /// Never; only computation-posted ticks are delivered.
    Disabled,
}

impl Default for ProgressInterval {
    fn default() -> Self {
        ProgressInterval::Steps(1000)
    }
}

/// Where listener callbacks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CallbackContext {
    /// The engine spawns one `<name>-events` thread that delivers every
    /// callback in FIFO order.
    #[default]
    DedicatedThread,

    /// The host drains events itself from the thread of its choice through
    /// [`Engine::take_event_pump`](super::Engine::take_event_pump), e.g. from
    /// a UI loop.
    Manual,
}

/// Immutable configuration for an [`Engine`](super::Engine).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_simengine::engine::{EngineConfig, ProgressInterval};
///
/// let config = EngineConfig::default()
///     .with_name("tsp")
///     .with_refresh_interval(Duration::from_millis(16))
///     .with_progress_interval(ProgressInterval::Steps(500))
///     .with_auto_run(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Label for thread names and log spans.
    pub name: String,

    /// Minimum spacing between two `on_refresh` deliveries. Requests arriving
    /// faster are coalesced.
    pub refresh_interval: Duration,

    /// Engine-driven progress ticks.
    pub progress_interval: ProgressInterval,

    /// Pause between two steps, cut short by any control request.
    ///
    /// Zero runs steps back to back. A non-zero value throttles a run so a
    /// host can animate it.
    pub yield_interval: Duration,

    /// Go straight from `READY` to `RUNNING` without waiting for `run()`.
    pub auto_run: bool,

    /// Capacity of the bounded event queue between worker and callbacks.
    pub event_capacity: usize,

    /// Where listener callbacks run.
    pub callback_context: CallbackContext,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "simulation".to_string(),
            refresh_interval: Duration::from_millis(33),
            progress_interval: ProgressInterval::default(),
            yield_interval: Duration::ZERO,
            auto_run: false,
            event_capacity: 1024,
            callback_context: CallbackContext::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_progress_interval(mut self, interval: ProgressInterval) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_yield_interval(mut self, interval: Duration) -> Self {
        self.yield_interval = interval;
        self
    }

    pub fn with_auto_run(mut self, auto_run: bool) -> Self {
        self.auto_run = auto_run;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn with_callback_context(mut self, context: CallbackContext) -> Self {
        self.callback_context = context;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::out_of_range("name", "non-empty", "\"\""));
        }
        if self.event_capacity < 4 {
            return Err(ConfigError::out_of_range(
                "event_capacity",
                "at least 4",
                self.event_capacity,
            ));
        }
        match self.progress_interval {
            ProgressInterval::Steps(0) => Err(ConfigError::out_of_range(
                "progress_interval",
                "a positive step count",
                0,
            )),
            ProgressInterval::Elapsed(d) if d.is_zero() => Err(ConfigError::out_of_range(
                "progress_interval",
                "a positive duration",
                "0s",
            )),
            _ => Ok(()),
        }
    }
}
