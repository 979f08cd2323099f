//! Playback configuration.

use std::time::Duration;

use stagehand_core::error::StageError;
use stagehand_stage::application::compiler::CompileOptions;

/// Environment variable for the per-character reveal delay.
pub const CHAR_DELAY_VAR: &str = "STAGEHAND_CHAR_DELAY_MS";
/// Environment variable for the background cross-fade duration.
pub const CROSSFADE_VAR: &str = "STAGEHAND_CROSSFADE_MS";
/// Environment variable for enter/exit transitions.
pub const STAGE_TRANSITION_VAR: &str = "STAGEHAND_STAGE_TRANSITION_MS";
/// Environment variable for image transitions.
pub const IMAGE_TRANSITION_VAR: &str = "STAGEHAND_IMAGE_TRANSITION_MS";
/// Environment variable for the fallback pause length.
pub const DEFAULT_PAUSE_VAR: &str = "STAGEHAND_DEFAULT_PAUSE_MS";
/// Environment variable for the pause upper bound.
pub const MAX_PAUSE_VAR: &str = "STAGEHAND_MAX_PAUSE_MS";

/// Timing knobs for animated playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Delay between revealed characters. Zero reveals text at once.
    pub char_delay: Duration,
    /// Background cross-fade.
    pub crossfade: Duration,
    /// Character enter/exit fade.
    pub stage_transition: Duration,
    /// Illustration fade.
    pub image_transition: Duration,
    /// Pause length when `for` is missing or unreadable.
    pub default_pause: Duration,
    /// Upper bound for any pause.
    pub max_pause: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        let compile = CompileOptions::default();
        Self {
            char_delay: Duration::from_millis(30),
            crossfade: Duration::from_millis(400),
            stage_transition: Duration::from_millis(250),
            image_transition: Duration::from_millis(250),
            default_pause: compile.default_pause,
            max_pause: compile.max_pause,
        }
    }
}

impl PlaybackConfig {
    /// A configuration with every animation disabled.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            char_delay: Duration::ZERO,
            crossfade: Duration::ZERO,
            stage_transition: Duration::ZERO,
            image_transition: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Reads overrides from `STAGEHAND_*_MS` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `StageError::Config` if a variable is set but is not a whole
    /// number of milliseconds.
    pub fn from_env() -> Result<Self, StageError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, which maps a variable name to its
    /// value. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `StageError::Config` if a value is not a whole number of
    /// milliseconds.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StageError> {
        let defaults = Self::default();
        let read = |key: &str, default: Duration| -> Result<Duration, StageError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|e| StageError::Config(format!("{key}={raw:?}: {e}"))),
            }
        };

        let config = Self {
            char_delay: read(CHAR_DELAY_VAR, defaults.char_delay)?,
            crossfade: read(CROSSFADE_VAR, defaults.crossfade)?,
            stage_transition: read(STAGE_TRANSITION_VAR, defaults.stage_transition)?,
            image_transition: read(IMAGE_TRANSITION_VAR, defaults.image_transition)?,
            default_pause: read(DEFAULT_PAUSE_VAR, defaults.default_pause)?,
            max_pause: read(MAX_PAUSE_VAR, defaults.max_pause)?,
        };
        if config.default_pause > config.max_pause {
            return Err(StageError::Config(format!(
                "{DEFAULT_PAUSE_VAR} exceeds {MAX_PAUSE_VAR}"
            )));
        }
        Ok(config)
    }

    /// The subset of settings the compiler needs.
    #[must_use]
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            default_pause: self.default_pause,
            max_pause: self.max_pause,
        }
    }
}
