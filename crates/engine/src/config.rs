use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, Result};

/// Default tolerance within which a new mark merges into an existing cue.
pub const DEFAULT_SNAP_WINDOW_MS: i64 = 250;
/// Default number of undo snapshots kept.
pub const DEFAULT_HISTORY_DEPTH: usize = 30;
/// Default nudge distance per step.
pub const DEFAULT_NUDGE_STEP_MS: i64 = 100;

/// Editing session configuration.
///
/// Every field has a default, so a partial JSON object is a valid config.
///
/// # Example
/// ```
/// use cue_engine::EditorConfig;
///
/// let config: EditorConfig = serde_json::from_str(r#"{"history_depth": 50}"#).expect("valid");
/// assert_eq!(config.history_depth, 50);
/// assert_eq!(config.snap_window_ms, 250);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub snap_window_ms: i64,
    pub history_depth: usize,
    pub nudge_step_ms: i64,
    pub ranges: FieldRanges,
}

/// Declared ranges for numeric payload fields. Values outside are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRanges {
    pub gear: Bounds,
    pub pace: Bounds,
}

/// Inclusive integer bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: i64,
    pub max: i64,
}

impl Bounds {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: i64) -> i64 {
        value.max(self.min).min(self.max)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_window_ms: DEFAULT_SNAP_WINDOW_MS,
            history_depth: DEFAULT_HISTORY_DEPTH,
            nudge_step_ms: DEFAULT_NUDGE_STEP_MS,
            ranges: FieldRanges::default(),
        }
    }
}

impl Default for FieldRanges {
    fn default() -> Self {
        Self {
            gear: Bounds::new(1, 30),
            pace: Bounds::new(40, 160),
        }
    }
}

impl EditorConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|source| EngineError::ConfigSerialization {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        debug!(path = %path.display(), ?config, "editor config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.snap_window_ms < 0 {
            return Err(invalid(format!(
                "snap_window_ms must not be negative, got {}",
                self.snap_window_ms
            )));
        }
        if self.history_depth == 0 {
            return Err(invalid("history_depth must be positive".to_string()));
        }
        if self.nudge_step_ms <= 0 {
            return Err(invalid(format!(
                "nudge_step_ms must be positive, got {}",
                self.nudge_step_ms
            )));
        }
        for (name, bounds) in [("gear", self.ranges.gear), ("pace", self.ranges.pace)] {
            if bounds.min > bounds.max {
                return Err(invalid(format!(
                    "{name} range is empty: {}..={}",
                    bounds.min, bounds.max
                )));
            }
        }
        Ok(())
    }
}

fn invalid(reason: String) -> EngineError {
    EngineError::InvalidConfig { reason }
}
