//! Configuration for the [`RetentionScheduler`](crate::scheduler::RetentionScheduler).
//!
//! Read from JSON with camelCase keys; every key is optional and falls back
//! to the defaults below. A configuration change is applied by restarting
//! the scheduler with the new value.
//!
//! # Examples
//!
//! ```json
//! {
//!   "retentionCount": 5,
//!   "waitSeconds": 300,
//!   "overrides": [
//!     { "glob": "*.log", "retentionCount": 1, "waitSeconds": 30 },
//!     { "glob": "**/generated/**", "value": "0,60" }
//!   ]
//! }
//! ```
//!
//! Builder methods for programmatic setup:
//!
//! ```ignore
//! let config = RetentionConfig::default()
//!     .with_retention_count(5)
//!     .with_wait_seconds(120)
//!     .with_override(RawOverride::new("*.log", 1, 30));
//! ```

use crate::overrides::{OverrideDiagnostic, OverrideRules, RawOverride};
use crate::policy::{EvictionPolicy, PinnedScope};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Shortest timer period. Shorter configured waits are rounded up.
pub const MIN_WAIT: Duration = Duration::from_secs(1);

/// Longest timer period (one year). Longer configured waits are rounded down.
pub const MAX_WAIT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Retention settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetentionConfig {
    /// Master switch. When off, the scheduler tracks nothing.
    pub enabled: bool,
    /// Front-most tabs per column never closed. Default: `8`.
    pub retention_count: u32,
    /// Seconds between eviction checks for each tab. Default: `600`.
    pub wait_seconds: u64,
    /// Grant one retained slot per pinned tab. Default: `true`.
    pub shift_by_pinned: bool,
    /// Which pinned tabs count towards the shift. Default: own column.
    pub pinned_scope: PinnedScope,
    pub allow_dirty_removal: bool,
    pub allow_active_removal: bool,
    /// Length of the closed-tab history. `0` keeps everything. Default: `20`.
    pub max_history: usize,
    /// Per-path overrides, first match wins.
    pub overrides: Vec<RawOverride>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_count: crate::DEFAULT_RETENTION_COUNT,
            wait_seconds: crate::DEFAULT_WAIT_SECONDS,
            shift_by_pinned: true,
            pinned_scope: PinnedScope::Column,
            allow_dirty_removal: false,
            allow_active_removal: false,
            max_history: crate::DEFAULT_MAX_HISTORY,
            overrides: Vec::new(),
        }
    }
}

impl RetentionConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        Self::from_json(&text).map_err(|e| format!("Failed to parse {}: {e}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| e.to_string())
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_retention_count(mut self, count: u32) -> Self {
        self.retention_count = count;
        self
    }

    pub fn with_wait_seconds(mut self, seconds: u64) -> Self {
        self.wait_seconds = seconds;
        self
    }

    pub fn with_shift_by_pinned(mut self, shift: bool) -> Self {
        self.shift_by_pinned = shift;
        self
    }

    pub fn with_pinned_scope(mut self, scope: PinnedScope) -> Self {
        self.pinned_scope = scope;
        self
    }

    pub fn with_dirty_removal(mut self, allow: bool) -> Self {
        self.allow_dirty_removal = allow;
        self
    }

    pub fn with_active_removal(mut self, allow: bool) -> Self {
        self.allow_active_removal = allow;
        self
    }

    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    pub fn with_override(mut self, rule: RawOverride) -> Self {
        self.overrides.push(rule);
        self
    }

    /// Default timer period, clamped to [`MIN_WAIT`]..=[`MAX_WAIT`].
    pub fn wait(&self) -> Duration {
        clamp_wait(Duration::from_secs(self.wait_seconds))
    }

    pub fn policy(&self) -> EvictionPolicy {
        EvictionPolicy {
            retention_count: self.retention_count,
            shift_by_pinned: self.shift_by_pinned,
            pinned_scope: self.pinned_scope,
            allow_dirty_removal: self.allow_dirty_removal,
            allow_active_removal: self.allow_active_removal,
        }
    }

    /// Compile the override list. Dropped entries come back as diagnostics.
    pub fn override_rules(&self) -> (OverrideRules, Vec<OverrideDiagnostic>) {
        OverrideRules::from_raw(&self.overrides)
    }
}

pub(crate) fn clamp_wait(wait: Duration) -> Duration {
    wait.clamp(MIN_WAIT, MAX_WAIT)
}
