//! Per-path overrides of retention count and wait time.
//!
//! Rules come from configuration as [`RawOverride`] entries and are compiled
//! once per configuration cycle into [`OverrideRules`]. A malformed entry is
//! dropped with an [`OverrideDiagnostic`]; the remaining rules still load.
//! Matching walks the rules in configured order and the first hit wins.

use crate::config::clamp_wait;
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// An override entry as written in configuration.
///
/// Counts may be JSON integers or integer strings. The compact form
/// `{"glob": "*.log", "value": "1,2"}` (retention, wait seconds) is also
/// accepted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawOverride {
    pub glob: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_count: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_seconds: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl RawOverride {
    pub fn new(glob: impl Into<String>, retention_count: u32, wait_seconds: u64) -> Self {
        Self {
            glob: glob.into(),
            retention_count: Some(retention_count.into()),
            wait_seconds: Some(wait_seconds.into()),
            value: None,
        }
    }
}

/// Why an override entry was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideDiagnostic {
    pub glob: String,
    pub reason: String,
}

impl fmt::Display for OverrideDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse error: [{}]: {}", self.glob, self.reason)
    }
}

/// A compiled override rule.
#[derive(Debug, Clone)]
pub struct OverrideRule {
    pub pattern: String,
    pub retention_count: u32,
    pub wait: Duration,
    matcher: GlobMatcher,
    match_file_name: bool,
}

impl OverrideRule {
    /// Compile a rule. `*` does not cross path separators; a pattern with no
    /// `/` is also tried against the file name.
    pub fn new(pattern: &str, retention_count: u32, wait: Duration) -> Result<Self, String> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| format!("invalid glob: {e}"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            retention_count,
            wait,
            matcher: glob.compile_matcher(),
            match_file_name: !pattern.contains('/'),
        })
    }

    pub fn is_match(&self, path: &Path) -> bool {
        if self.matcher.is_match(path) {
            return true;
        }
        self.match_file_name
            && path
                .file_name()
                .is_some_and(|name| self.matcher.is_match(Path::new(name)))
    }
}

/// Ordered override rules, first match wins.
#[derive(Debug, Clone, Default)]
pub struct OverrideRules {
    rules: Vec<OverrideRule>,
}

impl OverrideRules {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self { rules }
    }

    /// Compile raw entries, dropping malformed ones.
    pub fn from_raw(raw: &[RawOverride]) -> (Self, Vec<OverrideDiagnostic>) {
        let mut rules = Vec::with_capacity(raw.len());
        let mut diagnostics = Vec::new();
        for entry in raw {
            match compile(entry) {
                Ok(rule) => rules.push(rule),
                Err(reason) => diagnostics.push(OverrideDiagnostic {
                    glob: entry.glob.clone(),
                    reason,
                }),
            }
        }
        (Self { rules }, diagnostics)
    }

    /// First rule whose pattern matches `path`.
    pub fn find(&self, path: &Path) -> Option<&OverrideRule> {
        self.rules.iter().find(|rule| rule.is_match(path))
    }

    /// Like [`find`](Self::find) for callers that may have no path at all.
    /// A missing path is a non-match.
    pub fn find_opt(&self, path: Option<&Path>) -> Option<&OverrideRule> {
        path.and_then(|p| self.find(p))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OverrideRule> {
        self.rules.iter()
    }
}

fn compile(entry: &RawOverride) -> Result<OverrideRule, String> {
    let (retention, wait) = match &entry.value {
        Some(compact) => {
            let mut parts = compact.split(',');
            let retention = parse_count(parts.next().unwrap_or_default())?;
            let wait = parse_count(parts.next().ok_or("missing wait seconds")?)?;
            (retention, wait)
        }
        None => {
            let retention = entry
                .retention_count
                .as_ref()
                .ok_or("missing retentionCount")
                .and_then(|v| count_from_value(v).map_err(|_| "retentionCount is not an integer"))?;
            let wait = entry
                .wait_seconds
                .as_ref()
                .ok_or("missing waitSeconds")
                .and_then(|v| count_from_value(v).map_err(|_| "waitSeconds is not an integer"))?;
            (retention, wait)
        }
    };
    let retention = u32::try_from(retention).map_err(|_| "retention count too large".to_string())?;
    OverrideRule::new(&entry.glob, retention, clamp_wait(Duration::from_secs(wait)))
}

fn count_from_value(value: &serde_json::Value) -> Result<u64, String> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().ok_or_else(|| format!("{n} is not a count")),
        serde_json::Value::String(s) => parse_count(s),
        other => Err(format!("{other} is not a count")),
    }
}

fn parse_count(s: &str) -> Result<u64, String> {
    s.trim()
        .parse::<u64>()
        .map_err(|_| format!("{:?} is not a non-negative integer", s.trim()))
}
