//! Offline simulation: replay a scripted tab session on a virtual clock.
//!
//! A [`Scenario`] is a configuration plus a list of [`Step`]s. Steps mutate
//! an [`InMemoryHost`] and forward the resulting change events to a
//! [`RetentionScheduler`]; `advance` steps move the clock forward, firing
//! every timer that falls due on the way at its exact deadline. Nothing
//! sleeps, so a ten-hour session replays instantly.
//!
//! # Examples
//!
//! ```json
//! {
//!   "config": { "retentionCount": 2, "waitSeconds": 60 },
//!   "steps": [
//!     { "op": "open", "label": "a.rs", "uri": "file:///src/a.rs" },
//!     { "op": "open", "label": "b.rs", "uri": "file:///src/b.rs" },
//!     { "op": "open", "label": "c.rs", "uri": "file:///src/c.rs" },
//!     { "op": "advance", "seconds": 61 }
//!   ]
//! }
//! ```
//!
//! Tabs are addressed by label; the first tab with that label wins.

use crate::config::RetentionConfig;
use crate::events::{EventHandler, LoggingHandler};
use crate::history::ClosedTab;
use crate::host::{InMemoryHost, TabChangeEvent, TabHost};
use crate::identity::TabKey;
use crate::policy::Decision;
use crate::scheduler::RetentionScheduler;
use crate::tab::{Tab, TabInput};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// A scripted session.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Scenario {
    #[serde(default)]
    pub config: RetentionConfig,
    pub steps: Vec<Step>,
}

fn default_column() -> u32 {
    1
}

fn yes() -> bool {
    true
}

/// One scripted action.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Open a tab at the end of its column. `input` wins over `uri`; with
    /// neither the tab has no resource and is keyed by label.
    Open {
        label: String,
        #[serde(default)]
        uri: Option<Url>,
        #[serde(default)]
        input: Option<TabInput>,
        #[serde(default = "default_column")]
        column: u32,
        #[serde(default)]
        dirty: bool,
        #[serde(default)]
        active: bool,
        #[serde(default)]
        pinned: bool,
    },
    Close {
        label: String,
    },
    Dirty {
        label: String,
        #[serde(default = "yes")]
        dirty: bool,
    },
    Activate {
        label: String,
    },
    Pin {
        label: String,
        #[serde(default = "yes")]
        pinned: bool,
    },
    /// Reorder within the column (`position`) and/or move to another
    /// column (`column`, appended at its end).
    Move {
        label: String,
        #[serde(default)]
        column: Option<u32>,
        #[serde(default)]
        position: Option<usize>,
    },
    Advance {
        seconds: u64,
    },
}

impl Step {
    fn open_tab(&self) -> Option<Tab> {
        let Step::Open {
            label,
            uri,
            input,
            column,
            dirty,
            active,
            pinned,
        } = self
        else {
            return None;
        };
        let input = match (input, uri) {
            (Some(input), _) => input.clone(),
            (None, Some(uri)) => TabInput::Text { uri: uri.clone() },
            (None, None) => TabInput::Unknown { uri: None },
        };
        Some(
            Tab::new(label.clone(), input, *column)
                .with_dirty(*dirty)
                .with_active(*active)
                .with_pinned(*pinned),
        )
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        Self::from_json(&text).map_err(|e| format!("Failed to parse {}: {e}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| e.to_string())
    }

    pub fn with_config(mut self, config: RetentionConfig) -> Self {
        self.config = config;
        self
    }
}

/// One eviction observed during a run.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SimEviction {
    /// Virtual seconds since the scenario started.
    pub at_seconds: u64,
    pub key: String,
    pub label: String,
}

/// Outcome of [`run_scenario`].
#[derive(Serialize, Debug, Clone)]
pub struct SimReport {
    pub elapsed_seconds: u64,
    pub evictions: Vec<SimEviction>,
    /// Tabs still open at the end, column-ordered.
    pub tabs: Vec<Tab>,
    pub history: Vec<ClosedTab>,
}

impl SimReport {
    pub fn evicted_labels(&self) -> Vec<&str> {
        self.evictions.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn open_labels(&self) -> Vec<&str> {
        self.tabs.iter().map(|t| t.label.as_str()).collect()
    }
}

/// Replay `scenario`, logging scheduler events through [`LoggingHandler`].
pub fn run_scenario(scenario: &Scenario) -> Result<SimReport, String> {
    run_scenario_with_handler(scenario, LoggingHandler)
}

pub fn run_scenario_with_handler(
    scenario: &Scenario,
    handler: impl EventHandler + 'static,
) -> Result<SimReport, String> {
    let mut sim = Simulation::new(scenario.config.clone(), handler);
    for (index, step) in scenario.steps.iter().enumerate() {
        sim.apply(step)
            .map_err(|e| format!("Step {} ({}): {e}", index + 1, step_name(step)))?;
    }
    Ok(sim.finish())
}

fn step_name(step: &Step) -> &'static str {
    match step {
        Step::Open { .. } => "open",
        Step::Close { .. } => "close",
        Step::Dirty { .. } => "dirty",
        Step::Activate { .. } => "activate",
        Step::Pin { .. } => "pin",
        Step::Move { .. } => "move",
        Step::Advance { .. } => "advance",
    }
}

struct Simulation {
    scheduler: RetentionScheduler<InMemoryHost>,
    origin: Instant,
    now: Instant,
    evictions: Vec<SimEviction>,
}

impl Simulation {
    fn new(config: RetentionConfig, handler: impl EventHandler + 'static) -> Self {
        let origin = Instant::now();
        let mut scheduler =
            RetentionScheduler::new(InMemoryHost::new(), config).with_event_handler(handler);
        scheduler.start(origin);
        Self {
            scheduler,
            origin,
            now: origin,
            evictions: Vec::new(),
        }
    }

    fn key(&self, label: &str) -> Result<TabKey, String> {
        self.scheduler
            .host()
            .key_of(label)
            .ok_or_else(|| format!("no open tab labelled '{label}'"))
    }

    fn apply(&mut self, step: &Step) -> Result<(), String> {
        let event = match step {
            Step::Open { .. } => match step.open_tab() {
                Some(tab) => self.scheduler.host_mut().open(tab),
                None => TabChangeEvent::default(),
            },
            Step::Close { label } => {
                let key = self.key(label)?;
                self.scheduler.host_mut().close(&key)
            }
            Step::Dirty { label, dirty } => {
                let key = self.key(label)?;
                self.scheduler.host_mut().set_dirty(&key, *dirty)
            }
            Step::Activate { label } => {
                let key = self.key(label)?;
                self.scheduler.host_mut().set_active(&key)
            }
            Step::Pin { label, pinned } => {
                let key = self.key(label)?;
                self.scheduler.host_mut().set_pinned(&key, *pinned)
            }
            Step::Move {
                label,
                column,
                position,
            } => self.move_tab(label, *column, *position)?,
            Step::Advance { seconds } => {
                self.advance(Duration::from_secs(*seconds));
                return Ok(());
            }
        };
        self.scheduler.handle_change(&event, self.now);
        Ok(())
    }

    fn move_tab(
        &mut self,
        label: &str,
        column: Option<u32>,
        position: Option<usize>,
    ) -> Result<TabChangeEvent, String> {
        let mut key = self.key(label)?;
        let mut event = TabChangeEvent::default();
        if let Some(column) = column.filter(|c| *c != key.column) {
            event.merge(self.scheduler.host_mut().move_to_column(&key, column));
            key = self.key(label)?;
        }
        if let Some(position) = position {
            event.merge(self.scheduler.host_mut().reorder(&key, position));
        }
        Ok(event)
    }

    /// Move the clock forward, firing timers at their exact deadlines.
    fn advance(&mut self, by: Duration) {
        let target = self.now + by;
        while let Some(deadline) = self.scheduler.next_deadline().filter(|d| *d <= target) {
            self.now = deadline.max(self.now);
            for report in self.scheduler.fire_due(self.now) {
                if let Decision::Evict { tab, .. } = &report.decision {
                    self.evictions.push(SimEviction {
                        at_seconds: self.elapsed().as_secs(),
                        key: report.key.to_string(),
                        label: tab.label.clone(),
                    });
                }
            }
            for event in self.scheduler.host_mut().drain_events() {
                self.scheduler.handle_change(&event, self.now);
            }
        }
        self.now = target;
        debug!("Virtual clock at {}s", self.elapsed().as_secs());
    }

    fn elapsed(&self) -> Duration {
        self.now.duration_since(self.origin)
    }

    fn finish(mut self) -> SimReport {
        self.scheduler.stop();
        SimReport {
            elapsed_seconds: self.elapsed().as_secs(),
            evictions: self.evictions,
            tabs: self.scheduler.host().tabs().to_vec(),
            history: self.scheduler.history().entries().to_vec(),
        }
    }
}
