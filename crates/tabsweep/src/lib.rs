//! Positional tab retention for code editors.
//!
//! `tabsweep` closes editor tabs that have sat idle outside the front of
//! their column. Each column keeps its first `retention_count` tabs (plus one
//! slot per pinned tab); every other tab gets a repeating timer and is closed
//! when its timer fires while it is still out of range. Touching a tab
//! (opening, saving, dragging, activating) restarts its timer. Dirty and
//! active tabs are protected unless explicitly allowed, and per-path glob
//! overrides tune the retention count and wait for matching files.
//!
//! # Getting started
//!
//! ```ignore
//! use tabsweep::prelude::*;
//! use std::time::Instant;
//!
//! let host = InMemoryHost::with_tabs(tabs);
//! let config = RetentionConfig::default()
//!     .with_retention_count(5)
//!     .with_override(RawOverride::new("*.log", 1, 30));
//!
//! let mut scheduler = RetentionScheduler::new(host, config);
//! scheduler.start(Instant::now());
//!
//! // Later, whenever the next deadline has passed:
//! for report in scheduler.fire_due(Instant::now()) {
//!     println!("{} -> {:?}", report.key, report.decision);
//! }
//! ```
//!
//! For a real editor, implement [`TabHost`](host::TabHost) over its tab API
//! and hand the scheduler to [`driver::spawn`], which runs timers on the
//! tokio clock and takes change notifications over a channel.
//!
//! # Where to find things
//!
//! - **Describe tabs:** [`Tab`](tab::Tab) and [`TabInput`](tab::TabInput).
//! - **Identify tabs across events:** [`TabKey`](identity::TabKey).
//! - **Talk to the editor:** the [`TabHost`](host::TabHost) trait;
//!   [`InMemoryHost`](host::InMemoryHost) for tests and simulation.
//! - **Decide keep or close:** [`EvictionPolicy`](policy::EvictionPolicy).
//! - **Per-path tuning:** [`OverrideRules`](overrides::OverrideRules).
//! - **Run timers:** [`RetentionScheduler`](scheduler::RetentionScheduler)
//!   (synchronous, caller-supplied clock) and [`driver`] (tokio).
//! - **Observe decisions:** implement [`EventHandler`](events::EventHandler);
//!   [`LoggingHandler`](events::LoggingHandler) logs through `tracing`.
//! - **Reopen what was closed:** [`ClosedTabHistory`](history::ClosedTabHistory).
//! - **Try a configuration offline:** [`sim::run_scenario`].
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`tab`] | Tab model and inputs |
//! | [`identity`] | Stable tab keys |
//! | [`host`] | Host editor interface, change events, in-memory host |
//! | [`overrides`] | Glob-based per-path overrides |
//! | [`policy`] | Keep/evict decision |
//! | [`scheduler`] | Per-tab timers and the retention lifecycle |
//! | [`driver`] | Tokio event loop around the scheduler |
//! | [`events`] | Scheduler events and handlers |
//! | [`config`] | JSON configuration |
//! | [`history`] | Closed-tab history |
//! | [`sim`] | Virtual-clock scenario runner |

pub mod config;
pub mod driver;
pub mod events;
pub mod history;
pub mod host;
pub mod identity;
pub mod overrides;
pub mod policy;
pub mod prelude;
pub mod scheduler;
pub mod sim;
pub mod tab;

/// Tabs retained per column when nothing overrides it.
pub const DEFAULT_RETENTION_COUNT: u32 = 8;

/// Seconds between eviction checks when nothing overrides it.
pub const DEFAULT_WAIT_SECONDS: u64 = 600;

/// Closed tabs remembered in history. `0` keeps everything.
pub const DEFAULT_MAX_HISTORY: usize = 20;

pub use config::RetentionConfig;
pub use host::{InMemoryHost, TabChangeEvent, TabHost, TabScope};
pub use identity::TabKey;
pub use scheduler::RetentionScheduler;
pub use tab::{Tab, TabInput};
