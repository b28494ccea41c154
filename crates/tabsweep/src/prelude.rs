//! Convenience re-exports for common `tabsweep` types.
//!
//! ```ignore
//! use tabsweep::prelude::*;
//! ```
//!
//! Covers the host model, configuration, scheduler and event handlers.
//! Timer internals and simulator types are left out; import those from
//! their modules when needed.

// ── Host model ──────────────────────────────────────────────────────
pub use crate::host::{InMemoryHost, TabChangeEvent, TabHost, TabScope};
pub use crate::identity::{KeyKind, TabKey};
pub use crate::tab::{Tab, TabInput};

// ── Configuration ───────────────────────────────────────────────────
pub use crate::config::RetentionConfig;
pub use crate::overrides::{OverrideDiagnostic, OverrideRules, RawOverride};
pub use crate::policy::{Decision, EvictionPolicy, KeepReason, PinnedScope};

// ── Runtime ─────────────────────────────────────────────────────────
pub use crate::driver::{DriverHandle, HostMessage};
pub use crate::scheduler::{RetentionScheduler, TickReport};

// ── Observation ─────────────────────────────────────────────────────
pub use crate::events::{
    CompositeEventHandler, EventHandler, FnEventHandler, LoggingHandler, NoopHandler,
    SchedulerEvent,
};
pub use crate::history::{ClosedTab, ClosedTabHistory, HistorySink};
