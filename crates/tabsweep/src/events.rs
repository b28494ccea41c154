//! Scheduler events and handlers.
//!
//! The [`RetentionScheduler`](crate::scheduler::RetentionScheduler) reports
//! every timer transition through [`SchedulerEvent`] variants. Callers
//! implement [`EventHandler`] to observe them for logging, UI updates or
//! test assertions.
//!
//! # Choosing an event handler
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Silence |
//! | [`LoggingHandler`] | Structured logging via `tracing` (the default) |
//! | [`FnEventHandler`] | Quick closures, e.g. collecting events in tests |
//! | [`CompositeEventHandler`] | Compose multiple handlers in order |

use crate::identity::TabKey;
use crate::overrides::OverrideDiagnostic;
use crate::policy::KeepReason;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

// ── Events ─────────────────────────────────────────────────────────

/// Events emitted by the scheduler.
#[derive(Debug)]
pub enum SchedulerEvent<'a> {
    /// Tracking began for every open tab.
    Started { tracked: usize },
    /// All timers were cancelled.
    Stopped { cancelled: usize },
    /// A timer was armed (or re-armed) for a tab.
    Armed {
        key: &'a TabKey,
        period: Duration,
        /// Whether an older timer under the same key was replaced.
        replaced: bool,
        overridden_by: Option<&'a str>,
    },
    /// A timer was cancelled because its tab closed.
    Cancelled { key: &'a TabKey },
    /// A tick left the tab open; the timer keeps firing at the same period.
    Kept {
        key: &'a TabKey,
        position: usize,
        threshold: usize,
        reason: KeepReason,
    },
    /// A tick closed the tab.
    Evicted {
        key: &'a TabKey,
        label: &'a str,
        position: usize,
        threshold: usize,
    },
    /// A tick found the tab already gone.
    Gone { key: &'a TabKey },
    /// An override rule was dropped while loading configuration.
    OverrideRejected(&'a OverrideDiagnostic),
}

/// Handler for scheduler events.
///
/// Handlers are called synchronously from inside the scheduler and must not
/// block.
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: &SchedulerEvent<'_>) {
        let _ = event;
    }
}

/// Ignores everything.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// # Example
///
/// ```ignore
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// let handler = FnEventHandler::new(move |event| {
///     if let SchedulerEvent::Evicted { label, .. } = event {
///         sink.lock().unwrap().push(label.to_string());
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&SchedulerEvent<'_>) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&SchedulerEvent<'_>) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&SchedulerEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &SchedulerEvent<'_>) {
        (self.0)(event)
    }
}

/// Delegates to multiple handlers in registration order.
///
/// ```ignore
/// let handler = CompositeEventHandler::new()
///     .with(LoggingHandler)
///     .with_if(verbose, my_recorder);
/// ```
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn EventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn with(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Conditionally add a handler; a `false` condition is a no-op.
    pub fn with_if(self, condition: bool, handler: impl EventHandler + 'static) -> Self {
        if condition { self.with(handler) } else { self }
    }
}

impl Default for CompositeEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for CompositeEventHandler {
    fn on_event(&self, event: &SchedulerEvent<'_>) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// An event handler that logs events via `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &SchedulerEvent<'_>) {
        match event {
            SchedulerEvent::Started { tracked } => {
                info!("Tab retention started, tracking {tracked} tab(s)");
            }
            SchedulerEvent::Stopped { cancelled } => {
                info!("Tab retention stopped, cancelled {cancelled} timer(s)");
            }
            SchedulerEvent::Armed {
                key,
                period,
                replaced,
                overridden_by,
            } => {
                let verb = if *replaced { "Reset" } else { "Armed" };
                match overridden_by {
                    Some(pattern) => {
                        debug!("{verb}: {key} every {}s (override {pattern})", period.as_secs())
                    }
                    None => debug!("{verb}: {key} every {}s", period.as_secs()),
                }
            }
            SchedulerEvent::Cancelled { key } => {
                debug!("Cancel: {key}");
            }
            SchedulerEvent::Kept {
                key,
                position,
                threshold,
                reason,
            } => {
                trace!("Keep: {key} position={position} threshold={threshold} ({reason:?})");
            }
            SchedulerEvent::Evicted {
                key,
                position,
                threshold,
                ..
            } => {
                info!("Close: {key} (position {position} >= {threshold})");
            }
            SchedulerEvent::Gone { key } => {
                debug!("Gone: {key}");
            }
            SchedulerEvent::OverrideRejected(diagnostic) => {
                warn!("{diagnostic}");
            }
        }
    }
}
