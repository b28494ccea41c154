//! Async driver: runs a [`RetentionScheduler`] against the tokio clock.
//!
//! One task owns the scheduler. Host change notifications and configuration
//! changes arrive as [`HostMessage`]s over an mpsc channel; between messages
//! the task sleeps until the scheduler's next deadline and fires due timers.
//! Everything is delivered serially, so the scheduler itself needs no locks.
//!
//! ```ignore
//! let host = Arc::new(Mutex::new(my_editor_bridge));
//! let scheduler = RetentionScheduler::new(host.clone(), config);
//! let (handle, task) = driver::spawn(scheduler);
//!
//! // From the editor's tab-change callback:
//! handle.send(HostMessage::Changed(event)).await?;
//!
//! // On configuration change:
//! handle.send(HostMessage::Reconfigure(new_config)).await?;
//!
//! handle.send(HostMessage::Shutdown).await?;
//! let scheduler = task.await?;
//! ```

use crate::config::RetentionConfig;
use crate::history::HistorySink;
use crate::host::{TabChangeEvent, TabHost, TabScope};
use crate::scheduler::RetentionScheduler;
use crate::tab::Tab;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Capacity of the driver's inbound channel.
const CHANNEL_CAPACITY: usize = 256;

/// Messages from the host to the driver.
#[derive(Debug, Clone)]
pub enum HostMessage {
    Changed(TabChangeEvent),
    /// Restart the scheduler with new settings.
    Reconfigure(RetentionConfig),
    Shutdown,
}

/// Sending side of a running driver.
#[derive(Clone)]
pub struct DriverHandle {
    tx: mpsc::Sender<HostMessage>,
}

impl DriverHandle {
    pub async fn send(&self, message: HostMessage) -> Result<(), String> {
        self.tx
            .send(message)
            .await
            .map_err(|_| "Retention driver has stopped".to_string())
    }

    pub async fn changed(&self, event: TabChangeEvent) -> Result<(), String> {
        self.send(HostMessage::Changed(event)).await
    }

    pub async fn shutdown(&self) -> Result<(), String> {
        self.send(HostMessage::Shutdown).await
    }
}

/// Spawn [`run`] on the current tokio runtime.
///
/// The join handle yields the stopped scheduler, e.g. to inspect history.
pub fn spawn<H, S>(
    scheduler: RetentionScheduler<H, S>,
) -> (DriverHandle, JoinHandle<RetentionScheduler<H, S>>)
where
    H: TabHost + Send + 'static,
    S: HistorySink + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let task = tokio::spawn(run(scheduler, rx));
    (DriverHandle { tx }, task)
}

/// Start the scheduler and serve messages and timers until
/// [`HostMessage::Shutdown`] or until every sender is dropped.
pub async fn run<H: TabHost, S: HistorySink>(
    mut scheduler: RetentionScheduler<H, S>,
    mut rx: mpsc::Receiver<HostMessage>,
) -> RetentionScheduler<H, S> {
    scheduler.start(now());
    loop {
        let deadline = scheduler.next_deadline();
        tokio::select! {
            message = rx.recv() => match message {
                Some(HostMessage::Changed(event)) => scheduler.handle_change(&event, now()),
                Some(HostMessage::Reconfigure(config)) => {
                    info!("Configuration changed, restarting");
                    scheduler.restart(config, now());
                }
                Some(HostMessage::Shutdown) | None => break,
            },
            _ = sleep_until(deadline) => {
                let reports = scheduler.fire_due(now());
                debug!("Fired {} timer(s)", reports.len());
                // Closing tabs makes the host report them closed.
                for event in scheduler.host_mut().drain_events() {
                    scheduler.handle_change(&event, now());
                }
            }
        }
    }
    scheduler.stop();
    scheduler
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// A host shared between the driver task and the code that mutates it.
impl<H: TabHost> TabHost for Arc<Mutex<H>> {
    fn list_tabs(&self, scope: TabScope) -> Vec<Tab> {
        self.lock()
            .unwrap_or_else(|e| e.into_inner())
            .list_tabs(scope)
    }

    fn close_tab(&mut self, tab: &Tab) {
        self.lock().unwrap_or_else(|e| e.into_inner()).close_tab(tab)
    }

    fn drain_events(&mut self) -> Vec<TabChangeEvent> {
        self.lock().unwrap_or_else(|e| e.into_inner()).drain_events()
    }
}
