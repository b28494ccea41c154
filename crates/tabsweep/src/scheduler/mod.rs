//! The tab retention scheduler.
//!
//! [`RetentionScheduler`] owns one repeating timer per tracked tab, keyed by
//! [`TabKey`]. Change events re-arm or cancel timers; every timer tick asks
//! the host for a fresh tab list, runs the [`EvictionPolicy`] and either
//! closes the tab (recording it in history) or lets the timer keep firing.
//!
//! The scheduler is synchronous and clock-agnostic: callers pass `now` into
//! every operation and call [`fire_due`](RetentionScheduler::fire_due) when
//! [`next_deadline`](RetentionScheduler::next_deadline) passes. The async
//! [`driver`](crate::driver) does that against the tokio clock; the
//! [`sim`](crate::sim) does it against a virtual one.
//!
//! Invariant: at most one timer per key. Arming a key that is already
//! tracked replaces its timer in place; closing a key removes it before the
//! key can be reused. Deadlines live in a [`TimerQueue`]; an entry whose
//! generation or deadline no longer matches its tracked timer is stale and
//! never fires.

pub mod queue;
pub mod timer;

use crate::config::RetentionConfig;
use crate::events::{EventHandler, LoggingHandler, SchedulerEvent};
use crate::history::{ClosedTabHistory, HistorySink};
use crate::host::{TabChangeEvent, TabHost, TabScope};
use crate::identity::TabKey;
use crate::overrides::{OverrideDiagnostic, OverrideRules};
use crate::policy::{Decision, EvictionPolicy};
use crate::tab::Tab;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use queue::{QueueEntry, TimerQueue};
use timer::{TimerState, Transition};

/// Stale queue entries tolerated beyond the live count before compacting.
const QUEUE_SLACK: usize = 64;

/// Scheduler-owned state for one tab.
#[derive(Debug, Clone)]
pub struct TrackedTab {
    pub key: TabKey,
    /// The tab as last reported by the host.
    pub tab: Tab,
    /// Retention count from a matching override rule.
    pub retention: Option<u32>,
    /// Pattern of the matching override rule.
    pub override_pattern: Option<String>,
    pub state: TimerState,
}

impl TrackedTab {
    pub fn period(&self) -> Option<Duration> {
        self.state.timer().map(|t| t.period())
    }

    pub fn next_fire(&self) -> Option<Instant> {
        self.state.timer().map(|t| t.next_fire())
    }
}

/// What one timer tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub key: TabKey,
    pub at: Instant,
    pub decision: Decision,
}

impl TickReport {
    pub fn evicted(&self) -> bool {
        matches!(self.decision, Decision::Evict { .. })
    }
}

/// Positional TTL eviction over a host's tabs.
pub struct RetentionScheduler<H: TabHost, S: HistorySink = ClosedTabHistory> {
    host: H,
    history: S,
    config: RetentionConfig,
    policy: EvictionPolicy,
    rules: OverrideRules,
    diagnostics: Vec<OverrideDiagnostic>,
    tracked: HashMap<TabKey, TrackedTab>,
    queue: TimerQueue,
    next_generation: u64,
    started: bool,
    handler: Box<dyn EventHandler>,
}

impl<H: TabHost> RetentionScheduler<H> {
    /// Scheduler recording evictions into a [`ClosedTabHistory`] sized by
    /// `config.max_history`.
    pub fn new(host: H, config: RetentionConfig) -> Self {
        let history = ClosedTabHistory::new(config.max_history);
        Self::with_history(host, history, config)
    }
}

impl<H: TabHost, S: HistorySink> RetentionScheduler<H, S> {
    pub fn with_history(host: H, history: S, config: RetentionConfig) -> Self {
        Self {
            host,
            history,
            policy: config.policy(),
            config,
            rules: OverrideRules::default(),
            diagnostics: Vec::new(),
            tracked: HashMap::new(),
            queue: TimerQueue::new(),
            next_generation: 1,
            started: false,
            handler: Box::new(LoggingHandler),
        }
    }

    /// Replace the event handler (default: [`LoggingHandler`]).
    pub fn with_event_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handler = Box::new(handler);
        self
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Begin tracking every open tab. Returns the number of timers armed.
    ///
    /// Calling `start` on a running scheduler stops it first, so no key ends
    /// up with two timers. Override rules are compiled here, once per
    /// configuration cycle; dropped rules are reported as
    /// [`SchedulerEvent::OverrideRejected`]. A disabled configuration tracks
    /// nothing.
    pub fn start(&mut self, now: Instant) -> usize {
        if self.started {
            self.stop();
        }
        self.policy = self.config.policy();
        let (rules, diagnostics) = self.config.override_rules();
        self.rules = rules;
        self.diagnostics = diagnostics;
        for diagnostic in &self.diagnostics {
            self.handler
                .on_event(&SchedulerEvent::OverrideRejected(diagnostic));
        }

        if !self.config.enabled {
            return 0;
        }
        self.started = true;
        let tabs = self.host.list_tabs(TabScope::All);
        for tab in &tabs {
            self.arm(tab, now);
        }
        let tracked = self.tracked.len();
        self.handler.on_event(&SchedulerEvent::Started { tracked });
        tracked
    }

    /// Apply a new configuration: stop, swap settings, start again.
    pub fn restart(&mut self, config: RetentionConfig, now: Instant) -> usize {
        self.history.resize(config.max_history);
        self.config = config;
        self.start(now)
    }

    /// Cancel every timer and forget all tracked tabs. Safe to call at any
    /// time, any number of times.
    pub fn stop(&mut self) -> usize {
        let was_started = std::mem::replace(&mut self.started, false);
        let keys: Vec<TabKey> = self.tracked.keys().cloned().collect();
        let cancelled = keys
            .iter()
            .filter_map(|key| self.retire(key, Transition::Cancel))
            .count();
        self.queue.clear();
        if was_started || cancelled > 0 {
            self.handler.on_event(&SchedulerEvent::Stopped { cancelled });
        }
        cancelled
    }

    // ── Change events ──────────────────────────────────────────────

    /// Apply one host change batch: changed, then opened, then closed.
    pub fn handle_change(&mut self, event: &TabChangeEvent, now: Instant) {
        self.on_tabs_changed(&event.changed, now);
        self.on_tabs_opened(&event.opened, now);
        self.on_tabs_closed(&event.closed);
    }

    pub fn on_tabs_opened(&mut self, tabs: &[Tab], now: Instant) {
        self.rearm_all(tabs, now);
    }

    pub fn on_tabs_changed(&mut self, tabs: &[Tab], now: Instant) {
        self.rearm_all(tabs, now);
    }

    pub fn on_tabs_closed(&mut self, tabs: &[Tab]) {
        for tab in tabs {
            let key = TabKey::of(tab);
            if self.retire(&key, Transition::Cancel).is_some() {
                self.handler.on_event(&SchedulerEvent::Cancelled { key: &key });
            }
        }
    }

    fn rearm_all(&mut self, tabs: &[Tab], now: Instant) {
        if !self.started {
            return;
        }
        for tab in tabs {
            self.arm(tab, now);
        }
    }

    /// Arm (or re-arm) the timer for `tab`, replacing any existing one.
    fn arm(&mut self, tab: &Tab, now: Instant) {
        let key = TabKey::of(tab);
        let rule = self.rules.find_opt(tab.fs_path().as_deref());
        let period = rule.map_or(self.config.wait(), |r| r.wait);
        let retention = rule.map(|r| r.retention_count);
        let override_pattern = rule.map(|r| r.pattern.clone());

        let generation = self.next_generation;
        self.next_generation += 1;
        let reset = Transition::Reset {
            period,
            generation,
            now,
        };

        let replaced = match self.tracked.get_mut(&key) {
            Some(tracked) => {
                tracked.tab = tab.clone();
                tracked.retention = retention;
                tracked.override_pattern = override_pattern;
                tracked.state = tracked.state.step(reset);
                true
            }
            None => {
                self.tracked.insert(
                    key.clone(),
                    TrackedTab {
                        key: key.clone(),
                        tab: tab.clone(),
                        retention,
                        override_pattern,
                        state: TimerState::Terminated.step(reset),
                    },
                );
                false
            }
        };

        let tracked = &self.tracked[&key];
        if let Some(timer) = tracked.state.timer() {
            self.queue
                .push(timer.next_fire(), timer.generation(), key.clone());
        }
        self.discard_stale();

        let tracked = &self.tracked[&key];
        self.handler.on_event(&SchedulerEvent::Armed {
            key: &key,
            period: tracked.period().unwrap_or(period),
            replaced,
            overridden_by: tracked.override_pattern.as_deref(),
        });
    }

    // ── Timers ─────────────────────────────────────────────────────

    /// Earliest pending timer deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.peek().map(|entry| entry.deadline)
    }

    /// Fire every timer due at or before `now`, earliest first.
    ///
    /// Each tick re-reads the host's tab list, so an eviction earlier in the
    /// batch is visible to later ticks.
    pub fn fire_due(&mut self, now: Instant) -> Vec<TickReport> {
        let mut reports = Vec::new();
        while let Some(entry) = self.queue.pop_due(now) {
            if is_live(&self.tracked, &entry) {
                reports.push(self.tick(entry.key, now));
            }
        }
        self.discard_stale();
        reports
    }

    /// Remove `key` from tracking, driving its timer to a terminal state.
    fn retire(&mut self, key: &TabKey, transition: Transition) -> Option<TrackedTab> {
        let mut tracked = self.tracked.remove(key)?;
        tracked.state = tracked.state.step(transition);
        self.discard_stale();
        Some(tracked)
    }

    /// Keep the queue head live so [`next_deadline`](Self::next_deadline)
    /// can peek.
    fn discard_stale(&mut self) {
        let tracked = &self.tracked;
        self.queue.discard_stale(|entry| is_live(tracked, entry));
        if self.queue.len() > 2 * tracked.len() + QUEUE_SLACK {
            self.queue.compact(|entry| is_live(tracked, entry));
        }
    }

    fn tick(&mut self, key: TabKey, now: Instant) -> TickReport {
        let tabs = self.host.list_tabs(TabScope::All);
        let retention = self.tracked.get(&key).and_then(|t| t.retention);
        let decision = self.policy.decide(&tabs, &key, retention);

        match &decision {
            Decision::Keep {
                position,
                threshold,
                reason,
            } => {
                if let Some(tracked) = self.tracked.get_mut(&key) {
                    tracked.state = tracked.state.step(Transition::Keep { now });
                    if let Some(timer) = tracked.state.timer() {
                        self.queue
                            .push(timer.next_fire(), timer.generation(), key.clone());
                    }
                }
                self.handler.on_event(&SchedulerEvent::Kept {
                    key: &key,
                    position: *position,
                    threshold: *threshold,
                    reason: *reason,
                });
            }
            Decision::Evict {
                tab,
                position,
                threshold,
            } => {
                self.retire(&key, Transition::Evict);
                self.host.close_tab(tab);
                self.history.record_evicted(tab.primary_uri(), &tab.label);
                self.handler.on_event(&SchedulerEvent::Evicted {
                    key: &key,
                    label: &tab.label,
                    position: *position,
                    threshold: *threshold,
                });
            }
            Decision::Gone => {
                self.retire(&key, Transition::Gone);
                self.handler.on_event(&SchedulerEvent::Gone { key: &key });
            }
        }

        TickReport {
            key,
            at: now,
            decision,
        }
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Number of live timers (one per tracked key).
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    pub fn tracked(&self, key: &TabKey) -> Option<&TrackedTab> {
        self.tracked.get(key)
    }

    pub fn tracked_tabs(&self) -> impl Iterator<Item = &TrackedTab> {
        self.tracked.values()
    }

    /// Override rules dropped during the last [`start`](Self::start).
    pub fn diagnostics(&self) -> &[OverrideDiagnostic] {
        &self.diagnostics
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn history(&self) -> &S {
        &self.history
    }
}

/// Whether a queue entry still matches its tracked timer.
fn is_live(tracked: &HashMap<TabKey, TrackedTab>, entry: &QueueEntry) -> bool {
    tracked
        .get(&entry.key)
        .and_then(|t| t.state.timer())
        .is_some_and(|timer| {
            timer.generation() == entry.generation && timer.next_fire() == entry.deadline
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{FnEventHandler, NoopHandler};
    use crate::host::InMemoryHost;
    use crate::overrides::RawOverride;
    use std::sync::{Arc, Mutex};
    use url::Url;

    const SEC: Duration = Duration::from_secs(1);

    fn tab(name: &str, column: u32) -> Tab {
        Tab::text(name, Url::parse(&format!("file:///w/{name}")).unwrap(), column)
    }

    fn host_with(n: usize) -> InMemoryHost {
        InMemoryHost::with_tabs((0..n).map(|i| tab(&format!("t{i}"), 1)))
    }

    fn scheduler(host: InMemoryHost, config: RetentionConfig) -> RetentionScheduler<InMemoryHost> {
        RetentionScheduler::new(host, config).with_event_handler(NoopHandler)
    }

    #[test]
    fn start_tracks_every_tab_and_restart_does_not_duplicate() {
        let t0 = Instant::now();
        let mut s = scheduler(host_with(4), RetentionConfig::default());
        assert_eq!(s.start(t0), 4);
        assert_eq!(s.start(t0 + SEC), 4);
        assert_eq!(s.tracked_len(), 4);
    }

    #[test]
    fn stop_is_idempotent_and_safe_before_start() {
        let mut s = scheduler(host_with(3), RetentionConfig::default());
        assert_eq!(s.stop(), 0);
        s.start(Instant::now());
        assert_eq!(s.stop(), 3);
        assert_eq!(s.stop(), 0);
        assert_eq!(s.tracked_len(), 0);
        assert!(!s.is_started());
        assert!(s.next_deadline().is_none());
    }

    #[test]
    fn disabled_config_tracks_nothing() {
        let t0 = Instant::now();
        let mut s = scheduler(host_with(3), RetentionConfig::disabled());
        assert_eq!(s.start(t0), 0);
        s.on_tabs_opened(&[tab("late", 1)], t0);
        assert_eq!(s.tracked_len(), 0);
    }

    #[test]
    fn repeated_changes_leave_one_timer_with_last_period() {
        let t0 = Instant::now();
        let config = RetentionConfig::default()
            .with_wait_seconds(10)
            .with_override(RawOverride::new("*.log", 1, 2));
        let mut s = scheduler(host_with(1), config);
        s.start(t0);

        let log = tab("app.log", 1);
        s.host_mut().open(log.clone());
        for i in 0..5 {
            s.on_tabs_changed(&[log.clone().with_dirty(i % 2 == 0)], t0 + SEC * i);
        }
        assert_eq!(s.tracked_len(), 2);
        let tracked = s.tracked(&TabKey::of(&log)).unwrap();
        assert_eq!(tracked.period(), Some(2 * SEC));
        assert_eq!(tracked.next_fire(), Some(t0 + 4 * SEC + 2 * SEC));
        assert_eq!(tracked.override_pattern.as_deref(), Some("*.log"));
    }

    #[test]
    fn keep_then_evict_when_pushed_back() {
        let t0 = Instant::now();
        let config = RetentionConfig::default()
            .with_retention_count(2)
            .with_wait_seconds(10);
        let mut s = scheduler(host_with(2), config);
        s.start(t0);

        // Both tabs fit; the timers keep firing every period.
        let reports = s.fire_due(t0 + 10 * SEC);
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| !r.evicted()));
        assert_eq!(s.next_deadline(), Some(t0 + 20 * SEC));

        // A third tab pushes nothing back: new tabs open at the end.
        let event = s.host_mut().open(tab("t2", 1));
        s.handle_change(&event, t0 + 12 * SEC);

        // Drag the new tab to the front, pushing t1 to position 2.
        let key = s.host().key_of("t2").unwrap();
        let event = s.host_mut().reorder(&key, 0);
        s.handle_change(&event, t0 + 13 * SEC);

        let reports = s.fire_due(t0 + 20 * SEC);
        let evicted: Vec<&TabKey> = reports.iter().filter(|r| r.evicted()).map(|r| &r.key).collect();
        assert_eq!(evicted, vec![&TabKey::of(&tab("t1", 1))]);
        assert_eq!(s.history().entries()[0].label, "t1");
        assert_eq!(s.host().close_commands(), 1);
        assert_eq!(s.tracked_len(), 2);
    }

    #[test]
    fn closed_event_cancels_timer() {
        let t0 = Instant::now();
        let mut s = scheduler(host_with(3), RetentionConfig::default());
        s.start(t0);
        let key = s.host().key_of("t1").unwrap();
        let event = s.host_mut().close(&key);
        s.handle_change(&event, t0);
        assert!(s.tracked(&key).is_none());
        assert_eq!(s.tracked_len(), 2);
    }

    #[test]
    fn gone_tab_stops_tracking_without_close_or_history() {
        let t0 = Instant::now();
        let config = RetentionConfig::default()
            .with_retention_count(0)
            .with_wait_seconds(5);
        let mut s = scheduler(host_with(3), config);
        s.start(t0);

        // Closed behind the scheduler's back: no event delivered.
        let key = s.host().key_of("t2").unwrap();
        let _ = s.host_mut().close(&key);

        let reports = s.fire_due(t0 + 5 * SEC);
        let gone: Vec<_> = reports.iter().filter(|r| r.decision == Decision::Gone).collect();
        assert_eq!(gone.len(), 1);
        assert_eq!(gone[0].key, key);
        // t1 was evicted, t2 was gone, t0 is kept.
        assert_eq!(s.host().close_commands(), 1);
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.tracked_len(), 1);
    }

    #[test]
    fn events_follow_timer_lifecycle() {
        let t0 = Instant::now();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let handler = FnEventHandler::new(move |event| {
            let name = match event {
                SchedulerEvent::Started { .. } => "started",
                SchedulerEvent::Stopped { .. } => "stopped",
                SchedulerEvent::Armed { replaced: false, .. } => "armed",
                SchedulerEvent::Armed { replaced: true, .. } => "reset",
                SchedulerEvent::Cancelled { .. } => "cancelled",
                SchedulerEvent::Kept { .. } => "kept",
                SchedulerEvent::Evicted { .. } => "evicted",
                SchedulerEvent::Gone { .. } => "gone",
                SchedulerEvent::OverrideRejected(_) => "rejected",
            };
            sink.lock().unwrap().push(name);
        });
        let config = RetentionConfig::default()
            .with_retention_count(1)
            .with_wait_seconds(1)
            .with_override(RawOverride {
                glob: "*.md".into(),
                retention_count: Some("x".into()),
                wait_seconds: Some(1.into()),
                value: None,
            });
        let mut s = RetentionScheduler::new(host_with(2), config).with_event_handler(handler);
        s.start(t0);
        let t0_tab = s.host().tabs()[0].clone();
        s.on_tabs_changed(&[t0_tab], t0);
        s.fire_due(t0 + SEC);
        s.stop();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["rejected", "armed", "armed", "started", "reset", "evicted", "kept", "stopped"]
        );
    }

    #[test]
    fn restart_applies_new_history_cap() {
        let t0 = Instant::now();
        let config = RetentionConfig::default()
            .with_retention_count(0)
            .with_wait_seconds(1)
            .with_active_removal(true);
        let mut s = scheduler(host_with(5), config.clone());
        s.start(t0);
        s.fire_due(t0 + SEC);
        assert_eq!(s.history().len(), 4);

        s.restart(config.with_max_history(2), t0 + 2 * SEC);
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.tracked_len(), 1);
    }

    #[test]
    fn huge_global_wait_is_capped_not_fatal() {
        let t0 = Instant::now();
        let config = RetentionConfig::from_json(r#"{"waitSeconds": 18446744073709551615}"#).unwrap();
        let mut s = scheduler(host_with(2), config);
        assert_eq!(s.start(t0), 2);
        assert_eq!(s.next_deadline(), Some(t0 + crate::config::MAX_WAIT));
        assert!(s.fire_due(t0 + SEC).is_empty());
    }

    #[test]
    fn huge_override_wait_is_capped_not_fatal() {
        let t0 = Instant::now();
        let config = RetentionConfig::default()
            .with_wait_seconds(10)
            .with_override(RawOverride {
                glob: "*.log".into(),
                retention_count: None,
                wait_seconds: None,
                value: Some("1,18446744073709551615".into()),
            });
        let mut s = scheduler(InMemoryHost::with_tabs([tab("app.log", 1)]), config);
        s.start(t0);
        let key = s.host().key_of("app.log").unwrap();
        assert_eq!(s.tracked(&key).unwrap().period(), Some(crate::config::MAX_WAIT));
        let reports = s.fire_due(t0 + crate::config::MAX_WAIT);
        assert_eq!(reports.len(), 1);
        assert_eq!(
            s.next_deadline(),
            Some(t0 + crate::config::MAX_WAIT * 2)
        );
    }

    #[test]
    fn superseded_deadlines_never_fire() {
        let t0 = Instant::now();
        let config = RetentionConfig::default()
            .with_retention_count(0)
            .with_wait_seconds(10);
        let mut s = scheduler(host_with(2), config);
        s.start(t0);

        // Re-arm t1 five times; only the last deadline is live.
        let t1 = s.host().tabs()[1].clone();
        for i in 1..=5 {
            s.on_tabs_changed(&[t1.clone()], t0 + SEC * i);
        }
        let reports = s.fire_due(t0 + 10 * SEC);
        let keys: Vec<&TabKey> = reports.iter().map(|r| &r.key).collect();
        assert_eq!(keys, vec![&TabKey::of(&s.host().tabs()[0])]);
        assert_eq!(s.next_deadline(), Some(t0 + 15 * SEC));

        let reports = s.fire_due(t0 + 15 * SEC);
        assert_eq!(reports.len(), 1);
        assert!(reports[0].evicted());
        assert_eq!(reports[0].key, TabKey::of(&t1));
    }

    #[test]
    fn cancelled_deadline_leaves_queue_head_live() {
        let t0 = Instant::now();
        let config = RetentionConfig::default().with_wait_seconds(10);
        let mut s = scheduler(host_with(2), config);
        s.start(t0);
        let later = s.host().tabs()[1].clone();
        s.on_tabs_changed(&[later.clone()], t0 + 3 * SEC);

        let first = s.host().tabs()[0].clone();
        s.on_tabs_closed(&[first]);
        assert_eq!(s.next_deadline(), Some(t0 + 13 * SEC));
        assert!(s.fire_due(t0 + 10 * SEC).is_empty());
    }

    #[test]
    fn retired_timers_end_terminated() {
        let t0 = Instant::now();
        let mut s = scheduler(host_with(1), RetentionConfig::default());
        s.start(t0);
        let key = s.host().key_of("t0").unwrap();

        let retired = s.retire(&key, Transition::Cancel).unwrap();
        assert_eq!(retired.state, TimerState::Terminated);
        assert!(s.tracked(&key).is_none());
        assert_eq!(s.next_deadline(), None);
        assert!(s.retire(&key, Transition::Cancel).is_none());
    }
}
