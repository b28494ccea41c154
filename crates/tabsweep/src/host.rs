//! The host editor as seen by the scheduler.
//!
//! [`TabHost`] is the capability the scheduler needs: list the open tabs and
//! close one. Change notifications arrive as [`TabChangeEvent`]s, delivered by
//! whoever drives the scheduler (see [`crate::driver`]).
//!
//! [`InMemoryHost`] is a complete offline host. Each mutation returns the
//! event a real editor would have fired, which makes arbitrary open, close,
//! drag and pin churn reproducible in tests and in the simulator.

use crate::identity::TabKey;
use crate::tab::Tab;

/// Which tabs [`TabHost::list_tabs`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabScope {
    All,
    ActiveColumn,
}

/// One batch of tab changes, as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabChangeEvent {
    pub opened: Vec<Tab>,
    /// Tabs whose dirty, active or pinned state, or position, changed.
    pub changed: Vec<Tab>,
    pub closed: Vec<Tab>,
}

impl TabChangeEvent {
    pub fn opened(tab: Tab) -> Self {
        Self {
            opened: vec![tab],
            ..Self::default()
        }
    }

    pub fn changed(tabs: Vec<Tab>) -> Self {
        Self {
            changed: tabs,
            ..Self::default()
        }
    }

    pub fn closed(tab: Tab) -> Self {
        Self {
            closed: vec![tab],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.opened.is_empty() && self.changed.is_empty() && self.closed.is_empty()
    }

    /// Append another batch to this one.
    pub fn merge(&mut self, other: TabChangeEvent) {
        self.opened.extend(other.opened);
        self.changed.extend(other.changed);
        self.closed.extend(other.closed);
    }
}

/// Read/command interface to the host editor.
pub trait TabHost {
    /// Live tabs, grouped by column in stable column order.
    fn list_tabs(&self, scope: TabScope) -> Vec<Tab>;

    /// Close the live instance of `tab`. A tab that is already gone is a no-op.
    fn close_tab(&mut self, tab: &Tab);

    /// Change events the host produced on its own since the last call,
    /// e.g. the `closed` notification that follows [`close_tab`](Self::close_tab).
    fn drain_events(&mut self) -> Vec<TabChangeEvent> {
        Vec::new()
    }
}

/// Offline host keeping tabs in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHost {
    /// Column-grouped, columns ascending.
    tabs: Vec<Tab>,
    active_column: Option<u32>,
    pending: Vec<TabChangeEvent>,
    close_commands: usize,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a host from tabs in any order; they are regrouped by column.
    pub fn with_tabs(tabs: impl IntoIterator<Item = Tab>) -> Self {
        let mut host = Self::new();
        for tab in tabs {
            host.open(tab);
        }
        host
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Number of close commands received through [`TabHost::close_tab`]
    /// that actually closed a tab.
    pub fn close_commands(&self) -> usize {
        self.close_commands
    }

    /// Key of the first tab with this label.
    pub fn key_of(&self, label: &str) -> Option<TabKey> {
        self.tabs.iter().find(|t| t.label == label).map(TabKey::of)
    }

    pub fn get(&self, key: &TabKey) -> Option<&Tab> {
        self.tabs.iter().find(|t| key.matches(t))
    }

    fn index_of(&self, key: &TabKey) -> Option<usize> {
        self.tabs.iter().position(|t| key.matches(t))
    }

    fn column_range(&self, column: u32) -> (usize, usize) {
        let start = self.tabs.iter().take_while(|t| t.column < column).count();
        let len = self.tabs[start..]
            .iter()
            .take_while(|t| t.column == column)
            .count();
        (start, start + len)
    }

    /// Open a tab at the end of its column.
    pub fn open(&mut self, tab: Tab) -> TabChangeEvent {
        let (_, end) = self.column_range(tab.column);
        self.open_at(tab, end)
    }

    fn open_at(&mut self, tab: Tab, index: usize) -> TabChangeEvent {
        let mut event = TabChangeEvent::default();
        if tab.active {
            event.changed = self.deactivate_column(tab.column);
            self.active_column = Some(tab.column);
        }
        self.tabs.insert(index, tab.clone());
        event.opened.push(tab);
        event
    }

    /// Close a tab as the user would.
    pub fn close(&mut self, key: &TabKey) -> TabChangeEvent {
        match self.index_of(key) {
            Some(index) => TabChangeEvent::closed(self.tabs.remove(index)),
            None => TabChangeEvent::default(),
        }
    }

    pub fn set_dirty(&mut self, key: &TabKey, dirty: bool) -> TabChangeEvent {
        self.update(key, |tab| tab.dirty = dirty)
    }

    /// Make a tab the active one of its column and focus that column.
    pub fn set_active(&mut self, key: &TabKey) -> TabChangeEvent {
        let Some(index) = self.index_of(key) else {
            return TabChangeEvent::default();
        };
        let column = self.tabs[index].column;
        let mut changed: Vec<Tab> = self
            .deactivate_column(column)
            .into_iter()
            .filter(|t| !key.matches(t))
            .collect();
        self.tabs[index].active = true;
        self.active_column = Some(column);
        changed.push(self.tabs[index].clone());
        TabChangeEvent::changed(changed)
    }

    /// Pin or unpin a tab. Pinned tabs sit at the front of their column.
    pub fn set_pinned(&mut self, key: &TabKey, pinned: bool) -> TabChangeEvent {
        let Some(index) = self.index_of(key) else {
            return TabChangeEvent::default();
        };
        let mut tab = self.tabs.remove(index);
        tab.pinned = pinned;
        let (start, end) = self.column_range(tab.column);
        let pinned_count = self.tabs[start..end].iter().filter(|t| t.pinned).count();
        self.tabs.insert(start + pinned_count, tab.clone());
        TabChangeEvent::changed(vec![tab])
    }

    /// Drag a tab to `position` within its column.
    pub fn reorder(&mut self, key: &TabKey, position: usize) -> TabChangeEvent {
        let Some(index) = self.index_of(key) else {
            return TabChangeEvent::default();
        };
        let tab = self.tabs.remove(index);
        let (start, end) = self.column_range(tab.column);
        self.tabs.insert(start + position.min(end - start), tab.clone());
        TabChangeEvent::changed(vec![tab])
    }

    /// Move a tab to the end of another column. Reported as close + open.
    pub fn move_to_column(&mut self, key: &TabKey, column: u32) -> TabChangeEvent {
        let Some(index) = self.index_of(key) else {
            return TabChangeEvent::default();
        };
        let old = self.tabs.remove(index);
        let mut moved = old.clone();
        moved.column = column;
        let mut event = self.open(moved);
        event.closed.push(old);
        event
    }

    fn update(&mut self, key: &TabKey, f: impl FnOnce(&mut Tab)) -> TabChangeEvent {
        match self.index_of(key) {
            Some(index) => {
                f(&mut self.tabs[index]);
                TabChangeEvent::changed(vec![self.tabs[index].clone()])
            }
            None => TabChangeEvent::default(),
        }
    }

    fn deactivate_column(&mut self, column: u32) -> Vec<Tab> {
        let mut changed = Vec::new();
        for tab in self.tabs.iter_mut().filter(|t| t.column == column && t.active) {
            tab.active = false;
            changed.push(tab.clone());
        }
        changed
    }
}

impl TabHost for InMemoryHost {
    fn list_tabs(&self, scope: TabScope) -> Vec<Tab> {
        match scope {
            TabScope::All => self.tabs.clone(),
            TabScope::ActiveColumn => {
                let Some(column) = self.active_column else {
                    return Vec::new();
                };
                self.tabs
                    .iter()
                    .filter(|t| t.column == column)
                    .cloned()
                    .collect()
            }
        }
    }

    fn close_tab(&mut self, tab: &Tab) {
        let event = self.close(&TabKey::of(tab));
        if !event.is_empty() {
            self.close_commands += 1;
            self.pending.push(event);
        }
    }

    fn drain_events(&mut self) -> Vec<TabChangeEvent> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn tab(name: &str, column: u32) -> Tab {
        Tab::text(name, Url::parse(&format!("file:///w/{name}")).unwrap(), column)
    }

    fn labels(host: &InMemoryHost) -> Vec<&str> {
        host.tabs().iter().map(|t| t.label.as_str()).collect()
    }

    #[test]
    fn tabs_are_grouped_by_column() {
        let host = InMemoryHost::with_tabs([tab("b1", 2), tab("a1", 1), tab("b2", 2), tab("a2", 1)]);
        assert_eq!(labels(&host), vec!["a1", "a2", "b1", "b2"]);
    }

    #[test]
    fn pinning_moves_to_front() {
        let mut host = InMemoryHost::with_tabs([tab("a", 1), tab("b", 1), tab("c", 1)]);
        let c = host.key_of("c").unwrap();
        host.set_pinned(&c, true);
        assert_eq!(labels(&host), vec!["c", "a", "b"]);

        let b = host.key_of("b").unwrap();
        host.set_pinned(&b, true);
        assert_eq!(labels(&host), vec!["c", "b", "a"]);

        host.set_pinned(&c, false);
        assert_eq!(labels(&host), vec!["b", "c", "a"]);
    }

    #[test]
    fn activation_reports_both_tabs() {
        let mut host = InMemoryHost::with_tabs([tab("a", 1).with_active(true), tab("b", 1)]);
        let b = host.key_of("b").unwrap();
        let event = host.set_active(&b);
        let changed: Vec<(&str, bool)> = event
            .changed
            .iter()
            .map(|t| (t.label.as_str(), t.active))
            .collect();
        assert_eq!(changed, vec![("a", false), ("b", true)]);
    }

    #[test]
    fn move_is_close_plus_open() {
        let mut host = InMemoryHost::with_tabs([tab("a", 1), tab("b", 2)]);
        let a = host.key_of("a").unwrap();
        let event = host.move_to_column(&a, 2);
        assert_eq!(event.closed[0].column, 1);
        assert_eq!(event.opened[0].column, 2);
        assert_eq!(labels(&host), vec!["b", "a"]);
    }

    #[test]
    fn close_tab_queues_event_once() {
        let mut host = InMemoryHost::with_tabs([tab("a", 1)]);
        let a = host.tabs()[0].clone();
        host.close_tab(&a);
        host.close_tab(&a);
        assert_eq!(host.close_commands(), 1);
        let events = host.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].closed[0].label, "a");
        assert!(host.drain_events().is_empty());
    }

    #[test]
    fn active_column_scope() {
        let mut host = InMemoryHost::with_tabs([tab("a", 1), tab("b", 2), tab("c", 2)]);
        assert!(host.list_tabs(TabScope::ActiveColumn).is_empty());
        let b = host.key_of("b").unwrap();
        host.set_active(&b);
        let scoped = host.list_tabs(TabScope::ActiveColumn);
        assert_eq!(scoped.len(), 2);
        assert!(scoped.iter().all(|t| t.column == 2));
    }
}
