//! Eviction policy: decide whether a tracked tab is still retained.
//!
//! Retention is positional. The front-most `retention_count` tabs of each
//! column (plus one extra slot per pinned tab when shifting is enabled) are
//! retained; anything further back is closed on its next timer tick unless
//! it is dirty or active and the matching removal switch is off.
//!
//! The decision is a pure function of a fresh tab list, so a tab that was
//! dragged, pinned or closed since its timer was armed is judged on where it
//! is now.

use crate::identity::TabKey;
use crate::tab::Tab;
use serde::{Deserialize, Serialize};

/// Which pinned tabs grant extra retention slots.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum PinnedScope {
    /// Only pinned tabs in the tab's own column.
    #[default]
    Column,
    /// Pinned tabs in every column.
    AllColumns,
}

/// Policy switches applied on every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Front-most tabs per column that are never closed.
    pub retention_count: u32,
    /// Grant one extra retained slot per pinned tab.
    pub shift_by_pinned: bool,
    pub pinned_scope: PinnedScope,
    pub allow_dirty_removal: bool,
    pub allow_active_removal: bool,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            retention_count: crate::DEFAULT_RETENTION_COUNT,
            shift_by_pinned: true,
            pinned_scope: PinnedScope::Column,
            allow_dirty_removal: false,
            allow_active_removal: false,
        }
    }
}

/// Why a tab survived a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepReason {
    WithinRetention,
    Dirty,
    Active,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Close `tab`, the live instance found in the current list.
    Evict {
        tab: Tab,
        position: usize,
        threshold: usize,
    },
    Keep {
        position: usize,
        threshold: usize,
        reason: KeepReason,
    },
    /// The tab is no longer open.
    Gone,
}

impl EvictionPolicy {
    pub fn new(retention_count: u32) -> Self {
        Self {
            retention_count,
            ..Self::default()
        }
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

    /// Retained slots for a tab: `(override or default) + shift`, never below 1.
    pub fn threshold(&self, override_retention: Option<u32>, shift: usize) -> usize {
        let base = override_retention.unwrap_or(self.retention_count) as usize;
        (base + shift).max(1)
    }

    /// Decide what to do with the tab identified by `key`.
    ///
    /// `tabs` must be the host's current, column-grouped list.
    pub fn decide(&self, tabs: &[Tab], key: &TabKey, override_retention: Option<u32>) -> Decision {
        let Some(index) = tabs.iter().position(|tab| key.matches(tab)) else {
            return Decision::Gone;
        };
        let tab = &tabs[index];
        let position = column_position(tabs, index);

        let shift = if self.shift_by_pinned {
            match self.pinned_scope {
                PinnedScope::Column => tabs
                    .iter()
                    .filter(|t| t.column == tab.column && t.pinned)
                    .count(),
                PinnedScope::AllColumns => tabs.iter().filter(|t| t.pinned).count(),
            }
        } else {
            0
        };
        let threshold = self.threshold(override_retention, shift);

        if tab.dirty && !self.allow_dirty_removal {
            return Decision::Keep {
                position,
                threshold,
                reason: KeepReason::Dirty,
            };
        }
        if tab.active && !self.allow_active_removal {
            return Decision::Keep {
                position,
                threshold,
                reason: KeepReason::Active,
            };
        }

        if position >= threshold {
            Decision::Evict {
                tab: tab.clone(),
                position,
                threshold,
            }
        } else {
            Decision::Keep {
                position,
                threshold,
                reason: KeepReason::WithinRetention,
            }
        }
    }
}

/// Zero-based position of `tabs[index]` within its own column.
///
/// Scans the flat list and resets the offset whenever the column changes.
pub fn column_position(tabs: &[Tab], index: usize) -> usize {
    let mut column = None;
    let mut offset = 0;
    for (i, tab) in tabs.iter().enumerate().take(index + 1) {
        if column != Some(tab.column) {
            column = Some(tab.column);
            offset = i;
        }
    }
    index - offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn tab(name: &str, column: u32) -> Tab {
        let uri = Url::parse(&format!("file:///w/{name}")).unwrap();
        Tab::text(name, uri, column)
    }

    fn column_of(n: usize, column: u32) -> Vec<Tab> {
        (0..n).map(|i| tab(&format!("t{column}-{i}"), column)).collect()
    }

    #[test]
    fn positions_reset_per_column() {
        let mut tabs = column_of(3, 1);
        tabs.extend(column_of(4, 2));
        let positions: Vec<usize> = (0..tabs.len()).map(|i| column_position(&tabs, i)).collect();
        assert_eq!(positions, vec![0, 1, 2, 0, 1, 2, 3]);
    }

    #[test]
    fn pinned_shift_extends_threshold() {
        let mut tabs = column_of(8, 1);
        tabs[0].pinned = true;
        tabs[1].pinned = true;
        let policy = EvictionPolicy::new(3);

        let at_4 = policy.decide(&tabs, &TabKey::of(&tabs[4]), None);
        assert_eq!(
            at_4,
            Decision::Keep {
                position: 4,
                threshold: 5,
                reason: KeepReason::WithinRetention
            }
        );

        let at_5 = policy.decide(&tabs, &TabKey::of(&tabs[5]), None);
        assert!(matches!(
            at_5,
            Decision::Evict {
                position: 5,
                threshold: 5,
                ..
            }
        ));
    }

    #[test]
    fn pinned_scope_column_ignores_other_columns() {
        let mut tabs = column_of(2, 1);
        tabs[0].pinned = true;
        tabs[1].pinned = true;
        tabs.extend(column_of(4, 2));
        let target = TabKey::of(&tabs[5]); // column 2, position 3
        let column_scoped = EvictionPolicy::new(3);
        assert!(matches!(
            column_scoped.decide(&tabs, &target, None),
            Decision::Evict { threshold: 3, .. }
        ));

        let global = EvictionPolicy::new(3).with_pinned_scope(PinnedScope::AllColumns);
        assert!(matches!(
            global.decide(&tabs, &target, None),
            Decision::Keep { threshold: 5, .. }
        ));
    }

    #[test]
    fn zero_retention_clamps_to_one() {
        let tabs = column_of(2, 1);
        let policy = EvictionPolicy::new(0).with_shift_by_pinned(false);
        assert_eq!(policy.threshold(None, 0), 1);
        assert!(matches!(
            policy.decide(&tabs, &TabKey::of(&tabs[0]), None),
            Decision::Keep { position: 0, threshold: 1, .. }
        ));
        assert!(matches!(
            policy.decide(&tabs, &TabKey::of(&tabs[1]), None),
            Decision::Evict { position: 1, .. }
        ));
    }

    #[test]
    fn dirty_protection_precedes_position() {
        let mut tabs = column_of(11, 1);
        tabs[10].dirty = true;
        let key = TabKey::of(&tabs[10]);

        let strict = EvictionPolicy::new(3);
        assert!(matches!(
            strict.decide(&tabs, &key, None),
            Decision::Keep {
                position: 10,
                reason: KeepReason::Dirty,
                ..
            }
        ));

        let lenient = strict.with_dirty_removal(true);
        assert!(matches!(lenient.decide(&tabs, &key, None), Decision::Evict { .. }));
    }

    #[test]
    fn active_protection() {
        let mut tabs = column_of(5, 1);
        tabs[4].active = true;
        let key = TabKey::of(&tabs[4]);
        let policy = EvictionPolicy::new(1);
        assert!(matches!(
            policy.decide(&tabs, &key, None),
            Decision::Keep {
                reason: KeepReason::Active,
                ..
            }
        ));
        assert!(matches!(
            policy.with_active_removal(true).decide(&tabs, &key, None),
            Decision::Evict { .. }
        ));
    }

    #[test]
    fn override_replaces_default_retention() {
        let tabs = column_of(3, 1);
        let policy = EvictionPolicy::new(10);
        assert!(matches!(
            policy.decide(&tabs, &TabKey::of(&tabs[2]), Some(1)),
            Decision::Evict { threshold: 1, .. }
        ));
    }

    #[test]
    fn missing_tab_is_gone() {
        let tabs = column_of(3, 1);
        let stranger = tab("elsewhere.rs", 1);
        assert_eq!(
            EvictionPolicy::default().decide(&tabs, &TabKey::of(&stranger), None),
            Decision::Gone
        );
    }
}
