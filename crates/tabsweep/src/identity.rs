//! Stable identity keys for tabs.
//!
//! A [`TabKey`] is the join column for all scheduler state. It is recomputed
//! from the current [`Tab`] on every event and compared by value, so a dirty
//! or active flag flip keeps the key while a move to another column yields a
//! different one (the countdown restarts in the new column).

use crate::tab::{Tab, TabInput};
use std::fmt;
use url::Url;

/// Kind-specific part of a [`TabKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyKind {
    Custom { view_type: String, uri: Url },
    Notebook { notebook_type: String, uri: Url },
    NotebookDiff {
        notebook_type: String,
        modified: Url,
        original: Url,
    },
    TextDiff { modified: Url, original: Url },
    /// Webviews have no resource, so label and view type stand in for one.
    Webview { label: String, view_type: String },
    Resource(Url),
    /// Fallback for tabs without any locator.
    Label(String),
}

/// Identity of a logical tab within a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabKey {
    pub column: u32,
    pub kind: KeyKind,
}

impl TabKey {
    /// Derive the key for a tab. Never fails.
    pub fn of(tab: &Tab) -> Self {
        let kind = match &tab.input {
            TabInput::Custom { uri, view_type } => KeyKind::Custom {
                view_type: view_type.clone(),
                uri: uri.clone(),
            },
            TabInput::Notebook { uri, notebook_type } => KeyKind::Notebook {
                notebook_type: notebook_type.clone(),
                uri: uri.clone(),
            },
            TabInput::NotebookDiff {
                original,
                modified,
                notebook_type,
            } => KeyKind::NotebookDiff {
                notebook_type: notebook_type.clone(),
                modified: modified.clone(),
                original: original.clone(),
            },
            TabInput::TextDiff { original, modified } => KeyKind::TextDiff {
                modified: modified.clone(),
                original: original.clone(),
            },
            TabInput::Webview { view_type } => KeyKind::Webview {
                label: tab.label.clone(),
                view_type: view_type.clone(),
            },
            TabInput::Text { uri } | TabInput::Unknown { uri: Some(uri) } => {
                KeyKind::Resource(uri.clone())
            }
            TabInput::Unknown { uri: None } => KeyKind::Label(tab.label.clone()),
        };
        Self {
            column: tab.column,
            kind,
        }
    }

    /// Whether `tab` is the logical tab this key identifies.
    pub fn matches(&self, tab: &Tab) -> bool {
        // Cheap reject before building a key.
        tab.column == self.column && Self::of(tab) == *self
    }
}

impl fmt::Display for TabKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]:", self.column)?;
        match &self.kind {
            KeyKind::Custom { view_type, uri } => write!(f, "[{view_type}]:[{uri}]"),
            KeyKind::Notebook { notebook_type, uri } => write!(f, "[{notebook_type}]:[{uri}]"),
            KeyKind::NotebookDiff {
                notebook_type,
                modified,
                original,
            } => write!(f, "[{notebook_type}]:[{modified}]:[{original}]"),
            KeyKind::TextDiff { modified, original } => write!(f, "[{modified}]:[{original}]"),
            KeyKind::Webview { label, view_type } => write!(f, "[{label}]:[{view_type}]"),
            KeyKind::Resource(uri) => write!(f, "[{uri}]"),
            KeyKind::Label(label) => write!(f, "{label}"),
        }
    }
}
