//! Host tab snapshots.
//!
//! A [`Tab`] is a read-only copy of what the host editor reports for one
//! open tab. The scheduler never mutates tabs; it only asks the host to close
//! them. Every kind of editor input gets its own [`TabInput`] variant so that
//! identity derivation can match on it instead of probing fields.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// What a tab is showing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TabInput {
    /// A plain text document.
    Text { uri: Url },
    /// A document opened with a custom editor.
    Custom { uri: Url, view_type: String },
    /// A notebook document.
    Notebook { uri: Url, notebook_type: String },
    /// A side-by-side notebook diff.
    NotebookDiff {
        original: Url,
        modified: Url,
        notebook_type: String,
    },
    /// A side-by-side text diff.
    TextDiff { original: Url, modified: Url },
    /// A webview panel. Webviews have no stable resource.
    Webview { view_type: String },
    /// Anything else the host reports (terminals, settings, welcome pages).
    Unknown {
        #[serde(default)]
        uri: Option<Url>,
    },
}

/// Snapshot of one open tab.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    /// Display label shown on the tab.
    pub label: String,
    /// View column (editor group) the tab lives in.
    pub column: u32,
    pub input: TabInput,
    #[serde(default)]
    pub dirty: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub pinned: bool,
}

impl Tab {
    /// A clean, inactive, unpinned text tab.
    pub fn text(label: impl Into<String>, uri: Url, column: u32) -> Self {
        Self {
            label: label.into(),
            column,
            input: TabInput::Text { uri },
            dirty: false,
            active: false,
            pinned: false,
        }
    }

    /// A tab for an arbitrary input.
    pub fn new(label: impl Into<String>, input: TabInput, column: u32) -> Self {
        Self {
            label: label.into(),
            column,
            input,
            dirty: false,
            active: false,
            pinned: false,
        }
    }

    pub fn with_dirty(mut self, dirty: bool) -> Self {
        self.dirty = dirty;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    /// The single resource this tab edits, if it has exactly one.
    ///
    /// Diff and webview tabs return `None`.
    pub fn primary_uri(&self) -> Option<&Url> {
        match &self.input {
            TabInput::Text { uri }
            | TabInput::Custom { uri, .. }
            | TabInput::Notebook { uri, .. } => Some(uri),
            TabInput::Unknown { uri } => uri.as_ref(),
            TabInput::NotebookDiff { .. } | TabInput::TextDiff { .. } | TabInput::Webview { .. } => {
                None
            }
        }
    }

    /// Local filesystem path of the primary resource (`file:` URIs only).
    pub fn fs_path(&self) -> Option<PathBuf> {
        let uri = self.primary_uri()?;
        if uri.scheme() != "file" {
            return None;
        }
        uri.to_file_path().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn primary_uri_per_kind() {
        let text = Tab::text("a.rs", url("file:///src/a.rs"), 1);
        assert_eq!(text.primary_uri().unwrap().as_str(), "file:///src/a.rs");

        let diff = Tab::new(
            "a.rs ↔ a.rs",
            TabInput::TextDiff {
                original: url("git:///src/a.rs"),
                modified: url("file:///src/a.rs"),
            },
            1,
        );
        assert!(diff.primary_uri().is_none());

        let web = Tab::new(
            "Preview",
            TabInput::Webview {
                view_type: "markdown.preview".into(),
            },
            1,
        );
        assert!(web.primary_uri().is_none());

        let term = Tab::new("bash", TabInput::Unknown { uri: None }, 2);
        assert!(term.primary_uri().is_none());
    }

    #[test]
    fn fs_path_only_for_file_scheme() {
        let local = Tab::text("a.log", url("file:///var/tmp/a.log"), 1);
        assert_eq!(local.fs_path(), Some(PathBuf::from("/var/tmp/a.log")));

        let remote = Tab::text("a.log", url("vscode-remote://host/var/tmp/a.log"), 1);
        assert!(remote.fs_path().is_none());
    }

    #[test]
    fn tab_deserializes_with_defaults() {
        let tab: Tab = serde_json::from_str(
            r#"{"label": "x.md", "column": 1, "input": {"kind": "text", "uri": "file:///x.md"}}"#,
        )
        .unwrap();
        assert!(!tab.dirty && !tab.active && !tab.pinned);
        assert_eq!(tab.input, TabInput::Text { uri: url("file:///x.md") });
    }
}
