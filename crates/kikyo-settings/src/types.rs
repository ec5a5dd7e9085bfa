use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opaque, backend-issued identifier of a layout entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutId(pub String);

impl LayoutId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayoutId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A named reference to a layout definition file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayoutEntry {
    #[serde(default)]
    pub id: LayoutId,
    #[serde(default)]
    pub alias: String,
    /// Name declared inside the layout file, if the backend could read one.
    #[serde(default)]
    pub layout_name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub order: usize,
}

impl LayoutEntry {
    /// Alias, then declared layout name, then file stem.
    pub fn display_name(&self) -> String {
        let alias = self.alias.trim();
        if !alias.is_empty() {
            return alias.to_string();
        }

        let layout_name = self.layout_name.trim();
        if !layout_name.is_empty() {
            return layout_name.to_string();
        }

        file_stem_or_default(&self.path)
    }
}

pub(crate) fn file_stem_or_default(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.trim().to_string())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "layout".to_string())
}

/// Reply of `get_layout_entries`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayoutEntries {
    #[serde(default)]
    pub entries: Vec<LayoutEntry>,
    #[serde(default)]
    pub active_layout_id: Option<LayoutId>,
}

/// Human-readable summary the backend returns after loading a layout.
pub type LoadResult = String;

/// Notifications pushed by the backend outside any request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    /// `enabled-state-changed`, e.g. after the global pause hotkey.
    EnabledStateChanged(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(alias: &str, layout_name: &str, path: &str) -> LayoutEntry {
        LayoutEntry {
            id: LayoutId::new("x"),
            alias: alias.to_string(),
            layout_name: layout_name.to_string(),
            path: path.to_string(),
            order: 0,
        }
    }

    #[test]
    fn display_name_prefers_alias_then_layout_name_then_stem() {
        assert_eq!(entry(" Mine ", "Geta", "a/b.yab").display_name(), "Mine");
        assert_eq!(entry("  ", "Geta", "a/b.yab").display_name(), "Geta");
        assert_eq!(entry("", "", "layouts/sin-geta.yab").display_name(), "sin-geta");
        assert_eq!(entry("", "", "").display_name(), "layout");
    }

    #[test]
    fn layout_entries_accept_null_active_id() {
        let parsed: LayoutEntries =
            serde_json::from_str(r#"{"entries":[{"id":"a","path":"x.yab"}],"active_layout_id":null}"#)
                .unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].id, LayoutId::new("a"));
        assert!(parsed.active_layout_id.is_none());
    }
}
