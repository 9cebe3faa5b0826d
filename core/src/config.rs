// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use jiff::Timestamp;
use nbsync_ical::CalDateTime;

/// Configuration of one synchronized notebook.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NotebookConfig {
    /// Local notebook identifier, used in `NBUID:<id>:<uid>` local uids.
    pub notebook_id: String,

    /// Path of the remote calendar collection, e.g. `/calendars/alice/work/`.
    pub remote_path: String,

    /// Start of the sync window, as an RFC 3339 instant.
    #[serde(default)]
    pub from: Option<Timestamp>,

    /// End of the sync window, as an RFC 3339 instant.
    #[serde(default)]
    pub to: Option<Timestamp>,
}

impl NotebookConfig {
    /// Creates a configuration without a sync window.
    #[must_use]
    pub fn new(notebook_id: impl Into<String>, remote_path: impl Into<String>) -> Self {
        Self {
            notebook_id: notebook_id.into(),
            remote_path: remote_path.into(),
            from: None,
            to: None,
        }
    }

    /// Limits the sync to the given window.
    #[must_use]
    pub fn with_window(mut self, from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// The sync window as query bounds.
    pub(crate) fn window(&self) -> (Option<CalDateTime>, Option<CalDateTime>) {
        (self.from.map(CalDateTime::Utc), self.to.map(CalDateTime::Utc))
    }

    /// The remote collection path, with a trailing slash.
    pub(crate) fn collection_path(&self) -> String {
        match self.remote_path.ends_with('/') {
            true => self.remote_path.clone(),
            false => format!("{}/", self.remote_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_window_from_toml() {
        let config: NotebookConfig = toml::from_str(
            r#"
notebook_id = "123456789"
remote_path = "/calendars/alice/work"
from = "2017-03-01T00:00:00Z"
to = "2017-04-01T00:00:00+02:00"
"#,
        )
        .unwrap();

        assert_eq!(config.collection_path(), "/calendars/alice/work/");
        let (from, to) = config.window();
        assert_eq!(from.unwrap().to_basic_format(), "20170301T000000Z");
        assert_eq!(to.unwrap().to_basic_format(), "20170331T220000Z");
    }

    #[test]
    fn window_is_optional() {
        let config: NotebookConfig =
            toml::from_str("notebook_id = \"nb\"\nremote_path = \"/cal/\"").unwrap();
        assert_eq!(config.window(), (None, None));
        assert_eq!(config.collection_path(), "/cal/");
    }
}
