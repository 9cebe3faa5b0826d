// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Side-channel sync metadata.
//!
//! Each synced incidence remembers the remote href it lives at and the etag
//! of the last version seen. Older stores kept this inside the incidence,
//! as `buteo:caldav:uri:` / `buteo:caldav:etag:` comments or as `uri` /
//! `etag` custom properties; those are still read as a fallback.

use std::collections::HashMap;

use nbsync_caldav::{ETag, Href};
use nbsync_ical::{CalDateTime, Incidence};
use serde::{Deserialize, Serialize};

/// Namespace of the private custom properties.
pub(crate) const APP: &str = "buteo";

pub(crate) const LEGACY_URI_COMMENT: &str = "buteo:caldav:uri:";
pub(crate) const LEGACY_ETAG_COMMENT: &str = "buteo:caldav:etag:";

/// Where an incidence lives remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    /// Href of the calendar resource holding the incidence.
    pub href: Href,
    /// Etag of the last version seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<ETag>,
}

/// Lookup key. Recurrence ids denoting the same instant share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Key {
    notebook: String,
    uid: String,
    occurrence: Option<String>,
}

impl Key {
    fn new(notebook: &str, uid: &str, recurrence_id: Option<&CalDateTime>) -> Self {
        Self {
            notebook: notebook.to_string(),
            uid: uid.to_string(),
            occurrence: recurrence_id.map(occurrence),
        }
    }
}

/// UTC basic format when the value resolves to an instant, else the value
/// with its timezone, if any.
fn occurrence(recurrence_id: &CalDateTime) -> String {
    match (recurrence_id.instant(), recurrence_id.tzid()) {
        (Some(ts), _) => CalDateTime::Utc(ts).to_basic_format(),
        (None, Some(tzid)) => format!("{tzid}:{}", recurrence_id.to_basic_format()),
        (None, None) => recurrence_id.to_basic_format(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Entry {
    notebook: String,
    uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recurrence_id: Option<CalDateTime>,
    resource: ResourceInfo,
}

impl Entry {
    fn key(&self) -> Key {
        Key::new(&self.notebook, &self.uid, self.recurrence_id.as_ref())
    }
}

/// Sync metadata keyed by `(notebook, uid, recurrence id)`.
///
/// Serializes as a list of entries, sorted for stable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Entry>", into = "Vec<Entry>")]
pub struct SyncMetadata {
    entries: HashMap<Key, Entry>,
}

impl From<Vec<Entry>> for SyncMetadata {
    fn from(entries: Vec<Entry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.key(), e)).collect(),
        }
    }
}

impl From<SyncMetadata> for Vec<Entry> {
    fn from(metadata: SyncMetadata) -> Self {
        let mut entries: Vec<_> = metadata.entries.into_iter().collect();
        entries.sort_by(|(a, _), (b, _)| {
            (&a.notebook, &a.uid, &a.occurrence).cmp(&(&b.notebook, &b.uid, &b.occurrence))
        });
        entries.into_iter().map(|(_, entry)| entry).collect()
    }
}

impl SyncMetadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records where an incidence lives.
    pub fn record(
        &mut self,
        notebook: &str,
        uid: &str,
        recurrence_id: Option<&CalDateTime>,
        info: ResourceInfo,
    ) {
        let entry = Entry {
            notebook: notebook.to_string(),
            uid: uid.to_string(),
            recurrence_id: recurrence_id.cloned(),
            resource: info,
        };
        self.entries.insert(entry.key(), entry);
    }

    /// Looks up where an incidence lives.
    #[must_use]
    pub fn get(
        &self,
        notebook: &str,
        uid: &str,
        recurrence_id: Option<&CalDateTime>,
    ) -> Option<&ResourceInfo> {
        self.entries
            .get(&Key::new(notebook, uid, recurrence_id))
            .map(|entry| &entry.resource)
    }

    /// Forgets an incidence.
    pub fn remove(
        &mut self,
        notebook: &str,
        uid: &str,
        recurrence_id: Option<&CalDateTime>,
    ) -> Option<ResourceInfo> {
        self.entries
            .remove(&Key::new(notebook, uid, recurrence_id))
            .map(|entry| entry.resource)
    }

    /// Known remote resources of a notebook, with their last seen etag.
    #[must_use]
    pub fn resources(&self, notebook: &str) -> HashMap<Href, Option<ETag>> {
        self.entries
            .values()
            .filter(|entry| entry.notebook == notebook)
            .map(|entry| (entry.resource.href.clone(), entry.resource.etag.clone()))
            .collect()
    }

    /// Incidences of a notebook stored at `href`, as `(uid, recurrence id)`.
    #[must_use]
    pub fn incidences_at(&self, notebook: &str, href: &Href) -> Vec<(String, Option<CalDateTime>)> {
        self.entries
            .values()
            .filter(|entry| entry.notebook == notebook && &entry.resource.href == href)
            .map(|entry| (entry.uid.clone(), entry.recurrence_id.clone()))
            .collect()
    }

    /// Sets the etag of every incidence of a notebook stored at `href`.
    pub fn update_etag(&mut self, notebook: &str, href: &Href, etag: Option<ETag>) {
        for entry in self
            .entries
            .values_mut()
            .filter(|entry| entry.notebook == notebook && &entry.resource.href == href)
        {
            entry.resource.etag.clone_from(&etag);
        }
    }

    /// Where an incidence lives: the side-channel entry, else the legacy
    /// markers carried by the incidence itself.
    #[must_use]
    pub fn resource_of(&self, notebook: &str, incidence: &Incidence) -> Option<ResourceInfo> {
        if let Some(info) = self.get(notebook, &incidence.uid, incidence.recurrence_id.as_ref()) {
            return Some(info.clone());
        }
        let href = legacy_uri(incidence)?;
        Some(ResourceInfo {
            href: Href::new(href),
            etag: legacy_etag(incidence).map(ETag::new),
        })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn legacy_marker(incidence: &Incidence, prefix: &str, property: &str) -> Option<String> {
    incidence
        .comments
        .iter()
        .find_map(|c| c.strip_prefix(prefix))
        .or_else(|| incidence.custom_properties.get(APP, property))
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Href stored inside the incidence by older versions.
#[must_use]
pub fn legacy_uri(incidence: &Incidence) -> Option<String> {
    legacy_marker(incidence, LEGACY_URI_COMMENT, "uri")
}

/// Etag stored inside the incidence by older versions.
#[must_use]
pub fn legacy_etag(incidence: &Incidence) -> Option<String> {
    legacy_marker(incidence, LEGACY_ETAG_COMMENT, "etag")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(href: &str, etag: &str) -> ResourceInfo {
        ResourceInfo {
            href: Href::from(href),
            etag: Some(ETag::from(etag)),
        }
    }

    #[test]
    fn keyed_by_notebook_uid_and_recurrence_id() {
        let rid = CalDateTime::parse("20170315T144608Z", None, false).unwrap();
        let mut metadata = SyncMetadata::new();
        metadata.record("nb", "a", None, info("/cal/a.ics", "1"));
        metadata.record("nb", "a", Some(&rid), info("/cal/a.ics", "1"));
        metadata.record("other", "a", None, info("/other/a.ics", "9"));

        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata.get("nb", "a", None), Some(&info("/cal/a.ics", "1")));
        assert_eq!(metadata.incidences_at("nb", &Href::from("/cal/a.ics")).len(), 2);
        assert_eq!(metadata.resources("nb").len(), 1);

        metadata.update_etag("nb", &Href::from("/cal/a.ics"), Some(ETag::from("2")));
        assert_eq!(metadata.get("nb", "a", Some(&rid)), Some(&info("/cal/a.ics", "2")));
        assert_eq!(metadata.get("other", "a", None), Some(&info("/other/a.ics", "9")));
    }

    #[test]
    fn recurrence_ids_match_by_instant() {
        let utc = CalDateTime::parse("20170315T144608Z", None, false).unwrap();
        let zoned =
            CalDateTime::parse("20170315T164608", Some("Europe/Helsinki"), false).unwrap();
        let floating = CalDateTime::parse("20170315T144608", None, false).unwrap();

        let mut metadata = SyncMetadata::new();
        metadata.record("nb", "a", Some(&utc), info("/cal/a.ics", "1"));
        assert_eq!(metadata.get("nb", "a", Some(&zoned)), Some(&info("/cal/a.ics", "1")));
        assert_eq!(metadata.get("nb", "a", Some(&floating)), None);
        assert_eq!(metadata.get("nb", "a", None), None);

        metadata.record("nb", "a", Some(&zoned), info("/cal/a.ics", "2"));
        assert_eq!(metadata.len(), 1);
        assert_eq!(
            metadata.remove("nb", "a", Some(&utc)),
            Some(info("/cal/a.ics", "2"))
        );
        assert!(metadata.is_empty());
    }

    #[test]
    fn round_trips_through_toml() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct State {
            metadata: SyncMetadata,
        }

        let zoned =
            CalDateTime::parse("20170315T164608", Some("Europe/Helsinki"), false).unwrap();
        let day = CalDateTime::parse("20170316", None, true).unwrap();
        let mut metadata = SyncMetadata::new();
        metadata.record("nb", "a", None, info("/cal/a.ics", "\"1\""));
        metadata.record("nb", "a", Some(&zoned), info("/cal/a.ics", "\"1\""));
        metadata.record("nb", "b", Some(&day), ResourceInfo {
            href: Href::from("/cal/b.ics"),
            etag: None,
        });
        let state = State { metadata };

        let text = toml::to_string(&state).unwrap();
        let back: State = toml::from_str(&text).unwrap();
        assert_eq!(back, state);
        assert_eq!(
            back.metadata.get("nb", "a", Some(&zoned)),
            Some(&info("/cal/a.ics", "\"1\""))
        );
    }

    #[test]
    fn falls_back_to_legacy_markers() {
        let mut incidence = Incidence::new_event();
        incidence.uid = "a".to_string();
        incidence
            .comments
            .push("buteo:caldav:uri:/bob/calendar/12346789.ics".to_string());
        incidence.custom_properties.set(APP, "etag", "\"e1\"");

        let metadata = SyncMetadata::new();
        assert_eq!(
            metadata.resource_of("nb", &incidence),
            Some(ResourceInfo {
                href: Href::from("/bob/calendar/12346789.ics"),
                etag: Some(ETag::from("\"e1\"")),
            })
        );

        assert_eq!(metadata.resource_of("nb", &Incidence::new_event()), None);
    }
}
