// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Local calendar store seam.

use async_trait::async_trait;
use nbsync_ical::{CalDateTime, Incidence};

/// Local store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// No incidence with this identity.
    #[error("incidence not found: {0}")]
    NotFound(String),

    /// An incidence with this identity already exists.
    #[error("incidence already exists: {0}")]
    Duplicate(String),

    /// The backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Local edits made since the last sync pass.
#[derive(Debug, Clone, Default)]
pub struct LocalChanges {
    /// Incidences created locally.
    pub added: Vec<Incidence>,
    /// Incidences modified locally.
    pub modified: Vec<Incidence>,
    /// Incidences deleted locally, as they were before deletion.
    pub deleted: Vec<Incidence>,
}

impl LocalChanges {
    /// Whether there is nothing to upload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Storage of one notebook, addressed by `(uid, recurrence id)`.
///
/// Writes through this trait apply remote state and are not reported back
/// as local changes.
#[async_trait]
pub trait NotebookStorage: Send {
    /// Looks up an incidence.
    async fn incidence(
        &self,
        uid: &str,
        recurrence_id: Option<&CalDateTime>,
    ) -> Result<Option<Incidence>, StorageError>;

    /// Every incidence of the notebook.
    async fn incidences(&self) -> Result<Vec<Incidence>, StorageError>;

    /// Inserts a new incidence.
    async fn insert(&mut self, incidence: Incidence) -> Result<(), StorageError>;

    /// Replaces an existing incidence with the same identity.
    async fn update(&mut self, incidence: Incidence) -> Result<(), StorageError>;

    /// Deletes an incidence.
    async fn delete(
        &mut self,
        uid: &str,
        recurrence_id: Option<&CalDateTime>,
    ) -> Result<(), StorageError>;

    /// Local edits made since the last call to [`Self::clear_local_changes`].
    async fn local_changes(&self) -> Result<LocalChanges, StorageError>;

    /// Marks every local edit as synced.
    async fn clear_local_changes(&mut self) -> Result<(), StorageError>;
}

/// Whether two recurrence ids denote the same occurrence.
pub(crate) fn same_recurrence_id(a: Option<&CalDateTime>, b: Option<&CalDateTime>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_instant(b),
        _ => false,
    }
}

fn matches(incidence: &Incidence, uid: &str, recurrence_id: Option<&CalDateTime>) -> bool {
    incidence.uid == uid && same_recurrence_id(incidence.recurrence_id.as_ref(), recurrence_id)
}

fn describe(uid: &str, recurrence_id: Option<&CalDateTime>) -> String {
    match recurrence_id {
        Some(rid) => format!("{uid} ({rid})"),
        None => uid.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Added,
    Modified,
}

/// In-memory notebook storage.
///
/// The `local_*` methods stand in for edits made by the user and are
/// reported by [`NotebookStorage::local_changes`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    incidences: Vec<(Incidence, Option<Change>)>,
    deleted: Vec<Incidence>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored incidences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.incidences.len()
    }

    /// Whether the storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidences.is_empty()
    }

    /// Finds an incidence without going through the async trait.
    #[must_use]
    pub fn get(&self, uid: &str, recurrence_id: Option<&CalDateTime>) -> Option<&Incidence> {
        self.position(uid, recurrence_id)
            .and_then(|i| self.incidences.get(i))
            .map(|(incidence, _)| incidence)
    }

    /// Adds an incidence as a local creation.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Duplicate`] if the identity is taken.
    pub fn local_add(&mut self, incidence: Incidence) -> Result<(), StorageError> {
        self.push(incidence, Some(Change::Added))
    }

    /// Replaces an incidence as a local modification.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if there is nothing to replace.
    pub fn local_modify(&mut self, incidence: Incidence) -> Result<(), StorageError> {
        let slot = self.slot_mut(&incidence.uid, incidence.recurrence_id.as_ref())?;
        let change = match slot.1 {
            Some(Change::Added) => Change::Added,
            _ => Change::Modified,
        };
        *slot = (incidence, Some(change));
        Ok(())
    }

    /// Removes an incidence as a local deletion.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if there is nothing to remove.
    pub fn local_delete(
        &mut self,
        uid: &str,
        recurrence_id: Option<&CalDateTime>,
    ) -> Result<(), StorageError> {
        let (incidence, change) = self.take(uid, recurrence_id)?;
        // a never-synced creation just disappears
        if change != Some(Change::Added) {
            self.deleted.push(incidence);
        }
        Ok(())
    }

    fn position(&self, uid: &str, recurrence_id: Option<&CalDateTime>) -> Option<usize> {
        self.incidences
            .iter()
            .position(|(incidence, _)| matches(incidence, uid, recurrence_id))
    }

    fn push(&mut self, incidence: Incidence, change: Option<Change>) -> Result<(), StorageError> {
        if self
            .position(&incidence.uid, incidence.recurrence_id.as_ref())
            .is_some()
        {
            return Err(StorageError::Duplicate(describe(
                &incidence.uid,
                incidence.recurrence_id.as_ref(),
            )));
        }
        self.incidences.push((incidence, change));
        Ok(())
    }

    fn slot_mut(
        &mut self,
        uid: &str,
        recurrence_id: Option<&CalDateTime>,
    ) -> Result<&mut (Incidence, Option<Change>), StorageError> {
        let index = self
            .position(uid, recurrence_id)
            .ok_or_else(|| StorageError::NotFound(describe(uid, recurrence_id)))?;
        self.incidences
            .get_mut(index)
            .ok_or_else(|| StorageError::NotFound(describe(uid, recurrence_id)))
    }

    fn take(
        &mut self,
        uid: &str,
        recurrence_id: Option<&CalDateTime>,
    ) -> Result<(Incidence, Option<Change>), StorageError> {
        let index = self
            .position(uid, recurrence_id)
            .ok_or_else(|| StorageError::NotFound(describe(uid, recurrence_id)))?;
        Ok(self.incidences.remove(index))
    }
}

#[async_trait]
impl NotebookStorage for MemoryStorage {
    async fn incidence(
        &self,
        uid: &str,
        recurrence_id: Option<&CalDateTime>,
    ) -> Result<Option<Incidence>, StorageError> {
        Ok(self.get(uid, recurrence_id).cloned())
    }

    async fn incidences(&self) -> Result<Vec<Incidence>, StorageError> {
        Ok(self.incidences.iter().map(|(i, _)| i.clone()).collect())
    }

    async fn insert(&mut self, incidence: Incidence) -> Result<(), StorageError> {
        self.push(incidence, None)
    }

    async fn update(&mut self, incidence: Incidence) -> Result<(), StorageError> {
        let slot = self.slot_mut(&incidence.uid, incidence.recurrence_id.as_ref())?;
        slot.0 = incidence;
        Ok(())
    }

    async fn delete(
        &mut self,
        uid: &str,
        recurrence_id: Option<&CalDateTime>,
    ) -> Result<(), StorageError> {
        self.take(uid, recurrence_id).map(|_| ())
    }

    async fn local_changes(&self) -> Result<LocalChanges, StorageError> {
        let mut changes = LocalChanges {
            deleted: self.deleted.clone(),
            ..LocalChanges::default()
        };
        for (incidence, change) in &self.incidences {
            match change {
                Some(Change::Added) => changes.added.push(incidence.clone()),
                Some(Change::Modified) => changes.modified.push(incidence.clone()),
                None => {}
            }
        }
        Ok(changes)
    }

    async fn clear_local_changes(&mut self) -> Result<(), StorageError> {
        for (_, change) in &mut self.incidences {
            *change = None;
        }
        self.deleted.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(uid: &str) -> Incidence {
        let mut event = Incidence::new_event();
        event.uid = uid.to_string();
        event
    }

    #[tokio::test]
    async fn remote_writes_are_not_local_changes() {
        let mut storage = MemoryStorage::new();
        storage.insert(event("a")).await.unwrap();
        let mut updated = event("a");
        updated.summary = "changed".to_string();
        storage.update(updated).await.unwrap();

        assert!(storage.local_changes().await.unwrap().is_empty());
        assert_eq!(storage.get("a", None).unwrap().summary, "changed");
    }

    #[tokio::test]
    async fn tracks_local_changes_until_cleared() {
        let mut storage = MemoryStorage::new();
        storage.insert(event("synced")).await.unwrap();
        storage.insert(event("doomed")).await.unwrap();
        storage.local_add(event("new")).unwrap();
        storage.local_modify(event("synced")).unwrap();
        storage.local_delete("doomed", None).unwrap();

        let changes = storage.local_changes().await.unwrap();
        assert_eq!(changes.added.len(), 1);
        assert_eq!(changes.modified.len(), 1);
        assert_eq!(changes.deleted.len(), 1);
        assert_eq!(changes.deleted[0].uid, "doomed");

        storage.clear_local_changes().await.unwrap();
        assert!(storage.local_changes().await.unwrap().is_empty());
        assert_eq!(storage.len(), 2);
    }

    #[tokio::test]
    async fn modified_creation_stays_a_creation() {
        let mut storage = MemoryStorage::new();
        storage.local_add(event("new")).unwrap();
        storage.local_modify(event("new")).unwrap();
        let changes = storage.local_changes().await.unwrap();
        assert_eq!(changes.added.len(), 1);
        assert!(changes.modified.is_empty());

        storage.local_delete("new", None).unwrap();
        assert!(storage.local_changes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn identity_includes_recurrence_id() {
        let rid = CalDateTime::parse("20121109T100000Z", None, false).unwrap();
        let mut exception = event("series");
        exception.recurrence_id = Some(rid.clone());

        let mut storage = MemoryStorage::new();
        storage.insert(event("series")).await.unwrap();
        storage.insert(exception).await.unwrap();
        assert_eq!(
            storage.insert(event("series")).await,
            Err(StorageError::Duplicate("series".to_string()))
        );

        assert!(storage.incidence("series", Some(&rid)).await.unwrap().is_some());
        storage.delete("series", None).await.unwrap();
        assert!(storage.incidence("series", None).await.unwrap().is_none());
        assert_eq!(storage.incidences().await.unwrap().len(), 1);
    }
}
