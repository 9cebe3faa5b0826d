// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeSet, HashMap};

use nbsync_caldav::{CalendarResource, Delete, ETag, Href, Put, Report, Request};
use nbsync_ical::{CalDateTime, Incidence};
use tokio_util::sync::CancellationToken;

use crate::config::NotebookConfig;
use crate::error::SyncError;
use crate::incidence_handler::{
    are_equivalent, copy_properties, local_uid, native_uid, prepare_imported_incidence,
    strip_sync_markers, to_export_form,
};
use crate::metadata::{ResourceInfo, SyncMetadata};
use crate::storage::{NotebookStorage, StorageError, same_recurrence_id};

/// Local detachments of recurring series, keyed by the href of the series.
type ExceptionOccurrences = HashMap<Href, Vec<Option<CalDateTime>>>;

/// Counts of what a sync pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Remote incidences inserted locally.
    pub inserted: usize,
    /// Local incidences updated from the server.
    pub updated: usize,
    /// Remote incidences already equal to the local copy.
    pub unchanged: usize,
    /// Local incidences removed because they vanished remotely.
    pub deleted_locally: usize,
    /// Calendar resources uploaded.
    pub uploaded: usize,
    /// Calendar resources deleted remotely.
    pub deleted_remotely: usize,
}

/// Synchronizes one local notebook with one remote calendar collection.
///
/// Local incidences use `NBUID:<notebook id>:<uid>` uids. Locally created
/// incidences should use that form too, see
/// [`local_uid`](crate::incidence_handler::local_uid).
#[derive(Debug)]
pub struct NotebookSyncAgent<S> {
    config: NotebookConfig,
    storage: S,
    metadata: SyncMetadata,
    request: Request,
}

impl<S: NotebookStorage> NotebookSyncAgent<S> {
    /// Creates an agent with empty sync metadata.
    #[must_use]
    pub fn new(config: NotebookConfig, storage: S, request: Request) -> Self {
        Self {
            config,
            storage,
            metadata: SyncMetadata::new(),
            request,
        }
    }

    /// Resumes from the metadata of an earlier pass.
    #[must_use]
    pub fn with_metadata(mut self, metadata: SyncMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The notebook configuration.
    #[must_use]
    pub fn config(&self) -> &NotebookConfig {
        &self.config
    }

    /// The local storage.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The local storage, for making local edits between passes.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// The sync metadata to persist between passes.
    #[must_use]
    pub fn metadata(&self) -> &SyncMetadata {
        &self.metadata
    }

    /// The token cancelling every request of this agent.
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        self.request.cancel_token()
    }

    /// Releases the storage and the sync metadata.
    #[must_use]
    pub fn into_parts(self) -> (S, SyncMetadata) {
        (self.storage, self.metadata)
    }

    /// Applies remote resources to the local storage.
    ///
    /// New incidences are inserted, changed ones merged into the local copy,
    /// equivalent ones left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage fails.
    pub async fn update_incidences(
        &mut self,
        resources: &[CalendarResource],
    ) -> Result<(), SyncError> {
        let mut summary = SyncSummary::default();
        for resource in resources {
            self.apply(resource, &mut summary).await?;
        }
        Ok(())
    }

    async fn apply(
        &mut self,
        resource: &CalendarResource,
        summary: &mut SyncSummary,
    ) -> Result<(), SyncError> {
        let notebook = self.config.notebook_id.clone();
        for remote in &resource.incidences {
            let mut incidence = remote.clone();
            prepare_imported_incidence(&mut incidence);
            incidence.uid = local_uid(&notebook, &remote.uid);

            let rid = incidence.recurrence_id.clone();
            self.metadata.record(
                &notebook,
                &incidence.uid,
                rid.as_ref(),
                ResourceInfo {
                    href: resource.href.clone(),
                    etag: resource.etag.clone(),
                },
            );

            match self.storage.incidence(&incidence.uid, rid.as_ref()).await? {
                None => {
                    tracing::debug!(uid = %incidence.uid, href = %resource.href, "inserting incidence");
                    self.storage.insert(incidence).await?;
                    summary.inserted += 1;
                }
                Some(mut local) if !are_equivalent(&local, &incidence) => {
                    tracing::debug!(uid = %incidence.uid, href = %resource.href, "updating incidence");
                    copy_properties(&mut local, &incidence);
                    self.storage.update(local).await?;
                    summary.updated += 1;
                }
                Some(_) => {
                    tracing::debug!(uid = %incidence.uid, "incidence unchanged");
                    summary.unchanged += 1;
                }
            }
        }
        Ok(())
    }

    /// Drops the pending local edits of `href` that only echo the server.
    ///
    /// For every recurrence id of the resource, a pending edit stored at
    /// `href` with that recurrence id is removed from `pending` when it is
    /// equivalent to the remote instance. Occurrences detached locally, as
    /// listed in `exception_occurrences`, are never removed.
    pub fn remove_possible_local_modification_if_identical(
        &self,
        href: &Href,
        recurrence_ids: &[Option<CalDateTime>],
        resource: &CalendarResource,
        exception_occurrences: &ExceptionOccurrences,
        pending: &mut Vec<Incidence>,
    ) {
        let notebook = &self.config.notebook_id;
        let exceptions = exception_occurrences.get(href).map_or(&[][..], Vec::as_slice);

        for rid in recurrence_ids {
            if exceptions.iter().any(|e| same_recurrence_id(e.as_ref(), rid.as_ref())) {
                tracing::debug!(%href, ?rid, "keeping local exception occurrence");
                continue;
            }

            let Some(position) = pending.iter().position(|local| {
                same_recurrence_id(local.recurrence_id.as_ref(), rid.as_ref())
                    && self
                        .metadata
                        .resource_of(notebook, local)
                        .is_some_and(|info| &info.href == href)
            }) else {
                continue;
            };

            let Some(remote) = resource
                .incidences
                .iter()
                .find(|r| same_recurrence_id(r.recurrence_id.as_ref(), rid.as_ref()))
            else {
                continue;
            };

            let mut remote = remote.clone();
            prepare_imported_incidence(&mut remote);
            strip_sync_markers(&mut remote);

            let Some(local) = pending.get(position) else {
                continue;
            };
            let mut local = local.clone();
            strip_sync_markers(&mut local);

            if are_equivalent(&local, &remote) {
                tracing::debug!(%href, ?rid, "dropping local modification identical to remote");
                pending.remove(position);
            } else {
                tracing::debug!(%href, ?rid, "keeping genuine local modification");
            }
        }
    }

    /// Runs one full two-way sync pass.
    ///
    /// Remote changes are applied first, unless a genuine local edit of the
    /// same resource is pending, in which case the local edit wins. Local
    /// additions, modifications and deletions are then uploaded.
    ///
    /// # Errors
    ///
    /// Returns an error if a request or the storage fails. Metadata of work
    /// already done is kept.
    #[tracing::instrument(skip(self), fields(notebook = %self.config.notebook_id))]
    pub async fn sync(&mut self) -> Result<SyncSummary, SyncError> {
        let mut summary = SyncSummary::default();
        let notebook = self.config.notebook_id.clone();
        let path = self.config.collection_path();

        let remote = self.remote_etags(&path).await?;
        let known = self.metadata.resources(&notebook);

        let changes = self.storage.local_changes().await?;
        let mut added = changes.added;
        let mut pending = changes.modified;
        let deleted = changes.deleted;

        // vanished remotely
        let vanished = self.confirm_vanished(&path, &remote, &known).await?;
        for href in &vanished {
            for (uid, rid) in self.metadata.incidences_at(&notebook, href) {
                self.metadata.remove(&notebook, &uid, rid.as_ref());
                let edited = pending.iter().position(|p| {
                    p.uid == uid && same_recurrence_id(p.recurrence_id.as_ref(), rid.as_ref())
                });
                if let Some(position) = edited {
                    tracing::debug!(%href, %uid, "resource vanished, uploading local edit as new");
                    added.push(pending.remove(position));
                    continue;
                }
                match self.storage.delete(&uid, rid.as_ref()).await {
                    Ok(()) => summary.deleted_locally += 1,
                    Err(StorageError::NotFound(_)) => {}
                    Err(err) => return Err(err.into()),
                }
            }
        }

        // new or changed remotely
        let mut changed: Vec<Href> = remote
            .iter()
            .filter(|(href, etag)| etag.is_none() || known.get(*href) != Some(*etag))
            .map(|(href, _)| href.clone())
            .collect();
        changed.sort();
        tracing::debug!(changed = changed.len(), vanished = vanished.len(), "diffed remote state");

        if !changed.is_empty() {
            let mut report = Report::new(self.request.clone());
            report.multi_get_events(&path, &changed).await?;
            let exception_occurrences = self.exception_occurrences(&added, &pending);

            for resource in report.into_calendar_resources() {
                let recurrence_ids: Vec<_> =
                    resource.incidences.iter().map(|i| i.recurrence_id.clone()).collect();
                self.remove_possible_local_modification_if_identical(
                    &resource.href,
                    &recurrence_ids,
                    &resource,
                    &exception_occurrences,
                    &mut pending,
                );

                let locally_edited = pending.iter().chain(&deleted).any(|p| {
                    self.metadata
                        .resource_of(&notebook, p)
                        .is_some_and(|info| info.href == resource.href)
                });
                if locally_edited {
                    tracing::debug!(href = %resource.href, "local edit wins over remote change");
                    self.metadata.update_etag(&notebook, &resource.href, resource.etag.clone());
                    continue;
                }
                self.apply(&resource, &mut summary).await?;
            }
        }

        self.upload(&path, added, pending, deleted, &mut summary).await?;
        self.storage.clear_local_changes().await?;

        tracing::info!(?summary, "notebook sync finished");
        Ok(summary)
    }

    /// Remote hrefs and etags, without the collection itself.
    async fn remote_etags(&self, path: &str) -> Result<HashMap<Href, Option<ETag>>, SyncError> {
        let (from, to) = self.config.window();
        let mut report = Report::new(self.request.clone());
        report.get_all_etags(path, from, to).await?;
        Ok(report
            .into_calendar_resources()
            .into_iter()
            .filter(|r| r.href.trim_end_matches('/') != path.trim_end_matches('/'))
            .map(|r| (r.href, r.etag))
            .collect())
    }

    /// Known hrefs missing from the remote listing that are really gone.
    ///
    /// With a sync window, a resource may merely lie outside of it, so the
    /// candidates are asked for by href.
    async fn confirm_vanished(
        &self,
        path: &str,
        remote: &HashMap<Href, Option<ETag>>,
        known: &HashMap<Href, Option<ETag>>,
    ) -> Result<Vec<Href>, SyncError> {
        let mut candidates: Vec<Href> = known
            .keys()
            .filter(|href| !remote.contains_key(*href))
            .cloned()
            .collect();
        candidates.sort();
        if candidates.is_empty() || self.config.window() == (None, None) {
            return Ok(candidates);
        }

        let mut report = Report::new(self.request.clone());
        report.multi_get_etags(path, &candidates).await?;
        let existing: BTreeSet<Href> = report
            .into_calendar_resources()
            .into_iter()
            .filter(|r| r.etag.is_some())
            .map(|r| r.href)
            .collect();
        candidates.retain(|href| !existing.contains(href));
        Ok(candidates)
    }

    /// Locally detached occurrences of synced series.
    fn exception_occurrences(
        &self,
        added: &[Incidence],
        pending: &[Incidence],
    ) -> ExceptionOccurrences {
        let notebook = &self.config.notebook_id;
        let mut occurrences = ExceptionOccurrences::new();
        for incidence in added.iter().chain(pending) {
            let Some(rid) = &incidence.recurrence_id else {
                continue;
            };
            if self.metadata.get(notebook, &incidence.uid, Some(rid)).is_some() {
                continue;
            }
            if let Some(series) = self.metadata.get(notebook, &incidence.uid, None) {
                occurrences
                    .entry(series.href.clone())
                    .or_default()
                    .push(Some(rid.clone()));
            }
        }
        occurrences
    }

    async fn upload(
        &mut self,
        path: &str,
        added: Vec<Incidence>,
        pending: Vec<Incidence>,
        deleted: Vec<Incidence>,
        summary: &mut SyncSummary,
    ) -> Result<(), SyncError> {
        let notebook = self.config.notebook_id.clone();
        let put = Put::new(self.request.clone());
        let delete = Delete::new(self.request.clone());

        // series to upload as a whole, by local uid
        let mut series = BTreeSet::new();

        for incidence in added {
            let series_known = self.metadata.get(&notebook, &incidence.uid, None).is_some();
            if incidence.recurrence_id.is_some() && series_known {
                series.insert(incidence.uid);
                continue;
            }
            let href = Href::from(format!("{path}{}.ics", native_uid(&incidence.uid)));
            let etag = put.send_incidences(&href, &[to_export_form(&incidence)], None).await?;
            tracing::debug!(%href, uid = %incidence.uid, "uploaded new incidence");
            self.metadata.record(
                &notebook,
                &incidence.uid,
                incidence.recurrence_id.as_ref(),
                ResourceInfo { href, etag },
            );
            summary.uploaded += 1;
        }

        series.extend(pending.into_iter().map(|incidence| incidence.uid));

        for incidence in deleted {
            let Some(info) = self.metadata.resource_of(&notebook, &incidence) else {
                tracing::debug!(uid = %incidence.uid, "deleted incidence was never synced");
                continue;
            };
            if incidence.recurrence_id.is_some() {
                // removing one occurrence rewrites its series
                self.metadata.remove(&notebook, &incidence.uid, incidence.recurrence_id.as_ref());
                series.insert(incidence.uid);
                continue;
            }
            delete.delete_resource(&info.href, info.etag.as_ref()).await?;
            tracing::debug!(href = %info.href, uid = %incidence.uid, "deleted remote resource");
            for (uid, rid) in self.metadata.incidences_at(&notebook, &info.href) {
                self.metadata.remove(&notebook, &uid, rid.as_ref());
            }
            summary.deleted_remotely += 1;
        }

        if series.is_empty() {
            return Ok(());
        }
        let stored = self.storage.incidences().await?;
        for uid in series {
            let members: Vec<&Incidence> = stored.iter().filter(|i| i.uid == uid).collect();
            if members.is_empty() {
                continue;
            }
            let info = members
                .iter()
                .find_map(|i| self.metadata.resource_of(&notebook, i))
                .unwrap_or_else(|| ResourceInfo {
                    href: Href::from(format!("{path}{}.ics", native_uid(&uid))),
                    etag: None,
                });

            let exported: Vec<Incidence> = members.iter().map(|i| to_export_form(i)).collect();
            let etag = put.send_incidences(&info.href, &exported, info.etag.as_ref()).await?;
            tracing::debug!(href = %info.href, %uid, count = exported.len(), "uploaded series");

            for member in &members {
                let etag = etag.clone().or_else(|| info.etag.clone());
                let href = info.href.clone();
                let rid = member.recurrence_id.as_ref();
                self.metadata.record(&notebook, &uid, rid, ResourceInfo { href, etag });
            }
            summary.uploaded += 1;
        }
        Ok(())
    }
}
