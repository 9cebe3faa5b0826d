// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation engine for one `CalDAV` notebook.
//!
//! [`NotebookSyncAgent`] fetches remote state with the `CalDAV` report
//! queries, applies it to a [`NotebookStorage`], suppresses local edits that
//! merely echo the server, and uploads the rest. The incidence handler
//! decides when a local and a remote version are the same and converts
//! between the local and the wire conventions.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool,
    clippy::module_name_repetitions
)]

mod agent;
mod config;
mod error;
pub mod incidence_handler;
mod metadata;
mod storage;

pub use crate::agent::{NotebookSyncAgent, SyncSummary};
pub use crate::config::NotebookConfig;
pub use crate::error::SyncError;
pub use crate::metadata::{ResourceInfo, SyncMetadata};
pub use crate::storage::{LocalChanges, MemoryStorage, NotebookStorage, StorageError};
