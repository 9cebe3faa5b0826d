// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Calendar item model for nbsync, with iCalendar (RFC 5545) analysis and formatting.
//!
//! ```text
//! Source Text → Lexer → Token Stream → Scanner → Content Lines → Analysis → Incidences
//! ```
//!
//! The model keeps the local conventions used by the sync engine: all-day
//! events store an *inclusive* end date, while the wire form carries an
//! *exclusive* `DTEND`. [`parse_incidences`] converts wire to local form.

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

mod analysis;
pub mod datetime;
mod formatter;
pub mod lexer;
pub mod model;
pub mod scanner;
pub mod value;

pub use crate::analysis::{ParseError, parse_incidences};
pub use crate::datetime::CalDateTime;
pub use crate::formatter::format_incidences;
pub use crate::model::{
    Alarm, AlarmAction, AlarmTrigger, Attachment, AttachmentValue, Attendee, CustomProperties,
    EventData, Frequency, Geo, Incidence, IncidenceKind, IncidenceType, ParticipationRole,
    ParticipationStatus, Person, Recurrence, RecurrenceRule, Secrecy, Status, TodoData,
    Transparency, TriggerRelation,
};
pub use crate::value::ValueError;
