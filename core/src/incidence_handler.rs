// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Semantic equality, merging and local/wire normalization of incidences.
//!
//! Local all-day events carry an *inclusive* end date; the wire form carries
//! an *exclusive* `DTEND`. An all-day event received without an end gets
//! `end = start` plus a private marker so that it is sent back without one.

use std::fmt::Debug;

use nbsync_ical::{CalDateTime, Geo, Incidence, IncidenceKind, Person, model::strip_mailto};

use crate::metadata::{APP, LEGACY_ETAG_COMMENT, LEGACY_URI_COMMENT};

/// Marks an end that was synthesized from the start on import.
const DTEND_ADDED_AS_DTSTART: &str = "dtend-added-as-dtstart";

/// Prefix of notebook-scoped local uids: `NBUID:<notebook id>:<uid>`.
pub const NBUID_PREFIX: &str = "NBUID:";

/// Tolerance for coordinate comparison.
const GEO_EPSILON: f64 = 1e-12;

/// Builds the local uid of a remote uid within a notebook.
#[must_use]
pub fn local_uid(notebook_id: &str, uid: &str) -> String {
    format!("{NBUID_PREFIX}{notebook_id}:{uid}")
}

/// Strips the `NBUID:<notebook id>:` prefix, if any.
#[must_use]
pub fn native_uid(uid: &str) -> &str {
    uid.strip_prefix(NBUID_PREFIX)
        .and_then(|rest| rest.split_once(':'))
        .map_or(uid, |(_, native)| native)
}

macro_rules! ensure_equal {
    ($a:expr, $b:expr, $desc:literal) => {
        if $a != $b {
            tracing::debug!(
                left = ?$a,
                right = ?$b,
                "incidence {} properties are not equal",
                $desc
            );
            return false;
        }
    };
}

fn mismatch(desc: &str, a: &impl Debug, b: &impl Debug) -> bool {
    tracing::debug!(left = ?a, right = ?b, "incidence {desc} properties are not equal");
    false
}

/// Whether two incidences carry the same synced content.
///
/// Creation and modification times are not compared, nor are attachments
/// and resources. Alarms are compared as an ordered sequence.
#[must_use]
pub fn are_equivalent(a: &Incidence, b: &Incidence) -> bool {
    ensure_equal!(a.incidence_type(), b.incidence_type(), "type");
    ensure_equal!(a.duration, b.duration, "duration");
    ensure_equal!(a.duration.is_some(), b.duration.is_some(), "has-duration");
    ensure_equal!(a.read_only, b.read_only, "read-only");
    ensure_equal!(a.comments, b.comments, "comments");
    ensure_equal!(a.contacts, b.contacts, "contacts");
    ensure_equal!(a.alt_description, b.alt_description, "alt-description");
    ensure_equal!(a.categories, b.categories, "categories");
    ensure_equal!(a.description, b.description, "description");
    if !geo_equal(a.geo, b.geo) {
        return mismatch("geo", &a.geo, &b.geo);
    }
    ensure_equal!(a.geo.is_some(), b.geo.is_some(), "has-geo");
    ensure_equal!(a.location, b.location, "location");
    ensure_equal!(a.secrecy, b.secrecy, "secrecy");
    ensure_equal!(a.status, b.status, "status");
    ensure_equal!(a.summary, b.summary, "summary");

    ensure_equal!(a.recurs(), b.recurs(), "recurs");
    if a.recurs() && a.recurrence != b.recurrence {
        return mismatch("recurrence", &a.recurrence, &b.recurrence);
    }

    if !date_times_equal(a.dt_start(), b.dt_start(), a.all_day() && b.all_day()) {
        return mismatch("dtStart", &a.dt_start(), &b.dt_start());
    }

    let organizer_a = normalized_person(a.organizer.as_ref());
    let organizer_b = normalized_person(b.organizer.as_ref());
    ensure_equal!(organizer_a, organizer_b, "organizer");

    ensure_equal!(a.alarms, b.alarms, "alarms");

    match (&a.kind, &b.kind) {
        (IncidenceKind::Event(_), IncidenceKind::Event(_)) => events_equal(a, b),
        (IncidenceKind::Todo(_), IncidenceKind::Todo(_)) => todos_equal(a, b),
        // no type-specific properties
        _ => true,
    }
}

fn events_equal(a: &Incidence, b: &Incidence) -> bool {
    ensure_equal!(
        a.as_event().map(|e| e.transparency),
        b.as_event().map(|e| e.transparency),
        "transparency"
    );

    if a.all_day() && b.all_day() {
        let end_a = a.dt_end().map(CalDateTime::date);
        let end_b = b.dt_end().map(CalDateTime::date);
        if end_a != end_b {
            tracing::warn!(
                a_start = ?a.dt_start(),
                a_end = ?a.dt_end(),
                b_start = ?b.dt_start(),
                b_end = ?b.dt_end(),
                a_multi_day = a.is_multi_day(),
                b_multi_day = b.is_multi_day(),
                "all-day events end on different dates"
            );
            return false;
        }
    } else {
        if !date_times_equal(a.dt_end(), b.dt_end(), false) {
            return mismatch("dtEnd", &a.dt_end(), &b.dt_end());
        }
        ensure_equal!(a.is_multi_day(), b.is_multi_day(), "multi-day");
    }
    ensure_equal!(a.date_end(), b.date_end(), "dateEnd");
    true
}

fn todos_equal(a: &Incidence, b: &Incidence) -> bool {
    let (Some(ta), Some(tb)) = (a.as_todo(), b.as_todo()) else {
        return false;
    };
    ensure_equal!(a.has_completed_date(), b.has_completed_date(), "has-completed-date");
    if !date_times_equal(ta.dt_recurrence.as_ref(), tb.dt_recurrence.as_ref(), false) {
        return mismatch("dtRecurrence", &ta.dt_recurrence, &tb.dt_recurrence);
    }
    ensure_equal!(a.has_due_date(), b.has_due_date(), "has-due-date");
    if !date_times_equal(ta.due.as_ref(), tb.due.as_ref(), false) {
        return mismatch("due", &ta.due, &tb.due);
    }
    ensure_equal!(a.has_start_date(), b.has_start_date(), "has-start-date");
    ensure_equal!(a.is_completed(), b.is_completed(), "completed");
    if !date_times_equal(ta.completed.as_ref(), tb.completed.as_ref(), false) {
        return mismatch("completed-date", &ta.completed, &tb.completed);
    }
    ensure_equal!(a.is_open_ended(), b.is_open_ended(), "open-ended");
    ensure_equal!(ta.percent_complete, tb.percent_complete, "percent-complete");
    true
}

/// Compares by date when `date_only`, else by instant where one exists.
fn date_times_equal(a: Option<&CalDateTime>, b: Option<&CalDateTime>, date_only: bool) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) if date_only => a.date() == b.date(),
        (Some(a), Some(b)) => a.same_instant(b),
        _ => false,
    }
}

fn geo_equal(a: Option<Geo>, b: Option<Geo>) -> bool {
    let coordinates = |g: Option<Geo>| g.map_or((0.0, 0.0), |g| (g.latitude, g.longitude));
    let ((lat_a, lon_a), (lat_b, lon_b)) = (coordinates(a), coordinates(b));
    fuzzy_equal(lat_a, lat_b) && fuzzy_equal(lon_a, lon_b)
}

fn fuzzy_equal(a: f64, b: f64) -> bool {
    let diff = (a - b).abs();
    diff <= GEO_EPSILON * a.abs().min(b.abs()) || diff <= GEO_EPSILON
}

/// Organizer as `(name, email)` with any `mailto:` prefix removed.
fn normalized_person(person: Option<&Person>) -> (String, String) {
    person.map_or_else(Default::default, |p| {
        (p.name.clone(), strip_mailto(&p.email).to_string())
    })
}

/// Copies the synced content of `src` into `dest`.
///
/// The creation and modification times of `dest` are kept. Incidences of
/// different kinds are left untouched.
pub fn copy_properties(dest: &mut Incidence, src: &Incidence) {
    if dest.incidence_type() != src.incidence_type() {
        tracing::warn!(
            dest = %dest.incidence_type(),
            src = %src.incidence_type(),
            "incidences do not have the same type"
        );
        return;
    }

    let created = dest.created;
    let last_modified = dest.last_modified;

    if dest.recurrence != src.recurrence {
        dest.recurrence = src.recurrence.clone();
    }

    // before the end, as the end may be derived from it
    dest.duration = src.duration;

    match (&mut dest.kind, &src.kind) {
        (IncidenceKind::Event(d), IncidenceKind::Event(s)) => d.transparency = s.transparency,
        (IncidenceKind::Todo(d), IncidenceKind::Todo(s)) => {
            d.due.clone_from(&s.due);
            d.completed.clone_from(&s.completed);
            d.dt_recurrence.clone_from(&s.dt_recurrence);
            d.percent_complete = s.percent_complete;
        }
        _ => {}
    }
    if dest.dt_end() != src.dt_end() {
        dest.set_dt_end(src.dt_end().cloned());
    }

    // the setters recompute all-day
    if dest.dt_start() != src.dt_start() {
        dest.set_dt_start(src.dt_start().cloned());
    }
    dest.set_all_day(src.all_day());

    dest.organizer.clone_from(&src.organizer);
    dest.read_only = src.read_only;
    dest.alt_description.clone_from(&src.alt_description);
    dest.categories.clone_from(&src.categories);
    dest.description.clone_from(&src.description);
    dest.geo = src.geo;
    dest.location.clone_from(&src.location);
    dest.resources.clone_from(&src.resources);
    dest.secrecy = src.secrecy;
    dest.status.clone_from(&src.status);
    dest.summary.clone_from(&src.summary);
    dest.revision = src.revision;

    if dest.attendees != src.attendees {
        dest.attendees.clone_from(&src.attendees);
    }
    if dest.comments != src.comments {
        dest.comments.clone_from(&src.comments);
    }
    if dest.contacts != src.contacts {
        dest.contacts.clone_from(&src.contacts);
    }
    if dest.alarms != src.alarms {
        dest.alarms.clone_from(&src.alarms);
    }
    if dest.attachments != src.attachments {
        dest.attachments.clone_from(&src.attachments);
    }

    dest.created = created;
    dest.last_modified = last_modified;
}

/// Brings a received incidence into local form.
///
/// An all-day event without an end gets `end = start` and a marker
/// recording that the end was synthesized.
pub fn prepare_imported_incidence(incidence: &mut Incidence) {
    if !incidence.is_event() {
        tracing::warn!(uid = %incidence.uid, "not preparing imported non-event incidence");
        return;
    }
    if !incidence.all_day() {
        return;
    }

    if incidence.dt_end().is_none() {
        if let Some(start) = incidence.dt_start().cloned() {
            tracing::debug!(uid = %incidence.uid, %start, "adding DTEND equal to DTSTART");
            incidence
                .custom_properties
                .set(APP, DTEND_ADDED_AS_DTSTART, DTEND_ADDED_AS_DTSTART);
            incidence.set_dt_end(Some(start));
        }
    }
    incidence.set_all_day(true);
}

/// Builds the form of an incidence to upload.
///
/// Non-events are returned unchanged.
#[must_use]
pub fn to_export_form(source: &Incidence) -> Incidence {
    let mut event = source.clone();
    if !event.is_event() {
        tracing::debug!(uid = %event.uid, "incidence not an event, exporting as is");
        return event;
    }

    event.uid = native_uid(&source.uid).to_string();

    let all_day = event.all_day();
    if all_day {
        let marker = event.custom_properties.remove(APP, DTEND_ADDED_AS_DTSTART);
        let send_without_end =
            marker.is_some_and(|v| !v.is_empty()) && event.dt_start() == event.dt_end();

        if send_without_end {
            tracing::debug!(uid = %event.uid, "removing synthesized DTEND");
            event.set_dt_end(None);
        } else {
            // the local end is inclusive, DTEND is exclusive
            let base = event.dt_end().or(event.dt_start()).map(CalDateTime::date);
            let end = base.and_then(|d| d.tomorrow().ok()).map(CalDateTime::Date);
            tracing::debug!(uid = %event.uid, end = ?end, "setting exclusive DTEND");
            if end.is_some() {
                event.set_dt_end(end);
            }
        }
    }

    // older stores flagged date-only starts instead of storing a date
    let date_only_start = event.custom_properties.get(APP, "dtstart-date_only").is_some();
    if let Some(start) = event.dt_start().filter(|s| date_only_start && !s.is_date_only()) {
        let start = CalDateTime::Date(start.date());
        event.set_dt_start(Some(start));
    }

    if all_day {
        event.set_all_day(true);
    }

    for legacy in ["dtstart-date_only", "dtend-date_only"] {
        event.custom_properties.remove(APP, legacy);
    }
    strip_sync_markers(&mut event);

    if let Some(organizer) = event.organizer.clone() {
        event.attendees.retain(|attendee| {
            let is_organizer = attendee.person.email == organizer.email
                && attendee.person.full_name() == organizer.full_name();
            if is_organizer {
                let attendee = attendee.person.full_name();
                tracing::debug!(%attendee, "discarding organizer as attendee");
            }
            !is_organizer
        });
    }

    event
}

/// Removes the href and etag markers older stores kept inside incidences.
pub(crate) fn strip_sync_markers(incidence: &mut Incidence) {
    incidence.custom_properties.remove(APP, "uri");
    incidence.custom_properties.remove(APP, "etag");
    incidence.comments.retain(|comment| {
        let keep = !comment.starts_with(LEGACY_URI_COMMENT)
            && !comment.starts_with(LEGACY_ETAG_COMMENT);
        if !keep {
            tracing::debug!(%comment, "discarding sync marker comment");
        }
        keep
    });
}
