// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! iCalendar formatter.
//!
//! Dates are written exactly as stored on the incidence: callers uploading
//! an all-day event must convert its inclusive end to the exclusive wire
//! form first. Zoned values are written with a TZID parameter only; no
//! VTIMEZONE is emitted.

use crate::datetime::CalDateTime;
use crate::model::{
    Alarm, AlarmTrigger, AttachmentValue, Incidence, IncidenceKind, Secrecy, Transparency,
    TriggerRelation,
};
use crate::value::{escape_text, format_duration};

const PRODID: &str = "-//nbsync//NONSGML nbsync 0.1//EN";

/// Maximum line length in octets, excluding the line break.
const MAX_LINE_OCTETS: usize = 75;

/// Formats incidences as one VCALENDAR object.
#[must_use]
pub fn format_incidences(incidences: &[Incidence]) -> String {
    let mut w = Writer::default();
    w.property("BEGIN", &[], "VCALENDAR");
    w.property("VERSION", &[], "2.0");
    w.property("PRODID", &[], PRODID);
    for incidence in incidences {
        write_incidence(&mut w, incidence);
    }
    w.property("END", &[], "VCALENDAR");
    w.out
}

#[derive(Debug, Default)]
struct Writer {
    out: String,
}

impl Writer {
    fn property(&mut self, name: &str, params: &[(&str, String)], value: &str) {
        let mut line = String::from(name);
        for (key, val) in params {
            line.push(';');
            line.push_str(key);
            line.push('=');
            if val.contains([':', ';', ',']) {
                line.push('"');
                line.push_str(&val.replace('"', ""));
                line.push('"');
            } else {
                line.push_str(val);
            }
        }
        line.push(':');
        line.push_str(value);
        self.fold(&line);
    }

    fn text(&mut self, name: &str, value: &str) {
        if !value.is_empty() {
            self.property(name, &[], &escape_text(value));
        }
    }

    fn date_time(&mut self, name: &str, value: &CalDateTime) {
        let params = match value {
            CalDateTime::Date(_) => vec![("VALUE", "DATE".to_string())],
            CalDateTime::Zoned { tzid, .. } => vec![("TZID", tzid.clone())],
            CalDateTime::Floating(_) | CalDateTime::Utc(_) => Vec::new(),
        };
        self.property(name, &params, &value.to_basic_format());
    }

    fn fold(&mut self, line: &str) {
        let mut width = 0;
        for c in line.chars() {
            let len = c.len_utf8();
            if width + len > MAX_LINE_OCTETS {
                self.out.push_str("\r\n ");
                width = 1;
            }
            self.out.push(c);
            width += len;
        }
        self.out.push_str("\r\n");
    }
}

fn write_incidence(w: &mut Writer, incidence: &Incidence) {
    let component = incidence.kind.component_name();
    w.property("BEGIN", &[], component);

    w.text("UID", &incidence.uid);
    if let Some(stamp) = incidence.last_modified.or(incidence.created) {
        w.property("DTSTAMP", &[], &stamp.strftime("%Y%m%dT%H%M%SZ").to_string());
    }
    if let Some(created) = incidence.created {
        w.property("CREATED", &[], &created.strftime("%Y%m%dT%H%M%SZ").to_string());
    }
    if let Some(modified) = incidence.last_modified {
        w.property("LAST-MODIFIED", &[], &modified.strftime("%Y%m%dT%H%M%SZ").to_string());
    }
    if incidence.revision > 0 {
        w.property("SEQUENCE", &[], &incidence.revision.to_string());
    }
    if let Some(rid) = &incidence.recurrence_id {
        w.date_time("RECURRENCE-ID", rid);
    }
    if let Some(start) = incidence.dt_start() {
        w.date_time("DTSTART", start);
    }

    match &incidence.kind {
        IncidenceKind::Event(event) => {
            if let Some(end) = incidence.dt_end() {
                w.date_time("DTEND", end);
            }
            if event.transparency == Transparency::Transparent {
                w.property("TRANSP", &[], &event.transparency.to_string());
            }
        }
        IncidenceKind::Todo(todo) => {
            if let Some(due) = &todo.due {
                w.date_time("DUE", due);
            }
            if let Some(completed) = &todo.completed {
                w.date_time("COMPLETED", completed);
            }
            if todo.percent_complete > 0 {
                w.property("PERCENT-COMPLETE", &[], &todo.percent_complete.to_string());
            }
            if let Some(rec) = &todo.dt_recurrence {
                w.date_time("X-LIBKCAL-DTRECURRENCE", rec);
            }
        }
        IncidenceKind::Journal | IncidenceKind::FreeBusy | IncidenceKind::Unknown(_) => {}
    }
    if let Some(duration) = incidence.duration {
        w.property("DURATION", &[], &format_duration(duration));
    }

    w.text("SUMMARY", &incidence.summary);
    w.text("DESCRIPTION", &incidence.description);
    w.text("LOCATION", &incidence.location);
    w.text("X-ALT-DESC", &incidence.alt_description);
    if incidence.secrecy != Secrecy::Public {
        w.property("CLASS", &[], &incidence.secrecy.to_string());
    }
    if let Some(status) = incidence.status.as_ical() {
        w.property("STATUS", &[], status);
    }
    if let Some(geo) = incidence.geo {
        w.property("GEO", &[], &format!("{};{}", geo.latitude, geo.longitude));
    }

    if let Some(organizer) = &incidence.organizer {
        let mut params = Vec::new();
        if !organizer.name.is_empty() {
            params.push(("CN", organizer.name.clone()));
        }
        w.property("ORGANIZER", &params, &format!("mailto:{}", organizer.email));
    }
    for attendee in &incidence.attendees {
        let mut params = Vec::new();
        if !attendee.person.name.is_empty() {
            params.push(("CN", attendee.person.name.clone()));
        }
        params.push(("ROLE", attendee.role.to_string()));
        params.push(("PARTSTAT", attendee.status.to_string()));
        if attendee.rsvp {
            params.push(("RSVP", "TRUE".to_string()));
        }
        w.property("ATTENDEE", &params, &format!("mailto:{}", attendee.person.email));
    }

    for comment in &incidence.comments {
        w.text("COMMENT", comment);
    }
    for contact in &incidence.contacts {
        w.text("CONTACT", contact);
    }
    write_list(w, "CATEGORIES", &incidence.categories);
    write_list(w, "RESOURCES", &incidence.resources);

    for rule in &incidence.recurrence.rrules {
        w.property("RRULE", &[], &rule.to_string());
    }
    for rule in &incidence.recurrence.exrules {
        w.property("EXRULE", &[], &rule.to_string());
    }
    for rdate in &incidence.recurrence.rdates {
        w.date_time("RDATE", rdate);
    }
    for exdate in &incidence.recurrence.exdates {
        w.date_time("EXDATE", exdate);
    }

    for attachment in &incidence.attachments {
        let mut params = Vec::new();
        if let Some(mime) = &attachment.mime_type {
            params.push(("FMTTYPE", mime.clone()));
        }
        if let Some(label) = &attachment.label {
            params.push(("X-LABEL", label.clone()));
        }
        match &attachment.value {
            AttachmentValue::Uri(uri) => w.property("ATTACH", &params, uri),
            AttachmentValue::Binary(data) => {
                params.push(("ENCODING", "BASE64".to_string()));
                params.push(("VALUE", "BINARY".to_string()));
                w.property("ATTACH", &params, data);
            }
        }
    }

    for (name, value) in incidence.custom_properties.iter() {
        w.property(name, &[], &escape_text(value));
    }

    for alarm in &incidence.alarms {
        write_alarm(w, alarm);
    }

    w.property("END", &[], component);
}

fn write_list(w: &mut Writer, name: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let value = items
        .iter()
        .map(|s| escape_text(s))
        .collect::<Vec<_>>()
        .join(",");
    w.property(name, &[], &value);
}

fn write_alarm(w: &mut Writer, alarm: &Alarm) {
    w.property("BEGIN", &[], "VALARM");
    w.property("ACTION", &[], &alarm.action.to_string());
    match &alarm.trigger {
        AlarmTrigger::Relative { offset, related } => {
            let params = match related {
                TriggerRelation::Start => Vec::new(),
                TriggerRelation::End => vec![("RELATED", "END".to_string())],
            };
            w.property("TRIGGER", &params, &format_duration(*offset));
        }
        AlarmTrigger::Absolute(at) => {
            w.property(
                "TRIGGER",
                &[("VALUE", "DATE-TIME".to_string())],
                &at.to_basic_format(),
            );
        }
    }
    w.text("DESCRIPTION", &alarm.description);
    w.text("SUMMARY", &alarm.summary);
    if let Some(snooze) = alarm.snooze {
        w.property("DURATION", &[], &format_duration(snooze));
    }
    if alarm.repeat > 0 {
        w.property("REPEAT", &[], &alarm.repeat.to_string());
    }
    w.property("END", &[], "VALARM");
}
