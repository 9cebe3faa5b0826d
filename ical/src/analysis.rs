// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Builds incidences from scanned content lines.
//!
//! Conversions from wire form to local form happen here:
//!
//! - An all-day event's exclusive `DTEND` becomes an inclusive end date,
//!   never earlier than the start.
//! - vCalendar 1.0 events running from midnight to 23:59 are all-day.
//! - A `UID` seen before a component starts is inherited by that component
//!   if it has none of its own.
//! - Alarm trigger times are resolved against the parent incidence.

use chumsky::DefaultExpected;
use chumsky::error::Error;
use chumsky::input::BorrowInput;
use chumsky::inspector::Inspector;
use chumsky::prelude::*;
use jiff::Timestamp;
use jiff::civil::{Time, time};
use jiff::tz::TimeZone;

use crate::datetime::CalDateTime;
use crate::lexer::Span;
use crate::model::{
    Alarm, AlarmTrigger, Attachment, AttachmentValue, Attendee, EventData, Geo, Incidence,
    IncidenceKind, Person, RecurrenceRule, Status, TodoData, TriggerRelation,
};
use crate::scanner::{ContentLine, scan_content_lines};
use crate::value::{
    ValueError, parse_duration, parse_float, parse_integer, split_text_list, unescape_text,
};

/// Error for calendar data that cannot be turned into incidences
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Input holds no component at all
    #[error("no calendar component found")]
    NoComponent,

    /// Component structure is broken: END does not match BEGIN, a component
    /// is not closed, or an END has no BEGIN
    #[error("invalid component structure at {}..{}: {reason}", span.start, span.end)]
    Syntax {
        /// Content line where the structure breaks
        span: Span,
        /// What was found and what was expected instead
        reason: String,
    },

    /// A property value does not match its type
    #[error("invalid {property} value: {source}")]
    Value {
        /// Property name
        property: String,
        /// Underlying error
        source: ValueError,
    },
}

/// Parses iCalendar text into incidences, in local form.
///
/// # Errors
///
/// Returns [`ParseError`] if the component structure is broken or a date
/// the incidence is placed by cannot be decoded. Malformed content lines,
/// unknown properties and other undecodable values are skipped.
pub fn parse_incidences(src: &str) -> Result<Vec<Incidence>, ParseError> {
    let scanned = scan_content_lines(src);
    for err in &scanned.errors {
        tracing::warn!(%err, "skipping malformed content line");
    }

    let lines = scanned.lines.as_slice();
    let root = document::<'_, _, Rich<'_, _>>()
        .parse(lines)
        .into_result()
        .map_err(|errs| syntax_error(src, lines, &errs))?;
    if root.children.is_empty() {
        return Err(ParseError::NoComponent);
    }

    let mut incidences = Vec::new();
    let mut pending_uid = None;
    collect(&root, Version::V2, &mut pending_uid, &mut incidences)?;
    Ok(incidences)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Version {
    /// vCalendar 1.0
    V1,
    /// iCalendar 2.0
    V2,
}

#[derive(Debug, Default)]
struct Component<'a> {
    name: String,
    properties: Vec<&'a ContentLine>,
    children: Vec<Component<'a>>,
}

/// Properties outside any component land on an unnamed root.
fn document<'a, I, Err>() -> impl Parser<'a, I, Component<'a>, extra::Err<Err>>
where
    I: BorrowInput<'a, Token = ContentLine, Span = SimpleSpan>,
    Err: Error<'a, I> + 'a,
{
    choice((property().map(Either::Left), component().map(Either::Right)))
        .repeated()
        .collect::<Vec<_>>()
        .map(|items| {
            let (properties, children) = items.into_iter().partition_either();
            Component {
                name: String::new(),
                properties,
                children,
            }
        })
}

fn component<'a, I, Err>() -> impl Parser<'a, I, Component<'a>, extra::Err<Err>> + Clone
where
    I: BorrowInput<'a, Token = ContentLine, Span = SimpleSpan>,
    Err: Error<'a, I> + 'a,
{
    recursive(|component| {
        let body = choice((property().map(Either::Left), component.map(Either::Right)))
            .repeated()
            .collect::<Vec<_>>()
            .map(|items| items.into_iter().partition_either());

        begin()
            .ignore_with_ctx(map_ctx(|_| (), body).then(end()))
            .map(|((properties, children), name)| Component {
                name,
                properties,
                children,
            })
    })
}

fn property<'a, I, E>() -> impl Parser<'a, I, &'a ContentLine, E> + Clone
where
    I: BorrowInput<'a, Token = ContentLine, Span = SimpleSpan>,
    E: extra::ParserExtra<'a, I>,
{
    select_ref! { line @ ContentLine { .. } if line.name != "BEGIN" && line.name != "END" => line }
}

fn begin<'a, I, E>() -> impl Parser<'a, I, String, E> + Clone
where
    I: BorrowInput<'a, Token = ContentLine, Span = SimpleSpan>,
    E: extra::ParserExtra<'a, I>,
{
    select_ref! { line @ ContentLine { .. } if line.name == "BEGIN" => component_name(line) }
}

fn end<'a, I, Err, State>() -> impl Parser<'a, I, String, extra::Full<Err, State, String>> + Clone
where
    I: BorrowInput<'a, Token = ContentLine, Span = SimpleSpan>,
    Err: Error<'a, I>,
    State: Inspector<'a, I>,
{
    select_ref! { line @ ContentLine { .. } if line.name == "END" => component_name(line) }.validate(
        |got, e, emitter| {
            let expected: &String = e.ctx();
            if &got != expected {
                emitter.emit(Err::expected_found(
                    [DefaultExpected::Token(end_line(expected).into())],
                    Some(end_line(&got).into()),
                    e.span(),
                ));
            }
            got
        },
    )
}

fn component_name(line: &ContentLine) -> String {
    line.value.trim().to_ascii_uppercase()
}

fn end_line(name: &str) -> ContentLine {
    ContentLine {
        name: "END".to_string(),
        params: Vec::new(),
        value: name.to_string(),
        span: Span::default(),
    }
}

fn syntax_error(src: &str, lines: &[ContentLine], errs: &[Rich<'_, ContentLine>]) -> ParseError {
    let eoi = Span::new(src.len(), src.len());
    match errs.first() {
        Some(err) => ParseError::Syntax {
            span: lines.get(err.span().start).map_or(eoi, |line| line.span),
            reason: err.to_string(),
        },
        None => ParseError::NoComponent,
    }
}

enum Either<L, R> {
    Left(L),
    Right(R),
}

trait EitherIterExt<L, R> {
    fn partition_either(self) -> (Vec<L>, Vec<R>);
}

impl<L, R, I> EitherIterExt<L, R> for I
where
    I: Iterator<Item = Either<L, R>>,
{
    fn partition_either(self) -> (Vec<L>, Vec<R>) {
        let mut lefts = Vec::new();
        let mut rights = Vec::new();
        for item in self {
            match item {
                Either::Left(l) => lefts.push(l),
                Either::Right(r) => rights.push(r),
            }
        }
        (lefts, rights)
    }
}

fn calendar_version(calendar: &Component<'_>) -> Version {
    match calendar.properties.iter().find(|l| l.name == "VERSION") {
        Some(line) if line.value.trim() == "1.0" => Version::V1,
        _ => Version::V2,
    }
}

fn collect(
    component: &Component<'_>,
    version: Version,
    pending_uid: &mut Option<String>,
    out: &mut Vec<Incidence>,
) -> Result<(), ParseError> {
    if let Some(line) = component.properties.iter().rev().find(|l| l.name == "UID") {
        *pending_uid = Some(unescape_text(&line.value).trim().to_string());
    }

    for child in &component.children {
        match child.name.as_str() {
            "VCALENDAR" => collect(child, calendar_version(child), pending_uid, out)?,
            "VTIMEZONE" | "VALARM" => {}
            _ => {
                let mut incidence = build_incidence(child, version)?;
                if incidence.uid.is_empty() {
                    if let Some(uid) = pending_uid.take() {
                        incidence.uid = uid;
                    }
                }
                out.push(incidence);
            }
        }
    }
    Ok(())
}

/// Properties that place an incidence in time or in its series. Any other
/// undecodable value is dropped with a warning.
const PLACEMENT_PROPERTIES: [&str; 3] = ["DTSTART", "DTEND", "RECURRENCE-ID"];

fn skip_invalid(line: &ContentLine, result: Result<(), ValueError>) -> Result<(), ParseError> {
    match result {
        Ok(()) => Ok(()),
        Err(source) if PLACEMENT_PROPERTIES.contains(&line.name.as_str()) => {
            Err(ParseError::Value {
                property: line.name.clone(),
                source,
            })
        }
        Err(source) => {
            tracing::warn!(property = %line.name, %source, "skipping invalid property value");
            Ok(())
        }
    }
}

fn build_incidence(component: &Component<'_>, version: Version) -> Result<Incidence, ParseError> {
    let kind = match component.name.as_str() {
        "VEVENT" => IncidenceKind::Event(EventData::default()),
        "VTODO" => IncidenceKind::Todo(TodoData::default()),
        "VJOURNAL" => IncidenceKind::Journal,
        "VFREEBUSY" => IncidenceKind::FreeBusy,
        other => IncidenceKind::Unknown(other.to_string()),
    };
    let mut incidence = Incidence::new(kind);

    let mut dates = Dates::default();
    for line in &component.properties {
        skip_invalid(line, apply_property(&mut incidence, line, &mut dates))?;
    }

    let (start, end) = if incidence.is_event() {
        local_event_dates(dates.start, dates.end, version)
    } else {
        (dates.start, dates.end)
    };
    incidence.set_dt_end(end);
    incidence.set_dt_start(start);

    let alarm_end = match incidence.as_todo() {
        Some(todo) => todo.due.clone(),
        None => incidence.effective_end(),
    };
    for child in component.children.iter().filter(|c| c.name == "VALARM") {
        if let Some(mut alarm) = build_alarm(child) {
            alarm.resolve(incidence.dt_start(), alarm_end.as_ref());
            incidence.alarms.push(alarm);
        }
    }

    Ok(incidence)
}

#[derive(Debug, Default)]
struct Dates {
    start: Option<CalDateTime>,
    end: Option<CalDateTime>,
}

fn local_event_dates(
    start: Option<CalDateTime>,
    end: Option<CalDateTime>,
    version: Version,
) -> (Option<CalDateTime>, Option<CalDateTime>) {
    const MIDNIGHT: Time = Time::midnight();
    const END_OF_DAY: [Time; 2] = [time(23, 59, 0, 0), time(23, 59, 59, 0)];

    match (start, end) {
        (Some(CalDateTime::Date(start)), Some(CalDateTime::Date(end))) => {
            let inclusive = end.yesterday().unwrap_or(end).max(start);
            (
                Some(CalDateTime::Date(start)),
                Some(CalDateTime::Date(inclusive)),
            )
        }
        (Some(CalDateTime::Floating(start)), Some(CalDateTime::Floating(end)))
            if version == Version::V1
                && start.time() == MIDNIGHT
                && END_OF_DAY.contains(&end.time()) =>
        {
            (
                Some(CalDateTime::Date(start.date())),
                Some(CalDateTime::Date(end.date().max(start.date()))),
            )
        }
        (start, end) => (start, end),
    }
}

fn apply_property(
    incidence: &mut Incidence,
    line: &ContentLine,
    dates: &mut Dates,
) -> Result<(), ValueError> {
    let value = line.value.as_str();
    match line.name.as_str() {
        "UID" => incidence.uid = unescape_text(value).trim().to_string(),
        "SUMMARY" => incidence.summary = unescape_text(value),
        "DESCRIPTION" => incidence.description = unescape_text(value),
        "LOCATION" => incidence.location = unescape_text(value),
        "X-ALT-DESC" => incidence.alt_description = unescape_text(value),
        "COMMENT" => incidence.comments.push(unescape_text(value)),
        "CONTACT" => incidence.contacts.push(unescape_text(value)),
        "CATEGORIES" => incidence.categories.extend(split_text_list(value)),
        "RESOURCES" => incidence.resources.extend(split_text_list(value)),
        "ORGANIZER" => {
            incidence.organizer = Some(Person::new(
                line.param("CN").unwrap_or_default(),
                value.trim(),
            ));
        }
        "ATTENDEE" => incidence.attendees.push(attendee(line)),
        "DTSTART" => dates.start = Some(date_time(line)?),
        "DTEND" => dates.end = Some(date_time(line)?),
        "RECURRENCE-ID" => incidence.recurrence_id = Some(date_time(line)?),
        "DURATION" => incidence.duration = Some(parse_duration(value)?),
        "RRULE" => incidence.recurrence.rrules.push(RecurrenceRule::parse(value)?),
        "EXRULE" => incidence.recurrence.exrules.push(RecurrenceRule::parse(value)?),
        "RDATE" => incidence.recurrence.rdates.extend(date_list(line)?),
        "EXDATE" => incidence.recurrence.exdates.extend(date_list(line)?),
        "CLASS" => incidence.secrecy = value.trim().parse().unwrap_or_default(),
        "STATUS" => incidence.status = Status::from_ical(value),
        "GEO" => incidence.geo = Some(geo(value)?),
        "SEQUENCE" => incidence.revision = parse_integer(value)?,
        "CREATED" => incidence.created = timestamp(line)?,
        "LAST-MODIFIED" => incidence.last_modified = timestamp(line)?,
        "ATTACH" => incidence.attachments.push(attachment(line)),
        "TRANSP" => {
            if let IncidenceKind::Event(event) = &mut incidence.kind {
                event.transparency = value.trim().parse().unwrap_or_default();
            }
        }
        "DUE" | "COMPLETED" | "PERCENT-COMPLETE" | "X-LIBKCAL-DTRECURRENCE"
            if incidence.as_todo().is_some() =>
        {
            apply_todo_property(incidence, line)?;
        }
        name if name.starts_with("X-") => {
            incidence
                .custom_properties
                .set_raw(name, unescape_text(value));
        }
        _ => {}
    }
    Ok(())
}

fn apply_todo_property(incidence: &mut Incidence, line: &ContentLine) -> Result<(), ValueError> {
    let Some(todo) = incidence.as_todo_mut() else {
        return Ok(());
    };
    match line.name.as_str() {
        "DUE" => todo.due = Some(date_time(line)?),
        "COMPLETED" => todo.completed = Some(date_time(line)?),
        "PERCENT-COMPLETE" => todo.percent_complete = parse_integer::<u8>(&line.value)?.min(100),
        "X-LIBKCAL-DTRECURRENCE" => todo.dt_recurrence = Some(date_time(line)?),
        _ => {}
    }
    Ok(())
}

fn date_time(line: &ContentLine) -> Result<CalDateTime, ValueError> {
    let date_only = line
        .param("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("DATE"));
    CalDateTime::parse(&line.value, line.param("TZID"), date_only)
}

fn date_list(line: &ContentLine) -> Result<Vec<CalDateTime>, ValueError> {
    let date_only = line
        .param("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("DATE"));
    line.value
        .split(',')
        .filter(|v| !v.trim().is_empty())
        // PERIOD values keep their start
        .map(|v| v.split('/').next().unwrap_or(v))
        .map(|v| CalDateTime::parse(v, line.param("TZID"), date_only))
        .collect()
}

fn timestamp(line: &ContentLine) -> Result<Option<Timestamp>, ValueError> {
    Ok(match date_time(line)? {
        CalDateTime::Utc(ts) => Some(ts),
        CalDateTime::Floating(dt) => dt.to_zoned(TimeZone::UTC).ok().map(|z| z.timestamp()),
        other => other.instant(),
    })
}

fn geo(value: &str) -> Result<Geo, ValueError> {
    let (lat, lon) = value
        .split_once([';', ','])
        .ok_or_else(|| ValueError::Number(value.to_string()))?;
    Ok(Geo {
        latitude: parse_float(lat)?,
        longitude: parse_float(lon)?,
    })
}

fn attendee(line: &ContentLine) -> Attendee {
    Attendee {
        person: Person::new(line.param("CN").unwrap_or_default(), line.value.trim()),
        role: line
            .param("ROLE")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default(),
        status: line
            .param("PARTSTAT")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default(),
        rsvp: line
            .param("RSVP")
            .is_some_and(|v| v.eq_ignore_ascii_case("TRUE")),
    }
}

fn attachment(line: &ContentLine) -> Attachment {
    let binary = line
        .param("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("BINARY"))
        || line
            .param("ENCODING")
            .is_some_and(|v| v.eq_ignore_ascii_case("BASE64"));
    let data = line.value.trim().to_string();
    Attachment {
        value: match binary {
            true => AttachmentValue::Binary(data),
            false => AttachmentValue::Uri(data),
        },
        mime_type: line.param("FMTTYPE").map(str::to_string),
        label: line.param("X-LABEL").map(str::to_string),
    }
}

/// Alarms without a usable TRIGGER are dropped.
fn build_alarm(component: &Component<'_>) -> Option<Alarm> {
    let mut alarm = Alarm::default();
    let mut trigger = None;
    for line in &component.properties {
        let value = line.value.as_str();
        let result = match line.name.as_str() {
            "ACTION" => {
                alarm.action = value.trim().parse().unwrap_or_default();
                Ok(())
            }
            "TRIGGER" => alarm_trigger(line).map(|t| trigger = Some(t)),
            "DESCRIPTION" => {
                alarm.description = unescape_text(value);
                Ok(())
            }
            "SUMMARY" => {
                alarm.summary = unescape_text(value);
                Ok(())
            }
            "DURATION" => parse_duration(value).map(|d| alarm.snooze = Some(d)),
            "REPEAT" => parse_integer(value).map(|n| alarm.repeat = n),
            _ => Ok(()),
        };
        if let Err(source) = result {
            tracing::warn!(property = %line.name, %source, "skipping invalid alarm property");
        }
    }
    trigger.map(|trigger| Alarm { trigger, ..alarm })
}

fn alarm_trigger(line: &ContentLine) -> Result<AlarmTrigger, ValueError> {
    let absolute = line
        .param("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("DATE-TIME"));
    if absolute {
        return date_time(line).map(AlarmTrigger::Absolute);
    }

    match parse_duration(&line.value) {
        Ok(offset) => Ok(AlarmTrigger::Relative {
            offset,
            related: match line.param("RELATED") {
                Some(v) if v.eq_ignore_ascii_case("END") => TriggerRelation::End,
                _ => TriggerRelation::Start,
            },
        }),
        // some clients omit VALUE=DATE-TIME on absolute triggers
        Err(err) => date_time(line).map(AlarmTrigger::Absolute).map_err(|_| err),
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, datetime};

    use super::*;

    fn single(src: &str) -> Incidence {
        let mut incidences = parse_incidences(src).unwrap();
        assert_eq!(incidences.len(), 1);
        incidences.remove(0)
    }

    #[test]
    fn all_day_end_becomes_inclusive() {
        let event = single(
            "BEGIN:VCALENDAR\nVERSION:2.0\nBEGIN:VEVENT\nUID:a\n\
             DTSTART;VALUE=DATE:20170324\nDTEND;VALUE=DATE:20170325\nEND:VEVENT\nEND:VCALENDAR\n",
        );
        assert!(event.all_day());
        assert_eq!(event.dt_start(), Some(&CalDateTime::Date(date(2017, 3, 24))));
        assert_eq!(event.dt_end(), Some(&CalDateTime::Date(date(2017, 3, 24))));
    }

    #[test]
    fn all_day_end_never_precedes_start() {
        let event = single(
            "BEGIN:VEVENT\nUID:a\nDTSTART;VALUE=DATE:20170324\nDTEND;VALUE=DATE:20170324\nEND:VEVENT\n",
        );
        assert_eq!(event.dt_end(), Some(&CalDateTime::Date(date(2017, 3, 24))));
    }

    #[test]
    fn vcalendar_midnight_to_end_of_day_is_all_day() {
        let event = single(
            "BEGIN:VCALENDAR\nVERSION:1.0\nBEGIN:VEVENT\nUID:a\n\
             DTSTART:20170324T000000\nDTEND:20170324T235900\nEND:VEVENT\nEND:VCALENDAR\n",
        );
        assert!(event.all_day());
        assert_eq!(event.dt_start(), Some(&CalDateTime::Date(date(2017, 3, 24))));
        assert_eq!(event.dt_end(), Some(&CalDateTime::Date(date(2017, 3, 24))));
    }

    #[test]
    fn icalendar_midnight_to_end_of_day_stays_timed() {
        let event = single(
            "BEGIN:VCALENDAR\nVERSION:2.0\nBEGIN:VEVENT\nUID:a\n\
             DTSTART:20170324T000000\nDTEND:20170324T235900\nEND:VEVENT\nEND:VCALENDAR\n",
        );
        assert!(!event.all_day());
        assert_eq!(
            event.dt_end(),
            Some(&CalDateTime::Floating(datetime(2017, 3, 24, 23, 59, 0, 0)))
        );
    }

    #[test]
    fn inherits_uid_seen_before_component() {
        let event = single(
            "BEGIN:VCALENDAR\nUID:early\nBEGIN:VEVENT\nSUMMARY:x\nEND:VEVENT\nEND:VCALENDAR\n",
        );
        assert_eq!(event.uid, "early");
    }

    #[test]
    fn own_uid_wins_over_inherited() {
        let event = single(
            "BEGIN:VCALENDAR\nUID:early\nBEGIN:VEVENT\nUID:own\nEND:VEVENT\nEND:VCALENDAR\n",
        );
        assert_eq!(event.uid, "own");
    }

    #[test]
    fn todo_fields() {
        let todo = single(
            "BEGIN:VTODO\nUID:t\nDUE;VALUE=DATE:20070415\nPERCENT-COMPLETE:150\nSTATUS:NEEDS-ACTION\nEND:VTODO\n",
        );
        let data = todo.as_todo().unwrap();
        assert_eq!(data.due, Some(CalDateTime::Date(date(2007, 4, 15))));
        assert_eq!(data.percent_complete, 100);
        assert_eq!(todo.status, Status::NeedsAction);
    }

    #[test]
    fn alarm_with_absolute_trigger_without_value_type() {
        let event = single(
            "BEGIN:VEVENT\nUID:a\nDTSTART:20170323T130000Z\n\
             BEGIN:VALARM\nACTION:AUDIO\nTRIGGER:20170323T120000Z\nEND:VALARM\nEND:VEVENT\n",
        );
        assert_eq!(event.alarms.len(), 1);
        assert_eq!(
            event.alarms[0].time.as_ref().map(CalDateTime::to_basic_format),
            Some("20170323T120000Z".to_string())
        );
    }

    #[test]
    fn alarm_without_trigger_is_dropped() {
        let event = single("BEGIN:VEVENT\nUID:a\nBEGIN:VALARM\nACTION:DISPLAY\nEND:VALARM\nEND:VEVENT\n");
        assert!(event.alarms.is_empty());
    }

    #[test]
    fn structure_errors() {
        assert!(matches!(parse_incidences(""), Err(ParseError::NoComponent)));
        for src in [
            "BEGIN:VCALENDAR\nBEGIN:VEVENT\nEND:VCALENDAR\n",
            "END:VEVENT\n",
            "BEGIN:VCALENDAR\nVERSION:2.0\n",
        ] {
            assert!(
                matches!(parse_incidences(src), Err(ParseError::Syntax { .. })),
                "{src:?} should be rejected"
            );
        }
    }

    #[test]
    fn mismatched_end_names_both_components() {
        let src = "BEGIN:VEVENT\nUID:a\nend:vtodo\n";
        let Err(ParseError::Syntax { span, reason }) = parse_incidences(src) else {
            panic!("mismatched END should be rejected");
        };
        assert_eq!(reason, "found 'END:VTODO' expected 'END:VEVENT'");
        assert_eq!(span.start, src.find("end:").unwrap());
    }

    #[test]
    fn malformed_lines_inside_component_are_skipped() {
        let event = single("BEGIN:VEVENT\nUID:a\nthis is not a property\nSUMMARY:x\nEND:VEVENT\n");
        assert_eq!(event.uid, "a");
        assert_eq!(event.summary, "x");
    }

    #[test]
    fn invalid_optional_values_are_skipped() {
        let event = single(
            "BEGIN:VEVENT\nUID:a\nSEQUENCE:-1\nGEO:north\nDURATION:soon\nSUMMARY:kept\n\
             DTSTART:20170324T100000Z\nEND:VEVENT\n",
        );
        assert_eq!(event.summary, "kept");
        assert_eq!(event.revision, 0);
        assert_eq!(event.geo, None);
        assert_eq!(event.duration, None);
        assert!(event.dt_start().is_some());
    }

    #[test]
    fn invalid_alarm_values_are_skipped() {
        let event = single(
            "BEGIN:VEVENT\nUID:a\nDTSTART:20170323T130000Z\n\
             BEGIN:VALARM\nTRIGGER:-PT15M\nREPEAT:often\nDURATION:x\nEND:VALARM\n\
             BEGIN:VALARM\nTRIGGER:whenever\nEND:VALARM\nEND:VEVENT\n",
        );
        assert_eq!(event.alarms.len(), 1);
        assert_eq!(event.alarms[0].repeat, 0);
        assert_eq!(event.alarms[0].snooze, None);
    }

    #[test]
    fn invalid_value_names_property() {
        let err = parse_incidences("BEGIN:VEVENT\nDTSTART:tomorrow\nEND:VEVENT\n").unwrap_err();
        assert!(matches!(err, ParseError::Value { ref property, .. } if property == "DTSTART"));
    }

    #[test]
    fn empty_calendar_has_no_incidences() {
        let incidences = parse_incidences("BEGIN:VCALENDAR\nVERSION:2.0\nEND:VCALENDAR\n").unwrap();
        assert!(incidences.is_empty());
    }
}
