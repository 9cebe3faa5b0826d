// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Calendar item model.
//!
//! An [`Incidence`] holds the properties shared by every calendar component,
//! and an [`IncidenceKind`] holds the per-type data. Start and end are kept
//! behind setters because they drive the all-day flag.

use std::collections::BTreeMap;
use std::fmt;

use jiff::civil::{Date, Time};
use jiff::{SignedDuration, Timestamp};

use crate::datetime::CalDateTime;
use crate::value::{ValueError, parse_integer};

/// Organizer or attendee identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Person {
    /// Common name (CN parameter)
    pub name: String,
    /// Email address without the `mailto:` scheme
    pub email: String,
}

impl Person {
    /// Creates a person, stripping a `mailto:` scheme from the address.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let email: String = email.into();
        Self {
            name: name.into(),
            email: strip_mailto(&email).to_string(),
        }
    }

    /// Name and address as `Name <email>`, or whichever part is present.
    #[must_use]
    pub fn full_name(&self) -> String {
        match (self.name.is_empty(), self.email.is_empty()) {
            (false, false) => format!("{} <{}>", self.name, self.email),
            (false, true) => self.name.clone(),
            (true, _) => self.email.clone(),
        }
    }

    /// Whether both name and email are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.email.is_empty()
    }
}

/// Strips a case-insensitive `mailto:` prefix.
#[must_use]
pub fn strip_mailto(address: &str) -> &str {
    match address.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("mailto:") => address.get(7..).unwrap_or_default(),
        _ => address,
    }
}

/// Participation role (ROLE parameter)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING-KEBAB-CASE", ascii_case_insensitive)]
pub enum ParticipationRole {
    /// Required participant
    #[default]
    ReqParticipant,
    /// Optional participant
    OptParticipant,
    /// Informational only
    NonParticipant,
    /// Chair of the meeting
    Chair,
}

/// Participation status (PARTSTAT parameter)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING-KEBAB-CASE", ascii_case_insensitive)]
pub enum ParticipationStatus {
    /// No response yet
    #[default]
    NeedsAction,
    /// Accepted
    Accepted,
    /// Declined
    Declined,
    /// Tentatively accepted
    Tentative,
    /// Delegated to someone else
    Delegated,
    /// Completed (to-dos)
    Completed,
    /// In progress (to-dos)
    InProcess,
}

/// An attendee of an incidence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attendee {
    /// Who
    pub person: Person,
    /// Role in the incidence
    pub role: ParticipationRole,
    /// Reply status
    pub status: ParticipationStatus,
    /// Whether a reply is requested
    pub rsvp: bool,
}

impl Attendee {
    /// Creates an attendee with default role and status.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            person: Person::new(name, email),
            ..Self::default()
        }
    }
}

/// Access classification (CLASS property)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Secrecy {
    /// Public
    #[default]
    Public,
    /// Private
    Private,
    /// Confidential
    Confidential,
}

/// Time transparency of an event (TRANSP property)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Transparency {
    /// Blocks time
    #[default]
    Opaque,
    /// Does not block time
    Transparent,
}

/// Overall status (STATUS property)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    /// No status set
    #[default]
    None,
    /// Tentative
    Tentative,
    /// Confirmed
    Confirmed,
    /// Completed
    Completed,
    /// Needs action
    NeedsAction,
    /// Cancelled
    Cancelled,
    /// In process
    InProcess,
    /// Draft
    Draft,
    /// Final
    Final,
    /// Any other value, kept verbatim
    Custom(String),
}

impl Status {
    /// Maps a STATUS value to a status.
    #[must_use]
    pub fn from_ical(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "" => Self::None,
            "TENTATIVE" => Self::Tentative,
            "CONFIRMED" => Self::Confirmed,
            "COMPLETED" => Self::Completed,
            "NEEDS-ACTION" => Self::NeedsAction,
            "CANCELLED" => Self::Cancelled,
            "IN-PROCESS" => Self::InProcess,
            "DRAFT" => Self::Draft,
            "FINAL" => Self::Final,
            _ => Self::Custom(value.trim().to_string()),
        }
    }

    /// The STATUS value, or `None` when no status is set.
    #[must_use]
    pub fn as_ical(&self) -> Option<&str> {
        Some(match self {
            Self::None => return None,
            Self::Tentative => "TENTATIVE",
            Self::Confirmed => "CONFIRMED",
            Self::Completed => "COMPLETED",
            Self::NeedsAction => "NEEDS-ACTION",
            Self::Cancelled => "CANCELLED",
            Self::InProcess => "IN-PROCESS",
            Self::Draft => "DRAFT",
            Self::Final => "FINAL",
            Self::Custom(s) => s.as_str(),
        })
    }
}

/// Geographic position (GEO property)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geo {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

/// Attachment payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentValue {
    /// Reference by URI
    Uri(String),
    /// Inline base64 data, kept encoded
    Binary(String),
}

/// An attachment (ATTACH property)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Payload
    pub value: AttachmentValue,
    /// FMTTYPE parameter
    pub mime_type: Option<String>,
    /// Display label (X-LABEL parameter)
    pub label: Option<String>,
}

/// Alarm action (ACTION property)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum AlarmAction {
    /// Show a message
    #[default]
    Display,
    /// Play a sound
    Audio,
    /// Send an email
    Email,
    /// Run a procedure
    Procedure,
}

/// Which end of the incidence a relative trigger is measured from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TriggerRelation {
    /// Measured from the start
    #[default]
    Start,
    /// Measured from the end (or due date)
    End,
}

/// When an alarm fires (TRIGGER property)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmTrigger {
    /// Offset from the start or end of the incidence
    Relative {
        /// Signed offset
        offset: SignedDuration,
        /// Anchor
        related: TriggerRelation,
    },
    /// Fixed point in time
    Absolute(CalDateTime),
}

impl Default for AlarmTrigger {
    fn default() -> Self {
        Self::Relative {
            offset: SignedDuration::ZERO,
            related: TriggerRelation::Start,
        }
    }
}

/// An alarm (VALARM component)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alarm {
    /// What happens when it fires
    pub action: AlarmAction,
    /// When it fires
    pub trigger: AlarmTrigger,
    /// Resolved firing time, filled in against the parent incidence
    pub time: Option<CalDateTime>,
    /// Message
    pub description: String,
    /// Subject (email alarms)
    pub summary: String,
    /// Delay between repetitions (DURATION)
    pub snooze: Option<SignedDuration>,
    /// Number of repetitions
    pub repeat: u32,
}

impl Alarm {
    /// Resolves [`Alarm::time`] against the parent's start and end.
    ///
    /// A trigger related to the end falls back to the start when the parent
    /// has no end.
    pub fn resolve(&mut self, start: Option<&CalDateTime>, end: Option<&CalDateTime>) {
        self.time = match &self.trigger {
            AlarmTrigger::Absolute(at) => Some(at.clone()),
            AlarmTrigger::Relative { offset, related } => {
                let anchor = match related {
                    TriggerRelation::Start => start,
                    TriggerRelation::End => end.or(start),
                };
                anchor.and_then(|a| a.add_duration(*offset).ok())
            }
        };
    }
}

/// Recurrence frequency (FREQ rule part)
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Frequency {
    /// Every second
    Secondly,
    /// Every minute
    Minutely,
    /// Every hour
    Hourly,
    /// Every day
    Daily,
    /// Every week
    Weekly,
    /// Every month
    Monthly,
    /// Every year
    Yearly,
}

/// A recurrence rule (RRULE / EXRULE value)
///
/// FREQ, INTERVAL, COUNT and UNTIL are decoded; the remaining rule parts are
/// kept verbatim in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    /// FREQ
    pub frequency: Frequency,
    /// INTERVAL, 1 when absent
    pub interval: u32,
    /// COUNT
    pub count: Option<u32>,
    /// UNTIL
    pub until: Option<CalDateTime>,
    /// Other rule parts, e.g. `("BYDAY", "MO,WE")`
    pub parts: Vec<(String, String)>,
}

impl RecurrenceRule {
    /// Creates a rule with the given frequency and no limits.
    #[must_use]
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
            parts: Vec::new(),
        }
    }

    /// Parses a RECUR value.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::Rule`] if FREQ is missing or a decoded part is
    /// malformed.
    pub fn parse(value: &str) -> Result<Self, ValueError> {
        let err = || ValueError::Rule(value.to_string());

        let mut frequency = None;
        let mut rule = Self::new(Frequency::Daily);
        for part in value.trim().split(';').filter(|p| !p.is_empty()) {
            let (key, val) = part.split_once('=').ok_or_else(err)?;
            match key.to_ascii_uppercase().as_str() {
                "FREQ" => frequency = Some(val.parse::<Frequency>().map_err(|_| err())?),
                "INTERVAL" => rule.interval = parse_integer(val).map_err(|_| err())?,
                "COUNT" => rule.count = Some(parse_integer(val).map_err(|_| err())?),
                "UNTIL" => rule.until = Some(CalDateTime::parse(val, None, false)?),
                key => rule.parts.push((key.to_string(), val.to_string())),
            }
        }
        rule.frequency = frequency.ok_or_else(err)?;
        Ok(rule)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency)?;
        if self.interval != 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        if let Some(count) = self.count {
            write!(f, ";COUNT={count}")?;
        }
        if let Some(until) = &self.until {
            write!(f, ";UNTIL={}", until.to_basic_format())?;
        }
        for (key, val) in &self.parts {
            write!(f, ";{key}={val}")?;
        }
        Ok(())
    }
}

/// Recurrence set of an incidence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recurrence {
    /// RRULE
    pub rrules: Vec<RecurrenceRule>,
    /// RDATE
    pub rdates: Vec<CalDateTime>,
    /// EXRULE
    pub exrules: Vec<RecurrenceRule>,
    /// EXDATE
    pub exdates: Vec<CalDateTime>,
}

impl Recurrence {
    /// Whether the incidence recurs at all.
    #[must_use]
    pub fn recurs(&self) -> bool {
        !self.rrules.is_empty() || !self.rdates.is_empty()
    }

    /// Whether nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rrules.is_empty()
            && self.rdates.is_empty()
            && self.exrules.is_empty()
            && self.exdates.is_empty()
    }
}

/// Non-standard properties, keyed by their full `X-` name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomProperties(BTreeMap<String, String>);

impl CustomProperties {
    /// Full property name for an application-scoped key: `X-{APP}-{KEY}`.
    #[must_use]
    pub fn key(app: &str, key: &str) -> String {
        format!("X-{app}-{key}").to_ascii_uppercase()
    }

    /// Gets an application-scoped property.
    #[must_use]
    pub fn get(&self, app: &str, key: &str) -> Option<&str> {
        self.0.get(&Self::key(app, key)).map(String::as_str)
    }

    /// Sets an application-scoped property.
    pub fn set(&mut self, app: &str, key: &str, value: impl Into<String>) {
        self.0.insert(Self::key(app, key), value.into());
    }

    /// Removes an application-scoped property, returning its value.
    pub fn remove(&mut self, app: &str, key: &str) -> Option<String> {
        self.0.remove(&Self::key(app, key))
    }

    /// Gets a property by its full name.
    #[must_use]
    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_uppercase()).map(String::as_str)
    }

    /// Sets a property by its full name.
    pub fn set_raw(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_uppercase(), value.into());
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether no property is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Event specific data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventData {
    dt_end: Option<CalDateTime>,
    /// Time transparency
    pub transparency: Transparency,
}

/// To-do specific data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoData {
    /// Due date
    pub due: Option<CalDateTime>,
    /// Completion time
    pub completed: Option<CalDateTime>,
    /// Percent complete, 0 to 100
    pub percent_complete: u8,
    /// Start of the current occurrence of a recurring to-do
    /// (`X-LIBKCAL-DTRECURRENCE`)
    pub dt_recurrence: Option<CalDateTime>,
}

/// Type-specific part of an incidence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncidenceKind {
    /// VEVENT
    Event(EventData),
    /// VTODO
    Todo(TodoData),
    /// VJOURNAL
    Journal,
    /// VFREEBUSY
    FreeBusy,
    /// Any other component, with its name
    Unknown(String),
}

impl IncidenceKind {
    /// The incidence type tag.
    #[must_use]
    pub fn incidence_type(&self) -> IncidenceType {
        match self {
            Self::Event(_) => IncidenceType::Event,
            Self::Todo(_) => IncidenceType::Todo,
            Self::Journal => IncidenceType::Journal,
            Self::FreeBusy => IncidenceType::FreeBusy,
            Self::Unknown(_) => IncidenceType::Unknown,
        }
    }

    /// Component name, e.g. `VEVENT`.
    #[must_use]
    pub fn component_name(&self) -> &str {
        match self {
            Self::Event(_) => "VEVENT",
            Self::Todo(_) => "VTODO",
            Self::Journal => "VJOURNAL",
            Self::FreeBusy => "VFREEBUSY",
            Self::Unknown(name) => name,
        }
    }
}

/// Incidence type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum IncidenceType {
    /// Event
    Event,
    /// To-do
    Todo,
    /// Journal
    Journal,
    /// Free/busy
    FreeBusy,
    /// Unknown component
    Unknown,
}

/// A calendar item: event, to-do, journal, or free/busy block.
#[derive(Debug, Clone, PartialEq)]
pub struct Incidence {
    /// Unique identifier
    pub uid: String,
    /// Identifies a single occurrence of a recurring series
    pub recurrence_id: Option<CalDateTime>,
    /// Title
    pub summary: String,
    /// Body text
    pub description: String,
    /// Alternative (rich) description (`X-ALT-DESC`)
    pub alt_description: String,
    /// Location
    pub location: String,
    /// Organizer
    pub organizer: Option<Person>,
    /// Attendees
    pub attendees: Vec<Attendee>,
    /// COMMENT values
    pub comments: Vec<String>,
    /// CONTACT values
    pub contacts: Vec<String>,
    /// CATEGORIES
    pub categories: Vec<String>,
    /// RESOURCES
    pub resources: Vec<String>,
    /// Alarms
    pub alarms: Vec<Alarm>,
    /// Attachments
    pub attachments: Vec<Attachment>,
    /// Recurrence set
    pub recurrence: Recurrence,
    /// DURATION
    pub duration: Option<SignedDuration>,
    /// Whether the local store must not modify the incidence
    pub read_only: bool,
    /// GEO
    pub geo: Option<Geo>,
    /// CLASS
    pub secrecy: Secrecy,
    /// STATUS
    pub status: Status,
    /// SEQUENCE
    pub revision: u32,
    /// CREATED
    pub created: Option<Timestamp>,
    /// LAST-MODIFIED
    pub last_modified: Option<Timestamp>,
    /// `X-` properties
    pub custom_properties: CustomProperties,
    /// Per-type data
    pub kind: IncidenceKind,
    dt_start: Option<CalDateTime>,
    all_day: bool,
}

impl Incidence {
    /// Creates an empty incidence of the given kind.
    #[must_use]
    pub fn new(kind: IncidenceKind) -> Self {
        Self {
            uid: String::new(),
            recurrence_id: None,
            summary: String::new(),
            description: String::new(),
            alt_description: String::new(),
            location: String::new(),
            organizer: None,
            attendees: Vec::new(),
            comments: Vec::new(),
            contacts: Vec::new(),
            categories: Vec::new(),
            resources: Vec::new(),
            alarms: Vec::new(),
            attachments: Vec::new(),
            recurrence: Recurrence::default(),
            duration: None,
            read_only: false,
            geo: None,
            secrecy: Secrecy::default(),
            status: Status::default(),
            revision: 0,
            created: None,
            last_modified: None,
            custom_properties: CustomProperties::default(),
            kind,
            dt_start: None,
            all_day: false,
        }
    }

    /// Creates an empty event.
    #[must_use]
    pub fn new_event() -> Self {
        Self::new(IncidenceKind::Event(EventData::default()))
    }

    /// Creates an empty to-do.
    #[must_use]
    pub fn new_todo() -> Self {
        Self::new(IncidenceKind::Todo(TodoData::default()))
    }

    /// Creates an empty journal.
    #[must_use]
    pub fn new_journal() -> Self {
        Self::new(IncidenceKind::Journal)
    }

    /// The incidence type tag.
    #[must_use]
    pub fn incidence_type(&self) -> IncidenceType {
        self.kind.incidence_type()
    }

    /// Start (DTSTART).
    #[must_use]
    pub fn dt_start(&self) -> Option<&CalDateTime> {
        self.dt_start.as_ref()
    }

    /// Sets the start; the all-day flag follows whether it is date-only.
    pub fn set_dt_start(&mut self, start: Option<CalDateTime>) {
        if let Some(start) = &start {
            self.all_day = start.is_date_only();
        }
        self.dt_start = start;
    }

    /// Explicit end of an event (DTEND), `None` for other kinds.
    #[must_use]
    pub fn dt_end(&self) -> Option<&CalDateTime> {
        match &self.kind {
            IncidenceKind::Event(e) => e.dt_end.as_ref(),
            _ => None,
        }
    }

    /// Sets the end of an event; the all-day flag follows whether it is
    /// date-only. Has no effect on other kinds.
    pub fn set_dt_end(&mut self, end: Option<CalDateTime>) {
        if let IncidenceKind::Event(e) = &mut self.kind {
            if let Some(end) = &end {
                self.all_day = end.is_date_only();
            }
            e.dt_end = end;
        }
    }

    /// End of an event from DTEND, or derived from DTSTART + DURATION.
    #[must_use]
    pub fn effective_end(&self) -> Option<CalDateTime> {
        if let Some(end) = self.dt_end() {
            return Some(end.clone());
        }
        let (start, duration) = (self.dt_start.as_ref()?, self.duration?);
        start.add_duration(duration).ok()
    }

    /// Whether the incidence spans whole days.
    #[must_use]
    pub fn all_day(&self) -> bool {
        self.all_day
    }

    /// Overrides the all-day flag.
    pub fn set_all_day(&mut self, all_day: bool) {
        self.all_day = all_day;
    }

    /// Last date touched by an event.
    ///
    /// All-day ends are inclusive. A timed end at midnight does not touch
    /// its own date.
    #[must_use]
    pub fn date_end(&self) -> Option<Date> {
        let end = self.effective_end()?;
        if self.all_day {
            return Some(end.date());
        }
        match end.time() {
            Some(t) if t == Time::midnight() => end.date().yesterday().ok(),
            _ => Some(end.date()),
        }
    }

    /// Whether an event ends on a later date than it starts.
    #[must_use]
    pub fn is_multi_day(&self) -> bool {
        match (self.dt_start.as_ref(), self.date_end()) {
            (Some(start), Some(end)) => start.date() < end,
            _ => false,
        }
    }

    /// Whether the incidence is an event.
    #[must_use]
    pub fn is_event(&self) -> bool {
        matches!(self.kind, IncidenceKind::Event(_))
    }

    /// Event data, for events.
    #[must_use]
    pub fn as_event(&self) -> Option<&EventData> {
        match &self.kind {
            IncidenceKind::Event(e) => Some(e),
            _ => None,
        }
    }

    /// To-do data, for to-dos.
    #[must_use]
    pub fn as_todo(&self) -> Option<&TodoData> {
        match &self.kind {
            IncidenceKind::Todo(t) => Some(t),
            _ => None,
        }
    }

    /// Mutable to-do data, for to-dos.
    pub fn as_todo_mut(&mut self) -> Option<&mut TodoData> {
        match &mut self.kind {
            IncidenceKind::Todo(t) => Some(t),
            _ => None,
        }
    }

    /// Whether a to-do has a due date.
    #[must_use]
    pub fn has_due_date(&self) -> bool {
        self.as_todo().is_some_and(|t| t.due.is_some())
    }

    /// Whether the incidence has a start.
    #[must_use]
    pub fn has_start_date(&self) -> bool {
        self.dt_start.is_some()
    }

    /// Whether a to-do is completed by date, percentage, or status.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.as_todo().is_some_and(|t| {
            t.completed.is_some() || t.percent_complete >= 100 || self.status == Status::Completed
        })
    }

    /// Whether a to-do carries a completion time.
    #[must_use]
    pub fn has_completed_date(&self) -> bool {
        self.as_todo().is_some_and(|t| t.completed.is_some())
    }

    /// Whether a to-do has neither due date nor completion.
    #[must_use]
    pub fn is_open_ended(&self) -> bool {
        self.as_todo().is_some() && !self.has_due_date() && !self.is_completed()
    }

    /// Whether the incidence recurs.
    #[must_use]
    pub fn recurs(&self) -> bool {
        self.recurrence.recurs()
    }

    /// Whether the incidence is an exception of a recurring series.
    #[must_use]
    pub fn has_recurrence_id(&self) -> bool {
        self.recurrence_id.is_some()
    }
}
