// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use jiff::civil::{Date, DateTime, Time};
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Timestamp, ToSpan, Zoned};
use serde::{Deserialize, Serialize};

use crate::value::{ValueError, parse_integer};

/// A calendar date or date-time, as carried by DTSTART, DTEND, DUE,
/// RECURRENCE-ID and friends.
///
/// Equality and hashing are structural: `Utc` and `Zoned` values that denote
/// the same instant are *not* equal. Comparisons of incidence dates and
/// recurrence ids go through [`CalDateTime::same_instant`], which compares
/// zoned values by instant when their timezone is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalDateTime {
    /// Date only, no time component
    Date(Date),

    /// Date and time without a timezone (floating local time)
    Floating(DateTime),

    /// Absolute UTC instant
    Utc(Timestamp),

    /// Wall-clock time in a named timezone
    Zoned {
        /// Wall-clock date-time
        datetime: DateTime,
        /// Timezone identifier as written in the TZID parameter
        tzid: String,
    },
}

impl CalDateTime {
    /// Parses a DATE or DATE-TIME value.
    ///
    /// A value of eight digits, or any value when `date_only` is set, is a
    /// DATE. A trailing `Z` marks UTC, and `tzid` turns a local time into a
    /// zoned one.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::DateTime`] if the value is malformed.
    pub fn parse(value: &str, tzid: Option<&str>, date_only: bool) -> Result<Self, ValueError> {
        let err = || ValueError::DateTime(value.to_string());
        let value = value.trim();

        let (date_part, time_part) = match value.split_once(['T', 't']) {
            Some((d, t)) => (d, Some(t)),
            None => (value, None),
        };
        let date = parse_date(date_part).ok_or_else(err)?;
        let time_part = match time_part {
            Some(t) if !date_only => t,
            _ => return Ok(Self::Date(date)),
        };

        let (time_part, utc) = match time_part.strip_suffix(['Z', 'z']) {
            Some(t) => (t, true),
            None => (time_part, false),
        };
        let time = parse_time(time_part).ok_or_else(err)?;
        let datetime = date.to_datetime(time);

        if utc {
            let ts = datetime.to_zoned(TimeZone::UTC).map_err(|_| err())?;
            return Ok(Self::Utc(ts.timestamp()));
        }
        Ok(match tzid {
            Some(tzid) if tzid.eq_ignore_ascii_case("UTC") => {
                let ts = datetime.to_zoned(TimeZone::UTC).map_err(|_| err())?;
                Self::Utc(ts.timestamp())
            }
            Some(tzid) => Self::Zoned {
                datetime,
                tzid: tzid.to_string(),
            },
            None => Self::Floating(datetime),
        })
    }

    /// Whether this value has no time component.
    #[must_use]
    pub fn is_date_only(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Whether this value is an absolute UTC instant.
    #[must_use]
    pub fn is_utc(&self) -> bool {
        matches!(self, Self::Utc(_))
    }

    /// The timezone identifier for zoned values.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match self {
            Self::Zoned { tzid, .. } => Some(tzid),
            _ => None,
        }
    }

    /// The calendar date, in the value's own frame (UTC for UTC instants).
    #[must_use]
    pub fn date(&self) -> Date {
        match self {
            Self::Date(d) => *d,
            Self::Floating(dt) | Self::Zoned { datetime: dt, .. } => dt.date(),
            Self::Utc(ts) => ts.to_zoned(TimeZone::UTC).date(),
        }
    }

    /// The time of day, or `None` for a date-only value.
    #[must_use]
    pub fn time(&self) -> Option<Time> {
        match self {
            Self::Date(_) => None,
            Self::Floating(dt) | Self::Zoned { datetime: dt, .. } => Some(dt.time()),
            Self::Utc(ts) => Some(ts.to_zoned(TimeZone::UTC).time()),
        }
    }

    /// The absolute instant, when it can be determined.
    ///
    /// Date-only and floating values have no instant; zoned values resolve
    /// only when the timezone is known to the system database.
    #[must_use]
    pub fn instant(&self) -> Option<Timestamp> {
        match self {
            Self::Utc(ts) => Some(*ts),
            Self::Zoned { datetime, tzid } => {
                let tz = TimeZone::get(tzid).ok()?;
                datetime.to_zoned(tz).ok().map(|z: Zoned| z.timestamp())
            }
            Self::Date(_) | Self::Floating(_) => None,
        }
    }

    /// Compares two values by instant when both resolve to one, otherwise
    /// structurally.
    #[must_use]
    pub fn same_instant(&self, other: &Self) -> bool {
        match (self.instant(), other.instant()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Shifts the value by whole days, keeping its kind and timezone.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is out of range.
    pub fn add_days(&self, days: i64) -> Result<Self, jiff::Error> {
        Ok(match self {
            Self::Date(d) => Self::Date(d.checked_add(days.days())?),
            Self::Floating(dt) => Self::Floating(dt.checked_add(days.days())?),
            Self::Utc(ts) => Self::Utc(ts.checked_add(SignedDuration::from_hours(24 * days))?),
            Self::Zoned { datetime, tzid } => Self::Zoned {
                datetime: datetime.checked_add(days.days())?,
                tzid: tzid.clone(),
            },
        })
    }

    /// Shifts the value by an exact duration. Date-only values are taken as
    /// floating midnight and yield a floating date-time.
    ///
    /// # Errors
    ///
    /// Returns an error if the result is out of range.
    pub fn add_duration(&self, duration: SignedDuration) -> Result<Self, jiff::Error> {
        Ok(match self {
            Self::Date(d) => Self::Floating(d.to_datetime(Time::midnight()).checked_add(duration)?),
            Self::Floating(dt) => Self::Floating(dt.checked_add(duration)?),
            Self::Utc(ts) => Self::Utc(ts.checked_add(duration)?),
            Self::Zoned { datetime, tzid } => Self::Zoned {
                datetime: datetime.checked_add(duration)?,
                tzid: tzid.clone(),
            },
        })
    }

    /// Formats the value in iCalendar basic format, e.g. `20170324`,
    /// `20170323T120000` or `20170323T120000Z`.
    #[must_use]
    pub fn to_basic_format(&self) -> String {
        match self {
            Self::Date(d) => d.strftime("%Y%m%d").to_string(),
            Self::Floating(dt) | Self::Zoned { datetime: dt, .. } => {
                dt.strftime("%Y%m%dT%H%M%S").to_string()
            }
            Self::Utc(ts) => ts.strftime("%Y%m%dT%H%M%SZ").to_string(),
        }
    }
}

impl fmt::Display for CalDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(d) => write!(f, "{d}"),
            Self::Floating(dt) => write!(f, "{dt}"),
            Self::Utc(ts) => write!(f, "{ts}"),
            Self::Zoned { datetime, tzid } => write!(f, "{datetime}[{tzid}]"),
        }
    }
}

impl From<Date> for CalDateTime {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime> for CalDateTime {
    fn from(value: DateTime) -> Self {
        Self::Floating(value)
    }
}

impl From<Timestamp> for CalDateTime {
    fn from(value: Timestamp) -> Self {
        Self::Utc(value)
    }
}

fn parse_date(s: &str) -> Option<Date> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = parse_integer::<i16>(s.get(0..4)?).ok()?;
    let month = parse_integer::<i8>(s.get(4..6)?).ok()?;
    let day = parse_integer::<i8>(s.get(6..8)?).ok()?;
    Date::new(year, month, day).ok()
}

fn parse_time(s: &str) -> Option<Time> {
    if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour = parse_integer::<i8>(s.get(0..2)?).ok()?;
    let minute = parse_integer::<i8>(s.get(2..4)?).ok()?;
    // leap seconds are clamped
    let second = parse_integer::<i8>(s.get(4..6)?).ok()?.min(59);
    Time::new(hour, minute, second, 0).ok()
}
