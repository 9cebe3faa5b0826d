// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::ops::Deref;

use nbsync_ical::Incidence;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new `", stringify!($name), "` from a string.")]
            #[must_use]
            pub const fn new(value: String) -> Self {
                Self(value)
            }

            /// Returns the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_newtype!(
    /// Calendar resource href (path).
    ///
    /// A `Href` represents the path to a calendar resource on a `CalDAV`
    /// server, such as `/calendars/user/event1.ics`.
    Href
);

string_newtype!(
    /// Entity tag for change detection.
    ///
    /// An `ETag` is an opaque, server-assigned version token. It is compared
    /// verbatim, quotes included.
    ETag
);

/// A calendar object resource as read from a multistatus response.
///
/// Zero incidences is valid: an etag-only query yields resources without
/// calendar data.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarResource {
    /// The href of the resource.
    pub href: Href,
    /// The entity tag of the resource, when the server sent one.
    pub etag: Option<ETag>,
    /// The incidences of the embedded calendar data, in local form.
    pub incidences: Vec<Incidence>,
}

impl CalendarResource {
    /// Creates a new `CalendarResource`.
    #[must_use]
    pub const fn new(href: Href, etag: Option<ETag>, incidences: Vec<Incidence>) -> Self {
        Self {
            href,
            etag,
            incidences,
        }
    }
}
