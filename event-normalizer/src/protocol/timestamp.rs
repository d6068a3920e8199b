use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Serialize, Serializer};

/// A point in time, always UTC.
///
/// On the wire this is either an RFC 3339 string or a number of seconds since the
/// Unix epoch. Numeric values keep microsecond precision at best, since they went
/// through a float on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns `None` for instants that cannot be rendered as a four-digit-year RFC 3339 string.
    pub fn from_datetime(dt: DateTime<Utc>) -> Option<Self> {
        if dt.year() < 0 || dt.year() > 9999 {
            return None;
        }
        Some(Self(dt))
    }

    pub fn from_epoch_seconds(secs: f64) -> Option<Self> {
        if !secs.is_finite() {
            return None;
        }

        let whole = secs.floor();
        let mut micros = ((secs - whole) * 1_000_000.0).round() as u32;
        let mut whole = whole as i64;
        if micros >= 1_000_000 {
            whole = whole.checked_add(1)?;
            micros -= 1_000_000;
        }

        Self::from_datetime(DateTime::from_timestamp(whole, micros * 1000)?)
    }

    /// Parses the string forms SDKs send us, in order of preference:
    /// 1. RFC 3339 (`2011-05-02T17:41:36Z`, `2011-05-02T17:41:36.123+02:00`)
    /// 2. RFC 3339 with an hour-only offset (`2011-05-02T17:41:36+02`)
    /// 3. A datetime without any offset, taken as UTC
    /// 4. Epoch seconds written as a string (`"1304358096.5"`)
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();

        let normalized = normalize_timezone_format(input);
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
            return Self::from_datetime(dt.with_timezone(&Utc));
        }

        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return Self::from_datetime(naive.and_utc());
            }
        }

        input
            .parse::<f64>()
            .ok()
            .and_then(Self::from_epoch_seconds)
    }
}

/// "2025-09-17T14:05:04.805+03" -> "2025-09-17T14:05:04.805+03:00", anything else is borrowed as is
fn normalize_timezone_format(input: &str) -> Cow<'_, str> {
    static TIMEZONE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}[Tt ]\d{2}:\d{2}:\d{2}(?:\.\d{1,9})?[+-]\d{2}$")
            .expect("timezone regex is valid")
    });

    if TIMEZONE_REGEX.is_match(input) {
        Cow::Owned(format!("{input}:00"))
    } else {
        Cow::Borrowed(input)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
