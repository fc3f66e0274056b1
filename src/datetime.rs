//! Parsing of GPX `<time>` values.
//!
//! GPX files in the wild use a small family of ISO 8601 extended-format
//! layouts. Every supported layout has a distinct length, so the parser picks
//! the layout from the input length and then reads fixed-width fields from
//! fixed byte offsets:
//!
//! | Example                         | Length | Zone                  |
//! |---------------------------------|--------|-----------------------|
//! | `2008-07-18T16:07:50Z`          |     20 | UTC                   |
//! | `2008-07-18T16:07:50.000Z`      |     24 | UTC                   |
//! | `2008-07-18T16:07:50+02:00`     |     25 | explicit offset       |
//! | `2008-07-18T16:07:50.000+02:00` |     29 | explicit offset       |
//! | `2008-07-18T16:07:50`           |     19 | none, treated as UTC  |
//! | `2008-07-18T16:07:50.000`       |     23 | none, treated as UTC  |
//!
//! A missing zone designator is read as UTC. GPX mandates UTC timestamps, so
//! the omission is taken to be a writer bug rather than local time.

use std::ops::Range;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeDelta, Utc};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TimestampError>;

/// Error returned when a timestamp cannot be turned into an instant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("unsupported timestamp format: no supported layout is {length} characters long")]
    UnsupportedFormat { length: usize },

    #[error("malformed timestamp: {reason} at bytes {}..{}", .byte_range.start, .byte_range.end)]
    MalformedTimestamp {
        byte_range: Range<usize>,
        reason: MalformedReason,
    },
}

/// Why a timestamp with a supported length was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("unexpected character (expected one of \"{expected}\")")]
    UnexpectedCharacter { expected: &'static str },

    #[error("characters are not all digits")]
    NotDigits,

    #[error("value {value} out of range [{min}, {max}]")]
    OutOfRange { value: u32, min: u32, max: u32 },

    #[error("date is not representable")]
    Unrepresentable,
}

impl TimestampError {
    fn malformed(byte_range: Range<usize>, reason: MalformedReason) -> Self {
        Self::MalformedTimestamp { byte_range, reason }
    }

    /// Render the error together with the input, marking the offending bytes.
    ///
    /// ```text
    /// malformed timestamp: value 13 out of range [1, 12] at bytes 5..7
    ///   "2024-13-18T07:50:01Z"
    ///         ^^
    /// ```
    pub fn annotate(&self, input: &str) -> String {
        match self {
            Self::UnsupportedFormat { .. } => format!("{self}\n  \"{input}\""),
            Self::MalformedTimestamp { byte_range, .. } => {
                let marker = "^".repeat(byte_range.len().max(1));
                format!(
                    "{self}\n  \"{input}\"\n   {:indent$}{marker}",
                    "",
                    indent = byte_range.start
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Zulu,
    Offset,
    Implicit,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    length: usize,
    fraction: bool,
    zone: Zone,
}

impl Layout {
    const fn new(length: usize, fraction: bool, zone: Zone) -> Self {
        Self {
            length,
            fraction,
            zone,
        }
    }
}

// Ordered by how often each layout shows up in real files.
const LAYOUTS: [Layout; 6] = [
    // YYYY-MM-DDThh:mm:ssZ
    Layout::new(20, false, Zone::Zulu),
    // YYYY-MM-DDThh:mm:ss.sssZ
    Layout::new(24, true, Zone::Zulu),
    // YYYY-MM-DDThh:mm:ss±hh:mm
    Layout::new(25, false, Zone::Offset),
    // YYYY-MM-DDThh:mm:ss.sss±hh:mm
    Layout::new(29, true, Zone::Offset),
    // YYYY-MM-DDThh:mm:ss
    Layout::new(19, false, Zone::Implicit),
    // YYYY-MM-DDThh:mm:ss.sss
    Layout::new(23, true, Zone::Implicit),
];

/// A fixed-width numeric field with its inclusive valid range.
#[derive(Debug, Clone, Copy)]
struct Field {
    offset: usize,
    width: usize,
    min: u32,
    max: u32,
}

impl Field {
    const fn new(offset: usize, width: usize, min: u32, max: u32) -> Self {
        Self {
            offset,
            width,
            min,
            max,
        }
    }
}

const YEAR: Field = Field::new(0, 4, 0, 9999);
const MONTH: Field = Field::new(5, 2, 1, 12);
const DAY: Field = Field::new(8, 2, 1, 31);
const HOUR: Field = Field::new(11, 2, 0, 24);
const MINUTE: Field = Field::new(14, 2, 0, 59);
// 60 denotes a leap second.
const SECOND: Field = Field::new(17, 2, 0, 60);
const DATE_TIME_FIELDS: [Field; 6] = [YEAR, MONTH, DAY, HOUR, MINUTE, SECOND];
const MILLISECOND: Field = Field::new(20, 3, 0, 999);

// Separators of the date-time part shared by every layout.
const DATE_TIME_LITERALS: [(usize, &str); 5] =
    [(4, "-"), (7, "-"), (10, "T"), (13, ":"), (16, ":")];

const FRACTION_SEPARATOR: usize = 19;
const FRACTION_END: usize = 23;

const SECONDS_PER_DAY: i64 = 86_400;

/// Fixed-grid view over the input bytes.
struct Grid<'a> {
    bytes: &'a [u8],
}

impl Grid<'_> {
    fn literal(&self, offset: usize, expected: &'static str) -> Result<u8> {
        let byte = self.bytes[offset];
        if expected.as_bytes().contains(&byte) {
            Ok(byte)
        } else {
            Err(TimestampError::malformed(
                offset..offset + 1,
                MalformedReason::UnexpectedCharacter { expected },
            ))
        }
    }

    fn field(&self, field: Field) -> Result<u32> {
        let range = field.offset..field.offset + field.width;
        let digits = &self.bytes[range.clone()];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(TimestampError::malformed(range, MalformedReason::NotDigits));
        }

        let value = digits
            .iter()
            .fold(0u32, |acc, digit| acc * 10 + u32::from(digit - b'0'));
        if value < field.min || value > field.max {
            return Err(TimestampError::malformed(
                range,
                MalformedReason::OutOfRange {
                    value,
                    min: field.min,
                    max: field.max,
                },
            ));
        }
        Ok(value)
    }

    /// Read `±hh:mm` starting at `offset`, returned as signed seconds east of UTC.
    fn utc_offset(&self, offset: usize) -> Result<i64> {
        let sign = match self.literal(offset, "+-")? {
            b'+' => 1,
            _ => -1,
        };
        let hours = self.field(Field::new(offset + 1, 2, 0, 24))?;
        self.literal(offset + 3, ":")?;
        let minutes = self.field(Field::new(offset + 4, 2, 0, 59))?;

        Ok(sign * (i64::from(hours) * 3600 + i64::from(minutes) * 60))
    }
}

/// Parse a GPX timestamp into an absolute UTC instant with millisecond precision.
///
/// Explicit offsets are folded into the calendar fields before they are
/// normalized, so `06:14:13+08:30` on the 17th lands on `21:44:13Z` on the
/// 16th. Hour 24, second 60 and day numbers past the end of the month carry
/// into the next unit the same way.
///
/// # Errors
///
/// [`TimestampError::UnsupportedFormat`] when the length matches no layout,
/// [`TimestampError::MalformedTimestamp`] when a separator is wrong, a field
/// contains non-digits or a field is outside its range.
pub fn parse_gpx_time(text: &str) -> Result<DateTime<Utc>> {
    let bytes = text.as_bytes();
    let layout = LAYOUTS
        .iter()
        .find(|layout| layout.length == bytes.len())
        .ok_or(TimestampError::UnsupportedFormat {
            length: bytes.len(),
        })?;

    let grid = Grid { bytes };

    // Each field is followed by its separator, except the seconds.
    let mut values = [0u32; 6];
    for (index, field) in DATE_TIME_FIELDS.iter().enumerate() {
        values[index] = grid.field(*field)?;
        if let Some((offset, expected)) = DATE_TIME_LITERALS.get(index) {
            grid.literal(*offset, *expected)?;
        }
    }
    let [year, month, day, hour, minute, second] = values;

    let (millis, zone_offset) = if layout.fraction {
        grid.literal(FRACTION_SEPARATOR, ".,")?;
        (grid.field(MILLISECOND)?, FRACTION_END)
    } else {
        (0, FRACTION_SEPARATOR)
    };

    let utc_offset = match layout.zone {
        Zone::Zulu => {
            grid.literal(zone_offset, "Z")?;
            0
        }
        Zone::Offset => grid.utc_offset(zone_offset)?,
        Zone::Implicit => 0,
    };

    let unrepresentable =
        || TimestampError::malformed(0..bytes.len(), MalformedReason::Unrepresentable);

    // Seconds since the epoch of the first of the month, then carry every
    // smaller unit (offset included) through plain arithmetic.
    let month_start = NaiveDate::from_ymd_opt(year as i32, month, 1)
        .ok_or_else(unrepresentable)?
        .and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp();
    let seconds = month_start
        + i64::from(day - 1) * SECONDS_PER_DAY
        + i64::from(hour) * 3600
        + i64::from(minute) * 60
        + i64::from(second)
        - utc_offset;

    DateTime::from_timestamp(seconds, 0)
        .and_then(|instant| instant.checked_add_signed(TimeDelta::milliseconds(i64::from(millis))))
        .ok_or_else(unrepresentable)
}

/// Format an instant the way GPX writers do, with millisecond precision.
pub fn format_gpx_time(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A point's timestamp, kept as text until somebody asks for the instant.
///
/// Parsing happens at most once; a successful result is cached in place. A
/// failed parse is not cached, so every request reports the same error.
#[derive(Debug, Clone)]
pub struct TimePoint {
    repr: Repr,
}

#[derive(Debug, Clone)]
enum Repr {
    Text {
        raw: String,
        resolved: OnceLock<DateTime<Utc>>,
    },
    Instant(DateTime<Utc>),
}

impl TimePoint {
    pub fn from_text(raw: impl Into<String>) -> Self {
        Self {
            repr: Repr::Text {
                raw: raw.into(),
                resolved: OnceLock::new(),
            },
        }
    }

    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self {
            repr: Repr::Instant(instant),
        }
    }

    /// The original text, if this timestamp was read from a document.
    pub fn raw(&self) -> Option<&str> {
        match &self.repr {
            Repr::Text { raw, .. } => Some(raw),
            Repr::Instant(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        match &self.repr {
            Repr::Text { resolved, .. } => resolved.get().is_some(),
            Repr::Instant(_) => true,
        }
    }

    /// The instant, parsing the text on first use.
    pub fn value(&self) -> Result<DateTime<Utc>> {
        match &self.repr {
            Repr::Instant(instant) => Ok(*instant),
            Repr::Text { raw, resolved } => {
                if let Some(instant) = resolved.get() {
                    return Ok(*instant);
                }
                let instant = parse_gpx_time(raw)?;
                Ok(*resolved.get_or_init(|| instant))
            }
        }
    }

    /// Text form of the timestamp: the original text when there is one.
    pub fn to_text(&self) -> String {
        match &self.repr {
            Repr::Text { raw, .. } => raw.clone(),
            Repr::Instant(instant) => format_gpx_time(instant),
        }
    }
}

impl TimePoint {
    /// The instant when the timestamp parses, the raw text otherwise.
    fn equality_key(&self) -> std::result::Result<DateTime<Utc>, &str> {
        match &self.repr {
            Repr::Instant(instant) => Ok(*instant),
            Repr::Text { raw, .. } => self.value().map_err(|_| raw.as_str()),
        }
    }
}

/// Two timestamps are equal when they denote the same instant, whatever
/// their spelling. Unparseable text only equals identical text.
impl PartialEq for TimePoint {
    fn eq(&self, other: &Self) -> bool {
        self.equality_key() == other.equality_key()
    }
}

impl From<DateTime<Utc>> for TimePoint {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::from_instant(instant)
    }
}

impl From<&str> for TimePoint {
    fn from(raw: &str) -> Self {
        Self::from_text(raw)
    }
}

impl From<String> for TimePoint {
    fn from(raw: String) -> Self {
        Self::from_text(raw)
    }
}
