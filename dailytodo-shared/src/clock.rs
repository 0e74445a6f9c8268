//! Clock and calendar-day computation
//!
//! Every quota decision buckets tasks by calendar day. The day is computed in a
//! single, service-wide UTC offset that is fixed at startup, so counting and
//! comparison always agree on where midnight falls.
//!
//! # Example
//!
//! ```
//! use dailytodo_shared::clock::{Calendar, ManualClock};
//! use chrono::{TimeZone, Utc};
//!
//! let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 23, 30, 0).unwrap());
//! let calendar = Calendar::new(Calendar::parse_offset("+01:00").unwrap());
//!
//! // 23:30 UTC is already the next day one hour east of Greenwich
//! assert_eq!(calendar.today(&clock).to_string(), "2025-03-02");
//! ```

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use std::ops::Range;
use std::sync::Mutex;

/// Source of the current instant
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
///
/// Used by tests to place requests on either side of a day boundary.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock to `now`
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
    }

    /// Moves the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Invalid calendar configuration
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CalendarError {
    /// Offset string is not `UTC`, `Z`, `+HH:MM` or `+HHMM`
    #[error("Invalid UTC offset '{0}': expected UTC, Z, +HH:MM or -HH:MM")]
    InvalidOffset(String),

    /// Offset is well formed but outside +/-23:59
    #[error("UTC offset '{0}' is out of range")]
    OffsetOutOfRange(String),
}

/// Calendar-day policy for quota accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl Calendar {
    /// Calendar whose days run midnight-to-midnight UTC
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Calendar whose days run midnight-to-midnight at `offset`
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// The configured offset
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Parses an offset such as `UTC`, `Z`, `+09:00`, `-0530`
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError`] for anything else, or for offsets beyond
    /// +/-23:59.
    pub fn parse_offset(value: &str) -> Result<FixedOffset, CalendarError> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
            return Ok(Utc.fix());
        }

        let invalid = || CalendarError::InvalidOffset(value.to_string());

        let (sign, rest) = if let Some(rest) = trimmed.strip_prefix('+') {
            (1, rest)
        } else if let Some(rest) = trimmed.strip_prefix('-') {
            (-1, rest)
        } else {
            return Err(invalid());
        };

        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        let well_formed = digits.len() == 4
            && digits.chars().all(|c| c.is_ascii_digit())
            && (rest.len() == 4 || (rest.len() == 5 && rest.as_bytes()[2] == b':'));
        if !well_formed {
            return Err(invalid());
        }

        let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
        let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
        if hours > 23 || minutes > 59 {
            return Err(CalendarError::OffsetOutOfRange(value.to_string()));
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .ok_or_else(|| CalendarError::OffsetOutOfRange(value.to_string()))
    }

    /// Calendar date that `instant` falls on
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Today's date according to `clock`
    pub fn today(&self, clock: &dyn Clock) -> NaiveDate {
        self.date_of(clock.now())
    }

    /// Half-open UTC range `[start, end)` covering `day`
    pub fn day_range(&self, day: NaiveDate) -> Range<DateTime<Utc>> {
        let local_midnight = day.and_time(NaiveTime::MIN);
        let utc_midnight =
            local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        let start = Utc.from_utc_datetime(&utc_midnight);

        start..start + Duration::days(1)
    }
}
