//! Business-day clock.
//!
//! Day ids are the POSIX timestamp of local midnight in the business's fixed
//! UTC offset. The offset never changes, so a calendar day always maps to
//! the same id.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::ReportError;
use crate::model::{DayId, SECONDS_PER_DAY};

/// Default business offset (UTC-5).
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -5;

/// Source of "today" and bill timestamps.
pub trait Clock: Send + Sync {
    /// Id of the current business day.
    fn today(&self) -> DayId;

    /// Current wall-clock time in nanoseconds since the UNIX epoch.
    fn now_nanos(&self) -> i64;

    /// The business zone used to compute day ids.
    fn offset(&self) -> FixedOffset;
}

/// Build a fixed offset from whole hours, rejecting values outside ±23h.
pub fn offset_from_hours(hours: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(hours.checked_mul(3600)?)
}

/// Day id of the business day containing `instant`.
pub fn day_id_at(instant: DateTime<Utc>, offset: FixedOffset) -> DayId {
    let local = instant.with_timezone(&offset);
    midnight(local.date_naive(), offset)
}

fn midnight(date: NaiveDate, offset: FixedOffset) -> DayId {
    date.and_hms_opt(0, 0, 0)
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|dt| dt.timestamp())
        // A fixed offset has exactly one mapping for every local time.
        .unwrap_or_default()
}

/// Parse a `dd-mm-YYYY` date into its day id.
pub fn parse_day(date: &str, offset: FixedOffset) -> Result<DayId, ReportError> {
    let parsed = NaiveDate::parse_from_str(date.trim(), "%d-%m-%Y")
        .map_err(|_| ReportError::InvalidDate(date.to_string()))?;
    Ok(midnight(parsed, offset))
}

/// First and last day ids of the month containing `day`.
pub fn month_bounds(day: DayId, offset: FixedOffset) -> (DayId, DayId) {
    let local = Utc
        .timestamp_opt(day, 0)
        .single()
        .unwrap_or_default()
        .with_timezone(&offset)
        .date_naive();
    let first = local.with_day(1).unwrap_or(local);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }
    .unwrap_or(first);
    let first_id = midnight(first, offset);
    let last_id = midnight(next_month, offset) - SECONDS_PER_DAY;
    (first_id, last_id.max(first_id))
}

// ---------------------------------------------------------------------------
// System clock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        let offset = offset_from_hours(DEFAULT_UTC_OFFSET_HOURS).unwrap_or_else(|| Utc.fix());
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> DayId {
        day_id_at(Utc::now(), self.offset)
    }

    fn now_nanos(&self) -> i64 {
        Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_else(|| Utc::now().timestamp_micros() * 1_000)
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

// ---------------------------------------------------------------------------
// Manual clock
// ---------------------------------------------------------------------------

/// Clock pinned to a given day, advanced by hand. Each `now_nanos` call
/// returns a strictly increasing timestamp within that day.
#[derive(Debug)]
pub struct ManualClock {
    today: AtomicI64,
    tick: AtomicI64,
    offset: FixedOffset,
}

impl ManualClock {
    pub fn new(today: DayId) -> Self {
        Self {
            today: AtomicI64::new(today),
            tick: AtomicI64::new(0),
            offset: Utc.fix(),
        }
    }

    pub fn set_today(&self, day: DayId) {
        self.today.store(day, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn today(&self) -> DayId {
        self.today.load(Ordering::SeqCst)
    }

    fn now_nanos(&self) -> i64 {
        let tick = self.tick.fetch_add(1, Ordering::SeqCst) + 1;
        self.today() * 1_000_000_000 + tick
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}
