use crate::{ReceiptTime, TimestampError};
use chrono::{DateTime, Datelike, Days, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::Europe::Dublin;

/// Receipt and event instants for one event, in the local zone and in UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTimestamps {
    pub receipt_local: DateTime<Tz>,
    pub receipt_utc: DateTime<Utc>,
    pub event_local: DateTime<Tz>,
    pub event_utc: DateTime<Utc>,
    /// `receipt_utc - event_utc` in seconds.
    pub evt_to_rcpt_sec: f64,
    /// Receipt strictly after the event.
    pub time_ok: bool,
}

/// Places year-less receipt times and epoch event times in one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampResolver {
    year: i32,
    zone: Tz,
}

impl TimestampResolver {
    pub fn new(year: i32, zone: Tz) -> Self {
        Self { year, zone }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Interpret a receipt time as wall-clock time in the configured year and zone.
    ///
    /// An ambiguous wall-clock time (autumn fall-back) resolves to the earlier
    /// instant. A time inside the spring-forward gap is read with the offset
    /// in force before the transition.
    pub fn localize_receipt(&self, receipt: &ReceiptTime) -> Result<DateTime<Tz>, TimestampError> {
        let naive = NaiveDate::from_ymd_opt(self.year, receipt.month, receipt.day)
            .ok_or(TimestampError::InvalidDate {
                year: self.year,
                month: receipt.month,
                day: receipt.day,
            })?
            .and_time(receipt.time);

        if let Some(dt) = self.zone.from_local_datetime(&naive).earliest() {
            return Ok(dt);
        }

        let shifted = naive + TimeDelta::hours(1);
        self.zone
            .from_local_datetime(&shifted)
            .earliest()
            .ok_or(TimestampError::NonexistentLocalTime(naive))
    }

    pub fn event_time(&self, epoch: i64) -> Result<DateTime<Tz>, TimestampError> {
        self.zone
            .timestamp_opt(epoch, 0)
            .single()
            .ok_or(TimestampError::OutOfRange(epoch))
    }

    pub fn resolve(
        &self,
        receipt: &ReceiptTime,
        event_ts: &str,
    ) -> Result<ResolvedTimestamps, TimestampError> {
        let receipt_local = self.localize_receipt(receipt)?;
        let event_local = self.event_time(parse_epoch(event_ts)?)?;

        let receipt_utc = receipt_local.with_timezone(&Utc);
        let event_utc = event_local.with_timezone(&Utc);
        let evt_to_rcpt_sec = seconds_between(event_utc, receipt_utc);

        Ok(ResolvedTimestamps {
            receipt_local,
            receipt_utc,
            event_local,
            event_utc,
            evt_to_rcpt_sec,
            time_ok: evt_to_rcpt_sec > 0.0,
        })
    }
}

pub fn parse_epoch(value: &str) -> Result<i64, TimestampError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| TimestampError::InvalidEpoch(value.to_string()))
}

/// Signed seconds from `from` to `to`, to microsecond precision.
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => delta.num_seconds() as f64,
    }
}

/// Start and end dates of summer time under EU rules: the last Sunday of
/// March and the last Sunday of October.
pub fn eu_dst_dates(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((last_sunday(year, 3)?, last_sunday(year, 10)?))
}

/// Last Sunday of a 31-day month.
fn last_sunday(year: i32, month: u32) -> Option<NaiveDate> {
    let last = NaiveDate::from_ymd_opt(year, month, 31)?;
    let back = last.weekday().num_days_from_sunday();
    last.checked_sub_days(Days::new(u64::from(back)))
}
