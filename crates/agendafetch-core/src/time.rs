//! Conversion between Unix epoch seconds and wall-clock time.
//!
//! A [`WallClock`] carries the zone it was observed in. Only UTC and
//! process-local readings can be converted; an unspecified reading is
//! rejected because there is no way to know which offset applies.
//!
//! Local readings are shifted by the *base* (standard) offset of the local
//! zone, never the daylight-saving offset. [`from_epoch_seconds`] adds one
//! hour afterwards when the converted wall time lands in daylight-saving
//! time; remote signature checks were built against that arithmetic.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone,
    Utc,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The zone a [`WallClock`] reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Utc,
    Local,
    Unspecified,
}

/// A wall-clock reading tagged with its zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallClock {
    pub time: NaiveDateTime,
    pub zone: ZoneKind,
}

impl WallClock {
    pub fn utc(time: NaiveDateTime) -> Self {
        Self {
            time,
            zone: ZoneKind::Utc,
        }
    }

    pub fn local(time: NaiveDateTime) -> Self {
        Self {
            time,
            zone: ZoneKind::Local,
        }
    }

    pub fn unspecified(time: NaiveDateTime) -> Self {
        Self {
            time,
            zone: ZoneKind::Unspecified,
        }
    }

    /// The current instant as a UTC reading.
    pub fn now() -> Self {
        Self::utc(Utc::now().naive_utc())
    }
}

impl From<DateTime<Utc>> for WallClock {
    fn from(value: DateTime<Utc>) -> Self {
        Self::utc(value.naive_utc())
    }
}

/// Errors from the time codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeCodecError {
    #[error("cannot shift a timestamp with an unspecified zone: {0}")]
    UnspecifiedZone(NaiveDateTime),

    #[error("epoch seconds out of range: {0}")]
    OutOfRange(i64),
}

/// Whole seconds between the Unix epoch and `timestamp`.
///
/// Local readings belong to the process-local zone.
///
/// # Errors
///
/// [`TimeCodecError::UnspecifiedZone`] when the reading has no zone.
pub fn to_epoch_seconds(timestamp: WallClock) -> Result<i64, TimeCodecError> {
    to_epoch_seconds_in(timestamp, &Local)
}

/// [`to_epoch_seconds`] with local readings taken in `zone`.
pub fn to_epoch_seconds_in<Tz: TimeZone>(
    timestamp: WallClock,
    zone: &Tz,
) -> Result<i64, TimeCodecError> {
    let utc = match timestamp.zone {
        ZoneKind::Utc => timestamp.time,
        ZoneKind::Local => {
            timestamp.time - offset_duration(base_utc_offset_in(timestamp.time.year(), zone))
        }
        ZoneKind::Unspecified => return Err(TimeCodecError::UnspecifiedZone(timestamp.time)),
    };
    Ok(utc.and_utc().timestamp())
}

/// Local wall-clock reading for `seconds` since the epoch.
///
/// # Errors
///
/// [`TimeCodecError::OutOfRange`] when `seconds` is beyond chrono's range.
pub fn from_epoch_seconds(seconds: i64) -> Result<WallClock, TimeCodecError> {
    from_epoch_seconds_in(seconds, &Local)
}

/// [`from_epoch_seconds`] reading wall time in `zone`.
pub fn from_epoch_seconds_in<Tz: TimeZone>(
    seconds: i64,
    zone: &Tz,
) -> Result<WallClock, TimeCodecError> {
    let utc = DateTime::<Utc>::from_timestamp(seconds, 0)
        .ok_or(TimeCodecError::OutOfRange(seconds))?
        .naive_utc();
    let base = base_utc_offset_in(utc.year(), zone);
    let mut local = utc + offset_duration(base);
    if is_daylight_saving(local, base, zone) {
        local += Duration::hours(1);
    }
    Ok(WallClock::local(local))
}

/// Standard (non daylight-saving) offset of the process-local zone.
pub fn base_utc_offset(year: i32) -> FixedOffset {
    base_utc_offset_in(year, &Local)
}

/// Standard offset of `zone` in `year`.
///
/// Daylight-saving only ever moves clocks forward, so the smaller of the
/// midwinter and midsummer offsets is the standard one in either hemisphere.
pub fn base_utc_offset_in<Tz: TimeZone>(year: i32, zone: &Tz) -> FixedOffset {
    [(1, 1), (7, 1)]
        .into_iter()
        .filter_map(|(month, day)| NaiveDate::from_ymd_opt(year, month, day))
        .filter_map(|date| date.and_hms_opt(12, 0, 0))
        .map(|noon| zone.offset_from_utc_datetime(&noon).fix())
        .min_by_key(|offset| offset.local_minus_utc())
        .unwrap_or_else(|| Utc.fix())
}

fn is_daylight_saving<Tz: TimeZone>(local: NaiveDateTime, base: FixedOffset, zone: &Tz) -> bool {
    zone.offset_from_local_datetime(&local)
        .earliest()
        .is_some_and(|offset| offset.fix().local_minus_utc() > base.local_minus_utc())
}

fn offset_duration(offset: FixedOffset) -> Duration {
    Duration::seconds(i64::from(offset.local_minus_utc()))
}
