//! Local-day resolution
//!
//! Every event is stored with a UTC instant. A "day" only exists at read
//! time: it is the calendar date of that instant in the configured local
//! zone. This module is the one place where that policy lives.
//!
//! ## Invariants
//!
//! - A day bucket is the half-open range `[start, start + 24h)`, where
//!   `start` is local midnight of the day expressed in UTC.
//! - `to_local_day` is a pure function of the instant and the zone.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Days, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    Offset, TimeDelta, TimeZone, Utc,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// A calendar date in the configured local zone, written `YYYY-MM-DD`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalDay(NaiveDate);

impl LocalDay {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The day `n` days before this one
    pub fn days_before(&self, n: u64) -> Option<Self> {
        self.0.checked_sub_days(Days::new(n)).map(Self)
    }

    /// The day `n` days after this one
    pub fn days_after(&self, n: u64) -> Option<Self> {
        self.0.checked_add_days(Days::new(n)).map(Self)
    }
}

impl fmt::Display for LocalDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

impl FromStr for LocalDay {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // chrono accepts unpadded fields; the key format is strictly zero-padded
        let well_formed = s.len() == 10
            && s.bytes().enumerate().all(|(i, b)| match i {
                4 | 7 => b == b'-',
                _ => b.is_ascii_digit(),
            });
        if !well_formed {
            return Err(Error::InvalidDayFormat { day: s.to_string() });
        }

        NaiveDate::parse_from_str(s, DAY_FORMAT)
            .map(Self)
            .map_err(|_| Error::InvalidDayFormat { day: s.to_string() })
    }
}

impl Serialize for LocalDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LocalDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The timezone local days are computed in
///
/// Fixed for the life of the process. `System` follows the host's local
/// time; the other variants make the zone explicit (tests, servers running
/// in UTC for a user elsewhere).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalZone {
    #[default]
    System,
    Utc,
    Fixed(FixedOffset),
}

impl LocalZone {
    /// Zone with a fixed offset east of UTC, in seconds
    pub fn fixed_east(seconds: i32) -> Option<Self> {
        FixedOffset::east_opt(seconds).map(LocalZone::Fixed)
    }

    fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            LocalZone::System => instant.with_timezone(&Local).date_naive(),
            LocalZone::Utc => instant.date_naive(),
            LocalZone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
        }
    }

    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        match self {
            LocalZone::System => resolve_local(&Local, local),
            LocalZone::Utc => local.and_utc(),
            LocalZone::Fixed(offset) => resolve_local(offset, local),
        }
    }
}

/// Map a wall-clock time to an instant, taking the earlier reading when the
/// time is ambiguous and the first instant after the gap when it is skipped.
fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Inside a DST gap: the offset in force just after the gap is the
            // one reported for the (nonexistent) wall time read as UTC.
            let offset = tz.offset_from_utc_datetime(&local).fix();
            let instant = (local - TimeDelta::seconds(i64::from(offset.local_minus_utc()))).and_utc();
            let after_gap = instant.with_timezone(tz).naive_local();
            if after_gap >= local {
                instant
            } else {
                instant + (local - after_gap)
            }
        }
    }
}

impl fmt::Display for LocalZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalZone::System => f.write_str("local"),
            LocalZone::Utc => f.write_str("utc"),
            LocalZone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

impl FromStr for LocalZone {
    type Err = Error;

    /// Parses `local`, `utc`, or a `±HH:MM` / `±HHMM` / `±HH` offset
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(LocalZone::System);
        }
        if trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
            return Ok(LocalZone::Utc);
        }
        parse_offset(trimmed)
            .and_then(LocalZone::fixed_east)
            .ok_or_else(|| {
                Error::validation(format!(
                    "timezone must be \"local\", \"utc\" or an offset like \"-05:00\", got \"{}\"",
                    s
                ))
            })
    }
}

fn parse_offset(s: &str) -> Option<i32> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    if !rest.is_ascii() {
        return None;
    }
    let (hours, minutes) = match rest.len() {
        2 => (rest, "00"),
        4 => (&rest[..2], &rest[2..]),
        5 if rest.as_bytes()[2] == b':' => (&rest[..2], &rest[3..]),
        _ => return None,
    };
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = (hours.parse::<i32>().ok()?, minutes.parse::<i32>().ok()?);
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

/// Half-open UTC range `[start, end)` covering one local day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayBounds {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Converts between local days and UTC instants for a fixed zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DayResolver {
    zone: LocalZone,
}

impl DayResolver {
    pub fn new(zone: LocalZone) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> LocalZone {
        self.zone
    }

    /// Parse `YYYY-MM-DD` and return the UTC bounds of that local day
    pub fn day_bounds(&self, day: &str) -> Result<DayBounds> {
        let day: LocalDay = day.parse()?;
        Ok(self.bounds(day))
    }

    /// UTC bounds of an already parsed local day
    ///
    /// Days are treated as exactly 24 hours long, including DST transition
    /// days.
    pub fn bounds(&self, day: LocalDay) -> DayBounds {
        let start = self.zone.to_utc(day.date().and_time(NaiveTime::MIN));
        DayBounds {
            start,
            end: start + TimeDelta::hours(24),
        }
    }

    /// The local day an instant falls on
    pub fn to_local_day(&self, instant: DateTime<Utc>) -> LocalDay {
        LocalDay(self.zone.date_of(instant))
    }

    pub fn today(&self) -> LocalDay {
        self.to_local_day(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc_minus_5() -> DayResolver {
        DayResolver::new(LocalZone::fixed_east(-5 * 3600).unwrap())
    }

    fn instant(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_day_bounds_west_of_utc() {
        let bounds = utc_minus_5().day_bounds("2026-02-08").unwrap();
        assert_eq!(bounds.start, instant("2026-02-08T05:00:00Z"));
        assert_eq!(bounds.end, instant("2026-02-09T05:00:00Z"));
    }

    #[test]
    fn test_day_bounds_east_of_utc() {
        let resolver = DayResolver::new(LocalZone::fixed_east(9 * 3600).unwrap());
        let bounds = resolver.day_bounds("2026-02-08").unwrap();
        assert_eq!(bounds.start, instant("2026-02-07T15:00:00Z"));
        assert_eq!(bounds.end, instant("2026-02-08T15:00:00Z"));
    }

    #[test]
    fn test_bounds_are_half_open() {
        let bounds = utc_minus_5().day_bounds("2026-02-08").unwrap();
        assert!(bounds.contains(bounds.start));
        assert!(!bounds.contains(bounds.end));
        assert!(bounds.contains(bounds.end - TimeDelta::nanoseconds(1)));
    }

    #[test]
    fn test_invalid_day_format() {
        let resolver = utc_minus_5();
        for bad in ["", "2026-2-8", "2026/02/08", "2026-02-30", "2026-13-01", "today", "2026-02-08T00:00"] {
            let err = resolver.day_bounds(bad).unwrap_err();
            assert!(
                matches!(err, Error::InvalidDayFormat { ref day } if day == bad),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_to_local_day_crosses_midnight() {
        let resolver = utc_minus_5();
        // 04:59Z is still the previous evening at UTC-5
        assert_eq!(
            resolver.to_local_day(instant("2026-02-08T04:59:59Z")).to_string(),
            "2026-02-07"
        );
        assert_eq!(
            resolver.to_local_day(instant("2026-02-08T05:00:00Z")).to_string(),
            "2026-02-08"
        );
    }

    #[test]
    fn test_to_local_day_agrees_with_bounds() {
        let resolver = utc_minus_5();
        let day: LocalDay = "2026-02-08".parse().unwrap();
        let bounds = resolver.bounds(day);
        assert_eq!(resolver.to_local_day(bounds.start), day);
        assert_eq!(resolver.to_local_day(bounds.end - TimeDelta::nanoseconds(1)), day);
        assert_eq!(resolver.to_local_day(bounds.end), day.days_after(1).unwrap());
    }

    #[test]
    fn test_utc_zone() {
        let resolver = DayResolver::new(LocalZone::Utc);
        let bounds = resolver.day_bounds("2026-02-08").unwrap();
        assert_eq!(bounds.start, instant("2026-02-08T00:00:00Z"));
    }

    #[test]
    fn test_local_day_arithmetic() {
        let day: LocalDay = "2026-03-01".parse().unwrap();
        assert_eq!(day.days_before(1).unwrap().to_string(), "2026-02-28");
        assert_eq!(day.days_after(31).unwrap().to_string(), "2026-04-01");
        assert_eq!(day.days_before(0).unwrap(), day);
    }

    #[test]
    fn test_zone_parsing() {
        assert_eq!("local".parse::<LocalZone>().unwrap(), LocalZone::System);
        assert_eq!("UTC".parse::<LocalZone>().unwrap(), LocalZone::Utc);
        assert_eq!(
            "-05:00".parse::<LocalZone>().unwrap(),
            LocalZone::fixed_east(-5 * 3600).unwrap()
        );
        assert_eq!(
            "+0530".parse::<LocalZone>().unwrap(),
            LocalZone::fixed_east(5 * 3600 + 30 * 60).unwrap()
        );
        assert_eq!(
            "+09".parse::<LocalZone>().unwrap(),
            LocalZone::fixed_east(9 * 3600).unwrap()
        );
        for bad in [
            "", "EST", "5", "+25:00", "-05:75", "+5:00", "+05:0:0", "+0:500", "+05::0", "+0500:",
            "+05:", "+é5:00",
        ] {
            assert!(bad.parse::<LocalZone>().is_err(), "{bad} should be rejected");
        }
    }

    /// A zone that moves from one fixed offset to another at `switch_at`
    #[derive(Debug, Clone)]
    struct SwitchingZone {
        switch_at: NaiveDateTime,
        before: FixedOffset,
        after: FixedOffset,
    }

    impl SwitchingZone {
        fn new(switch_at: &str, before_hours: i32, after_hours: i32) -> Self {
            Self {
                switch_at: instant(switch_at).naive_utc(),
                before: FixedOffset::east_opt(before_hours * 3600).unwrap(),
                after: FixedOffset::east_opt(after_hours * 3600).unwrap(),
            }
        }
    }

    impl TimeZone for SwitchingZone {
        type Offset = FixedOffset;

        fn from_offset(offset: &FixedOffset) -> Self {
            Self {
                switch_at: NaiveDateTime::MAX,
                before: *offset,
                after: *offset,
            }
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let utc_if = |offset: FixedOffset| {
                *local - TimeDelta::seconds(i64::from(offset.local_minus_utc()))
            };
            let before = utc_if(self.before) < self.switch_at;
            let after = utc_if(self.after) >= self.switch_at;
            match (before, after) {
                (true, true) => LocalResult::Ambiguous(self.before, self.after),
                (true, false) => LocalResult::Single(self.before),
                (false, true) => LocalResult::Single(self.after),
                (false, false) => LocalResult::None,
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < self.switch_at {
                self.before
            } else {
                self.after
            }
        }
    }

    fn local_midnight(day: &str) -> NaiveDateTime {
        day.parse::<LocalDay>().unwrap().date().and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_midnight_in_spring_gap_takes_first_instant_after() {
        // Clocks jump from 00:00 to 01:00 local (UTC-5 to UTC-4)
        let zone = SwitchingZone::new("2026-03-08T05:00:00Z", -5, -4);
        let midnight = local_midnight("2026-03-08");
        assert!(matches!(zone.from_local_datetime(&midnight), LocalResult::None));

        assert_eq!(resolve_local(&zone, midnight), instant("2026-03-08T05:00:00Z"));
    }

    #[test]
    fn test_ambiguous_midnight_takes_earlier_instant() {
        // Clocks fall back from 01:00 to 00:00 local (UTC-4 to UTC-5)
        let zone = SwitchingZone::new("2026-11-01T05:00:00Z", -4, -5);
        let midnight = local_midnight("2026-11-01");
        assert!(matches!(
            zone.from_local_datetime(&midnight),
            LocalResult::Ambiguous(_, _)
        ));

        assert_eq!(resolve_local(&zone, midnight), instant("2026-11-01T04:00:00Z"));
    }

    #[test]
    fn test_unambiguous_midnight_near_a_switch() {
        let zone = SwitchingZone::new("2026-03-08T05:00:00Z", -5, -4);

        assert_eq!(
            resolve_local(&zone, local_midnight("2026-03-07")),
            instant("2026-03-07T05:00:00Z")
        );
        assert_eq!(
            resolve_local(&zone, local_midnight("2026-03-09")),
            instant("2026-03-09T04:00:00Z")
        );
    }

    #[test]
    fn test_local_day_serde() {
        let day: LocalDay = "2026-02-08".parse().unwrap();
        let json = serde_json::to_string(&day).unwrap();
        assert_eq!(json, "\"2026-02-08\"");
        let back: LocalDay = serde_json::from_str(&json).unwrap();
        assert_eq!(back, day);
        assert!(serde_json::from_str::<LocalDay>("\"2026-02-31\"").is_err());
    }
}
