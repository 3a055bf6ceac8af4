use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{Error, Result};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%jT%H:%M:%S%.f",
    "%Y-%jT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y-%j"];

/// Anything that denotes an instant: ISO-8601 text or an already parsed value.
///
/// Naive values are taken as UTC.
pub trait ToUtc {
    fn utc(&self) -> Result<DateTime<Utc>>;
}

impl ToUtc for &str {
    fn utc(&self) -> Result<DateTime<Utc>> {
        parse_time(self).ok_or_else(|| Error::InvalidTime(self.to_string()))
    }
}

impl ToUtc for String {
    fn utc(&self) -> Result<DateTime<Utc>> {
        self.as_str().utc()
    }
}

impl ToUtc for &String {
    fn utc(&self) -> Result<DateTime<Utc>> {
        self.as_str().utc()
    }
}

impl<Tz: TimeZone> ToUtc for DateTime<Tz> {
    fn utc(&self) -> Result<DateTime<Utc>> {
        Ok(self.with_timezone(&Utc))
    }
}

impl ToUtc for NaiveDateTime {
    fn utc(&self) -> Result<DateTime<Utc>> {
        Ok(self.and_utc())
    }
}

impl ToUtc for NaiveDate {
    fn utc(&self) -> Result<DateTime<Utc>> {
        Ok(self.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}

/// Parses the time spellings HAPI servers use, normalizing to UTC.
pub(crate) fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = value.strip_suffix('Z').unwrap_or(value);
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(naive, fmt) {
            return Some(d.and_time(chrono::NaiveTime::MIN).and_utc());
        }
    }
    None
}

/// `YYYY-MM-DDTHH:MM:SS[.fff]Z`, fractional digits only when present.
pub(crate) fn format_time(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Timelike};

    #[test]
    fn accepts_common_spellings() {
        let expected = Utc.with_ymd_and_hms(2020, 2, 1, 12, 30, 0).unwrap();
        for text in [
            "2020-02-01T12:30:00Z",
            "2020-02-01T12:30:00",
            "2020-02-01 12:30:00",
            "2020-02-01T12:30Z",
            "2020-032T12:30:00Z",
            "2020-02-01T13:30:00+01:00",
        ] {
            assert_eq!(parse_time(text), Some(expected), "{text}");
        }
    }

    #[test]
    fn date_only_is_midnight() {
        let expected = Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_time("2020-02-01"), Some(expected));
        assert_eq!(parse_time("2020-032Z"), Some(expected));
    }

    #[test]
    fn fractional_seconds_survive_the_round_trip() {
        let t = parse_time("2020-02-01T12:30:00.125Z").unwrap();
        assert_eq!(t.nanosecond(), 125_000_000);
        assert_eq!(format_time(&t), "2020-02-01T12:30:00.125Z");
    }

    #[test]
    fn whole_seconds_format_without_fraction() {
        let t = Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(format_time(&t), "2020-02-01T00:00:00Z");
    }

    #[test]
    fn offsets_are_normalized() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let local = tz.with_ymd_and_hms(2020, 2, 1, 7, 0, 0).unwrap();
        assert_eq!(format_time(&local.utc().unwrap()), "2020-02-01T12:00:00Z");
    }

    #[test]
    fn garbage_is_an_invalid_time() {
        assert!(matches!("yesterday".utc(), Err(Error::InvalidTime(_))));
    }
}
