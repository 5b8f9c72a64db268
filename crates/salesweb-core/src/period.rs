//! Period keys for time-series buckets
//!
//! Keys are derived from the calendar date of a timestamp in an explicit
//! reporting timezone, never the machine's local time:
//!
//! | interval  | key          |
//! |-----------|--------------|
//! | daily     | `YYYY-MM-DD` |
//! | weekly    | `YYYY-MM-DD` of the Monday starting the ISO week |
//! | monthly   | `YYYY-MM`    |
//! | quarterly | `YYYY-Qn`    |
//! | yearly    | `YYYY`       |
//!
//! A Sunday belongs to the week that started six days earlier, so
//! Sunday 2024-01-07 maps to Monday 2024-01-01.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use salesweb_config::Interval;

use crate::error::CoreResult;
use crate::models::RawFinancialRecord;

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse an upstream timestamp.
///
/// Timestamps without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Monday of the ISO week containing `date`
pub fn week_anchor(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Key of the bucket a calendar date falls into
pub fn period_key_for_date(date: NaiveDate, interval: Interval) -> String {
    match interval {
        Interval::Daily => date.format("%Y-%m-%d").to_string(),
        Interval::Weekly => week_anchor(date).format("%Y-%m-%d").to_string(),
        Interval::Monthly => format!("{:04}-{:02}", date.year(), date.month()),
        Interval::Quarterly => format!("{:04}-Q{}", date.year(), date.month0() / 3 + 1),
        Interval::Yearly => format!("{:04}", date.year()),
    }
}

/// Derives bucket keys at one granularity in one timezone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodKeyDeriver {
    pub interval: Interval,
    pub timezone: Tz,
}

impl PeriodKeyDeriver {
    pub fn new(interval: Interval, timezone: Tz) -> Self {
        Self { interval, timezone }
    }

    /// Deriver working on UTC calendar dates
    pub fn utc(interval: Interval) -> Self {
        Self::new(interval, Tz::UTC)
    }

    /// Calendar date of an instant in the reporting timezone
    pub fn local_date(&self, at: &DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.timezone).date_naive()
    }

    pub fn key(&self, at: &DateTime<Utc>) -> String {
        period_key_for_date(self.local_date(at), self.interval)
    }

    /// Key for a record, failing with `InvalidRecord` on a bad timestamp
    pub fn key_for_record(&self, record: &RawFinancialRecord) -> CoreResult<String> {
        record.created_at().map(|at| self.key(&at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn utc(raw: &str) -> DateTime<Utc> {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
            .and_utc();

        assert_eq!(parse_timestamp("2024-01-05T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-05T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-05 10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-05T10:30:00.000"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-05"),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_hms_opt(0, 0, 0).map(|n| n.and_utc())
        );
        assert_eq!(parse_timestamp("05/01/2024"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_daily_monthly_yearly_keys() {
        let at = utc("2024-03-09T08:00:00Z");
        assert_eq!(PeriodKeyDeriver::utc(Interval::Daily).key(&at), "2024-03-09");
        assert_eq!(PeriodKeyDeriver::utc(Interval::Monthly).key(&at), "2024-03");
        assert_eq!(PeriodKeyDeriver::utc(Interval::Yearly).key(&at), "2024");
    }

    #[test]
    fn test_quarter_boundaries() {
        let quarterly = PeriodKeyDeriver::utc(Interval::Quarterly);
        assert_eq!(quarterly.key(&utc("2024-01-01T00:00:00Z")), "2024-Q1");
        assert_eq!(quarterly.key(&utc("2024-03-31T23:59:59Z")), "2024-Q1");
        assert_eq!(quarterly.key(&utc("2024-04-01T00:00:00Z")), "2024-Q2");
        assert_eq!(quarterly.key(&utc("2024-09-30T12:00:00Z")), "2024-Q3");
        assert_eq!(quarterly.key(&utc("2024-12-31T12:00:00Z")), "2024-Q4");
    }

    #[test]
    fn test_weekly_anchor_on_weekdays() {
        let weekly = PeriodKeyDeriver::utc(Interval::Weekly);
        // Monday maps to itself
        assert_eq!(weekly.key(&utc("2024-01-08T09:00:00Z")), "2024-01-08");
        // Wednesday
        assert_eq!(weekly.key(&utc("2024-01-10T09:00:00Z")), "2024-01-08");
        // Saturday
        assert_eq!(weekly.key(&utc("2024-01-13T09:00:00Z")), "2024-01-08");
    }

    #[test]
    fn test_weekly_sunday_belongs_to_week_just_ending() {
        let weekly = PeriodKeyDeriver::utc(Interval::Weekly);
        assert_eq!(weekly.key(&utc("2024-01-07T18:00:00Z")), "2024-01-01");
        assert_eq!(weekly.key(&utc("2024-01-14T00:00:00Z")), "2024-01-08");
    }

    #[test]
    fn test_weekly_anchor_crosses_year() {
        // Sunday 2023-01-01 belongs to the week starting Monday 2022-12-26
        assert_eq!(
            week_anchor(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()),
            NaiveDate::from_ymd_opt(2022, 12, 26).unwrap()
        );
    }

    #[test]
    fn test_timezone_moves_bucket() {
        let at = utc("2024-03-31T23:30:00Z");
        let utc_monthly = PeriodKeyDeriver::utc(Interval::Monthly);
        let tokyo_monthly = PeriodKeyDeriver::new(Interval::Monthly, chrono_tz::Asia::Tokyo);

        assert_eq!(utc_monthly.key(&at), "2024-03");
        assert_eq!(tokyo_monthly.key(&at), "2024-04");
        assert_eq!(
            PeriodKeyDeriver::new(Interval::Quarterly, chrono_tz::Asia::Tokyo).key(&at),
            "2024-Q2"
        );
    }

    #[test]
    fn test_keys_sort_chronologically() {
        let monthly = PeriodKeyDeriver::utc(Interval::Monthly);
        let keys: Vec<String> = ["2023-11-02", "2023-12-31", "2024-01-01", "2024-10-15"]
            .iter()
            .map(|d| monthly.key(&utc(d)))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_key_for_record_surfaces_invalid_record() {
        let record: RawFinancialRecord = serde_json::from_value(serde_json::json!({
            "id": "pay-9", "created": "not a date", "amount": 100,
            "currency": "USD", "rate": 1.0, "base_currency": "USD"
        }))
        .unwrap();

        let err = PeriodKeyDeriver::utc(Interval::Daily).key_for_record(&record).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRecord { ref record, .. } if record == "pay-9"));
    }
}
