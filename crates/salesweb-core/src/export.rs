//! CSV and sales-format export

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

use crate::aggregate::{Aggregator, PartialAggregation};
use crate::error::{CoreError, CoreResult};
use crate::models::{RawFinancialRecord, ReportFilter};
use crate::period::PeriodKeyDeriver;
use crate::types::{Currency, RecordKind};
use crate::units::from_smallest_units;

pub const PAYMENTS_HEADER: [&str; 9] = [
    "Period",
    "VM ID",
    "Created",
    "Amount (Main Unit)",
    "Currency",
    "Payment Method",
    "Tax (Main Unit)",
    "Is Paid",
    "Rate",
];

pub const REFERRALS_HEADER: [&str; 8] = [
    "Period",
    "Ref Code",
    "VM ID",
    "Created",
    "Amount (Main Unit)",
    "Currency",
    "Tax (Main Unit)",
    "Rate",
];

pub const SALES_DESCRIPTION: &str = "Sales";
pub const TAX_DESCRIPTION: &str = "Tax Collected";

/// Download name, e.g. `payments-2024-01-01-to-2024-01-31.csv`
pub fn csv_filename(kind: RecordKind, filter: &ReportFilter) -> String {
    format!(
        "{}-{}-to-{}.csv",
        kind,
        filter.start_date.format("%Y-%m-%d"),
        filter.end_date.format("%Y-%m-%d")
    )
}

fn csv_row(kind: RecordKind, deriver: &PeriodKeyDeriver, record: &RawFinancialRecord) -> CoreResult<Vec<String>> {
    let period = deriver.key_for_record(record)?;
    let currency = Currency::parse(&record.currency)?;
    let amount = from_smallest_units(record.amount, currency.code())?;
    let tax = from_smallest_units(record.tax, currency.code())?;
    let created = record.created.clone().unwrap_or_default();
    let vm_id = record.vm_id.clone().unwrap_or_default();

    let row = match kind {
        RecordKind::Payments => vec![
            period,
            vm_id,
            created,
            amount.to_string(),
            currency.code().to_string(),
            record.payment_method.clone().unwrap_or_default(),
            tax.to_string(),
            record.is_paid.to_string(),
            record.rate.to_string(),
        ],
        RecordKind::Referrals => vec![
            period,
            record.ref_code.clone().unwrap_or_default(),
            vm_id,
            created,
            amount.to_string(),
            currency.code().to_string(),
            tax.to_string(),
            record.rate.to_string(),
        ],
    };
    Ok(row)
}

/// Write one row per record, every field quoted.
///
/// Fails on the first record whose period or currency cannot be resolved.
pub fn write_csv<W: Write>(
    writer: W,
    kind: RecordKind,
    deriver: &PeriodKeyDeriver,
    records: &[RawFinancialRecord],
) -> CoreResult<W> {
    let mut csv = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    match kind {
        RecordKind::Payments => csv.write_record(PAYMENTS_HEADER)?,
        RecordKind::Referrals => csv.write_record(REFERRALS_HEADER)?,
    }

    for record in records {
        csv.write_record(csv_row(kind, deriver, record)?)?;
    }

    csv.flush().map_err(|e| CoreError::ExportError { message: format!("CSV flush error: {}", e) })?;
    csv.into_inner()
        .map_err(|e| CoreError::ExportError { message: format!("CSV write error: {}", e.error()) })
}

/// Render records as a CSV string
pub fn to_csv(kind: RecordKind, deriver: &PeriodKeyDeriver, records: &[RawFinancialRecord]) -> CoreResult<String> {
    let bytes = write_csv(Vec::new(), kind, deriver, records)?;
    String::from_utf8(bytes).map_err(|e| CoreError::ExportError { message: e.to_string() })
}

/// Condensed JSON export consumed by the sales bookkeeping tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesFormat {
    pub date: NaiveDate,
    /// `CUR_BASE` to rate
    pub exchange_rate: BTreeMap<String, f64>,
    pub items: Vec<SalesItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesItem {
    pub description: String,
    pub currency: String,
    pub qty: u32,
    /// Main-unit amount
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
}

impl SalesItem {
    fn new(description: &str, currency: &str, amount: Decimal) -> Self {
        Self {
            description: description.to_string(),
            currency: currency.to_string(),
            qty: 1,
            rate: amount,
        }
    }
}

/// Aggregate records into the sales format.
///
/// Each non-base currency gets the rate of the first record the aggregator
/// accepted in it. Later records in the same currency may carry other rates;
/// those are not averaged. Rejected records never contribute a rate.
pub fn sales_format(
    date: NaiveDate,
    aggregator: &Aggregator,
    records: &[RawFinancialRecord],
) -> CoreResult<SalesFormat> {
    let mut exchange_rate = BTreeMap::new();
    let mut partial = PartialAggregation::default();
    for record in records {
        let rejected = partial.rejected_count();
        partial = aggregator.fold(partial, record);
        if partial.rejected_count() > rejected {
            continue;
        }

        let (Ok(currency), Ok(base)) = (Currency::parse(&record.currency), Currency::parse(&record.base_currency)) else {
            continue;
        };
        if currency == base {
            continue;
        }
        exchange_rate
            .entry(format!("{}_{}", currency.code(), base.code()))
            .or_insert(record.rate);
    }
    let summaries = partial.finish().summaries;

    let mut items = Vec::with_capacity(summaries.len());
    for summary in &summaries {
        let sales = from_smallest_units(summary.net_total, &summary.currency)?;
        items.push(SalesItem::new(SALES_DESCRIPTION, &summary.currency, sales));

        if summary.tax_total > 0 {
            let tax = from_smallest_units(summary.tax_total, &summary.currency)?;
            items.push(SalesItem::new(TAX_DESCRIPTION, &summary.currency, tax));
        }
    }

    Ok(SalesFormat { date, exchange_rate, items })
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesweb_config::{Dimension, Interval};

    fn payment(id: &str, created: Option<&str>, amount: u64, currency: &str) -> RawFinancialRecord {
        RawFinancialRecord {
            id: Some(id.to_string()),
            vm_id: Some("vm-1".to_string()),
            ref_code: None,
            created: created.map(str::to_string),
            amount,
            tax: 0,
            currency: currency.to_string(),
            rate: 1.0,
            base_currency: "EUR".to_string(),
            payment_method: Some("card".to_string()),
            is_paid: true,
        }
    }

    #[test]
    fn test_single_record_csv() {
        let deriver = PeriodKeyDeriver::utc(Interval::Monthly);
        let records = vec![payment("p-1", Some("2024-01-05T10:00:00Z"), 1000, "USD")];
        let csv = to_csv(RecordKind::Payments, &deriver, &records).unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!csv.contains('\r'));
        assert_eq!(
            lines[0],
            r#""Period","VM ID","Created","Amount (Main Unit)","Currency","Payment Method","Tax (Main Unit)","Is Paid","Rate""#
        );
        assert_eq!(
            lines[1],
            r#""2024-01","vm-1","2024-01-05T10:00:00Z","10.00","USD","card","0.00","true","1""#
        );
        for line in lines {
            assert!(line.split(',').all(|field| field.starts_with('"') && field.ends_with('"')));
        }
    }

    #[test]
    fn test_referrals_csv_header() {
        let deriver = PeriodKeyDeriver::utc(Interval::Daily);
        let mut referral = payment("r-1", Some("2024-01-05"), 250, "EUR");
        referral.ref_code = Some("ALPHA".to_string());
        let csv = to_csv(RecordKind::Referrals, &deriver, &[referral]).unwrap();

        let mut reader = csv::ReaderBuilder::new().from_reader(csv.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), REFERRALS_HEADER.to_vec());

        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "2024-01-05");
        assert_eq!(&row[1], "ALPHA");
        assert_eq!(&row[4], "2.50");
    }

    #[test]
    fn test_empty_csv_is_header_only() {
        let deriver = PeriodKeyDeriver::utc(Interval::Monthly);
        let csv = to_csv(RecordKind::Payments, &deriver, &[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_csv_fails_on_invalid_record() {
        let deriver = PeriodKeyDeriver::utc(Interval::Monthly);

        let undated = vec![payment("p-1", None, 1000, "USD")];
        assert!(matches!(
            to_csv(RecordKind::Payments, &deriver, &undated),
            Err(CoreError::InvalidRecord { .. })
        ));

        let unknown = vec![payment("p-2", Some("2024-01-05"), 1000, "XAU")];
        assert!(matches!(
            to_csv(RecordKind::Payments, &deriver, &unknown),
            Err(CoreError::UnknownCurrency { .. })
        ));
    }

    #[test]
    fn test_btc_amount_in_main_units() {
        let deriver = PeriodKeyDeriver::utc(Interval::Monthly);
        let records = vec![payment("p-1", Some("2024-01-05"), 150_000_000_000, "BTC")];
        let csv = to_csv(RecordKind::Payments, &deriver, &records).unwrap();
        assert!(csv.contains(r#""1.50000000000""#));
    }

    #[test]
    fn test_csv_filename() {
        let filter = ReportFilter::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        assert_eq!(csv_filename(RecordKind::Payments, &filter), "payments-2024-01-01-to-2024-01-31.csv");
        assert_eq!(csv_filename(RecordKind::Referrals, &filter), "referrals-2024-01-01-to-2024-01-31.csv");
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(Interval::Monthly, Dimension::Currency, chrono_tz::Tz::UTC)
    }

    #[test]
    fn test_sales_format() {
        let mut usd_first = payment("p-1", Some("2024-01-05"), 10_000, "USD");
        usd_first.rate = 0.92;
        usd_first.tax = 1_500;
        let mut usd_second = payment("p-2", Some("2024-01-06"), 5_000, "USD");
        usd_second.rate = 0.95;
        let eur = payment("p-3", Some("2024-01-07"), 2_000, "EUR");

        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let format = sales_format(date, &aggregator(), &[usd_first, usd_second, eur]).unwrap();

        assert_eq!(format.exchange_rate.len(), 1);
        assert_eq!(format.exchange_rate["USD_EUR"], 0.92);
        assert_eq!(format.items.len(), 3);
        assert_eq!(format.items[0], SalesItem::new("Sales", "EUR", Decimal::new(2_000, 2)));
        assert_eq!(format.items[1], SalesItem::new("Sales", "USD", Decimal::new(15_000, 2)));
        assert_eq!(format.items[2], SalesItem::new("Tax Collected", "USD", Decimal::new(1_500, 2)));

        let json = serde_json::to_value(&format).unwrap();
        assert_eq!(json["date"], "2024-01-31");
        assert_eq!(json["items"][1]["qty"], 1);
        assert_eq!(json["items"][1]["rate"], 150.0);
        assert_eq!(json["exchange_rate"]["USD_EUR"], 0.92);
    }

    #[test]
    fn test_sales_format_skips_rates_of_rejected_records() {
        let mut zero_rate = payment("p-1", Some("2024-01-05"), 10_000, "USD");
        zero_rate.rate = 0.0;
        let mut valid = payment("p-2", Some("2024-01-06"), 5_000, "USD");
        valid.rate = 0.92;
        let mut undated = payment("p-3", None, 7_000, "USD");
        undated.rate = 0.5;
        let mut gbp_only_invalid = payment("p-4", Some("2024-01-07"), 3_000, "GBP");
        gbp_only_invalid.rate = -1.17;

        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let format = sales_format(date, &aggregator(), &[undated, zero_rate, valid, gbp_only_invalid]).unwrap();

        assert_eq!(format.exchange_rate.len(), 1);
        assert_eq!(format.exchange_rate["USD_EUR"], 0.92);
        assert!(!format.exchange_rate.contains_key("GBP_EUR"));
        assert_eq!(format.items, vec![SalesItem::new("Sales", "USD", Decimal::new(5_000, 2))]);
    }
}
