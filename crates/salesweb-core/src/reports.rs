//! Report structures for API responses

use chrono::NaiveDate;
use rust_decimal::Decimal;
use salesweb_config::{Dimension, Interval};
use serde::{Deserialize, Serialize};

use super::error::ErrorCode;
use super::models::PeriodSummary;
use super::types::RecordKind;

/// Totals of one period in base currency, all native currencies merged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseCurrencyTotal {
    pub period: String,
    pub base_currency: String,
    pub record_count: usize,
    pub net: Decimal,
    pub tax: Decimal,
}

/// A record left out of aggregation, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub record: String,
    pub code: ErrorCode,
    pub message: String,
}

/// Referral commission for one base-currency period total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionLine {
    pub period: String,
    pub base_currency: String,
    pub split_percent: Decimal,
    pub commission: Decimal,
}

/// Full report for one record kind and filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub kind: RecordKind,
    pub interval: Interval,
    pub dimension: Dimension,
    pub timezone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub summaries: Vec<PeriodSummary>,
    pub base_totals: Vec<BaseCurrencyTotal>,
    pub rejected: Vec<RejectedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commissions: Option<Vec<CommissionLine>>,
}

/// CSV payload ready for download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}
