//! Core data models for the reporting engine

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::period::parse_timestamp;

/// Payment or referral record as delivered by the admin API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFinancialRecord {
    /// Upstream identifier (payment id or referral id)
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    /// VM the payment was made for
    #[serde(default, deserialize_with = "string_or_number")]
    pub vm_id: Option<String>,
    /// Referral code the record is attributed to
    #[serde(default)]
    pub ref_code: Option<String>,
    /// Timestamp as received (RFC 3339 or `YYYY-MM-DD[ HH:MM:SS]`)
    #[serde(default)]
    pub created: Option<String>,
    /// Amount in the smallest unit of `currency`
    pub amount: u64,
    /// Tax in the smallest unit of `currency`
    #[serde(default)]
    pub tax: u64,
    /// Native currency code
    pub currency: String,
    /// Base-currency units per one native unit.
    ///
    /// Missing or `null` reads as 0 so the record alone is rejected later.
    #[serde(default, deserialize_with = "rate_or_zero")]
    pub rate: f64,
    /// Company reporting currency
    pub base_currency: String,
    /// Payment method (payments only)
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Whether the payment settled (payments only)
    #[serde(default)]
    pub is_paid: bool,
}

impl RawFinancialRecord {
    /// Identifier used in logs and rejection lists
    pub fn label(&self) -> String {
        self.id
            .as_deref()
            .or(self.vm_id.as_deref())
            .or(self.ref_code.as_deref())
            .unwrap_or("<unidentified>")
            .to_string()
    }

    /// Parsed `created` timestamp
    pub fn created_at(&self) -> CoreResult<DateTime<Utc>> {
        let raw = self.created.as_deref().ok_or_else(|| CoreError::InvalidRecord {
            record: self.label(),
            reason: "missing 'created' timestamp".to_string(),
        })?;

        parse_timestamp(raw).ok_or_else(|| CoreError::InvalidRecord {
            record: self.label(),
            reason: format!("malformed 'created' timestamp '{}'", raw),
        })
    }
}

/// Accepts ids sent either as JSON strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number identifier, got {}",
            other
        ))),
    }
}

fn rate_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// One aggregated bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSummary {
    /// Canonical period key
    pub period: String,
    /// Referral code, only when grouped by referral code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_code: Option<String>,
    /// Native currency of the summed records
    pub currency: String,
    /// Currency of the `base_currency_*` fields
    pub base_currency: String,
    pub record_count: usize,
    /// Native smallest units
    pub net_total: u64,
    /// Native smallest units
    pub tax_total: u64,
    /// Base-currency main units
    pub base_currency_net: Decimal,
    /// Base-currency main units
    pub base_currency_tax: Decimal,
}

/// Report scope passed to the record source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFilter {
    /// First day included
    pub start_date: NaiveDate,
    /// Last day included
    pub end_date: NaiveDate,
    #[serde(default)]
    pub company_id: Option<String>,
    /// Restrict to one native currency
    #[serde(default)]
    pub currency: Option<String>,
}

impl ReportFilter {
    /// Create a filter over an inclusive date range
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> CoreResult<Self> {
        if start_date > end_date {
            return Err(CoreError::InvalidFilter {
                message: format!("start_date {} is after end_date {}", start_date, end_date),
            });
        }
        Ok(Self {
            start_date,
            end_date,
            company_id: None,
            currency: None,
        })
    }

    pub fn with_company(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Check if a calendar date is within the range
    pub fn contains(&self, date: &NaiveDate) -> bool {
        *date >= self.start_date && *date <= self.end_date
    }

    /// Whether a record belongs to this filter.
    ///
    /// Records whose timestamp cannot be parsed are kept so that the
    /// aggregation step reports them instead of losing them here.
    pub fn accepts(&self, record: &RawFinancialRecord, timezone: &Tz) -> bool {
        if let Some(ref currency) = self.currency {
            if !record.currency.eq_ignore_ascii_case(currency) {
                return false;
            }
        }
        match record.created_at() {
            Ok(at) => self.contains(&at.with_timezone(timezone).date_naive()),
            Err(_) => true,
        }
    }
}
