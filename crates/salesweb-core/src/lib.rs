//! Time-series financial reporting engine
//!
//! Payments and referral records are bucketed by period, normalized to
//! smallest units, projected into the company base currency and exported as
//! CSV or the condensed sales format.

pub mod aggregate;
pub mod convert;
pub mod error;
pub mod export;
pub mod models;
pub mod period;
pub mod reports;
pub mod source;
pub mod types;
pub mod units;

use chrono_tz::Tz;
use rust_decimal::Decimal;
use salesweb_config::Config;

pub use aggregate::{aggregate, project_base_currency, Aggregation, Aggregator, PartialAggregation};
pub use convert::{referral_commission, to_base_currency};
pub use error::{CoreError, CoreResult, ErrorCode, ErrorDetails, ErrorSeverity};
pub use export::{csv_filename, sales_format, to_csv, write_csv, SalesFormat, SalesItem};
pub use models::{PeriodSummary, RawFinancialRecord, ReportFilter};
pub use period::PeriodKeyDeriver;
pub use reports::{BaseCurrencyTotal, CommissionLine, CsvExport, RejectedRecord, Report};
pub use salesweb_config::{Dimension, Interval};
pub use source::{InMemorySource, JsonDirSource, RecordSource, SourceError, SourceRef};
pub use types::{Currency, RecordKind};
pub use units::{btc_msat_to_sats, from_smallest_units, to_smallest_units};

// ==================== Engine ====================

/// Calendar and defaults applied to every report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportSettings {
    pub timezone: Tz,
    pub default_interval: Interval,
    pub default_dimension: Dimension,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            default_interval: Interval::default(),
            default_dimension: Dimension::default(),
        }
    }
}

impl ReportSettings {
    pub fn from_config(config: &Config) -> CoreResult<Self> {
        Ok(Self {
            timezone: config.timezone()?,
            default_interval: config.report.default_interval,
            default_dimension: config.report.default_dimension,
        })
    }
}

/// One report to compute
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub kind: RecordKind,
    pub filter: ReportFilter,
    /// Falls back to the configured default
    pub interval: Option<Interval>,
    /// Falls back to the configured default
    pub dimension: Option<Dimension>,
    /// Referral split percent for the commission lines
    pub split_percent: Option<Decimal>,
}

impl ReportRequest {
    pub fn new(kind: RecordKind, filter: ReportFilter) -> Self {
        Self {
            kind,
            filter,
            interval: None,
            dimension: None,
            split_percent: None,
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn with_split_percent(mut self, split_percent: Decimal) -> Self {
        self.split_percent = Some(split_percent);
        self
    }
}

/// Fetches records and turns them into reports.
///
/// Holds no state besides its source and settings; every call recomputes
/// from freshly fetched records.
#[derive(Clone)]
pub struct ReportEngine {
    source: SourceRef,
    settings: ReportSettings,
}

impl ReportEngine {
    pub fn new(source: SourceRef, settings: ReportSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Aggregator for a request, with defaults filled in
    pub fn aggregator(&self, request: &ReportRequest) -> Aggregator {
        Aggregator::new(
            request.interval.unwrap_or(self.settings.default_interval),
            request.dimension.unwrap_or(self.settings.default_dimension),
            self.settings.timezone,
        )
    }

    pub async fn records(&self, kind: RecordKind, filter: &ReportFilter) -> CoreResult<Vec<RawFinancialRecord>> {
        Ok(self.source.fetch(kind, filter).await?)
    }

    pub async fn report(&self, request: &ReportRequest) -> CoreResult<Report> {
        if request.split_percent.is_some() && request.kind != RecordKind::Referrals {
            return Err(CoreError::InvalidFilter {
                message: "split_percent only applies to referral reports".to_string(),
            });
        }

        let records = self.records(request.kind, &request.filter).await?;
        let aggregator = self.aggregator(request);
        let Aggregation { summaries, rejected } = aggregator.aggregate(&records);
        let base_totals = project_base_currency(&summaries)?;

        let commissions = match request.split_percent {
            Some(split_percent) => Some(
                base_totals
                    .iter()
                    .map(|total| {
                        Ok(CommissionLine {
                            period: total.period.clone(),
                            base_currency: total.base_currency.clone(),
                            split_percent,
                            commission: referral_commission(total.net, split_percent)?,
                        })
                    })
                    .collect::<CoreResult<Vec<_>>>()?,
            ),
            None => None,
        };

        log::info!(
            target: "salesweb::report",
            "Built {} report: {} records, {} summaries, {} rejected",
            request.kind,
            records.len(),
            summaries.len(),
            rejected.len()
        );

        Ok(Report {
            kind: request.kind,
            interval: aggregator.deriver().interval,
            dimension: aggregator.dimension(),
            timezone: self.settings.timezone.name().to_string(),
            start_date: request.filter.start_date,
            end_date: request.filter.end_date,
            summaries,
            base_totals,
            rejected,
            commissions,
        })
    }

    pub async fn csv_export(&self, request: &ReportRequest) -> CoreResult<CsvExport> {
        let records = self.records(request.kind, &request.filter).await?;
        let content = to_csv(request.kind, self.aggregator(request).deriver(), &records)?;
        Ok(CsvExport {
            filename: csv_filename(request.kind, &request.filter),
            content,
        })
    }

    pub async fn sales_format(&self, request: &ReportRequest) -> CoreResult<SalesFormat> {
        let records = self.records(request.kind, &request.filter).await?;
        sales_format(request.filter.end_date, &self.aggregator(request), &records)
    }
}
