//! Record sources
//!
//! The engine never talks to the admin API itself. Records arrive through a
//! [`RecordSource`]; the file-backed implementation reads batches that an
//! external fetcher stored as JSON arrays, one file per fetched page.

use async_trait::async_trait;
use chrono_tz::Tz;
use salesweb_config::Config;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::error::CoreResult;
use crate::models::{RawFinancialRecord, ReportFilter};
use crate::types::RecordKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Malformed record batch {path}: {message}")]
    Malformed { path: String, message: String },

    #[error("Record source unavailable: {message}")]
    Unavailable { message: String },
}

/// Source reference type
pub type SourceRef = Arc<dyn RecordSource>;

/// Fetch boundary for raw financial records
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch every record of `kind` matching the filter
    async fn fetch(&self, kind: RecordKind, filter: &ReportFilter) -> Result<Vec<RawFinancialRecord>, SourceError>;
}

/// Reads `{data.path}/{kind_dir}[/{company_id}]/*.json`
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    payments_dir: PathBuf,
    referrals_dir: PathBuf,
    timezone: Tz,
}

impl JsonDirSource {
    pub fn new(payments_dir: impl Into<PathBuf>, referrals_dir: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self {
            payments_dir: payments_dir.into(),
            referrals_dir: referrals_dir.into(),
            timezone,
        }
    }

    pub fn from_config(config: &Config) -> CoreResult<Self> {
        Ok(Self::new(
            config.batch_dir(&config.data.payments_dir),
            config.batch_dir(&config.data.referrals_dir),
            config.timezone()?,
        ))
    }

    fn batch_dir(&self, kind: RecordKind, filter: &ReportFilter) -> Result<PathBuf, SourceError> {
        let base = match kind {
            RecordKind::Payments => &self.payments_dir,
            RecordKind::Referrals => &self.referrals_dir,
        };

        match filter.company_id.as_deref() {
            None => Ok(base.clone()),
            Some(company) if company.is_empty() || company.contains(['/', '\\']) || company.contains("..") => {
                Err(SourceError::Unavailable {
                    message: format!("invalid company id '{}'", company),
                })
            }
            Some(company) => Ok(base.join(company)),
        }
    }

    /// Batch files of a directory in name order
    fn batch_files(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let pattern = dir.join("*.json");
        let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
            .map_err(|e| SourceError::Unavailable { message: e.to_string() })?
            .flatten()
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl RecordSource for JsonDirSource {
    async fn fetch(&self, kind: RecordKind, filter: &ReportFilter) -> Result<Vec<RawFinancialRecord>, SourceError> {
        let dir = self.batch_dir(kind, filter)?;
        if !dir.is_dir() {
            return Err(SourceError::Unavailable {
                message: format!("no {} batches at {}", kind, dir.display()),
            });
        }

        let mut records = Vec::new();
        for path in Self::batch_files(&dir)? {
            let display = path.to_string_lossy().to_string();
            let content = tokio::fs::read_to_string(&path).await.map_err(|e| SourceError::Io {
                path: display.clone(),
                message: e.to_string(),
            })?;
            let batch: Vec<RawFinancialRecord> = serde_json::from_str(&content).map_err(|e| SourceError::Malformed {
                path: display.clone(),
                message: e.to_string(),
            })?;

            log::debug!(target: "salesweb::source", "Loaded {} records from {}", batch.len(), display);
            records.extend(batch.into_iter().filter(|record| filter.accepts(record, &self.timezone)));
        }

        log::info!(
            target: "salesweb::source",
            "Fetched {} {} records for {} to {}",
            records.len(),
            kind,
            filter.start_date,
            filter.end_date
        );
        Ok(records)
    }
}

/// Serves fixed records, ignoring `company_id`
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: HashMap<RecordKind, Vec<RawFinancialRecord>>,
    timezone: Option<Tz>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(mut self, kind: RecordKind, records: Vec<RawFinancialRecord>) -> Self {
        self.records.entry(kind).or_default().extend(records);
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = Some(timezone);
        self
    }
}

#[async_trait]
impl RecordSource for InMemorySource {
    async fn fetch(&self, kind: RecordKind, filter: &ReportFilter) -> Result<Vec<RawFinancialRecord>, SourceError> {
        let timezone = self.timezone.unwrap_or(Tz::UTC);
        Ok(self
            .records
            .get(&kind)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| filter.accepts(record, &timezone))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
