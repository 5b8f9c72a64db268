//! Period aggregation
//!
//! Records are folded into buckets keyed by period, grouping dimension,
//! native currency and base currency. A fold only ever consumes and returns
//! [`PartialAggregation`] values, and two partials merge bucket-wise, so any
//! split of the input aggregates to the same result as the whole.

use chrono_tz::Tz;
use rust_decimal::Decimal;
use salesweb_config::{Dimension, Interval};
use std::collections::BTreeMap;

use crate::convert::to_base_currency;
use crate::error::{CoreError, CoreResult};
use crate::models::{PeriodSummary, RawFinancialRecord};
use crate::period::PeriodKeyDeriver;
use crate::reports::{BaseCurrencyTotal, RejectedRecord};
use crate::types::Currency;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct BucketKey {
    period: String,
    ref_code: Option<String>,
    currency: String,
    base_currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Accumulator {
    record_count: usize,
    net_total: u64,
    tax_total: u64,
    base_net: Decimal,
    base_tax: Decimal,
}

impl Accumulator {
    fn checked_combine(&self, other: &Accumulator) -> Option<Accumulator> {
        Some(Accumulator {
            record_count: self.record_count.checked_add(other.record_count)?,
            net_total: self.net_total.checked_add(other.net_total)?,
            tax_total: self.tax_total.checked_add(other.tax_total)?,
            base_net: self.base_net.checked_add(other.base_net)?,
            base_tax: self.base_tax.checked_add(other.base_tax)?,
        })
    }
}

/// Intermediate fold state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialAggregation {
    buckets: BTreeMap<BucketKey, Accumulator>,
    rejected: Vec<RejectedRecord>,
}

impl PartialAggregation {
    /// Add a contribution to its bucket, leaving the bucket untouched on overflow
    fn absorb(&mut self, key: BucketKey, contribution: Accumulator) -> CoreResult<()> {
        match self.buckets.get_mut(&key) {
            Some(existing) => {
                *existing = existing
                    .checked_combine(&contribution)
                    .ok_or_else(|| CoreError::InvalidAmount {
                        message: format!(
                            "{} totals for {} in {} overflow",
                            key.currency, key.period, key.base_currency
                        ),
                    })?;
            }
            None => {
                self.buckets.insert(key, contribution);
            }
        }
        Ok(())
    }

    fn reject(mut self, record: &RawFinancialRecord, error: &CoreError) -> Self {
        self.rejected.push(RejectedRecord {
            record: record.label(),
            code: error.code(),
            message: error.to_string(),
        });
        self
    }

    /// Merge two partial results bucket-wise.
    ///
    /// Fails with `InvalidAmount` when a merged bucket total overflows.
    pub fn merge(mut self, other: PartialAggregation) -> CoreResult<Self> {
        self.rejected.extend(other.rejected);
        for (key, contribution) in other.buckets {
            self.absorb(key, contribution)?;
        }
        Ok(self)
    }

    /// Number of records excluded so far
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    /// Emit summaries sorted by period, then dimension value
    pub fn finish(self) -> Aggregation {
        let summaries = self
            .buckets
            .into_iter()
            .map(|(key, acc)| PeriodSummary {
                period: key.period,
                ref_code: key.ref_code,
                currency: key.currency,
                base_currency: key.base_currency,
                record_count: acc.record_count,
                net_total: acc.net_total,
                tax_total: acc.tax_total,
                base_currency_net: acc.base_net,
                base_currency_tax: acc.base_tax,
            })
            .collect();

        let mut rejected = self.rejected;
        rejected.sort_by(|a, b| {
            a.record
                .cmp(&b.record)
                .then_with(|| a.message.cmp(&b.message))
        });

        Aggregation { summaries, rejected }
    }
}

/// Result of an aggregation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub summaries: Vec<PeriodSummary>,
    /// Records excluded from every bucket
    pub rejected: Vec<RejectedRecord>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty() && self.rejected.is_empty()
    }
}

/// Folds records into period buckets
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    deriver: PeriodKeyDeriver,
    dimension: Dimension,
}

impl Aggregator {
    pub fn new(interval: Interval, dimension: Dimension, timezone: Tz) -> Self {
        Self {
            deriver: PeriodKeyDeriver::new(interval, timezone),
            dimension,
        }
    }

    pub fn deriver(&self) -> &PeriodKeyDeriver {
        &self.deriver
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    fn contribution(&self, record: &RawFinancialRecord) -> CoreResult<(BucketKey, Accumulator)> {
        let period = self.deriver.key_for_record(record)?;
        let currency = Currency::parse(&record.currency)?;
        let base_currency = Currency::parse(&record.base_currency)?;

        let base_net = to_base_currency(record.amount, currency.code(), record.rate, base_currency.code())?;
        let base_tax = to_base_currency(record.tax, currency.code(), record.rate, base_currency.code())?;

        let ref_code = match self.dimension {
            Dimension::Currency => None,
            Dimension::RefCode => record.ref_code.clone(),
        };

        let key = BucketKey {
            period,
            ref_code,
            currency: currency.code().to_string(),
            base_currency: base_currency.code().to_string(),
        };
        let contribution = Accumulator {
            record_count: 1,
            net_total: record.amount,
            tax_total: record.tax,
            base_net,
            base_tax,
        };
        Ok((key, contribution))
    }

    /// Fold one record into a partial result.
    ///
    /// A record whose contribution would overflow its bucket is rejected with
    /// `InvalidAmount` and the bucket keeps its previous totals.
    pub fn fold(&self, mut partial: PartialAggregation, record: &RawFinancialRecord) -> PartialAggregation {
        let outcome = self
            .contribution(record)
            .and_then(|(key, contribution)| partial.absorb(key, contribution));

        match outcome {
            Ok(()) => partial,
            Err(error) => {
                log::warn!(
                    target: "salesweb::aggregate",
                    "Excluding record {} from aggregation: {}",
                    record.label(),
                    error
                );
                partial.reject(record, &error)
            }
        }
    }

    /// Fold a batch of records into a partial result
    pub fn partial<'a, I>(&self, records: I) -> PartialAggregation
    where
        I: IntoIterator<Item = &'a RawFinancialRecord>,
    {
        records
            .into_iter()
            .fold(PartialAggregation::default(), |partial, record| self.fold(partial, record))
    }

    pub fn aggregate<'a, I>(&self, records: I) -> Aggregation
    where
        I: IntoIterator<Item = &'a RawFinancialRecord>,
    {
        let aggregation = self.partial(records).finish();
        log::debug!(
            target: "salesweb::aggregate",
            "Aggregated into {} buckets ({} rejected) at {} granularity",
            aggregation.summaries.len(),
            aggregation.rejected.len(),
            self.deriver.interval
        );
        aggregation
    }
}

/// Aggregate records at one granularity in one timezone
pub fn aggregate(
    records: &[RawFinancialRecord],
    interval: Interval,
    dimension: Dimension,
    timezone: Tz,
) -> Aggregation {
    Aggregator::new(interval, dimension, timezone).aggregate(records)
}

/// Per-period totals in base currency, merged across native currencies.
///
/// Both report kinds derive their base-currency rollup from here.
pub fn project_base_currency(summaries: &[PeriodSummary]) -> CoreResult<Vec<BaseCurrencyTotal>> {
    let mut totals: BTreeMap<(String, String), BaseCurrencyTotal> = BTreeMap::new();

    for summary in summaries {
        let entry = totals
            .entry((summary.period.clone(), summary.base_currency.clone()))
            .or_insert_with(|| BaseCurrencyTotal {
                period: summary.period.clone(),
                base_currency: summary.base_currency.clone(),
                record_count: 0,
                net: Decimal::ZERO,
                tax: Decimal::ZERO,
            });

        let overflow = || CoreError::InvalidAmount {
            message: format!("{} totals for {} overflow", summary.base_currency, summary.period),
        };
        entry.record_count += summary.record_count;
        entry.net = entry.net.checked_add(summary.base_currency_net).ok_or_else(overflow)?;
        entry.tax = entry.tax.checked_add(summary.base_currency_tax).ok_or_else(overflow)?;
    }

    Ok(totals.into_values().collect())
}
