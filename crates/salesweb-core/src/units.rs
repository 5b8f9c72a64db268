//! Smallest-unit normalization
//!
//! Every amount travels as an integer count of the currency's smallest unit.
//! The table below is the only place that knows how many smallest units make
//! one main unit:
//!
//! - fiat currencies use cents, 100 per main unit
//! - BTC uses millisatoshi, 10^11 per bitcoin
//!
//! Satoshi display is a separate conversion, see [`btc_msat_to_sats`].

use once_cell::sync::Lazy;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::types::Currency;

/// Decimal places between smallest and main unit
static SCALE_TABLE: Lazy<HashMap<Currency, u32>> = Lazy::new(|| {
    Currency::ALL
        .iter()
        .map(|&currency| {
            let places = if currency.is_fiat() { FIAT_DECIMAL_PLACES } else { BTC_DECIMAL_PLACES };
            (currency, places)
        })
        .collect()
});

const FIAT_DECIMAL_PLACES: u32 = 2;
const BTC_DECIMAL_PLACES: u32 = 11;

/// Millisatoshi per satoshi
pub const MSAT_PER_SAT: u64 = 1_000;

/// Decimal places of a currency's smallest unit
pub fn decimal_places(currency: &str) -> CoreResult<u32> {
    let parsed = Currency::parse(currency)?;
    SCALE_TABLE
        .get(&parsed)
        .copied()
        .ok_or_else(|| CoreError::UnknownCurrency { code: currency.to_string() })
}

/// Smallest units per main unit, e.g. 100 for USD
fn scale_factor(currency: &str) -> CoreResult<u64> {
    Ok(10u64.pow(decimal_places(currency)?))
}

/// Convert a smallest-unit integer into a main-unit decimal
pub fn from_smallest_units(amount: u64, currency: &str) -> CoreResult<Decimal> {
    let places = decimal_places(currency)?;
    Ok(Decimal::from_i128_with_scale(amount as i128, places))
}

/// Convert a main-unit decimal into smallest units.
///
/// Fractions of a smallest unit are rounded half away from zero.
pub fn to_smallest_units(main_amount: Decimal, currency: &str) -> CoreResult<u64> {
    let factor = Decimal::from(scale_factor(currency)?);

    if main_amount.is_sign_negative() && !main_amount.is_zero() {
        return Err(CoreError::InvalidAmount {
            message: format!("{} {} is negative", main_amount, currency),
        });
    }

    main_amount
        .checked_mul(factor)
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|scaled| scaled.to_u64())
        .ok_or_else(|| CoreError::InvalidAmount {
            message: format!("{} {} does not fit in smallest units", main_amount, currency),
        })
}

/// Millisatoshi to satoshi, for the sats display
pub fn btc_msat_to_sats(msat: u64) -> Decimal {
    Decimal::from(msat) / Decimal::from(MSAT_PER_SAT)
}
