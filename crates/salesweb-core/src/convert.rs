//! Base-currency conversion
//!
//! A record's `rate` is the number of base-currency units one native unit is
//! worth: 500.00 USD at rate 0.92 into EUR is 460.00 EUR.

use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult};
use crate::types::Currency;
use crate::units::from_smallest_units;

/// Validate a rate and turn it into an exact decimal.
///
/// The float's shortest decimal representation is used, so `0.92` becomes
/// exactly `0.92`. Rates whose shortest form needs more digits than a decimal
/// holds fall back to the float's binary value. Positive rates outside the
/// decimal range fail with `InvalidAmount`.
pub fn rate_to_decimal(rate: f64) -> CoreResult<Decimal> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(CoreError::InvalidExchangeRate { rate });
    }
    if let Ok(decimal) = rate.to_string().parse::<Decimal>() {
        if decimal > Decimal::ZERO {
            return Ok(decimal);
        }
    }
    Decimal::from_f64_retain(rate)
        .filter(|decimal| *decimal > Decimal::ZERO)
        .ok_or_else(|| CoreError::InvalidAmount {
            message: format!("exchange rate {:e} is outside the decimal range", rate),
        })
}

/// Project a native smallest-unit amount into base-currency main units
pub fn to_base_currency(
    amount: u64,
    currency: &str,
    rate: f64,
    base_currency: &str,
) -> CoreResult<Decimal> {
    Currency::parse(base_currency)?;
    let main = from_smallest_units(amount, currency)?;
    let rate = rate_to_decimal(rate)?;

    main.checked_mul(rate).ok_or_else(|| CoreError::InvalidAmount {
        message: format!("{} {} at rate {} overflows", main, currency, rate),
    })
}

/// Commission share of a referral amount for a split percent between 0 and 100
pub fn referral_commission(amount: Decimal, split_percent: Decimal) -> CoreResult<Decimal> {
    if split_percent < Decimal::ZERO || split_percent > Decimal::ONE_HUNDRED {
        return Err(CoreError::InvalidAmount {
            message: format!("referral split {}% is outside 0..=100", split_percent),
        });
    }
    Ok(amount * split_percent / Decimal::ONE_HUNDRED)
}
