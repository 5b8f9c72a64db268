//! Basic types for the reporting engine

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Currencies the platform bills in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    USD,
    EUR,
    GBP,
    CHF,
    CAD,
    AUD,
    NZD,
    SEK,
    NOK,
    DKK,
    PLN,
    CZK,
    HUF,
    RON,
    BGN,
    /// Bitcoin, carried in millisatoshi
    BTC,
}

impl Currency {
    /// Every supported currency, fiat first
    pub const ALL: [Currency; 16] = [
        Currency::USD,
        Currency::EUR,
        Currency::GBP,
        Currency::CHF,
        Currency::CAD,
        Currency::AUD,
        Currency::NZD,
        Currency::SEK,
        Currency::NOK,
        Currency::DKK,
        Currency::PLN,
        Currency::CZK,
        Currency::HUF,
        Currency::RON,
        Currency::BGN,
        Currency::BTC,
    ];

    /// Parse an upstream currency code
    pub fn parse(code: &str) -> Result<Self, CoreError> {
        code.parse()
    }

    /// ISO-style code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::CHF => "CHF",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::NZD => "NZD",
            Currency::SEK => "SEK",
            Currency::NOK => "NOK",
            Currency::DKK => "DKK",
            Currency::PLN => "PLN",
            Currency::CZK => "CZK",
            Currency::HUF => "HUF",
            Currency::RON => "RON",
            Currency::BGN => "BGN",
            Currency::BTC => "BTC",
        }
    }

    pub fn is_fiat(&self) -> bool {
        !matches!(self, Currency::BTC)
    }
}

impl std::str::FromStr for Currency {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Currency::ALL
            .iter()
            .copied()
            .find(|c| c.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| CoreError::UnknownCurrency { code: s.to_string() })
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Kind of upstream financial record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// VM payments
    Payments,
    /// Referral payouts
    Referrals,
}

impl std::str::FromStr for RecordKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "payments" | "payment" => Ok(RecordKind::Payments),
            "referrals" | "referral" => Ok(RecordKind::Referrals),
            _ => Err(format!("Invalid record kind: {}", s)),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Payments => write!(f, "payments"),
            RecordKind::Referrals => write!(f, "referrals"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_from_str() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::USD);
        assert_eq!("btc".parse::<Currency>().unwrap(), Currency::BTC);
        assert!(!Currency::BTC.is_fiat());
        assert!(Currency::EUR.is_fiat());
    }

    #[test]
    fn test_unknown_currency() {
        let err = Currency::parse("DOGE").unwrap_err();
        assert!(matches!(err, CoreError::UnknownCurrency { ref code } if code == "DOGE"));
    }

    #[test]
    fn test_record_kind_from_str() {
        assert_eq!("payments".parse::<RecordKind>().unwrap(), RecordKind::Payments);
        assert_eq!("Referrals".parse::<RecordKind>().unwrap(), RecordKind::Referrals);
        assert!("invoices".parse::<RecordKind>().is_err());
        assert_eq!(RecordKind::Referrals.to_string(), "referrals");
    }
}
