//! Payment provider abstraction.
//!
//! Charge and funding flows are expressed as traits; each provider holds its
//! own configuration and composes the [`HttpClient`](crate::http::HttpClient)
//! pipeline to talk to its API.

mod registry;
mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ClassifiedError, ErrorCatalog, ErrorCode};
use crate::http::CallContext;

pub use registry::ProviderRegistry;
pub use rest::{RestProvider, RestProviderConfig};

/// Currencies supported by the payment flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "NGN")]
    NigeriaNaira,
    #[serde(rename = "GBP")]
    UkPounds,
    #[serde(rename = "USD")]
    UsDollar,
    #[serde(rename = "CAD")]
    CanadianDollar,
    #[serde(rename = "KES")]
    KenyaShilling,
    #[serde(rename = "GHS")]
    GhanaCedis,
    #[serde(rename = "EUR")]
    Euro,
    #[serde(rename = "USDT")]
    Usdt,
    #[serde(rename = "TZS")]
    TanzaniaShilling,
    #[serde(rename = "XAF")]
    CentralFranc,
    #[serde(rename = "UGX")]
    UgandaShilling,
    #[serde(rename = "XOF")]
    WesternFranc,
    #[serde(rename = "RWF")]
    RwandaFranc,
}

impl Currency {
    pub const ALL: [Currency; 13] = [
        Currency::NigeriaNaira,
        Currency::UkPounds,
        Currency::UsDollar,
        Currency::CanadianDollar,
        Currency::KenyaShilling,
        Currency::GhanaCedis,
        Currency::Euro,
        Currency::Usdt,
        Currency::TanzaniaShilling,
        Currency::CentralFranc,
        Currency::UgandaShilling,
        Currency::WesternFranc,
        Currency::RwandaFranc,
    ];

    /// ISO-like currency code, e.g. `NGN`.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::NigeriaNaira => "NGN",
            Currency::UkPounds => "GBP",
            Currency::UsDollar => "USD",
            Currency::CanadianDollar => "CAD",
            Currency::KenyaShilling => "KES",
            Currency::GhanaCedis => "GHS",
            Currency::Euro => "EUR",
            Currency::Usdt => "USDT",
            Currency::TanzaniaShilling => "TZS",
            Currency::CentralFranc => "XAF",
            Currency::UgandaShilling => "UGX",
            Currency::WesternFranc => "XOF",
            Currency::RwandaFranc => "RWF",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ClassifiedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == upper)
            .ok_or_else(|| {
                ErrorCatalog::default()
                    .error(ErrorCode::RequestNotValid, format!("Unknown currency: {}", s))
            })
    }
}

/// Kind of payment a transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    #[default]
    CustomerPayment,
}

/// A charge or funding as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Provider-side reference used by the follow-up calls.
    pub reference: String,
    pub status: String,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: Currency,
    /// Name of the provider that produced the transaction.
    #[serde(default)]
    pub provider: String,
}

/// A provider able to take money from a payment source.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Chargeable: Send + Sync {
    fn name(&self) -> &str;

    /// Starts a charge of `amount` minor units against `source`.
    async fn initiate_charge(
        &self,
        ctx: &CallContext,
        source: &serde_json::Value,
        amount: i64,
        currency: Currency,
    ) -> Result<Transaction, ClassifiedError>;

    /// Fetches what the provider needs to authorize the charge (OTP, 3DS, ...).
    async fn get_charge_authorization(
        &self,
        ctx: &CallContext,
        reference: &str,
    ) -> Result<serde_json::Value, ClassifiedError>;

    async fn authorize_charge(
        &self,
        ctx: &CallContext,
        reference: &str,
        authorization_data: &serde_json::Value,
    ) -> Result<Transaction, ClassifiedError>;

    async fn check_charge_status(
        &self,
        ctx: &CallContext,
        reference: &str,
    ) -> Result<Transaction, ClassifiedError>;

    async fn complete_charge(
        &self,
        ctx: &CallContext,
        reference: &str,
    ) -> Result<Transaction, ClassifiedError>;
}

/// A provider able to pay money out to a destination.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fundable: Send + Sync {
    fn name(&self) -> &str;

    async fn initiate_funding(
        &self,
        ctx: &CallContext,
        destination: &serde_json::Value,
        amount: i64,
        currency: Currency,
    ) -> Result<Transaction, ClassifiedError>;

    async fn complete_funding(
        &self,
        ctx: &CallContext,
        reference: &str,
    ) -> Result<Transaction, ClassifiedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_parse() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::UsDollar);
        assert_eq!("ngn".parse::<Currency>().unwrap(), Currency::NigeriaNaira);
        assert_eq!("USDT".parse::<Currency>().unwrap(), Currency::Usdt);
    }

    #[test]
    fn test_currency_parse_unknown() {
        let err = "ABC".parse::<Currency>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::RequestNotValid);
        assert!(err.message().contains("ABC"));
        assert_eq!(err.info(), "The request is not valid");
    }

    #[test]
    fn test_currency_serde_uses_code() {
        for currency in Currency::ALL {
            let json = serde_json::to_string(&currency).unwrap();
            assert_eq!(json, format!("\"{}\"", currency));
        }
        let parsed: Currency = serde_json::from_str("\"XOF\"").unwrap();
        assert_eq!(parsed, Currency::WesternFranc);
    }

    #[test]
    fn test_payment_type_serde() {
        assert_eq!(
            serde_json::to_string(&PaymentType::CustomerPayment).unwrap(),
            "\"customer_payment\""
        );
    }

    #[test]
    fn test_transaction_provider_defaults_to_empty() {
        let tx: Transaction = serde_json::from_str(
            r#"{"reference":"ch_1","status":"pending","amount":100,"currency":"USD"}"#,
        )
        .unwrap();
        assert_eq!(tx.reference, "ch_1");
        assert_eq!(tx.currency, Currency::UsDollar);
        assert!(tx.provider.is_empty());
    }
}
