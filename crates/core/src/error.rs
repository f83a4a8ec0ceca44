use crate::domain::option::ContractType;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum RecommendError {
    /// Malformed request; raised before any market data is fetched.
    InvalidConfiguration(String),
    /// No chain is listed for this expiration. Expected while walking the window.
    ChainNotListed {
        ticker: String,
        expiration: NaiveDate,
        contract_type: ContractType,
    },
    NoExpirationsFound {
        ticker: String,
        first_candidate: NaiveDate,
        attempts: usize,
    },
    MissingVolatility {
        strike: f64,
        expiration: NaiveDate,
    },
}

impl RecommendError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidConfiguration(detail.into())
    }

    pub fn is_chain_not_listed(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<RecommendError>(),
            Some(RecommendError::ChainNotListed { .. })
        )
    }
}

impl fmt::Display for RecommendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration(detail) => write!(f, "invalid configuration: {detail}"),
            Self::ChainNotListed {
                ticker,
                expiration,
                contract_type,
            } => write!(
                f,
                "no {contract_type} chain listed for {ticker} expiring {expiration}"
            ),
            Self::NoExpirationsFound {
                ticker,
                first_candidate,
                attempts,
            } => write!(
                f,
                "no option expirations found for {ticker} in {attempts} weekly attempts from {first_candidate}"
            ),
            Self::MissingVolatility { strike, expiration } => write!(
                f,
                "implied volatility missing for strike {strike} expiring {expiration}"
            ),
        }
    }
}

impl std::error::Error for RecommendError {}
