use crate::domain::option::ContractType;

pub mod black_scholes;

pub use black_scholes::BlackScholes;

/// Delta source used when ranking by delta.
pub trait PricingModel: Send + Sync {
    /// `rate_pct` and `volatility_pct` are annualized percentages. Result lies in [-1, 1].
    fn delta(
        &self,
        spot: f64,
        strike: f64,
        rate_pct: f64,
        days_to_expiry: i64,
        volatility_pct: f64,
        contract_type: ContractType,
    ) -> f64;
}
