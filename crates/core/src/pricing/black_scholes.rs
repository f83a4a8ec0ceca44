use crate::domain::option::ContractType;
use crate::pricing::PricingModel;
use statrs::distribution::{ContinuousCDF, Normal};

const DAYS_PER_YEAR: f64 = 365.0;

/// European Black-Scholes deltas without dividends.
#[derive(Debug, Clone)]
pub struct BlackScholes {
    standard_normal: Normal,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

impl BlackScholes {
    pub fn new() -> Self {
        Self {
            standard_normal: Normal::standard(),
        }
    }

    fn d1(spot: f64, strike: f64, rate: f64, vol: f64, expiry: f64) -> f64 {
        let sig_sqrt_t = vol * expiry.sqrt();
        ((spot / strike).ln() + (rate + 0.5 * vol * vol) * expiry) / sig_sqrt_t
    }
}

fn expiry_delta(spot: f64, strike: f64, contract_type: ContractType) -> f64 {
    match contract_type {
        ContractType::Call if spot > strike => 1.0,
        ContractType::Put if spot < strike => -1.0,
        _ => 0.0,
    }
}

impl PricingModel for BlackScholes {
    fn delta(
        &self,
        spot: f64,
        strike: f64,
        rate_pct: f64,
        days_to_expiry: i64,
        volatility_pct: f64,
        contract_type: ContractType,
    ) -> f64 {
        let vol = volatility_pct / 100.0;
        if days_to_expiry <= 0 || !(vol > 0.0) {
            return expiry_delta(spot, strike, contract_type);
        }

        let expiry = days_to_expiry as f64 / DAYS_PER_YEAR;
        let d1 = Self::d1(spot, strike, rate_pct / 100.0, vol, expiry);
        let call_delta = self.standard_normal.cdf(d1);
        match contract_type {
            ContractType::Call => call_delta,
            ContractType::Put => call_delta - 1.0,
        }
    }
}
