use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Shares controlled by one listed contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Call,
    Put,
}

/// Sign conventions that differ between calls and puts.
#[derive(Debug, Clone, Copy)]
struct SidePolicy {
    // +1 when the bet pays as price rises above strike, -1 when it pays below.
    payoff_sign: f64,
    delta_descending: bool,
}

const CALL_POLICY: SidePolicy = SidePolicy {
    payoff_sign: 1.0,
    delta_descending: true,
};

const PUT_POLICY: SidePolicy = SidePolicy {
    payoff_sign: -1.0,
    delta_descending: false,
};

impl ContractType {
    /// Call when the forecast is above the current spot, otherwise put.
    pub fn for_target(target_price: f64, spot: f64) -> Self {
        if target_price > spot {
            Self::Call
        } else {
            Self::Put
        }
    }

    fn policy(self) -> &'static SidePolicy {
        match self {
            Self::Call => &CALL_POLICY,
            Self::Put => &PUT_POLICY,
        }
    }

    /// Per-share payoff at expiry if the underlying settles at `price`, ignoring premium.
    pub fn payoff_per_share(self, strike: f64, price: f64) -> f64 {
        self.policy().payoff_sign * (price - strike)
    }

    /// Strictly out-of-the-money relative to the target, i.e. the strike the bet can still pass.
    pub fn is_directional(self, strike: f64, target_price: f64) -> bool {
        self.payoff_per_share(strike, target_price) > 0.0
    }

    pub fn cmp_delta(self, a: f64, b: f64) -> Ordering {
        if self.policy().delta_descending {
            b.total_cmp(&a)
        } else {
            a.total_cmp(&b)
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => f.write_str("Call"),
            Self::Put => f.write_str("Put"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub strike: f64,
    pub ask_price: f64,
    /// Annualized, in percent (23.5 means 23.5%).
    pub implied_volatility: Option<f64>,
    pub expiration_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedContract {
    pub quote: OptionQuote,
    pub remaining_days: i64,
    pub number: u64,
    pub entry_cost: f64,
    pub estimated_return_pct: f64,
    pub delta: Option<f64>,
}

impl EvaluatedContract {
    /// Dollar gain at the target price implied by `estimated_return_pct`.
    pub fn estimated_return_amount(&self) -> f64 {
        self.entry_cost * self.estimated_return_pct * 0.01
    }
}
