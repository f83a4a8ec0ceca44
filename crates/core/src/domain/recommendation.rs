use crate::domain::option::{ContractType, EvaluatedContract};
use crate::error::RecommendError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankCriterion {
    ByReturn,
    ByDelta,
}

impl FromStr for RankCriterion {
    type Err = RecommendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "return" => Ok(Self::ByReturn),
            "delta" => Ok(Self::ByDelta),
            other => Err(RecommendError::invalid(format!(
                "unknown rank criterion {other:?} (expected Return or Delta)"
            ))),
        }
    }
}

/// Inclusive delta band, 0 <= lo <= hi <= 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaRange {
    pub lo: f64,
    pub hi: f64,
}

impl DeltaRange {
    pub fn contains(&self, delta: f64) -> bool {
        (self.lo..=self.hi).contains(&delta)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationRequest {
    pub ticker: String,
    pub target_price: f64,
    pub target_date: NaiveDate,
    pub max_risk: f64,
    pub contract_count: usize,
    /// Annualized, in percent.
    pub interest_rate: f64,
    pub rank: RankCriterion,
    pub delta_range: Option<DeltaRange>,
}

impl RecommendationRequest {
    /// Re-checks the invariants a request must hold before any fetch.
    pub fn validate(&self) -> Result<(), RecommendError> {
        if self.ticker.trim().is_empty() {
            return Err(RecommendError::invalid("ticker must be non-empty"));
        }
        if !(self.target_price.is_finite() && self.target_price > 0.0) {
            return Err(RecommendError::invalid(format!(
                "target price must be positive (got {})",
                self.target_price
            )));
        }
        if !(self.max_risk.is_finite() && self.max_risk > 0.0) {
            return Err(RecommendError::invalid(format!(
                "maximum risk must be positive (got {})",
                self.max_risk
            )));
        }
        if self.contract_count == 0 {
            return Err(RecommendError::invalid(
                "contract count must be positive (got 0)",
            ));
        }
        if !self.interest_rate.is_finite() {
            return Err(RecommendError::invalid("interest rate must be finite"));
        }

        match (self.rank, self.delta_range) {
            (RankCriterion::ByDelta, None) => Err(RecommendError::invalid(
                "delta range is required when ranking by delta",
            )),
            (_, Some(range)) => validate_delta_range(range),
            (RankCriterion::ByReturn, None) => Ok(()),
        }
    }
}

fn validate_delta_range(range: DeltaRange) -> Result<(), RecommendError> {
    let DeltaRange { lo, hi } = range;
    if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
        return Err(RecommendError::invalid(format!(
            "delta range must satisfy 0 <= lo <= hi <= 1 (got {lo}..{hi})"
        )));
    }
    Ok(())
}

/// Ranked outcome of one run; `contracts` is already truncated to the requested count.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub ticker: String,
    pub spot: f64,
    pub contract_type: ContractType,
    pub rank: RankCriterion,
    pub contracts: Vec<EvaluatedContract>,
}
