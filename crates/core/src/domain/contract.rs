use crate::domain::recommendation::{DeltaRange, RankCriterion, RecommendationRequest};
use crate::error::RecommendError;
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_CONTRACT_COUNT: usize = 5;
const DEFAULT_INTEREST_RATE_PCT: f64 = 1.0;

/// Raw request as supplied by a caller (CLI flags or a JSON request file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationInput {
    pub ticker: String,
    pub target_price: f64,
    pub target_date: String,
    pub max_risk: f64,
    #[serde(default = "default_contract_count")]
    pub contract_count: i64,
    #[serde(default = "default_interest_rate")]
    pub interest_rate: f64,
    #[serde(default = "default_rank")]
    pub rank: String,
    #[serde(default)]
    pub delta_range: Option<(f64, f64)>,
}

fn default_contract_count() -> i64 {
    DEFAULT_CONTRACT_COUNT as i64
}

fn default_interest_rate() -> f64 {
    DEFAULT_INTEREST_RATE_PCT
}

fn default_rank() -> String {
    "Return".to_string()
}

impl RecommendationInput {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("request file {} is not a valid request", path.display()))
    }

    pub fn validate_and_into_request(self) -> Result<RecommendationRequest, RecommendError> {
        let ticker = self.ticker.trim().to_ascii_uppercase();

        let target_date = NaiveDate::parse_from_str(self.target_date.trim(), "%Y-%m-%d")
            .map_err(|e| {
                RecommendError::invalid(format!(
                    "target date must be YYYY-MM-DD (got {:?}): {e}",
                    self.target_date
                ))
            })?;

        if self.contract_count <= 0 {
            return Err(RecommendError::invalid(format!(
                "contract count must be positive (got {})",
                self.contract_count
            )));
        }

        let rank = self.rank.parse::<RankCriterion>()?;
        let delta_range = self.delta_range.map(|(lo, hi)| DeltaRange { lo, hi });

        let request = RecommendationRequest {
            ticker,
            target_price: self.target_price,
            target_date,
            max_risk: self.max_risk,
            contract_count: self.contract_count as usize,
            interest_rate: self.interest_rate,
            rank,
            delta_range,
        };
        request.validate()?;
        Ok(request)
    }
}
