use crate::domain::option::{ContractType, OptionQuote};
use crate::error::RecommendError;
use crate::ingest::provider::MarketDataSource;
use crate::ingest::types::{validate_row, OptionChainRow};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Offline chain listing, e.g. a snapshot saved from a previous session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainFixture {
    pub spot: f64,
    pub chains: Vec<FixtureChain>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureChain {
    pub expiration_date: NaiveDate,
    pub contract_type: ContractType,
    pub rows: Vec<OptionChainRow>,
}

#[derive(Debug, Clone)]
pub struct StaticMarketData {
    spot: f64,
    chains: BTreeMap<(NaiveDate, ContractType), Vec<OptionChainRow>>,
}

impl StaticMarketData {
    pub fn new(spot: f64) -> Self {
        Self {
            spot,
            chains: BTreeMap::new(),
        }
    }

    pub fn with_chain(
        mut self,
        expiration: NaiveDate,
        contract_type: ContractType,
        rows: Vec<OptionChainRow>,
    ) -> Self {
        self.chains
            .entry((expiration, contract_type))
            .or_default()
            .extend(rows);
        self
    }

    pub fn from_fixture(fixture: ChainFixture) -> Result<Self> {
        anyhow::ensure!(
            fixture.spot.is_finite() && fixture.spot > 0.0,
            "fixture spot must be positive (got {})",
            fixture.spot
        );

        let mut out = Self::new(fixture.spot);
        for chain in fixture.chains {
            for row in &chain.rows {
                validate_row(row)
                    .with_context(|| format!("invalid row in {} fixture chain", chain.expiration_date))?;
            }
            out = out.with_chain(chain.expiration_date, chain.contract_type, chain.rows);
        }
        Ok(out)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read chain file {}", path.display()))?;
        let fixture = serde_json::from_str::<ChainFixture>(&text)
            .with_context(|| format!("chain file {} has an unexpected shape", path.display()))?;
        Self::from_fixture(fixture)
    }
}

#[async_trait::async_trait]
impl MarketDataSource for StaticMarketData {
    fn provider_name(&self) -> &'static str {
        "static_fixture"
    }

    async fn fetch_spot_price(&self, _ticker: &str) -> Result<f64> {
        Ok(self.spot)
    }

    async fn fetch_chain(
        &self,
        ticker: &str,
        expiration: NaiveDate,
        contract_type: ContractType,
    ) -> Result<Vec<OptionQuote>> {
        match self.chains.get(&(expiration, contract_type)) {
            Some(rows) if !rows.is_empty() => Ok(rows
                .iter()
                .cloned()
                .map(|row| row.into_quote(expiration))
                .collect()),
            _ => Err(RecommendError::ChainNotListed {
                ticker: ticker.to_string(),
                expiration,
                contract_type,
            }
            .into()),
        }
    }
}
