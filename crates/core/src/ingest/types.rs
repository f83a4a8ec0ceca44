use crate::domain::option::{ContractType, OptionQuote};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotQuoteResponse {
    pub ticker: String,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChainResponse {
    pub ticker: String,
    pub expiration_date: NaiveDate,
    pub contract_type: ContractType,
    pub rows: Vec<OptionChainRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChainRow {
    pub strike: f64,
    pub ask: f64,
    /// Percent. Quote pages publish this as text ("23.45%"), APIs as a number.
    #[serde(default, deserialize_with = "deserialize_percent")]
    pub implied_volatility: Option<f64>,
}

impl OptionChainRow {
    pub fn into_quote(self, expiration_date: NaiveDate) -> OptionQuote {
        OptionQuote {
            strike: self.strike,
            ask_price: self.ask,
            implied_volatility: self.implied_volatility,
            expiration_date,
        }
    }
}

fn deserialize_percent<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_percent))
}

fn parse_percent(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let t = s.trim().trim_end_matches('%').replace(',', "");
            t.trim().parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

pub fn validate_row(row: &OptionChainRow) -> anyhow::Result<()> {
    anyhow::ensure!(
        row.strike.is_finite() && row.strike > 0.0,
        "strike must be positive (got {})",
        row.strike
    );
    anyhow::ensure!(
        row.ask.is_finite() && row.ask >= 0.0,
        "ask must be non-negative (got {})",
        row.ask
    );
    Ok(())
}
