use crate::domain::option::{ContractType, OptionQuote};
use crate::error::RecommendError;
use crate::ingest::provider::MarketDataSource;
use crate::time::expiration::{first_expiration, next_expiration, ExpirationWindow};
use anyhow::{Context, Result};
use chrono::NaiveDate;

/// Collects quotes from the first `window.expirations` weekly expirations that have a listed
/// chain, starting at the Friday on or after `target_date`. Output is in fetch order.
pub async fn aggregate(
    source: &dyn MarketDataSource,
    ticker: &str,
    target_date: NaiveDate,
    contract_type: ContractType,
    window: &ExpirationWindow,
) -> Result<Vec<OptionQuote>> {
    window.validate()?;

    let first_candidate = first_expiration(target_date);
    let mut candidate = first_candidate;
    let mut collected: usize = 0;
    let mut attempts: usize = 0;
    let mut quotes = Vec::new();

    while collected < window.expirations && attempts < window.max_attempts {
        attempts += 1;

        match source.fetch_chain(ticker, candidate, contract_type).await {
            Ok(rows) => {
                tracing::debug!(%ticker, expiration = %candidate, rows = rows.len(), "collected chain");
                quotes.extend(rows);
                collected += 1;
            }
            Err(err) if RecommendError::is_chain_not_listed(&err) => {
                tracing::warn!(%ticker, expiration = %candidate, %contract_type, "no chain listed; trying next week");
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!(
                        "{} fetch failed for {ticker} expiring {candidate}",
                        source.provider_name()
                    )
                });
            }
        }

        candidate = next_expiration(candidate);
    }

    if collected == 0 {
        return Err(RecommendError::NoExpirationsFound {
            ticker: ticker.to_string(),
            first_candidate,
            attempts,
        }
        .into());
    }

    if collected < window.expirations {
        tracing::warn!(
            %ticker,
            collected,
            wanted = window.expirations,
            attempts,
            "attempt ceiling reached with a partial expiration window"
        );
    }

    Ok(quotes)
}
