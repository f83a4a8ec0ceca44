use crate::domain::option::ContractType;
use crate::domain::recommendation::{Recommendation, RecommendationRequest};
use crate::ingest::provider::MarketDataSource;
use crate::pricing::PricingModel;
use crate::time::expiration::ExpirationWindow;
use anyhow::Context;
use chrono::{DateTime, Utc};

pub mod aggregate;
pub mod evaluate;
pub mod rank;

/// One recommendation run: spot → contract type → expiration window → evaluation → ranking.
pub async fn recommend(
    source: &dyn MarketDataSource,
    pricing: &dyn PricingModel,
    request: &RecommendationRequest,
    window: &ExpirationWindow,
    now: DateTime<Utc>,
) -> anyhow::Result<Recommendation> {
    request.validate()?;
    window.validate()?;

    let ticker = request.ticker.as_str();
    let spot = source
        .fetch_spot_price(ticker)
        .await
        .with_context(|| format!("failed to read spot price for {ticker}"))?;
    let contract_type = ContractType::for_target(request.target_price, spot);

    let quotes = aggregate::aggregate(source, ticker, request.target_date, contract_type, window).await?;
    let evaluated = evaluate::evaluate(&quotes, request, contract_type, spot, now, pricing);
    let contracts = rank::select(evaluated, request, contract_type)?;

    tracing::info!(
        %ticker,
        provider = source.provider_name(),
        spot,
        target_price = request.target_price,
        %contract_type,
        quotes = quotes.len(),
        selected = contracts.len(),
        "recommendation run finished"
    );

    Ok(Recommendation {
        ticker: request.ticker.clone(),
        spot,
        contract_type,
        rank: request.rank,
        contracts,
    })
}
