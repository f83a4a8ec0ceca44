use crate::domain::option::{ContractType, EvaluatedContract, OptionQuote, CONTRACT_MULTIPLIER};
use crate::domain::recommendation::{RankCriterion, RecommendationRequest};
use crate::error::RecommendError;
use crate::pricing::PricingModel;
use crate::time::expiration::remaining_days;
use chrono::{DateTime, Utc};

/// Contracts affordable within `max_risk`. Zero-priced (no liquidity) rows yield 0.
pub fn affordable_number(max_risk: f64, ask_price: f64) -> u64 {
    if !(ask_price > 0.0) {
        return 0;
    }
    // Float-to-int casts saturate, so a near-zero ask cannot wrap.
    (max_risk * 0.01 / ask_price).floor() as u64
}

/// Percent return if the underlying settles at `target_price`. `entry_cost` must be positive.
pub fn estimated_return_pct(
    contract_type: ContractType,
    number: u64,
    strike: f64,
    target_price: f64,
    entry_cost: f64,
) -> f64 {
    let payoff = number as f64 * CONTRACT_MULTIPLIER * contract_type.payoff_per_share(strike, target_price);
    100.0 * (payoff - entry_cost) / entry_cost
}

pub fn compute_delta(
    pricing: &dyn PricingModel,
    quote: &OptionQuote,
    request: &RecommendationRequest,
    contract_type: ContractType,
    spot: f64,
    remaining_days: i64,
) -> Result<f64, RecommendError> {
    let volatility = quote
        .implied_volatility
        .ok_or(RecommendError::MissingVolatility {
            strike: quote.strike,
            expiration: quote.expiration_date,
        })?;
    Ok(pricing.delta(
        spot,
        quote.strike,
        request.interest_rate,
        remaining_days,
        volatility,
        contract_type,
    ))
}

/// Sizes and prices every affordable quote. Unaffordable rows are dropped here; rows whose delta
/// cannot be computed keep `delta: None`.
pub fn evaluate(
    quotes: &[OptionQuote],
    request: &RecommendationRequest,
    contract_type: ContractType,
    spot: f64,
    now: DateTime<Utc>,
    pricing: &dyn PricingModel,
) -> Vec<EvaluatedContract> {
    let mut out = Vec::with_capacity(quotes.len());
    let mut unaffordable: usize = 0;
    let mut missing_volatility: usize = 0;

    for quote in quotes {
        let number = affordable_number(request.max_risk, quote.ask_price);
        if number == 0 {
            unaffordable += 1;
            continue;
        }

        let remaining_days = remaining_days(quote.expiration_date, now);
        let entry_cost = number as f64 * quote.ask_price * CONTRACT_MULTIPLIER;
        let estimated_return_pct = estimated_return_pct(
            contract_type,
            number,
            quote.strike,
            request.target_price,
            entry_cost,
        );

        let delta = match request.rank {
            RankCriterion::ByReturn => None,
            RankCriterion::ByDelta => {
                match compute_delta(pricing, quote, request, contract_type, spot, remaining_days) {
                    Ok(delta) => Some(delta),
                    Err(err) => {
                        missing_volatility += 1;
                        tracing::debug!(error = %err, "excluding row from delta ranking");
                        None
                    }
                }
            }
        };

        out.push(EvaluatedContract {
            quote: quote.clone(),
            remaining_days,
            number,
            entry_cost,
            estimated_return_pct,
            delta,
        });
    }

    tracing::debug!(
        quotes = quotes.len(),
        evaluated = out.len(),
        unaffordable,
        missing_volatility,
        "evaluated option quotes"
    );
    out
}
