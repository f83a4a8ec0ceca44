use crate::domain::option::{ContractType, EvaluatedContract};
use crate::domain::recommendation::{RankCriterion, RecommendationRequest};
use crate::error::RecommendError;

/// Filters out non-viable contracts and returns at most `request.contract_count` of the rest,
/// best first. Ordering uses unrounded values; ties keep fetch order.
pub fn select(
    evaluated: Vec<EvaluatedContract>,
    request: &RecommendationRequest,
    contract_type: ContractType,
) -> Result<Vec<EvaluatedContract>, RecommendError> {
    let mut viable: Vec<EvaluatedContract> = evaluated
        .into_iter()
        .filter(|c| c.number > 0)
        .filter(|c| contract_type.is_directional(c.quote.strike, request.target_price))
        .collect();

    match request.rank {
        RankCriterion::ByReturn => {
            viable.sort_by(|a, b| b.estimated_return_pct.total_cmp(&a.estimated_return_pct));
        }
        RankCriterion::ByDelta => {
            let range = request.delta_range.ok_or_else(|| {
                RecommendError::invalid("delta range is required when ranking by delta")
            })?;
            viable.retain(|c| c.delta.is_some_and(|d| range.contains(d)));
            viable.sort_by(|a, b| {
                contract_type.cmp_delta(a.delta.unwrap_or_default(), b.delta.unwrap_or_default())
            });
        }
    }

    viable.truncate(request.contract_count);
    Ok(viable)
}
