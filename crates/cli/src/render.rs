use optfinder_core::domain::option::{ContractType, EvaluatedContract};
use optfinder_core::domain::recommendation::{RankCriterion, Recommendation};
use std::fmt::Write;

pub const NO_OPTION_FOUND: &str = "No option found!";
const SEPARATOR_WIDTH: usize = 100;

/// Text blocks for the selected contracts, one per contract.
pub fn render(rec: &Recommendation) -> String {
    if rec.contracts.is_empty() {
        return format!("{NO_OPTION_FOUND}\n");
    }

    let mut out = String::new();
    for contract in &rec.contracts {
        render_contract(&mut out, contract, rec.contract_type, rec.rank);
    }
    out
}

fn render_contract(
    out: &mut String,
    c: &EvaluatedContract,
    contract_type: ContractType,
    rank: RankCriterion,
) {
    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "Long {contract_type}: Buy {} x {} ${:.2} {contract_type} @ ${:.2}",
        c.number,
        c.quote.expiration_date.format("%d %b"),
        c.quote.strike,
        c.quote.ask_price,
    );
    if rank == RankCriterion::ByDelta {
        if let Some(delta) = c.delta {
            let _ = writeln!(out, "Delta: {delta:.2}");
        }
    }
    let _ = writeln!(out, "Entry cost: ${:.2}", c.entry_cost);
    let _ = writeln!(out, "Maximum risk: ${:.2}", c.entry_cost);
    let _ = writeln!(
        out,
        "Est. return at target price: ${:.1} ({:.2}%)",
        c.estimated_return_amount(),
        c.estimated_return_pct
    );
    let _ = writeln!(out, "{}", "=".repeat(SEPARATOR_WIDTH));
}
