//! Ranking and the shared accumulation primitives behind the strategies.
//!
//! The concentrated and hybrid policies both walk holdings from best to
//! worst performer while draining a sell deficit; the proportional and
//! hybrid policies both scale holdings by one common ratio. Both pieces
//! live here so each strategy stays a thin composition.

use crate::holding::Holding;

/// Order holdings by descending return ratio (`current_price / avg_cost`).
///
/// Ties break by ascending symbol so repeated runs produce identical plans.
pub fn rank_by_return_ratio<'a>(holdings: &[&'a Holding]) -> Vec<&'a Holding> {
    let mut ranked = holdings.to_vec();
    ranked.sort_by(|a, b| {
        b.return_ratio()
            .partial_cmp(&a.return_ratio())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    ranked
}

/// Total market value of a set of holdings.
pub fn class_market_value(holdings: &[&Holding]) -> f64 {
    holdings.iter().map(|h| h.market_value()).sum()
}

/// Shares each holding contributes under a uniform proportional scale.
pub fn proportional_scale<'a>(holdings: &[&'a Holding], ratio: f64) -> Vec<(&'a Holding, f64)> {
    holdings
        .iter()
        .map(|h| (*h, h.quantity * ratio))
        .collect()
}

/// One step of a ranked sell-walk.
#[derive(Debug, Clone)]
pub struct SellStep<'a> {
    pub holding: &'a Holding,
    /// Shares to sell from this holding.
    pub quantity: f64,
}

/// Outcome of walking a ranking against a sell deficit.
#[derive(Debug, Clone)]
pub struct SellWalk<'a> {
    pub steps: Vec<SellStep<'a>>,
    /// Dollars still uncovered when the ranking ran out (0.0 when covered).
    pub shortfall: f64,
}

/// Walk `ranked` (best performer first), selling until `deficit` dollars
/// are raised.
///
/// Each full step commits `step_fraction` of the holding's shares; when a
/// step's value exceeds what remains, the closing step sells exactly the
/// shares needed and the walk stops. A deficit covered exactly by full
/// steps stops the walk without emitting a zero-quantity step.
pub fn sell_walk<'a>(ranked: &[&'a Holding], deficit: f64, step_fraction: f64) -> SellWalk<'a> {
    debug_assert!(deficit > 0.0, "sell_walk needs a positive deficit");
    debug_assert!(step_fraction > 0.0 && step_fraction <= 1.0);

    let mut remaining = deficit;
    let mut steps = Vec::new();

    for &holding in ranked {
        if remaining <= 0.0 {
            break;
        }
        let committed = holding.quantity * step_fraction;
        let committed_value = committed * holding.current_price;
        if committed_value > remaining {
            // Deficit dies inside this holding: partial fill, not halved.
            steps.push(SellStep {
                holding,
                quantity: remaining / holding.current_price,
            });
            remaining = 0.0;
            break;
        }
        steps.push(SellStep {
            holding,
            quantity: committed,
        });
        remaining -= committed_value;
    }

    SellWalk {
        steps,
        shortfall: remaining.max(0.0),
    }
}
