//! The three rebalancing strategies and run orchestration.
//!
//! A run takes one owner, one strategy, and a signed dollar delta per
//! asset class. Each class is planned independently; the run either
//! produces a complete trade list or fails before anything is recorded.

use log::{info, warn};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::holding::{Holding, HoldingStore};
use crate::ledger::Ledger;
use crate::ranking::{class_market_value, proportional_scale, rank_by_return_ratio, sell_walk};
use crate::trade::{Action, RecommendationSet, StrategyKind, Trade};

/// Requested dollar change per asset class. Positive = net buy.
pub type AllocationDelta = FxHashMap<String, f64>;

/// Plan trades for every asset class in `deltas` and record them in the
/// ledger as a new recommendation set.
pub fn rebalance(
    store: &HoldingStore,
    ledger: &Ledger,
    owner: &str,
    strategy: StrategyKind,
    deltas: &AllocationDelta,
) -> Result<RecommendationSet> {
    let trades = plan(store, owner, strategy, deltas)?;
    ledger.record(owner, strategy, trades)
}

/// Compute the full trade list without recording it.
///
/// Asset classes are processed in sorted order so plans are reproducible.
pub fn plan(
    store: &HoldingStore,
    owner: &str,
    strategy: StrategyKind,
    deltas: &AllocationDelta,
) -> Result<Vec<Trade>> {
    let mut classes: Vec<&String> = deltas.keys().collect();
    classes.sort();

    let mut trades = Vec::new();
    for class in &classes {
        let class = class.as_str();
        let delta = deltas[class];
        if delta == 0.0 {
            // Zero delta contributes zero trades.
            continue;
        }

        let holdings = store.in_class(owner, class);
        if holdings.is_empty() {
            return Err(Error::NoHoldingsForAssetClass {
                asset_class: class.to_string(),
            });
        }
        check_prices(class, &holdings)?;

        let class_trades = match strategy {
            StrategyKind::Concentrated => concentrated(class, delta, &holdings)?,
            StrategyKind::Proportional => proportional(class, delta, &holdings),
            StrategyKind::Hybrid => hybrid(class, delta, &holdings),
        };
        trades.extend(class_trades);
    }

    info!(
        "planned {} trades across {} asset classes for owner '{owner}' ({strategy})",
        trades.len(),
        classes.len(),
    );
    Ok(trades)
}

/// A price of 0.0 is the external lookup's failure sentinel. Reject it
/// before it becomes a divisor.
fn check_prices(asset_class: &str, holdings: &[&Holding]) -> Result<()> {
    for h in holdings {
        if h.current_price <= 0.0 {
            return Err(Error::StalePrice {
                symbol: h.symbol.clone(),
                asset_class: asset_class.to_string(),
                price: h.current_price,
            });
        }
    }
    Ok(())
}

fn trade(holding: &Holding, quantity: f64, action: Action) -> Trade {
    Trade {
        ticker: holding.symbol.clone(),
        quantity,
        action,
        asset_class: holding.asset_class.clone(),
        price_at_time: holding.current_price,
    }
}

/// Strategy 1: buys go wholesale to the worst performer ("buy the dip"
/// within the class); sells drain best performers first.
fn concentrated(asset_class: &str, delta: f64, holdings: &[&Holding]) -> Result<Vec<Trade>> {
    let ranked = rank_by_return_ratio(holdings);

    if delta > 0.0 {
        let laggard = *ranked.last().ok_or_else(|| Error::NoHoldingsForAssetClass {
            asset_class: asset_class.to_string(),
        })?;
        return Ok(vec![trade(
            laggard,
            delta / laggard.current_price,
            Action::Buy,
        )]);
    }

    let deficit = -delta;
    let walk = sell_walk(&ranked, deficit, 1.0);
    if walk.shortfall > 0.0 {
        return Err(Error::InsufficientHoldings {
            asset_class: asset_class.to_string(),
            requested: deficit,
            available: deficit - walk.shortfall,
        });
    }
    Ok(walk
        .steps
        .into_iter()
        .map(|s| trade(s.holding, s.quantity, Action::Sell))
        .collect())
}

/// Strategy 2: every holding moves by the same fraction of its quantity,
/// preserving relative weights within the class.
///
/// Caller guarantees non-empty holdings with positive prices, so the
/// class market value is positive and the scale ratio is defined.
fn proportional(asset_class: &str, delta: f64, holdings: &[&Holding]) -> Vec<Trade> {
    let total = class_market_value(holdings);
    let ratio = delta.abs() / total;
    let action = if delta > 0.0 { Action::Buy } else { Action::Sell };

    if action == Action::Sell && ratio > 1.0 {
        warn!(
            "asset class '{asset_class}': requested sell is {:.1}% of market value",
            ratio * 100.0
        );
    }

    // Stable symbol order keeps re-runs identical.
    let mut ordered = holdings.to_vec();
    ordered.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    proportional_scale(&ordered, ratio)
        .into_iter()
        .map(|(h, quantity)| trade(h, quantity, action))
        .collect()
}

/// Working entry in a hybrid plan, keyed by ticker. Action is fixed at
/// first insertion; phase B only adjusts quantities of phase A entries.
struct PlannedTrade {
    quantity: f64,
    action: Action,
}

/// Strategy 3: bounded profit-taking from top performers (phase A sells
/// at most half of each holding), then proportional scaling of whatever
/// delta remains (phase B). One merged trade per touched holding.
fn hybrid(asset_class: &str, delta: f64, holdings: &[&Holding]) -> Vec<Trade> {
    let ranked = rank_by_return_ratio(holdings);
    let mut working: FxHashMap<&str, PlannedTrade> = FxHashMap::default();
    let mut remaining = delta;

    if delta < 0.0 {
        let walk = sell_walk(&ranked, -delta, 0.5);
        for step in &walk.steps {
            working.insert(
                step.holding.symbol.as_str(),
                PlannedTrade {
                    quantity: step.quantity,
                    action: Action::Sell,
                },
            );
        }
        remaining = -walk.shortfall;
    }

    if remaining != 0.0 {
        let total = class_market_value(&ranked);
        let ratio = remaining.abs() / total;
        let action = if remaining > 0.0 {
            Action::Buy
        } else {
            Action::Sell
        };
        if ratio > 1.0 && action == Action::Sell {
            warn!(
                "asset class '{asset_class}': hybrid remainder is {:.1}% of market value",
                ratio * 100.0
            );
        }

        for &holding in &ranked {
            match working.get_mut(holding.symbol.as_str()) {
                Some(planned) => {
                    // Move the partially sold holding toward the proportional
                    // target instead of double-selling it.
                    planned.quantity += (holding.quantity - planned.quantity) * ratio;
                }
                None => {
                    working.insert(
                        holding.symbol.as_str(),
                        PlannedTrade {
                            quantity: holding.quantity * ratio,
                            action,
                        },
                    );
                }
            }
        }
    }

    // Emit in ranked order: one merged trade per touched holding.
    ranked
        .iter()
        .filter_map(|&h| {
            working
                .get(h.symbol.as_str())
                .map(|p| trade(h, p.quantity, p.action))
        })
        .collect()
}
