//! Per-asset-class allocation summary and percent-target resolution.
//!
//! The summary is what a caller consults before asking for a rebalance:
//! cost basis and market value per asset class, each as a share of the
//! whole portfolio. `resolve_percent_targets` turns "I want 60/40" into
//! the signed dollar deltas the engine consumes.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::engine::AllocationDelta;
use crate::error::{Error, Result};
use crate::holding::Holding;

const PERCENT_SUM_TOLERANCE: f64 = 1e-6;

/// One asset class's slice of the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub asset_class: String,
    /// Total cost basis (quantity * avg_cost).
    pub cost_value: f64,
    /// Cost basis as a percent of the portfolio's total cost basis.
    pub cost_allocation_pct: f64,
    /// Total market value (quantity * current_price).
    pub market_value: f64,
    /// Market value as a percent of the portfolio's total market value.
    pub market_allocation_pct: f64,
}

/// Allocation summary across all of an owner's asset classes.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationSummary {
    pub entries: Vec<ClassSummary>,
}

impl AllocationSummary {
    pub fn entry(&self, asset_class: &str) -> Option<&ClassSummary> {
        self.entries.iter().find(|e| e.asset_class == asset_class)
    }
}

/// Summarize holdings per asset class, sorted by class name.
pub fn summarize(holdings: &[&Holding]) -> AllocationSummary {
    let mut by_class: FxHashMap<&str, (f64, f64)> = FxHashMap::default();
    for h in holdings {
        let entry = by_class.entry(h.asset_class.as_str()).or_insert((0.0, 0.0));
        entry.0 += h.cost_value();
        entry.1 += h.market_value();
    }

    let total_cost: f64 = by_class.values().map(|(c, _)| c).sum();
    let total_market: f64 = by_class.values().map(|(_, m)| m).sum();

    let pct = |value: f64, total: f64| {
        if total > 0.0 { value * 100.0 / total } else { 0.0 }
    };

    let mut entries: Vec<ClassSummary> = by_class
        .into_iter()
        .map(|(class, (cost, market))| ClassSummary {
            asset_class: class.to_string(),
            cost_value: cost,
            cost_allocation_pct: pct(cost, total_cost),
            market_value: market,
            market_allocation_pct: pct(market, total_market),
        })
        .collect();
    entries.sort_by(|a, b| a.asset_class.cmp(&b.asset_class));

    AllocationSummary { entries }
}

/// Resolve desired percent allocations into signed dollar deltas.
///
/// Each percent must lie in [0, 100] and together they must sum to 100.
/// Every named asset class must exist in the summary and carry a
/// non-zero market allocation. The delta for a class is
/// `market_value * (desired_pct / current_pct - 1)`.
pub fn resolve_percent_targets(
    summary: &AllocationSummary,
    desired: &FxHashMap<String, f64>,
) -> Result<AllocationDelta> {
    for (class, pct) in desired {
        if !(0.0..=100.0).contains(pct) {
            return Err(Error::Allocation(format!(
                "percent for '{class}' is {pct}, expected 0..=100"
            )));
        }
        if summary.entry(class).is_none() {
            return Err(Error::Allocation(format!(
                "unknown asset class '{class}'"
            )));
        }
    }

    let sum: f64 = desired.values().sum();
    if (sum - 100.0).abs() > PERCENT_SUM_TOLERANCE {
        return Err(Error::Allocation(format!(
            "percents sum to {sum}, expected 100"
        )));
    }

    let mut deltas = AllocationDelta::default();
    for (class, pct) in desired {
        // entry() checked above
        let Some(entry) = summary.entry(class) else {
            continue;
        };
        if entry.market_allocation_pct == 0.0 {
            return Err(Error::ZeroClassValue {
                asset_class: class.clone(),
                desired_pct: *pct,
            });
        }
        let delta = entry.market_value * (pct / entry.market_allocation_pct - 1.0);
        deltas.insert(class.clone(), delta);
    }
    Ok(deltas)
}

impl std::fmt::Display for AllocationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ALLOCATION BY ASSET CLASS:")?;
        writeln!(
            f,
            "  {:16} {:>12} {:>8} {:>12} {:>8}",
            "Asset class", "Cost", "Cost%", "Market", "Market%"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "  {:16} {:>12.2} {:>7.2}% {:>12.2} {:>7.2}%",
                e.asset_class,
                e.cost_value,
                e.cost_allocation_pct,
                e.market_value,
                e.market_allocation_pct,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(symbol: &str, quantity: f64, avg_cost: f64, price: f64, class: &str) -> Holding {
        Holding {
            symbol: symbol.into(),
            quantity,
            avg_cost,
            current_price: price,
            asset_class: class.into(),
            sector: String::new(),
            owner: "alice".into(),
        }
    }

    /// Equities: cost 150, market 225. Bonds: cost 50, market 75.
    fn holdings() -> Vec<Holding> {
        vec![
            holding("AAA", 10.0, 10.0, 20.0, "Equities"),
            holding("BBB", 5.0, 10.0, 5.0, "Equities"),
            holding("TLT", 5.0, 10.0, 15.0, "Bonds"),
        ]
    }

    fn summary_of(holdings: &[Holding]) -> AllocationSummary {
        let refs: Vec<&Holding> = holdings.iter().collect();
        summarize(&refs)
    }

    #[test]
    fn summarize_groups_and_totals() {
        let all = holdings();
        let summary = summary_of(&all);

        assert_eq!(summary.entries.len(), 2);
        let bonds = summary.entry("Bonds").unwrap();
        assert_eq!(bonds.cost_value, 50.0);
        assert_eq!(bonds.market_value, 75.0);
        assert!((bonds.cost_allocation_pct - 25.0).abs() < 1e-9);
        assert!((bonds.market_allocation_pct - 25.0).abs() < 1e-9);

        let equities = summary.entry("Equities").unwrap();
        assert!((equities.market_allocation_pct - 75.0).abs() < 1e-9);
    }

    #[test]
    fn summarize_is_sorted_by_class() {
        let all = holdings();
        let summary = summary_of(&all);
        let classes: Vec<&str> = summary
            .entries
            .iter()
            .map(|e| e.asset_class.as_str())
            .collect();
        assert_eq!(classes, ["Bonds", "Equities"]);
    }

    #[test]
    fn resolve_converts_percents_to_dollar_deltas() {
        let all = holdings();
        let summary = summary_of(&all);

        let mut desired = FxHashMap::default();
        desired.insert("Equities".to_string(), 50.0);
        desired.insert("Bonds".to_string(), 50.0);

        let deltas = resolve_percent_targets(&summary, &desired).unwrap();
        // Equities: 225 * (50/75 - 1) = -75. Bonds: 75 * (50/25 - 1) = +75.
        assert!((deltas["Equities"] + 75.0).abs() < 1e-9);
        assert!((deltas["Bonds"] - 75.0).abs() < 1e-9);
        // Moving to target is portfolio-neutral.
        let net: f64 = deltas.values().sum();
        assert!(net.abs() < 1e-9);
    }

    #[test]
    fn resolve_keeping_current_allocation_is_a_noop() {
        let all = holdings();
        let summary = summary_of(&all);

        let mut desired = FxHashMap::default();
        desired.insert("Equities".to_string(), 75.0);
        desired.insert("Bonds".to_string(), 25.0);

        let deltas = resolve_percent_targets(&summary, &desired).unwrap();
        assert!(deltas["Equities"].abs() < 1e-9);
        assert!(deltas["Bonds"].abs() < 1e-9);
    }

    #[test]
    fn resolve_rejects_out_of_range_percent() {
        let all = holdings();
        let summary = summary_of(&all);
        let mut desired = FxHashMap::default();
        desired.insert("Equities".to_string(), 120.0);
        desired.insert("Bonds".to_string(), -20.0);
        assert!(resolve_percent_targets(&summary, &desired).is_err());
    }

    #[test]
    fn resolve_rejects_bad_sum() {
        let all = holdings();
        let summary = summary_of(&all);
        let mut desired = FxHashMap::default();
        desired.insert("Equities".to_string(), 60.0);
        desired.insert("Bonds".to_string(), 20.0);
        let err = resolve_percent_targets(&summary, &desired).unwrap_err();
        assert!(err.to_string().contains("sum"));
    }

    #[test]
    fn resolve_rejects_class_with_zero_market_value() {
        // Failed price lookups leave market value at zero; there is no
        // current allocation to scale from.
        let mut all = holdings();
        let mut dead = holding("XXX", 5.0, 10.0, 20.0, "Crypto");
        dead.current_price = 0.0;
        all.push(dead);
        let summary = summary_of(&all);

        let mut desired = FxHashMap::default();
        desired.insert("Equities".to_string(), 50.0);
        desired.insert("Bonds".to_string(), 25.0);
        desired.insert("Crypto".to_string(), 25.0);

        let err = resolve_percent_targets(&summary, &desired).unwrap_err();
        assert!(matches!(err, Error::ZeroClassValue { ref asset_class, .. } if asset_class == "Crypto"));
    }

    #[test]
    fn resolve_rejects_unknown_class() {
        let all = holdings();
        let summary = summary_of(&all);
        let mut desired = FxHashMap::default();
        desired.insert("Crypto".to_string(), 100.0);
        let err = resolve_percent_targets(&summary, &desired).unwrap_err();
        assert!(err.to_string().contains("unknown asset class"));
    }
}
