//! Trades and the versioned recommendation set produced by a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
        }
    }
}

/// Rebalancing policy selector.
///
/// The numbering (1/2/3) is kept for the CLI and ledger files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Funnel the whole delta into as few holdings as possible.
    Concentrated,
    /// Scale every holding in the class by the same ratio.
    Proportional,
    /// Capped concentrated sell pass, proportional reconciliation after.
    Hybrid,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Concentrated,
        StrategyKind::Proportional,
        StrategyKind::Hybrid,
    ];

    pub fn number(self) -> u8 {
        match self {
            StrategyKind::Concentrated => 1,
            StrategyKind::Proportional => 2,
            StrategyKind::Hybrid => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(StrategyKind::Concentrated),
            2 => Some(StrategyKind::Proportional),
            3 => Some(StrategyKind::Hybrid),
            _ => None,
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Concentrated => write!(f, "concentrated"),
            StrategyKind::Proportional => write!(f, "proportional"),
            StrategyKind::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "concentrated" => Ok(StrategyKind::Concentrated),
            "2" | "proportional" => Ok(StrategyKind::Proportional),
            "3" | "hybrid" => Ok(StrategyKind::Hybrid),
            other => Err(format!(
                "unknown strategy '{other}' (expected 1/2/3 or concentrated/proportional/hybrid)"
            )),
        }
    }
}

/// One planned trade inside a recommendation set. Immutable once created;
/// the engine plans trades, it never executes them against the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub ticker: String,
    /// Shares, fractional allowed. Always non-negative; direction lives in `action`.
    pub quantity: f64,
    pub action: Action,
    pub asset_class: String,
    /// Price used when the plan was computed.
    pub price_at_time: f64,
}

impl Trade {
    /// Signed market value: positive for buys, negative for sells.
    pub fn signed_value(&self) -> f64 {
        let value = self.quantity * self.price_at_time;
        match self.action {
            Action::Buy => value,
            Action::Sell => -value,
        }
    }
}

/// The immutable, versioned output of one rebalancing run for one
/// (owner, strategy). Versions are dense and start at 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub owner: String,
    pub strategy: StrategyKind,
    pub version: u64,
    pub recorded_at: DateTime<Utc>,
    pub trades: Vec<Trade>,
}

impl std::fmt::Display for RecommendationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "RECOMMENDATION owner={} strategy={} version={} ({} trades):",
            self.owner,
            self.strategy,
            self.version,
            self.trades.len()
        )?;
        writeln!(
            f,
            "  {:>3}  {:6} {:8} {:>12} {:>10} {:16}",
            "#", "Action", "Ticker", "Shares", "Price", "Asset class"
        )?;
        for (i, trade) in self.trades.iter().enumerate() {
            writeln!(
                f,
                "  {:>3}  {:6} {:8} {:>12.4} {:>10.2} {:16}",
                i + 1,
                format!("{}", trade.action),
                trade.ticker,
                trade.quantity,
                trade.price_at_time,
                trade.asset_class,
            )?;
        }
        Ok(())
    }
}
