//! Holdings: the engine's read-only view of a user's positions.
//!
//! Holdings are created by data entry or import and priced by an external
//! lookup (which reports `0.0` on failure). The engine only reads them to
//! compute trade plans; it never mutates a position.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One position owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    /// Shares held, fractional allowed. Must be positive.
    pub quantity: f64,
    /// Average acquisition cost per share. Must be positive.
    pub avg_cost: f64,
    /// Latest looked-up price. `0.0` means the lookup failed; the engine
    /// rejects such holdings when their asset class is touched.
    #[serde(default)]
    pub current_price: f64,
    pub asset_class: String,
    #[serde(default)]
    pub sector: String,
    pub owner: String,
}

impl Holding {
    /// Market value at the latest looked-up price.
    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    /// Cost basis value.
    pub fn cost_value(&self) -> f64 {
        self.quantity * self.avg_cost
    }

    /// Ranking key: `current_price / avg_cost`. Not a realized-gain figure.
    pub fn return_ratio(&self) -> f64 {
        self.current_price / self.avg_cost
    }

    fn validate(&self) -> Result<()> {
        let reason = if self.symbol.is_empty() {
            Some("empty symbol")
        } else if self.asset_class.is_empty() {
            Some("empty asset class")
        } else if self.owner.is_empty() {
            Some("empty owner")
        } else if !(self.quantity > 0.0) {
            Some("quantity must be positive")
        } else if !(self.avg_cost > 0.0) {
            Some("avg_cost must be positive")
        } else if self.current_price < 0.0 {
            Some("current_price must not be negative")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::InvalidHolding {
                symbol: self.symbol.clone(),
                reason: reason.into(),
            }),
            None => Ok(()),
        }
    }
}

/// In-memory holding store, queried by owner and asset class.
///
/// Multiple runs may read the store concurrently; nothing in the engine
/// writes to it.
#[derive(Debug, Default)]
pub struct HoldingStore {
    holdings: Vec<Holding>,
}

impl HoldingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a holding after validating it.
    pub fn insert(&mut self, holding: Holding) -> Result<()> {
        holding.validate()?;
        self.holdings.push(holding);
        Ok(())
    }

    /// Load and validate holdings from a JSON array file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string (useful for testing).
    pub fn from_json(json: &str) -> Result<Self> {
        let holdings: Vec<Holding> = serde_json::from_str(json)?;
        let mut store = Self::new();
        for holding in holdings {
            store.insert(holding)?;
        }
        Ok(store)
    }

    /// All holdings belonging to `owner`.
    pub fn for_owner(&self, owner: &str) -> Vec<&Holding> {
        self.holdings.iter().filter(|h| h.owner == owner).collect()
    }

    /// Holdings for `owner` inside one asset class.
    pub fn in_class(&self, owner: &str, asset_class: &str) -> Vec<&Holding> {
        self.holdings
            .iter()
            .filter(|h| h.owner == owner && h.asset_class == asset_class)
            .collect()
    }

    /// Distinct asset classes held by `owner`, sorted.
    pub fn asset_classes(&self, owner: &str) -> Vec<&str> {
        let mut classes: Vec<&str> = self
            .holdings
            .iter()
            .filter(|h| h.owner == owner)
            .map(|h| h.asset_class.as_str())
            .collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.iter()
    }
}
