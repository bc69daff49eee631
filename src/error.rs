//! Error types for the rebalancing engine.

use std::path::PathBuf;

use crate::trade::StrategyKind;

/// All errors that can occur while planning or recording a rebalance.
///
/// Planning errors abort the whole multi-asset-class run; nothing is
/// committed to the ledger on failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no holdings in asset class '{asset_class}'")]
    NoHoldingsForAssetClass { asset_class: String },

    #[error(
        "asset class '{asset_class}' has zero market value; cannot resolve a {desired_pct:.1}% target"
    )]
    ZeroClassValue {
        asset_class: String,
        desired_pct: f64,
    },

    #[error(
        "stale price for {symbol} in asset class '{asset_class}' (price lookup returned {price})"
    )]
    StalePrice {
        symbol: String,
        asset_class: String,
        price: f64,
    },

    #[error(
        "holdings in asset class '{asset_class}' cover ${available:.2} of the requested ${requested:.2} sell"
    )]
    InsufficientHoldings {
        asset_class: String,
        requested: f64,
        available: f64,
    },

    #[error(
        "version conflict for owner '{owner}' strategy {strategy}: version {version} recorded twice"
    )]
    VersionConflict {
        owner: String,
        strategy: StrategyKind,
        version: u64,
    },

    #[error("invalid holding '{symbol}': {reason}")]
    InvalidHolding { symbol: String, reason: String },

    #[error("allocation error: {0}")]
    Allocation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
