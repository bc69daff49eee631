//! # apportion
//!
//! Three-strategy portfolio rebalancing engine with a versioned
//! recommendation ledger.
//!
//! Give it a user's holdings plus a signed dollar delta per asset class
//! (positive = net buy), and it plans concrete buy/sell trades under one
//! of three policies, then records the plan as an immutable, versioned
//! recommendation set:
//!
//! - **Concentrated (1)**: funnel the whole delta into as few holdings
//!   as possible, ranked by return ratio. Buys go to the worst
//!   performer; sells drain the best performers first.
//! - **Proportional (2)**: scale every holding in the class by the same
//!   ratio, preserving relative weights.
//! - **Hybrid (3)**: a capped concentrated sell pass (at most half of
//!   each holding), then proportional reconciliation of the remainder.
//!
//! The engine never mutates holdings; it only reads them to compute
//! trade plans. A run either commits a complete recommendation set or
//! fails before any write.
//!
//! ## Quick start
//!
//! ```
//! use apportion::{engine, AllocationDelta, Holding, HoldingStore, Ledger, StrategyKind};
//!
//! let mut store = HoldingStore::new();
//! store.insert(Holding {
//!     symbol: "AAA".into(),
//!     quantity: 10.0,
//!     avg_cost: 10.0,
//!     current_price: 20.0,
//!     asset_class: "Equities".into(),
//!     sector: "Tech".into(),
//!     owner: "alice".into(),
//! }).unwrap();
//!
//! let ledger = Ledger::new();
//! let mut deltas = AllocationDelta::default();
//! deltas.insert("Equities".into(), -100.0);
//!
//! let set = engine::rebalance(&store, &ledger, "alice", StrategyKind::Concentrated, &deltas).unwrap();
//! assert_eq!(set.version, 0);
//! assert_eq!(set.trades.len(), 1);
//! assert_eq!(set.trades[0].quantity, 5.0); // $100 / $20
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod holding;
pub mod ledger;
pub mod ranking;
pub mod summary;
pub mod trade;

pub use engine::{AllocationDelta, plan, rebalance};
pub use error::{Error, Result};
pub use holding::{Holding, HoldingStore};
pub use ledger::Ledger;
pub use summary::{AllocationSummary, ClassSummary, resolve_percent_targets, summarize};
pub use trade::{Action, RecommendationSet, StrategyKind, Trade};
