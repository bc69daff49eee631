//! Versioned recommendation ledger.
//!
//! Versions for a given (owner, strategy) form a dense sequence starting
//! at 0. The version read and the append happen under one lock, so two
//! concurrent runs can never claim the same version. Recorded sets are
//! append-only, with one exception: the configured demo owner has its
//! history cleared per strategy before each new recording.
//!
//! Persistence is JSON Lines, one recommendation set per line.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use log::info;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::trade::{RecommendationSet, StrategyKind, Trade};

type Key = (String, StrategyKind);

/// Append-only store of recommendation sets, keyed by (owner, strategy).
#[derive(Debug, Default)]
pub struct Ledger {
    demo_owner: Option<String>,
    inner: Mutex<FxHashMap<Key, Vec<RecommendationSet>>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger whose `demo_owner` keeps only its latest recommendation
    /// set per strategy (a non-persistent sandbox identity).
    pub fn with_demo_owner(owner: impl Into<String>) -> Self {
        Self {
            demo_owner: Some(owner.into()),
            inner: Mutex::default(),
        }
    }

    /// Record `trades` as the next version for (owner, strategy) and
    /// return the full recommendation set. All-or-nothing: the trades
    /// land under a single version in one critical section.
    pub fn record(
        &self,
        owner: &str,
        strategy: StrategyKind,
        trades: Vec<Trade>,
    ) -> Result<RecommendationSet> {
        let mut inner = self.lock();
        let sets = inner
            .entry((owner.to_string(), strategy))
            .or_default();

        if self.demo_owner.as_deref() == Some(owner) && !sets.is_empty() {
            info!(
                "clearing {} prior recommendation sets for demo owner '{owner}' ({strategy})",
                sets.len()
            );
            sets.clear();
        }

        let version = match sets.last() {
            Some(prev) => prev.version + 1,
            None => 0,
        };
        let set = RecommendationSet {
            owner: owner.to_string(),
            strategy,
            version,
            recorded_at: Utc::now(),
            trades,
        };
        sets.push(set.clone());
        info!(
            "recorded version {version} for owner '{owner}' ({strategy}), {} trades",
            set.trades.len()
        );
        Ok(set)
    }

    /// The version the next recording would receive.
    pub fn next_version(&self, owner: &str, strategy: StrategyKind) -> u64 {
        let inner = self.lock();
        inner
            .get(&(owner.to_string(), strategy))
            .and_then(|sets| sets.last())
            .map(|set| set.version + 1)
            .unwrap_or(0)
    }

    /// All recorded sets for (owner, strategy), oldest first.
    pub fn history(&self, owner: &str, strategy: StrategyKind) -> Vec<RecommendationSet> {
        let inner = self.lock();
        inner
            .get(&(owner.to_string(), strategy))
            .cloned()
            .unwrap_or_default()
    }

    /// Save all sets as JSON Lines, sorted by (owner, strategy, version)
    /// so files are stable across runs.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let inner = self.lock();
        let mut all: Vec<&RecommendationSet> = inner.values().flatten().collect();
        all.sort_by(|a, b| {
            (a.owner.as_str(), a.strategy.number(), a.version)
                .cmp(&(b.owner.as_str(), b.strategy.number(), b.version))
        });

        let file = std::fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        for set in all {
            let json = serde_json::to_string(set)?;
            writeln!(writer, "{json}")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load a ledger from a JSON Lines file, validating that each
    /// (owner, strategy) carries a dense version sequence starting at 0.
    pub fn load(path: &Path, demo_owner: Option<String>) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| Error::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let reader = BufReader::new(file);

        let mut map: FxHashMap<Key, Vec<RecommendationSet>> = FxHashMap::default();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let set: RecommendationSet = serde_json::from_str(line)?;
            map.entry((set.owner.clone(), set.strategy))
                .or_default()
                .push(set);
        }

        for ((owner, strategy), sets) in &mut map {
            sets.sort_by_key(|s| s.version);
            for (expected, set) in sets.iter().enumerate() {
                if set.version != expected as u64 {
                    return Err(Error::VersionConflict {
                        owner: owner.clone(),
                        strategy: *strategy,
                        version: set.version,
                    });
                }
            }
        }

        Ok(Self {
            demo_owner,
            inner: Mutex::new(map),
        })
    }

    /// Load from `path` if it exists, otherwise start empty.
    pub fn load_or_new(path: &Path, demo_owner: Option<String>) -> Result<Self> {
        if path.exists() {
            Self::load(path, demo_owner)
        } else {
            Ok(Self {
                demo_owner,
                inner: Mutex::default(),
            })
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<Key, Vec<RecommendationSet>>> {
        // A poisoned lock means a panicking writer; the map itself is
        // still structurally sound, so recover the guard.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trade::Action;

    fn trades() -> Vec<Trade> {
        vec![Trade {
            ticker: "AAA".into(),
            quantity: 5.0,
            action: Action::Sell,
            asset_class: "Equities".into(),
            price_at_time: 20.0,
        }]
    }

    #[test]
    fn versions_start_at_zero_and_are_dense() {
        // Two identical runs yield versions 0 then 1.
        let ledger = Ledger::new();
        let v0 = ledger
            .record("alice", StrategyKind::Concentrated, trades())
            .unwrap();
        let v1 = ledger
            .record("alice", StrategyKind::Concentrated, trades())
            .unwrap();

        assert_eq!(v0.version, 0);
        assert_eq!(v1.version, 1);
        assert_eq!(ledger.next_version("alice", StrategyKind::Concentrated), 2);

        let history = ledger.history("alice", StrategyKind::Concentrated);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version, 0);
        assert_eq!(history[1].version, 1);
    }

    #[test]
    fn versions_are_scoped_per_owner_and_strategy() {
        let ledger = Ledger::new();
        ledger
            .record("alice", StrategyKind::Concentrated, trades())
            .unwrap();
        let bob = ledger
            .record("bob", StrategyKind::Concentrated, trades())
            .unwrap();
        let alice_prop = ledger
            .record("alice", StrategyKind::Proportional, trades())
            .unwrap();

        assert_eq!(bob.version, 0);
        assert_eq!(alice_prop.version, 0);
    }

    #[test]
    fn demo_owner_history_is_cleared_per_run() {
        let ledger = Ledger::with_demo_owner("demo");
        ledger
            .record("demo", StrategyKind::Hybrid, trades())
            .unwrap();
        let second = ledger
            .record("demo", StrategyKind::Hybrid, trades())
            .unwrap();

        // Cleared before recording: history holds only the newest set,
        // and its version restarted at 0.
        assert_eq!(second.version, 0);
        assert_eq!(ledger.history("demo", StrategyKind::Hybrid).len(), 1);

        // Other owners keep the full audit trail.
        ledger
            .record("alice", StrategyKind::Hybrid, trades())
            .unwrap();
        ledger
            .record("alice", StrategyKind::Hybrid, trades())
            .unwrap();
        assert_eq!(ledger.history("alice", StrategyKind::Hybrid).len(), 2);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");

        let ledger = Ledger::new();
        ledger
            .record("alice", StrategyKind::Concentrated, trades())
            .unwrap();
        ledger
            .record("alice", StrategyKind::Concentrated, trades())
            .unwrap();
        ledger
            .record("bob", StrategyKind::Proportional, trades())
            .unwrap();
        ledger.save(&path).unwrap();

        let loaded = Ledger::load(&path, None).unwrap();
        assert_eq!(
            loaded.history("alice", StrategyKind::Concentrated).len(),
            2
        );
        assert_eq!(loaded.next_version("alice", StrategyKind::Concentrated), 2);
        assert_eq!(loaded.next_version("bob", StrategyKind::Proportional), 1);

        let set = &loaded.history("bob", StrategyKind::Proportional)[0];
        assert_eq!(set.trades.len(), 1);
        assert_eq!(set.trades[0].ticker, "AAA");
    }

    #[test]
    fn load_rejects_duplicate_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");

        let ledger = Ledger::new();
        let set = ledger
            .record("alice", StrategyKind::Concentrated, trades())
            .unwrap();

        // Write the same version twice.
        let json = serde_json::to_string(&set).unwrap();
        std::fs::write(&path, format!("{json}\n{json}\n")).unwrap();

        // The second copy of version 0 lands where version 1 belongs.
        let err = Ledger::load(&path, None).unwrap_err();
        assert!(matches!(err, Error::VersionConflict { version: 0, .. }));
    }

    #[test]
    fn load_rejects_gapped_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");

        let ledger = Ledger::new();
        let mut set = ledger
            .record("alice", StrategyKind::Concentrated, trades())
            .unwrap();
        set.version = 3; // gap: no versions 0..=2 on file

        let json = serde_json::to_string(&set).unwrap();
        std::fs::write(&path, format!("{json}\n")).unwrap();

        let err = Ledger::load(&path, None).unwrap_err();
        assert!(matches!(err, Error::VersionConflict { version: 3, .. }));
    }

    #[test]
    fn load_or_new_starts_empty_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.jsonl");
        let ledger = Ledger::load_or_new(&path, None).unwrap();
        assert_eq!(ledger.next_version("alice", StrategyKind::Hybrid), 0);
    }

    #[test]
    fn concurrent_records_never_share_a_version() {
        use std::sync::Arc;

        let ledger = Arc::new(Ledger::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = Arc::clone(&ledger);
            handles.push(std::thread::spawn(move || {
                ledger
                    .record("alice", StrategyKind::Hybrid, trades())
                    .unwrap()
                    .version
            }));
        }

        let mut versions: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        versions.sort_unstable();
        assert_eq!(versions, (0..8).collect::<Vec<u64>>());
    }
}
