//! CLI entry point for the apportion rebalancing engine.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use rustc_hash::FxHashMap;

use apportion::audit::{self, AuditLog};
use apportion::config::Config;
use apportion::engine::{self, AllocationDelta};
use apportion::error::{Error, Result};
use apportion::holding::HoldingStore;
use apportion::ledger::Ledger;
use apportion::summary;
use apportion::trade::StrategyKind;

#[derive(Parser)]
#[command(name = "apportion")]
#[command(about = "Plan portfolio rebalancing trades under three strategies")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan trades from explicit dollar deltas and record them
    Plan {
        /// Path to holdings JSON (array of holding records)
        #[arg(long)]
        holdings: PathBuf,

        /// Path to deltas JSON ({"asset_class": signed_dollars, ...})
        #[arg(long)]
        deltas: PathBuf,

        /// Strategy: 1/2/3 or concentrated/proportional/hybrid
        #[arg(long)]
        strategy: StrategyKind,

        /// Owner whose holdings are rebalanced
        #[arg(long)]
        owner: String,

        /// Show the plan without recording it
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve desired percent allocations into deltas, then plan
    Allocate {
        #[arg(long)]
        holdings: PathBuf,

        /// Path to percents JSON ({"asset_class": percent, ...}, summing to 100)
        #[arg(long)]
        percents: PathBuf,

        #[arg(long)]
        strategy: StrategyKind,

        #[arg(long)]
        owner: String,

        #[arg(long)]
        dry_run: bool,
    },

    /// Print the allocation summary per asset class
    Summary {
        #[arg(long)]
        holdings: PathBuf,

        #[arg(long)]
        owner: String,
    },

    /// Print recorded recommendation sets from the ledger
    History {
        #[arg(long)]
        owner: String,

        #[arg(long)]
        strategy: StrategyKind,
    },

    /// Print validated holdings
    Holdings {
        #[arg(long)]
        holdings: PathBuf,

        #[arg(long)]
        owner: String,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Plan {
            holdings,
            deltas,
            strategy,
            owner,
            dry_run,
        } => run_plan(&config, &holdings, &deltas, strategy, &owner, dry_run),
        Command::Allocate {
            holdings,
            percents,
            strategy,
            owner,
            dry_run,
        } => run_allocate(&config, &holdings, &percents, strategy, &owner, dry_run),
        Command::Summary { holdings, owner } => run_summary(&holdings, &owner),
        Command::History { owner, strategy } => run_history(&config, &owner, strategy),
        Command::Holdings { holdings, owner } => run_holdings(&holdings, &owner),
    };

    if let Err(e) = result {
        match &e {
            Error::NoHoldingsForAssetClass { .. }
            | Error::StalePrice { .. }
            | Error::InsufficientHoldings { .. }
            | Error::ZeroClassValue { .. }
            | Error::Allocation(_) => {
                eprintln!("\nRejected: {e}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}

fn load_deltas(path: &PathBuf) -> Result<AllocationDelta> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.clone(),
        source: e,
    })?;
    let deltas: AllocationDelta = serde_json::from_str(&contents)?;
    Ok(deltas)
}

fn run_plan(
    config: &Config,
    holdings_path: &PathBuf,
    deltas_path: &PathBuf,
    strategy: StrategyKind,
    owner: &str,
    dry_run: bool,
) -> Result<()> {
    let store = HoldingStore::load(holdings_path)?;
    let deltas = load_deltas(deltas_path)?;
    execute(config, &store, &deltas, strategy, owner, dry_run)
}

fn run_allocate(
    config: &Config,
    holdings_path: &PathBuf,
    percents_path: &PathBuf,
    strategy: StrategyKind,
    owner: &str,
    dry_run: bool,
) -> Result<()> {
    let store = HoldingStore::load(holdings_path)?;

    let contents = std::fs::read_to_string(percents_path).map_err(|e| Error::FileRead {
        path: percents_path.clone(),
        source: e,
    })?;
    let percents: FxHashMap<String, f64> = serde_json::from_str(&contents)?;

    let allocation = summary::summarize(&store.for_owner(owner));
    println!("{allocation}");

    let deltas = summary::resolve_percent_targets(&allocation, &percents)?;
    let mut ordered: Vec<(&String, &f64)> = deltas.iter().collect();
    ordered.sort_by(|a, b| a.0.cmp(b.0));
    println!("RESOLVED DELTAS:");
    for (class, delta) in ordered {
        println!("  {class:16} {delta:>+12.2}");
    }
    println!();

    execute(config, &store, &deltas, strategy, owner, dry_run)
}

/// Shared plan-and-record path behind `plan` and `allocate`.
fn execute(
    config: &Config,
    store: &HoldingStore,
    deltas: &AllocationDelta,
    strategy: StrategyKind,
    owner: &str,
    dry_run: bool,
) -> Result<()> {
    let mut audit_log = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(&mut audit_log, owner, strategy, deltas)?;

    let trades = match engine::plan(store, owner, strategy, deltas) {
        Ok(trades) => trades,
        Err(e) => {
            audit::log_run_failed(&mut audit_log, &e)?;
            return Err(e);
        }
    };
    audit::log_plan(&mut audit_log, &trades)?;

    if trades.is_empty() {
        println!("No trades needed.");
        audit_log.log_simple("no_trades_needed")?;
        return Ok(());
    }

    if dry_run {
        println!("[DRY RUN] Plan not recorded.\n");
        for trade in &trades {
            println!(
                "  {:6} {:8} {:>12.4} @ {:>10.2}  {}",
                format!("{}", trade.action),
                trade.ticker,
                trade.quantity,
                trade.price_at_time,
                trade.asset_class,
            );
        }
        return Ok(());
    }

    let ledger = Ledger::load_or_new(
        &config.ledger_path(),
        Some(config.engine.demo_owner.clone()),
    )?;
    let set = ledger.record(owner, strategy, trades)?;
    ledger.save(&config.ledger_path())?;
    audit::log_recorded(&mut audit_log, &set)?;

    print!("{set}");
    println!("\nRecorded to {}", config.ledger_path().display());
    Ok(())
}

fn run_summary(holdings_path: &PathBuf, owner: &str) -> Result<()> {
    let store = HoldingStore::load(holdings_path)?;
    let allocation = summary::summarize(&store.for_owner(owner));
    print!("{allocation}");
    Ok(())
}

fn run_history(config: &Config, owner: &str, strategy: StrategyKind) -> Result<()> {
    let ledger = Ledger::load_or_new(
        &config.ledger_path(),
        Some(config.engine.demo_owner.clone()),
    )?;
    let history = ledger.history(owner, strategy);

    if history.is_empty() {
        println!("No recommendation sets for owner '{owner}' ({strategy}).");
        return Ok(());
    }
    for set in &history {
        print!("{set}");
        println!("  recorded at {}\n", set.recorded_at);
    }
    Ok(())
}

fn run_holdings(holdings_path: &PathBuf, owner: &str) -> Result<()> {
    let store = HoldingStore::load(holdings_path)?;
    let holdings = store.for_owner(owner);

    if holdings.is_empty() {
        println!("No holdings for owner '{owner}'.");
        return Ok(());
    }

    println!("HOLDINGS for '{owner}':");
    println!(
        "  {:8} {:>10} {:>10} {:>10} {:>8} {:16}",
        "Symbol", "Shares", "AvgCost", "Price", "Ratio", "Asset class"
    );
    for h in holdings {
        println!(
            "  {:8} {:>10.4} {:>10.2} {:>10.2} {:>8.2} {:16}",
            h.symbol, h.quantity, h.avg_cost, h.current_price, h.return_ratio(), h.asset_class,
        );
    }
    Ok(())
}
