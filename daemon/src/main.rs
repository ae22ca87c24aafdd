//! MultiRewards command-line front end.

mod script;

use anyhow::{bail, Context, Result};
use clap::Parser;
use multirewards_engine::{LedgerConfig, MultiRewards, RewardStream, RewardsError, StreamPhase};
use multirewards_store::StoreError;
use multirewards_store_lmdb::environment::DEFAULT_MAP_SIZE;
use multirewards_store_lmdb::LmdbEnvironment;
use multirewards_types::Timestamp;
use multirewards_utils::{format_amount, format_duration, format_remaining, init_logging, LogFormat};
use script::{Record, Script, Simulation};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "multirewards", about = "Multi-token staking reward ledger")]
struct Cli {
    /// Path to a TOML ledger configuration. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "MULTIREWARDS_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB store.
    #[arg(long, env = "MULTIREWARDS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "MULTIREWARDS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "MULTIREWARDS_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run a scenario script against an in-memory token bank and print
    /// events as JSON lines.
    Simulate {
        /// Scenario script (TOML).
        #[arg(long)]
        script: PathBuf,

        /// Save the final ledger to the data directory.
        #[arg(long)]
        persist: bool,
    },
    /// Print a ledger saved with `simulate --persist`.
    Inspect {
        /// Unix time to evaluate accruals at. Defaults to the most recent
        /// stream update.
        #[arg(long)]
        at: Option<u64>,

        /// Token decimals used when rendering amounts.
        #[arg(long, default_value_t = 18)]
        decimals: u32,
    },
    /// Print the effective configuration as TOML.
    #[command(name = "config")]
    ShowConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => Some(
            LedgerConfig::from_toml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
        ),
        None => None,
    };

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.log_level.clone()))
        .unwrap_or_else(|| "info".into());
    let log_format = cli
        .log_format
        .or_else(|| file_config.as_ref().map(|c| c.log_format))
        .unwrap_or_default();
    init_logging(log_format, &log_level);

    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.data_dir.clone()))
        .unwrap_or_else(|| PathBuf::from("./multirewards_data"));

    match cli.command {
        Command::Simulate { script, persist } => {
            let Some(config) = file_config else {
                bail!("simulate needs a ledger config (--config or MULTIREWARDS_CONFIG)");
            };
            simulate(&config, &script, persist.then_some(data_dir.as_path()))
        }
        Command::Inspect { at, decimals } => inspect(&data_dir, at, decimals),
        Command::ShowConfig => {
            let Some(mut config) = file_config else {
                bail!("no config given (--config or MULTIREWARDS_CONFIG)");
            };
            config.data_dir = data_dir;
            config.log_level = log_level;
            config.log_format = log_format;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn simulate(config: &LedgerConfig, script_path: &Path, persist_to: Option<&Path>) -> Result<()> {
    let script = Script::from_file(script_path)?;
    let ledger = MultiRewards::from_config(config).context("building ledger from config")?;
    tracing::info!(
        streams = ledger.reward_token_length(),
        steps = script.steps.len(),
        "running scenario {}",
        script_path.display()
    );

    let mut sim = Simulation::new(ledger, &script);
    let records = sim.run(&script.steps);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for record in &records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    let summary = sim.summary()?;
    writeln!(out, "{}", serde_json::to_string(&Record::Summary(summary))?)?;

    if let Some(dir) = persist_to {
        if dir.join("data.mdb").exists() {
            bail!("{} already holds a ledger", dir.display());
        }
        let env = LmdbEnvironment::open(dir, DEFAULT_MAP_SIZE)
            .with_context(|| format!("opening store at {}", dir.display()))?;
        sim.ledger().save_to_store(&env.ledger_store())?;
        tracing::info!("ledger saved to {}", dir.display());
    }
    Ok(())
}

/// Funding window of `stream` as seen at `now`.
fn stream_window(stream: &RewardStream, now: Timestamp) -> String {
    match stream.phase(now) {
        StreamPhase::Registered => "never funded".to_string(),
        StreamPhase::Active | StreamPhase::Expired => {
            format_remaining(stream.period_finish.as_secs(), now.as_secs())
        }
    }
}

fn inspect(data_dir: &Path, at: Option<u64>, decimals: u32) -> Result<()> {
    if !data_dir.join("data.mdb").exists() {
        bail!("no ledger found in {}", data_dir.display());
    }
    let env = LmdbEnvironment::open(data_dir, DEFAULT_MAP_SIZE)
        .with_context(|| format!("opening store at {}", data_dir.display()))?;
    let ledger = match MultiRewards::load_from_store(&env.ledger_store()) {
        Ok(ledger) => ledger,
        Err(RewardsError::Store(StoreError::NotFound(_))) => {
            bail!("no ledger found in {}", data_dir.display())
        }
        Err(e) => return Err(e).context("loading ledger"),
    };

    let state = ledger.state();
    let now = Timestamp::new(at.unwrap_or_else(|| {
        state
            .registry
            .iter()
            .map(|s| s.last_update_time.as_secs())
            .max()
            .unwrap_or(0)
    }));

    println!("owner          {}", state.owner);
    println!("staking token  {}", state.staking_token);
    println!("custody        {}", state.custody);
    println!("paused         {}", state.paused);
    println!("total staked   {}", format_amount(ledger.total_supply(), decimals));
    println!("evaluated at   {}", now.as_secs());

    println!();
    println!("streams ({})", ledger.reward_token_length());
    for (idx, stream) in state.registry.iter().enumerate() {
        println!(
            "  [{idx}] {}  distributor {}  duration {}  rate {}/s  {}",
            stream.token,
            stream.distributor,
            format_duration(stream.duration),
            format_amount(stream.reward_rate, decimals),
            stream_window(stream, now),
        );
    }

    let mut accounts: Vec<_> = state.principal.accounts().map(|(a, b)| (*a, *b)).collect();
    accounts.sort();
    println!();
    println!("accounts ({})", accounts.len());
    for (account, staked) in accounts {
        println!("  {account}  staked {}", format_amount(staked, decimals));
        for stream in state.registry.iter() {
            let earned = ledger.earned(&account, &stream.token, now)?;
            if earned > 0 {
                println!("      earned {} of {}", format_amount(earned, decimals), stream.token);
            }
        }
    }
    Ok(())
}
