//! CLI entry point

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use governance_power::aliases::WalletAliasMap;
use governance_power::authority::{TokenOwnerRecord, parse_token_owner_record};
use governance_power::config::{Config, FileConfig, load_citizens};
use governance_power::constants::SNAPSHOT_FILENAME;
use governance_power::error::PowerError;
use governance_power::power::PowerEngine;
use governance_power::registrar::{RegistrarParams, load_registrar};
use governance_power::rpc::{ChainReader, SnapshotAccount};
use governance_power::reports;
use governance_power::snapshot::{Snapshot, verify_against};

#[derive(Parser)]
#[command(name = "governance-power", about = "Compute DAO voting power from voter-stake-registry accounts")]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the RPC endpoint (also honours HELIUS_RPC_URL)
    #[arg(long)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Snapshot chain state and score voting power
    Scan {
        /// Score every citizen and write the JSON snapshot
        #[arg(long, conflicts_with = "wallet")]
        all: bool,

        /// Score a single wallet and print its PowerResult
        #[arg(long)]
        wallet: Option<String>,

        /// Pin the run timestamp (unix seconds) for reproducible output
        #[arg(long)]
        now: Option<i64>,
    },
    /// Recompute and compare against an expected snapshot fixture
    Verify {
        /// Snapshot JSON to verify against
        #[arg(long)]
        expected: PathBuf,

        /// Pin the run timestamp (unix seconds); defaults to the fixture's
        /// now_used so multipliers stay comparable
        #[arg(long)]
        now: Option<i64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        // Typed errors carry their taxonomy label and exit code; anything
        // else reached us through a config-layer context chain.
        match e.downcast_ref::<PowerError>() {
            Some(power_error) => {
                let code = power_error.exit_code();
                eprintln!("{:#}", e);
                std::process::exit(code);
            }
            None => {
                eprintln!("ConfigError: {:#}", e);
                std::process::exit(2);
            }
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file_config = FileConfig::load(&cli.config)?;
    let config = Config::from_file(&file_config, cli.rpc_url.clone())?;

    match cli.command {
        Command::Scan { all, wallet, now } => scan(&config, all, wallet, now).await,
        Command::Verify { expected, now } => verify(&config, &expected, now).await,
    }
}

/// Fetched, decoded chain state for one run
struct RunState {
    registrar: RegistrarParams,
    snapshot: Vec<SnapshotAccount>,
    records: Vec<TokenOwnerRecord>,
    aliases: WalletAliasMap,
}

/// Load everything a scoring pass needs: registrar, the full VSR snapshot,
/// the mint's TokenOwnerRecords and the alias table.
async fn load_run_state(config: &Config) -> Result<RunState> {
    let reader = ChainReader::new(&config.rpc_url);

    let registrar = load_registrar(&reader, &config.vsr_program, &config.realm, &config.governing_token_mint).await?;
    println!(
        "Registrar: baseline {:.2}x, max extra {:.2}x, saturation {}s, digit shift {}",
        registrar.baseline(),
        registrar.max_extra(),
        registrar.lockup_saturation_secs,
        registrar.digit_shift
    );

    let snapshot = reader.snapshot_vsr(&config.vsr_program).await?;
    println!("VSR snapshot: {} voter accounts", snapshot.len());

    let record_accounts = reader
        .token_owner_records(&config.governance_program, &config.governing_token_mint)
        .await?;
    let mut records = Vec::new();
    for account in &record_accounts {
        match parse_token_owner_record(&account.data) {
            Ok(record) => records.push(record),
            Err(e) => eprintln!("Warning: skipping token owner record {}: {}", account.pubkey, e),
        }
    }
    println!("Token owner records: {}", records.len());

    let aliases = WalletAliasMap::load(&config.aliases_path)?;
    if !aliases.is_empty() {
        println!("Alias table: {} wallets", aliases.len());
    }

    Ok(RunState {
        registrar,
        snapshot,
        records,
        aliases,
    })
}

impl RunState {
    fn engine<'a>(&'a self, config: &'a Config, now: i64) -> PowerEngine<'a> {
        PowerEngine {
            snapshot: &self.snapshot,
            records: &self.records,
            registrar: &self.registrar,
            aliases: &self.aliases,
            shadow_amounts: &config.shadow_amounts,
            now,
        }
    }
}

async fn scan(config: &Config, all: bool, wallet: Option<String>, now: Option<i64>) -> Result<()> {
    let state = load_run_state(config).await?;
    let now = now.unwrap_or_else(|| chrono::Utc::now().timestamp());
    let engine = state.engine(config, now);

    match (all, wallet) {
        (false, Some(wallet)) => {
            let wallet = Pubkey::from_str(&wallet)
                .with_context(|| format!("Invalid wallet address: {}", wallet))?;
            let result = engine.score_wallet(&wallet)?;
            reports::print_wallet_result(&result);
            Ok(())
        }
        (true, None) => {
            let citizens = load_citizens(&config.citizens_path)?;
            let results = engine.score_all(&citizens)?;

            let snapshot_path = config.output_dir.join(SNAPSHOT_FILENAME);
            let document = Snapshot::build(results, now);
            document.write(&snapshot_path)?;
            reports::generate_audit_ledger(&config.output_dir, &document.citizens)?;
            reports::print_summary(&document.citizens, &snapshot_path);
            Ok(())
        }
        _ => bail!("pass exactly one of --all or --wallet <b58>"),
    }
}

async fn verify(config: &Config, expected_path: &Path, now: Option<i64>) -> Result<()> {
    let expected = Snapshot::load(expected_path)?;

    let state = load_run_state(config).await?;
    let engine = state.engine(config, now.unwrap_or(expected.now_used));

    let wallets: Vec<Pubkey> = expected
        .citizens
        .iter()
        .map(|citizen| {
            Pubkey::from_str(&citizen.wallet)
                .with_context(|| format!("Invalid wallet in fixture: {}", citizen.wallet))
        })
        .collect::<Result<_>>()?;

    let computed = engine.score_all(&wallets)?;
    verify_against(&expected, &computed)?;

    println!("Verification passed: {} citizens within tolerance", wallets.len());
    Ok(())
}
