use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use token_ledger::{
    calls::{parse_script, replay, CallOutcome},
    config::DeployConfig,
    deploy,
    units::parse_units,
    Address, Amount,
};

#[derive(Parser)]
#[command(name = "token-ledger")]
#[command(about = "Deploy and drive a fixed-supply token ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Construct a ledger and print its instance address and metadata
    Deploy(DeployArgs),

    /// Generate an Ed25519 keypair and the account address derived from it
    Keygen {
        /// Directory receiving sk.hex, pk.hex and address.txt
        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Deploy a ledger, then replay a JSON-lines call script against it
    Run {
        #[command(flatten)]
        deploy: DeployArgs,

        /// Script with one {"caller": ..., "call": {...}} object per line
        #[arg(long)]
        script: PathBuf,
    },
}

#[derive(Args)]
struct DeployArgs {
    /// JSON deploy config; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    symbol: Option<String>,

    /// Initial supply in whole tokens, `_` separators allowed
    #[arg(long, value_parser = parse_supply)]
    supply: Option<u128>,

    #[arg(long)]
    creator: Option<Address>,

    #[arg(long)]
    nonce: Option<u64>,
}

impl DeployArgs {
    fn resolve(&self) -> Result<DeployConfig> {
        let mut cfg = match &self.config {
            Some(path) => DeployConfig::load(path)?,
            None => DeployConfig::default(),
        };
        if let Some(name) = &self.name {
            cfg.name = name.clone();
        }
        if let Some(symbol) = &self.symbol {
            cfg.symbol = symbol.clone();
        }
        if let Some(supply) = self.supply {
            cfg.initial_supply = supply;
        }
        if let Some(creator) = self.creator {
            cfg.creator = creator;
        }
        if let Some(nonce) = self.nonce {
            cfg.nonce = nonce;
        }
        Ok(cfg)
    }
}

fn parse_supply(text: &str) -> Result<u128, String> {
    let amount = parse_units(text, 0).map_err(|e| e.to_string())?;
    if amount > Amount::from(u128::MAX) {
        return Err(format!("supply {amount} does not fit in 128 bits"));
    }
    Ok(amount.as_u128())
}

fn write_all(p: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(p, bytes).with_context(|| format!("write {}", p.display()))
}

fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn deploy_cmd(args: &DeployArgs) -> Result<()> {
    let cfg = args.resolve()?;
    let deployment = deploy(&cfg).context("deploy")?;
    let summary = deployment.summary();
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &summary)?;
    writeln!(out)?;
    Ok(())
}

fn keygen_cmd(out_dir: &Path) -> Result<()> {
    let sk = SigningKey::generate(&mut OsRng);
    let pk = sk.verifying_key();
    let address = Address::from_verifying_key(&pk);

    write_all(&out_dir.join("sk.hex"), hex::encode(sk.to_bytes()).as_bytes())?;
    write_all(&out_dir.join("pk.hex"), hex::encode(pk.as_bytes()).as_bytes())?;
    write_all(&out_dir.join("address.txt"), address.to_string().as_bytes())?;
    info!(dir = %out_dir.display(), "keypair written");
    println!("{address}");
    Ok(())
}

fn run_cmd(args: &DeployArgs, script: &Path) -> Result<()> {
    let cfg = args.resolve()?;
    let text =
        fs::read_to_string(script).with_context(|| format!("read script {}", script.display()))?;
    let entries = parse_script(&text)?;
    let mut deployment = deploy(&cfg).context("deploy")?;

    let records = replay(&mut deployment.ledger, entries);
    let rejected = records
        .iter()
        .filter(|r| matches!(r.outcome, CallOutcome::Err { .. }))
        .count();

    let mut out = io::stdout().lock();
    for record in &records {
        print_json(&mut out, record)?;
    }
    print_json(&mut out, &deployment.ledger.snapshot())?;
    info!(
        calls = records.len(),
        rejected,
        address = %deployment.address,
        "script replayed"
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Commands::Deploy(args) => deploy_cmd(args),
        Commands::Keygen { out_dir } => keygen_cmd(out_dir),
        Commands::Run { deploy: args, script } => run_cmd(args, script),
    }
}
