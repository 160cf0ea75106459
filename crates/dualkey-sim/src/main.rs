//! Host-side simulator: runs a scripted key timeline through the queue and
//! tap/hold engines and prints the reports a host would receive.

mod script;

use anyhow::Result;
use clap::Parser;
use dualkey_core::Key;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "dualkey-sim")]
#[command(about = "Replay a key timeline through the dualkey engines")]
struct Cli {
    /// Script file (JSON)
    script: PathBuf,

    /// Scan period in milliseconds
    #[arg(long, default_value_t = 10)]
    cycle_ms: u64,

    /// Print every report, not only the ones that change
    #[arg(long)]
    all: bool,

    /// Log engine decisions (same as RUST_LOG=debug)
    #[arg(short, long)]
    verbose: bool,
}

fn format_keys(keys: &[Key]) -> String {
    let names: Vec<String> = keys.iter().map(|k| format!("{:#04x}", k.0)).collect();
    format!("[{}]", names.join(", "))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Loading script from {:?}", cli.script);
    let script = script::Script::load(&cli.script)?;
    let reports = script::run(&script, cli.cycle_ms)?;

    let mut last: Option<&Vec<Key>> = None;
    for (at, keys) in &reports {
        if cli.all || last != Some(keys) {
            println!("{:>6} ms  {}", at, format_keys(keys));
        }
        last = Some(keys);
    }

    Ok(())
}
