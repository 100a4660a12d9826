use anyhow::Result;
use clap::Parser;
use powledger_core::{Ledger, LedgerConfig};
use std::{io, path::PathBuf};
use tracing::info;

mod logging;
mod render;
mod shell;

use logging::{init_logging, LogFormat};
use shell::Session;

#[derive(Parser, Debug)]
#[command(name = "powledger")]
#[command(about = "Interactive shell over an in-memory proof-of-work ledger", version)]
struct Args {
    /// TOML file with ledger settings; flags below override it
    #[arg(long, env = "POWLEDGER_CONFIG")]
    config: Option<PathBuf>,

    /// Leading hex zeros required of each mined block hash
    #[arg(long, env = "POWLEDGER_DIFFICULTY")]
    difficulty: Option<usize>,

    /// Creator id stamped on blocks added from this shell
    #[arg(long, env = "POWLEDGER_CREATOR_ID")]
    creator_id: Option<u64>,

    /// Give up mining a block after this many hashes
    #[arg(long)]
    max_attempts: Option<u64>,

    /// Mine on all cores
    #[arg(long)]
    parallel: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,

    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn ledger_config(&self) -> Result<LedgerConfig> {
        let mut config = match &self.config {
            Some(path) => LedgerConfig::load(path)?,
            None => LedgerConfig::default(),
        };
        if let Some(d) = self.difficulty {
            config.difficulty = d;
        }
        if let Some(id) = self.creator_id {
            config.creator_id = id;
        }
        if self.max_attempts.is_some() {
            config.max_attempts = self.max_attempts;
        }
        config.parallel |= self.parallel;
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_format, &args.log_level);

    let config = args.ledger_config()?;
    let ledger = Ledger::with_config(&config)?;
    info!(
        difficulty = config.difficulty,
        creator_id = config.creator_id,
        parallel = config.parallel,
        "ledger initialised"
    );

    let mut session = Session::new(ledger, config.creator_id);
    session.run(io::stdin().lock(), io::stdout().lock())
}
