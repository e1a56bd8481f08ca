//! Writes one message to a channel of a slot file.
//!
//! ```text
//! msgslot-send /tmp/msgslot0 7 "hello"
//! msgslot-send 0 7 "hello"          # numbered slot under the configured slot_dir
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use msgslot_config::MsgslotConfig;
use msgslot_core::SlotError;
use msgslot_shm::SharedSlot;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Write one message to a message slot channel")]
struct Args {
    /// Slot file path, or a slot number resolved under the configured slot_dir
    slot: String,

    /// Channel id (non-zero)
    channel: u32,

    /// Message to store (1 to 127 bytes)
    message: String,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => MsgslotConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => MsgslotConfig::default(),
    };
    init_tracing(&config.log_level);

    let path = config.resolve_slot(&args.slot)?;
    let slot = SharedSlot::open(&path, config.channel_capacity)
        .with_context(|| format!("failed to open slot {}", path.display()))?;

    let mut handle = slot.handle();
    handle
        .bind(args.channel)
        .with_context(|| format!("failed to bind channel {}", args.channel))?;
    let written = handle
        .write(args.message.as_bytes())
        .with_context(|| format!("failed to write to channel {}", args.channel))?;
    handle.close();

    debug!(path = %path.display(), channel = args.channel, written, "message sent");
    Ok(())
}

fn report(err: &anyhow::Error) {
    match err.root_cause().downcast_ref::<SlotError>() {
        Some(slot_err) => eprintln!(
            "error: {err:#} ({})",
            std::io::Error::from_raw_os_error(slot_err.errno())
        ),
        None => eprintln!("error: {err:#}"),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
