//! Prints the current message of a channel of a slot file.
//!
//! Only the message bytes go to stdout; diagnostics and logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use msgslot_config::MsgslotConfig;
use msgslot_core::SlotError;
use msgslot_shm::SharedSlot;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Read buffer size; one byte more than the largest message.
const BUF_LEN: usize = 128;

#[derive(Parser, Debug)]
#[command(author, version, about = "Print the current message of a message slot channel")]
struct Args {
    /// Slot file path, or a slot number resolved under the configured slot_dir
    slot: String,

    /// Channel id (non-zero)
    channel: u32,

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
    let mut buf = [0u8; BUF_LEN];
    let len = handle
        .read_into(&mut buf)
        .with_context(|| format!("failed to read channel {}", args.channel))?;
    handle.close();

    debug!(path = %path.display(), channel = args.channel, len, "message read");

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&buf[..len])
        .and_then(|()| stdout.flush())
        .context("failed to write message to stdout")?;
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
