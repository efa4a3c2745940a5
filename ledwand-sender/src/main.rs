//! LED wall sender entry point.
//!
//! ```text
//! ledwand-sender                    Stream with defaults
//! ledwand-sender --config <path>    Load a custom config TOML
//! ledwand-sender --gen-config       Write default config to stdout
//! ledwand-sender --dry-run          Log packets instead of sending
//! ```

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledwand_sender::config::{SenderConfig, SourceKind};
use ledwand_sender::service::SenderService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ledwand-sender", about = "Stream dithered frames to the LED wall")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "ledwand-sender.toml")]
    config: PathBuf,

    /// Display address (overrides config). Example: 172.23.42.29
    #[arg(short, long)]
    address: Option<String>,

    /// Greyscale source file (overrides config; implies `kind = "grey"`
    /// unless the config already names a file-backed kind).
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,

    /// Decode and log packets instead of sending them.
    #[arg(long)]
    dry_run: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&SenderConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config and apply overrides.
    let mut config = SenderConfig::load(&cli.config);
    if let Some(address) = cli.address {
        config.network.address = address;
    }
    if let Some(path) = cli.source {
        if config.source.kind == SourceKind::Pattern {
            config.source.kind = SourceKind::Grey;
        }
        config.source.path = Some(path);
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("ledwand-sender v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "display: {}:{} ({}x{}, {:?} endian)",
        config.network.address,
        config.network.port,
        config.display.width,
        config.display.height,
        config.network.byte_order,
    );
    info!("source: {:?}", config.source.kind);
    info!("target FPS: {}", config.timing.fps);

    let service = SenderService::new(config).with_dry_run(cli.dry_run);
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, Ordering::SeqCst);
    });

    service.run(cli.frames).await?;

    Ok(())
}
