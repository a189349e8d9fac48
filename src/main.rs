use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use serde::Serialize;
use serial_registry::config::LogFormat;
use serial_registry::driver::SystemDriver;
use serial_registry::{AcquireTimeout, Config, ConfigLoader, PortKind, PortRegistry};

/// One row of `list --json` output.
#[derive(Debug, Serialize)]
struct PortSummary {
    name: String,
    kind: PortKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
}

/// Command-line front end for the port registry.
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Discover communication ports and probe their ownership state.",
    long_about = "Builds a port registry over the system serial driver and exposes \
discovery and ownership probing from the command line. Acquisition honors the \
same contention windows and error taxonomy as the library API."
)]
struct Args {
    /// Path to a configuration file (overrides standard resolution).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover and list communication ports.
    List {
        /// Emit machine-readable JSON instead of columns.
        #[arg(long)]
        json: bool,
    },
    /// Acquire a port, report the outcome, and release it.
    Probe {
        /// Port name, e.g. /dev/ttyUSB0 or COM3.
        port: String,

        /// Owner label to claim the port under.
        #[arg(short, long, default_value = "serial-registry-cli")]
        owner: String,

        /// Contention window in milliseconds; 0 fails immediately.
        /// Defaults to the configured acquire timeout.
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let config = loader.into_config();
    init_tracing(&config);

    let driver = Arc::new(SystemDriver::from_config(&config.serial));
    let registry = PortRegistry::new(driver);

    match args.command {
        Command::List { json } => {
            let ports = registry.refresh();
            if json {
                let summaries: Vec<PortSummary> = ports
                    .iter()
                    .map(|id| PortSummary {
                        name: id.name().to_string(),
                        kind: id.kind(),
                        owner: id.current_owner(),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                if ports.is_empty() {
                    println!("no ports discovered");
                }
                for id in ports {
                    println!("{}\t{}", id.name(), id.kind());
                }
            }
        }
        Command::Probe {
            port,
            owner,
            timeout_ms,
        } => {
            let timeout = timeout_ms
                .map(AcquireTimeout::from_millis)
                .unwrap_or_else(|| config.registry.acquire_timeout());

            let id = registry.lookup_by_name(&port)?;
            let transport = id.acquire(&owner, timeout)?;
            println!("acquired {} as '{}'", transport.lock().name(), owner);
            id.release();
            println!("released {}", port);
        }
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    match config.logging.format {
        LogFormat::Full => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .compact()
            .with_env_filter(filter)
            .init(),
    }
}
