use anyhow::{anyhow, Context, Result};
use bus_client::SystemBus;
use tracing::{error, info, warn};

pub mod config;
pub mod startup;

use config::Config;

/// Initialize tracing; `A2DP_SINK_LOG_MODE` and `A2DP_SINK_LOG_LEVEL` take
/// precedence over the configured level
fn init_tracing(log_level: &str) -> Result<()> {
    sink_state::logging::init_logging_from_env(log_level)?;
    Ok(())
}

/// Connect, prepare the adapter and mirror BlueZ until the bus goes away
fn run_sink(config: Config) -> Result<()> {
    let bus = SystemBus::connect().context("Failed to connect to the system bus")?;
    let (mut directory, stream) = startup::start(bus, &config)?;

    info!("Waiting for BlueZ notifications");
    directory.run(stream);

    Err(anyhow!("Lost the BlueZ notification stream"))
}

fn main() -> Result<()> {
    // Parse configuration from command line and environment
    let config = Config::from_env().context("Failed to parse configuration")?;

    init_tracing(&config.log_level).context("Failed to initialize logging")?;

    config.print_summary();
    for name in config.codecs.ignored() {
        warn!("Ignoring unknown codec '{}'", name);
    }

    info!("Starting A2DP null sink");

    if let Err(e) = run_sink(config) {
        error!("A2DP null sink failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
