//! Parking service: user accounts REST API.
//!
//! ```sh
//! # Run with default config (~/.config/parking-service/config.toml)
//! parking-service
//!
//! # Custom config path and port
//! parking-service --config /etc/parking-service/config.toml --port 9090
//!
//! # Validate config without starting
//! parking-service --check
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, info};

use parking_service::config::{default_config_path, AppConfig, ConfigError};
use parking_service::server::{init_tracing, ServerHandle, ServerOptions};

#[derive(Parser, Debug)]
#[command(
    name = "parking-service",
    version,
    about = "User account service for the parking management backend"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "PARKING_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Skip creating the default admin user.
    #[arg(long)]
    no_admin: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    // Tracing first so the rest of startup is logged in the configured format.
    init_tracing(&config);
    match &load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("{}", e);
            error!("Using default configuration.");
        }
    }

    if let Some(port) = cli.port {
        info!("CLI override: port = {}", port);
        config.server.port = port;
    }

    if cli.check {
        match check_report(&config_path, &config, load_error.as_ref()) {
            Ok(report) => {
                println!("{}", report);
                return Ok(());
            }
            Err(message) => {
                eprintln!("{}", message);
                std::process::exit(1);
            }
        }
    }

    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        create_default_admin: !cli.no_admin,
    })
    .await?;

    handle.install_signal_handler();
    info!("Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}

/// Summary printed by `--check`, or the reason the file was unusable.
fn check_report(
    config_path: &Path,
    config: &AppConfig,
    load_error: Option<&ConfigError>,
) -> Result<String, String> {
    if let Some(e) = load_error {
        return Err(format!("Configuration is invalid: {}", e));
    }

    Ok(format!(
        "Configuration is valid\n   Config file : {}\n   API address : {}\n   Database    : {}\n   Log level   : {}",
        config_path.display(),
        config.api_address(),
        config.database.url,
        config.logging.level,
    ))
}
