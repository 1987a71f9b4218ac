use std::path::PathBuf;

use clap::Parser;
use orbit_common::clock::Clock;
use orbit_server::{
    api::{run_server, ServerConfig},
    bootstrap::identity_from_config,
};

/// Workspace dashboard API server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path of the server configuration file
    #[arg(long, default_value = "orbit.toml")]
    config: PathBuf,

    /// Overrides `port` from the configuration file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    // Secrets such as the identity client secret may live in .env
    let _ = dotenvy::dotenv();
    env_logger::init();
    let args = Args::parse();

    let file = match orbit_config_file::load_server_config(&args.config) {
        Ok(file) => file,
        Err(e) => {
            log::error!("{}: {e}", args.config.display());
            std::process::exit(1);
        }
    };

    let clock = Clock::new();
    let identity = match identity_from_config(&file.identity, &file.admin_role, clock.clone()) {
        Ok(identity) => identity,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let config = ServerConfig {
        bind: file.bind,
        port: args.port.unwrap_or(file.port),
        allowed_origins: file.allowed_origins,
        identity,
        clock,
        default_org_code: file.default_org_code,
        admin_role: file.admin_role,
        secure_cookies: file.secure_cookies,
    };
    if let Err(e) = run_server(config).await {
        log::error!("server stopped: {e}");
        std::process::exit(1);
    }
}
