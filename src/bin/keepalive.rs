//! Keep-alive runner for external schedulers.
//!
//! `--once` checks the backend a single time and exits non-zero when it could
//! not be woken. `--keep-alive` repeats the check every configured interval.

use std::process::ExitCode;

use clap::{ArgGroup, Parser};

use galactiturf_wakeup::{load_config, KeepAlive};

#[derive(Parser)]
#[command(name = "galactiturf-keepalive")]
#[command(about = "Keep the GalactiTurf backend from going to sleep")]
#[command(version)]
#[command(group(ArgGroup::new("mode").required(true).args(["once", "keep_alive"])))]
struct Cli {
    /// Run a single check and exit
    #[arg(long)]
    once: bool,

    /// Check on a fixed interval until interrupted
    #[arg(long)]
    keep_alive: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let keep_alive = match KeepAlive::from_config(&config) {
        Ok(keep_alive) => keep_alive,
        Err(e) => {
            log::error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("Backend: {}", config.backend_base_url);

    if cli.once {
        let report = keep_alive.run_once().await;
        return if report.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    tokio::select! {
        () = keep_alive.run_forever() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
            log::info!("Shutting down keep-alive service");
        }
    }
    ExitCode::SUCCESS
}
