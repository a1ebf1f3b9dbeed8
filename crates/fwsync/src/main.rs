// # fwsync - Firewall DNS sync
//
// CRITICAL RULES:
// - This is a THIN integration layer ONLY
// - DO NOT add reconciliation, parsing or DNS logic here
// - All sync logic MUST be in fwsync-core
//
// The binary is responsible for:
// 1. Reading configuration from flags / `FWSYNC_*` environment variables
// 2. Initializing logging and the runtime
// 3. Building the control plane and DNS transport
// 4. Running one sync pass and mapping the outcome to an exit code
//
// It runs once and exits; schedule it with cron or a systemd timer.
//
// ## Example
//
// ```bash
// # Preview on a cluster node
// fwsync --dry-run --verbose
//
// # Aliases only, through the API, with fallback resolvers
// export FWSYNC_BACKEND=api
// export FWSYNC_API_URL=https://pve1.example.com:8006
// export FWSYNC_API_TOKEN='root@pam!fwsync=...'
// fwsync --aliases --dns-servers 9.9.9.9,1.1.1.1
// ```

mod cli;

use clap::Parser;
use cli::Cli;
use fwsync_core::SyncEngine;
use fwsync_dns_hickory::HickoryTransport;
use fwsync_plane_pve::PveFactory;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Run completed (individual operation failures are logged)
/// - 1: Configuration or startup error
/// - 2: Run aborted (object listing failed)
#[derive(Debug, Clone, Copy)]
enum FwsyncExitCode {
    /// Run completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Run aborted
    RuntimeError = 2,
}

impl From<FwsyncExitCode> for ExitCode {
    fn from(code: FwsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let _ = e.print();
            return if e.use_stderr() {
                FwsyncExitCode::ConfigError.into()
            } else {
                FwsyncExitCode::Success.into()
            };
        }
    };

    let log_level = match cli.max_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return FwsyncExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FwsyncExitCode::ConfigError.into();
    }

    let plane_config = match cli.control_plane_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return FwsyncExitCode::ConfigError.into();
        }
    };
    let run_config = cli.run_config();

    // Strictly sequential work; one thread is enough.
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FwsyncExitCode::ConfigError.into();
        }
    };

    rt.block_on(async {
        let plane = match PveFactory.create(&plane_config) {
            Ok(plane) => plane,
            Err(e) => {
                error!("Failed to set up control plane: {}", e);
                return FwsyncExitCode::ConfigError;
            }
        };

        let engine = match SyncEngine::new(plane, Box::new(HickoryTransport::new()), run_config)
        {
            Ok(engine) => engine,
            Err(e) => {
                error!("Failed to set up engine: {}", e);
                return FwsyncExitCode::ConfigError;
            }
        };

        match engine.run().await {
            Ok(report) => {
                info!(
                    dry_run = report.dry_run,
                    failures = report.failures(),
                    "Done: {}",
                    report
                );
                FwsyncExitCode::Success
            }
            Err(e) => {
                error!("Sync run aborted: {}", e);
                FwsyncExitCode::RuntimeError
            }
        }
    })
    .into()
}
