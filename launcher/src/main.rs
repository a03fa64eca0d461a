//! EC2 Launcher - Entry Point
//!
//! Serves the deployment form and provisions an EC2 instance through
//! Terraform on request.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use launcher::app::options::AppOptions;
use launcher::app::run::run;
use launcher::filesys::file::File;
use launcher::logs::{init_logging, LogLevel, LogOptions};
use launcher::storage::settings::Settings;
use launcher::utils::version_info;

use tracing::{error, info, warn};

const DEFAULT_SETTINGS_FILE: &str = "settings.json";

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let cli_args = parse_cli_args(&args);

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Failed to render version info: {e}"),
        }
        return ExitCode::SUCCESS;
    }

    // Retrieve the settings file
    let settings_path = cli_args
        .get("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let mut settings = match Settings::load(&File::new(settings_path)).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {e}");
            return ExitCode::FAILURE;
        }
    };
    let override_warnings = apply_overrides(&mut settings, &cli_args);

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: settings.log_dir.clone(),
        json_format: settings.log_json,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };
    for warning in override_warnings {
        warn!("{}", warning);
    }

    // Run the server
    let options = AppOptions::from(&settings);
    info!(
        "Running EC2 launcher {} ({}) with options: {:?}",
        version.version, version.git_hash, options
    );
    match run(options, await_shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to run the launcher: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Collect `--key=value` pairs and bare `--flag`s
fn parse_cli_args(args: &[String]) -> HashMap<String, String> {
    let mut cli_args = HashMap::new();
    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }
    cli_args
}

/// Apply the `PORT` environment variable and command line overrides
///
/// Returns warnings to log once logging is up.
fn apply_overrides(settings: &mut Settings, cli_args: &HashMap<String, String>) -> Vec<String> {
    let mut warnings = Vec::new();

    let port = cli_args
        .get("port")
        .cloned()
        .or_else(|| env::var("PORT").ok());
    if let Some(port) = port {
        match port.parse() {
            Ok(port) => settings.server.port = port,
            Err(_) => warnings.push(format!("Ignoring invalid port: {port}")),
        }
    }

    if let Some(host) = cli_args.get("host") {
        settings.server.host = host.clone();
    }

    if let Some(dir) = cli_args.get("terraform-dir") {
        settings.terraform.working_dir = PathBuf::from(dir);
    }

    if let Some(level) = cli_args.get("log-level") {
        match level.parse::<LogLevel>() {
            Ok(level) => settings.log_level = level,
            Err(e) => warnings.push(e),
        }
    }

    warnings
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    warn!("Unable to install signal handlers, waiting for Ctrl+C only");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
