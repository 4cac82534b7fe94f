//! cloudns-sync - keep a ClouDNS record pointed at this machine.

use anyhow::Context;
use clap::{Parser, Subcommand};
use cloudns_sync::cloudns::{CloudnsApi, CloudnsClient};
use cloudns_sync::config::Config;
use cloudns_sync::error::SyncError;
use cloudns_sync::sync::{reconcile, SyncOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloudns-sync")]
#[command(about = "Keep a ClouDNS record pointed at this machine's public IP")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log requests and decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the record if the public IP changed (default)
    Sync {
        /// Show what would change without updating
        #[arg(long)]
        dry_run: bool,

        /// Update even if the IP hasn't changed
        #[arg(short, long)]
        force: bool,
    },

    /// Show the current IP and the stored record
    Status,

    /// Validate configuration and credentials
    Validate,

    /// Print an example configuration file
    ExampleConfig,
}

/// Config file to read, or `None` when configuration comes from the environment.
fn get_config_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
    if cli_path.is_some() {
        return cli_path;
    }

    // Default locations
    let candidates = [
        Config::default_path().ok(),
        Some(PathBuf::from("/etc/cloudns-sync/config.toml")),
        Some(PathBuf::from("config.toml")),
    ];

    candidates
        .into_iter()
        .flatten()
        .find(|candidate| candidate.exists())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = Config::load(path).with_context(|| match path {
        Some(path) => format!("failed to load configuration from {}", path.display()),
        None => "failed to load configuration from environment".to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

fn exit_code_for(e: &anyhow::Error) -> ExitCode {
    let code = e.downcast_ref::<SyncError>().map_or(1, SyncError::exit_code);
    ExitCode::from(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            println!("Error: {:#}", e);
            exit_code_for(&e)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = get_config_path(cli.config);
    let config_path = config_path.as_deref();
    let command = cli.command.unwrap_or(Commands::Sync {
        dry_run: false,
        force: false,
    });

    match command {
        Commands::Sync { dry_run, force } => {
            let config = load_config(config_path)?;
            cmd_sync(config, SyncOptions { dry_run, force }).await
        }
        Commands::Status => {
            let config = load_config(config_path)?;
            cmd_status(config).await
        }
        Commands::Validate => cmd_validate(config_path).await,
        Commands::ExampleConfig => {
            print!("{}", Config::example().to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn cmd_sync(config: Config, options: SyncOptions) -> anyhow::Result<ExitCode> {
    let client = CloudnsClient::new(&config)?;
    let outcome = reconcile(&client, options).await?;

    println!("{}", outcome);

    Ok(ExitCode::from(outcome.exit_code()))
}

async fn cmd_status(config: Config) -> anyhow::Result<ExitCode> {
    let client = CloudnsClient::new(&config)?;

    println!("cloudns-sync Status");
    println!("===================\n");
    println!("Record: {}", config.target.fqdn());

    let mut ok = true;

    match client.get_my_ip().await {
        Ok(ip) => println!("Current IP: {}", ip),
        Err(e) => {
            println!("Current IP: error - {}", e);
            ok = false;
        }
    }

    match client.get_record().await {
        Ok(record) => {
            println!("Record ID: {}", record.id);
            println!("IP found in DNS: {}", record.record);
        }
        Err(e) => {
            println!("IP found in DNS: error - {}", e);
            ok = false;
        }
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn cmd_validate(config_path: Option<&Path>) -> anyhow::Result<ExitCode> {
    println!("Validating configuration...\n");

    match config_path {
        Some(path) => print!("  config ({}): ", path.display()),
        None => print!("  config (environment): "),
    }
    let config = match load_config(config_path) {
        Ok(config) => {
            println!("OK");
            config
        }
        Err(e) => {
            println!("FAILED - {:#}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    print!("  credentials ({}): ", config.credentials.auth_id);
    let client = CloudnsClient::new(&config)?;
    match client.login().await {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED - {}", e);
            return Ok(ExitCode::FAILURE);
        }
    }

    print!("  record ({}): ", config.target.fqdn());
    match client.get_record().await {
        Ok(record) => println!("OK (id {})", record.id),
        Err(e) => {
            println!("FAILED - {}", e);
            return Ok(ExitCode::FAILURE);
        }
    }

    println!("\nConfiguration is valid.");
    Ok(ExitCode::SUCCESS)
}
