mod settings;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::*;
use instconfig::env::{VarKind, VARIABLES};
use instconfig::file::user_config_path;
use instconfig::{Config, SystemZones};
use miette::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::settings::CliSettings;

/// Resolve, check and persist the installer configuration
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file to load instead of the configured default
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved configuration as it would be saved
    Show,

    /// Validate the resolved configuration
    Check {
        /// Also require credentials and a disk layout, as the installer does
        #[arg(long)]
        install: bool,
    },

    /// Write the resolved configuration, without credentials
    Save {
        /// Destination file
        output: PathBuf,
    },

    /// List the environment variables that override the configuration
    Env,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = CliSettings::load()?;

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if let Some(directives) = &settings.log_filter {
        EnvFilter::new(directives)
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(cli, &settings)
}

fn run(cli: Cli, settings: &CliSettings) -> Result<()> {
    match cli.command {
        Commands::Env => cmd_env(),
        cmd => {
            let mut cfg = resolve(cli.config.as_deref(), &settings.config_path)?;
            cfg.verbose = cli.verbose;
            info!("resolved configuration for {}", cfg.fqdn());
            debug!("{:?}", cfg);

            match cmd {
                Commands::Show => print!("{}", cfg.to_yaml()?),
                Commands::Check { install } => cmd_check(&cfg, install)?,
                Commands::Save { output } => cmd_save(&cfg, &output)?,
                Commands::Env => cmd_env(),
            }
        }
    }
    Ok(())
}

/// An explicit `--config` must exist. Otherwise the configured default and
/// then the per-user file are tried, and the compiled defaults stand in when
/// neither exists.
fn resolve(explicit: Option<&Path>, default_path: &Path) -> Result<Config> {
    if let Some(path) = explicit {
        return Ok(Config::load(Some(path))?);
    }
    let found = std::iter::once(default_path.to_path_buf())
        .chain(user_config_path())
        .find(|candidate| candidate.exists());
    match &found {
        Some(path) => debug!("using configuration file {}", path.display()),
        None => info!(
            "{} does not exist, starting from defaults",
            default_path.display()
        ),
    }
    Ok(Config::load(found.as_deref())?)
}

fn cmd_check(cfg: &Config, install: bool) -> Result<()> {
    let zones = SystemZones::new();
    if install {
        cfg.validate_for_install(&zones)?;
    } else {
        cfg.validate_with(&zones)?;
    }
    println!("{} {}", "Configuration is valid for".green(), cfg.fqdn().bold());
    Ok(())
}

fn cmd_save(cfg: &Config, output: &Path) -> Result<()> {
    cfg.save_to_file(output)?;
    println!("{} {}", "Saved".green(), output.display());
    Ok(())
}

fn cmd_env() {
    for var in VARIABLES {
        let kind = match var.kind {
            VarKind::Text => "text",
            VarKind::Secret => "secret",
            VarKind::Choice => "choice",
            VarKind::Flag => "flag",
            VarKind::List => "list",
        };
        let state = match std::env::var(var.name) {
            Ok(_) if var.kind == VarKind::Secret => "set".yellow(),
            Ok(value) if value.is_empty() => "empty".dimmed(),
            Ok(value) => value.normal(),
            Err(_) => "unset".dimmed(),
        };
        println!("{:<26} {:<24} {:<7} {}", var.name.bold(), var.key, kind, state);
    }
}
