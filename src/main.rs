// src/main.rs

use anyhow::{Context, Result};
use canary_updater::resolver::UpdateCheck;
use canary_updater::transport::HttpTransport;
use canary_updater::{Config, Outcome, Updater};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io::Write;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;
use tracing::info;

#[derive(Parser)]
#[command(name = "canary-updater")]
#[command(author, version, about = "Keep an application up to date from its .deb release channel, then launch it", long_about = None)]
struct Cli {
    /// JSON configuration file (defaults target Discord Canary)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the installed version with the latest release
    Check,
    /// Install the latest release without launching
    Update {
        /// Reinstall even if the installed version is current
        #[arg(short, long)]
        force: bool,
    },
    /// Update if needed, then launch the application (default)
    Run {
        /// Reinstall even if the installed version is current
        #[arg(short, long)]
        force: bool,
        /// Arguments passed through to the application
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}

/// Print download progress on a single line
fn print_progress(ratio: f64) {
    print!("\rDownloading update... {:>3.0}%", ratio * 100.0);
    let _ = std::io::stdout().flush();
    if ratio >= 1.0 {
        println!();
    }
}

/// Run the update and turn a failed attempt into an error
fn update(updater: &Updater<HttpTransport>, force: bool) -> Result<()> {
    match updater.check_and_prepare_update(force, &mut print_progress) {
        Outcome::UpToDate { version } => {
            println!("Already up to date ({})", version);
            Ok(())
        }
        Outcome::Updated { from, to, report } => {
            match from {
                Some(from) => println!("Updated {} -> {}", from, to),
                None => println!("Installed {}", to),
            }
            println!(
                "  {} files, {} directories written",
                report.files, report.directories
            );
            Ok(())
        }
        Outcome::Failed(e) => Err(e).context("Update failed"),
    }
}

/// Replace this process with the installed application
fn launch(config: &Config, args: &[String]) -> Result<()> {
    let root = config.install_root();
    let executable = config.executable_path();
    info!("Launching {}", executable.display());

    std::env::set_current_dir(&root)
        .with_context(|| format!("Failed to enter {}", root.display()))?;

    // exec only returns on failure
    let error = Command::new(&executable).args(args).exec();
    Err(error).with_context(|| format!("Failed to launch {}", executable.display()))
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run {
        force: false,
        args: Vec::new(),
    });

    if let Commands::Completions { shell } = command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "canary-updater", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_ref())?;
    let updater = Updater::from_config(config)?;

    match command {
        Commands::Check => {
            let UpdateCheck {
                local,
                remote,
                needed,
            } = updater.check()?;
            println!("Installed: {}", local);
            println!("Latest:    {}", remote);
            println!(
                "{}",
                if needed {
                    "An update is available."
                } else {
                    "Up to date."
                }
            );
            Ok(())
        }
        Commands::Update { force } => update(&updater, force),
        Commands::Run { force, args } => {
            update(&updater, force)?;
            launch(updater.config(), &args)
        }
        Commands::Completions { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_passes_through_hyphen_args() {
        let cli = Cli::parse_from(["canary-updater", "run", "--force", "--", "--enable-logging", "x"]);
        match cli.command {
            Some(Commands::Run { force, args }) => {
                assert!(force);
                assert_eq!(args, vec!["--enable-logging", "x"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_no_command_defaults_to_run() {
        let cli = Cli::parse_from(["canary-updater"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_load_config_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());
    }
}
