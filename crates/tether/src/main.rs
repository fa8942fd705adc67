// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tether - a plugin host.

mod builtin;
mod check;
mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tether_config::TetherConfig;

#[derive(Parser, Debug)]
#[command(name = "tether", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the configured plugins and serve until SIGTERM or SIGINT.
    Serve,
    /// Validate configuration and verify plugin checksums.
    Check,
    /// Print the SHA-256 checksum of a plugin binary.
    Checksum { path: PathBuf },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let Some(config) = load_config(cli.config.as_deref()) else {
                return ExitCode::FAILURE;
            };
            match serve::run_serve(config).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("tether: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Check => {
            let Some(config) = load_config(cli.config.as_deref()) else {
                return ExitCode::FAILURE;
            };
            check::run_check(&config).await
        }
        Commands::Checksum { path } => match tether_catalog::file_checksum(&path).await {
            Ok(sum) => {
                println!("{sum}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("tether: {}: {e}", path.display());
                ExitCode::FAILURE
            }
        },
    }
}

fn load_config(path: Option<&std::path::Path>) -> Option<TetherConfig> {
    let loaded = match path {
        Some(path) => tether_config::load_and_validate_path(path),
        None => tether_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(errors) => {
            tether_config::render_errors(&errors);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["tether", "check", "--config", "/etc/t.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("/etc/t.toml")));
        assert!(matches!(cli.command, Commands::Check));
    }
}
