//! Engine configuration command.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use patchbay_config::{EngineConfig, default_config_path, ensure_user_config_dir};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show {
        /// Config file to read instead of the default
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init {
        /// Destination (defaults to the user config file)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the default config file location
    Path,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show { config } => {
            let config = super::load_config(config.as_deref())?;
            print!("{}", config.to_toml()?);
        }

        ConfigCommand::Init { path, force } => {
            let path = match path {
                Some(path) => path,
                None => {
                    ensure_user_config_dir()?;
                    default_config_path()
                }
            };
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            EngineConfig::default().save(&path)?;
            println!("Wrote {}", path.display());
        }

        ConfigCommand::Path => {
            println!("{}", default_config_path().display());
        }
    }

    Ok(())
}
