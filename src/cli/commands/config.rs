use anyhow::Result;
use clap::Subcommand;

use crate::cli::OutputFormat;
use crate::models::Config;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration
    Show,

    /// Write a default configuration file
    Init,

    /// Print the configuration file path
    Path,
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let config = Config::load()?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                OutputFormat::Text => print!("{}", toml::to_string_pretty(&config)?),
            }
        }
        ConfigCommand::Init => {
            let path = Config::config_path()
                .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
            if path.exists() {
                anyhow::bail!("config file already exists: {}", path.display());
            }
            Config::default().save()?;
            println!("created {}", path.display());
        }
        ConfigCommand::Path => {
            let path = Config::config_path()
                .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
