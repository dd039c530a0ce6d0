mod bootstrap;
mod chat;
mod config;
mod ingest;
mod status;

pub use bootstrap::handle_bootstrap;
pub use chat::{ChatArgs, handle_chat};
pub use config::{ConfigCommand, handle_config};
pub use ingest::{IngestArgs, handle_ingest};
pub use status::handle_status;

use anyhow::Result;

use crate::models::Config;

/// Load and validate the configuration; misconfiguration fails here,
/// before any backend is touched.
pub(crate) fn load_config() -> Result<Config> {
    let config = Config::load()?;
    config.validate()?;
    Ok(config)
}
