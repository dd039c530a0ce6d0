use anyhow::{Context, Result};

use super::load_config;
use crate::cli::OutputFormat;
use crate::models::ChatStoreDriver;
use crate::services::{build_chat_stores, build_vector_index};

/// Create the vector index and, when configured, the durable chat store
/// schema. Runs out-of-band, before the first ingest or chat turn.
pub async fn handle_bootstrap(format: OutputFormat) -> Result<()> {
    let config = load_config()?;

    let index = build_vector_index(&config.vector_store, u64::from(config.embedding.dimension))
        .await
        .context("failed to initialize vector backend")?;
    index
        .ensure_ready()
        .await
        .context("failed to create vector index")?;

    // build_chat_stores creates the Postgres schema as a side effect.
    if config.chat.store == ChatStoreDriver::Postgres {
        build_chat_stores(&config.chat)
            .await
            .context("failed to create chat store schema")?;
    }

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "status": "ok", "namespace": index.namespace() })
        ),
        OutputFormat::Text => println!("bootstrap complete (namespace: {})", index.namespace()),
    }

    Ok(())
}
