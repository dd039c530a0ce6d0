use anyhow::{Context, Result};
use serde_json::json;

use super::load_config;
use crate::cli::OutputFormat;
use crate::services::{build_embedder, build_vector_index};

pub async fn handle_status(format: OutputFormat) -> Result<()> {
    let config = load_config()?;

    let embedder = build_embedder(&config.embedding)?;
    let index = build_vector_index(&config.vector_store, u64::from(config.embedding.dimension))
        .await
        .context("failed to initialize vector backend")?;

    let embedding_ok = embedder.health_check().await.is_ok();
    let vector_ok = index.health_check().await.unwrap_or(false);
    let status = if embedding_ok && vector_ok { "ok" } else { "degraded" };

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "status": status,
                "embedding": embedding_ok,
                "vector_store": vector_ok,
                "namespace": index.namespace(),
            }))?
        ),
        OutputFormat::Text => {
            println!("status: {status}");
            println!("  embedding provider: {}", if embedding_ok { "ok" } else { "unreachable" });
            println!(
                "  vector backend ({}): {}",
                index.namespace(),
                if vector_ok { "ok" } else { "unreachable" }
            );
        }
    }

    if status != "ok" {
        anyhow::bail!("one or more backends are unreachable");
    }

    Ok(())
}
