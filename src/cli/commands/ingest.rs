use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::load_config;
use crate::cli::OutputFormat;
use crate::services::{IngestionService, build_embedder, build_vector_index};

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[arg(required = true, help = "Path to the document to ingest")]
    pub path: PathBuf,

    #[arg(long, help = "Source identifier (defaults to the file's base name)")]
    pub source_id: Option<String>,
}

pub async fn handle_ingest(args: IngestArgs, format: OutputFormat) -> Result<()> {
    let config = load_config()?;

    let embedder = build_embedder(&config.embedding)?;
    let index = build_vector_index(&config.vector_store, u64::from(config.embedding.dimension))
        .await
        .context("failed to initialize vector backend")?;

    let service = IngestionService::new(embedder, index, config.indexing.clone());
    let summary = service
        .ingest(&args.path, args.source_id.as_deref())
        .await
        .context("ingestion failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => println!(
            "Ingested '{}': {} chunks",
            summary.source_id, summary.chunks_ingested
        ),
    }

    Ok(())
}
