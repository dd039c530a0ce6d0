use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use super::load_config;
use crate::cli::OutputFormat;
use crate::services::{
    ChatCompletionsGenerator, ChatService, RetrievalService, build_chat_stores, build_embedder,
    build_vector_index,
};

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[arg(long, short = 's', required = true, help = "Session identifier")]
    pub session: String,

    #[arg(required = true, help = "User query")]
    pub query: String,
}

pub async fn handle_chat(args: ChatArgs, format: OutputFormat) -> Result<()> {
    let config = load_config()?;

    let embedder = build_embedder(&config.embedding)?;
    let index = build_vector_index(&config.vector_store, u64::from(config.embedding.dimension))
        .await
        .context("failed to initialize vector backend")?;
    let (sessions, cache) = build_chat_stores(&config.chat)
        .await
        .context("failed to initialize chat stores")?;
    let generator = Arc::new(ChatCompletionsGenerator::new(&config.generation)?);

    let retrieval = RetrievalService::new(embedder, index);
    let service = ChatService::new(
        retrieval,
        generator,
        sessions,
        cache,
        u64::from(config.chat.top_k),
    );

    let reply = service
        .chat(&args.session, &args.query)
        .await
        .context("chat turn failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reply)?),
        OutputFormat::Text => {
            println!("{}", reply.answer);
            if !reply.sources.is_empty() {
                println!("\nSources:");
                for source in &reply.sources {
                    println!(
                        "  [{:.4}] {} ({})",
                        source.score, source.metadata.source_id, source.id
                    );
                }
            }
        }
    }

    Ok(())
}
