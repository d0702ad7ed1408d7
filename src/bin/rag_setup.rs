use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use polysight_rag::chunker::{chunk_document, ChunkerConfig};
use polysight_rag::config::{self, Config};
use polysight_rag::models::{CollectionStatus, DocumentChunk};
use polysight_rag::rag::embeddings::EmbeddingClient;
use polysight_rag::rag::vector_store::{StoreError, VectorStore};

/// Pause between ingestion batches, the only pacing applied to the
/// embedding API.
const BATCH_PAUSE: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "rag-setup")]
#[command(about = "Chunk, embed and load the knowledge base into Qdrant")]
struct Args {
    /// Knowledge-base text file to ingest
    #[arg(long, env = "KNOWLEDGE_BASE_PATH", default_value = "./data/knowledge-base.txt")]
    data: PathBuf,

    /// Maximum chunk size in characters
    #[arg(long, default_value_t = 1000)]
    chunk_size: usize,

    /// Overlap between chunks in characters
    #[arg(long, default_value_t = 200)]
    chunk_overlap: usize,

    /// Chunks embedded and upserted per batch
    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    /// Overwrite existing data without asking
    #[arg(long)]
    yes: bool,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    config::init_tracing();

    let args = Args::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            tracing::info!("Check the .env file and ensure all required variables are set");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config, &args).await {
        tracing::error!("Error during database setup: {:#}", e);
        if e.downcast_ref::<StoreError>().is_some() {
            tracing::error!(
                "Unable to connect to Qdrant. Please check if the Qdrant server is running and accessible."
            );
            tracing::info!("Start it with: docker-compose up -d");
        }
        std::process::exit(1);
    }
}

async fn run(config: &Config, args: &Args) -> Result<()> {
    tracing::info!("Starting database setup");

    let embeddings = EmbeddingClient::new(config);
    let store =
        VectorStore::connect(&config.qdrant_url, &config.qdrant_collection, embeddings).await?;

    let should_load = match store.collection_status().await? {
        CollectionStatus::Absent => {
            tracing::info!("Collection '{}' does not exist yet", config.qdrant_collection);
            true
        }
        CollectionStatus::Empty => {
            tracing::info!("Collection '{}' is empty", config.qdrant_collection);
            true
        }
        CollectionStatus::Populated(count) => {
            tracing::info!(
                "Collection '{}' already holds {} points",
                config.qdrant_collection,
                count
            );
            if args.yes || confirm_overwrite()? {
                tracing::info!("Deleting existing collection");
                store.delete_collection().await?;
                true
            } else {
                tracing::info!("Skipping data loading, existing data will be used");
                false
            }
        }
    };

    if should_load {
        let chunks = prepare_chunks(args)?;
        store.ensure_collection().await?;
        load_chunks(&store, &chunks, args.batch_size).await?;
    }

    match store.collection_status().await? {
        CollectionStatus::Populated(count) => {
            tracing::info!(
                "Verification complete: collection '{}' holds {} points",
                config.qdrant_collection,
                count
            );
            tracing::info!("You can now run the application: polysight-rag");
        }
        CollectionStatus::Absent | CollectionStatus::Empty => {
            tracing::warn!("Verification found no points in '{}'", config.qdrant_collection);
        }
    }

    Ok(())
}

fn prepare_chunks(args: &Args) -> Result<Vec<DocumentChunk>> {
    let text = load_knowledge_base(&args.data)?;
    tracing::info!(
        "Loaded {} characters from {}",
        text.chars().count(),
        args.data.display()
    );

    let chunker_config = ChunkerConfig {
        chunk_size: args.chunk_size,
        chunk_overlap: args.chunk_overlap,
        ..ChunkerConfig::default()
    };
    let source = args.data.to_string_lossy();
    let chunks = chunk_document(&text, &source, &chunker_config);
    anyhow::ensure!(!chunks.is_empty(), "knowledge base produced no chunks");

    log_chunk_stats(&chunks);
    Ok(chunks)
}

fn load_knowledge_base(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read knowledge base: {}", path.display()))
}

fn log_chunk_stats(chunks: &[DocumentChunk]) {
    let lengths: Vec<usize> = chunks.iter().map(|c| c.text.chars().count()).collect();
    let total: usize = lengths.iter().sum();
    tracing::info!(
        "Text split into {} chunks (min {} / max {} / avg {} chars)",
        chunks.len(),
        lengths.iter().min().unwrap_or(&0),
        lengths.iter().max().unwrap_or(&0),
        total / chunks.len().max(1)
    );
}

async fn load_chunks(store: &VectorStore, chunks: &[DocumentChunk], batch_size: usize) -> Result<()> {
    tracing::info!("Embedding documents, this may take a few minutes on the first run");

    let batches: Vec<&[DocumentChunk]> = chunks.chunks(batch_size.max(1)).collect();
    let pb = ProgressBar::new(batches.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    for (i, batch) in batches.iter().enumerate() {
        pb.set_message(format!("batch {} ({} chunks)", i + 1, batch.len()));
        store.add_chunks(batch).await?;
        pb.inc(1);
        // Pause between batches so the embedding API is not hammered.
        if i + 1 < batches.len() {
            tokio::time::sleep(BATCH_PAUSE).await;
        }
    }

    pb.finish_with_message("done");
    tracing::info!("All {} chunks embedded and loaded into the vector store", chunks.len());
    Ok(())
}

fn confirm_overwrite() -> Result<bool> {
    print!("Overwrite data? (y/n): ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_knowledge_base() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("knowledge-base.txt");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "Polysight requires 8GB RAM.")?;

        let text = load_knowledge_base(&path)?;
        assert!(text.contains("Polysight requires 8GB RAM"));
        Ok(())
    }

    #[test]
    fn test_load_knowledge_base_missing_file() {
        let err = load_knowledge_base(Path::new("/nonexistent/kb.txt")).unwrap_err();
        assert!(err.to_string().contains("Failed to read knowledge base"));
    }
}
