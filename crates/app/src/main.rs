use chrono::Utc;
use clap::{Parser, Subcommand};
use pdf_rag_core::{
    GeminiEmbedder, GeminiGenerator, LopdfExtractor, Pipeline, ProcessingConfig, QdrantGateway,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Qdrant base URL
    #[arg(long, default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, default_value = "pdf_chunks")]
    qdrant_collection: String,

    /// Embedding dimensionality of the collection (768 for text-embedding-004)
    #[arg(long, default_value = "768")]
    vector_size: usize,

    /// Embedding model, fixed per collection
    #[arg(long, default_value = "text-embedding-004")]
    embedding_model: String,

    /// Generative model used to answer questions
    #[arg(long, default_value = "gemini-1.5-flash")]
    chat_model: String,

    /// Maximum chunk length in characters
    #[arg(long, default_value = "500")]
    chunk_size: usize,

    /// Character overlap between adjacent chunks
    #[arg(long, default_value = "75")]
    chunk_overlap: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one PDF into the vector collection.
    Ingest {
        /// Path to the PDF file.
        #[arg(long)]
        pdf: String,
    },
    /// Ask a question against the ingested collection.
    Ask {
        /// The question to answer.
        #[arg(long)]
        query: String,
        /// Number of context chunks to retrieve.
        #[arg(long, default_value = "3")]
        top_k: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = ProcessingConfig::new(&cli.api_key);
    config.chunk_size = cli.chunk_size;
    config.chunk_overlap = cli.chunk_overlap;
    config.embedding_model = cli.embedding_model.clone();
    config.chat_model = cli.chat_model.clone();
    config
        .validate()
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    let embedder = Arc::new(
        GeminiEmbedder::new(&config).map_err(|error| anyhow::anyhow!(error.to_string()))?,
    );
    let store = QdrantGateway::new(
        &cli.qdrant_url,
        &cli.qdrant_collection,
        cli.vector_size,
        config.request_timeout,
        embedder.clone(),
    )
    .map_err(|error| anyhow::anyhow!(error.to_string()))?;
    let generator =
        GeminiGenerator::new(&config).map_err(|error| anyhow::anyhow!(error.to_string()))?;

    let pipeline = Pipeline::new(
        Arc::new(LopdfExtractor),
        embedder,
        Arc::new(store),
        Arc::new(generator),
    );

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-rag boot"
    );

    match cli.command {
        Command::Ingest { pdf } => {
            let report = pipeline
                .process_pdf(Path::new(&pdf), &config)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!(
                "{} chunks from {} page(s) of {} stored at {} ({}-dimensional vectors)",
                report.chunks,
                report.pages,
                report.source,
                report.ingested_at.to_rfc3339(),
                report.embedding_dimensions,
            );
        }
        Command::Ask { query, top_k } => {
            let grounded = pipeline
                .query_knowledge_base(&query, &config, top_k)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("question: {query}\n");
            println!("{}\n", grounded.answer);

            if grounded.results.is_empty() {
                println!("(no context was retrieved from the knowledge base)");
            }
            for (position, hit) in grounded.results.iter().enumerate() {
                println!(
                    "[{}] score={:.4} page={} source={}",
                    position + 1,
                    hit.score,
                    hit.metadata.page,
                    hit.metadata.source
                );
                println!("  {}", hit.text);
            }
        }
    }

    Ok(())
}
