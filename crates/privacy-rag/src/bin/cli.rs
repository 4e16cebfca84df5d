//! privacy-rag CLI
//!
//! Run a single query non-interactively, or start an interactive
//! read-query-print loop. Run with: cargo run -p privacy-rag

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;

use privacy_rag::config::GenerationBackend;
use privacy_rag::providers::OllamaClient;
use privacy_rag::{RagConfig, RagPipeline};

#[derive(Parser)]
#[command(
    name = "privacy-rag",
    version,
    about = "Privacy-guarded question answering over personal and CVE corpora"
)]
struct Cli {
    /// Single query to run (omit for interactive mode)
    query: Option<String>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the retrieved context instead of generating an answer
    #[arg(long)]
    retrieve_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "privacy_rag=info".into()),
        )
        .init();

    let cli = Cli::parse();

    println!("==================================================");
    println!("   PRIVACY RAG PIPELINE");
    println!("==================================================");

    let config = match RagConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[Error] {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Backend: {:?}", config.backend);
    tracing::info!("Embedding model: {}", config.embeddings.model);
    tracing::info!("Index path: {}", config.vector_db.storage_path.display());

    if config.backend == GenerationBackend::Local {
        let probe = OllamaClient::new(&config.llm);
        if !probe.health_check().await.unwrap_or(false) {
            tracing::warn!("Ollama not reachable at {}", config.llm.base_url);
            tracing::warn!("  1. Start: ollama serve");
            tracing::warn!(
                "  2. Pull models: ollama pull {} && ollama pull {}",
                config.embeddings.model,
                config
                    .llm
                    .generate_models
                    .first()
                    .map(String::as_str)
                    .unwrap_or("llama3.2:3b")
            );
        }
    }

    let pipeline = match build_pipeline(&config).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("[Error] Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    println!("[System] System ready.");
    println!("==================================================\n");

    match cli.query {
        Some(query) => run_one(&pipeline, &query, cli.retrieve_only).await,
        None => run_interactive(&pipeline, cli.retrieve_only).await,
    }

    Ok(())
}

async fn build_pipeline(config: &RagConfig) -> privacy_rag::Result<RagPipeline> {
    let pipeline = RagPipeline::from_config(config).await?;
    pipeline.initialize().await?;
    Ok(pipeline)
}

async fn run_one(pipeline: &RagPipeline, query: &str, retrieve_only: bool) {
    let start = Instant::now();

    if retrieve_only {
        match pipeline.retrieve(query, pipeline.top_k()).await {
            Ok(documents) => {
                for (i, document) in documents.iter().enumerate() {
                    let snippet: String = document.chars().take(200).collect();
                    println!("Result {}: {}...", i + 1, snippet);
                }
            }
            Err(e) => println!("[Error] {}", e),
        }
    } else {
        let answer = pipeline.run_query(query).await;
        println!("\n--- [Final Output] ---");
        println!("{}", answer);
        println!("----------------------");
    }

    println!("[Metrics] Latency: {:.2}s", start.elapsed().as_secs_f64());
    println!("==================================================\n");
}

async fn run_interactive(pipeline: &RagPipeline, retrieve_only: bool) {
    println!("Type 'exit' or 'quit' to stop.\n");

    let stdin = io::stdin();
    loop {
        print!("USER >> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                println!("[Error] {}", e);
                continue;
            }
        }

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        run_one(pipeline, query, retrieve_only).await;
    }
}
