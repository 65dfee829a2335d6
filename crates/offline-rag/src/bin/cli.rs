//! Command-line front end
//!
//! Run with: cargo run -p offline-rag --features cli --bin offline-rag -- ask "..."

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use offline_rag::{
    config::RagConfig,
    ingestion::IngestPipeline,
    types::{IngestOptions, QueryRequest},
    ChunkParams, RagService,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "offline-rag",
    version,
    about = "Ask questions about local PDF, DOCX and TXT files"
)]
struct Cli {
    /// TOML configuration file (overrides OFFLINE_RAG_CONFIG).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the index from every file in the data directory.
    Ingest {
        /// Directory to load instead of `ingest.data_dir`.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Window width in words.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Words shared by consecutive windows.
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Answer a question from the indexed documents.
    Ask {
        /// The question.
        question: String,

        /// Number of context chunks.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Print the chunks of the given files as JSON lines, without indexing.
    Chunk {
        /// Files to load, chunked in the given order.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Window width in words.
        #[arg(long, default_value_t = 512)]
        chunk_size: usize,

        /// Words shared by consecutive windows.
        #[arg(long, default_value_t = 128)]
        overlap: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_rag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Chunk {
            files,
            chunk_size,
            overlap,
        } => run_chunk(&files, chunk_size, overlap),
        Command::Ingest {
            data_dir,
            chunk_size,
            overlap,
        } => {
            let mut config = load_config(cli.config)?;
            if let Some(dir) = data_dir {
                config.ingest.data_dir = dir;
            }
            let options = IngestOptions {
                chunk_size,
                chunk_overlap: overlap,
            };
            run_ingest(config, options).await
        }
        Command::Ask { question, top_k } => {
            run_ask(load_config(cli.config)?, QueryRequest { question, top_k }).await
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<RagConfig> {
    let mut config = match path {
        Some(path) => RagConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => return RagConfig::from_env().context("loading config"),
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

async fn run_ingest(config: RagConfig, options: IngestOptions) -> Result<()> {
    let data_dir = config.ingest.data_dir.clone();
    let service = RagService::from_config(config).await?;

    let pb = spinner(&format!("Indexing {}", data_dir.display()));
    let result = service.ingest_directory(&options).await;
    pb.finish_and_clear();
    let response = result?;

    for warning in &response.warnings {
        eprintln!(
            "{} {}: {}",
            style("skipped").yellow(),
            warning.filename,
            warning.error
        );
    }
    println!(
        "{} {} file(s), {} record(s), {} chunk(s) in {}ms",
        style("Indexed").green().bold(),
        response.files_loaded,
        response.records_loaded,
        response.total_chunks_created,
        response.processing_time_ms
    );
    Ok(())
}

async fn run_ask(config: RagConfig, request: QueryRequest) -> Result<()> {
    let service = RagService::from_config(config).await?;

    let pb = spinner("Retrieving answer");
    let result = service.query(&request).await;
    pb.finish_and_clear();
    let response = result?;

    let label = if response.fallback {
        style("Answer (fallback):").red().bold()
    } else {
        style("Answer:").green().bold()
    };
    println!("{} {}", label, response.answer);

    if !response.sources.is_empty() {
        println!("\n{}", style("Sources:").bold());
        for source in &response.sources {
            println!("  - {}", source.format_inline());
        }
    }
    Ok(())
}

fn run_chunk(paths: &[PathBuf], chunk_size: usize, overlap: usize) -> Result<()> {
    let pipeline = IngestPipeline::new(ChunkParams::new(chunk_size, overlap)?);

    let mut files = Vec::new();
    for path in paths {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        files.push((filename, data));
    }

    let batch = pipeline.ingest_files(
        files
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice())),
    )?;

    for warning in &batch.warnings {
        eprintln!(
            "{} {}: {}",
            style("skipped").yellow(),
            warning.filename,
            warning.error
        );
    }
    for chunk in &batch.chunks {
        println!("{}", serde_json::to_string(chunk)?);
    }
    Ok(())
}
