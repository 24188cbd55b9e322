//! Batch summarization from the command line.
//!
//! Summarizes PDF and plain-text files (or whole directories of them) with the same pipeline the
//! HTTP server uses. Settings come from the environment; flags override the chunking and batching
//! knobs for a single run.
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use legal_digest::{
    config::{self, SummarizationProvider},
    extraction::{is_supported_path, load_document},
    inference::{self, ExtractiveInferenceClient, InferenceClient},
    logging,
    processing::{JobControls, SummarizationService, SummarizeOptions},
};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(
    name = "legal-digest-cli",
    about = "Summarize PDF or text documents with the Legal Digest pipeline"
)]
struct Cli {
    /// Files or directories to summarize.
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Descend into subdirectories.
    #[arg(long, short)]
    recursive: bool,
    /// Chunks summarized concurrently per batch.
    #[arg(long)]
    batch_size: Option<usize>,
    /// Upper bound on characters per chunk.
    #[arg(long)]
    max_chunk_chars: Option<usize>,
    /// Use the extractive backend regardless of configuration.
    #[arg(long)]
    extractive: bool,
    /// Upper bound on each chunk summary.
    #[arg(long)]
    max_length: Option<usize>,
    /// Lower bound on each chunk summary.
    #[arg(long)]
    min_length: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing();
    let cli = Cli::parse();
    let config = config::get_config();

    let mut settings = config.pipeline_settings();
    if let Some(batch_size) = cli.batch_size {
        if batch_size == 0 {
            bail!("--batch-size must be > 0");
        }
        settings.batch_size = batch_size;
    }
    if let Some(max_chunk_chars) = cli.max_chunk_chars {
        if max_chunk_chars == 0 {
            bail!("--max-chunk-chars must be > 0");
        }
        settings.max_chunk_chars = max_chunk_chars;
    }

    let client: Arc<dyn InferenceClient> =
        if cli.extractive || config.summarization_provider == SummarizationProvider::Extractive {
            Arc::new(ExtractiveInferenceClient::new())
        } else {
            inference::build_inference_client(config)
                .context("failed to construct summarization backend")?
        };
    let service = SummarizationService::new(client, settings);

    let files = collect_files(&cli.paths, cli.recursive)?;
    if files.is_empty() {
        bail!("no supported documents found (expected .pdf, .txt, or .md)");
    }

    let options = SummarizeOptions {
        max_length: cli.max_length,
        min_length: cli.min_length,
    };
    let mut failures = 0usize;
    for path in &files {
        match summarize_file(&service, path, options.clone()).await {
            Ok(summary) => {
                println!("== {}", path.display());
                println!("{summary}");
                println!();
            }
            Err(error) => {
                failures += 1;
                tracing::error!(path = %path.display(), error = %format!("{error:#}"), "Summarization failed");
            }
        }
    }

    if let Err(error) = service.shutdown().await {
        tracing::warn!(%error, "Summarization engine shutdown failed");
    }

    if failures > 0 {
        bail!("{failures} of {} documents failed", files.len());
    }
    Ok(())
}

async fn summarize_file(
    service: &SummarizationService,
    path: &Path,
    options: SummarizeOptions,
) -> Result<String> {
    let text = load_document(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let outcome = service
        .summarize_text(&text, options, JobControls::default())
        .await
        .with_context(|| format!("failed to summarize {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        chunks = outcome.chunk_count,
        failed = outcome.failed_chunks,
        elapsed = outcome.elapsed_seconds,
        "Summarized document"
    );
    Ok(outcome.summary)
}

fn collect_files(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            bail!("path not found: {}", path.display());
        }
        let walker = WalkDir::new(path)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.with_context(|| format!("failed to walk {}", path.display()))?;
            if entry.file_type().is_file() && is_supported_path(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}
