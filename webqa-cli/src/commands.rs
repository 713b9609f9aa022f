//! Subcommand handlers.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;
use webqa_rag::gemini::{GeminiEmbeddingProvider, GeminiGenerator, api_key_from_env};
use webqa_rag::{Document, FileIndexStore, IndexStore, RagConfig, RagError, RagPipeline};

use crate::cli::{AskArgs, Cli, Command, IngestArgs, Options};
use crate::console;
use crate::fetch::{PageFetcher, html_to_text, looks_like_html};
use crate::render::render_answer;

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let Cli { options, command } = cli;
    match command {
        Command::Ingest(args) => ingest(&options, args).await,
        Command::Ask(args) => ask(&options, args).await,
        Command::Reset => reset(&options).await,
        Command::Console => console::run(&build_pipeline(&options)?).await,
    }
}

/// Pipeline settings from the command line.
pub fn rag_config(options: &Options) -> Result<RagConfig> {
    let min_call_interval = Duration::try_from_secs_f64(options.min_interval_secs)
        .context("--min-interval-secs must be a non-negative number")?;
    Ok(RagConfig::builder()
        .chunk_size(options.chunk_size)
        .chunk_overlap(options.chunk_overlap)
        .top_k(options.top_k)
        .min_call_interval(min_call_interval)
        .build()?)
}

/// Wire the Gemini adapters and the on-disk index into a pipeline.
///
/// Fails before any network or disk work when no API key is configured.
pub fn build_pipeline(options: &Options) -> Result<RagPipeline> {
    let config = rag_config(options)?;
    let api_key =
        api_key_from_env().context("set GOOGLE_API_KEY or GEMINI_API_KEY to use webqa")?;

    let embedder = GeminiEmbeddingProvider::new(api_key.clone())?
        .with_model(options.embedding_model.as_str())
        .with_dimensions(options.embedding_dimensions);
    let generator = GeminiGenerator::new(api_key)?
        .with_model(options.model.as_str())
        .with_timeout(Duration::from_secs(options.timeout_secs))?;

    Ok(RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(embedder))
        .generator(Arc::new(generator))
        .index_store(Arc::new(FileIndexStore::new(&options.index_dir)))
        .build()?)
}

async fn ingest(options: &Options, args: IngestArgs) -> Result<()> {
    if args.urls.is_empty() && args.files.is_empty() {
        bail!("nothing to ingest: pass at least one URL or --file URL=PATH");
    }
    let pipeline = build_pipeline(options)?;

    let mut documents = Vec::with_capacity(args.urls.len() + args.files.len());
    if !args.urls.is_empty() {
        let fetcher = PageFetcher::new(Duration::from_secs(options.timeout_secs))?;
        for url in &args.urls {
            documents.push(fetcher.fetch(url).await?);
        }
    }
    for (origin, path) in args.files {
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let text = if looks_like_html(&raw) { html_to_text(&raw) } else { raw };
        documents.push(Document::new(origin, text));
    }

    let report = pipeline.ingest(&documents).await?;
    info!(index_dir = %options.index_dir.display(), "index written");
    println!(
        "Indexed {} chunks from {} documents into {}",
        report.chunks,
        report.documents,
        options.index_dir.display()
    );
    Ok(())
}

async fn ask(options: &Options, args: AskArgs) -> Result<()> {
    let pipeline = build_pipeline(options)?;
    let record = match pipeline.ask(&args.question).await {
        Ok(record) => record,
        Err(RagError::NotIndexed) => {
            bail!("nothing is indexed yet; run `webqa ingest <URL>...` first")
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print!("{}", render_answer(&record));
    }
    Ok(())
}

/// Clearing the index needs no credentials, so it talks to the store directly.
async fn reset(options: &Options) -> Result<()> {
    FileIndexStore::new(&options.index_dir).delete().await?;
    println!("Index cleared.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn options(extra: &[&str]) -> Options {
        let mut argv = vec!["webqa", "reset"];
        argv.extend_from_slice(extra);
        Cli::try_parse_from(argv).unwrap().options
    }

    #[test]
    fn config_follows_flags() {
        let config = rag_config(&options(&[
            "--chunk-size",
            "500",
            "--chunk-overlap",
            "50",
            "--top-k",
            "6",
            "--min-interval-secs",
            "0.5",
        ]))
        .unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.top_k, 6);
        assert_eq!(config.min_call_interval, Duration::from_millis(500));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(rag_config(&options(&["--chunk-size", "100", "--chunk-overlap", "100"])).is_err());
        assert!(rag_config(&options(&["--min-interval-secs=-1"])).is_err());
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(&["--index-dir", dir.path().to_str().unwrap()]);
        reset(&options).await.unwrap();
        reset(&options).await.unwrap();
        assert!(!dir.path().join("index.json").exists());
    }
}
