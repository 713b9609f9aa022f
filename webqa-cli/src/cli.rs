//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use webqa_rag::gemini::{
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, DEFAULT_GENERATION_MODEL,
};

use crate::telemetry::LogFormat;

/// Answer questions from the content of a fixed set of web pages.
#[derive(Debug, Parser)]
#[command(name = "webqa", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub options: Options,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct Options {
    /// Directory holding the persisted index
    #[arg(long, global = true, env = "WEBQA_INDEX_DIR", default_value = "vectorstore")]
    pub index_dir: PathBuf,

    /// Gemini embedding model
    #[arg(long, global = true, env = "WEBQA_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Vector size returned by the embedding model
    #[arg(
        long,
        global = true,
        env = "WEBQA_EMBEDDING_DIMENSIONS",
        default_value_t = DEFAULT_EMBEDDING_DIMENSIONS,
        value_parser = parse_dimensions
    )]
    pub embedding_dimensions: usize,

    /// Gemini generation model
    #[arg(long, global = true, env = "WEBQA_MODEL", default_value = DEFAULT_GENERATION_MODEL)]
    pub model: String,

    /// Maximum characters per chunk
    #[arg(long, global = true, default_value_t = 1000)]
    pub chunk_size: usize,

    /// Maximum characters shared by consecutive chunks
    #[arg(long, global = true, default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[arg(long, global = true, default_value_t = 4)]
    pub top_k: usize,

    /// Minimum seconds between generation calls
    #[arg(long, global = true, env = "WEBQA_MIN_INTERVAL_SECS", default_value_t = 3.0)]
    pub min_interval_secs: f64,

    /// HTTP timeout in seconds for page fetches and generation calls
    #[arg(long, global = true, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch pages and rebuild the index from them.
    Ingest(IngestArgs),

    /// Answer a single question.
    Ask(AskArgs),

    /// Delete the persisted index.
    Reset,

    /// Ask questions interactively.
    Console,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Page URLs to fetch
    pub urls: Vec<String>,

    /// Use already-fetched text for a URL instead of downloading it
    #[arg(long = "file", value_name = "URL=PATH", value_parser = parse_file_source)]
    pub files: Vec<(String, PathBuf)>,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,

    /// Print the answer record as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_dimensions(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("dimensions must be at least 1".to_string()),
        Ok(dims) => Ok(dims),
        Err(e) => Err(format!("invalid dimensions '{raw}': {e}")),
    }
}

/// Parse `URL=PATH`. The split happens at the last `=` so query strings survive.
pub fn parse_file_source(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.rsplit_once('=') {
        Some((origin, path)) if !origin.is_empty() && !path.is_empty() => {
            Ok((origin.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected URL=PATH, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_file_sources() {
        let (origin, path) = parse_file_source("https://a.test/page?id=1=./page.html").unwrap();
        assert_eq!(origin, "https://a.test/page?id=1");
        assert_eq!(path, PathBuf::from("./page.html"));
        assert!(parse_file_source("no-separator").is_err());
        assert!(parse_file_source("=path").is_err());
        assert!(parse_file_source("https://a.test=").is_err());
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "webqa",
            "ask",
            "What is Rust?",
            "--json",
            "--index-dir",
            "/tmp/idx",
            "--top-k",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.options.index_dir, PathBuf::from("/tmp/idx"));
        assert_eq!(cli.options.top_k, 2);
        assert_eq!(cli.options.embedding_dimensions, DEFAULT_EMBEDDING_DIMENSIONS);
        match cli.command {
            Command::Ask(args) => {
                assert_eq!(args.question, "What is Rust?");
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn embedding_dimensions_are_configurable() {
        let cli = Cli::try_parse_from([
            "webqa",
            "ingest",
            "--embedding-model",
            "embedding-001",
            "--embedding-dimensions",
            "3072",
        ])
        .unwrap();
        assert_eq!(cli.options.embedding_dimensions, 3072);
        assert!(Cli::try_parse_from(["webqa", "reset", "--embedding-dimensions", "0"]).is_err());
    }

    #[test]
    fn ingest_accepts_urls_and_files() {
        let cli = Cli::try_parse_from([
            "webqa",
            "ingest",
            "https://a.test",
            "--file",
            "https://b.test=b.txt",
        ])
        .unwrap();
        let Command::Ingest(args) = cli.command else { panic!("expected ingest") };
        assert_eq!(args.urls, ["https://a.test"]);
        assert_eq!(args.files, [("https://b.test".to_string(), PathBuf::from("b.txt"))]);
    }
}
