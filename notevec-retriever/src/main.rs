use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use notevec_embed::{CohereClient, EmbeddingProvider, RerankProvider};
use notevec_retriever::config::Config;
use notevec_retriever::indexing::{Indexer, NoteWatcher, Progress, WatcherConfig};
use notevec_retriever::search::{SearchResult, Searcher};
use notevec_retriever::storage::NoteIndex;

/// Semantic search over a directory of Markdown notes.
#[derive(Parser, Debug)]
#[command(name = "notevec", version, about, long_about = None)]
struct Cli {
    /// Override the configured notes directory
    #[arg(long)]
    notes_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index the notes directory incrementally
    Index {
        /// Reindex every note, ignoring recorded modification times
        #[arg(long)]
        full: bool,
    },
    /// Watch the notes directory and reindex changed notes
    Watch,
    /// Search the index
    Search {
        query: String,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show index statistics
    Stats,
    /// Validate configuration and API credentials
    Check,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(dir) = cli.notes_dir {
        config.notes_dir = Some(dir);
    }

    match cli.command {
        Command::Index { full } => run_index(&config, full).await,
        Command::Watch => run_watch(&config).await,
        Command::Search { query, json } => run_search(&config, &query, json).await,
        Command::Stats => run_stats(&config).await,
        Command::Check => run_check(&config).await,
    }
}

async fn open_store(config: &Config) -> Result<NoteIndex> {
    NoteIndex::open(&Config::db_path()?, config.embed_dim).await
}

fn build_client(config: &Config) -> Result<Arc<CohereClient>> {
    Ok(Arc::new(
        CohereClient::new(config.provider_config()?).context("failed to build provider client")?,
    ))
}

async fn run_index(config: &Config, full: bool) -> Result<()> {
    let notes_dir = config.notes_dir()?.to_path_buf();
    let store = open_store(config).await?;
    let client = build_client(config)?;
    let indexer = Indexer::new(store.clone(), client as Arc<dyn EmbeddingProvider>, notes_dir);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("[{pos}/{len}] {msg}")
            .context("invalid progress template")?,
    );
    let progress = {
        let bar = bar.clone();
        move |p: Progress| {
            if p.total > 0 {
                bar.set_length(p.total as u64);
                bar.set_position(p.current as u64);
                bar.set_message(p.message);
            } else if !p.message.is_empty() {
                bar.println(p.message);
            }
        }
    };

    indexer.index(full, Some(&progress)).await?;
    bar.finish_and_clear();

    println!(
        "index complete: {} documents, {} chunks",
        store.document_count().await?,
        store.chunk_count().await?
    );
    Ok(())
}

async fn run_watch(config: &Config) -> Result<()> {
    let notes_dir = config.notes_dir()?.to_path_buf();
    let store = open_store(config).await?;
    let client = build_client(config)?;
    let indexer = Arc::new(Indexer::new(
        store,
        client as Arc<dyn EmbeddingProvider>,
        notes_dir.clone(),
    ));

    let mut watcher = NoteWatcher::new(indexer, WatcherConfig::default());
    watcher.start()?;
    println!(
        "watching {} for changes (ctrl-c to stop)",
        notes_dir.display()
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    println!("stopping watcher...");
    watcher.stop().await
}

async fn run_search(config: &Config, query: &str, json: bool) -> Result<()> {
    let store = open_store(config).await?;
    let client = build_client(config)?;
    let searcher = Searcher::new(
        store,
        client.clone() as Arc<dyn EmbeddingProvider>,
        client as Arc<dyn RerankProvider>,
    );

    let results = searcher.search(query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("no results");
        return Ok(());
    }
    for result in &results {
        print_result(result);
    }
    Ok(())
}

fn print_result(result: &SearchResult) {
    println!(
        "{:2}. {:.3}  {}:{}-{}",
        result.rank, result.score, result.path, result.start_line, result.end_line
    );
    if !result.heading.is_empty() {
        println!("    {}", result.heading);
    }
    println!("    {}", snippet(&result.content, 160));
}

/// First `max_len` bytes of `content` on one line, elided if truncated.
fn snippet(content: &str, max_len: usize) -> String {
    let flat = content.replace('\n', " ");
    if flat.len() <= max_len {
        return flat;
    }
    let mut cut = max_len;
    while !flat.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &flat[..cut])
}

async fn run_stats(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    println!("documents:  {}", store.document_count().await?);
    println!("chunks:     {}", store.chunk_count().await?);
    println!("embeddings: {}", store.embedding_count().await?);
    println!("dimension:  {}", store.embedding_dimension());
    Ok(())
}

async fn run_check(config: &Config) -> Result<()> {
    let notes_dir = config.notes_dir()?;
    anyhow::ensure!(
        notes_dir.is_dir(),
        "notes directory {} does not exist",
        notes_dir.display()
    );

    let client = build_client(config)?;
    client
        .validate_key()
        .await
        .context("API key validation failed")?;

    println!("configuration OK");
    println!("notes dir: {}", notes_dir.display());
    println!("index db:  {}", Config::db_path()?.display());
    Ok(())
}
