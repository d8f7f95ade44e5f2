//! DocuMind - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use documind::cli::config::GeneratorBackend;
use documind::index::snapshot;
use documind::rag::{source_label, OllamaGenerator};
use documind::{
    cli::{Args, Commands, Config},
    DocumentPipeline, IngestOutcome,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    debug!(?config, "configuration loaded");

    match &args.command {
        Commands::Ingest { files } => ingest(&args, &config, files)?,
        Commands::Ask { question, k } => ask(&config, question, *k).await?,
        Commands::Search { query, k } => search(&config, query, *k)?,
        Commands::Stats => show_stats(&config)?,
        Commands::Clear => clear(&config)?,
        Commands::Config => show_config(&args, &config),
    }

    Ok(())
}

/// RUST_LOG wins over the -q/-v flags
fn init_tracing(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.verbosity().log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Build a pipeline and restore the persisted index if there is one
fn open_pipeline(config: &Config, top_k: Option<usize>) -> Result<DocumentPipeline> {
    let mut pipeline = DocumentPipeline::new(
        config.embedder()?,
        config.generator()?,
        config.chunker()?,
    )
    .with_top_k(top_k.unwrap_or(config.retrieval.top_k));

    let location = config.snapshot_location();
    if snapshot::exists(&location) {
        pipeline
            .load(&location)
            .with_context(|| format!("failed to restore index from {}", location.display()))?;
        debug!(records = pipeline.index().len(), "index restored");
    }

    Ok(pipeline)
}

fn ingest(args: &Args, config: &Config, files: &[std::path::PathBuf]) -> Result<()> {
    let mut pipeline = open_pipeline(config, None)?;

    let pb = if args.verbosity().show_progress() {
        ProgressBar::new(files.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let mut added = 0;
    let mut failed = 0;
    for path in files {
        pb.set_message(path.display().to_string());
        match pipeline.ingest_path(path) {
            Ok(IngestOutcome::Indexed { filename, segments }) => {
                added += 1;
                pb.println(format!(
                    "{} {} ({} fragments)",
                    "✓".green(),
                    filename,
                    segments
                ));
            }
            Ok(IngestOutcome::AlreadyIndexed { filename }) => {
                pb.println(format!("{} {} already indexed", "•".yellow(), filename));
            }
            Ok(IngestOutcome::Empty { filename }) => {
                pb.println(format!("{} {} contains no text", "•".yellow(), filename));
            }
            Err(e) => {
                failed += 1;
                warn!(path = %path.display(), error = %e, "ingest failed");
                pb.println(format!("{} {}: {}", "✗".red(), path.display(), e));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if added > 0 {
        let location = config.snapshot_location();
        pipeline
            .save(&location)
            .with_context(|| format!("failed to save index to {}", location.display()))?;
        debug!(location = %location.display(), "index saved");
    }

    let stats = pipeline.stats();
    println!(
        "\n{} {} added, {} failed. Index holds {} documents / {} fragments.",
        "Done:".bold(),
        added,
        failed,
        stats.documents,
        stats.chunks
    );

    if failed > 0 {
        anyhow::bail!("{} file(s) could not be ingested", failed);
    }
    Ok(())
}

async fn ask(config: &Config, question: &str, k: Option<usize>) -> Result<()> {
    if config.generator.backend == GeneratorBackend::Ollama {
        let ollama =
            OllamaGenerator::with_config(&config.generator.ollama_url, &config.generator.model)?;
        if !ollama.health_check().await {
            eprintln!("{}", "Ollama is not running! Start with: ollama serve".red());
            anyhow::bail!("Ollama not reachable at {}", config.generator.ollama_url);
        }
    }

    let pipeline = open_pipeline(config, k)?;
    if pipeline.index().is_empty() {
        println!("No documents indexed yet. Add some with: documind ingest <files>");
        return Ok(());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let answer = pipeline.query(question).await;
    spinner.finish_and_clear();
    let answer = answer?;

    println!("{}", "Answer:".bold());
    println!("{}\n", answer.answer);
    println!(
        "{} {:.1}%  ({} sources)",
        "Confidence:".bold(),
        answer.confidence * 100.0,
        answer.source_count
    );

    for (i, source) in documind::rag::format_sources(&answer.sources, None)
        .iter()
        .enumerate()
    {
        if i == 0 {
            println!();
        }
        println!("  {}", source.dimmed());
    }

    Ok(())
}

fn search(config: &Config, query: &str, k: Option<usize>) -> Result<()> {
    let pipeline = open_pipeline(config, k)?;
    let hits = pipeline.search(query, pipeline.top_k())?;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{}. {} {}",
            rank + 1,
            format!("[{:.3}]", hit.score).cyan(),
            source_label(hit).bold()
        );
        println!("   {}\n", hit.text);
    }

    Ok(())
}

fn show_stats(config: &Config) -> Result<()> {
    let pipeline = open_pipeline(config, None)?;
    let stats = pipeline.stats();

    println!("{}", "Index statistics".bold());
    println!("  Documents:  {}", stats.documents);
    println!("  Fragments:  {}", stats.chunks);
    println!("  Vectors:    {}", stats.index_size);
    println!("  Dimension:  {}", stats.dimension);
    println!("  Embedder:   {}", pipeline.index().embedder().name());

    Ok(())
}

fn clear(config: &Config) -> Result<()> {
    let location = config.snapshot_location();
    let mut removed = false;

    for path in [snapshot::vectors_path(&location), snapshot::sidecar_path(&location)] {
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            removed = true;
        }
    }

    if removed {
        println!("✓ Cleared index at {}", location.display());
    } else {
        println!("No index found.");
    }

    Ok(())
}

fn show_config(args: &Args, config: &Config) {
    println!("{}", "DocuMind Configuration".bold());
    println!();

    println!("Chunking:");
    println!("  Chunk size: {}", config.chunking.chunk_size);
    println!("  Overlap:    {}", config.chunking.overlap);
    println!();

    println!("Retrieval:");
    println!("  Top k:      {}", config.retrieval.top_k);
    println!();

    println!("Embedding:");
    println!("  Backend:    {:?}", config.embedding.backend);
    println!("  Model:      {}", config.embedding.model_id);
    println!("  Dimension:  {}", config.embedding.dimension);
    println!();

    println!("Generator:");
    println!("  Backend:    {:?}", config.generator.backend);
    println!("  Ollama URL: {}", config.generator.ollama_url);
    println!("  Model:      {}", config.generator.model);
    println!();

    println!("Paths:");
    println!("  Snapshot:   {}", config.snapshot_location().display());
    match args.config.as_ref() {
        Some(path) => println!("  Config:     {}", path.display()),
        None => {
            if let Some(path) = Config::default_path() {
                println!("  Config:     {} (default)", path.display());
            }
        }
    }
    println!("  Verbosity:  {:?}", args.verbosity());
}
