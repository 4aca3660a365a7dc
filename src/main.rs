// legalbrief command line
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use legalbrief::evaluation::{write_csv, EvaluationStore, Evaluator};
use legalbrief::jargon::find_jargon;
use legalbrief::summarizer::probe_device;
use legalbrief::{logging, AppConfig, FileKind, Pipeline, SummarizationEngine, TextExtractor};

#[derive(Parser)]
#[command(name = "legalbrief")]
#[command(about = "Summarize legal documents and gloss archaic jargon")]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a document and print the result as JSON
    Summarize {
        /// .txt, .pdf, .docx or image file
        file: PathBuf,
    },
    /// Print the text extracted from a document
    Extract {
        file: PathBuf,
    },
    /// Print the legal jargon found in a document as JSON
    Jargon {
        file: PathBuf,
    },
    /// Run the evaluation harness over a corpus and store the scores
    Evaluate {
        /// Directory of reference documents
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Write stored evaluation records to CSV
    Export {
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Show which device inference would run on
    Device,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    logging::init(&config.logging, cli.verbose).context("Failed to set up logging")?;

    match cli.command {
        Commands::Summarize { file } => summarize(config, &file).await?,
        Commands::Extract { file } => {
            let text = extract(&config, &file)?;
            println!("{}", text);
        }
        Commands::Jargon { file } => {
            let text = extract(&config, &file)?;
            println!("{}", serde_json::to_string_pretty(&find_jargon(&text))?);
        }
        Commands::Evaluate { corpus } => evaluate(config, corpus)?,
        Commands::Export { out } => export(&config, &out)?,
        Commands::Device => {
            let device = probe_device(config.model.device, config.model.cuda_device_id);
            println!("{}", device);
        }
    }

    Ok(())
}

fn extract(config: &AppConfig, file: &Path) -> Result<String> {
    let extractor = TextExtractor::new(&config.ocr);
    extractor
        .extract_path(file, FileKind::from_path(file))
        .with_context(|| format!("Failed to extract text from {}", file.display()))
}

fn build_pipeline(config: AppConfig) -> Result<Pipeline> {
    let engine = SummarizationEngine::load(&config).context("Failed to load summarization model")?;
    let extractor = TextExtractor::new(&config.ocr);
    Ok(Pipeline::new(extractor, Arc::new(engine), config))
}

async fn summarize(config: AppConfig, file: &Path) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let pipeline = Arc::new(build_pipeline(config)?);
    let response = pipeline.process_upload_with_timeout(filename, bytes).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn evaluate(config: AppConfig, corpus: Option<PathBuf>) -> Result<()> {
    let corpus = corpus.unwrap_or_else(|| config.evaluation.corpus_dir.clone());
    let database = config.evaluation.database.clone();
    let pipeline = build_pipeline(config)?;

    let report = Evaluator::new(&pipeline)
        .run(&corpus)
        .with_context(|| format!("Failed to read corpus {}", corpus.display()))?;

    let mut store = EvaluationStore::open(Some(&database))
        .with_context(|| format!("Failed to open {}", database.display()))?;
    let stored = store.insert_all(&report.records)?;
    info!("💾 Stored {} evaluations in {}", stored, database.display());

    for r in &report.records {
        println!(
            "{}\trouge_l={:.4}\tgrade={:.2}\tlatency={:.2}s",
            r.file_id, r.rouge_l, r.readability_grade, r.latency_seconds
        );
    }
    for f in &report.failures {
        println!("{}\tFAILED\t{}", f.file_id, f.error);
    }
    if let Some(mean) = report.mean_rouge_l() {
        println!("mean rouge_l={:.4} over {} documents", mean, report.records.len());
    }
    Ok(())
}

fn export(config: &AppConfig, out: &Path) -> Result<()> {
    let store = EvaluationStore::open(Some(&config.evaluation.database))
        .with_context(|| format!("Failed to open {}", config.evaluation.database.display()))?;
    let records = store.all()?;
    let file = File::create(out).with_context(|| format!("Failed to create {}", out.display()))?;
    write_csv(&records, BufWriter::new(file))?;
    info!("📄 Exported {} records to {}", records.len(), out.display());
    Ok(())
}
