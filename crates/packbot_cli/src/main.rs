use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use packbot_core::predictor::dataset::save_csv;
use packbot_core::{
    build_backend, evaluate_cases, load_csv, load_model_json, save_model_json, synthetic,
    BackendKind, EvalCase, KnowledgeBase, ModelFiles, PackagingModel, PredictRequest, Resolver,
    DEFAULT_MODEL_PATH, DEFAULT_SAMPLES, DEFAULT_SEED,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_REQUIRED_PASS_RATE: f32 = 0.8;

#[derive(Debug, Parser)]
#[command(name = "packbot")]
#[command(about = "Packaging FAQ chatbot and packaging-type model tools")]
struct Cli {
    /// Similarity backend used for semantic search.
    #[arg(long, global = true, env = "PACKBOT_BACKEND", default_value_t = BackendKind::Tfidf)]
    backend: BackendKind,

    /// Sentence-transformer checkpoint (.safetensors). Requires --tokenizer-path.
    #[arg(long, global = true, env = "PACKBOT_MODEL_PATH")]
    model_path: Option<PathBuf>,

    #[arg(long, global = true, env = "PACKBOT_TOKENIZER_PATH")]
    tokenizer_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a single question the way the chat endpoint would.
    Ask {
        #[arg(long)]
        question: String,
    },
    /// Run a JSON file of expected answers through the resolver.
    Eval {
        #[arg(long)]
        cases: PathBuf,
        #[arg(long, default_value_t = DEFAULT_REQUIRED_PASS_RATE)]
        min_pass_rate: f32,
    },
    /// Train the packaging classifier and write it to disk.
    Retrain {
        #[arg(long, default_value = DEFAULT_MODEL_PATH)]
        output: PathBuf,
        /// Training CSV; synthetic data is generated when omitted.
        #[arg(long)]
        data: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_SAMPLES)]
        samples: usize,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        /// Also write the training rows to this CSV.
        #[arg(long)]
        dump_data: Option<PathBuf>,
    },
    /// Predict a packaging type with a saved model.
    Predict {
        #[arg(long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
        #[arg(long)]
        date: String,
        #[arg(long)]
        temperature: f64,
        #[arg(long)]
        humidity: f64,
        #[arg(long)]
        transportation_time: f64,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
}

fn make_resolver(cli: &Cli) -> Result<Resolver> {
    let kb = Arc::new(KnowledgeBase::packaging());
    let files = ModelFiles {
        model_path: cli.model_path.clone(),
        tokenizer_path: cli.tokenizer_path.clone(),
    };
    let backend = build_backend(cli.backend, kb.corpus(), &files)?;
    Ok(Resolver::new(kb, backend))
}

fn read_eval_cases_json(path: &Path) -> Result<Vec<EvalCase>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let cases: Vec<EvalCase> = serde_json::from_reader(file).context("parse eval cases json")?;
    Ok(cases)
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Ask { question } => {
            let resolver = make_resolver(&cli)?;
            let decision = resolver.resolve(question)?;

            println!(
                "backend={} method={} score={}",
                cli.backend,
                decision
                    .method
                    .map(|m| m.as_str())
                    .unwrap_or("null"),
                decision
                    .score
                    .map(|s| format!("{s:.4}"))
                    .unwrap_or_else(|| "null".to_string())
            );
            println!("reply={}", decision.reply);
            for c in &decision.candidates {
                println!(
                    "candidate score={:.4}{} text={}",
                    c.score,
                    if c.method.is_some() { " fuzzy" } else { "" },
                    c.text
                );
            }
        }
        Commands::Eval {
            cases,
            min_pass_rate,
        } => {
            let resolver = make_resolver(&cli)?;
            let cases = read_eval_cases_json(cases)?;
            let summary = evaluate_cases(&resolver, &cases)?;
            let meets = summary.pass_rate >= *min_pass_rate;

            println!(
                "backend={} total={} passed={} failed={} pass_rate={:.4} required={:.4} meets_threshold={}",
                cli.backend,
                summary.total,
                summary.passed,
                summary.failed,
                summary.pass_rate,
                min_pass_rate,
                meets
            );
            for o in &summary.outcomes {
                println!(
                    "case={} passed={} method={} score={} latency={:.1}ms",
                    o.case_id,
                    o.passed,
                    o.actual_method.map(|m| m.as_str()).unwrap_or("null"),
                    o.score
                        .map(|s| format!("{s:.4}"))
                        .unwrap_or_else(|| "null".to_string()),
                    o.latency_ms
                );
            }

            if !meets {
                bail!(
                    "pass rate {:.4} below required {:.4}",
                    summary.pass_rate,
                    min_pass_rate
                );
            }
        }
        Commands::Retrain {
            output,
            data,
            samples,
            seed,
            dump_data,
        } => {
            let rows = match data {
                Some(path) => load_csv(path)?,
                None => synthetic(*samples, *seed),
            };
            info!(rows = rows.len(), from_csv = data.is_some(), "training packaging model");
            if let Some(path) = dump_data {
                save_csv(path, &rows)?;
            }

            let model = PackagingModel::fit(&rows)?;
            save_model_json(output, &model)?;
            println!(
                "samples={} classes={} trained_at={}",
                model.samples,
                model.classes.join(","),
                model.trained_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
            );
            println!("Model retrained and saved as {}", output.display());
        }
        Commands::Predict {
            model,
            date,
            temperature,
            humidity,
            transportation_time,
        } => {
            let model = load_model_json(model)?;
            let request = PredictRequest {
                date: Some(date.clone()),
                temperature: Some(*temperature),
                humidity: Some(*humidity),
                transportation_time: Some(*transportation_time),
            };
            let report = model.predict_request(&request)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
