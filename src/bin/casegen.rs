//! casegen CLI: generate test cases for a feature description.
//!
//! Usage:
//!   casegen generate (--feature TEXT | --feature-file PATH) [--model ID] [--examples PATH]
//!   casegen retrieve --query TEXT [--examples PATH] [-k N]
//!   casegen models

use casegen::{export, ingest, CaseGenerator, Config, Diagnostic, PipelineError};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(
    name = "casegen",
    version,
    about = "Retrieval-augmented test case generator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate test cases for a feature description
    Generate {
        /// Feature description text
        #[arg(long, conflicts_with = "feature_file")]
        feature: Option<String>,
        /// Read the feature description from a file
        #[arg(long)]
        feature_file: Option<PathBuf>,
        /// Model id (defaults to the configured default model)
        #[arg(long)]
        model: Option<String>,
        /// YAML seed corpus of past examples
        #[arg(long)]
        examples: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Write output to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Echo the raw model response to stderr
        #[arg(long)]
        show_raw: bool,
    },
    /// Show which stored examples a feature retrieves
    Retrieve {
        /// Feature description to match
        #[arg(long)]
        query: String,
        /// YAML seed corpus of past examples
        #[arg(long)]
        examples: Option<PathBuf>,
        /// Number of examples (defaults to the configured retrieval_k)
        #[arg(short)]
        k: Option<usize>,
    },
    /// List known models
    Models,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "casegen=debug" } else { "casegen=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn report(err: &PipelineError) -> i32 {
    let diagnostic: Diagnostic = err.diagnostic();
    match serde_json::to_string_pretty(&diagnostic) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("Error: {}", err),
    }
    1
}

/// Build the generator and load the seed corpus, if any.
fn open_generator(config: &Config, examples: Option<&Path>) -> Result<CaseGenerator, i32> {
    let generator = CaseGenerator::from_config(config).map_err(|e| report(&e))?;
    if let Some(path) = examples {
        let seeds = ingest::load_seed_file(path).map_err(|e| {
            eprintln!("Error: failed to load examples from {}: {}", path.display(), e);
            1
        })?;
        let count = generator.ingest_seeds(&seeds).map_err(|e| report(&e))?;
        tracing::info!(count, path = %path.display(), "loaded seed examples");
    }
    Ok(generator)
}

fn read_feature(feature: Option<String>, feature_file: Option<PathBuf>) -> Result<String, i32> {
    match (feature, feature_file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(&path).map_err(|e| {
            eprintln!("Error: cannot read '{}': {}", path.display(), e);
            1
        }),
        (None, None) => {
            eprintln!("Error: provide --feature or --feature-file");
            Err(1)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_generate(
    config: &Config,
    feature: Option<String>,
    feature_file: Option<PathBuf>,
    model: Option<String>,
    examples: Option<PathBuf>,
    format: OutputFormat,
    output: Option<PathBuf>,
    show_raw: bool,
) -> i32 {
    let feature = match read_feature(feature, feature_file) {
        Ok(f) => f,
        Err(code) => return code,
    };
    let model = model.unwrap_or_else(|| config.default_model.clone());
    if config.model(&model).is_none() {
        tracing::warn!(model = %model, "model not in catalogue, sending anyway");
    }

    let generator = match open_generator(config, examples.as_deref()) {
        Ok(g) => g,
        Err(code) => return code,
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };
    let outcome = match runtime.block_on(generator.generate(&feature, &model)) {
        Ok(o) => o,
        Err(e) => return report(&e),
    };

    if show_raw {
        eprintln!("--- raw model response ---\n{}\n---", outcome.raw_text);
    }
    for rejection in &outcome.rejections {
        eprintln!("Warning: dropped record {}: {}", rejection.index, rejection.reason);
    }
    if outcome.test_cases.is_empty() {
        eprintln!("The model responded but did not return any valid test cases.");
    }

    let rendered = match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&outcome.test_cases) {
            Ok(json) => json + "\n",
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
        OutputFormat::Csv => export::to_csv(&outcome.test_cases),
    };

    match output {
        Some(path) => match std::fs::write(&path, rendered) {
            Ok(()) => {
                eprintln!("Wrote {} test cases to {}", outcome.test_cases.len(), path.display());
                0
            }
            Err(e) => {
                eprintln!("Error: cannot write '{}': {}", path.display(), e);
                1
            }
        },
        None => {
            print!("{}", rendered);
            0
        }
    }
}

fn cmd_retrieve(config: &Config, query: &str, examples: Option<PathBuf>, k: Option<usize>) -> i32 {
    let generator = match open_generator(config, examples.as_deref()) {
        Ok(g) => g,
        Err(code) => return code,
    };
    let k = k.unwrap_or(config.retrieval_k);
    let results = generator.retriever().retrieve(query, k);
    if results.is_empty() {
        println!("No examples retrieved.");
        return 0;
    }
    println!("{:>6}  {}", "SCORE", "FEATURE");
    println!("{}", "-".repeat(72));
    for r in results {
        println!("{:>6.3}  {}", r.score, r.feature_text);
    }
    0
}

fn cmd_models(config: &Config) -> i32 {
    println!("{:<18}  {}", "MODEL", "DESCRIPTION");
    println!("{}", "-".repeat(72));
    for m in &config.models {
        let marker = if m.id == config.default_model { " (default)" } else { "" };
        println!("{:<18}  {}{}", m.id, m.description, marker);
    }
    0
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match Config::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Generate {
            feature,
            feature_file,
            model,
            examples,
            format,
            output,
            show_raw,
        } => cmd_generate(
            &config,
            feature,
            feature_file,
            model,
            examples,
            format,
            output,
            show_raw,
        ),
        Commands::Retrieve { query, examples, k } => cmd_retrieve(&config, &query, examples, k),
        Commands::Models => cmd_models(&config),
    };
    std::process::exit(code);
}
