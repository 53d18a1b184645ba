//! invenova CLI: voice-driven inventory query resolution engine.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use invenova::context::Session;
use invenova::correction::OllamaCorrector;
use invenova::encoder::{HashedNgramEncoder, OllamaConfig, OllamaEncoder, TextEncoder};
use invenova::engine::{Engine, EngineConfig};
use invenova::store::{CsvColumns, MemoryStore};

#[derive(Parser)]
#[command(name = "invenova", version, about = "Inventory query resolution engine")]
struct Cli {
    /// Inventory CSV file to load.
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// CSV column holding item names.
    #[arg(long, global = true, default_value = "item_name")]
    item_column: String,

    /// CSV column holding quantities.
    #[arg(long, global = true, default_value = "quantity")]
    quantity_column: String,

    /// CSV column holding locations.
    #[arg(long, global = true, default_value = "location")]
    location_column: String,

    /// Engine config TOML with threshold and alias overrides.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use a local Ollama server for embeddings and correction.
    #[arg(long, global = true)]
    ollama: bool,

    /// Ollama base URL.
    #[arg(long, global = true, default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Correction model name.
    #[arg(long, global = true, default_value = "llama3.2")]
    model: String,

    /// Embedding model name.
    #[arg(long, global = true, default_value = "nomic-embed-text")]
    embed_model: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single utterance and print the reply.
    Query {
        /// The transcribed utterance.
        text: String,
    },

    /// Interactive conversation over stdin.
    Repl,

    /// Show engine info and statistics.
    Info,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let engine = build_engine(&cli)?;

    match cli.command {
        Commands::Query { text } => {
            let mut session = Session::new();
            let outcome = engine.handle_turn(&mut session, &text);
            println!("{}", outcome.reply);
        }

        Commands::Repl => {
            println!("invenova ready. Type an utterance, or 'exit' to quit.");
            let stdin = std::io::stdin();
            let mut session = Session::new();
            loop {
                print!("> ");
                std::io::stdout().flush().into_diagnostic()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line).into_diagnostic()? == 0 {
                    break;
                }
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                    break;
                }
                let outcome = engine.handle_turn(&mut session, line);
                println!("{}", outcome.reply);
            }
            println!("Goodbye.");
        }

        Commands::Info => {
            println!("{}", engine.info());
        }
    }

    Ok(())
}

/// Assemble the engine from CLI options: CSV-backed store, config
/// overrides, and either the offline encoder or Ollama-backed
/// collaborators.
fn build_engine(cli: &Cli) -> Result<Engine> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };

    let store = match &cli.csv {
        Some(path) => {
            let columns = CsvColumns {
                item: cli.item_column.clone(),
                quantity: cli.quantity_column.clone(),
                location: cli.location_column.clone(),
            };
            MemoryStore::from_csv(path, &columns).into_diagnostic()?
        }
        None => {
            tracing::warn!("no --csv given; starting with an empty inventory");
            MemoryStore::new()
        }
    };

    let encoder: Box<dyn TextEncoder>;
    let corrector: Option<Box<dyn invenova::correction::CorrectionModel>>;

    if cli.ollama {
        let embed = OllamaEncoder::new(OllamaConfig {
            base_url: cli.ollama_url.clone(),
            model: cli.embed_model.clone(),
            timeout_secs: 30,
        });
        if embed.probe() {
            encoder = Box::new(embed);
        } else {
            tracing::warn!(url = %cli.ollama_url, "Ollama unreachable; using the built-in encoder");
            encoder = Box::new(HashedNgramEncoder::default());
        }
        corrector = Some(Box::new(OllamaCorrector::new(OllamaConfig {
            base_url: cli.ollama_url.clone(),
            model: cli.model.clone(),
            timeout_secs: 120,
        })));
    } else {
        encoder = Box::new(HashedNgramEncoder::default());
        corrector = None;
    }

    Engine::new(config, Box::new(store), encoder, corrector).into_diagnostic()
}
