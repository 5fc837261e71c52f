//! akh-mind CLI: self-organizing ontology engine.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use akh_mind::config::MindConfig;
use akh_mind::mind::{Command, Mind};
use akh_mind::value::Value;

#[derive(Parser)]
#[command(name = "akh-mind", version, about = "Self-organizing ontology engine")]
struct Cli {
    /// Mind configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment text into every interpretation over the known ideas.
    Interpret {
        /// Text to interpret.
        text: String,

        /// Words to learn first (comma-separated, e.g. "hi,h,i").
        #[arg(long)]
        learn: Option<String>,
    },

    /// Execute a JSON array of commands against one mind.
    Run {
        /// Path to a JSON file with commands.
        script: PathBuf,
    },

    /// Show ontology statistics.
    Info {
        /// Words to learn first (comma-separated).
        #[arg(long)]
        learn: Option<String>,
    },
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
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MindConfig::load(path)?,
        None => MindConfig::default(),
    };
    let mut mind = Mind::new(config)?;

    match cli.command {
        Commands::Interpret { text, learn } => {
            learn_words(&mut mind, learn.as_deref())?;
            let forest = mind.interpret_text(&text);
            println!("{}", serde_json::to_string_pretty(&forest).into_diagnostic()?);
        }

        Commands::Run { script } => {
            let content = std::fs::read_to_string(&script).into_diagnostic()?;
            let commands: Vec<Command> = serde_json::from_str(&content).into_diagnostic()?;
            for command in commands {
                let answer = mind.execute(command)?;
                println!("{}", serde_json::to_string(&answer).into_diagnostic()?);
            }
        }

        Commands::Info { learn } => {
            learn_words(&mut mind, learn.as_deref())?;
            println!("mind: {}", mind.name());
            print!("{}", mind.stats());
        }
    }

    Ok(())
}

fn learn_words(mind: &mut Mind, words: Option<&str>) -> Result<()> {
    let Some(words) = words else {
        return Ok(());
    };
    for word in words.split(',').map(str::trim).filter(|w| !w.is_empty()) {
        mind.execute(Command::Create {
            value: Value::text(word),
        })?;
    }
    Ok(())
}
