#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use parley::config::Config;
use parley::inference::create_client;
use parley::session::{create_registry, SessionRegistry};
use parley::store::create_store;

fn parse_temperature(s: &str) -> std::result::Result<f64, String> {
    let t: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=2.0).contains(&t) {
        return Err("temperature must be between 0.0 and 2.0".to_string());
    }
    Ok(t)
}

/// `parley` - durable conversation memory for chat services.
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Durable, strictly isolated conversation memory.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat within a session
    #[command(long_about = "\
Chat within a session.

Opens an interactive loop against the named session, restoring its \
history from the durable store. Use --message for a single-shot turn \
without entering interactive mode.

Examples:
  parley chat --session alice                 # interactive session
  parley chat --session alice -m \"hi there\"   # single turn
  parley chat --session alice --model gpt-4o --temperature 0.2")]
    Chat {
        /// Session key; conversations with the same key share history
        #[arg(short, long)]
        session: String,

        /// Single message mode (don't enter interactive mode)
        #[arg(short, long)]
        message: Option<String>,

        /// Model to use
        #[arg(long)]
        model: Option<String>,

        /// Temperature (0.0 - 2.0)
        #[arg(short, long, value_parser = parse_temperature)]
        temperature: Option<f64>,
    },

    /// Show a session's conversation history
    History {
        /// Session key
        #[arg(short, long)]
        session: String,

        /// Emit history as JSON
        #[arg(long)]
        json: bool,
    },

    /// Truncate a session back to its initial state
    Reset {
        /// Session key
        #[arg(short, long)]
        session: String,

        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show configuration and store health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parley=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load_or_init().await?;

    match cli.command {
        Commands::Chat {
            session,
            message,
            model,
            temperature,
        } => {
            if let Some(model) = model {
                config.default_model = Some(model);
            }
            if let Some(temperature) = temperature {
                config.default_temperature = temperature;
            }
            let registry = build_registry(&config)?;
            run_chat(&config, &registry, &session, message).await
        }
        Commands::History { session, json } => {
            let registry = build_registry(&config)?;
            let history = registry.resolve(&session)?.history().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else if history.is_empty() {
                println!("(no turns yet)");
            } else {
                for turn in &history {
                    println!("[{}] {}", turn.role, turn.content);
                }
            }
            Ok(())
        }
        Commands::Reset { session, yes } => {
            if !yes {
                eprintln!("Use --yes to confirm resetting session '{session}'.");
                return Ok(());
            }
            let registry = build_registry(&config)?;
            registry.resolve(&session)?.reset().await?;
            println!("✓ Session '{session}' reset.");
            Ok(())
        }
        Commands::Status => {
            let store = create_store(&config.store, &config.workspace_dir)?;
            let healthy = store.health_check().await;
            println!("Parley status:\n");
            println!("  Provider:   {}", config.default_provider.as_deref().unwrap_or("-"));
            println!("  Model:      {}", config.default_model.as_deref().unwrap_or("-"));
            println!("  Store:      {}", store.name());
            println!(
                "  Health:     {}",
                if healthy { "healthy" } else { "unhealthy" }
            );
            println!("  Workspace:  {}", config.workspace_dir.display());
            Ok(())
        }
    }
}

fn build_registry(config: &Config) -> Result<Arc<SessionRegistry>> {
    let store = create_store(&config.store, &config.workspace_dir)?;
    let provider = config.default_provider.as_deref().unwrap_or("openai");
    let client = create_client(provider, config.api_key.as_deref(), config.api_url.as_deref())?;
    Ok(create_registry(store, client, config.session_options()))
}

async fn run_chat(
    config: &Config,
    registry: &Arc<SessionRegistry>,
    session_key: &str,
    message: Option<String>,
) -> Result<()> {
    let actor = registry.resolve(session_key)?;
    let deadline_for_turn =
        || config.turn_deadline().map(|d| tokio::time::Instant::now() + d);

    if let Some(message) = message {
        let reply = actor.handle_turn_until(&message, deadline_for_turn()).await?;
        println!("{reply}");
        return Ok(());
    }

    println!("Session '{session_key}' (empty line or Ctrl-C to exit)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let text = line.trim();
        if text.is_empty() {
            break;
        }

        match actor.handle_turn_until(text, deadline_for_turn()).await {
            Ok(reply) => println!("{reply}"),
            Err(err) => eprintln!("turn failed: {err}"),
        }
    }

    registry.drain().await;
    Ok(())
}
