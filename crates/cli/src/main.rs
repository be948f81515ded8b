use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parley_engine::config::{default_config_path, load_config, load_config_from_path};
use parley_engine::{ParleyConfig, Session};
use parley_plugin::PluginKind;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{Level, debug};

mod inspect;
mod render;

use inspect::SessionInspectPlugin;

#[derive(Debug, Parser)]
#[command(name = "parley", version, about = "Resolve chat-style command lines into namespaced commands")]
struct Cli {
    /// Configuration file; defaults to $PARLEY_CONFIG_PATH or <config dir>/parley/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a line and print the result without executing it
    Parse { line: Vec<String> },
    /// Parse and execute a single line
    Run {
        line: Vec<String>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read lines from stdin and execute each one
    Repl,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_from_path(path).with_context(|| format!("loading {}", path.display()))?,
        None => load_config().with_context(|| format!("loading {}", default_config_path().display()))?,
    };

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Parse { line } => {
            let session = build_session(&config).await?;
            let parsed = session.parse_with_suggestions(&line.join(" "));
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Commands::Run { line, json } => {
            let session = build_session(&config).await?;
            let result = session.execute_from_string(&line.join(" ")).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", render::render_result(&result));
            }
            if !result.success {
                std::process::exit(1);
            }
        }
        Commands::Repl => {
            let session = build_session(&config).await?;
            run_repl(&session).await?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn build_session(config: &ParleyConfig) -> Result<Session> {
    let session = Session::new(config);
    let inspect = SessionInspectPlugin::new(session.plugins(), config.clone());
    session
        .register_plugin(Arc::new(inspect), PluginKind::Internal)
        .await
        .context("registering built-in plugins")?;
    debug!(commands = session.commands().len(), "Session ready");
    Ok(session)
}

async fn run_repl(session: &Session) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        let result = session.execute_from_string(line).await;
        stdout.write_all(render::render_result(&result).as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }
    Ok(())
}
