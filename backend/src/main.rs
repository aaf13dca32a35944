//! Gateway CLI - multi-domain analysis gateway
//!
//! # Main Commands
//!
//! ```bash
//! gateway serve                       # Start HTTP server (port 3000)
//! gateway domains                     # List analysis domains
//! gateway artifacts list --limit 20   # Show recent artifacts
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! gateway extract report.pdf                       # Show extracted content
//! gateway analyze --domain construction @site.json # Run one analyzer
//! ```

use clap::{Parser, Subcommand};
use gateway::api::logs::init_tracing;
use gateway::normalizer::Upload;
use gateway::{AnalyzerRegistry, AppContext, GatewayConfig, Normalizer, Payload};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gateway")]
#[command(about = "Multi-domain analysis gateway", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (default: GATEWAY_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Artifact database (default: GATEWAY_DB)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// List registered analysis domains
    Domains,

    /// Extract text or table content from a file and print it as JSON
    Extract {
        /// Input file
        input: PathBuf,
    },

    /// Run one domain analyzer on a JSON payload (nothing is recorded)
    Analyze {
        /// Domain code
        #[arg(short, long)]
        domain: String,

        /// Inline JSON object, or @path to a JSON file
        payload: String,
    },

    /// Inspect or clear the artifact log
    Artifacts {
        /// Artifact database (default: GATEWAY_DB)
        #[arg(long, global = true)]
        db: Option<PathBuf>,

        #[command(subcommand)]
        action: ArtifactAction,
    },
}

#[derive(Subcommand)]
enum ArtifactAction {
    /// Show recent artifacts, newest first
    List {
        /// Maximum number of records
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Remove every artifact
    Clear,

    /// Artifact counts per domain
    Stats,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present) before the log filter is read
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let result = match GatewayConfig::from_env() {
        Ok(config) => run(cli.command, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve { port, db } => cmd_serve(apply_overrides(config, port, db)).await,
        Commands::Domains => cmd_domains(&config),
        Commands::Extract { input } => cmd_extract(&config, input),
        Commands::Analyze { domain, payload } => cmd_analyze(&domain, &payload),
        Commands::Artifacts { db, action } => cmd_artifacts(apply_overrides(config, None, db), action),
    }
}

fn apply_overrides(mut config: GatewayConfig, port: Option<u16>, db: Option<PathBuf>) -> GatewayConfig {
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(db) = db {
        config = config.with_db_path(db);
    }
    config
}

async fn cmd_serve(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let context = AppContext::from_config(config)?;
    gateway::server::start_server(context).await?;
    Ok(())
}

fn cmd_domains(config: &GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = AnalyzerRegistry::builtin().with_fallback_descriptors(config.fallback_domains);
    for domain in registry.list() {
        println!("{:<32} {}", domain.code, domain.description);
    }
    Ok(())
}

fn cmd_extract(config: &GatewayConfig, input: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(&input)?;
    let filename = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("input")
        .to_string();

    let content = Normalizer::new(&config.limits).extract(&Upload::new(filename, bytes))?;
    eprintln!(
        "Extracted {:?} content: {} rows, {} chars{}",
        content.kind,
        content.rows.len(),
        content.text.chars().count(),
        if content.truncated { " (truncated)" } else { "" }
    );
    println!("{}", serde_json::to_string_pretty(&content)?);
    Ok(())
}

fn cmd_analyze(domain: &str, payload: &str) -> Result<(), Box<dyn std::error::Error>> {
    let raw = match payload.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)?,
        None => payload.to_string(),
    };
    let payload: Payload = match serde_json::from_str(&raw)? {
        Value::Object(map) => map,
        _ => return Err("payload must be a JSON object".into()),
    };

    let registry = AnalyzerRegistry::builtin();
    let analyzer = registry
        .resolve(domain)
        .ok_or_else(|| format!("Unknown domain: {}", domain))?;

    let output = analyzer.analyze(&payload)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_artifacts(config: GatewayConfig, action: ArtifactAction) -> Result<(), Box<dyn std::error::Error>> {
    let context = AppContext::from_config(config)?;
    let log = context.orchestrator.artifacts();

    match action {
        ArtifactAction::List { limit } => {
            let records = log.list(limit)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        ArtifactAction::Clear => {
            let removed = log.clear()?;
            eprintln!("Removed {} artifacts", removed);
        }
        ArtifactAction::Stats => {
            let stats = log.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
