//! # Grant Beacon CLI (`beacon`)
//!
//! ## Usage
//!
//! ```bash
//! beacon --config ./config/beacon.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `beacon serve` | Start the HTTP server |
//! | `beacon run --name N --affiliation A` | Run the pipeline once and print the envelope |
//! | `beacon check` | Show credential status for each upstream |
//!
//! API keys are read from the environment; a `.env` file in the working
//! directory is loaded first if present.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use grant_beacon::config::{self, Config, Credential};
use grant_beacon::models::ResearcherRequest;
use grant_beacon::pipeline::{Pipeline, Services};
use grant_beacon::server;

#[derive(Parser)]
#[command(
    name = "beacon",
    about = "Grant Beacon: match researchers with open funding opportunities",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/beacon.toml")]
    config: PathBuf,

    /// Ignore `--config` and use built-in defaults.
    #[arg(long, global = true)]
    defaults: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Run the pipeline for one researcher and print the JSON envelope.
    Run {
        #[arg(long)]
        name: String,

        #[arg(long)]
        affiliation: String,
    },

    /// Show whether each upstream credential is usable. Keys are never printed.
    Check,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.json);

    let cfg = if cli.defaults {
        Config::default()
    } else {
        config::load_config(&cli.config)?
    };

    match cli.command {
        Commands::Serve => {
            let services = Services::from_env(&cfg)?;
            server::run_server(cfg, services).await?;
        }
        Commands::Run { name, affiliation } => {
            let req = ResearcherRequest::new(name, affiliation)
                .map_err(|issue| anyhow::anyhow!(issue.message))?;
            let services = Services::from_env(&cfg)?;
            let pipeline = Pipeline::new(services, std::sync::Arc::new(cfg));
            let result = pipeline.run(&req).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Check => {
            println!("{:<10} {:<22} STATUS", "SERVICE", "ENV");
            for (service, upstream) in [("profile", &cfg.profile), ("chat", &cfg.chat)] {
                let credential = Credential::from_env(upstream);
                println!(
                    "{:<10} {:<22} {}",
                    service,
                    upstream.api_key_env,
                    credential.status()
                );
            }
            println!("{:<10} {:<22} {}", "grants", "-", "no key required");
        }
    }

    Ok(())
}
