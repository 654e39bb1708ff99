use anyhow::{Context, Result};
use authgate_rules::config::Config;
use authgate_rules::repository::{
    ActivityRepositoryImpl, DbPool, RuleRepository, RuleRepositoryImpl,
};
use authgate_rules::{telemetry, AuthContext, RulesEngine};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Dry-run the authentication rules against the live rule store
#[derive(Debug, Parser)]
#[command(name = "authgate-rules", version, about)]
struct Cli {
    /// Print Prometheus metrics after the command (requires METRICS_ENABLED)
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate an authentication context and print the decision as JSON
    Simulate {
        /// Path to an AuthContext JSON document, or `-` for stdin
        #[arg(long, short)]
        context: PathBuf,
    },
    /// List enabled rules in evaluation order
    Rules,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let prometheus = telemetry::init(&config.telemetry)?;

    let pool = DbPool::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to rules database");

    let rule_repo = Arc::new(RuleRepositoryImpl::new(pool.inner().clone()));

    match cli.command {
        Command::Simulate { context } => {
            let context = read_context(&context)?;
            let activity_repo = Arc::new(ActivityRepositoryImpl::new(pool.inner().clone()));
            let engine = RulesEngine::new(rule_repo, activity_repo, config.engine.clone());

            let outcome = engine.evaluate(&context).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Rules => {
            let rules = rule_repo.list_enabled_by_priority().await?;
            for rule in rules {
                println!("{:>6}  {:>5}  {}", rule.id, rule.priority, rule.name);
            }
        }
    }

    if cli.metrics {
        match prometheus {
            Some(handle) => print!("{}", handle.render()),
            None => eprintln!("metrics requested but METRICS_ENABLED is not set"),
        }
    }

    Ok(())
}

fn read_context(path: &Path) -> Result<AuthContext> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read context from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read context file {}", path.display()))?
    };

    serde_json::from_str(&raw).context("context is not a valid AuthContext document")
}
