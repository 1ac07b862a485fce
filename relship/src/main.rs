//! relship CLI
//!
//! Command-line interface for the tag-driven release pipeline.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use relship::{
    archive, config::Config, pipeline, Result, RunSummary,
};

#[derive(Parser)]
#[command(name = "relship")]
#[command(about = "Archive project directories and publish them as release assets and OCI artifacts", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Repository in owner/name form
    #[arg(long, env = "GITHUB_REPOSITORY", global = true)]
    repo: Option<String>,

    /// Platform access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Container registry host
    #[arg(long, default_value = "ghcr.io", global = true)]
    registry: String,

    /// Registry namespace (defaults to the repository owner)
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Root directory holding one subdirectory per project
    #[arg(long, default_value = "projects", global = true)]
    projects_root: PathBuf,

    /// Staging directory for produced archives
    #[arg(long, default_value = "dist", global = true)]
    staging: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for a tag
    Run {
        /// Version tag (e.g. v1.2.3)
        #[arg(short, long)]
        tag: String,

        /// Write a machine-readable run summary to this path
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },

    /// Archive project directories into the staging directory
    Archive,

    /// Reconcile the release for a tag and upload staged archives as assets
    Release {
        #[arg(short, long)]
        tag: String,
    },

    /// Push staged archives to the container registry
    Push {
        #[arg(short, long)]
        tag: String,
    },
}

fn setup_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn load_config(cli: &Cli) -> Result<Config> {
    Config::new(
        cli.repo.as_deref().unwrap_or_default(),
        cli.token.clone().unwrap_or_default(),
        cli.registry.clone(),
        cli.namespace.clone(),
        cli.projects_root.clone(),
        cli.staging.clone(),
    )
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let result = match &cli.command {
        Commands::Run { tag, summary_json } => cmd_run(&cli, tag, summary_json.clone()).await,
        Commands::Archive => cmd_archive(&cli),
        Commands::Release { tag } => cmd_release(&cli, tag).await,
        Commands::Push { tag } => cmd_push(&cli, tag).await,
    };

    if let Err(e) = result {
        eprintln!("[{}] {}", "〤".bright_red().bold(), e);
        std::process::exit(1);
    }
}

async fn cmd_run(cli: &Cli, tag: &str, summary_json: Option<PathBuf>) -> Result<()> {
    let config = load_config(cli)?;
    let summary = pipeline::run(&config, tag).await?;
    print_summary(&summary);

    if let Some(path) = summary_json {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&path, json)?;
        info!("Wrote run summary to {}", path.display());
    }

    if !summary.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_archive(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let archives = archive::archive_projects(&config.projects_root, &config.staging)?;

    if archives.is_empty() {
        info!("No project directories found under {}", config.projects_root.display());
        return Ok(());
    }

    for archive in &archives {
        println!(
            "[{}] {} ({})",
            "✔".bright_green().bold(),
            archive.path.display(),
            archive.checksums.sha256
        );
    }
    Ok(())
}

async fn cmd_release(cli: &Cli, tag: &str) -> Result<()> {
    let config = load_config(cli)?;
    let archives = archive::load_staged(&config.staging)?;

    if archives.is_empty() {
        warn!("No staged archives in {}, nothing to upload", config.staging.display());
        return Ok(());
    }

    let outcome = pipeline::publish_release_assets(&config, tag, &archives).await?;
    println!(
        "[{}] {} uploaded, {} skipped, {} failed",
        "+".bright_blue().bold(),
        outcome.uploaded.len(),
        outcome.skipped.len(),
        outcome.failed.len()
    );

    if !outcome.failed.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_push(cli: &Cli, tag: &str) -> Result<()> {
    let config = load_config(cli)?;
    let archives = archive::load_staged(&config.staging)?;

    if archives.is_empty() {
        warn!("No staged archives in {}, nothing to push", config.staging.display());
        return Ok(());
    }

    let tag = tag.to_string();
    let outcome =
        tokio::task::spawn_blocking(move || pipeline::publish_packages(&config, &tag, &archives))
            .await
            .expect("package publishing task panicked")?;

    println!(
        "[{}] {} pushed, {} skipped, {} failed",
        "+".bright_blue().bold(),
        outcome.pushed.len(),
        outcome.skipped.len(),
        outcome.failed.len()
    );

    if !outcome.failed.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "[{}] {} archives produced",
        "+".bright_blue().bold(),
        summary.archive_count
    );

    match &summary.assets {
        Some(assets) => println!(
            "[{}] assets: {} uploaded, {} skipped, {} failed",
            "+".bright_blue().bold(),
            assets.uploaded.len(),
            assets.skipped.len(),
            assets.failed.len()
        ),
        None => println!("[{}] asset stage failed", "〤".bright_red().bold()),
    }

    match &summary.packages {
        Some(packages) => println!(
            "[{}] packages: {} pushed, {} skipped, {} failed",
            "+".bright_blue().bold(),
            packages.pushed.len(),
            packages.skipped.len(),
            packages.failed.len()
        ),
        None => println!("[{}] package stage failed", "〤".bright_red().bold()),
    }
}
