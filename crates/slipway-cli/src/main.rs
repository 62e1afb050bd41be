//! Slipway - monorepo change detection and service redeployment
//!
//! The `slipway` command runs inside a build server and answers two
//! questions:
//!
//! - `resolve`: which monitored services did a commit range touch?
//! - `deploy`: refresh exactly those services on a Docker Compose host
//!
//! ## Commands
//!
//! - `resolve`: print impacted service roots, newline-separated
//! - `deploy`: run the full pipeline described by `slipway.toml`
//! - `check`: validate configuration and repository preflight

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

use slipway_core::domain::{ChangeComparisonSpec, ChangedFile, ServiceRoot};
use slipway_core::{git, ChangeSetResolver, Config};
use slipway_deploy::{
    ComposeDeployer, DeployPipeline, DiffSource, GitDiffSource, PipelinePlan, PipelineResult,
    ProcessExecutor,
};

#[derive(Parser)]
#[command(name = "slipway")]
#[command(author = "Slipway Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Monorepo change detection and service redeployment", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the monitored services impacted by a commit range
    Resolve {
        /// Base ref of the comparison
        #[arg(long, default_value = "HEAD~1")]
        base_ref: String,

        /// Compare ref of the comparison
        #[arg(long, default_value = "HEAD")]
        compare_ref: String,

        /// Service root to monitor (repeatable, order preserved)
        #[arg(short, long = "service", value_name = "NAME", required = true)]
        services: Vec<String>,

        /// Repository checkout directory
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Read changed paths (one per line) from a file, or "-" for stdin,
        /// instead of invoking git
        #[arg(long, value_name = "SOURCE")]
        changed_files_from: Option<String>,
    },

    /// Detect changed services and redeploy them
    Deploy {
        /// Configuration file
        #[arg(short, long, default_value = "slipway.toml")]
        config: PathBuf,

        /// Build tag to move impacted services to
        #[arg(short, long)]
        tag: String,

        /// Resolve and report without deploying
        #[arg(long)]
        dry_run: bool,

        /// Report format on stdout
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        output: ReportFormat,
    },

    /// Validate configuration and repository preflight
    Check {
        /// Configuration file
        #[arg(short, long, default_value = "slipway.toml")]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    slipway_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Resolve {
            base_ref,
            compare_ref,
            services,
            repo,
            changed_files_from,
        } => {
            cmd_resolve(
                &base_ref,
                &compare_ref,
                &services,
                &repo,
                changed_files_from.as_deref(),
            )
            .await
        }
        Commands::Deploy {
            config,
            tag,
            dry_run,
            output,
        } => cmd_deploy(&config, &tag, dry_run, output).await,
        Commands::Check { config } => cmd_check(&config),
    }
}

/// Run change detection and print impacted service roots.
///
/// An empty `--service` list is rejected by clap: for an explicit CLI
/// invocation, nothing-to-monitor is a usage error, unlike the embedded
/// library call which short-circuits to an empty result.
async fn cmd_resolve(
    base_ref: &str,
    compare_ref: &str,
    services: &[String],
    repo: &Path,
    changed_files_from: Option<&str>,
) -> Result<()> {
    let roots = services
        .iter()
        .map(|name| ServiceRoot::new(name))
        .collect::<slipway_core::Result<Vec<_>>>()
        .context("invalid --service value")?;

    let changed = match changed_files_from {
        Some(source) => read_changed_files(source)?,
        None => {
            let spec = ChangeComparisonSpec::new(base_ref, compare_ref, roots.clone());
            let diff = GitDiffSource::new(repo, ProcessExecutor::new());
            diff.changed_files(&spec)
                .await
                .context("change detection failed")?
        }
    };

    let impacted = ChangeSetResolver::resolve(&changed, &roots);
    if !impacted.is_empty() {
        println!("{impacted}");
    }

    Ok(())
}

/// Read already-materialized changed paths from a file or stdin.
fn read_changed_files(source: &str) -> Result<Vec<ChangedFile>> {
    let raw = if source == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read changed files from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read changed files from {source}"))?
    };
    Ok(raw.lines().filter_map(ChangedFile::parse).collect())
}

/// Run the full detect-and-redeploy pipeline.
async fn cmd_deploy(config_path: &Path, tag: &str, dry_run: bool, output: ReportFormat) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let spec = config.comparison_spec()?;

    let diff = GitDiffSource::new(config.repo.dir.clone(), ProcessExecutor::new());
    let deployer = ComposeDeployer::new(
        config.deploy.manifest.clone(),
        config.deploy.registry.clone(),
        ProcessExecutor::new(),
    )
    .with_timeout(config.deploy.timeout_secs);

    let mut plan = PipelinePlan::new(spec, tag);
    if dry_run {
        plan = plan.dry_run();
    }

    let result = DeployPipeline::run(&diff, &deployer, &plan)
        .await
        .context("pipeline failed before any deploy")?;

    match output {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        ReportFormat::Text => print_text_report(&result),
    }

    if !result.success {
        anyhow::bail!("deployment failed for {} service(s)", result.failed_count());
    }
    Ok(())
}

fn print_text_report(result: &PipelineResult) {
    println!("run {} (tag {})", result.run_id, result.tag);
    println!(
        "changed files: {}, impacted services: {}",
        result.changed_file_count,
        result.impacted.len()
    );

    if result.impacted.is_empty() {
        println!("nothing to deploy");
        return;
    }

    if result.dry_run {
        for name in &result.impacted {
            println!("would deploy {name}");
        }
        return;
    }

    for service in &result.services {
        if service.success {
            let duration = service
                .outcome
                .as_ref()
                .map(|o| o.duration_ms)
                .unwrap_or_default();
            println!("  {} ok ({duration}ms)", service.service);
        } else {
            println!(
                "  {} FAILED: {}",
                service.service,
                service.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    println!(
        "{} deployed, {} failed in {}ms",
        result.deployed_count(),
        result.failed_count(),
        result.duration_ms
    );
}

/// Validate configuration and the repository it points at.
fn cmd_check(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    if !git::is_work_tree(&config.repo.dir) {
        anyhow::bail!(
            "repo.dir {} is not inside a git work tree",
            config.repo.dir.display()
        );
    }

    let compare = git::rev_parse(&config.repo.dir, &config.repo.compare_ref)?;
    println!(
        "compare ref {} -> {}",
        config.repo.compare_ref,
        &compare[..12.min(compare.len())]
    );

    // The base ref may only exist after a fetch when a remote is configured.
    match &config.repo.remote {
        None => {
            let base = git::rev_parse(&config.repo.dir, &config.repo.base_ref)?;
            println!(
                "base ref    {} -> {}",
                config.repo.base_ref,
                &base[..12.min(base.len())]
            );
        }
        Some(remote) => {
            println!(
                "base ref    {} (resolved after fetch from remote '{}')",
                config.repo.base_ref, remote.name
            );
        }
    }

    println!(
        "monitoring {} service(s) against {}",
        config.services.len(),
        config.deploy.manifest.display()
    );
    println!("configuration ok");
    Ok(())
}
