// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotwarden::{
    apply_convergence, default_config_file, plan_convergence, plan_scan, AdoptionEngine, AuditLog,
    BrewCli, Config, Decision, HomeScanner, ObservedState, PackageManager, PackageStore,
    PatternStore, Settings,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, process::exit};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  dotwarden [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to settings file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let settings = Settings::load(self.config.as_deref(), &default_config_file()?)?;
        let config = settings.resolve()?;

        match self.command {
            Command::Run(opts) => run_scan(config, opts),
            Command::Status(opts) => run_status(config, opts),
            Command::Install(opts) => run_install(config, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Scan the home directory and adopt what the pattern lists allow.
    #[command(override_usage = "dotwarden run [options]")]
    Run(RunOptions),

    /// Show audit counts, recent activity, and managed packages.
    #[command(override_usage = "dotwarden status [options]")]
    Status(StatusOptions),

    /// Converge installed packages toward the desired-state manifest.
    #[command(override_usage = "dotwarden install [options]")]
    Install(InstallOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RunOptions {
    /// Preview decisions without touching the filesystem or audit log.
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct StatusOptions {
    /// Number of recent audit lines to show.
    #[arg(short, long, value_name = "count", default_value_t = 10)]
    pub tail: usize,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InstallOptions {
    /// Preview the install delta without invoking the package manager.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Desired-state manifest to converge toward.
    #[arg(short, long, value_name = "path")]
    pub manifest: Option<PathBuf>,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_scan(config: Config, opts: RunOptions) -> Result<()> {
    let patterns = PatternStore::load(&config.patterns, config.require_patterns)?;
    let scanner = HomeScanner::new(
        &config.home,
        &config.store,
        &config.audit_log,
        config.grouped_dir.as_str(),
    );
    let candidates = scanner.scan()?;
    let plan = plan_scan(candidates, &patterns, &config.grouped_dir);

    if opts.dry_run {
        for item in &plan.items {
            match &item.decision {
                Decision::Adopt { package } => {
                    println!("would adopt {} -> {}", item.candidate.path, package);
                }
                Decision::Sensitive => println!("sensitive {}", item.candidate.path),
                Decision::SkipUnresolved => {
                    println!("would skip {} (no package name)", item.candidate.path);
                }
                Decision::Ignore | Decision::AlreadyManaged | Decision::Unknown => {}
            }
        }
        println!("dry run: {} adoption(s) pending", plan.adoption_count());
        return Ok(());
    }

    let store = PackageStore::open(&config.store)?;
    let audit = AuditLog::open(&config.audit_log)?;
    let engine = AdoptionEngine::new(store, audit, config.overwrite);
    let report = engine.apply(&plan);

    println!("{report}");
    println!("audit log: {}", config.audit_log.display());

    Ok(())
}

fn run_status(config: Config, opts: StatusOptions) -> Result<()> {
    let audit = AuditLog::open(&config.audit_log)?;
    let summary = audit.summary()?;
    let store = PackageStore::open(&config.store)?;
    let packages = store.packages()?;

    println!(
        "adopted: {}, sensitive: {}, skipped: {}, warnings: {}",
        summary.adopted, summary.sensitive, summary.skipped, summary.warn
    );
    println!("managed packages: {}", packages.len());
    for name in &packages {
        println!("  {name}");
    }

    let tail = audit.tail(opts.tail)?;
    if !tail.is_empty() {
        println!("recent activity:");
        for line in tail {
            println!("  {line}");
        }
    }

    Ok(())
}

fn run_install(config: Config, opts: InstallOptions) -> Result<()> {
    let manifest = opts.manifest.unwrap_or(config.manifest);
    let brew = BrewCli::default();
    let desired = brew.desired(&manifest)?;
    let observed = ObservedState::snapshot(&brew, &config.applications)?;
    let plan = plan_convergence(&desired, &observed);

    if opts.dry_run {
        for package in &plan.to_install {
            println!("would install {package}");
        }
        for package in &plan.unverifiable {
            println!("unverifiable {package}");
        }
        println!(
            "dry run: {} to install, {} satisfied, {} unverifiable",
            plan.to_install.len(),
            plan.already_satisfied.len(),
            plan.unverifiable.len()
        );
        return Ok(());
    }

    let report = apply_convergence(&brew, &plan)?;
    println!("{report}");

    Ok(())
}
