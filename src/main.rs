//! stackrefresh - main entry point
//!
//! Resolves configuration, checks that the collaborator tools exist, runs the
//! refresh plan and exits with the code matching the first failure.

use clap::Parser;
use nix::sys::signal::Signal;
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use stackrefresh::cli::{Cli, Commands, RefreshArgs};
use stackrefresh::error::{EXIT_USAGE, RefreshError};
use stackrefresh::{
    DeploymentRefresher, ProcessGuard, RefreshConfig, RefreshPlan, SystemCollaborators, preflight,
    process_guard,
};

/// Initialize logging; `RUST_LOG` overrides the default `info` level
///
/// Logs go to stderr so `plan` output on stdout stays machine-readable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_logging();

    // clap exits with 2 on usage errors, which is the ownership-step code
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = e.print();
            return exit_code(code);
        }
    };

    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    let guard = ProcessGuard::new();

    let result = run(cli);
    debug!(children = guard.child_count(), "run finished");

    // A step killed by interrupt cleanup is not a step failure
    if let Some(sig) = process_guard::interrupted_by() {
        drop(guard);
        let name = Signal::try_from(sig).map(Signal::as_str).unwrap_or("signal");
        eprintln!("✗ Interrupted by {}", name);
        return exit_code(128 + sig);
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {}", e);
            exit_code(e.exit_code())
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn run(cli: Cli) -> Result<(), RefreshError> {
    let dry_run = cli.dry_run;
    let config_path = cli.config;

    match cli.command {
        Commands::InitConfig { path, force } => {
            if path.exists() && !force {
                return Err(RefreshError::config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            RefreshConfig::default()
                .save_to_file(&path)
                .map_err(|e| RefreshError::config(format!("{:#}", e)))?;
            println!("✓ Wrote default configuration to {}", path.display());
            Ok(())
        }
        Commands::Plan(args) => {
            let (_, plan) = resolve(config_path.as_deref(), &args)?;
            println!("{}", plan.summary());
            Ok(())
        }
        Commands::Check(args) => {
            let (config, _) = resolve(config_path.as_deref(), &args)?;
            let collaborators = SystemCollaborators::from_config(&config, dry_run);
            let report = preflight::ensure_ready(&config, collaborators.escalate())?;
            println!("✓ All required tools found: {}", report.required.join(", "));
            Ok(())
        }
        Commands::Refresh(args) => {
            let (config, plan) = resolve(config_path.as_deref(), &args)?;
            let collaborators = SystemCollaborators::from_config(&config, dry_run);
            preflight::ensure_ready(&config, collaborators.escalate())?;

            if dry_run && plan.is_destructive() {
                info!("[DRY RUN] destructive steps will be skipped");
            }
            debug!("{}", plan.summary());

            let report = DeploymentRefresher::new(collaborators).run(&plan)?;
            println!(
                "✓ Refresh complete: {} steps in {:.1}s",
                report.completed.len(),
                report.total_elapsed().as_secs_f64()
            );
            Ok(())
        }
    }
}

/// Resolve configuration and build the validated default plan
fn resolve(
    config_path: Option<&std::path::Path>,
    args: &RefreshArgs,
) -> Result<(RefreshConfig, RefreshPlan), RefreshError> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {:?}", path);
    }
    let config = RefreshConfig::resolve(config_path, args.overrides())
        .map_err(|e| RefreshError::config(format!("{:#}", e)))?;

    let plan = RefreshPlan::default_plan(&config);
    plan.validate()?;
    Ok((config, plan))
}
