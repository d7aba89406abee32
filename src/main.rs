//! ALIE - main entry point
//!
//! Classifies the installation environment, resolves the next step and runs
//! it. Any error exits with status 1; clean exits (including a declined
//! proposal or an aborted menu) exit 0.

use anyhow::Result;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use alie::cli::{Cli, Commands};
use alie::config::ResolverConfig;
use alie::environment::{self, Environment, HostProbe};
use alie::progress::ProgressStore;
use alie::runner::ShellRunner;
use alie::session::{Prompter, Session, TerminalPrompter};
use alie::steps::{current_privilege, step_count, STEPS};

/// Initialize the tracing subscriber. RUST_LOG overrides the default level.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse_args();
    if let Err(err) = run(cli) {
        error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ResolverConfig::load_from_file(path)?,
        None => ResolverConfig::default(),
    };

    let environment = environment::detect(&HostProbe::default());
    let store = config.progress_store(environment);

    match cli.command {
        Some(Commands::Status) => {
            print_status(environment, &store);
            Ok(())
        }
        Some(Commands::Reset { yes }) => reset_progress(&store, yes),
        None => {
            info!(environment = %environment, "starting resolver session");
            let privilege = current_privilege();
            let runner = ShellRunner::new(&config.script_dir);
            let mut session =
                Session::new(environment, privilege, store, runner, TerminalPrompter);
            let outcome = if cli.manual {
                session.run_manual()?
            } else {
                session.run_auto()?
            };
            debug!(?outcome, "session finished");
            Ok(())
        }
    }
}

/// Print the detected environment, firmware mode and per-step progress.
fn print_status(environment: Environment, store: &ProgressStore) {
    println!("Environment: {environment}");
    println!("Firmware:    {}", environment::detect_firmware_mode());
    println!();
    for step in STEPS {
        let mark = if store.is_completed(step.id) { "x" } else { " " };
        println!("  [{mark}] {}. {:<14} {}", step.ordinal, step.id, step.summary);
    }
    println!();
    println!(
        "{} of {} steps completed.",
        store.completed().len(),
        step_count()
    );
}

/// Confirm (unless `--yes`) and erase recorded progress.
fn reset_progress(store: &ProgressStore, yes: bool) -> Result<()> {
    let confirmed = yes || {
        let mut prompter = TerminalPrompter;
        prompter.confirm("Really erase all recorded progress? This cannot be undone.")?
    };
    if confirmed {
        store.reset()?;
        println!("Progress cleared.");
    } else {
        println!("Reset cancelled.");
    }
    Ok(())
}
