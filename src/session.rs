//! One resolver invocation
//!
//! Ties the classifier, the progress store, the resolver and the script
//! runner together for a single run: automatic mode resolves and confirms
//! the one admissible next step, manual mode presents the full step menu.
//!
//! Interactive IO goes through the [`Prompter`] seam so the whole session
//! is drivable from tests. Wrong automatic guesses during an OS install
//! have high-severity consequences, so every destructive or ambiguous
//! situation is an explicit operator choice here.

use std::io::{self, Write};

use crate::environment::Environment;
use crate::error::{AlieError, Result};
use crate::progress::ProgressStore;
use crate::resolver::{resolve, RecoveryAction, Resolution};
use crate::runner::StepRunner;
use crate::steps::{step_count, Privilege, StepDefinition, StepId, STEPS};

/// Interactive operator IO.
pub trait Prompter {
    /// Yes/no question, defaulting to no.
    fn confirm(&mut self, message: &str) -> Result<bool>;

    /// Numbered menu. `Ok(None)` means the operator quit the menu;
    /// a garbled answer is an error (invalid selection, exit 1).
    fn select(&mut self, message: &str, options: &[String]) -> Result<Option<usize>>;
}

/// Prompter reading stdin, writing stdout.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        print!("{message} [y/N] ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(matches!(
            line.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }

    fn select(&mut self, message: &str, options: &[String]) -> Result<Option<usize>> {
        println!("{message}");
        for (i, option) in options.iter().enumerate() {
            println!("  {}) {option}", i + 1);
        }
        print!("Selection (q to quit): ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        let answer = line.trim();
        if answer.is_empty() || answer.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        let n: usize = answer
            .parse()
            .map_err(|_| AlieError::selection(format!("'{answer}' is not a menu entry")))?;
        if n == 0 || n > options.len() {
            return Err(AlieError::selection(format!(
                "{n} is out of range (1-{})",
                options.len()
            )));
        }
        Ok(Some(n - 1))
    }
}

/// How a session ended, for logging and messaging. Any error path exits 1
/// before an outcome is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A step ran and its completion was recorded
    StepCompleted(StepId),
    /// The operator declined the proposed step
    Declined,
    /// Nothing left to do in this environment
    PhaseDone,
    /// Every step has completed
    AllComplete,
    /// Environment unknown; operator directed to manual mode
    NeedsManual,
    /// Recorded progress was erased
    ProgressReset,
    /// The operator aborted a menu
    Aborted,
}

/// State for one resolver invocation.
pub struct Session<R, P> {
    environment: Environment,
    privilege: Privilege,
    store: ProgressStore,
    runner: R,
    prompter: P,
}

impl<R: StepRunner, P: Prompter> Session<R, P> {
    pub fn new(
        environment: Environment,
        privilege: Privilege,
        store: ProgressStore,
        runner: R,
        prompter: P,
    ) -> Self {
        Self {
            environment,
            privilege,
            store,
            runner,
            prompter,
        }
    }

    /// Automatic mode: classify, resolve, confirm, execute.
    pub fn run_auto(&mut self) -> Result<Outcome> {
        let highest = self.store.highest_completed_step();
        tracing::info!(environment = %self.environment, highest, "resolving next step");

        match resolve(self.environment, highest) {
            Resolution::Undetermined => {
                println!("Could not determine the installation environment.");
                println!("Re-run with --manual to pick a step yourself.");
                Ok(Outcome::NeedsManual)
            }
            Resolution::Complete => {
                println!("All {} installation steps are complete.", step_count());
                Ok(Outcome::AllComplete)
            }
            Resolution::PhaseDone { next } => {
                println!(
                    "Nothing left to do in the {} environment.",
                    self.environment
                );
                println!(
                    "Next: step {} ({}), to be run from the {} environment.",
                    next.ordinal, next.id, next.environments[0]
                );
                Ok(Outcome::PhaseDone)
            }
            Resolution::Propose(step) => {
                let message = format!(
                    "Step {} of {}: {}\n  {}\nRun it now?",
                    step.ordinal,
                    step_count(),
                    step.id,
                    step.summary
                );
                if !self.prompter.confirm(&message)? {
                    println!("Nothing done.");
                    return Ok(Outcome::Declined);
                }
                self.execute(step)
            }
            Resolution::Mismatch { missing } => self.recover(&missing),
        }
    }

    /// Manual mode: full step menu, environment and progress ignored.
    /// The declared privilege requirement is still enforced.
    pub fn run_manual(&mut self) -> Result<Outcome> {
        let options: Vec<String> = STEPS
            .iter()
            .map(|s| {
                let done = if self.store.is_completed(s.id) {
                    " (completed)"
                } else {
                    ""
                };
                format!(
                    "{} - {} [{}, as {}]{}",
                    s.id,
                    s.summary,
                    s.environments[0],
                    s.privilege,
                    done
                )
            })
            .collect();

        match self.prompter.select("Select a step to run:", &options)? {
            None => Ok(Outcome::Aborted),
            Some(index) => {
                let step = STEPS
                    .get(index)
                    .ok_or_else(|| AlieError::selection("selection out of range"))?;
                self.execute(step)
            }
        }
    }

    /// Offer recovery choices when progress lags the environment.
    fn recover(&mut self, missing: &[&'static StepDefinition]) -> Result<Outcome> {
        let current = missing[0];
        println!(
            "Recorded progress ({} of {} steps) is behind the detected {} environment.",
            self.store.highest_completed_step(),
            step_count(),
            self.environment
        );
        for step in missing {
            println!("  not recorded: step {} ({})", step.ordinal, step.id);
        }

        let options = vec![
            format!("Retry step {} ({})", current.ordinal, current.id),
            "Reset recorded progress".to_string(),
            "Abort".to_string(),
        ];
        let action = match self.prompter.select("How should this be resolved?", &options)? {
            Some(0) => RecoveryAction::Retry,
            Some(1) => RecoveryAction::Reset,
            _ => RecoveryAction::Abort,
        };

        match action {
            RecoveryAction::Retry => self.execute(current),
            RecoveryAction::Reset => {
                let message = "Really erase all recorded progress? This cannot be undone.";
                if self.prompter.confirm(message)? {
                    self.store.reset()?;
                    println!("Progress cleared.");
                    Ok(Outcome::ProgressReset)
                } else {
                    Ok(Outcome::Aborted)
                }
            }
            RecoveryAction::Abort => Ok(Outcome::Aborted),
        }
    }

    /// Privilege gate, then run the script and advance progress on success.
    ///
    /// The runner is never invoked on a privilege mismatch, and a non-zero
    /// exit never advances progress.
    fn execute(&mut self, step: &'static StepDefinition) -> Result<Outcome> {
        if step.privilege != self.privilege {
            return Err(AlieError::Privilege {
                step: step.id,
                required: step.privilege,
                actual: self.privilege,
            });
        }

        let code = self.runner.run(step)?;
        if code == 0 {
            self.store.record_completed(step.id)?;
            println!("Step {} ({}) completed.", step.ordinal, step.id);
            Ok(Outcome::StepCompleted(step.id))
        } else {
            Err(AlieError::StepFailed {
                step: step.id,
                code,
            })
        }
    }
}
