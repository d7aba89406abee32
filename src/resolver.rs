//! Step resolution
//!
//! Given the classified environment and the highest completed ordinal, the
//! resolver decides what happens next. It proposes at most one step per
//! invocation; there is no persistent process between steps, the operator
//! re-invokes the binary after each reboot or script completion.
//!
//! Dispatch is data-driven off the step table: a step is proposed when it
//! is the first uncompleted entry admissible in the current environment.
//! A mismatch (uncompleted steps belonging to an earlier phase than the
//! host is in) is surfaced as a set of recovery choices, never resolved
//! automatically.

use crate::environment::Environment;
use crate::steps::{StepDefinition, STEPS};

/// What the resolver decided for one `(environment, progress)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one next step is admissible here; confirm and run it.
    Propose(&'static StepDefinition),

    /// Nothing left to do in this environment; the next uncompleted step
    /// belongs to a later phase (reboot / chroot and re-invoke).
    PhaseDone { next: &'static StepDefinition },

    /// Every step in the table has completed.
    Complete,

    /// The environment is further along than recorded progress: steps from
    /// earlier phases are still uncompleted. Operator picks a recovery.
    Mismatch { missing: Vec<&'static StepDefinition> },

    /// The environment could not be classified; use manual mode.
    Undetermined,
}

/// Operator choices offered for a [`Resolution::Mismatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Re-run the first uncompleted step despite the environment
    Retry,
    /// Erase all recorded progress
    Reset,
    /// Leave everything untouched
    Abort,
}

/// Resolve the next action for the given environment and progress.
///
/// Pure function: no host introspection, no side effects.
pub fn resolve(environment: Environment, highest_completed: u8) -> Resolution {
    let Some(rank) = environment.phase_rank() else {
        return Resolution::Undetermined;
    };

    let remaining: Vec<&'static StepDefinition> = STEPS
        .iter()
        .filter(|s| s.ordinal > highest_completed)
        .collect();

    if remaining.is_empty() {
        return Resolution::Complete;
    }

    // Uncompleted steps from an earlier phase mean progress lags the host
    let missing: Vec<&'static StepDefinition> = remaining
        .iter()
        .copied()
        .filter(|s| !s.admissible_in(environment) && s.phase_rank() < rank)
        .collect();
    if !missing.is_empty() {
        return Resolution::Mismatch { missing };
    }

    if let Some(step) = remaining
        .iter()
        .copied()
        .find(|s| s.admissible_in(environment))
    {
        return Resolution::Propose(step);
    }

    Resolution::PhaseDone { next: remaining[0] }
}
