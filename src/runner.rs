//! Step script execution
//!
//! Each step is implemented by an external script treated as an opaque
//! collaborator: it communicates success or failure purely through its
//! process exit status, and its stdio is inherited so output streams to
//! the operator's terminal unmodified.
//!
//! [`StepRunner`] is the seam the session layer depends on; tests
//! substitute a mock so no child process is spawned.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::{AlieError, Result};
use crate::steps::StepDefinition;

/// External collaborator interface: run a step, return its exit code.
pub trait StepRunner {
    /// Run the step's script to completion.
    ///
    /// Returns the child's exit code (-1 if terminated by a signal).
    /// Spawn failures and a missing script file are errors; a non-zero
    /// exit code is not, the caller decides what it means.
    fn run(&self, step: &StepDefinition) -> Result<i32>;
}

impl<T: StepRunner> StepRunner for &T {
    fn run(&self, step: &StepDefinition) -> Result<i32> {
        (**self).run(step)
    }
}

/// Runs step scripts with bash, stdio inherited.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    script_dir: PathBuf,
}

impl ShellRunner {
    pub fn new(script_dir: impl Into<PathBuf>) -> Self {
        Self {
            script_dir: script_dir.into(),
        }
    }

    /// Expected path of the script implementing a step.
    pub fn script_path(&self, step: &StepDefinition) -> PathBuf {
        self.script_dir.join(step.script)
    }
}

impl StepRunner for ShellRunner {
    fn run(&self, step: &StepDefinition) -> Result<i32> {
        let path = self.script_path(step);
        if !path.is_file() {
            return Err(AlieError::MissingScript { path });
        }

        tracing::info!(step = %step.id, script = %path.display(), "running step script");

        let status = Command::new("bash")
            .arg(&path)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;

        let code = status.code().unwrap_or(-1);
        tracing::info!(step = %step.id, code, "step script exited");
        Ok(code)
    }
}
