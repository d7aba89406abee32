//! Resolver configuration
//!
//! Every path the resolver touches comes from this explicit context object
//! instead of process-wide state: the step script directory and the three
//! candidate progress locations. Defaults match the layout the step
//! scripts ship with; a JSON file can override them for development or
//! unusual mount layouts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::environment::Environment;
use crate::progress::ProgressStore;

/// Paths the resolver operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Directory containing the step scripts
    pub script_dir: PathBuf,

    /// Progress location under the target root, once it is mounted
    pub target_state_dir: PathBuf,

    /// Progress location on the installed system (and inside the chroot,
    /// where the target's `/root` is simply `/root`)
    pub system_state_dir: PathBuf,

    /// Temporary progress location before the target root exists
    pub temp_state_dir: PathBuf,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            script_dir: PathBuf::from("/usr/share/alie/steps"),
            target_state_dir: PathBuf::from("/mnt/root"),
            system_state_dir: PathBuf::from("/root"),
            temp_state_dir: PathBuf::from("/tmp"),
        }
    }
}

impl ResolverConfig {
    /// Load configuration from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read configuration file: {}",
                path.as_ref().display()
            )
        })?;
        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("script_dir", &self.script_dir),
            ("target_state_dir", &self.target_state_dir),
            ("system_state_dir", &self.system_state_dir),
            ("temp_state_dir", &self.temp_state_dir),
        ];
        for (name, path) in paths {
            if !path.is_absolute() {
                anyhow::bail!("{name} must be an absolute path, got '{}'", path.display());
            }
        }
        Ok(())
    }

    /// Build the progress store for the given environment.
    ///
    /// Reading always scans every known location, most current first.
    /// Writing is restricted by environment: on live media the ephemeral
    /// `/root` must never receive the record, so writes go to the target
    /// root once it exists and to the temporary location before that.
    pub fn progress_store(&self, environment: Environment) -> ProgressStore {
        let read = vec![
            self.target_state_dir.clone(),
            self.system_state_dir.clone(),
            self.temp_state_dir.clone(),
        ];
        let write = match environment {
            Environment::LiveMedia => {
                vec![self.target_state_dir.clone(), self.temp_state_dir.clone()]
            }
            Environment::Chroot
            | Environment::InstalledNoDesktop
            | Environment::InstalledWithDesktop => {
                vec![self.system_state_dir.clone(), self.temp_state_dir.clone()]
            }
            Environment::Unknown => read.clone(),
        };
        ProgressStore::new(read, write)
    }
}
