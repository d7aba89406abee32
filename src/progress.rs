//! Persistent installation progress
//!
//! Progress is a flat marker file (one step id per line) plus an append-only
//! JSON-lines audit log, stored outside any ephemeral mount so it survives
//! the reboots between installation phases.
//!
//! # Locations
//!
//! The well-known location differs by phase: under the target root's `/root`
//! once the target is mounted, under the installed system's `/root` after
//! reboot, and a temporary directory before the target root exists. The
//! store therefore carries two ordered candidate lists:
//!
//! - **read candidates**: every known location, most current first; the
//!   first one holding a marker file wins,
//! - **write candidates**: the locations admissible for the current
//!   environment (writing to the live system's ephemeral `/root` would lose
//!   the record at reboot), first existing directory wins.
//!
//! When a write lands in a more current location than previous records,
//! entries known from lower-priority locations are carried forward, so
//! `record_completed` never loses a previously recorded entry.
//!
//! # Failure semantics
//!
//! A missing marker file means "nothing completed yet", not an error.
//! Unparseable marker lines are skipped; the store is advisory, resumable
//! state, not a transactional ledger. The only truncation is [`ProgressStore::reset`].

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{AlieError, Result};
use crate::steps::{StepId, STEPS};

/// Marker file name: one completed step id per line.
pub const MARKER_FILE: &str = "alie.progress";

/// Audit log file name: one JSON record per completed step.
pub const AUDIT_FILE: &str = "alie.log";

/// One line of the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AuditRecord {
    step: StepId,
    completed_at: u64,
}

/// Durable record of which installation steps have completed.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    read_candidates: Vec<PathBuf>,
    write_candidates: Vec<PathBuf>,
}

impl ProgressStore {
    /// Create a store over explicit candidate directory lists, most
    /// current first.
    pub fn new(read_candidates: Vec<PathBuf>, write_candidates: Vec<PathBuf>) -> Self {
        Self {
            read_candidates,
            write_candidates,
        }
    }

    /// Create a store reading and writing a single directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self::new(vec![dir.clone()], vec![dir])
    }

    /// All completed step ids, in recorded order.
    ///
    /// Reads the most current marker file available. Unparseable or
    /// duplicate lines are skipped.
    pub fn completed(&self) -> Vec<StepId> {
        let Some(marker) = self.current_marker() else {
            return Vec::new();
        };
        let content = match fs::read_to_string(&marker) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path = %marker.display(), %err, "failed to read marker file");
                return Vec::new();
            }
        };
        let mut done = Vec::new();
        for line in content.lines() {
            match line.trim().parse::<StepId>() {
                Ok(id) if !done.contains(&id) => done.push(id),
                Ok(_) => {}
                Err(_) => {
                    if !line.trim().is_empty() {
                        tracing::warn!(line, "skipping unparseable marker line");
                    }
                }
            }
        }
        done
    }

    /// Whether the given step has been recorded as completed.
    pub fn is_completed(&self, id: StepId) -> bool {
        self.completed().contains(&id)
    }

    /// Greatest ordinal among completed steps, or 0 for an empty store.
    pub fn highest_completed_step(&self) -> u8 {
        let done = self.completed();
        STEPS
            .iter()
            .filter(|s| done.contains(&s.id))
            .map(|s| s.ordinal)
            .max()
            .unwrap_or(0)
    }

    /// Record a step as completed. Idempotent.
    ///
    /// Appends the step id to the marker file at the most current writable
    /// location, carrying forward entries recorded at lower-priority
    /// locations, and appends a timestamped record to the audit log.
    pub fn record_completed(&self, id: StepId) -> Result<()> {
        let mut known = self.completed();
        let newly = !known.contains(&id);
        if newly {
            known.push(id);
        }

        let dir = self
            .write_candidates
            .iter()
            .find(|d| d.is_dir())
            .ok_or_else(|| AlieError::state("no writable progress location available"))?;

        let marker = dir.join(MARKER_FILE);
        let present: Vec<StepId> = match fs::read_to_string(&marker) {
            Ok(content) => content
                .lines()
                .filter_map(|l| l.trim().parse::<StepId>().ok())
                .collect(),
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        let missing: Vec<StepId> = known.iter().copied().filter(|s| !present.contains(s)).collect();
        if !missing.is_empty() {
            let mut file = OpenOptions::new().create(true).append(true).open(&marker)?;
            for step in &missing {
                writeln!(file, "{step}")?;
            }
        }

        if newly {
            let record = AuditRecord {
                step: id,
                completed_at: unix_now(),
            };
            let mut log = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(AUDIT_FILE))?;
            writeln!(log, "{}", serde_json::to_string(&record)?)?;
            tracing::info!(step = %id, dir = %dir.display(), "step recorded as completed");
        }

        Ok(())
    }

    /// Delete the marker file and audit log from every candidate location.
    ///
    /// Irreversible. Callers confirm with the operator first.
    pub fn reset(&self) -> Result<()> {
        for dir in self.read_candidates.iter().chain(&self.write_candidates) {
            for name in [MARKER_FILE, AUDIT_FILE] {
                let path = dir.join(name);
                match fs::remove_file(&path) {
                    Ok(()) => tracing::info!(path = %path.display(), "removed"),
                    Err(err) if err.kind() == ErrorKind::NotFound => {}
                    Err(err) => return Err(err.into()),
                }
            }
        }
        Ok(())
    }

    /// Candidate directories scanned when reading, most current first.
    pub fn read_candidates(&self) -> &[PathBuf] {
        &self.read_candidates
    }

    /// Candidate directories admissible for writing, most current first.
    pub fn write_candidates(&self) -> &[PathBuf] {
        &self.write_candidates
    }

    /// The most current marker file that exists, if any.
    fn current_marker(&self) -> Option<PathBuf> {
        self.read_candidates
            .iter()
            .map(|d| d.join(MARKER_FILE))
            .find(|p| p.is_file())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
