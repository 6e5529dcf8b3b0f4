//! Decision records.
//!
//! Every rule decision the orchestrator makes can be handed to a
//! [`DiagnosticsSink`]. Sinks observe only; a failing sink is logged and
//! never changes what the engine does.

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use autarch_foundation::{Error, ErrorKind, Result};

use crate::serialize::{read_file, write_file};

/// What happened to a rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// The rule was admitted and its execution started.
    Started,
    /// The rule could not start.
    Blocked,
    /// An execution finished normally.
    Completed,
    /// An execution faulted or aborted.
    Failed(String),
    /// An execution was cancelled.
    Cancelled,
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => f.write_str("started"),
            Self::Blocked => f.write_str("blocked"),
            Self::Completed => f.write_str("completed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// One decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Rule name.
    pub rule: String,
    /// Owning goal.
    pub goal: String,
    /// Host tick number.
    pub tick: u64,
    /// Raw snapshot version the decision was made against.
    pub snapshot: u64,
    /// What happened.
    pub outcome: DecisionOutcome,
    /// Rendered failure explanation, when traced.
    pub trace: Option<String>,
}

/// Receives decision records.
pub trait DiagnosticsSink {
    /// Records one decision.
    ///
    /// # Errors
    /// Returns an error if the record could not be stored.
    fn record(&mut self, record: &DecisionRecord) -> Result<()>;
}

/// Discards every record.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn record(&mut self, _record: &DecisionRecord) -> Result<()> {
        Ok(())
    }
}

/// Keeps records in memory. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: Rc<RefCell<Vec<DecisionRecord>>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record so far, in decision order.
    #[must_use]
    pub fn records(&self) -> Vec<DecisionRecord> {
        self.records.borrow().clone()
    }

    /// Removes and returns every record so far.
    pub fn take(&self) -> Vec<DecisionRecord> {
        std::mem::take(&mut *self.records.borrow_mut())
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&mut self, record: &DecisionRecord) -> Result<()> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}

// =============================================================================
// Archive
// =============================================================================

/// Writes one `MessagePack` file per record into a directory.
///
/// Files are named `<tick>-<sequence>-<rule>.msgpack` so that a directory
/// listing sorts in decision order.
#[derive(Debug)]
pub struct ArchiveSink {
    dir: PathBuf,
    written: u64,
}

impl ArchiveSink {
    /// Opens an archive, creating the directory if needed.
    ///
    /// # Errors
    /// Returns `Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::new(ErrorKind::Io(format!(
                "failed to create directory '{}': {e}",
                dir.display()
            )))
        })?;
        Ok(Self { dir, written: 0 })
    }

    /// The archive directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of records written so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    fn file_name(&self, record: &DecisionRecord) -> String {
        let rule: String = record
            .rule
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '-' })
            .collect();
        format!("{:010}-{:06}-{rule}.msgpack", record.tick, self.written)
    }
}

impl DiagnosticsSink for ArchiveSink {
    fn record(&mut self, record: &DecisionRecord) -> Result<()> {
        let bytes = rmp_serde::to_vec_named(record)
            .map_err(|e| Error::new(ErrorKind::Serialization(e.to_string())))?;
        write_file(&self.dir.join(self.file_name(record)), &bytes)?;
        self.written += 1;
        Ok(())
    }
}

/// Reads every record in an archive directory, in decision order.
///
/// # Errors
/// Returns an error if the directory or any record cannot be read.
pub fn read_archive(dir: impl AsRef<Path>) -> Result<Vec<DecisionRecord>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| {
        Error::new(ErrorKind::Io(format!(
            "failed to read directory '{}': {e}",
            dir.display()
        )))
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::new(ErrorKind::Io(e.to_string())))?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "msgpack") {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .iter()
        .map(|path| {
            rmp_serde::from_slice(&read_file(path)?)
                .map_err(|e| Error::new(ErrorKind::Serialization(e.to_string())))
        })
        .collect()
}
