//! Hosting plumbing for running the ledger as an off-chain service.
//!
//! The safety and ceiling guards are read-modify-write across shared
//! aggregates (`total_debt_share`, `total_debt_value`), so every mutating
//! call must be serialized behind a single writer. [`SharedLedger`] provides
//! that discipline; [`SnapshotStore`] persists the full ledger state as a
//! serde_json snapshot with an atomic write-then-rename.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::Result;
use crate::ledger::Ledger;

/// Cloneable handle to a ledger behind a single-writer lock.
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        SharedLedger {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    /// Run a read-only closure against a consistent view of the ledger.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Run a mutating closure with exclusive access. The closure's own
    /// atomicity discipline applies: ledger operations either complete or
    /// leave no trace.
    pub fn write<R>(&self, f: impl FnOnce(&mut Ledger) -> Result<R>) -> Result<R> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Clone out the current state.
    pub fn snapshot(&self) -> Ledger {
        self.read(|ledger| ledger.clone())
    }
}

/// Ledger snapshot persistence on the local filesystem.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SnapshotStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> io::Result<Ledger> {
        let bytes = fs::read(&self.path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Write the snapshot next to the target and rename it into place, so a
    /// crash mid-write never leaves a torn state file.
    pub fn save(&self, ledger: &Ledger) -> io::Result<()> {
        let bytes = serde_json::to_vec_pretty(ledger)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)
    }
}
