//! Best-effort local snapshots
//!
//! Serializes a bounded slice of engine state (orders worth resuming,
//! recent trades, recent candles) to a single fixed file: bincode payload
//! wrapped in a versioned envelope with a SHA-256 integrity hash.
//! Persistence is never fatal. Save failures are logged and swallowed at
//! the engine boundary; on load, a missing, corrupt, version-incompatible
//! or stale snapshot all degrade to `None`, which triggers fresh seeding.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};
use types::ids::PairId;
use types::order::Order;
use types::trade::Trade;

use crate::candles::Candle;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityFailure { expected: String, actual: String },

    #[error("unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    #[error("snapshot is stale: saved_at {saved_at}, now {now}")]
    Stale { saved_at: i64, now: i64 },
}

/// The bounded state carried by a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotState {
    /// Open/partial orders plus recent terminal non-synthetic orders.
    pub orders: Vec<Order>,
    /// Recent trades, oldest-first.
    pub trades: Vec<Trade>,
    /// Recent candles per (pair, timeframe label), oldest-first.
    pub candles: Vec<((PairId, String), Vec<Candle>)>,
}

impl SnapshotState {
    /// Deterministic SHA-256 hash of the serialized state.
    fn compute_hash(&self) -> Result<String, SnapshotError> {
        let bytes = bincode::serialize(self)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Versioned snapshot envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Epoch milliseconds at save time; staleness is judged against this.
    pub saved_at: i64,
    pub checksum: String,
    pub state: SnapshotState,
}

impl Snapshot {
    pub fn new(state: SnapshotState, saved_at: i64) -> Result<Self, SnapshotError> {
        let checksum = state.compute_hash()?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            saved_at,
            checksum,
            state,
        })
    }

    fn verify_integrity(&self) -> Result<(), SnapshotError> {
        let actual = self.state.compute_hash()?;
        if actual != self.checksum {
            return Err(SnapshotError::IntegrityFailure {
                expected: self.checksum.clone(),
                actual,
            });
        }
        Ok(())
    }
}

/// Reads and writes the single snapshot file at a fixed path.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a snapshot. Best-effort: errors are returned for logging
    /// but callers are expected to swallow them.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let data = bincode::serialize(snapshot)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

        // Atomic replace: write to tmp, fsync, rename.
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), bytes = data.len(), "snapshot saved");
        Ok(())
    }

    /// Load the snapshot, degrading every failure mode to `None`.
    ///
    /// A snapshot whose `saved_at` is more than `max_age_ms` before
    /// `now_ms` is treated as no data, bounding how stale a resumed
    /// simulation can be.
    pub fn load(&self, now_ms: i64, max_age_ms: i64) -> Option<Snapshot> {
        match self.try_load(now_ms, max_age_ms) {
            Ok(snapshot) => {
                info!(
                    path = %self.path.display(),
                    saved_at = snapshot.saved_at,
                    orders = snapshot.state.orders.len(),
                    trades = snapshot.state.trades.len(),
                    "snapshot restored"
                );
                Some(snapshot)
            }
            Err(SnapshotError::Io(err)) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "snapshot discarded");
                None
            }
        }
    }

    fn try_load(&self, now_ms: i64, max_age_ms: i64) -> Result<Snapshot, SnapshotError> {
        let mut file = File::open(&self.path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let snapshot: Snapshot = bincode::deserialize(&data)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

        if snapshot.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        snapshot.verify_integrity()?;

        if now_ms - snapshot.saved_at > max_age_ms {
            return Err(SnapshotError::Stale {
                saved_at: snapshot.saved_at,
                now: now_ms,
            });
        }
        Ok(snapshot)
    }

    /// Delete the snapshot file. Missing file is not an error.
    pub fn delete(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "snapshot deleted"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(path = %self.path.display(), error = %err, "snapshot delete failed"),
        }
    }
}
