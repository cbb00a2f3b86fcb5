//! Persistent strategy-rotation state.
//!
//! The state file is the only thing shared between invocations: each run
//! loads it, writes its decisions back at well-defined checkpoints, and
//! exits. A run that never reaches `connected` leaves `pending` behind,
//! which is what makes the next run escalate — a crash between "mark
//! pending" and the connect attempt is therefore indistinguishable from a
//! genuine connect failure, deliberately.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Connection progress as of the last checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No attempt recorded yet.
    #[default]
    New,
    /// An attempt was started and has not been proven to work.
    Pending,
    /// The strategy at `index` connected successfully.
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StrategyState {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub status: Status,
}

impl StrategyState {
    /// The sole progression rule: a state left `pending` by a previous run
    /// escalates to the next catalog entry; anything else is unchanged.
    pub fn advance(self, catalog_len: usize) -> Self {
        match self.status {
            Status::Pending => Self {
                index: (self.index + 1) % catalog_len,
                status: Status::Pending,
            },
            _ => self,
        }
    }

    pub fn with_status(self, status: Status) -> Self {
        Self { status, ..self }
    }
}

/// Durable store for [`StrategyState`], one small JSON file.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state, defaulting on any problem.
    ///
    /// A missing file, unreadable file or corrupt content all yield
    /// `{index: 0, status: new}` — corruption silently resets the rotation
    /// rather than wedging the bridge. Unknown JSON fields are ignored and
    /// missing ones defaulted, so the file survives schema drift in either
    /// direction. An out-of-range index is normalized into the catalog.
    pub fn load(&self, catalog_len: usize) -> StrategyState {
        let state = match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<StrategyState>(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    warn!(path = %self.path.display(), "state file corrupt, resetting: {e}");
                    StrategyState::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => StrategyState::default(),
            Err(e) => {
                warn!(path = %self.path.display(), "state file unreadable, resetting: {e}");
                StrategyState::default()
            }
        };
        StrategyState {
            index: state.index % catalog_len,
            status: state.status,
        }
    }

    /// Persist the state, atomically with respect to a crash.
    ///
    /// Written to a sibling temp file and renamed over the target, so a
    /// torn write can never leave a half-written status behind. Failures
    /// are logged and swallowed: the next load sees the previous state or
    /// resets, both acceptable.
    pub fn save(&self, state: &StrategyState) {
        if let Err(e) = self.try_save(state) {
            warn!(path = %self.path.display(), "failed to persist strategy state: {e}");
        } else {
            debug!(index = state.index, status = ?state.status, "strategy state persisted");
        }
    }

    fn try_save(&self, state: &StrategyState) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
    }
}
