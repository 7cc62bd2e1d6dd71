// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::error::AppError;
use crate::domain::types::ExecutorState;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON file holding the executor state between runs.
#[derive(Debug, Clone)]
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

    /// Missing file means the executor has never rebalanced.
    pub fn load(&self) -> Result<ExecutorState, AppError> {
        if !self.path.exists() {
            tracing::info!(
                target: "state",
                path = %self.path.display(),
                "No state file yet; starting from last_rebalance_timestamp=0"
            );
            return Ok(ExecutorState::default());
        }
        let body = fs::read_to_string(&self.path).map_err(|e| {
            AppError::Initialization(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&body).map_err(|e| {
            AppError::Initialization(format!("Corrupt state file {}: {}", self.path.display(), e))
        })
    }

    /// Write through a temp file and rename so a crash never leaves half a file.
    pub fn save(&self, state: &ExecutorState) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::Initialization(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let body = serde_json::to_string_pretty(state)
            .map_err(|e| AppError::Initialization(format!("Failed to encode state: {}", e)))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| {
            AppError::Initialization(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::Initialization(format!(
                "Failed to move {} into place: {}",
                tmp.display(),
                e
            ))
        })?;
        tracing::debug!(target: "state", path = %self.path.display(), ?state, "State saved");
        Ok(())
    }
}
