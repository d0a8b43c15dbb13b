//! Match session management.
//!
//! A `MatchSession` owns the authoritative state of one match, stamps every
//! action with a SHA-256 state hash and persists the action list as a
//! `MatchRecord` JSON file.

use std::fs;
use std::path::Path;

use serde::Serialize;
use suitline_core::{
    verify_hash_chain, Action, ApplyOptions, ChainError, GameConfig, GameError, GameState,
    MatchRecord, TransactionLogEntry,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::hashing::sha256_state;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Match is already finished")]
    MatchFinished,

    #[error("Not seat {0}'s turn")]
    NotYourTurn(usize),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Action rejected: {0}")]
    Rejected(#[from] GameError),

    #[error("Replay stopped at action {index}: {error}")]
    ReplayStopped { index: usize, error: GameError },

    #[error("Hash chain broken: {0}")]
    Chain(#[from] ChainError),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Malformed match record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    InProgress,
    Finished,
}

/// One match, hashed and persisted
pub struct MatchSession {
    pub name: String,
    pub status: SessionStatus,
    state: GameState,
}

/// Printable end-of-match summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub name: String,
    pub status: SessionStatus,
    pub actions: usize,
    pub turn_number: u32,
    pub phase: String,
    pub lifepoints: [u32; 2],
    pub winner: Option<String>,
    pub victory_type: Option<String>,
    pub final_hash: Option<String>,
}

impl MatchSession {
    pub fn new(name: impl Into<String>, config: GameConfig) -> Self {
        let name = name.into();
        info!(session = %name, seed = config.rng_seed, "starting match");
        Self {
            name,
            status: SessionStatus::InProgress,
            state: GameState::start_match(config),
        }
    }

    /// Rebuild a session from a record, re-hashing every step
    pub fn from_record(name: impl Into<String>, record: &MatchRecord) -> Result<Self, SessionError> {
        let result = record.replay(&ApplyOptions::with_hasher(&sha256_state));
        if let Some(failure) = result.failure {
            return Err(SessionError::ReplayStopped {
                index: failure.failed_at_index,
                error: failure.error,
            });
        }

        let state = result.state;
        let status = if state.is_finished() {
            SessionStatus::Finished
        } else {
            SessionStatus::InProgress
        };
        Ok(Self {
            name: name.into(),
            status,
            state,
        })
    }

    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let json = fs::read_to_string(path)?;
        let record: MatchRecord = serde_json::from_str(&json)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "match".to_string());
        Self::from_record(name, &record)
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(&self.record())?;
        fs::write(path, json)?;
        info!(session = %self.name, path = %path.display(), "match record saved");
        Ok(())
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn record(&self) -> MatchRecord {
        MatchRecord::from_state(&self.state)
    }

    pub fn log(&self) -> &[TransactionLogEntry] {
        &self.state.transaction_log
    }

    /// Apply an action arriving as JSON from `seat`
    pub fn apply_json(
        &mut self,
        seat: usize,
        action: serde_json::Value,
        timestamp: u64,
    ) -> Result<&TransactionLogEntry, SessionError> {
        let action: Action = serde_json::from_value(action)
            .map_err(|e| SessionError::InvalidAction(e.to_string()))?;
        if action.player_index() != seat {
            return Err(SessionError::InvalidAction(format!(
                "seat {seat} cannot act for player {}",
                action.player_index()
            )));
        }
        self.apply(action, timestamp)
    }

    pub fn apply(&mut self, action: Action, timestamp: u64) -> Result<&TransactionLogEntry, SessionError> {
        if self.status == SessionStatus::Finished {
            return Err(SessionError::MatchFinished);
        }
        if action.player_index() != self.state.active_player_index {
            return Err(SessionError::NotYourTurn(action.player_index()));
        }

        let options = ApplyOptions::with_hasher(&sha256_state).at(timestamp);
        let entry_index = self.state.transaction_log.len();
        self.state = self.state.apply_action(&action, &options)?;
        debug!(session = %self.name, action = action.kind(), "session action");

        if self.state.is_finished() {
            self.status = SessionStatus::Finished;
            info!(session = %self.name, winner = ?self.state.winner(), "match over");
        }

        // apply_action appends exactly one entry
        Ok(&self.state.transaction_log[entry_index])
    }

    pub fn get_valid_actions(&self) -> Vec<serde_json::Value> {
        self.state
            .valid_actions()
            .into_iter()
            .filter_map(|a| serde_json::to_value(a).ok())
            .collect()
    }

    pub fn get_winner(&self) -> Option<(usize, String)> {
        let winner = self.state.winner()?;
        let name = self.state.players.get(winner)?.name.clone();
        Some((winner, name))
    }

    pub fn verify(&self) -> Result<(), SessionError> {
        verify_hash_chain(self.log())?;
        Ok(())
    }

    pub fn summary(&self) -> SessionSummary {
        let outcome = self.state.outcome;
        SessionSummary {
            name: self.name.clone(),
            status: self.status,
            actions: self.state.transaction_log.len(),
            turn_number: self.state.turn_number,
            phase: self.state.phase.to_string(),
            lifepoints: [self.state.players[0].lifepoints, self.state.players[1].lifepoints],
            winner: self.get_winner().map(|(_, name)| name),
            victory_type: outcome.map(|o| format!("{:?}", o.victory_type)),
            final_hash: self.log().last().and_then(|e| e.state_hash_after.clone()),
        }
    }
}
