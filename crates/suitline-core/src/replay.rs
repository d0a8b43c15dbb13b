//! Deterministic replay and transaction-log integrity checks.
//!
//! A match is fully described by its `GameConfig` plus the ordered actions;
//! replaying them reproduces the same state on any machine.

use crate::actions::{Action, TransactionLogEntry};
use crate::game::{ApplyOptions, GameError};
use crate::state::{GameConfig, GameState, OPENING_HAND_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// The persisted form of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub config: GameConfig,
    pub actions: Vec<Action>,
}

impl MatchRecord {
    /// Rebuild a record from a finished state's log
    pub fn from_state(state: &GameState) -> Self {
        Self {
            config: state.config.clone(),
            actions: state
                .transaction_log
                .iter()
                .map(|entry| entry.action.clone())
                .collect(),
        }
    }

    pub fn replay(&self, options: &ApplyOptions<'_>) -> ReplayResult {
        replay_game(self.config.clone(), &self.actions, options)
    }
}

/// Where a replay stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayFailure {
    pub failed_at_index: usize,
    pub error: GameError,
}

#[derive(Debug, Clone)]
pub struct ReplayResult {
    /// Final state, or the state just before the failing action
    pub state: GameState,
    pub failure: Option<ReplayFailure>,
}

impl ReplayResult {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Rebuild a match from its config and action list.
///
/// Draws opening hands, forces deployment and applies each action in order.
/// Stops at the first rejected action.
pub fn replay_game(config: GameConfig, actions: &[Action], options: &ApplyOptions<'_>) -> ReplayResult {
    let mut state = GameState::new(config);
    for player in 0..2 {
        state.draw_cards(player, OPENING_HAND_SIZE);
    }
    state.begin_deployment();

    for (index, action) in actions.iter().enumerate() {
        match state.apply_action(action, options) {
            Ok(next) => state = next,
            Err(error) => {
                warn!(index, action = action.kind(), %error, "replay stopped");
                return ReplayResult {
                    state,
                    failure: Some(ReplayFailure {
                        failed_at_index: index,
                        error,
                    }),
                };
            }
        }
    }

    debug!(actions = actions.len(), phase = %state.phase, "replay complete");
    ReplayResult {
        state,
        failure: None,
    }
}

/// Problems found while walking a hash-chained log
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Entry {sequence} has no state hash")]
    MissingHash { sequence: u64 },

    #[error("Expected sequence number {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },

    #[error("Entry {sequence} does not start from the previous entry's hash")]
    BrokenLink { sequence: u64 },
}

/// Check sequence numbers run 0..n and each entry starts where the last ended
pub fn verify_hash_chain(log: &[TransactionLogEntry]) -> Result<(), ChainError> {
    let mut previous_after: Option<&str> = None;

    for (expected, entry) in log.iter().enumerate() {
        let expected = expected as u64;
        if entry.sequence_number != expected {
            return Err(ChainError::SequenceGap {
                expected,
                found: entry.sequence_number,
            });
        }

        let (before, after) = match (&entry.state_hash_before, &entry.state_hash_after) {
            (Some(before), Some(after)) => (before.as_str(), after.as_str()),
            _ => {
                return Err(ChainError::MissingHash {
                    sequence: entry.sequence_number,
                })
            }
        };

        if previous_after.is_some_and(|prev| prev != before) {
            return Err(ChainError::BrokenLink {
                sequence: entry.sequence_number,
            });
        }
        previous_after = Some(after);
    }

    Ok(())
}
