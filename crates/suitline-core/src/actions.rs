//! Player actions and the transaction log.
//!
//! This module defines every action a player can submit and the log entry
//! that records each applied action.

use crate::combat::CombatLogEntry;
use crate::deck::Card;
use crate::state::{Phase, Position};
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    // ==================== Deployment ====================
    /// Place a hand card in the first open slot of a column
    #[serde(rename_all = "camelCase")]
    Deploy {
        player_index: usize,
        card: Card,
        column: u8,
    },

    // ==================== Combat ====================
    /// Attack down a column from a front-row card
    #[serde(rename_all = "camelCase")]
    Attack {
        player_index: usize,
        attacker_position: Position,
        target_position: Position,
    },

    /// Hand the turn to the opponent
    #[serde(rename_all = "camelCase")]
    Pass { player_index: usize },

    // ==================== Reinforcement ====================
    /// Refill the broken column from hand
    #[serde(rename_all = "camelCase")]
    Reinforce { player_index: usize, card: Card },

    // ==================== Match Management ====================
    /// Concede the match
    #[serde(rename_all = "camelCase")]
    Forfeit { player_index: usize },
}

impl Action {
    /// The player submitting this action
    pub fn player_index(&self) -> usize {
        match self {
            Action::Deploy { player_index, .. }
            | Action::Attack { player_index, .. }
            | Action::Pass { player_index }
            | Action::Reinforce { player_index, .. }
            | Action::Forfeit { player_index } => *player_index,
        }
    }

    /// Short name used in logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Deploy { .. } => "deploy",
            Action::Attack { .. } => "attack",
            Action::Pass { .. } => "pass",
            Action::Reinforce { .. } => "reinforce",
            Action::Forfeit { .. } => "forfeit",
        }
    }

    /// Attack straight ahead from the front card of `column`
    pub fn attack_column(player_index: usize, column: u8) -> Self {
        Action::Attack {
            player_index,
            attacker_position: Position::front(column),
            target_position: Position::front(column),
        }
    }
}

/// What an applied action did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActionDetails {
    /// Card landed at `position`; `combat_started` when this was the last deployment
    #[serde(rename_all = "camelCase")]
    Deploy {
        position: Position,
        combat_started: bool,
    },

    /// Full combat record of the attack
    Attack(CombatLogEntry),

    Pass,

    /// Card landed at `position`; `drawn` cards were drawn if the window closed
    #[serde(rename_all = "camelCase")]
    Reinforce {
        position: Position,
        completed: bool,
        drawn: usize,
    },

    Forfeit,
}

/// One applied action in the hash-chained log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionLogEntry {
    /// Log length at append time
    pub sequence_number: u64,
    pub action: Action,
    /// Present only when a state hasher was supplied
    pub state_hash_before: Option<String>,
    pub state_hash_after: Option<String>,
    /// Caller-supplied wall clock in milliseconds (0 when not provided)
    pub timestamp: u64,
    pub phase_after: Phase,
    pub details: ActionDetails,
}
