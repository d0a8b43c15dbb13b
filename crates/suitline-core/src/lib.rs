//! Suitline - a deterministic two-player card battle engine
//!
//! This crate provides the core rules for Suitline, including:
//! - A seeded 52-card deck and shuffle shared by every client
//! - An 8-slot battlefield per player with front and back rows
//! - Column combat with suit bonuses, in two rule variants
//! - A phase state machine that validates and applies actions
//! - A hash-chained transaction log and deterministic replay
//!
//! # Architecture
//!
//! Every transition takes a state snapshot and returns a new one, so the
//! same config plus the same actions always yield the same match. The engine
//! can be compiled to:
//! - Native Rust for server-side match hosting and auditing
//! - WebAssembly for client-side play
//!
//! # Modules
//!
//! - [`deck`]: Cards, rank values and the seeded shuffle
//! - [`state`]: Battlefield, players and the game state
//! - [`combat`]: Column damage resolution
//! - [`actions`]: Player actions and transaction log entries
//! - [`game`]: Validation and the phase state machine
//! - [`replay`]: Replay and hash-chain verification
//! - [`bot`]: Computer opponents

pub mod actions;
pub mod bot;
pub mod combat;
pub mod deck;
pub mod game;
pub mod replay;
pub mod state;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{Action, ActionDetails, TransactionLogEntry};
pub use bot::{Bot, BotDifficulty};
pub use combat::{
    calculate_damage, resolve_attack, resolve_column, AttackResolution, ColumnResolution,
    CombatLogEntry, CombatRules, CombatStep, RuleVariant, StepKind,
};
pub use deck::{create_deck, shuffle_deck, Card, Mulberry32, Rank, RankScale, Suit};
pub use game::{ApplyOptions, GameError, StateHasher};
pub use replay::{replay_game, verify_hash_chain, ChainError, MatchRecord, ReplayFailure, ReplayResult};
pub use state::{
    Battlefield, BattlefieldSlot, DamageMode, GameConfig, GameOptions, GameState, Outcome, Phase,
    PlayerInfo, PlayerState, Position, StateView, VictoryType,
};
