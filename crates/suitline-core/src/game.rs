//! Turn dispatcher and phase state machine.
//!
//! `GameState::apply_action` validates an action against the current
//! snapshot, applies it to a copy, and appends one hash-chained
//! `TransactionLogEntry`. A rejected action leaves the caller's state as it was.

use crate::actions::{Action, ActionDetails, TransactionLogEntry};
use crate::combat::{resolve_attack, CombatLogEntry, CombatRules};
use crate::deck::Card;
use crate::state::{
    DamageMode, GameState, Outcome, Phase, PlayerState, Position, ReinforcementContext,
    StateView, VictoryType, COLUMNS, REINFORCEMENT_HAND_SIZE,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Game is over")]
    GameOver,

    #[error("Cannot {action} during {phase}")]
    InvalidPhase { action: String, phase: Phase },

    #[error("Not player {player}'s turn")]
    NotYourTurn { player: usize },

    #[error("Unknown player index {0}")]
    UnknownPlayer(usize),

    #[error("Column {0} does not exist")]
    InvalidColumn(u8),

    #[error("Position {0} is off the battlefield")]
    InvalidPosition(Position),

    #[error("Position {0} is already occupied")]
    SlotOccupied(Position),

    #[error("Column {0} is full")]
    ColumnFull(u8),

    #[error("Card {0} not found in hand")]
    CardNotInHand(Card),

    #[error("No card at attacker position {0}")]
    EmptyAttacker(Position),

    #[error("Attacker must be in the front row, got {0}")]
    AttackerNotInFront(Position),

    #[error("Target column {target} must match attacker column {attacker}")]
    ColumnMismatch { attacker: u8, target: u8 },

    #[error("No reinforcement in progress")]
    NoReinforcement,
}

/// Computes a state hash for the transaction log.
///
/// The hash covers `StateView`, which leaves out the log itself.
pub trait StateHasher {
    fn hash_state(&self, view: &StateView<'_>) -> String;
}

impl<F> StateHasher for F
where
    F: Fn(&StateView<'_>) -> String,
{
    fn hash_state(&self, view: &StateView<'_>) -> String {
        self(view)
    }
}

/// Per-call knobs for `apply_action`
#[derive(Clone, Copy, Default)]
pub struct ApplyOptions<'a> {
    pub hasher: Option<&'a dyn StateHasher>,
    /// Stored verbatim in the log entry
    pub timestamp: u64,
}

impl<'a> ApplyOptions<'a> {
    pub fn with_hasher(hasher: &'a dyn StateHasher) -> Self {
        Self {
            hasher: Some(hasher),
            timestamp: 0,
        }
    }

    pub fn at(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl GameState {
    /// Apply an action, producing the next snapshot.
    ///
    /// Validation runs against `self` before anything is copied or changed.
    pub fn apply_action(
        &self,
        action: &Action,
        options: &ApplyOptions<'_>,
    ) -> Result<GameState, GameError> {
        if let Err(err) = self.validate(action) {
            debug!(
                action = action.kind(),
                player = action.player_index(),
                phase = %self.phase,
                error = %err,
                "rejected action"
            );
            return Err(err);
        }

        let state_hash_before = options.hasher.map(|h| h.hash_state(&self.view()));
        let mut next = self.clone();
        let details = next.execute(action)?;
        let state_hash_after = options.hasher.map(|h| h.hash_state(&next.view()));

        let sequence_number = next.transaction_log.len() as u64;
        next.transaction_log.push(TransactionLogEntry {
            sequence_number,
            action: action.clone(),
            state_hash_before,
            state_hash_after,
            timestamp: options.timestamp,
            phase_after: next.phase,
            details,
        });

        debug!(
            sequence = sequence_number,
            action = action.kind(),
            player = action.player_index(),
            phase = %next.phase,
            turn = next.turn_number,
            "applied action"
        );
        if next.phase != self.phase {
            info!(from = %self.phase, to = %next.phase, turn = next.turn_number, "phase change");
        }

        Ok(next)
    }

    /// Check an action against the current phase, turn and board
    pub fn validate(&self, action: &Action) -> Result<(), GameError> {
        if self.phase == Phase::GameOver {
            return Err(GameError::GameOver);
        }

        let player = action.player_index();
        if player > 1 {
            return Err(GameError::UnknownPlayer(player));
        }

        match action {
            Action::Deploy { card, column, .. } => {
                self.require_phase(action, &[Phase::Deployment])?;
                self.require_active(player)?;
                if *column as usize >= COLUMNS {
                    return Err(GameError::InvalidColumn(*column));
                }
                let side = &self.players[player];
                if side.battlefield.is_column_full(*column) {
                    return Err(GameError::ColumnFull(*column));
                }
                if !side.has_in_hand(*card) {
                    return Err(GameError::CardNotInHand(*card));
                }
            }

            Action::Attack {
                attacker_position,
                target_position,
                ..
            } => {
                self.require_phase(action, &[Phase::Combat])?;
                self.require_active(player)?;
                if attacker_position.index().is_none() {
                    return Err(GameError::InvalidPosition(*attacker_position));
                }
                if target_position.index().is_none() {
                    return Err(GameError::InvalidPosition(*target_position));
                }
                if !attacker_position.is_front() {
                    return Err(GameError::AttackerNotInFront(*attacker_position));
                }
                if !self.players[player]
                    .battlefield
                    .is_occupied(*attacker_position)
                {
                    return Err(GameError::EmptyAttacker(*attacker_position));
                }
                if target_position.col != attacker_position.col {
                    return Err(GameError::ColumnMismatch {
                        attacker: attacker_position.col,
                        target: target_position.col,
                    });
                }
            }

            Action::Pass { .. } => {
                self.require_phase(action, &[Phase::Combat])?;
                self.require_active(player)?;
            }

            Action::Reinforce { card, .. } => {
                self.require_phase(action, &[Phase::Reinforcement])?;
                let ctx = self.reinforcement.ok_or(GameError::NoReinforcement)?;
                self.require_active(player)?;
                let side = &self.players[player];
                if side.battlefield.is_column_full(ctx.column) {
                    return Err(GameError::ColumnFull(ctx.column));
                }
                if !side.has_in_hand(*card) {
                    return Err(GameError::CardNotInHand(*card));
                }
            }

            Action::Forfeit { .. } => {
                self.require_phase(action, &[Phase::Combat, Phase::Reinforcement])?;
                self.require_active(player)?;
            }
        }

        Ok(())
    }

    /// Every legal action for the active player
    pub fn valid_actions(&self) -> Vec<Action> {
        let player = self.active_player_index;
        let side = match self.players.get(player) {
            Some(side) => side,
            None => return Vec::new(),
        };
        let mut actions = Vec::new();

        match self.phase {
            Phase::Setup | Phase::GameOver => {}

            Phase::Deployment => {
                for card in &side.hand {
                    for column in 0..COLUMNS as u8 {
                        if !side.battlefield.is_column_full(column) {
                            actions.push(Action::Deploy {
                                player_index: player,
                                card: *card,
                                column,
                            });
                        }
                    }
                }
            }

            Phase::Combat => {
                for column in 0..COLUMNS as u8 {
                    if side.battlefield.front(column).is_some() {
                        actions.push(Action::attack_column(player, column));
                    }
                }
                actions.push(Action::Pass {
                    player_index: player,
                });
                actions.push(Action::Forfeit {
                    player_index: player,
                });
            }

            Phase::Reinforcement => {
                for card in &side.hand {
                    actions.push(Action::Reinforce {
                        player_index: player,
                        card: *card,
                    });
                }
                actions.push(Action::Forfeit {
                    player_index: player,
                });
            }
        }

        actions
    }

    // ==================== Transitions ====================

    fn execute(&mut self, action: &Action) -> Result<ActionDetails, GameError> {
        match *action {
            Action::Deploy {
                player_index,
                card,
                column,
            } => self.deploy(player_index, card, column),

            Action::Attack {
                player_index,
                attacker_position,
                ..
            } => self.attack(player_index, attacker_position),

            Action::Pass { .. } => {
                self.end_turn();
                Ok(ActionDetails::Pass)
            }

            Action::Reinforce { player_index, card } => self.reinforce(player_index, card),

            Action::Forfeit { player_index } => {
                self.finish(Outcome {
                    winner: GameState::opponent_of(player_index),
                    victory_type: VictoryType::Forfeit,
                });
                Ok(ActionDetails::Forfeit)
            }
        }
    }

    fn deploy(&mut self, player: usize, card: Card, column: u8) -> Result<ActionDetails, GameError> {
        let position = self.players[player].deploy(card, column)?;
        self.turn_number += 1;

        let opponent = GameState::opponent_of(player);
        let combat_started = !can_deploy(&self.players[0]) && !can_deploy(&self.players[1]);
        if combat_started {
            // Whoever placed the last card opens combat
            for side in &mut self.players {
                side.battlefield.reveal_all();
            }
            self.phase = Phase::Combat;
            self.turn_number = 1;
            self.active_player_index = player;
        } else if can_deploy(&self.players[opponent]) {
            self.active_player_index = opponent;
        }

        Ok(ActionDetails::Deploy {
            position,
            combat_started,
        })
    }

    fn attack(&mut self, player: usize, attacker_position: Position) -> Result<ActionDetails, GameError> {
        let attacker_card = self.players[player]
            .battlefield
            .get(attacker_position)
            .map(|slot| slot.card)
            .ok_or(GameError::EmptyAttacker(attacker_position))?;
        let column = attacker_position.col;
        let defender = GameState::opponent_of(player);
        let rules = CombatRules::engine(self.options().rule_variant);

        let resolution = resolve_attack(&rules, attacker_card, &self.players[defender], column);
        let broke = resolution.column.any_destroyed();
        self.players[defender] = resolution.defender;
        if broke {
            self.players[defender].battlefield.advance_column(column);
        }

        let combat_log = CombatLogEntry {
            turn_number: self.turn_number,
            attacker_player_index: player,
            attacker_card,
            target_column: column,
            base_damage: resolution.base_damage,
            steps: resolution.column.steps,
            total_lp_damage: resolution.column.lp_damage,
        };

        let defender_side = &self.players[defender];
        let needs_reinforcement = broke
            && !defender_side.hand.is_empty()
            && !defender_side.battlefield.is_column_full(column);

        if let Some(outcome) = self.check_victory(player) {
            self.finish(outcome);
        } else if needs_reinforcement {
            self.phase = Phase::Reinforcement;
            self.reinforcement = Some(ReinforcementContext {
                column,
                attacker_index: player,
            });
            self.active_player_index = defender;
        } else {
            self.end_turn();
        }

        if self.options().damage_mode == DamageMode::PerTurn {
            self.players[defender].battlefield.heal_column(column);
        }

        Ok(ActionDetails::Attack(combat_log))
    }

    fn reinforce(&mut self, player: usize, card: Card) -> Result<ActionDetails, GameError> {
        let ctx = self.reinforcement.ok_or(GameError::NoReinforcement)?;
        let side = &mut self.players[player];
        let position = side.reinforce(card, ctx.column)?;

        let completed = side.battlefield.is_column_full(ctx.column) || side.hand.is_empty();
        let mut drawn = 0;
        if completed {
            drawn = side.refill_hand(REINFORCEMENT_HAND_SIZE);
            self.reinforcement = None;
            self.phase = Phase::Combat;
            self.active_player_index = ctx.attacker_index;
            self.turn_number += 1;
            if let Some(outcome) = self.check_victory(ctx.attacker_index) {
                self.finish(outcome);
            }
        }

        Ok(ActionDetails::Reinforce {
            position,
            completed,
            drawn,
        })
    }

    fn end_turn(&mut self) {
        self.active_player_index = GameState::opponent_of(self.active_player_index);
        self.turn_number += 1;
    }

    fn finish(&mut self, outcome: Outcome) {
        info!(
            winner = outcome.winner,
            victory = ?outcome.victory_type,
            turn = self.turn_number,
            "match finished"
        );
        self.phase = Phase::GameOver;
        self.reinforcement = None;
        self.outcome = Some(outcome);
    }

    /// Victory check from the point of view of `acting`: the opponent is
    /// examined first, then the acting player.
    pub fn check_victory(&self, acting: usize) -> Option<Outcome> {
        let opponent = GameState::opponent_of(acting);
        [opponent, acting].into_iter().find_map(|loser| {
            defeat_reason(&self.players[loser]).map(|victory_type| Outcome {
                winner: GameState::opponent_of(loser),
                victory_type,
            })
        })
    }

    fn require_phase(&self, action: &Action, allowed: &[Phase]) -> Result<(), GameError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(GameError::InvalidPhase {
                action: action.kind().to_string(),
                phase: self.phase,
            })
        }
    }

    fn require_active(&self, player: usize) -> Result<(), GameError> {
        if player == self.active_player_index {
            Ok(())
        } else {
            Err(GameError::NotYourTurn { player })
        }
    }
}

fn can_deploy(side: &PlayerState) -> bool {
    !side.battlefield.is_full() && !side.hand.is_empty()
}

fn defeat_reason(side: &PlayerState) -> Option<VictoryType> {
    if side.lifepoints == 0 {
        Some(VictoryType::LpDepletion)
    } else if side.is_out_of_cards() {
        Some(VictoryType::CardDepletion)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::create_deck;
    use crate::state::{GameConfig, PlayerInfo};
    use pretty_assertions::assert_eq;

    fn card(code: &str) -> Card {
        code.parse().unwrap()
    }

    fn config() -> GameConfig {
        GameConfig::new(
            [PlayerInfo::new("p1", "Alice"), PlayerInfo::new("p2", "Bob")],
            31337,
        )
    }

    fn apply(state: &GameState, action: Action) -> GameState {
        state.apply_action(&action, &ApplyOptions::default()).unwrap()
    }

    /// Combat-phase state with hand-picked columns for both sides
    fn combat_state(attacker: &[(u8, &str)], defender: &[(u8, &str)]) -> GameState {
        let mut state = GameState::start_match(config());
        for (side, placements) in [(0, attacker), (1, defender)] {
            let player = &mut state.players[side];
            player.hand.clear();
            for (col, code) in placements {
                player.hand.push(card(code));
                player.deploy(card(code), *col).unwrap();
            }
            player.battlefield.reveal_all();
        }
        state.phase = Phase::Combat;
        state.turn_number = 1;
        state.active_player_index = 0;
        state
    }

    #[test]
    fn test_setup_rejects_actions() {
        let state = GameState::new(config());
        let card = state.players[0].drawpile[0];
        let err = state
            .apply_action(
                &Action::Deploy {
                    player_index: 0,
                    card,
                    column: 0,
                },
                &ApplyOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidPhase { .. }));
    }

    #[test]
    fn test_deploy_alternates_players() {
        let state = GameState::start_match(config());
        let card = state.players[0].hand[0];
        let next = apply(
            &state,
            Action::Deploy {
                player_index: 0,
                card,
                column: 1,
            },
        );
        assert_eq!(next.active_player_index, 1);
        assert_eq!(next.turn_number, 1);
        assert_eq!(next.players[0].hand.len(), 11);
        assert_eq!(next.players[0].battlefield.front(1).unwrap().card, card);
        assert_eq!(next.transaction_log.len(), 1);
        // the original snapshot is untouched
        assert_eq!(state.players[0].hand.len(), 12);
        assert!(state.transaction_log.is_empty());
    }

    #[test]
    fn test_full_deployment_starts_combat() {
        let mut state = GameState::start_match(config());
        for step in 0..16 {
            assert_eq!(state.phase, Phase::Deployment);
            assert_eq!(state.active_player_index, step % 2);
            let action = state.valid_actions()[0].clone();
            state = apply(&state, action);
        }

        assert_eq!(state.phase, Phase::Combat);
        assert_eq!(state.turn_number, 1);
        assert_eq!(state.active_player_index, 1);
        for player in &state.players {
            assert!(player.battlefield.is_full());
            assert_eq!(player.hand.len(), 4);
            assert!(player.battlefield.occupied().all(|s| !s.face_down));
        }
        assert_eq!(
            state.transaction_log.last().map(|e| &e.details),
            Some(&ActionDetails::Deploy {
                position: Position::back(3),
                combat_started: true
            })
        );
    }

    #[test]
    fn test_deploy_validation() {
        let state = GameState::start_match(config());
        let card0 = state.players[0].hand[0];
        let card1 = state.players[1].hand[0];
        let opts = ApplyOptions::default();

        let wrong_turn = Action::Deploy {
            player_index: 1,
            card: card1,
            column: 0,
        };
        assert_eq!(
            state.apply_action(&wrong_turn, &opts).unwrap_err(),
            GameError::NotYourTurn { player: 1 }
        );

        let missing = create_deck()
            .into_iter()
            .find(|c| !state.players[0].has_in_hand(*c))
            .unwrap();
        let not_in_hand = Action::Deploy {
            player_index: 0,
            card: missing,
            column: 0,
        };
        assert_eq!(
            state.apply_action(&not_in_hand, &opts).unwrap_err(),
            GameError::CardNotInHand(missing)
        );

        let bad_column = Action::Deploy {
            player_index: 0,
            card: card0,
            column: 4,
        };
        assert_eq!(
            state.apply_action(&bad_column, &opts).unwrap_err(),
            GameError::InvalidColumn(4)
        );

        let unknown = Action::Pass { player_index: 2 };
        assert_eq!(
            state.apply_action(&unknown, &opts).unwrap_err(),
            GameError::UnknownPlayer(2)
        );
    }

    #[test]
    fn test_attack_must_stay_in_column() {
        let state = combat_state(&[(0, "5S")], &[(1, "3H")]);
        let opts = ApplyOptions::default();

        let sideways = Action::Attack {
            player_index: 0,
            attacker_position: Position::front(0),
            target_position: Position::front(1),
        };
        assert_eq!(
            state.apply_action(&sideways, &opts).unwrap_err(),
            GameError::ColumnMismatch {
                attacker: 0,
                target: 1
            }
        );

        let empty = Action::attack_column(0, 2);
        assert_eq!(
            state.apply_action(&empty, &opts).unwrap_err(),
            GameError::EmptyAttacker(Position::front(2))
        );

        let from_back = Action::Attack {
            player_index: 0,
            attacker_position: Position::back(0),
            target_position: Position::front(0),
        };
        assert_eq!(
            state.apply_action(&from_back, &opts).unwrap_err(),
            GameError::AttackerNotInFront(Position::back(0))
        );

        let off_board = Action::Attack {
            player_index: 0,
            attacker_position: Position::new(0, 9),
            target_position: Position::front(0),
        };
        assert_eq!(
            state.apply_action(&off_board, &opts).unwrap_err(),
            GameError::InvalidPosition(Position::new(0, 9))
        );
    }

    #[test]
    fn test_attack_open_column_hits_lifepoints() {
        let state = combat_state(&[(2, "9S")], &[(0, "4D")]);
        let next = apply(&state, Action::attack_column(0, 2));

        assert_eq!(next.players[1].lifepoints, 2);
        assert_eq!(next.active_player_index, 1);
        assert_eq!(next.turn_number, 2);
        match &next.transaction_log[0].details {
            ActionDetails::Attack(log) => {
                assert_eq!(log.base_damage, 9);
                assert_eq!(log.total_lp_damage, 18);
                assert_eq!(log.target_column, 2);
                assert_eq!(log.attacker_card, card("9S"));
            }
            other => panic!("unexpected details {other:?}"),
        }
    }

    #[test]
    fn test_lp_depletion_ends_match() {
        let mut state = combat_state(&[(0, "KS")], &[(3, "2D")]);
        state.players[1].lifepoints = 10;
        let next = apply(&state, Action::attack_column(0, 0));

        assert_eq!(next.phase, Phase::GameOver);
        assert_eq!(
            next.outcome,
            Some(Outcome {
                winner: 0,
                victory_type: VictoryType::LpDepletion
            })
        );
        assert_eq!(
            next.apply_action(&Action::Pass { player_index: 1 }, &ApplyOptions::default())
                .unwrap_err(),
            GameError::GameOver
        );
    }

    #[test]
    fn test_broken_column_opens_reinforcement() {
        let mut state = combat_state(&[(1, "8C")], &[(1, "3D"), (1, "6S")]);
        state.players[1].hand = vec![card("4H"), card("7H")];

        let next = apply(&state, Action::attack_column(0, 1));
        assert_eq!(next.phase, Phase::Reinforcement);
        assert_eq!(next.active_player_index, 1);
        assert_eq!(
            next.reinforcement,
            Some(ReinforcementContext {
                column: 1,
                attacker_index: 0
            })
        );
        // back card advanced to the front
        assert_eq!(next.players[1].battlefield.front(1).unwrap().card, card("6S"));
        assert!(next.players[1].battlefield.back(1).is_none());
        assert_eq!(next.players[1].discard_pile, vec![card("3D")]);

        let done = apply(
            &next,
            Action::Reinforce {
                player_index: 1,
                card: card("4H"),
            },
        );
        assert_eq!(done.phase, Phase::Combat);
        assert_eq!(done.active_player_index, 0);
        assert!(done.reinforcement.is_none());
        assert_eq!(done.players[1].battlefield.back(1).unwrap().card, card("4H"));
        // refilled to four from the drawpile
        assert_eq!(done.players[1].hand.len(), REINFORCEMENT_HAND_SIZE);
    }

    #[test]
    fn test_victory_preempts_reinforcement() {
        // 13 - 2 = 11 overflow, doubled by the spade: lethal from 20
        let mut state = combat_state(&[(0, "KS")], &[(0, "2S"), (2, "9D")]);
        state.players[1].hand = vec![card("4H"), card("5H")];

        let next = apply(&state, Action::attack_column(0, 0));
        assert_eq!(next.players[1].discard_pile, vec![card("2S")]);
        assert_eq!(next.players[1].lifepoints, 0);
        assert_eq!(next.phase, Phase::GameOver);
        assert_eq!(next.reinforcement, None);
        assert_eq!(
            next.outcome,
            Some(Outcome {
                winner: 0,
                victory_type: VictoryType::LpDepletion
            })
        );
    }

    #[test]
    fn test_reinforcement_ends_when_hand_runs_out() {
        let mut state = combat_state(&[(1, "8C")], &[(1, "2S"), (3, "9D")]);
        state.players[1].hand = vec![card("4H")];

        let broken = apply(&state, Action::attack_column(0, 1));
        assert_eq!(broken.phase, Phase::Reinforcement);
        assert_eq!(broken.active_player_index, 1);

        let done = apply(
            &broken,
            Action::Reinforce {
                player_index: 1,
                card: card("4H"),
            },
        );
        let defender = &done.players[1];
        assert!(!defender.battlefield.is_column_full(1));
        assert_eq!(defender.battlefield.front(1).unwrap().card, card("4H"));
        assert_eq!(defender.hand.len(), REINFORCEMENT_HAND_SIZE);
        assert_eq!(done.phase, Phase::Combat);
        assert_eq!(done.active_player_index, 0);
        assert_eq!(done.turn_number, 2);
        assert!(done.reinforcement.is_none());
        assert_eq!(
            done.transaction_log.last().map(|e| &e.details),
            Some(&ActionDetails::Reinforce {
                position: Position::front(1),
                completed: true,
                drawn: REINFORCEMENT_HAND_SIZE,
            })
        );
    }

    #[test]
    fn test_reinforcement_rejects_other_actions() {
        let mut state = combat_state(&[(1, "8C")], &[(1, "3D"), (1, "6S")]);
        state.players[1].hand = vec![card("4H")];
        let next = apply(&state, Action::attack_column(0, 1));
        let opts = ApplyOptions::default();

        assert!(matches!(
            next.apply_action(&Action::attack_column(1, 1), &opts),
            Err(GameError::InvalidPhase { .. })
        ));
        assert_eq!(
            next.apply_action(
                &Action::Reinforce {
                    player_index: 0,
                    card: card("4H")
                },
                &opts
            )
            .unwrap_err(),
            GameError::NotYourTurn { player: 0 }
        );
        assert_eq!(
            next.apply_action(
                &Action::Reinforce {
                    player_index: 1,
                    card: card("KS")
                },
                &opts
            )
            .unwrap_err(),
            GameError::CardNotInHand(card("KS"))
        );
    }

    #[test]
    fn test_no_reinforcement_without_hand() {
        let state = combat_state(&[(1, "8C")], &[(1, "3D"), (1, "6S"), (0, "2S")]);
        let next = apply(&state, Action::attack_column(0, 1));
        assert_eq!(next.phase, Phase::Combat);
        assert_eq!(next.active_player_index, 1);
    }

    #[test]
    fn test_card_depletion_victory() {
        let mut state = combat_state(&[(0, "TS")], &[(0, "2H")]);
        state.players[1].drawpile.clear();
        let next = apply(&state, Action::attack_column(0, 0));
        assert_eq!(
            next.outcome,
            Some(Outcome {
                winner: 0,
                victory_type: VictoryType::CardDepletion
            })
        );
    }

    #[test]
    fn test_per_turn_damage_heals_survivors() {
        let mut state = combat_state(&[(0, "4C")], &[(0, "9S")]);
        state.config.game_options.damage_mode = DamageMode::PerTurn;
        let next = apply(&state, Action::attack_column(0, 0));
        assert_eq!(next.players[1].battlefield.front(0).unwrap().current_hp, 9);

        let mut persistent = combat_state(&[(0, "4C")], &[(0, "9S")]);
        persistent.config.game_options.damage_mode = DamageMode::Persistent;
        let next = apply(&persistent, Action::attack_column(0, 0));
        assert_eq!(next.players[1].battlefield.front(0).unwrap().current_hp, 5);
    }

    #[test]
    fn test_forfeit_and_pass() {
        let state = combat_state(&[(0, "4C")], &[(0, "9S")]);
        let passed = apply(&state, Action::Pass { player_index: 0 });
        assert_eq!(passed.active_player_index, 1);
        assert_eq!(passed.turn_number, 2);

        let forfeited = apply(&passed, Action::Forfeit { player_index: 1 });
        assert_eq!(
            forfeited.outcome,
            Some(Outcome {
                winner: 0,
                victory_type: VictoryType::Forfeit
            })
        );

        let deploying = GameState::start_match(config());
        assert!(matches!(
            deploying.apply_action(&Action::Forfeit { player_index: 0 }, &ApplyOptions::default()),
            Err(GameError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_valid_actions_by_phase() {
        let state = GameState::start_match(config());
        let actions = state.valid_actions();
        assert_eq!(actions.len(), 12 * 4);
        assert!(actions.iter().all(|a| matches!(a, Action::Deploy { .. })));

        let combat = combat_state(&[(0, "4C"), (3, "5D")], &[(0, "9S")]);
        let actions = combat.valid_actions();
        assert!(actions.contains(&Action::attack_column(0, 0)));
        assert!(actions.contains(&Action::attack_column(0, 3)));
        assert!(actions.contains(&Action::Pass { player_index: 0 }));
        assert_eq!(actions.len(), 4);

        for action in &actions {
            assert!(combat.validate(action).is_ok(), "{action:?} should validate");
        }
    }

    #[test]
    fn test_hashes_recorded_when_hasher_supplied() {
        fn turn_hasher(view: &StateView<'_>) -> String {
            format!("{}:{}:{}", view.phase, view.turn_number, view.active_player_index)
        }

        let state = combat_state(&[(0, "4C")], &[(0, "9S")]);
        let opts = ApplyOptions::with_hasher(&turn_hasher).at(1_700_000_000_000);
        let next = state
            .apply_action(&Action::Pass { player_index: 0 }, &opts)
            .unwrap();
        let entry = &next.transaction_log[0];
        assert_eq!(entry.state_hash_before.as_deref(), Some("combat:1:0"));
        assert_eq!(entry.state_hash_after.as_deref(), Some("combat:2:1"));
        assert_eq!(entry.timestamp, 1_700_000_000_000);

        let unhashed = apply(&state, Action::Pass { player_index: 0 });
        assert!(unhashed.transaction_log[0].state_hash_before.is_none());
    }
}
