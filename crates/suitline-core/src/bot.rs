//! Computer opponents.
//!
//! Bots only ever choose from `GameState::valid_actions`, so anything they
//! submit passes validation.
//! - Easy: random legal moves (never forfeits)
//! - Medium: greedy damage with a simple deployment plan

use crate::actions::Action;
use crate::combat::{resolve_attack, CombatRules};
use crate::deck::{Card, RankScale};
use crate::state::{GameState, Phase, COLUMNS};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    #[default]
    Medium,
}

impl std::str::FromStr for BotDifficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(BotDifficulty::Easy),
            "medium" => Ok(BotDifficulty::Medium),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

/// A bot player that can decide on actions
pub struct Bot {
    pub player_index: usize,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(player_index: usize, difficulty: BotDifficulty) -> Self {
        Self {
            player_index,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player_index: usize, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            player_index,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick an action, or `None` when it is not this bot's move
    pub fn choose_action(&mut self, game: &GameState) -> Option<Action> {
        if game.is_finished() || game.active_player_index != self.player_index {
            return None;
        }

        let valid_actions: Vec<Action> = game
            .valid_actions()
            .into_iter()
            .filter(|a| !matches!(a, Action::Forfeit { .. }))
            .collect();
        if valid_actions.is_empty() {
            return None;
        }

        match self.difficulty {
            BotDifficulty::Easy => self.choose_easy(&valid_actions),
            BotDifficulty::Medium => self.choose_medium(game, &valid_actions),
        }
    }

    /// Easy: Just pick a random valid action
    fn choose_easy(&mut self, actions: &[Action]) -> Option<Action> {
        actions.choose(&mut self.rng).cloned()
    }

    /// Medium: Use basic heuristics
    fn choose_medium(&mut self, game: &GameState, actions: &[Action]) -> Option<Action> {
        let player_index = self.player_index;
        let chosen = match game.phase {
            Phase::Deployment => self.plan_deployment(game),
            Phase::Combat => self
                .best_attack(game, actions)
                .or_else(|| actions.iter().find(|a| matches!(a, Action::Pass { .. })).cloned()),
            Phase::Reinforcement => strongest_card(&game.players[player_index].hand)
                .map(|card| Action::Reinforce { player_index, card }),
            Phase::Setup | Phase::GameOver => None,
        };
        chosen.or_else(|| self.choose_easy(actions))
    }

    /// Strongest card first, fronts before backs
    fn plan_deployment(&self, game: &GameState) -> Option<Action> {
        let side = &game.players[self.player_index];
        let card = strongest_card(&side.hand)?;
        let columns = 0..COLUMNS as u8;
        let column = columns
            .clone()
            .find(|&col| side.battlefield.front(col).is_none())
            .or_else(|| columns.into_iter().find(|&col| !side.battlefield.is_column_full(col)))?;

        Some(Action::Deploy {
            player_index: self.player_index,
            card,
            column,
        })
    }

    /// Rank attacks by life-point damage, then by cards destroyed
    fn best_attack(&mut self, game: &GameState, actions: &[Action]) -> Option<Action> {
        let rules = CombatRules::engine(game.options().rule_variant);
        let me = &game.players[self.player_index];
        let opponent = &game.players[GameState::opponent_of(self.player_index)];

        let mut scored: Vec<((u32, usize), &Action)> = actions
            .iter()
            .filter_map(|action| match action {
                Action::Attack {
                    attacker_position, ..
                } => {
                    let attacker = me.battlefield.get(*attacker_position)?.card;
                    let outcome = resolve_attack(&rules, attacker, opponent, attacker_position.col);
                    Some(((outcome.column.lp_damage, outcome.discarded.len()), action))
                }
                _ => None,
            })
            .collect();

        let best = scored.iter().map(|(score, _)| *score).max()?;
        scored.retain(|(score, _)| *score == best);
        scored.choose(&mut self.rng).map(|(_, action)| (*action).clone())
    }
}

fn strongest_card(hand: &[Card]) -> Option<Card> {
    hand.iter()
        .copied()
        .max_by_key(|card| (card.value(RankScale::Full), card.suit))
}
