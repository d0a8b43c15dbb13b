//! Game state shape and the primitives that mutate it.
//!
//! This module contains:
//! - `Position`, `BattlefieldSlot` and the fixed 8-slot `Battlefield`
//! - `PlayerState` with hand, drawpile, discard pile and life points
//! - `GameConfig` / `GameOptions`, the match configuration
//! - `GameState`, `Phase` and the draw / deploy / reinforce primitives
//!
//! Validation lives in the dispatcher (`game.rs`); the primitives here still
//! refuse structurally impossible requests instead of panicking.

use crate::actions::TransactionLogEntry;
use crate::combat::RuleVariant;
use crate::deck::{create_deck, player_seed, shuffle_deck, Card, RankScale};
use crate::game::GameError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rows per side (front, back)
pub const ROWS: usize = 2;

/// Columns per side
pub const COLUMNS: usize = 4;

/// Slots per battlefield
pub const BATTLEFIELD_SLOTS: usize = ROWS * COLUMNS;

/// Life points each player starts with unless configured otherwise
pub const DEFAULT_LIFEPOINTS: u32 = 20;

/// Cards drawn by each player before deployment
pub const OPENING_HAND_SIZE: usize = 12;

/// Hand size a defender refills to after reinforcing
pub const REINFORCEMENT_HAND_SIZE: usize = 4;

/// Row index of the front row
pub const FRONT_ROW: u8 = 0;

/// Row index of the back row
pub const BACK_ROW: u8 = 1;

// ==================== Configuration ====================

/// Whether card damage persists between turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DamageMode {
    #[default]
    Persistent,
    /// Surviving cards in an attacked column heal back to full after the attack
    PerTurn,
}

/// Optional rule switches for a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameOptions {
    pub damage_mode: DamageMode,
    pub rule_variant: RuleVariant,
    pub starting_lifepoints: u32,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            damage_mode: DamageMode::Persistent,
            rule_variant: RuleVariant::IntroRules,
            starting_lifepoints: DEFAULT_LIFEPOINTS,
        }
    }
}

/// Player identity as supplied by the session layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
}

impl PlayerInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Everything needed to create a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub players: [PlayerInfo; 2],
    pub rng_seed: u32,
    #[serde(default)]
    pub game_options: GameOptions,
}

impl GameConfig {
    /// Two players with default options
    pub fn new(players: [PlayerInfo; 2], rng_seed: u32) -> Self {
        Self {
            players,
            rng_seed,
            game_options: GameOptions::default(),
        }
    }

    pub fn with_options(mut self, game_options: GameOptions) -> Self {
        self.game_options = game_options;
        self
    }
}

// ==================== Battlefield ====================

/// A (row, col) coordinate on one side of the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    pub const fn front(col: u8) -> Self {
        Self::new(FRONT_ROW, col)
    }

    pub const fn back(col: u8) -> Self {
        Self::new(BACK_ROW, col)
    }

    /// Slot index (`row * 4 + col`), or `None` when out of range
    pub fn index(&self) -> Option<usize> {
        let (row, col) = (self.row as usize, self.col as usize);
        if row < ROWS && col < COLUMNS {
            Some(row * COLUMNS + col)
        } else {
            None
        }
    }

    pub fn is_front(&self) -> bool {
        self.row == FRONT_ROW
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A card sitting on the battlefield
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattlefieldSlot {
    pub card: Card,
    pub row: u8,
    pub col: u8,
    pub current_hp: u32,
    pub face_down: bool,
}

impl BattlefieldSlot {
    pub fn position(&self) -> Position {
        Position::new(self.row, self.col)
    }

    /// HP the card has when undamaged
    pub fn max_hp(&self) -> u32 {
        card_hp(self.card)
    }
}

/// Starting HP of a card on the engine's value table
pub fn card_hp(card: Card) -> u32 {
    card.value(RankScale::Full) as u32
}

/// One side of the field: 8 slots indexed `row * 4 + col`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battlefield {
    slots: [Option<BattlefieldSlot>; BATTLEFIELD_SLOTS],
}

impl Battlefield {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pos: Position) -> Option<&BattlefieldSlot> {
        pos.index().and_then(|i| self.slots[i].as_ref())
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut BattlefieldSlot> {
        match pos.index() {
            Some(i) => self.slots[i].as_mut(),
            None => None,
        }
    }

    pub fn front(&self, col: u8) -> Option<&BattlefieldSlot> {
        self.get(Position::front(col))
    }

    pub fn back(&self, col: u8) -> Option<&BattlefieldSlot> {
        self.get(Position::back(col))
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.get(pos).is_some()
    }

    /// A column is full when both of its slots hold a card
    pub fn is_column_full(&self, col: u8) -> bool {
        self.is_occupied(Position::front(col)) && self.is_occupied(Position::back(col))
    }

    /// Number of cards on this side
    pub fn card_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.card_count() == 0
    }

    pub fn is_full(&self) -> bool {
        self.card_count() == BATTLEFIELD_SLOTS
    }

    /// Occupied slots in index order
    pub fn occupied(&self) -> impl Iterator<Item = &BattlefieldSlot> {
        self.slots.iter().flatten()
    }

    /// First open slot in a column, front before back
    pub fn first_open_in_column(&self, col: u8) -> Option<Position> {
        [Position::front(col), Position::back(col)]
            .into_iter()
            .find(|p| p.index().is_some() && !self.is_occupied(*p))
    }

    /// Where a reinforcement card goes: the back slot first, then the front
    pub fn reinforcement_target(&self, col: u8) -> Option<Position> {
        [Position::back(col), Position::front(col)]
            .into_iter()
            .find(|p| p.index().is_some() && !self.is_occupied(*p))
    }

    /// Put a card into an empty slot at full HP
    pub fn place(&mut self, pos: Position, card: Card, face_down: bool) -> Result<(), GameError> {
        let index = pos.index().ok_or(GameError::InvalidPosition(pos))?;
        if self.slots[index].is_some() {
            return Err(GameError::SlotOccupied(pos));
        }
        self.slots[index] = Some(BattlefieldSlot {
            card,
            row: pos.row,
            col: pos.col,
            current_hp: card_hp(card),
            face_down,
        });
        Ok(())
    }

    /// Replace whatever is in a slot (used when applying combat results)
    pub fn set(&mut self, pos: Position, slot: Option<BattlefieldSlot>) {
        if let Some(index) = pos.index() {
            self.slots[index] = slot.map(|s| BattlefieldSlot {
                row: pos.row,
                col: pos.col,
                ..s
            });
        }
    }

    pub fn remove(&mut self, pos: Position) -> Option<BattlefieldSlot> {
        pos.index().and_then(|i| self.slots[i].take())
    }

    /// Move the back card of a column into an empty front slot.
    ///
    /// Returns true if a card moved.
    pub fn advance_column(&mut self, col: u8) -> bool {
        if self.is_occupied(Position::front(col)) {
            return false;
        }
        match self.remove(Position::back(col)) {
            Some(slot) => {
                self.set(Position::front(col), Some(slot));
                true
            }
            None => false,
        }
    }

    /// Restore every card in a column to full HP
    pub fn heal_column(&mut self, col: u8) {
        for pos in [Position::front(col), Position::back(col)] {
            if let Some(slot) = self.get_mut(pos) {
                slot.current_hp = slot.max_hp();
            }
        }
    }

    /// Turn every card face up
    pub fn reveal_all(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.face_down = false;
        }
    }
}

// ==================== Players ====================

/// One player's side of the match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: String,
    pub name: String,
    pub hand: Vec<Card>,
    pub battlefield: Battlefield,
    /// Top of the pile is index 0
    pub drawpile: Vec<Card>,
    pub discard_pile: Vec<Card>,
    pub lifepoints: u32,
}

impl PlayerState {
    /// A fresh player with a shuffled drawpile and an empty hand
    pub fn new(info: &PlayerInfo, drawpile: Vec<Card>, lifepoints: u32) -> Self {
        Self {
            id: info.id.clone(),
            name: info.name.clone(),
            hand: Vec::new(),
            battlefield: Battlefield::new(),
            drawpile,
            discard_pile: Vec::new(),
            lifepoints,
        }
    }

    /// Draw up to `count` cards from the top of the drawpile, returns how many were drawn
    pub fn draw(&mut self, count: usize) -> usize {
        let count = count.min(self.drawpile.len());
        self.hand.extend(self.drawpile.drain(..count));
        count
    }

    /// Draw until the hand holds `target` cards or the drawpile runs out
    pub fn refill_hand(&mut self, target: usize) -> usize {
        let missing = target.saturating_sub(self.hand.len());
        self.draw(missing)
    }

    pub fn has_in_hand(&self, card: Card) -> bool {
        self.hand.contains(&card)
    }

    /// Remove a card from the hand
    pub fn take_from_hand(&mut self, card: Card) -> Result<Card, GameError> {
        let index = self
            .hand
            .iter()
            .position(|c| *c == card)
            .ok_or(GameError::CardNotInHand(card))?;
        Ok(self.hand.remove(index))
    }

    /// Deployment primitive: hand → first open slot of `col`, face down
    pub fn deploy(&mut self, card: Card, col: u8) -> Result<Position, GameError> {
        let pos = self
            .battlefield
            .first_open_in_column(col)
            .ok_or(GameError::ColumnFull(col))?;
        let card = self.take_from_hand(card)?;
        self.battlefield.place(pos, card, true)?;
        Ok(pos)
    }

    /// Reinforcement primitive: hand → back slot (or front) of `col`, then
    /// advance the back card if the front is empty
    pub fn reinforce(&mut self, card: Card, col: u8) -> Result<Position, GameError> {
        let target = self
            .battlefield
            .reinforcement_target(col)
            .ok_or(GameError::ColumnFull(col))?;
        let card = self.take_from_hand(card)?;
        self.battlefield.place(target, card, false)?;
        if self.battlefield.advance_column(col) {
            Ok(Position::front(col))
        } else {
            Ok(target)
        }
    }

    /// No cards left anywhere: field, hand and drawpile are all empty
    pub fn is_out_of_cards(&self) -> bool {
        self.battlefield.is_empty() && self.hand.is_empty() && self.drawpile.is_empty()
    }
}

// ==================== Game State ====================

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Setup,
    Deployment,
    Combat,
    Reinforcement,
    GameOver,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Setup => "setup",
            Phase::Deployment => "deployment",
            Phase::Combat => "combat",
            Phase::Reinforcement => "reinforcement",
            Phase::GameOver => "gameOver",
        };
        f.write_str(name)
    }
}

/// Open reinforcement window after a column was broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinforcementContext {
    pub column: u8,
    pub attacker_index: usize,
}

/// How a match was won
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VictoryType {
    LpDepletion,
    CardDepletion,
    Forfeit,
}

/// Final result of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub winner: usize,
    pub victory_type: VictoryType,
}

/// The complete match state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub config: GameConfig,
    pub players: [PlayerState; 2],
    pub active_player_index: usize,
    pub phase: Phase,
    /// Deployment counts placements; combat restarts at 1
    pub turn_number: u32,
    pub rng_seed: u32,
    pub transaction_log: Vec<TransactionLogEntry>,
    pub reinforcement: Option<ReinforcementContext>,
    pub outcome: Option<Outcome>,
}

/// Everything in `GameState` except the transaction log.
///
/// State hashes are computed over this view so an entry never hashes itself.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView<'a> {
    pub config: &'a GameConfig,
    pub players: &'a [PlayerState; 2],
    pub active_player_index: usize,
    pub phase: Phase,
    pub turn_number: u32,
    pub rng_seed: u32,
    pub reinforcement: Option<&'a ReinforcementContext>,
    pub outcome: Option<&'a Outcome>,
}

impl GameState {
    /// Create a match in `setup`: each player gets an independently shuffled
    /// 52-card drawpile and an empty hand.
    pub fn new(config: GameConfig) -> Self {
        let deck = create_deck();
        let lifepoints = config.game_options.starting_lifepoints;
        let players = [0, 1].map(|i| {
            let drawpile = shuffle_deck(&deck, player_seed(config.rng_seed, i));
            PlayerState::new(&config.players[i], drawpile, lifepoints)
        });

        Self {
            rng_seed: config.rng_seed,
            config,
            players,
            active_player_index: 0,
            phase: Phase::Setup,
            turn_number: 0,
            transaction_log: Vec::new(),
            reinforcement: None,
            outcome: None,
        }
    }

    /// Create a match, deal opening hands and open deployment
    pub fn start_match(config: GameConfig) -> Self {
        let mut state = Self::new(config);
        for player in 0..2 {
            state.draw_cards(player, OPENING_HAND_SIZE);
        }
        state.begin_deployment();
        state
    }

    /// Draw for a player; out-of-range indices draw nothing
    pub fn draw_cards(&mut self, player: usize, count: usize) -> usize {
        self.players
            .get_mut(player)
            .map(|p| p.draw(count))
            .unwrap_or(0)
    }

    /// Force the phase to `deployment`
    pub fn begin_deployment(&mut self) {
        self.phase = Phase::Deployment;
        self.reinforcement = None;
    }

    pub fn view(&self) -> StateView<'_> {
        StateView {
            config: &self.config,
            players: &self.players,
            active_player_index: self.active_player_index,
            phase: self.phase,
            turn_number: self.turn_number,
            rng_seed: self.rng_seed,
            reinforcement: self.reinforcement.as_ref(),
            outcome: self.outcome.as_ref(),
        }
    }

    pub fn options(&self) -> &GameOptions {
        &self.config.game_options
    }

    pub fn player(&self, index: usize) -> Option<&PlayerState> {
        self.players.get(index)
    }

    pub fn active_player(&self) -> &PlayerState {
        &self.players[self.active_player_index & 1]
    }

    pub fn opponent_of(index: usize) -> usize {
        1 - (index & 1)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn winner(&self) -> Option<usize> {
        self.outcome.map(|o| o.winner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::{Rank, Suit};

    fn card(code: &str) -> Card {
        code.parse().unwrap()
    }

    fn config() -> GameConfig {
        GameConfig::new(
            [PlayerInfo::new("p1", "Alice"), PlayerInfo::new("p2", "Bob")],
            2024,
        )
    }

    #[test]
    fn test_position_index() {
        assert_eq!(Position::new(0, 0).index(), Some(0));
        assert_eq!(Position::new(0, 3).index(), Some(3));
        assert_eq!(Position::new(1, 0).index(), Some(4));
        assert_eq!(Position::new(1, 3).index(), Some(7));
        assert_eq!(Position::new(2, 0).index(), None);
        assert_eq!(Position::new(0, 4).index(), None);
    }

    #[test]
    fn test_new_state_in_setup() {
        let state = GameState::new(config());
        assert_eq!(state.phase, Phase::Setup);
        assert_eq!(state.turn_number, 0);
        for player in &state.players {
            assert_eq!(player.drawpile.len(), 52);
            assert!(player.hand.is_empty());
            assert_eq!(player.lifepoints, DEFAULT_LIFEPOINTS);
        }
        assert_ne!(state.players[0].drawpile, state.players[1].drawpile);
    }

    #[test]
    fn test_start_match_deals_opening_hands() {
        let state = GameState::start_match(config());
        assert_eq!(state.phase, Phase::Deployment);
        for player in &state.players {
            assert_eq!(player.hand.len(), OPENING_HAND_SIZE);
            assert_eq!(player.drawpile.len(), 52 - OPENING_HAND_SIZE);
        }
    }

    #[test]
    fn test_draw_takes_from_top() {
        let mut state = GameState::new(config());
        let top = state.players[0].drawpile[0];
        assert_eq!(state.draw_cards(0, 1), 1);
        assert_eq!(state.players[0].hand, vec![top]);
        assert_eq!(state.draw_cards(5, 1), 0);
    }

    #[test]
    fn test_draw_stops_at_empty_pile() {
        let mut player = PlayerState::new(&PlayerInfo::new("x", "X"), vec![card("AS")], 20);
        assert_eq!(player.draw(3), 1);
        assert_eq!(player.draw(3), 0);
        assert_eq!(player.hand.len(), 1);
    }

    #[test]
    fn test_deploy_fills_front_then_back() {
        let mut player = PlayerState::new(&PlayerInfo::new("x", "X"), Vec::new(), 20);
        player.hand = vec![card("5S"), card("7H"), card("9D")];

        assert_eq!(player.deploy(card("5S"), 2).unwrap(), Position::front(2));
        assert_eq!(player.deploy(card("7H"), 2).unwrap(), Position::back(2));
        assert!(player.battlefield.is_column_full(2));
        assert!(matches!(
            player.deploy(card("9D"), 2),
            Err(GameError::ColumnFull(2))
        ));
        assert!(matches!(
            player.deploy(card("KC"), 1),
            Err(GameError::CardNotInHand(_))
        ));

        let front = player.battlefield.front(2).unwrap();
        assert!(front.face_down);
        assert_eq!(front.current_hp, 5);
    }

    #[test]
    fn test_reinforce_prefers_back_and_advances() {
        let mut player = PlayerState::new(&PlayerInfo::new("x", "X"), Vec::new(), 20);
        player.hand = vec![card("4C"), card("8S")];

        // Empty column: card goes to the back, then advances to the front
        assert_eq!(player.reinforce(card("4C"), 1).unwrap(), Position::front(1));
        assert!(player.battlefield.back(1).is_none());
        assert_eq!(player.battlefield.front(1).unwrap().card, card("4C"));

        assert_eq!(player.reinforce(card("8S"), 1).unwrap(), Position::back(1));
        assert!(player.battlefield.is_column_full(1));
    }

    #[test]
    fn test_advance_column() {
        let mut field = Battlefield::new();
        field
            .place(Position::back(0), Card::new(Rank::Six, Suit::Hearts), false)
            .unwrap();
        assert!(field.advance_column(0));
        let front = field.front(0).unwrap();
        assert_eq!((front.row, front.col), (0, 0));
        assert!(!field.advance_column(0));
    }

    #[test]
    fn test_refill_hand() {
        let mut player = PlayerState::new(
            &PlayerInfo::new("x", "X"),
            vec![card("AS"), card("2S"), card("3S"), card("4S"), card("5S")],
            20,
        );
        player.hand = vec![card("KD")];
        assert_eq!(player.refill_hand(REINFORCEMENT_HAND_SIZE), 3);
        assert_eq!(player.hand.len(), 4);
        assert_eq!(player.refill_hand(REINFORCEMENT_HAND_SIZE), 0);
    }

    #[test]
    fn test_config_defaults_from_json() {
        let json = r#"{
            "players": [{"id": "a", "name": "A"}, {"id": "b", "name": "B"}],
            "rngSeed": 7,
            "gameOptions": {"damageMode": "per-turn"}
        }"#;
        let config: GameConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.game_options.damage_mode, DamageMode::PerTurn);
        assert_eq!(config.game_options.rule_variant, RuleVariant::IntroRules);
        assert_eq!(config.game_options.starting_lifepoints, DEFAULT_LIFEPOINTS);

        let bare: GameConfig = serde_json::from_str(
            r#"{"players": [{"id": "a", "name": "A"}, {"id": "b", "name": "B"}], "rngSeed": 7}"#,
        )
        .unwrap();
        assert_eq!(bare.game_options, GameOptions::default());
    }
}
