//! Column combat resolution.
//!
//! Damage travels down one column: front card → back card → life points.
//! Suit bonuses modify it on the way:
//! - Diamond front card absorbs up to twice its HP
//! - Heart as the last card in the path softens what reaches life points
//! - Club attacker doubles overflow entering a back card
//! - Spade attacker doubles life-point damage
//! - Ace defender (engine rules) shrugs off non-Ace attackers at 1 HP
//!
//! Two rule variants differ in the order the Club and Diamond bonuses are
//! applied and in how a lone front Heart mitigates. Both run through the single
//! `resolve_column` resolver below.

use crate::deck::{Card, Rank, RankScale, Suit};
use crate::state::{BattlefieldSlot, PlayerState, Position};
use serde::{Deserialize, Serialize};

/// Which bonus ordering to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleVariant {
    /// Club doubling before the Diamond shield; a lone front Heart subtracts its value
    LegacyReference,
    /// Diamond capacity before Club doubling; a lone front Heart halves
    #[default]
    IntroRules,
}

/// Full rule set handed to the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatRules {
    pub variant: RuleVariant,
    pub scale: RankScale,
    /// Ace defenders survive non-Ace attackers at 1 HP
    pub ace_guard: bool,
}

impl CombatRules {
    /// Rules used by the match engine
    pub const fn engine(variant: RuleVariant) -> Self {
        Self {
            variant,
            scale: RankScale::Full,
            ace_guard: true,
        }
    }

    /// Rules of the standalone reference calculator
    pub const fn reference() -> Self {
        Self {
            variant: RuleVariant::LegacyReference,
            scale: RankScale::Simplified,
            ace_guard: false,
        }
    }

    /// Bare variant ordering: full value table, no Ace guard
    pub const fn variant_only(variant: RuleVariant) -> Self {
        Self {
            variant,
            scale: RankScale::Full,
            ace_guard: false,
        }
    }
}

/// A defending card entering resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defender {
    pub card: Card,
    pub hp: i32,
}

impl Defender {
    pub fn new(card: Card, hp: i32) -> Self {
        Self { card, hp }
    }

    fn from_slot(slot: &BattlefieldSlot) -> Self {
        Self::new(slot.card, slot.current_hp as i32)
    }
}

/// What happened to one defending card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotResolution {
    pub card: Card,
    pub hp_before: i32,
    /// Unclamped; may be negative
    pub hp_after: i32,
    pub destroyed: bool,
}

impl SlotResolution {
    fn untouched(defender: Defender) -> Self {
        Self {
            card: defender.card,
            hp_before: defender.hp,
            hp_after: defender.hp,
            destroyed: false,
        }
    }

    /// HP to store back on the battlefield
    pub fn remaining_hp(&self) -> u32 {
        self.hp_after.max(0) as u32
    }
}

/// Named resolution step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    FrontAbsorb,
    AceGuard,
    DiamondCapacity,
    ClubDoubling,
    DiamondShield,
    HeartBuffer,
    BackAbsorb,
    HeartHalving,
    SpadeDoubling,
    LifePoints,
}

/// What a step acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepTarget {
    Front,
    Back,
    LifePoints,
}

/// One entry of the combat log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatStep {
    pub kind: StepKind,
    pub target: StepTarget,
    pub card: Option<String>,
    /// Damage taken by the target, or the overflow after a bonus step
    pub damage: i32,
    /// Card HP or life points after this step
    pub remaining_hp: Option<i32>,
    pub destroyed: bool,
    pub bonus: Option<String>,
}

impl CombatStep {
    fn absorb(kind: StepKind, target: StepTarget, incoming: i32, slot: &SlotResolution) -> Self {
        Self {
            kind,
            target,
            card: Some(slot.card.label()),
            damage: incoming,
            remaining_hp: Some(slot.hp_after),
            destroyed: slot.destroyed,
            bonus: None,
        }
    }

    fn bonus(kind: StepKind, target: StepTarget, card: Card, damage: i32, text: String) -> Self {
        Self {
            kind,
            target,
            card: Some(card.label()),
            damage,
            remaining_hp: None,
            destroyed: false,
            bonus: Some(text),
        }
    }

    fn with_bonus(mut self, text: String) -> Self {
        self.bonus = Some(text);
        self
    }
}

/// Result of resolving damage down a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnResolution {
    pub front: Option<SlotResolution>,
    pub back: Option<SlotResolution>,
    pub lifepoints: u32,
    pub lp_damage: u32,
    pub steps: Vec<CombatStep>,
}

impl ColumnResolution {
    pub fn any_destroyed(&self) -> bool {
        self.front.is_some_and(|s| s.destroyed) || self.back.is_some_and(|s| s.destroyed)
    }
}

/// Combat record attached to an attack's log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatLogEntry {
    pub turn_number: u32,
    pub attacker_player_index: usize,
    pub attacker_card: Card,
    pub target_column: u8,
    pub base_damage: i32,
    pub steps: Vec<CombatStep>,
    pub total_lp_damage: u32,
}

/// Resolution of an attack against a player's column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackResolution {
    /// Defender after damage, with destroyed cards moved to the discard pile
    pub defender: PlayerState,
    pub column: ColumnResolution,
    pub base_damage: i32,
    pub discarded: Vec<Card>,
}

/// Shared absorption arithmetic: `hp_loss` comes off the card, `absorbed`
/// of the incoming damage stops here, the rest overflows.
fn absorb(defender: Defender, incoming: i32, absorbed: i32, hp_loss: i32) -> (SlotResolution, i32) {
    let hp_after = defender.hp - hp_loss;
    let slot = SlotResolution {
        card: defender.card,
        hp_before: defender.hp,
        hp_after,
        destroyed: hp_after <= 0,
    };
    (slot, (incoming - absorbed).max(0))
}

/// Ordinary card: takes the full hit, overflow is whatever exceeds its HP
fn absorb_plain(defender: Defender, incoming: i32) -> (SlotResolution, i32) {
    absorb(defender, incoming, incoming.min(defender.hp.max(0)), incoming)
}

/// Ace guard: exactly 1 point stops, the card stays at 1 HP
fn absorb_ace_guard(defender: Defender, incoming: i32) -> (SlotResolution, i32) {
    absorb(defender, incoming, incoming.min(1), defender.hp - 1)
}

/// Diamond capacity: absorbs up to 2x HP, losing `ceil(absorbed * hp / 2hp)` HP
fn absorb_diamond(defender: Defender, incoming: i32) -> (SlotResolution, i32) {
    let hp = defender.hp.max(0);
    let effective = hp * 2;
    let absorbed = incoming.min(effective);
    let hp_loss = if effective == 0 {
        0
    } else {
        ((absorbed * hp + effective - 1) / effective).min(hp)
    };
    absorb(defender, incoming, absorbed, hp_loss)
}

fn guarded(rules: &CombatRules, attacker: Card, defender: Defender) -> bool {
    rules.ace_guard && defender.card.rank == Rank::Ace && attacker.rank != Rank::Ace
}

/// Resolve `base_damage` from `attacker` down one column.
///
/// `front` and `back` are the defending cards with their current HP. The
/// resolver never fails; step HP values are reported unclamped while the
/// returned life points are clamped at zero.
pub fn resolve_column(
    rules: &CombatRules,
    attacker: Card,
    base_damage: i32,
    front: Option<Defender>,
    back: Option<Defender>,
    lifepoints: u32,
) -> ColumnResolution {
    let mut steps = Vec::new();
    let mut damage = base_damage.max(0);

    // Front stage
    let mut front_result = None;
    if let Some(defender) = front {
        let (slot, overflow) = if guarded(rules, attacker, defender) {
            let (slot, overflow) = absorb_ace_guard(defender, damage);
            steps.push(
                CombatStep::absorb(StepKind::AceGuard, StepTarget::Front, damage, &slot)
                    .with_bonus("Ace holds at 1 HP".to_string()),
            );
            (slot, overflow)
        } else if rules.variant == RuleVariant::IntroRules && defender.card.suit == Suit::Diamonds
        {
            let (slot, overflow) = absorb_diamond(defender, damage);
            steps.push(
                CombatStep::absorb(StepKind::DiamondCapacity, StepTarget::Front, damage, &slot)
                    .with_bonus(format!("Diamond absorbs up to {}", defender.hp.max(0) * 2)),
            );
            (slot, overflow)
        } else {
            let (slot, overflow) = absorb_plain(defender, damage);
            steps.push(CombatStep::absorb(
                StepKind::FrontAbsorb,
                StepTarget::Front,
                damage,
                &slot,
            ));
            (slot, overflow)
        };
        damage = overflow;
        front_result = Some(slot);
    }

    // Between front and back
    let front_broke = front_result.is_some_and(|s| s.destroyed);
    let club_applies = attacker.suit == Suit::Clubs && front.is_some() && back.is_some();

    if rules.variant == RuleVariant::LegacyReference {
        if club_applies && damage > 0 {
            damage = club_doubling(attacker, damage, &mut steps);
        }
        if let Some(front_slot) = front_result {
            let value = front_slot.card.value(rules.scale);
            if front_broke && damage > 0 && front_slot.card.suit == Suit::Diamonds {
                let before = damage;
                damage = (damage - value).max(0);
                steps.push(CombatStep::bonus(
                    StepKind::DiamondShield,
                    StepTarget::Front,
                    front_slot.card,
                    damage,
                    format!("Diamond shield absorbs {value}: {before} -> {damage}"),
                ));
            }
            if damage > 0 && front_slot.card.suit == Suit::Hearts && back.is_none() {
                let before = damage;
                damage = (damage - value).max(0);
                steps.push(CombatStep::bonus(
                    StepKind::HeartBuffer,
                    StepTarget::Front,
                    front_slot.card,
                    damage,
                    format!("Heart absorbs {value}: {before} -> {damage}"),
                ));
            }
        }
    } else if club_applies && damage > 0 {
        damage = club_doubling(attacker, damage, &mut steps);
    }

    // Back stage
    let mut back_result = back.map(SlotResolution::untouched);
    if let Some(defender) = back {
        if damage > 0 {
            let (slot, overflow) = if guarded(rules, attacker, defender) {
                let (slot, overflow) = absorb_ace_guard(defender, damage);
                steps.push(
                    CombatStep::absorb(StepKind::AceGuard, StepTarget::Back, damage, &slot)
                        .with_bonus("Ace holds at 1 HP".to_string()),
                );
                (slot, overflow)
            } else {
                let (slot, overflow) = absorb_plain(defender, damage);
                steps.push(CombatStep::absorb(
                    StepKind::BackAbsorb,
                    StepTarget::Back,
                    damage,
                    &slot,
                ));
                (slot, overflow)
            };
            damage = overflow;
            back_result = Some(slot);
        }
    }

    // Life-point stage
    let last_card = back_result.or(front_result);
    if let Some(last) = last_card {
        let legacy_lone_front = rules.variant == RuleVariant::LegacyReference && back.is_none();
        if damage > 0 && last.card.suit == Suit::Hearts && !legacy_lone_front {
            let before = damage;
            damage /= 2;
            let target = if back.is_some() {
                StepTarget::Back
            } else {
                StepTarget::Front
            };
            steps.push(CombatStep::bonus(
                StepKind::HeartHalving,
                target,
                last.card,
                damage,
                format!("Heart halves life-point damage: {before} -> {damage}"),
            ));
        }
    }

    if attacker.suit == Suit::Spades && damage > 0 {
        let before = damage;
        damage *= 2;
        steps.push(CombatStep::bonus(
            StepKind::SpadeDoubling,
            StepTarget::LifePoints,
            attacker,
            damage,
            format!("Spade doubles life-point damage: {before} -> {damage}"),
        ));
    }

    let lp_damage = damage.max(0) as u32;
    let remaining = lifepoints.saturating_sub(lp_damage);
    steps.push(CombatStep {
        kind: StepKind::LifePoints,
        target: StepTarget::LifePoints,
        card: None,
        damage: lp_damage as i32,
        remaining_hp: Some(remaining as i32),
        destroyed: false,
        bonus: None,
    });

    ColumnResolution {
        front: front_result,
        back: back_result,
        lifepoints: remaining,
        lp_damage,
        steps,
    }
}

fn club_doubling(attacker: Card, damage: i32, steps: &mut Vec<CombatStep>) -> i32 {
    let doubled = damage * 2;
    steps.push(CombatStep::bonus(
        StepKind::ClubDoubling,
        StepTarget::Back,
        attacker,
        doubled,
        format!("Club doubles overflow into the back card: {damage} -> {doubled}"),
    ));
    doubled
}

/// Resolve an attack from `attacker` into `column` of `defender`.
///
/// Returns a new defender state: surviving cards carry clamped HP, destroyed
/// cards are moved to the discard pile (front first), and life points drop.
/// The back card is not advanced here; that is a turn rule.
pub fn resolve_attack(
    rules: &CombatRules,
    attacker: Card,
    defender: &PlayerState,
    column: u8,
) -> AttackResolution {
    let base_damage = attacker.value(rules.scale);
    let front_pos = Position::front(column);
    let back_pos = Position::back(column);
    let front = defender.battlefield.get(front_pos);
    let back = defender.battlefield.get(back_pos);

    let resolution = resolve_column(
        rules,
        attacker,
        base_damage,
        front.map(Defender::from_slot),
        back.map(Defender::from_slot),
        defender.lifepoints,
    );

    let mut next = defender.clone();
    let mut discarded = Vec::new();
    for (pos, slot, result) in [
        (front_pos, front, resolution.front),
        (back_pos, back, resolution.back),
    ] {
        if let (Some(slot), Some(result)) = (slot, result) {
            if result.destroyed {
                next.battlefield.remove(pos);
                next.discard_pile.push(slot.card);
                discarded.push(slot.card);
            } else if let Some(live) = next.battlefield.get_mut(pos) {
                live.current_hp = result.remaining_hp();
            }
        }
    }
    next.lifepoints = resolution.lifepoints;

    AttackResolution {
        defender: next,
        column: resolution,
        base_damage,
        discarded,
    }
}

/// Standalone damage calculator.
///
/// Defending cards enter at full HP on the rules' value scale.
pub fn calculate_damage(
    attacker: Card,
    front: Option<Card>,
    back: Option<Card>,
    lifepoints: u32,
    rules: &CombatRules,
) -> ColumnResolution {
    let defender = |card: Card| Defender::new(card, card.value(rules.scale));
    resolve_column(
        rules,
        attacker,
        attacker.value(rules.scale),
        front.map(defender),
        back.map(defender),
        lifepoints,
    )
}
