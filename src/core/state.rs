//! Game state aggregate.
//!
//! One `GameState` per game instance, owned by a single writer. All
//! controllers (field, energy, discard, passives, resolution queue) live
//! inside it; handlers and the resolution loop mutate it through direct
//! synchronous calls. The whole aggregate is serializable, which makes a
//! suspended resolution an ordinary persisted checkpoint.

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::cards::{CardInstance, CardRepository, EnergyType};
use crate::effects::{EffectQueue, PassiveTracker};
use crate::energy::EnergyStore;
use crate::field::Field;

use super::error::EngineResult;
use super::ids::{FieldPos, InstanceId, TemplateId};
use super::player::{PlayerId, PlayerMap};
use super::rng::GameRng;

/// Points needed to win.
pub const WIN_THRESHOLD: u32 = 3;

/// What a recorded action was.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    PlayCreature(TemplateId),
    Evolve(TemplateId),
    PlayItem(TemplateId),
    PlaySupporter(TemplateId),
    AttachTool(TemplateId),
    AttachEnergy(EnergyType),
    Attack(u8),
    Retreat,
    UseAbility,
    EndTurn,
}

/// A recorded, executed action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub player: PlayerId,
    pub action: ActionKind,
    pub turn: u32,
}

/// Remaining stage of an in-progress turn transition. Stored so that a
/// resolution suspended mid-transition resumes at the right stage after
/// the selection lands (the checkpoint property extends to turn ends).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndPhase {
    /// Status checkup still to run.
    Checkup,
    /// Passive expiry, turn advance, and start-of-turn triggers still
    /// to run.
    Transition,
}

/// Per-turn and whole-turn-cycle bookkeeping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnState {
    /// Turn number, starts at 1.
    pub turn_number: u32,
    /// Whose turn it is.
    pub active_player: PlayerId,
    /// A supporter was already played this turn.
    pub supporter_played: bool,
    /// Generated energy was already attached this turn.
    pub energy_attached: bool,
    /// Instances whose once-per-turn manual ability was used this turn.
    pub abilities_used: Vec<InstanceId>,
    /// Executed-action history, append-only.
    pub actions: Vector<ActionRecord>,
    /// Set while a turn transition is in progress.
    pub end_phase: Option<EndPhase>,
}

impl TurnState {
    fn new() -> Self {
        Self {
            turn_number: 1,
            active_player: PlayerId::new(0),
            supporter_played: false,
            energy_attached: false,
            abilities_used: Vec::new(),
            actions: Vector::new(),
            end_phase: None,
        }
    }

    /// Record an executed action.
    pub fn record(&mut self, player: PlayerId, action: ActionKind) {
        let turn = self.turn_number;
        self.actions.push_back(ActionRecord {
            player,
            action,
            turn,
        });
    }

    /// Number of executed actions so far.
    #[must_use]
    pub fn executed_actions(&self) -> usize {
        self.actions.len()
    }

    /// Advance to the next turn, clearing per-turn flags.
    pub fn advance(&mut self) {
        self.turn_number += 1;
        self.active_player = self.active_player.opponent();
        self.supporter_played = false;
        self.energy_attached = false;
        self.abilities_used.clear();
    }
}

/// Complete state of one game instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    pub hands: PlayerMap<Vec<CardInstance>>,
    /// Decks; top of deck is the end of the vec.
    pub decks: PlayerMap<Vec<CardInstance>>,
    pub discards: PlayerMap<Vec<CardInstance>>,
    pub field: Field,
    pub energy: EnergyStore,
    pub points: PlayerMap<u32>,
    pub win_threshold: u32,
    pub turn: TurnState,
    pub passives: PassiveTracker,
    /// Resolution queue, including any suspended selection.
    pub resolution: EffectQueue,
    pub rng: GameRng,
}

impl GameState {
    /// Create a fresh state with empty zones.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            hands: PlayerMap::with_default(),
            decks: PlayerMap::with_default(),
            discards: PlayerMap::with_default(),
            field: Field::new(),
            energy: EnergyStore::new(),
            points: PlayerMap::with_value(0),
            win_threshold: WIN_THRESHOLD,
            turn: TurnState::new(),
            passives: PassiveTracker::new(),
            resolution: EffectQueue::new(),
            rng: GameRng::new(seed),
        }
    }

    // === Zones ===

    /// Hand size of a player.
    #[must_use]
    pub fn hand_size(&self, player: PlayerId) -> usize {
        self.hands[player].len()
    }

    /// Draw up to `count` cards from a player's deck; returns cards drawn.
    pub fn draw_cards(&mut self, player: PlayerId, count: u32) -> u32 {
        let mut drawn = 0;
        for _ in 0..count {
            let Some(card) = self.decks[player].pop() else {
                break;
            };
            self.hands[player].push(card);
            drawn += 1;
        }
        drawn
    }

    /// Remove a card from a player's hand by instance id.
    #[must_use]
    pub fn take_from_hand(&mut self, player: PlayerId, instance: InstanceId) -> Option<CardInstance> {
        let pos = self.hands[player]
            .iter()
            .position(|c| c.instance == instance)?;
        Some(self.hands[player].remove(pos))
    }

    /// Move a hand card to the discard pile.
    pub fn discard_from_hand(&mut self, player: PlayerId, instance: InstanceId) -> Option<CardInstance> {
        let card = self.take_from_hand(player, instance)?;
        self.discards[player].push(card);
        Some(card)
    }

    /// Shuffle a player's whole hand back into their deck.
    pub fn shuffle_hand_into_deck(&mut self, player: PlayerId) {
        let hand = std::mem::take(&mut self.hands[player]);
        self.decks[player].extend(hand);
        let mut deck = std::mem::take(&mut self.decks[player]);
        self.rng.shuffle(&mut deck);
        self.decks[player] = deck;
    }

    // === Points ===

    /// Points still needed to win, clamped at zero.
    #[must_use]
    pub fn points_to_win(&self, player: PlayerId) -> u32 {
        self.win_threshold.saturating_sub(self.points[player])
    }

    // === Derived creature stats ===

    /// Effective max HP of a field creature: printed HP plus any tool
    /// HP bonus.
    pub fn effective_max_hp(&self, repo: &CardRepository, pos: FieldPos) -> EngineResult<u32> {
        let card = self.field.require(pos)?;
        let max_hp = repo.get_creature(card.template)?.max_hp;
        let tool_bonus = match card.tool {
            Some(tool) => repo.get_tool(tool.template)?.hp_bonus,
            None => 0,
        };
        Ok(max_hp + tool_bonus)
    }

    /// Remaining HP of a field creature after damage.
    pub fn remaining_hp(&self, repo: &CardRepository, pos: FieldPos) -> EngineResult<u32> {
        let max = self.effective_max_hp(repo, pos)?;
        let taken = self.field.require(pos)?.damage_taken;
        Ok(max.saturating_sub(taken))
    }

    // === Conservation ===

    /// Count of card instances a player owns across hand, deck,
    /// discard, and every field position (evolution stacks plus tools).
    ///
    /// This is constant for the whole game: the conservation law.
    #[must_use]
    pub fn instance_census(&self, player: PlayerId) -> usize {
        let field_cards: usize = FieldPos::all_for(player)
            .filter_map(|pos| self.field.get(pos))
            .map(|card| card.all_cards().count())
            .sum();
        self.hands[player].len() + self.decks[player].len() + self.discards[player].len() + field_cards
    }
}
