//! Field state: creatures in play.
//!
//! Each player has one active slot (0) and three bench slots (1..=3).
//! A `FieldCard` records the whole evolution stack of a position so the
//! card conservation law holds: every physical copy merged into the
//! position is still accounted for and moves to the discard as one unit
//! on knockout.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cards::CardInstance;
use crate::core::{
    EngineError, EngineResult, FieldPos, InstanceId, PlayerId, PlayerMap, TemplateId, FIELD_SLOTS,
};
use crate::effects::StatusCondition;

/// A creature occupying a field position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldCard {
    /// Instance id of the topmost (current) physical card.
    pub instance: InstanceId,
    /// Current form.
    pub template: TemplateId,
    /// Damage taken so far.
    pub damage_taken: u32,
    /// Every physical card merged into this position, base form first.
    pub evolution_stack: SmallVec<[CardInstance; 3]>,
    /// Turn on which this position was last played or evolved.
    pub turn_last_played: u32,
    /// Active status conditions.
    pub statuses: Vec<StatusCondition>,
    /// Attached tool card, if any.
    pub tool: Option<CardInstance>,
}

impl FieldCard {
    /// Create a field card from a basic creature played from hand.
    #[must_use]
    pub fn new(card: CardInstance, turn: u32) -> Self {
        let mut evolution_stack = SmallVec::new();
        evolution_stack.push(card);
        Self {
            instance: card.instance,
            template: card.template,
            damage_taken: 0,
            evolution_stack,
            turn_last_played: turn,
            statuses: Vec::new(),
            tool: None,
        }
    }

    /// Merge an evolution card into this position.
    ///
    /// Damage and attached tool carry over; status conditions are cured.
    pub fn evolve(&mut self, card: CardInstance, turn: u32) {
        self.evolution_stack.push(card);
        self.instance = card.instance;
        self.template = card.template;
        self.turn_last_played = turn;
        self.statuses.clear();
    }

    /// Check if a status condition is present.
    #[must_use]
    pub fn has_status(&self, status: StatusCondition) -> bool {
        self.statuses.contains(&status)
    }

    /// Add a status condition if not already present.
    pub fn add_status(&mut self, status: StatusCondition) {
        if !self.has_status(status) {
            self.statuses.push(status);
        }
    }

    /// Remove a status condition.
    pub fn remove_status(&mut self, status: StatusCondition) {
        self.statuses.retain(|s| *s != status);
    }

    /// Cure all status conditions.
    pub fn clear_statuses(&mut self) {
        self.statuses.clear();
    }

    /// Has this creature taken any damage?
    #[must_use]
    pub fn has_damage(&self) -> bool {
        self.damage_taken > 0
    }

    /// All physical cards in this position: evolution stack plus tool.
    pub fn all_cards(&self) -> impl Iterator<Item = CardInstance> + '_ {
        self.evolution_stack.iter().copied().chain(self.tool)
    }
}

/// Both players' field slots.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    slots: PlayerMap<[Option<FieldCard>; FIELD_SLOTS]>,
}

impl Field {
    /// Create an empty field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the creature at a position.
    #[must_use]
    pub fn get(&self, pos: FieldPos) -> Option<&FieldCard> {
        self.slots[pos.player][pos.slot as usize].as_ref()
    }

    /// Get the creature at a position, mutably.
    pub fn get_mut(&mut self, pos: FieldPos) -> Option<&mut FieldCard> {
        self.slots[pos.player][pos.slot as usize].as_mut()
    }

    /// Get the creature at a position, failing if empty.
    pub fn require(&self, pos: FieldPos) -> EngineResult<&FieldCard> {
        self.get(pos).ok_or(EngineError::EmptyPosition(pos))
    }

    /// Get the creature at a position mutably, failing if empty.
    pub fn require_mut(&mut self, pos: FieldPos) -> EngineResult<&mut FieldCard> {
        self.slots[pos.player][pos.slot as usize]
            .as_mut()
            .ok_or(EngineError::EmptyPosition(pos))
    }

    /// Place a creature on an empty slot.
    pub fn place(&mut self, pos: FieldPos, card: FieldCard) -> EngineResult<()> {
        let slot = &mut self.slots[pos.player][pos.slot as usize];
        if slot.is_some() {
            return Err(EngineError::OccupiedPosition(pos));
        }
        *slot = Some(card);
        Ok(())
    }

    /// Remove and return the creature at a position.
    pub fn take(&mut self, pos: FieldPos) -> Option<FieldCard> {
        self.slots[pos.player][pos.slot as usize].take()
    }

    /// Swap the contents of two of one player's slots (retreat,
    /// forced promotion).
    pub fn swap(&mut self, a: FieldPos, b: FieldPos) {
        assert_eq!(a.player, b.player, "swap is within one player's field");
        self.slots[a.player].swap(a.slot as usize, b.slot as usize);
    }

    /// Occupied positions for a player, active first.
    pub fn occupied(&self, player: PlayerId) -> impl Iterator<Item = FieldPos> + '_ {
        FieldPos::all_for(player).filter(|pos| self.get(*pos).is_some())
    }

    /// Occupied positions for both players: `first` player's field, then
    /// the opponent's, slots ascending.
    pub fn occupied_both(&self, first: PlayerId) -> impl Iterator<Item = FieldPos> + '_ {
        self.occupied(first).chain(self.occupied(first.opponent()))
    }

    /// Find the position currently holding an instance (as its top card).
    #[must_use]
    pub fn find_instance(&self, instance: InstanceId) -> Option<FieldPos> {
        PlayerId::both()
            .flat_map(FieldPos::all_for)
            .find(|pos| self.get(*pos).is_some_and(|card| card.instance == instance))
    }

    /// First empty bench slot for a player.
    #[must_use]
    pub fn first_empty_bench(&self, player: PlayerId) -> Option<FieldPos> {
        FieldPos::all_for(player)
            .skip(1)
            .find(|pos| self.get(*pos).is_none())
    }

    /// First occupied bench slot for a player (promotion after a
    /// knockout of the active creature).
    #[must_use]
    pub fn first_occupied_bench(&self, player: PlayerId) -> Option<FieldPos> {
        FieldPos::all_for(player)
            .skip(1)
            .find(|pos| self.get(*pos).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(instance: u32, template: u32) -> CardInstance {
        CardInstance::new(InstanceId(instance), TemplateId(template))
    }

    #[test]
    fn test_place_and_get() {
        let mut field = Field::new();
        let pos = FieldPos::active(PlayerId::new(0));

        field.place(pos, FieldCard::new(card(1, 10), 1)).unwrap();

        assert_eq!(field.get(pos).unwrap().instance, InstanceId(1));
        assert!(matches!(
            field.place(pos, FieldCard::new(card(2, 10), 1)),
            Err(EngineError::OccupiedPosition(_))
        ));
    }

    #[test]
    fn test_evolution_stack() {
        let mut fc = FieldCard::new(card(1, 10), 1);
        fc.damage_taken = 20;
        fc.add_status(StatusCondition::Poisoned);

        fc.evolve(card(2, 11), 3);

        assert_eq!(fc.instance, InstanceId(2));
        assert_eq!(fc.template, TemplateId(11));
        assert_eq!(fc.damage_taken, 20); // damage carries over
        assert!(fc.statuses.is_empty()); // statuses cured
        assert_eq!(fc.evolution_stack.len(), 2);
        assert_eq!(fc.evolution_stack[0], card(1, 10)); // base first
    }

    #[test]
    fn test_all_cards_includes_tool() {
        let mut fc = FieldCard::new(card(1, 10), 1);
        fc.tool = Some(card(5, 50));

        let cards: Vec<_> = fc.all_cards().collect();
        assert_eq!(cards, vec![card(1, 10), card(5, 50)]);
    }

    #[test]
    fn test_swap_and_bench_queries() {
        let mut field = Field::new();
        let p0 = PlayerId::new(0);
        let active = FieldPos::active(p0);
        let bench2 = FieldPos::bench(p0, 2);

        field.place(active, FieldCard::new(card(1, 10), 1)).unwrap();
        field.place(bench2, FieldCard::new(card(2, 11), 1)).unwrap();

        assert_eq!(field.first_empty_bench(p0), Some(FieldPos::bench(p0, 1)));
        assert_eq!(field.first_occupied_bench(p0), Some(bench2));

        field.swap(active, bench2);
        assert_eq!(field.get(active).unwrap().instance, InstanceId(2));
        assert_eq!(field.get(bench2).unwrap().instance, InstanceId(1));
    }

    #[test]
    fn test_find_instance() {
        let mut field = Field::new();
        let p1 = PlayerId::new(1);
        let pos = FieldPos::bench(p1, 3);
        field.place(pos, FieldCard::new(card(9, 20), 2)).unwrap();

        assert_eq!(field.find_instance(InstanceId(9)), Some(pos));
        assert_eq!(field.find_instance(InstanceId(8)), None);
    }

    #[test]
    fn test_occupied_both_order() {
        let mut field = Field::new();
        let p0 = PlayerId::new(0);
        let p1 = PlayerId::new(1);
        field
            .place(FieldPos::active(p1), FieldCard::new(card(1, 1), 1))
            .unwrap();
        field
            .place(FieldPos::bench(p0, 1), FieldCard::new(card(2, 2), 1))
            .unwrap();

        let order: Vec<_> = field.occupied_both(p1).collect();
        assert_eq!(order, vec![FieldPos::active(p1), FieldPos::bench(p0, 1)]);
    }
}
