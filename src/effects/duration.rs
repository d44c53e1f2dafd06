//! Duration-scoped passive effects.
//!
//! Passives never mutate game totals when registered; the relevant
//! legality check or damage calculation consults them at the time of
//! the guarded action. Multiple instances of the same passive stack
//! additively. Expiry runs once per turn transition, before new-turn
//! triggers, so a lapsing prevention never blocks the turn it lapses on.

use serde::{Deserialize, Serialize};

use crate::core::{InstanceId, PlayerId};

use super::spec::{DurationPolicy, EvolutionOverride};

/// What a passive does while alive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PassiveKind {
    /// The scoped creature cannot attack.
    PreventAttack,
    /// The scoped creature (or player) cannot have energy attached.
    PreventEnergyAttachment,
    /// The scoped creature's retreat cost is raised by `amount`.
    RetreatCostIncrease,
    /// The scoped creature's attacks deal `amount` extra damage.
    DamageBoost,
    /// Evolution rule override (scope is unused).
    EvolutionFlexibility(EvolutionOverride),
}

/// What a passive applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassiveScope {
    /// A specific field creature, tracked by instance so the scope
    /// survives retreat swaps.
    Instance(InstanceId),
    /// A whole player.
    Player(PlayerId),
    /// Game-wide (evolution overrides).
    Global,
}

/// A registered duration-scoped passive effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassiveEffect {
    pub kind: PassiveKind,
    pub scope: PassiveScope,
    pub amount: u32,
    /// Turn number the passive was created in.
    pub applied_turn: u32,
    pub duration: DurationPolicy,
}

impl PassiveEffect {
    /// Does this passive expire when `ending_turn` ends?
    #[must_use]
    fn expires_at(&self, ending_turn: u32) -> bool {
        match self.duration {
            DurationPolicy::UntilEndOfTurn => ending_turn >= self.applied_turn,
            DurationPolicy::UntilEndOfNextTurn => ending_turn >= self.applied_turn + 1,
        }
    }

    fn covers_instance(&self, instance: InstanceId, owner: PlayerId) -> bool {
        match self.scope {
            PassiveScope::Instance(scoped) => scoped == instance,
            PassiveScope::Player(player) => player == owner,
            PassiveScope::Global => false,
        }
    }
}

/// Tracker for all live passives in a game.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PassiveTracker {
    active: Vec<PassiveEffect>,
}

impl PassiveTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a passive.
    pub fn register(&mut self, passive: PassiveEffect) {
        self.active.push(passive);
    }

    /// Remove every passive that expires when `ending_turn` ends.
    pub fn expire(&mut self, ending_turn: u32) {
        self.active.retain(|p| !p.expires_at(ending_turn));
    }

    /// Is attacking prevented for this creature?
    #[must_use]
    pub fn attack_prevented(&self, instance: InstanceId, owner: PlayerId) -> bool {
        self.active.iter().any(|p| {
            matches!(p.kind, PassiveKind::PreventAttack) && p.covers_instance(instance, owner)
        })
    }

    /// Is energy attachment prevented for this creature?
    #[must_use]
    pub fn energy_attachment_prevented(&self, instance: InstanceId, owner: PlayerId) -> bool {
        self.active.iter().any(|p| {
            matches!(p.kind, PassiveKind::PreventEnergyAttachment)
                && p.covers_instance(instance, owner)
        })
    }

    /// Additive retreat cost increase for this creature.
    #[must_use]
    pub fn retreat_cost_increase(&self, instance: InstanceId, owner: PlayerId) -> u32 {
        self.active
            .iter()
            .filter(|p| {
                matches!(p.kind, PassiveKind::RetreatCostIncrease)
                    && p.covers_instance(instance, owner)
            })
            .map(|p| p.amount)
            .sum()
    }

    /// Additive damage boost for attacks by this creature.
    #[must_use]
    pub fn damage_boost(&self, instance: InstanceId, owner: PlayerId) -> u32 {
        self.active
            .iter()
            .filter(|p| {
                matches!(p.kind, PassiveKind::DamageBoost) && p.covers_instance(instance, owner)
            })
            .map(|p| p.amount)
            .sum()
    }

    /// Does a live override permit `evolving_name` to evolve from
    /// `base_name`?
    #[must_use]
    pub fn evolution_allowed(&self, evolving_name: &str, base_name: &str) -> bool {
        self.active.iter().any(|p| match &p.kind {
            PassiveKind::EvolutionFlexibility(ov) => {
                ov.evolving_name == evolving_name && ov.base_name == base_name
            }
            _ => false,
        })
    }

    /// Number of live passives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passive(kind: PassiveKind, scope: PassiveScope, amount: u32, turn: u32, duration: DurationPolicy) -> PassiveEffect {
        PassiveEffect {
            kind,
            scope,
            amount,
            applied_turn: turn,
            duration,
        }
    }

    #[test]
    fn test_until_end_of_turn_expiry() {
        let mut tracker = PassiveTracker::new();
        tracker.register(passive(
            PassiveKind::PreventAttack,
            PassiveScope::Instance(InstanceId(1)),
            0,
            3,
            DurationPolicy::UntilEndOfTurn,
        ));

        assert!(tracker.attack_prevented(InstanceId(1), PlayerId::new(0)));
        tracker.expire(3);
        assert!(!tracker.attack_prevented(InstanceId(1), PlayerId::new(0)));
    }

    #[test]
    fn test_until_end_of_next_turn_survives_one_boundary() {
        let mut tracker = PassiveTracker::new();
        tracker.register(passive(
            PassiveKind::PreventEnergyAttachment,
            PassiveScope::Player(PlayerId::new(1)),
            0,
            3,
            DurationPolicy::UntilEndOfNextTurn,
        ));

        tracker.expire(3);
        assert!(tracker.energy_attachment_prevented(InstanceId(9), PlayerId::new(1)));
        tracker.expire(4);
        assert!(!tracker.energy_attachment_prevented(InstanceId(9), PlayerId::new(1)));
    }

    #[test]
    fn test_retreat_increase_stacks_additively() {
        let mut tracker = PassiveTracker::new();
        for _ in 0..2 {
            tracker.register(passive(
                PassiveKind::RetreatCostIncrease,
                PassiveScope::Instance(InstanceId(2)),
                1,
                1,
                DurationPolicy::UntilEndOfTurn,
            ));
        }

        assert_eq!(tracker.retreat_cost_increase(InstanceId(2), PlayerId::new(0)), 2);
        assert_eq!(tracker.retreat_cost_increase(InstanceId(3), PlayerId::new(0)), 0);
    }

    #[test]
    fn test_player_scope_covers_all_instances() {
        let mut tracker = PassiveTracker::new();
        tracker.register(passive(
            PassiveKind::DamageBoost,
            PassiveScope::Player(PlayerId::new(0)),
            10,
            1,
            DurationPolicy::UntilEndOfTurn,
        ));

        assert_eq!(tracker.damage_boost(InstanceId(1), PlayerId::new(0)), 10);
        assert_eq!(tracker.damage_boost(InstanceId(1), PlayerId::new(1)), 0);
    }

    #[test]
    fn test_evolution_override() {
        let mut tracker = PassiveTracker::new();
        tracker.register(passive(
            PassiveKind::EvolutionFlexibility(EvolutionOverride {
                evolving_name: "Blossom".into(),
                base_name: "Seedling".into(),
            }),
            PassiveScope::Global,
            0,
            1,
            DurationPolicy::UntilEndOfNextTurn,
        ));

        assert!(tracker.evolution_allowed("Blossom", "Seedling"));
        assert!(!tracker.evolution_allowed("Blossom", "Puddle"));
    }
}
