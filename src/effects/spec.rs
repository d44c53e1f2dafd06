//! Effect descriptors.
//!
//! The declarative effect language card data is written in. Descriptors
//! are immutable: they live in card templates and are referenced, never
//! mutated, during resolution.

use serde::{Deserialize, Serialize};

use crate::cards::EnergyType;

/// Requested count meaning "move all matching energy".
pub const MOVE_ALL: u32 = 999;

/// A side relative to the effect's acting player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Acting,
    Opponent,
}

/// Who supplies a pending choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chooser {
    Acting,
    Opponent,
}

/// Field-zone constraint in target criteria.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldZone {
    #[default]
    Any,
    Active,
    Bench,
}

/// Card zone for count aggregation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardZone {
    Hand,
    Deck,
    Discard,
}

/// Criteria for matching field creatures.
///
/// Matching is exact-set intersection: every set field must hold, unset
/// fields impose no constraint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetCriteria {
    /// Owning side relative to the acting player.
    pub owner: Option<Side>,
    /// Field zone restriction.
    pub zone: FieldZone,
    /// Creature must (or must not) have damage on it.
    pub has_damage: Option<bool>,
    /// Creature must (or must not) carry the `ex` attribute.
    pub ex: Option<bool>,
    /// Creature's declared name must equal this.
    pub creature_name: Option<String>,
    /// Creature's `evolves_from` name must equal this. Matches by name,
    /// not template id, so reprints are interchangeable bases.
    pub evolves_from_name: Option<String>,
    /// Creature's own energy type must equal this.
    pub energy_type: Option<EnergyType>,
}

impl TargetCriteria {
    /// Unconstrained criteria (matches every field creature).
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict to one side (builder pattern).
    #[must_use]
    pub fn owned_by(mut self, side: Side) -> Self {
        self.owner = Some(side);
        self
    }

    /// Restrict to a field zone (builder pattern).
    #[must_use]
    pub fn in_zone(mut self, zone: FieldZone) -> Self {
        self.zone = zone;
        self
    }

    /// Require damage presence (builder pattern).
    #[must_use]
    pub fn with_damage(mut self, has_damage: bool) -> Self {
        self.has_damage = Some(has_damage);
        self
    }

    /// Require a creature name (builder pattern).
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.creature_name = Some(name.into());
        self
    }
}

/// Deterministic single-position targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixedTarget {
    /// The acting player's active creature.
    ActingActive,
    /// The opponent's active creature.
    OpponentActive,
    /// The creature the effect originated from.
    EffectSource,
}

/// Target specification of an effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TargetSpec {
    /// A deterministic field position.
    Fixed(FixedTarget),
    /// Every creature matching the criteria; the empty set is a valid
    /// no-op result.
    AllMatching(TargetCriteria),
    /// One creature chosen by a player from the matching candidates.
    SingleChoice {
        chooser: Chooser,
        criteria: TargetCriteria,
    },
    /// A player, not a field position (draw and hand effects).
    Player(Side),
}

/// Source specification for energy-transfer effects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Which creature the energy moves from.
    pub target: TargetSpec,
    /// Energy types eligible to move; empty means any. Declaration
    /// order is the tie-break when consuming "any" energy.
    pub energy_types: Vec<EnergyType>,
    /// Requested unit count; `MOVE_ALL` and above mean all matching.
    pub count: u32,
}

/// Player-context lookups for amount resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerContextValue {
    HandSize,
    CurrentPoints,
    /// Win threshold minus current points, clamped at zero.
    PointsToWin,
}

/// Count aggregation for amount resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CountSpec {
    /// Field creatures matching the criteria.
    Field(TargetCriteria),
    /// Cards in a zone of one player.
    Cards { side: Side, zone: CardZone },
    /// Attached energy units on creatures matching the criteria,
    /// optionally restricted by type list (empty = any).
    Energy {
        criteria: TargetCriteria,
        energy_types: Vec<EnergyType>,
    },
    /// Total damage on creatures matching the criteria.
    Damage(TargetCriteria),
}

/// Numeric amount specification. Recursive: addition and multiplication
/// nest arbitrarily.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AmountSpec {
    Constant(u32),
    PlayerContext {
        side: Side,
        value: PlayerContextValue,
    },
    Count(CountSpec),
    Addition(Vec<AmountSpec>),
    Multiplication {
        base: Box<AmountSpec>,
        multiplier: Box<AmountSpec>,
    },
}

impl AmountSpec {
    /// A constant amount.
    #[must_use]
    pub const fn constant(value: u32) -> Self {
        Self::Constant(value)
    }
}

/// Direction of an hp or energy mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Heal / attach.
    Add,
    /// Damage / discard.
    Remove,
}

/// Lifetime of a duration-scoped passive effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationPolicy {
    /// Expires when the turn it was created in ends.
    UntilEndOfTurn,
    /// Survives through the opponent's following turn; expires at the
    /// second turn boundary after creation.
    UntilEndOfNextTurn,
}

/// Status conditions a creature can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCondition {
    Asleep,
    Paralyzed,
    Poisoned,
}

/// Override registered by evolution-flexibility effects: lets
/// `evolving_name` evolve from `base_name` even when normal
/// evolves-from matching would reject it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionOverride {
    pub evolving_name: String,
    pub base_name: String,
}

/// The closed set of effect kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    /// Heal or damage (per `operation`).
    Hp,
    /// Attach or discard energy (per `operation`).
    Energy,
    /// Move energy from a source creature to a target creature.
    EnergyTransfer,
    /// Draw cards.
    Draw,
    /// Duration-scoped damage bonus on a creature's attacks.
    DamageBoost,
    /// Duration-scoped evolution rule override.
    EvolutionFlexibility,
    /// Duration-scoped attack prevention.
    PreventAttack,
    /// Duration-scoped energy-attachment prevention.
    PreventEnergyAttachment,
    /// Duration-scoped additive retreat cost increase.
    RetreatCostIncrease,
    /// Apply a status condition.
    StatusCondition,
}

/// A card effect descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub kind: EffectKind,
    pub target: TargetSpec,
    /// Energy source, for `EnergyTransfer`.
    pub source: Option<SourceSpec>,
    pub amount: AmountSpec,
    /// Direction, for `Hp` and `Energy`.
    pub operation: Option<Operation>,
    /// Energy types for `Energy` attach/discard; empty means any,
    /// consumed in declaration order.
    pub energy_types: Vec<EnergyType>,
    /// Lifetime, for the duration-scoped kinds.
    pub duration: Option<DurationPolicy>,
    /// Condition, for `StatusCondition`.
    pub condition: Option<StatusCondition>,
    /// Override payload, for `EvolutionFlexibility`.
    pub evolution: Option<EvolutionOverride>,
}

impl EffectSpec {
    /// Create a bare effect of a kind; builder methods fill the rest.
    #[must_use]
    pub fn new(kind: EffectKind, target: TargetSpec, amount: AmountSpec) -> Self {
        Self {
            kind,
            target,
            source: None,
            amount,
            operation: None,
            energy_types: Vec::new(),
            duration: None,
            condition: None,
            evolution: None,
        }
    }

    /// A heal effect.
    #[must_use]
    pub fn heal(amount: u32, target: TargetSpec) -> Self {
        Self::new(EffectKind::Hp, target, AmountSpec::constant(amount)).with_operation(Operation::Add)
    }

    /// A damage effect.
    #[must_use]
    pub fn damage(amount: u32, target: TargetSpec) -> Self {
        Self::new(EffectKind::Hp, target, AmountSpec::constant(amount))
            .with_operation(Operation::Remove)
    }

    /// A draw effect for the acting player.
    #[must_use]
    pub fn draw(count: u32) -> Self {
        Self::new(
            EffectKind::Draw,
            TargetSpec::Player(Side::Acting),
            AmountSpec::constant(count),
        )
    }

    /// Set the operation (builder pattern).
    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Set the energy source (builder pattern).
    #[must_use]
    pub fn with_source(mut self, source: SourceSpec) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the energy type list (builder pattern).
    #[must_use]
    pub fn with_energy_types(mut self, energy_types: Vec<EnergyType>) -> Self {
        self.energy_types = energy_types;
        self
    }

    /// Set the duration (builder pattern).
    #[must_use]
    pub fn with_duration(mut self, duration: DurationPolicy) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the status condition (builder pattern).
    #[must_use]
    pub fn with_condition(mut self, condition: StatusCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Set the evolution override (builder pattern).
    #[must_use]
    pub fn with_evolution(mut self, evolution: EvolutionOverride) -> Self {
        self.evolution = Some(evolution);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heal_constructor() {
        let effect = EffectSpec::heal(20, TargetSpec::Fixed(FixedTarget::ActingActive));
        assert_eq!(effect.kind, EffectKind::Hp);
        assert_eq!(effect.operation, Some(Operation::Add));
        assert_eq!(effect.amount, AmountSpec::Constant(20));
    }

    #[test]
    fn test_criteria_builder() {
        let criteria = TargetCriteria::any()
            .owned_by(Side::Opponent)
            .in_zone(FieldZone::Bench)
            .with_damage(true);

        assert_eq!(criteria.owner, Some(Side::Opponent));
        assert_eq!(criteria.zone, FieldZone::Bench);
        assert_eq!(criteria.has_damage, Some(true));
        assert!(criteria.creature_name.is_none());
    }

    #[test]
    fn test_nested_amount_spec() {
        let spec = AmountSpec::Multiplication {
            base: Box::new(AmountSpec::constant(10)),
            multiplier: Box::new(AmountSpec::Count(CountSpec::Field(
                TargetCriteria::any().owned_by(Side::Acting),
            ))),
        };

        let json = serde_json::to_string(&spec).unwrap();
        let back: AmountSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }

    #[test]
    fn test_effect_serialization() {
        let effect = EffectSpec::damage(30, TargetSpec::Fixed(FixedTarget::OpponentActive));
        let json = serde_json::to_string(&effect).unwrap();
        let back: EffectSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(effect, back);
    }
}
