//! The effect resolution engine.
//!
//! Card behavior is data: templates carry declarative [`EffectSpec`]
//! descriptors, and this module turns them into state changes. Amounts
//! and targets resolve against live state, one handler per effect kind
//! applies the change, and the queue sequences everything (including
//! triggered follow-ups) first-in first-out, suspending when a player
//! choice is needed.

use serde::{Deserialize, Serialize};

use crate::core::{FieldPos, PlayerId};

pub mod amount;
pub mod duration;
pub mod handlers;
pub mod queue;
pub mod spec;
pub mod target;

pub use amount::resolve_amount;
pub use duration::{PassiveEffect, PassiveKind, PassiveScope, PassiveTracker};
pub use handlers::{all_can_apply, handler_for, ApplyOutcome, EffectHandler, ResolvedTarget};
pub use queue::{
    drain, resolve_effects, resolve_event, resume_with_selection, DrainOutcome, EffectQueue,
    PendingSelection, QueuedStep,
};
pub use spec::{
    AmountSpec, CardZone, Chooser, CountSpec, DurationPolicy, EffectKind, EffectSpec,
    EvolutionOverride, FieldZone, FixedTarget, Operation, PlayerContextValue, Side, SourceSpec,
    StatusCondition, TargetCriteria, TargetSpec, MOVE_ALL,
};
pub use target::{
    matches_criteria, matching_energy, matching_positions, resolve_source, resolve_target, Positions,
    SelectionRequest, SelectionRole, TargetResolution,
};

/// Who an effect acts for and where it came from. Every queued effect
/// carries one; triggered effects get the ability carrier's position as
/// their source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectContext {
    /// The acting player: `Side` and `Chooser` resolve relative to this.
    pub player: PlayerId,
    /// Position the effect originates from, when it has one.
    pub source: Option<FieldPos>,
}

impl EffectContext {
    /// Context for a player action with no originating creature.
    #[must_use]
    pub fn for_player(player: PlayerId) -> Self {
        Self { player, source: None }
    }

    /// Context for an effect originating from a field creature.
    #[must_use]
    pub fn from_position(player: PlayerId, source: FieldPos) -> Self {
        Self {
            player,
            source: Some(source),
        }
    }
}
