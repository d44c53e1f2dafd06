//! Target resolution.
//!
//! Turns an effect's declared target or source specification into
//! concrete field positions, or reports that a player choice is needed.
//! Resolution is read-only; the queue owns suspension.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cards::CardRepository;
use crate::core::{EngineResult, FieldPos, GameState, PlayerId};

use super::spec::{
    Chooser, FieldZone, Side, SourceSpec, TargetCriteria, TargetSpec,
};
use super::EffectContext;

/// Resolved position set. Eight covers both full fields.
pub type Positions = SmallVec<[FieldPos; 8]>;

/// Which part of an effect a selection supplies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionRole {
    Source,
    Target,
}

/// A pending choice surfaced to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    /// Who must answer.
    pub chooser: PlayerId,
    /// Whether the choice fills the effect's source or target.
    pub role: SelectionRole,
    /// Valid positions, in field order.
    pub candidates: Positions,
}

/// Outcome of resolving a target or source specification.
#[derive(Clone, Debug, PartialEq)]
pub enum TargetResolution {
    /// Concrete field positions; may be empty for all-matching.
    Positions(Positions),
    /// A player (draw and hand effects).
    Player(PlayerId),
    /// A choice is needed before resolution can continue.
    RequiresSelection(SelectionRequest),
    /// No occupant / no candidate; the effect cannot apply.
    Unsatisfiable,
}

/// Check one field creature against criteria. Matching is AND across
/// every set field; unset fields impose no constraint.
pub fn matches_criteria(
    state: &GameState,
    repo: &CardRepository,
    pos: FieldPos,
    criteria: &TargetCriteria,
    acting: PlayerId,
) -> EngineResult<bool> {
    let Some(card) = state.field.get(pos) else {
        return Ok(false);
    };

    if let Some(owner) = criteria.owner {
        let expected = match owner {
            Side::Acting => acting,
            Side::Opponent => acting.opponent(),
        };
        if pos.player != expected {
            return Ok(false);
        }
    }

    match criteria.zone {
        FieldZone::Any => {}
        FieldZone::Active => {
            if !pos.is_active() {
                return Ok(false);
            }
        }
        FieldZone::Bench => {
            if pos.is_active() {
                return Ok(false);
            }
        }
    }

    if let Some(has_damage) = criteria.has_damage {
        if card.has_damage() != has_damage {
            return Ok(false);
        }
    }

    let template = repo.get(card.template)?;
    let creature = repo.get_creature(card.template)?;

    if let Some(ex) = criteria.ex {
        if creature.ex != ex {
            return Ok(false);
        }
    }

    if let Some(name) = &criteria.creature_name {
        if template.name != *name {
            return Ok(false);
        }
    }

    if let Some(base_name) = &criteria.evolves_from_name {
        if creature.evolves_from.as_deref() != Some(base_name.as_str()) {
            return Ok(false);
        }
    }

    if let Some(energy_type) = criteria.energy_type {
        if creature.energy_type != energy_type {
            return Ok(false);
        }
    }

    Ok(true)
}

/// All field positions matching criteria, acting player's field first,
/// slots ascending.
pub fn matching_positions(
    state: &GameState,
    repo: &CardRepository,
    criteria: &TargetCriteria,
    acting: PlayerId,
) -> EngineResult<Positions> {
    let mut out = Positions::new();
    for pos in state.field.occupied_both(acting) {
        if matches_criteria(state, repo, pos, criteria, acting)? {
            out.push(pos);
        }
    }
    Ok(out)
}

fn chooser_player(chooser: Chooser, acting: PlayerId) -> PlayerId {
    match chooser {
        Chooser::Acting => acting,
        Chooser::Opponent => acting.opponent(),
    }
}

/// Resolve a target specification.
///
/// A single-choice spec with exactly one candidate auto-resolves
/// without suspending.
pub fn resolve_target(
    state: &GameState,
    repo: &CardRepository,
    spec: &TargetSpec,
    ctx: &EffectContext,
) -> EngineResult<TargetResolution> {
    match spec {
        TargetSpec::Fixed(fixed) => {
            let pos = match fixed {
                super::spec::FixedTarget::ActingActive => Some(FieldPos::active(ctx.player)),
                super::spec::FixedTarget::OpponentActive => {
                    Some(FieldPos::active(ctx.player.opponent()))
                }
                super::spec::FixedTarget::EffectSource => ctx.source,
            };
            match pos {
                Some(pos) if state.field.get(pos).is_some() => {
                    Ok(TargetResolution::Positions(smallvec::smallvec![pos]))
                }
                _ => Ok(TargetResolution::Unsatisfiable),
            }
        }

        TargetSpec::AllMatching(criteria) => {
            let positions = matching_positions(state, repo, criteria, ctx.player)?;
            Ok(TargetResolution::Positions(positions))
        }

        TargetSpec::SingleChoice { chooser, criteria } => {
            let candidates = matching_positions(state, repo, criteria, ctx.player)?;
            match candidates.len() {
                0 => Ok(TargetResolution::Unsatisfiable),
                1 => Ok(TargetResolution::Positions(candidates)),
                _ => Ok(TargetResolution::RequiresSelection(SelectionRequest {
                    chooser: chooser_player(*chooser, ctx.player),
                    role: SelectionRole::Target,
                    candidates,
                })),
            }
        }

        TargetSpec::Player(side) => {
            let player = match side {
                Side::Acting => ctx.player,
                Side::Opponent => ctx.player.opponent(),
            };
            Ok(TargetResolution::Player(player))
        }
    }
}

/// Total attached energy on a position matching a type list (empty
/// list = any type).
pub fn matching_energy(
    state: &GameState,
    pos: FieldPos,
    energy_types: &[crate::cards::EnergyType],
) -> u32 {
    let Some(card) = state.field.get(pos) else {
        return 0;
    };
    if energy_types.is_empty() {
        state.energy.attached_total(card.instance)
    } else {
        energy_types
            .iter()
            .map(|ty| state.energy.attached_of(card.instance, *ty))
            .sum()
    }
}

/// Resolve an energy-transfer source: like target resolution, but
/// candidates must hold at least one unit of matching energy.
pub fn resolve_source(
    state: &GameState,
    repo: &CardRepository,
    source: &SourceSpec,
    ctx: &EffectContext,
) -> EngineResult<TargetResolution> {
    let resolution = resolve_target(state, repo, &source.target, ctx)?;

    let filter = |positions: Positions| -> Positions {
        positions
            .into_iter()
            .filter(|pos| matching_energy(state, *pos, &source.energy_types) > 0)
            .collect()
    };

    match resolution {
        TargetResolution::Positions(positions) => {
            let with_energy = filter(positions);
            if with_energy.is_empty() {
                Ok(TargetResolution::Unsatisfiable)
            } else {
                Ok(TargetResolution::Positions(with_energy))
            }
        }
        TargetResolution::RequiresSelection(request) => {
            let candidates = filter(request.candidates);
            match candidates.len() {
                0 => Ok(TargetResolution::Unsatisfiable),
                1 => Ok(TargetResolution::Positions(candidates)),
                _ => Ok(TargetResolution::RequiresSelection(SelectionRequest {
                    chooser: request.chooser,
                    role: SelectionRole::Source,
                    candidates,
                })),
            }
        }
        other => Ok(other),
    }
}
