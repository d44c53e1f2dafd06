//! Effect handlers.
//!
//! One handler per [`EffectKind`]. Handlers receive targets the queue
//! already resolved, mutate state, and report what happened so triggers
//! can fire afterwards. `can_apply` is the read-only gate actions use
//! to validate a whole effect list before applying any of it.

use tracing::debug;

use crate::cards::{CardRepository, EnergyType};
use crate::core::{EngineError, EngineResult, FieldPos, GameState, PlayerId};
use crate::triggers::GameEvent;

use super::amount::resolve_amount;
use super::duration::{PassiveEffect, PassiveKind, PassiveScope};
use super::spec::{DurationPolicy, EffectKind, EffectSpec, Operation, TargetSpec, MOVE_ALL};
use super::target::{resolve_source, resolve_target, Positions, SelectionRole, TargetResolution};
use super::EffectContext;

/// Targets after any needed selection has been supplied.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedTarget {
    Positions(Positions),
    Player(PlayerId),
}

/// What an applied effect changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApplyOutcome {
    /// The realized magnitude (healed, dealt, moved, drawn) after caps.
    pub applied: u32,
    /// Events for the trigger dispatcher.
    pub events: Vec<GameEvent>,
    /// Creatures whose remaining hp reached zero.
    pub knockouts: Vec<FieldPos>,
}

/// A resolution step for one effect kind.
pub trait EffectHandler {
    /// Can this effect apply in the current state? Read-only; used to
    /// pre-validate a card's whole effect list.
    fn can_apply(
        &self,
        state: &GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
    ) -> EngineResult<bool> {
        target_satisfiable(state, repo, effect, ctx)
    }

    /// The selection points this effect can surface, in the order the
    /// resolution loop reaches them (source before target). Depends
    /// only on the effect's shape; whether a choice actually suspends
    /// is decided against state at apply time. Callers use this to
    /// announce upcoming select-target/select-energy round-trips.
    fn resolution_requirements(&self, effect: &EffectSpec) -> Vec<SelectionRole> {
        let mut roles = Vec::new();
        if let Some(source) = &effect.source {
            if matches!(source.target, TargetSpec::SingleChoice { .. }) {
                roles.push(SelectionRole::Source);
            }
        }
        if matches!(effect.target, TargetSpec::SingleChoice { .. }) {
            roles.push(SelectionRole::Target);
        }
        roles
    }

    /// Apply the effect to resolved targets.
    fn apply(
        &self,
        state: &mut GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
        target: &ResolvedTarget,
        source: Option<FieldPos>,
    ) -> EngineResult<ApplyOutcome>;
}

/// Default satisfiability gate: the target (and source, if any) must
/// resolve to something other than `Unsatisfiable`.
fn target_satisfiable(
    state: &GameState,
    repo: &CardRepository,
    effect: &EffectSpec,
    ctx: &EffectContext,
) -> EngineResult<bool> {
    if resolve_target(state, repo, &effect.target, ctx)? == TargetResolution::Unsatisfiable {
        return Ok(false);
    }
    if let Some(source) = &effect.source {
        if resolve_source(state, repo, source, ctx)? == TargetResolution::Unsatisfiable {
            return Ok(false);
        }
    }
    Ok(true)
}

fn positions<'a>(target: &'a ResolvedTarget) -> &'a [FieldPos] {
    match target {
        ResolvedTarget::Positions(positions) => positions,
        ResolvedTarget::Player(_) => &[],
    }
}

fn effect_duration(effect: &EffectSpec) -> DurationPolicy {
    effect.duration.unwrap_or(DurationPolicy::UntilEndOfTurn)
}

/// Consume up to `requested` energy units in type declaration order
/// (empty list = canonical order). `remove` is called per type with the
/// still-wanted count and returns what it actually took; the store caps
/// at availability. Returns the total consumed.
fn consume_in_order(
    mut remove: impl FnMut(EnergyType, u32) -> u32,
    energy_types: &[EnergyType],
    requested: u32,
) -> u32 {
    let order: &[EnergyType] = if energy_types.is_empty() {
        &EnergyType::ALL
    } else {
        energy_types
    };
    let mut remaining = requested;
    let mut consumed = 0;
    for &ty in order {
        if remaining == 0 {
            break;
        }
        let removed = remove(ty, remaining);
        consumed += removed;
        remaining -= removed;
    }
    consumed
}

struct HpHandler;

impl EffectHandler for HpHandler {
    fn apply(
        &self,
        state: &mut GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
        target: &ResolvedTarget,
        _source: Option<FieldPos>,
    ) -> EngineResult<ApplyOutcome> {
        let amount = resolve_amount(state, repo, &effect.amount, ctx)?;
        let mut outcome = ApplyOutcome::default();

        for &pos in positions(target) {
            match effect.operation {
                Some(Operation::Add) => {
                    let card = state.field.require_mut(pos)?;
                    let healed = amount.min(card.damage_taken);
                    card.damage_taken -= healed;
                    outcome.applied += healed;
                    debug!(%pos, healed, "healed");
                }
                Some(Operation::Remove) | None => {
                    let remaining = state.remaining_hp(repo, pos)?;
                    let dealt = amount.min(remaining);
                    if dealt > 0 {
                        state.field.require_mut(pos)?.damage_taken += dealt;
                        outcome.events.push(GameEvent::Damaged { pos, amount: dealt });
                    }
                    outcome.applied += dealt;
                    if remaining == dealt {
                        outcome.knockouts.push(pos);
                    }
                    debug!(%pos, dealt, "damaged");
                }
            }
        }
        Ok(outcome)
    }
}

struct EnergyHandler;

impl EffectHandler for EnergyHandler {
    fn can_apply(
        &self,
        state: &GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
    ) -> EngineResult<bool> {
        if effect.operation == Some(Operation::Add) && effect.energy_types.is_empty() {
            return Ok(false);
        }
        target_satisfiable(state, repo, effect, ctx)
    }

    fn apply(
        &self,
        state: &mut GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
        target: &ResolvedTarget,
        _source: Option<FieldPos>,
    ) -> EngineResult<ApplyOutcome> {
        let amount = resolve_amount(state, repo, &effect.amount, ctx)?;
        let mut outcome = ApplyOutcome::default();

        for &pos in positions(target) {
            let instance = state.field.require(pos)?.instance;
            match effect.operation {
                Some(Operation::Add) => {
                    // Attach effects name the exact type to generate.
                    // Triggered effects skip the can_apply gate, so an
                    // empty list is reported here instead of panicking.
                    let ty = effect
                        .energy_types
                        .first()
                        .copied()
                        .ok_or(EngineError::MissingEnergyType)?;
                    state.energy.attach(instance, ty, amount);
                    outcome.applied += amount;
                    outcome
                        .events
                        .push(GameEvent::EnergyAttached { pos, energy_type: ty });
                    debug!(%pos, ?ty, amount, "energy attached");
                }
                Some(Operation::Remove) | None => {
                    let owner = pos.player;
                    let requested = if amount >= MOVE_ALL {
                        state.energy.attached_total(instance)
                    } else {
                        amount
                    };
                    let energy = &mut state.energy;
                    let removed = consume_in_order(
                        |ty, n| energy.discard_from(instance, owner, ty, n),
                        &effect.energy_types,
                        requested,
                    );
                    outcome.applied += removed;
                    debug!(%pos, removed, "energy discarded");
                }
            }
        }
        Ok(outcome)
    }
}

struct EnergyTransferHandler;

impl EffectHandler for EnergyTransferHandler {
    fn can_apply(
        &self,
        state: &GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
    ) -> EngineResult<bool> {
        if effect.source.is_none() {
            return Ok(false);
        }
        target_satisfiable(state, repo, effect, ctx)
    }

    fn apply(
        &self,
        state: &mut GameState,
        _repo: &CardRepository,
        effect: &EffectSpec,
        _ctx: &EffectContext,
        target: &ResolvedTarget,
        source: Option<FieldPos>,
    ) -> EngineResult<ApplyOutcome> {
        let mut outcome = ApplyOutcome::default();
        let (Some(source_pos), Some(spec)) = (source, &effect.source) else {
            return Ok(outcome);
        };
        let from = state.field.require(source_pos)?.instance;

        let requested = if spec.count >= MOVE_ALL {
            state.energy.attached_total(from)
        } else {
            spec.count
        };

        for &pos in positions(target) {
            let to = state.field.require(pos)?.instance;
            let mut moved_types = Vec::new();
            let energy = &mut state.energy;
            let moved = consume_in_order(
                |ty, n| {
                    let moved = energy.transfer(from, to, ty, n);
                    if moved > 0 {
                        moved_types.push(ty);
                    }
                    moved
                },
                &spec.energy_types,
                requested,
            );
            outcome.applied += moved;
            for ty in moved_types {
                outcome
                    .events
                    .push(GameEvent::EnergyAttached { pos, energy_type: ty });
            }
            debug!(from = %source_pos, to = %pos, moved, "energy moved");
        }
        Ok(outcome)
    }
}

struct DrawHandler;

impl EffectHandler for DrawHandler {
    fn apply(
        &self,
        state: &mut GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
        target: &ResolvedTarget,
        _source: Option<FieldPos>,
    ) -> EngineResult<ApplyOutcome> {
        let amount = resolve_amount(state, repo, &effect.amount, ctx)?;
        let mut outcome = ApplyOutcome::default();
        if let ResolvedTarget::Player(player) = target {
            outcome.applied = state.draw_cards(*player, amount);
            debug!(%player, drawn = outcome.applied, "cards drawn");
        }
        Ok(outcome)
    }
}

/// Shared body for the four passive-registering kinds whose payload is
/// just a kind and an amount.
fn register_scoped_passive(
    state: &mut GameState,
    repo: &CardRepository,
    effect: &EffectSpec,
    ctx: &EffectContext,
    target: &ResolvedTarget,
    kind: PassiveKind,
) -> EngineResult<ApplyOutcome> {
    let amount = resolve_amount(state, repo, &effect.amount, ctx)?;
    let applied_turn = state.turn.turn_number;
    let duration = effect_duration(effect);
    let mut outcome = ApplyOutcome::default();

    match target {
        ResolvedTarget::Positions(targets) => {
            for &pos in targets.iter() {
                let instance = state.field.require(pos)?.instance;
                state.passives.register(PassiveEffect {
                    kind: kind.clone(),
                    scope: PassiveScope::Instance(instance),
                    amount,
                    applied_turn,
                    duration,
                });
                outcome.applied += amount;
                debug!(%pos, ?kind, amount, "passive registered");
            }
        }
        ResolvedTarget::Player(player) => {
            state.passives.register(PassiveEffect {
                kind: kind.clone(),
                scope: PassiveScope::Player(*player),
                amount,
                applied_turn,
                duration,
            });
            outcome.applied = amount;
            debug!(%player, ?kind, amount, "passive registered");
        }
    }
    Ok(outcome)
}

struct DamageBoostHandler;

impl EffectHandler for DamageBoostHandler {
    fn apply(
        &self,
        state: &mut GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
        target: &ResolvedTarget,
        _source: Option<FieldPos>,
    ) -> EngineResult<ApplyOutcome> {
        register_scoped_passive(state, repo, effect, ctx, target, PassiveKind::DamageBoost)
    }
}

struct PreventAttackHandler;

impl EffectHandler for PreventAttackHandler {
    fn apply(
        &self,
        state: &mut GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
        target: &ResolvedTarget,
        _source: Option<FieldPos>,
    ) -> EngineResult<ApplyOutcome> {
        register_scoped_passive(state, repo, effect, ctx, target, PassiveKind::PreventAttack)
    }
}

struct PreventEnergyAttachmentHandler;

impl EffectHandler for PreventEnergyAttachmentHandler {
    fn apply(
        &self,
        state: &mut GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
        target: &ResolvedTarget,
        _source: Option<FieldPos>,
    ) -> EngineResult<ApplyOutcome> {
        register_scoped_passive(
            state,
            repo,
            effect,
            ctx,
            target,
            PassiveKind::PreventEnergyAttachment,
        )
    }
}

struct RetreatCostIncreaseHandler;

impl EffectHandler for RetreatCostIncreaseHandler {
    fn apply(
        &self,
        state: &mut GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
        target: &ResolvedTarget,
        _source: Option<FieldPos>,
    ) -> EngineResult<ApplyOutcome> {
        register_scoped_passive(
            state,
            repo,
            effect,
            ctx,
            target,
            PassiveKind::RetreatCostIncrease,
        )
    }
}

struct EvolutionFlexibilityHandler;

impl EffectHandler for EvolutionFlexibilityHandler {
    fn can_apply(
        &self,
        state: &GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
    ) -> EngineResult<bool> {
        if effect.evolution.is_none() {
            return Ok(false);
        }
        target_satisfiable(state, repo, effect, ctx)
    }

    fn apply(
        &self,
        state: &mut GameState,
        _repo: &CardRepository,
        effect: &EffectSpec,
        _ctx: &EffectContext,
        _target: &ResolvedTarget,
        _source: Option<FieldPos>,
    ) -> EngineResult<ApplyOutcome> {
        let mut outcome = ApplyOutcome::default();
        if let Some(evolution) = &effect.evolution {
            state.passives.register(PassiveEffect {
                kind: PassiveKind::EvolutionFlexibility(evolution.clone()),
                scope: PassiveScope::Global,
                amount: 0,
                applied_turn: state.turn.turn_number,
                duration: effect_duration(effect),
            });
            outcome.applied = 1;
            debug!(
                evolving = %evolution.evolving_name,
                base = %evolution.base_name,
                "evolution override registered"
            );
        }
        Ok(outcome)
    }
}

struct StatusConditionHandler;

impl EffectHandler for StatusConditionHandler {
    fn can_apply(
        &self,
        state: &GameState,
        repo: &CardRepository,
        effect: &EffectSpec,
        ctx: &EffectContext,
    ) -> EngineResult<bool> {
        if effect.condition.is_none() {
            return Ok(false);
        }
        target_satisfiable(state, repo, effect, ctx)
    }

    fn apply(
        &self,
        state: &mut GameState,
        _repo: &CardRepository,
        effect: &EffectSpec,
        _ctx: &EffectContext,
        target: &ResolvedTarget,
        _source: Option<FieldPos>,
    ) -> EngineResult<ApplyOutcome> {
        let mut outcome = ApplyOutcome::default();
        if let Some(condition) = effect.condition {
            for &pos in positions(target) {
                state.field.require_mut(pos)?.add_status(condition);
                outcome.applied += 1;
                debug!(%pos, ?condition, "status applied");
            }
        }
        Ok(outcome)
    }
}

/// The handler for an effect kind.
pub fn handler_for(kind: EffectKind) -> &'static dyn EffectHandler {
    match kind {
        EffectKind::Hp => &HpHandler,
        EffectKind::Energy => &EnergyHandler,
        EffectKind::EnergyTransfer => &EnergyTransferHandler,
        EffectKind::Draw => &DrawHandler,
        EffectKind::DamageBoost => &DamageBoostHandler,
        EffectKind::EvolutionFlexibility => &EvolutionFlexibilityHandler,
        EffectKind::PreventAttack => &PreventAttackHandler,
        EffectKind::PreventEnergyAttachment => &PreventEnergyAttachmentHandler,
        EffectKind::RetreatCostIncrease => &RetreatCostIncreaseHandler,
        EffectKind::StatusCondition => &StatusConditionHandler,
    }
}

/// Pre-validate a whole effect list without mutating anything. Actions
/// use this for atomicity: a card plays only if every listed effect can
/// apply.
pub fn all_can_apply(
    state: &GameState,
    repo: &CardRepository,
    effects: &[EffectSpec],
    ctx: &EffectContext,
) -> EngineResult<bool> {
    for effect in effects {
        if !handler_for(effect.kind).can_apply(state, repo, effect, ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}
