//! The effect queue.
//!
//! Effects resolve strictly first-in first-out. When a step needs a
//! player choice the queue parks it as the single pending selection and
//! control returns to the caller; the whole queue lives inside
//! [`GameState`], so a suspended resolution serializes as an ordinary
//! checkpoint and resumes in another process.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cards::CardRepository;
use crate::core::{EngineError, EngineResult, FieldPos, GameState};
use crate::triggers::{dispatch, GameEvent, TriggeredEffects};

use super::handlers::{handler_for, ApplyOutcome, ResolvedTarget};
use super::spec::EffectSpec;
use super::target::{resolve_source, resolve_target, SelectionRequest, SelectionRole, TargetResolution};
use super::EffectContext;

/// One unit of work in the queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum QueuedStep {
    /// Resolve and apply one effect.
    Effect {
        effect: EffectSpec,
        ctx: EffectContext,
    },
    /// Knock out the creature at `pos` if it is still at zero hp. Runs
    /// after the before-knockout triggers queued ahead of it.
    Knockout { pos: FieldPos },
}

/// A suspended effect waiting for a choice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingSelection {
    pub request: SelectionRequest,
    /// The parked effect.
    pub effect: EffectSpec,
    pub ctx: EffectContext,
    /// Source already fixed before the suspension, when the pending
    /// choice is the target of an energy transfer.
    pub source: Option<FieldPos>,
}

/// Queue state: ready steps plus at most one pending selection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectQueue {
    ready: VecDeque<QueuedStep>,
    pending: Option<PendingSelection>,
}

impl EffectQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an effect list in order, all sharing one context.
    pub fn enqueue_effects(&mut self, ctx: &EffectContext, effects: &[EffectSpec]) {
        for effect in effects {
            self.ready.push_back(QueuedStep::Effect {
                effect: effect.clone(),
                ctx: ctx.clone(),
            });
        }
    }

    /// The pending selection request, if resolution is suspended.
    #[must_use]
    pub fn pending_request(&self) -> Option<&SelectionRequest> {
        self.pending.as_ref().map(|p| &p.request)
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.ready.is_empty() && self.pending.is_none()
    }

    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.ready.len()
    }
}

/// Result of driving the queue.
#[derive(Clone, Debug, PartialEq)]
pub enum DrainOutcome {
    /// Everything resolved; the queue is empty.
    Idle,
    /// Resolution is suspended on a choice.
    AwaitingSelection(SelectionRequest),
}

/// Queue the triggered effects of an event, in dispatch order.
fn enqueue_triggered(
    state: &mut GameState,
    repo: &CardRepository,
    event: &GameEvent,
) -> EngineResult<()> {
    let fired: Vec<TriggeredEffects> = dispatch(state, repo, event)?;
    for triggered in fired {
        let ctx = EffectContext {
            player: triggered.player,
            source: Some(triggered.source),
        };
        state.resolution.enqueue_effects(&ctx, &triggered.effects);
    }
    Ok(())
}

/// Fold an apply outcome back into the queue: triggered effects for
/// each emitted event, then the knockout pipeline for each creature
/// that hit zero.
fn absorb_outcome(
    state: &mut GameState,
    repo: &CardRepository,
    outcome: ApplyOutcome,
) -> EngineResult<()> {
    for event in &outcome.events {
        enqueue_triggered(state, repo, event)?;
    }
    for pos in outcome.knockouts {
        enqueue_triggered(state, repo, &GameEvent::BeforeKnockout { pos })?;
        state.resolution.ready.push_back(QueuedStep::Knockout { pos });
    }
    Ok(())
}

/// Knock out the creature at `pos`: its whole evolution stack and any
/// tool go to the owner's discard, attached energy moves to the
/// discard ledger, the opponent scores, and the first occupied bench
/// slot is promoted if the active position opened up.
fn perform_knockout(state: &mut GameState, repo: &CardRepository, pos: FieldPos) -> EngineResult<()> {
    let Some(card) = state.field.take(pos) else {
        return Ok(());
    };
    let owner = pos.player;
    let ex = repo.get_creature(card.template)?.ex;

    state.energy.discard_all(card.instance, owner);
    for stacked in card.all_cards() {
        state.discards[owner].push(stacked);
    }

    let scored = if ex { 2 } else { 1 };
    state.points[owner.opponent()] += scored;
    debug!(%pos, scored, "knockout");

    if pos.is_active() {
        if let Some(bench) = state.field.first_occupied_bench(owner) {
            state.field.swap(pos, bench);
            debug!(promoted = %bench, "bench promoted to active");
        }
    }
    Ok(())
}

/// Resolve one effect step, possibly suspending on a choice.
fn run_effect(
    state: &mut GameState,
    repo: &CardRepository,
    effect: EffectSpec,
    ctx: EffectContext,
) -> EngineResult<Option<SelectionRequest>> {
    // Source first, for energy transfers.
    let source = match &effect.source {
        Some(spec) => match resolve_source(state, repo, spec, &ctx)? {
            TargetResolution::Positions(positions) => positions.first().copied(),
            TargetResolution::RequiresSelection(request) => {
                debug!(?request, "suspended on source selection");
                state.resolution.pending = Some(PendingSelection {
                    request: request.clone(),
                    effect,
                    ctx,
                    source: None,
                });
                return Ok(Some(request));
            }
            TargetResolution::Unsatisfiable | TargetResolution::Player(_) => {
                debug!("effect fizzled: no usable source");
                return Ok(None);
            }
        },
        None => None,
    };

    match resolve_target(state, repo, &effect.target, &ctx)? {
        TargetResolution::Positions(positions) => {
            let outcome = handler_for(effect.kind).apply(
                state,
                repo,
                &effect,
                &ctx,
                &ResolvedTarget::Positions(positions),
                source,
            )?;
            absorb_outcome(state, repo, outcome)?;
            Ok(None)
        }
        TargetResolution::Player(player) => {
            let outcome = handler_for(effect.kind).apply(
                state,
                repo,
                &effect,
                &ctx,
                &ResolvedTarget::Player(player),
                source,
            )?;
            absorb_outcome(state, repo, outcome)?;
            Ok(None)
        }
        TargetResolution::RequiresSelection(request) => {
            debug!(?request, "suspended on target selection");
            state.resolution.pending = Some(PendingSelection {
                request: request.clone(),
                effect,
                ctx,
                source,
            });
            Ok(Some(request))
        }
        TargetResolution::Unsatisfiable => {
            debug!("effect fizzled: no target");
            Ok(None)
        }
    }
}

/// Drive the queue until it empties or suspends.
pub fn drain(state: &mut GameState, repo: &CardRepository) -> EngineResult<DrainOutcome> {
    if let Some(pending) = &state.resolution.pending {
        return Ok(DrainOutcome::AwaitingSelection(pending.request.clone()));
    }

    while let Some(step) = state.resolution.ready.pop_front() {
        match step {
            QueuedStep::Effect { effect, ctx } => {
                if let Some(request) = run_effect(state, repo, effect, ctx)? {
                    return Ok(DrainOutcome::AwaitingSelection(request));
                }
            }
            QueuedStep::Knockout { pos } => {
                // A heal queued by a before-knockout trigger may have
                // saved the creature; re-check before acting.
                let still_down = match state.field.get(pos) {
                    Some(_) => state.remaining_hp(repo, pos)? == 0,
                    None => false,
                };
                if still_down {
                    perform_knockout(state, repo, pos)?;
                }
            }
        }
    }
    Ok(DrainOutcome::Idle)
}

/// Supply the answer to the pending selection and continue draining.
///
/// The caller validates the chooser against
/// [`EffectQueue::pending_request`] first. An out-of-range index is a
/// broken-reference error and leaves the suspended checkpoint in place.
pub fn resume_with_selection(
    state: &mut GameState,
    repo: &CardRepository,
    index: usize,
) -> EngineResult<DrainOutcome> {
    let chosen = *state
        .resolution
        .pending
        .as_ref()
        .ok_or(EngineError::NoPendingSelection)?
        .request
        .candidates
        .get(index)
        .ok_or(EngineError::SlotOutOfRange(index as u8))?;
    // Only a validated index consumes the checkpoint.
    let Some(pending) = state.resolution.pending.take() else {
        return Err(EngineError::NoPendingSelection);
    };
    debug!(%chosen, "selection supplied");

    match pending.request.role {
        SelectionRole::Source => {
            // The target still needs resolving with the source fixed.
            let PendingSelection { effect, ctx, .. } = pending;
            match resolve_target(state, repo, &effect.target, &ctx)? {
                TargetResolution::Positions(positions) => {
                    let outcome = handler_for(effect.kind).apply(
                        state,
                        repo,
                        &effect,
                        &ctx,
                        &ResolvedTarget::Positions(positions),
                        Some(chosen),
                    )?;
                    absorb_outcome(state, repo, outcome)?;
                }
                TargetResolution::Player(player) => {
                    let outcome = handler_for(effect.kind).apply(
                        state,
                        repo,
                        &effect,
                        &ctx,
                        &ResolvedTarget::Player(player),
                        Some(chosen),
                    )?;
                    absorb_outcome(state, repo, outcome)?;
                }
                TargetResolution::RequiresSelection(request) => {
                    state.resolution.pending = Some(PendingSelection {
                        request: request.clone(),
                        effect,
                        ctx,
                        source: Some(chosen),
                    });
                    return Ok(DrainOutcome::AwaitingSelection(request));
                }
                TargetResolution::Unsatisfiable => {
                    debug!("effect fizzled after source selection");
                }
            }
        }
        SelectionRole::Target => {
            let outcome = handler_for(pending.effect.kind).apply(
                state,
                repo,
                &pending.effect,
                &pending.ctx,
                &ResolvedTarget::Positions(smallvec::smallvec![chosen]),
                pending.source,
            )?;
            absorb_outcome(state, repo, outcome)?;
        }
    }

    drain(state, repo)
}

/// Queue an effect list and drive the queue.
pub fn resolve_effects(
    state: &mut GameState,
    repo: &CardRepository,
    ctx: &EffectContext,
    effects: &[EffectSpec],
) -> EngineResult<DrainOutcome> {
    state.resolution.enqueue_effects(ctx, effects);
    drain(state, repo)
}

/// Dispatch an event and drive any effects it triggered.
pub fn resolve_event(
    state: &mut GameState,
    repo: &CardRepository,
    event: &GameEvent,
) -> EngineResult<DrainOutcome> {
    enqueue_triggered(state, repo, event)?;
    drain(state, repo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{
        Ability, CardCategory, CardInstance, CardTemplate, CreatureData, EnergyType, Stage,
    };
    use crate::core::{InstanceId, PlayerId, TemplateId};
    use crate::effects::spec::{
        AmountSpec, Chooser, EffectKind, FixedTarget, Operation, Side, TargetCriteria, TargetSpec,
    };
    use crate::field::FieldCard;
    use crate::triggers::TriggerKind;

    fn creature(id: u32, name: &str, max_hp: u32, ex: bool) -> CardTemplate {
        CardTemplate::new(
            TemplateId::new(id),
            name,
            CardCategory::Creature(CreatureData {
                max_hp,
                energy_type: EnergyType::Fighting,
                stage: Stage::Basic,
                evolves_from: None,
                weakness: None,
                retreat_cost: 1,
                ex,
                attacks: Vec::new(),
                ability: None,
            }),
        )
    }

    fn place(state: &mut GameState, pos: FieldPos, instance: u32, template: u32) {
        state
            .field
            .place(
                pos,
                FieldCard::new(
                    CardInstance::new(InstanceId(instance), TemplateId(template)),
                    1,
                ),
            )
            .unwrap();
    }

    fn ctx(player: u8) -> EffectContext {
        EffectContext {
            player: PlayerId::new(player),
            source: None,
        }
    }

    #[test]
    fn test_fifo_order() {
        let mut repo = CardRepository::new();
        repo.insert(creature(1, "Boulder", 200, false));

        let mut state = GameState::new(1);
        let p1 = PlayerId::new(1);
        place(&mut state, FieldPos::active(PlayerId::new(0)), 10, 1);
        place(&mut state, FieldPos::active(p1), 20, 1);

        let effects = vec![
            EffectSpec::damage(30, TargetSpec::Fixed(FixedTarget::OpponentActive)),
            EffectSpec::damage(10, TargetSpec::Fixed(FixedTarget::OpponentActive)),
        ];
        let outcome = resolve_effects(&mut state, &repo, &ctx(0), &effects).unwrap();
        assert_eq!(outcome, DrainOutcome::Idle);
        assert_eq!(
            state.field.require(FieldPos::active(p1)).unwrap().damage_taken,
            40
        );
    }

    #[test]
    fn test_suspension_and_resume() {
        let mut repo = CardRepository::new();
        repo.insert(creature(1, "Boulder", 200, false));

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        place(&mut state, FieldPos::active(p0), 10, 1);
        place(&mut state, FieldPos::bench(p0, 1), 11, 1);
        place(&mut state, FieldPos::active(PlayerId::new(1)), 20, 1);
        state.field.require_mut(FieldPos::active(p0)).unwrap().damage_taken = 20;
        state.field.require_mut(FieldPos::bench(p0, 1)).unwrap().damage_taken = 20;

        let effects = vec![EffectSpec::heal(
            20,
            TargetSpec::SingleChoice {
                chooser: Chooser::Acting,
                criteria: TargetCriteria::any().owned_by(Side::Acting).with_damage(true),
            },
        )];
        let outcome = resolve_effects(&mut state, &repo, &ctx(0), &effects).unwrap();
        let request = match outcome {
            DrainOutcome::AwaitingSelection(request) => request,
            other => panic!("expected suspension, got {:?}", other),
        };
        assert_eq!(request.candidates.len(), 2);
        assert!(state.resolution.pending_request().is_some());

        // Pick the bench creature.
        let resumed = resume_with_selection(&mut state, &repo, 1).unwrap();
        assert_eq!(resumed, DrainOutcome::Idle);
        assert!(state.resolution.is_idle());
        assert_eq!(
            state.field.require(FieldPos::bench(p0, 1)).unwrap().damage_taken,
            0
        );
        assert_eq!(
            state.field.require(FieldPos::active(p0)).unwrap().damage_taken,
            20
        );
    }

    #[test]
    fn test_out_of_range_index_keeps_checkpoint() {
        let mut repo = CardRepository::new();
        repo.insert(creature(1, "Boulder", 200, false));

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        place(&mut state, FieldPos::active(p0), 10, 1);
        place(&mut state, FieldPos::bench(p0, 1), 11, 1);
        place(&mut state, FieldPos::active(PlayerId::new(1)), 20, 1);
        state.field.require_mut(FieldPos::active(p0)).unwrap().damage_taken = 20;
        state.field.require_mut(FieldPos::bench(p0, 1)).unwrap().damage_taken = 20;

        let effects = vec![EffectSpec::heal(
            20,
            TargetSpec::SingleChoice {
                chooser: Chooser::Acting,
                criteria: TargetCriteria::any().owned_by(Side::Acting),
            },
        )];
        resolve_effects(&mut state, &repo, &ctx(0), &effects).unwrap();

        // A bad index fails without consuming the suspension.
        let err = resume_with_selection(&mut state, &repo, 9).unwrap_err();
        assert_eq!(err, EngineError::SlotOutOfRange(9));
        assert!(state.resolution.pending_request().is_some());

        // The same checkpoint still answers a valid index.
        let resumed = resume_with_selection(&mut state, &repo, 0).unwrap();
        assert_eq!(resumed, DrainOutcome::Idle);
        assert_eq!(
            state.field.require(FieldPos::active(p0)).unwrap().damage_taken,
            0
        );
    }

    #[test]
    fn test_triggered_energy_add_without_type_reports_error() {
        let mut repo = CardRepository::new();
        let mut sparker = creature(1, "Sparker", 100, false);
        if let CardCategory::Creature(data) = &mut sparker.category {
            let mut ability = Ability::new("Overflow", TriggerKind::Damaged);
            ability.effects = vec![EffectSpec::new(
                EffectKind::Energy,
                TargetSpec::Fixed(FixedTarget::EffectSource),
                AmountSpec::constant(1),
            )
            .with_operation(Operation::Add)];
            data.ability = Some(ability);
        }
        repo.insert(sparker);
        repo.insert(creature(2, "Boulder", 200, false));

        let mut state = GameState::new(1);
        place(&mut state, FieldPos::active(PlayerId::new(0)), 10, 2);
        place(&mut state, FieldPos::active(PlayerId::new(1)), 20, 1);

        // The triggered attach declares no energy type. It bypasses the
        // can_apply gate, so the loop must surface the data bug as an
        // error rather than panic.
        let effects = vec![EffectSpec::damage(
            30,
            TargetSpec::Fixed(FixedTarget::OpponentActive),
        )];
        let err = resolve_effects(&mut state, &repo, &ctx(0), &effects).unwrap_err();
        assert_eq!(err, EngineError::MissingEnergyType);
    }

    #[test]
    fn test_suspended_queue_survives_serialization() {
        let mut repo = CardRepository::new();
        repo.insert(creature(1, "Boulder", 200, false));

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        place(&mut state, FieldPos::active(p0), 10, 1);
        place(&mut state, FieldPos::bench(p0, 1), 11, 1);
        place(&mut state, FieldPos::active(PlayerId::new(1)), 20, 1);
        state.field.require_mut(FieldPos::active(p0)).unwrap().damage_taken = 20;
        state.field.require_mut(FieldPos::bench(p0, 1)).unwrap().damage_taken = 20;

        let effects = vec![EffectSpec::heal(
            20,
            TargetSpec::SingleChoice {
                chooser: Chooser::Acting,
                criteria: TargetCriteria::any().owned_by(Side::Acting),
            },
        )];
        resolve_effects(&mut state, &repo, &ctx(0), &effects).unwrap();

        let bytes = bincode::serialize(&state).unwrap();
        let mut restored: GameState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(restored.resolution, state.resolution);

        let resumed = resume_with_selection(&mut restored, &repo, 0).unwrap();
        assert_eq!(resumed, DrainOutcome::Idle);
        assert_eq!(
            restored.field.require(FieldPos::active(p0)).unwrap().damage_taken,
            0
        );
    }

    #[test]
    fn test_knockout_scores_and_promotes() {
        let mut repo = CardRepository::new();
        repo.insert(creature(1, "Boulder", 50, false));
        repo.insert(creature(2, "Goliath", 150, true));

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        let p1 = PlayerId::new(1);
        place(&mut state, FieldPos::active(p0), 10, 1);
        place(&mut state, FieldPos::active(p1), 20, 2);
        place(&mut state, FieldPos::bench(p1, 2), 21, 1);
        state.energy.attach(InstanceId(20), EnergyType::Fighting, 2);

        let effects = vec![EffectSpec::damage(
            150,
            TargetSpec::Fixed(FixedTarget::OpponentActive),
        )];
        let outcome = resolve_effects(&mut state, &repo, &ctx(0), &effects).unwrap();
        assert_eq!(outcome, DrainOutcome::Idle);

        // An ex knockout scores two points.
        assert_eq!(state.points[p0], 2);
        // Stack went to discard, energy to the ledger, bench promoted.
        assert_eq!(state.discards[p1].len(), 1);
        assert_eq!(state.energy.discarded(p1).get(EnergyType::Fighting), 2);
        let active = state.field.require(FieldPos::active(p1)).unwrap();
        assert_eq!(active.instance, InstanceId(21));
        assert!(state.field.get(FieldPos::bench(p1, 2)).is_none());
    }

    #[test]
    fn test_before_knockout_heal_saves_creature() {
        let mut repo = CardRepository::new();
        repo.insert(creature(1, "Boulder", 200, false));
        let mut guardian = creature(2, "Guardian", 50, false);
        if let CardCategory::Creature(data) = &mut guardian.category {
            let mut ability = Ability::new("Last Stand", TriggerKind::BeforeKnockout);
            ability.effects = vec![EffectSpec::heal(
                10,
                TargetSpec::Fixed(FixedTarget::EffectSource),
            )];
            data.ability = Some(ability);
        }
        repo.insert(guardian);

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        let p1 = PlayerId::new(1);
        place(&mut state, FieldPos::active(p0), 10, 1);
        place(&mut state, FieldPos::active(p1), 20, 2);

        let effects = vec![EffectSpec::damage(
            60,
            TargetSpec::Fixed(FixedTarget::OpponentActive),
        )];
        resolve_effects(&mut state, &repo, &ctx(0), &effects).unwrap();

        // The heal ran before the knockout step, so the creature
        // survives at 40 damage and no point is scored.
        assert_eq!(state.points[p0], 0);
        let active = state.field.require(FieldPos::active(p1)).unwrap();
        assert_eq!(active.damage_taken, 40);
    }

    #[test]
    fn test_damage_trigger_cascade() {
        let mut repo = CardRepository::new();
        let mut spiky = creature(1, "Spiky", 100, false);
        if let CardCategory::Creature(data) = &mut spiky.category {
            let mut ability = Ability::new("Thorns", TriggerKind::Damaged);
            ability.effects = vec![EffectSpec::damage(
                10,
                TargetSpec::Fixed(FixedTarget::OpponentActive),
            )];
            data.ability = Some(ability);
        }
        repo.insert(spiky);
        repo.insert(creature(2, "Boulder", 200, false));

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        let p1 = PlayerId::new(1);
        place(&mut state, FieldPos::active(p0), 10, 2);
        place(&mut state, FieldPos::active(p1), 20, 1);

        let effects = vec![EffectSpec::damage(
            30,
            TargetSpec::Fixed(FixedTarget::OpponentActive),
        )];
        resolve_effects(&mut state, &repo, &ctx(0), &effects).unwrap();

        // Thorns fired back: its acting player is p1, so its
        // "opponent active" is p0's creature.
        assert_eq!(
            state.field.require(FieldPos::active(p1)).unwrap().damage_taken,
            30
        );
        assert_eq!(
            state.field.require(FieldPos::active(p0)).unwrap().damage_taken,
            10
        );
    }
}
