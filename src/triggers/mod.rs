//! Trigger dispatch.
//!
//! Abilities declare a [`TriggerKind`]; the engine emits [`GameEvent`]s
//! as state changes land; the dispatcher pairs them up and hands the
//! matching effect lists back in a deterministic order, so identical
//! states always replay identically.
//!
//! Ordering: the event player's field is scanned first, slots ascending
//! (active, then bench), then the opponent's field the same way. Within
//! one slot the creature's own ability fires before its attached
//! tool's.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cards::{CardRepository, EnergyType};
use crate::core::{EngineResult, FieldPos, GameState, PlayerId};
use crate::effects::EffectSpec;

/// Which field entries fire an on-play trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayFilter {
    /// Any entry to the field.
    Any,
    /// Only plays from hand; evolutions do not count.
    BasicOnly,
    /// Only entries by evolving.
    EvolutionOnly,
}

/// When an ability fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerKind {
    /// At the end of a turn. With `own_turn_only`, only the owner's.
    EndOfTurn { own_turn_only: bool },
    /// At the start of a turn. With `own_turn_only`, only the owner's.
    StartOfTurn { own_turn_only: bool },
    /// During the between-turns checkup. With `own_turn_only`, only the
    /// checkup ending the owner's turn.
    OnCheckup { own_turn_only: bool },
    /// When the carrying creature takes damage.
    Damaged,
    /// When energy is attached to the carrying creature, optionally
    /// restricted to one type.
    EnergyAttachment { energy_type: Option<EnergyType> },
    /// When the carrying creature enters the field, restricted by
    /// `filter` to basic plays, evolutions, or both.
    OnPlay { filter: PlayFilter },
    /// Just before the carrying creature is knocked out.
    BeforeKnockout,
    /// When the owner retreats.
    OnRetreat,
    /// Activated by the owner as an action. Limited to once per turn
    /// unless `unlimited`.
    Manual { unlimited: bool },
}

/// A state change that can fire abilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A creature took nonzero damage.
    Damaged { pos: FieldPos, amount: u32 },
    /// Energy landed on a creature.
    EnergyAttached { pos: FieldPos, energy_type: EnergyType },
    /// A creature entered the field.
    Played { pos: FieldPos, evolution: bool },
    /// A creature is about to be knocked out.
    BeforeKnockout { pos: FieldPos },
    /// A player retreated their active creature.
    Retreated { player: PlayerId },
    /// A turn ended.
    TurnEnded { player: PlayerId },
    /// The between-turns checkup after `player`'s turn.
    Checkup { player: PlayerId },
    /// A turn started.
    TurnStarted { player: PlayerId },
}

impl GameEvent {
    /// The player whose field is scanned first during dispatch.
    #[must_use]
    pub fn player(&self) -> PlayerId {
        match self {
            GameEvent::Damaged { pos, .. }
            | GameEvent::EnergyAttached { pos, .. }
            | GameEvent::Played { pos, .. }
            | GameEvent::BeforeKnockout { pos } => pos.player,
            GameEvent::Retreated { player }
            | GameEvent::TurnEnded { player }
            | GameEvent::Checkup { player }
            | GameEvent::TurnStarted { player } => *player,
        }
    }
}

/// One fired ability: whose effects run, and from where.
#[derive(Clone, Debug, PartialEq)]
pub struct TriggeredEffects {
    /// The player the effects act for (the ability carrier's owner).
    pub player: PlayerId,
    /// The carrying creature's position.
    pub source: FieldPos,
    pub effects: Vec<EffectSpec>,
}

fn trigger_matches(trigger: TriggerKind, event: &GameEvent, carrier: FieldPos) -> bool {
    match (trigger, event) {
        (TriggerKind::EndOfTurn { own_turn_only }, GameEvent::TurnEnded { player }) => {
            !own_turn_only || carrier.player == *player
        }
        (TriggerKind::StartOfTurn { own_turn_only }, GameEvent::TurnStarted { player }) => {
            !own_turn_only || carrier.player == *player
        }
        (TriggerKind::OnCheckup { own_turn_only }, GameEvent::Checkup { player }) => {
            !own_turn_only || carrier.player == *player
        }
        (TriggerKind::Damaged, GameEvent::Damaged { pos, .. }) => carrier == *pos,
        (
            TriggerKind::EnergyAttachment { energy_type },
            GameEvent::EnergyAttached { pos, energy_type: attached },
        ) => carrier == *pos && energy_type.is_none_or(|ty| ty == *attached),
        (TriggerKind::OnPlay { filter }, GameEvent::Played { pos, evolution }) => {
            carrier == *pos
                && match filter {
                    PlayFilter::Any => true,
                    PlayFilter::BasicOnly => !*evolution,
                    PlayFilter::EvolutionOnly => *evolution,
                }
        }
        (TriggerKind::BeforeKnockout, GameEvent::BeforeKnockout { pos }) => carrier == *pos,
        (TriggerKind::OnRetreat, GameEvent::Retreated { player }) => carrier.player == *player,
        _ => false,
    }
}

/// Collect every ability fired by an event, in dispatch order.
pub fn dispatch(
    state: &GameState,
    repo: &CardRepository,
    event: &GameEvent,
) -> EngineResult<Vec<TriggeredEffects>> {
    let mut fired = Vec::new();

    for pos in state.field.occupied_both(event.player()) {
        let card = state.field.require(pos)?;
        let creature = repo.get_creature(card.template)?;

        if let Some(ability) = &creature.ability {
            if trigger_matches(ability.trigger, event, pos) {
                debug!(?event, %pos, ability = %ability.name, "ability triggered");
                fired.push(TriggeredEffects {
                    player: pos.player,
                    source: pos,
                    effects: ability.effects.clone(),
                });
            }
        }

        if let Some(tool) = card.tool {
            let tool_data = repo.get_tool(tool.template)?;
            if let Some(ability) = &tool_data.ability {
                if trigger_matches(ability.trigger, event, pos) {
                    debug!(?event, %pos, ability = %ability.name, "tool triggered");
                    fired.push(TriggeredEffects {
                        player: pos.player,
                        source: pos,
                        effects: ability.effects.clone(),
                    });
                }
            }
        }
    }

    Ok(fired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{
        Ability, CardCategory, CardInstance, CardTemplate, CreatureData, Stage, ToolData,
    };
    use crate::core::{InstanceId, TemplateId};
    use crate::effects::{FixedTarget, TargetSpec};
    use crate::field::FieldCard;

    fn creature_with_ability(id: u32, name: &str, trigger: Option<TriggerKind>) -> CardTemplate {
        let ability = trigger.map(|t| {
            let mut ability = Ability::new(format!("{name} Power"), t);
            ability.effects = vec![EffectSpec::heal(
                10,
                TargetSpec::Fixed(FixedTarget::EffectSource),
            )];
            ability
        });
        CardTemplate::new(
            TemplateId::new(id),
            name,
            CardCategory::Creature(CreatureData {
                max_hp: 60,
                energy_type: EnergyType::Grass,
                stage: Stage::Basic,
                evolves_from: None,
                weakness: None,
                retreat_cost: 1,
                ex: false,
                attacks: Vec::new(),
                ability,
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

    #[test]
    fn test_end_of_turn_own_turn_only() {
        let mut repo = CardRepository::new();
        repo.insert(creature_with_ability(
            1,
            "Sprout",
            Some(TriggerKind::EndOfTurn { own_turn_only: true }),
        ));

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        let p1 = PlayerId::new(1);
        place(&mut state, FieldPos::active(p0), 10, 1);
        place(&mut state, FieldPos::active(p1), 20, 1);

        let fired = dispatch(&state, &repo, &GameEvent::TurnEnded { player: p0 }).unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].source, FieldPos::active(p0));
    }

    #[test]
    fn test_event_player_field_scanned_first() {
        let mut repo = CardRepository::new();
        repo.insert(creature_with_ability(
            1,
            "Sprout",
            Some(TriggerKind::EndOfTurn { own_turn_only: false }),
        ));

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        let p1 = PlayerId::new(1);
        place(&mut state, FieldPos::active(p0), 10, 1);
        place(&mut state, FieldPos::bench(p0, 2), 11, 1);
        place(&mut state, FieldPos::active(p1), 20, 1);

        // Event after p1's turn: p1's field fires first, then p0's
        // slots in ascending order.
        let fired = dispatch(&state, &repo, &GameEvent::TurnEnded { player: p1 }).unwrap();
        let sources: Vec<FieldPos> = fired.iter().map(|f| f.source).collect();
        assert_eq!(
            sources,
            vec![
                FieldPos::active(p1),
                FieldPos::active(p0),
                FieldPos::bench(p0, 2),
            ]
        );
    }

    #[test]
    fn test_ability_fires_before_tool() {
        let mut repo = CardRepository::new();
        repo.insert(creature_with_ability(1, "Sprout", Some(TriggerKind::Damaged)));
        let mut tool_ability = Ability::new("Tool Echo", TriggerKind::Damaged);
        tool_ability.effects = vec![EffectSpec::draw(1)];
        repo.insert(CardTemplate::new(
            TemplateId::new(2),
            "Echo Band",
            CardCategory::Tool(ToolData {
                hp_bonus: 0,
                ability: Some(tool_ability),
            }),
        ));

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        place(&mut state, FieldPos::active(p0), 10, 1);
        state.field.require_mut(FieldPos::active(p0)).unwrap().tool =
            Some(CardInstance::new(InstanceId(30), TemplateId(2)));

        let fired = dispatch(
            &state,
            &repo,
            &GameEvent::Damaged { pos: FieldPos::active(p0), amount: 20 },
        )
        .unwrap();
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].effects[0].kind, crate::effects::EffectKind::Hp);
        assert_eq!(fired[1].effects[0].kind, crate::effects::EffectKind::Draw);
    }

    #[test]
    fn test_energy_attachment_type_filter() {
        let mut repo = CardRepository::new();
        repo.insert(creature_with_ability(
            1,
            "Sprout",
            Some(TriggerKind::EnergyAttachment {
                energy_type: Some(EnergyType::Grass),
            }),
        ));

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        place(&mut state, FieldPos::active(p0), 10, 1);

        let grass = dispatch(
            &state,
            &repo,
            &GameEvent::EnergyAttached {
                pos: FieldPos::active(p0),
                energy_type: EnergyType::Grass,
            },
        )
        .unwrap();
        assert_eq!(grass.len(), 1);

        let fire = dispatch(
            &state,
            &repo,
            &GameEvent::EnergyAttached {
                pos: FieldPos::active(p0),
                energy_type: EnergyType::Fire,
            },
        )
        .unwrap();
        assert!(fire.is_empty());
    }

    #[test]
    fn test_on_play_evolution_only_filter() {
        let mut repo = CardRepository::new();
        repo.insert(creature_with_ability(
            1,
            "Sprout",
            Some(TriggerKind::OnPlay { filter: PlayFilter::EvolutionOnly }),
        ));

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        place(&mut state, FieldPos::active(p0), 10, 1);

        let played = dispatch(
            &state,
            &repo,
            &GameEvent::Played { pos: FieldPos::active(p0), evolution: false },
        )
        .unwrap();
        assert!(played.is_empty());

        let evolved = dispatch(
            &state,
            &repo,
            &GameEvent::Played { pos: FieldPos::active(p0), evolution: true },
        )
        .unwrap();
        assert_eq!(evolved.len(), 1);
    }

    #[test]
    fn test_on_play_basic_only_excludes_evolutions() {
        let mut repo = CardRepository::new();
        repo.insert(creature_with_ability(
            1,
            "Sprout",
            Some(TriggerKind::OnPlay { filter: PlayFilter::BasicOnly }),
        ));

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        place(&mut state, FieldPos::active(p0), 10, 1);

        let played = dispatch(
            &state,
            &repo,
            &GameEvent::Played { pos: FieldPos::active(p0), evolution: false },
        )
        .unwrap();
        assert_eq!(played.len(), 1);

        let evolved = dispatch(
            &state,
            &repo,
            &GameEvent::Played { pos: FieldPos::active(p0), evolution: true },
        )
        .unwrap();
        assert!(evolved.is_empty());
    }

    #[test]
    fn test_manual_never_fires_from_events() {
        let mut repo = CardRepository::new();
        repo.insert(creature_with_ability(
            1,
            "Sprout",
            Some(TriggerKind::Manual { unlimited: false }),
        ));

        let mut state = GameState::new(1);
        let p0 = PlayerId::new(0);
        place(&mut state, FieldPos::active(p0), 10, 1);

        for event in [
            GameEvent::TurnEnded { player: p0 },
            GameEvent::TurnStarted { player: p0 },
            GameEvent::Damaged { pos: FieldPos::active(p0), amount: 10 },
        ] {
            assert!(dispatch(&state, &repo, &event).unwrap().is_empty());
        }
    }
}
