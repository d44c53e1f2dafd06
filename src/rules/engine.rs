//! The action layer.
//!
//! `GameEngine` owns the card repository and one game's state and
//! exposes each decoded player intent as a method: play, evolve,
//! attach, attack, retreat, use ability, end turn, and the two
//! selection responses. Every method validates fully before mutating;
//! a rejected action leaves state byte-identical. Legal actions feed
//! the effect queue and report back either completion or the pending
//! selection.

use tracing::{debug, info};

use crate::cards::{CardCategory, CardInstance, CardRepository, EnergyType};
use crate::core::{
    ActionKind, EndPhase, EngineError, EngineResult, FieldPos, GameState, InstanceId, PlayerId,
    FIELD_SLOTS,
};
use crate::effects::{
    all_can_apply, drain, resolve_effects, resolve_event, resume_with_selection, DrainOutcome,
    EffectContext, EffectSpec, FixedTarget, SelectionRequest, SelectionRole, StatusCondition,
    TargetSpec,
};
use crate::field::FieldCard;
use crate::triggers::{GameEvent, TriggerKind};

/// Damage poison deals at each checkup.
pub const POISON_DAMAGE: u32 = 10;
/// Extra damage when the attacker's type matches the defender's weakness.
pub const WEAKNESS_BONUS: u32 = 20;
/// Opening hand size.
pub const OPENING_HAND: u32 = 5;

/// Why an action was not executed. Rejections are ordinary values; the
/// action left no trace on state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RejectReason {
    GameOver,
    /// A selection (or turn transition) is still unresolved.
    ResolutionPending,
    NotInHand,
    WrongCategory,
    InvalidSlot,
    PositionEmpty,
    PositionOccupied,
    NotYourCreature,
    InvalidEvolution,
    EvolvedTooSoon,
    SupporterAlreadyPlayed,
    ToolAlreadyAttached,
    NoGeneratedEnergy,
    EnergyAlreadyAttached,
    EnergyAttachmentPrevented,
    AttackPrevented,
    RetreatPrevented,
    NoSuchAttack,
    InsufficientEnergy,
    NoAbility,
    AbilityAlreadyUsed,
    /// An effect in the card's list cannot apply; nothing was applied.
    EffectCannotApply,
    SelectionNotPending,
    WrongSelectionKind,
    WrongChooser,
    InvalidSelectionIndex,
}

/// Result of one action attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    /// The action and every cascading effect resolved.
    Completed,
    /// The action started resolving and suspended on a choice.
    AwaitingSelection(SelectionRequest),
    /// The action was not executed.
    Rejected(RejectReason),
}

/// One game instance: static card data plus mutable state.
#[derive(Clone, Debug)]
pub struct GameEngine {
    repo: CardRepository,
    state: GameState,
}

impl GameEngine {
    /// Create an engine with a fresh state.
    #[must_use]
    pub fn new(repo: CardRepository, seed: u64) -> Self {
        Self {
            repo,
            state: GameState::new(seed),
        }
    }

    /// Resume an engine from a persisted state checkpoint.
    #[must_use]
    pub fn with_state(repo: CardRepository, state: GameState) -> Self {
        Self { repo, state }
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    #[must_use]
    pub fn repo(&self) -> &CardRepository {
        &self.repo
    }

    /// Register a player's deck and generation palette. Instance ids
    /// establish the conservation pool and must be unique.
    pub fn set_deck(
        &mut self,
        player: PlayerId,
        cards: Vec<CardInstance>,
        palette: Vec<EnergyType>,
    ) {
        self.state.decks[player] = cards;
        self.state.energy.generation_palette[player] = palette;
    }

    /// Shuffle both decks and draw opening hands. The starting player
    /// gets no generated energy on their first turn; generation begins
    /// rolling at the first turn transition.
    pub fn begin(&mut self) -> EngineResult<ActionOutcome> {
        for player in PlayerId::both() {
            let mut deck = std::mem::take(&mut self.state.decks[player]);
            self.state.rng.shuffle(&mut deck);
            self.state.decks[player] = deck;
            self.state.draw_cards(player, OPENING_HAND);
        }
        let first = self.state.turn.active_player;
        info!(%first, "game started");
        let outcome = resolve_event(&mut self.state, &self.repo, &GameEvent::TurnStarted {
            player: first,
        })?;
        self.after_drain(outcome)
    }

    /// The winner, if either player reached the point threshold.
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        PlayerId::both().find(|&p| self.state.points[p] >= self.state.win_threshold)
    }

    /// Look up a hand card without removing it.
    fn hand_card(&self, player: PlayerId, instance: InstanceId) -> Option<CardInstance> {
        self.state.hands[player]
            .iter()
            .copied()
            .find(|c| c.instance == instance)
    }

    /// Remove a previously validated card from hand.
    fn pull_from_hand(
        &mut self,
        player: PlayerId,
        instance: InstanceId,
    ) -> EngineResult<CardInstance> {
        self.state
            .take_from_hand(player, instance)
            .ok_or(EngineError::NoSuchInstance(instance))
    }

    fn guard(&self) -> Option<RejectReason> {
        if self.winner().is_some() {
            return Some(RejectReason::GameOver);
        }
        if self.state.resolution.pending_request().is_some()
            || self.state.turn.end_phase.is_some()
        {
            return Some(RejectReason::ResolutionPending);
        }
        None
    }

    /// Map a drain result to an action outcome, running any remaining
    /// turn-transition stages once the queue idles.
    fn after_drain(&mut self, outcome: DrainOutcome) -> EngineResult<ActionOutcome> {
        match outcome {
            DrainOutcome::AwaitingSelection(request) => {
                Ok(ActionOutcome::AwaitingSelection(request))
            }
            DrainOutcome::Idle => {
                while let Some(phase) = self.state.turn.end_phase {
                    if self.winner().is_some() {
                        self.state.turn.end_phase = None;
                        break;
                    }
                    let drained = match phase {
                        EndPhase::Checkup => self.run_checkup()?,
                        EndPhase::Transition => self.run_transition()?,
                    };
                    if let DrainOutcome::AwaitingSelection(request) = drained {
                        return Ok(ActionOutcome::AwaitingSelection(request));
                    }
                }
                Ok(ActionOutcome::Completed)
            }
        }
    }

    // === Card plays ===

    /// Play a basic creature from hand to an empty field slot.
    pub fn play_basic(&mut self, instance: InstanceId, slot: u8) -> EngineResult<ActionOutcome> {
        if let Some(reason) = self.guard() {
            return Ok(ActionOutcome::Rejected(reason));
        }
        let player = self.state.turn.active_player;
        if slot >= FIELD_SLOTS as u8 {
            return Ok(ActionOutcome::Rejected(RejectReason::InvalidSlot));
        }
        let pos = FieldPos::new(player, slot);
        if self.state.field.get(pos).is_some() {
            return Ok(ActionOutcome::Rejected(RejectReason::PositionOccupied));
        }
        let Some(card) = self.hand_card(player, instance) else {
            return Ok(ActionOutcome::Rejected(RejectReason::NotInHand));
        };
        let Ok(creature) = self.repo.get_creature(card.template) else {
            return Ok(ActionOutcome::Rejected(RejectReason::WrongCategory));
        };
        if creature.evolves_from.is_some() {
            return Ok(ActionOutcome::Rejected(RejectReason::WrongCategory));
        }

        let card = self.pull_from_hand(player, instance)?;
        let turn = self.state.turn.turn_number;
        self.state.field.place(pos, FieldCard::new(card, turn))?;
        self.state.turn.record(player, ActionKind::PlayCreature(card.template));
        debug!(%player, %pos, "basic creature played");

        let outcome = resolve_event(&mut self.state, &self.repo, &GameEvent::Played {
            pos,
            evolution: false,
        })?;
        self.after_drain(outcome)
    }

    /// Evolve a field creature with a card from hand. Matching is by
    /// name (or a registered evolution override), and a creature cannot
    /// evolve the turn it was played or last evolved.
    pub fn evolve(&mut self, instance: InstanceId, pos: FieldPos) -> EngineResult<ActionOutcome> {
        if let Some(reason) = self.guard() {
            return Ok(ActionOutcome::Rejected(reason));
        }
        let player = self.state.turn.active_player;
        if pos.player != player {
            return Ok(ActionOutcome::Rejected(RejectReason::NotYourCreature));
        }
        let Some(card) = self.hand_card(player, instance) else {
            return Ok(ActionOutcome::Rejected(RejectReason::NotInHand));
        };
        let Ok(evolving) = self.repo.get_creature(card.template) else {
            return Ok(ActionOutcome::Rejected(RejectReason::WrongCategory));
        };
        let Some(base) = self.state.field.get(pos) else {
            return Ok(ActionOutcome::Rejected(RejectReason::PositionEmpty));
        };
        if base.turn_last_played >= self.state.turn.turn_number {
            return Ok(ActionOutcome::Rejected(RejectReason::EvolvedTooSoon));
        }

        let evolving_name = &self.repo.get(card.template)?.name;
        let base_name = &self.repo.get(base.template)?.name;
        let name_match = evolving.evolves_from.as_deref() == Some(base_name.as_str());
        let override_match = self
            .state
            .passives
            .evolution_allowed(evolving_name, base_name);
        if !name_match && !override_match {
            return Ok(ActionOutcome::Rejected(RejectReason::InvalidEvolution));
        }

        let card = self.pull_from_hand(player, instance)?;
        let old_instance = self.state.field.require(pos)?.instance;
        let turn = self.state.turn.turn_number;
        self.state.field.require_mut(pos)?.evolve(card, turn);
        self.state.energy.rekey(old_instance, card.instance);
        self.state.turn.record(player, ActionKind::Evolve(card.template));
        debug!(%player, %pos, "evolved");

        let outcome = resolve_event(&mut self.state, &self.repo, &GameEvent::Played {
            pos,
            evolution: true,
        })?;
        self.after_drain(outcome)
    }

    /// Play a supporter from hand. One supporter per turn; the card's
    /// whole effect list is validated before anything applies.
    pub fn play_supporter(&mut self, instance: InstanceId) -> EngineResult<ActionOutcome> {
        self.play_trainer(instance, true)
    }

    /// Play an item from hand. No per-turn limit.
    pub fn play_item(&mut self, instance: InstanceId) -> EngineResult<ActionOutcome> {
        self.play_trainer(instance, false)
    }

    fn play_trainer(
        &mut self,
        instance: InstanceId,
        supporter: bool,
    ) -> EngineResult<ActionOutcome> {
        if let Some(reason) = self.guard() {
            return Ok(ActionOutcome::Rejected(reason));
        }
        if supporter && self.state.turn.supporter_played {
            return Ok(ActionOutcome::Rejected(RejectReason::SupporterAlreadyPlayed));
        }
        let player = self.state.turn.active_player;
        let Some(card) = self.hand_card(player, instance) else {
            return Ok(ActionOutcome::Rejected(RejectReason::NotInHand));
        };
        let effects = match (&self.repo.get(card.template)?.category, supporter) {
            (CardCategory::Supporter(data), true) | (CardCategory::Item(data), false) => {
                data.effects.clone()
            }
            _ => return Ok(ActionOutcome::Rejected(RejectReason::WrongCategory)),
        };

        // Atomicity gate: the card plays only if every effect can.
        let ctx = EffectContext::for_player(player);
        if !all_can_apply(&self.state, &self.repo, &effects, &ctx)? {
            return Ok(ActionOutcome::Rejected(RejectReason::EffectCannotApply));
        }

        let card = self.pull_from_hand(player, instance)?;
        self.state.discards[player].push(card);
        let action = if supporter {
            self.state.turn.supporter_played = true;
            ActionKind::PlaySupporter(card.template)
        } else {
            ActionKind::PlayItem(card.template)
        };
        self.state.turn.record(player, action);
        debug!(%player, template = %card.template, supporter, "trainer played");

        let outcome = resolve_effects(&mut self.state, &self.repo, &ctx, &effects)?;
        self.after_drain(outcome)
    }

    /// Attach a tool from hand to one of your field creatures. One tool
    /// per creature, permanent while the creature stays in play.
    pub fn attach_tool(&mut self, instance: InstanceId, pos: FieldPos) -> EngineResult<ActionOutcome> {
        if let Some(reason) = self.guard() {
            return Ok(ActionOutcome::Rejected(reason));
        }
        let player = self.state.turn.active_player;
        if pos.player != player {
            return Ok(ActionOutcome::Rejected(RejectReason::NotYourCreature));
        }
        let Some(card) = self.hand_card(player, instance) else {
            return Ok(ActionOutcome::Rejected(RejectReason::NotInHand));
        };
        if self.repo.get_tool(card.template).is_err() {
            return Ok(ActionOutcome::Rejected(RejectReason::WrongCategory));
        }
        let Some(holder) = self.state.field.get(pos) else {
            return Ok(ActionOutcome::Rejected(RejectReason::PositionEmpty));
        };
        if holder.tool.is_some() {
            return Ok(ActionOutcome::Rejected(RejectReason::ToolAlreadyAttached));
        }

        let card = self.pull_from_hand(player, instance)?;
        self.state.field.require_mut(pos)?.tool = Some(card);
        self.state.turn.record(player, ActionKind::AttachTool(card.template));
        debug!(%player, %pos, "tool attached");
        Ok(ActionOutcome::Completed)
    }

    // === Energy ===

    /// Attach this turn's generated energy to one of your creatures.
    pub fn attach_energy(&mut self, pos: FieldPos) -> EngineResult<ActionOutcome> {
        if let Some(reason) = self.guard() {
            return Ok(ActionOutcome::Rejected(reason));
        }
        let player = self.state.turn.active_player;
        if pos.player != player {
            return Ok(ActionOutcome::Rejected(RejectReason::NotYourCreature));
        }
        if self.state.turn.energy_attached {
            return Ok(ActionOutcome::Rejected(RejectReason::EnergyAlreadyAttached));
        }
        let Some(ty) = self.state.energy.current_generation[player] else {
            return Ok(ActionOutcome::Rejected(RejectReason::NoGeneratedEnergy));
        };
        let Some(card) = self.state.field.get(pos) else {
            return Ok(ActionOutcome::Rejected(RejectReason::PositionEmpty));
        };
        let target = card.instance;
        if self
            .state
            .passives
            .energy_attachment_prevented(target, player)
        {
            return Ok(ActionOutcome::Rejected(RejectReason::EnergyAttachmentPrevented));
        }

        self.state.energy.attach(target, ty, 1);
        self.state.energy.current_generation[player] = None;
        self.state.turn.energy_attached = true;
        self.state.turn.record(player, ActionKind::AttachEnergy(ty));
        debug!(%player, %pos, ?ty, "generated energy attached");

        let outcome = resolve_event(&mut self.state, &self.repo, &GameEvent::EnergyAttached {
            pos,
            energy_type: ty,
        })?;
        self.after_drain(outcome)
    }

    // === Combat ===

    /// Attack with the active creature's printed attack at `index`.
    /// Damage is base plus boosts plus the weakness bonus, routed
    /// through the hp pipeline so caps and triggers apply.
    pub fn attack(&mut self, index: u8) -> EngineResult<ActionOutcome> {
        if let Some(reason) = self.guard() {
            return Ok(ActionOutcome::Rejected(reason));
        }
        let player = self.state.turn.active_player;
        let pos = FieldPos::active(player);
        let Some(card) = self.state.field.get(pos) else {
            return Ok(ActionOutcome::Rejected(RejectReason::PositionEmpty));
        };
        if card.has_status(StatusCondition::Asleep)
            || card.has_status(StatusCondition::Paralyzed)
            || self.state.passives.attack_prevented(card.instance, player)
        {
            return Ok(ActionOutcome::Rejected(RejectReason::AttackPrevented));
        }
        let attacker = card.instance;
        let creature = self.repo.get_creature(card.template)?;
        let Some(attack) = creature.attacks.get(index as usize).cloned() else {
            return Ok(ActionOutcome::Rejected(RejectReason::NoSuchAttack));
        };
        let attacker_type = creature.energy_type;

        if !self.cost_paid(attacker, &attack.cost) {
            return Ok(ActionOutcome::Rejected(RejectReason::InsufficientEnergy));
        }

        let mut effects = Vec::with_capacity(attack.effects.len() + 1);
        if attack.damage > 0 {
            let mut total = attack.damage + self.state.passives.damage_boost(attacker, player);
            let defender = FieldPos::active(player.opponent());
            if let Some(defending) = self.state.field.get(defender) {
                if self.repo.get_creature(defending.template)?.weakness == Some(attacker_type) {
                    total += WEAKNESS_BONUS;
                }
            }
            effects.push(EffectSpec::damage(
                total,
                TargetSpec::Fixed(FixedTarget::OpponentActive),
            ));
        }
        effects.extend(attack.effects.iter().cloned());

        let ctx = EffectContext::from_position(player, pos);
        if !all_can_apply(&self.state, &self.repo, &effects, &ctx)? {
            return Ok(ActionOutcome::Rejected(RejectReason::EffectCannotApply));
        }

        self.state.turn.record(player, ActionKind::Attack(index));
        debug!(%player, attack = %attack.name, "attacking");
        let outcome = resolve_effects(&mut self.state, &self.repo, &ctx, &effects)?;
        self.after_drain(outcome)
    }

    /// Check an attack cost against attached energy. Typed entries need
    /// that exact type; colorless entries accept any remaining unit.
    fn cost_paid(&self, attacker: InstanceId, cost: &[EnergyType]) -> bool {
        let attached = self.state.energy.attached(attacker);
        let mut typed: rustc_hash::FxHashMap<EnergyType, u32> = rustc_hash::FxHashMap::default();
        for &ty in cost {
            if ty != EnergyType::Colorless {
                *typed.entry(ty).or_default() += 1;
            }
        }
        for (ty, needed) in &typed {
            if attached.get(*ty) < *needed {
                return false;
            }
        }
        attached.total() >= cost.len() as u32
    }

    /// Retreat the active creature to an occupied bench slot, paying
    /// the printed cost plus any passive increase by discarding energy.
    pub fn retreat(&mut self, to: FieldPos) -> EngineResult<ActionOutcome> {
        if let Some(reason) = self.guard() {
            return Ok(ActionOutcome::Rejected(reason));
        }
        let player = self.state.turn.active_player;
        if to.player != player || to.is_active() {
            return Ok(ActionOutcome::Rejected(RejectReason::InvalidSlot));
        }
        let active = FieldPos::active(player);
        let Some(card) = self.state.field.get(active) else {
            return Ok(ActionOutcome::Rejected(RejectReason::PositionEmpty));
        };
        if self.state.field.get(to).is_none() {
            return Ok(ActionOutcome::Rejected(RejectReason::PositionEmpty));
        }
        if card.has_status(StatusCondition::Asleep) || card.has_status(StatusCondition::Paralyzed) {
            return Ok(ActionOutcome::Rejected(RejectReason::RetreatPrevented));
        }
        let retreating = card.instance;
        let cost = self.repo.get_creature(card.template)?.retreat_cost
            + self.state.passives.retreat_cost_increase(retreating, player);
        if self.state.energy.attached_total(retreating) < cost {
            return Ok(ActionOutcome::Rejected(RejectReason::InsufficientEnergy));
        }

        // Pay in canonical type order.
        let mut remaining = cost;
        for ty in EnergyType::ALL {
            if remaining == 0 {
                break;
            }
            remaining -= self.state.energy.discard_from(retreating, player, ty, remaining);
        }
        self.state.field.require_mut(active)?.clear_statuses();
        self.state.field.swap(active, to);
        self.state.turn.record(player, ActionKind::Retreat);
        debug!(%player, promoted = %to, "retreated");

        let outcome =
            resolve_event(&mut self.state, &self.repo, &GameEvent::Retreated { player })?;
        self.after_drain(outcome)
    }

    // === Abilities ===

    /// Use a creature's manual ability. Once per creature per turn
    /// unless the ability is unlimited.
    pub fn use_ability(&mut self, pos: FieldPos) -> EngineResult<ActionOutcome> {
        if let Some(reason) = self.guard() {
            return Ok(ActionOutcome::Rejected(reason));
        }
        let player = self.state.turn.active_player;
        if pos.player != player {
            return Ok(ActionOutcome::Rejected(RejectReason::NotYourCreature));
        }
        let Some(card) = self.state.field.get(pos) else {
            return Ok(ActionOutcome::Rejected(RejectReason::PositionEmpty));
        };
        let user = card.instance;
        let creature = self.repo.get_creature(card.template)?;
        let Some(ability) = &creature.ability else {
            return Ok(ActionOutcome::Rejected(RejectReason::NoAbility));
        };
        let TriggerKind::Manual { unlimited } = ability.trigger else {
            return Ok(ActionOutcome::Rejected(RejectReason::NoAbility));
        };
        if !unlimited && self.state.turn.abilities_used.contains(&user) {
            return Ok(ActionOutcome::Rejected(RejectReason::AbilityAlreadyUsed));
        }
        let effects = ability.effects.clone();

        let ctx = EffectContext::from_position(player, pos);
        if !all_can_apply(&self.state, &self.repo, &effects, &ctx)? {
            return Ok(ActionOutcome::Rejected(RejectReason::EffectCannotApply));
        }

        if !unlimited {
            self.state.turn.abilities_used.push(user);
        }
        self.state.turn.record(player, ActionKind::UseAbility);
        debug!(%player, %pos, "ability used");
        let outcome = resolve_effects(&mut self.state, &self.repo, &ctx, &effects)?;
        self.after_drain(outcome)
    }

    // === Turn flow ===

    /// End the active player's turn: end-of-turn triggers, status
    /// checkup, passive expiry, turn advance, energy generation, draw,
    /// and start-of-turn triggers. Any stage may suspend on a
    /// selection; the transition resumes where it left off.
    pub fn end_turn(&mut self) -> EngineResult<ActionOutcome> {
        if let Some(reason) = self.guard() {
            return Ok(ActionOutcome::Rejected(reason));
        }
        let player = self.state.turn.active_player;
        self.state.turn.record(player, ActionKind::EndTurn);
        self.state.turn.end_phase = Some(EndPhase::Checkup);
        debug!(%player, "turn ending");

        let outcome =
            resolve_event(&mut self.state, &self.repo, &GameEvent::TurnEnded { player })?;
        self.after_drain(outcome)
    }

    /// The between-turns checkup: poison damage (through the hp
    /// pipeline so caps, triggers, and knockouts behave normally),
    /// sleep coin flips, paralysis clearing, and on-checkup triggers.
    fn run_checkup(&mut self) -> EngineResult<DrainOutcome> {
        self.state.turn.end_phase = Some(EndPhase::Transition);
        let ended = self.state.turn.active_player;

        for player in [ended, ended.opponent()] {
            let pos = FieldPos::active(player);
            let Some(card) = self.state.field.get_mut(pos) else {
                continue;
            };
            if card.has_status(StatusCondition::Poisoned) {
                self.state.resolution.enqueue_effects(
                    &EffectContext::for_player(player),
                    &[EffectSpec::damage(
                        POISON_DAMAGE,
                        TargetSpec::Fixed(FixedTarget::ActingActive),
                    )],
                );
            }
            let card = self.state.field.require_mut(pos)?;
            if card.has_status(StatusCondition::Asleep) && self.state.rng.coin_flip() {
                card.remove_status(StatusCondition::Asleep);
                debug!(%pos, "woke up");
            }
            if player == ended && card.has_status(StatusCondition::Paralyzed) {
                card.remove_status(StatusCondition::Paralyzed);
                debug!(%pos, "paralysis cleared");
            }
        }

        resolve_event(&mut self.state, &self.repo, &GameEvent::Checkup { player: ended })
    }

    /// Expire passives, advance the turn, roll generation, draw, and
    /// fire start-of-turn triggers. Expiry runs before the new turn's
    /// triggers, so a lapsing prevention never blocks the turn it
    /// expires into.
    fn run_transition(&mut self) -> EngineResult<DrainOutcome> {
        self.state.turn.end_phase = None;
        let ended_turn = self.state.turn.turn_number;
        self.state.passives.expire(ended_turn);
        self.state.turn.advance();

        let next = self.state.turn.active_player;
        let palette_len = self.state.energy.generation_palette[next].len();
        if palette_len > 0 {
            let pick = self.state.rng.gen_range_usize(0..palette_len);
            let ty = self.state.energy.generation_palette[next][pick];
            self.state.energy.current_generation[next] = Some(ty);
        }
        self.state.draw_cards(next, 1);
        info!(turn = self.state.turn.turn_number, %next, "turn started");

        resolve_event(&mut self.state, &self.repo, &GameEvent::TurnStarted { player: next })
    }

    // === Selection responses ===

    /// Answer a pending target selection.
    pub fn select_target(&mut self, chooser: PlayerId, index: usize) -> EngineResult<ActionOutcome> {
        self.select(chooser, index, SelectionRole::Target)
    }

    /// Answer a pending energy-source selection.
    pub fn select_energy(&mut self, chooser: PlayerId, index: usize) -> EngineResult<ActionOutcome> {
        self.select(chooser, index, SelectionRole::Source)
    }

    fn select(
        &mut self,
        chooser: PlayerId,
        index: usize,
        role: SelectionRole,
    ) -> EngineResult<ActionOutcome> {
        let Some(request) = self.state.resolution.pending_request() else {
            return Ok(ActionOutcome::Rejected(RejectReason::SelectionNotPending));
        };
        if request.role != role {
            return Ok(ActionOutcome::Rejected(RejectReason::WrongSelectionKind));
        }
        if request.chooser != chooser {
            return Ok(ActionOutcome::Rejected(RejectReason::WrongChooser));
        }
        if index >= request.candidates.len() {
            return Ok(ActionOutcome::Rejected(RejectReason::InvalidSelectionIndex));
        }

        let outcome = resume_with_selection(&mut self.state, &self.repo, index)?;
        self.after_drain(outcome)
    }

    /// Drive any queued-but-unresolved work (after restoring a
    /// checkpoint that was mid-drain).
    pub fn resume(&mut self) -> EngineResult<ActionOutcome> {
        let outcome = drain(&mut self.state, &self.repo)?;
        self.after_drain(outcome)
    }
}
