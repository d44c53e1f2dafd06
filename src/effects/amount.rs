//! Amount resolution.
//!
//! Evaluates the recursive amount language against the current state.
//! Evaluation is read-only and deterministic: the same state and spec
//! always produce the same number, and no randomness is consumed.

use crate::cards::CardRepository;
use crate::core::{EngineResult, GameState, PlayerId};

use super::spec::{AmountSpec, CardZone, CountSpec, PlayerContextValue, Side};
use super::target::{matching_energy, matching_positions};
use super::EffectContext;

fn side_player(side: Side, acting: PlayerId) -> PlayerId {
    match side {
        Side::Acting => acting,
        Side::Opponent => acting.opponent(),
    }
}

fn resolve_player_context(state: &GameState, player: PlayerId, value: PlayerContextValue) -> u32 {
    match value {
        PlayerContextValue::HandSize => state.hand_size(player) as u32,
        PlayerContextValue::CurrentPoints => state.points[player],
        PlayerContextValue::PointsToWin => state.points_to_win(player),
    }
}

fn resolve_count(
    state: &GameState,
    repo: &CardRepository,
    count: &CountSpec,
    ctx: &EffectContext,
) -> EngineResult<u32> {
    match count {
        CountSpec::Field(criteria) => {
            Ok(matching_positions(state, repo, criteria, ctx.player)?.len() as u32)
        }

        CountSpec::Cards { side, zone } => {
            let player = side_player(*side, ctx.player);
            let count = match zone {
                CardZone::Hand => state.hands[player].len(),
                CardZone::Deck => state.decks[player].len(),
                CardZone::Discard => state.discards[player].len(),
            };
            Ok(count as u32)
        }

        CountSpec::Energy {
            criteria,
            energy_types,
        } => {
            let positions = matching_positions(state, repo, criteria, ctx.player)?;
            Ok(positions
                .iter()
                .map(|pos| matching_energy(state, *pos, energy_types))
                .sum())
        }

        CountSpec::Damage(criteria) => {
            let positions = matching_positions(state, repo, criteria, ctx.player)?;
            let mut total = 0;
            for pos in positions {
                total += state.field.require(pos)?.damage_taken;
            }
            Ok(total)
        }
    }
}

/// Evaluate an amount spec to a concrete value.
pub fn resolve_amount(
    state: &GameState,
    repo: &CardRepository,
    amount: &AmountSpec,
    ctx: &EffectContext,
) -> EngineResult<u32> {
    match amount {
        AmountSpec::Constant(value) => Ok(*value),

        AmountSpec::PlayerContext { side, value } => {
            Ok(resolve_player_context(state, side_player(*side, ctx.player), *value))
        }

        AmountSpec::Count(count) => resolve_count(state, repo, count, ctx),

        AmountSpec::Addition(terms) => {
            let mut total: u32 = 0;
            for term in terms {
                total = total.saturating_add(resolve_amount(state, repo, term, ctx)?);
            }
            Ok(total)
        }

        AmountSpec::Multiplication { base, multiplier } => {
            let base = resolve_amount(state, repo, base, ctx)?;
            let multiplier = resolve_amount(state, repo, multiplier, ctx)?;
            Ok(base.saturating_mul(multiplier))
        }
    }
}
