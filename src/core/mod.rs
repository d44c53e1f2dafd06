//! Core types: players, ids, positions, RNG, errors, and the game
//! state aggregate.

mod error;
mod ids;
mod player;
mod rng;
mod state;

pub use error::{EngineError, EngineResult};
pub use ids::{FieldPos, InstanceId, TemplateId, BENCH_SLOTS, FIELD_SLOTS};
pub use player::{PlayerId, PlayerMap, PLAYER_COUNT};
pub use rng::{GameRng, GameRngState};
pub use state::{ActionKind, ActionRecord, EndPhase, GameState, TurnState, WIN_THRESHOLD};
