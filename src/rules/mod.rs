//! Action legality and turn flow.

mod engine;

pub use engine::{
    ActionOutcome, GameEngine, RejectReason, OPENING_HAND, POISON_DAMAGE, WEAKNESS_BONUS,
};
