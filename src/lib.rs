//! # pocket-ccg
//!
//! A rules engine for a two-player collectible-card battle game.
//!
//! ## Design Principles
//!
//! 1. **Data-driven cards**: Card behavior lives in declarative effect
//!    descriptors on templates; the engine interprets them. Adding a
//!    card never adds code.
//!
//! 2. **Single-writer state**: One `GameState` per game instance,
//!    mutated only by the synchronous resolution loop. No locks, no
//!    parallelism inside a game.
//!
//! 3. **Checkpoint everywhere**: The whole state (including a suspended
//!    resolution waiting on a player choice and an in-progress turn
//!    transition) serializes with serde, so a game can stop and resume
//!    in another process at any decision point.
//!
//! ## Modules
//!
//! - `core`: Player ids, positions, RNG, errors, the state aggregate
//! - `cards`: Templates, instances, and the card repository
//! - `field`: Field positions and evolution stacks
//! - `energy`: Attached energy, the discard ledger, generation
//! - `effects`: Specs, amount/target resolution, handlers, the queue,
//!   duration-scoped passives
//! - `triggers`: Event-to-ability matching and dispatch ordering
//! - `rules`: Action legality and turn flow

pub mod cards;
pub mod core;
pub mod effects;
pub mod energy;
pub mod field;
pub mod rules;
pub mod triggers;

// Re-export commonly used types
pub use crate::core::{
    EngineError, EngineResult, FieldPos, GameRng, GameRngState, GameState, InstanceId, PlayerId,
    PlayerMap, TemplateId, TurnState, BENCH_SLOTS, FIELD_SLOTS, WIN_THRESHOLD,
};

pub use crate::cards::{
    Ability, Attack, CardCategory, CardInstance, CardRepository, CardTemplate, CreatureData,
    EnergyType, Stage, ToolData, TrainerData,
};

pub use crate::field::{Field, FieldCard};

pub use crate::energy::{EnergyCounts, EnergyStore};

pub use crate::effects::{
    AmountSpec, CountSpec, DrainOutcome, DurationPolicy, EffectContext, EffectKind, EffectQueue,
    EffectSpec, FixedTarget, Operation, PassiveTracker, SelectionRequest, SelectionRole, Side,
    SourceSpec, StatusCondition, TargetCriteria, TargetSpec, MOVE_ALL,
};

pub use crate::triggers::{GameEvent, PlayFilter, TriggerKind};

pub use crate::rules::{ActionOutcome, GameEngine, RejectReason};
