//! Engine error types.
//!
//! Only invalid references are errors: unknown templates, missing
//! instances, out-of-range positions. Unsatisfiable targets and illegal
//! actions are ordinary rejection values returned to the caller, never
//! errors (they leave state untouched).

use thiserror::Error;

use super::ids::{FieldPos, InstanceId, TemplateId};

/// Errors indicating a broken reference or upstream data bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown card template: {0}")]
    UnknownTemplate(TemplateId),

    #[error("wrong card category for template {0}")]
    WrongCategory(TemplateId),

    #[error("no card instance {0}")]
    NoSuchInstance(InstanceId),

    #[error("no creature at {0}")]
    EmptyPosition(FieldPos),

    #[error("position {0} is already occupied")]
    OccupiedPosition(FieldPos),

    #[error("field slot index {0} out of range")]
    SlotOutOfRange(u8),

    #[error("no selection is pending")]
    NoPendingSelection,

    #[error("energy attach effect declares no energy type")]
    MissingEnergyType,
}

/// Engine result alias.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
