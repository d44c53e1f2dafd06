//! Card instances - physical card copies at runtime.
//!
//! A `CardInstance` pairs the unique id of a physical copy with the
//! printing it currently shows. Instances move between hand, deck,
//! discard, and the field; they are never created or destroyed after
//! deck construction.

use serde::{Deserialize, Serialize};

use crate::core::{InstanceId, TemplateId};

/// A physical card copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardInstance {
    /// Unique id of this physical copy.
    pub instance: InstanceId,
    /// The printing.
    pub template: TemplateId,
}

impl CardInstance {
    /// Create a card instance.
    #[must_use]
    pub const fn new(instance: InstanceId, template: TemplateId) -> Self {
        Self { instance, template }
    }
}

impl std::fmt::Display for CardInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.instance, self.template)
    }
}
