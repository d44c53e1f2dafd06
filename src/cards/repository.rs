//! Card repository.
//!
//! Holds every card template for a game and resolves template ids to
//! static data. Lookup of an unknown template is a data error upstream
//! and fails fast.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{EngineError, EngineResult, TemplateId};

use super::template::{CardCategory, CardTemplate, CreatureData, ToolData, TrainerData};

/// Repository of card templates keyed by id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CardRepository {
    templates: FxHashMap<TemplateId, CardTemplate>,
}

impl CardRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a template, replacing any previous one with the same id.
    pub fn insert(&mut self, template: CardTemplate) {
        self.templates.insert(template.id, template);
    }

    /// Get a template by id.
    pub fn get(&self, id: TemplateId) -> EngineResult<&CardTemplate> {
        self.templates
            .get(&id)
            .ok_or(EngineError::UnknownTemplate(id))
    }

    /// Get creature data by id; fails if the template is another category.
    pub fn get_creature(&self, id: TemplateId) -> EngineResult<&CreatureData> {
        match &self.get(id)?.category {
            CardCategory::Creature(data) => Ok(data),
            _ => Err(EngineError::WrongCategory(id)),
        }
    }

    /// Get supporter data by id.
    pub fn get_supporter(&self, id: TemplateId) -> EngineResult<&TrainerData> {
        match &self.get(id)?.category {
            CardCategory::Supporter(data) => Ok(data),
            _ => Err(EngineError::WrongCategory(id)),
        }
    }

    /// Get item data by id.
    pub fn get_item(&self, id: TemplateId) -> EngineResult<&TrainerData> {
        match &self.get(id)?.category {
            CardCategory::Item(data) => Ok(data),
            _ => Err(EngineError::WrongCategory(id)),
        }
    }

    /// Get tool data by id.
    pub fn get_tool(&self, id: TemplateId) -> EngineResult<&ToolData> {
        match &self.get(id)?.category {
            CardCategory::Tool(data) => Ok(data),
            _ => Err(EngineError::WrongCategory(id)),
        }
    }

    /// Name of a template.
    pub fn name(&self, id: TemplateId) -> EngineResult<&str> {
        Ok(self.get(id)?.name.as_str())
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
