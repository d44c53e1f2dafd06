//! Card templates - static card data.
//!
//! A `CardTemplate` holds the immutable printing data for one card:
//! a shared header (id, name) plus a category-specific payload. The
//! engine never mutates templates; effect descriptors inside them are
//! referenced during resolution, not copied.

use serde::{Deserialize, Serialize};

use crate::core::TemplateId;
use crate::effects::EffectSpec;
use crate::triggers::TriggerKind;

/// Energy types. `Colorless` appears in attack costs (matches any
/// attached type) and never as generated energy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnergyType {
    Grass,
    Fire,
    Water,
    Lightning,
    Psychic,
    Fighting,
    Darkness,
    Metal,
    Colorless,
}

impl EnergyType {
    /// All concrete (attachable) energy types, in canonical order.
    ///
    /// Iteration over stored energy always uses this order so that
    /// "any type" consumption is deterministic.
    pub const ALL: [EnergyType; 8] = [
        EnergyType::Grass,
        EnergyType::Fire,
        EnergyType::Water,
        EnergyType::Lightning,
        EnergyType::Psychic,
        EnergyType::Fighting,
        EnergyType::Darkness,
        EnergyType::Metal,
    ];
}

impl std::fmt::Display for EnergyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Evolution stage of a creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Basic,
    Stage1,
    Stage2,
}

/// An attack printed on a creature card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    pub name: String,
    /// Energy cost. `Colorless` entries are satisfied by any type.
    pub cost: Vec<EnergyType>,
    /// Base damage before boosts and weakness.
    pub damage: u32,
    /// Additional effects applied after damage.
    pub effects: Vec<EffectSpec>,
}

impl Attack {
    /// Create an attack with no extra effects.
    #[must_use]
    pub fn new(name: impl Into<String>, cost: Vec<EnergyType>, damage: u32) -> Self {
        Self {
            name: name.into(),
            cost,
            damage,
            effects: Vec::new(),
        }
    }

    /// Add an effect (builder pattern).
    #[must_use]
    pub fn with_effect(mut self, effect: EffectSpec) -> Self {
        self.effects.push(effect);
        self
    }
}

/// An ability on a creature, or the bonus layer of an attached tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub name: String,
    /// When the ability's effects fire.
    pub trigger: TriggerKind,
    pub effects: Vec<EffectSpec>,
}

impl Ability {
    /// Create an ability.
    #[must_use]
    pub fn new(name: impl Into<String>, trigger: TriggerKind) -> Self {
        Self {
            name: name.into(),
            trigger,
            effects: Vec::new(),
        }
    }

    /// Add an effect (builder pattern).
    #[must_use]
    pub fn with_effect(mut self, effect: EffectSpec) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Static data of a creature printing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatureData {
    pub max_hp: u32,
    pub energy_type: EnergyType,
    pub stage: Stage,
    /// Name of the creature this evolves from. Evolution matches by
    /// name, never by template id, so reprints are interchangeable.
    pub evolves_from: Option<String>,
    pub weakness: Option<EnergyType>,
    pub retreat_cost: u32,
    /// Worth 2 points on knockout instead of 1.
    pub ex: bool,
    pub attacks: Vec<Attack>,
    pub ability: Option<Ability>,
}

/// Static data of a supporter or item printing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainerData {
    /// Effects applied when the card is played, in declared order.
    pub effects: Vec<EffectSpec>,
}

/// Static data of a tool printing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolData {
    /// Added to the holder's effective max HP while attached.
    pub hp_bonus: u32,
    /// Optional triggered layer; fires after the holder's own ability
    /// on the same event.
    pub ability: Option<Ability>,
}

/// Category payload of a card template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CardCategory {
    Creature(CreatureData),
    Supporter(TrainerData),
    Item(TrainerData),
    Tool(ToolData),
}

/// A card printing: shared header plus category payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardTemplate {
    pub id: TemplateId,
    pub name: String,
    pub category: CardCategory,
}

impl CardTemplate {
    /// Create a template.
    #[must_use]
    pub fn new(id: TemplateId, name: impl Into<String>, category: CardCategory) -> Self {
        Self {
            id,
            name: name.into(),
            category,
        }
    }

    /// Get the creature payload, if this is a creature.
    #[must_use]
    pub fn as_creature(&self) -> Option<&CreatureData> {
        match &self.category {
            CardCategory::Creature(data) => Some(data),
            _ => None,
        }
    }

    /// Get the tool payload, if this is a tool.
    #[must_use]
    pub fn as_tool(&self) -> Option<&ToolData> {
        match &self.category {
            CardCategory::Tool(data) => Some(data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_all_excludes_colorless() {
        assert!(!EnergyType::ALL.contains(&EnergyType::Colorless));
        assert_eq!(EnergyType::ALL.len(), 8);
    }

    #[test]
    fn test_template_accessors() {
        let template = CardTemplate::new(
            TemplateId::new(1),
            "Seedling",
            CardCategory::Creature(CreatureData {
                max_hp: 60,
                energy_type: EnergyType::Grass,
                stage: Stage::Basic,
                evolves_from: None,
                weakness: Some(EnergyType::Fire),
                retreat_cost: 1,
                ex: false,
                attacks: vec![Attack::new("Tackle", vec![EnergyType::Grass], 20)],
                ability: None,
            }),
        );

        assert!(template.as_creature().is_some());
        assert!(template.as_tool().is_none());
        assert_eq!(template.as_creature().unwrap().max_hp, 60);
    }

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::Basic < Stage::Stage1);
        assert!(Stage::Stage1 < Stage::Stage2);
    }
}
