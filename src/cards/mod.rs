//! Static card data: templates, instances, and the repository.

mod instance;
mod repository;
mod template;

pub use instance::CardInstance;
pub use repository::CardRepository;
pub use template::{
    Ability, Attack, CardCategory, CardTemplate, CreatureData, EnergyType, Stage, ToolData,
    TrainerData,
};
