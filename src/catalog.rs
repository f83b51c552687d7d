pub mod import;
pub mod ingredients;
pub mod tags;

pub use import::{ImportReport, IngredientRecord, TagRecord};
pub use ingredients::IngredientView;
pub use tags::TagView;
