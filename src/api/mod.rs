// Wire-level helpers shared by handlers and the mutation pipeline

pub mod format;
pub mod ids;

pub use format::{entities_to_api_value, entity_to_api_value, FormatOptions};
