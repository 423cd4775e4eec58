//! Policy model loading from YAML documents

mod loader;

pub use loader::*;
