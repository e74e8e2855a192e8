pub mod classifier;
pub mod field_model;
pub mod label;
pub mod selector;
