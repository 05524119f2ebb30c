// src/models/mod.rs

pub mod discovery;

pub use discovery::{list_models, unique_sorted};
