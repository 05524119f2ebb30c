// src/types/mod.rs

pub mod chat;
pub mod ollama;
pub mod openai;

pub use chat::*;
pub use ollama::*;
pub use openai::*;
