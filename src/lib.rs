// src/lib.rs
pub mod ast;
pub mod builtins;
pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod generator;
pub mod names;
pub mod service;
pub mod state;
pub mod translate;
pub mod type_utils;
pub mod types;

pub use builtins::Language;
pub use config::GenConfig;
pub use errors::GenerateError;
pub use service::{GeneratedProgram, Service};
