// src/cli/mod.rs
pub mod args;
pub mod run;

pub use args::{Cli, LanguageChoice};
pub use run::{CliError, Manifest, ManifestEntry, file_name, resolve_config, run, write_batch};
