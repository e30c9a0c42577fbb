// src/cli/args.rs

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::builtins::Language;

/// Random Kotlin and Java program generator for compiler testing
#[derive(Parser, Debug, Clone)]
#[command(name = "kj-stress")]
#[command(version)]
#[command(about = "Generate well-typed random Kotlin and Java programs", long_about = None)]
pub struct Cli {
    /// Target language
    #[arg(long, value_enum, default_value_t = LanguageChoice::Both)]
    pub language: LanguageChoice,

    /// Seed of the first program (defaults to the current time)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Profile name (default, small, deep, generics-heavy) or TOML file path
    #[arg(long, default_value = "default")]
    pub profile: String,

    /// Number of programs per language, seeded consecutively
    #[arg(long, default_value_t = 1)]
    pub count: u64,

    /// Directory to write programs and a manifest into (stdout when absent)
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Override the maximum expression depth
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Override the number of top-level declarations
    #[arg(long)]
    pub top_level: Option<usize>,

    /// Fail instead of emitting placeholder values
    #[arg(long)]
    pub strict: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageChoice {
    Kotlin,
    Java,
    Both,
}

impl LanguageChoice {
    pub fn languages(self) -> &'static [Language] {
        match self {
            LanguageChoice::Kotlin => &[Language::Kotlin],
            LanguageChoice::Java => &[Language::Java],
            LanguageChoice::Both => &[Language::Kotlin, Language::Java],
        }
    }
}
