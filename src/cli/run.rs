// src/cli/run.rs
//
// The generate command: resolve the configuration, run the service over a
// seed range, and print or write the results.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::args::Cli;
use crate::builtins::Language;
use crate::config::{GenConfig, UnknownProfileError, get_profile};
use crate::service::{GeneratedProgram, Service};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Profile(#[from] UnknownProfileError),
    #[error("error writing '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Record of a batch written to an output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub profile: String,
    pub first_seed: u64,
    pub count: u64,
    pub programs: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub seed: u64,
    pub language: Language,
    /// File name inside the output directory; absent when generation failed.
    pub file: Option<String>,
    pub ok: bool,
}

impl Manifest {
    pub fn failures(&self) -> usize {
        self.programs.iter().filter(|p| !p.ok).count()
    }
}

/// The profile with command-line overrides applied.
pub fn resolve_config(cli: &Cli) -> Result<GenConfig, CliError> {
    let mut config = get_profile(&cli.profile)?;
    if let Some(depth) = cli.max_depth {
        config.limits.max_depth = depth;
    }
    if let Some(n) = cli.top_level {
        config.limits.min_top_level = n;
        config.limits.max_top_level = n;
    }
    Ok(config)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub fn file_name(language: Language, seed: u64) -> String {
    match language {
        Language::Kotlin => format!("program_{seed}.kt"),
        Language::Java => format!("Main_{seed}.java"),
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    fs::write(path, contents).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Generate `cli.count` programs per selected language starting at
/// `first_seed`, writing each to `dir` together with `manifest.json`.
pub fn write_batch(cli: &Cli, first_seed: u64, dir: &Path) -> Result<Manifest, CliError> {
    let mut service = Service::new(resolve_config(cli)?).strict(cli.strict);
    fs::create_dir_all(dir).map_err(|source| CliError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut programs = Vec::new();
    for seed in first_seed..first_seed.saturating_add(cli.count) {
        for &language in cli.language.languages() {
            let entry = match service.generate(language, seed) {
                Some(GeneratedProgram { text, .. }) => {
                    let name = file_name(language, seed);
                    write_file(&dir.join(&name), &text)?;
                    ManifestEntry {
                        seed,
                        language,
                        file: Some(name),
                        ok: true,
                    }
                }
                None => ManifestEntry {
                    seed,
                    language,
                    file: None,
                    ok: false,
                },
            };
            programs.push(entry);
        }
    }

    let manifest = Manifest {
        profile: cli.profile.clone(),
        first_seed,
        count: cli.count,
        programs,
    };
    let json = serde_json::to_string_pretty(&manifest)?;
    write_file(&dir.join("manifest.json"), &json)?;
    debug!(dir = %dir.display(), programs = manifest.programs.len(), "wrote manifest");
    Ok(manifest)
}

fn print_batch(cli: &Cli, first_seed: u64) -> Result<usize, CliError> {
    let mut service = Service::new(resolve_config(cli)?).strict(cli.strict);
    let mut failures = 0;
    for seed in first_seed..first_seed.saturating_add(cli.count) {
        for &language in cli.language.languages() {
            match service.generate(language, seed) {
                Some(program) => {
                    println!("// {language}, seed {seed}");
                    println!("{}", program.text);
                }
                None => {
                    eprintln!("error: {language} generation failed for seed {seed}");
                    failures += 1;
                }
            }
        }
    }
    Ok(failures)
}

/// Entry point of the binary.
pub fn run(cli: &Cli) -> ExitCode {
    let first_seed = cli.seed.unwrap_or_else(clock_seed);
    let failures = match &cli.output {
        Some(dir) => write_batch(cli, first_seed, dir).map(|m| m.failures()),
        None => print_batch(cli, first_seed),
    };
    match failures {
        Ok(0) => ExitCode::SUCCESS,
        Ok(n) => {
            eprintln!("error: {n} program(s) failed to generate (first seed {first_seed})");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn overrides_apply_on_top_of_profile() {
        let cli = Cli::parse_from([
            "kj-stress",
            "--profile",
            "small",
            "--max-depth",
            "2",
            "--top-level",
            "4",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.limits.max_depth, 2);
        assert_eq!(config.limits.min_top_level, 4);
        assert_eq!(config.limits.max_top_level, 4);
    }

    #[test]
    fn unknown_profile_is_reported() {
        let cli = Cli::parse_from(["kj-stress", "--profile", "enormous"]);
        let err = resolve_config(&cli).unwrap_err();
        assert!(err.to_string().contains("enormous"), "{err}");
    }

    #[test]
    fn file_names_follow_language() {
        assert_eq!(file_name(Language::Kotlin, 3), "program_3.kt");
        assert_eq!(file_name(Language::Java, 3), "Main_3.java");
    }
}
