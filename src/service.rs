// src/service.rs
//
// Request boundary. Each request reseeds the owned generation state, runs
// the generator and the emitter for one language, and turns any failure
// into a logged `None`.

use std::time::Instant;

use serde::Serialize;
use tracing::{error, info};

use crate::builtins::Language;
use crate::config::GenConfig;
use crate::errors::Result;
use crate::generator::Generator;
use crate::state::GenState;
use crate::translate::translate;

/// Source text of one generated program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedProgram {
    pub language: Language,
    pub seed: u64,
    pub text: String,
}

/// Generator service holding the state reused across requests.
#[derive(Debug)]
pub struct Service {
    state: GenState,
    config: GenConfig,
    strict: bool,
}

impl Service {
    pub fn new(config: GenConfig) -> Self {
        Self {
            state: GenState::default(),
            config,
            strict: false,
        }
    }

    /// Reject programs that still contain placeholder values instead of
    /// emitting throwing defaults for them.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn config(&self) -> &GenConfig {
        &self.config
    }

    /// Generate one program. Failures are logged and yield `None`.
    pub fn generate(&mut self, language: Language, seed: u64) -> Option<GeneratedProgram> {
        let start = Instant::now();
        match self.try_generate(language, seed) {
            Ok(program) => {
                info!(
                    %language,
                    seed,
                    bytes = program.text.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "generated program"
                );
                Some(program)
            }
            Err(err) => {
                error!(
                    %language,
                    seed,
                    "generation failed: {:?}",
                    miette::Report::new(err)
                );
                None
            }
        }
    }

    /// Generate one program, propagating failures.
    pub fn try_generate(&mut self, language: Language, seed: u64) -> Result<GeneratedProgram> {
        self.state.reset(seed, language);
        let program = Generator::new(&mut self.state, &self.config, language).generate()?;
        let text = translate(&program, self.strict)?;
        Ok(GeneratedProgram {
            language,
            seed,
            text,
        })
    }

    /// Kotlin, then Java, both from `seed`.
    pub fn generate_pair(
        &mut self,
        seed: u64,
    ) -> (Option<GeneratedProgram>, Option<GeneratedProgram>) {
        let kotlin = self.generate(Language::Kotlin, seed);
        let java = self.generate(Language::Java, seed);
        (kotlin, java)
    }
}

impl Default for Service {
    fn default() -> Self {
        Self::new(GenConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> GenConfig {
        let mut config = GenConfig::default();
        config.limits.min_top_level = 1;
        config.limits.max_top_level = 3;
        config.limits.max_depth = 3;
        config
    }

    #[test]
    fn same_seed_same_text() {
        let mut service = Service::new(small());
        for seed in 0..5 {
            let first = service.generate(Language::Kotlin, seed);
            // An unrelated request in between must not leak state.
            service.generate(Language::Java, seed + 100);
            let second = service.generate(Language::Kotlin, seed);
            assert_eq!(first, second, "seed {seed}");
        }
    }

    #[test]
    fn pair_matches_single_requests() {
        let mut service = Service::new(small());
        let (kotlin, java) = service.generate_pair(7);
        assert_eq!(kotlin, service.generate(Language::Kotlin, 7));
        assert_eq!(java, service.generate(Language::Java, 7));
        if let Some(java) = java {
            assert_eq!(java.language, Language::Java);
            assert!(java.text.starts_with("class Main"));
        }
    }

    #[test]
    fn every_seed_succeeds() {
        let mut service = Service::new(small());
        for lang in [Language::Kotlin, Language::Java] {
            for seed in 0..20 {
                assert!(
                    service.generate(lang, seed).is_some(),
                    "{lang} seed {seed} produced no program"
                );
            }
        }
    }
}
