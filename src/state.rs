// src/state.rs
//
// The only sources of nondeterminism in generation: a seeded RNG and the
// identifier pool. Both live in one owned value that is reset per request.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::builtins::Language;
use crate::names::WordPool;

pub const DEFAULT_SEED: u64 = 9_100_202_880_737_469_383;

#[derive(Debug, Clone)]
pub struct GenState {
    pub rng: StdRng,
    pub words: WordPool,
    seed: u64,
}

impl GenState {
    pub fn new(seed: u64, lang: Language) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            words: WordPool::new(lang),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Reseed the RNG and refill the word pool for `lang`.
    pub fn reset(&mut self, seed: u64, lang: Language) {
        self.rng = StdRng::seed_from_u64(seed);
        self.words.reset(lang);
        self.seed = seed;
    }

    /// A fresh lowercase identifier.
    pub fn word(&mut self) -> String {
        self.words.word(&mut self.rng)
    }

    /// A fresh capitalized identifier.
    pub fn class_name(&mut self) -> String {
        self.words.capitalized(&mut self.rng)
    }
}

impl Default for GenState {
    fn default() -> Self {
        Self::new(DEFAULT_SEED, Language::Kotlin)
    }
}
