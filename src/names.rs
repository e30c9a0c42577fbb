//! Consumable identifier pool.
//!
//! Every identifier in a generated program is drawn from a fixed word list
//! so that output is readable and, for a given seed, reproducible. Words are
//! removed as they are handed out, which keeps names unique within one
//! program.

use rand::Rng;

use crate::builtins::Language;

const WORDS: &str = include_str!("../data/words.txt");

/// Keywords of either target language, plus names the emitters reserve.
const KOTLIN_RESERVED: &[&str] = &[
    "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in",
    "interface", "is", "null", "object", "package", "return", "super", "this", "throw", "true",
    "try", "typealias", "typeof", "val", "var", "when", "while", "by", "catch", "constructor",
    "field", "finally", "get", "import", "init", "set", "value", "where", "open", "data",
    "inner", "out", "main", "args",
];

const JAVA_RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface",
    "long", "native", "new", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "try", "void", "volatile", "while", "var", "record", "yield", "main", "args",
];

/// Words reserved in `lang`.
pub fn reserved_words(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::Kotlin => KOTLIN_RESERVED,
        Language::Java => JAVA_RESERVED,
    }
}

/// The identifier pool. `reset` restores the full list minus the reserved
/// words of the target language.
#[derive(Debug, Clone)]
pub struct WordPool {
    words: Vec<&'static str>,
    /// Suffix counter used once the list runs dry.
    overflow: usize,
}

impl WordPool {
    pub fn new(lang: Language) -> Self {
        let mut pool = Self {
            words: Vec::new(),
            overflow: 0,
        };
        pool.reset(lang);
        pool
    }

    pub fn reset(&mut self, lang: Language) {
        let reserved = reserved_words(lang);
        self.words = WORDS
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty() && !reserved.contains(w))
            .collect();
        self.overflow = 0;
    }

    pub fn remaining(&self) -> usize {
        self.words.len()
    }

    /// Remove and return a random lowercase word. An exhausted pool yields
    /// numbered names instead.
    pub fn word<R: Rng>(&mut self, rng: &mut R) -> String {
        if self.words.is_empty() {
            self.overflow += 1;
            return format!("ident{}", self.overflow);
        }
        let idx = rng.gen_range(0..self.words.len());
        self.words.swap_remove(idx).to_string()
    }

    /// A random word with its first letter uppercased, for class names.
    pub fn capitalized<R: Rng>(&mut self, rng: &mut R) -> String {
        capitalize(&self.word(rng))
    }
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A single uppercase letter not in `blacklist`, or `None` when all 26 are
/// taken.
pub fn caps<R: Rng>(rng: &mut R, blacklist: &[String]) -> Option<String> {
    let free: Vec<char> = ('A'..='Z')
        .filter(|c| !blacklist.iter().any(|b| b.len() == 1 && b.starts_with(*c)))
        .collect();
    if free.is_empty() {
        return None;
    }
    Some(free[rng.gen_range(0..free.len())].to_string())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn words_are_unique_until_exhausted() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut pool = WordPool::new(Language::Kotlin);
        let total = pool.remaining();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..total {
            assert!(seen.insert(pool.word(&mut rng)));
        }
        assert_eq!(pool.remaining(), 0);
        assert_eq!(pool.word(&mut rng), "ident1");
        assert_eq!(pool.word(&mut rng), "ident2");
    }

    #[test]
    fn reset_restores_the_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut pool = WordPool::new(Language::Java);
        let total = pool.remaining();
        pool.word(&mut rng);
        pool.word(&mut rng);
        pool.reset(Language::Java);
        assert_eq!(pool.remaining(), total);
    }

    #[test]
    fn same_seed_same_words() {
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut pool = WordPool::new(Language::Kotlin);
            (0..20).map(|_| pool.word(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(draw(7), draw(7));
        assert_ne!(draw(7), draw(8));
    }

    #[test]
    fn reserved_words_never_appear() {
        for lang in [Language::Kotlin, Language::Java] {
            let mut rng = StdRng::seed_from_u64(3);
            let mut pool = WordPool::new(lang);
            while pool.remaining() > 0 {
                let w = pool.word(&mut rng);
                assert!(!reserved_words(lang).contains(&w.as_str()), "{w}");
                assert!(w.chars().all(|c| c.is_ascii_lowercase()), "{w}");
            }
        }
    }

    #[test]
    fn caps_skips_blacklisted_letters() {
        let mut rng = StdRng::seed_from_u64(0);
        let blacklist: Vec<String> = ('A'..='Y').map(|c| c.to_string()).collect();
        assert_eq!(caps(&mut rng, &blacklist).as_deref(), Some("Z"));
        let full: Vec<String> = ('A'..='Z').map(|c| c.to_string()).collect();
        assert_eq!(caps(&mut rng, &full), None);
    }

    #[test]
    fn capitalize_uppercases_first_letter() {
        assert_eq!(capitalize("otter"), "Otter");
        assert_eq!(capitalize(""), "");
    }
}
