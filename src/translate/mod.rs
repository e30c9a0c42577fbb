// src/translate/mod.rs
//
// Source emitters. A translator walks a finished `Program` once and
// renders it as a compilable source file for its language.
//
// Submodules:
// - `kotlin` - file-level declarations, `fun interface` for SAM targets
// - `java` - everything nested in a `Main` class, `FunctionN` interfaces

mod java;
mod kotlin;

#[cfg(test)]
mod tests;

use crate::ast::Program;
use crate::builtins::Language;
use crate::errors::{GenerateError, Result};

pub use java::JavaTranslator;
pub use kotlin::KotlinTranslator;

/// A source emitter for one target language.
pub trait Translator {
    /// Render every top-level declaration of `program`.
    fn visit_program(&mut self, program: &Program) -> Result<()>;

    /// The emitted source text.
    fn result(self) -> String;
}

/// Render `program` in its own language. In `strict` mode placeholder
/// values are rejected instead of rendered as throwing defaults.
pub fn translate(program: &Program, strict: bool) -> Result<String> {
    match program.language {
        Language::Kotlin => run(KotlinTranslator::new(strict), program),
        Language::Java => run(JavaTranslator::new(strict), program),
    }
}

fn run<T: Translator>(mut translator: T, program: &Program) -> Result<String> {
    translator.visit_program(program)?;
    Ok(translator.result())
}

/// Indentation width in spaces.
const INDENT: usize = 4;

/// Line-oriented output with an indentation level.
///
/// Expressions are rendered to strings; when one spans several lines
/// (a lambda or a block) its inner lines are rendered one level deeper
/// into a detached buffer, see `open` and `close`.
#[derive(Debug, Default)]
pub(crate) struct Writer {
    out: String,
    indent: usize,
}

impl Writer {
    /// Leading whitespace for the current level.
    pub fn pad(&self) -> String {
        " ".repeat(self.indent * INDENT)
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let pad = self.pad();
        self.out.push_str(&pad);
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Start a detached buffer one level deeper. Returns the buffer being
    /// suspended, to be handed back to `close`.
    pub fn open(&mut self) -> String {
        self.indent += 1;
        std::mem::take(&mut self.out)
    }

    /// Finish a detached buffer, restoring `saved`, and return what was
    /// written into it.
    pub fn close(&mut self, saved: String) -> String {
        self.dedent();
        std::mem::replace(&mut self.out, saved)
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// The error for a placeholder met in strict mode.
pub(crate) fn unresolved_error(ty: impl std::fmt::Display) -> GenerateError {
    GenerateError::Translation {
        detail: format!("unresolved value of type {ty}"),
    }
}

/// Comma-joined list.
pub(crate) fn join(items: impl IntoIterator<Item = String>) -> String {
    items.into_iter().collect::<Vec<_>>().join(", ")
}
