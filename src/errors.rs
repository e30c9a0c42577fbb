// src/errors.rs
//! Generation errors (E1xx).
//!
//! Depth exhaustion is never an error: the generator switches to leaf or
//! placeholder expressions instead. Everything here aborts the current
//! generation attempt and is caught at the request boundary.

#![allow(unused_assignments)] // False positives from thiserror derive

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("internal invariant violated: {detail}")]
    #[diagnostic(code(E100), help("this is a bug in the generator, not in its input"))]
    InvariantViolation { detail: String },

    #[error("no {what} available for type {ty}")]
    #[diagnostic(code(E101))]
    NoCandidate { what: &'static str, ty: String },

    #[error("cannot unify {expected} with {actual}")]
    #[diagnostic(code(E102))]
    Unification { expected: String, actual: String },

    #[error("cannot emit program: {detail}")]
    #[diagnostic(code(E103))]
    Translation { detail: String },
}

impl GenerateError {
    pub fn invariant(detail: impl Into<String>) -> Self {
        GenerateError::InvariantViolation {
            detail: detail.into(),
        }
    }

    pub fn no_candidate(what: &'static str, ty: impl std::fmt::Display) -> Self {
        GenerateError::NoCandidate {
            what,
            ty: ty.to_string(),
        }
    }
}

pub type Result<T, E = GenerateError> = std::result::Result<T, E>;
