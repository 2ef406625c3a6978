//! Error kinds and accumulated diagnostics.
//!
//! Parsing-stage failures ([`Error`]) are fatal for one analysis request.
//! Everything else is a [`Diagnostic`]: collected, logged, and reported next to
//! whatever partial result is still valid.

use serde::Serialize;
use thiserror::Error;

/// Fatal errors for one analysis request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The document is not well-formed, or violates the feature-model shape.
    #[error("malformed input: {details}")]
    MalformedInput { details: String },

    /// The document has no top-level `feature` element.
    #[error("document has no root feature")]
    MissingRootFeature,

    /// A rule string could not be parsed.
    #[error(transparent)]
    Rule(#[from] RuleError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure to parse or evaluate one rule string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("unexpected token {found:?} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        offset: usize,
        expected: &'static str,
    },

    #[error("unexpected end of rule, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unknown atom {0:?}")]
    UnknownAtom(String),
}

/// A non-fatal problem found while analyzing a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// A constraint entry matched no recognized pattern and was dropped.
    UnparsableConstraint { entry: String, reason: String },

    /// A rule failed to evaluate; candidates depending on it were rejected.
    RuleEvaluation { rule: String, reason: String },

    /// A declared group could not be matched to a structural tree node.
    GroupInconsistency { group: String, reason: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnparsableConstraint { entry, reason } => {
                write!(f, "unparsable constraint {:?}: {}", entry, reason)
            }
            Diagnostic::RuleEvaluation { rule, reason } => {
                write!(f, "rule {:?} failed to evaluate: {}", rule, reason)
            }
            Diagnostic::GroupInconsistency { group, reason } => {
                write!(f, "inconsistent group {:?}: {}", group, reason)
            }
        }
    }
}
