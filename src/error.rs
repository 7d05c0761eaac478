//! Rich diagnostic error types for hyperatom.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. The command interpreter and the config
//! loader keep their error enums next to their code; the atom and pattern-term
//! errors live here because several modules raise them.

use miette::Diagnostic;
use thiserror::Error;

use crate::command::CommandError;
use crate::config::ConfigError;

/// Top-level error type for hyperatom.
#[derive(Debug, Error, Diagnostic)]
pub enum HyperError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Atom(#[from] AtomError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Term(#[from] TermError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Atom errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AtomError {
    #[error("type mismatch: {type_name} is not a {expected} type")]
    #[diagnostic(
        code(hyperatom::atom::type_mismatch),
        help(
            "Links can only be built from link types and nodes from node types. \
             Check the type name, or register the type under the right parent."
        )
    )]
    TypeMismatch {
        type_name: String,
        expected: &'static str,
    },

    #[error("unknown atom type: {name}")]
    #[diagnostic(
        code(hyperatom::atom::unknown_type),
        help(
            "The type registry has no type with this name. Both full names \
             (ConceptNode) and short names (Concept) are accepted."
        )
    )]
    UnknownType { name: String },

    #[error("duplicate atom type: {name}")]
    #[diagnostic(
        code(hyperatom::atom::duplicate_type),
        help("A type with this name is already registered. Pick a different name.")
    )]
    DuplicateType { name: String },

    #[error("identity allocator exhausted")]
    #[diagnostic(
        code(hyperatom::atom::exhausted),
        help(
            "The 64-bit identity space is used up. This requires 2^64 \
             admissions and points to an allocation loop."
        )
    )]
    IdentityExhausted,
}

/// Result type for atom construction and admission.
pub type AtomResult<T> = std::result::Result<T, AtomError>;

// ---------------------------------------------------------------------------
// Pattern term errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TermError {
    #[error("{type_name} has arity {arity}, expected exactly one child")]
    #[diagnostic(
        code(hyperatom::term::arity),
        help(
            "QuoteLink, UnquoteLink and LocalQuoteLink wrap exactly one atom. \
             Split the wrapper or remove the extra children."
        )
    )]
    Arity { type_name: String, arity: usize },

    #[error("invalid outgoing index {position} for a term of arity {arity}")]
    #[diagnostic(
        code(hyperatom::term::index),
        help("Positions are zero-based and must be smaller than the term's arity.")
    )]
    Index { position: usize, arity: usize },
}

/// Result type for pattern term operations.
pub type TermResult<T> = std::result::Result<T, TermError>;

/// Convenience alias for functions returning hyperatom results.
pub type HyperResult<T> = std::result::Result<T, HyperError>;
