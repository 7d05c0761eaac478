//! Pattern compilation support.
//!
//! - [`quotation`]: the quote/unquote/local-quote state machine
//! - [`term`]: the positional [`PatternTree`] built from a pattern expression

pub mod quotation;
pub mod term;

pub use quotation::Quotation;
pub use term::{PatternTerm, PatternTree, TermFlags, TermId};
