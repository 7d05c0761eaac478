// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # hyperatom
//!
//! Structural core of a hypergraph knowledge store: immutable,
//! content-addressed atoms, a positional pattern-term tree for query
//! compilation, and a small wire-level command interpreter.
//!
//! ## Architecture
//!
//! - **Types** (`types`): type tags, the `TypeOracle` seam and a builtin registry
//! - **Atoms** (`atom`): nodes and links with canonical form, hashing and ordering
//! - **Atom space** (`space`): the identity table, with frames layered over bases
//! - **Patterns** (`pattern`): quotation tracking and the pattern-term arena
//! - **Commands** (`command`): s-expression codec and the command interpreter
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use hyperatom::command::Interpreter;
//! use hyperatom::space::AtomSpace;
//! use hyperatom::types::TypeRegistry;
//!
//! let space = Arc::new(AtomSpace::new("kb", Arc::new(TypeRegistry::new())).unwrap());
//! let mut interp = Interpreter::new();
//! interp
//!     .interpret(&space, r#"(cog-set-value! (Concept "foo") (Predicate "k") (FloatValue 1 2 3))"#)
//!     .unwrap();
//! let reply = interp
//!     .interpret(&space, r#"(cog-value (Concept "foo") (Predicate "k"))"#)
//!     .unwrap();
//! assert_eq!(reply, "(FloatValue 1 2 3)");
//! ```

pub mod atom;
pub mod command;
pub mod config;
pub mod error;
pub mod ident;
pub mod pattern;
pub mod space;
pub mod types;
