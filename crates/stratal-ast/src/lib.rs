//! # stratal-ast
//!
//! AST and source-location foundation for the stratal Datalog
//! front-end.
//!
//! This crate defines what the semantic checker consumes:
//!
//! - [`foundation`] — spans and the source map
//! - [`ast`] — programs, type declarations, relations, clauses, and
//!   argument expressions, plus the canonical depth-first walkers
//!
//! The AST is deliberately parser-agnostic: any front end that can
//! build a [`ast::Program`] can be checked. Argument occurrences are
//! addressed by their depth-first preorder index within a clause (see
//! [`ast::walk`]), which is the identity all analysis side maps key by.

pub mod ast;
pub mod foundation;

pub use ast::*;
pub use foundation::{SourceMap, Span};
