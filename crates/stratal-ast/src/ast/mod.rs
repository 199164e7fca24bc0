//! The Datalog AST consumed by the semantic checker.
//!
//! The parser produces a [`Program`] of named types, relations (each
//! carrying its clauses), orphan clauses, functor declarations, and I/O
//! directives. During checking the AST is read-only, with one exception:
//! the checker's suppression sweep may set [`Relation::suppressed`].

pub mod argument;
pub mod clause;
pub mod program;
pub mod walk;

pub use argument::{AggregateOp, Argument, ArgumentKind, IntrinsicOp, MAX_DOMAIN, MIN_DOMAIN};
pub use clause::{
    Atom, BinaryConstraint, Clause, ConstraintOp, ExecutionPlan, Literal, Negation, PlanOrder,
};
pub use program::{
    is_builtin_type, Attribute, Directive, DirectiveKind, Field, FunctorDecl, PrimitiveKind,
    Program, Relation, Representation, TypeDecl, TypeDeclKind, NUMBER_TYPE, SYMBOL_TYPE,
};
pub use walk::{
    subtree_size, walk_argument, walk_clause, walk_clause_atoms, walk_literal, walk_literal_atoms,
    walk_literals, ArgumentList,
};
