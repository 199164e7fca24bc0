//! Foundation types shared across the workspace.

pub mod span;

pub use span::{SourceFile, SourceMap, Span};
