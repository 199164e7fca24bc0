//! Program-level declarations: types, relations, functors, directives.

use super::clause::Clause;
use crate::foundation::Span;
use indexmap::IndexMap;
use std::fmt;

/// The built-in base kinds a declared type can be rooted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Number,
    Symbol,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveKind::Number => write!(f, "number"),
            PrimitiveKind::Symbol => write!(f, "symbol"),
        }
    }
}

/// Name of the built-in number type.
pub const NUMBER_TYPE: &str = "number";
/// Name of the built-in symbol type.
pub const SYMBOL_TYPE: &str = "symbol";

/// `true` for the two built-in type names that need no declaration.
pub fn is_builtin_type(name: &str) -> bool {
    name == NUMBER_TYPE || name == SYMBOL_TYPE
}

/// A named field of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub type_name: String,
    pub span: Span,
}

/// Body of a type declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDeclKind {
    /// Subtype of a built-in primitive (`.number_type T` / `.symbol_type T`).
    Primitive(PrimitiveKind),
    /// Union over type names.
    Union(Vec<String>),
    /// Record with ordered named fields.
    Record(Vec<Field>),
}

/// A named type declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeDeclKind,
    pub span: Span,
}

/// A typed attribute of a relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub type_name: String,
    pub span: Span,
}

/// Storage representation of a relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Representation {
    #[default]
    Default,
    /// Equivalence relation; must be binary with identical domains.
    EqRel,
}

/// A declared relation with its attributes and rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub clauses: Vec<Clause>,
    pub representation: Representation,
    /// Uses of this relation should be substituted by its rules.
    pub is_inline: bool,
    /// Declared as an input relation.
    pub is_input: bool,
    /// Declared as an output relation.
    pub is_output: bool,
    /// Declared with a print-size qualifier.
    pub is_printsize: bool,
    /// Warnings about this relation are muted. Set by the checker's
    /// suppression sweep; the only AST field the checker writes.
    pub suppressed: bool,
    pub span: Span,
}

impl Relation {
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>, span: Span) -> Self {
        Self {
            name: name.into(),
            attributes,
            clauses: Vec::new(),
            representation: Representation::Default,
            is_inline: false,
            is_input: false,
            is_output: false,
            is_printsize: false,
            suppressed: false,
            span,
        }
    }

    pub fn arity(&self) -> usize {
        self.attributes.len()
    }
}

/// Declaration of a user-defined functor.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctorDecl {
    pub name: String,
    pub params: Vec<PrimitiveKind>,
    pub output: PrimitiveKind,
    pub span: Span,
}

impl FunctorDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn accepts_symbol(&self, i: usize) -> bool {
        self.params.get(i) == Some(&PrimitiveKind::Symbol)
    }

    pub fn accepts_number(&self, i: usize) -> bool {
        self.params.get(i) == Some(&PrimitiveKind::Number)
    }

    pub fn is_symbolic(&self) -> bool {
        self.output == PrimitiveKind::Symbol
    }

    pub fn is_numeric(&self) -> bool {
        self.output == PrimitiveKind::Number
    }
}

/// Kind of an I/O directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Load,
    Store,
    PrintSize,
}

/// An I/O directive naming a relation, with source-level key/value
/// properties (e.g. `IO=sqlite`).
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub relation: String,
    pub properties: IndexMap<String, String>,
    pub span: Span,
}

impl Directive {
    pub fn new(kind: DirectiveKind, relation: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            relation: relation.into(),
            properties: IndexMap::new(),
            span,
        }
    }
}

/// A fully parsed program: the input of the semantic checker.
///
/// Registries are keyed by name and preserve declaration order, which is
/// the order the checker visits them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub types: IndexMap<String, TypeDecl>,
    pub relations: IndexMap<String, Relation>,
    /// Clauses whose head relation was never declared.
    pub orphan_clauses: Vec<Clause>,
    pub functors: IndexMap<String, FunctorDecl>,
    pub directives: Vec<Directive>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    pub fn functor(&self, name: &str) -> Option<&FunctorDecl> {
        self.functors.get(name)
    }

    /// Register a type declaration.
    pub fn add_type(&mut self, decl: TypeDecl) {
        self.types.insert(decl.name.clone(), decl);
    }

    /// Register a relation.
    pub fn add_relation(&mut self, rel: Relation) {
        self.relations.insert(rel.name.clone(), rel);
    }

    /// Attach a clause to its head relation, or to the orphan list when
    /// the relation is not declared.
    pub fn add_clause(&mut self, clause: Clause) {
        match self.relations.get_mut(&clause.head.name) {
            Some(rel) => rel.clauses.push(clause),
            None => self.orphan_clauses.push(clause),
        }
    }

    /// Register a functor declaration.
    pub fn add_functor(&mut self, decl: FunctorDecl) {
        self.functors.insert(decl.name.clone(), decl);
    }

    /// All clauses of all relations plus orphans, in declaration order.
    pub fn clauses(&self) -> impl Iterator<Item = &Clause> {
        self.relations
            .values()
            .flat_map(|rel| rel.clauses.iter())
            .chain(self.orphan_clauses.iter())
    }
}
