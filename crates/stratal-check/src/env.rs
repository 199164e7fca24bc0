//! Type environment: declared type names resolved to kinds.
//!
//! The environment is built once per program from the type
//! declarations. It answers three questions for the lattice and the
//! constraint builder:
//!
//! 1. What base kind (number, symbol, record) does a type name bottom
//!    out in?
//! 2. Which unions is a type a member of, transitively? (This is the
//!    subtype DAG the lattice's named-type ordering follows.)
//! 3. Is the environment consistent at all? Undefined or cyclic union
//!    members, kind-mixing unions, and undefined record field types
//!    make the whole environment inconsistent, and the typing engine is
//!    skipped with a single diagnostic.

use crate::lattice::Kind;
use indexmap::{IndexMap, IndexSet};
use stratal_ast::{is_builtin_type, PrimitiveKind, Program, TypeDeclKind};

/// One resolved type.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub kind: Kind,
    /// Unions this type belongs to, transitively.
    pub ancestors: IndexSet<String>,
}

/// All declared types resolved to kinds, plus the union DAG closure.
#[derive(Debug, Clone)]
pub struct TypeEnvironment {
    entries: IndexMap<String, TypeEntry>,
    valid: bool,
}

impl TypeEnvironment {
    /// Resolve all type declarations of a program.
    pub fn build(program: &Program) -> Self {
        let mut resolver = Resolver {
            program,
            kinds: IndexMap::new(),
            in_progress: IndexSet::new(),
            valid: true,
        };

        for name in program.types.keys() {
            resolver.resolve(name);
        }

        // Record fields must name defined types; a dangling field type
        // would leave the constraint builder without a field type to
        // emit, so it poisons the environment.
        for decl in program.types.values() {
            if let TypeDeclKind::Record(fields) = &decl.kind {
                for field in fields {
                    if !is_builtin_type(&field.type_name)
                        && program.type_decl(&field.type_name).is_none()
                    {
                        resolver.valid = false;
                    }
                }
            }
        }

        let kinds = resolver.kinds;
        let valid = resolver.valid;

        // Union membership closure: direct member edges, then
        // saturation. The member graph is acyclic whenever the
        // environment is valid, so the loop is bounded.
        let mut ancestors: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for name in program.types.keys() {
            ancestors.insert(name.clone(), IndexSet::new());
        }
        if valid {
            for (union_name, decl) in &program.types {
                if let TypeDeclKind::Union(members) = &decl.kind {
                    for member in members {
                        if let Some(set) = ancestors.get_mut(member) {
                            set.insert(union_name.clone());
                        }
                    }
                }
            }
            let mut changed = true;
            while changed {
                changed = false;
                let names: Vec<String> = ancestors.keys().cloned().collect();
                for name in names {
                    let direct: Vec<String> = ancestors[&name].iter().cloned().collect();
                    for parent in direct {
                        let grand: Vec<String> = ancestors
                            .get(&parent)
                            .map(|s| s.iter().cloned().collect())
                            .unwrap_or_default();
                        let set = ancestors.get_mut(&name).expect("seeded above");
                        for g in grand {
                            if set.insert(g) {
                                changed = true;
                            }
                        }
                    }
                }
            }
        }

        let mut entries = IndexMap::new();
        for (name, kind) in kinds {
            if let Some(kind) = kind {
                let ancestors = ancestors.shift_remove(&name).unwrap_or_default();
                entries.insert(name, TypeEntry { kind, ancestors });
            }
        }

        Self { entries, valid }
    }

    /// The environment resolved without contradictions.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Kind of a type name, builtins included.
    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        match name {
            stratal_ast::NUMBER_TYPE => Some(Kind::Number),
            stratal_ast::SYMBOL_TYPE => Some(Kind::Symbol),
            _ => self.entries.get(name).map(|e| e.kind),
        }
    }

    /// The name is a builtin or resolved declared type.
    pub fn is_defined(&self, name: &str) -> bool {
        is_builtin_type(name) || self.entries.contains_key(name)
    }

    /// The name resolves to a record type.
    pub fn is_record(&self, name: &str) -> bool {
        self.kind_of(name) == Some(Kind::Record)
    }

    /// `sub` is `sup` or a transitive union member of `sup`.
    pub fn is_subtype_name(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        self.entries
            .get(sub)
            .map(|e| e.ancestors.contains(sup))
            .unwrap_or(false)
    }
}

/// Kind resolution with cycle detection over union membership.
struct Resolver<'a> {
    program: &'a Program,
    /// `None` marks a name whose kind could not be determined.
    kinds: IndexMap<String, Option<Kind>>,
    in_progress: IndexSet<String>,
    valid: bool,
}

impl Resolver<'_> {
    fn resolve(&mut self, name: &str) -> Option<Kind> {
        if name == stratal_ast::NUMBER_TYPE {
            return Some(Kind::Number);
        }
        if name == stratal_ast::SYMBOL_TYPE {
            return Some(Kind::Symbol);
        }
        if let Some(kind) = self.kinds.get(name) {
            return *kind;
        }
        if self.in_progress.contains(name) {
            // Cyclic union membership.
            self.valid = false;
            return None;
        }

        let Some(decl) = self.program.type_decl(name) else {
            self.valid = false;
            return None;
        };

        self.in_progress.insert(name.to_string());
        let kind = match &decl.kind {
            TypeDeclKind::Primitive(PrimitiveKind::Number) => Some(Kind::Number),
            TypeDeclKind::Primitive(PrimitiveKind::Symbol) => Some(Kind::Symbol),
            TypeDeclKind::Record(_) => Some(Kind::Record),
            TypeDeclKind::Union(members) => {
                let mut seen_number = false;
                let mut seen_symbol = false;
                for member in members {
                    match self.resolve(member) {
                        Some(Kind::Number) => seen_number = true,
                        Some(Kind::Symbol) => seen_symbol = true,
                        Some(Kind::Record) => {
                            // Unions range over primitives only.
                            self.valid = false;
                        }
                        None => {}
                    }
                }
                match (seen_number, seen_symbol) {
                    (true, false) => Some(Kind::Number),
                    (false, true) => Some(Kind::Symbol),
                    (true, true) => {
                        self.valid = false;
                        None
                    }
                    (false, false) => {
                        self.valid = false;
                        None
                    }
                }
            }
        };
        self.in_progress.shift_remove(name);
        self.kinds.insert(name.to_string(), kind);
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratal_ast::{Field, Span, TypeDecl};

    fn sp() -> Span {
        Span::zero(0)
    }

    fn union(name: &str, members: &[&str]) -> TypeDecl {
        TypeDecl {
            name: name.into(),
            kind: TypeDeclKind::Union(members.iter().map(|s| s.to_string()).collect()),
            span: sp(),
        }
    }

    fn primitive(name: &str, kind: PrimitiveKind) -> TypeDecl {
        TypeDecl {
            name: name.into(),
            kind: TypeDeclKind::Primitive(kind),
            span: sp(),
        }
    }

    #[test]
    fn primitive_subtypes_resolve() {
        let mut program = Program::new();
        program.add_type(primitive("Age", PrimitiveKind::Number));
        program.add_type(primitive("Name", PrimitiveKind::Symbol));

        let env = TypeEnvironment::build(&program);
        assert!(env.is_valid());
        assert_eq!(env.kind_of("Age"), Some(Kind::Number));
        assert_eq!(env.kind_of("Name"), Some(Kind::Symbol));
        assert_eq!(env.kind_of("number"), Some(Kind::Number));
    }

    #[test]
    fn union_ancestors_are_transitive() {
        let mut program = Program::new();
        program.add_type(primitive("A", PrimitiveKind::Number));
        program.add_type(union("AB", &["A", "number"]));
        program.add_type(union("ABC", &["AB"]));

        let env = TypeEnvironment::build(&program);
        assert!(env.is_valid());
        assert!(env.is_subtype_name("A", "AB"));
        assert!(env.is_subtype_name("A", "ABC"));
        assert!(env.is_subtype_name("AB", "ABC"));
        assert!(!env.is_subtype_name("ABC", "A"));
    }

    #[test]
    fn mixed_union_poisons_environment() {
        let mut program = Program::new();
        program.add_type(union("T", &["number", "symbol"]));

        let env = TypeEnvironment::build(&program);
        assert!(!env.is_valid());
    }

    #[test]
    fn cyclic_union_poisons_environment() {
        let mut program = Program::new();
        program.add_type(union("A", &["B"]));
        program.add_type(union("B", &["A"]));

        let env = TypeEnvironment::build(&program);
        assert!(!env.is_valid());
    }

    #[test]
    fn undefined_union_member_poisons_environment() {
        let mut program = Program::new();
        program.add_type(union("T", &["Ghost"]));

        let env = TypeEnvironment::build(&program);
        assert!(!env.is_valid());
    }

    #[test]
    fn record_with_defined_fields_is_fine() {
        let mut program = Program::new();
        program.add_type(TypeDecl {
            name: "Pair".into(),
            kind: TypeDeclKind::Record(vec![
                Field {
                    name: "fst".into(),
                    type_name: "number".into(),
                    span: sp(),
                },
                Field {
                    name: "snd".into(),
                    type_name: "Pair".into(),
                    span: sp(),
                },
            ]),
            span: sp(),
        });

        let env = TypeEnvironment::build(&program);
        assert!(env.is_valid());
        assert!(env.is_record("Pair"));
    }
}
