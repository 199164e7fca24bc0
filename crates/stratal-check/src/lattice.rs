//! The analysis-type lattice.
//!
//! Typing works over a bounded lattice of analysis types, distinct from
//! the user-declared type names:
//!
//! ```text
//!                    Top
//!            /        |        \
//!   number        symbol        record        <- primitive tops
//!      |             |             |
//!   named number  named symbol  named record  <- union DAG per kind
//!      |          types ...       types
//!   number const  symbol const  record const
//!      |             |             |
//!   bottom(number) ...          bottom(record)
//!            \        |        /
//!                  Bottom
//! ```
//!
//! The three kinds are pairwise incomparable; a constant inhabits every
//! named type of its kind; named types order along union membership.
//! `meet`/`join` approximate incomparable same-kind pairs to the kind's
//! bottom/top, which is where the "disjoint" diagnostics come from.

use crate::env::TypeEnvironment;
use stratal_ast::{NUMBER_TYPE, SYMBOL_TYPE};
use std::fmt;

/// Base kind of an analysis type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Number,
    Symbol,
    Record,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Number => write!(f, "number"),
            Kind::Symbol => write!(f, "symbol"),
            Kind::Record => write!(f, "record"),
        }
    }
}

/// An element of the typing lattice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnalysisType {
    /// No information yet; everything is below it.
    Top,
    /// Contradiction across kinds.
    Bottom,
    /// All values of one kind.
    TopPrimitive(Kind),
    /// Contradiction within one kind.
    BottomPrimitive(Kind),
    /// A literal constant of one kind.
    Constant(Kind),
    /// A user-declared type mapped into the lattice.
    Inner { kind: Kind, name: String },
}

impl AnalysisType {
    /// A type an argument can actually have. `Top`, `Bottom`, and the
    /// per-kind bottoms mark unconstrained or contradictory inferences.
    pub fn is_valid(&self) -> bool {
        matches!(
            self,
            AnalysisType::TopPrimitive(_) | AnalysisType::Constant(_) | AnalysisType::Inner { .. }
        )
    }

    /// Kind of this element, `None` for `Top` and `Bottom`.
    pub fn kind(&self) -> Option<Kind> {
        match self {
            AnalysisType::Top | AnalysisType::Bottom => None,
            AnalysisType::TopPrimitive(k)
            | AnalysisType::BottomPrimitive(k)
            | AnalysisType::Constant(k)
            | AnalysisType::Inner { kind: k, .. } => Some(*k),
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisType::Top => write!(f, "top"),
            AnalysisType::Bottom => write!(f, "bottom"),
            AnalysisType::TopPrimitive(k) => write!(f, "{}", k),
            AnalysisType::BottomPrimitive(k) => write!(f, "bottom {}", k),
            AnalysisType::Constant(k) => write!(f, "{} constant", k),
            AnalysisType::Inner { name, .. } => write!(f, "{}", name),
        }
    }
}

/// Subtype order, meet, and join over [`AnalysisType`], parameterized by
/// the union DAG of a [`TypeEnvironment`].
#[derive(Debug)]
pub struct TypeLattice<'e> {
    env: &'e TypeEnvironment,
}

impl<'e> TypeLattice<'e> {
    pub fn new(env: &'e TypeEnvironment) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &TypeEnvironment {
        self.env
    }

    /// Whole-lattice validity: false when the type environment is
    /// inconsistent. All typing is skipped in that case.
    pub fn is_valid(&self) -> bool {
        self.env.is_valid()
    }

    /// Map a program type name to its canonical lattice element. The
    /// builtins map to their primitive tops, declared names to `Inner`.
    /// `None` for undefined names.
    pub fn analysis_type_of(&self, type_name: &str) -> Option<AnalysisType> {
        match type_name {
            NUMBER_TYPE => Some(AnalysisType::TopPrimitive(Kind::Number)),
            SYMBOL_TYPE => Some(AnalysisType::TopPrimitive(Kind::Symbol)),
            _ => {
                let kind = self.env.kind_of(type_name)?;
                Some(AnalysisType::Inner {
                    kind,
                    name: type_name.to_string(),
                })
            }
        }
    }

    /// `a ≤ b` in the lattice order.
    pub fn is_subtype(&self, a: &AnalysisType, b: &AnalysisType) -> bool {
        use AnalysisType::*;
        match (a, b) {
            (Bottom, _) | (_, Top) => true,
            (_, Bottom) | (Top, _) => false,
            (BottomPrimitive(ka), _) => b.kind() == Some(*ka),
            (_, BottomPrimitive(_)) => false,
            (Constant(ka), Constant(kb)) => ka == kb,
            (Constant(ka), Inner { kind, .. }) => ka == kind,
            (Constant(ka), TopPrimitive(kb)) => ka == kb,
            (Inner { .. }, Constant(_)) => false,
            (
                Inner {
                    kind: ka, name: na, ..
                },
                Inner {
                    kind: kb, name: nb, ..
                },
            ) => ka == kb && self.env.is_subtype_name(na, nb),
            (Inner { kind, .. }, TopPrimitive(kb)) => kind == kb,
            (TopPrimitive(ka), TopPrimitive(kb)) => ka == kb,
            (TopPrimitive(_), _) => false,
        }
    }

    /// Greatest lower bound, approximated: incomparable elements of the
    /// same kind meet at the kind's bottom; across kinds, at `Bottom`.
    pub fn meet(&self, a: &AnalysisType, b: &AnalysisType) -> AnalysisType {
        if self.is_subtype(a, b) {
            return a.clone();
        }
        if self.is_subtype(b, a) {
            return b.clone();
        }
        match (a.kind(), b.kind()) {
            (Some(ka), Some(kb)) if ka == kb => AnalysisType::BottomPrimitive(ka),
            _ => AnalysisType::Bottom,
        }
    }

    /// Least upper bound, approximated dually to [`Self::meet`].
    pub fn join(&self, a: &AnalysisType, b: &AnalysisType) -> AnalysisType {
        if self.is_subtype(a, b) {
            return b.clone();
        }
        if self.is_subtype(b, a) {
            return a.clone();
        }
        match (a.kind(), b.kind()) {
            (Some(ka), Some(kb)) if ka == kb => AnalysisType::TopPrimitive(ka),
            _ => AnalysisType::Top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratal_ast::{PrimitiveKind, Program, Span, TypeDecl, TypeDeclKind};

    fn env_with_unions() -> TypeEnvironment {
        let mut program = Program::new();
        program.add_type(TypeDecl {
            name: "A".into(),
            kind: TypeDeclKind::Primitive(PrimitiveKind::Number),
            span: Span::zero(0),
        });
        program.add_type(TypeDecl {
            name: "B".into(),
            kind: TypeDeclKind::Primitive(PrimitiveKind::Number),
            span: Span::zero(0),
        });
        program.add_type(TypeDecl {
            name: "AB".into(),
            kind: TypeDeclKind::Union(vec!["A".into(), "B".into()]),
            span: Span::zero(0),
        });
        TypeEnvironment::build(&program)
    }

    fn inner(name: &str) -> AnalysisType {
        AnalysisType::Inner {
            kind: Kind::Number,
            name: name.into(),
        }
    }

    #[test]
    fn bounds() {
        let env = env_with_unions();
        let lattice = TypeLattice::new(&env);
        let a = inner("A");
        assert!(lattice.is_subtype(&AnalysisType::Bottom, &a));
        assert!(lattice.is_subtype(&a, &AnalysisType::Top));
        assert!(!lattice.is_subtype(&AnalysisType::Top, &a));
    }

    #[test]
    fn primitive_tops_are_incomparable() {
        let env = env_with_unions();
        let lattice = TypeLattice::new(&env);
        let num = AnalysisType::TopPrimitive(Kind::Number);
        let sym = AnalysisType::TopPrimitive(Kind::Symbol);
        assert!(!lattice.is_subtype(&num, &sym));
        assert!(!lattice.is_subtype(&sym, &num));
        assert_eq!(lattice.meet(&num, &sym), AnalysisType::Bottom);
        assert_eq!(lattice.join(&num, &sym), AnalysisType::Top);
    }

    #[test]
    fn constants_inhabit_named_types() {
        let env = env_with_unions();
        let lattice = TypeLattice::new(&env);
        let c = AnalysisType::Constant(Kind::Number);
        assert!(lattice.is_subtype(&c, &inner("A")));
        assert!(lattice.is_subtype(&c, &AnalysisType::TopPrimitive(Kind::Number)));
        assert!(!lattice.is_subtype(&inner("A"), &c));
        assert!(!lattice.is_subtype(&c, &AnalysisType::TopPrimitive(Kind::Symbol)));
    }

    #[test]
    fn named_types_follow_union_dag() {
        let env = env_with_unions();
        let lattice = TypeLattice::new(&env);
        assert!(lattice.is_subtype(&inner("A"), &inner("AB")));
        assert!(!lattice.is_subtype(&inner("AB"), &inner("A")));
        assert!(lattice.is_subtype(&inner("A"), &AnalysisType::TopPrimitive(Kind::Number)));
    }

    #[test]
    fn incomparable_siblings_meet_at_kind_bottom() {
        let env = env_with_unions();
        let lattice = TypeLattice::new(&env);
        assert_eq!(
            lattice.meet(&inner("A"), &inner("B")),
            AnalysisType::BottomPrimitive(Kind::Number)
        );
        assert_eq!(
            lattice.join(&inner("A"), &inner("B")),
            AnalysisType::TopPrimitive(Kind::Number)
        );
    }

    #[test]
    fn meet_of_comparable_is_the_smaller() {
        let env = env_with_unions();
        let lattice = TypeLattice::new(&env);
        let c = AnalysisType::Constant(Kind::Number);
        assert_eq!(lattice.meet(&c, &inner("A")), c);
        assert_eq!(lattice.meet(&inner("A"), &inner("AB")), inner("A"));
    }

    #[test]
    fn validity_classification() {
        assert!(AnalysisType::TopPrimitive(Kind::Number).is_valid());
        assert!(AnalysisType::Constant(Kind::Symbol).is_valid());
        assert!(inner("A").is_valid());
        assert!(!AnalysisType::Top.is_valid());
        assert!(!AnalysisType::Bottom.is_valid());
        assert!(!AnalysisType::BottomPrimitive(Kind::Record).is_valid());
    }

    #[test]
    fn analysis_type_of_builtins_and_named() {
        let env = env_with_unions();
        let lattice = TypeLattice::new(&env);
        assert_eq!(
            lattice.analysis_type_of("number"),
            Some(AnalysisType::TopPrimitive(Kind::Number))
        );
        assert_eq!(lattice.analysis_type_of("A"), Some(inner("A")));
        assert_eq!(lattice.analysis_type_of("Ghost"), None);
    }
}
