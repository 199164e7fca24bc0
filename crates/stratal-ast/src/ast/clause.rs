//! Clauses, literals, atoms, and execution plans.

use super::argument::Argument;
use crate::foundation::Span;
use indexmap::IndexMap;
use std::fmt;

/// Application of a relation to an ordered list of arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub name: String,
    pub args: Vec<Argument>,
    pub span: Span,
}

impl Atom {
    pub fn new(name: impl Into<String>, args: Vec<Argument>, span: Span) -> Self {
        Self {
            name: name.into(),
            args,
            span,
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

/// Negated atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Negation {
    pub atom: Atom,
    pub span: Span,
}

/// Binary constraint between two arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryConstraint {
    pub op: ConstraintOp,
    pub lhs: Argument,
    pub rhs: Argument,
    pub span: Span,
}

/// Binary constraint operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Match,
    NotMatch,
    Contains,
    NotContains,
}

impl ConstraintOp {
    /// Ordered comparisons over numbers.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ConstraintOp::Lt | ConstraintOp::Le | ConstraintOp::Gt | ConstraintOp::Ge
        )
    }

    /// String matching and containment.
    pub fn is_symbolic(self) -> bool {
        matches!(
            self,
            ConstraintOp::Match
                | ConstraintOp::NotMatch
                | ConstraintOp::Contains
                | ConstraintOp::NotContains
        )
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintOp::Eq => "=",
            ConstraintOp::Ne => "!=",
            ConstraintOp::Lt => "<",
            ConstraintOp::Le => "<=",
            ConstraintOp::Gt => ">",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Match => "match",
            ConstraintOp::NotMatch => "not_match",
            ConstraintOp::Contains => "contains",
            ConstraintOp::NotContains => "not_contains",
        };
        write!(f, "{}", name)
    }
}

/// One element of a clause body.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Atom(Atom),
    Negation(Negation),
    Constraint(BinaryConstraint),
}

impl Literal {
    pub fn span(&self) -> Span {
        match self {
            Literal::Atom(atom) => atom.span,
            Literal::Negation(neg) => neg.span,
            Literal::Constraint(c) => c.span,
        }
    }

    /// The atom nested directly in this literal, if any.
    pub fn atom(&self) -> Option<&Atom> {
        match self {
            Literal::Atom(atom) => Some(atom),
            Literal::Negation(neg) => Some(&neg.atom),
            Literal::Constraint(_) => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Atom(atom) => write!(f, "{}", atom),
            Literal::Negation(neg) => write!(f, "!{}", neg.atom),
            Literal::Constraint(c) => write!(f, "{} {} {}", c.lhs, c.op, c.rhs),
        }
    }
}

/// A user-requested join order for one version of a recursive clause.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOrder {
    /// Body-atom indices in evaluation order.
    pub atoms: Vec<usize>,
    pub span: Span,
}

impl PlanOrder {
    /// The order names every body atom exactly once.
    pub fn is_complete(&self, num_atoms: usize) -> bool {
        if self.atoms.len() != num_atoms {
            return false;
        }
        let mut seen = vec![false; num_atoms];
        for &idx in &self.atoms {
            if idx >= num_atoms || seen[idx] {
                return false;
            }
            seen[idx] = true;
        }
        true
    }
}

/// Per-version join orders attached to a clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionPlan {
    pub orders: IndexMap<usize, PlanOrder>,
}

impl ExecutionPlan {
    pub fn max_version(&self) -> Option<usize> {
        self.orders.keys().copied().max()
    }
}

/// Head atom plus an ordered body. A clause with an empty body is a fact.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub head: Atom,
    pub body: Vec<Literal>,
    pub plan: Option<ExecutionPlan>,
    /// Produced by a rewrite rather than written by the user; generated
    /// clauses are exempt from style warnings.
    pub generated: bool,
    pub span: Span,
}

impl Clause {
    pub fn new(head: Atom, body: Vec<Literal>, span: Span) -> Self {
        Self {
            head,
            body,
            plan: None,
            generated: false,
            span,
        }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// Positive body atoms, in order.
    pub fn body_atoms(&self) -> impl Iterator<Item = &Atom> {
        self.body.iter().filter_map(|lit| match lit {
            Literal::Atom(atom) => Some(atom),
            _ => None,
        })
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.body.is_empty() {
            write!(f, " :- ")?;
            for (i, lit) in self.body.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", lit)?;
            }
        }
        write!(f, ".")
    }
}
