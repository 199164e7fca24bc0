//! Depth-first traversal of clauses and arguments.
//!
//! The checker never mutates the AST; instead every analysis keys its
//! side maps by the **depth-first preorder index** of an argument
//! occurrence within its clause (head first, then body literals left to
//! right). The walkers here define that canonical order, and
//! [`ArgumentList`] materializes it so analyses can address occurrences
//! by index.

use super::argument::{Argument, ArgumentKind};
use super::clause::{Atom, Clause, Literal};

/// Visit `arg` and all nested arguments in preorder.
pub fn walk_argument<'a, F>(arg: &'a Argument, f: &mut F)
where
    F: FnMut(&'a Argument),
{
    f(arg);
    match &arg.kind {
        ArgumentKind::Variable(_)
        | ArgumentKind::Unnamed
        | ArgumentKind::Number(_)
        | ArgumentKind::Text(_)
        | ArgumentKind::Nil
        | ArgumentKind::Counter => {}
        ArgumentKind::TypeCast { value, .. } => walk_argument(value, f),
        ArgumentKind::Intrinsic { args, .. }
        | ArgumentKind::UserFunctor { args, .. }
        | ArgumentKind::RecordInit { args, .. } => {
            for child in args {
                walk_argument(child, f);
            }
        }
        ArgumentKind::Aggregator { target, body, .. } => {
            if let Some(target) = target {
                walk_argument(target, f);
            }
            walk_literals(body, f);
        }
    }
}

/// Visit all arguments of a literal in preorder.
pub fn walk_literal<'a, F>(lit: &'a Literal, f: &mut F)
where
    F: FnMut(&'a Argument),
{
    match lit {
        Literal::Atom(atom) => {
            for arg in &atom.args {
                walk_argument(arg, f);
            }
        }
        Literal::Negation(neg) => {
            for arg in &neg.atom.args {
                walk_argument(arg, f);
            }
        }
        Literal::Constraint(c) => {
            walk_argument(&c.lhs, f);
            walk_argument(&c.rhs, f);
        }
    }
}

/// Visit all arguments of a literal list, left to right.
pub fn walk_literals<'a, F>(lits: &'a [Literal], f: &mut F)
where
    F: FnMut(&'a Argument),
{
    for lit in lits {
        walk_literal(lit, f);
    }
}

/// Visit all arguments of a clause: head arguments first, then body.
pub fn walk_clause<'a, F>(clause: &'a Clause, f: &mut F)
where
    F: FnMut(&'a Argument),
{
    for arg in &clause.head.args {
        walk_argument(arg, f);
    }
    walk_literals(&clause.body, f);
}

/// Visit every atom in a clause: the head, body atoms, negated atoms,
/// and atoms nested in aggregator bodies.
pub fn walk_clause_atoms<'a, F>(clause: &'a Clause, f: &mut F)
where
    F: FnMut(&'a Atom),
{
    f(&clause.head);
    for arg in &clause.head.args {
        walk_argument_atoms(arg, f);
    }
    for lit in &clause.body {
        walk_literal_atoms(lit, f);
    }
}

/// Visit every atom in a literal, including aggregator-internal ones.
pub fn walk_literal_atoms<'a, F>(lit: &'a Literal, f: &mut F)
where
    F: FnMut(&'a Atom),
{
    match lit {
        Literal::Atom(atom) => {
            f(atom);
            for arg in &atom.args {
                walk_argument_atoms(arg, f);
            }
        }
        Literal::Negation(neg) => {
            f(&neg.atom);
            for arg in &neg.atom.args {
                walk_argument_atoms(arg, f);
            }
        }
        Literal::Constraint(c) => {
            walk_argument_atoms(&c.lhs, f);
            walk_argument_atoms(&c.rhs, f);
        }
    }
}

fn walk_argument_atoms<'a, F>(arg: &'a Argument, f: &mut F)
where
    F: FnMut(&'a Atom),
{
    match &arg.kind {
        ArgumentKind::TypeCast { value, .. } => walk_argument_atoms(value, f),
        ArgumentKind::Intrinsic { args, .. }
        | ArgumentKind::UserFunctor { args, .. }
        | ArgumentKind::RecordInit { args, .. } => {
            for child in args {
                walk_argument_atoms(child, f);
            }
        }
        ArgumentKind::Aggregator { target, body, .. } => {
            if let Some(target) = target {
                walk_argument_atoms(target, f);
            }
            for lit in body {
                walk_literal_atoms(lit, f);
            }
        }
        _ => {}
    }
}

/// Number of argument occurrences in `arg`'s subtree, itself included.
///
/// Preorder means a node's children occupy the index range
/// `idx + 1 .. idx + subtree_size(arg)`; analyses use this to find
/// child occurrence indices without a second traversal.
pub fn subtree_size(arg: &Argument) -> usize {
    let mut count = 0;
    walk_argument(arg, &mut |_| count += 1);
    count
}

/// The flattened preorder enumeration of a clause's (or literal list's)
/// argument occurrences. Index into this list is the identity every
/// analysis side map is keyed by.
#[derive(Debug)]
pub struct ArgumentList<'a> {
    items: Vec<&'a Argument>,
}

impl<'a> ArgumentList<'a> {
    pub fn of_clause(clause: &'a Clause) -> Self {
        let mut items = Vec::new();
        walk_clause(clause, &mut |arg| items.push(arg));
        Self { items }
    }

    pub fn of_literals(lits: &'a [Literal]) -> Self {
        let mut items = Vec::new();
        walk_literals(lits, &mut |arg| items.push(arg));
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, idx: usize) -> &'a Argument {
        self.items[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a Argument)> + '_ {
        self.items.iter().copied().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::argument::{AggregateOp, Argument, ArgumentKind, IntrinsicOp};
    use crate::ast::clause::{Atom, BinaryConstraint, Clause, ConstraintOp, Literal};
    use crate::foundation::Span;

    fn sp() -> Span {
        Span::zero(0)
    }

    fn var(name: &str) -> Argument {
        Argument::var(name, sp())
    }

    #[test]
    fn preorder_visits_head_then_body() {
        // a(x) :- b(y, x + 1).
        let clause = Clause::new(
            Atom::new("a", vec![var("x")], sp()),
            vec![Literal::Atom(Atom::new(
                "b",
                vec![
                    var("y"),
                    Argument::new(
                        ArgumentKind::Intrinsic {
                            op: IntrinsicOp::Add,
                            args: vec![var("x"), Argument::number(1, sp())],
                        },
                        sp(),
                    ),
                ],
                sp(),
            ))],
            sp(),
        );

        let list = ArgumentList::of_clause(&clause);
        let kinds: Vec<String> = list
            .iter()
            .map(|(_, arg)| match &arg.kind {
                ArgumentKind::Variable(name) => name.clone(),
                ArgumentKind::Number(n) => n.to_string(),
                ArgumentKind::Intrinsic { op, .. } => op.to_string(),
                _ => "?".to_string(),
            })
            .collect();
        assert_eq!(kinds, vec!["x", "y", "+", "x", "1"]);
    }

    #[test]
    fn aggregator_body_is_walked() {
        // a(s) :- s = sum t : b(t).
        let aggr = Argument::new(
            ArgumentKind::Aggregator {
                op: AggregateOp::Sum,
                target: Some(Box::new(var("t"))),
                body: vec![Literal::Atom(Atom::new("b", vec![var("t")], sp()))],
            },
            sp(),
        );
        let clause = Clause::new(
            Atom::new("a", vec![var("s")], sp()),
            vec![Literal::Constraint(BinaryConstraint {
                op: ConstraintOp::Eq,
                lhs: var("s"),
                rhs: aggr,
                span: sp(),
            })],
            sp(),
        );

        // head s, constraint lhs s, aggregator, target t, body atom t
        assert_eq!(ArgumentList::of_clause(&clause).len(), 5);

        let mut atoms = Vec::new();
        walk_clause_atoms(&clause, &mut |atom| atoms.push(atom.name.clone()));
        assert_eq!(atoms, vec!["a", "b"]);
    }

    #[test]
    fn negated_atoms_are_visited() {
        let clause = Clause::new(
            Atom::new("a", vec![var("x")], sp()),
            vec![Literal::Negation(crate::ast::clause::Negation {
                atom: Atom::new("c", vec![var("x")], sp()),
                span: sp(),
            })],
            sp(),
        );
        let mut atoms = Vec::new();
        walk_clause_atoms(&clause, &mut |atom| atoms.push(atom.name.clone()));
        assert_eq!(atoms, vec!["a", "c"]);
        assert_eq!(ArgumentList::of_clause(&clause).len(), 2);
    }
}
