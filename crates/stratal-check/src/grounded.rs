//! Groundedness analysis.
//!
//! For one clause (or a bare literal list), decides which argument
//! occurrences are grounded: forced to a value by some positive
//! structure in the body. The grounding roots and propagation rules
//! are:
//!
//! - top-level arguments of positive body atoms are grounded;
//! - constants and counters are grounded;
//! - a variable is grounded everywhere once any of its occurrences is;
//! - `=` constraints propagate groundedness between their two sides;
//! - a type cast is grounded exactly when its value is;
//! - a functor is grounded when all its arguments are (never the other
//!   way around);
//! - a record constructor is grounded when all its fields are, and its
//!   fields are grounded when it is;
//! - an aggregator is grounded as its target expression (`count`
//!   without a target is intrinsically grounded); its body participates
//!   like any other literal list.
//!
//! Negated atoms ground nothing. The rules are monotone, so iterating
//! to a fixed point terminates.
//!
//! Results are indexed by the depth-first occurrence index of
//! [`stratal_ast::ArgumentList`].

use indexmap::IndexMap;
use stratal_ast::{Argument, ArgumentKind, Atom, Clause, ConstraintOp, Literal};

/// Per-occurrence groundedness of one clause or literal list.
#[derive(Debug)]
pub struct Groundedness {
    grounded: Vec<bool>,
}

impl Groundedness {
    /// Analyze a clause. Head occurrences come first in the indexing
    /// and are *not* grounding roots; a head atom grounds nothing.
    pub fn of_clause(clause: &Clause) -> Self {
        Analysis::run(Some(&clause.head), &clause.body)
    }

    /// Analyze a bare literal list (used for synthesized bodies).
    pub fn of_literals(literals: &[Literal]) -> Self {
        Analysis::run(None, literals)
    }

    pub fn is_grounded(&self, occurrence: usize) -> bool {
        self.grounded[occurrence]
    }

    pub fn len(&self) -> usize {
        self.grounded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grounded.is_empty()
    }
}

struct Analysis<'a> {
    grounded: Vec<bool>,
    vars: IndexMap<&'a str, bool>,
    idx: usize,
    changed: bool,
}

impl<'a> Analysis<'a> {
    fn run(head: Option<&'a Atom>, body: &'a [Literal]) -> Groundedness {
        let mut count = 0;
        if let Some(head) = head {
            for arg in &head.args {
                stratal_ast::walk_argument(arg, &mut |_| count += 1);
            }
        }
        stratal_ast::walk_literals(body, &mut |_| count += 1);

        let mut analysis = Analysis {
            grounded: vec![false; count],
            vars: IndexMap::new(),
            idx: 0,
            changed: true,
        };

        while analysis.changed {
            analysis.changed = false;
            analysis.idx = 0;
            if let Some(head) = head {
                for arg in &head.args {
                    analysis.visit_arg(arg, false);
                }
            }
            for lit in body {
                analysis.visit_literal(lit);
            }
            debug_assert_eq!(analysis.idx, count, "walk order drifted");
        }

        Groundedness {
            grounded: analysis.grounded,
        }
    }

    fn set(&mut self, idx: usize) {
        if !self.grounded[idx] {
            self.grounded[idx] = true;
            self.changed = true;
        }
    }

    fn visit_literal(&mut self, lit: &'a Literal) {
        match lit {
            Literal::Atom(atom) => {
                for arg in &atom.args {
                    self.visit_arg(arg, true);
                }
            }
            Literal::Negation(neg) => {
                for arg in &neg.atom.args {
                    self.visit_arg(arg, false);
                }
            }
            Literal::Constraint(c) => {
                let lhs = self.visit_arg(&c.lhs, false);
                let rhs = self.visit_arg(&c.rhs, false);
                if c.op == ConstraintOp::Eq {
                    if self.grounded[lhs] {
                        self.set(rhs);
                    }
                    if self.grounded[rhs] {
                        self.set(lhs);
                    }
                }
            }
        }
    }

    /// Visit one argument subtree; returns this node's occurrence index.
    fn visit_arg(&mut self, arg: &'a Argument, asserted: bool) -> usize {
        let idx = self.idx;
        self.idx += 1;
        if asserted {
            self.set(idx);
        }

        match &arg.kind {
            ArgumentKind::Variable(name) => {
                if self.grounded[idx] && !self.vars.get(name.as_str()).copied().unwrap_or(false) {
                    self.vars.insert(name.as_str(), true);
                    self.changed = true;
                }
                if self.vars.get(name.as_str()).copied().unwrap_or(false) {
                    self.set(idx);
                }
            }
            ArgumentKind::Number(_)
            | ArgumentKind::Text(_)
            | ArgumentKind::Nil
            | ArgumentKind::Counter => self.set(idx),
            ArgumentKind::Unnamed => {}
            ArgumentKind::TypeCast { value, .. } => {
                let inner = self.visit_arg(value, false);
                if self.grounded[inner] {
                    self.set(idx);
                }
                if self.grounded[idx] {
                    self.set(inner);
                }
            }
            ArgumentKind::Intrinsic { args, .. } | ArgumentKind::UserFunctor { args, .. } => {
                let children: Vec<usize> =
                    args.iter().map(|child| self.visit_arg(child, false)).collect();
                if !children.is_empty() && children.iter().all(|&c| self.grounded[c]) {
                    self.set(idx);
                }
            }
            ArgumentKind::RecordInit { args, .. } => {
                let children: Vec<usize> =
                    args.iter().map(|child| self.visit_arg(child, false)).collect();
                if children.iter().all(|&c| self.grounded[c]) {
                    self.set(idx);
                }
                if self.grounded[idx] {
                    for c in children {
                        self.set(c);
                    }
                }
            }
            ArgumentKind::Aggregator { target, body, .. } => {
                let target_idx = target.as_ref().map(|t| self.visit_arg(t, false));
                for lit in body {
                    self.visit_literal(lit);
                }
                match target_idx {
                    Some(t) if self.grounded[t] => self.set(idx),
                    None => self.set(idx),
                    _ => {}
                }
            }
        }

        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratal_ast::{
        AggregateOp, Argument, ArgumentKind, Atom, BinaryConstraint, Clause, ConstraintOp,
        IntrinsicOp, Literal, Span,
    };

    fn sp() -> Span {
        Span::zero(0)
    }

    fn var(name: &str) -> Argument {
        Argument::var(name, sp())
    }

    fn atom(name: &str, args: Vec<Argument>) -> Literal {
        Literal::Atom(Atom::new(name, args, sp()))
    }

    fn eq(lhs: Argument, rhs: Argument) -> Literal {
        Literal::Constraint(BinaryConstraint {
            op: ConstraintOp::Eq,
            lhs,
            rhs,
            span: sp(),
        })
    }

    fn grounded_of(clause: &Clause) -> Vec<bool> {
        let g = Groundedness::of_clause(clause);
        (0..g.len()).map(|i| g.is_grounded(i)).collect()
    }

    #[test]
    fn positive_atom_grounds_its_variables() {
        // a(x) :- b(x).
        let clause = Clause::new(
            Atom::new("a", vec![var("x")], sp()),
            vec![atom("b", vec![var("x")])],
            sp(),
        );
        assert_eq!(grounded_of(&clause), vec![true, true]);
    }

    #[test]
    fn negation_grounds_nothing() {
        // a(x) :- !b(x).
        let clause = Clause::new(
            Atom::new("a", vec![var("x")], sp()),
            vec![Literal::Negation(stratal_ast::Negation {
                atom: Atom::new("b", vec![var("x")], sp()),
                span: sp(),
            })],
            sp(),
        );
        assert_eq!(grounded_of(&clause), vec![false, false]);
    }

    #[test]
    fn equality_propagates_groundedness() {
        // a(x) :- b(y), x = y.
        let clause = Clause::new(
            Atom::new("a", vec![var("x")], sp()),
            vec![atom("b", vec![var("y")]), eq(var("x"), var("y"))],
            sp(),
        );
        assert!(grounded_of(&clause).iter().all(|&g| g));
    }

    #[test]
    fn functor_inside_atom_does_not_ground_its_variables() {
        // a(x) :- b(x + 1).
        let sum = Argument::new(
            ArgumentKind::Intrinsic {
                op: IntrinsicOp::Add,
                args: vec![var("x"), Argument::number(1, sp())],
            },
            sp(),
        );
        let clause = Clause::new(
            Atom::new("a", vec![var("x")], sp()),
            vec![atom("b", vec![sum])],
            sp(),
        );
        // head x, functor, x, 1
        assert_eq!(grounded_of(&clause), vec![false, true, false, true]);
    }

    #[test]
    fn grounded_record_grounds_its_fields() {
        // a(x) :- b(r), r = [x, y].
        let record = Argument::new(
            ArgumentKind::RecordInit {
                type_name: "Pair".into(),
                args: vec![var("x"), var("y")],
            },
            sp(),
        );
        let clause = Clause::new(
            Atom::new("a", vec![var("x")], sp()),
            vec![atom("b", vec![var("r")]), eq(var("r"), record)],
            sp(),
        );
        assert!(grounded_of(&clause).iter().all(|&g| g));
    }

    #[test]
    fn aggregator_body_grounds_inner_variables() {
        // a(y) :- y = max z : { s(z) }.
        let aggr = Argument::new(
            ArgumentKind::Aggregator {
                op: AggregateOp::Max,
                target: Some(Box::new(var("z"))),
                body: vec![atom("s", vec![var("z")])],
            },
            sp(),
        );
        let clause = Clause::new(
            Atom::new("a", vec![var("y")], sp()),
            vec![eq(var("y"), aggr)],
            sp(),
        );
        // head y, lhs y, aggr, target z, body z. The naive analysis
        // grounds all of them; the witness check is what catches the
        // scope escape.
        assert!(grounded_of(&clause).iter().all(|&g| g));
    }

    #[test]
    fn count_without_target_is_grounded() {
        let aggr = Argument::new(
            ArgumentKind::Aggregator {
                op: AggregateOp::Count,
                target: None,
                body: vec![atom("s", vec![var("z")])],
            },
            sp(),
        );
        let clause = Clause::new(
            Atom::new("a", vec![var("c")], sp()),
            vec![eq(var("c"), aggr)],
            sp(),
        );
        assert!(grounded_of(&clause).iter().all(|&g| g));
    }
}
