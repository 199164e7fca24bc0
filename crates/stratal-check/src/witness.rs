//! Aggregator witness-scope check.
//!
//! An aggregator body is a nested scope. A variable that is grounded
//! *only* by atoms inside that scope is an existential witness of the
//! aggregation; referring to it from the enclosing scope would leak a
//! value the aggregate has already quantified away.
//!
//! The check compares two parallel renditions of each body:
//!
//! - `original` — the body as written;
//! - `stripped` — the same body with every aggregator subterm replaced
//!   by a fresh `+aggr_var_k` variable, plus a synthetic positive
//!   "grounding atom" that grounds the fresh variables and every term
//!   the caller already considers grounded.
//!
//! Groundedness is computed on both. An argument that is ungrounded in
//! the stripped body but grounded in its original twin can only have
//! been grounded through an aggregator's inner scope. That is the
//! witness problem, reported at the twin's location. The check then
//! recurses into each aggregator body with the enlarged grounded set.
//!
//! The outermost invocation appends the head variables as a negated
//! synthetic atom so they count as ungrounded uses of the outer scope.
//!
//! Twin correspondence is maintained by depth-first index: the stripped
//! rendition is built in the same preorder as the original, so each
//! produced occurrence records the index of the subterm it descends
//! from.

use crate::report::{DiagnosticKind, Report};
use stratal_ast::{
    subtree_size, walk_argument, Argument, ArgumentKind, Atom, Clause, Literal, Negation, Program,
    Span,
};

const GROUNDING_ATOM: &str = "+grounding_atom";
const HEAD_VARS_ATOM: &str = "+head_vars";

const WITNESS_MESSAGE: &str = "Witness problem: argument grounded by an aggregator's inner scope \
                               is used ungrounded in outer scope";

/// Run the witness-scope check over every clause of the program.
pub fn check(program: &Program, report: &mut Report) {
    let mut checker = WitnessCheck { next_fresh: 0 };
    for clause in program.clauses() {
        checker.check_clause(clause, report);
    }
}

struct WitnessCheck {
    /// Fresh-variable counter; `+`-prefixed names cannot collide with
    /// user variables.
    next_fresh: usize,
}

impl WitnessCheck {
    fn check_clause(&mut self, clause: &Clause, report: &mut Report) {
        // Head variables enter the outer scope as ungrounded uses.
        let mut head_vars = Vec::new();
        for arg in &clause.head.args {
            walk_argument(arg, &mut |a| {
                if matches!(a.kind, ArgumentKind::Variable(_)) {
                    head_vars.push(a.clone());
                }
            });
        }

        let mut literals = clause.body.clone();
        literals.push(Literal::Negation(Negation {
            atom: Atom::new(HEAD_VARS_ATOM, head_vars, clause.head.span),
            span: clause.head.span,
        }));

        for span in self.invalid_witness_uses(&literals, &[]) {
            report.add_error(DiagnosticKind::Witness, WITNESS_MESSAGE, span);
        }
    }

    /// Spans of arguments grounded only through an aggregator's inner
    /// scope, at this nesting level or below.
    fn invalid_witness_uses(&mut self, literals: &[Literal], grounded: &[Argument]) -> Vec<Span> {
        let mut strip = Strip {
            o_idx: 0,
            a_to_o: Vec::new(),
            fresh: Vec::new(),
            counter: &mut self.next_fresh,
        };
        let mut stripped: Vec<Literal> = literals.iter().map(|lit| strip.literal(lit)).collect();
        let Strip { a_to_o, fresh, .. } = strip;

        let mut original = literals.to_vec();

        // The grounding atom forces the fresh variables (stripped side
        // only) and the caller-supplied terms (both sides) to count as
        // grounded.
        let mut stripped_roots: Vec<Argument> = fresh
            .iter()
            .map(|(name, span)| Argument::var(name.clone(), *span))
            .collect();
        stripped_roots.extend(grounded.iter().cloned());
        stripped.push(Literal::Atom(Atom::new(
            GROUNDING_ATOM,
            stripped_roots,
            Span::zero(0),
        )));
        original.push(Literal::Atom(Atom::new(
            GROUNDING_ATOM,
            grounded.to_vec(),
            Span::zero(0),
        )));

        let original_grounded = crate::grounded::Groundedness::of_literals(&original);
        let stripped_grounded = crate::grounded::Groundedness::of_literals(&stripped);
        let stripped_args = stratal_ast::ArgumentList::of_literals(&stripped);

        let mut result = Vec::new();
        for (a_idx, &o_idx) in a_to_o.iter().enumerate() {
            if !stripped_grounded.is_grounded(a_idx) && original_grounded.is_grounded(o_idx) {
                result.push(stripped_args.get(a_idx).span);
            }
        }

        // Everything at this level is considered grounded when checking
        // nested scopes.
        let mut newly_grounded = grounded.to_vec();
        for (_, arg) in stripped_args.iter() {
            newly_grounded.push(arg.clone());
        }

        let mut nested_bodies = Vec::new();
        for lit in literals {
            collect_outer_aggregator_bodies_in_literal(lit, &mut nested_bodies);
        }
        for body in nested_bodies {
            result.extend(self.invalid_witness_uses(body, &newly_grounded));
        }

        result
    }
}

/// Rebuilds a literal with aggregators replaced by fresh variables,
/// recording for each produced occurrence the depth-first index of the
/// original subterm it corresponds to.
struct Strip<'c> {
    o_idx: usize,
    a_to_o: Vec<usize>,
    fresh: Vec<(String, Span)>,
    counter: &'c mut usize,
}

impl Strip<'_> {
    fn literal(&mut self, lit: &Literal) -> Literal {
        match lit {
            Literal::Atom(atom) => Literal::Atom(self.atom(atom)),
            Literal::Negation(neg) => Literal::Negation(Negation {
                atom: self.atom(&neg.atom),
                span: neg.span,
            }),
            Literal::Constraint(c) => Literal::Constraint(stratal_ast::BinaryConstraint {
                op: c.op,
                lhs: self.arg(&c.lhs),
                rhs: self.arg(&c.rhs),
                span: c.span,
            }),
        }
    }

    fn atom(&mut self, atom: &Atom) -> Atom {
        Atom::new(
            atom.name.clone(),
            atom.args.iter().map(|arg| self.arg(arg)).collect(),
            atom.span,
        )
    }

    fn arg(&mut self, arg: &Argument) -> Argument {
        let o_idx = self.o_idx;
        self.o_idx += 1;

        if matches!(arg.kind, ArgumentKind::Aggregator { .. }) {
            // The entire original subtree collapses into one variable.
            self.o_idx += subtree_size(arg) - 1;
            let name = format!("+aggr_var_{}", *self.counter);
            *self.counter += 1;
            self.fresh.push((name.clone(), arg.span));
            self.a_to_o.push(o_idx);
            return Argument::var(name, arg.span);
        }

        self.a_to_o.push(o_idx);
        let kind = match &arg.kind {
            ArgumentKind::TypeCast { value, type_name } => ArgumentKind::TypeCast {
                value: Box::new(self.arg(value)),
                type_name: type_name.clone(),
            },
            ArgumentKind::Intrinsic { op, args } => ArgumentKind::Intrinsic {
                op: *op,
                args: args.iter().map(|a| self.arg(a)).collect(),
            },
            ArgumentKind::UserFunctor { name, args } => ArgumentKind::UserFunctor {
                name: name.clone(),
                args: args.iter().map(|a| self.arg(a)).collect(),
            },
            ArgumentKind::RecordInit { type_name, args } => ArgumentKind::RecordInit {
                type_name: type_name.clone(),
                args: args.iter().map(|a| self.arg(a)).collect(),
            },
            other => other.clone(),
        };
        Argument::new(kind, arg.span)
    }
}

/// Collect the bodies of aggregators not nested inside other
/// aggregators; the recursion of the main check handles deeper levels.
fn collect_outer_aggregator_bodies_in_literal<'a>(
    lit: &'a Literal,
    out: &mut Vec<&'a [Literal]>,
) {
    let mut visit = |arg: &'a Argument| collect_outer_aggregator_bodies(arg, out);
    match lit {
        Literal::Atom(atom) => atom.args.iter().for_each(&mut visit),
        Literal::Negation(neg) => neg.atom.args.iter().for_each(&mut visit),
        Literal::Constraint(c) => {
            visit(&c.lhs);
            visit(&c.rhs);
        }
    }
}

fn collect_outer_aggregator_bodies<'a>(arg: &'a Argument, out: &mut Vec<&'a [Literal]>) {
    match &arg.kind {
        ArgumentKind::Aggregator { target, body, .. } => {
            out.push(body);
            if let Some(target) = target {
                collect_outer_aggregator_bodies(target, out);
            }
        }
        ArgumentKind::TypeCast { value, .. } => collect_outer_aggregator_bodies(value, out),
        ArgumentKind::Intrinsic { args, .. }
        | ArgumentKind::UserFunctor { args, .. }
        | ArgumentKind::RecordInit { args, .. } => {
            for child in args {
                collect_outer_aggregator_bodies(child, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Report;
    use stratal_ast::{
        AggregateOp, Argument, ArgumentKind, Atom, BinaryConstraint, Clause, ConstraintOp,
        IntrinsicOp, Literal, Program, Relation, Span,
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

    fn count_over(body: Vec<Literal>) -> Argument {
        Argument::new(
            ArgumentKind::Aggregator {
                op: AggregateOp::Count,
                target: None,
                body,
            },
            sp(),
        )
    }

    fn program_with(clause: Clause) -> Program {
        let mut program = Program::new();
        program.add_relation(Relation::new(clause.head.name.clone(), vec![], sp()));
        program.add_clause(clause);
        program
    }

    fn witness_errors(program: &Program) -> usize {
        let mut report = Report::new();
        check(program, &mut report);
        report
            .diagnostics()
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Witness)
            .count()
    }

    #[test]
    fn aggregate_result_binding_is_legal() {
        // r(x) :- x = count : { s(z) }.
        let clause = Clause::new(
            Atom::new("r", vec![var("x")], sp()),
            vec![eq(var("x"), count_over(vec![atom("s", vec![var("z")])]))],
            sp(),
        );
        assert_eq!(witness_errors(&program_with(clause)), 0);
    }

    #[test]
    fn witness_escaping_to_outer_scope_is_reported() {
        // r(x) :- c = count : { s(y) }, x = y + 1.
        let plus = Argument::new(
            ArgumentKind::Intrinsic {
                op: IntrinsicOp::Add,
                args: vec![var("y"), Argument::number(1, sp())],
            },
            sp(),
        );
        let clause = Clause::new(
            Atom::new("r", vec![var("x")], sp()),
            vec![
                eq(var("c"), count_over(vec![atom("s", vec![var("y")])])),
                eq(var("x"), plus),
            ],
            sp(),
        );
        assert!(witness_errors(&program_with(clause)) > 0);
    }

    #[test]
    fn witness_escaping_to_head_is_reported() {
        // r(y) :- c = count : { s(y) }.
        let clause = Clause::new(
            Atom::new("r", vec![var("y")], sp()),
            vec![eq(var("c"), count_over(vec![atom("s", vec![var("y")])]))],
            sp(),
        );
        assert!(witness_errors(&program_with(clause)) > 0);
    }

    #[test]
    fn variable_grounded_outside_as_well_is_legal() {
        // r(y) :- t(y), c = count : { s(y) }.
        let clause = Clause::new(
            Atom::new("r", vec![var("y")], sp()),
            vec![
                atom("t", vec![var("y")]),
                eq(var("c"), count_over(vec![atom("s", vec![var("y")])])),
            ],
            sp(),
        );
        assert_eq!(witness_errors(&program_with(clause)), 0);
    }

    #[test]
    fn nested_scope_witness_is_reported() {
        // r(x) :- x = count : { c = count : { s(y) }, t(y) }.
        // y is grounded inside the innermost scope only, but used in the
        // middle scope's t(y): legal, since t(y) grounds y in the
        // middle scope itself, so nothing escapes.
        let inner = eq(var("c"), count_over(vec![atom("s", vec![var("y")])]));
        let clause = Clause::new(
            Atom::new("r", vec![var("x")], sp()),
            vec![eq(
                var("x"),
                count_over(vec![inner, atom("t", vec![var("y")])]),
            )],
            sp(),
        );
        assert_eq!(witness_errors(&program_with(clause)), 0);

        // Without t(y), the middle scope uses y only through the inner
        // aggregator's body: witness problem.
        let inner = eq(var("c"), count_over(vec![atom("s", vec![var("y")])]));
        let middle = eq(var("w"), var("y"));
        let clause = Clause::new(
            Atom::new("r", vec![var("x")], sp()),
            vec![eq(var("x"), count_over(vec![inner, middle]))],
            sp(),
        );
        assert!(witness_errors(&program_with(clause)) > 0);
    }
}
