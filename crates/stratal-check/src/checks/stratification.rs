//! Stratification check.
//!
//! A relation fails stratification when it sits in a precedence-graph
//! cycle and some member of that cycle negates or aggregates over
//! another member: evaluation could never reach a fixed point layer by
//! layer. One structured diagnostic is emitted per offending strongly
//! connected component, with a related message at each cyclic negation
//! or aggregation.

use crate::precedence::PrecedenceGraph;
use crate::report::{Diagnostic, DiagnosticKind, Report};
use indexmap::IndexSet;
use stratal_ast::{Argument, ArgumentKind, Atom, Clause, Literal, Program, Span};

pub fn check(program: &Program, graph: &PrecedenceGraph, report: &mut Report) {
    let mut reported: IndexSet<usize> = IndexSet::new();

    for rel in program.relations.values() {
        if !graph.in_cycle(&rel.name) {
            continue;
        }
        let Some(scc) = graph.scc_index(&rel.name) else {
            continue;
        };
        if reported.contains(&scc) {
            continue;
        }

        let clique = graph.clique(&rel.name);
        let mut offenders: Vec<(String, &'static str, Span)> = Vec::new();
        for member_name in clique {
            let Some(member) = program.relation(member_name) else {
                continue;
            };
            for clause in &member.clauses {
                collect_cyclic_uses(clause, clique, member_name, &mut offenders);
            }
        }

        if offenders.is_empty() {
            // A plain recursive component; nothing to stratify away.
            continue;
        }
        reported.insert(scc);

        let members = clique.join(",");
        let mut diagnostic = Diagnostic::program_error(
            DiagnosticKind::Stratification,
            format!("Unable to stratify relation(s) {{{}}}", members),
        );
        for (member, what, span) in offenders {
            diagnostic = diagnostic.with_related(format!("Relation {} has cyclic {}", member, what), span);
        }
        report.add(diagnostic);
    }
}

/// Record every negation of a clique member and every aggregation over
/// one, anywhere in the clause body.
fn collect_cyclic_uses(
    clause: &Clause,
    clique: &[String],
    member: &str,
    offenders: &mut Vec<(String, &'static str, Span)>,
) {
    fn in_literal(
        lit: &Literal,
        clique: &[String],
        member: &str,
        offenders: &mut Vec<(String, &'static str, Span)>,
    ) {
        match lit {
            Literal::Atom(atom) => {
                for arg in &atom.args {
                    in_argument(arg, clique, member, offenders);
                }
            }
            Literal::Negation(neg) => {
                if clique.contains(&neg.atom.name) {
                    offenders.push((member.to_string(), "negation", neg.span));
                }
                for arg in &neg.atom.args {
                    in_argument(arg, clique, member, offenders);
                }
            }
            Literal::Constraint(c) => {
                in_argument(&c.lhs, clique, member, offenders);
                in_argument(&c.rhs, clique, member, offenders);
            }
        }
    }

    fn in_aggregated_atom(
        atom: &Atom,
        clique: &[String],
        member: &str,
        offenders: &mut Vec<(String, &'static str, Span)>,
    ) {
        if clique.contains(&atom.name) {
            offenders.push((member.to_string(), "aggregation", atom.span));
        }
    }

    fn in_argument(
        arg: &Argument,
        clique: &[String],
        member: &str,
        offenders: &mut Vec<(String, &'static str, Span)>,
    ) {
        match &arg.kind {
            ArgumentKind::Aggregator { target, body, .. } => {
                if let Some(target) = target {
                    in_argument(target, clique, member, offenders);
                }
                for lit in body {
                    // Any clique atom inside the aggregate, positive or
                    // negated, is an aggregation over the cycle.
                    match lit {
                        Literal::Atom(atom) => {
                            in_aggregated_atom(atom, clique, member, offenders);
                            for a in &atom.args {
                                in_argument(a, clique, member, offenders);
                            }
                        }
                        Literal::Negation(neg) => {
                            in_aggregated_atom(&neg.atom, clique, member, offenders);
                            for a in &neg.atom.args {
                                in_argument(a, clique, member, offenders);
                            }
                        }
                        Literal::Constraint(c) => {
                            in_argument(&c.lhs, clique, member, offenders);
                            in_argument(&c.rhs, clique, member, offenders);
                        }
                    }
                }
            }
            ArgumentKind::TypeCast { value, .. } => in_argument(value, clique, member, offenders),
            ArgumentKind::Intrinsic { args, .. }
            | ArgumentKind::UserFunctor { args, .. }
            | ArgumentKind::RecordInit { args, .. } => {
                for child in args {
                    in_argument(child, clique, member, offenders);
                }
            }
            _ => {}
        }
    }

    for lit in &clause.body {
        in_literal(lit, clique, member, offenders);
    }
}
