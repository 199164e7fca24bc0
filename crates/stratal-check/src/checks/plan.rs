//! Execution-plan version bounds.
//!
//! A recursive clause is specialized once per body atom whose relation
//! shares the head's strongly connected component; its execution plan
//! may therefore only name versions below that count.

use crate::precedence::{PrecedenceGraph, RecursiveClauses};
use crate::report::{Diagnostic, DiagnosticKind, Report};
use stratal_ast::Program;

pub fn check(
    program: &Program,
    graph: &PrecedenceGraph,
    recursive: &RecursiveClauses,
    report: &mut Report,
) {
    for rel in program.relations.values() {
        let scc = graph.clique(&rel.name);
        for (clause_idx, clause) in rel.clauses.iter().enumerate() {
            if !recursive.is_recursive(&rel.name, clause_idx) {
                continue;
            }
            let Some(plan) = &clause.plan else {
                continue;
            };
            let version_count = clause
                .body_atoms()
                .filter(|atom| scc.contains(&atom.name))
                .count();
            for (&version, order) in &plan.orders {
                if version >= version_count {
                    report.add(
                        Diagnostic::error(
                            DiagnosticKind::Plan,
                            format!("execution plan for version {}", version),
                            order.span,
                        )
                        .with_note(format!(
                            "only versions 0..{} permitted",
                            version_count as i64 - 1
                        )),
                    );
                }
            }
        }
    }
}
