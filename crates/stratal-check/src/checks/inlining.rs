//! Inlining feasibility.
//!
//! A relation marked inline has its uses substituted by its rules. Six
//! situations make that substitution impossible; each is reported as an
//! error without attempting the transform:
//!
//! 1. an inlined relation that is also input/output;
//! 2. a cycle among inlined relations;
//! 3. a counter argument in an inlined clause or an inlined atom;
//! 4. a negated use of an inlined relation that introduces body-only
//!    variables;
//! 5. an inlined atom inside an aggregator;
//! 6. a negated inlined atom containing an unnamed variable (outside a
//!    nested aggregator).

use crate::io_types::IoTypes;
use crate::precedence::PrecedenceGraph;
use crate::report::{DiagnosticKind, Report};
use indexmap::IndexSet;
use stratal_ast::{
    walk_argument, walk_clause, Argument, ArgumentKind, Atom, Clause, Literal, Negation, Program,
    Span,
};

pub fn check(program: &Program, graph: &PrecedenceGraph, io: &IoTypes, report: &mut Report) {
    let inlined: IndexSet<&str> = program
        .relations
        .values()
        .filter(|rel| rel.is_inline)
        .map(|rel| rel.name.as_str())
        .collect();

    // Rule 1: inlined relations cannot take part in I/O.
    for rel in program.relations.values() {
        if rel.is_inline && io.is_io(&rel.name) {
            report.add_error(
                DiagnosticKind::Inlining,
                format!("IO relation {} cannot be inlined", rel.name),
                rel.span,
            );
        }
    }

    // Rule 2: the subgraph of the precedence graph restricted to
    // inlined relations must be acyclic.
    check_inline_cycles(program, graph, &inlined, report);

    // Rule 3: counters cannot survive inlining.
    for clause in program.clauses() {
        stratal_ast::walk_clause_atoms(clause, &mut |atom| {
            if inlined.contains(atom.name.as_str()) {
                for arg in &atom.args {
                    walk_argument(arg, &mut |sub| {
                        if matches!(sub.kind, ArgumentKind::Counter) {
                            report.add_error(
                                DiagnosticKind::Inlining,
                                "Cannot inline literal containing a counter argument '$'",
                                sub.span,
                            );
                        }
                    });
                }
            }
        });
    }
    for rel in program.relations.values().filter(|rel| rel.is_inline) {
        for clause in &rel.clauses {
            walk_clause(clause, &mut |arg| {
                if matches!(arg.kind, ArgumentKind::Counter) {
                    report.add_error(
                        DiagnosticKind::Inlining,
                        "Cannot inline clause containing a counter argument '$'",
                        arg.span,
                    );
                }
            });
        }
    }

    // Rule 4: a negated inlined relation must not introduce variables
    // in its bodies that are absent from its head.
    let mut non_negatable: IndexSet<&str> = IndexSet::new();
    for rel in program.relations.values().filter(|rel| rel.is_inline) {
        for clause in &rel.clauses {
            let mut head_vars: IndexSet<&str> = IndexSet::new();
            for arg in &clause.head.args {
                walk_argument(arg, &mut |a| {
                    if let ArgumentKind::Variable(name) = &a.kind {
                        head_vars.insert(name.as_str());
                    }
                });
            }
            let mut introduces = false;
            stratal_ast::walk_literals(&clause.body, &mut |a| {
                if let ArgumentKind::Variable(name) = &a.kind {
                    if !head_vars.contains(name.as_str()) {
                        introduces = true;
                    }
                }
            });
            if introduces {
                non_negatable.insert(rel.name.as_str());
                break;
            }
        }
    }
    for_each_negation(program, &mut |neg| {
        if non_negatable.contains(neg.atom.name.as_str()) {
            report.add_error(
                DiagnosticKind::Inlining,
                "Cannot inline negated relation which may introduce new variables",
                neg.span,
            );
        }
    });

    // Rule 5: inlining an atom under an aggregator would change the
    // aggregate's value when the relation has several rules.
    for clause in program.clauses() {
        scan_clause_for_aggregated_inlines(clause, &inlined, report);
    }

    // Rule 6: inlining names unnamed variables, so a negated inlined
    // atom with an underscore would become ungrounded; nested
    // aggregators are exempt because they ground their whole body.
    for_each_negation(program, &mut |neg| {
        if inlined.contains(neg.atom.name.as_str()) {
            if let Some(span) = find_invalid_underscore(&neg.atom) {
                report.add_error(
                    DiagnosticKind::Inlining,
                    "Cannot inline negated atom containing an unnamed variable unless the variable is within an aggregator",
                    span,
                );
            }
        }
    });
}

/// One diagnostic per cyclic strongly connected component of the
/// inlined subgraph; the 3-color DFS with parent tracking produces the
/// reported cycle in traversal order.
fn check_inline_cycles(
    program: &Program,
    graph: &PrecedenceGraph,
    inlined: &IndexSet<&str>,
    report: &mut Report,
) {
    let reaches_inlined = |from: &str, to: &str| -> bool {
        let mut seen: IndexSet<&str> = IndexSet::new();
        let mut queue: Vec<&str> = graph
            .successors(from)
            .filter(|s| inlined.contains(s))
            .collect();
        while let Some(current) = queue.pop() {
            if current == to {
                return true;
            }
            if seen.insert(current) {
                queue.extend(graph.successors(current).filter(|s| inlined.contains(s)));
            }
        }
        false
    };

    let mut reported: IndexSet<&str> = IndexSet::new();
    for &name in inlined.iter() {
        if reported.contains(name) || !reaches_inlined(name, name) {
            continue;
        }

        // The component: inlined relations mutually reachable with it.
        let component: IndexSet<&str> = inlined
            .iter()
            .copied()
            .filter(|&other| {
                other == name || (reaches_inlined(name, other) && reaches_inlined(other, name))
            })
            .collect();
        for &member in &component {
            reported.insert(member);
        }

        if let Some(cycle) = find_cycle(graph, &component, name) {
            let origin_span = program
                .relation(&cycle[0])
                .map(|rel| rel.span)
                .unwrap_or_else(|| Span::zero(0));
            let mut rendered = String::from("{");
            for (i, member) in cycle.iter().enumerate() {
                if i > 0 {
                    rendered.push_str(", ");
                }
                rendered.push_str(member);
            }
            rendered.push('}');
            report.add_error(
                DiagnosticKind::Inlining,
                format!("Cannot inline cyclically dependent relations {}", rendered),
                origin_span,
            );
        }
    }
}

/// 3-color DFS within one component; returns the first cycle found, in
/// traversal order.
fn find_cycle(
    graph: &PrecedenceGraph,
    component: &IndexSet<&str>,
    start: &str,
) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        Visiting,
        Visited,
    }

    fn dfs<'a>(
        graph: &'a PrecedenceGraph,
        component: &IndexSet<&'a str>,
        colors: &mut indexmap::IndexMap<&'a str, Color>,
        origins: &mut indexmap::IndexMap<&'a str, &'a str>,
        current: &'a str,
    ) -> Option<Vec<String>> {
        colors.insert(current, Color::Visiting);
        let succs: Vec<&str> = graph
            .successors(current)
            .filter(|s| component.contains(s))
            .collect();
        for succ in succs {
            match colors.get(succ).copied() {
                Some(Color::Visited) => continue,
                Some(Color::Visiting) => {
                    // Back edge: walk the parent chain from `current`
                    // up to `succ` and reverse into traversal order.
                    let mut cycle = vec![current.to_string()];
                    let mut node = current;
                    while node != succ {
                        node = origins[node];
                        cycle.push(node.to_string());
                    }
                    cycle.reverse();
                    return Some(cycle);
                }
                None => {
                    origins.insert(succ, current);
                    if let Some(cycle) = dfs(graph, component, colors, origins, succ) {
                        return Some(cycle);
                    }
                }
            }
        }
        colors.insert(current, Color::Visited);
        None
    }

    // Re-anchor `start` into the component's borrow space.
    let start = *component.get(start)?;
    let mut colors = indexmap::IndexMap::new();
    let mut origins = indexmap::IndexMap::new();
    dfs(graph, component, &mut colors, &mut origins, start)
}

/// Visit every negation in a clause body, aggregator bodies included.
fn for_each_negation<'a, F>(program: &'a Program, f: &mut F)
where
    F: FnMut(&'a Negation),
{
    fn in_literal<'a, F: FnMut(&'a Negation)>(lit: &'a Literal, f: &mut F) {
        match lit {
            Literal::Negation(neg) => {
                f(neg);
                for arg in &neg.atom.args {
                    in_argument(arg, f);
                }
            }
            Literal::Atom(atom) => {
                for arg in &atom.args {
                    in_argument(arg, f);
                }
            }
            Literal::Constraint(c) => {
                in_argument(&c.lhs, f);
                in_argument(&c.rhs, f);
            }
        }
    }

    fn in_argument<'a, F: FnMut(&'a Negation)>(arg: &'a Argument, f: &mut F) {
        match &arg.kind {
            ArgumentKind::Aggregator { target, body, .. } => {
                if let Some(target) = target {
                    in_argument(target, f);
                }
                for lit in body {
                    in_literal(lit, f);
                }
            }
            ArgumentKind::TypeCast { value, .. } => in_argument(value, f),
            ArgumentKind::Intrinsic { args, .. }
            | ArgumentKind::UserFunctor { args, .. }
            | ArgumentKind::RecordInit { args, .. } => {
                for child in args {
                    in_argument(child, f);
                }
            }
            _ => {}
        }
    }

    for clause in program.clauses() {
        for lit in &clause.body {
            in_literal(lit, f);
        }
    }
}

/// Report every inlined atom that sits under an aggregator, once per
/// atom regardless of aggregator nesting depth.
fn scan_clause_for_aggregated_inlines(
    clause: &Clause,
    inlined: &IndexSet<&str>,
    report: &mut Report,
) {
    fn in_literal(lit: &Literal, depth: usize, inlined: &IndexSet<&str>, report: &mut Report) {
        match lit {
            Literal::Atom(atom) => in_atom(atom, depth, inlined, report),
            Literal::Negation(neg) => in_atom(&neg.atom, depth, inlined, report),
            Literal::Constraint(c) => {
                in_argument(&c.lhs, depth, inlined, report);
                in_argument(&c.rhs, depth, inlined, report);
            }
        }
    }

    fn in_atom(atom: &Atom, depth: usize, inlined: &IndexSet<&str>, report: &mut Report) {
        if depth > 0 && inlined.contains(atom.name.as_str()) {
            report.add_error(
                DiagnosticKind::Inlining,
                "Cannot inline relations that appear in aggregator",
                atom.span,
            );
        }
        for arg in &atom.args {
            in_argument(arg, depth, inlined, report);
        }
    }

    fn in_argument(arg: &Argument, depth: usize, inlined: &IndexSet<&str>, report: &mut Report) {
        match &arg.kind {
            ArgumentKind::Aggregator { target, body, .. } => {
                if let Some(target) = target {
                    in_argument(target, depth + 1, inlined, report);
                }
                for lit in body {
                    in_literal(lit, depth + 1, inlined, report);
                }
            }
            ArgumentKind::TypeCast { value, .. } => in_argument(value, depth, inlined, report),
            ArgumentKind::Intrinsic { args, .. }
            | ArgumentKind::UserFunctor { args, .. }
            | ArgumentKind::RecordInit { args, .. } => {
                for child in args {
                    in_argument(child, depth, inlined, report);
                }
            }
            _ => {}
        }
    }

    in_atom(&clause.head, 0, inlined, report);
    for lit in &clause.body {
        in_literal(lit, 0, inlined, report);
    }
}

/// First unnamed variable not shielded by a nested aggregator, if any.
fn find_invalid_underscore(atom: &Atom) -> Option<Span> {
    fn in_argument(arg: &Argument) -> Option<Span> {
        match &arg.kind {
            ArgumentKind::Unnamed => Some(arg.span),
            // The aggregator grounds its entire body, underscores
            // included.
            ArgumentKind::Aggregator { .. } => None,
            ArgumentKind::TypeCast { value, .. } => in_argument(value),
            ArgumentKind::Intrinsic { args, .. }
            | ArgumentKind::UserFunctor { args, .. }
            | ArgumentKind::RecordInit { args, .. } => args.iter().find_map(in_argument),
            _ => None,
        }
    }
    atom.args.iter().find_map(in_argument)
}
