//! Structural rule checking.
//!
//! The ordered battery of local well-formedness rules: namespaces, type
//! declarations, relations (declaration, clauses, facts), I/O
//! directives, groundedness, type usage, and type correctness against
//! the typing witness. Every rule reports independently; no rule stops
//! its siblings, so one run produces a maximal report.

use crate::env::TypeEnvironment;
use crate::grounded::Groundedness;
use crate::io_types::IoTypes;
use crate::lattice::{AnalysisType, Kind, TypeLattice};
use crate::precedence::RecursiveClauses;
use crate::report::{Diagnostic, DiagnosticKind, Report};
use crate::typing::TypeWitness;
use crate::EngineRestrictions;
use indexmap::{IndexMap, IndexSet};
use stratal_ast::{
    is_builtin_type, walk_clause, Argument, ArgumentKind, Atom, Attribute, BinaryConstraint,
    Clause, ConstraintOp, Literal, PrimitiveKind, Program, Relation, Representation, Span,
    TypeDeclKind, MAX_DOMAIN, MIN_DOMAIN,
};

/// Everything the structural checker reads.
pub struct StructureContext<'a> {
    pub program: &'a Program,
    pub env: &'a TypeEnvironment,
    pub lattice: &'a TypeLattice<'a>,
    pub witness: &'a TypeWitness,
    pub recursive: &'a RecursiveClauses,
    pub io: &'a IoTypes,
}

/// Run all structural rules in order.
pub fn check(ctx: &StructureContext, report: &mut Report, restrictions: &mut EngineRestrictions) {
    check_namespaces(ctx, report);
    check_types(ctx, report);
    check_relations(ctx, report, restrictions);
    check_io_directives(ctx, report, restrictions);
    check_groundedness(ctx, report);
    check_type_usage(ctx, report, restrictions);
    check_type_correctness(ctx, report);
}

// ----- namespaces -----

/// Types and relations share one namespace.
fn check_namespaces(ctx: &StructureContext, report: &mut Report) {
    let mut names: IndexMap<&str, Span> = IndexMap::new();
    for decl in ctx.program.types.values() {
        if names.contains_key(decl.name.as_str()) {
            report.add_error(
                DiagnosticKind::Namespace,
                format!("Name clash on type {}", decl.name),
                decl.span,
            );
        } else {
            names.insert(&decl.name, decl.span);
        }
    }
    for rel in ctx.program.relations.values() {
        if names.contains_key(rel.name.as_str()) {
            report.add_error(
                DiagnosticKind::Namespace,
                format!("Name clash on relation {}", rel.name),
                rel.span,
            );
        } else {
            names.insert(&rel.name, rel.span);
        }
    }
}

// ----- type declarations -----

fn check_types(ctx: &StructureContext, report: &mut Report) {
    for decl in ctx.program.types.values() {
        match &decl.kind {
            TypeDeclKind::Primitive(_) => {}
            TypeDeclKind::Union(members) => {
                for member in members {
                    if is_builtin_type(member) {
                        continue;
                    }
                    match ctx.program.type_decl(member) {
                        None => report.add_error(
                            DiagnosticKind::Reference,
                            format!(
                                "Undefined type {} in definition of union type {}",
                                member, decl.name
                            ),
                            decl.span,
                        ),
                        Some(sub) => {
                            if matches!(sub.kind, TypeDeclKind::Record(_)) {
                                report.add_error(
                                    DiagnosticKind::Typing,
                                    format!(
                                        "Union type {} contains the non-primitive type {}",
                                        decl.name, member
                                    ),
                                    decl.span,
                                );
                            }
                        }
                    }
                }
                if union_is_cyclic(ctx.program, &decl.name) {
                    report.add_error(
                        DiagnosticKind::Typing,
                        format!("Union type {} is defined cyclically", decl.name),
                        decl.span,
                    );
                } else if union_reaches(ctx.program, &decl.name, PrimitiveKind::Number)
                    && union_reaches(ctx.program, &decl.name, PrimitiveKind::Symbol)
                {
                    report.add_error(
                        DiagnosticKind::Typing,
                        format!(
                            "Union type {} contains a mixture of symbol and number types",
                            decl.name
                        ),
                        decl.span,
                    );
                }
            }
            TypeDeclKind::Record(fields) => {
                for field in fields {
                    if !is_builtin_type(&field.type_name)
                        && ctx.program.type_decl(&field.type_name).is_none()
                    {
                        report.add_error(
                            DiagnosticKind::Reference,
                            format!(
                                "Undefined type {} in definition of field {}",
                                field.type_name, field.name
                            ),
                            decl.span,
                        );
                    }
                }
                for (i, field) in fields.iter().enumerate() {
                    if fields[..i].iter().any(|f| f.name == field.name) {
                        report.add_error(
                            DiagnosticKind::Namespace,
                            format!(
                                "Doubly defined field name {} in definition of type {}",
                                field.name, decl.name
                            ),
                            decl.span,
                        );
                    }
                }
            }
        }
    }
}

/// The named type reaches the given primitive kind through union
/// membership. Guarded against cyclic definitions.
fn union_reaches(program: &Program, type_name: &str, target: PrimitiveKind) -> bool {
    fn go(
        program: &Program,
        type_name: &str,
        target: PrimitiveKind,
        visited: &mut IndexSet<String>,
    ) -> bool {
        match type_name {
            stratal_ast::NUMBER_TYPE => return target == PrimitiveKind::Number,
            stratal_ast::SYMBOL_TYPE => return target == PrimitiveKind::Symbol,
            _ => {}
        }
        let Some(decl) = program.type_decl(type_name) else {
            return false;
        };
        match &decl.kind {
            TypeDeclKind::Primitive(kind) => *kind == target,
            TypeDeclKind::Record(_) => false,
            TypeDeclKind::Union(members) => {
                if !visited.insert(type_name.to_string()) {
                    return false;
                }
                members
                    .iter()
                    .any(|member| go(program, member, target, visited))
            }
        }
    }
    go(program, type_name, target, &mut IndexSet::new())
}

/// The union participates in a membership cycle.
fn union_is_cyclic(program: &Program, union_name: &str) -> bool {
    fn reaches(program: &Program, from: &str, to: &str, visited: &mut IndexSet<String>) -> bool {
        let Some(decl) = program.type_decl(from) else {
            return false;
        };
        let TypeDeclKind::Union(members) = &decl.kind else {
            return false;
        };
        for member in members {
            if member == to {
                return true;
            }
            if visited.insert(member.clone()) && reaches(program, member, to, visited) {
                return true;
            }
        }
        false
    }
    reaches(program, union_name, union_name, &mut IndexSet::new())
}

// ----- relations, clauses, facts -----

fn check_relations(
    ctx: &StructureContext,
    report: &mut Report,
    restrictions: &mut EngineRestrictions,
) {
    for rel in ctx.program.relations.values() {
        check_relation(ctx, rel, report, restrictions);
        for (clause_idx, clause) in rel.clauses.iter().enumerate() {
            let recursive = ctx.recursive.is_recursive(&rel.name, clause_idx);
            check_clause(ctx, clause, recursive, report);
        }
    }
    for clause in &ctx.program.orphan_clauses {
        check_clause(ctx, clause, false, report);
    }
}

fn check_relation(
    ctx: &StructureContext,
    rel: &Relation,
    report: &mut Report,
    restrictions: &mut EngineRestrictions,
) {
    if rel.representation == Representation::EqRel {
        if rel.arity() == 2 {
            if rel.attributes[0].type_name != rel.attributes[1].type_name {
                report.add_error(
                    DiagnosticKind::Typing,
                    format!("Domains of equivalence relation {} are different", rel.name),
                    rel.span,
                );
            }
        } else {
            report.add_error(
                DiagnosticKind::Arity,
                format!("Equivalence relation {} is not binary", rel.name),
                rel.span,
            );
        }
    }

    for (i, attr) in rel.attributes.iter().enumerate() {
        check_attribute(ctx, rel, i, attr, report, restrictions);
    }

    if rel.clauses.is_empty() && !ctx.io.is_input(&rel.name) && !rel.suppressed {
        report.add_warning(
            DiagnosticKind::Style,
            format!("No rules/facts defined for relation {}", rel.name),
            rel.span,
        );
    }
}

fn check_attribute(
    ctx: &StructureContext,
    rel: &Relation,
    index: usize,
    attr: &Attribute,
    report: &mut Report,
    restrictions: &mut EngineRestrictions,
) {
    if !is_builtin_type(&attr.type_name) && ctx.program.type_decl(&attr.type_name).is_none() {
        report.add_error(
            DiagnosticKind::Reference,
            format!(
                "Undefined type in attribute {}:{}",
                attr.name, attr.type_name
            ),
            attr.span,
        );
    }

    if rel.attributes[..index]
        .iter()
        .any(|other| other.name == attr.name)
    {
        report.add_error(
            DiagnosticKind::Namespace,
            format!(
                "Doubly defined attribute name {}:{}",
                attr.name, attr.type_name
            ),
            attr.span,
        );
    }

    if ctx.env.is_record(&attr.type_name) {
        // Record-typed columns restrict the execution engines the
        // surrounding tool may pick.
        restrictions.record_types = true;

        if ctx.io.is_input(&rel.name) {
            report.add_error(
                DiagnosticKind::Domain,
                format!(
                    "Input relations must not have record types. Attribute {} has record type {}",
                    attr.name, attr.type_name
                ),
                attr.span,
            );
        }
        if ctx.io.is_output(&rel.name) {
            report.add_warning(
                DiagnosticKind::Domain,
                format!(
                    "Record types in output relations are not printed verbatim: attribute {} has record type {}",
                    attr.name, attr.type_name
                ),
                attr.span,
            );
        }
    }
}

fn check_clause(ctx: &StructureContext, clause: &Clause, recursive: bool, report: &mut Report) {
    check_atom(ctx, &clause.head, report);

    if clause.head.args.iter().any(has_unnamed_variable) {
        report.add_error(
            DiagnosticKind::Shape,
            "Underscore in head of rule",
            clause.head.span,
        );
    }

    for lit in &clause.body {
        check_literal(ctx, lit, report);
    }

    if clause.is_fact() {
        check_fact(ctx, clause, report);
    }

    // Use-once variables are usually typos; a leading underscore opts
    // out.
    if !clause.generated {
        let mut counts: IndexMap<&str, (usize, Span)> = IndexMap::new();
        walk_clause(clause, &mut |arg| {
            if let ArgumentKind::Variable(name) = &arg.kind {
                let entry = counts.entry(name.as_str()).or_insert((0, arg.span));
                entry.0 += 1;
                entry.1 = arg.span;
            }
        });
        for (name, &(count, span)) in &counts {
            if count == 1 && !name.starts_with('_') {
                report.add_warning(
                    DiagnosticKind::Style,
                    format!("Variable {} only occurs once", name),
                    span,
                );
            }
        }
    }

    if let Some(plan) = &clause.plan {
        let num_atoms = clause.body_atoms().count();
        for order in plan.orders.values() {
            if !order.is_complete(num_atoms) {
                report.add_error(DiagnosticKind::Shape, "Invalid execution plan", order.span);
            }
        }
    }

    if recursive {
        walk_clause(clause, &mut |arg| {
            if matches!(arg.kind, ArgumentKind::Counter) {
                report.add_error(
                    DiagnosticKind::Shape,
                    "Auto-increment functor in a recursive rule",
                    arg.span,
                );
            }
        });
    }
}

fn check_literal(ctx: &StructureContext, lit: &Literal, report: &mut Report) {
    match lit {
        Literal::Atom(atom) => check_atom(ctx, atom, report),
        Literal::Negation(neg) => check_atom(ctx, &neg.atom, report),
        Literal::Constraint(c) => {
            check_argument(ctx, &c.lhs, report);
            check_argument(ctx, &c.rhs, report);
            if has_unnamed_variable(&c.lhs) || has_unnamed_variable(&c.rhs) {
                report.add_error(
                    DiagnosticKind::Shape,
                    "Underscore in binary constraint",
                    c.span,
                );
            }
        }
    }
}

fn check_atom(ctx: &StructureContext, atom: &Atom, report: &mut Report) {
    match ctx.program.relation(&atom.name) {
        None => report.add_error(
            DiagnosticKind::Reference,
            format!("Undefined relation {}", atom.name),
            atom.span,
        ),
        Some(rel) => {
            if rel.arity() != atom.arity() {
                report.add_error(
                    DiagnosticKind::Arity,
                    format!("Mismatching arity of relation {}", atom.name),
                    atom.span,
                );
            }
        }
    }
    for arg in &atom.args {
        check_argument(ctx, arg, report);
    }
}

/// Check atoms nested in an argument (aggregator bodies).
fn check_argument(ctx: &StructureContext, arg: &Argument, report: &mut Report) {
    match &arg.kind {
        ArgumentKind::Aggregator { body, .. } => {
            for lit in body {
                check_literal(ctx, lit, report);
            }
        }
        ArgumentKind::TypeCast { value, .. } => check_argument(ctx, value, report),
        ArgumentKind::Intrinsic { args, .. }
        | ArgumentKind::UserFunctor { args, .. }
        | ArgumentKind::RecordInit { args, .. } => {
            for child in args {
                check_argument(ctx, child, report);
            }
        }
        _ => {}
    }
}

fn has_unnamed_variable(arg: &Argument) -> bool {
    match &arg.kind {
        ArgumentKind::Unnamed => true,
        ArgumentKind::Variable(_)
        | ArgumentKind::Number(_)
        | ArgumentKind::Text(_)
        | ArgumentKind::Nil
        | ArgumentKind::Counter
        // Aggregators ground whatever they quantify; underscores inside
        // them are not head/constraint underscores.
        | ArgumentKind::Aggregator { .. } => false,
        ArgumentKind::TypeCast { value, .. } => has_unnamed_variable(value),
        ArgumentKind::Intrinsic { args, .. }
        | ArgumentKind::UserFunctor { args, .. }
        | ArgumentKind::RecordInit { args, .. } => args.iter().any(has_unnamed_variable),
    }
}

// ----- facts -----

fn check_fact(ctx: &StructureContext, fact: &Clause, report: &mut Report) {
    // An undefined head relation is already reported by the atom check.
    if ctx.program.relation(&fact.head.name).is_none() {
        return;
    }
    for arg in &fact.head.args {
        check_constant_term(arg, report);
    }
}

fn check_constant_term(arg: &Argument, report: &mut Report) {
    match &arg.kind {
        ArgumentKind::Variable(name) => report.add_error(
            DiagnosticKind::Shape,
            format!("Variable {} in fact", name),
            arg.span,
        ),
        ArgumentKind::Unnamed => {
            report.add_error(DiagnosticKind::Shape, "Underscore in fact", arg.span)
        }
        ArgumentKind::Counter => {
            report.add_error(DiagnosticKind::Shape, "Counter in fact", arg.span)
        }
        ArgumentKind::UserFunctor { .. } => {
            report.add_error(DiagnosticKind::Shape, "User-defined functor in fact", arg.span)
        }
        ArgumentKind::Aggregator { .. } => {
            report.add_error(DiagnosticKind::Shape, "Aggregator in fact", arg.span)
        }
        ArgumentKind::Intrinsic { .. } => {
            if !is_constant_arithmetic(arg) {
                report.add_error(DiagnosticKind::Shape, "Function in fact", arg.span);
            }
        }
        ArgumentKind::TypeCast { value, .. } => check_constant_term(value, report),
        ArgumentKind::RecordInit { args, .. } => {
            for child in args {
                check_constant_term(child, report);
            }
        }
        ArgumentKind::Number(_) | ArgumentKind::Text(_) | ArgumentKind::Nil => {}
    }
}

/// Numeric intrinsics over number constants all the way down; the only
/// functor shape a fact may carry.
fn is_constant_arithmetic(arg: &Argument) -> bool {
    match &arg.kind {
        ArgumentKind::Number(_) => true,
        ArgumentKind::Intrinsic { op, args } => {
            op.is_numeric() && args.iter().all(is_constant_arithmetic)
        }
        _ => false,
    }
}

// ----- I/O directives -----

fn check_io_directives(
    ctx: &StructureContext,
    report: &mut Report,
    restrictions: &mut EngineRestrictions,
) {
    for directive in &ctx.program.directives {
        if directive.properties.get("IO").map(String::as_str) == Some("sqlite") {
            restrictions.sqlite_io = true;
        }
        if ctx.program.relation(&directive.relation).is_none() {
            report.add_error(
                DiagnosticKind::Reference,
                format!("Undefined relation {}", directive.relation),
                directive.span,
            );
        }
    }
}

// ----- groundedness -----

fn check_groundedness(ctx: &StructureContext, report: &mut Report) {
    for rel in ctx.program.relations.values() {
        for clause in &rel.clauses {
            if clause.is_fact() {
                continue;
            }
            let grounded = Groundedness::of_clause(clause);
            let args = stratal_ast::ArgumentList::of_clause(clause);

            // Each variable is reported once, at its first ungrounded
            // occurrence.
            let mut reported: IndexSet<&str> = IndexSet::new();
            for (idx, arg) in args.iter() {
                if let ArgumentKind::Variable(name) = &arg.kind {
                    if !grounded.is_grounded(idx) && reported.insert(name.as_str()) {
                        report.add_error(
                            DiagnosticKind::Grounding,
                            format!("Ungrounded variable {}", name),
                            arg.span,
                        );
                    }
                }
            }
            for (idx, arg) in args.iter() {
                if matches!(arg.kind, ArgumentKind::RecordInit { .. })
                    && !grounded.is_grounded(idx)
                {
                    report.add_error(DiagnosticKind::Grounding, "Ungrounded record", arg.span);
                }
            }
        }
    }
}

// ----- type usage -----

fn check_type_usage(
    ctx: &StructureContext,
    report: &mut Report,
    restrictions: &mut EngineRestrictions,
) {
    for rel in ctx.program.relations.values() {
        for clause in &rel.clauses {
            walk_clause(clause, &mut |arg| match &arg.kind {
                ArgumentKind::TypeCast { type_name, .. } => {
                    if !is_builtin_type(type_name) && ctx.program.type_decl(type_name).is_none() {
                        report.add_error(
                            DiagnosticKind::Reference,
                            format!("Type cast is to undeclared type {}", type_name),
                            arg.span,
                        );
                    }
                }
                ArgumentKind::RecordInit { type_name, args } => {
                    match ctx.program.type_decl(type_name) {
                        None => report.add_error(
                            DiagnosticKind::Reference,
                            format!("Type {} has not been declared", type_name),
                            arg.span,
                        ),
                        Some(decl) => match &decl.kind {
                            TypeDeclKind::Record(fields) => {
                                if fields.len() != args.len() {
                                    report.add_error(
                                        DiagnosticKind::Arity,
                                        "Wrong number of arguments given to record",
                                        arg.span,
                                    );
                                } else {
                                    restrictions.record_types = true;
                                }
                            }
                            _ => report.add_error(
                                DiagnosticKind::Typing,
                                format!("Type {} is not a record type", type_name),
                                arg.span,
                            ),
                        },
                    }
                }
                ArgumentKind::Number(value) => {
                    if *value < MIN_DOMAIN || *value > MAX_DOMAIN {
                        report.add_error(
                            DiagnosticKind::Domain,
                            format!("Number constant not in range [{}, {}]", MIN_DOMAIN, MAX_DOMAIN),
                            arg.span,
                        );
                    }
                }
                ArgumentKind::UserFunctor { name, args } => match ctx.program.functor(name) {
                    None => report.add_error(
                        DiagnosticKind::Reference,
                        "User-defined functor hasn't been declared",
                        arg.span,
                    ),
                    Some(decl) => {
                        if decl.arity() != args.len() {
                            report.add_error(
                                DiagnosticKind::Arity,
                                "Mismatching number of arguments of functor",
                                arg.span,
                            );
                        }
                    }
                },
                _ => {}
            });
        }
    }
}

// ----- type correctness -----

fn check_type_correctness(ctx: &StructureContext, report: &mut Report) {
    if !ctx.lattice.is_valid() {
        report.add(Diagnostic::program_error(
            DiagnosticKind::Typing,
            "No type checking could occur due to other errors present",
        ));
        return;
    }
    if ctx.witness.skipped_clauses {
        report.add(Diagnostic::program_error(
            DiagnosticKind::Typing,
            "Not all clauses could be typechecked due to other errors present",
        ));
    }

    for (rel_idx, rel) in ctx.program.relations.values().enumerate() {
        for (clause_idx, clause) in rel.clauses.iter().enumerate() {
            let Some(types) = ctx.witness.clause_types((rel_idx, clause_idx)) else {
                continue;
            };
            let grounded = Groundedness::of_clause(clause);
            let mut pass = CorrectnessPass {
                ctx,
                types,
                grounded,
                seen_vars: IndexSet::new(),
                idx: 0,
                report,
            };
            pass.visit_atom(&clause.head);
            for lit in &clause.body {
                pass.visit_literal(lit);
            }
        }
    }
}

/// One depth-first pass over a typed clause, checking each node against
/// its inferred type. The occurrence counter tracks the canonical walk
/// order, so `types[idx]` and `grounded` line up with the node at hand.
struct CorrectnessPass<'a, 'r> {
    ctx: &'a StructureContext<'a>,
    types: &'a [AnalysisType],
    grounded: Groundedness,
    seen_vars: IndexSet<&'a str>,
    idx: usize,
    report: &'r mut Report,
}

impl<'a> CorrectnessPass<'a, '_> {
    fn subtype(&self, a: &AnalysisType, b: &AnalysisType) -> bool {
        self.ctx.lattice.is_subtype(a, b)
    }

    fn visit_literal(&mut self, lit: &'a Literal) {
        match lit {
            Literal::Atom(atom) => self.visit_atom(atom),
            Literal::Negation(neg) => self.visit_atom(&neg.atom),
            Literal::Constraint(c) => {
                let lhs = self.visit_arg(&c.lhs);
                let rhs = self.visit_arg(&c.rhs);
                self.check_binary_constraint(c, lhs, rhs);
            }
        }
    }

    fn visit_atom(&mut self, atom: &'a Atom) {
        let arg_idxs: Vec<usize> = atom.args.iter().map(|arg| self.visit_arg(arg)).collect();

        let Some(rel) = self.ctx.program.relation(&atom.name) else {
            return;
        };
        if rel.arity() != atom.arity() {
            return;
        }
        for ((idx, arg), attr) in arg_idxs.iter().zip(&atom.args).zip(&rel.attributes) {
            let actual = &self.types[*idx];
            if !actual.is_valid() {
                continue;
            }
            let Some(expected) = self.ctx.lattice.analysis_type_of(&attr.type_name) else {
                continue;
            };
            if !self.subtype(actual, &expected) {
                self.report.add_error(
                    DiagnosticKind::Typing,
                    format!(
                        "Relation expects value of type {} but got argument of type {}",
                        attr.type_name, actual
                    ),
                    arg.span,
                );
            }
        }
    }

    fn visit_arg(&mut self, arg: &'a Argument) -> usize {
        let idx = self.idx;
        self.idx += 1;
        let ty = &self.types[idx];

        // Invalid inferred types are reported once per variable and
        // only for grounded terms; ungrounded ones are already covered
        // by the groundedness check.
        let mut report_invalid = self.grounded.is_grounded(idx);
        if let ArgumentKind::Variable(name) = &arg.kind {
            if !self.seen_vars.insert(name.as_str()) {
                report_invalid = false;
            }
        }
        if report_invalid && !ty.is_valid() {
            match ty {
                AnalysisType::BottomPrimitive(_) => self.report.add_error(
                    DiagnosticKind::Typing,
                    "Unable to deduce valid type for expression, as base types are disjoint",
                    arg.span,
                ),
                AnalysisType::Bottom => self.report.add_error(
                    DiagnosticKind::Typing,
                    "Unable to deduce valid type for expression, as primitive types are disjoint",
                    arg.span,
                ),
                // A grounded Top can only be a structurally mistyped
                // record constructor, reported at the record itself.
                AnalysisType::Top => {}
                _ => {}
            }
        }

        match &arg.kind {
            ArgumentKind::Variable(_)
            | ArgumentKind::Unnamed
            | ArgumentKind::Number(_)
            | ArgumentKind::Text(_)
            | ArgumentKind::Nil
            | ArgumentKind::Counter => {}
            ArgumentKind::TypeCast { value, type_name } => {
                let value_idx = self.visit_arg(value);
                self.check_cast(arg, type_name, idx, value_idx);
            }
            ArgumentKind::Intrinsic { op, args } => {
                let child_idxs: Vec<usize> = args.iter().map(|a| self.visit_arg(a)).collect();
                for (i, (&child, child_arg)) in child_idxs.iter().zip(args).enumerate() {
                    let child_ty = &self.types[child];
                    if !child_ty.is_valid() {
                        continue;
                    }
                    if op.accepts_symbol(i)
                        && !self.subtype(child_ty, &AnalysisType::TopPrimitive(Kind::Symbol))
                    {
                        self.report.add_error(
                            DiagnosticKind::Typing,
                            format!(
                                "Non-symbolic argument for functor, instead argument has type {}",
                                child_ty
                            ),
                            child_arg.span,
                        );
                    } else if op.accepts_number(i)
                        && !self.subtype(child_ty, &AnalysisType::TopPrimitive(Kind::Number))
                    {
                        self.report.add_error(
                            DiagnosticKind::Typing,
                            format!(
                                "Non-numeric argument for functor, instead argument has type {}",
                                child_ty
                            ),
                            child_arg.span,
                        );
                    }
                }
            }
            ArgumentKind::UserFunctor { name, args } => {
                let child_idxs: Vec<usize> = args.iter().map(|a| self.visit_arg(a)).collect();
                let Some(decl) = self.ctx.program.functor(name) else {
                    return idx;
                };
                if decl.arity() != args.len() {
                    return idx;
                }
                for (i, (&child, child_arg)) in child_idxs.iter().zip(args).enumerate() {
                    let child_ty = &self.types[child];
                    if !child_ty.is_valid() {
                        continue;
                    }
                    if decl.accepts_symbol(i)
                        && !self.subtype(child_ty, &AnalysisType::TopPrimitive(Kind::Symbol))
                    {
                        self.report.add_error(
                            DiagnosticKind::Typing,
                            format!(
                                "Non-symbolic argument for functor, instead argument has type {}",
                                child_ty
                            ),
                            child_arg.span,
                        );
                    } else if decl.accepts_number(i)
                        && !self.subtype(child_ty, &AnalysisType::TopPrimitive(Kind::Number))
                    {
                        self.report.add_error(
                            DiagnosticKind::Typing,
                            format!(
                                "Non-numeric argument for functor, instead argument has type {}",
                                child_ty
                            ),
                            child_arg.span,
                        );
                    }
                }
            }
            ArgumentKind::RecordInit { type_name, args } => {
                let child_idxs: Vec<usize> = args.iter().map(|a| self.visit_arg(a)).collect();
                if !self.grounded.is_grounded(idx) {
                    return idx;
                }
                if self.types[idx] == AnalysisType::Top {
                    self.report.add_error(
                        DiagnosticKind::Typing,
                        format!(
                            "Unable to deduce type {} as record is not grounded as a record elsewhere, and at least one of its elements has the wrong type",
                            type_name
                        ),
                        arg.span,
                    );
                }
                let Some(decl) = self.ctx.program.type_decl(type_name) else {
                    return idx;
                };
                let TypeDeclKind::Record(fields) = &decl.kind else {
                    return idx;
                };
                if fields.len() != args.len() {
                    return idx;
                }
                for ((&child, child_arg), field) in child_idxs.iter().zip(args).zip(fields) {
                    let actual = &self.types[child];
                    if !actual.is_valid() {
                        continue;
                    }
                    let Some(field_type) = self.ctx.lattice.analysis_type_of(&field.type_name)
                    else {
                        continue;
                    };
                    if !self.subtype(actual, &field_type) {
                        self.report.add_error(
                            DiagnosticKind::Typing,
                            format!(
                                "Record constructor expects element to have type {} but instead it has type {}",
                                field_type, actual
                            ),
                            child_arg.span,
                        );
                    }
                }
            }
            ArgumentKind::Aggregator { op, target, body } => {
                let target_idx = target.as_ref().map(|t| self.visit_arg(t));
                for lit in body {
                    self.visit_literal(lit);
                }
                if *op != stratal_ast::AggregateOp::Count {
                    if let (Some(target_idx), Some(target)) = (target_idx, target) {
                        let target_ty = &self.types[target_idx];
                        if target_ty.is_valid()
                            && !self
                                .subtype(target_ty, &AnalysisType::TopPrimitive(Kind::Number))
                        {
                            self.report.add_error(
                                DiagnosticKind::Typing,
                                format!(
                                    "Aggregation variable is not a number, instead has type {}",
                                    target_ty
                                ),
                                target.span,
                            );
                        }
                    }
                }
            }
        }

        idx
    }

    /// The inferred type of a cast must *equal* the declared type, not
    /// merely be a subtype of it; `cast_check_uses_equality_not_subtyping`
    /// pins this down.
    fn check_cast(&mut self, arg: &Argument, type_name: &str, idx: usize, value_idx: usize) {
        let cast_ty = &self.types[idx];
        if !cast_ty.is_valid() {
            return;
        }
        let Some(expected) = self.ctx.lattice.analysis_type_of(type_name) else {
            return;
        };
        if *cast_ty != expected {
            self.report.add_error(
                DiagnosticKind::Typing,
                format!(
                    "Typecast is to type {} but is used where the type {} is expected",
                    type_name, cast_ty
                ),
                arg.span,
            );
        }

        let input = &self.types[value_idx];
        if !input.is_valid() {
            return;
        }
        let (Some(input_kind), Some(output_kind)) = (input.kind(), expected.kind()) else {
            return;
        };
        if !self.subtype(input, &AnalysisType::TopPrimitive(output_kind)) {
            self.report.add_warning(
                DiagnosticKind::Typing,
                format!(
                    "Casts from {} values to {} types may cause runtime errors",
                    input_kind, output_kind
                ),
                arg.span,
            );
        } else if output_kind == Kind::Record && !self.subtype(input, &expected) {
            self.report.add_warning(
                DiagnosticKind::Typing,
                "Casting a record to the wrong record type may cause runtime errors",
                arg.span,
            );
        }
    }

    fn check_binary_constraint(&mut self, c: &BinaryConstraint, lhs: usize, rhs: usize) {
        let lhs_ty = &self.types[lhs];
        let rhs_ty = &self.types[rhs];
        match c.op {
            ConstraintOp::Eq => {}
            ConstraintOp::Ne => {
                if !lhs_ty.is_valid() || !rhs_ty.is_valid() {
                    return;
                }
                let (Some(lk), Some(rk)) = (lhs_ty.kind(), rhs_ty.kind()) else {
                    return;
                };
                if lk != rk {
                    self.report.add_error(
                        DiagnosticKind::Typing,
                        format!(
                            "Cannot compare operands of different kinds, left operand is a {} and right operand is a {}",
                            lk, rk
                        ),
                        c.span,
                    );
                } else if lk == Kind::Record
                    && !(self.subtype(lhs_ty, rhs_ty) && self.subtype(rhs_ty, lhs_ty))
                {
                    self.report.add_error(
                        DiagnosticKind::Typing,
                        "Cannot compare records of different types",
                        c.span,
                    );
                }
            }
            op if op.is_numeric() => {
                let bound = AnalysisType::TopPrimitive(Kind::Number);
                if lhs_ty.is_valid() && !self.subtype(lhs_ty, &bound) {
                    self.report.add_error(
                        DiagnosticKind::Typing,
                        format!(
                            "Non-numerical operand for comparison, instead left operand has type {}",
                            lhs_ty
                        ),
                        c.lhs.span,
                    );
                }
                if rhs_ty.is_valid() && !self.subtype(rhs_ty, &bound) {
                    self.report.add_error(
                        DiagnosticKind::Typing,
                        format!(
                            "Non-numerical operand for comparison, instead right operand has type {}",
                            rhs_ty
                        ),
                        c.rhs.span,
                    );
                }
            }
            op if op.is_symbolic() => {
                let bound = AnalysisType::TopPrimitive(Kind::Symbol);
                if lhs_ty.is_valid() && !self.subtype(lhs_ty, &bound) {
                    self.report.add_error(
                        DiagnosticKind::Typing,
                        format!(
                            "Non-symbolic operand for comparison, instead left operand has type {}",
                            lhs_ty
                        ),
                        c.lhs.span,
                    );
                }
                if rhs_ty.is_valid() && !self.subtype(rhs_ty, &bound) {
                    self.report.add_error(
                        DiagnosticKind::Typing,
                        format!(
                            "Non-symbolic operand for comparison, instead right operand has type {}",
                            rhs_ty
                        ),
                        c.rhs.span,
                    );
                }
            }
            _ => {}
        }
    }
}
