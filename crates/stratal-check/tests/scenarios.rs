//! End-to-end checks of the canonical error scenarios, driven through
//! the public `check_program` entry point.

use stratal_ast::{
    AggregateOp, Argument, ArgumentKind, Atom, Attribute, BinaryConstraint, Clause, ConstraintOp,
    IntrinsicOp, Literal, Negation, PrimitiveKind, Program, Relation, Span, TypeDecl, TypeDeclKind,
};
use stratal_check::{check_program, CheckConfig, DiagnosticKind, Report, Severity};

fn sp() -> Span {
    Span::zero(0)
}

fn attr(name: &str, ty: &str) -> Attribute {
    Attribute {
        name: name.into(),
        type_name: ty.into(),
        span: sp(),
    }
}

fn relation(name: &str, attrs: &[(&str, &str)]) -> Relation {
    Relation::new(
        name,
        attrs.iter().map(|(n, t)| attr(n, t)).collect(),
        sp(),
    )
}

fn var(name: &str) -> Argument {
    Argument::var(name, sp())
}

fn pos(name: &str, args: Vec<Argument>) -> Literal {
    Literal::Atom(Atom::new(name, args, sp()))
}

fn neg(name: &str, args: Vec<Argument>) -> Literal {
    Literal::Negation(Negation {
        atom: Atom::new(name, args, sp()),
        span: sp(),
    })
}

fn eq(lhs: Argument, rhs: Argument) -> Literal {
    Literal::Constraint(BinaryConstraint {
        op: ConstraintOp::Eq,
        lhs,
        rhs,
        span: sp(),
    })
}

fn errors_containing(report: &Report, needle: &str) -> usize {
    report
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Error && d.primary.message.contains(needle))
        .count()
}

#[test]
fn undefined_relation_in_body() {
    // .decl A(x:number)
    // A(x) :- B(x).
    let mut program = Program::new();
    program.add_relation(relation("A", &[("x", "number")]));
    program.add_clause(Clause::new(
        Atom::new("A", vec![var("x")], sp()),
        vec![pos("B", vec![var("x")])],
        sp(),
    ));

    let outcome = check_program(&mut program, &CheckConfig::default());
    assert_eq!(errors_containing(&outcome.report, "Undefined relation B"), 1);
    // The clause cannot be typechecked; the witness says so once.
    assert!(outcome.witness.skipped_clauses);
}

#[test]
fn ungrounded_head_variable() {
    // .decl A(x:number)
    // A(x) :- 1 = 1.
    let mut program = Program::new();
    program.add_relation(relation("A", &[("x", "number")]));
    program.add_clause(Clause::new(
        Atom::new("A", vec![var("x")], sp()),
        vec![eq(Argument::number(1, sp()), Argument::number(1, sp()))],
        sp(),
    ));

    let outcome = check_program(&mut program, &CheckConfig::default());
    assert_eq!(
        errors_containing(&outcome.report, "Ungrounded variable x"),
        1
    );
}

#[test]
fn union_mixing_symbol_and_number() {
    // .type T = number | symbol
    let mut program = Program::new();
    program.add_type(TypeDecl {
        name: "T".into(),
        kind: TypeDeclKind::Union(vec!["number".into(), "symbol".into()]),
        span: sp(),
    });

    let outcome = check_program(&mut program, &CheckConfig::default());
    assert_eq!(
        errors_containing(
            &outcome.report,
            "Union type T contains a mixture of symbol and number types"
        ),
        1
    );
    // The environment is unusable, so typing is skipped wholesale.
    assert!(!outcome.witness.lattice_valid);
    assert_eq!(
        errors_containing(&outcome.report, "No type checking could occur"),
        1
    );
}

#[test]
fn inline_cycle_is_reported_once() {
    // A and B are both inlined and mutually recursive.
    let mut program = Program::new();
    let mut a = relation("A", &[("x", "number")]);
    a.is_inline = true;
    let mut b = relation("B", &[("x", "number")]);
    b.is_inline = true;
    program.add_relation(a);
    program.add_relation(b);
    program.add_clause(Clause::new(
        Atom::new("A", vec![var("x")], sp()),
        vec![pos("B", vec![var("x")])],
        sp(),
    ));
    program.add_clause(Clause::new(
        Atom::new("B", vec![var("x")], sp()),
        vec![pos("A", vec![var("x")])],
        sp(),
    ));

    let outcome = check_program(&mut program, &CheckConfig::default());
    assert_eq!(
        errors_containing(
            &outcome.report,
            "Cannot inline cyclically dependent relations {A, B}"
        ),
        1
    );
}

#[test]
fn witness_problem_is_reported_at_outer_use() {
    // .decl R(x:number)  .decl S(y:number)
    // R(x) :- c = count : { S(y) }, x = y + 1.
    // y is grounded only by the aggregator's inner scope.
    let mut program = Program::new();
    program.add_relation(relation("R", &[("x", "number")]));
    program.add_relation(relation("S", &[("y", "number")]));
    let aggregate = Argument::new(
        ArgumentKind::Aggregator {
            op: AggregateOp::Count,
            target: None,
            body: vec![pos("S", vec![var("y")])],
        },
        sp(),
    );
    let y_plus_one = Argument::new(
        ArgumentKind::Intrinsic {
            op: IntrinsicOp::Add,
            args: vec![var("y"), Argument::number(1, sp())],
        },
        sp(),
    );
    program.add_clause(Clause::new(
        Atom::new("R", vec![var("x")], sp()),
        vec![eq(var("c"), aggregate), eq(var("x"), y_plus_one)],
        sp(),
    ));

    let outcome = check_program(&mut program, &CheckConfig::default());
    assert!(
        errors_containing(
            &outcome.report,
            "Witness problem: argument grounded by an aggregator's inner scope is used ungrounded in outer scope"
        ) >= 1
    );
}

#[test]
fn unstratifiable_negation_cycle() {
    // A(x) :- !B(x), C(x).   B(x) :- !A(x), C(x).
    let mut program = Program::new();
    program.add_relation(relation("A", &[("x", "number")]));
    program.add_relation(relation("B", &[("x", "number")]));
    program.add_relation(relation("C", &[("x", "number")]));
    program.add_clause(Clause::new(
        Atom::new("A", vec![var("x")], sp()),
        vec![neg("B", vec![var("x")]), pos("C", vec![var("x")])],
        sp(),
    ));
    program.add_clause(Clause::new(
        Atom::new("B", vec![var("x")], sp()),
        vec![neg("A", vec![var("x")]), pos("C", vec![var("x")])],
        sp(),
    ));

    let outcome = check_program(&mut program, &CheckConfig::default());
    let strat: Vec<_> = outcome
        .report
        .diagnostics()
        .iter()
        .filter(|d| d.kind == DiagnosticKind::Stratification)
        .collect();
    assert_eq!(strat.len(), 1, "one diagnostic per offending SCC");
    assert_eq!(
        strat[0].primary.message,
        "Unable to stratify relation(s) {A,B}"
    );
    assert_eq!(strat[0].related.len(), 2);
    assert!(strat[0].related[0].message.contains("has cyclic negation"));
}

#[test]
fn cast_check_uses_equality_not_subtyping() {
    // .type A <: number   .type AB = A | number
    // .decl R(x:AB)  .decl S(y:A)  .decl T(x:A)
    // R(x) :- S(y), x = (y as AB), T(x).
    // The cast's inferred type is A, a strict subtype of AB; the check
    // demands equality, so this is an error. Guards against silently
    // relaxing the cast check to subtyping.
    let mut program = Program::new();
    program.add_type(TypeDecl {
        name: "A".into(),
        kind: TypeDeclKind::Primitive(PrimitiveKind::Number),
        span: sp(),
    });
    program.add_type(TypeDecl {
        name: "AB".into(),
        kind: TypeDeclKind::Union(vec!["A".into(), "number".into()]),
        span: sp(),
    });
    program.add_relation(relation("R", &[("x", "AB")]));
    program.add_relation(relation("S", &[("y", "A")]));
    program.add_relation(relation("T", &[("x", "A")]));
    let cast = Argument::new(
        ArgumentKind::TypeCast {
            value: Box::new(var("y")),
            type_name: "AB".into(),
        },
        sp(),
    );
    program.add_clause(Clause::new(
        Atom::new("R", vec![var("x")], sp()),
        vec![
            pos("S", vec![var("y")]),
            eq(var("x"), cast),
            pos("T", vec![var("x")]),
        ],
        sp(),
    ));

    let outcome = check_program(&mut program, &CheckConfig::default());
    assert_eq!(
        errors_containing(
            &outcome.report,
            "Typecast is to type AB but is used where the type A is expected"
        ),
        1
    );
}
