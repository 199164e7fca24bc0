//! Typing constraints and their emission.
//!
//! Walking a clause produces a set of constraints over its argument
//! occurrences. All occurrences of a variable with the same name are
//! collapsed to one *representative* occurrence (the first seen), so
//! constraints over that name share an equivalence class.
//!
//! Constraint kinds:
//!
//! - `Fixed(x, T)` — `x` must be a subtype of `T`;
//! - `Variable(x, y)` — `x` must be a subtype of `y`'s current type;
//! - `Union(x, y, z)` — `x` must be a subtype of `lub(y, z)`;
//! - `Implication(conseq; reqs…)` — once every requirement holds, the
//!   consequent is enforced.

use crate::lattice::{AnalysisType, Kind, TypeLattice};
use stratal_ast::{
    Argument, ArgumentKind, Atom, Clause, ConstraintOp, Literal, Program, TypeDeclKind,
};

/// `arg ≤ bound`, the building block of all constraint kinds.
#[derive(Debug, Clone)]
pub struct FixedBound {
    pub arg: usize,
    pub bound: AnalysisType,
}

impl FixedBound {
    fn is_satisfied(&self, assign: &[AnalysisType], lattice: &TypeLattice) -> bool {
        lattice.is_subtype(&assign[self.arg], &self.bound)
    }

    fn apply(&self, assign: &mut [AnalysisType], lattice: &TypeLattice) {
        let tightened = lattice.meet(&assign[self.arg], &self.bound);
        assign[self.arg] = tightened;
    }
}

/// A typing constraint over representative occurrences.
#[derive(Debug, Clone)]
pub enum Constraint {
    Fixed(FixedBound),
    Variable { arg: usize, source: usize },
    Union { arg: usize, lhs: usize, rhs: usize },
    Implication {
        consequent: FixedBound,
        requirements: Vec<FixedBound>,
    },
}

impl Constraint {
    pub fn fixed(arg: usize, bound: AnalysisType) -> Self {
        Constraint::Fixed(FixedBound { arg, bound })
    }

    pub fn is_satisfied(&self, assign: &[AnalysisType], lattice: &TypeLattice) -> bool {
        match self {
            Constraint::Fixed(fixed) => fixed.is_satisfied(assign, lattice),
            Constraint::Variable { arg, source } => {
                lattice.is_subtype(&assign[*arg], &assign[*source])
            }
            Constraint::Union { arg, lhs, rhs } => {
                let bound = lattice.join(&assign[*lhs], &assign[*rhs]);
                lattice.is_subtype(&assign[*arg], &bound)
            }
            Constraint::Implication {
                consequent,
                requirements,
            } => {
                if requirements.iter().all(|r| r.is_satisfied(assign, lattice)) {
                    consequent.is_satisfied(assign, lattice)
                } else {
                    true
                }
            }
        }
    }

    /// Tighten the assignment so this constraint moves toward
    /// satisfaction. Every application only descends in the lattice.
    pub fn apply(&self, assign: &mut [AnalysisType], lattice: &TypeLattice) {
        match self {
            Constraint::Fixed(fixed) => fixed.apply(assign, lattice),
            Constraint::Variable { arg, source } => {
                let tightened = lattice.meet(&assign[*arg], &assign[*source]);
                assign[*arg] = tightened;
            }
            Constraint::Union { arg, lhs, rhs } => {
                let bound = lattice.join(&assign[*lhs], &assign[*rhs]);
                let tightened = lattice.meet(&assign[*arg], &bound);
                assign[*arg] = tightened;
            }
            Constraint::Implication {
                consequent,
                requirements,
            } => {
                if requirements.iter().all(|r| r.is_satisfied(assign, lattice)) {
                    consequent.apply(assign, lattice);
                }
            }
        }
    }

    /// Render for the debug report, naming occurrences by display form.
    pub fn render(&self, args: &stratal_ast::ArgumentList<'_>) -> String {
        let name = |idx: &usize| args.get(*idx).to_string();
        match self {
            Constraint::Fixed(f) => format!("type({}) <: {}", name(&f.arg), f.bound),
            Constraint::Variable { arg, source } => {
                format!("type({}) <: type({})", name(arg), name(source))
            }
            Constraint::Union { arg, lhs, rhs } => format!(
                "type({}) <: lub(type({}), type({}))",
                name(arg),
                name(lhs),
                name(rhs)
            ),
            Constraint::Implication {
                consequent,
                requirements,
            } => {
                let reqs: Vec<String> = requirements
                    .iter()
                    .map(|r| format!("type({}) <: {}", name(&r.arg), r.bound))
                    .collect();
                format!(
                    "({}) => type({}) <: {}",
                    reqs.join(", "),
                    name(&consequent.arg),
                    consequent.bound
                )
            }
        }
    }
}

/// The constraints of one clause plus the representative map.
#[derive(Debug)]
pub struct ConstraintSet {
    pub constraints: Vec<Constraint>,
    /// Representative occurrence per occurrence; non-variables map to
    /// themselves, variables to their first occurrence.
    pub reps: Vec<usize>,
}

/// Walk a clause and emit its typing constraints.
///
/// Emissions follow the depth-first occurrence order of
/// [`stratal_ast::ArgumentList::of_clause`]: the head's children first
/// (the head atom itself imposes nothing), then each body literal.
pub fn build(clause: &Clause, program: &Program, lattice: &TypeLattice) -> ConstraintSet {
    let mut builder = Builder {
        program,
        lattice,
        reps: Vec::new(),
        var_reps: indexmap::IndexMap::new(),
        constraints: Vec::new(),
    };

    for arg in &clause.head.args {
        builder.emit_arg(arg);
    }
    for lit in &clause.body {
        builder.emit_literal(lit);
    }

    ConstraintSet {
        constraints: builder.constraints,
        reps: builder.reps,
    }
}

struct Builder<'a> {
    program: &'a Program,
    lattice: &'a TypeLattice<'a>,
    reps: Vec<usize>,
    var_reps: indexmap::IndexMap<String, usize>,
    constraints: Vec<Constraint>,
}

impl Builder<'_> {
    fn add(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    fn emit_literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Atom(atom) => self.emit_atom(atom, true),
            // A negated atom constrains nothing itself; only its
            // children's structural constraints are gathered.
            Literal::Negation(neg) => self.emit_atom(&neg.atom, false),
            Literal::Constraint(c) => {
                let lhs = self.emit_arg(&c.lhs);
                let rhs = self.emit_arg(&c.rhs);
                if c.op == ConstraintOp::Eq {
                    self.add(Constraint::Variable { arg: lhs, source: rhs });
                    self.add(Constraint::Variable { arg: rhs, source: lhs });
                }
            }
        }
    }

    fn emit_atom(&mut self, atom: &Atom, constrained: bool) {
        let arg_reps: Vec<usize> = atom.args.iter().map(|arg| self.emit_arg(arg)).collect();
        if !constrained {
            return;
        }
        let Some(rel) = self.program.relation(&atom.name) else {
            return;
        };
        if rel.arity() != atom.arity() {
            return;
        }
        for (rep, attr) in arg_reps.iter().zip(&rel.attributes) {
            if let Some(expected) = self.lattice.analysis_type_of(&attr.type_name) {
                self.add(Constraint::fixed(*rep, expected));
            }
        }
    }

    /// Emit the constraints of one argument subtree; returns the
    /// representative occurrence index of this node.
    fn emit_arg(&mut self, arg: &Argument) -> usize {
        let idx = self.reps.len();
        let rep = match &arg.kind {
            ArgumentKind::Variable(name) => *self.var_reps.entry(name.clone()).or_insert(idx),
            _ => idx,
        };
        self.reps.push(rep);

        match &arg.kind {
            ArgumentKind::Variable(_) | ArgumentKind::Unnamed => {}
            ArgumentKind::Counter | ArgumentKind::Number(_) => {
                self.add(Constraint::fixed(rep, AnalysisType::Constant(Kind::Number)));
            }
            ArgumentKind::Text(_) => {
                self.add(Constraint::fixed(rep, AnalysisType::Constant(Kind::Symbol)));
            }
            ArgumentKind::Nil => {
                self.add(Constraint::fixed(rep, AnalysisType::Constant(Kind::Record)));
            }
            ArgumentKind::TypeCast { value, type_name } => {
                self.emit_arg(value);
                if let Some(bound) = self.lattice.analysis_type_of(type_name) {
                    self.add(Constraint::fixed(rep, bound));
                }
            }
            ArgumentKind::Intrinsic { op, args } => {
                let children: Vec<usize> = args.iter().map(|a| self.emit_arg(a)).collect();
                if matches!(op, stratal_ast::IntrinsicOp::Max | stratal_ast::IntrinsicOp::Min) {
                    // The result of max/min is one of its operands.
                    if let [lhs, rhs] = children[..] {
                        self.add(Constraint::Union { arg: rep, lhs, rhs });
                    }
                } else {
                    let kind = if op.is_symbolic() { Kind::Symbol } else { Kind::Number };
                    self.add(Constraint::fixed(rep, AnalysisType::TopPrimitive(kind)));
                    // Applied to constants, the functor yields a constant.
                    let requirements = children
                        .iter()
                        .enumerate()
                        .map(|(i, &child)| FixedBound {
                            arg: child,
                            bound: AnalysisType::Constant(if op.accepts_symbol(i) {
                                Kind::Symbol
                            } else {
                                Kind::Number
                            }),
                        })
                        .collect();
                    self.add(Constraint::Implication {
                        consequent: FixedBound {
                            arg: rep,
                            bound: AnalysisType::Constant(kind),
                        },
                        requirements,
                    });
                }
            }
            ArgumentKind::UserFunctor { name, args } => {
                let children: Vec<usize> = args.iter().map(|a| self.emit_arg(a)).collect();
                let Some(decl) = self.program.functor(name) else {
                    return rep;
                };
                if decl.arity() != children.len() {
                    return rep;
                }
                let kind = if decl.is_symbolic() { Kind::Symbol } else { Kind::Number };
                self.add(Constraint::fixed(rep, AnalysisType::TopPrimitive(kind)));
                let requirements = children
                    .iter()
                    .enumerate()
                    .map(|(i, &child)| FixedBound {
                        arg: child,
                        bound: AnalysisType::Constant(if decl.accepts_symbol(i) {
                            Kind::Symbol
                        } else {
                            Kind::Number
                        }),
                    })
                    .collect();
                self.add(Constraint::Implication {
                    consequent: FixedBound {
                        arg: rep,
                        bound: AnalysisType::Constant(kind),
                    },
                    requirements,
                });
            }
            ArgumentKind::RecordInit { type_name, args } => {
                let children: Vec<usize> = args.iter().map(|a| self.emit_arg(a)).collect();
                let Some(decl) = self.program.type_decl(type_name) else {
                    return rep;
                };
                let TypeDeclKind::Record(fields) = &decl.kind else {
                    return rep;
                };
                if fields.len() != children.len() {
                    return rep;
                }
                let Some(record_type) = self.lattice.analysis_type_of(type_name) else {
                    return rep;
                };
                let field_types: Vec<Option<AnalysisType>> = fields
                    .iter()
                    .map(|f| self.lattice.analysis_type_of(&f.type_name))
                    .collect();

                // A record known to be a record grounds its elements'
                // types; conversely, well-typed elements type the record.
                let mut element_bounds = Vec::new();
                for (&child, field_type) in children.iter().zip(&field_types) {
                    let Some(field_type) = field_type else { continue };
                    self.add(Constraint::Implication {
                        consequent: FixedBound {
                            arg: child,
                            bound: field_type.clone(),
                        },
                        requirements: vec![FixedBound {
                            arg: rep,
                            bound: AnalysisType::TopPrimitive(Kind::Record),
                        }],
                    });
                    element_bounds.push(FixedBound {
                        arg: child,
                        bound: field_type.clone(),
                    });
                }
                self.add(Constraint::Implication {
                    consequent: FixedBound {
                        arg: rep,
                        bound: record_type,
                    },
                    requirements: element_bounds,
                });
            }
            ArgumentKind::Aggregator { op, target, body } => {
                let target_rep = target.as_ref().map(|t| self.emit_arg(t));
                for lit in body {
                    self.emit_literal(lit);
                }
                match op {
                    stratal_ast::AggregateOp::Count | stratal_ast::AggregateOp::Sum => {
                        self.add(Constraint::fixed(
                            rep,
                            AnalysisType::TopPrimitive(Kind::Number),
                        ));
                    }
                    stratal_ast::AggregateOp::Min | stratal_ast::AggregateOp::Max => {
                        if let Some(source) = target_rep {
                            self.add(Constraint::Variable { arg: rep, source });
                        }
                    }
                }
            }
        }

        rep
    }
}
