//! Per-clause type analysis.
//!
//! For every structurally sound clause, constraints are gathered
//! ([`constraints`]) and solved to a fixed point ([`solver`]); the
//! resulting per-occurrence analysis types form the typing witness the
//! type-correctness check and later compilation stages consume.
//!
//! Clauses that fail the structural prefilter (undefined relation,
//! wrong arity, undefined functor, malformed record, undefined cast
//! target) are skipped entirely and flagged on the witness; a single
//! diagnostic notes this during type correctness.

pub mod constraints;
pub mod solver;

use crate::config::CheckConfig;
use crate::lattice::{AnalysisType, TypeLattice};
use indexmap::IndexMap;
use stratal_ast::{
    is_builtin_type, ArgumentKind, ArgumentList, Clause, Program, TypeDeclKind,
};
use tracing::debug;

/// Identity of a clause: (relation index, clause index) in declaration
/// order.
pub type ClauseId = (usize, usize);

/// The typing witness: for each typechecked clause, the inferred
/// analysis type of every argument occurrence.
#[derive(Debug, Default)]
pub struct TypeWitness {
    clause_types: IndexMap<ClauseId, Vec<AnalysisType>>,
    /// The lattice itself was unusable; no clause was typechecked.
    pub lattice_valid: bool,
    /// At least one clause was skipped for structural reasons.
    pub skipped_clauses: bool,
}

impl TypeWitness {
    /// Per-occurrence types of a clause, `None` if it was skipped.
    pub fn clause_types(&self, id: ClauseId) -> Option<&[AnalysisType]> {
        self.clause_types.get(&id).map(|v| v.as_slice())
    }

    /// Type of one argument occurrence.
    pub fn type_of(&self, id: ClauseId, occurrence: usize) -> Option<&AnalysisType> {
        self.clause_types.get(&id)?.get(occurrence)
    }

    pub fn typed_clause_count(&self) -> usize {
        self.clause_types.len()
    }
}

/// A clause can be typechecked: every atom resolves with matching arity
/// and defined attribute types, every user functor matches its
/// declaration, every record constructor names a record type of
/// matching arity, and every cast names a defined type.
pub fn can_typecheck(program: &Program, clause: &Clause) -> bool {
    let mut valid = true;

    stratal_ast::walk_clause_atoms(clause, &mut |atom| {
        match program.relation(&atom.name) {
            None => valid = false,
            Some(rel) => {
                if rel.arity() != atom.arity() {
                    valid = false;
                } else {
                    for attr in &rel.attributes {
                        if !is_builtin_type(&attr.type_name)
                            && program.type_decl(&attr.type_name).is_none()
                        {
                            valid = false;
                            break;
                        }
                    }
                }
            }
        }
    });

    stratal_ast::walk_clause(clause, &mut |arg| match &arg.kind {
        ArgumentKind::UserFunctor { name, args } => match program.functor(name) {
            None => valid = false,
            Some(decl) => {
                if decl.arity() != args.len() {
                    valid = false;
                }
            }
        },
        ArgumentKind::RecordInit { type_name, args } => match program.type_decl(type_name) {
            Some(decl) => match &decl.kind {
                TypeDeclKind::Record(fields) => {
                    if fields.len() != args.len() {
                        valid = false;
                    }
                }
                _ => valid = false,
            },
            None => valid = false,
        },
        ArgumentKind::TypeCast { type_name, .. } => {
            if !is_builtin_type(type_name) && program.type_decl(type_name).is_none() {
                valid = false;
            }
        }
        _ => {}
    });

    valid
}

/// Run the type analysis over every relation clause.
///
/// Returns the witness plus, when `debug_report` is enabled, a textual
/// log of the constraints and types of each typechecked clause.
pub fn analyze(
    program: &Program,
    lattice: &TypeLattice,
    config: &CheckConfig,
) -> (TypeWitness, Option<String>) {
    let mut witness = TypeWitness {
        clause_types: IndexMap::new(),
        lattice_valid: lattice.is_valid(),
        skipped_clauses: false,
    };
    let mut log = config.debug_report.then(String::new);

    if !lattice.is_valid() {
        debug!("type environment inconsistent; skipping all typing");
        return (witness, log);
    }

    for (rel_idx, rel) in program.relations.values().enumerate() {
        for (clause_idx, clause) in rel.clauses.iter().enumerate() {
            if !can_typecheck(program, clause) {
                witness.skipped_clauses = true;
                continue;
            }

            let set = constraints::build(clause, program, lattice);
            let types = solver::solve(&set, lattice);

            if let Some(log) = log.as_mut() {
                let args = ArgumentList::of_clause(clause);
                log.push_str(&format!("Clause:\n{}\n\n", clause));
                log.push_str("\tConstraints:\n");
                for constraint in &set.constraints {
                    log.push_str(&format!("\t\t{}\n", constraint.render(&args)));
                }
                log.push_str("\tTypes:\n");
                for (idx, arg) in args.iter() {
                    log.push_str(&format!("\t\ttype({}) = {}\n", arg, types[idx]));
                }
                log.push('\n');
            }

            witness.clause_types.insert((rel_idx, clause_idx), types);
        }
    }

    debug!(
        typed = witness.typed_clause_count(),
        skipped = witness.skipped_clauses,
        "type analysis finished"
    );

    if witness.skipped_clauses {
        if let Some(log) = log.as_mut() {
            log.push_str("Some clauses were skipped as they cannot be typechecked\n");
        }
    }

    (witness, log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::TypeEnvironment;
    use stratal_ast::{Argument, Atom, Attribute, Clause, Literal, Relation, Span};

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

    fn simple_program() -> Program {
        let mut program = Program::new();
        program.add_relation(Relation::new("a", vec![attr("x", "number")], sp()));
        program.add_relation(Relation::new("b", vec![attr("x", "number")], sp()));
        program.add_clause(Clause::new(
            Atom::new("a", vec![Argument::var("x", sp())], sp()),
            vec![Literal::Atom(Atom::new(
                "b",
                vec![Argument::var("x", sp())],
                sp(),
            ))],
            sp(),
        ));
        program
    }

    #[test]
    fn sound_clause_is_typed() {
        let program = simple_program();
        let env = TypeEnvironment::build(&program);
        let lattice = TypeLattice::new(&env);
        let (witness, log) = analyze(&program, &lattice, &CheckConfig::default());
        assert!(witness.lattice_valid);
        assert!(!witness.skipped_clauses);
        assert_eq!(witness.typed_clause_count(), 1);
        assert!(log.is_none());
        assert!(witness.type_of((0, 0), 0).is_some());
    }

    #[test]
    fn undefined_relation_skips_clause() {
        let mut program = simple_program();
        // a(x) :- ghost(x).
        program.relations.get_mut("a").unwrap().clauses[0] = Clause::new(
            Atom::new("a", vec![Argument::var("x", sp())], sp()),
            vec![Literal::Atom(Atom::new(
                "ghost",
                vec![Argument::var("x", sp())],
                sp(),
            ))],
            sp(),
        );
        let env = TypeEnvironment::build(&program);
        let lattice = TypeLattice::new(&env);
        let (witness, _) = analyze(&program, &lattice, &CheckConfig::default());
        assert!(witness.skipped_clauses);
        assert_eq!(witness.typed_clause_count(), 0);
    }

    #[test]
    fn debug_report_logs_constraints_and_types() {
        let program = simple_program();
        let env = TypeEnvironment::build(&program);
        let lattice = TypeLattice::new(&env);
        let config = CheckConfig {
            debug_report: true,
            ..Default::default()
        };
        let (_, log) = analyze(&program, &lattice, &config);
        let log = log.expect("debug report requested");
        assert!(log.contains("Clause:"));
        assert!(log.contains("Constraints:"));
        assert!(log.contains("type(x)"));
    }
}
