//! # stratal-check
//!
//! Semantic analysis for stratal Datalog programs.
//!
//! Given a parsed [`stratal_ast::Program`], the checker decides whether
//! the program is well-formed and produces:
//!
//! - an ordered diagnostic [`report::Report`] (errors and warnings,
//!   each anchored to a source span);
//! - a [`typing::TypeWitness`] mapping every argument occurrence to its
//!   inferred analysis type, consumed by later compilation stages;
//! - [`EngineRestrictions`] capability flags the surrounding tool uses
//!   to pick an execution engine.
//!
//! # Pipeline
//!
//! ```text
//! suppression sweep
//!     ↓
//! oracles: type environment, precedence graph, recursive clauses, I/O
//!     ↓
//! typing: constraints → fixed-point solver → witness     (typing)
//!     ↓
//! structural rules: namespaces, types, relations, clauses,
//!                   facts, I/O, groundedness, type usage,
//!                   type correctness                     (checks::structure)
//!     ↓
//! witness scopes → inlining feasibility → stratification
//!                → execution plans                       (witness, checks::*)
//! ```
//!
//! Every check is local and reports independently: a run always
//! produces the maximal report, and for a fixed program the diagnostic
//! sequence is identical across runs. The AST is read-only throughout,
//! except for the initial (idempotent) suppression sweep.
//!
//! # Example
//!
//! ```
//! use stratal_ast::{Atom, Clause, Program, Relation, Span};
//! use stratal_check::{check_program, CheckConfig};
//!
//! let mut program = Program::new();
//! program.add_relation(Relation::new("a", vec![], Span::zero(0)));
//! program.add_clause(Clause::new(
//!     Atom::new("a", vec![], Span::zero(0)),
//!     vec![],
//!     Span::zero(0),
//! ));
//!
//! let outcome = check_program(&mut program, &CheckConfig::default());
//! assert!(!outcome.report.has_errors());
//! ```

pub mod checks;
pub mod config;
pub mod env;
pub mod grounded;
pub mod io_types;
pub mod lattice;
pub mod precedence;
pub mod report;
pub mod typing;
pub mod witness;

pub use config::CheckConfig;
pub use report::{Diagnostic, DiagnosticKind, DiagnosticMessage, Report, Severity};
pub use typing::{ClauseId, TypeWitness};

use checks::structure::StructureContext;
use env::TypeEnvironment;
use io_types::IoTypes;
use lattice::TypeLattice;
use precedence::{PrecedenceGraph, RecursiveClauses};
use stratal_ast::Program;
use tracing::debug;

/// Engine capabilities the checked program rules out; the surrounding
/// tool consumes these when selecting an execution backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineRestrictions {
    /// The program uses record types somewhere.
    pub record_types: bool,
    /// Some I/O directive targets sqlite.
    pub sqlite_io: bool,
}

/// Everything a check run produces.
#[derive(Debug)]
pub struct CheckOutcome {
    pub report: Report,
    pub witness: TypeWitness,
    pub restrictions: EngineRestrictions,
    /// Per-clause constraint/type log, present when
    /// [`CheckConfig::debug_report`] is set.
    pub debug_log: Option<String>,
}

/// Mute warnings for the relations the configuration names. The only
/// AST mutation the checker performs; setting an already-set flag is a
/// no-op, so the sweep is idempotent.
pub fn apply_warning_suppression(program: &mut Program, config: &CheckConfig) {
    if config.suppresses_all() {
        for rel in program.relations.values_mut() {
            rel.suppressed = true;
        }
        return;
    }
    for name in &config.suppress_warnings {
        if let Some(rel) = program.relations.get_mut(name) {
            rel.suppressed = true;
        }
    }
}

/// Run the full semantic analysis over a program.
pub fn check_program(program: &mut Program, config: &CheckConfig) -> CheckOutcome {
    apply_warning_suppression(program, config);
    let program: &Program = program;

    let env = TypeEnvironment::build(program);
    let lattice = TypeLattice::new(&env);
    let graph = PrecedenceGraph::build(program);
    let recursive = RecursiveClauses::build(program, &graph);
    let io = IoTypes::build(program);

    let (typing_witness, debug_log) = typing::analyze(program, &lattice, config);

    let mut report = Report::new();
    let mut restrictions = EngineRestrictions::default();

    let ctx = StructureContext {
        program,
        env: &env,
        lattice: &lattice,
        witness: &typing_witness,
        recursive: &recursive,
        io: &io,
    };
    checks::structure::check(&ctx, &mut report, &mut restrictions);
    witness::check(program, &mut report);
    checks::inlining::check(program, &graph, &io, &mut report);
    checks::stratification::check(program, &graph, &mut report);
    checks::plan::check(program, &graph, &recursive, &mut report);

    debug!(
        errors = report.error_count(),
        warnings = report.warning_count(),
        "semantic analysis finished"
    );

    CheckOutcome {
        report,
        witness: typing_witness,
        restrictions,
        debug_log,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratal_ast::{Atom, Clause, Relation, Span};

    fn sp() -> Span {
        Span::zero(0)
    }

    #[test]
    fn empty_program_is_clean() {
        let mut program = Program::new();
        let outcome = check_program(&mut program, &CheckConfig::default());
        assert!(outcome.report.is_empty());
        assert!(outcome.witness.lattice_valid);
        assert_eq!(outcome.restrictions, EngineRestrictions::default());
    }

    #[test]
    fn suppression_sweep_targets_named_relations() {
        let mut program = Program::new();
        program.add_relation(Relation::new("a", vec![], sp()));
        program.add_relation(Relation::new("b", vec![], sp()));
        let config = CheckConfig::default().with_suppression_list("a");
        apply_warning_suppression(&mut program, &config);
        assert!(program.relation("a").unwrap().suppressed);
        assert!(!program.relation("b").unwrap().suppressed);
    }

    #[test]
    fn suppression_star_mutes_all() {
        let mut program = Program::new();
        program.add_relation(Relation::new("a", vec![], sp()));
        let config = CheckConfig::default().with_suppression_list("*");
        apply_warning_suppression(&mut program, &config);
        assert!(program.relation("a").unwrap().suppressed);
    }

    #[test]
    fn suppressed_relation_skips_empty_warning() {
        let mut program = Program::new();
        program.add_relation(Relation::new("quiet", vec![], sp()));
        let config = CheckConfig::default().with_suppression_list("quiet");
        let outcome = check_program(&mut program, &config);
        assert!(outcome.report.is_empty());

        let mut program = Program::new();
        program.add_relation(Relation::new("noisy", vec![], sp()));
        let outcome = check_program(&mut program, &CheckConfig::default());
        assert_eq!(outcome.report.warning_count(), 1);
    }

    #[test]
    fn fact_produces_no_diagnostics() {
        let mut program = Program::new();
        program.add_relation(Relation::new("a", vec![], sp()));
        program.add_clause(Clause::new(Atom::new("a", vec![], sp()), vec![], sp()));
        let outcome = check_program(&mut program, &CheckConfig::default());
        assert!(outcome.report.is_empty());
    }
}
