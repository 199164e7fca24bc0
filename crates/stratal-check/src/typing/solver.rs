//! Fixed-point constraint solver.
//!
//! Every representative occurrence starts at `Top`. Each pass applies
//! every unsatisfied constraint's tightening; since tightenings only
//! descend in a finite-height lattice, a pass that changes nothing is
//! reached after at most `O(|args| × lattice height)` iterations.

use super::constraints::ConstraintSet;
use crate::lattice::{AnalysisType, TypeLattice};
use tracing::trace;

/// Solve a clause's constraints; returns the inferred type of every
/// argument occurrence (variables resolved through their
/// representative).
pub fn solve(set: &ConstraintSet, lattice: &TypeLattice) -> Vec<AnalysisType> {
    let mut assign = vec![AnalysisType::Top; set.reps.len()];

    let mut passes = 0usize;
    let mut changed = true;
    while changed {
        changed = false;
        passes += 1;
        for constraint in &set.constraints {
            if !constraint.is_satisfied(&assign, lattice) {
                constraint.apply(&mut assign, lattice);
                changed = true;
            }
        }
    }
    trace!(passes, constraints = set.constraints.len(), "constraints solved");

    (0..set.reps.len())
        .map(|occurrence| assign[set.reps[occurrence]].clone())
        .collect()
}
