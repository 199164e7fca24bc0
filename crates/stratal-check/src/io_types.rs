//! I/O classification of relations.
//!
//! A relation is an input if it is declared as one or named by a load
//! directive; an output if declared output/print-size or named by a
//! store or print-size directive.

use indexmap::IndexSet;
use stratal_ast::{DirectiveKind, Program};

/// Input/output classification derived from qualifiers and directives.
#[derive(Debug)]
pub struct IoTypes {
    inputs: IndexSet<String>,
    outputs: IndexSet<String>,
}

impl IoTypes {
    pub fn build(program: &Program) -> Self {
        let mut inputs = IndexSet::new();
        let mut outputs = IndexSet::new();

        for rel in program.relations.values() {
            if rel.is_input {
                inputs.insert(rel.name.clone());
            }
            if rel.is_output || rel.is_printsize {
                outputs.insert(rel.name.clone());
            }
        }
        for directive in &program.directives {
            match directive.kind {
                DirectiveKind::Load => {
                    inputs.insert(directive.relation.clone());
                }
                DirectiveKind::Store | DirectiveKind::PrintSize => {
                    outputs.insert(directive.relation.clone());
                }
            }
        }

        Self { inputs, outputs }
    }

    pub fn is_input(&self, relation: &str) -> bool {
        self.inputs.contains(relation)
    }

    pub fn is_output(&self, relation: &str) -> bool {
        self.outputs.contains(relation)
    }

    pub fn is_io(&self, relation: &str) -> bool {
        self.is_input(relation) || self.is_output(relation)
    }
}
