//! Precedence graph and recursion analysis.
//!
//! The precedence graph has an edge from a relation to every relation
//! referenced in one of its clause bodies, positively, negated, or
//! inside an aggregator. Strongly connected components are computed
//! once (Tarjan) in declaration order; stratification, inlining, and
//! the execution-plan check all consume the same graph.

use indexmap::{IndexMap, IndexSet};
use stratal_ast::{walk_literal_atoms, Program};

/// Directed dependency graph over declared relations.
#[derive(Debug)]
pub struct PrecedenceGraph {
    successors: IndexMap<String, IndexSet<String>>,
    sccs: Vec<Vec<String>>,
    scc_of: IndexMap<String, usize>,
    self_loops: IndexSet<String>,
}

impl PrecedenceGraph {
    pub fn build(program: &Program) -> Self {
        let mut successors: IndexMap<String, IndexSet<String>> = IndexMap::new();
        for name in program.relations.keys() {
            successors.insert(name.clone(), IndexSet::new());
        }

        for rel in program.relations.values() {
            for clause in &rel.clauses {
                for lit in &clause.body {
                    walk_literal_atoms(lit, &mut |atom| {
                        if program.relation(&atom.name).is_some() {
                            successors
                                .get_mut(&rel.name)
                                .expect("vertex seeded above")
                                .insert(atom.name.clone());
                        }
                    });
                }
            }
        }

        let self_loops: IndexSet<String> = successors
            .iter()
            .filter(|(name, succs)| succs.contains(*name))
            .map(|(name, _)| name.clone())
            .collect();

        let (sccs, scc_of) = tarjan(&successors);

        Self {
            successors,
            sccs,
            scc_of,
            self_loops,
        }
    }

    /// Direct successors of a relation, in first-reference order.
    pub fn successors(&self, relation: &str) -> impl Iterator<Item = &str> {
        self.successors
            .get(relation)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// A path of length ≥ 1 exists from `from` to `to`.
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        let mut seen = IndexSet::new();
        let mut queue: Vec<&str> = self.successors(from).collect();
        while let Some(current) = queue.pop() {
            if current == to {
                return true;
            }
            if seen.insert(current) {
                queue.extend(self.successors(current));
            }
        }
        false
    }

    /// Members of `relation`'s strongly connected component, in
    /// declaration order.
    pub fn clique(&self, relation: &str) -> &[String] {
        match self.scc_of.get(relation) {
            Some(&idx) => &self.sccs[idx],
            None => &[],
        }
    }

    pub fn scc_index(&self, relation: &str) -> Option<usize> {
        self.scc_of.get(relation).copied()
    }

    /// `relation` reaches itself.
    pub fn in_cycle(&self, relation: &str) -> bool {
        self.self_loops.contains(relation)
            || self
                .scc_of
                .get(relation)
                .map(|&idx| self.sccs[idx].len() > 1)
                .unwrap_or(false)
    }
}

/// Tarjan's SCC algorithm over the declaration-ordered vertex list.
/// Components come out in a deterministic order; members are sorted
/// back into declaration order for stable diagnostics.
fn tarjan(
    successors: &IndexMap<String, IndexSet<String>>,
) -> (Vec<Vec<String>>, IndexMap<String, usize>) {
    struct State<'a> {
        successors: &'a IndexMap<String, IndexSet<String>>,
        index: usize,
        indices: IndexMap<&'a str, usize>,
        lowlink: IndexMap<&'a str, usize>,
        stack: Vec<&'a str>,
        on_stack: IndexSet<&'a str>,
        sccs: Vec<Vec<String>>,
    }

    fn strongconnect<'a>(state: &mut State<'a>, v: &'a str) {
        state.indices.insert(v, state.index);
        state.lowlink.insert(v, state.index);
        state.index += 1;
        state.stack.push(v);
        state.on_stack.insert(v);

        let succs: Vec<&'a str> = state
            .successors
            .get(v)
            .into_iter()
            .flat_map(|s| s.iter().map(String::as_str))
            .collect();
        for w in succs {
            if !state.indices.contains_key(w) {
                strongconnect(state, w);
                let low = state.lowlink[w].min(state.lowlink[v]);
                state.lowlink.insert(v, low);
            } else if state.on_stack.contains(w) {
                let low = state.indices[w].min(state.lowlink[v]);
                state.lowlink.insert(v, low);
            }
        }

        if state.lowlink[v] == state.indices[v] {
            let mut component = Vec::new();
            while let Some(w) = state.stack.pop() {
                state.on_stack.shift_remove(w);
                component.push(w.to_string());
                if w == v {
                    break;
                }
            }
            state.sccs.push(component);
        }
    }

    let mut state = State {
        successors,
        index: 0,
        indices: IndexMap::new(),
        lowlink: IndexMap::new(),
        stack: Vec::new(),
        on_stack: IndexSet::new(),
        sccs: Vec::new(),
    };

    for v in successors.keys() {
        if !state.indices.contains_key(v.as_str()) {
            strongconnect(&mut state, v);
        }
    }

    let mut sccs = state.sccs;
    let decl_order: IndexMap<&str, usize> = successors
        .keys()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();
    for scc in &mut sccs {
        scc.sort_by_key(|name| decl_order[name.as_str()]);
    }

    let mut scc_of = IndexMap::new();
    for (idx, scc) in sccs.iter().enumerate() {
        for name in scc {
            scc_of.insert(name.clone(), idx);
        }
    }
    (sccs, scc_of)
}

/// Which clauses are recursive: a clause is recursive iff some body
/// atom's relation shares a strongly connected component with the head
/// relation.
#[derive(Debug)]
pub struct RecursiveClauses {
    recursive: IndexSet<(String, usize)>,
}

impl RecursiveClauses {
    pub fn build(program: &Program, graph: &PrecedenceGraph) -> Self {
        let mut recursive = IndexSet::new();
        for rel in program.relations.values() {
            let head_scc = graph.scc_index(&rel.name);
            for (clause_idx, clause) in rel.clauses.iter().enumerate() {
                let mut is_recursive = false;
                for lit in &clause.body {
                    walk_literal_atoms(lit, &mut |atom| {
                        if graph.scc_index(&atom.name).is_some()
                            && graph.scc_index(&atom.name) == head_scc
                        {
                            is_recursive = true;
                        }
                    });
                }
                if is_recursive {
                    recursive.insert((rel.name.clone(), clause_idx));
                }
            }
        }
        Self { recursive }
    }

    pub fn is_recursive(&self, relation: &str, clause_idx: usize) -> bool {
        self.recursive
            .contains(&(relation.to_string(), clause_idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratal_ast::{Argument, Atom, Clause, Literal, Negation, Relation, Span};

    fn sp() -> Span {
        Span::zero(0)
    }

    fn rule(head: &str, body: &[&str]) -> Clause {
        Clause::new(
            Atom::new(head, vec![Argument::var("x", sp())], sp()),
            body.iter()
                .map(|name| {
                    Literal::Atom(Atom::new(*name, vec![Argument::var("x", sp())], sp()))
                })
                .collect(),
            sp(),
        )
    }

    fn program(rules: &[(&str, &[&str])]) -> Program {
        let mut program = Program::new();
        for (head, _) in rules {
            if program.relation(head).is_none() {
                program.add_relation(Relation::new(*head, vec![], sp()));
            }
        }
        for (head, body) in rules {
            program.add_clause(rule(head, body));
        }
        program
    }

    #[test]
    fn edges_follow_body_references() {
        let program = program(&[("a", &["b"][..]), ("b", &[][..])]);
        let graph = PrecedenceGraph::build(&program);
        assert_eq!(graph.successors("a").collect::<Vec<_>>(), vec!["b"]);
        assert!(graph.reaches("a", "b"));
        assert!(!graph.reaches("b", "a"));
    }

    #[test]
    fn scc_groups_mutual_recursion() {
        let program = program(&[("a", &["b"][..]), ("b", &["a"][..]), ("c", &["a"][..])]);
        let graph = PrecedenceGraph::build(&program);
        assert_eq!(graph.clique("a"), &["a".to_string(), "b".to_string()]);
        assert!(graph.in_cycle("a"));
        assert!(graph.in_cycle("b"));
        assert!(!graph.in_cycle("c"));
        assert!(graph.reaches("a", "a"));
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let program = program(&[("a", &["a"][..])]);
        let graph = PrecedenceGraph::build(&program);
        assert!(graph.in_cycle("a"));
        assert_eq!(graph.clique("a").len(), 1);
    }

    #[test]
    fn negated_atoms_contribute_edges() {
        let mut p = Program::new();
        p.add_relation(Relation::new("a", vec![], sp()));
        p.add_relation(Relation::new("b", vec![], sp()));
        p.add_clause(Clause::new(
            Atom::new("a", vec![], sp()),
            vec![Literal::Negation(Negation {
                atom: Atom::new("b", vec![], sp()),
                span: sp(),
            })],
            sp(),
        ));
        let graph = PrecedenceGraph::build(&p);
        assert!(graph.reaches("a", "b"));
    }

    #[test]
    fn recursive_clauses_need_a_cycle() {
        let program = program(&[("a", &["b"][..]), ("b", &["a"][..]), ("c", &["b"][..])]);
        let graph = PrecedenceGraph::build(&program);
        let recursive = RecursiveClauses::build(&program, &graph);
        assert!(recursive.is_recursive("a", 0));
        assert!(recursive.is_recursive("b", 0));
        assert!(!recursive.is_recursive("c", 0));
    }
}
