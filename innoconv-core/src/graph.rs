//! Table dependency graph and cycle resolution.
//!
//! Nodes are parsed tables, edges point from the referencing table to the
//! referenced one. Strongly connected components are found with an
//! iterative Tarjan traversal; every edge inside a component is cyclic and
//! must be added after all tables exist. The remaining edges form a DAG
//! that is ordered with Kahn's algorithm.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::models::{ForeignKeyCandidate, TableDefinition};

/// Outcome of resolving the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No edge participates in a cycle
    Acyclic { order: Vec<String> },
    /// Some edges, listed in candidate order, lie on a cycle
    Cyclic {
        order: Vec<String>,
        cyclic_edges: Vec<ForeignKeyCandidate>,
    },
}

impl Resolution {
    /// Table names with every table after the tables it references through
    /// non-cyclic edges.
    pub fn order(&self) -> &[String] {
        match self {
            Resolution::Acyclic { order } | Resolution::Cyclic { order, .. } => order,
        }
    }

    pub fn cyclic_edges(&self) -> &[ForeignKeyCandidate] {
        match self {
            Resolution::Acyclic { .. } => &[],
            Resolution::Cyclic { cyclic_edges, .. } => cyclic_edges,
        }
    }

    pub fn is_cyclic(&self) -> bool {
        matches!(self, Resolution::Cyclic { .. })
    }

    pub fn is_cyclic_edge(&self, candidate: &ForeignKeyCandidate) -> bool {
        self.cyclic_edges().contains(candidate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    source: usize,
    target: usize,
}

/// Directed graph of table references.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Table names indexed by declaration order
    tables: Vec<String>,
    edges: Vec<Edge>,
    candidates: Vec<ForeignKeyCandidate>,
}

impl DependencyGraph {
    /// Builds the graph from parsed tables and the selected candidates.
    ///
    /// Candidates naming a table outside `tables` are ignored.
    pub fn build(tables: &[TableDefinition], candidates: &[ForeignKeyCandidate]) -> Self {
        let mut sorted: Vec<&TableDefinition> = tables.iter().collect();
        sorted.sort_by_key(|t| t.declaration_index);

        let index: HashMap<&str, usize> = sorted
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();

        let mut graph = Self {
            tables: sorted.iter().map(|t| t.name.clone()).collect(),
            ..Self::default()
        };

        for candidate in candidates {
            let endpoints = (
                index.get(candidate.source_table.as_str()),
                index.get(candidate.target_table.as_str()),
            );
            if let (Some(&source), Some(&target)) = endpoints {
                graph.edges.push(Edge { source, target });
                graph.candidates.push(candidate.clone());
            } else {
                debug!("Edge {} names an unknown table", candidate);
            }
        }

        graph
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Detects cycles and orders the tables.
    pub fn resolve(&self) -> Resolution {
        let components = self.strongly_connected_components();
        let (cyclic, acyclic): (Vec<usize>, Vec<usize>) = (0..self.edges.len())
            .partition(|&e| components[self.edges[e].source] == components[self.edges[e].target]);

        let order = self.topological_order(&acyclic);

        if cyclic.is_empty() {
            return Resolution::Acyclic { order };
        }

        let cyclic_edges: Vec<ForeignKeyCandidate> =
            cyclic.iter().map(|&e| self.candidates[e].clone()).collect();
        for edge in &cyclic_edges {
            info!("Foreign key {} is part of a cycle and will be deferred", edge);
        }
        Resolution::Cyclic {
            order,
            cyclic_edges,
        }
    }

    /// Component id for every table, using Tarjan's algorithm with an
    /// explicit call stack.
    fn strongly_connected_components(&self) -> Vec<usize> {
        const UNVISITED: usize = usize::MAX;

        let count = self.tables.len();
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); count];
        for edge in &self.edges {
            adjacency[edge.source].push(edge.target);
        }

        let mut index = vec![UNVISITED; count];
        let mut lowlink = vec![0; count];
        let mut on_stack = vec![false; count];
        let mut component = vec![UNVISITED; count];
        let mut stack: Vec<usize> = Vec::new();
        let mut next_index = 0;
        let mut next_component = 0;

        for root in 0..count {
            if index[root] != UNVISITED {
                continue;
            }

            // Frames are (node, position of the next outgoing edge)
            let mut frames: Vec<(usize, usize)> = vec![(root, 0)];
            index[root] = next_index;
            lowlink[root] = next_index;
            next_index += 1;
            stack.push(root);
            on_stack[root] = true;

            while let Some(frame) = frames.last_mut() {
                let node = frame.0;
                let next = adjacency[node].get(frame.1).copied();
                frame.1 += 1;

                match next {
                    Some(next) if index[next] == UNVISITED => {
                        index[next] = next_index;
                        lowlink[next] = next_index;
                        next_index += 1;
                        stack.push(next);
                        on_stack[next] = true;
                        frames.push((next, 0));
                    }
                    Some(next) => {
                        if on_stack[next] {
                            lowlink[node] = lowlink[node].min(index[next]);
                        }
                    }
                    None => {
                        frames.pop();
                        if let Some(&(parent, _)) = frames.last() {
                            lowlink[parent] = lowlink[parent].min(lowlink[node]);
                        }
                        if lowlink[node] == index[node] {
                            while let Some(member) = stack.pop() {
                                on_stack[member] = false;
                                component[member] = next_component;
                                if member == node {
                                    break;
                                }
                            }
                            next_component += 1;
                        }
                    }
                }
            }
        }

        component
    }

    /// Kahn's algorithm over the given edges, referenced tables first.
    ///
    /// Among tables that are ready at the same time the earlier declared
    /// one comes first.
    fn topological_order(&self, edges: &[usize]) -> Vec<String> {
        let count = self.tables.len();
        let mut pending = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

        for &e in edges {
            let Edge { source, target } = self.edges[e];
            pending[source] += 1;
            dependents[target].push(source);
        }

        let mut ready: BTreeSet<usize> = (0..count).filter(|&t| pending[t] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while let Some(table) = ready.pop_first() {
            order.push(self.tables[table].clone());
            for &dependent in &dependents[table] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateRank, InferenceRule};

    fn tables(names: &[&str]) -> Vec<TableDefinition> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| TableDefinition {
                name: (*name).to_string(),
                columns: Vec::new(),
                primary_key: vec!["id".to_string()],
                engine: None,
                existing_foreign_keys: Vec::new(),
                declaration_index: i,
                line: i + 1,
                layout: Default::default(),
            })
            .collect()
    }

    fn edge(source: &str, target: &str) -> ForeignKeyCandidate {
        ForeignKeyCandidate {
            source_table: source.to_string(),
            source_column: format!("{target}_id"),
            target_table: target.to_string(),
            target_column: "id".to_string(),
            rank: CandidateRank {
                rule: InferenceRule::SnakeSuffix,
                distance: 0,
                target_table: target.to_string(),
            },
        }
    }

    fn resolve(names: &[&str], edges: &[ForeignKeyCandidate]) -> Resolution {
        DependencyGraph::build(&tables(names), edges).resolve()
    }

    #[test]
    fn test_acyclic_order_puts_targets_first() {
        let resolution = resolve(&["races", "drivers"], &[edge("races", "drivers")]);
        assert_eq!(
            resolution,
            Resolution::Acyclic {
                order: vec!["drivers".to_string(), "races".to_string()],
            }
        );
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        let resolution = resolve(&["c", "b", "a", "d"], &[edge("d", "a")]);
        assert_eq!(resolution.order(), ["c", "b", "a", "d"]);
    }

    #[test]
    fn test_two_table_cycle() {
        let edges = [edge("a", "b"), edge("b", "a")];
        let resolution = resolve(&["a", "b"], &edges);

        assert!(resolution.is_cyclic());
        assert_eq!(resolution.cyclic_edges(), edges);
        assert_eq!(resolution.order(), ["a", "b"]);
    }

    #[test]
    fn test_self_loop_is_cyclic() {
        let edges = [edge("employees", "employees")];
        let resolution = resolve(&["employees"], &edges);
        assert_eq!(resolution.cyclic_edges(), edges);
    }

    #[test]
    fn test_cycle_with_acyclic_tail() {
        // x -> y -> z -> x is a cycle; w -> x and x -> v are not.
        let edges = [
            edge("x", "y"),
            edge("y", "z"),
            edge("z", "x"),
            edge("w", "x"),
            edge("x", "v"),
        ];
        let resolution = resolve(&["w", "x", "y", "z", "v"], &edges);

        assert_eq!(resolution.cyclic_edges(), &edges[..3]);
        assert!(!resolution.is_cyclic_edge(&edges[3]));
        assert!(!resolution.is_cyclic_edge(&edges[4]));

        let order = resolution.order();
        let position = |name: &str| order.iter().position(|t| t == name).expect("table");
        assert_eq!(order.len(), 5);
        assert!(position("v") < position("x"));
        assert!(position("x") < position("w"));
    }

    #[test]
    fn test_unknown_tables_are_ignored() {
        let graph = DependencyGraph::build(&tables(&["a"]), &[edge("a", "missing")]);
        assert_eq!(graph.table_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.resolve().is_cyclic());
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let names: Vec<String> = (0..5000).map(|i| format!("t{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let edges: Vec<_> = refs.windows(2).map(|w| edge(w[0], w[1])).collect();

        let resolution = resolve(&refs, &edges);
        assert!(!resolution.is_cyclic());
        assert_eq!(resolution.order().first().map(String::as_str), Some("t4999"));
    }
}
