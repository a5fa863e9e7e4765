//! Join-graph traversal.
//!
//! The FROM clause and the cross-join check both walk the join graph in the
//! same order: a depth-first search over the from-tables, with edges running
//! from each join's left container to its right container. Tables are
//! emitted in reverse finishing order, so for an acyclic graph a join's left
//! table always precedes its right table.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;

use crate::model::{ContainerId, JoinId};
use crate::query::JoinRegistry;

/// Directed view of the join registry over the from-tables.
#[derive(Debug)]
pub struct JoinGraph {
    graph: DiGraph<ContainerId, JoinId>,
    roots: Vec<NodeIndex>,
}

impl JoinGraph {
    /// Build the graph. Joins whose endpoints are not both in `tables` are
    /// left out.
    pub fn build(tables: &[ContainerId], joins: &JoinRegistry) -> Self {
        let mut graph = DiGraph::with_capacity(tables.len(), joins.len());
        let mut nodes: HashMap<ContainerId, NodeIndex> = HashMap::with_capacity(tables.len());
        let mut roots = Vec::with_capacity(tables.len());

        for table in tables {
            if nodes.contains_key(table) {
                continue;
            }
            let node = graph.add_node(*table);
            nodes.insert(*table, node);
            roots.push(node);
        }

        for join in joins.iter() {
            let left = nodes.get(&join.left().container);
            let right = nodes.get(&join.right().container);
            if let (Some(&left), Some(&right)) = (left, right) {
                graph.add_edge(left, right, join.id());
            }
        }

        Self { graph, roots }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Tables in emission order.
    ///
    /// Roots are taken in reverse from-list order and each node's joins in
    /// registration order. Every node is prepended as it finishes, so tables
    /// with no joins between them keep their from-list order.
    pub fn finish_order(&self) -> Vec<ContainerId> {
        let Some(&start) = self.roots.last() else {
            return Vec::new();
        };

        let mut finished = Vec::with_capacity(self.graph.node_count());
        let mut dfs = DfsPostOrder::new(&self.graph, start);
        for &root in self.roots.iter().rev() {
            if dfs.finished.contains(root.index()) {
                continue;
            }
            dfs.move_to(root);
            while let Some(node) = dfs.next(&self.graph) {
                finished.push(self.graph[node]);
            }
        }
        finished.reverse();
        finished
    }
}

/// Emission order of `tables` under `joins`.
pub fn finish_order(tables: &[ContainerId], joins: &JoinRegistry) -> Vec<ContainerId> {
    JoinGraph::build(tables, joins).finish_order()
}

/// Does some table in emission order lack a join to every table before it?
pub fn has_cross_join(tables: &[ContainerId], joins: &JoinRegistry) -> bool {
    let order = finish_order(tables, joins);
    order
        .iter()
        .enumerate()
        .skip(1)
        .any(|(i, table)| !order[..i].iter().any(|earlier| joins.are_joined(*table, *earlier)))
}
