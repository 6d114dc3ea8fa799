//! Directed dependency graph over node ids, with deterministic topological
//! emission order.
//!
//! Edges run referencee -> referencer: a node becomes emittable once every
//! node it references has been emitted. Insertion order is the tie-breaker
//! throughout, so identical inputs linearize identically.

use hcl::{Body, Expression};
use indexmap::{IndexMap, IndexSet};

use crate::error::ConvertError;
use crate::scope::NodeId;

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

/// One variant per block kind; each carries the plan fragment its emitter
/// needs.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Provider {
        name: String,
        alias: Option<String>,
        config: Body,
    },
    Variable {
        name: String,
        config: Body,
    },
    Local {
        name: String,
        value: Expression,
    },
    Output {
        name: String,
        config: Body,
    },
    Module {
        name: String,
        config: Body,
    },
    Resource {
        ty: String,
        name: String,
        config: Body,
    },
    Data {
        ty: String,
        name: String,
        config: Body,
    },
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: IndexMap<NodeId, Node>,
    /// node -> the nodes it references (its predecessors in emission order).
    preds: IndexMap<NodeId, IndexSet<NodeId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node. Registering the same id twice keeps the first entry.
    pub fn add_node(&mut self, node: Node) {
        self.preds.entry(node.id.clone()).or_default();
        self.nodes.entry(node.id.clone()).or_insert(node);
    }

    /// Record that `referencer` depends on `referencee`. Both ends must be
    /// registered; discovery guarantees the referencee is, so a miss here is
    /// a bug rather than bad input. Intra-node references are not edges.
    pub fn add_edge(&mut self, referencee: &NodeId, referencer: &NodeId) -> Result<(), ConvertError> {
        if referencee == referencer {
            return Ok(());
        }
        if !self.nodes.contains_key(referencee) {
            return Err(ConvertError::MissingNode(referencee.to_string()));
        }
        if !self.nodes.contains_key(referencer) {
            return Err(ConvertError::MissingNode(referencer.to_string()));
        }
        self.preds
            .get_mut(referencer)
            .expect("registered above")
            .insert(referencee.clone());
        Ok(())
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn predecessors(&self, id: &NodeId) -> impl Iterator<Item = &NodeId> {
        self.preds.get(id).into_iter().flatten()
    }

    /// Linearize: repeatedly take every pending node whose references have
    /// all been emitted, in registration order. An iteration that makes no
    /// progress means the remainder is cyclic.
    pub fn emission_order(&self) -> Result<Vec<NodeId>, ConvertError> {
        let mut pending: IndexSet<NodeId> = self.nodes.keys().cloned().collect();
        let mut order = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let ready: Vec<NodeId> = pending
                .iter()
                .filter(|id| {
                    self.predecessors(id)
                        .all(|pred| !pending.contains(pred))
                })
                .cloned()
                .collect();
            if ready.is_empty() {
                return Err(ConvertError::CycleDetected {
                    unvisited: pending.iter().map(|id| id.to_string()).collect(),
                });
            }
            for id in ready {
                pending.shift_remove(&id);
                order.push(id);
            }
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: NodeId) -> Node {
        Node {
            kind: NodeKind::Local {
                name: id.to_string(),
                value: Expression::Null,
            },
            id,
        }
    }

    #[test]
    fn orders_by_registration_when_independent() {
        let mut g = DependencyGraph::new();
        let a = NodeId::local("a");
        let b = NodeId::local("b");
        g.add_node(node(a.clone()));
        g.add_node(node(b.clone()));
        assert_eq!(g.emission_order().unwrap(), vec![a, b]);
    }

    #[test]
    fn referencee_precedes_referencer() {
        let mut g = DependencyGraph::new();
        let a = NodeId::resource("null_resource", "a");
        let b = NodeId::resource("null_resource", "b");
        // b registered first but references a
        g.add_node(node(b.clone()));
        g.add_node(node(a.clone()));
        g.add_edge(&a, &b).unwrap();
        assert_eq!(g.emission_order().unwrap(), vec![a, b]);
    }

    #[test]
    fn detects_cycles_and_reports_unvisited() {
        let mut g = DependencyGraph::new();
        let a = NodeId::resource("null_resource", "a");
        let b = NodeId::resource("null_resource", "b");
        let c = NodeId::local("c");
        g.add_node(node(a.clone()));
        g.add_node(node(b.clone()));
        g.add_node(node(c.clone()));
        g.add_edge(&a, &b).unwrap();
        g.add_edge(&b, &a).unwrap();
        match g.emission_order().unwrap_err() {
            ConvertError::CycleDetected { unvisited } => {
                assert_eq!(
                    unvisited,
                    vec![
                        "resource.null_resource.a".to_string(),
                        "resource.null_resource.b".to_string()
                    ]
                );
            }
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn self_reference_is_not_a_cycle() {
        let mut g = DependencyGraph::new();
        let a = NodeId::resource("null_resource", "a");
        g.add_node(node(a.clone()));
        g.add_edge(&a, &a).unwrap();
        assert_eq!(g.emission_order().unwrap(), vec![a]);
    }

    #[test]
    fn edge_to_unregistered_node_is_an_error() {
        let mut g = DependencyGraph::new();
        let a = NodeId::local("a");
        g.add_node(node(a.clone()));
        let missing = NodeId::local("ghost");
        assert!(matches!(
            g.add_edge(&missing, &a),
            Err(ConvertError::MissingNode(_))
        ));
    }
}
