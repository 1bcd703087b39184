use crate::Bundle;
use itertools::Itertools;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, VecDeque};
use vulsim_utils::{Diagnostics, Error, Id, VulResult, Warning};

/// Computes the order in which bundles have to be declared.
///
/// A bundle that embeds another bundle by value can only be declared after
/// it. The resolver builds a graph with an edge `A -> B` for every member of
/// `B` whose type is `A` and runs Kahn's algorithm over it: bundles with no
/// remaining dependencies are dequeued and appended to the order, which in
/// turn releases the bundles that embed them.
///
/// Ties are broken by input order, so resolving the same bundles twice yields
/// the same order.
///
/// Members whose type is neither primitive nor a known bundle are reported as
/// [Warning::UnknownType] and take no part in the graph. Any bundle left with
/// unresolved dependencies once the queue is drained is part of, or depends
/// on, a cycle; all of them are reported in a single error.
pub fn resolve(
    bundles: &[Bundle],
    diag: &mut Diagnostics,
) -> VulResult<Vec<Id>> {
    let mut graph: DiGraph<Id, ()> = DiGraph::new();
    let nodes: HashMap<Id, NodeIndex> = bundles
        .iter()
        .map(|b| (b.name, graph.add_node(b.name)))
        .collect();

    for bundle in bundles {
        let to = nodes[&bundle.name];
        for (member, ty) in bundle.dependencies() {
            match nodes.get(&ty) {
                Some(from) => {
                    graph.add_edge(*from, to, ());
                }
                None => diag.warn(Warning::UnknownType {
                    bundle: bundle.name,
                    member,
                    ty: ty.to_string(),
                }),
            }
        }
    }

    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|idx| graph.edges_directed(idx, Direction::Incoming).count())
        .collect();
    let mut queue: VecDeque<NodeIndex> = graph
        .node_indices()
        .filter(|idx| in_degree[idx.index()] == 0)
        .collect();

    let mut order = Vec::with_capacity(bundles.len());
    while let Some(idx) = queue.pop_front() {
        order.push(graph[idx]);
        let mut next: Vec<NodeIndex> =
            graph.neighbors_directed(idx, Direction::Outgoing).collect();
        next.sort();
        for succ in next {
            let deg = &mut in_degree[succ.index()];
            *deg -= 1;
            if *deg == 0 {
                queue.push_back(succ);
            }
        }
    }

    if order.len() != bundles.len() {
        let unresolved = graph
            .node_indices()
            .filter(|idx| in_degree[idx.index()] != 0)
            .map(|idx| graph[idx])
            .collect();
        return Err(Error::cyclic_dependency(unresolved));
    }
    log::debug!("bundle order: {}", order.iter().join(", "));
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::resolve;
    use crate::{Bundle, BundleMember, Type};
    use vulsim_utils::{Diagnostics, ErrorKind, Id, Warning};

    fn bundle(name: &str, members: &[(&str, &str)]) -> Bundle {
        Bundle {
            name: Id::new(name),
            members: members
                .iter()
                .map(|(m, ty)| BundleMember {
                    name: Id::new(m),
                    ty: Type::parse(ty),
                    default: None,
                })
                .collect(),
        }
    }

    fn position(order: &[Id], name: &str) -> usize {
        order.iter().position(|id| id == name).unwrap()
    }

    #[test]
    fn dependencies_come_first() {
        let bundles = vec![
            bundle("Top", &[("a", "Mid"), ("b", "Leaf"), ("c", "uint8")]),
            bundle("Mid", &[("x", "Leaf"), ("y", "Leaf")]),
            bundle("Leaf", &[("v", "int32")]),
            bundle("Alone", &[]),
        ];
        let mut diag = Diagnostics::default();
        let order = resolve(&bundles, &mut diag).unwrap();
        assert_eq!(order.len(), 4);
        assert!(position(&order, "Leaf") < position(&order, "Mid"));
        assert!(position(&order, "Mid") < position(&order, "Top"));
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn independent_bundles_keep_input_order() {
        let bundles = vec![
            bundle("C", &[]),
            bundle("A", &[]),
            bundle("B", &[]),
        ];
        let order = resolve(&bundles, &mut Diagnostics::default()).unwrap();
        assert_eq!(order, vec!["C", "A", "B"]);
    }

    #[test]
    fn unknown_type_is_a_warning() {
        let bundles = vec![bundle("Pkt", &[("hdr", "Header")])];
        let mut diag = Diagnostics::default();
        let order = resolve(&bundles, &mut diag).unwrap();
        assert_eq!(order, vec!["Pkt"]);
        assert_eq!(
            diag.warnings(),
            &[Warning::UnknownType {
                bundle: Id::new("Pkt"),
                member: Id::new("hdr"),
                ty: "Header".to_string(),
            }]
        );
    }

    #[test]
    fn cycle_names_every_unresolved_bundle() {
        let bundles = vec![
            bundle("Ok", &[("v", "bool")]),
            bundle("A", &[("b", "B")]),
            bundle("B", &[("a", "A")]),
        ];
        let err = resolve(&bundles, &mut Diagnostics::default()).unwrap_err();
        match err.kind() {
            ErrorKind::CyclicDependency(names) => {
                assert_eq!(names, &vec![Id::new("A"), Id::new("B")])
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            err.message(),
            "Bundle check failed: loop dependency in A, B"
        );
    }

    #[test]
    fn self_embedding_is_a_cycle() {
        let bundles = vec![bundle("Node", &[("next", "Node")])];
        assert!(resolve(&bundles, &mut Diagnostics::default()).is_err());
    }
}
