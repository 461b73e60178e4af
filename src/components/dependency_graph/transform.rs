//! Raw graph records to the normalized node/link model.

use std::collections::{HashMap, HashSet};

use super::cycles::CycleIndex;
use super::depth::calculate_depths;
use super::types::{
	CircularDependencyInfo, DependencyGraph, DependencyLink, LinkEndpoint, PackageNode,
};

/// Normalized graph: nodes in id order, one link per distinct
/// `(from, to, kind)` edge, cycle membership and depth resolved. Rebuilt from scratch on every input change.
#[derive(Clone, Debug, Default)]
pub struct GraphModel {
	pub nodes: Vec<PackageNode>,
	pub links: Vec<DependencyLink>,
	pub cycles: CycleIndex,
	node_index: HashMap<String, usize>,
	max_depth: usize,
}

impl GraphModel {
	pub fn build(graph: &DependencyGraph, cycles: &[CircularDependencyInfo]) -> Self {
		let cycle_index = CycleIndex::build(cycles);
		let node_index: HashMap<String, usize> = graph
			.nodes
			.keys()
			.enumerate()
			.map(|(i, id)| (id.clone(), i))
			.collect();

		let mut dropped = 0usize;
		let mut out_degree = vec![0usize; graph.nodes.len()];
		let mut targets: HashSet<(usize, usize)> = HashSet::new();
		let mut declared = HashSet::new();
		let mut links = Vec::with_capacity(graph.edges.len());
		for edge in &graph.edges {
			let (Some(&source), Some(&target)) = (node_index.get(&edge.from), node_index.get(&edge.to)) else {
				dropped += 1;
				continue;
			};
			if !declared.insert((source, target, edge.kind)) {
				continue;
			}
			// A package listing one dependency under several kinds still
			// depends on it once.
			if targets.insert((source, target)) {
				out_degree[source] += 1;
			}

			let cycle_ids = cycle_index.edge_cycle_ids(&edge.from, &edge.to).to_vec();
			links.push(DependencyLink {
				source: LinkEndpoint::from(edge.from.as_str()),
				target: LinkEndpoint::from(edge.to.as_str()),
				kind: edge.kind,
				in_cycle: !cycle_ids.is_empty(),
				cycle_ids,
			});
		}
		if dropped > 0 {
			log::warn!("depgraph-view: dropped {dropped} edges referencing unknown packages");
		}

		let ids: Vec<&str> = graph.nodes.keys().map(String::as_str).collect();
		let edge_pairs: Vec<(&str, &str)> = links
			.iter()
			.map(|l| (l.source_id(), l.target_id()))
			.collect();
		let depths = calculate_depths(&ids, &edge_pairs);

		let nodes: Vec<PackageNode> = graph
			.nodes
			.iter()
			.enumerate()
			.map(|(i, (id, descriptor))| {
				let cycle_ids = cycle_index.node_cycle_ids(id).to_vec();
				PackageNode {
					id: id.clone(),
					name: if descriptor.name.is_empty() {
						id.clone()
					} else {
						descriptor.name.clone()
					},
					path: descriptor.path.clone(),
					dependency_count: out_degree[i],
					depth: depths.get(id).copied().unwrap_or(0),
					in_cycle: !cycle_ids.is_empty(),
					cycle_ids,
				}
			})
			.collect();

		let max_depth = nodes.iter().map(|n| n.depth).max().unwrap_or(0);

		log::info!(
			"depgraph-view: built model with {} nodes, {} links, {} cycles",
			nodes.len(),
			links.len(),
			cycle_index.len()
		);

		Self {
			nodes,
			links,
			cycles: cycle_index,
			node_index,
			max_depth,
		}
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn node(&self, id: &str) -> Option<&PackageNode> {
		self.node_index.get(id).map(|&i| &self.nodes[i])
	}

	pub fn contains(&self, id: &str) -> bool {
		self.node_index.contains_key(id)
	}

	pub fn max_depth(&self) -> usize {
		self.max_depth
	}

	/// Ids of every node directly linked to `id`, in either direction.
	pub fn neighbors<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
		self.links.iter().filter_map(move |l| {
			if l.source_id() == id {
				Some(l.target_id())
			} else if l.target_id() == id {
				Some(l.source_id())
			} else {
				None
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::dependency_graph::types::{DependencyKind, Edge, PackageDescriptor};

	fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
		DependencyGraph {
			nodes: nodes
				.iter()
				.map(|id| {
					(
						id.to_string(),
						PackageDescriptor {
							name: format!("@scope/{id}"),
							path: format!("packages/{id}"),
							version: None,
						},
					)
				})
				.collect(),
			edges: edges
				.iter()
				.map(|(from, to)| Edge {
					from: from.to_string(),
					to: to.to_string(),
					kind: DependencyKind::Production,
				})
				.collect(),
			..Default::default()
		}
	}

	#[test]
	fn annotates_cycle_membership_on_nodes_and_links() {
		let input = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "b"), ("c", "d")]);
		let cycles = [CircularDependencyInfo {
			cycle: vec!["b".into(), "c".into(), "b".into()],
			..Default::default()
		}];
		let model = GraphModel::build(&input, &cycles);

		let in_cycle: Vec<&str> = model
			.nodes
			.iter()
			.filter(|n| n.in_cycle)
			.map(|n| n.id.as_str())
			.collect();
		assert_eq!(in_cycle, vec!["b", "c"]);

		let cycle_links: Vec<String> = model
			.links
			.iter()
			.filter(|l| l.in_cycle)
			.map(DependencyLink::key)
			.collect();
		assert_eq!(cycle_links, vec!["b->c#production", "c->b#production"]);
		assert_eq!(model.node("c").map(|n| n.cycle_ids.clone()), Some(vec![0]));
	}

	#[test]
	fn counts_outgoing_links_and_depth() {
		let model = GraphModel::build(
			&graph(&["a", "b", "c"], &[("a", "b"), ("a", "c"), ("b", "c")]),
			&[],
		);

		let a = model.node("a").expect("a exists");
		assert_eq!(a.dependency_count, 2);
		assert_eq!(a.depth, 0);
		assert_eq!(a.name, "@scope/a");
		assert_eq!(model.node("c").map(|n| n.depth), Some(1));
		assert_eq!(model.max_depth(), 1);
	}

	#[test]
	fn repeated_dependency_counts_once_per_target() {
		let mut input = graph(&["app", "lib"], &[("app", "lib"), ("app", "lib")]);
		input.edges.push(Edge {
			from: "app".into(),
			to: "lib".into(),
			kind: DependencyKind::Peer,
		});
		let model = GraphModel::build(&input, &[]);

		let kinds: Vec<DependencyKind> = model.links.iter().map(|l| l.kind).collect();
		assert_eq!(kinds, vec![DependencyKind::Production, DependencyKind::Peer]);
		assert_eq!(model.node("app").map(|n| n.dependency_count), Some(1));
	}

	#[test]
	fn drops_edges_to_unknown_packages() {
		let model = GraphModel::build(&graph(&["a"], &[("a", "missing"), ("ghost", "a")]), &[]);

		assert!(model.links.is_empty());
		assert_eq!(model.node("a").map(|n| n.dependency_count), Some(0));
	}

	#[test]
	fn empty_graph_builds_empty_model() {
		let model = GraphModel::build(&DependencyGraph::default(), &[]);

		assert!(model.is_empty());
		assert!(model.links.is_empty());
		assert_eq!(model.max_depth(), 0);
	}

	#[test]
	fn neighbors_cover_both_directions() {
		let model = GraphModel::build(&graph(&["a", "b", "c"], &[("a", "b"), ("c", "a")]), &[]);
		let mut neighbors: Vec<&str> = model.neighbors("a").collect();
		neighbors.sort();

		assert_eq!(neighbors, vec!["b", "c"]);
	}
}
