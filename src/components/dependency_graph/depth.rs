//! Minimum depth from a root for every node.

use std::collections::{HashMap, HashSet, VecDeque};

/// Nodes with no incoming edge from a known node. When every node has one
/// (a pure cycle), the first node in input order stands in as the only root.
pub fn root_ids<'a>(ids: &[&'a str], edges: &[(&'a str, &'a str)]) -> Vec<&'a str> {
	let known: HashSet<&str> = ids.iter().copied().collect();
	let targets: HashSet<&str> = edges
		.iter()
		.filter(|(from, to)| known.contains(from) && known.contains(to))
		.map(|&(_, to)| to)
		.collect();

	let mut seen = HashSet::new();
	let roots: Vec<&str> = ids
		.iter()
		.copied()
		.filter(|id| !targets.contains(id) && seen.insert(*id))
		.collect();

	if roots.is_empty() {
		ids.first().copied().into_iter().collect()
	} else {
		roots
	}
}

/// Breadth-first depth assignment.
///
/// Every node gets the minimum depth over all discovered paths from a root.
/// Nodes no root can reach get `max_depth + 1`. Edges naming unknown ids are
/// ignored.
pub fn calculate_depths(ids: &[&str], edges: &[(&str, &str)]) -> HashMap<String, usize> {
	let known: HashSet<&str> = ids.iter().copied().collect();
	let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
	for &(from, to) in edges {
		if known.contains(from) && known.contains(to) {
			children.entry(from).or_default().push(to);
		}
	}

	let mut depths: HashMap<&str, usize> = HashMap::with_capacity(ids.len());
	let mut queue = VecDeque::new();
	for root in root_ids(ids, edges) {
		depths.insert(root, 0);
		queue.push_back(root);
	}

	while let Some(id) = queue.pop_front() {
		let next = depths[id] + 1;
		for &child in children.get(id).map(Vec::as_slice).unwrap_or_default() {
			match depths.get(child) {
				Some(&existing) if existing <= next => {}
				_ => {
					depths.insert(child, next);
					queue.push_back(child);
				}
			}
		}
	}

	let max_depth = depths.values().copied().max().unwrap_or(0);
	ids.iter()
		.map(|&id| {
			let depth = depths.get(id).copied().unwrap_or(max_depth + 1);
			(id.to_string(), depth)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn depth_of(depths: &HashMap<String, usize>, id: &str) -> usize {
		depths[id]
	}

	#[test]
	fn chain_depths_follow_shortest_path() {
		let ids = ["app", "ui", "core", "utils"];
		let edges = [
			("app", "ui"),
			("ui", "core"),
			("core", "utils"),
			("app", "utils"),
		];
		let depths = calculate_depths(&ids, &edges);

		assert_eq!(depth_of(&depths, "app"), 0);
		assert_eq!(depth_of(&depths, "ui"), 1);
		assert_eq!(depth_of(&depths, "core"), 2);
		assert_eq!(depth_of(&depths, "utils"), 1);
	}

	#[test]
	fn pure_cycle_starts_from_first_node() {
		let ids = ["a", "b", "c"];
		let edges = [("a", "b"), ("b", "c"), ("c", "a")];
		let depths = calculate_depths(&ids, &edges);

		assert_eq!(depth_of(&depths, "a"), 0);
		assert_eq!(depth_of(&depths, "b"), 1);
		assert_eq!(depth_of(&depths, "c"), 2);
	}

	#[test]
	fn unreachable_cycle_gets_max_depth_plus_one() {
		let ids = ["root", "leaf", "x", "y"];
		let edges = [("root", "leaf"), ("x", "y"), ("y", "x")];
		let depths = calculate_depths(&ids, &edges);

		assert_eq!(depth_of(&depths, "root"), 0);
		assert_eq!(depth_of(&depths, "leaf"), 1);
		assert_eq!(depth_of(&depths, "x"), 2);
		assert_eq!(depth_of(&depths, "y"), 2);
	}

	#[test]
	fn unknown_edge_endpoints_are_ignored() {
		let ids = ["a", "b"];
		let edges = [("a", "b"), ("ghost", "a")];
		let depths = calculate_depths(&ids, &edges);

		assert_eq!(depth_of(&depths, "a"), 0);
		assert_eq!(depth_of(&depths, "b"), 1);
		assert!(!depths.contains_key("ghost"));
	}

	#[test]
	fn empty_input_yields_empty_map() {
		assert!(calculate_depths(&[], &[]).is_empty());
		assert!(root_ids(&[], &[]).is_empty());
	}

	/// Reference shortest-path depth via repeated relaxation.
	fn relaxed_depths(n: usize, edges: &[(usize, usize)]) -> Vec<Option<usize>> {
		let mut has_parent = vec![false; n];
		for &(_, t) in edges {
			has_parent[t] = true;
		}
		let mut depth: Vec<Option<usize>> = (0..n)
			.map(|i| if has_parent[i] { None } else { Some(0) })
			.collect();
		for _ in 0..n {
			for &(s, t) in edges {
				if let Some(ds) = depth[s] {
					if depth[t].is_none_or(|dt| dt > ds + 1) {
						depth[t] = Some(ds + 1);
					}
				}
			}
		}
		depth
	}

	proptest! {
		#[test]
		fn dag_depth_equals_shortest_root_path(
			n in 1usize..12,
			raw in prop::collection::vec((0usize..12, 0usize..12), 0..30),
		) {
			// Forward-only edges keep the graph acyclic.
			let edges: Vec<(usize, usize)> = raw
				.into_iter()
				.map(|(a, b)| (a % n, b % n))
				.filter(|(a, b)| a < b)
				.collect();
			let names: Vec<String> = (0..n).map(|i| format!("n{i}")).collect();
			let ids: Vec<&str> = names.iter().map(String::as_str).collect();
			let edge_refs: Vec<(&str, &str)> = edges
				.iter()
				.map(|&(a, b)| (ids[a], ids[b]))
				.collect();

			let depths = calculate_depths(&ids, &edge_refs);
			let expected = relaxed_depths(n, &edges);
			for i in 0..n {
				prop_assert_eq!(Some(depths[ids[i]]), expected[i]);
			}
		}

		#[test]
		fn cyclic_graphs_always_get_finite_depths(
			n in 1usize..10,
			raw in prop::collection::vec((0usize..10, 0usize..10), 0..25),
		) {
			let names: Vec<String> = (0..n).map(|i| format!("n{i}")).collect();
			let ids: Vec<&str> = names.iter().map(String::as_str).collect();
			let edges: Vec<(&str, &str)> = raw
				.into_iter()
				.map(|(a, b)| (ids[a % n], ids[b % n]))
				.collect();

			let depths = calculate_depths(&ids, &edges);
			prop_assert_eq!(depths.len(), n);
			prop_assert!(depths.values().all(|&d| d <= n));
		}
	}
}
