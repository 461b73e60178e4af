//! Expand/collapse state and the visible subset it produces.
//!
//! Collapsing a node hides its descendants, but only those that cannot be
//! reached from a root along a path avoiding every collapsed node. A package
//! that is also depended on from an expanded branch stays on screen.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::depth::root_ids;
use super::types::{DependencyLink, PackageNode};

/// How "is this descendant still reachable?" is answered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReachabilityStrategy {
	/// Walk backward from each descendant of each collapsed node, refusing to
	/// pass through collapsed ancestors. Simple, potentially quadratic.
	PerDescendant,
	/// One forward sweep from the roots that never expands a collapsed node,
	/// shared by every descendant. Same answers in O(V + E).
	#[default]
	Memoized,
}

/// The visible part of the graph for one collapsed set.
#[derive(Clone, Debug, Default)]
pub struct VisibilityResult {
	pub visible_nodes: Vec<PackageNode>,
	pub visible_links: Vec<DependencyLink>,
	/// Collapsed node id -> number of its descendants that are actually hidden.
	pub hidden_child_counts: HashMap<String, usize>,
	visible_ids: HashSet<String>,
}

impl VisibilityResult {
	pub fn is_visible(&self, id: &str) -> bool {
		self.visible_ids.contains(id)
	}

	pub fn hidden_count(&self, id: &str) -> usize {
		self.hidden_child_counts.get(id).copied().unwrap_or(0)
	}
}

/// The set of collapsed node ids, persisted per session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CollapseState {
	collapsed: HashSet<String>,
}

impl From<Vec<String>> for CollapseState {
	fn from(ids: Vec<String>) -> Self {
		Self {
			collapsed: ids.into_iter().collect(),
		}
	}
}

impl From<CollapseState> for Vec<String> {
	fn from(state: CollapseState) -> Self {
		let mut ids: Vec<String> = state.collapsed.into_iter().collect();
		ids.sort();
		ids
	}
}

impl CollapseState {
	/// Every collapsed id.
	pub fn ids(&self) -> &HashSet<String> {
		&self.collapsed
	}

	/// Whether `id` is collapsed.
	pub fn is_collapsed(&self, id: &str) -> bool {
		self.collapsed.contains(id)
	}

	/// Nothing collapsed.
	pub fn is_empty(&self) -> bool {
		self.collapsed.is_empty()
	}

	/// Number of collapsed ids.
	pub fn len(&self) -> usize {
		self.collapsed.len()
	}

	/// Flip the collapsed flag; returns the new state.
	pub fn toggle(&mut self, id: &str) -> bool {
		if self.collapsed.remove(id) {
			false
		} else {
			self.collapsed.insert(id.to_string());
			true
		}
	}

	/// Mark `id` collapsed.
	pub fn collapse(&mut self, id: &str) {
		self.collapsed.insert(id.to_string());
	}

	/// Clear the collapsed flag on `id`.
	pub fn expand(&mut self, id: &str) {
		self.collapsed.remove(id);
	}

	/// Clear every collapsed flag.
	pub fn expand_all(&mut self) {
		self.collapsed.clear();
	}

	/// Collapse every node at exactly `max_depth` that has outgoing links, so
	/// nothing deeper than `max_depth` is shown unless reachable another way.
	pub fn collapse_to_depth(
		&mut self,
		nodes: &[PackageNode],
		links: &[DependencyLink],
		max_depth: usize,
	) {
		let parents: HashSet<&str> = links.iter().map(|l| l.source_id()).collect();
		self.collapsed = nodes
			.iter()
			.filter(|n| n.depth == max_depth && parents.contains(n.id.as_str()))
			.map(|n| n.id.clone())
			.collect();
	}

	/// Drop ids that no longer name a node.
	pub fn retain_known(&mut self, known: impl Fn(&str) -> bool) {
		self.collapsed.retain(|id| known(id));
	}
}

struct Adjacency<'a> {
	outgoing: HashMap<&'a str, Vec<&'a str>>,
	incoming: HashMap<&'a str, Vec<&'a str>>,
	roots: HashSet<&'a str>,
}

impl<'a> Adjacency<'a> {
	fn new(nodes: &'a [PackageNode], links: &'a [DependencyLink]) -> Self {
		let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
		let known: HashSet<&str> = ids.iter().copied().collect();
		let pairs: Vec<(&str, &str)> = links
			.iter()
			.map(|l| (l.source_id(), l.target_id()))
			.filter(|(s, t)| known.contains(s) && known.contains(t))
			.collect();

		let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
		let mut incoming: HashMap<&str, Vec<&str>> = HashMap::new();
		for &(s, t) in &pairs {
			outgoing.entry(s).or_default().push(t);
			incoming.entry(t).or_default().push(s);
		}
		let roots = root_ids(&ids, &pairs).into_iter().collect();

		Self {
			outgoing,
			incoming,
			roots,
		}
	}

	fn children(&self, id: &str) -> &[&'a str] {
		self.outgoing.get(id).map(Vec::as_slice).unwrap_or_default()
	}

	fn parents(&self, id: &str) -> &[&'a str] {
		self.incoming.get(id).map(Vec::as_slice).unwrap_or_default()
	}

	/// Every node reachable from `start` along outgoing edges, excluding `start`.
	fn descendants(&self, start: &'a str) -> Vec<&'a str> {
		let mut visited: HashSet<&str> = HashSet::from([start]);
		let mut stack = vec![start];
		let mut found = Vec::new();
		while let Some(id) = stack.pop() {
			for &child in self.children(id) {
				if visited.insert(child) {
					found.push(child);
					stack.push(child);
				}
			}
		}
		found
	}

	/// Backward walk from `start` to any root, never passing through a
	/// collapsed ancestor.
	fn reaches_root_avoiding(&self, start: &'a str, collapsed: &HashSet<String>) -> bool {
		if self.roots.contains(start) {
			return true;
		}
		let mut visited: HashSet<&str> = HashSet::from([start]);
		let mut stack = vec![start];
		while let Some(id) = stack.pop() {
			for &parent in self.parents(id) {
				if collapsed.contains(parent) || !visited.insert(parent) {
					continue;
				}
				if self.roots.contains(parent) {
					return true;
				}
				stack.push(parent);
			}
		}
		false
	}

	/// Forward sweep from the roots; collapsed nodes are reached but never
	/// expanded.
	fn reachable_avoiding(&self, collapsed: &HashSet<String>) -> HashSet<&'a str> {
		let mut reached: HashSet<&str> = self.roots.clone();
		let mut queue: VecDeque<&str> = self
			.roots
			.iter()
			.copied()
			.filter(|r| !collapsed.contains(*r))
			.collect();
		while let Some(id) = queue.pop_front() {
			for &child in self.children(id) {
				if reached.insert(child) && !collapsed.contains(child) {
					queue.push_back(child);
				}
			}
		}
		reached
	}
}

/// Visible subset with the default reachability strategy.
pub fn compute_visibility(
	nodes: &[PackageNode],
	links: &[DependencyLink],
	collapsed: &CollapseState,
) -> VisibilityResult {
	compute_visibility_with(nodes, links, collapsed, ReachabilityStrategy::default())
}

pub fn compute_visibility_with(
	nodes: &[PackageNode],
	links: &[DependencyLink],
	collapsed: &CollapseState,
	strategy: ReachabilityStrategy,
) -> VisibilityResult {
	let collapsed_ids = collapsed.ids();
	let adjacency = Adjacency::new(nodes, links);
	let reachable = match strategy {
		ReachabilityStrategy::Memoized => Some(adjacency.reachable_avoiding(collapsed_ids)),
		ReachabilityStrategy::PerDescendant => None,
	};

	let mut hidden: HashSet<&str> = HashSet::new();
	let mut hidden_child_counts = HashMap::new();
	for node in nodes.iter().filter(|n| collapsed_ids.contains(&n.id)) {
		let mut count = 0;
		for descendant in adjacency.descendants(node.id.as_str()) {
			let still_reachable = match &reachable {
				Some(set) => set.contains(descendant),
				None => adjacency.reaches_root_avoiding(descendant, collapsed_ids),
			};
			if !still_reachable {
				hidden.insert(descendant);
				count += 1;
			}
		}
		hidden_child_counts.insert(node.id.clone(), count);
	}

	let visible_nodes: Vec<PackageNode> = nodes
		.iter()
		.filter(|n| !hidden.contains(n.id.as_str()))
		.cloned()
		.collect();
	let visible_ids: HashSet<String> = visible_nodes.iter().map(|n| n.id.clone()).collect();
	let visible_links = links
		.iter()
		.filter(|l| visible_ids.contains(l.source_id()) && visible_ids.contains(l.target_id()))
		.cloned()
		.collect();

	log::debug!(
		"depgraph-view: {} of {} nodes visible with {} collapsed",
		visible_nodes.len(),
		nodes.len(),
		collapsed.len()
	);

	VisibilityResult {
		visible_nodes,
		visible_links,
		hidden_child_counts,
		visible_ids,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::dependency_graph::types::{DependencyKind, LinkEndpoint};
	use proptest::prelude::*;

	fn node(id: &str, depth: usize) -> PackageNode {
		PackageNode {
			id: id.to_string(),
			name: id.to_string(),
			path: String::new(),
			dependency_count: 0,
			depth,
			in_cycle: false,
			cycle_ids: Vec::new(),
		}
	}

	fn link(s: &str, t: &str) -> DependencyLink {
		DependencyLink {
			source: LinkEndpoint::from(s),
			target: LinkEndpoint::from(t),
			kind: DependencyKind::Production,
			in_cycle: false,
			cycle_ids: Vec::new(),
		}
	}

	fn collapsed(ids: &[&str]) -> CollapseState {
		CollapseState::from(ids.iter().map(|s| s.to_string()).collect::<Vec<_>>())
	}

	fn visible_ids(result: &VisibilityResult) -> Vec<&str> {
		result.visible_nodes.iter().map(|n| n.id.as_str()).collect()
	}

	#[test]
	fn collapsing_hides_exclusive_descendants() {
		let nodes = [node("root", 0), node("a", 1), node("b", 2), node("c", 3)];
		let links = [link("root", "a"), link("a", "b"), link("b", "c")];
		let result = compute_visibility(&nodes, &links, &collapsed(&["a"]));

		assert_eq!(visible_ids(&result), vec!["root", "a"]);
		assert_eq!(result.hidden_count("a"), 2);
		assert_eq!(result.visible_links.len(), 1);
		assert!(!result.is_visible("c"));
	}

	#[test]
	fn alternate_path_keeps_descendant_visible() {
		let nodes = [node("root", 0), node("a", 1), node("d", 1)];
		let links = [link("root", "a"), link("a", "d"), link("root", "d")];

		for strategy in [ReachabilityStrategy::PerDescendant, ReachabilityStrategy::Memoized] {
			let result = compute_visibility_with(&nodes, &links, &collapsed(&["a"]), strategy);
			assert!(result.is_visible("d"), "{strategy:?}");
			assert_eq!(result.hidden_count("a"), 0, "{strategy:?}");
			assert_eq!(result.visible_links.len(), 3, "{strategy:?}");
		}
	}

	#[test]
	fn path_through_another_collapsed_node_does_not_count() {
		let nodes = [node("root", 0), node("a", 1), node("b", 1), node("d", 2)];
		let links = [
			link("root", "a"),
			link("root", "b"),
			link("a", "d"),
			link("b", "d"),
		];
		let result = compute_visibility(&nodes, &links, &collapsed(&["a", "b"]));

		assert!(!result.is_visible("d"));
		assert_eq!(result.hidden_count("a"), 1);
		assert_eq!(result.hidden_count("b"), 1);
	}

	#[test]
	fn cycles_through_collapsed_node_terminate() {
		let nodes = [node("root", 0), node("a", 1), node("b", 2)];
		let links = [link("root", "a"), link("a", "b"), link("b", "a")];
		let result = compute_visibility(&nodes, &links, &collapsed(&["a"]));

		assert_eq!(visible_ids(&result), vec!["root", "a"]);
		assert_eq!(result.hidden_count("a"), 1);
	}

	#[test]
	fn collapse_to_depth_picks_parents_at_that_depth() {
		let nodes = [node("root", 0), node("a", 1), node("b", 1), node("c", 2)];
		let links = [link("root", "a"), link("root", "b"), link("a", "c")];
		let mut state = CollapseState::default();
		state.collapse_to_depth(&nodes, &links, 1);

		assert!(state.is_collapsed("a"));
		assert!(!state.is_collapsed("b"));
		assert_eq!(state.len(), 1);

		state.expand_all();
		assert!(state.is_empty());
	}

	#[test]
	fn toggle_and_persisted_form_are_sorted() {
		let mut state = CollapseState::default();
		assert!(state.toggle("zeta"));
		assert!(state.toggle("alpha"));
		assert!(!state.toggle("zeta"));
		state.collapse("beta");

		let json = serde_json::to_string(&state).expect("serializes");
		assert_eq!(json, r#"["alpha","beta"]"#);
		let back: CollapseState = serde_json::from_str(&json).expect("deserializes");
		assert_eq!(back, state);
	}

	fn arbitrary_graph() -> impl Strategy<Value = (Vec<PackageNode>, Vec<DependencyLink>)> {
		(2usize..12).prop_flat_map(|n| {
			prop::collection::vec((0..n, 0..n), 0..30).prop_map(move |pairs| {
				let nodes: Vec<PackageNode> = (0..n).map(|i| node(&format!("n{i}"), 0)).collect();
				let links = pairs
					.into_iter()
					.filter(|(a, b)| a != b)
					.map(|(a, b)| link(&format!("n{a}"), &format!("n{b}")))
					.collect();
				(nodes, links)
			})
		})
	}

	proptest! {
		#[test]
		fn collapsing_never_grows_and_expanding_restores(
			(nodes, links) in arbitrary_graph(),
			picks in prop::collection::vec(0usize..12, 0..4),
			extra in 0usize..12,
		) {
			let mut state = CollapseState::default();
			for p in &picks {
				state.collapse(&nodes[p % nodes.len()].id);
			}
			let before = compute_visibility(&nodes, &links, &state);

			let extra_id = nodes[extra % nodes.len()].id.clone();
			let was_collapsed = state.is_collapsed(&extra_id);
			state.collapse(&extra_id);
			let after = compute_visibility(&nodes, &links, &state);
			prop_assert!(after.visible_nodes.len() <= before.visible_nodes.len());
			for n in &after.visible_nodes {
				prop_assert!(before.is_visible(&n.id));
			}

			if !was_collapsed {
				state.expand(&extra_id);
			}
			let restored = compute_visibility(&nodes, &links, &state);
			prop_assert_eq!(visible_ids(&restored), visible_ids(&before));
			prop_assert_eq!(restored.visible_links, before.visible_links);
		}

		#[test]
		fn strategies_agree(
			(nodes, links) in arbitrary_graph(),
			picks in prop::collection::vec(0usize..12, 0..5),
		) {
			let mut state = CollapseState::default();
			for p in &picks {
				state.collapse(&nodes[p % nodes.len()].id);
			}
			let slow = compute_visibility_with(&nodes, &links, &state, ReachabilityStrategy::PerDescendant);
			let fast = compute_visibility_with(&nodes, &links, &state, ReachabilityStrategy::Memoized);
			prop_assert_eq!(visible_ids(&slow), visible_ids(&fast));
			prop_assert_eq!(slow.hidden_child_counts, fast.hidden_child_counts);
		}
	}
}
