//! Retained scene for the vector backend and SVG export.
//!
//! [`VectorScene::rebuild`] runs when the visible node/link set changes and
//! bumps [`VectorScene::generation`]. Between rebuilds only
//! [`VectorScene::sync_positions`] runs, once per layout tick, touching
//! coordinates and nothing else.

use std::collections::HashMap;

use super::scale::ScaleConfig;
use super::types::{Bounds, DependencyKind, Point, PositionSource};
use super::visibility::VisibilityResult;

#[derive(Clone, Debug, PartialEq)]
pub struct NodeElement {
	pub id: String,
	pub name: String,
	pub label: String,
	pub radius: f64,
	pub depth: usize,
	pub cycle_ids: Vec<usize>,
	/// Descendants hidden because this node is collapsed.
	pub hidden_children: usize,
	pub position: Option<Point>,
}

impl NodeElement {
	pub fn in_cycle(&self) -> bool {
		!self.cycle_ids.is_empty()
	}

	pub fn on_cycle(&self, cycle: Option<usize>) -> bool {
		cycle.is_some_and(|c| self.cycle_ids.contains(&c))
	}
}

/// Straight segment from the source boundary to the target boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
	pub from: Point,
	pub to: Point,
}

impl Segment {
	/// Direction of travel in radians.
	pub fn angle(&self) -> f64 {
		(self.to.y - self.from.y).atan2(self.to.x - self.from.x)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkElement {
	pub key: String,
	pub source: String,
	pub target: String,
	pub kind: DependencyKind,
	pub cycle_ids: Vec<usize>,
	pub segment: Option<Segment>,
}

impl LinkElement {
	pub fn in_cycle(&self) -> bool {
		!self.cycle_ids.is_empty()
	}

	pub fn on_cycle(&self, cycle: Option<usize>) -> bool {
		cycle.is_some_and(|c| self.cycle_ids.contains(&c))
	}

	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}
}

/// Segment between two circles, trimmed to both boundaries. `None` when the
/// circles overlap.
pub fn trim_segment(from: Point, from_radius: f64, to: Point, to_radius: f64) -> Option<Segment> {
	let (dx, dy) = (to.x - from.x, to.y - from.y);
	let length = (dx * dx + dy * dy).sqrt();
	if !length.is_finite() || length <= from_radius + to_radius {
		return None;
	}
	let (ux, uy) = (dx / length, dy / length);
	Some(Segment {
		from: Point::new(from.x + ux * from_radius, from.y + uy * from_radius),
		to: Point::new(to.x - ux * to_radius, to.y - uy * to_radius),
	})
}

#[derive(Clone, Debug, Default)]
pub struct VectorScene {
	generation: u64,
	nodes: Vec<NodeElement>,
	node_index: HashMap<String, usize>,
	normal_links: Vec<LinkElement>,
	cycle_links: Vec<LinkElement>,
}

impl VectorScene {
	/// Replace every element with the visible set. Positions start unresolved.
	pub fn rebuild(&mut self, visibility: &VisibilityResult, scale: &ScaleConfig) {
		self.nodes = visibility
			.visible_nodes
			.iter()
			.map(|node| NodeElement {
				id: node.id.clone(),
				name: node.name.clone(),
				label: scale.truncate_label(&node.name),
				radius: scale.node_radius(node.dependency_count),
				depth: node.depth,
				cycle_ids: node.cycle_ids.clone(),
				hidden_children: visibility.hidden_count(&node.id),
				position: None,
			})
			.collect();
		self.node_index = self
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.clone(), i))
			.collect();

		let (cycle, normal): (Vec<LinkElement>, Vec<LinkElement>) = visibility
			.visible_links
			.iter()
			.map(|link| LinkElement {
				key: link.key(),
				source: link.source_id().to_string(),
				target: link.target_id().to_string(),
				kind: link.kind,
				cycle_ids: link.cycle_ids.clone(),
				segment: None,
			})
			.partition(LinkElement::in_cycle);
		self.normal_links = normal;
		self.cycle_links = cycle;
		self.generation += 1;
	}

	/// Copy positions in and re-trim every link. Returns how many nodes have a
	/// resolved position.
	pub fn sync_positions(&mut self, positions: &impl PositionSource) -> usize {
		let mut resolved = 0;
		for node in &mut self.nodes {
			node.position = positions.position(&node.id);
			resolved += usize::from(node.position.is_some());
		}
		let nodes = &self.nodes;
		let index = &self.node_index;
		let endpoint = |id: &str| {
			index
				.get(id)
				.and_then(|&i| nodes[i].position.map(|p| (p, nodes[i].radius)))
		};
		for link in self.normal_links.iter_mut().chain(self.cycle_links.iter_mut()) {
			link.segment = match (endpoint(&link.source), endpoint(&link.target)) {
				(Some((from, rf)), Some((to, rt))) => trim_segment(from, rf, to, rt),
				_ => None,
			};
		}
		resolved
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn nodes(&self) -> &[NodeElement] {
		&self.nodes
	}

	pub fn node(&self, id: &str) -> Option<&NodeElement> {
		self.node_index.get(id).map(|&i| &self.nodes[i])
	}

	pub fn normal_links(&self) -> &[LinkElement] {
		&self.normal_links
	}

	/// Painted above the normal layer.
	pub fn cycle_links(&self) -> &[LinkElement] {
		&self.cycle_links
	}

	/// Both layers in paint order.
	pub fn links(&self) -> impl Iterator<Item = &LinkElement> {
		self.normal_links.iter().chain(&self.cycle_links)
	}

	/// Bounds of every positioned node, radii included.
	pub fn bounds(&self) -> Option<Bounds> {
		Bounds::from_circles(
			self.nodes
				.iter()
				.filter_map(|n| n.position.map(|p| (p, n.radius))),
		)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::{HashMap, HashSet};

	use super::*;
	use crate::components::dependency_graph::types::{
		CircularDependencyInfo, DependencyGraph, Edge, PackageDescriptor,
	};
	use crate::components::dependency_graph::transform::GraphModel;
	use crate::components::dependency_graph::visibility::{CollapseState, compute_visibility};

	fn model() -> GraphModel {
		let graph = DependencyGraph {
			nodes: ["a", "b", "c"]
				.into_iter()
				.map(|id| {
					(
						id.to_string(),
						PackageDescriptor {
							name: id.to_string(),
							..Default::default()
						},
					)
				})
				.collect(),
			edges: [("a", "b"), ("b", "c"), ("c", "b")]
				.into_iter()
				.map(|(from, to)| Edge {
					from: from.into(),
					to: to.into(),
					kind: DependencyKind::Production,
				})
				.collect(),
			..Default::default()
		};
		let cycles = [CircularDependencyInfo {
			cycle: vec!["b".into(), "c".into(), "b".into()],
			..Default::default()
		}];
		GraphModel::build(&graph, &cycles)
	}

	fn scene_for(model: &GraphModel) -> VectorScene {
		let visibility = compute_visibility(&model.nodes, &model.links, &CollapseState::default());
		let mut scene = VectorScene::default();
		scene.rebuild(&visibility, &ScaleConfig::default());
		scene
	}

	#[test]
	fn cycle_links_get_their_own_layer() {
		let scene = scene_for(&model());

		assert_eq!(scene.nodes().len(), 3);
		assert_eq!(scene.normal_links().len(), 1);
		assert_eq!(scene.cycle_links().len(), 2);
		assert_eq!(scene.links().last().map(|l| l.key.as_str()), Some("c->b#production"));
		assert_eq!(scene.generation(), 1);
	}

	#[test]
	fn same_pair_under_two_kinds_gets_distinct_link_keys() {
		let graph = DependencyGraph {
			nodes: [("app", "@acme/app"), ("lib", "@acme/lib")]
				.into_iter()
				.map(|(id, name)| {
					(
						id.to_string(),
						PackageDescriptor {
							name: name.into(),
							..Default::default()
						},
					)
				})
				.collect(),
			edges: [DependencyKind::Dev, DependencyKind::Peer]
				.into_iter()
				.map(|kind| Edge {
					from: "app".into(),
					to: "lib".into(),
					kind,
				})
				.collect(),
			..Default::default()
		};
		let scene = scene_for(&GraphModel::build(&graph, &[]));
		let keys: HashSet<&str> = scene.links().map(|l| l.key.as_str()).collect();

		assert_eq!(scene.links().count(), 2);
		assert_eq!(keys, HashSet::from(["app->lib#dev", "app->lib#peer"]));
	}

	#[test]
	fn sync_positions_trims_links_and_keeps_generation() {
		let mut scene = scene_for(&model());
		let positions: HashMap<String, Point> = [
			("a".to_string(), Point::new(0.0, 0.0)),
			("b".to_string(), Point::new(100.0, 0.0)),
		]
		.into_iter()
		.collect();

		assert_eq!(scene.sync_positions(&positions), 2);
		assert_eq!(scene.generation(), 1);

		let ab = &scene.normal_links()[0];
		let segment = ab.segment.expect("both endpoints placed");
		// a has one dependency (8.5), b has one (8.5).
		assert!((segment.from.x - 8.5).abs() < 1e-9);
		assert!((segment.to.x - 91.5).abs() < 1e-9);
		assert!(segment.angle().abs() < 1e-9);

		// c is unresolved, so neither cycle link has geometry.
		assert!(scene.cycle_links().iter().all(|l| l.segment.is_none()));
		assert!(scene.node("c").is_some_and(|n| n.position.is_none()));
	}

	#[test]
	fn overlapping_nodes_have_no_segment() {
		assert!(trim_segment(Point::new(0.0, 0.0), 8.0, Point::new(10.0, 0.0), 8.0).is_none());
	}

	#[test]
	fn bounds_cover_positioned_nodes_only() {
		let mut scene = scene_for(&model());
		assert!(scene.bounds().is_none());

		let positions: HashMap<String, Point> =
			[("a".to_string(), Point::new(10.0, 20.0))].into_iter().collect();
		scene.sync_positions(&positions);
		assert_eq!(scene.bounds(), Some(Bounds::new(1.5, 11.5, 18.5, 28.5)));
	}
}
