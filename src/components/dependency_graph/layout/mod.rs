//! Force-directed layout.
//!
//! Wraps the `force_graph` physics simulation, which integrates link springs
//! and pairwise charge and leaves anchored nodes alone. On top of it each
//! tick adds:
//! - alpha cooling: `alpha` decays geometrically toward `alpha_target` and
//!   scales node speed, so motion dies out as the layout settles
//! - a centering pass that keeps the mean position on the surface center
//! - a collision pass that pushes overlapping circles apart
//!
//! Once `alpha` drops below `alpha_min` the simulation reports
//! [`SimulationEvent::End`] and stops ticking until reheated. Callers read
//! positions through [`PositionSource`] and repaint however their backend
//! needs.

mod forces;

use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData};

use super::types::{Bounds, DependencyLink, PackageNode, Point, PositionSource};

/// Physics constants handed to `force_graph`, plus the cooling schedule and
/// the passes layered on top.
#[derive(Clone, Debug)]
pub struct SimulationParameters {
	/// Pairwise repulsion, scaled by both masses over distance squared.
	pub force_charge: f32,
	/// Link spring stiffness.
	pub force_spring: f32,
	/// Per-force clamp.
	pub force_max: f32,
	/// Node speed at `alpha == 1`.
	pub node_speed: f32,
	pub damping_factor: f32,
	pub mass: f32,
	/// Seconds integrated per tick.
	pub time_step: f32,
	pub alpha_min: f64,
	pub alpha_decay: f64,
	/// `alpha_target` while a node is being dragged.
	pub drag_alpha_target: f64,
	/// `alpha` applied when the layout is reheated after a resize.
	pub resize_alpha: f64,
	pub center_strength: f64,
	/// Added to each body's radius for collision.
	pub collision_padding: f64,
	pub collision_strength: f64,
	/// Phyllotaxis spacing for freshly placed bodies.
	pub initial_radius: f64,
}

impl Default for SimulationParameters {
	fn default() -> Self {
		let alpha_min = 0.001;
		Self {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
			mass: 10.0,
			time_step: 0.016,
			alpha_min,
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			drag_alpha_target: 0.3,
			resize_alpha: 0.3,
			center_strength: 1.0,
			collision_padding: 5.0,
			collision_strength: 0.7,
			initial_radius: 10.0,
		}
	}
}

impl SimulationParameters {
	fn physics(&self, alpha: f64) -> force_graph::SimulationParameters {
		force_graph::SimulationParameters {
			force_charge: self.force_charge,
			force_spring: self.force_spring,
			force_max: self.force_max,
			node_speed: self.node_speed * alpha as f32,
			damping_factor: self.damping_factor,
		}
	}
}

/// Last known position of one simulated node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Body {
	pub x: f64,
	pub y: f64,
	pub radius: f64,
	/// Set while the node is held in place by a drag.
	pub pin: Option<Point>,
}

impl Body {
	pub fn is_finite(&self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}

	pub fn position(&self) -> Point {
		Point::new(self.x, self.y)
	}
}

/// Per-node payload inside `force_graph`: the slot in our body list.
#[derive(Clone, Copy, Debug, Default)]
struct Slot(usize);

#[derive(Clone, Debug, PartialEq)]
pub enum SimulationEvent {
	Tick,
	/// Cooled below `alpha_min`. Carries the settled layout bounds.
	End { bounds: Option<Bounds> },
}

pub struct ForceSimulation {
	params: SimulationParameters,
	graph: ForceGraph<Slot, ()>,
	ids: Vec<String>,
	index: HashMap<String, usize>,
	handles: Vec<DefaultNodeIdx>,
	bodies: Vec<Body>,
	links: Vec<DependencyLink>,
	/// Distinct undirected body pairs, one spring each.
	springs: Vec<(usize, usize)>,
	center: Point,
	alpha: f64,
	alpha_target: f64,
	running: bool,
}

impl ForceSimulation {
	pub fn new(params: SimulationParameters) -> Self {
		Self {
			graph: ForceGraph::new(params.physics(0.0)),
			params,
			ids: Vec::new(),
			index: HashMap::new(),
			handles: Vec::new(),
			bodies: Vec::new(),
			links: Vec::new(),
			springs: Vec::new(),
			center: Point::default(),
			alpha: 0.0,
			alpha_target: 0.0,
			running: false,
		}
	}

	/// Discard every body and start over from a phyllotaxis spiral around
	/// `center`. Links whose endpoints are not in `nodes` are dropped.
	pub fn restart(
		&mut self,
		nodes: &[PackageNode],
		links: &[DependencyLink],
		radius_of: impl Fn(&PackageNode) -> f64,
		center: Point,
	) {
		let golden = PI * (3.0 - 5f64.sqrt());
		self.center = center;
		self.ids = nodes.iter().map(|n| n.id.clone()).collect();
		self.index = self
			.ids
			.iter()
			.enumerate()
			.map(|(i, id)| (id.clone(), i))
			.collect();
		self.bodies = nodes
			.iter()
			.enumerate()
			.map(|(i, node)| {
				let r = self.params.initial_radius * (0.5 + i as f64).sqrt();
				let angle = i as f64 * golden;
				Body {
					x: center.x + r * angle.cos(),
					y: center.y + r * angle.sin(),
					radius: radius_of(node),
					pin: None,
				}
			})
			.collect();

		self.links = links
			.iter()
			.filter_map(|link| {
				Some(DependencyLink {
					source: link.source.resolve(&self.index)?,
					target: link.target.resolve(&self.index)?,
					..link.clone()
				})
			})
			.collect();
		self.springs = forces::springs(
			self.links
				.iter()
				.filter_map(|l| Some((l.source.index()?, l.target.index()?))),
		);

		self.graph = ForceGraph::new(self.params.physics(1.0));
		let handles = (0..self.bodies.len()).map(|i| self.spawn(i)).collect();
		self.handles = handles;
		for &(s, t) in &self.springs {
			self.graph
				.add_edge(self.handles[s], self.handles[t], EdgeData::default());
		}

		self.alpha = 1.0;
		self.alpha_target = 0.0;
		self.running = !self.bodies.is_empty();
	}

	fn spawn(&mut self, slot: usize) -> DefaultNodeIdx {
		let body = &self.bodies[slot];
		let pin = body.pin;
		self.graph.add_node(NodeData {
			x: body.x as f32,
			y: body.y as f32,
			mass: self.params.mass,
			is_anchor: pin.is_some(),
			user_data: Slot(slot),
		})
	}

	/// Advance one tick if running.
	pub fn tick(&mut self) -> Option<SimulationEvent> {
		if !self.running {
			return None;
		}
		self.step();
		if self.alpha < self.params.alpha_min {
			self.running = false;
			let bounds = self.bounds();
			log::debug!("depgraph-view: layout settled with {} bodies", self.bodies.len());
			return Some(SimulationEvent::End { bounds });
		}
		Some(SimulationEvent::Tick)
	}

	/// One integration step regardless of the running flag.
	pub fn step(&mut self) {
		self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
		self.graph.parameters = self.params.physics(self.alpha);
		self.graph.update(self.params.time_step);

		let bodies = &mut self.bodies;
		self.graph.visit_nodes(|node| {
			if let Some(body) = bodies.get_mut(node.data.user_data.0) {
				body.x = node.x() as f64;
				body.y = node.y() as f64;
			}
		});
		forces::collide(
			bodies,
			self.params.collision_padding,
			self.params.collision_strength,
		);
		forces::center(bodies, self.center, self.params.center_strength);
		for body in bodies.iter_mut() {
			if let Some(pin) = body.pin {
				body.x = pin.x;
				body.y = pin.y;
			}
		}

		let bodies = &self.bodies;
		self.graph.visit_nodes_mut(|node| {
			if let Some(body) = bodies.get(node.data.user_data.0) {
				node.data.x = body.x as f32;
				node.data.y = body.y as f32;
			}
		});
	}

	/// Set `alpha_target` and resume ticking.
	pub fn reheat(&mut self, alpha_target: f64) {
		self.alpha_target = alpha_target;
		if !self.bodies.is_empty() {
			self.running = true;
		}
	}

	/// Raise `alpha` to at least `alpha` and resume ticking.
	pub fn kick(&mut self, alpha: f64) {
		self.alpha = self.alpha.max(alpha);
		self.reheat(self.alpha_target);
	}

	/// Drop `alpha_target` back to zero so the layout settles.
	pub fn cool(&mut self) {
		self.alpha_target = 0.0;
	}

	/// Anchor a body at `point`.
	pub fn pin(&mut self, id: &str, point: Point) -> bool {
		let Some(&i) = self.index.get(id) else {
			return false;
		};
		let body = &mut self.bodies[i];
		body.pin = Some(point);
		body.x = point.x;
		body.y = point.y;
		self.graph.visit_nodes_mut(|node| {
			if node.data.user_data.0 == i {
				node.data.x = point.x as f32;
				node.data.y = point.y as f32;
				node.data.is_anchor = true;
			}
		});
		true
	}

	/// Move a pinned body while dragging; the layout keeps running warm.
	pub fn drag_to(&mut self, id: &str, point: Point) -> bool {
		if !self.pin(id, point) {
			return false;
		}
		let target = self.params.drag_alpha_target;
		self.reheat(target);
		true
	}

	/// Unpin a body and let the layout cool down.
	pub fn release(&mut self, id: &str) {
		if let Some(&i) = self.index.get(id)
			&& self.bodies[i].pin.take().is_some()
		{
			self.respawn(i);
		}
		self.cool();
	}

	/// `force_graph` keeps accumulating spring force on anchored nodes and
	/// never clears it, so an unpinned node is re-added fresh along with its
	/// springs.
	fn respawn(&mut self, slot: usize) {
		self.graph.remove_node(self.handles[slot]);
		self.handles[slot] = self.spawn(slot);
		for &(s, t) in self.springs.iter().filter(|&&(s, t)| s == slot || t == slot) {
			self.graph
				.add_edge(self.handles[s], self.handles[t], EdgeData::default());
		}
	}

	pub fn stop(&mut self) {
		self.running = false;
	}

	pub fn set_center(&mut self, center: Point) {
		self.center = center;
	}

	pub fn is_running(&self) -> bool {
		self.running
	}

	pub fn is_empty(&self) -> bool {
		self.bodies.is_empty()
	}

	pub fn body(&self, id: &str) -> Option<&Body> {
		self.index.get(id).map(|&i| &self.bodies[i])
	}

	/// Bounding box of every finite body, including radii.
	pub fn bounds(&self) -> Option<Bounds> {
		Bounds::from_circles(self.bodies.iter().map(|b| (b.position(), b.radius)))
	}
}

impl Default for ForceSimulation {
	fn default() -> Self {
		Self::new(SimulationParameters::default())
	}
}

impl PositionSource for ForceSimulation {
	fn position(&self, id: &str) -> Option<Point> {
		self.body(id).map(Body::position).filter(|p| p.is_finite())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::dependency_graph::types::{DependencyKind, LinkEndpoint};

	fn node(id: &str) -> PackageNode {
		PackageNode {
			id: id.to_string(),
			name: id.to_string(),
			path: String::new(),
			dependency_count: 0,
			depth: 0,
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

	fn positions(sim: &ForceSimulation) -> HashMap<String, Point> {
		sim.ids
			.iter()
			.zip(&sim.bodies)
			.map(|(id, b)| (id.clone(), b.position()))
			.collect()
	}

	fn run_to_end(sim: &mut ForceSimulation) -> (usize, Option<SimulationEvent>) {
		let mut ticks = 0;
		let mut last = None;
		while let Some(event) = sim.tick() {
			ticks += 1;
			last = Some(event);
		}
		(ticks, last)
	}

	#[test]
	fn settles_after_roughly_three_hundred_ticks() {
		let mut sim = ForceSimulation::default();
		let nodes = [node("a"), node("b"), node("c")];
		let links = [link("a", "b"), link("b", "c")];
		sim.restart(&nodes, &links, |_| 8.0, Point::new(400.0, 300.0));
		let (ticks, last) = run_to_end(&mut sim);

		assert!((295..=305).contains(&ticks), "ticks = {ticks}");
		assert!(matches!(last, Some(SimulationEvent::End { bounds: Some(_) })));
		assert!(!sim.is_running());
		assert_eq!(sim.tick(), None);
	}

	#[test]
	fn linked_nodes_spread_apart_but_stay_close() {
		let mut sim = ForceSimulation::default();
		sim.restart(&[node("a"), node("b")], &[link("a", "b")], |_| 8.0, Point::default());
		let start = sim.position("a").zip(sim.position("b")).map(|(a, b)| a.distance(b));
		run_to_end(&mut sim);

		let a = sim.position("a").expect("a placed");
		let b = sim.position("b").expect("b placed");
		let d = a.distance(b);
		assert!(start.is_some_and(|s| s < d), "start = {start:?}, end = {d}");
		assert!(d > 26.0 && d < 400.0, "distance = {d}");
	}

	#[test]
	fn layout_is_centered_and_deterministic() {
		let nodes: Vec<PackageNode> = (0..6).map(|i| node(&format!("n{i}"))).collect();
		let links = [link("n0", "n1"), link("n0", "n2"), link("n2", "n3"), link("n4", "n5")];
		let center = Point::new(200.0, 150.0);

		let mut first = ForceSimulation::default();
		first.restart(&nodes, &links, |_| 8.0, center);
		run_to_end(&mut first);
		let mut second = ForceSimulation::default();
		second.restart(&nodes, &links, |_| 8.0, center);
		run_to_end(&mut second);

		assert_eq!(positions(&first), positions(&second));
		let positions = positions(&first);
		let mean_x = positions.values().map(|p| p.x).sum::<f64>() / 6.0;
		let mean_y = positions.values().map(|p| p.y).sum::<f64>() / 6.0;
		assert!((mean_x - center.x).abs() < 1.0);
		assert!((mean_y - center.y).abs() < 1.0);
	}

	#[test]
	fn pinned_body_stays_put() {
		let mut sim = ForceSimulation::default();
		sim.restart(&[node("a"), node("b")], &[link("a", "b")], |_| 8.0, Point::default());
		let pin = Point::new(50.0, 50.0);
		assert!(sim.drag_to("a", pin));
		for _ in 0..20 {
			sim.tick();
		}

		assert_eq!(sim.body("a").map(Body::position), Some(pin));
		assert!(sim.is_running());

		sim.release("a");
		assert_eq!(sim.body("a").and_then(|b| b.pin), None);
		assert!(!sim.pin("ghost", Point::default()));
	}

	#[test]
	fn released_body_moves_again_without_a_jump() {
		let mut sim = ForceSimulation::default();
		sim.restart(&[node("a"), node("b")], &[link("a", "b")], |_| 8.0, Point::default());
		let pin = Point::new(300.0, 0.0);
		sim.drag_to("a", pin);
		for _ in 0..50 {
			sim.tick();
		}
		sim.release("a");
		sim.kick(0.3);
		sim.tick();

		let moved = sim.position("a").expect("a placed").distance(pin);
		assert!(moved > 0.0 && moved < 50.0, "moved = {moved}");
		assert_eq!(sim.links.len(), 1);
	}

	#[test]
	fn dangling_links_are_dropped_and_endpoints_resolved() {
		let mut sim = ForceSimulation::default();
		sim.restart(
			&[node("a"), node("b")],
			&[link("a", "b"), link("a", "ghost")],
			|_| 8.0,
			Point::default(),
		);

		assert_eq!(sim.links.len(), 1);
		assert_eq!(sim.links[0].source.index(), Some(0));
		assert_eq!(sim.links[0].target.index(), Some(1));
	}

	#[test]
	fn empty_restart_does_not_run() {
		let mut sim = ForceSimulation::default();
		sim.restart(&[], &[], |_| 8.0, Point::default());

		assert!(!sim.is_running());
		assert_eq!(sim.tick(), None);
		assert!(sim.bounds().is_none());
	}

	#[test]
	fn reheat_resumes_a_settled_layout() {
		let mut sim = ForceSimulation::default();
		sim.restart(&[node("a")], &[], |_| 8.0, Point::default());
		run_to_end(&mut sim);
		sim.kick(0.3);

		assert!(sim.is_running());
		assert_eq!(sim.tick(), Some(SimulationEvent::Tick));
	}
}
