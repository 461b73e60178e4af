//! Graph input records, the normalized node/link model, and shared geometry.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// A point in either graph space or screen space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	/// Horizontal coordinate, growing right.
	pub x: f64,
	/// Vertical coordinate, growing down.
	pub y: f64,
}

impl Point {
	/// A point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Euclidean distance to `other`.
	pub fn distance(self, other: Point) -> f64 {
		let (dx, dy) = (self.x - other.x, self.y - other.y);
		(dx * dx + dy * dy).sqrt()
	}

	/// Both coordinates are neither NaN nor infinite.
	pub fn is_finite(self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}
}

/// Width/height of a container, surface or document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
	/// Horizontal extent in pixels.
	pub width: f64,
	/// Vertical extent in pixels.
	pub height: f64,
}

impl Size {
	/// A `width` by `height` size.
	pub const fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}

	/// Midpoint, relative to the top-left corner.
	pub fn center(self) -> Point {
		Point::new(self.width / 2.0, self.height / 2.0)
	}

	/// Zero or negative along either axis.
	pub fn is_empty(self) -> bool {
		self.width <= 0.0 || self.height <= 0.0
	}
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
	pub min_x: f64,
	pub min_y: f64,
	pub max_x: f64,
	pub max_y: f64,
}

impl Bounds {
	pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
		Self {
			min_x,
			min_y,
			max_x,
			max_y,
		}
	}

	/// Smallest box containing every circle `(center, radius)`. Non-finite
	/// centers are ignored; returns `None` when nothing remains.
	pub fn from_circles(circles: impl IntoIterator<Item = (Point, f64)>) -> Option<Self> {
		let mut bounds: Option<Bounds> = None;
		for (p, r) in circles {
			if !p.is_finite() {
				continue;
			}
			let circle = Bounds::new(p.x - r, p.y - r, p.x + r, p.y + r);
			bounds = Some(match bounds {
				Some(b) => b.union(circle),
				None => circle,
			});
		}
		bounds
	}

	pub fn width(&self) -> f64 {
		self.max_x - self.min_x
	}

	pub fn height(&self) -> f64 {
		self.max_y - self.min_y
	}

	pub fn center(&self) -> Point {
		Point::new(
			(self.min_x + self.max_x) / 2.0,
			(self.min_y + self.max_y) / 2.0,
		)
	}

	pub fn expand(&self, padding: f64) -> Self {
		Self::new(
			self.min_x - padding,
			self.min_y - padding,
			self.max_x + padding,
			self.max_y + padding,
		)
	}

	pub fn union(&self, other: Bounds) -> Self {
		Self::new(
			self.min_x.min(other.min_x),
			self.min_y.min(other.min_y),
			self.max_x.max(other.max_x),
			self.max_y.max(other.max_y),
		)
	}

	pub fn contains(&self, p: Point) -> bool {
		p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
	}
}

/// Anything that can report a resolved graph-space position for a node id.
///
/// Nodes that have not been positioned yet return `None`; every consumer
/// (drawing, hit-testing, export) skips them silently.
pub trait PositionSource {
	fn position(&self, id: &str) -> Option<Point>;
}

impl PositionSource for HashMap<String, Point> {
	fn position(&self, id: &str) -> Option<Point> {
		self.get(id).copied().filter(|p| p.is_finite())
	}
}

/// The kind of a declared dependency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
	/// `dependencies`.
	#[default]
	Production,
	/// `devDependencies`.
	Dev,
	/// `peerDependencies`.
	Peer,
	/// `optionalDependencies`.
	Optional,
}

impl DependencyKind {
	/// Every kind, in legend order.
	pub const ALL: [DependencyKind; 4] = [
		DependencyKind::Production,
		DependencyKind::Dev,
		DependencyKind::Peer,
		DependencyKind::Optional,
	];

	/// Human-readable name shown in the legend.
	pub fn label(self) -> &'static str {
		match self {
			DependencyKind::Production => "Production",
			DependencyKind::Dev => "Development",
			DependencyKind::Peer => "Peer",
			DependencyKind::Optional => "Optional",
		}
	}

	/// Lowercase identifier, as serialized.
	pub fn slug(self) -> &'static str {
		match self {
			DependencyKind::Production => "production",
			DependencyKind::Dev => "dev",
			DependencyKind::Peer => "peer",
			DependencyKind::Optional => "optional",
		}
	}
}

/// Package metadata as delivered by the analyzer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
	/// Package name, e.g. `@acme/core`.
	#[serde(default)]
	pub name: String,
	/// Location relative to the workspace root.
	#[serde(default)]
	pub path: String,
	/// Declared version, if any.
	#[serde(default)]
	pub version: Option<String>,
}

/// A declared dependency `from -> to`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
	/// Id of the depending package.
	pub from: String,
	/// Id of the package depended upon.
	pub to: String,
	/// Which manifest section declares it. Serialized as `type`.
	#[serde(rename = "type", default)]
	pub kind: DependencyKind,
}

/// Raw dependency graph consumed by the view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
	/// Packages keyed by id.
	#[serde(default)]
	pub nodes: BTreeMap<String, PackageDescriptor>,
	/// Declared dependencies. Edges naming unknown ids are ignored.
	#[serde(default)]
	pub edges: Vec<Edge>,
	/// Absolute path of the workspace root.
	#[serde(default)]
	pub root_path: String,
	/// Package manager flavor, e.g. `pnpm`.
	#[serde(default)]
	pub workspace_type: Option<String>,
}

impl DependencyGraph {
	/// No packages at all.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

/// Severity assigned to a detected cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
	/// Cosmetic; safe to leave.
	Low,
	/// Worth fixing.
	#[default]
	Medium,
	/// Affects build or test ordering.
	High,
	/// Blocks builds.
	Critical,
}

/// One detected circular dependency. `cycle` is a closed walk of package ids.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircularDependencyInfo {
	/// Package ids along the cycle. The first id may repeat at the end.
	pub cycle: Vec<String>,
	/// Analyzer-assigned severity.
	#[serde(default)]
	pub severity: Severity,
	/// Number of packages in the cycle.
	#[serde(default)]
	pub depth: usize,
	/// Free-form impact summary shown in tooltips.
	#[serde(default)]
	pub impact: String,
	/// Analyzer-assigned score; higher is harder to break.
	#[serde(default)]
	pub complexity: f64,
}

/// A package node after normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct PackageNode {
	pub id: String,
	pub name: String,
	pub path: String,
	/// Number of outgoing dependency links; drives the drawn radius.
	pub dependency_count: usize,
	/// Minimum distance from a root package.
	pub depth: usize,
	pub in_cycle: bool,
	/// Every cycle this node participates in.
	pub cycle_ids: Vec<usize>,
}

/// One end of a link: a bare id until the layout solver resolves it to the
/// index of its body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LinkEndpoint {
	Id(String),
	Resolved { id: String, index: usize },
}

impl LinkEndpoint {
	/// The node id, whichever representation this endpoint is in.
	pub fn id(&self) -> &str {
		match self {
			LinkEndpoint::Id(id) | LinkEndpoint::Resolved { id, .. } => id,
		}
	}

	pub fn index(&self) -> Option<usize> {
		match self {
			LinkEndpoint::Id(_) => None,
			LinkEndpoint::Resolved { index, .. } => Some(*index),
		}
	}

	/// Resolve against an id -> index table. Unknown ids yield `None`.
	pub fn resolve(&self, index: &HashMap<String, usize>) -> Option<LinkEndpoint> {
		let id = self.id();
		index.get(id).map(|&index| LinkEndpoint::Resolved {
			id: id.to_string(),
			index,
		})
	}
}

impl From<&str> for LinkEndpoint {
	fn from(id: &str) -> Self {
		LinkEndpoint::Id(id.to_string())
	}
}

impl From<String> for LinkEndpoint {
	fn from(id: String) -> Self {
		LinkEndpoint::Id(id)
	}
}

/// Key used for edge lookups: `"from->to"`.
pub fn edge_key(from: &str, to: &str) -> String {
	format!("{from}->{to}")
}

/// A dependency link between two package nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct DependencyLink {
	pub source: LinkEndpoint,
	pub target: LinkEndpoint,
	pub kind: DependencyKind,
	pub in_cycle: bool,
	pub cycle_ids: Vec<usize>,
}

impl DependencyLink {
	pub fn source_id(&self) -> &str {
		self.source.id()
	}

	pub fn target_id(&self) -> &str {
		self.target.id()
	}

	/// Unique per link: `"from->to#kind"`. The same pair may be declared
	/// under several kinds.
	pub fn key(&self) -> String {
		format!("{}#{}", edge_key(self.source_id(), self.target_id()), self.kind.slug())
	}

	pub fn touches(&self, id: &str) -> bool {
		self.source_id() == id || self.target_id() == id
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn endpoint_id_is_stable_across_resolution() {
		let endpoint = LinkEndpoint::from("react");
		let index: HashMap<String, usize> = [("react".to_string(), 3)].into_iter().collect();
		let resolved = endpoint.resolve(&index).expect("known id resolves");

		assert_eq!(endpoint.id(), "react");
		assert_eq!(resolved.id(), "react");
		assert_eq!(resolved.index(), Some(3));
		assert_eq!(endpoint.index(), None);
		assert!(LinkEndpoint::from("vue").resolve(&index).is_none());
	}

	#[test]
	fn graph_deserializes_from_camel_case_json() {
		let json = r#"{
			"nodes": {
				"app": { "name": "app", "path": "packages/app" },
				"lib": { "name": "lib", "path": "packages/lib", "version": "1.2.0" }
			},
			"edges": [
				{ "from": "app", "to": "lib", "type": "dev" },
				{ "from": "lib", "to": "app" }
			],
			"rootPath": "/repo",
			"workspaceType": "pnpm"
		}"#;
		let graph: DependencyGraph = serde_json::from_str(json).expect("valid graph");

		assert_eq!(graph.nodes.len(), 2);
		assert_eq!(graph.edges[0].kind, DependencyKind::Dev);
		assert_eq!(graph.edges[1].kind, DependencyKind::Production);
		assert_eq!(graph.root_path, "/repo");
		assert_eq!(graph.workspace_type.as_deref(), Some("pnpm"));
	}

	#[test]
	fn bounds_from_circles_skips_non_finite_centers() {
		let bounds = Bounds::from_circles([
			(Point::new(0.0, 0.0), 5.0),
			(Point::new(f64::NAN, 3.0), 5.0),
			(Point::new(20.0, 10.0), 2.0),
		])
		.expect("two finite circles");

		assert_eq!(bounds, Bounds::new(-5.0, -5.0, 22.0, 12.0));
		assert!(Bounds::from_circles(std::iter::empty()).is_none());
	}
}
