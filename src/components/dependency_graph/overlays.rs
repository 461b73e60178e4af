//! Geometry and content for the minimap, legend, tooltip and zoom readout.
//!
//! Nothing here touches the DOM; the Leptos controls render what these
//! functions compute.

use super::raster::RasterSurface;
use super::scene::NodeElement;
use super::theme::{Color, Theme};
use super::types::{Bounds, DependencyKind, PackageNode, Point, Size};
use super::viewport::Viewport;

/// The minimap is hidden below this many nodes.
pub const MINIMAP_MIN_NODES: usize = 2;

/// Maps graph bounds into a fixed-size box, preserving aspect ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinimapLayout {
	pub size: Size,
	bounds: Bounds,
	scale: f64,
	offset: Point,
}

impl MinimapLayout {
	/// `None` when there is nothing to show.
	pub fn new(bounds: Option<Bounds>, size: Size, padding: f64) -> Option<Self> {
		let bounds = bounds?.expand(padding);
		if size.is_empty() {
			return None;
		}
		let scale = (size.width / bounds.width().max(1.0)).min(size.height / bounds.height().max(1.0));
		let offset = Point::new(
			(size.width - bounds.width() * scale) / 2.0,
			(size.height - bounds.height() * scale) / 2.0,
		);
		Some(Self {
			size,
			bounds,
			scale,
			offset,
		})
	}

	/// Graph point to minimap point.
	pub fn project(&self, p: Point) -> Point {
		Point::new(
			self.offset.x + (p.x - self.bounds.min_x) * self.scale,
			self.offset.y + (p.y - self.bounds.min_y) * self.scale,
		)
	}

	/// Minimap point back to graph space.
	pub fn unproject(&self, p: Point) -> Point {
		Point::new(
			(p.x - self.offset.x) / self.scale + self.bounds.min_x,
			(p.y - self.offset.y) / self.scale + self.bounds.min_y,
		)
	}

	pub fn project_radius(&self, r: f64) -> f64 {
		(r * self.scale).max(1.0)
	}

	/// The main view's visible rectangle as `(x, y, width, height)` in
	/// minimap space.
	pub fn viewport_rect(&self, viewport: &Viewport, surface: Size) -> (f64, f64, f64, f64) {
		let visible = viewport.visible_rect(surface);
		let top_left = self.project(Point::new(visible.min_x, visible.min_y));
		let bottom_right = self.project(Point::new(visible.max_x, visible.max_y));
		(
			top_left.x,
			top_left.y,
			bottom_right.x - top_left.x,
			bottom_right.y - top_left.y,
		)
	}

	/// Center the main view on the graph point under a minimap click.
	pub fn navigate(&self, click: Point, viewport: &mut Viewport, surface: Size) {
		viewport.center_on(self.unproject(click), surface);
	}
}

/// Paint the minimap: every positioned node as a dot, then the main view's
/// visible rectangle. Returns the number of dots drawn.
pub fn paint_minimap<S: RasterSurface>(
	surface: &mut S,
	layout: &MinimapLayout,
	nodes: &[NodeElement],
	viewport: &Viewport,
	view_size: Size,
	theme: &Theme,
) -> usize {
	let Size { width, height } = layout.size;
	surface.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
	surface.clear_rect(0.0, 0.0, width, height);
	surface.set_fill_style(&theme.overlay.panel.to_css());
	surface.fill_rect(0.0, 0.0, width, height);

	let mut drawn = 0;
	for node in nodes {
		let Some(position) = node.position else {
			continue;
		};
		let p = layout.project(position);
		let color = if node.in_cycle() {
			theme.node.cycle_fill
		} else {
			theme.overlay.minimap_node
		};
		surface.set_fill_style(&color.to_css());
		surface.begin_path();
		surface.arc(p.x, p.y, layout.project_radius(node.radius));
		surface.fill();
		drawn += 1;
	}

	let (x, y, w, h) = layout.viewport_rect(viewport, view_size);
	surface.set_stroke_style(&theme.overlay.minimap_viewport.to_css());
	surface.set_line_width(1.5);
	surface.set_line_dash(&[]);
	surface.begin_path();
	surface.move_to(x, y);
	surface.line_to(x + w, y);
	surface.line_to(x + w, y + h);
	surface.line_to(x, y + h);
	surface.close_path();
	surface.stroke();
	drawn
}

#[derive(Clone, Debug, PartialEq)]
pub enum LegendSwatch {
	Line { color: Color, dashed: bool },
	Circle(Color),
	Badge,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
	pub label: String,
	pub swatch: LegendSwatch,
}

/// One entry per dependency kind present, then cycle and collapsed markers
/// when they apply.
pub fn legend_entries(
	kinds: impl IntoIterator<Item = DependencyKind>,
	has_cycles: bool,
	has_collapsed: bool,
	theme: &Theme,
) -> Vec<LegendEntry> {
	let present: Vec<DependencyKind> = kinds.into_iter().collect();
	let mut entries: Vec<LegendEntry> = DependencyKind::ALL
		.into_iter()
		.filter(|k| present.contains(k))
		.map(|kind| LegendEntry {
			label: kind.label().to_string(),
			swatch: LegendSwatch::Line {
				color: theme.edge.color(kind),
				dashed: theme.edge.is_dashed(kind),
			},
		})
		.collect();
	if has_cycles {
		entries.push(LegendEntry {
			label: "Circular dependency".to_string(),
			swatch: LegendSwatch::Circle(theme.node.cycle_fill),
		});
	}
	if has_collapsed {
		entries.push(LegendEntry {
			label: "Collapsed (+hidden)".to_string(),
			swatch: LegendSwatch::Badge,
		});
	}
	entries
}

/// Lines shown in the hover tooltip.
#[derive(Clone, Debug, PartialEq)]
pub struct TooltipContent {
	pub title: String,
	pub lines: Vec<String>,
}

pub fn tooltip_content(node: &PackageNode, hidden_children: usize) -> TooltipContent {
	let mut lines = Vec::new();
	if !node.path.is_empty() {
		lines.push(node.path.clone());
	}
	let plural = if node.dependency_count == 1 { "dependency" } else { "dependencies" };
	lines.push(format!("{} {plural}", node.dependency_count));
	lines.push(format!("Depth {}", node.depth));
	match node.cycle_ids.len() {
		0 => {}
		1 => lines.push("In 1 circular dependency".to_string()),
		n => lines.push(format!("In {n} circular dependencies")),
	}
	if hidden_children > 0 {
		lines.push(format!("{hidden_children} hidden (double-click to expand)"));
	}
	TooltipContent {
		title: node.name.clone(),
		lines,
	}
}

/// Place a tooltip of `tooltip` size near `pointer`, flipping to the other
/// side of the pointer when it would leave `container`.
pub fn tooltip_position(pointer: Point, tooltip: Size, container: Size) -> Point {
	const OFFSET: f64 = 12.0;
	let mut x = pointer.x + OFFSET;
	let mut y = pointer.y + OFFSET;
	if x + tooltip.width > container.width {
		x = pointer.x - OFFSET - tooltip.width;
	}
	if y + tooltip.height > container.height {
		y = pointer.y - OFFSET - tooltip.height;
	}
	Point::new(x.max(0.0), y.max(0.0))
}

pub fn zoom_label(viewport: &Viewport) -> String {
	format!("{}%", viewport.zoom_percent())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn minimap_projection_fits_and_inverts() {
		let layout = MinimapLayout::new(
			Some(Bounds::new(0.0, 0.0, 400.0, 200.0)),
			Size::new(200.0, 150.0),
			0.0,
		)
		.expect("bounds present");

		assert_eq!(layout.project(Point::new(0.0, 0.0)), Point::new(0.0, 25.0));
		assert_eq!(layout.project(Point::new(400.0, 200.0)), Point::new(200.0, 125.0));
		assert_eq!(layout.unproject(Point::new(100.0, 75.0)), Point::new(200.0, 100.0));
		assert!(MinimapLayout::new(None, Size::new(200.0, 150.0), 0.0).is_none());
	}

	#[test]
	fn minimap_click_centers_main_view() {
		let layout = MinimapLayout::new(
			Some(Bounds::new(0.0, 0.0, 400.0, 200.0)),
			Size::new(200.0, 150.0),
			0.0,
		)
		.expect("bounds present");
		let mut viewport = Viewport::default();
		let surface = Size::new(800.0, 600.0);
		layout.navigate(Point::new(100.0, 75.0), &mut viewport, surface);

		assert_eq!(viewport.graph_to_screen(Point::new(200.0, 100.0)), Point::new(400.0, 300.0));
		let (x, y, w, h) = layout.viewport_rect(&viewport, surface);
		assert_eq!((w, h), (400.0, 300.0));
		assert_eq!((x + w / 2.0, y + h / 2.0), (100.0, 75.0));
	}

	#[test]
	fn minimap_paints_positioned_nodes_and_viewport_frame() {
		use crate::components::dependency_graph::raster::{DrawOp, RecordingSurface};

		let layout = MinimapLayout::new(
			Some(Bounds::new(0.0, 0.0, 400.0, 200.0)),
			Size::new(200.0, 150.0),
			0.0,
		)
		.expect("bounds present");
		let element = |id: &str, position: Option<Point>| NodeElement {
			id: id.into(),
			name: id.into(),
			label: id.into(),
			radius: 8.0,
			depth: 0,
			cycle_ids: Vec::new(),
			hidden_children: 0,
			position,
		};
		let nodes = [
			element("a", Some(Point::new(0.0, 0.0))),
			element("b", None),
			element("c", Some(Point::new(400.0, 200.0))),
		];
		let mut surface = RecordingSurface::default();
		let drawn = paint_minimap(
			&mut surface,
			&layout,
			&nodes,
			&Viewport::default(),
			Size::new(400.0, 200.0),
			&Theme::default(),
		);

		assert_eq!(drawn, 2);
		assert!(surface.ops.contains(&DrawOp::Arc(0.0, 25.0, 4.0)));
		assert!(surface.ops.contains(&DrawOp::Arc(200.0, 125.0, 4.0)));
		assert!(surface.ops.contains(&DrawOp::LineTo(200.0, 25.0)));
		assert_eq!(surface.count(|op| matches!(op, DrawOp::Stroke)), 1);
	}

	#[test]
	fn legend_lists_present_kinds_in_canonical_order() {
		let theme = Theme::default();
		let entries = legend_entries(
			[DependencyKind::Peer, DependencyKind::Production, DependencyKind::Peer],
			true,
			false,
			&theme,
		);
		let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();

		assert_eq!(labels, vec!["Production", "Peer", "Circular dependency"]);
	}

	#[test]
	fn tooltip_describes_node() {
		let node = PackageNode {
			id: "ui".into(),
			name: "@acme/ui".into(),
			path: "packages/ui".into(),
			dependency_count: 1,
			depth: 2,
			in_cycle: true,
			cycle_ids: vec![0, 3],
		};
		let content = tooltip_content(&node, 4);

		assert_eq!(content.title, "@acme/ui");
		assert_eq!(
			content.lines,
			vec![
				"packages/ui",
				"1 dependency",
				"Depth 2",
				"In 2 circular dependencies",
				"4 hidden (double-click to expand)",
			]
		);
	}

	#[test]
	fn tooltip_flips_at_container_edge() {
		let container = Size::new(300.0, 200.0);
		let tooltip = Size::new(100.0, 50.0);

		assert_eq!(
			tooltip_position(Point::new(10.0, 10.0), tooltip, container),
			Point::new(22.0, 22.0)
		);
		assert_eq!(
			tooltip_position(Point::new(250.0, 190.0), tooltip, container),
			Point::new(138.0, 128.0)
		);
	}
}
