//! Immediate-mode painting for the raster backend.
//!
//! Every frame is painted from scratch in this order:
//! 1. Clear and apply device pixel ratio
//! 2. Background (screen space)
//! 3. Pan and zoom, then normal edges, then cycle edges above them
//! 4. Nodes, selection ring and collapsed badges
//! 5. Labels on top of everything

use std::collections::HashMap;
use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::highlight::HighlightState;
use super::interaction::Selection;
use super::scale::{ScaleConfig, ScaledValues};
use super::scene::{Segment, trim_segment};
use super::theme::{Color, Theme};
use super::types::{DependencyLink, PackageNode, Point, PositionSource, Size};
use super::viewport::Viewport;
use super::visibility::VisibilityResult;

/// The subset of a 2D drawing context the painter needs.
pub trait RasterSurface {
	fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64);
	fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
	fn save(&mut self);
	fn restore(&mut self);
	fn translate(&mut self, x: f64, y: f64);
	fn scale(&mut self, x: f64, y: f64);
	fn rotate(&mut self, angle: f64);
	fn set_fill_style(&mut self, css: &str);
	fn set_stroke_style(&mut self, css: &str);
	fn set_line_width(&mut self, width: f64);
	fn set_line_dash(&mut self, segments: &[f64]);
	fn set_global_alpha(&mut self, alpha: f64);
	fn begin_path(&mut self);
	fn move_to(&mut self, x: f64, y: f64);
	fn line_to(&mut self, x: f64, y: f64);
	fn close_path(&mut self);
	fn arc(&mut self, x: f64, y: f64, radius: f64);
	fn fill(&mut self);
	fn stroke(&mut self);
	fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
	fn set_font(&mut self, font: &str);
	fn set_text_align(&mut self, align: &str);
	fn set_text_baseline(&mut self, baseline: &str);
	fn fill_text(&mut self, text: &str, x: f64, y: f64);
}

impl RasterSurface for CanvasRenderingContext2d {
	fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
		let _ = CanvasRenderingContext2d::set_transform(self, a, b, c, d, e, f);
	}

	fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
		CanvasRenderingContext2d::clear_rect(self, x, y, w, h);
	}

	fn save(&mut self) {
		CanvasRenderingContext2d::save(self);
	}

	fn restore(&mut self) {
		CanvasRenderingContext2d::restore(self);
	}

	fn translate(&mut self, x: f64, y: f64) {
		let _ = CanvasRenderingContext2d::translate(self, x, y);
	}

	fn scale(&mut self, x: f64, y: f64) {
		let _ = CanvasRenderingContext2d::scale(self, x, y);
	}

	fn rotate(&mut self, angle: f64) {
		let _ = CanvasRenderingContext2d::rotate(self, angle);
	}

	fn set_fill_style(&mut self, css: &str) {
		self.set_fill_style_str(css);
	}

	fn set_stroke_style(&mut self, css: &str) {
		self.set_stroke_style_str(css);
	}

	fn set_line_width(&mut self, width: f64) {
		CanvasRenderingContext2d::set_line_width(self, width);
	}

	fn set_line_dash(&mut self, segments: &[f64]) {
		let array: js_sys::Array = segments.iter().map(|&s| JsValue::from_f64(s)).collect();
		let _ = CanvasRenderingContext2d::set_line_dash(self, &array);
	}

	fn set_global_alpha(&mut self, alpha: f64) {
		CanvasRenderingContext2d::set_global_alpha(self, alpha);
	}

	fn begin_path(&mut self) {
		CanvasRenderingContext2d::begin_path(self);
	}

	fn move_to(&mut self, x: f64, y: f64) {
		CanvasRenderingContext2d::move_to(self, x, y);
	}

	fn line_to(&mut self, x: f64, y: f64) {
		CanvasRenderingContext2d::line_to(self, x, y);
	}

	fn close_path(&mut self) {
		CanvasRenderingContext2d::close_path(self);
	}

	fn arc(&mut self, x: f64, y: f64, radius: f64) {
		let _ = CanvasRenderingContext2d::arc(self, x, y, radius, 0.0, 2.0 * PI);
	}

	fn fill(&mut self) {
		CanvasRenderingContext2d::fill(self);
	}

	fn stroke(&mut self) {
		CanvasRenderingContext2d::stroke(self);
	}

	fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
		CanvasRenderingContext2d::fill_rect(self, x, y, w, h);
	}

	fn set_font(&mut self, font: &str) {
		CanvasRenderingContext2d::set_font(self, font);
	}

	fn set_text_align(&mut self, align: &str) {
		CanvasRenderingContext2d::set_text_align(self, align);
	}

	fn set_text_baseline(&mut self, baseline: &str) {
		CanvasRenderingContext2d::set_text_baseline(self, baseline);
	}

	fn fill_text(&mut self, text: &str, x: f64, y: f64) {
		let _ = CanvasRenderingContext2d::fill_text(self, text, x, y);
	}
}

/// One recorded draw call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
	/// `setTransform(a, b, c, d, e, f)`.
	SetTransform([f64; 6]),
	/// `clearRect(x, y, w, h)`.
	ClearRect(f64, f64, f64, f64),
	/// `save()`.
	Save,
	/// `restore()`.
	Restore,
	/// `translate(x, y)`.
	Translate(f64, f64),
	/// `scale(x, y)`.
	Scale(f64, f64),
	/// `rotate(angle)`.
	Rotate(f64),
	/// `fillStyle = css`.
	FillStyle(String),
	/// `strokeStyle = css`.
	StrokeStyle(String),
	/// `lineWidth = width`.
	LineWidth(f64),
	/// `setLineDash(segments)`.
	LineDash(Vec<f64>),
	/// `globalAlpha = alpha`.
	GlobalAlpha(f64),
	/// `beginPath()`.
	BeginPath,
	/// `moveTo(x, y)`.
	MoveTo(f64, f64),
	/// `lineTo(x, y)`.
	LineTo(f64, f64),
	/// `closePath()`.
	ClosePath,
	/// Full circle: `arc(x, y, radius, 0, 2π)`.
	Arc(f64, f64, f64),
	/// `fill()`.
	Fill,
	/// `stroke()`.
	Stroke,
	/// `fillRect(x, y, w, h)`.
	FillRect(f64, f64, f64, f64),
	/// `font = css`.
	Font(String),
	/// `textAlign = align`.
	TextAlign(String),
	/// `textBaseline = baseline`.
	TextBaseline(String),
	/// `fillText(text, x, y)`.
	FillText(String, f64, f64),
}

/// Records draw calls instead of drawing. Used for headless painting.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
	/// Every call so far, in order.
	pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
	/// Number of recorded calls matching `pred`.
	pub fn count(&self, pred: impl Fn(&DrawOp) -> bool) -> usize {
		self.ops.iter().filter(|op| pred(op)).count()
	}

	/// Text of every `fillText` call, in order.
	pub fn texts(&self) -> Vec<&str> {
		self.ops
			.iter()
			.filter_map(|op| match op {
				DrawOp::FillText(text, _, _) => Some(text.as_str()),
				_ => None,
			})
			.collect()
	}
}

impl RasterSurface for RecordingSurface {
	fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) {
		self.ops.push(DrawOp::SetTransform([a, b, c, d, e, f]));
	}
	fn clear_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
		self.ops.push(DrawOp::ClearRect(x, y, w, h));
	}
	fn save(&mut self) {
		self.ops.push(DrawOp::Save);
	}
	fn restore(&mut self) {
		self.ops.push(DrawOp::Restore);
	}
	fn translate(&mut self, x: f64, y: f64) {
		self.ops.push(DrawOp::Translate(x, y));
	}
	fn scale(&mut self, x: f64, y: f64) {
		self.ops.push(DrawOp::Scale(x, y));
	}
	fn rotate(&mut self, angle: f64) {
		self.ops.push(DrawOp::Rotate(angle));
	}
	fn set_fill_style(&mut self, css: &str) {
		self.ops.push(DrawOp::FillStyle(css.to_string()));
	}
	fn set_stroke_style(&mut self, css: &str) {
		self.ops.push(DrawOp::StrokeStyle(css.to_string()));
	}
	fn set_line_width(&mut self, width: f64) {
		self.ops.push(DrawOp::LineWidth(width));
	}
	fn set_line_dash(&mut self, segments: &[f64]) {
		self.ops.push(DrawOp::LineDash(segments.to_vec()));
	}
	fn set_global_alpha(&mut self, alpha: f64) {
		self.ops.push(DrawOp::GlobalAlpha(alpha));
	}
	fn begin_path(&mut self) {
		self.ops.push(DrawOp::BeginPath);
	}
	fn move_to(&mut self, x: f64, y: f64) {
		self.ops.push(DrawOp::MoveTo(x, y));
	}
	fn line_to(&mut self, x: f64, y: f64) {
		self.ops.push(DrawOp::LineTo(x, y));
	}
	fn close_path(&mut self) {
		self.ops.push(DrawOp::ClosePath);
	}
	fn arc(&mut self, x: f64, y: f64, radius: f64) {
		self.ops.push(DrawOp::Arc(x, y, radius));
	}
	fn fill(&mut self) {
		self.ops.push(DrawOp::Fill);
	}
	fn stroke(&mut self) {
		self.ops.push(DrawOp::Stroke);
	}
	fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
		self.ops.push(DrawOp::FillRect(x, y, w, h));
	}
	fn set_font(&mut self, font: &str) {
		self.ops.push(DrawOp::Font(font.to_string()));
	}
	fn set_text_align(&mut self, align: &str) {
		self.ops.push(DrawOp::TextAlign(align.to_string()));
	}
	fn set_text_baseline(&mut self, baseline: &str) {
		self.ops.push(DrawOp::TextBaseline(baseline.to_string()));
	}
	fn fill_text(&mut self, text: &str, x: f64, y: f64) {
		self.ops.push(DrawOp::FillText(text.to_string(), x, y));
	}
}

/// Everything one frame needs.
pub struct RasterFrame<'a, P: PositionSource> {
	pub size: Size,
	pub device_pixel_ratio: f64,
	pub viewport: &'a Viewport,
	pub visibility: &'a VisibilityResult,
	pub positions: &'a P,
	pub selection: &'a Selection,
	pub highlight: &'a HighlightState,
	pub scale: &'a ScaleConfig,
	pub theme: &'a Theme,
}

/// What was actually drawn; unresolved elements are not counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaintStats {
	pub nodes: usize,
	pub links: usize,
	pub labels: usize,
}

fn smooth_step(t: f64) -> f64 {
	t * t * (3.0 - 2.0 * t)
}

pub fn paint_frame<S: RasterSurface, P: PositionSource>(
	surface: &mut S,
	frame: &RasterFrame<'_, P>,
) -> PaintStats {
	let dpr = if frame.device_pixel_ratio > 0.0 { frame.device_pixel_ratio } else { 1.0 };
	let values = ScaledValues::new(frame.scale, frame.viewport.zoom());
	let mut stats = PaintStats::default();

	surface.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
	surface.clear_rect(0.0, 0.0, frame.size.width * dpr, frame.size.height * dpr);
	surface.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
	surface.set_fill_style(&frame.theme.background.to_css());
	surface.fill_rect(0.0, 0.0, frame.size.width, frame.size.height);

	surface.save();
	let pan = frame.viewport.pan();
	surface.translate(pan.x, pan.y);
	surface.scale(frame.viewport.zoom(), frame.viewport.zoom());

	let (cycle, normal): (Vec<&DependencyLink>, Vec<&DependencyLink>) = frame
		.visibility
		.visible_links
		.iter()
		.partition(|l| l.in_cycle);
	let radii: HashMap<&str, f64> = frame
		.visibility
		.visible_nodes
		.iter()
		.map(|n| (n.id.as_str(), frame.scale.node_radius(n.dependency_count)))
		.collect();
	for link in normal.into_iter().chain(cycle) {
		if draw_link(surface, frame, &values, &radii, link) {
			stats.links += 1;
		}
	}

	let placed: Vec<(&PackageNode, Point)> = frame
		.visibility
		.visible_nodes
		.iter()
		.filter_map(|n| frame.positions.position(&n.id).map(|p| (n, p)))
		.collect();
	for &(node, p) in &placed {
		draw_node(surface, frame, &values, node, p);
		stats.nodes += 1;
	}

	if values.label_alpha > 0.01 {
		surface.set_font(&values.label_font);
		surface.set_text_align("center");
		surface.set_text_baseline("top");
		for &(node, p) in &placed {
			let r = frame.scale.node_radius(node.dependency_count);
			let alpha = values.label_alpha * node_alpha(frame, &node.id);
			surface.set_global_alpha(alpha);
			surface.set_fill_style(&frame.theme.label.color.to_css());
			surface.fill_text(&frame.scale.truncate_label(&node.name), p.x, p.y + r + values.label_gap);
			stats.labels += 1;
		}
		surface.set_global_alpha(1.0);
	}

	surface.restore();
	stats
}

/// Dimming factor for nodes outside the hovered neighborhood.
fn node_alpha<P: PositionSource>(frame: &RasterFrame<'_, P>, id: &str) -> f64 {
	let max_t = smooth_step(frame.highlight.max_intensity());
	let t = smooth_step(frame.highlight.intensity(id));
	1.0 - (1.0 - frame.theme.node.dimmed_alpha) * max_t * (1.0 - t)
}

fn draw_link<S: RasterSurface, P: PositionSource>(
	surface: &mut S,
	frame: &RasterFrame<'_, P>,
	values: &ScaledValues,
	radii: &HashMap<&str, f64>,
	link: &DependencyLink,
) -> bool {
	let (Some(from), Some(to)) = (
		frame.positions.position(link.source_id()),
		frame.positions.position(link.target_id()),
	) else {
		return false;
	};
	let radius = |id: &str| radii.get(id).copied().unwrap_or(frame.scale.node.min_radius);
	let (source_r, target_r) = (radius(link.source_id()), radius(link.target_id()));
	let Some(segment) = trim_segment(from, source_r, to, target_r) else {
		return false;
	};

	let highlighted = frame
		.selection
		.highlighted_cycle
		.is_some_and(|c| link.cycle_ids.contains(&c));
	let color = frame.theme.edge_color(link.kind, link.in_cycle, highlighted);
	let edge_t = smooth_step(frame.highlight.edge_intensity(link.source_id(), link.target_id()));
	let max_t = smooth_step(frame.highlight.max_intensity());
	let alpha = if edge_t > 0.01 {
		1.0
	} else {
		1.0 - 0.7 * max_t
	};
	let base_width = if link.in_cycle { values.cycle_edge_width } else { values.edge_width };

	surface.set_global_alpha(alpha);
	surface.set_stroke_style(&color.to_css());
	surface.set_line_width(base_width * (1.0 + 0.5 * edge_t));
	if frame.theme.edge.is_dashed(link.kind) && !link.in_cycle {
		let (dash, gap) = frame.theme.edge.dash;
		surface.set_line_dash(&[dash, gap]);
	} else {
		surface.set_line_dash(&[]);
	}
	surface.begin_path();
	surface.move_to(segment.from.x, segment.from.y);
	surface.line_to(segment.to.x, segment.to.y);
	surface.stroke();

	if !values.cull_arrows {
		surface.set_line_dash(&[]);
		surface.set_global_alpha(alpha * values.arrow_alpha);
		draw_arrowhead(surface, &segment, values.arrow_size, color);
	}
	surface.set_global_alpha(1.0);
	true
}

/// Arrowhead whose tip sits on the target boundary, rotated to the edge.
fn draw_arrowhead<S: RasterSurface>(surface: &mut S, segment: &Segment, size: f64, color: Color) {
	surface.save();
	surface.translate(segment.to.x, segment.to.y);
	surface.rotate(segment.angle());
	surface.set_fill_style(&color.to_css());
	surface.begin_path();
	surface.move_to(0.0, 0.0);
	surface.line_to(-size, size * 0.5);
	surface.line_to(-size, -size * 0.5);
	surface.close_path();
	surface.fill();
	surface.restore();
}

fn draw_node<S: RasterSurface, P: PositionSource>(
	surface: &mut S,
	frame: &RasterFrame<'_, P>,
	values: &ScaledValues,
	node: &PackageNode,
	p: Point,
) {
	let theme = frame.theme;
	let r = frame.scale.node_radius(node.dependency_count);
	let on_highlighted = frame
		.selection
		.highlighted_cycle
		.is_some_and(|c| node.cycle_ids.contains(&c));
	let t = smooth_step(frame.highlight.intensity(&node.id));
	let fill = theme
		.node_fill(node.depth, node.in_cycle, on_highlighted)
		.lighten(theme.node.hover_lighten * t);

	surface.set_global_alpha(node_alpha(frame, &node.id));
	surface.set_fill_style(&fill.to_css());
	surface.set_stroke_style(&theme.node.stroke.to_css());
	surface.set_line_width(values.node_stroke);
	surface.begin_path();
	surface.arc(p.x, p.y, r);
	surface.fill();
	surface.stroke();

	if frame.selection.is_selected(&node.id) {
		surface.set_stroke_style(&theme.node.selection_ring.to_css());
		surface.set_line_width(values.ring_width);
		surface.begin_path();
		surface.arc(p.x, p.y, r + values.ring_offset);
		surface.stroke();
	}

	let hidden = frame.visibility.hidden_count(&node.id);
	if hidden > 0 {
		let badge_r = r * 0.55;
		let (bx, by) = (p.x + r * 0.75, p.y - r * 0.75);
		surface.set_fill_style(&theme.node.badge_fill.to_css());
		surface.begin_path();
		surface.arc(bx, by, badge_r);
		surface.fill();
		surface.set_fill_style(&theme.node.badge_text.to_css());
		surface.set_font(&values.badge_font);
		surface.set_text_align("center");
		surface.set_text_baseline("middle");
		surface.fill_text(&format!("+{hidden}"), bx, by);
	}
	surface.set_global_alpha(1.0);
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;
	use crate::components::dependency_graph::types::{DependencyKind, LinkEndpoint};
	use crate::components::dependency_graph::visibility::{CollapseState, compute_visibility};

	fn node(id: &str, deps: usize, cycle_ids: Vec<usize>) -> PackageNode {
		PackageNode {
			id: id.to_string(),
			name: format!("@scope/{id}"),
			path: String::new(),
			dependency_count: deps,
			depth: 0,
			in_cycle: !cycle_ids.is_empty(),
			cycle_ids,
		}
	}

	fn link(s: &str, t: &str, cycle_ids: Vec<usize>) -> DependencyLink {
		DependencyLink {
			source: LinkEndpoint::from(s),
			target: LinkEndpoint::from(t),
			kind: DependencyKind::Production,
			in_cycle: !cycle_ids.is_empty(),
			cycle_ids,
		}
	}

	struct Fixture {
		visibility: VisibilityResult,
		positions: HashMap<String, Point>,
		selection: Selection,
		highlight: HighlightState,
		scale: ScaleConfig,
		theme: Theme,
		viewport: Viewport,
	}

	impl Fixture {
		fn new(collapsed: &[&str]) -> Self {
			let nodes = vec![
				node("a", 1, vec![]),
				node("b", 2, vec![0]),
				node("c", 1, vec![0]),
				node("ghost", 0, vec![]),
			];
			let links = vec![link("a", "b", vec![]), link("b", "c", vec![0]), link("c", "b", vec![0])];
			let collapsed = CollapseState::from(collapsed.iter().map(|s| s.to_string()).collect::<Vec<_>>());
			let positions = [("a", 0.0, 0.0), ("b", 100.0, 0.0), ("c", 100.0, 100.0)]
				.into_iter()
				.map(|(id, x, y)| (id.to_string(), Point::new(x, y)))
				.collect();
			Self {
				visibility: compute_visibility(&nodes, &links, &collapsed),
				positions,
				selection: Selection::default(),
				highlight: HighlightState::default(),
				scale: ScaleConfig::default(),
				theme: Theme::default(),
				viewport: Viewport::default(),
			}
		}

		fn paint(&self) -> (RecordingSurface, PaintStats) {
			let mut surface = RecordingSurface::default();
			let stats = paint_frame(
				&mut surface,
				&RasterFrame {
					size: Size::new(800.0, 600.0),
					device_pixel_ratio: 2.0,
					viewport: &self.viewport,
					visibility: &self.visibility,
					positions: &self.positions,
					selection: &self.selection,
					highlight: &self.highlight,
					scale: &self.scale,
					theme: &self.theme,
				},
			);
			(surface, stats)
		}
	}

	#[test]
	fn unresolved_nodes_are_skipped() {
		let (surface, stats) = Fixture::new(&[]).paint();

		assert_eq!(stats, PaintStats { nodes: 3, links: 3, labels: 3 });
		assert!(!surface.texts().contains(&"@scope/ghost"));
	}

	#[test]
	fn frame_starts_with_clear_and_device_pixel_ratio() {
		let (surface, _) = Fixture::new(&[]).paint();

		assert_eq!(surface.ops[1], DrawOp::ClearRect(0.0, 0.0, 1600.0, 1200.0));
		assert_eq!(surface.ops[2], DrawOp::SetTransform([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]));
	}

	#[test]
	fn cycle_edges_are_painted_after_normal_edges() {
		let mut fixture = Fixture::new(&[]);
		fixture.selection.highlighted_cycle = Some(0);
		let (surface, _) = fixture.paint();
		let highlighted = fixture.theme.edge.highlighted_cycle.to_css();
		let production = fixture.theme.edge.production.to_css();

		let stroke_styles: Vec<&str> = surface
			.ops
			.iter()
			.filter_map(|op| match op {
				DrawOp::StrokeStyle(css) if *css == highlighted || *css == production => Some(css.as_str()),
				_ => None,
			})
			.collect();
		assert_eq!(stroke_styles.first(), Some(&production.as_str()));
		assert_eq!(stroke_styles.last(), Some(&highlighted.as_str()));
	}

	#[test]
	fn arrowheads_are_rotated_to_edge_angle() {
		let (surface, _) = Fixture::new(&[]).paint();
		let rotations: Vec<f64> = surface
			.ops
			.iter()
			.filter_map(|op| match op {
				DrawOp::Rotate(a) => Some(*a),
				_ => None,
			})
			.collect();

		assert_eq!(rotations.len(), 3);
		assert!(rotations[0].abs() < 1e-9);
		assert!((rotations[1] - PI / 2.0).abs() < 1e-9);
		assert!((rotations[2] + PI / 2.0).abs() < 1e-9);
	}

	#[test]
	fn collapsed_node_gets_hidden_count_badge() {
		let (surface, stats) = Fixture::new(&["a"]).paint();

		assert_eq!(stats.nodes, 1);
		assert!(surface.texts().contains(&"+2"));
	}

	#[test]
	fn selection_ring_is_drawn_outside_the_node() {
		let mut fixture = Fixture::new(&[]);
		fixture.selection.node_id = Some("a".into());
		let (surface, _) = fixture.paint();
		let ring = fixture.scale.node_radius(1) + ScaledValues::new(&fixture.scale, 1.0).ring_offset;

		assert!(surface.ops.contains(&DrawOp::Arc(0.0, 0.0, ring)));
	}
}
