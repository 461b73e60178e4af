//! Standalone SVG serialization of the retained scene.

use std::collections::HashSet;
use std::fmt::Write;

use crate::components::dependency_graph::interaction::Selection;
use crate::components::dependency_graph::overlays::{LegendEntry, LegendSwatch};
use crate::components::dependency_graph::scale::ScaleConfig;
use crate::components::dependency_graph::scene::{LinkElement, NodeElement, VectorScene};
use crate::components::dependency_graph::theme::{Color, Theme};
use crate::components::dependency_graph::types::{Bounds, DependencyKind, Size};

const LEGEND_ROW: f64 = 18.0;
const LEGEND_WIDTH: f64 = 180.0;
const LEGEND_MARGIN: f64 = 12.0;
const BADGE_RADIUS: f64 = 7.0;
const WATERMARK: &str = "Generated by depgraph-view";

/// What to draw and where.
pub struct SvgInput<'a> {
	pub scene: &'a VectorScene,
	pub theme: &'a Theme,
	pub scale: &'a ScaleConfig,
	pub selection: &'a Selection,
	/// Graph-space rectangle mapped onto the document.
	pub frame: Bounds,
	/// Document size in CSS pixels.
	pub size: Size,
	/// Restrict output to these node ids (and links between them).
	pub members: Option<&'a HashSet<String>>,
	pub background: Option<Color>,
	pub legend: Option<&'a [LegendEntry]>,
	pub watermark: bool,
}

pub fn escape(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&apos;"),
			c => out.push(c),
		}
	}
	out
}

/// Shortest decimal form, at most two fractional digits.
fn num(v: f64) -> String {
	let s = format!("{v:.2}");
	let s = s.trim_end_matches('0').trim_end_matches('.');
	if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// `fill="#rrggbb"` plus an opacity attribute when translucent.
fn paint(attr: &str, color: Color) -> String {
	if color.is_opaque() {
		format!(r#"{attr}="{}""#, color.to_css_rgb())
	} else {
		format!(r#"{attr}="{}" {attr}-opacity="{}""#, color.to_css_rgb(), num(color.a))
	}
}

/// Arrowhead `<marker>` id for a link; shared with the live vector view.
pub fn marker_id(kind: DependencyKind, in_cycle: bool, highlighted: bool) -> String {
	if highlighted {
		"arrow-cycle-highlighted".to_string()
	} else if in_cycle {
		"arrow-cycle".to_string()
	} else {
		format!("arrow-{}", kind.slug())
	}
}

fn write_marker(out: &mut String, id: &str, color: Color) {
	let _ = write!(
		out,
		r#"<marker id="{id}" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="4" markerHeight="4" orient="auto"><path d="M0,0L10,5L0,10z" {}/></marker>"#,
		paint("fill", color)
	);
}

fn write_link(out: &mut String, link: &LinkElement, input: &SvgInput<'_>) {
	let Some(segment) = link.segment else {
		return;
	};
	let highlighted = link.on_cycle(input.selection.highlighted_cycle);
	let theme = input.theme;
	let color = theme.edge_color(link.kind, link.in_cycle(), highlighted);
	let width = if link.in_cycle() {
		input.scale.edge.cycle_line_width
	} else {
		input.scale.edge.line_width
	};
	let dash = if theme.edge.is_dashed(link.kind) && !link.in_cycle() {
		format!(r#" stroke-dasharray="{} {}""#, num(theme.edge.dash.0), num(theme.edge.dash.1))
	} else {
		String::new()
	};
	let _ = write!(
		out,
		r#"<line data-key="{}" x1="{}" y1="{}" x2="{}" y2="{}" {} stroke-width="{}"{dash} marker-end="url(#{})"/>"#,
		escape(&link.key),
		num(segment.from.x),
		num(segment.from.y),
		num(segment.to.x),
		num(segment.to.y),
		paint("stroke", color),
		num(width),
		marker_id(link.kind, link.in_cycle(), highlighted),
	);
}

fn write_node(out: &mut String, node: &NodeElement, input: &SvgInput<'_>) {
	let Some(p) = node.position else {
		return;
	};
	let theme = input.theme;
	let highlighted = node.on_cycle(input.selection.highlighted_cycle);
	let fill = theme.node_fill(node.depth, node.in_cycle(), highlighted);

	let _ = write!(out, r#"<g data-id="{}">"#, escape(&node.id));
	if input.selection.is_selected(&node.id) {
		let _ = write!(
			out,
			r#"<circle cx="{}" cy="{}" r="{}" fill="none" {} stroke-width="{}"/>"#,
			num(p.x),
			num(p.y),
			num(node.radius + input.scale.marker.ring_offset),
			paint("stroke", theme.node.selection_ring),
			num(input.scale.marker.ring_width),
		);
	}
	let _ = write!(
		out,
		r#"<circle cx="{}" cy="{}" r="{}" {} {} stroke-width="{}"/>"#,
		num(p.x),
		num(p.y),
		num(node.radius),
		paint("fill", fill),
		paint("stroke", theme.node.stroke),
		num(input.scale.node.stroke_width),
	);

	let size = input.scale.node.label_size;
	let _ = write!(
		out,
		r#"<text x="{}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="{}" {}>{}</text>"#,
		num(p.x),
		num(p.y + node.radius + input.scale.node.label_gap + size * 0.8),
		num(size),
		paint("fill", theme.label.color),
		escape(&node.label),
	);

	if node.hidden_children > 0 {
		let (bx, by) = (p.x + node.radius * 0.7, p.y - node.radius * 0.7);
		let _ = write!(
			out,
			r#"<circle cx="{}" cy="{}" r="{}" {}/><text x="{}" y="{}" text-anchor="middle" font-family="sans-serif" font-weight="bold" font-size="{}" {}>+{}</text>"#,
			num(bx),
			num(by),
			num(BADGE_RADIUS),
			paint("fill", theme.node.badge_fill),
			num(bx),
			num(by + 3.0),
			num(input.scale.marker.badge_size * 0.8),
			paint("fill", theme.node.badge_text),
			node.hidden_children,
		);
	}
	out.push_str("</g>");
}

fn write_legend(out: &mut String, entries: &[LegendEntry], theme: &Theme) {
	if entries.is_empty() {
		return;
	}
	let overlay = &theme.overlay;
	let height = LEGEND_ROW * entries.len() as f64 + 12.0;
	let _ = write!(
		out,
		r#"<g class="legend" transform="translate({m},{m})"><rect width="{}" height="{}" rx="4" {} {}/>"#,
		num(LEGEND_WIDTH),
		num(height),
		paint("fill", overlay.panel),
		paint("stroke", overlay.border),
		m = num(LEGEND_MARGIN),
	);
	for (i, entry) in entries.iter().enumerate() {
		let y = 6.0 + LEGEND_ROW * i as f64 + LEGEND_ROW / 2.0;
		match &entry.swatch {
			LegendSwatch::Line { color, dashed } => {
				let dash = if *dashed { r#" stroke-dasharray="4 3""# } else { "" };
				let _ = write!(
					out,
					r#"<line x1="10" y1="{y}" x2="34" y2="{y}" {} stroke-width="2"{dash}/>"#,
					paint("stroke", *color),
					y = num(y),
				);
			}
			LegendSwatch::Circle(color) => {
				let _ = write!(out, r#"<circle cx="22" cy="{}" r="6" {}/>"#, num(y), paint("fill", *color));
			}
			LegendSwatch::Badge => {
				let _ = write!(
					out,
					r#"<circle cx="22" cy="{}" r="6" {}/>"#,
					num(y),
					paint("fill", theme.node.badge_fill)
				);
			}
		}
		let _ = write!(
			out,
			r#"<text x="44" y="{}" font-family="sans-serif" font-size="11" {}>{}</text>"#,
			num(y + 4.0),
			paint("fill", overlay.text),
			escape(&entry.label),
		);
	}
	out.push_str("</g>");
}

/// Serialize `input` to a complete SVG document.
pub fn render_svg(input: &SvgInput<'_>) -> String {
	let SvgInput { scene, theme, size, frame, .. } = input;
	let keep = |id: &str| input.members.is_none_or(|m| m.contains(id));

	let scale = (size.width / frame.width().max(1.0)).min(size.height / frame.height().max(1.0));
	let tx = -frame.min_x * scale + (size.width - frame.width() * scale) / 2.0;
	let ty = -frame.min_y * scale + (size.height - frame.height() * scale) / 2.0;

	let mut out = String::new();
	let _ = write!(
		out,
		r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
		w = num(size.width),
		h = num(size.height),
	);

	out.push_str("<defs>");
	for kind in DependencyKind::ALL {
		write_marker(&mut out, &marker_id(kind, false, false), theme.edge.color(kind));
	}
	write_marker(&mut out, "arrow-cycle", theme.edge.cycle);
	write_marker(&mut out, "arrow-cycle-highlighted", theme.edge.highlighted_cycle);
	out.push_str("</defs>");

	if let Some(bg) = input.background {
		let _ = write!(out, r#"<rect width="100%" height="100%" {}/>"#, paint("fill", bg));
	}

	let _ = write!(
		out,
		r#"<g transform="matrix({s} 0 0 {s} {} {})">"#,
		num(tx),
		num(ty),
		s = scale,
	);
	for (class, layer) in [("links", scene.normal_links()), ("cycle-links", scene.cycle_links())] {
		let _ = write!(out, r#"<g class="{class}">"#);
		for link in layer.iter().filter(|l| keep(&l.source) && keep(&l.target)) {
			write_link(&mut out, link, input);
		}
		out.push_str("</g>");
	}
	out.push_str(r#"<g class="nodes">"#);
	for node in scene.nodes().iter().filter(|n| keep(&n.id)) {
		write_node(&mut out, node, input);
	}
	out.push_str("</g></g>");

	if let Some(entries) = input.legend {
		write_legend(&mut out, entries, theme);
	}
	if input.watermark {
		let _ = write!(
			out,
			r#"<text x="{}" y="{}" text-anchor="end" font-family="sans-serif" font-size="10" {}>{WATERMARK}</text>"#,
			num(size.width - 8.0),
			num(size.height - 8.0),
			paint("fill", theme.overlay.watermark),
		);
	}
	out.push_str("</svg>");
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn escapes_markup_characters() {
		assert_eq!(escape(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
	}

	#[test]
	fn numbers_are_compact() {
		assert_eq!(num(12.0), "12");
		assert_eq!(num(0.5), "0.5");
		assert_eq!(num(1.256), "1.26");
		assert_eq!(num(-0.001), "0");
	}

	#[test]
	fn translucent_paint_splits_opacity() {
		assert_eq!(paint("fill", Color::rgb(255, 0, 0)), r##"fill="#ff0000""##);
		assert_eq!(
			paint("stroke", Color::rgba(0, 0, 255, 0.5)),
			r##"stroke="#0000ff" stroke-opacity="0.5""##
		);
	}
}
