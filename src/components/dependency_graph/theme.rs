//! Colors for both backends, overlays and exported documents.

use super::types::DependencyKind;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	/// Red channel.
	pub r: u8,
	/// Green channel.
	pub g: u8,
	/// Blue channel.
	pub b: u8,
	/// Opacity in `[0, 1]`.
	pub a: f64,
}

impl Color {
	/// Opaque color.
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	/// Color with explicit opacity.
	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	/// Same channels, new opacity.
	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Lighten toward white (0.0 = unchanged, 1.0 = white).
	pub fn lighten(self, factor: f64) -> Self {
		let f = factor.clamp(0.0, 1.0);
		let up = |c: u8| (c as f64 + (255.0 - c as f64) * f) as u8;
		Self {
			r: up(self.r),
			g: up(self.g),
			b: up(self.b),
			a: self.a,
		}
	}

	/// Opacity is 1 within rounding.
	pub fn is_opaque(self) -> bool {
		(self.a - 1.0).abs() < 0.001
	}

	/// `#rrggbb` when opaque, otherwise `rgba(...)`.
	pub fn to_css(self) -> String {
		if self.is_opaque() {
			self.to_css_rgb()
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	/// `#rrggbb`, ignoring opacity.
	pub fn to_css_rgb(self) -> String {
		format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
	}
}

/// Fill colors cycled by node depth.
#[derive(Clone, Debug)]
pub struct NodePalette {
	pub colors: Vec<Color>,
}

impl NodePalette {
	/// Slate blues and teals.
	pub fn slate() -> Self {
		Self {
			colors: vec![
				Color::rgb(94, 129, 172),  // Steel blue
				Color::rgb(100, 148, 160), // Teal gray
				Color::rgb(129, 161, 193), // Light steel
				Color::rgb(119, 158, 165), // Desaturated cyan
				Color::rgb(136, 160, 175), // Cadet blue
				Color::rgb(143, 163, 180), // Cool gray
			],
		}
	}

	/// Saturated enough to read on white.
	pub fn ink() -> Self {
		Self {
			colors: vec![
				Color::rgb(37, 99, 235),  // Blue
				Color::rgb(13, 148, 136), // Teal
				Color::rgb(79, 70, 229),  // Indigo
				Color::rgb(8, 145, 178),  // Cyan
				Color::rgb(71, 85, 105),  // Slate
			],
		}
	}

	pub fn get(&self, index: usize) -> Color {
		if self.colors.is_empty() {
			return Color::rgb(128, 128, 128);
		}
		self.colors[index % self.colors.len()]
	}
}

#[derive(Clone, Debug)]
pub struct NodeStyle {
	pub palette: NodePalette,
	pub stroke: Color,
	/// Fill for nodes on any cycle.
	pub cycle_fill: Color,
	/// Fill for nodes on the highlighted cycle.
	pub highlighted_cycle_fill: Color,
	pub selection_ring: Color,
	/// Mix toward white for hovered/neighbor nodes at full intensity.
	pub hover_lighten: f64,
	/// Opacity of nodes outside the hovered neighborhood at full intensity.
	pub dimmed_alpha: f64,
	pub badge_fill: Color,
	pub badge_text: Color,
}

#[derive(Clone, Debug)]
pub struct EdgeStyle {
	pub production: Color,
	pub dev: Color,
	pub peer: Color,
	pub optional: Color,
	pub cycle: Color,
	pub highlighted_cycle: Color,
	/// Dash pattern for dev/optional edges, graph units.
	pub dash: (f64, f64),
}

impl EdgeStyle {
	pub fn color(&self, kind: DependencyKind) -> Color {
		match kind {
			DependencyKind::Production => self.production,
			DependencyKind::Dev => self.dev,
			DependencyKind::Peer => self.peer,
			DependencyKind::Optional => self.optional,
		}
	}

	pub fn is_dashed(&self, kind: DependencyKind) -> bool {
		matches!(kind, DependencyKind::Dev | DependencyKind::Optional)
	}
}

#[derive(Clone, Debug)]
pub struct LabelStyle {
	pub color: Color,
	pub halo: Color,
}

/// Minimap, tooltip, legend and watermark colors.
#[derive(Clone, Debug)]
pub struct OverlayStyle {
	pub panel: Color,
	pub border: Color,
	pub text: Color,
	pub minimap_node: Color,
	pub minimap_viewport: Color,
	pub watermark: Color,
}

/// Complete color scheme for one view.
#[derive(Clone, Debug)]
pub struct Theme {
	/// Identifier, e.g. `default` or `light`.
	pub name: &'static str,
	/// Canvas and export background.
	pub background: Color,
	/// Node fills, strokes and badges.
	pub node: NodeStyle,
	/// Link colors per dependency kind and cycle state.
	pub edge: EdgeStyle,
	/// Node label text.
	pub label: LabelStyle,
	/// Minimap, tooltip, legend and watermark.
	pub overlay: OverlayStyle,
}

impl Theme {
	/// Dark slate (default).
	pub fn default_theme() -> Self {
		Self {
			name: "default",
			background: Color::rgb(22, 27, 34),
			node: NodeStyle {
				palette: NodePalette::slate(),
				stroke: Color::rgb(226, 232, 240),
				cycle_fill: Color::rgb(220, 38, 38),
				highlighted_cycle_fill: Color::rgb(249, 115, 22),
				selection_ring: Color::rgb(250, 204, 21),
				hover_lighten: 0.3,
				dimmed_alpha: 0.3,
				badge_fill: Color::rgb(51, 65, 85),
				badge_text: Color::rgb(241, 245, 249),
			},
			edge: EdgeStyle {
				production: Color::rgba(140, 160, 180, 0.6),
				dev: Color::rgba(96, 165, 250, 0.55),
				peer: Color::rgba(167, 139, 250, 0.55),
				optional: Color::rgba(148, 163, 184, 0.4),
				cycle: Color::rgba(239, 68, 68, 0.85),
				highlighted_cycle: Color::rgb(249, 115, 22),
				dash: (6.0, 4.0),
			},
			label: LabelStyle {
				color: Color::rgb(203, 213, 225),
				halo: Color::rgba(22, 27, 34, 0.8),
			},
			overlay: OverlayStyle {
				panel: Color::rgba(30, 35, 42, 0.92),
				border: Color::rgb(51, 65, 85),
				text: Color::rgb(226, 232, 240),
				minimap_node: Color::rgba(148, 163, 184, 0.8),
				minimap_viewport: Color::rgba(250, 204, 21, 0.8),
				watermark: Color::rgba(148, 163, 184, 0.6),
			},
		}
	}

	/// Light theme used for exports that go into documents.
	pub fn light() -> Self {
		Self {
			name: "light",
			background: Color::rgb(255, 255, 255),
			node: NodeStyle {
				palette: NodePalette::ink(),
				stroke: Color::rgb(255, 255, 255),
				cycle_fill: Color::rgb(220, 38, 38),
				highlighted_cycle_fill: Color::rgb(234, 88, 12),
				selection_ring: Color::rgb(202, 138, 4),
				hover_lighten: 0.25,
				dimmed_alpha: 0.25,
				badge_fill: Color::rgb(30, 41, 59),
				badge_text: Color::rgb(255, 255, 255),
			},
			edge: EdgeStyle {
				production: Color::rgba(71, 85, 105, 0.6),
				dev: Color::rgba(37, 99, 235, 0.55),
				peer: Color::rgba(124, 58, 237, 0.55),
				optional: Color::rgba(100, 116, 139, 0.4),
				cycle: Color::rgba(220, 38, 38, 0.85),
				highlighted_cycle: Color::rgb(234, 88, 12),
				dash: (6.0, 4.0),
			},
			label: LabelStyle {
				color: Color::rgb(30, 41, 59),
				halo: Color::rgba(255, 255, 255, 0.85),
			},
			overlay: OverlayStyle {
				panel: Color::rgba(248, 250, 252, 0.95),
				border: Color::rgb(203, 213, 225),
				text: Color::rgb(15, 23, 42),
				minimap_node: Color::rgba(71, 85, 105, 0.8),
				minimap_viewport: Color::rgba(202, 138, 4, 0.8),
				watermark: Color::rgba(100, 116, 139, 0.7),
			},
		}
	}

	/// Base fill for a node before hover effects.
	pub fn node_fill(&self, depth: usize, in_cycle: bool, on_highlighted_cycle: bool) -> Color {
		if on_highlighted_cycle {
			self.node.highlighted_cycle_fill
		} else if in_cycle {
			self.node.cycle_fill
		} else {
			self.node.palette.get(depth)
		}
	}

	/// Stroke for a link of `kind`.
	pub fn edge_color(&self, kind: DependencyKind, in_cycle: bool, on_highlighted_cycle: bool) -> Color {
		if on_highlighted_cycle {
			self.edge.highlighted_cycle
		} else if in_cycle {
			self.edge.cycle
		} else {
			self.edge.color(kind)
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::default_theme()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn css_output_drops_alpha_when_opaque() {
		assert_eq!(Color::rgb(255, 0, 16).to_css(), "#ff0010");
		assert_eq!(Color::rgba(1, 2, 3, 0.5).to_css(), "rgba(1, 2, 3, 0.5)");
		assert_eq!(Color::rgba(1, 2, 3, 0.5).to_css_rgb(), "#010203");
	}

	#[test]
	fn cycle_colors_take_precedence() {
		let theme = Theme::default();
		assert_eq!(theme.node_fill(3, true, true), theme.node.highlighted_cycle_fill);
		assert_eq!(theme.node_fill(3, true, false), theme.node.cycle_fill);
		assert_eq!(theme.node_fill(0, false, false), theme.node.palette.get(0));
		assert_eq!(
			theme.edge_color(DependencyKind::Dev, false, false),
			theme.edge.dev
		);
		assert!(theme.edge.is_dashed(DependencyKind::Optional));
		assert!(!theme.edge.is_dashed(DependencyKind::Peer));
	}

	#[test]
	fn light_theme_keeps_cycle_colors_distinct_from_palette() {
		let theme = Theme::light();
		assert!(theme.background.is_opaque());
		assert!(!theme.node.palette.colors.contains(&theme.node.cycle_fill));
		assert_eq!(theme.node_fill(7, false, false), theme.node.palette.get(2));
	}
}
