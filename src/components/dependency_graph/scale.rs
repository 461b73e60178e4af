//! Zoom-dependent sizing for graph visuals.
//!
//! Node radii live in graph space and grow with zoom like everything else.
//! Strokes, labels and arrowheads use a [`ScaleBehavior`] so they stay legible
//! at the zoom extremes.
//!
//! # Coordinate Spaces
//!
//! - **Graph space**: layout coordinates. Values here scale with zoom.
//! - **Screen space**: CSS pixels on the surface. Values here stay fixed.
//!
//! [`ScaledValues`] resolves a [`ScaleConfig`] for one zoom level `k`; every
//! value it holds is in graph space, ready to draw after the pan/zoom
//! transform.

/// How a visual property scales with zoom level.
#[derive(Clone, Debug)]
#[allow(
	dead_code,
	reason = "World variant completes the API for callers customizing ScaleConfig"
)]
pub enum ScaleBehavior {
	/// Constant graph-space size. Appears larger when zoomed in.
	World,
	/// Constant screen-space size (pixels).
	Screen,
	/// Graph-space size clamped to min/max screen-space bounds.
	Clamped { min_screen: f64, max_screen: f64 },
}

impl ScaleBehavior {
	/// Graph-space value for `base` at zoom `k`.
	pub fn apply(&self, base: f64, k: f64) -> f64 {
		match self {
			ScaleBehavior::World => base,
			ScaleBehavior::Screen => base / k,
			ScaleBehavior::Clamped {
				min_screen,
				max_screen,
			} => base.clamp(min_screen / k, max_screen / k),
		}
	}
}

/// How opacity scales with zoom level.
#[derive(Clone, Debug)]
#[allow(
	dead_code,
	reason = "Constant/ScaleWithZoom variants available for custom alpha behaviors"
)]
pub enum AlphaBehavior {
	Constant,
	/// Linear in zoom, clamped to [0, 1].
	ScaleWithZoom,
	/// Zero at `zero_alpha_k`, fully opaque at `full_alpha_k`.
	Fade { zero_alpha_k: f64, full_alpha_k: f64 },
}

impl AlphaBehavior {
	pub fn apply(&self, k: f64) -> f64 {
		match self {
			AlphaBehavior::Constant => 1.0,
			AlphaBehavior::ScaleWithZoom => k.clamp(0.0, 1.0),
			AlphaBehavior::Fade {
				zero_alpha_k,
				full_alpha_k,
			} => {
				if zero_alpha_k == full_alpha_k {
					return 1.0;
				}
				((k - zero_alpha_k) / (full_alpha_k - zero_alpha_k)).clamp(0.0, 1.0)
			}
		}
	}
}

#[derive(Clone, Debug)]
pub struct NodeScaleConfig {
	/// Radius of a package with no dependencies, graph units.
	pub min_radius: f64,
	pub max_radius: f64,
	/// Radius added per outgoing dependency.
	pub radius_per_dependency: f64,
	/// Pointer hit radius, graph units.
	pub hit_radius: f64,
	pub stroke_width: f64,
	pub stroke_behavior: ScaleBehavior,
	/// Label font size in screen pixels at zoom 1.
	pub label_size: f64,
	/// Below this zoom the label font stops growing in graph space.
	pub label_min_k: f64,
	/// Gap between node edge and the top of its label, graph units.
	pub label_gap: f64,
	/// Longer names are cut and suffixed with an ellipsis.
	pub label_max_chars: usize,
	pub label_alpha_behavior: AlphaBehavior,
}

#[derive(Clone, Debug)]
pub struct EdgeScaleConfig {
	pub line_width: f64,
	pub cycle_line_width: f64,
	pub width_behavior: ScaleBehavior,
}

#[derive(Clone, Debug)]
pub struct ArrowScaleConfig {
	pub size: f64,
	pub size_behavior: ScaleBehavior,
	pub alpha_behavior: AlphaBehavior,
	/// Arrowheads fainter than this are skipped.
	pub cull_alpha: f64,
}

/// Selection ring and collapsed-count badge.
#[derive(Clone, Debug)]
pub struct MarkerScaleConfig {
	pub ring_width: f64,
	pub ring_offset: f64,
	pub badge_size: f64,
}

#[derive(Clone, Debug)]
pub struct ScaleConfig {
	pub node: NodeScaleConfig,
	pub edge: EdgeScaleConfig,
	pub arrow: ArrowScaleConfig,
	pub marker: MarkerScaleConfig,
}

impl Default for ScaleConfig {
	fn default() -> Self {
		Self {
			node: NodeScaleConfig {
				min_radius: 8.0,
				max_radius: 16.0,
				radius_per_dependency: 0.5,
				hit_radius: 12.0,
				stroke_width: 1.5,
				stroke_behavior: ScaleBehavior::Clamped {
					min_screen: 0.75,
					max_screen: 3.0,
				},
				label_size: 11.0,
				label_min_k: 0.5,
				label_gap: 4.0,
				label_max_chars: 20,
				label_alpha_behavior: AlphaBehavior::Fade {
					zero_alpha_k: 0.25,
					full_alpha_k: 0.5,
				},
			},
			edge: EdgeScaleConfig {
				line_width: 1.5,
				cycle_line_width: 2.5,
				width_behavior: ScaleBehavior::Clamped {
					min_screen: 0.5,
					max_screen: 6.0,
				},
			},
			arrow: ArrowScaleConfig {
				size: 6.0,
				size_behavior: ScaleBehavior::Clamped {
					min_screen: 0.0,
					max_screen: 18.0,
				},
				alpha_behavior: AlphaBehavior::Fade {
					zero_alpha_k: 0.15,
					full_alpha_k: 0.4,
				},
				cull_alpha: 0.05,
			},
			marker: MarkerScaleConfig {
				ring_width: 2.5,
				ring_offset: 3.0,
				badge_size: 10.0,
			},
		}
	}
}

impl ScaleConfig {
	/// Graph-space radius for a package with `dependency_count` outgoing links.
	pub fn node_radius(&self, dependency_count: usize) -> f64 {
		let node = &self.node;
		(node.min_radius + node.radius_per_dependency * dependency_count as f64)
			.clamp(node.min_radius, node.max_radius)
	}

	pub fn truncate_label(&self, name: &str) -> String {
		truncate_label(name, self.node.label_max_chars)
	}
}

/// Cut `name` to at most `max_chars` characters, ending in `…` when cut.
pub fn truncate_label(name: &str, max_chars: usize) -> String {
	if name.chars().count() <= max_chars {
		return name.to_string();
	}
	let kept: String = name.chars().take(max_chars.saturating_sub(1)).collect();
	format!("{kept}…")
}

/// Scale values resolved for one zoom level. Build once per frame.
#[derive(Clone, Debug)]
pub struct ScaledValues {
	pub k: f64,
	pub hit_radius: f64,
	pub node_stroke: f64,
	/// Label font size in graph space.
	pub label_size: f64,
	pub label_font: String,
	pub label_gap: f64,
	pub label_alpha: f64,
	pub edge_width: f64,
	pub cycle_edge_width: f64,
	pub arrow_size: f64,
	pub arrow_alpha: f64,
	pub cull_arrows: bool,
	pub ring_width: f64,
	pub ring_offset: f64,
	pub badge_font: String,
}

impl ScaledValues {
	pub fn new(config: &ScaleConfig, k: f64) -> Self {
		let label_size = config.node.label_size / k.max(config.node.label_min_k);
		let arrow_alpha = config.arrow.alpha_behavior.apply(k);
		let width = &config.edge.width_behavior;

		Self {
			k,
			hit_radius: config.node.hit_radius,
			node_stroke: config.node.stroke_behavior.apply(config.node.stroke_width, k),
			label_size,
			label_font: format!("{label_size}px sans-serif"),
			label_gap: config.node.label_gap,
			label_alpha: config.node.label_alpha_behavior.apply(k),
			edge_width: width.apply(config.edge.line_width, k),
			cycle_edge_width: width.apply(config.edge.cycle_line_width, k),
			arrow_size: config.arrow.size_behavior.apply(config.arrow.size, k),
			arrow_alpha,
			cull_arrows: arrow_alpha < config.arrow.cull_alpha,
			ring_width: config.marker.ring_width / k,
			ring_offset: config.marker.ring_offset / k,
			badge_font: format!("bold {}px sans-serif", config.marker.badge_size / k.max(0.5)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn node_radius_is_clamped_between_eight_and_sixteen() {
		let config = ScaleConfig::default();
		assert_eq!(config.node_radius(0), 8.0);
		assert_eq!(config.node_radius(4), 10.0);
		assert_eq!(config.node_radius(16), 16.0);
		assert_eq!(config.node_radius(400), 16.0);
	}

	#[test]
	fn labels_truncate_on_char_boundaries() {
		assert_eq!(truncate_label("short", 20), "short");
		assert_eq!(truncate_label("@scope/very-long-package-name", 10), "@scope/ve…");
		assert_eq!(truncate_label("ünïcödé-ñame", 5), "ünïc…");
	}

	#[test]
	fn clamped_behavior_bounds_screen_size() {
		let behavior = ScaleBehavior::Clamped {
			min_screen: 1.0,
			max_screen: 4.0,
		};
		// At k = 0.1 a 1.5 graph unit stroke would be 0.15 px; clamp to 1 px.
		assert!((behavior.apply(1.5, 0.1) - 10.0).abs() < 1e-9);
		assert!((behavior.apply(1.5, 4.0) - 1.0).abs() < 1e-9);
		assert_eq!(ScaleBehavior::Screen.apply(2.0, 2.0), 1.0);
	}

	#[test]
	fn labels_fade_when_zoomed_out() {
		let config = ScaleConfig::default();
		assert_eq!(ScaledValues::new(&config, 1.0).label_alpha, 1.0);
		assert_eq!(ScaledValues::new(&config, 0.1).label_alpha, 0.0);
		assert!(!ScaledValues::new(&config, 1.0).cull_arrows);
		assert!(ScaledValues::new(&config, 0.1).cull_arrows);
	}
}
