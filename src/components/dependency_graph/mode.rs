//! Vector/raster backend selection.

use serde::{Deserialize, Serialize};

/// Node count at which `Auto` switches to the raster backend.
pub const RASTER_THRESHOLD: usize = 500;

/// Which backend draws the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderMode {
	/// Retained SVG scene, one element per node and link.
	Vector,
	/// Canvas repainted every frame.
	Raster,
}

impl RenderMode {
	/// Name used in the mode indicator.
	pub fn label(self) -> &'static str {
		match self {
			RenderMode::Vector => "SVG",
			RenderMode::Raster => "Canvas",
		}
	}
}

/// The user's persisted choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualizationPreference {
	/// Pick by node count.
	#[default]
	Auto,
	/// Always SVG, whatever the size.
	ForceVector,
	/// Always canvas.
	ForceRaster,
}

impl VisualizationPreference {
	/// Every preference, in menu order.
	pub const ALL: [VisualizationPreference; 3] = [
		VisualizationPreference::Auto,
		VisualizationPreference::ForceVector,
		VisualizationPreference::ForceRaster,
	];

	/// Value used in the preference `<select>`; matches the serialized form.
	pub fn value(self) -> &'static str {
		match self {
			VisualizationPreference::Auto => "auto",
			VisualizationPreference::ForceVector => "force-vector",
			VisualizationPreference::ForceRaster => "force-raster",
		}
	}

	/// Menu text.
	pub fn label(self) -> &'static str {
		match self {
			VisualizationPreference::Auto => "Auto",
			VisualizationPreference::ForceVector => "Always SVG",
			VisualizationPreference::ForceRaster => "Always Canvas",
		}
	}

	/// Inverse of [`VisualizationPreference::value`].
	pub fn from_value(value: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|p| p.value() == value)
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderModeSelection {
	pub mode: RenderMode,
	pub is_forced: bool,
	/// Advisory shown when vector rendering is forced on a large graph.
	pub performance_warning: Option<String>,
}

pub fn select_render_mode(
	node_count: usize,
	preference: VisualizationPreference,
	threshold: usize,
) -> RenderModeSelection {
	match preference {
		VisualizationPreference::Auto => RenderModeSelection {
			mode: if node_count >= threshold {
				RenderMode::Raster
			} else {
				RenderMode::Vector
			},
			is_forced: false,
			performance_warning: None,
		},
		VisualizationPreference::ForceVector => RenderModeSelection {
			mode: RenderMode::Vector,
			is_forced: true,
			performance_warning: (node_count >= threshold).then(|| {
				format!(
					"SVG rendering {node_count} nodes may be slow; Canvas is recommended above {threshold} nodes"
				)
			}),
		},
		VisualizationPreference::ForceRaster => RenderModeSelection {
			mode: RenderMode::Raster,
			is_forced: true,
			performance_warning: None,
		},
	}
}

/// `"N nodes • SVG mode"`, with `" • Forced"` appended for forced modes.
/// `None` for an empty graph.
pub fn mode_indicator_label(node_count: usize, selection: &RenderModeSelection) -> Option<String> {
	if node_count == 0 {
		return None;
	}
	let noun = if node_count == 1 { "node" } else { "nodes" };
	let mut label = format!("{node_count} {noun} • {} mode", selection.mode.label());
	if selection.is_forced {
		label.push_str(" • Forced");
	}
	Some(label)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn auto_switches_at_threshold() {
		let auto = VisualizationPreference::Auto;
		assert_eq!(select_render_mode(499, auto, RASTER_THRESHOLD).mode, RenderMode::Vector);
		assert_eq!(select_render_mode(500, auto, RASTER_THRESHOLD).mode, RenderMode::Raster);
		assert!(!select_render_mode(500, auto, RASTER_THRESHOLD).is_forced);
	}

	#[test]
	fn forced_modes_ignore_count() {
		let vector = select_render_mode(10_000, VisualizationPreference::ForceVector, RASTER_THRESHOLD);
		assert_eq!(vector.mode, RenderMode::Vector);
		assert!(vector.is_forced);
		assert!(vector.performance_warning.is_some());

		let raster = select_render_mode(3, VisualizationPreference::ForceRaster, RASTER_THRESHOLD);
		assert_eq!(raster.mode, RenderMode::Raster);
		assert!(raster.performance_warning.is_none());

		let small = select_render_mode(3, VisualizationPreference::ForceVector, RASTER_THRESHOLD);
		assert!(small.performance_warning.is_none());
	}

	#[test]
	fn indicator_label_format() {
		let auto = select_render_mode(42, VisualizationPreference::Auto, RASTER_THRESHOLD);
		assert_eq!(mode_indicator_label(42, &auto).as_deref(), Some("42 nodes • SVG mode"));

		let forced = select_render_mode(42, VisualizationPreference::ForceRaster, RASTER_THRESHOLD);
		assert_eq!(
			mode_indicator_label(42, &forced).as_deref(),
			Some("42 nodes • Canvas mode • Forced")
		);
		assert_eq!(mode_indicator_label(0, &auto), None);
	}

	#[test]
	fn preference_serializes_kebab_case() {
		let json = serde_json::to_string(&VisualizationPreference::ForceVector).expect("serializes");
		assert_eq!(json, r#""force-vector""#);
		assert_eq!(
			VisualizationPreference::from_value("force-raster"),
			Some(VisualizationPreference::ForceRaster)
		);
		assert_eq!(VisualizationPreference::from_value("bogus"), None);
	}
}
