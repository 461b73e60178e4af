//! Tunables for one graph view.

use super::layout::SimulationParameters;
use super::mode::RASTER_THRESHOLD;
use super::scale::ScaleConfig;
use super::theme::Theme;
use super::types::Size;

/// Tunables for one view. The default suits a dark page.
#[derive(Clone, Debug)]
pub struct GraphConfig {
	/// Screen-space sizing of nodes, links, arrows and labels.
	pub scale: ScaleConfig,
	/// Colors for both backends and exports.
	pub theme: Theme,
	/// Layout physics and cooling.
	pub simulation: SimulationParameters,
	/// Auto mode switches to the raster backend at this many visible nodes.
	pub raster_threshold: usize,
	/// Second click on the same node within this window is a double click.
	pub click_window_ms: f64,
	/// Layout recenters this long after the last resize event.
	pub resize_debounce_ms: i32,
	/// Graph units kept around the layout by "fit to graph".
	pub fit_padding: f64,
	/// Minimap canvas size in CSS pixels.
	pub minimap_size: Size,
	/// Graph units added around the layout bounds inside the minimap.
	pub minimap_padding: f64,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			scale: ScaleConfig::default(),
			theme: Theme::default(),
			simulation: SimulationParameters::default(),
			raster_threshold: RASTER_THRESHOLD,
			click_window_ms: 250.0,
			resize_debounce_ms: 150,
			fit_padding: 40.0,
			minimap_size: Size::new(180.0, 120.0),
			minimap_padding: 20.0,
		}
	}
}
