//! Pan and zoom shared by both backends and every overlay.
//!
//! Screen = graph * zoom + pan. All mutation goes through methods so the zoom
//! clamp always holds.

use super::types::{Bounds, Point, Size};

/// Furthest zoomed out.
pub const MIN_ZOOM: f64 = 0.1;
/// Furthest zoomed in.
pub const MAX_ZOOM: f64 = 4.0;
/// Factor applied by the zoom buttons, keyboard shortcuts and one wheel notch.
pub const ZOOM_STEP: f64 = 1.2;

/// Zoom factor and pan offset. The default is 1:1 with no pan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	zoom: f64,
	pan_x: f64,
	pan_y: f64,
}

impl Default for Viewport {
	fn default() -> Self {
		Self {
			zoom: 1.0,
			pan_x: 0.0,
			pan_y: 0.0,
		}
	}
}

impl Viewport {
	/// Current zoom factor.
	pub fn zoom(&self) -> f64 {
		self.zoom
	}

	/// Screen-space offset of the graph origin.
	pub fn pan(&self) -> Point {
		Point::new(self.pan_x, self.pan_y)
	}

	/// Clamped to `[MIN_ZOOM, MAX_ZOOM]`; NaN is ignored. Returns the zoom in
	/// effect afterwards.
	pub fn set_zoom(&mut self, zoom: f64) -> f64 {
		if !zoom.is_nan() {
			self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
		}
		self.zoom
	}

	/// Non-finite offsets are ignored.
	pub fn set_pan(&mut self, x: f64, y: f64) {
		if x.is_finite() && y.is_finite() {
			self.pan_x = x;
			self.pan_y = y;
		}
	}

	/// Shift the pan by a screen-space delta.
	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		self.set_pan(self.pan_x + dx, self.pan_y + dy);
	}

	/// Zoom by `factor` keeping the graph point under `anchor` (screen space)
	/// fixed.
	pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
		let before = self.screen_to_graph(anchor);
		self.set_zoom(self.zoom * factor);
		self.set_pan(anchor.x - before.x * self.zoom, anchor.y - before.y * self.zoom);
	}

	/// One step in, around the middle of `size`.
	pub fn zoom_in(&mut self, size: Size) {
		self.zoom_at(size.center(), ZOOM_STEP);
	}

	/// One step out, around the middle of `size`.
	pub fn zoom_out(&mut self, size: Size) {
		self.zoom_at(size.center(), 1.0 / ZOOM_STEP);
	}

	/// Back to 1:1 with no pan.
	pub fn reset(&mut self) {
		*self = Self::default();
	}

	/// Zoom and pan so `bounds` (grown by `padding` graph units) fills `size`.
	/// Never zooms past 1:1 to fit a small graph.
	pub fn fit_to_bounds(&mut self, bounds: Bounds, size: Size, padding: f64) {
		if size.is_empty() {
			return;
		}
		let padded = bounds.expand(padding);
		let (w, h) = (padded.width().max(1.0), padded.height().max(1.0));
		self.set_zoom((size.width / w).min(size.height / h).min(1.0));
		self.center_on(padded.center(), size);
	}

	/// Pan so `point` (graph space) lands at the middle of `size`.
	pub fn center_on(&mut self, point: Point, size: Size) {
		let middle = size.center();
		self.set_pan(middle.x - point.x * self.zoom, middle.y - point.y * self.zoom);
	}

	/// Inverse of [`Viewport::graph_to_screen`].
	pub fn screen_to_graph(&self, screen: Point) -> Point {
		Point::new(
			(screen.x - self.pan_x) / self.zoom,
			(screen.y - self.pan_y) / self.zoom,
		)
	}

	/// Where a graph-space point is drawn.
	pub fn graph_to_screen(&self, graph: Point) -> Point {
		Point::new(
			graph.x * self.zoom + self.pan_x,
			graph.y * self.zoom + self.pan_y,
		)
	}

	/// The graph-space rectangle currently on screen.
	pub fn visible_rect(&self, size: Size) -> Bounds {
		let top_left = self.screen_to_graph(Point::new(0.0, 0.0));
		let bottom_right = self.screen_to_graph(Point::new(size.width, size.height));
		Bounds::new(top_left.x, top_left.y, bottom_right.x, bottom_right.y)
	}

	/// Zoom rounded to a whole percentage, for labels.
	pub fn zoom_percent(&self) -> u32 {
		(self.zoom * 100.0).round() as u32
	}
}
