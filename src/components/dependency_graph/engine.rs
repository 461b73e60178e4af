//! Interactive state behind one graph view.
//!
//! [`GraphEngine`] owns the model, the collapsed set, the visible subset,
//! the layout solver, the retained scene and every piece of pointer state.
//! It never touches the DOM. The viewport is owned by the component and
//! passed in wherever an operation reads or moves it.

use chrono::NaiveDate;

use super::config::GraphConfig;
use super::export::{ExportError, ExportOptions, ExportOutcome, ExportPipeline, ExportProgress, ExportRequest};
use super::highlight::HighlightState;
use super::hit_test::{Cursor, find_node_at_position, get_mouse_position};
use super::interaction::{
	ClickAction, ClickDisambiguator, DRAG_THRESHOLD, HoverState, KeyAction, PointerState, Selection,
};
use super::layout::{ForceSimulation, SimulationEvent};
use super::mode::{
	RenderModeSelection, VisualizationPreference, mode_indicator_label, select_render_mode,
};
use super::overlays::{
	LegendEntry, MINIMAP_MIN_NODES, MinimapLayout, TooltipContent, legend_entries, tooltip_content,
};
use super::raster::{PaintStats, RasterFrame, RasterSurface, paint_frame};
use super::scene::VectorScene;
use super::transform::GraphModel;
use super::types::{Bounds, CircularDependencyInfo, DependencyGraph, PackageNode, Point, Size};
use super::viewport::{Viewport, ZOOM_STEP};
use super::visibility::{CollapseState, VisibilityResult, compute_visibility};

/// Result of one animation frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameUpdate {
	/// Node positions changed.
	pub moved: bool,
	/// Another frame is needed.
	pub animating: bool,
	/// Set once per rebuild, on the frame the layout first settles.
	pub settled: Option<Bounds>,
}

/// Headless state behind one graph view: model, visibility, layout, scene,
/// interaction and export. The Leptos component drives it from DOM events;
/// tests drive it directly.
pub struct GraphEngine {
	config: GraphConfig,
	model: GraphModel,
	collapsed: CollapseState,
	visibility: VisibilityResult,
	simulation: ForceSimulation,
	scene: VectorScene,
	selection: Selection,
	highlight: HighlightState,
	hover: HoverState,
	pointer: PointerState,
	clicks: ClickDisambiguator,
	preference: VisualizationPreference,
	render_mode: RenderModeSelection,
	surface: Size,
	exports: ExportPipeline,
	fit_pending: bool,
}

impl Default for GraphEngine {
	fn default() -> Self {
		Self::new(GraphConfig::default())
	}
}

impl GraphEngine {
	/// An empty engine. Call [`GraphEngine::load`] to show a graph.
	pub fn new(config: GraphConfig) -> Self {
		let preference = VisualizationPreference::default();
		Self {
			simulation: ForceSimulation::new(config.simulation.clone()),
			clicks: ClickDisambiguator::new(config.click_window_ms),
			render_mode: select_render_mode(0, preference, config.raster_threshold),
			config,
			model: GraphModel::default(),
			collapsed: CollapseState::default(),
			visibility: VisibilityResult::default(),
			scene: VectorScene::default(),
			selection: Selection::default(),
			highlight: HighlightState::default(),
			hover: HoverState::default(),
			pointer: PointerState::default(),
			preference,
			surface: Size::new(800.0, 600.0),
			exports: ExportPipeline::default(),
			fit_pending: false,
		}
	}

	/// Replace the graph. Layout restarts from scratch; the selection survives
	/// if its node still exists and collapsed ids naming unknown nodes are
	/// dropped.
	pub fn load(
		&mut self,
		graph: &DependencyGraph,
		cycles: &[CircularDependencyInfo],
		mut collapsed: CollapseState,
	) {
		self.model = GraphModel::build(graph, cycles);
		collapsed.retain_known(|id| self.model.contains(id));
		self.collapsed = collapsed;
		if self
			.selection
			.node_id
			.as_deref()
			.is_some_and(|id| !self.model.contains(id))
		{
			self.selection.clear();
		}
		self.highlight.clear();
		self.hover = HoverState::default();
		self.pointer = PointerState::Idle;
		self.clicks.cancel();
		self.refresh();
	}

	/// Recompute visibility and restart the layout over the visible subset.
	fn refresh(&mut self) {
		self.visibility = compute_visibility(&self.model.nodes, &self.model.links, &self.collapsed);
		self.scene.rebuild(&self.visibility, &self.config.scale);
		let scale = &self.config.scale;
		self.simulation.restart(
			&self.visibility.visible_nodes,
			&self.visibility.visible_links,
			|n| scale.node_radius(n.dependency_count),
			self.surface.center(),
		);
		self.scene.sync_positions(&self.simulation);
		self.fit_pending = true;

		if self
			.hover
			.node_id
			.as_deref()
			.is_some_and(|id| !self.visibility.is_visible(id))
		{
			self.clear_hover();
		}
		self.update_render_mode();
	}

	fn update_render_mode(&mut self) -> bool {
		let next = select_render_mode(
			self.visibility.visible_nodes.len(),
			self.preference,
			self.config.raster_threshold,
		);
		if next == self.render_mode {
			return false;
		}
		if next.mode != self.render_mode.mode {
			log::info!("depgraph-view: switching to {} rendering", next.mode.label());
		}
		if let Some(warning) = &next.performance_warning {
			log::warn!("depgraph-view: {warning}");
		}
		self.render_mode = next;
		true
	}

	/// Returns whether the render mode changed.
	pub fn set_preference(&mut self, preference: VisualizationPreference) -> bool {
		self.preference = preference;
		self.update_render_mode()
	}

	/// Replace the collapsed set, dropping unknown ids, and restart layout.
	pub fn set_collapsed(&mut self, mut collapsed: CollapseState) {
		collapsed.retain_known(|id| self.model.contains(id));
		self.collapsed = collapsed;
		self.refresh();
	}

	/// Collapse or expand `id`. Leaf packages cannot be collapsed.
	pub fn toggle_collapse(&mut self, id: &str) -> bool {
		let has_children = self.model.links.iter().any(|l| l.source_id() == id);
		if !self.model.contains(id) || (!has_children && !self.collapsed.is_collapsed(id)) {
			return false;
		}
		let collapsed = self.collapsed.toggle(id);
		log::debug!(
			"depgraph-view: {} {id}",
			if collapsed { "collapsed" } else { "expanded" }
		);
		self.refresh();
		true
	}

	/// Returns whether anything was collapsed.
	pub fn expand_all(&mut self) -> bool {
		if self.collapsed.is_empty() {
			return false;
		}
		self.collapsed.expand_all();
		self.refresh();
		true
	}

	/// Replace the collapsed set so that nothing below `max_depth` shows
	/// unless reachable another way. Returns whether the set changed.
	pub fn collapse_to_depth(&mut self, max_depth: usize) -> bool {
		let before = self.collapsed.clone();
		self.collapsed
			.collapse_to_depth(&self.model.nodes, &self.model.links, max_depth);
		if self.collapsed == before {
			return false;
		}
		log::debug!(
			"depgraph-view: collapsed to depth {max_depth} ({} nodes)",
			self.collapsed.len()
		);
		self.refresh();
		true
	}

	/// Tick the layout and hover animation by `dt` seconds.
	pub fn advance(&mut self, dt: f64) -> FrameUpdate {
		let mut update = FrameUpdate::default();
		match self.simulation.tick() {
			Some(SimulationEvent::Tick) => update.moved = true,
			Some(SimulationEvent::End { bounds }) => {
				update.moved = true;
				if std::mem::take(&mut self.fit_pending) {
					update.settled = bounds;
				}
			}
			None => {}
		}
		if update.moved {
			self.scene.sync_positions(&self.simulation);
		}
		let highlighting = self.highlight.tick(dt);
		update.animating = self.simulation.is_running() || highlighting;
		update
	}

	/// New surface size: recenter and reheat the layout without rebuilding.
	pub fn resize(&mut self, size: Size) {
		if size == self.surface || size.is_empty() {
			return;
		}
		self.surface = size;
		self.simulation.set_center(size.center());
		if !self.simulation.is_empty() {
			self.simulation.kick(self.config.simulation.resize_alpha);
		}
	}

	/// Top-most visible node under a surface point.
	pub fn node_at(&self, screen: Point, viewport: &Viewport) -> Option<&PackageNode> {
		find_node_at_position(
			get_mouse_position(screen, viewport),
			&self.visibility.visible_nodes,
			&self.simulation,
			self.config.scale.node.hit_radius,
		)
	}

	/// Press on the surface: grab the node under the pointer, or start panning.
	pub fn pointer_down(&mut self, screen: Point, viewport: &Viewport) {
		match self.node_at(screen, viewport).map(|n| n.id.clone()) {
			Some(id) => self.begin_node_drag(&id, screen),
			None => self.begin_pan(screen, viewport),
		}
	}

	/// Press on empty background.
	pub fn begin_pan(&mut self, screen: Point, viewport: &Viewport) {
		self.pointer = PointerState::Panning {
			origin: screen,
			pan_origin: viewport.pan(),
			moved: false,
		};
	}

	/// A node drag or a pan is in progress.
	pub fn is_gesture_active(&self) -> bool {
		matches!(
			self.pointer,
			PointerState::DraggingNode { .. } | PointerState::Panning { .. }
		)
	}

	/// Follow the pointer without hit testing, for backends whose elements
	/// report enter and leave themselves. Returns whether a tooltip moved.
	pub fn move_hover(&mut self, screen: Point) -> bool {
		if self.is_gesture_active() || self.hover.node_id.is_none() {
			return false;
		}
		self.hover.position = Some(screen);
		true
	}

	/// Press on a known node, e.g. from a vector node element.
	pub fn begin_node_drag(&mut self, id: &str, screen: Point) {
		self.pointer = PointerState::DraggingNode {
			id: id.to_string(),
			origin: screen,
			moved: false,
		};
	}

	/// Returns whether anything visible changed.
	pub fn pointer_move(&mut self, screen: Point, viewport: &mut Viewport) -> bool {
		if matches!(self.pointer, PointerState::Idle | PointerState::Hovering { .. }) {
			let hit = self.node_at(screen, viewport).map(|n| n.id.clone());
			return self.set_hover(hit.as_deref(), Some(screen));
		}
		match &mut self.pointer {
			PointerState::DraggingNode { id, origin, moved } => {
				if !*moved && origin.distance(screen) < DRAG_THRESHOLD {
					return false;
				}
				*moved = true;
				let id = id.clone();
				self.clear_hover();
				self.simulation.drag_to(&id, viewport.screen_to_graph(screen))
			}
			PointerState::Panning {
				origin,
				pan_origin,
				moved,
			} => {
				if !*moved && origin.distance(screen) < DRAG_THRESHOLD {
					return false;
				}
				*moved = true;
				viewport.set_pan(
					pan_origin.x + screen.x - origin.x,
					pan_origin.y + screen.y - origin.y,
				);
				true
			}
			_ => false,
		}
	}

	/// Release. A press that never moved is a click and goes through the
	/// click disambiguator; the returned action, if any, is already applied.
	pub fn pointer_up(&mut self, screen: Point, now_ms: f64, viewport: &Viewport) -> Option<ClickAction> {
		let action = match std::mem::take(&mut self.pointer) {
			PointerState::DraggingNode { id, moved: true, .. } => {
				self.simulation.release(&id);
				None
			}
			PointerState::DraggingNode { id, moved: false, .. } => self.register_click(&id, now_ms),
			PointerState::Panning { moved: false, .. } => {
				self.selection.clear();
				None
			}
			_ => None,
		};
		let hit = self.node_at(screen, viewport).map(|n| n.id.clone());
		self.set_hover(hit.as_deref(), Some(screen));
		action
	}

	/// Pointer left the surface: end any gesture and drop hover state.
	pub fn pointer_leave(&mut self) {
		if let PointerState::DraggingNode { id, moved: true, .. } = std::mem::take(&mut self.pointer) {
			self.simulation.release(&id);
		}
		self.clear_hover();
	}

	/// Wheel notch at `screen`: zoom in for negative `delta_y`.
	pub fn wheel(&self, screen: Point, delta_y: f64, viewport: &mut Viewport) {
		let factor = if delta_y > 0.0 { 1.0 / ZOOM_STEP } else { ZOOM_STEP };
		viewport.zoom_at(screen, factor);
	}

	/// Hover a node (or nothing). Ignored during drag and pan gestures.
	/// Returns whether the hovered node changed.
	pub fn set_hover(&mut self, id: Option<&str>, position: Option<Point>) -> bool {
		if self.is_gesture_active() {
			return false;
		}
		self.hover.position = position;
		self.pointer = match id {
			Some(id) => PointerState::Hovering { id: id.to_string() },
			None => PointerState::Idle,
		};
		if self.hover.node_id.as_deref() == id {
			return false;
		}
		self.hover.node_id = id.map(str::to_string);
		self.highlight.set_hover(id, &self.visibility.visible_links);
		true
	}

	fn clear_hover(&mut self) {
		self.hover = HoverState::default();
		self.highlight.set_hover(None, &[]);
	}

	/// Feed a click on node `id` at `now_ms`. Returns the action if one is
	/// resolved already; a lone click is held for the double-click window.
	pub fn register_click(&mut self, id: &str, now_ms: f64) -> Option<ClickAction> {
		let action = self.clicks.register(id, now_ms)?;
		self.apply_click(&action);
		Some(action)
	}

	/// Release a held single click once its window has passed.
	pub fn flush_clicks(&mut self, now_ms: f64) -> Option<ClickAction> {
		let action = self.clicks.flush(now_ms)?;
		self.apply_click(&action);
		Some(action)
	}

	/// A single click is waiting for its window to close.
	pub fn has_pending_click(&self) -> bool {
		self.clicks.has_pending()
	}

	/// Single click selects / rotates cycle highlight; double click toggles
	/// collapse.
	pub fn apply_click(&mut self, action: &ClickAction) {
		match action {
			ClickAction::Single(id) => {
				let Some(node) = self.model.node(id) else {
					return;
				};
				let cycle_ids = node.cycle_ids.clone();
				self.selection.click(id, &cycle_ids);
			}
			ClickAction::Double(id) => {
				self.toggle_collapse(id);
			}
		}
	}

	/// Drop the selection and any cycle highlight.
	pub fn clear_selection(&mut self) {
		self.selection.clear();
	}

	/// Returns whether the view needs a repaint.
	pub fn handle_key(&mut self, action: KeyAction, viewport: &mut Viewport) -> bool {
		match action {
			KeyAction::ZoomIn => viewport.zoom_in(self.surface),
			KeyAction::ZoomOut => viewport.zoom_out(self.surface),
			KeyAction::ResetView => viewport.reset(),
			KeyAction::FitToGraph => return self.fit_view(viewport),
			KeyAction::ClearSelection => {
				let had = self.selection.node_id.is_some();
				self.selection.clear();
				return had;
			}
			KeyAction::ExpandAll => return self.expand_all(),
			KeyAction::ShowLevels(levels) => return self.collapse_to_depth(levels.saturating_sub(1)),
		}
		true
	}

	/// Fit the viewport to the current layout.
	pub fn fit_view(&self, viewport: &mut Viewport) -> bool {
		match self.simulation.bounds() {
			Some(bounds) => {
				viewport.fit_to_bounds(bounds, self.surface, self.config.fit_padding);
				true
			}
			None => false,
		}
	}

	/// Paint one raster frame.
	pub fn paint<S: RasterSurface>(&self, surface: &mut S, viewport: &Viewport, device_pixel_ratio: f64) -> PaintStats {
		paint_frame(
			surface,
			&RasterFrame {
				size: self.surface,
				device_pixel_ratio,
				viewport,
				visibility: &self.visibility,
				positions: &self.simulation,
				selection: &self.selection,
				highlight: &self.highlight,
				scale: &self.config.scale,
				theme: &self.config.theme,
			},
		)
	}

	/// Legend entries for what is currently visible.
	pub fn legend(&self) -> Vec<LegendEntry> {
		legend_entries(
			self.visibility.visible_links.iter().map(|l| l.kind),
			self.visibility.visible_nodes.iter().any(|n| n.in_cycle),
			self.visibility.hidden_child_counts.values().any(|&n| n > 0),
			&self.config.theme,
		)
	}

	/// Tooltip for the hovered node, with the pointer position it follows.
	pub fn tooltip(&self) -> Option<(TooltipContent, Point)> {
		if self.pointer.is_dragging() {
			return None;
		}
		let id = self.hover.node_id.as_deref()?;
		let position = self.hover.position?;
		let node = self.model.node(id)?;
		Some((tooltip_content(node, self.visibility.hidden_count(id)), position))
	}

	/// Minimap layout, or `None` for graphs too small to need one.
	pub fn minimap(&self) -> Option<MinimapLayout> {
		if self.visibility.visible_nodes.len() < MINIMAP_MIN_NODES {
			return None;
		}
		MinimapLayout::new(
			self.scene.bounds(),
			self.config.minimap_size,
			self.config.minimap_padding,
		)
	}

	/// `"N nodes • SVG mode"` style indicator; `None` when empty.
	pub fn mode_label(&self) -> Option<String> {
		mode_indicator_label(self.visibility.visible_nodes.len(), &self.render_mode)
	}

	/// Pointer cursor for the current gesture.
	pub fn cursor(&self) -> Cursor {
		let over_node = matches!(
			self.pointer,
			PointerState::Hovering { .. } | PointerState::DraggingNode { .. }
		);
		Cursor::for_state(over_node, self.pointer.is_dragging())
	}

	/// Export the current scene. Any export still in flight is aborted first.
	pub fn export(
		&mut self,
		options: &ExportOptions,
		viewport: &Viewport,
		project: &str,
		date: NaiveDate,
		on_progress: impl FnMut(ExportProgress),
	) -> Result<ExportOutcome, ExportError> {
		let legend = self.legend();
		let request = ExportRequest {
			scene: &self.scene,
			theme: &self.config.theme,
			scale: &self.config.scale,
			selection: &self.selection,
			viewport,
			surface: self.surface,
			legend: &legend,
			project,
			date,
		};
		self.exports.run(&request, options, on_progress)
	}

	/// Abort the export in flight, if any, and return to `Idle`.
	pub fn cancel_export(&mut self) {
		if self.exports.is_busy() {
			log::info!("depgraph-view: export cancelled by user");
		}
		self.exports.cancel();
	}

	/// Stage of the current export.
	pub fn export_progress(&self) -> ExportProgress {
		self.exports.progress()
	}

	/// Stop everything that would outlive the view.
	pub fn teardown(&mut self) {
		self.simulation.stop();
		self.clicks.cancel();
		self.exports.cancel();
		self.highlight.clear();
		self.hover = HoverState::default();
		self.pointer = PointerState::Idle;
		self.scene = VectorScene::default();
	}

	/// Tunables this engine was built with.
	pub fn config(&self) -> &GraphConfig {
		&self.config
	}

	pub(crate) fn model(&self) -> &GraphModel {
		&self.model
	}

	/// Visible subset and hidden-descendant counts.
	pub fn visibility(&self) -> &VisibilityResult {
		&self.visibility
	}

	/// Currently collapsed ids.
	pub fn collapsed(&self) -> &CollapseState {
		&self.collapsed
	}

	pub(crate) fn simulation(&self) -> &ForceSimulation {
		&self.simulation
	}

	/// Retained vector scene.
	pub fn scene(&self) -> &VectorScene {
		&self.scene
	}

	pub(crate) fn selection(&self) -> &Selection {
		&self.selection
	}

	pub(crate) fn highlight(&self) -> &HighlightState {
		&self.highlight
	}

	pub(crate) fn hover(&self) -> &HoverState {
		&self.hover
	}

	pub(crate) fn pointer(&self) -> &PointerState {
		&self.pointer
	}

	/// Active backend and whether it was forced.
	pub fn render_mode(&self) -> &RenderModeSelection {
		&self.render_mode
	}

	/// The user's backend preference.
	pub fn preference(&self) -> VisualizationPreference {
		self.preference
	}

	/// Drawing surface size in CSS pixels.
	pub fn surface(&self) -> Size {
		self.surface
	}

	/// The layout is still moving.
	pub fn is_animating(&self) -> bool {
		self.simulation.is_running()
	}
}
