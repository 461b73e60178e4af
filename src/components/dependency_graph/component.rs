//! Leptos component for the dependency graph.
//!
//! [`DependencyGraphView`] owns a [`GraphEngine`] and drives it from mouse,
//! wheel and keyboard events and from `requestAnimationFrame`. Graphs below
//! the raster threshold render as SVG, one element per node and link, with
//! positions held in per-element signals so a layout tick only rewrites
//! attributes. Larger graphs paint a canvas through [`RasterSurface`].
//!
//! [`RasterSurface`]: super::raster::RasterSurface

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{
	Blob, BlobPropertyBag, CanvasRenderingContext2d, HtmlAnchorElement, HtmlCanvasElement, KeyboardEvent,
	MouseEvent, Url, WheelEvent,
};

use super::config::GraphConfig;
use super::controls::{ExportButton, Legend, Minimap, ModeIndicator, Tooltip, ZoomControls};
use super::engine::GraphEngine;
use super::export::{ExportArtifact, ExportOptions, ExportOutcome, ExportProgress, marker_id};
use super::frame::{FrameScheduler, TimerSlot};
use super::hit_test::Cursor;
use super::interaction::{KeyAction, Selection, key_action};
use super::mode::{RenderMode, RenderModeSelection, VisualizationPreference};
use super::overlays::{LegendEntry, TooltipContent, paint_minimap};
use super::scale::ScaledValues;
use super::scene::{LinkElement, NodeElement, Segment, VectorScene};
use super::settings::{
	GraphSettings, KeyValueStore, LocalStorageStore, load_collapsed, load_settings_or_default, save_collapsed,
	save_settings,
};
use super::theme::Theme;
use super::types::{CircularDependencyInfo, DependencyGraph, DependencyKind, Point, Size};
use super::viewport::Viewport;
use super::visibility::CollapseState;

const DEFAULT_FRAME_DT: f64 = 1.0 / 60.0;
/// Longer gaps (a background tab) are treated as one slow frame.
const MAX_FRAME_DT: f64 = 0.1;

/// The view's viewport. One per view; both backends, the minimap and the
/// zoom readout all read the same handle.
#[derive(Clone, Copy, Debug)]
pub struct ViewportHandle(RwSignal<Viewport>);

impl ViewportHandle {
	pub fn new() -> Self {
		Self(RwSignal::new(Viewport::default()))
	}

	pub fn get(&self) -> Viewport {
		self.0.get()
	}

	pub fn get_untracked(&self) -> Viewport {
		self.0.get_untracked()
	}

	/// Mutate in place. Subscribers are notified only if the viewport
	/// actually changed.
	pub fn update<R>(&self, f: impl FnOnce(&mut Viewport) -> R) -> R {
		let before = self.0.get_untracked();
		let mut viewport = before;
		let result = f(&mut viewport);
		if viewport != before {
			self.0.set(viewport);
		}
		result
	}
}

impl Default for ViewportHandle {
	fn default() -> Self {
		Self::new()
	}
}

/// One SVG node. `generation` ties it to the scene it was built from.
#[derive(Clone)]
struct NodeView {
	generation: u64,
	id: String,
	label: String,
	radius: f64,
	depth: usize,
	cycle_ids: Vec<usize>,
	hidden_children: usize,
	position: ArcRwSignal<Option<Point>>,
}

impl NodeView {
	fn new(node: &NodeElement, generation: u64) -> Self {
		Self {
			generation,
			id: node.id.clone(),
			label: node.label.clone(),
			radius: node.radius,
			depth: node.depth,
			cycle_ids: node.cycle_ids.clone(),
			hidden_children: node.hidden_children,
			position: ArcRwSignal::new(node.position),
		}
	}
}

#[derive(Clone)]
struct LinkView {
	generation: u64,
	key: String,
	source: String,
	target: String,
	kind: DependencyKind,
	cycle_ids: Vec<usize>,
	segment: ArcRwSignal<Option<Segment>>,
}

impl LinkView {
	fn new(link: &LinkElement, generation: u64) -> Self {
		Self {
			generation,
			key: link.key.clone(),
			source: link.source.clone(),
			target: link.target.clone(),
			kind: link.kind,
			cycle_ids: link.cycle_ids.clone(),
			segment: ArcRwSignal::new(link.segment),
		}
	}
}

type SceneViews = (Vec<NodeView>, Vec<LinkView>, Vec<LinkView>);

fn scene_views(scene: &VectorScene) -> SceneViews {
	let generation = scene.generation();
	(
		scene.nodes().iter().map(|n| NodeView::new(n, generation)).collect(),
		scene.normal_links().iter().map(|l| LinkView::new(l, generation)).collect(),
		scene.cycle_links().iter().map(|l| LinkView::new(l, generation)).collect(),
	)
}

/// Engine state mirrored into signals for the view tree.
#[derive(Clone, Copy)]
struct ViewSignals {
	nodes: RwSignal<Vec<NodeView>>,
	links: RwSignal<Vec<LinkView>>,
	cycle_links: RwSignal<Vec<LinkView>>,
	selection: RwSignal<Selection>,
	hovered: RwSignal<Option<String>>,
	targets: RwSignal<HashSet<String>>,
	tooltip: RwSignal<Option<(TooltipContent, Point)>>,
	cursor: RwSignal<Cursor>,
	mode: RwSignal<RenderModeSelection>,
	mode_label: RwSignal<Option<String>>,
	preference: RwSignal<VisualizationPreference>,
	legend: RwSignal<Vec<LegendEntry>>,
	minimap: RwSignal<bool>,
	empty: RwSignal<bool>,
	size: RwSignal<Size>,
	export_progress: RwSignal<ExportProgress>,
	export_error: RwSignal<Option<String>>,
}

impl ViewSignals {
	fn new(engine: &GraphEngine) -> Self {
		Self {
			nodes: RwSignal::new(Vec::new()),
			links: RwSignal::new(Vec::new()),
			cycle_links: RwSignal::new(Vec::new()),
			selection: RwSignal::new(Selection::default()),
			hovered: RwSignal::new(None),
			targets: RwSignal::new(HashSet::new()),
			tooltip: RwSignal::new(None),
			cursor: RwSignal::new(Cursor::default()),
			mode: RwSignal::new(engine.render_mode().clone()),
			mode_label: RwSignal::new(None),
			preference: RwSignal::new(engine.preference()),
			legend: RwSignal::new(Vec::new()),
			minimap: RwSignal::new(false),
			empty: RwSignal::new(true),
			size: RwSignal::new(engine.surface()),
			export_progress: RwSignal::new(ExportProgress::Idle),
			export_error: RwSignal::new(None),
		}
	}
}

fn set_if_changed<T: PartialEq + Send + Sync + 'static>(signal: RwSignal<T>, value: T) {
	if signal.with_untracked(|current| *current != value) {
		signal.set(value);
	}
}

fn device_pixel_ratio() -> f64 {
	web_sys::window().map_or(1.0, |w| w.device_pixel_ratio())
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok().flatten()?.dyn_into().ok()
}

/// Hand an export to the browser as a file download.
fn download(artifact: &ExportArtifact) -> Result<(), JsValue> {
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| JsValue::from_str("no document"))?;
	let bytes = js_sys::Uint8Array::from(artifact.bytes.as_slice());
	let options = BlobPropertyBag::new();
	options.set_type(artifact.mime_type);
	let blob = Blob::new_with_u8_array_sequence_and_options(&js_sys::Array::of1(&bytes), &options)?;
	let url = Url::create_object_url_with_blob(&blob)?;
	let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
	anchor.set_href(&url);
	anchor.set_download(&artifact.filename);
	anchor.click();
	Url::revoke_object_url(&url)
}

/// Everything the event handlers and the frame loop share.
struct ViewRuntime {
	weak: Weak<ViewRuntime>,
	engine: RefCell<GraphEngine>,
	viewport: ViewportHandle,
	ui: ViewSignals,
	frames: FrameScheduler,
	click_timer: TimerSlot,
	resize_timer: TimerSlot,
	export_timer: TimerSlot,
	store: Option<Rc<dyn KeyValueStore>>,
	session: Option<String>,
	project: String,
	container: NodeRef<leptos::html::Div>,
	canvas: NodeRef<leptos::html::Canvas>,
	minimap: NodeRef<leptos::html::Canvas>,
	last_frame: Cell<Option<f64>>,
	synced: Cell<Option<(u64, RenderMode)>>,
	saved_collapsed: RefCell<CollapseState>,
	resize_listener: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl ViewRuntime {
	/// Install the frame callback and the debounced window resize listener.
	fn mount(&self) {
		let weak = self.weak.clone();
		self.frames.set_callback(move |timestamp| {
			if let Some(rt) = weak.upgrade() {
				rt.on_frame(timestamp);
			}
		});
		self.resize();

		let Some(window) = web_sys::window() else {
			return;
		};
		let (weak, timer) = (self.weak.clone(), self.resize_timer.clone());
		let delay = self.engine.borrow().config().resize_debounce_ms;
		let listener: Closure<dyn FnMut()> = Closure::new(move || {
			let weak = weak.clone();
			timer.schedule(delay, move || {
				if let Some(rt) = weak.upgrade() {
					rt.resize();
				}
			});
		});
		let _ = window.add_event_listener_with_callback("resize", listener.as_ref().unchecked_ref());
		*self.resize_listener.borrow_mut() = Some(listener);
	}

	fn load(&self, graph: &DependencyGraph, cycles: &[CircularDependencyInfo]) {
		let collapsed = match &self.store {
			Some(store) => load_collapsed(store.as_ref(), self.session.as_deref()).unwrap_or_else(|err| {
				warn!("depgraph-view: {err}; starting fully expanded");
				CollapseState::default()
			}),
			None => CollapseState::default(),
		};
		{
			let mut engine = self.engine.borrow_mut();
			engine.load(graph, cycles, collapsed);
			*self.saved_collapsed.borrow_mut() = engine.collapsed().clone();
		}
		self.last_frame.set(None);
		self.after_input();
	}

	fn measure(&self) -> Option<Size> {
		let el = self.container.get_untracked()?;
		let size = Size::new(el.client_width() as f64, el.client_height() as f64);
		(!size.is_empty()).then_some(size)
	}

	fn resize(&self) {
		let Some(size) = self.measure() else {
			return;
		};
		let dpr = device_pixel_ratio();
		if let Some(canvas) = self.canvas.get_untracked() {
			canvas.set_width((size.width * dpr).round() as u32);
			canvas.set_height((size.height * dpr).round() as u32);
		}
		self.engine.borrow_mut().resize(size);
		set_if_changed(self.ui.size, size);
		self.frames.request();
	}

	fn on_frame(&self, timestamp: f64) {
		let dt = match self.last_frame.replace(Some(timestamp)) {
			Some(last) => ((timestamp - last) / 1000.0).clamp(0.0, MAX_FRAME_DT),
			None => DEFAULT_FRAME_DT,
		};
		let update = self.engine.borrow_mut().advance(dt);
		if update.settled.is_some() {
			let engine = self.engine.borrow();
			self.viewport.update(|vp| engine.fit_view(vp));
		}
		self.paint();
		if update.animating {
			self.frames.request();
		} else {
			self.last_frame.set(None);
		}
	}

	fn paint(&self) {
		let engine = self.engine.borrow();
		let viewport = self.viewport.get_untracked();
		match engine.render_mode().mode {
			RenderMode::Raster => {
				if let Some(mut ctx) = self.canvas.get_untracked().and_then(|c| context_2d(&c)) {
					engine.paint(&mut ctx, &viewport, device_pixel_ratio());
				}
			}
			RenderMode::Vector => self.sync_positions(&engine),
		}
		let minimap = self.minimap.get_untracked().and_then(|c| context_2d(&c));
		if let (Some(layout), Some(mut ctx)) = (engine.minimap(), minimap) {
			paint_minimap(
				&mut ctx,
				&layout,
				engine.scene().nodes(),
				&viewport,
				engine.surface(),
				&engine.config().theme,
			);
		}
		self.sync_interaction_from(&engine);
	}

	/// Push layout positions into the SVG element signals.
	fn sync_positions(&self, engine: &GraphEngine) {
		let scene = engine.scene();
		self.ui.nodes.with_untracked(|views| {
			for (view, node) in views.iter().zip(scene.nodes()) {
				if view.position.get_untracked() != node.position {
					view.position.set(node.position);
				}
			}
		});
		for (signal, links) in [
			(self.ui.links, scene.normal_links()),
			(self.ui.cycle_links, scene.cycle_links()),
		] {
			signal.with_untracked(|views| {
				for (view, link) in views.iter().zip(links) {
					if view.segment.get_untracked() != link.segment {
						view.segment.set(link.segment);
					}
				}
			});
		}
	}

	/// Mirror structural state: element lists, mode, legend, minimap.
	fn sync_structure(&self) {
		let engine = self.engine.borrow();
		let key = (engine.scene().generation(), engine.render_mode().mode);
		if self.synced.get() != Some(key) {
			self.synced.set(Some(key));
			let (nodes, links, cycle_links) = match key.1 {
				RenderMode::Vector => scene_views(engine.scene()),
				RenderMode::Raster => SceneViews::default(),
			};
			self.ui.nodes.set(nodes);
			self.ui.links.set(links);
			self.ui.cycle_links.set(cycle_links);
		}
		set_if_changed(self.ui.mode, engine.render_mode().clone());
		set_if_changed(self.ui.mode_label, engine.mode_label());
		set_if_changed(self.ui.preference, engine.preference());
		set_if_changed(self.ui.legend, engine.legend());
		set_if_changed(self.ui.minimap, engine.minimap().is_some());
		set_if_changed(self.ui.empty, engine.visibility().visible_nodes.is_empty());
	}

	fn sync_interaction_from(&self, engine: &GraphEngine) {
		set_if_changed(self.ui.selection, engine.selection().clone());
		set_if_changed(self.ui.hovered, engine.hover().node_id.clone());
		set_if_changed(self.ui.targets, engine.highlight().target_set().clone());
		set_if_changed(self.ui.tooltip, engine.tooltip());
		set_if_changed(self.ui.cursor, engine.cursor());
	}

	fn persist_collapsed(&self) {
		let engine = self.engine.borrow();
		if *self.saved_collapsed.borrow() == *engine.collapsed() {
			return;
		}
		*self.saved_collapsed.borrow_mut() = engine.collapsed().clone();
		if let Some(store) = &self.store
			&& let Err(err) = save_collapsed(store.as_ref(), self.session.as_deref(), engine.collapsed())
		{
			warn!("depgraph-view: {err}");
		}
	}

	/// Common tail of every input handler.
	fn after_input(&self) {
		self.persist_collapsed();
		self.sync_structure();
		self.sync_interaction_from(&self.engine.borrow());
		self.frames.request();
	}

	fn surface_point(&self, ev: &MouseEvent) -> Point {
		let (left, top) = self.container.get_untracked().map_or((0.0, 0.0), |el| {
			let rect = el.get_bounding_client_rect();
			(rect.left(), rect.top())
		});
		Point::new(ev.client_x() as f64 - left, ev.client_y() as f64 - top)
	}

	fn focus(&self) {
		if let Some(el) = self.container.get_untracked() {
			let _ = el.focus();
		}
	}

	fn pointer_down(&self, ev: &MouseEvent) {
		if ev.button() != 0 {
			return;
		}
		let screen = self.surface_point(ev);
		let viewport = self.viewport.get_untracked();
		{
			let mut engine = self.engine.borrow_mut();
			match engine.render_mode().mode {
				RenderMode::Raster => engine.pointer_down(screen, &viewport),
				// Node elements handle their own presses.
				RenderMode::Vector => engine.begin_pan(screen, &viewport),
			}
		}
		self.focus();
		self.sync_interaction_from(&self.engine.borrow());
	}

	fn node_pointer_down(&self, id: &str, ev: &MouseEvent) {
		if ev.button() != 0 {
			return;
		}
		let screen = self.surface_point(ev);
		self.engine.borrow_mut().begin_node_drag(id, screen);
		self.focus();
		self.sync_interaction_from(&self.engine.borrow());
	}

	fn node_hover(&self, id: Option<&str>, ev: &MouseEvent) {
		let screen = self.surface_point(ev);
		if self.engine.borrow_mut().set_hover(id, Some(screen)) {
			self.after_input();
		}
	}

	fn pointer_move(&self, ev: &MouseEvent) {
		let screen = self.surface_point(ev);
		let changed = {
			let mut engine = self.engine.borrow_mut();
			let hit_testing = engine.render_mode().mode == RenderMode::Raster || engine.is_gesture_active();
			self.viewport.update(|vp| {
				if hit_testing {
					engine.pointer_move(screen, vp)
				} else {
					engine.move_hover(screen)
				}
			})
		};
		if changed {
			self.after_input();
		}
	}

	fn pointer_up(&self, ev: &MouseEvent) {
		let screen = self.surface_point(ev);
		let viewport = self.viewport.get_untracked();
		let pending = {
			let mut engine = self.engine.borrow_mut();
			engine.pointer_up(screen, js_sys::Date::now(), &viewport);
			engine.has_pending_click()
		};
		if pending {
			self.schedule_click_flush();
		} else {
			self.click_timer.cancel();
		}
		self.after_input();
	}

	fn pointer_leave(&self) {
		self.engine.borrow_mut().pointer_leave();
		self.after_input();
	}

	fn schedule_click_flush(&self) {
		let weak = self.weak.clone();
		let delay = self.engine.borrow().config().click_window_ms.ceil() as i32;
		self.click_timer.schedule(delay, move || {
			if let Some(rt) = weak.upgrade() {
				rt.flush_clicks();
			}
		});
	}

	fn flush_clicks(&self) {
		let pending = {
			let mut engine = self.engine.borrow_mut();
			engine.flush_clicks(js_sys::Date::now());
			engine.has_pending_click()
		};
		if pending {
			self.schedule_click_flush();
		}
		self.after_input();
	}

	fn wheel(&self, ev: &WheelEvent) {
		ev.prevent_default();
		let screen = self.surface_point(ev);
		{
			let engine = self.engine.borrow();
			self.viewport.update(|vp| engine.wheel(screen, ev.delta_y(), vp));
		}
		self.after_input();
	}

	fn key(&self, action: KeyAction) {
		let changed = {
			let mut engine = self.engine.borrow_mut();
			self.viewport.update(|vp| engine.handle_key(action, vp))
		};
		if changed {
			self.after_input();
		}
	}

	fn keydown(&self, ev: &KeyboardEvent) {
		if let Some(action) = key_action(&ev.key()) {
			ev.prevent_default();
			self.key(action);
		}
	}

	fn navigate(&self, click: Point) {
		{
			let engine = self.engine.borrow();
			let Some(layout) = engine.minimap() else {
				return;
			};
			self.viewport.update(|vp| layout.navigate(click, vp, engine.surface()));
		}
		self.after_input();
	}

	fn set_preference(&self, preference: VisualizationPreference) {
		if !self.engine.borrow_mut().set_preference(preference) {
			return;
		}
		if let Some(store) = &self.store {
			let settings = GraphSettings {
				visualization_mode: preference,
			};
			if let Err(err) = save_settings(store.as_ref(), &settings) {
				warn!("depgraph-view: {err}");
			}
		}
		self.after_input();
	}

	/// Show "Preparing" first, then export on the next task so the
	/// progress label can render.
	fn export(&self, options: ExportOptions) {
		self.ui.export_error.set(None);
		self.ui.export_progress.set(ExportProgress::Preparing);
		let weak = self.weak.clone();
		self.export_timer.schedule(0, move || {
			if let Some(rt) = weak.upgrade() {
				rt.run_export(&options);
			}
		});
	}

	/// Drop a pending export before it starts and abort one in flight.
	fn cancel_export(&self) {
		self.export_timer.cancel();
		self.engine.borrow_mut().cancel_export();
		self.ui.export_progress.set(ExportProgress::Idle);
	}

	fn run_export(&self, options: &ExportOptions) {
		let viewport = self.viewport.get_untracked();
		let date = chrono::Local::now().date_naive();
		let progress = self.ui.export_progress;
		let result = self
			.engine
			.borrow_mut()
			.export(options, &viewport, &self.project, date, |p| progress.set(p));
		match result {
			Ok(ExportOutcome::Completed(artifact)) => match download(&artifact) {
				Ok(()) => debug!("depgraph-view: download started for {}", artifact.filename),
				Err(err) => {
					warn!("depgraph-view: download failed: {err:?}");
					self.ui.export_error.set(Some("Download failed".to_string()));
				}
			},
			Ok(ExportOutcome::Cancelled) => {}
			Err(err) => self.ui.export_error.set(Some(err.to_string())),
		}
	}

	fn teardown(&self) {
		self.frames.cancel();
		self.click_timer.cancel();
		self.resize_timer.cancel();
		self.export_timer.cancel();
		if let (Some(listener), Some(window)) = (self.resize_listener.borrow_mut().take(), web_sys::window()) {
			let _ = window.remove_event_listener_with_callback("resize", listener.as_ref().unchecked_ref());
		}
		self.engine.borrow_mut().teardown();
		debug!("depgraph-view: view torn down");
	}
}

type RuntimeStore = StoredValue<Rc<ViewRuntime>, LocalStorage>;

fn arrow_markers(theme: &Theme) -> impl IntoView + use<> {
	let mut markers: Vec<(String, String)> = DependencyKind::ALL
		.iter()
		.map(|&kind| (marker_id(kind, false, false), theme.edge.color(kind).to_css()))
		.collect();
	markers.push(("arrow-cycle".to_string(), theme.edge.cycle.to_css()));
	markers.push(("arrow-cycle-highlighted".to_string(), theme.edge.highlighted_cycle.to_css()));
	markers
		.into_iter()
		.map(|(id, fill)| {
			view! {
				<marker
					id=id
					viewBox="0 0 10 10"
					refX="10"
					refY="5"
					markerWidth="4"
					markerHeight="4"
					orient="auto"
				>
					<path d="M0,0L10,5L0,10z" fill=fill />
				</marker>
			}
		})
		.collect_view()
}

fn link_view(link: LinkView, ui: ViewSignals, config: StoredValue<GraphConfig>, zoom: Memo<f64>) -> impl IntoView {
	let LinkView {
		key,
		source,
		target,
		kind,
		cycle_ids,
		segment,
		..
	} = link;
	let in_cycle = !cycle_ids.is_empty();
	let highlighted = move || {
		ui.selection
			.with(|s| s.highlighted_cycle.is_some_and(|c| cycle_ids.contains(&c)))
	};
	let stroke = {
		let highlighted = highlighted.clone();
		move || config.with_value(|c| c.theme.edge_color(kind, in_cycle, highlighted()).to_css())
	};
	let marker = move || format!("url(#{})", marker_id(kind, in_cycle, highlighted()));
	let width = move || {
		config.with_value(|c| {
			let values = ScaledValues::new(&c.scale, zoom.get());
			if in_cycle { values.cycle_edge_width } else { values.edge_width }
		})
	};
	let dash = config.with_value(|c| {
		(c.theme.edge.is_dashed(kind) && !in_cycle).then(|| format!("{} {}", c.theme.edge.dash.0, c.theme.edge.dash.1))
	});
	let opacity = move || {
		ui.hovered.with(|hovered| match hovered {
			Some(id) if *id != source && *id != target => config.with_value(|c| c.theme.node.dimmed_alpha),
			_ => 1.0,
		})
	};
	let end = |s: &Option<Segment>| s.map_or((0.0, 0.0, 0.0, 0.0), |s| (s.from.x, s.from.y, s.to.x, s.to.y));
	let (s1, s2, s3, s4) = (segment.clone(), segment.clone(), segment.clone(), segment.clone());

	view! {
		<line
			data-key=key
			x1=move || s1.with(end).0
			y1=move || s2.with(end).1
			x2=move || s3.with(end).2
			y2=move || s4.with(end).3
			display=move || if segment.with(Option::is_some) { "inline" } else { "none" }
			stroke=stroke
			stroke-width=width
			stroke-dasharray=dash
			stroke-opacity=opacity
			marker-end=marker
		/>
	}
}

fn node_view(
	node: NodeView,
	ui: ViewSignals,
	config: StoredValue<GraphConfig>,
	zoom: Memo<f64>,
	runtime: RuntimeStore,
) -> impl IntoView {
	let NodeView {
		id,
		label,
		radius,
		depth,
		cycle_ids,
		hidden_children,
		position,
		..
	} = node;
	let in_cycle = !cycle_ids.is_empty();

	let transform = {
		let position = position.clone();
		move || position.with(|p| p.map(|p| format!("translate({},{})", p.x, p.y)))
	};
	let display = move || if position.with(Option::is_some) { "inline" } else { "none" };
	let fill = {
		let id = id.clone();
		move || {
			let highlighted = ui
				.selection
				.with(|s| s.highlighted_cycle.is_some_and(|c| cycle_ids.contains(&c)));
			let hovered = ui.hovered.with(|h| h.as_deref() == Some(id.as_str()));
			config.with_value(|c| {
				let base = c.theme.node_fill(depth, in_cycle, highlighted);
				let color = if hovered { base.lighten(c.theme.node.hover_lighten) } else { base };
				color.to_css()
			})
		}
	};
	let opacity = {
		let id = id.clone();
		move || {
			ui.targets.with(|t| {
				if t.is_empty() || t.contains(&id) {
					1.0
				} else {
					config.with_value(|c| c.theme.node.dimmed_alpha)
				}
			})
		}
	};
	let ring = {
		let id = id.clone();
		move || if ui.selection.with(|s| s.is_selected(&id)) { "inline" } else { "none" }
	};
	let values = move || config.with_value(|c| ScaledValues::new(&c.scale, zoom.get()));
	let (stroke, ring_color, label_color, badge_fill, badge_text) = config.with_value(|c| {
		let node = &c.theme.node;
		(
			node.stroke.to_css(),
			node.selection_ring.to_css(),
			c.theme.label.color.to_css(),
			node.badge_fill.to_css(),
			node.badge_text.to_css(),
		)
	});

	let (down_id, enter_id) = (id.clone(), id.clone());
	let on_mousedown = move |ev: MouseEvent| {
		ev.stop_propagation();
		runtime.with_value(|rt| rt.node_pointer_down(&down_id, &ev));
	};
	let on_mouseenter = move |ev: MouseEvent| runtime.with_value(|rt| rt.node_hover(Some(&enter_id), &ev));
	let on_mouseleave = move |ev: MouseEvent| runtime.with_value(|rt| rt.node_hover(None, &ev));

	view! {
		<g
			data-id=id
			transform=transform
			display=display
			opacity=opacity
			style="transition: opacity 150ms ease-out; cursor: pointer;"
			on:mousedown=on_mousedown
			on:mouseenter=on_mouseenter
			on:mouseleave=on_mouseleave
		>
			<circle
				r=move || radius + values().ring_offset
				fill="none"
				stroke=ring_color
				stroke-width=move || values().ring_width
				display=ring
			/>
			<circle r=radius fill=fill stroke=stroke stroke-width=move || values().node_stroke />
			<text
				y=move || { let v = values(); radius + v.label_gap + v.label_size * 0.8 }
				text-anchor="middle"
				font-family="sans-serif"
				font-size=move || values().label_size
				fill=label_color
				fill-opacity=move || values().label_alpha
				pointer-events="none"
			>
				{label}
			</text>
			{(hidden_children > 0)
				.then(|| {
					let (bx, by) = (radius * 0.7, -radius * 0.7);
					view! {
						<circle cx=bx cy=by r="7" fill=badge_fill />
						<text
							x=bx
							y=by + 3.0
							text-anchor="middle"
							font-family="sans-serif"
							font-weight="bold"
							font-size="9"
							fill=badge_text
							pointer-events="none"
						>
							{format!("+{hidden_children}")}
						</text>
					}
				})}
		</g>
	}
}

#[component]
fn VectorBackend(
	ui: ViewSignals,
	viewport: ViewportHandle,
	config: StoredValue<GraphConfig>,
	runtime: RuntimeStore,
) -> impl IntoView {
	let zoom = Memo::new(move |_| viewport.get().zoom());
	let transform = move || {
		let v = viewport.get();
		format!("translate({},{}) scale({})", v.pan().x, v.pan().y, v.zoom())
	};
	let markers = config.with_value(|c| arrow_markers(&c.theme));

	view! {
		<svg
			class="depgraph-vector"
			width="100%"
			height="100%"
			style:display=move || if ui.mode.with(|m| m.mode == RenderMode::Vector) { "block" } else { "none" }
		>
			<defs>{markers}</defs>
			<g transform=transform>
				<g class="links">
					<For each=move || ui.links.get() key=|l| (l.generation, l.key.clone()) let:link>
						{link_view(link, ui, config, zoom)}
					</For>
				</g>
				<g class="cycle-links">
					<For each=move || ui.cycle_links.get() key=|l| (l.generation, l.key.clone()) let:link>
						{link_view(link, ui, config, zoom)}
					</For>
				</g>
				<g class="nodes">
					<For each=move || ui.nodes.get() key=|n| (n.generation, n.id.clone()) let:node>
						{node_view(node, ui, config, zoom, runtime)}
					</For>
				</g>
			</g>
		</svg>
	}
}

/// Interactive dependency graph.
///
/// `graph` and `cycles` are reactive; a change reloads the view and restarts
/// the layout. With a `session_key` the collapsed set is persisted per
/// session in `store` (browser `localStorage` by default).
#[component]
pub fn DependencyGraphView(
	#[prop(into)] graph: Signal<DependencyGraph>,
	#[prop(into, default = Signal::stored(Vec::new()))] cycles: Signal<Vec<CircularDependencyInfo>>,
	#[prop(into, default = None)] session_key: Option<String>,
	/// Used in export filenames.
	#[prop(into, default = "project".to_string())]
	project: String,
	#[prop(optional)] config: Option<GraphConfig>,
	#[prop(optional)] store: Option<Rc<dyn KeyValueStore>>,
) -> impl IntoView {
	let config = config.unwrap_or_default();
	let store = store.or_else(|| match LocalStorageStore::open() {
		Ok(store) => Some(Rc::new(store) as Rc<dyn KeyValueStore>),
		Err(err) => {
			warn!("depgraph-view: {err}; settings will not persist");
			None
		}
	});

	let mut engine = GraphEngine::new(config.clone());
	if let Some(store) = &store {
		engine.set_preference(load_settings_or_default(store.as_ref()).visualization_mode);
	}

	let ui = ViewSignals::new(&engine);
	let viewport = ViewportHandle::new();
	let (container, canvas, minimap) = (
		NodeRef::<leptos::html::Div>::new(),
		NodeRef::<leptos::html::Canvas>::new(),
		NodeRef::<leptos::html::Canvas>::new(),
	);
	let runtime = Rc::new_cyclic(|weak| ViewRuntime {
		weak: weak.clone(),
		engine: RefCell::new(engine),
		viewport,
		ui,
		frames: FrameScheduler::default(),
		click_timer: TimerSlot::default(),
		resize_timer: TimerSlot::default(),
		export_timer: TimerSlot::default(),
		store,
		session: session_key,
		project,
		container,
		canvas,
		minimap,
		last_frame: Cell::new(None),
		synced: Cell::new(None),
		saved_collapsed: RefCell::new(CollapseState::default()),
		resize_listener: RefCell::new(None),
	});
	let runtime_store: RuntimeStore = StoredValue::new_local(runtime.clone());
	let minimap_size = config.minimap_size;
	let (background, badge) = (config.theme.background, config.theme.node.badge_fill);
	let config = StoredValue::new(config);

	let rt_load = runtime.clone();
	Effect::new(move |mounted: Option<()>| {
		if mounted.is_none() {
			rt_load.mount();
		}
		graph.with(|g| cycles.with(|c| rt_load.load(g, c)));
	});

	on_cleanup(move || {
		runtime_store.try_with_value(|rt| rt.teardown());
	});

	let on_action = Callback::new(move |action| runtime_store.with_value(|rt| rt.key(action)));
	let on_navigate = Callback::new(move |click| runtime_store.with_value(|rt| rt.navigate(click)));
	let on_preference = Callback::new(move |p| runtime_store.with_value(|rt| rt.set_preference(p)));
	let on_export = Callback::new(move |options| runtime_store.with_value(|rt| rt.export(options)));
	let on_cancel_export = Callback::new(move |()| runtime_store.with_value(|rt| rt.cancel_export()));

	let (rt_md, rt_mm, rt_mu, rt_ml, rt_wh, rt_kd) = (
		runtime.clone(),
		runtime.clone(),
		runtime.clone(),
		runtime.clone(),
		runtime.clone(),
		runtime,
	);

	view! {
		<div
			node_ref=container
			class="depgraph-view"
			tabindex="0"
			style="position: relative; width: 100%; height: 100%; overflow: hidden; outline: none;"
			style:background-color=background.to_css()
			style:cursor=move || ui.cursor.get().css()
			on:mousedown=move |ev: MouseEvent| rt_md.pointer_down(&ev)
			on:mousemove=move |ev: MouseEvent| rt_mm.pointer_move(&ev)
			on:mouseup=move |ev: MouseEvent| rt_mu.pointer_up(&ev)
			on:mouseleave=move |_: MouseEvent| rt_ml.pointer_leave()
			on:wheel=move |ev: WheelEvent| rt_wh.wheel(&ev)
			on:keydown=move |ev: KeyboardEvent| rt_kd.keydown(&ev)
		>
			<canvas
				node_ref=canvas
				class="depgraph-raster"
				style="width: 100%; height: 100%;"
				style:display=move || if ui.mode.with(|m| m.mode == RenderMode::Raster) { "block" } else { "none" }
			/>
			<VectorBackend ui=ui viewport=viewport config=config runtime=runtime_store />
			<Show when=move || ui.empty.get()>
				<div class="depgraph-empty">"No packages to display"</div>
			</Show>
			<div class="depgraph-overlay" on:mousedown=|ev: MouseEvent| ev.stop_propagation()>
				<ZoomControls viewport=viewport on_action=on_action />
				<ModeIndicator
					label=ui.mode_label
					warning=Signal::derive(move || ui.mode.with(|m| m.performance_warning.clone()))
					preference=ui.preference
					on_change=on_preference
				/>
				<Legend entries=ui.legend badge=badge />
				<Minimap canvas=minimap visible=ui.minimap size=minimap_size on_navigate=on_navigate />
				<ExportButton
					enabled=Signal::derive(move || !ui.empty.get())
					progress=ui.export_progress
					error=ui.export_error
					background=background
					on_export=on_export
					on_cancel=on_cancel_export
				/>
			</div>
			<Tooltip content=ui.tooltip container=ui.size />
		</div>
	}
}
