//! Overlay widgets drawn on top of either backend.
//!
//! Every widget here is a plain view over signals the graph view keeps in
//! sync; user input goes back out through callbacks.

use leptos::prelude::*;
use web_sys::MouseEvent;

use super::component::ViewportHandle;
use super::export::{ExportFormat, ExportOptions, ExportProgress, ExportScope, Resolution};
use super::interaction::KeyAction;
use super::mode::VisualizationPreference;
use super::overlays::{LegendEntry, LegendSwatch, TooltipContent, tooltip_position, zoom_label};
use super::theme::Color;
use super::types::{Point, Size};

const TOOLTIP_WIDTH: f64 = 240.0;
const TOOLTIP_LINE: f64 = 16.0;

#[component]
pub fn ZoomControls(viewport: ViewportHandle, on_action: Callback<KeyAction>) -> impl IntoView {
	view! {
		<div class="depgraph-zoom-controls">
			<button title="Zoom in (+)" on:click=move |_| on_action.run(KeyAction::ZoomIn)>"+"</button>
			<span class="depgraph-zoom-level">{move || zoom_label(&viewport.get())}</span>
			<button title="Zoom out (-)" on:click=move |_| on_action.run(KeyAction::ZoomOut)>"-"</button>
			<button title="Fit to graph (F)" on:click=move |_| on_action.run(KeyAction::FitToGraph)>"Fit"</button>
			<button title="Reset view (0)" on:click=move |_| on_action.run(KeyAction::ResetView)>"1:1"</button>
			<span class="depgraph-depth-controls">
				{(1..=3)
					.map(|levels| {
						view! {
							<button
								title=format!("Show {levels} level(s) ({levels})")
								on:click=move |_| on_action.run(KeyAction::ShowLevels(levels))
							>
								{format!("L{levels}")}
							</button>
						}
					})
					.collect_view()}
				<button title="Expand all (E)" on:click=move |_| on_action.run(KeyAction::ExpandAll)>"All"</button>
			</span>
		</div>
	}
}

/// Overview canvas. The view paints it every frame; clicks re-center the
/// main view on the clicked point.
#[component]
pub fn Minimap(
	canvas: NodeRef<leptos::html::Canvas>,
	#[prop(into)] visible: Signal<bool>,
	size: Size,
	on_navigate: Callback<Point>,
) -> impl IntoView {
	let on_click = move |ev: MouseEvent| {
		on_navigate.run(Point::new(ev.offset_x() as f64, ev.offset_y() as f64));
	};

	view! {
		<canvas
			node_ref=canvas
			class="depgraph-minimap"
			width=size.width as u32
			height=size.height as u32
			style:display=move || if visible.get() { "block" } else { "none" }
			on:click=on_click
		/>
	}
}

fn swatch(swatch: LegendSwatch, badge: Color) -> impl IntoView {
	let body = match swatch {
		LegendSwatch::Line { color, dashed } => view! {
			<line
				x1="2"
				y1="7"
				x2="22"
				y2="7"
				stroke=color.to_css()
				stroke-width="2"
				stroke-dasharray=if dashed { "4 3" } else { "none" }
			/>
		}
		.into_any(),
		LegendSwatch::Circle(color) => view! { <circle cx="12" cy="7" r="5" fill=color.to_css() /> }.into_any(),
		LegendSwatch::Badge => view! { <circle cx="12" cy="7" r="5" fill=badge.to_css() /> }.into_any(),
	};
	view! {
		<svg class="depgraph-legend-swatch" width="24" height="14">
			{body}
		</svg>
	}
}

#[component]
pub fn Legend(#[prop(into)] entries: Signal<Vec<LegendEntry>>, badge: Color) -> impl IntoView {
	view! {
		<Show when=move || entries.with(|e| !e.is_empty())>
			<ul class="depgraph-legend">
				{move || {
					entries
						.get()
						.into_iter()
						.map(|entry| {
							view! {
								<li>
									{swatch(entry.swatch.clone(), badge)}
									<span>{entry.label.clone()}</span>
								</li>
							}
						})
						.collect_view()
				}}
			</ul>
		</Show>
	}
}

/// Follows the pointer and flips to stay inside `container`.
#[component]
pub fn Tooltip(
	#[prop(into)] content: Signal<Option<(TooltipContent, Point)>>,
	#[prop(into)] container: Signal<Size>,
) -> impl IntoView {
	let placed = move || {
		let (content, pointer) = content.get()?;
		let size = Size::new(TOOLTIP_WIDTH, TOOLTIP_LINE * (content.lines.len() + 1) as f64 + 12.0);
		let at = tooltip_position(pointer, size, container.get());
		Some((content, at))
	};

	move || {
		placed().map(|(content, at)| {
			view! {
				<div
					class="depgraph-tooltip"
					style:left=format!("{}px", at.x)
					style:top=format!("{}px", at.y)
					style:max-width=format!("{TOOLTIP_WIDTH}px")
				>
					<strong>{content.title}</strong>
					{content.lines.into_iter().map(|line| view! { <div>{line}</div> }).collect_view()}
				</div>
			}
		})
	}
}

/// Node count and backend badge, plus the persisted backend preference.
#[component]
pub fn ModeIndicator(
	#[prop(into)] label: Signal<Option<String>>,
	#[prop(into)] warning: Signal<Option<String>>,
	#[prop(into)] preference: Signal<VisualizationPreference>,
	on_change: Callback<VisualizationPreference>,
) -> impl IntoView {
	let on_select = move |ev: web_sys::Event| {
		if let Some(choice) = VisualizationPreference::from_value(&event_target_value(&ev)) {
			on_change.run(choice);
		}
	};

	view! {
		<div class="depgraph-mode">
			<span class="depgraph-mode-label">{move || label.get().unwrap_or_default()}</span>
			<select on:change=on_select>
				{VisualizationPreference::ALL
					.into_iter()
					.map(|choice| {
						view! {
							<option value=choice.value() selected=move || preference.get() == choice>
								{choice.label()}
							</option>
						}
					})
					.collect_view()}
			</select>
			{move || warning.get().map(|w| view! { <div class="depgraph-mode-warning">{w}</div> })}
		</div>
	}
}

fn progress_label(progress: ExportProgress) -> &'static str {
	match progress {
		ExportProgress::Idle => "",
		ExportProgress::Preparing => "Preparing...",
		ExportProgress::Rendering => "Rendering...",
		ExportProgress::Encoding => "Encoding...",
		ExportProgress::Complete => "Done",
	}
}

/// Export form. Builds [`ExportOptions`] from its own fields.
#[component]
pub fn ExportButton(
	#[prop(into)] enabled: Signal<bool>,
	#[prop(into)] progress: Signal<ExportProgress>,
	#[prop(into)] error: Signal<Option<String>>,
	background: Color,
	on_export: Callback<ExportOptions>,
	on_cancel: Callback<()>,
) -> impl IntoView {
	let format = RwSignal::new(ExportFormat::Png);
	let scope = RwSignal::new(ExportScope::Full);
	let resolution = RwSignal::new(Resolution::X1);
	let legend = RwSignal::new(true);
	let watermark = RwSignal::new(false);
	let transparent = RwSignal::new(false);

	let busy = move || {
		!matches!(progress.get(), ExportProgress::Idle | ExportProgress::Complete)
	};
	let on_click = move |_: MouseEvent| {
		on_export.run(ExportOptions {
			format: format.get_untracked(),
			scope: scope.get_untracked(),
			resolution: resolution.get_untracked(),
			include_legend: legend.get_untracked(),
			include_watermark: watermark.get_untracked(),
			background: (!transparent.get_untracked()).then_some(background),
		});
	};

	view! {
		<div class="depgraph-export">
			<select on:change=move |ev| {
				format.set(if event_target_value(&ev) == "svg" { ExportFormat::Svg } else { ExportFormat::Png });
			}>
				<option value="png" selected=move || format.get() == ExportFormat::Png>"PNG"</option>
				<option value="svg" selected=move || format.get() == ExportFormat::Svg>"SVG"</option>
			</select>
			<select on:change=move |ev| {
				scope.set(match event_target_value(&ev).as_str() {
					"viewport" => ExportScope::Viewport,
					"selection" => ExportScope::Selection,
					_ => ExportScope::Full,
				});
			}>
				<option value="full" selected=move || scope.get() == ExportScope::Full>"Full graph"</option>
				<option value="viewport" selected=move || scope.get() == ExportScope::Viewport>"Current view"</option>
				<option value="selection" selected=move || scope.get() == ExportScope::Selection>"Selection"</option>
			</select>
			<Show when=move || format.get() == ExportFormat::Png>
				<select on:change=move |ev| {
					let factor = event_target_value(&ev).parse::<u32>().unwrap_or(1);
					resolution.set(Resolution::try_from(factor).unwrap_or_default());
				}>
					<option value="1" selected=move || resolution.get() == Resolution::X1>"1x"</option>
					<option value="2" selected=move || resolution.get() == Resolution::X2>"2x"</option>
					<option value="4" selected=move || resolution.get() == Resolution::X4>"4x"</option>
				</select>
			</Show>
			<label>
				<input type="checkbox" prop:checked=move || legend.get() on:change=move |ev| legend.set(event_target_checked(&ev)) />
				"Legend"
			</label>
			<label>
				<input type="checkbox" prop:checked=move || watermark.get() on:change=move |ev| watermark.set(event_target_checked(&ev)) />
				"Watermark"
			</label>
			<label>
				<input type="checkbox" prop:checked=move || transparent.get() on:change=move |ev| transparent.set(event_target_checked(&ev)) />
				"Transparent"
			</label>
			<button disabled=move || !enabled.get() || busy() on:click=on_click>
				"Export"
			</button>
			<Show when=busy>
				<button class="depgraph-export-cancel" on:click=move |_| on_cancel.run(())>
					"Cancel"
				</button>
			</Show>
			<span class="depgraph-export-progress">{move || progress_label(progress.get())}</span>
			{move || error.get().map(|e| view! { <div class="depgraph-export-error">{e}</div> })}
		</div>
	}
}
