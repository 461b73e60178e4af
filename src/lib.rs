//! depgraph-view: interactive visualization of package dependency graphs.
//!
//! This crate provides a WASM graph view for monorepo dependency graphs:
//! physics-based layout, cycle highlighting, collapsible subtrees, SVG or
//! canvas rendering depending on graph size, and SVG/PNG export. The engine
//! underneath the Leptos component is plain Rust and runs headless.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;

pub use components::dependency_graph::{
	CircularDependencyInfo, ClickAction, CollapseState, DependencyGraph, DependencyGraphView, DependencyKind, DrawOp,
	ExportFormat, ExportOptions, ExportOutcome, ExportScope, GraphConfig, GraphEngine, KeyValueStore, MemoryStore,
	RecordingSurface, RenderMode, Resolution, Viewport, VisualizationPreference, load_collapsed, save_collapsed,
};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("depgraph-view: logging initialized");
}

/// Contents of the `<script id="graph-data">` element.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphPayload {
	/// Packages and declared dependencies.
	#[serde(default)]
	pub graph: DependencyGraph,
	/// Cycles detected by the analyzer.
	#[serde(default)]
	pub cycles: Vec<CircularDependencyInfo>,
	/// Scopes the persisted collapsed set. Absent means nothing persists.
	#[serde(default)]
	pub session_key: Option<String>,
	/// Shown in the page title and used in export filenames.
	#[serde(default)]
	pub project: Option<String>,
}

/// Parse a payload, logging and returning `None` on malformed input.
pub fn parse_graph_payload(json: &str) -> Option<GraphPayload> {
	match serde_json::from_str::<GraphPayload>(json) {
		Ok(payload) => {
			info!(
				"depgraph-view: loaded {} packages, {} dependencies, {} cycles",
				payload.graph.nodes.len(),
				payload.graph.edges.len(),
				payload.cycles.len()
			);
			Some(payload)
		}
		Err(e) => {
			warn!("depgraph-view: failed to parse graph data: {}", e);
			None
		}
	}
}

/// Load graph data from a script element with id="graph-data".
fn load_graph_data() -> Option<GraphPayload> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id("graph-data")?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	let json_text = script.text().ok()?;
	parse_graph_payload(&json_text)
}

/// Main application component.
/// Loads the dependency graph from the DOM and renders the interactive view.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let GraphPayload {
		graph,
		cycles,
		session_key,
		project,
	} = load_graph_data().unwrap_or_default();
	let title = match &project {
		Some(project) => format!("{project} dependency graph"),
		None => "Dependency graph".to_string(),
	};

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />
		<Title text=title.clone() />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph" style="position: fixed; inset: 0;">
			<DependencyGraphView
				graph=Signal::stored(graph)
				cycles=Signal::stored(cycles)
				session_key=session_key
				project=project.unwrap_or_else(|| "project".to_string())
			/>
			<div class="graph-overlay">
				<h1>{title}</h1>
				<p class="subtitle">
					"Drag nodes to reposition. Scroll to zoom. Double-click to collapse. Press F to fit."
				</p>
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn payload_reads_camel_case_fields() {
		let payload = parse_graph_payload(
			r#"{
				"graph": {
					"nodes": { "a": { "name": "a", "path": "packages/a" } },
					"edges": [],
					"rootPath": "/repo"
				},
				"cycles": [],
				"sessionKey": "ws-1",
				"project": "acme"
			}"#,
		)
		.expect("valid payload");

		assert_eq!(payload.graph.nodes.len(), 1);
		assert_eq!(payload.session_key.as_deref(), Some("ws-1"));
		assert_eq!(payload.project.as_deref(), Some("acme"));
	}

	#[test]
	fn malformed_payload_is_rejected_not_fatal() {
		assert!(parse_graph_payload("{ not json").is_none());
		let empty = parse_graph_payload("{}").expect("all fields default");
		assert!(empty.graph.nodes.is_empty());
	}
}
