//! Drives the headless engine from JSON input through layout, raster paint
//! and export, the way the browser view does.

// Test target reuses lib deps, silence noisy lint.
#![allow(unused_crate_dependencies)]

use chrono::NaiveDate;
use depgraph_view::{
	CircularDependencyInfo, ClickAction, CollapseState, DependencyGraph, DrawOp, ExportFormat, ExportOptions,
	ExportOutcome, ExportScope, GraphEngine, KeyValueStore, MemoryStore, RecordingSurface, RenderMode, Resolution,
	Viewport, load_collapsed, save_collapsed,
};

const GRAPH: &str = r#"{
	"nodes": {
		"a": { "name": "@ws/a", "path": "packages/a" },
		"b": { "name": "@ws/b", "path": "packages/b" },
		"c": { "name": "@ws/c", "path": "packages/c" },
		"d": { "name": "@ws/d", "path": "packages/d" },
		"e": { "name": "@ws/e", "path": "packages/e" }
	},
	"edges": [
		{ "from": "a", "to": "b", "type": "production" },
		{ "from": "b", "to": "c", "type": "production" },
		{ "from": "c", "to": "a", "type": "production" },
		{ "from": "a", "to": "d", "type": "dev" },
		{ "from": "d", "to": "e", "type": "peer" }
	],
	"rootPath": "/ws",
	"workspaceType": "pnpm"
}"#;

const CYCLES: &str = r#"[
	{ "cycle": ["a", "b", "c", "a"], "severity": "high", "depth": 3, "impact": "build order", "complexity": 1.5 }
]"#;

fn input() -> (DependencyGraph, Vec<CircularDependencyInfo>) {
	(
		serde_json::from_str(GRAPH).expect("graph parses"),
		serde_json::from_str(CYCLES).expect("cycles parse"),
	)
}

fn loaded(collapsed: CollapseState) -> GraphEngine {
	let (graph, cycles) = input();
	let mut engine = GraphEngine::default();
	engine.load(&graph, &cycles, collapsed);
	for _ in 0..3000 {
		if !engine.advance(0.016).animating {
			break;
		}
	}
	engine
}

fn date() -> NaiveDate {
	NaiveDate::from_ymd_opt(2024, 6, 30).expect("valid date")
}

fn export(engine: &mut GraphEngine, options: &ExportOptions) -> (String, Vec<u8>, u32, u32) {
	match engine
		.export(options, &Viewport::default(), "my ws", date(), |_| {})
		.expect("export succeeds")
	{
		ExportOutcome::Completed(artifact) => (artifact.filename, artifact.bytes, artifact.width, artifact.height),
		ExportOutcome::Cancelled => panic!("nothing cancelled this export"),
	}
}

#[test]
fn json_input_settles_into_a_scene_with_cycle_links() {
	let engine = loaded(CollapseState::default());

	assert!(!engine.is_animating());
	assert_eq!(engine.render_mode().mode, RenderMode::Vector);
	assert_eq!(engine.scene().nodes().len(), 5);
	assert_eq!(engine.scene().cycle_links().len(), 3);
	assert_eq!(engine.scene().normal_links().len(), 2);
	assert!(engine.scene().nodes().iter().all(|n| n.position.is_some()));
}

#[test]
fn raster_paint_covers_the_visible_graph() {
	let engine = loaded(CollapseState::default());
	let mut surface = RecordingSurface::default();
	let stats = engine.paint(&mut surface, &Viewport::default(), 1.0);

	assert_eq!(stats.nodes, 5);
	assert_eq!(stats.links, 5);
	for name in ["@ws/a", "@ws/b", "@ws/c", "@ws/d", "@ws/e"] {
		assert!(surface.texts().contains(&name), "label {name} drawn");
	}
	assert!(surface.count(|op| matches!(op, DrawOp::Arc(..))) >= 5);
}

#[test]
fn svg_export_contains_every_node_and_cycle_markers() {
	let mut engine = loaded(CollapseState::default());
	let (filename, bytes, _, _) = export(
		&mut engine,
		&ExportOptions {
			format: ExportFormat::Svg,
			include_watermark: true,
			..ExportOptions::default()
		},
	);
	let svg = String::from_utf8(bytes).expect("svg is utf-8");

	assert_eq!(filename, "my-ws-dependency-graph-2024-06-30.svg");
	assert!(svg.starts_with("<svg"));
	for id in ["a", "b", "c", "d", "e"] {
		assert!(svg.contains(&format!(r#"data-id="{id}""#)));
	}
	assert!(svg.contains("url(#arrow-cycle)"));
	assert!(svg.contains("Generated by depgraph-view"));
}

#[test]
fn png_resolution_multiplies_output_dimensions() {
	let mut engine = loaded(CollapseState::default());
	let base = ExportOptions {
		format: ExportFormat::Png,
		resolution: Resolution::X1,
		..ExportOptions::default()
	};
	let (name1, png1, w1, h1) = export(&mut engine, &base);
	let (name2, png2, w2, h2) = export(
		&mut engine,
		&ExportOptions {
			resolution: Resolution::X2,
			..base.clone()
		},
	);

	assert_eq!(name1, "my-ws-dependency-graph-2024-06-30.png");
	assert_eq!(name2, "my-ws-dependency-graph-2024-06-30@2x.png");
	assert_eq!((w2, h2), (w1 * 2, h1 * 2));
	for png in [&png1, &png2] {
		assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
	}
}

#[test]
fn selection_export_keeps_only_the_neighborhood() {
	let mut engine = loaded(CollapseState::default());
	engine.apply_click(&ClickAction::Single("d".into()));
	let (_, bytes, _, _) = export(
		&mut engine,
		&ExportOptions {
			format: ExportFormat::Svg,
			scope: ExportScope::Selection,
			include_legend: false,
			..ExportOptions::default()
		},
	);
	let svg = String::from_utf8(bytes).expect("svg is utf-8");

	for id in ["a", "d", "e"] {
		assert!(svg.contains(&format!(r#"data-id="{id}""#)), "{id} kept");
	}
	for id in ["b", "c"] {
		assert!(!svg.contains(&format!(r#"data-id="{id}""#)), "{id} dropped");
	}
}

#[test]
fn collapsed_set_survives_a_reload_through_the_store() {
	let store = MemoryStore::default();
	let mut engine = loaded(CollapseState::default());
	assert!(engine.toggle_collapse("d"));
	assert!(!engine.visibility().is_visible("e"));
	save_collapsed(&store, Some("ws-1"), engine.collapsed()).expect("saved");

	let restored = load_collapsed(&store, Some("ws-1")).expect("loaded");
	let engine = loaded(restored);
	assert!(engine.collapsed().is_collapsed("d"));
	assert!(!engine.visibility().is_visible("e"));
	assert_eq!(engine.visibility().hidden_count("d"), 1);

	assert!(load_collapsed(&store, Some("other")).expect("loaded").is_empty());
	assert!(load_collapsed(&store, None).expect("no session").is_empty());
	assert!(store.get("depgraph-view.collapsed.ws-1").expect("readable").is_some());
}
