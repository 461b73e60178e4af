//! Package dependency graph visualization.
//!
//! Turns a workspace [`DependencyGraph`] plus detected cycles into an
//! interactive force-directed view with:
//! - Depth coloring and cycle highlighting
//! - Collapsible subtrees with hidden-descendant badges
//! - SVG rendering for small graphs and canvas rendering for large ones
//! - Pan, zoom, minimap, legend and tooltips
//! - SVG and PNG export
//!
//! Everything except the Leptos components is plain Rust and runs
//! headless, which is how the tests drive it.
//!
//! # Example
//!
//! ```ignore
//! use depgraph_view::{DependencyGraph, DependencyGraphView};
//!
//! let graph: DependencyGraph = serde_json::from_str(json)?;
//! view! { <DependencyGraphView graph=Signal::stored(graph) session_key="ws-1".to_string() /> }
//! ```

mod component;
mod config;
mod controls;
mod cycles;
mod depth;
mod engine;
mod export;
mod frame;
mod highlight;
mod interaction;
mod layout;
mod mode;
mod overlays;
mod raster;
mod scale;
mod scene;
mod settings;
mod theme;
mod transform;
mod types;
mod viewport;
mod visibility;

pub use component::DependencyGraphView;
pub use config::GraphConfig;
pub use engine::GraphEngine;
pub use export::{ExportArtifact, ExportError, ExportFormat, ExportOptions, ExportOutcome, ExportProgress, ExportScope, Resolution};
pub use interaction::{ClickAction, KeyAction};
pub use mode::{RenderMode, VisualizationPreference};
pub use raster::{DrawOp, RecordingSurface};
pub use settings::{KeyValueStore, MemoryStore, SettingsError, load_collapsed, save_collapsed};
pub use theme::{Color, Theme};
pub use types::{CircularDependencyInfo, DependencyGraph, DependencyKind, Edge, PackageDescriptor, Point, Severity, Size};
pub use viewport::Viewport;
pub use visibility::CollapseState;
