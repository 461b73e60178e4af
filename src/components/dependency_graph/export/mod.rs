//! SVG and PNG export of the current scene.
//!
//! Both formats start from the same SVG serialization. PNG rasterizes that
//! document with `resvg` at an integer resolution multiplier. Progress is
//! reported through a callback and an [`AbortSignal`] is checked between
//! stages, so a newer export can cancel an older one.

mod svg;

use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use chrono::NaiveDate;
use resvg::{tiny_skia, usvg};
use thiserror::Error;

use super::interaction::Selection;
use super::overlays::LegendEntry;
use super::scale::ScaleConfig;
use super::scene::VectorScene;
use super::theme::{Color, Theme};
use super::types::{Bounds, Size};
use super::viewport::Viewport;

pub use svg::marker_id;

/// Graph units added around the exported content.
const EXPORT_PADDING: f64 = 20.0;

/// Output file format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
	/// Standalone SVG document.
	Svg,
	/// SVG rasterized at the chosen [`Resolution`].
	#[default]
	Png,
}

impl ExportFormat {
	/// File extension without the dot.
	pub fn extension(self) -> &'static str {
		match self {
			ExportFormat::Svg => "svg",
			ExportFormat::Png => "png",
		}
	}

	/// MIME type of the downloaded blob.
	pub fn mime_type(self) -> &'static str {
		match self {
			ExportFormat::Svg => "image/svg+xml",
			ExportFormat::Png => "image/png",
		}
	}
}

/// Region of the graph to export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportScope {
	/// Exactly what is on screen.
	Viewport,
	/// Every visible node, regardless of pan and zoom.
	#[default]
	Full,
	/// The selected node and its direct neighbors.
	Selection,
}

/// PNG pixel multiplier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resolution {
	/// One output pixel per graph unit.
	#[default]
	X1,
	/// Double density.
	X2,
	/// Quadruple density.
	X4,
}

impl Resolution {
	/// The multiplier as a number.
	pub fn factor(self) -> u32 {
		match self {
			Resolution::X1 => 1,
			Resolution::X2 => 2,
			Resolution::X4 => 4,
		}
	}
}

impl TryFrom<u32> for Resolution {
	type Error = ExportError;

	fn try_from(value: u32) -> Result<Self, Self::Error> {
		match value {
			1 => Ok(Resolution::X1),
			2 => Ok(Resolution::X2),
			4 => Ok(Resolution::X4),
			other => Err(ExportError::InvalidResolution(other)),
		}
	}
}

/// What to export and how.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
	/// Output format.
	pub format: ExportFormat,
	/// Region to export.
	pub scope: ExportScope,
	/// PNG only; ignored for SVG.
	pub resolution: Resolution,
	/// Draw the dependency-kind legend in a corner.
	pub include_legend: bool,
	/// Stamp the project name and date along the bottom edge.
	pub include_watermark: bool,
	/// `None` exports a transparent background.
	pub background: Option<Color>,
}

impl Default for ExportOptions {
	fn default() -> Self {
		Self {
			format: ExportFormat::Png,
			scope: ExportScope::Full,
			resolution: Resolution::X1,
			include_legend: true,
			include_watermark: false,
			background: None,
		}
	}
}

/// Stage of the export in flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportProgress {
	/// Nothing running.
	#[default]
	Idle,
	/// Resolving the export region.
	Preparing,
	/// Serializing the scene to SVG.
	Rendering,
	/// Rasterizing and encoding PNG bytes.
	Encoding,
	/// Artifact ready.
	Complete,
}

/// Why an export produced no artifact.
#[derive(Debug, Error)]
pub enum ExportError {
	/// No positioned nodes in the requested scope.
	#[error("there is nothing to export")]
	EmptyScene,
	/// The pixmap could not be allocated, usually because it is too large.
	#[error("could not allocate a {width}x{height} export surface")]
	SurfaceUnavailable {
		/// Requested width in pixels.
		width: u32,
		/// Requested height in pixels.
		height: u32,
	},
	/// `usvg` rejected the generated document.
	#[error("generated SVG failed to parse: {0}")]
	Parse(#[from] usvg::Error),
	/// `tiny-skia` failed to write PNG bytes.
	#[error("PNG encoding failed: {0}")]
	Encode(String),
	/// A multiplier other than 1, 2 or 4.
	#[error("unsupported resolution {0}x (expected 1, 2 or 4)")]
	InvalidResolution(u32),
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal(Rc<Cell<bool>>);

impl AbortSignal {
	pub fn abort(&self) {
		self.0.set(true);
	}

	pub fn is_aborted(&self) -> bool {
		self.0.get()
	}
}

/// A finished export, ready to download.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportArtifact {
	/// `<project>-dependency-graph-<date>[@Nx].<ext>`.
	pub filename: String,
	/// MIME type of `bytes`.
	pub mime_type: &'static str,
	/// File contents.
	pub bytes: Vec<u8>,
	/// Output width in pixels.
	pub width: u32,
	/// Output height in pixels.
	pub height: u32,
}

/// Result of an export that did not fail.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportOutcome {
	/// The artifact was produced.
	Completed(ExportArtifact),
	/// A newer export or an explicit cancel aborted this one.
	Cancelled,
}

/// Everything an export reads from the live view.
pub struct ExportRequest<'a> {
	pub scene: &'a VectorScene,
	pub theme: &'a Theme,
	pub scale: &'a ScaleConfig,
	pub selection: &'a Selection,
	pub viewport: &'a Viewport,
	/// On-screen surface size, for viewport scope.
	pub surface: Size,
	pub legend: &'a [LegendEntry],
	pub project: &'a str,
	pub date: NaiveDate,
}

/// Resolved export region.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportFrame {
	pub bounds: Bounds,
	/// Output size before the resolution multiplier.
	pub size: Size,
	pub members: Option<HashSet<String>>,
}

fn full_frame(scene: &VectorScene) -> Option<ExportFrame> {
	let bounds = scene.bounds()?.expand(EXPORT_PADDING);
	Some(ExportFrame {
		size: Size::new(bounds.width(), bounds.height()),
		bounds,
		members: None,
	})
}

fn selection_frame(scene: &VectorScene, selection: &Selection) -> Option<ExportFrame> {
	let selected = selection.node_id.as_deref()?;
	scene.node(selected)?;
	let mut members: HashSet<String> = scene
		.links()
		.filter(|l| l.touches(selected))
		.map(|l| if l.source == selected { l.target.clone() } else { l.source.clone() })
		.collect();
	members.insert(selected.to_string());

	let bounds = Bounds::from_circles(members.iter().filter_map(|id| {
		let node = scene.node(id)?;
		node.position.map(|p| (p, node.radius))
	}))?
	.expand(EXPORT_PADDING);
	Some(ExportFrame {
		size: Size::new(bounds.width(), bounds.height()),
		bounds,
		members: Some(members),
	})
}

/// Region and output size for `scope`. Selection scope falls back to the full
/// graph when nothing positioned is selected.
pub fn export_frame(
	scene: &VectorScene,
	scope: ExportScope,
	selection: &Selection,
	viewport: &Viewport,
	surface: Size,
) -> Option<ExportFrame> {
	match scope {
		ExportScope::Viewport => (!surface.is_empty() && scene.bounds().is_some()).then(|| ExportFrame {
			bounds: viewport.visible_rect(surface),
			size: surface,
			members: None,
		}),
		ExportScope::Full => full_frame(scene),
		ExportScope::Selection => selection_frame(scene, selection).or_else(|| full_frame(scene)),
	}
}

/// `{project}-dependency-graph-{YYYY-MM-DD}[@{n}x].{ext}`; the multiplier
/// suffix only appears on PNGs above 1x.
pub fn export_filename(project: &str, date: NaiveDate, format: ExportFormat, resolution: Resolution) -> String {
	let slug: String = project
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '-' })
		.collect();
	let slug = slug.trim_matches('-');
	let slug = if slug.is_empty() { "project" } else { slug };
	let suffix = match (format, resolution.factor()) {
		(ExportFormat::Png, n) if n > 1 => format!("@{n}x"),
		_ => String::new(),
	};
	format!(
		"{slug}-dependency-graph-{}{suffix}.{}",
		date.format("%Y-%m-%d"),
		format.extension()
	)
}

/// Family name the bundled face registers under.
const BUNDLED_FAMILY: &str = "DejaVu Sans";

/// Labels must rasterize where no system fonts exist (WASM).
static BUNDLED_FONT: &[u8] = include_bytes!("../../../../assets/fonts/DejaVuSans.ttf");

fn usvg_options() -> usvg::Options<'static> {
	let mut options = usvg::Options::default();
	options.font_family = BUNDLED_FAMILY.to_string();
	let fontdb = options.fontdb_mut();
	fontdb.load_font_data(BUNDLED_FONT.to_vec());
	fontdb.set_sans_serif_family(BUNDLED_FAMILY);
	#[cfg(feature = "system-fonts")]
	fontdb.load_system_fonts();
	options
}

/// Rasterize `svg` (whose document size is `base`) at `resolution`.
pub fn rasterize(
	svg: &str,
	base: Size,
	resolution: Resolution,
	background: Option<Color>,
) -> Result<(Vec<u8>, u32, u32), ExportError> {
	let tree = usvg::Tree::from_str(svg, &usvg_options())?;
	let factor = resolution.factor();
	let width = (base.width.ceil().max(1.0) as u32).saturating_mul(factor);
	let height = (base.height.ceil().max(1.0) as u32).saturating_mul(factor);
	let mut pixmap =
		tiny_skia::Pixmap::new(width, height).ok_or(ExportError::SurfaceUnavailable { width, height })?;

	if let Some(bg) = background.filter(|c| c.a > 0.0) {
		let alpha = (bg.a.clamp(0.0, 1.0) * 255.0).round() as u8;
		pixmap.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, alpha));
	}
	let f = factor as f32;
	resvg::render(&tree, tiny_skia::Transform::from_scale(f, f), &mut pixmap.as_mut());

	let bytes = pixmap
		.encode_png()
		.map_err(|e| ExportError::Encode(e.to_string()))?;
	Ok((bytes, width, height))
}

/// Run one export to completion, checking `signal` between stages.
pub fn export_with(
	request: &ExportRequest<'_>,
	options: &ExportOptions,
	signal: &AbortSignal,
	on_progress: &mut dyn FnMut(ExportProgress),
) -> Result<ExportOutcome, ExportError> {
	on_progress(ExportProgress::Preparing);
	if request.scene.is_empty() {
		return Err(ExportError::EmptyScene);
	}
	let frame = export_frame(
		request.scene,
		options.scope,
		request.selection,
		request.viewport,
		request.surface,
	)
	.ok_or(ExportError::EmptyScene)?;
	if signal.is_aborted() {
		return Ok(ExportOutcome::Cancelled);
	}

	on_progress(ExportProgress::Rendering);
	let in_svg_background = match options.format {
		ExportFormat::Svg => options.background,
		ExportFormat::Png => None,
	};
	let markup = svg::render_svg(&svg::SvgInput {
		scene: request.scene,
		theme: request.theme,
		scale: request.scale,
		selection: request.selection,
		frame: frame.bounds,
		size: frame.size,
		members: frame.members.as_ref(),
		background: in_svg_background,
		legend: options.include_legend.then_some(request.legend),
		watermark: options.include_watermark,
	});
	if signal.is_aborted() {
		return Ok(ExportOutcome::Cancelled);
	}

	on_progress(ExportProgress::Encoding);
	let (bytes, width, height) = match options.format {
		ExportFormat::Svg => (
			markup.into_bytes(),
			frame.size.width.ceil() as u32,
			frame.size.height.ceil() as u32,
		),
		ExportFormat::Png => rasterize(&markup, frame.size, options.resolution, options.background)?,
	};
	if signal.is_aborted() {
		return Ok(ExportOutcome::Cancelled);
	}

	on_progress(ExportProgress::Complete);
	Ok(ExportOutcome::Completed(ExportArtifact {
		filename: export_filename(request.project, request.date, options.format, options.resolution),
		mime_type: options.format.mime_type(),
		bytes,
		width,
		height,
	}))
}

/// Allows one export at a time and tracks its progress.
#[derive(Debug, Default)]
pub struct ExportPipeline {
	current: Option<AbortSignal>,
	progress: ExportProgress,
}

impl ExportPipeline {
	/// Abort whatever is in flight and hand out a fresh signal.
	pub fn begin(&mut self) -> AbortSignal {
		self.cancel();
		let signal = AbortSignal::default();
		self.current = Some(signal.clone());
		self.progress = ExportProgress::Preparing;
		signal
	}

	pub fn cancel(&mut self) {
		if let Some(signal) = self.current.take() {
			signal.abort();
		}
		self.progress = ExportProgress::Idle;
	}

	pub fn progress(&self) -> ExportProgress {
		self.progress
	}

	pub fn is_busy(&self) -> bool {
		!matches!(self.progress, ExportProgress::Idle | ExportProgress::Complete)
	}

	/// Begin and run an export. Errors and cancellation leave the pipeline
	/// `Idle`.
	pub fn run(
		&mut self,
		request: &ExportRequest<'_>,
		options: &ExportOptions,
		mut on_progress: impl FnMut(ExportProgress),
	) -> Result<ExportOutcome, ExportError> {
		let signal = self.begin();
		let mut last = ExportProgress::Preparing;
		let result = export_with(request, options, &signal, &mut |p| {
			last = p;
			on_progress(p);
		});
		self.current = None;
		self.progress = match &result {
			Ok(ExportOutcome::Completed(artifact)) => {
				log::info!(
					"depgraph-view: exported {} ({} bytes)",
					artifact.filename,
					artifact.bytes.len()
				);
				last
			}
			Ok(ExportOutcome::Cancelled) => {
				log::info!("depgraph-view: export cancelled");
				ExportProgress::Idle
			}
			Err(err) => {
				log::warn!("depgraph-view: export failed: {err}");
				ExportProgress::Idle
			}
		};
		if self.progress == ExportProgress::Idle {
			on_progress(ExportProgress::Idle);
		}
		result
	}
}
