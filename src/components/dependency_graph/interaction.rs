//! Pointer, click and keyboard state shared by both backends.

use super::types::Point;

/// Screen-space distance a press may travel before it counts as a drag.
pub const DRAG_THRESHOLD: f64 = 3.0;

/// What the pointer is doing right now.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PointerState {
	#[default]
	Idle,
	Hovering { id: String },
	DraggingNode { id: String, origin: Point, moved: bool },
	Panning { origin: Point, pan_origin: Point, moved: bool },
}

impl PointerState {
	pub fn is_dragging(&self) -> bool {
		matches!(
			self,
			PointerState::DraggingNode { moved: true, .. } | PointerState::Panning { moved: true, .. }
		)
	}
}

/// Node under the pointer and where the pointer is, in surface coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HoverState {
	pub node_id: Option<String>,
	pub position: Option<Point>,
}

/// The selected node and which of its cycles, if any, is emphasized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
	pub node_id: Option<String>,
	pub highlighted_cycle: Option<usize>,
}

impl Selection {
	pub fn is_selected(&self, id: &str) -> bool {
		self.node_id.as_deref() == Some(id)
	}

	pub fn clear(&mut self) {
		*self = Self::default();
	}

	/// A single click on `id`. Clicking a new node selects it and highlights
	/// its first cycle. Clicking the selected node again steps to its next
	/// cycle, then clears the highlight after the last one; clicking a
	/// non-cycle node again deselects it.
	pub fn click(&mut self, id: &str, cycle_ids: &[usize]) {
		if !self.is_selected(id) {
			self.node_id = Some(id.to_string());
			self.highlighted_cycle = cycle_ids.first().copied();
			return;
		}
		if cycle_ids.is_empty() {
			self.clear();
			return;
		}
		self.highlighted_cycle = match self.highlighted_cycle {
			None => cycle_ids.first().copied(),
			Some(current) => cycle_ids
				.iter()
				.position(|&c| c == current)
				.and_then(|i| cycle_ids.get(i + 1))
				.copied(),
		};
	}
}

/// A resolved click on a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickAction {
	/// Select the node, or cycle through its cycles if already selected.
	Single(String),
	/// Toggle the node's collapsed state.
	Double(String),
}

/// Tells single clicks from double clicks on the same node.
///
/// A click is held for `window_ms`. A second click on the same node inside
/// the window becomes [`ClickAction::Double`]; any other click releases the
/// held one as a single click immediately.
#[derive(Clone, Debug)]
pub struct ClickDisambiguator {
	window_ms: f64,
	pending: Option<(String, f64)>,
}

impl ClickDisambiguator {
	pub fn new(window_ms: f64) -> Self {
		Self {
			window_ms,
			pending: None,
		}
	}

	pub fn window_ms(&self) -> f64 {
		self.window_ms
	}

	pub fn has_pending(&self) -> bool {
		self.pending.is_some()
	}

	/// Register a click at `now_ms`. Returns an action that is already decided.
	pub fn register(&mut self, id: &str, now_ms: f64) -> Option<ClickAction> {
		match self.pending.take() {
			Some((pending, at)) if pending == id && now_ms - at <= self.window_ms => {
				Some(ClickAction::Double(pending))
			}
			Some((pending, _)) => {
				self.pending = Some((id.to_string(), now_ms));
				Some(ClickAction::Single(pending))
			}
			None => {
				self.pending = Some((id.to_string(), now_ms));
				None
			}
		}
	}

	/// Release a held click whose window has expired.
	pub fn flush(&mut self, now_ms: f64) -> Option<ClickAction> {
		match &self.pending {
			Some((_, at)) if now_ms - at >= self.window_ms => {
				self.pending.take().map(|(id, _)| ClickAction::Single(id))
			}
			_ => None,
		}
	}

	pub fn cancel(&mut self) {
		self.pending = None;
	}
}

/// Keyboard shortcut or toolbar command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
	/// One zoom step in.
	ZoomIn,
	/// One zoom step out.
	ZoomOut,
	/// Back to 1:1 with no pan.
	ResetView,
	/// Fit the whole layout on screen.
	FitToGraph,
	/// Drop the selection.
	ClearSelection,
	/// Expand every collapsed node.
	ExpandAll,
	/// Show this many depth levels, collapsing the last one.
	ShowLevels(usize),
}

/// Map a `KeyboardEvent.key` value to an action.
pub fn key_action(key: &str) -> Option<KeyAction> {
	match key {
		"+" | "=" => Some(KeyAction::ZoomIn),
		"-" | "_" => Some(KeyAction::ZoomOut),
		"0" => Some(KeyAction::ResetView),
		"f" | "F" => Some(KeyAction::FitToGraph),
		"Escape" => Some(KeyAction::ClearSelection),
		"e" | "E" => Some(KeyAction::ExpandAll),
		digit => match digit.parse::<usize>() {
			Ok(levels @ 1..=9) => Some(KeyAction::ShowLevels(levels)),
			_ => None,
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn double_click_inside_window() {
		let mut clicks = ClickDisambiguator::new(250.0);
		assert_eq!(clicks.register("a", 0.0), None);
		assert_eq!(clicks.register("a", 200.0), Some(ClickAction::Double("a".into())));
		assert!(!clicks.has_pending());
		assert_eq!(clicks.flush(1000.0), None);
	}

	#[test]
	fn expired_click_flushes_as_single() {
		let mut clicks = ClickDisambiguator::new(250.0);
		clicks.register("a", 0.0);
		assert_eq!(clicks.flush(100.0), None);
		assert_eq!(clicks.flush(250.0), Some(ClickAction::Single("a".into())));

		// Too slow for a double click: two singles.
		clicks.register("b", 1000.0);
		assert_eq!(clicks.register("b", 1400.0), Some(ClickAction::Single("b".into())));
		assert_eq!(clicks.flush(1700.0), Some(ClickAction::Single("b".into())));
	}

	#[test]
	fn click_on_other_node_releases_pending_single() {
		let mut clicks = ClickDisambiguator::new(250.0);
		clicks.register("a", 0.0);
		assert_eq!(clicks.register("b", 50.0), Some(ClickAction::Single("a".into())));
		assert!(clicks.has_pending());
	}

	#[test]
	fn selection_rotates_through_cycles() {
		let mut selection = Selection::default();
		selection.click("a", &[2, 5]);
		assert_eq!(selection.highlighted_cycle, Some(2));
		selection.click("a", &[2, 5]);
		assert_eq!(selection.highlighted_cycle, Some(5));
		selection.click("a", &[2, 5]);
		assert_eq!(selection.highlighted_cycle, None);
		assert!(selection.is_selected("a"));
		selection.click("a", &[2, 5]);
		assert_eq!(selection.highlighted_cycle, Some(2));

		selection.click("b", &[]);
		assert!(selection.is_selected("b"));
		assert_eq!(selection.highlighted_cycle, None);
		selection.click("b", &[]);
		assert_eq!(selection, Selection::default());
	}

	#[test]
	fn keys_map_to_actions() {
		assert_eq!(key_action("="), Some(KeyAction::ZoomIn));
		assert_eq!(key_action("Escape"), Some(KeyAction::ClearSelection));
		assert_eq!(key_action("e"), Some(KeyAction::ExpandAll));
		assert_eq!(key_action("x"), None);
		assert_eq!(key_action("0"), Some(KeyAction::ResetView));
		assert_eq!(key_action("1"), Some(KeyAction::ShowLevels(1)));
		assert_eq!(key_action("9"), Some(KeyAction::ShowLevels(9)));
		assert_eq!(key_action("10"), None);
	}
}
