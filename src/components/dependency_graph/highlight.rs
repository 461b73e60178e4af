//! Smooth hover highlighting for a node and its direct neighbors.
//!
//! Every node id carries an intensity in `[0, 1]` that eases toward 1 while
//! the node is in the target set and decays toward 0 afterwards. A short hold
//! time keeps a highlight from flickering when the pointer grazes a node.

use std::collections::{HashMap, HashSet};

use super::types::DependencyLink;

/// Seconds a highlight is held before it may start fading.
const MIN_HOLD_TIME: f64 = 0.12;
/// Exponential smoothing rates; higher is faster.
const FADE_IN_SPEED: f64 = 6.0;
const FADE_OUT_SPEED: f64 = 4.0;
/// Intensities below this are dropped.
const CUTOFF: f64 = 0.005;

#[derive(Clone, Debug, Default)]
pub struct HighlightState {
	hovered: Option<String>,
	target_set: HashSet<String>,
	intensity: HashMap<String, f64>,
	hold_timer: HashMap<String, f64>,
	cached_max: f64,
}

impl HighlightState {
	pub fn hovered(&self) -> Option<&str> {
		self.hovered.as_deref()
	}

	/// Node ids that are (or are becoming) fully highlighted.
	pub fn target_set(&self) -> &HashSet<String> {
		&self.target_set
	}

	/// Change the hovered node; the target set becomes it plus every node
	/// sharing a link with it. Returns `false` when nothing changed.
	pub fn set_hover(&mut self, id: Option<&str>, links: &[DependencyLink]) -> bool {
		if self.hovered.as_deref() == id {
			return false;
		}
		self.hovered = id.map(str::to_string);
		self.target_set.clear();

		if let Some(id) = id {
			self.target_set.insert(id.to_string());
			for link in links {
				if link.source_id() == id {
					self.target_set.insert(link.target_id().to_string());
				} else if link.target_id() == id {
					self.target_set.insert(link.source_id().to_string());
				}
			}
			for member in &self.target_set {
				self.hold_timer.insert(member.clone(), MIN_HOLD_TIME);
			}
		}
		true
	}

	/// Advance every intensity by `dt` seconds. Returns whether anything is
	/// still animating, so the caller can stop requesting frames.
	pub fn tick(&mut self, dt: f64) -> bool {
		let fade_in = 1.0 - (-FADE_IN_SPEED * dt).exp();
		let fade_out = (-FADE_OUT_SPEED * dt).exp();

		for id in &self.target_set {
			let value = self.intensity.entry(id.clone()).or_insert(0.0);
			*value += (1.0 - *value) * fade_in;
		}

		let targets = &self.target_set;
		self.hold_timer.retain(|id, timer| {
			if targets.contains(id) {
				return true;
			}
			*timer -= dt;
			*timer > 0.0
		});

		let holds = &self.hold_timer;
		let mut max: f64 = 0.0;
		let mut animating = false;
		self.intensity.retain(|id, value| {
			if targets.contains(id) {
				animating |= *value < 1.0 - CUTOFF;
			} else {
				if holds.get(id).copied().unwrap_or(0.0) <= 0.0 {
					*value *= fade_out;
				}
				animating = true;
			}
			max = max.max(*value);
			*value > CUTOFF
		});

		self.cached_max = max;
		animating
	}

	pub fn intensity(&self, id: &str) -> f64 {
		self.intensity.get(id).copied().unwrap_or(0.0)
	}

	/// Geometric mean of the endpoint intensities.
	pub fn edge_intensity(&self, from: &str, to: &str) -> f64 {
		(self.intensity(from) * self.intensity(to)).sqrt()
	}

	/// Largest intensity of any node; drives dimming of everything else.
	pub fn max_intensity(&self) -> f64 {
		self.cached_max
	}

	pub fn clear(&mut self) {
		*self = Self::default();
	}
}
