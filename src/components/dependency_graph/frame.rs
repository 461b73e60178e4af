//! Animation-frame coalescing and one-shot timers.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Coalesces repaint requests: any number of `request` calls between two
/// frames ask the browser for exactly one animation frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameGate {
	pending: bool,
	dirty: bool,
}

impl FrameGate {
	/// Mark the surface dirty. Returns `true` when a new frame must be
	/// requested from the browser.
	pub fn request(&mut self) -> bool {
		self.dirty = true;
		!std::mem::replace(&mut self.pending, true)
	}

	/// Called at the start of a frame; returns whether a paint is due.
	pub fn begin_frame(&mut self) -> bool {
		self.pending = false;
		std::mem::take(&mut self.dirty)
	}

	pub fn cancel(&mut self) {
		*self = Self::default();
	}
}

type FrameCallback = Rc<RefCell<Option<Box<dyn FnMut(f64)>>>>;

/// `requestAnimationFrame` driver built on [`FrameGate`]. Cloning shares the
/// same gate and callback.
#[derive(Clone, Default)]
pub struct FrameScheduler {
	gate: Rc<Cell<FrameGate>>,
	handle: Rc<Cell<Option<i32>>>,
	on_frame: FrameCallback,
	closure: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
}

impl FrameScheduler {
	/// Install the per-frame callback. It receives the frame timestamp in
	/// milliseconds and may call [`FrameScheduler::request`] to keep going.
	pub fn set_callback(&self, on_frame: impl FnMut(f64) + 'static) {
		*self.on_frame.borrow_mut() = Some(Box::new(on_frame));

		let (gate, handle, callback) = (self.gate.clone(), self.handle.clone(), self.on_frame.clone());
		*self.closure.borrow_mut() = Some(Closure::new(move |timestamp: f64| {
			handle.set(None);
			let mut g = gate.get();
			let due = g.begin_frame();
			gate.set(g);
			if !due {
				return;
			}
			if let Some(f) = callback.borrow_mut().as_mut() {
				f(timestamp);
			}
		}));
	}

	/// Ask for a frame. The gate only records the request once the browser
	/// has accepted it, so a request made before [`FrameScheduler::set_callback`]
	/// is simply dropped.
	pub fn request(&self) {
		let mut g = self.gate.get();
		if !g.request() {
			self.gate.set(g);
			return;
		}
		let closure = self.closure.borrow();
		let (Some(window), Some(cb)) = (web_sys::window(), closure.as_ref()) else {
			return;
		};
		match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
			Ok(id) => {
				self.gate.set(g);
				self.handle.set(Some(id));
			}
			Err(err) => log::warn!("depgraph-view: requestAnimationFrame failed: {err:?}"),
		}
	}

	/// Cancel any pending frame and drop the callback.
	pub fn cancel(&self) {
		if let (Some(id), Some(window)) = (self.handle.take(), web_sys::window()) {
			let _ = window.cancel_animation_frame(id);
		}
		self.gate.set(FrameGate::default());
		self.on_frame.borrow_mut().take();
	}
}

/// A single replaceable `setTimeout`. Scheduling again cancels the previous
/// timer, which makes it a debouncer.
#[derive(Clone, Default)]
pub struct TimerSlot {
	handle: Rc<Cell<Option<i32>>>,
	closure: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
}

impl TimerSlot {
	pub fn schedule(&self, delay_ms: i32, f: impl FnOnce() + 'static) {
		self.cancel();
		let Some(window) = web_sys::window() else {
			return;
		};
		let handle = self.handle.clone();
		let closure = Closure::once(move || {
			handle.set(None);
			f();
		});
		match window.set_timeout_with_callback_and_timeout_and_arguments_0(
			closure.as_ref().unchecked_ref(),
			delay_ms,
		) {
			Ok(id) => {
				self.handle.set(Some(id));
				*self.closure.borrow_mut() = Some(closure);
			}
			Err(err) => log::warn!("depgraph-view: setTimeout failed: {err:?}"),
		}
	}

	pub fn cancel(&self) {
		if let (Some(id), Some(window)) = (self.handle.take(), web_sys::window()) {
			window.clear_timeout_with_handle(id);
		}
	}
}
