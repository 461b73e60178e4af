//! Passes run after `force_graph` integrates springs and charge: spring
//! de-duplication, centering and collision.

use std::collections::BTreeSet;

use super::Body;
use crate::components::dependency_graph::types::Point;

/// Distinct undirected pairs, self-loops dropped. `force_graph` merges
/// parallel edges and cannot index a node twice.
pub fn springs(pairs: impl IntoIterator<Item = (usize, usize)>) -> Vec<(usize, usize)> {
	pairs
		.into_iter()
		.filter(|(s, t)| s != t)
		.map(|(s, t)| (s.min(t), s.max(t)))
		.collect::<BTreeSet<_>>()
		.into_iter()
		.collect()
}

/// Translate the free bodies so their mean moves toward `center`.
/// Pinned bodies neither count nor move.
pub fn center(bodies: &mut [Body], center: Point, strength: f64) {
	let free = || bodies.iter().filter(|b| b.pin.is_none() && b.is_finite());
	let n = free().count();
	if n == 0 {
		return;
	}
	let n = n as f64;
	let sx = (free().map(|b| b.x).sum::<f64>() / n - center.x) * strength;
	let sy = (free().map(|b| b.y).sum::<f64>() / n - center.y) * strength;
	for body in bodies.iter_mut().filter(|b| b.pin.is_none()) {
		body.x -= sx;
		body.y -= sy;
	}
}

/// Push overlapping circles apart, each pair resolved once. Larger bodies
/// move less; a pinned body never moves and its partner takes the whole
/// correction.
pub fn collide(bodies: &mut [Body], padding: f64, strength: f64) {
	for i in 0..bodies.len() {
		for j in i + 1..bodies.len() {
			let (a, b) = (&bodies[i], &bodies[j]);
			if !a.is_finite() || !b.is_finite() {
				continue;
			}
			let r = a.radius + b.radius + 2.0 * padding;
			let mut x = b.x - a.x;
			let mut y = b.y - a.y;
			if x * x + y * y >= r * r {
				continue;
			}
			if x == 0.0 && y == 0.0 {
				// Coincident bodies split along a fixed, index-dependent axis.
				let angle = (i + j) as f64;
				x = angle.cos() * 1e-6;
				y = angle.sin() * 1e-6;
			}
			let d = (x * x + y * y).sqrt();
			let k = (r - d) / d * strength;
			let (ra, rb) = (a.radius * a.radius, b.radius * b.radius);
			let mut share = if ra + rb > 0.0 { rb / (ra + rb) } else { 0.5 };
			match (a.pin.is_some(), b.pin.is_some()) {
				(true, true) => continue,
				(true, false) => share = 0.0,
				(false, true) => share = 1.0,
				(false, false) => {}
			}
			bodies[i].x -= x * k * share;
			bodies[i].y -= y * k * share;
			bodies[j].x += x * k * (1.0 - share);
			bodies[j].y += y * k * (1.0 - share);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn body(x: f64, y: f64) -> Body {
		Body {
			x,
			y,
			radius: 8.0,
			pin: None,
		}
	}

	#[test]
	fn springs_are_unique_and_skip_self_loops() {
		let springs = springs([(0, 1), (1, 0), (2, 2), (3, 1)]);

		assert_eq!(springs, vec![(0, 1), (1, 3)]);
	}

	#[test]
	fn center_moves_free_mean_onto_target() {
		let mut bodies = vec![body(0.0, 0.0), body(10.0, 20.0), body(500.0, 500.0)];
		bodies[2].pin = Some(Point::new(500.0, 500.0));
		center(&mut bodies, Point::new(100.0, 100.0), 1.0);
		let mean_x = (bodies[0].x + bodies[1].x) / 2.0;
		let mean_y = (bodies[0].y + bodies[1].y) / 2.0;

		assert!((mean_x - 100.0).abs() < 1e-9);
		assert!((mean_y - 100.0).abs() < 1e-9);
		assert_eq!(bodies[2].position(), Point::new(500.0, 500.0));
	}

	#[test]
	fn overlapping_bodies_are_pushed_apart() {
		let mut bodies = vec![body(0.0, 0.0), body(4.0, 0.0)];
		collide(&mut bodies, 5.0, 0.7);

		assert!(bodies[0].x < 0.0);
		assert!(bodies[1].x > 4.0);
		assert_eq!(bodies[0].y, 0.0);
	}

	#[test]
	fn pinned_body_holds_during_collision() {
		let mut bodies = vec![body(0.0, 0.0), body(4.0, 0.0)];
		bodies[0].pin = Some(Point::default());
		collide(&mut bodies, 5.0, 1.0);

		assert_eq!(bodies[0].position(), Point::default());
		assert!((bodies[1].x - 26.0).abs() < 1e-9, "x = {}", bodies[1].x);
	}

	#[test]
	fn coincident_bodies_separate() {
		let mut bodies = vec![body(3.0, 3.0), body(3.0, 3.0)];
		collide(&mut bodies, 5.0, 0.7);

		assert!(bodies[0].position().distance(bodies[1].position()) > 1.0);
	}
}
