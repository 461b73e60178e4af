//! Cycle membership index for nodes and edges.

use std::collections::HashMap;

use super::types::{CircularDependencyInfo, edge_key};

/// O(1) lookups from node ids and `"from->to"` edge keys to the cycles they
/// belong to. Built once per analyzer result.
#[derive(Clone, Debug, Default)]
pub struct CycleIndex {
	cycles: Vec<CircularDependencyInfo>,
	node_cycles: HashMap<String, Vec<usize>>,
	edge_cycles: HashMap<String, Vec<usize>>,
}

fn push_unique(ids: &mut Vec<usize>, index: usize) {
	if !ids.contains(&index) {
		ids.push(index);
	}
}

impl CycleIndex {
	/// Index every consecutive pair of every cycle. A walk that does not
	/// repeat its first id at the end is closed implicitly.
	pub fn build(cycles: &[CircularDependencyInfo]) -> Self {
		let mut node_cycles: HashMap<String, Vec<usize>> = HashMap::new();
		let mut edge_cycles: HashMap<String, Vec<usize>> = HashMap::new();

		for (index, info) in cycles.iter().enumerate() {
			let walk = &info.cycle;
			if walk.len() < 2 {
				log::warn!("depgraph-view: ignoring degenerate cycle #{index}");
				continue;
			}

			for id in walk {
				push_unique(node_cycles.entry(id.clone()).or_default(), index);
			}
			for pair in walk.windows(2) {
				push_unique(
					edge_cycles.entry(edge_key(&pair[0], &pair[1])).or_default(),
					index,
				);
			}
			if let (Some(first), Some(last)) = (walk.first(), walk.last()) {
				if first != last {
					push_unique(edge_cycles.entry(edge_key(last, first)).or_default(), index);
				}
			}
		}

		Self {
			cycles: cycles.to_vec(),
			node_cycles,
			edge_cycles,
		}
	}

	pub fn len(&self) -> usize {
		self.cycles.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cycles.is_empty()
	}

	pub fn node_cycle_ids(&self, id: &str) -> &[usize] {
		self.node_cycles.get(id).map(Vec::as_slice).unwrap_or_default()
	}

	pub fn edge_cycle_ids(&self, from: &str, to: &str) -> &[usize] {
		self.edge_cycles
			.get(&edge_key(from, to))
			.map(Vec::as_slice)
			.unwrap_or_default()
	}

	pub fn cycle(&self, index: usize) -> Option<&CircularDependencyInfo> {
		self.cycles.get(index)
	}
}
