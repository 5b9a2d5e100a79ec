
use std::collections::{ VecDeque, HashSet };

use petgraph::{ Direction };

use super::*;

// ------------------------------------------------------------------------------------------------
// Reachability
// ------------------------------------------------------------------------------------------------

/// `true` if a directed path exists from `start` to `end`. Trivially true when
/// `start == end`. Explicit worklist with a visited set: the CFG can contain back-edges,
/// so an unguarded traversal would not terminate.
pub(crate) fn path_exists(cfg: &Cfg, start: BBId, end: BBId) -> bool {
	if start == end {
		return true;
	}

	let mut visited = HashSet::new();
	let mut work = VecDeque::new();

	visited.insert(start);
	work.push_back(start);

	while let Some(n) = work.pop_front() {
		for succ in cfg.neighbors_directed(n, Direction::Outgoing) {
			if succ == end {
				return true;
			}

			if visited.insert(succ) {
				work.push_back(succ);
			}
		}
	}

	false
}
