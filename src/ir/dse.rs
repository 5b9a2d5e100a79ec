
use super::*;

// ------------------------------------------------------------------------------------------------
// Block-local redundant store elimination
// ------------------------------------------------------------------------------------------------

/// Removes stores to `var` made dead by a later store in the same block with no load in
/// between. One reverse scan per block, no cross-block state. Returns how many stores
/// were erased.
pub(crate) fn elim_redundant_stores(func: &mut Function, var: VarId) -> usize {
	let mut erased = 0;

	for bb in 0 .. func.num_bbs() {
		let mut live_store_seen = false;
		let mut to_del = vec![];

		for &id in func.bb(bb).insts().iter().rev() {
			let inst = func.inst(id);

			if inst.stores_to(var) {
				if live_store_seen {
					to_del.push(id);
				} else {
					// scanning backward, so this is the block's last store.
					live_store_seen = true;
				}
			} else if inst.loads_from(var) {
				live_store_seen = false;
			}
		}

		for id in to_del.into_iter() {
			log::trace!("erasing redundant {:?} in bb{}", func.inst(id).kind(), bb);
			func.erase(id);
			erased += 1;
		}
	}

	erased
}
