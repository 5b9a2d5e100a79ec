
use std::collections::{ HashMap };

use super::*;

// ------------------------------------------------------------------------------------------------
// Single-path evaluation
// ------------------------------------------------------------------------------------------------

/// The value a load observed: `None` means the variable was never stored to on the path.
pub type LoadedValue = (VarId, Option<u64>);

/// Evaluates `func` along a single control-flow path starting at the entry block. At a
/// block with more than one successor, the next element of `choices` picks the edge (an
/// index into the successors, in enumeration order); evaluation stops when a block has
/// no successors or the choices run out. Returns the value observed by every load, in
/// execution order.
pub fn eval_path(func: &Function, choices: &[usize]) -> Vec<LoadedValue> {
	let mut mem = HashMap::new();
	let mut reads = vec![];
	let mut choices = choices.iter();
	let mut bb = 0;

	loop {
		for &id in func.bb(bb).insts() {
			match func.inst(id).kind() {
				InstKind::Store { var, src } => {
					mem.insert(var, src_value(src));
				}

				InstKind::Load { var } => {
					reads.push((var, mem.get(&var).copied()));
				}

				InstKind::Alloc { .. } | InstKind::Other => {}
			}
		}

		let succs = func.successors(bb).collect::<Vec<_>>();

		bb = match succs[..] {
			[]     => break,
			[only] => only,
			_      => match choices.next() {
				Some(&c) => succs[c],
				None     => break,
			}
		};
	}

	reads
}

/// Temporaries are opaque, so model each as a distinct sentinel value.
fn src_value(src: Src) -> u64 {
	match src {
		Src::Const(c) => c,
		Src::Temp(t)  => 0x7E4D_0000_0000 | u64::from(t.0),
	}
}
