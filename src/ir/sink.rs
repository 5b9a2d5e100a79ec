
use std::collections::{ HashSet };
use std::error::Error;

use parse_display::Display;
use smallvec::{ SmallVec };

use super::*;

// ------------------------------------------------------------------------------------------------
// SinkErrorKind
// ------------------------------------------------------------------------------------------------

/// The kinds of internal invariant violations the pass can detect. Either one indicates
/// a bug in the merge or kill logic, not a property of the input program.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
pub enum SinkErrorKind {
	/// The gen/kill/in/out fixpoint failed to settle.
	#[display("dataflow did not converge after {passes} passes")]
	NoFixpoint { passes: usize },

	/// The outer sink/re-analyze loop failed to settle.
	#[display("sinking did not reach a fixpoint after {rounds} rounds")]
	NoSinkFixpoint { rounds: usize },
}

// ------------------------------------------------------------------------------------------------
// SinkError
// ------------------------------------------------------------------------------------------------

/// The pass error type. Aborts processing for the function, leaving it valid but
/// suboptimal: every previously completed variable's changes remain applied.
#[derive(Debug, Display, PartialEq, Eq, Copy, Clone)]
#[display("store sinking failed for {var}: {kind}")]
pub struct SinkError {
	/// The variable being processed.
	pub var:  VarId,
	/// The kind of violation.
	pub kind: SinkErrorKind,
}

impl Error for SinkError {}

impl SinkError {
	/// Shorthand constructors.
	fn no_fixpoint(var: VarId, passes: usize) -> SinkError {
		SinkError { var, kind: SinkErrorKind::NoFixpoint { passes } }
	}

	/// Ditto.
	fn no_sink_fixpoint(var: VarId, rounds: usize) -> SinkError {
		SinkError { var, kind: SinkErrorKind::NoSinkFixpoint { rounds } }
	}
}

/// Alias for a `Result` with a `SinkError` as its error type.
pub type SinkResult<T> = Result<T, SinkError>;

// ------------------------------------------------------------------------------------------------
// BlockSummary
// ------------------------------------------------------------------------------------------------

/// Per-block, per-variable dataflow summary. Recomputed from scratch on every analysis
/// run and discarded on the first mutation; never held across a sinking round.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct BlockSummary {
	/// The store left live at block exit by the block's own code.
	pub(crate) gen:  Option<InstId>,
	/// Whether a load, or a structural hazard, invalidates any incoming store.
	pub(crate) kill: bool,
	/// The store guaranteed live at block entry: the same syntactic store on every
	/// incoming path, or `None`.
	pub(crate) in_:  Option<InstId>,
	/// The store guaranteed live at block exit, or `None`.
	pub(crate) out:  Option<InstId>,
}

// ------------------------------------------------------------------------------------------------
// Phase A: local summaries
// ------------------------------------------------------------------------------------------------

fn local_summaries(func: &Function, var: VarId) -> Vec<BlockSummary> {
	let mut ret = vec![BlockSummary::default(); func.num_bbs()];

	for bb in 0 .. func.num_bbs() {
		let res = &mut ret[bb];

		// the last store/load event in program order wins.
		for &id in func.bb(bb).insts() {
			match func.inst(id).kind() {
				InstKind::Store { var: v, .. } if v == var => {
					res.kill = false;
					res.gen = Some(id);
				}

				InstKind::Load { var: v } if v == var => {
					res.gen = None;
					res.kill = true;
				}

				_ => {}
			}
		}

		// structural hazard: if one successor can reach another, the outgoing paths are
		// not mutually exclusive merge candidates, and sinking a value past this branch
		// point is unsafe. Only adjacent successor pairs are compared; see
		// `tests::hazard_checks_adjacent_successor_pairs_only`.
		let succs = func.successors(bb).collect::<SmallVec<[BBId; 4]>>();

		for pair in succs.windows(2) {
			if path_exists(func.cfg(), pair[0], pair[1])
			|| path_exists(func.cfg(), pair[1], pair[0]) {
				res.gen = None;
				res.kill = true;
				break;
			}
		}
	}

	ret
}

// ------------------------------------------------------------------------------------------------
// Phase B: merge to fixpoint
// ------------------------------------------------------------------------------------------------

const FIXPOINT_SLACK: usize = 8;

fn merge_to_fixpoint(func: &Function, var: VarId, summaries: &mut [BlockSummary])
-> SinkResult<()> {
	// each block's `in` can only step down a two-level lattice, so ~2 passes per block
	// is the true bound; the slack makes the cutoff unambiguous.
	let max_passes = 2 * func.num_bbs() + FIXPOINT_SLACK;

	for _ in 0 .. max_passes {
		// accumulated across ALL blocks; a per-block flag overwritten on each block can
		// terminate the loop before a true fixpoint.
		let mut changed = false;

		for bb in 0 .. func.num_bbs() {
			let old_in = summaries[bb].in_;

			// a block with no predecessors has no incoming store; otherwise all
			// predecessors must agree on one syntactic store.
			let mut new_in = None;

			for (i, pred) in func.predecessors(bb).enumerate() {
				match summaries[pred].out {
					None => {
						new_in = None;
						break;
					}

					Some(out) if i == 0 => new_in = Some(out),

					Some(out) => {
						// unwrap ok: set on the first iteration above.
						let cur = new_in.unwrap();

						if !func.inst(cur).same_store(func.inst(out)) {
							new_in = None;
							break;
						}
					}
				}
			}

			summaries[bb].in_ = new_in;

			summaries[bb].out = if let Some(gen) = summaries[bb].gen {
				Some(gen)
			} else if !summaries[bb].kill {
				new_in
			} else {
				None
			};

			changed |= old_in != new_in;
		}

		if !changed {
			return Ok(());
		}
	}

	Err(SinkError::no_fixpoint(var, max_passes))
}

// ------------------------------------------------------------------------------------------------
// analyze
// ------------------------------------------------------------------------------------------------

/// Computes converged gen/kill/in/out summaries for `var` across the whole function.
/// Read-only; the result is only valid until the next mutation.
pub(crate) fn analyze(func: &Function, var: VarId) -> SinkResult<Vec<BlockSummary>> {
	let mut summaries = local_summaries(func, var);
	merge_to_fixpoint(func, var, &mut summaries)?;
	Ok(summaries)
}

// ------------------------------------------------------------------------------------------------
// Sinking transformer
// ------------------------------------------------------------------------------------------------

/// What one sinking round did to the function.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
struct SinkRound {
	inserted: usize,
	erased:   usize,
}

/// One sinking round: materialize a clone of each block's incoming store at its first
/// insertion point, then erase the predecessor stores that became partially dead.
/// Returns `None` if nothing was mutated (fixpoint for this variable); otherwise the
/// summaries are invalidated and the caller must re-run `analyze` before calling again.
fn sink_once(func: &mut Function, summaries: &[BlockSummary]) -> Option<SinkRound> {
	// read-only scan first; all mutations are batched and applied afterwards.
	let mut inserts = vec![];
	let mut partially_dead = HashSet::new();

	for bb in 0 .. func.num_bbs() {
		if let Some(in_) = summaries[bb].in_ {
			inserts.push((in_, bb));

			for pred in func.predecessors(bb) {
				// a non-None `in` means every predecessor's `out` is non-None.
				if let Some(out) = summaries[pred].out {
					partially_dead.insert(out);
				}
			}
		}
	}

	if partially_dead.is_empty() {
		return None;
	}

	let round = SinkRound {
		inserted: inserts.len(),
		erased:   partially_dead.len(),
	};

	for (inst, bb) in inserts.into_iter() {
		log::trace!("sinking {:?} into bb{}", func.inst(inst).kind(), bb);
		func.insert_clone(inst, bb);
	}

	for inst in partially_dead.into_iter() {
		log::trace!("erasing partially dead {:?}", func.inst(inst).kind());
		func.erase(inst);
	}

	Some(round)
}

// ------------------------------------------------------------------------------------------------
// Preserved, SinkReport
// ------------------------------------------------------------------------------------------------

/// Which downstream analyses survive the pass. Only store placement changes: blocks and
/// edges are untouched, but anything tracking data or control dependences has to be
/// recomputed.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Preserved {
	/// CFG shape (blocks and edges).
	pub cfg_shape:   bool,
	/// Data/control dependence information.
	pub dependences: bool,
}

impl Preserved {
	fn after_store_motion() -> Preserved {
		Preserved { cfg_shape: true, dependences: false }
	}
}

/// What the whole pass did to a function.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct SinkReport {
	/// How many allocation sites were processed.
	pub vars:           usize,
	/// How many sinking rounds mutated the function.
	pub rounds:         usize,
	/// How many store clones were inserted at merge points.
	pub inserted:       usize,
	/// How many partially dead stores were erased.
	pub erased:         usize,
	/// How many block-local redundant stores the cleanup removed.
	pub cleanup_erased: usize,
	/// Which analyses remain valid afterwards.
	pub preserved:      Preserved,
}

impl SinkReport {
	fn new() -> SinkReport {
		SinkReport {
			vars:           0,
			rounds:         0,
			inserted:       0,
			erased:         0,
			cleanup_erased: 0,
			preserved:      Preserved::after_store_motion(),
		}
	}

	/// `true` if the pass changed the function at all.
	pub fn mutated(&self) -> bool {
		self.rounds > 0 || self.cleanup_erased > 0
	}
}

// ------------------------------------------------------------------------------------------------
// Driver
// ------------------------------------------------------------------------------------------------

const SINK_ROUND_SLACK: usize = 8;

/// The full pass. For each allocation site: alternate read-only analysis and sinking
/// until a round mutates nothing, then remove block-local redundant stores. Mutations
/// made for one variable persist into the next variable's analysis; summaries never do.
pub(crate) fn sink_stores(func: &mut Function) -> SinkResult<SinkReport> {
	let mut report = SinkReport::new();
	let vars = func.allocation_sites().to_vec();

	for var in vars.into_iter() {
		log::debug!("sinking stores to {:?} in '{}'", var, func.name());

		// every mutating round erases at least one store, so this bound is generous.
		let max_rounds = func.num_insts() + func.num_bbs() + SINK_ROUND_SLACK;
		let mut rounds = 0;

		loop {
			let summaries = analyze(func, var)?;

			match sink_once(func, &summaries) {
				None => {
					dump_summaries(func, var, &summaries);
					break;
				}

				Some(round) => {
					report.rounds   += 1;
					report.inserted += round.inserted;
					report.erased   += round.erased;
				}
			}

			rounds += 1;

			if rounds > max_rounds {
				return Err(SinkError::no_sink_fixpoint(var, rounds));
			}
		}

		report.cleanup_erased += elim_redundant_stores(func, var);
		report.vars += 1;
	}

	Ok(report)
}

// ------------------------------------------------------------------------------------------------
// Diagnostics
// ------------------------------------------------------------------------------------------------

fn dump_summaries(func: &Function, var: VarId, summaries: &[BlockSummary]) {
	if !log::log_enabled!(log::Level::Debug) {
		return;
	}

	log::debug!("converged summaries for {:?}:", var);

	for (bb, s) in summaries.iter().enumerate() {
		log::debug!("  bb{}: gen {:?} kill {} in {:?} out {:?}",
			bb,
			s.gen.map(|id| func.inst(id).kind()),
			s.kill,
			s.in_.map(|id| func.inst(id).kind()),
			s.out.map(|id| func.inst(id).kind()));
	}
}
