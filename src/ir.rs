
use std::fmt::{ Debug, Formatter, Result as FmtResult };

use generational_arena::{ Arena };
use lazycell::{ LazyCell };
use petgraph::{ Direction, graphmap::{ DiGraphMap } };

// ------------------------------------------------------------------------------------------------
// Sub-modules
// ------------------------------------------------------------------------------------------------

pub mod builder;
pub mod dse;
pub mod inst;
pub mod interp;
pub mod reach;
pub mod sink;

#[cfg(test)]
mod tests;

pub use builder::*;
pub(crate) use dse::*;
pub use inst::*;
pub use interp::*;
pub(crate) use reach::*;
pub use sink::*;

// ------------------------------------------------------------------------------------------------
// BBId, Cfg
// ------------------------------------------------------------------------------------------------

/// Identifies a basic block within a `Function`. Block 0 is the entry.
pub type BBId = usize;

/// The control flow graph: nodes are block ids, edges are branches. Successor enumeration
/// order is edge insertion order.
pub type Cfg = DiGraphMap<BBId, ()>;

// ------------------------------------------------------------------------------------------------
// BasicBlock
// ------------------------------------------------------------------------------------------------

/// An ordered list of instructions. The instructions themselves live in the owning
/// `Function`'s arena; blocks only hold their ids.
pub struct BasicBlock {
	id:    BBId,
	insts: Vec<InstId>,
}

impl BasicBlock {
	pub(crate) fn new(id: BBId) -> Self {
		Self {
			id,
			insts: Vec::with_capacity(8),
		}
	}

	/// Its id.
	pub fn id(&self) -> BBId {
		self.id
	}

	/// Its instructions, in program order.
	pub fn insts(&self) -> &[InstId] {
		&self.insts
	}

	pub(crate) fn push(&mut self, inst: InstId) {
		self.insts.push(inst);
	}

	pub(crate) fn insert(&mut self, idx: usize, inst: InstId) {
		self.insts.insert(idx, inst);
	}

	pub(crate) fn remove(&mut self, inst: InstId) {
		if let Some(idx) = self.insts.iter().position(|&id| id == inst) {
			self.insts.remove(idx);
		}
	}
}

// ------------------------------------------------------------------------------------------------
// Function
// ------------------------------------------------------------------------------------------------

/// A function: an instruction arena, its basic blocks, and the CFG connecting them.
/// Exclusively owns all blocks and instructions; analyses hold only ids into it.
pub struct Function {
	name:    String,
	arena:   Arena<Inst>,
	bbs:     Vec<BasicBlock>,
	cfg:     Cfg,

	// stays valid across sinking, which never adds or removes Alloc instructions.
	allocas: LazyCell<Vec<VarId>>,
}

impl Function {
	pub(crate) fn new(name: String, arena: Arena<Inst>, bbs: Vec<BasicBlock>, cfg: Cfg) -> Self {
		Self {
			name,
			arena,
			bbs,
			cfg,
			allocas: LazyCell::new(),
		}
	}

	/// Its name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// How many basic blocks this function has.
	pub fn num_bbs(&self) -> usize {
		self.bbs.len()
	}

	/// How many live instructions this function has.
	pub fn num_insts(&self) -> usize {
		self.arena.len()
	}

	/// Get the basic block with the given id.
	pub fn bb(&self, id: BBId) -> &BasicBlock {
		&self.bbs[id]
	}

	/// Get the instruction with the given id. Panics on a stale id; the sinking pass
	/// never hands one out.
	pub fn inst(&self, id: InstId) -> &Inst {
		&self.arena[id.0]
	}

	/// The control flow graph.
	pub fn cfg(&self) -> &Cfg {
		&self.cfg
	}

	/// Iterator over the successors of `bb`, in edge insertion order.
	pub fn successors(&self, bb: BBId) -> impl Iterator<Item = BBId> + '_ {
		self.cfg.neighbors_directed(bb, Direction::Outgoing)
	}

	/// Iterator over the predecessors of `bb`.
	pub fn predecessors(&self, bb: BBId) -> impl Iterator<Item = BBId> + '_ {
		self.cfg.neighbors_directed(bb, Direction::Incoming)
	}

	/// All stack allocation sites in this function, in block order. Lazily computed
	/// on first use, then cached.
	pub fn allocation_sites(&self) -> &[VarId] {
		if !self.allocas.filled() {
			let mut sites = vec![];

			for bb in self.bbs.iter() {
				for &id in bb.insts() {
					if let InstKind::Alloc { var } = self.arena[id.0].kind() {
						sites.push(var);
					}
				}
			}

			self.allocas.fill(sites).unwrap();
		}

		self.allocas.borrow().unwrap()
	}

	/// The index of `bb`'s first insertion point: after any leading `Alloc` bookkeeping,
	/// before everything else.
	pub fn first_insertion_idx(&self, bb: BBId) -> usize {
		self.bbs[bb].insts().iter()
			.take_while(|&&id| matches!(self.arena[id.0].kind(), InstKind::Alloc { .. }))
			.count()
	}

	/// Inserts a structural copy of `inst` at `at`'s first insertion point. The copy keeps
	/// the original's operands, so the two compare syntactically identical.
	pub fn insert_clone(&mut self, inst: InstId, at: BBId) -> InstId {
		let kind = self.arena[inst.0].kind();
		let idx = self.first_insertion_idx(at);
		let new = InstId(self.arena.insert(Inst::new(at, kind)));
		self.bbs[at].insert(idx, new);
		new
	}

	/// Removes `inst` from its owning block and frees it. No other live ids are
	/// invalidated.
	pub fn erase(&mut self, inst: InstId) {
		if let Some(removed) = self.arena.remove(inst.0) {
			self.bbs[removed.bb()].remove(inst);
		}
	}

	/// Runs partial dead store elimination on this function: per variable, sinks
	/// partially dead stores to merge points, then removes block-local redundant
	/// stores. See `sink::sink_stores`.
	pub fn sink_partial_dead_stores(&mut self) -> SinkResult<SinkReport> {
		sink_stores(self)
	}
}

impl Debug for Function {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		writeln!(f, "-------------------------------------------------------")?;
		writeln!(f, "IR for '{}'", self.name)?;

		for bb in self.bbs.iter() {
			writeln!(f, "bb{}:", bb.id())?;

			for &id in bb.insts() {
				writeln!(f, "    {:?}", self.arena[id.0])?;
			}

			for target in self.successors(bb.id()) {
				writeln!(f, "    -> bb{}", target)?;
			}
		}

		Ok(())
	}
}
