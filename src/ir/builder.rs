
use generational_arena::{ Arena };

use super::*;

// ------------------------------------------------------------------------------------------------
// FuncBuilder
// ------------------------------------------------------------------------------------------------

/// Helper for building `Function`s out of blocks, edges, and instructions.
pub struct FuncBuilder {
	name:      String,
	arena:     Arena<Inst>,
	bbs:       Vec<BasicBlock>,
	cfg:       Cfg,
	next_var:  u32,
	next_temp: u32,
}

impl FuncBuilder {
	/// Constructor. The first block created becomes the entry.
	pub fn new(name: &str) -> Self {
		Self {
			name:      name.into(),
			arena:     Arena::new(),
			bbs:       vec![],
			cfg:       Cfg::new(),
			next_var:  0,
			next_temp: 0,
		}
	}

	/// Adds a new empty block and returns its id.
	pub fn block(&mut self) -> BBId {
		let id = self.bbs.len();
		self.bbs.push(BasicBlock::new(id));
		self.cfg.add_node(id);
		id
	}

	/// Adds a CFG edge. The order edges are added in is the order successors are
	/// enumerated in.
	pub fn edge(&mut self, from: BBId, to: BBId) {
		assert!(from < self.bbs.len() && to < self.bbs.len(), "edge between nonexistent blocks");
		self.cfg.add_edge(from, to, ());
	}

	/// Appends a stack allocation site to `bb` and returns its variable.
	pub fn alloc(&mut self, bb: BBId) -> VarId {
		let var = VarId(self.next_var);
		self.next_var += 1;
		self.inst(bb, InstKind::Alloc { var });
		var
	}

	/// A fresh opaque temporary, usable as a store operand.
	pub fn temp(&mut self) -> TempId {
		let t = TempId(self.next_temp);
		self.next_temp += 1;
		t
	}

	/// Appends a store of `src` to `var`.
	pub fn store(&mut self, bb: BBId, var: VarId, src: impl Into<Src>) -> InstId {
		self.inst(bb, InstKind::Store { var, src: src.into() })
	}

	/// Appends a load of `var`.
	pub fn load(&mut self, bb: BBId, var: VarId) -> InstId {
		self.inst(bb, InstKind::Load { var })
	}

	/// Appends an opaque instruction.
	pub fn other(&mut self, bb: BBId) -> InstId {
		self.inst(bb, InstKind::Other)
	}

	/// Finish building and get the function. Panics if no blocks were created.
	pub fn finish(self) -> Function {
		assert!(!self.bbs.is_empty(), "function has no entry block");
		Function::new(self.name, self.arena, self.bbs, self.cfg)
	}

	fn inst(&mut self, bb: BBId, kind: InstKind) -> InstId {
		let id = InstId(self.arena.insert(Inst::new(bb, kind)));
		self.bbs[bb].push(id);
		id
	}
}
