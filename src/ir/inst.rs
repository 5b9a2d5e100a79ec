
use std::fmt::{ Debug, Formatter, Result as FmtResult };

use generational_arena::{ Index };
use parse_display::Display;

use super::*;

// ------------------------------------------------------------------------------------------------
// VarId, TempId
// ------------------------------------------------------------------------------------------------

/// Identity of one stack allocation site within a function.
#[derive(Display, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[display("v{0}")]
pub struct VarId(pub u32);

impl Debug for VarId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "v{}", self.0)
	}
}

/// An opaque temporary: stands in for the defining instruction of a stored operand.
/// Two stores of the same temporary store the same value.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct TempId(pub u32);

impl Debug for TempId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "t{}", self.0)
	}
}

// ------------------------------------------------------------------------------------------------
// Src
// ------------------------------------------------------------------------------------------------

/// The operand of a store. This is a pure value type, so store identity is a structural
/// comparison that stays well-defined across clones.
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum Src {
	Const(u64),
	Temp(TempId),
}

impl Debug for Src {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Src::Const(c) => write!(f, "#0x{:02X}", c),
			Src::Temp(t)  => write!(f, "{:?}", t),
		}
	}
}

impl From<u64> for Src {
	fn from(c: u64) -> Self {
		Src::Const(c)
	}
}

impl From<TempId> for Src {
	fn from(t: TempId) -> Self {
		Src::Temp(t)
	}
}

// ------------------------------------------------------------------------------------------------
// InstId
// ------------------------------------------------------------------------------------------------

/// Newtype which uniquely identifies an `Inst` within its `Function`'s arena. Stays
/// stable across insertions and erasures of other instructions.
#[derive(PartialEq, Eq, Copy, Clone, Hash)]
pub struct InstId(pub Index);

impl Debug for InstId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let (index, generation) = self.0.into_raw_parts();
		write!(f, "InstId({}, {})", index, generation)
	}
}

// ------------------------------------------------------------------------------------------------
// InstKind
// ------------------------------------------------------------------------------------------------

/// Represents instructions. Anything that is not a stack allocation, a store to one, or a
/// load from one is `Other` - the pass only cares about store placement.
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum InstKind {
	Alloc { var: VarId },            // reserve a stack slot for var
	Store { var: VarId, src: Src },  // var = src
	Load  { var: VarId },            // read var
	Other,                           // anything else
}

impl Debug for InstKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		use InstKind::*;

		match self {
			Alloc { var }      => write!(f, "alloc     {:?}", var),
			Store { var, src } => write!(f, "store     {:?}, {:?}", var, src),
			Load  { var }      => write!(f, "load      {:?}", var),
			Other              => write!(f, "other"),
		}
	}
}

// ------------------------------------------------------------------------------------------------
// Inst
// ------------------------------------------------------------------------------------------------

/// An instruction: its kind plus the block it currently lives in.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Inst {
	bb:   BBId,
	kind: InstKind,
}

impl Debug for Inst {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{:?}", self.kind)
	}
}

impl Inst {
	pub(crate) fn new(bb: BBId, kind: InstKind) -> Self {
		Self { bb, kind }
	}

	/// The block this instruction belongs to.
	pub fn bb(&self) -> BBId {
		self.bb
	}

	/// What kind of instruction this is.
	pub fn kind(&self) -> InstKind {
		self.kind
	}

	/// Does this instruction write to the given variable?
	pub fn stores_to(&self, var: VarId) -> bool {
		matches!(self.kind, InstKind::Store { var: v, .. } if v == var)
	}

	/// Does this instruction read the given variable?
	pub fn loads_from(&self, var: VarId) -> bool {
		matches!(self.kind, InstKind::Load { var: v } if v == var)
	}

	/// Syntactic store identity: same target variable, same operand. `false` if either
	/// instruction is not a store. Never compares ids, so a clone is identical to its
	/// source.
	pub fn same_store(&self, other: &Inst) -> bool {
		match (self.kind, other.kind) {
			(InstKind::Store { var: v1, src: s1 }, InstKind::Store { var: v2, src: s2 }) =>
				v1 == v2 && s1 == s2,
			_ => false,
		}
	}
}
