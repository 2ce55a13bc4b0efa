//! Intermediate representation consumed by the analyses.
//!
//! A [`Program`] owns its [`Function`]s; everything else refers to functions by
//! [`FuncId`], to variables by [`VarId`] and to statements by the generation-checked
//! [`StmtId`]. Control transfers name their targets by handle, so inserting or removing a
//! statement only touches the function's layout and the statements that target it.
//!
//! Programs are put together with [`ProgramBuilder`]:
//!
//! ```rust
//! use midend::ir::{BinaryOp, Expr, Operand, ProgramBuilder, Type};
//!
//! let mut builder = ProgramBuilder::new();
//! let main = builder.declare("main", &[], Type::Int);
//! let add = builder.declare("add", &["x", "y"], Type::Int);
//!
//! let mut body = builder.body(main)?;
//! let a = body.local("a");
//! body.call(Some(a), add, vec![Operand::Const(2), Operand::Const(3)]);
//! body.ret(Some(a));
//! body.finish()?;
//!
//! let mut body = builder.body(add)?;
//! let (x, y) = (body.param(0), body.param(1));
//! body.ret_expr(Expr::binary(BinaryOp::Add, x, y));
//! body.finish()?;
//!
//! let program = builder.build()?;
//! assert_eq!(program.len(), 2);
//! # Ok::<(), midend::Error>(())
//! ```

use std::fmt;

use strum::{Display, EnumString};

mod builder;
mod function;
mod stmt;

pub use builder::{FunctionBuilder, Label, ProgramBuilder};
pub use function::{Function, Program};
pub use stmt::{BinaryOp, CallStmt, Expr, Operand, Stmt, StmtArena, StmtId, UnaryOp};

/// Index of a function within its [`Program`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuncId(u32);

impl FuncId {
    /// Wraps a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        FuncId(index as u32)
    }

    /// The raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FuncId({})", self.0)
    }
}

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Index of a variable within its [`Function`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(u32);

impl VarId {
    /// Wraps a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        VarId(index as u32)
    }

    /// The raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarId({})", self.0)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Value types of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Type {
    /// 64-bit signed integer
    Int,
    /// No value
    Void,
}

/// A named, typed variable slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Source or generated name
    pub name: String,
    /// Declared type
    pub ty: Type,
}
