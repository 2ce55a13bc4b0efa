//! Statements, expressions and the generation-checked statement arena.

use std::fmt;

use strum::Display;

use crate::ir::{FuncId, VarId};

/// Stable handle to a statement inside one [`Function`](crate::ir::Function).
///
/// Handles are `(slot, generation)` pairs: removing a statement bumps its slot's
/// generation, so a handle kept across the removal no longer resolves instead of
/// silently pointing at whatever reuses the slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StmtId {
    index: u32,
    generation: u32,
}

impl StmtId {
    /// Slot index inside the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this handle was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StmtId({}#{})", self.index, self.generation)
    }
}

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "s{}", self.index)
        } else {
            write!(f, "s{}#{}", self.index, self.generation)
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    stmt: Option<Stmt>,
}

/// Slot storage for statements, addressed by [`StmtId`].
///
/// Freed slots are reused with a bumped generation.
#[derive(Debug, Clone, Default)]
pub struct StmtArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl StmtArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `stmt` and returns its handle.
    pub fn insert(&mut self, stmt: Stmt) -> StmtId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.stmt = Some(stmt);
            return StmtId {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            stmt: Some(stmt),
        });
        StmtId {
            index,
            generation: 0,
        }
    }

    fn slot(&self, id: StmtId) -> Option<&Slot> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
    }

    /// The statement behind `id`, or `None` if the handle is stale or foreign.
    #[must_use]
    pub fn get(&self, id: StmtId) -> Option<&Stmt> {
        self.slot(id).and_then(|slot| slot.stmt.as_ref())
    }

    /// Mutable access to the statement behind `id`.
    pub fn get_mut(&mut self, id: StmtId) -> Option<&mut Stmt> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.stmt.as_mut())
    }

    /// Returns `true` if `id` resolves to a live statement.
    #[must_use]
    pub fn contains(&self, id: StmtId) -> bool {
        self.get(id).is_some()
    }

    /// Removes the statement behind `id`, invalidating every copy of the handle.
    pub fn remove(&mut self, id: StmtId) -> Option<Stmt> {
        let slot = self
            .slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)?;
        let stmt = slot.stmt.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(stmt)
    }

    /// Number of live statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no statement is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A value read by an expression: a variable or an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Current value of a variable
    Var(VarId),
    /// Integer literal
    Const(i64),
}

impl Operand {
    /// The variable read by this operand, if any.
    #[must_use]
    pub fn as_var(self) -> Option<VarId> {
        match self {
            Operand::Var(var) => Some(var),
            Operand::Const(_) => None,
        }
    }
}

impl From<VarId> for Operand {
    fn from(var: VarId) -> Self {
        Operand::Var(var)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Const(value)
    }
}

/// Binary operators over `i64`. Comparisons and logical operators produce `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BinaryOp {
    /// Wrapping addition
    #[strum(to_string = "+")]
    Add,
    /// Wrapping subtraction
    #[strum(to_string = "-")]
    Sub,
    /// Wrapping multiplication
    #[strum(to_string = "*")]
    Mul,
    /// Wrapping division
    #[strum(to_string = "/")]
    Div,
    /// Wrapping remainder
    #[strum(to_string = "%")]
    Rem,
    /// Equality
    #[strum(to_string = "==")]
    Eq,
    /// Inequality
    #[strum(to_string = "!=")]
    Ne,
    /// Less than
    #[strum(to_string = "<")]
    Lt,
    /// Less than or equal
    #[strum(to_string = "<=")]
    Le,
    /// Greater than
    #[strum(to_string = ">")]
    Gt,
    /// Greater than or equal
    #[strum(to_string = ">=")]
    Ge,
    /// Logical and
    #[strum(to_string = "&&")]
    And,
    /// Logical or
    #[strum(to_string = "||")]
    Or,
}

impl BinaryOp {
    /// Evaluates the operator. Arithmetic wraps; division or remainder by zero has no value.
    #[must_use]
    pub fn eval(self, lhs: i64, rhs: i64) -> Option<i64> {
        let value = match self {
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
            BinaryOp::Div => {
                if rhs == 0 {
                    return None;
                }
                lhs.wrapping_div(rhs)
            }
            BinaryOp::Rem => {
                if rhs == 0 {
                    return None;
                }
                lhs.wrapping_rem(rhs)
            }
            BinaryOp::Eq => i64::from(lhs == rhs),
            BinaryOp::Ne => i64::from(lhs != rhs),
            BinaryOp::Lt => i64::from(lhs < rhs),
            BinaryOp::Le => i64::from(lhs <= rhs),
            BinaryOp::Gt => i64::from(lhs > rhs),
            BinaryOp::Ge => i64::from(lhs >= rhs),
            BinaryOp::And => i64::from(lhs != 0 && rhs != 0),
            BinaryOp::Or => i64::from(lhs != 0 || rhs != 0),
        };
        Some(value)
    }
}

/// Unary operators over `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UnaryOp {
    /// Wrapping negation
    #[strum(to_string = "-")]
    Neg,
    /// Logical not
    #[strum(to_string = "!")]
    Not,
}

impl UnaryOp {
    /// Evaluates the operator.
    #[must_use]
    pub fn eval(self, value: i64) -> i64 {
        match self {
            UnaryOp::Neg => value.wrapping_neg(),
            UnaryOp::Not => i64::from(value == 0),
        }
    }
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Copy of an operand
    Use(Operand),
    /// `op operand`
    Unary(UnaryOp, Operand),
    /// `lhs op rhs`
    Binary(BinaryOp, Operand, Operand),
}

impl Expr {
    /// Shorthand for `Expr::Binary`.
    pub fn binary(op: BinaryOp, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Expr::Binary(op, lhs.into(), rhs.into())
    }

    /// Variables read by the expression, left to right.
    pub fn vars(&self) -> impl Iterator<Item = VarId> {
        let (a, b) = match *self {
            Expr::Use(op) | Expr::Unary(_, op) => (op.as_var(), None),
            Expr::Binary(_, lhs, rhs) => (lhs.as_var(), rhs.as_var()),
        };
        a.into_iter().chain(b)
    }
}

impl From<Operand> for Expr {
    fn from(operand: Operand) -> Self {
        Expr::Use(operand)
    }
}

impl From<VarId> for Expr {
    fn from(var: VarId) -> Self {
        Expr::Use(Operand::Var(var))
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::Use(Operand::Const(value))
    }
}

/// A direct call `dst = callee(args...)`.
///
/// The callee is always statically known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallStmt {
    /// Variable receiving the result, if the value is used
    pub dst: Option<VarId>,
    /// The called function
    pub callee: FuncId,
    /// Actual arguments in parameter order
    pub args: Vec<Operand>,
}

/// One IR statement.
///
/// Control transfers name their target by [`StmtId`]; a statement that is neither a
/// `Jump` nor a `Return` falls through to its layout successor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    /// `dst = expr`
    Assign {
        /// Assigned variable
        dst: VarId,
        /// Computed value
        expr: Expr,
    },
    /// A function call
    Call(CallStmt),
    /// `if cond != 0 goto target`, otherwise fall through
    Branch {
        /// Tested value
        cond: Operand,
        /// Taken target
        target: StmtId,
    },
    /// `goto target`
    Jump {
        /// Jump target
        target: StmtId,
    },
    /// `return value`
    Return {
        /// Returned variable, `None` for `return;`
        value: Option<VarId>,
    },
    /// No operation; also used as a label anchor
    Nop,
}

impl Stmt {
    /// The variable written by this statement.
    #[must_use]
    pub fn def(&self) -> Option<VarId> {
        match self {
            Stmt::Assign { dst, .. } => Some(*dst),
            Stmt::Call(call) => call.dst,
            Stmt::Branch { .. } | Stmt::Jump { .. } | Stmt::Return { .. } | Stmt::Nop => None,
        }
    }

    /// Variables read by this statement.
    #[must_use]
    pub fn uses(&self) -> Vec<VarId> {
        match self {
            Stmt::Assign { expr, .. } => expr.vars().collect(),
            Stmt::Call(call) => call.args.iter().filter_map(|a| a.as_var()).collect(),
            Stmt::Branch { cond, .. } => cond.as_var().into_iter().collect(),
            Stmt::Return { value } => value.iter().copied().collect(),
            Stmt::Jump { .. } | Stmt::Nop => Vec::new(),
        }
    }

    /// The call payload, if this is a call.
    #[must_use]
    pub fn as_call(&self) -> Option<&CallStmt> {
        match self {
            Stmt::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Returns `true` for call statements.
    #[must_use]
    pub fn is_call(&self) -> bool {
        matches!(self, Stmt::Call(_))
    }

    /// The explicit control-transfer target of a branch or jump.
    #[must_use]
    pub fn target(&self) -> Option<StmtId> {
        match self {
            Stmt::Branch { target, .. } | Stmt::Jump { target } => Some(*target),
            _ => None,
        }
    }

    /// Returns `true` if control can continue to the layout successor.
    #[must_use]
    pub fn falls_through(&self) -> bool {
        !matches!(self, Stmt::Jump { .. } | Stmt::Return { .. })
    }

    /// Redirects a branch or jump aimed at `from` to `to`. Returns `true` if retargeted.
    pub fn retarget(&mut self, from: StmtId, to: StmtId) -> bool {
        match self {
            Stmt::Branch { target, .. } | Stmt::Jump { target } if *target == from => {
                *target = to;
                true
            }
            _ => false,
        }
    }
}
