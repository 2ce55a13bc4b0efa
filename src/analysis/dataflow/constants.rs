//! Constant propagation over the statement-level CFG.
//!
//! Values live in the three-level lattice
//!
//! ```text
//!              Undef            (⊤, no value seen yet)
//!        /   /   |   \   \
//!   ... -1   0   1   2  ...     (Const)
//!        \   \   |   /   /
//!             NonConst          (⊥, more than one value)
//! ```
//!
//! A [`ConstFact`] maps variables to values; a variable not in the map is `Undef`. The
//! top fact additionally marks its program point as not (yet) known to be reachable, and
//! statements at such points have no effect. Branch edges are narrowed: an edge that
//! cannot be taken under the current fact carries the top fact, and the `False` edge of
//! `branch v` knows `v == 0`.

use std::{collections::BTreeMap, fmt};

use crate::{
    analysis::{
        cfg::{CfgEdgeKind, CfgNode, ControlFlowGraph},
        dataflow::{
            framework::{AnalysisResults, DataFlowAnalysis, Direction},
            lattice::{Lattice, MeetSemiLattice},
            solver::DataFlowSolver,
        },
    },
    ir::{Expr, Function, Operand, Stmt, VarId},
};

/// Abstract value of a single variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConstValue {
    /// No value yet (⊤)
    #[default]
    Undef,
    /// Always this value
    Const(i64),
    /// Not a compile-time constant (⊥)
    NonConst,
}

impl ConstValue {
    /// The constant, if known.
    #[must_use]
    pub const fn as_const(self) -> Option<i64> {
        match self {
            ConstValue::Const(v) => Some(v),
            ConstValue::Undef | ConstValue::NonConst => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Undef => f.write_str("undef"),
            ConstValue::Const(v) => write!(f, "{v}"),
            ConstValue::NonConst => f.write_str("nonconst"),
        }
    }
}

impl MeetSemiLattice for ConstValue {
    fn meet(&self, other: &Self) -> Self {
        match (*self, *other) {
            (ConstValue::Undef, x) | (x, ConstValue::Undef) => x,
            (ConstValue::Const(a), ConstValue::Const(b)) if a == b => ConstValue::Const(a),
            _ => ConstValue::NonConst,
        }
    }
}

impl Lattice for ConstValue {
    fn top() -> Self {
        ConstValue::Undef
    }

    fn bottom() -> Self {
        ConstValue::NonConst
    }
}

/// Values of all variables at one program point. Absent variables are `Undef`.
///
/// The top fact ([`ConstFact::new`]) is unreachable and binds nothing. Facts built from
/// bindings, or via [`ConstFact::reachable`], are reachable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConstFact {
    reachable: bool,
    values: BTreeMap<VarId, ConstValue>,
}

impl ConstFact {
    /// The top fact: unreachable, every variable `Undef`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A reachable fact with every variable `Undef`.
    #[must_use]
    pub fn reachable() -> Self {
        ConstFact {
            reachable: true,
            values: BTreeMap::new(),
        }
    }

    /// Returns `true` unless this is the top fact of a point not known to execute.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// The value of `var`.
    #[must_use]
    pub fn get(&self, var: VarId) -> ConstValue {
        self.values.get(&var).copied().unwrap_or_default()
    }

    /// Binds `var` to `value`; binding `Undef` removes it.
    pub fn set(&mut self, var: VarId, value: ConstValue) {
        if value == ConstValue::Undef {
            self.values.remove(&var);
        } else {
            self.values.insert(var, value);
        }
    }

    /// Forgets everything known about `var`, making it `Undef`.
    pub fn remove(&mut self, var: VarId) -> ConstValue {
        self.values.remove(&var).unwrap_or_default()
    }

    /// Returns `true` if no variable has a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of variables with a value other than `Undef`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Variables with a value other than `Undef`, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, ConstValue)> + '_ {
        self.values.iter().map(|(&var, &value)| (var, value))
    }

    /// Variables bound to a known constant.
    pub fn constants(&self) -> impl Iterator<Item = (VarId, i64)> + '_ {
        self.iter()
            .filter_map(|(var, value)| value.as_const().map(|c| (var, c)))
    }
}

impl MeetSemiLattice for ConstFact {
    fn meet(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.meet_into(other);
        result
    }

    fn meet_into(&mut self, other: &Self) -> bool {
        if !other.reachable {
            return false;
        }
        if !self.reachable {
            *self = other.clone();
            return true;
        }
        let mut changed = false;
        for (&var, &value) in &other.values {
            let current = self.get(var);
            let merged = current.meet(&value);
            if merged != current {
                self.set(var, merged);
                changed = true;
            }
        }
        changed
    }
}

impl FromIterator<(VarId, ConstValue)> for ConstFact {
    fn from_iter<T: IntoIterator<Item = (VarId, ConstValue)>>(iter: T) -> Self {
        let mut fact = ConstFact::reachable();
        for (var, value) in iter {
            fact.set(var, value);
        }
        fact
    }
}

/// Abstract value of an operand under `fact`.
#[must_use]
pub fn eval_operand(fact: &ConstFact, operand: Operand) -> ConstValue {
    match operand {
        Operand::Var(var) => fact.get(var),
        Operand::Const(value) => ConstValue::Const(value),
    }
}

/// Abstract value of an expression under `fact`.
///
/// Any `NonConst` operand makes the result `NonConst`; otherwise any `Undef` operand makes
/// it `Undef`. Division by zero is `NonConst`.
#[must_use]
pub fn eval_expr(fact: &ConstFact, expr: &Expr) -> ConstValue {
    match *expr {
        Expr::Use(op) => eval_operand(fact, op),
        Expr::Unary(op, operand) => match eval_operand(fact, operand) {
            ConstValue::Const(v) => ConstValue::Const(op.eval(v)),
            other => other,
        },
        Expr::Binary(op, lhs, rhs) => {
            match (eval_operand(fact, lhs), eval_operand(fact, rhs)) {
                (ConstValue::NonConst, _) | (_, ConstValue::NonConst) => ConstValue::NonConst,
                (ConstValue::Undef, _) | (_, ConstValue::Undef) => ConstValue::Undef,
                (ConstValue::Const(a), ConstValue::Const(b)) => {
                    op.eval(a, b).map_or(ConstValue::NonConst, ConstValue::Const)
                }
            }
        }
    }
}

/// Intraprocedural constant propagation with branch narrowing.
///
/// Calls are opaque: a call's result is `NonConst`. Parameters are `NonConst` at entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantPropagation;

impl ConstantPropagation {
    /// Creates the analysis.
    #[must_use]
    pub fn new() -> Self {
        ConstantPropagation
    }

    /// Runs the analysis on one function.
    #[must_use]
    pub fn analyze(function: &Function, cfg: &ControlFlowGraph) -> AnalysisResults<ConstFact> {
        DataFlowSolver::new(ConstantPropagation).solve(function, cfg)
    }

    /// The effect of a non-call statement on `fact`. Calls are left to the caller.
    pub(crate) fn apply(stmt: &Stmt, fact: &mut ConstFact) {
        if let Stmt::Assign { dst, expr } = stmt {
            let value = eval_expr(fact, expr);
            fact.set(*dst, value);
        }
    }
}

impl DataFlowAnalysis for ConstantPropagation {
    type Fact = ConstFact;
    const DIRECTION: Direction = Direction::Forward;

    fn boundary(&self, function: &Function) -> ConstFact {
        function
            .params()
            .iter()
            .map(|&param| (param, ConstValue::NonConst))
            .collect()
    }

    fn initial(&self, _function: &Function) -> ConstFact {
        ConstFact::new()
    }

    fn transfer(&self, function: &Function, node: CfgNode, input: &ConstFact) -> ConstFact {
        let mut output = input.clone();
        if !input.is_reachable() {
            return output;
        }
        let Some(stmt) = node.stmt().and_then(|id| function.stmt(id)) else {
            return output;
        };
        match stmt {
            Stmt::Call(call) => {
                if let Some(dst) = call.dst {
                    output.set(dst, ConstValue::NonConst);
                }
            }
            other => Self::apply(other, &mut output),
        }
        output
    }

    fn transfer_edge(
        &self,
        function: &Function,
        source: CfgNode,
        _target: CfgNode,
        kind: CfgEdgeKind,
        fact: &ConstFact,
    ) -> ConstFact {
        if !kind.is_conditional() {
            return fact.clone();
        }
        let Some(Stmt::Branch { cond, .. }) = source.stmt().and_then(|id| function.stmt(id))
        else {
            return fact.clone();
        };

        let taken = kind == CfgEdgeKind::True;
        match eval_operand(fact, *cond) {
            ConstValue::Undef => ConstFact::new(),
            ConstValue::Const(c) if (c != 0) != taken => ConstFact::new(),
            _ => {
                let mut narrowed = fact.clone();
                if let (false, Operand::Var(var)) = (taken, cond) {
                    narrowed.set(*var, ConstValue::Const(0));
                }
                narrowed
            }
        }
    }
}
