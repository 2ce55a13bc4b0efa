//! Incremental construction of programs with forward references.

use std::collections::HashSet;

use crate::{
    ir::{CallStmt, Expr, FuncId, Function, Operand, Program, Stmt, StmtId, Type, VarId},
    Error, Result,
};

/// A forward-referenceable jump destination inside one [`FunctionBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(usize);

/// Builds a [`Program`].
///
/// Functions are declared first (so calls can refer to functions whose bodies come later)
/// and then filled in through [`body`](Self::body).
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    functions: Vec<Function>,
}

impl ProgramBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a function with `int` parameters named `params`.
    pub fn declare(&mut self, name: &str, params: &[&str], return_type: Type) -> FuncId {
        let id = FuncId::new(self.functions.len());
        let mut function = Function::new(id, name, return_type);
        for param in params {
            function.add_param(param, Type::Int);
        }
        self.functions.push(function);
        id
    }

    /// Opens the body of a declared function for appending statements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFunction`] if `id` was not declared by this builder.
    pub fn body(&mut self, id: FuncId) -> Result<FunctionBuilder<'_>> {
        let function = self
            .functions
            .get_mut(id.index())
            .ok_or_else(|| Error::UnknownFunction(id.to_string()))?;
        Ok(FunctionBuilder {
            function,
            labels: Vec::new(),
            patches: Vec::new(),
            temps: 0,
            errors: Vec::new(),
        })
    }

    /// Finishes the program and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for duplicate names, calls to unknown functions, arity
    /// mismatches or dangling jump targets.
    pub fn build(self) -> Result<Program> {
        let mut seen = HashSet::new();
        for function in &self.functions {
            if !seen.insert(function.name()) {
                return Err(malformed_error!(
                    "function '{}' is declared twice",
                    function.name()
                ));
            }
        }

        let program = Program::from_functions(self.functions);
        program.validate()?;
        Ok(program)
    }
}

/// Appends statements to one function body.
///
/// Branch and jump targets are given as [`Label`]s and resolved by
/// [`finish`](Self::finish), which must be called once the body is complete.
#[derive(Debug)]
pub struct FunctionBuilder<'a> {
    function: &'a mut Function,
    // layout position each label is bound to
    labels: Vec<Option<usize>>,
    patches: Vec<(StmtId, Label)>,
    temps: usize,
    errors: Vec<String>,
}

impl FunctionBuilder<'_> {
    /// The `index`-th formal parameter.
    ///
    /// # Panics
    ///
    /// Panics if the function has fewer than `index + 1` parameters.
    #[must_use]
    pub fn param(&self, index: usize) -> VarId {
        self.function.params()[index]
    }

    /// Adds an `int` local.
    pub fn local(&mut self, name: &str) -> VarId {
        self.function.add_variable(name, Type::Int)
    }

    /// Adds a fresh compiler temporary (`t0`, `t1`, ...).
    pub fn temp(&mut self) -> VarId {
        let name = format!("t{}", self.temps);
        self.temps += 1;
        self.function.add_variable(&name, Type::Int)
    }

    /// `dst = expr`
    pub fn assign(&mut self, dst: VarId, expr: impl Into<Expr>) -> StmtId {
        self.function.push(Stmt::Assign {
            dst,
            expr: expr.into(),
        })
    }

    /// `dst = callee(args...)`
    pub fn call(&mut self, dst: Option<VarId>, callee: FuncId, args: Vec<Operand>) -> StmtId {
        self.function
            .push(Stmt::Call(CallStmt { dst, callee, args }))
    }

    /// `if cond != 0 goto label`
    pub fn branch(&mut self, cond: impl Into<Operand>, label: Label) -> StmtId {
        let id = self.function.push(Stmt::Nop);
        if let Some(stmt) = self.function.stmt_mut(id) {
            *stmt = Stmt::Branch {
                cond: cond.into(),
                target: id,
            };
        }
        self.patches.push((id, label));
        id
    }

    /// `goto label`
    pub fn jump(&mut self, label: Label) -> StmtId {
        let id = self.function.push(Stmt::Nop);
        if let Some(stmt) = self.function.stmt_mut(id) {
            *stmt = Stmt::Jump { target: id };
        }
        self.patches.push((id, label));
        id
    }

    /// `return value`
    pub fn ret(&mut self, value: Option<VarId>) -> StmtId {
        self.function.push(Stmt::Return { value })
    }

    /// Lowers `return expr` into `t = expr; return t` and returns the `return` statement.
    pub fn ret_expr(&mut self, expr: impl Into<Expr>) -> StmtId {
        let temp = self.temp();
        self.assign(temp, expr);
        self.ret(Some(temp))
    }

    /// `nop`
    pub fn nop(&mut self) -> StmtId {
        self.function.push(Stmt::Nop)
    }

    /// Creates an unbound label.
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Binds `label` to the next statement appended.
    pub fn bind(&mut self, label: Label) {
        let position = self.function.len();
        match self.labels.get_mut(label.0) {
            Some(slot) if slot.is_none() => *slot = Some(position),
            Some(_) => self.errors.push(format!("label {} bound twice", label.0)),
            None => self.errors.push(format!("label {} is foreign", label.0)),
        }
    }

    /// Resolves labels. A label bound after the last statement gets a trailing `nop`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for labels that are unbound, bound twice or foreign.
    pub fn finish(mut self) -> Result<()> {
        if let Some(message) = self.errors.first() {
            return Err(malformed_error!("{}: {}", self.function.name(), message));
        }

        let needs_tail = self
            .labels
            .iter()
            .any(|&pos| pos == Some(self.function.len()));
        if needs_tail {
            self.function.push(Stmt::Nop);
        }

        let patches = std::mem::take(&mut self.patches);
        for (id, label) in patches {
            let Some(position) = self.labels.get(label.0).copied().flatten() else {
                return Err(malformed_error!(
                    "{}: label {} is never bound",
                    self.function.name(),
                    label.0
                ));
            };
            let target = self.function.layout()[position];
            if let Some(stmt) = self.function.stmt_mut(id) {
                stmt.retarget(id, target);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BinaryOp;

    #[test]
    fn test_labels_resolve_forward_and_backward() {
        let mut builder = ProgramBuilder::new();
        let main = builder.declare("main", &["n"], Type::Int);
        let mut body = builder.body(main).unwrap();
        let n = body.param(0);
        let head = body.new_label();
        let done = body.new_label();
        body.bind(head);
        let test = body.branch(n, done);
        let dec = body.assign(n, Expr::binary(BinaryOp::Sub, n, 1));
        let back = body.jump(head);
        body.bind(done);
        let ret = body.ret(Some(n));
        body.finish().unwrap();

        let program = builder.build().unwrap();
        let function = program.function(main).unwrap();
        assert_eq!(function.layout(), &[test, dec, back, ret]);
        assert_eq!(function.stmt(test).unwrap().target(), Some(ret));
        assert_eq!(function.stmt(back).unwrap().target(), Some(test));
    }

    #[test]
    fn test_label_at_end_gets_nop() {
        let mut builder = ProgramBuilder::new();
        let f = builder.declare("f", &[], Type::Void);
        let mut body = builder.body(f).unwrap();
        let end = body.new_label();
        let jump = body.jump(end);
        body.bind(end);
        body.finish().unwrap();

        let program = builder.build().unwrap();
        let function = program.function(f).unwrap();
        assert_eq!(function.len(), 2);
        let tail = function.layout()[1];
        assert_eq!(function.stmt(tail), Some(&Stmt::Nop));
        assert_eq!(function.stmt(jump).unwrap().target(), Some(tail));
    }

    #[test]
    fn test_unbound_label_is_malformed() {
        let mut builder = ProgramBuilder::new();
        let f = builder.declare("f", &[], Type::Void);
        let mut body = builder.body(f).unwrap();
        let nowhere = body.new_label();
        body.jump(nowhere);
        assert!(matches!(body.finish(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_arity_mismatch_is_rejected() {
        let mut builder = ProgramBuilder::new();
        let main = builder.declare("main", &[], Type::Int);
        let add = builder.declare("add", &["x", "y"], Type::Int);
        let mut body = builder.body(main).unwrap();
        body.call(None, add, vec![Operand::Const(1)]);
        body.ret(None);
        body.finish().unwrap();

        assert!(matches!(builder.build(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut builder = ProgramBuilder::new();
        builder.declare("f", &[], Type::Void);
        builder.declare("f", &[], Type::Void);
        assert!(matches!(builder.build(), Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_ret_expr_lowers_through_temporary() {
        let mut builder = ProgramBuilder::new();
        let add = builder.declare("add", &["x", "y"], Type::Int);
        let mut body = builder.body(add).unwrap();
        let (x, y) = (body.param(0), body.param(1));
        let ret = body.ret_expr(Expr::binary(BinaryOp::Add, x, y));
        body.finish().unwrap();

        let program = builder.build().unwrap();
        let function = program.function(add).unwrap();
        let temp = function.var_by_name("t0").unwrap();
        assert_eq!(function.stmt(ret), Some(&Stmt::Return { value: Some(temp) }));
        assert_eq!(function.to_string().lines().nth(1), Some("  s0: t0 = x + y"));
    }

    #[test]
    fn test_remove_stmt_retargets_jumps() {
        let mut builder = ProgramBuilder::new();
        let f = builder.declare("f", &["c"], Type::Int);
        let mut body = builder.body(f).unwrap();
        let c = body.param(0);
        let skip = body.new_label();
        let branch = body.branch(c, skip);
        body.assign(c, 1);
        body.bind(skip);
        let nop = body.nop();
        let ret = body.ret(Some(c));
        body.finish().unwrap();

        let mut program = builder.build().unwrap();
        let function = program.function_mut(f).unwrap();
        assert_eq!(function.remove_stmt(nop).unwrap(), Stmt::Nop);
        assert_eq!(function.stmt(branch).unwrap().target(), Some(ret));
        assert!(function.stmt(nop).is_none());
        assert!(function.remove_stmt(nop).is_err());

        let inserted = function.insert_before(ret, Stmt::Nop).unwrap();
        assert_eq!(function.position(inserted), Some(2));
        assert_ne!(inserted, nop);
        program.validate().unwrap();
    }
}
