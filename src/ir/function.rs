//! Functions and whole programs.

use std::{collections::HashMap, fmt};

use crate::{
    ir::{CallStmt, Expr, FuncId, Operand, Stmt, StmtArena, StmtId, Type, VarId, Variable},
    Result,
};

/// A function: signature, variable table and statements in layout order.
///
/// Functions are created through [`ProgramBuilder`](crate::ir::ProgramBuilder) and owned by
/// their [`Program`]; everything else refers to them by [`FuncId`].
#[derive(Debug, Clone)]
pub struct Function {
    id: FuncId,
    name: String,
    params: Vec<VarId>,
    return_type: Type,
    variables: Vec<Variable>,
    arena: StmtArena,
    layout: Vec<StmtId>,
}

impl Function {
    pub(crate) fn new(id: FuncId, name: &str, return_type: Type) -> Self {
        Function {
            id,
            name: name.to_string(),
            params: Vec::new(),
            return_type,
            variables: Vec::new(),
            arena: StmtArena::new(),
            layout: Vec::new(),
        }
    }

    pub(crate) fn add_variable(&mut self, name: &str, ty: Type) -> VarId {
        let id = VarId::new(self.variables.len());
        self.variables.push(Variable {
            name: name.to_string(),
            ty,
        });
        id
    }

    pub(crate) fn add_param(&mut self, name: &str, ty: Type) -> VarId {
        let id = self.add_variable(name, ty);
        self.params.push(id);
        id
    }

    /// Appends `stmt` to the end of the layout.
    pub(crate) fn push(&mut self, stmt: Stmt) -> StmtId {
        let id = self.arena.insert(stmt);
        self.layout.push(id);
        id
    }

    pub(crate) fn stmt_mut(&mut self, id: StmtId) -> Option<&mut Stmt> {
        self.arena.get_mut(id)
    }

    /// This function's id within its program.
    #[must_use]
    pub fn id(&self) -> FuncId {
        self.id
    }

    /// Source-level name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Formal parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[VarId] {
        &self.params
    }

    /// Declared return type.
    #[must_use]
    pub fn return_type(&self) -> Type {
        self.return_type
    }

    /// Number of variables (parameters, locals and temporaries).
    #[must_use]
    pub fn var_count(&self) -> usize {
        self.variables.len()
    }

    /// Metadata of `var`.
    #[must_use]
    pub fn variable(&self, var: VarId) -> Option<&Variable> {
        self.variables.get(var.index())
    }

    /// Name of `var`, or its raw id if it does not belong to this function.
    #[must_use]
    pub fn var_name(&self, var: VarId) -> String {
        self.variable(var)
            .map_or_else(|| var.to_string(), |v| v.name.clone())
    }

    /// Looks up a variable by name.
    #[must_use]
    pub fn var_by_name(&self, name: &str) -> Option<VarId> {
        self.variables
            .iter()
            .position(|v| v.name == name)
            .map(VarId::new)
    }

    /// The statement behind `id`; `None` for stale handles.
    #[must_use]
    pub fn stmt(&self, id: StmtId) -> Option<&Stmt> {
        self.arena.get(id)
    }

    /// Statement handles in program order.
    #[must_use]
    pub fn layout(&self) -> &[StmtId] {
        &self.layout
    }

    /// `(id, statement)` pairs in program order.
    pub fn statements(&self) -> impl Iterator<Item = (StmtId, &Stmt)> {
        self.layout
            .iter()
            .filter_map(|&id| self.arena.get(id).map(|stmt| (id, stmt)))
    }

    /// Call statements in program order.
    pub fn call_sites(&self) -> impl Iterator<Item = (StmtId, &CallStmt)> {
        self.statements()
            .filter_map(|(id, stmt)| stmt.as_call().map(|call| (id, call)))
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layout.len()
    }

    /// Returns `true` if the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    /// Position of `id` in the layout.
    #[must_use]
    pub fn position(&self, id: StmtId) -> Option<usize> {
        self.layout.iter().position(|&s| s == id)
    }

    /// Inserts `stmt` directly before `anchor` in the layout.
    ///
    /// Jumps to `anchor` keep targeting `anchor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`](crate::Error::Malformed) if `anchor` is stale.
    pub fn insert_before(&mut self, anchor: StmtId, stmt: Stmt) -> Result<StmtId> {
        let pos = self
            .position(anchor)
            .ok_or_else(|| malformed_error!("{} has no statement {}", self.name, anchor))?;
        let id = self.arena.insert(stmt);
        self.layout.insert(pos, id);
        Ok(id)
    }

    /// Removes `id` from the function.
    ///
    /// Branches and jumps that targeted the removed statement are redirected to its layout
    /// successor, and the handle `id` stops resolving.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`](crate::Error::Malformed) if `id` is stale, or if it is
    /// the last statement and still a jump target.
    pub fn remove_stmt(&mut self, id: StmtId) -> Result<Stmt> {
        let pos = self
            .position(id)
            .ok_or_else(|| malformed_error!("{} has no statement {}", self.name, id))?;
        let successor = self.layout.get(pos + 1).copied();

        let targeted = self
            .statements()
            .any(|(other, stmt)| other != id && stmt.target() == Some(id));
        if targeted {
            let Some(successor) = successor else {
                return Err(malformed_error!(
                    "cannot remove {} from {}: it is a jump target without successor",
                    id,
                    self.name
                ));
            };
            for &other in &self.layout {
                if let Some(stmt) = self.arena.get_mut(other) {
                    stmt.retarget(id, successor);
                }
            }
        }

        self.layout.remove(pos);
        self.arena
            .remove(id)
            .ok_or_else(|| malformed_error!("{} has no statement {}", self.name, id))
    }

    fn render_operand(&self, operand: Operand) -> String {
        match operand {
            Operand::Var(var) => self.var_name(var),
            Operand::Const(value) => value.to_string(),
        }
    }

    fn render_expr(&self, expr: &Expr) -> String {
        match *expr {
            Expr::Use(op) => self.render_operand(op),
            Expr::Unary(op, value) => format!("{op}{}", self.render_operand(value)),
            Expr::Binary(op, lhs, rhs) => format!(
                "{} {op} {}",
                self.render_operand(lhs),
                self.render_operand(rhs)
            ),
        }
    }

    /// Human-readable form of `stmt`, naming callees through `callee_name`.
    pub fn render_stmt(&self, stmt: &Stmt, callee_name: impl Fn(FuncId) -> String) -> String {
        match stmt {
            Stmt::Assign { dst, expr } => {
                format!("{} = {}", self.var_name(*dst), self.render_expr(expr))
            }
            Stmt::Call(call) => {
                let args: Vec<String> = call
                    .args
                    .iter()
                    .map(|&a| self.render_operand(a))
                    .collect();
                let callee = callee_name(call.callee);
                match call.dst {
                    Some(dst) => format!("{} = {callee}({})", self.var_name(dst), args.join(", ")),
                    None => format!("{callee}({})", args.join(", ")),
                }
            }
            Stmt::Branch { cond, target } => {
                format!("if {} goto {target}", self.render_operand(*cond))
            }
            Stmt::Jump { target } => format!("goto {target}"),
            Stmt::Return { value: Some(var) } => format!("return {}", self.var_name(*var)),
            Stmt::Return { value: None } => "return".to_string(),
            Stmt::Nop => "nop".to_string(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(|&p| self.var_name(p)).collect();
        writeln!(
            f,
            "{} {}({}) {{",
            self.return_type,
            self.name,
            params.join(", ")
        )?;
        for (id, stmt) in self.statements() {
            writeln!(f, "  {id}: {}", self.render_stmt(stmt, |c| c.to_string()))?;
        }
        writeln!(f, "}}")
    }
}

/// A whole program: every function, addressable by id and by name.
#[derive(Debug, Clone, Default)]
pub struct Program {
    functions: Vec<Function>,
    by_name: HashMap<String, FuncId>,
}

impl Program {
    pub(crate) fn from_functions(functions: Vec<Function>) -> Self {
        let by_name = functions
            .iter()
            .map(|f| (f.name.clone(), f.id))
            .collect();
        Program { functions, by_name }
    }

    /// The function with id `id`.
    #[must_use]
    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(id.index())
    }

    /// Mutable access for IR transformations. Graphs built earlier become stale.
    pub fn function_mut(&mut self, id: FuncId) -> Option<&mut Function> {
        self.functions.get_mut(id.index())
    }

    /// Looks up a function by name.
    #[must_use]
    pub fn function_by_name(&self, name: &str) -> Option<FuncId> {
        self.by_name.get(name).copied()
    }

    /// Name of `id`, or its raw id if unknown.
    #[must_use]
    pub fn function_name(&self, id: FuncId) -> String {
        self.function(id)
            .map_or_else(|| id.to_string(), |f| f.name.clone())
    }

    /// All functions in id order.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    /// All function ids in order.
    pub fn function_ids(&self) -> impl Iterator<Item = FuncId> + '_ {
        self.functions.iter().map(|f| f.id)
    }

    /// Number of functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns `true` if the program has no functions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Human-readable form of statement `stmt` in `func`, with callee names resolved.
    #[must_use]
    pub fn render_stmt(&self, func: FuncId, stmt: StmtId) -> String {
        let Some(function) = self.function(func) else {
            return format!("{func}:{stmt}");
        };
        match function.stmt(stmt) {
            Some(s) => function.render_stmt(s, |callee| self.function_name(callee)),
            None => format!("<stale {stmt}>"),
        }
    }

    /// Checks cross-function consistency: unique names, known callees, matching arity and
    /// jump targets that resolve inside their function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`](crate::Error::Malformed) describing the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.by_name.len() != self.functions.len() {
            return Err(malformed_error!("function names are not unique"));
        }

        for function in &self.functions {
            for (id, stmt) in function.statements() {
                if let Some(target) = stmt.target() {
                    if function.position(target).is_none() {
                        return Err(malformed_error!(
                            "{}: {} jumps to unknown statement {}",
                            function.name,
                            id,
                            target
                        ));
                    }
                }
                if let Some(call) = stmt.as_call() {
                    let Some(callee) = self.function(call.callee) else {
                        return Err(malformed_error!(
                            "{}: {} calls unknown function {}",
                            function.name,
                            id,
                            call.callee
                        ));
                    };
                    if callee.params.len() != call.args.len() {
                        return Err(malformed_error!(
                            "{}: {} passes {} arguments to {}, which takes {}",
                            function.name,
                            id,
                            call.args.len(),
                            callee.name,
                            callee.params.len()
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for function in &self.functions {
            write!(f, "{function}")?;
        }
        Ok(())
    }
}
