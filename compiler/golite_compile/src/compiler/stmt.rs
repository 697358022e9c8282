//! Statement lowering and control flow.

use golite_ir::ast::{Block, CaseClause, Expr, ExprKind, GenDecl, Stmt, StmtKind, ValueSpec};
use golite_ir::{BinaryOp, Name, Span};
use smallvec::SmallVec;

use super::{operand, BreakTarget, Compiler, TargetKind};
use crate::{CompileError, CompileErrorKind, Op, Unsupported};

impl Compiler<'_> {
    pub(super) fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        golite_stack::ensure_sufficient_stack(|| self.compile_stmt_inner(stmt, None))
    }

    fn compile_stmt_inner(
        &mut self,
        stmt: &Stmt,
        label: Option<Name>,
    ) -> Result<(), CompileError> {
        self.set_span(stmt.span);
        match &stmt.kind {
            StmtKind::Decl(GenDecl::Var(specs)) => {
                for spec in specs {
                    self.compile_value_spec(spec)?;
                }
            }
            StmtKind::Decl(GenDecl::Const(specs)) => {
                for spec in specs {
                    self.current.iota = Some(spec.iota);
                    let result = self.compile_value_spec(spec);
                    self.current.iota = None;
                    result?;
                }
            }
            StmtKind::Decl(GenDecl::Type(specs)) => {
                for spec in specs {
                    self.compile_type_spec(spec)?;
                }
            }
            StmtKind::Expr(expr) => {
                self.compile_expr(expr)?;
                self.emit(Op::Pop);
            }
            StmtKind::IncDec(target, inc) => self.compile_incdec(target, *inc)?,
            StmtKind::Assign { lhs, op, rhs } => {
                self.compile_assign(lhs, *op, rhs, stmt.span)?;
            }
            StmtKind::Defer(call) => {
                let ExprKind::Call { func, args, spread } = &call.kind else {
                    let kind = CompileErrorKind::DeferNotCall;
                    return Err(CompileError::new(kind, call.span));
                };
                self.compile_call_parts(func, args)?;
                self.set_span(stmt.span);
                self.emit(Op::Defer {
                    argc: operand(args.len()),
                    spread: *spread,
                });
            }
            StmtKind::Return(values) => self.compile_return(values, stmt.span)?,
            StmtKind::Break(label) => self.compile_break(*label, stmt.span)?,
            StmtKind::Continue(label) => self.compile_continue(*label, stmt.span)?,
            StmtKind::Block(block) => self.compile_block(&block.stmts)?,
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => self.compile_if(init.as_deref(), cond, then, els.as_deref())?,
            StmtKind::Switch { init, tag, clauses } => {
                self.compile_switch(label, init.as_deref(), tag.as_ref(), clauses)?;
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                let (init, post) = (init.as_deref(), post.as_deref());
                self.compile_for(label, init, cond.as_ref(), post, body)?;
            }
            StmtKind::Range {
                key,
                value,
                define,
                expr,
                body,
            } => {
                let (key, value) = (key.as_ref(), value.as_ref());
                self.compile_range(label, key, value, *define, expr, body)?;
            }
            StmtKind::Labeled(label, inner) => {
                self.compile_stmt_inner(inner, Some(*label))?;
            }
            StmtKind::Empty => {}
            StmtKind::Go(_) => {
                return Err(CompileError::unsupported(Unsupported::Goroutines, stmt.span));
            }
            StmtKind::Select => {
                return Err(CompileError::unsupported(Unsupported::Select, stmt.span));
            }
            StmtKind::Send(..) => {
                return Err(CompileError::unsupported(Unsupported::ChannelSend, stmt.span));
            }
            StmtKind::TypeSwitch => {
                return Err(CompileError::unsupported(Unsupported::TypeSwitch, stmt.span));
            }
            StmtKind::Fallthrough => {
                return Err(CompileError::unsupported(Unsupported::Fallthrough, stmt.span));
            }
            StmtKind::Goto(_) => {
                return Err(CompileError::unsupported(Unsupported::Goto, stmt.span));
            }
        }
        Ok(())
    }

    /// `var`/`const` spec: values are evaluated before any name is bound.
    fn compile_value_spec(&mut self, spec: &ValueSpec) -> Result<(), CompileError> {
        self.set_span(spec.span);
        if spec.values.is_empty() {
            let Some(ty) = &spec.ty else {
                return Err(CompileError::new(
                    CompileErrorKind::CountMismatch {
                        vars: spec.names.len(),
                        values: 0,
                    },
                    spec.span,
                ));
            };
            for &name in &spec.names {
                self.compile_type(ty)?;
                self.emit(Op::Zero);
                self.bind_new(name);
            }
            return Ok(());
        }

        self.compile_values(&spec.values, spec.names.len(), spec.span)?;
        for &name in spec.names.iter().rev() {
            if let Some(ty) = &spec.ty {
                self.compile_type(ty)?;
                self.set_span(spec.span);
                self.emit(Op::Coerce);
            }
            self.bind_new(name);
        }
        Ok(())
    }

    /// Bind the value on top of the stack to a fresh variable.
    fn bind_new(&mut self, name: Name) {
        if name == self.known.blank {
            self.emit(Op::Pop);
        } else {
            self.declare(name);
            self.emit(Op::Define(name));
        }
    }

    fn compile_block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        self.push_scope();
        for stmt in stmts {
            self.compile_stmt(stmt)?;
        }
        self.pop_scope();
        Ok(())
    }

    fn compile_return(&mut self, values: &[Expr], span: Span) -> Result<(), CompileError> {
        let func = &self.current.func;
        if let Some(want) = func.result_count {
            let have = values.len();
            let bare_named = have == 0 && !func.named_results.is_empty();
            let single_call = have == 1 && matches!(values[0].kind, ExprKind::Call { .. });
            if have != want && !bare_named && !single_call {
                return Err(CompileError::new(
                    CompileErrorKind::ReturnCount { have, want },
                    span,
                ));
            }
        }
        for value in values {
            self.compile_expr(value)?;
        }
        self.set_span(span);
        self.emit(Op::Return(operand(values.len())));
        Ok(())
    }

    /// Discard the scopes and iterators opened since `target` was entered.
    fn unwind_to(&mut self, depth: usize, iters: usize) {
        for _ in depth..self.current.depth {
            self.emit(Op::PopScope);
        }
        for _ in iters..self.current.iters {
            self.emit(Op::IterEnd);
        }
    }

    fn compile_break(&mut self, label: Option<Name>, span: Span) -> Result<(), CompileError> {
        let index = match label {
            Some(label) => self.find_labeled(label, "break", span)?,
            None => self
                .current
                .targets
                .len()
                .checked_sub(1)
                .ok_or_else(|| CompileError::new(CompileErrorKind::BreakOutsideLoop, span))?,
        };
        let (depth, iters) = {
            let target = &self.current.targets[index];
            (target.depth, target.iters)
        };
        self.set_span(span);
        self.unwind_to(depth, iters);
        let jump = self.emit(Op::Jump(0));
        self.current.targets[index].breaks.push(jump);
        Ok(())
    }

    fn compile_continue(&mut self, label: Option<Name>, span: Span) -> Result<(), CompileError> {
        let index = match label {
            Some(label) => {
                let index = self.find_labeled(label, "continue", span)?;
                if self.current.targets[index].kind != TargetKind::Loop {
                    return Err(CompileError::new(
                        CompileErrorKind::InvalidLabel {
                            stmt: "continue",
                            label: self.name_str(label).to_owned(),
                        },
                        span,
                    ));
                }
                index
            }
            None => self
                .current
                .targets
                .iter()
                .rposition(|t| t.kind == TargetKind::Loop)
                .ok_or_else(|| CompileError::new(CompileErrorKind::ContinueOutsideLoop, span))?,
        };
        let (depth, iters) = {
            let target = &self.current.targets[index];
            (target.depth, target.iters)
        };
        self.set_span(span);
        self.unwind_to(depth, iters);
        let jump = self.emit(Op::Jump(0));
        self.current.targets[index].continues.push(jump);
        Ok(())
    }

    fn find_labeled(
        &self,
        label: Name,
        stmt: &'static str,
        span: Span,
    ) -> Result<usize, CompileError> {
        self.current
            .targets
            .iter()
            .rposition(|t| t.label == Some(label))
            .ok_or_else(|| {
                CompileError::new(
                    CompileErrorKind::InvalidLabel {
                        stmt,
                        label: self.name_str(label).to_owned(),
                    },
                    span,
                )
            })
    }

    fn open_target(&mut self, label: Option<Name>, kind: TargetKind) {
        self.current.targets.push(BreakTarget {
            label,
            kind,
            depth: self.current.depth,
            iters: self.current.iters,
            breaks: SmallVec::new(),
            continues: SmallVec::new(),
        });
    }

    fn close_target(&mut self) -> Option<BreakTarget> {
        self.current.targets.pop()
    }

    fn compile_if(
        &mut self,
        init: Option<&Stmt>,
        cond: &Expr,
        then: &Block,
        els: Option<&Stmt>,
    ) -> Result<(), CompileError> {
        if let Some(init) = init {
            self.push_scope();
            self.compile_stmt(init)?;
        }
        self.compile_expr(cond)?;
        let to_else = self.emit(Op::JumpIfFalse(0));
        self.compile_block(&then.stmts)?;
        match els {
            Some(els) => {
                let to_end = self.emit(Op::Jump(0));
                self.patch(to_else);
                self.compile_stmt(els)?;
                self.patch(to_end);
            }
            None => self.patch(to_else),
        }
        if init.is_some() {
            self.pop_scope();
        }
        Ok(())
    }

    /// Three-clause, condition-only and infinite loops. The loop variable
    /// is shared by all iterations.
    fn compile_for(
        &mut self,
        label: Option<Name>,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        post: Option<&Stmt>,
        body: &Block,
    ) -> Result<(), CompileError> {
        self.push_scope();
        if let Some(init) = init {
            self.compile_stmt(init)?;
        }
        let top = self.here();
        let exit = match cond {
            Some(cond) => {
                self.compile_expr(cond)?;
                Some(self.emit(Op::JumpIfFalse(0)))
            }
            None => None,
        };

        self.open_target(label, TargetKind::Loop);
        let result = self.compile_block(&body.stmts);
        let target = self.close_target();
        result?;

        if let Some(target) = &target {
            for &jump in &target.continues {
                self.patch(jump);
            }
        }
        if let Some(post) = post {
            self.compile_stmt(post)?;
        }
        self.set_span(body.span);
        self.emit(Op::Jump(top));

        if let Some(exit) = exit {
            self.patch(exit);
        }
        if let Some(target) = &target {
            for &jump in &target.breaks {
                self.patch(jump);
            }
        }
        self.pop_scope();
        Ok(())
    }

    /// `for k, v := range expr`. Each iteration gets its own scope, so range
    /// variables are fresh cells that closures and pointers share.
    fn compile_range(
        &mut self,
        label: Option<Name>,
        key: Option<&Expr>,
        value: Option<&Expr>,
        define: bool,
        expr: &Expr,
        body: &Block,
    ) -> Result<(), CompileError> {
        self.compile_expr(expr)?;
        self.emit(Op::IterNew);
        self.current.iters += 1;

        let next = self.emit(Op::IterNext {
            done: 0,
            key: key.is_some(),
            value: value.is_some(),
        });
        let top = operand(next);

        // `break` and `continue` leave the iteration scope.
        self.open_target(label, TargetKind::Loop);
        self.push_scope();
        let result = self.compile_range_body(key, value, define, body);
        self.pop_scope();
        let target = self.close_target();
        result?;

        if let Some(target) = &target {
            for &jump in &target.continues {
                if let Some(op) = self.current.func.code.get_mut(jump) {
                    op.set_jump_target(top);
                }
            }
        }
        self.set_span(body.span);
        self.emit(Op::Jump(top));

        self.patch(next);
        if let Some(target) = &target {
            for &jump in &target.breaks {
                self.patch(jump);
            }
        }
        self.emit(Op::IterEnd);
        self.current.iters -= 1;
        Ok(())
    }

    /// Bind the values `IterNext` pushed, then run the body.
    fn compile_range_body(
        &mut self,
        key: Option<&Expr>,
        value: Option<&Expr>,
        define: bool,
        body: &Block,
    ) -> Result<(), CompileError> {
        for target in [value, key].into_iter().flatten() {
            if define {
                let ExprKind::Ident(name) = target.kind else {
                    return Err(CompileError::new(
                        CompileErrorKind::NonNameDefine(self.describe(target)),
                        target.span,
                    ));
                };
                self.bind_new(name);
            } else {
                self.store_top(target)?;
            }
        }
        self.compile_block(&body.stmts)
    }

    /// Value switch (with a tag) or boolean switch. Cases are tested in
    /// order; `default` runs only when none matches.
    fn compile_switch(
        &mut self,
        label: Option<Name>,
        init: Option<&Stmt>,
        tag: Option<&Expr>,
        clauses: &[CaseClause],
    ) -> Result<(), CompileError> {
        self.push_scope();
        if let Some(init) = init {
            self.compile_stmt(init)?;
        }
        let tag_var = self.known.tag;
        if let Some(tag) = tag {
            self.compile_expr(tag)?;
            self.emit(Op::Define(tag_var));
        }

        let mut entries: Vec<SmallVec<[usize; 2]>> = Vec::with_capacity(clauses.len());
        for clause in clauses {
            let mut jumps = SmallVec::new();
            for expr in &clause.exprs {
                if tag.is_some() {
                    self.set_span(expr.span);
                    self.emit(Op::Load(tag_var));
                    self.compile_expr(expr)?;
                    self.emit(Op::Binary(BinaryOp::Eq));
                } else {
                    self.compile_expr(expr)?;
                }
                jumps.push(self.emit(Op::JumpIfTrue(0)));
            }
            entries.push(jumps);
        }
        let fallback = self.emit(Op::Jump(0));

        self.open_target(label, TargetKind::Switch);
        let mut ends = Vec::with_capacity(clauses.len());
        let mut default_start = None;
        let mut result = Ok(());
        for (clause, jumps) in clauses.iter().zip(&entries) {
            if clause.is_default {
                default_start = Some(self.here());
            }
            for &jump in jumps {
                self.patch(jump);
            }
            self.set_span(clause.span);
            result = self.compile_block(&clause.body);
            if result.is_err() {
                break;
            }
            ends.push(self.emit(Op::Jump(0)));
        }
        let target = self.close_target();
        result?;

        match default_start {
            Some(start) => {
                if let Some(op) = self.current.func.code.get_mut(fallback) {
                    op.set_jump_target(start);
                }
            }
            None => self.patch(fallback),
        }
        for jump in ends {
            self.patch(jump);
        }
        if let Some(target) = &target {
            for &jump in &target.breaks {
                self.patch(jump);
            }
        }
        self.pop_scope();
        Ok(())
    }
}
