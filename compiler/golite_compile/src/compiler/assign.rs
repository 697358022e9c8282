//! Assignment, definition and places.
//!
//! A place compiles to code that leaves a pointer on the stack; stores then
//! go through `StorePtr`. Plain variables skip the pointer and use
//! `Store`/`Define` directly.

use golite_ir::ast::{AssignOp, Expr, ExprKind};
use golite_ir::{BinaryOp, Name, Span};

use super::Compiler;
use crate::{CompileError, CompileErrorKind, Constant, Op};

impl Compiler<'_> {
    /// Leave a pointer to the location `expr` denotes.
    pub(super) fn compile_place(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Paren(inner) => self.compile_place(inner),
            ExprKind::Ident(name) if self.is_addressable(expr) => {
                self.set_span(expr.span);
                self.emit(Op::AddrOf(*name));
                Ok(())
            }
            ExprKind::Index(base, index) => {
                self.compile_expr(base)?;
                self.compile_expr(index)?;
                self.set_span(expr.span);
                self.emit(Op::IndexAddr);
                Ok(())
            }
            ExprKind::Selector(base, field) => {
                if self.is_addressable(base) {
                    self.compile_place(base)?;
                } else {
                    self.compile_expr(base)?;
                }
                self.set_span(expr.span);
                self.emit(Op::FieldAddr(*field));
                Ok(())
            }
            ExprKind::Star(inner) => self.compile_expr(inner),
            _ => Err(CompileError::new(
                CompileErrorKind::NotAssignable(self.describe(expr)),
                expr.span,
            )),
        }
    }

    pub(super) fn compile_assign(
        &mut self,
        lhs: &[Expr],
        op: AssignOp,
        rhs: &[Expr],
        span: Span,
    ) -> Result<(), CompileError> {
        match op {
            AssignOp::Define => self.compile_define(lhs, rhs, span),
            AssignOp::Assign => {
                if let ([target], [value]) = (lhs, rhs) {
                    return self.compile_single_assign(target, value);
                }
                self.compile_values(rhs, lhs.len(), span)?;
                for target in lhs.iter().rev() {
                    self.store_top(target)?;
                }
                Ok(())
            }
            AssignOp::Compound(bin) => match (lhs, rhs) {
                ([target], [value]) => {
                    self.compile_update(target, bin, |this| this.compile_expr(value))
                }
                _ => Err(CompileError::new(
                    CompileErrorKind::CountMismatch {
                        vars: lhs.len(),
                        values: rhs.len(),
                    },
                    span,
                )),
            },
        }
    }

    /// `x++` / `x--`
    pub(super) fn compile_incdec(
        &mut self,
        target: &Expr,
        inc: bool,
    ) -> Result<(), CompileError> {
        let op = if inc { BinaryOp::Add } else { BinaryOp::Sub };
        self.compile_update(target, op, |this| {
            this.emit_const(Constant::Int(1));
            Ok(())
        })
    }

    /// `target = value` with the place evaluated before the value.
    fn compile_single_assign(
        &mut self,
        target: &Expr,
        value: &Expr,
    ) -> Result<(), CompileError> {
        match self.simple_target(target) {
            Some(name) if name == self.known.blank => {
                self.compile_expr(value)?;
                self.emit(Op::Pop);
            }
            Some(name) => {
                self.compile_expr(value)?;
                self.set_span(target.span);
                self.emit(Op::Store(name));
            }
            None => {
                self.compile_place(target)?;
                self.compile_expr(value)?;
                self.set_span(target.span);
                self.emit(Op::StorePtr);
            }
        }
        Ok(())
    }

    /// `target op= value`; the place is evaluated once.
    fn compile_update(
        &mut self,
        target: &Expr,
        op: BinaryOp,
        value: impl FnOnce(&mut Self) -> Result<(), CompileError>,
    ) -> Result<(), CompileError> {
        match self.simple_target(target) {
            Some(name) if name == self.known.blank => Err(CompileError::new(
                CompileErrorKind::NotAssignable("_".to_owned()),
                target.span,
            )),
            Some(name) => {
                self.set_span(target.span);
                self.emit(Op::Load(name));
                value(self)?;
                self.set_span(target.span);
                self.emit(Op::Binary(op));
                self.emit(Op::Store(name));
                Ok(())
            }
            None => {
                self.compile_place(target)?;
                self.emit(Op::Dup);
                self.emit(Op::Deref);
                value(self)?;
                self.set_span(target.span);
                self.emit(Op::Binary(op));
                self.emit(Op::StorePtr);
                Ok(())
            }
        }
    }

    /// `a, b := x, y`: at least one name must be new to this block.
    fn compile_define(
        &mut self,
        lhs: &[Expr],
        rhs: &[Expr],
        span: Span,
    ) -> Result<(), CompileError> {
        let mut names = Vec::with_capacity(lhs.len());
        for target in lhs {
            match target.kind {
                ExprKind::Ident(name) => names.push(name),
                _ => {
                    return Err(CompileError::new(
                        CompileErrorKind::NonNameDefine(self.describe(target)),
                        target.span,
                    ))
                }
            }
        }
        let fresh: Vec<bool> = names
            .iter()
            .map(|&name| name != self.known.blank && !self.declared_in_current_scope(name))
            .collect();
        if !fresh.contains(&true) {
            return Err(CompileError::new(CompileErrorKind::NoNewVariables, span));
        }

        self.compile_values(rhs, names.len(), span)?;
        self.set_span(span);
        for (&name, &is_new) in names.iter().zip(&fresh).rev() {
            if name == self.known.blank {
                self.emit(Op::Pop);
            } else if is_new {
                self.declare(name);
                self.emit(Op::Define(name));
            } else {
                self.emit(Op::Store(name));
            }
        }
        Ok(())
    }

    /// Push `count` values from the right-hand side of an assignment or
    /// declaration: one per expression, or all results of a single
    /// multi-value expression.
    pub(super) fn compile_values(
        &mut self,
        values: &[Expr],
        count: usize,
        span: Span,
    ) -> Result<(), CompileError> {
        if values.len() == count {
            for value in values {
                self.compile_expr(value)?;
            }
            return Ok(());
        }
        let mismatch = CompileError::new(
            CompileErrorKind::CountMismatch {
                vars: count,
                values: values.len(),
            },
            span,
        );
        let [value] = values else {
            return Err(mismatch);
        };
        match &value.kind {
            ExprKind::Call { .. } => {
                self.compile_expr(value)?;
                self.set_span(value.span);
                self.emit(Op::Unpack(super::operand(count)));
            }
            ExprKind::Index(base, index) if count == 2 => {
                self.compile_expr(base)?;
                self.compile_expr(index)?;
                self.set_span(value.span);
                self.emit(Op::IndexOk);
            }
            ExprKind::TypeAssert(base, Some(ty)) if count == 2 => {
                self.compile_expr(base)?;
                self.compile_type(ty)?;
                self.set_span(value.span);
                self.emit(Op::Assert { ok: true });
            }
            ExprKind::TypeAssert(_, None) => {
                return Err(CompileError::new(
                    CompileErrorKind::TypeGuardOutsideSwitch,
                    value.span,
                ));
            }
            _ => return Err(mismatch),
        }
        Ok(())
    }

    /// Store the value on top of the stack into `target`.
    pub(super) fn store_top(&mut self, target: &Expr) -> Result<(), CompileError> {
        match self.simple_target(target) {
            Some(name) if name == self.known.blank => {
                self.emit(Op::Pop);
            }
            Some(name) => {
                self.set_span(target.span);
                self.emit(Op::Store(name));
            }
            None => {
                self.compile_place(target)?;
                self.emit(Op::Swap);
                self.emit(Op::StorePtr);
            }
        }
        Ok(())
    }

    /// Variable name when `target` is a plain (possibly parenthesized)
    /// identifier.
    fn simple_target(&self, target: &Expr) -> Option<Name> {
        match &target.kind {
            ExprKind::Ident(name) => Some(*name),
            ExprKind::Paren(inner) => self.simple_target(inner),
            _ => None,
        }
    }
}
