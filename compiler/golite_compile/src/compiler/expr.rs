//! Expression lowering.

use golite_ir::ast::{Expr, ExprKind};
use golite_ir::{BinaryOp, UnaryOp};

use super::{operand, Compiler};
use crate::{CompileError, CompileErrorKind, Constant, Op, Unsupported};

impl Compiler<'_> {
    /// Compile `expr`, leaving exactly one value on the stack.
    pub(super) fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        golite_stack::ensure_sufficient_stack(|| self.compile_expr_inner(expr))
    }

    fn compile_expr_inner(&mut self, expr: &Expr) -> Result<(), CompileError> {
        self.set_span(expr.span);
        match &expr.kind {
            ExprKind::Ident(name) => self.compile_ident(*name),
            ExprKind::Int(value) => match i64::try_from(*value) {
                Ok(value) => self.emit_const(Constant::Int(value)),
                Err(_) => self.emit_const(Constant::Uint(*value)),
            },
            ExprKind::Float(value) => self.emit_const(Constant::Float(*value)),
            ExprKind::Imag(value) => self.emit_const(Constant::Imag(*value)),
            ExprKind::Char(value) => self.emit_const(Constant::Int(*value)),
            ExprKind::Str(text) => self.emit_str(*text),
            ExprKind::Composite { ty: Some(ty), elems } => {
                self.compile_composite(ty, elems, expr.span)?;
            }
            ExprKind::Composite { ty: None, .. } => {
                return Err(CompileError::new(
                    CompileErrorKind::InvalidComposite("(missing type)".to_owned()),
                    expr.span,
                ));
            }
            ExprKind::FuncLit { sig, body } => {
                let name = self.known.func_lit;
                let func = self.compile_function(name, None, sig, body, expr.span)?;
                let index = self.add_const(Constant::Function(func));
                self.set_span(expr.span);
                self.emit(Op::MakeClosure(index));
            }
            ExprKind::Type(ty) => self.compile_type(ty)?,
            ExprKind::Paren(inner) => self.compile_expr(inner)?,
            ExprKind::Selector(base, name) => {
                // Methods with pointer receivers need the original slot.
                if self.is_addressable(base) {
                    self.compile_place(base)?;
                } else {
                    self.compile_expr(base)?;
                }
                self.set_span(expr.span);
                self.emit(Op::Select(*name));
            }
            ExprKind::Index(base, index) => {
                self.compile_expr(base)?;
                self.compile_expr(index)?;
                self.set_span(expr.span);
                self.emit(Op::Index);
            }
            ExprKind::Slice { base, low, high } => {
                self.compile_expr(base)?;
                if let Some(low) = low {
                    self.compile_expr(low)?;
                }
                if let Some(high) = high {
                    self.compile_expr(high)?;
                }
                self.set_span(expr.span);
                self.emit(Op::Slice {
                    low: low.is_some(),
                    high: high.is_some(),
                });
            }
            ExprKind::TypeAssert(base, Some(ty)) => {
                self.compile_expr(base)?;
                self.compile_type(ty)?;
                self.set_span(expr.span);
                self.emit(Op::Assert { ok: false });
            }
            ExprKind::TypeAssert(_, None) => {
                return Err(CompileError::new(
                    CompileErrorKind::TypeGuardOutsideSwitch,
                    expr.span,
                ));
            }
            ExprKind::Call { func, args, spread } => {
                self.compile_call_parts(func, args)?;
                self.set_span(expr.span);
                self.emit(Op::Call {
                    argc: operand(args.len()),
                    spread: *spread,
                });
            }
            ExprKind::Star(inner) => {
                self.compile_expr(inner)?;
                self.set_span(expr.span);
                self.emit(Op::Deref);
            }
            ExprKind::Unary(UnaryOp::Addr, inner) => self.compile_address_of(inner)?,
            ExprKind::Unary(UnaryOp::Recv, _) => {
                return Err(CompileError::unsupported(
                    Unsupported::ChannelReceive,
                    expr.span,
                ));
            }
            ExprKind::Unary(op, inner) => {
                self.compile_expr(inner)?;
                self.set_span(expr.span);
                self.emit(Op::Unary(*op));
            }
            ExprKind::Binary(op @ (BinaryOp::And | BinaryOp::Or), lhs, rhs) => {
                self.compile_expr(lhs)?;
                self.set_span(expr.span);
                let jump = if *op == BinaryOp::And {
                    self.emit(Op::JumpIfFalseOrPop(0))
                } else {
                    self.emit(Op::JumpIfTrueOrPop(0))
                };
                self.compile_expr(rhs)?;
                self.patch(jump);
            }
            ExprKind::Binary(op, lhs, rhs) => {
                self.compile_expr(lhs)?;
                self.compile_expr(rhs)?;
                self.set_span(expr.span);
                self.emit(Op::Binary(*op));
            }
        }
        Ok(())
    }

    fn compile_ident(&mut self, name: golite_ir::Name) {
        let known = &self.known;
        if name == known.nil {
            self.emit(Op::Nil);
        } else if name == known.true_ {
            self.emit(Op::True);
        } else if name == known.false_ {
            self.emit(Op::False);
        } else if let (true, Some(iota)) = (name == known.iota, self.current.iota) {
            self.emit_const(Constant::Int(iota));
        } else {
            self.emit(Op::Load(name));
        }
    }

    /// Push callee and arguments for a call or a deferred call.
    pub(super) fn compile_call_parts(
        &mut self,
        func: &Expr,
        args: &[Expr],
    ) -> Result<(), CompileError> {
        self.compile_expr(func)?;
        for arg in args {
            self.compile_expr(arg)?;
        }
        Ok(())
    }

    /// `&operand`
    fn compile_address_of(&mut self, operand: &Expr) -> Result<(), CompileError> {
        match &operand.kind {
            ExprKind::Paren(inner) => self.compile_address_of(inner),
            ExprKind::Composite { .. } => {
                self.compile_expr(operand)?;
                self.set_span(operand.span);
                self.emit(Op::Escape);
                Ok(())
            }
            ExprKind::Star(inner) => self.compile_expr(inner),
            ExprKind::Ident(_) | ExprKind::Index(..) | ExprKind::Selector(..)
                if self.is_addressable(operand) =>
            {
                self.compile_place(operand)
            }
            _ => Err(CompileError::new(
                CompileErrorKind::NotAddressable(self.describe(operand)),
                operand.span,
            )),
        }
    }

    /// Whether `expr` denotes a storage location.
    pub(super) fn is_addressable(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Ident(name) => {
                let known = &self.known;
                ![known.blank, known.nil, known.true_, known.false_].contains(name)
                    && !(*name == known.iota && self.current.iota.is_some())
            }
            ExprKind::Index(..) | ExprKind::Selector(..) | ExprKind::Star(_) => true,
            ExprKind::Paren(inner) => self.is_addressable(inner),
            _ => false,
        }
    }

    /// Short source-like rendering of an expression for error messages.
    pub(super) fn describe(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Ident(name) => self.name_str(*name).to_owned(),
            ExprKind::Int(value) => value.to_string(),
            ExprKind::Float(value) => value.to_string(),
            ExprKind::Str(text) => format!("{:?}", self.name_str(*text)),
            ExprKind::Paren(inner) => format!("({})", self.describe(inner)),
            ExprKind::Selector(base, name) => {
                format!("{}.{}", self.describe(base), self.name_str(*name))
            }
            ExprKind::Index(base, index) => {
                format!("{}[{}]", self.describe(base), self.describe(index))
            }
            ExprKind::Call { func, .. } => format!("{}(...)", self.describe(func)),
            ExprKind::Star(inner) => format!("*{}", self.describe(inner)),
            ExprKind::Unary(op, inner) => format!("{}{}", op.as_symbol(), self.describe(inner)),
            ExprKind::Binary(op, lhs, rhs) => format!(
                "{} {} {}",
                self.describe(lhs),
                op.as_symbol(),
                self.describe(rhs)
            ),
            ExprKind::Composite { .. } => "composite literal".to_owned(),
            ExprKind::FuncLit { .. } => "func literal".to_owned(),
            _ => "expression".to_owned(),
        }
    }
}
