//! Type expressions and composite literals.
//!
//! Types are first-class at run time: a type expression compiles to code
//! that leaves a type descriptor on the stack. Named types are ordinary
//! variables holding descriptors, so `int`, `Point` and `pkg.T` resolve
//! through the environment like any other name.

use std::rc::Rc;

use golite_ir::ast::{Element, Expr, ExprKind, TypeExpr, TypeExprKind, TypeSpec};
use golite_ir::{Name, Span};

use super::{operand, Compiler};
use crate::{CompileError, CompileErrorKind, Constant, Op, TypeCtor};

/// Literal shape decided from the syntax of a composite literal's type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Shape {
    List,
    Map,
    /// Struct or a type only known at run time; identifier keys are field
    /// names.
    Record,
}

/// Bound on following chains of named types (`type A B; type B A`).
const MAX_TYPE_CHAIN: usize = 32;

impl Compiler<'_> {
    pub(super) fn compile_type(&mut self, ty: &TypeExpr) -> Result<(), CompileError> {
        golite_stack::ensure_sufficient_stack(|| self.compile_type_inner(ty))
    }

    fn compile_type_inner(&mut self, ty: &TypeExpr) -> Result<(), CompileError> {
        match &ty.kind {
            TypeExprKind::Named(name) => {
                self.emit(Op::Load(*name));
            }
            TypeExprKind::Qualified(pkg, name) => {
                self.emit(Op::Load(*pkg));
                self.emit(Op::Select(*name));
            }
            TypeExprKind::Slice(elem) => {
                self.compile_type(elem)?;
                self.emit(Op::MakeType(TypeCtor::Slice));
            }
            TypeExprKind::Array(len, elem) => {
                if let Some(len) = len {
                    self.compile_expr(len)?;
                }
                self.compile_type(elem)?;
                self.emit(Op::MakeType(TypeCtor::Array {
                    sized: len.is_some(),
                }));
            }
            TypeExprKind::Map(key, elem) => {
                self.compile_type(key)?;
                self.compile_type(elem)?;
                self.emit(Op::MakeType(TypeCtor::Map));
            }
            TypeExprKind::Pointer(elem) => {
                self.compile_type(elem)?;
                self.emit(Op::MakeType(TypeCtor::Pointer));
            }
            TypeExprKind::Func(_) => {
                self.emit(Op::MakeType(TypeCtor::Func));
            }
            TypeExprKind::Chan(elem) => {
                self.compile_type(elem)?;
                self.emit(Op::MakeType(TypeCtor::Chan));
            }
            TypeExprKind::Struct(fields) => {
                for field in fields {
                    self.compile_type(&field.ty)?;
                }
                let names: Rc<[Name]> = fields.iter().map(|f| f.name).collect();
                let index = self.add_const(Constant::Names(names));
                self.emit(Op::MakeType(TypeCtor::Struct(index)));
            }
            TypeExprKind::Interface(methods) => {
                let names: Rc<[Name]> = methods.iter().copied().collect();
                let index = self.add_const(Constant::Names(names));
                self.emit(Op::MakeType(TypeCtor::Interface(index)));
            }
        }
        Ok(())
    }

    /// `type T U` or `type T = U`.
    ///
    /// A defined type is declared before its underlying type is built so
    /// that it can refer to itself (`type Node struct { next *Node }`).
    pub(super) fn compile_type_spec(&mut self, spec: &TypeSpec) -> Result<(), CompileError> {
        self.set_span(spec.span);
        self.type_decls.insert(spec.name, spec.ty.clone());
        self.declare(spec.name);
        if spec.alias {
            self.compile_type(&spec.ty)?;
            self.emit(Op::Define(spec.name));
        } else {
            self.emit(Op::DeclareType(spec.name));
            self.compile_type(&spec.ty)?;
            self.emit(Op::SetUnderlying(spec.name));
        }
        Ok(())
    }

    /// Follow named types declared in this file to a structural type.
    fn resolve_syntactic<'t>(&'t self, mut ty: &'t TypeExpr) -> &'t TypeExpr {
        for _ in 0..MAX_TYPE_CHAIN {
            match &ty.kind {
                TypeExprKind::Named(name) => match self.type_decls.get(name) {
                    Some(decl) => ty = decl,
                    None => break,
                },
                _ => break,
            }
        }
        ty
    }

    fn shape(&self, ty: &TypeExpr) -> Shape {
        match &self.resolve_syntactic(ty).kind {
            TypeExprKind::Slice(_) | TypeExprKind::Array(..) => Shape::List,
            TypeExprKind::Map(..) => Shape::Map,
            _ => Shape::Record,
        }
    }

    /// Element (or, with `key`, key) type of a list or map type, for elided
    /// inner literals.
    fn element_type(&self, ty: &TypeExpr, key: bool) -> Option<TypeExpr> {
        match &self.resolve_syntactic(ty).kind {
            TypeExprKind::Slice(elem) | TypeExprKind::Array(_, elem) if !key => {
                Some((**elem).clone())
            }
            TypeExprKind::Map(k, v) => Some(if key { (**k).clone() } else { (**v).clone() }),
            _ => None,
        }
    }

    /// `T{...}`; `&T{...}` shapes are handled by the caller with `Escape`.
    pub(super) fn compile_composite(
        &mut self,
        ty: &TypeExpr,
        elems: &[Element],
        span: Span,
    ) -> Result<(), CompileError> {
        // An elided `*T` element type stands for `&T{...}`.
        if let TypeExprKind::Pointer(inner) = &ty.kind {
            self.compile_composite(inner, elems, span)?;
            self.set_span(span);
            self.emit(Op::Escape);
            return Ok(());
        }

        self.set_span(span);
        self.compile_type(ty)?;
        let shape = self.shape(ty);
        let keyed = elems.iter().any(|e| e.key.is_some());
        for elem in elems {
            if keyed {
                match &elem.key {
                    None => {
                        self.emit(Op::Nil);
                    }
                    Some(key) => match (&key.kind, shape) {
                        (ExprKind::Ident(field), Shape::Record) => self.emit_str(*field),
                        _ => self.compile_element(key, ty, true)?,
                    },
                }
            }
            self.compile_element(&elem.value, ty, false)?;
        }
        let n = operand(elems.len());
        self.set_span(span);
        self.emit(Op::Composite { n, keyed });
        Ok(())
    }

    /// An element value or key, which may itself be an elided literal.
    fn compile_element(
        &mut self,
        expr: &Expr,
        outer: &TypeExpr,
        key: bool,
    ) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Composite { ty: None, elems } => {
                let Some(elem_ty) = self.element_type(outer, key) else {
                    return Err(CompileError::new(
                        CompileErrorKind::InvalidComposite("(missing type)".to_owned()),
                        expr.span,
                    ));
                };
                self.compile_composite(&elem_ty, elems, expr.span)
            }
            _ => self.compile_expr(expr),
        }
    }
}
