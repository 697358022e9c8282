//! Lowering of the syntax tree to bytecode.
//!
//! One [`Compiler`] turns one [`ast::File`] into an entry [`Function`].
//! Nested function bodies are compiled into their own `Function`s and stored
//! in the enclosing function's constant table.
//!
//! Variables are resolved by name at run time through the environment
//! chain; the compiler only tracks which names each block declares so that
//! `:=` can tell a fresh binding from a redeclaration.

mod assign;
mod expr;
mod stmt;
mod types;

use std::rc::Rc;

use golite_ir::ast::{self, FuncDecl, FuncType, Item, StmtKind, TypeExpr, TypeExprKind};
use golite_ir::{Name, Span, StringInterner};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::debug;

use crate::{CompileError, Constant, Function, NumKind, Op};

/// What the entry function does with the compiled items.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// A program: after all declarations, `main` is called when declared.
    Program,
    /// A snippet run against a live environment: the value of a final
    /// expression statement is returned.
    Snippet,
}

/// Names the compiler itself refers to.
struct Known {
    blank: Name,
    main: Name,
    iota: Name,
    nil: Name,
    true_: Name,
    false_: Name,
    tag: Name,
    entry: Name,
    func_lit: Name,
}

impl Known {
    fn new(interner: &StringInterner) -> Self {
        Known {
            blank: interner.intern("_"),
            main: interner.intern("main"),
            iota: interner.intern("iota"),
            nil: interner.intern("nil"),
            true_: interner.intern("true"),
            false_: interner.intern("false"),
            tag: interner.intern("#tag"),
            entry: interner.intern("<entry>"),
            func_lit: interner.intern("func literal"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TargetKind {
    Loop,
    Switch,
}

/// An enclosing statement `break` (and, for loops, `continue`) can leave.
struct BreakTarget {
    label: Option<Name>,
    kind: TargetKind,
    /// Runtime scope depth at the jump destinations.
    depth: usize,
    /// Live range iterators at the jump destinations.
    iters: usize,
    breaks: SmallVec<[usize; 4]>,
    continues: SmallVec<[usize; 4]>,
}

/// Per-function compilation state.
struct FnState {
    func: Function,
    /// Names declared in each open block, innermost last.
    scopes: Vec<FxHashSet<Name>>,
    /// Number of `PushScope`s currently open.
    depth: usize,
    /// Number of range iterators currently open.
    iters: usize,
    targets: Vec<BreakTarget>,
    /// Value of `iota` while compiling a `const` spec.
    iota: Option<i64>,
    span: Span,
}

impl FnState {
    fn new(name: Name, span: Span) -> Self {
        FnState {
            func: Function {
                name,
                ..Function::default()
            },
            scopes: vec![FxHashSet::default()],
            depth: 0,
            iters: 0,
            targets: Vec::new(),
            iota: None,
            span,
        }
    }
}

/// Compiler from syntax tree to bytecode.
pub struct Compiler<'a> {
    interner: &'a StringInterner,
    known: Known,
    /// Declared types by name, used to find the element type of elided
    /// composite literals (`[]Point{{1, 2}}`).
    type_decls: FxHashMap<Name, TypeExpr>,
    current: FnState,
}

impl<'a> Compiler<'a> {
    pub fn new(interner: &'a StringInterner) -> Self {
        let known = Known::new(interner);
        let current = FnState::new(known.entry, Span::DUMMY);
        Compiler {
            interner,
            known,
            type_decls: FxHashMap::default(),
            current,
        }
    }

    /// Compile a file into its entry function.
    ///
    /// Type declarations are bound first, then every top-level function and
    /// method, then the remaining statements in source order.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(items = file.items.len(), mode = ?mode)
    )]
    pub fn compile_file(
        &mut self,
        file: &ast::File,
        mode: Mode,
    ) -> Result<Rc<Function>, CompileError> {
        self.current = FnState::new(self.known.entry, Span::DUMMY);

        for item in &file.items {
            if let Item::Stmt(stmt) = item {
                if matches!(stmt.kind, StmtKind::Decl(ast::GenDecl::Type(_))) {
                    self.compile_stmt(stmt)?;
                }
            }
        }

        let mut has_main = false;
        for item in &file.items {
            if let Item::Func(decl) = item {
                has_main |= decl.recv.is_none() && decl.name == self.known.main;
                self.compile_func_decl(decl)?;
            }
        }

        let rest: Vec<&ast::Stmt> = file
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Stmt(stmt)
                    if !matches!(stmt.kind, StmtKind::Decl(ast::GenDecl::Type(_))) =>
                {
                    Some(stmt)
                }
                _ => None,
            })
            .collect();

        let mut returned = false;
        for (i, stmt) in rest.iter().enumerate() {
            let last = i + 1 == rest.len();
            match &stmt.kind {
                StmtKind::Expr(expr) if last && mode == Mode::Snippet => {
                    self.set_span(stmt.span);
                    self.compile_expr(expr)?;
                    self.emit(Op::Return(1));
                    returned = true;
                }
                _ => self.compile_stmt(stmt)?,
            }
        }

        if !returned {
            if mode == Mode::Program && has_main {
                self.emit(Op::Load(self.known.main));
                self.emit(Op::Call {
                    argc: 0,
                    spread: false,
                });
                self.emit(Op::Pop);
            }
            self.emit(Op::Return(0));
        }

        let entry = std::mem::replace(
            &mut self.current,
            FnState::new(self.known.entry, Span::DUMMY),
        );
        debug!(ops = entry.func.code.len(), "compiled entry function");
        Ok(Rc::new(entry.func))
    }

    /// Bind a top-level function, or attach a method to its receiver type.
    fn compile_func_decl(&mut self, decl: &FuncDecl) -> Result<(), CompileError> {
        self.set_span(decl.span);
        let func = self.compile_function(
            decl.name,
            decl.recv.as_ref(),
            &decl.sig,
            &decl.body,
            decl.span,
        )?;
        let index = self.add_const(Constant::Function(func));
        self.set_span(decl.span);
        self.emit(Op::MakeClosure(index));
        match &decl.recv {
            Some(recv) => {
                self.emit(Op::DefineMethod {
                    ty: recv.type_name,
                    method: decl.name,
                    pointer: recv.pointer,
                });
            }
            None => {
                self.declare(decl.name);
                self.emit(Op::Define(decl.name));
            }
        }
        Ok(())
    }

    /// Compile a function body into a standalone `Function`.
    fn compile_function(
        &mut self,
        name: Name,
        recv: Option<&ast::Receiver>,
        sig: &FuncType,
        body: &ast::Block,
        span: Span,
    ) -> Result<Rc<Function>, CompileError> {
        let outer = std::mem::replace(&mut self.current, FnState::new(name, span));
        let result = self.compile_function_body(recv, sig, body);
        let inner = std::mem::replace(&mut self.current, outer);
        result?;
        Ok(Rc::new(inner.func))
    }

    fn compile_function_body(
        &mut self,
        recv: Option<&ast::Receiver>,
        sig: &FuncType,
        body: &ast::Block,
    ) -> Result<(), CompileError> {
        if let Some(recv) = recv {
            let name = recv.name.unwrap_or(self.known.blank);
            self.current.func.params.push(name);
            self.current.func.param_kinds.push(None);
            self.declare(name);
        }
        for (i, param) in sig.params.iter().enumerate() {
            let name = param.name.unwrap_or(self.known.blank);
            self.current.func.params.push(name);
            let variadic_tail = sig.variadic && i + 1 == sig.params.len();
            let kind = if variadic_tail {
                None
            } else {
                self.num_kind(&param.ty)
            };
            self.current.func.param_kinds.push(kind);
            self.declare(name);
        }
        self.current.func.variadic = sig.variadic;
        self.current.func.result_count = Some(sig.results.len());
        self.current.func.result_kinds = sig.results.iter().map(|r| self.num_kind(&r.ty)).collect();

        // Named results start at their zero values.
        for result in &sig.results {
            if let Some(name) = result.name {
                self.compile_type(&result.ty)?;
                self.emit(Op::Zero);
                self.emit(Op::Define(name));
                self.declare(name);
                self.current.func.named_results.push(name);
            }
        }

        for stmt in &body.stmts {
            self.compile_stmt(stmt)?;
        }
        self.set_span(body.span);
        self.emit(Op::Return(0));
        Ok(())
    }

    /// Numeric kind of a predeclared numeric type name.
    fn num_kind(&self, ty: &TypeExpr) -> Option<NumKind> {
        match ty.kind {
            TypeExprKind::Named(name) if !self.type_decls.contains_key(&name) => {
                NumKind::from_type_name(self.interner.lookup(name))
            }
            _ => None,
        }
    }

    // Emission helpers

    fn set_span(&mut self, span: Span) {
        self.current.span = span;
    }

    fn emit(&mut self, op: Op) -> usize {
        let func = &mut self.current.func;
        func.code.push(op);
        func.spans.push(self.current.span);
        func.code.len() - 1
    }

    /// Index the next emitted instruction will have.
    fn here(&self) -> u32 {
        operand(self.current.func.code.len())
    }

    /// Point the jump at `at` to the next emitted instruction.
    fn patch(&mut self, at: usize) {
        let target = self.here();
        if let Some(op) = self.current.func.code.get_mut(at) {
            op.set_jump_target(target);
        }
    }

    fn add_const(&mut self, constant: Constant) -> u32 {
        let constants = &mut self.current.func.constants;
        let reusable = matches!(
            constant,
            Constant::Int(_) | Constant::Uint(_) | Constant::Str(_)
        );
        let index = if reusable {
            constants.iter().position(|c| *c == constant)
        } else {
            None
        };
        let index = index.unwrap_or_else(|| {
            constants.push(constant);
            constants.len() - 1
        });
        operand(index)
    }

    fn emit_const(&mut self, constant: Constant) {
        let index = self.add_const(constant);
        self.emit(Op::Const(index));
    }

    fn emit_str(&mut self, name: Name) {
        let text: Rc<str> = Rc::from(self.interner.lookup(name));
        self.emit_const(Constant::Str(text));
    }

    // Scope tracking

    fn push_scope(&mut self) {
        self.emit(Op::PushScope);
        self.current.depth += 1;
        self.current.scopes.push(FxHashSet::default());
    }

    fn pop_scope(&mut self) {
        self.emit(Op::PopScope);
        self.current.depth = self.current.depth.saturating_sub(1);
        self.current.scopes.pop();
    }

    fn declare(&mut self, name: Name) {
        if let Some(scope) = self.current.scopes.last_mut() {
            scope.insert(name);
        }
    }

    fn declared_in_current_scope(&self, name: Name) -> bool {
        self.current
            .scopes
            .last()
            .is_some_and(|scope| scope.contains(&name))
    }

    fn name_str(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }
}

/// Instruction operand for a count or index.
fn operand(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests;
