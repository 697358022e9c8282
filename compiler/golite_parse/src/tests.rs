use super::*;
use golite_ir::ast::{AssignOp, ExprKind, GenDecl, Item, StmtKind, TypeExprKind};
use golite_ir::UnaryOp;
use pretty_assertions::assert_eq;

fn parse_ok(source: &str, interner: &StringInterner) -> ast::File {
    match parse_source(source, interner) {
        Ok(file) => file,
        Err(e) => panic!("parse failed: {e} at {:?}", e.span),
    }
}

fn stmts(file: &ast::File) -> Vec<&ast::Stmt> {
    file.items
        .iter()
        .filter_map(|item| match item {
            Item::Stmt(stmt) => Some(stmt),
            Item::Func(_) => None,
        })
        .collect()
}

#[test]
fn test_package_imports_and_funcs() {
    let interner = StringInterner::new();
    let file = parse_ok(
        "package main\n\nimport (\n\t\"fmt\"\n\tstr \"strings\"\n)\n\nfunc add(a, b int) int {\n\treturn a + b\n}\n",
        &interner,
    );
    assert_eq!(file.package, Some(interner.intern("main")));
    assert_eq!(file.imports.len(), 2);
    assert_eq!(file.imports[1].alias, Some(interner.intern("str")));
    let Item::Func(func) = &file.items[0] else {
        panic!("expected func");
    };
    assert_eq!(func.name, interner.intern("add"));
    assert_eq!(func.sig.params.len(), 2);
    assert_eq!(func.sig.params[0].name, Some(interner.intern("a")));
    assert_eq!(func.sig.results.len(), 1);
}

#[test]
fn test_method_receivers() {
    let interner = StringInterner::new();
    let file = parse_ok(
        "func (p *Point) Move(dx int) { p.X += dx }\nfunc (Point) Zero() int { return 0 }",
        &interner,
    );
    let recvs: Vec<_> = file
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Func(f) => f.recv.as_ref().map(|r| (r.name.is_some(), r.pointer)),
            Item::Stmt(_) => None,
        })
        .collect();
    assert_eq!(recvs, vec![(true, true), (false, false)]);
}

#[test]
fn test_variadic_and_unnamed_params() {
    let interner = StringInterner::new();
    let file = parse_ok(
        "func f(format string, args ...int) (int, error) { return 0, nil }",
        &interner,
    );
    let Item::Func(func) = &file.items[0] else {
        panic!("expected func");
    };
    assert!(func.sig.variadic);
    assert_eq!(func.sig.results.len(), 2);
    assert!(func.sig.results.iter().all(|r| r.name.is_none()));
}

#[test]
fn test_if_header_does_not_open_composite() {
    let interner = StringInterner::new();
    let file = parse_ok("if x := 5; x == y {\n\tz = 1\n} else if x > 2 {\n} else {\n}", &interner);
    let stmt = stmts(&file)[0];
    let StmtKind::If { init, cond, els, .. } = &stmt.kind else {
        panic!("expected if");
    };
    assert!(init.is_some());
    assert!(matches!(cond.kind, ExprKind::Binary(..)));
    let Some(els) = els else {
        panic!("expected else");
    };
    assert!(matches!(els.kind, StmtKind::If { .. }));
}

#[test]
fn test_for_forms() {
    let interner = StringInterner::new();
    let file = parse_ok(
        "for i := 0; i < 3; i++ {}\nfor x < 3 {}\nfor {}\nfor k, v := range m {}\nfor range 3 {}",
        &interner,
    );
    let kinds: Vec<_> = stmts(&file)
        .iter()
        .map(|s| match &s.kind {
            StmtKind::For { init, cond, post, .. } => {
                format!("for {} {} {}", init.is_some(), cond.is_some(), post.is_some())
            }
            StmtKind::Range { key, value, define, .. } => {
                format!("range {} {} {define}", key.is_some(), value.is_some())
            }
            other => format!("{other:?}"),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "for true true true",
            "for false true false",
            "for false false false",
            "range true true true",
            "range false false false",
        ]
    );
}

#[test]
fn test_composite_literals() {
    let interner = StringInterner::new();
    let file = parse_ok(
        "p := &Point{X: 1, Y: 2}\ngrid := [][]int{{1, 2}, {3}}\nm := map[string]int{\n\t\"a\": 1,\n}",
        &interner,
    );
    let all = stmts(&file);
    let StmtKind::Assign { rhs, op, .. } = &all[0].kind else {
        panic!("expected assignment");
    };
    assert_eq!(*op, AssignOp::Define);
    assert!(matches!(rhs[0].kind, ExprKind::Unary(UnaryOp::Addr, _)));

    let StmtKind::Assign { rhs, .. } = &all[1].kind else {
        panic!("expected assignment");
    };
    let ExprKind::Composite { ty: Some(ty), elems } = &rhs[0].kind else {
        panic!("expected composite");
    };
    assert!(matches!(ty.kind, TypeExprKind::Slice(_)));
    assert!(matches!(elems[0].value.kind, ExprKind::Composite { ty: None, .. }));

    let StmtKind::Assign { rhs, .. } = &all[2].kind else {
        panic!("expected assignment");
    };
    let ExprKind::Composite { elems, .. } = &rhs[0].kind else {
        panic!("expected composite");
    };
    assert!(elems[0].key.is_some());
}

#[test]
fn test_const_group_repeats_previous_spec() {
    let interner = StringInterner::new();
    let file = parse_ok("const (\n\tA = iota * 10\n\tB\n\tC\n)", &interner);
    let StmtKind::Decl(GenDecl::Const(specs)) = &stmts(&file)[0].kind else {
        panic!("expected const decl");
    };
    let iotas: Vec<_> = specs.iter().map(|s| s.iota).collect();
    assert_eq!(iotas, vec![0, 1, 2]);
    assert_eq!(specs[2].values, specs[0].values);
}

#[test]
fn test_unsupported_constructs_still_parse() {
    let interner = StringInterner::new();
    let file = parse_ok(
        "go f()\nselect {\ncase <-c:\n}\nswitch v := x.(type) {\ncase int:\n}\nch <- 1",
        &interner,
    );
    let all = stmts(&file);
    assert!(matches!(all[0].kind, StmtKind::Go(_)));
    assert!(matches!(all[1].kind, StmtKind::Select));
    assert!(matches!(all[2].kind, StmtKind::TypeSwitch));
    assert!(matches!(all[3].kind, StmtKind::Send(..)));
}

#[test]
fn test_switch_clauses() {
    let interner = StringInterner::new();
    let file = parse_ok(
        "switch x := f(); x {\ncase 1, 2:\n\ty = 1\ndefault:\ncase 3:\n}",
        &interner,
    );
    let StmtKind::Switch { init, tag, clauses } = &stmts(&file)[0].kind else {
        panic!("expected switch");
    };
    assert!(init.is_some());
    assert!(tag.is_some());
    assert_eq!(clauses.len(), 3);
    assert_eq!(clauses[0].exprs.len(), 2);
    assert!(clauses[1].is_default);
}

#[test]
fn test_labeled_loop() {
    let interner = StringInterner::new();
    let file = parse_ok("outer:\nfor {\n\tbreak outer\n}", &interner);
    let StmtKind::Labeled(label, inner) = &stmts(&file)[0].kind else {
        panic!("expected labeled statement");
    };
    assert_eq!(*label, interner.intern("outer"));
    assert!(matches!(inner.kind, StmtKind::For { .. }));
}

#[test]
fn test_slices_and_assertions() {
    let interner = StringInterner::new();
    let file = parse_ok("a := s[1:]\nb := s[:]\nv, ok := x.(int)", &interner);
    let all = stmts(&file);
    let StmtKind::Assign { rhs, .. } = &all[1].kind else {
        panic!("expected assignment");
    };
    assert!(matches!(
        rhs[0].kind,
        ExprKind::Slice {
            low: None,
            high: None,
            ..
        }
    ));
    let StmtKind::Assign { lhs, rhs, .. } = &all[2].kind else {
        panic!("expected assignment");
    };
    assert_eq!(lhs.len(), 2);
    assert!(matches!(rhs[0].kind, ExprKind::TypeAssert(_, Some(_))));
}

#[test]
fn test_syntax_error_has_span() {
    let interner = StringInterner::new();
    let err = parse_source("x := ", &interner);
    let Err(err) = err else {
        panic!("expected error");
    };
    assert!(err.message.starts_with("expected expression"));
}
