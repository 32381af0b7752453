//! Basic parser tests

use super::*;
use crate::frontend::parser::{parse, parse_expression, ParseError, ParseOptions};

#[test]
fn test_parse_empty_module() {
    let output = parse_js("");
    assert!(output.module.body.is_empty());
}

#[test]
fn test_statement_spans() {
    let source = "const a = 1;\nlet b = a + 2\nfunction f() { return b }";
    let output = parse_js(source);
    let body = &output.module.body;
    assert_eq!(body.len(), 3);
    assert_eq!(&source[body[0].span.start..body[0].span.end], "const a = 1;");
    assert_eq!(&source[body[1].span.start..body[1].span.end], "let b = a + 2");
    assert!(matches!(body[2].kind, StmtKind::Function(_)));
}

#[test]
fn test_precedence() {
    let expr = parse_expression("1 + 2 * 3", false).unwrap();
    match expr.kind {
        ExprKind::Binary {
            op: BinaryOp::Add,
            right,
            ..
        } => assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. })),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_exponent_is_right_associative() {
    let expr = parse_expression("2 ** 3 ** 2", false).unwrap();
    match expr.kind {
        ExprKind::Binary {
            op: BinaryOp::Exp,
            left,
            right,
        } => {
            assert!(matches!(left.kind, ExprKind::Lit(Lit::Number(n)) if n == 2.0));
            assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Exp, .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_shift_operators_from_split_gt() {
    let expr = parse_expression("a >>> 1 >> 2", false).unwrap();
    assert!(matches!(expr.kind, ExprKind::Binary { op: BinaryOp::Shr, .. }));
    let output = parse_js("x >>= 1; y >>>= 2; z >= 3");
    assert!(matches!(
        first_expr(&output).kind,
        ExprKind::Assign {
            op: AssignOp::Binary(BinaryOp::Shr),
            ..
        }
    ));
}

#[test]
fn test_arrow_functions() {
    let output = parse_js("const f = (a, b = 2, ...rest) => a + b; const g = x => x; const h = async () => {}");
    assert_eq!(output.module.body.len(), 3);
    let StmtKind::Var(decl) = &output.module.body[0].kind else {
        panic!("expected var");
    };
    let Some(Expr {
        kind: ExprKind::Arrow(func),
        ..
    }) = &decl.decls[0].init
    else {
        panic!("expected arrow");
    };
    assert_eq!(func.params.len(), 3);
    assert!(func.params[2].rest);
    assert!(matches!(func.body, FunctionBody::Expr(_)));
}

#[test]
fn test_no_line_break_before_arrow() {
    assert!(parse("const f = (a)\n=> a;", ParseOptions::javascript()).is_err());
    assert!(parse("const f = a\n=> a;", ParseOptions::javascript()).is_err());
    parse_js("const f = (a) =>\na;");
    parse_ts("const f = (a):\n  number => a;");
}

#[test]
fn test_parenthesized_is_kept() {
    let expr = parse_expression("(a).b", false).unwrap();
    let ExprKind::Member { object, .. } = expr.kind else {
        panic!("expected member");
    };
    assert!(matches!(object.kind, ExprKind::Paren(_)));
}

#[test]
fn test_optional_chain_wraps_whole_chain() {
    let expr = parse_expression("a?.b.c()", false).unwrap();
    let ExprKind::OptChain(inner) = expr.kind else {
        panic!("expected optional chain");
    };
    assert!(matches!(inner.kind, ExprKind::Call { .. }));
}

#[test]
fn test_destructuring_assignment() {
    let output = parse_js("[a, { b, c: [d] }] = value;");
    let ExprKind::Assign { target, .. } = &first_expr(&output).kind else {
        panic!("expected assignment");
    };
    assert!(matches!(target.kind, PatternKind::Array { .. }));
}

#[test]
fn test_asi() {
    let output = parse_js("let a = 1\nlet b = 2\na\n++b");
    assert_eq!(output.module.body.len(), 4);
    let output = parse_js("function f() { return\n1 }");
    let StmtKind::Function(func) = &output.module.body[0].kind else {
        panic!("expected function");
    };
    let FunctionBody::Block(body) = &func.body else {
        panic!("expected block");
    };
    assert!(matches!(body[0].kind, StmtKind::Return(None)));
}

#[test]
fn test_regex_and_division() {
    let expr = parse_expression("a / b / c", false).unwrap();
    assert!(matches!(expr.kind, ExprKind::Binary { op: BinaryOp::Div, .. }));
    let expr = parse_expression("/a+/g.test(s)", false).unwrap();
    assert!(matches!(expr.kind, ExprKind::Call { .. }));
}

#[test]
fn test_templates() {
    let expr = parse_expression("tag`a${b}c${d}`", false).unwrap();
    let ExprKind::TaggedTemplate { quasi, .. } = expr.kind else {
        panic!("expected tagged template");
    };
    assert_eq!(quasi.quasis.len(), 3);
    assert_eq!(quasi.exprs.len(), 2);
}

#[test]
fn test_classes() {
    let output = parse_js(
        "class A extends B { #x = 1; static y; constructor(v) { super(); this.#x = v } get x() { return this.#x } static { A.y = 2 } }",
    );
    let StmtKind::Class(class) = &output.module.body[0].kind else {
        panic!("expected class");
    };
    assert!(class.super_class.is_some());
    assert_eq!(class.members.len(), 5);
    assert!(matches!(class.members[2], ClassMember::Constructor(_)));
}

#[test]
fn test_control_flow() {
    let output = parse_js(
        "outer: for (const [k, v] of entries) { for (let i = 0; i < 3; i++) { if (i) continue outer; else break } }\n\
         for (const k in obj) {}\nwhile (x) x--\ndo { y++ } while (y < 3)\n\
         switch (z) { case 1: a(); break; default: b() }\n\
         try { f() } catch ({ message }) { g(message) } finally { h() }",
    );
    assert_eq!(output.module.body.len(), 6);
    assert!(matches!(output.module.body[0].kind, StmtKind::Labeled { .. }));
    assert!(matches!(output.module.body[1].kind, StmtKind::ForIn { .. }));
}

#[test]
fn test_imports_and_exports() {
    let output = parse_js(
        "import d, { a as b, c } from './m';\nimport * as ns from \"./n\";\nimport './side';\n\
         export const x = 1;\nexport default function () {}\nexport { x as y };\nexport * from './o';",
    );
    let StmtKind::Import(import) = &output.module.body[0].kind else {
        panic!("expected import");
    };
    assert_eq!(import.default.as_ref().map(|d| d.name.as_str()), Some("d"));
    assert_eq!(import.named.len(), 2);
    assert_eq!(import.named[0].imported, "a");
    assert_eq!(import.named[0].local.name, "b");
    assert_eq!(import.source.value, "./m");
    let StmtKind::Import(import) = &output.module.body[1].kind else {
        panic!("expected import");
    };
    assert_eq!(import.namespace.as_ref().map(|n| n.name.as_str()), Some("ns"));
    assert_eq!(output.module.body.len(), 7);
}

#[test]
fn test_import_attributes() {
    let output = parse_js("import { f } from './f' with { type: 'comptime' };\nimport { g } from './g';");
    let StmtKind::Import(tagged) = &output.module.body[0].kind else {
        panic!("expected import");
    };
    assert!(tagged.is_comptime());
    let StmtKind::Import(plain) = &output.module.body[1].kind else {
        panic!("expected import");
    };
    assert!(!plain.is_comptime());
}

#[test]
fn test_dynamic_import_and_await() {
    let output = parse(
        "const { a: b } = await import(\"./m\");\nreturn b;",
        ParseOptions::javascript().function_body(),
    )
    .unwrap();
    assert_eq!(output.module.body.len(), 2);
}

#[test]
fn test_return_outside_function_is_rejected() {
    let err = parse("return 1", ParseOptions::javascript()).unwrap_err();
    assert!(matches!(err, ParseError::IllegalReturn { offset: 0 }));
}

#[test]
fn test_invalid_assignment_target() {
    let err = parse("1 = 2", ParseOptions::javascript()).unwrap_err();
    assert!(matches!(err, ParseError::InvalidAssignmentTarget { .. }));
}

#[test]
fn test_error_offset() {
    let err = parse("let x = ;", ParseOptions::javascript()).unwrap_err();
    assert_eq!(err.offset(), 8);
}

#[test]
fn test_typescript_rejected_in_javascript_mode() {
    assert!(parse("let x: number = 1", ParseOptions::javascript()).is_err());
    assert!(parse("interface A {}", ParseOptions::javascript()).is_err());
}
