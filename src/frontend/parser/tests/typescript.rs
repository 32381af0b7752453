//! TypeScript syntax: strip spans and unerasable constructs

use super::*;
use crate::frontend::parser::{parse, ParseOptions};

#[test]
fn test_annotations_are_stripped() {
    let source = "const x: number = 1;\nfunction f(a: string, b?: Map<string, number[]>): void {}";
    let output = parse_ts(source);
    let spans = stripped(source, &output);
    assert!(spans.contains(&": number"));
    assert!(spans.contains(&": string"));
    assert!(spans.contains(&"?"));
    assert!(spans.contains(&": Map<string, number[]>"));
    assert!(spans.contains(&": void"));
}

#[test]
fn test_erased_text() {
    assert_erases("let a: Array<Array<number>> = [];", "let a = [];");
    assert_erases("const v = x as unknown as string;", "const v = x ;");
    assert_erases("const v = <any>x;", "const v = x;");
    assert_erases("const n = y!.z;", "const n = y.z;");
    assert_erases("const s = {} satisfies object;", "const s = {} ;");
    assert_erases("const r = f<string>(1);", "const r = f(1);");
    assert_erases("const g = <T,>(v: T): T => v;", "const g = (v) => v;");
}

#[test]
fn test_generic_call_vs_comparison() {
    assert_erases("const b = a < c && d > (e);", "const b = a < c && d > (e);");
    let output = parse_ts("const b = a < c;");
    assert!(output.type_spans.is_empty());
}

#[test]
fn test_type_declarations_are_stripped() {
    let source = "interface A { x: number }\ntype B<T> = T | null;\nexport type { A };\nconst c = 1;";
    assert_erases(source, "const c = 1;");
    let output = parse_ts(source);
    assert!(matches!(output.module.body[0].kind, StmtKind::TypeDecl(_)));
    assert!(matches!(output.module.body[1].kind, StmtKind::TypeDecl(_)));
}

#[test]
fn test_type_only_imports() {
    assert_erases(
        "import type { A } from './a';\nimport { type B } from './b';\nimport { type C, d } from './c';",
        "import { d } from './c';",
    );
    let output = parse_ts("import { type C, d } from './c';");
    let StmtKind::Import(import) = &output.module.body[0].kind else {
        panic!("expected import");
    };
    assert!(import.named[0].type_only);
    assert!(!import.named[1].type_only);
}

#[test]
fn test_declare_and_overloads() {
    let source = "declare const x: number;\ndeclare function g(): void;\nfunction f(a: string): string;\nfunction f(a: any) { return a }";
    assert_erases(source, "function f(a ) { return a }");
}

#[test]
fn test_class_members() {
    let source = "abstract class A<T> extends B<T> implements C { private readonly x: number = 1; abstract m(): void; declare y: string; [k: string]: any; constructor() { super() } }";
    assert_erases(source, "class A extends B { x = 1; constructor() { super() } }");
}

#[test]
fn test_unerasable_constructs() {
    let output = parse_ts("class A { constructor(private x: number) {} }");
    assert_eq!(output.unerasable.len(), 1);
    assert_eq!(output.unerasable[0].construct, "parameter property");

    let output = parse_ts("@sealed class A {}");
    assert_eq!(output.unerasable[0].construct, "decorator");

    let output = parse_ts("namespace N { export const x = 1 }");
    assert_eq!(output.unerasable[0].construct, "namespace");

    let output = parse_ts("namespace T { export type X = number }");
    assert!(output.unerasable.is_empty());
}

#[test]
fn test_enums() {
    let output = parse_ts("enum E { A, B = 5, C }\nconst enum F { X = 'x' }");
    let StmtKind::Enum(e) = &output.module.body[0].kind else {
        panic!("expected enum");
    };
    assert_eq!(e.name.name, "E");
    assert_eq!(e.members.len(), 3);
    assert!(e.members[1].init.is_some());
    let StmtKind::Enum(f) = &output.module.body[1].kind else {
        panic!("expected enum");
    };
    assert!(f.is_const);
}

#[test]
fn test_arrow_with_return_type_in_conditional() {
    let output = parse_ts("const r = ok ? (a) : b;");
    assert_eq!(output.module.body.len(), 1);
}

#[test]
fn test_function_body_mode() {
    let output = parse(
        "const { default: d } = await import(\"./m\");\nreturn d as number;",
        ParseOptions::typescript().function_body(),
    )
    .unwrap();
    assert_eq!(output.module.body.len(), 2);
    assert_eq!(output.type_spans.len(), 1);
}
