//! Interpreter tests: whole programs evaluated as async function bodies

use std::path::Path;
use std::sync::Arc;

use super::builtins::console::inspect;
use super::Interpreter;
use crate::frontend::module::NodeResolver;
use crate::frontend::parser::{parse, ParseOptions};

/// Evaluate `source` and render the settled result, or the uncaught error's message
async fn run(source: &str) -> Result<String, String> {
    let source: Arc<str> = Arc::from(source);
    let outcome = Interpreter::run_isolated(async move {
        let output = parse(&source, ParseOptions::javascript().function_body()).map_err(|e| e.to_string())?;
        let interp = Interpreter::new(Arc::new(NodeResolver::new()));
        let body = Arc::new(output.module);
        match interp.evaluate_body(source, body, Path::new("/virtual/test.js")).await {
            Ok(value) => Ok(inspect(&interp, &value)),
            Err(throw) => Err(interp.describe(&throw).to_string()),
        }
    })
    .await;
    outcome.unwrap_or_else(|e| Err(e.to_string()))
}

async fn eval_ok(source: &str) -> String {
    run(source).await.unwrap_or_else(|e| panic!("{source:?} threw {e}"))
}

#[tokio::test]
async fn test_arithmetic_and_precedence() {
    assert_eq!(eval_ok("return 1 + 2 * 3").await, "7");
    assert_eq!(eval_ok("return 2 ** 10 - 24").await, "1000");
    assert_eq!(eval_ok("return '3' * '4'").await, "12");
    assert_eq!(eval_ok("return 0.1 + 0.2").await, "0.30000000000000004");
    assert_eq!(eval_ok("return -0").await, "-0");
}

#[tokio::test]
async fn test_closures_and_recursion() {
    let source = r#"
        function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
        const counter = () => { let n = 0; return () => ++n; };
        const next = counter();
        next(); next();
        return [fib(10), next()];
    "#;
    assert_eq!(eval_ok(source).await, "[ 55, 3 ]");
}

#[tokio::test]
async fn test_classes() {
    let source = r#"
        class Shape {
            static count = 0;
            constructor(side) { this.side = side; Shape.count++; }
            get area() { return this.side * this.side; }
            describe() { return `${this.constructor.name}:${this.area}`; }
        }
        class Square extends Shape {
            #tag = "sq";
            constructor() { super(3); }
            describe() { return super.describe() + "/" + this.#tag; }
        }
        new Shape(2);
        return [new Square().describe(), Shape.count];
    "#;
    assert_eq!(eval_ok(source).await, "[ 'Square:9/sq', 2 ]");
}

#[tokio::test]
async fn test_destructuring_and_spread() {
    let source = r#"
        const { a, ...rest } = { a: 1, b: 2, c: 3 };
        const [x, , y = 5] = [1, 2];
        const merged = { ...rest, d: 4 };
        return [a, Object.keys(merged).join(","), x, y, Math.max(...[4, 9, 2])];
    "#;
    assert_eq!(eval_ok(source).await, "[ 1, 'b,c,d', 1, 5, 9 ]");
}

#[tokio::test]
async fn test_template_literals() {
    let source = r#"
        const tag = (strings, ...values) => strings.raw.join("|") + values.join(",");
        const n = 2;
        return [`a${n}b`, tag`x${1}y${n}z`];
    "#;
    assert_eq!(eval_ok(source).await, "[ 'a2b', 'x|y|z1,2' ]");
}

#[tokio::test]
async fn test_microtask_ordering() {
    let source = r#"
        const log = [];
        const p = Promise.resolve().then(() => log.push("micro"));
        log.push("sync");
        await p;
        return log.join(",");
    "#;
    assert_eq!(eval_ok(source).await, "sync,micro");
}

#[tokio::test]
async fn test_timers_settle() {
    let source = r#"
        const order = [];
        setTimeout(() => order.push("late"), 10);
        setTimeout(() => order.push("early"), 1);
        await new Promise((resolve) => setTimeout(resolve, 20));
        return order.join(",");
    "#;
    assert_eq!(eval_ok(source).await, "early,late");
}

#[tokio::test]
async fn test_returned_promise_is_settled() {
    assert_eq!(eval_ok("return new Promise((r) => setTimeout(() => r(42), 5))").await, "42");
}

#[tokio::test]
async fn test_async_functions_and_combinators() {
    let source = r#"
        async function double(x) { await null; return x * 2; }
        const all = await Promise.all([double(1), double(2), 3]);
        const settled = await Promise.allSettled([Promise.reject(new Error("no")), double(5)]);
        return [all, settled.map((s) => s.status)];
    "#;
    assert_eq!(eval_ok(source).await, "[ [ 2, 4, 3 ], [ 'rejected', 'fulfilled' ] ]");
}

#[tokio::test]
async fn test_generators() {
    let source = r#"
        function* numbers() { yield 1; const got = yield 2; yield got * 10; return 4; }
        const it = numbers();
        const first = [it.next().value, it.next().value, it.next(5).value, it.next().done];
        function* inner() { yield "a"; yield "b"; }
        function* outer() { yield* inner(); yield "c"; }
        return [first, [...outer()]];
    "#;
    assert_eq!(eval_ok(source).await, "[ [ 1, 2, 50, true ], [ 'a', 'b', 'c' ] ]");
}

#[tokio::test]
async fn test_exceptions() {
    let source = r#"
        const seen = [];
        try { null.x; } catch (e) { seen.push(e instanceof TypeError); } finally { seen.push("finally"); }
        try { undefinedName; } catch (e) { seen.push(e.name); }
        return seen;
    "#;
    assert_eq!(eval_ok(source).await, "[ true, 'finally', 'ReferenceError' ]");
}

#[tokio::test]
async fn test_uncaught_error_message() {
    let err = run("throw new Error('boom')").await.unwrap_err();
    assert_eq!(err, "Error: boom");
    let err = run("throw 'plain'").await.unwrap_err();
    assert_eq!(err, "plain");
    let err = run("await Promise.reject(new RangeError('late'))").await.unwrap_err();
    assert_eq!(err, "RangeError: late");
}

#[tokio::test]
async fn test_call_depth_limit() {
    let source = r#"
        function down() { return down(); }
        try { down(); } catch (e) { return e instanceof RangeError; }
    "#;
    assert_eq!(eval_ok(source).await, "true");
}

#[tokio::test]
async fn test_never_settling_await_fails() {
    let err = run("await new Promise(() => {})").await.unwrap_err();
    assert!(err.contains("never settle"), "{err}");
}

#[tokio::test]
async fn test_loops_and_labels() {
    let source = r#"
        let total = 0;
        outer: for (let i = 0; i < 5; i++) {
            for (let j = 0; j < 5; j++) {
                if (j === 3) continue outer;
                if (i === 3) break outer;
                total += j;
            }
        }
        const m = new Map([["a", 1], ["b", 2]]);
        let sum = 0;
        for (const [, v] of m) sum += v;
        const keys = [];
        for (const k in { p: 1, q: 2 }) keys.push(k);
        let w = 0;
        do { w++; } while (w < 3);
        return [total, sum, keys.join(""), w];
    "#;
    assert_eq!(eval_ok(source).await, "[ 9, 3, 'pq', 3 ]");
}

#[tokio::test]
async fn test_builtin_library() {
    assert_eq!(eval_ok("return 'a-b-c'.split('-').map((s) => s.toUpperCase()).join('')").await, "ABC");
    assert_eq!(eval_ok(r"return '2024-01-02'.replace(/(\d+)-(\d+)-(\d+)/, '$3/$2/$1')").await, "02/01/2024");
    assert_eq!(eval_ok(r#"return JSON.stringify(JSON.parse('{"a":[1,2,{"b":null}]}'))"#).await, r#"{"a":[1,2,{"b":null}]}"#);
    assert_eq!(eval_ok("return [3, 1, 2].sort().concat([4]).reverse()").await, "[ 4, 3, 2, 1 ]");
    assert_eq!(eval_ok("return 2n ** 64n").await, "18446744073709551616n");
    assert_eq!(eval_ok("return (1234.5678).toFixed(2)").await, "1234.57");
    assert_eq!(eval_ok("return new Date(0).toISOString()").await, "1970-01-01T00:00:00.000Z");
    assert_eq!(eval_ok("return new Uint8Array([1, 256, -1])").await, "Uint8Array(3) [ 1, 0, 255 ]");
    assert_eq!(eval_ok("return new Set([1, 1, 2]).size").await, "2");
    assert_eq!(eval_ok("return Object.entries({ x: 1 })").await, "[ [ 'x', 1 ] ]");
}

#[tokio::test]
async fn test_reflect_and_random() {
    let source = r#"
        const o = { a: 1, b: 2 };
        const removed = Reflect.deleteProperty(o, "a");
        return [removed, "a" in o, Reflect.ownKeys(o)];
    "#;
    assert_eq!(eval_ok(source).await, "[ true, false, [ 'b' ] ]");
    let source = "return Array.from({ length: 50 }, () => Math.random()).every((r) => r >= 0 && r < 1)";
    assert_eq!(eval_ok(source).await, "true");
    assert_eq!(eval_ok("return new Date('2024-01-02T10:00:00+02:00').toUTCString()").await, "Tue, 02 Jan 2024 08:00:00 GMT");
}

#[tokio::test]
async fn test_optional_chaining_and_nullish() {
    let source = r#"
        const o = { a: null, f() { return 1; } };
        return [o.a?.b, o.a ?? "d", o.g?.(), o.f?.(), 0 || "x", 0 ?? "y"];
    "#;
    assert_eq!(eval_ok(source).await, "[ undefined, 'd', undefined, 1, 'x', 0 ]");
}

#[tokio::test]
async fn test_dynamic_import_of_host_module() {
    let source = r#"
        const { join, basename } = await import("node:path");
        return [join("a", "b", "../c"), basename("/x/y.ts", ".ts")];
    "#;
    assert_eq!(eval_ok(source).await, "[ 'a/c', 'y' ]");
}

#[tokio::test]
async fn test_syntax_error_is_reported() {
    assert!(run("return (").await.is_err());
}
