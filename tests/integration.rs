//! End-to-end builds over temporary projects

use std::fs;
use std::path::{Path, PathBuf};

use comptime::util::diagnostic::Phase;
use comptime::{apply_replacements, compute_replacements, comptime_compiler, ComptimeError, ComptimeOptions};
use comptime::{OutputMode, ProjectConfig};
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> (TempDir, ProjectConfig) {
    let dir = tempfile::tempdir().unwrap();
    for (name, text) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }
    let config = ProjectConfig::from_root(dir.path()).unwrap();
    (dir, config)
}

fn options(config: &ProjectConfig) -> ComptimeOptions {
    ComptimeOptions::new().with_project(config.clone())
}

fn output(
    config: &ProjectConfig,
    name: &str,
) -> String {
    fs::read_to_string(config.root.join("out").join(name)).unwrap()
}

fn span_of(
    text: &str,
    needle: &str,
) -> (usize, usize) {
    let start = text.rfind(needle).unwrap();
    (start, start + needle.len())
}

const BAR: &str = "export function sum(a: number, b: number): number {\n    return a + b;\n}\n";

#[tokio::test]
async fn test_sum_scenario() {
    let main = "import { sum } from \"./bar\" with { type: \"comptime\" };\nconsole.log(sum(1, 2));\n";
    let (_dir, config) = project(&[("main.ts", main), ("bar.ts", BAR)]);

    let written = comptime_compiler(&options(&config)).await.unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(output(&config, "main.ts"), "\nconsole.log(3);\n");
    assert_eq!(output(&config, "bar.ts"), BAR);
}

#[tokio::test]
async fn test_untagged_files_round_trip() {
    let text = "// keep me\nconst  odd =   [1,2 ,3 ] ;\r\nexport { odd };\n";
    let (_dir, config) = project(&[("a.ts", text), ("nested/deep/b.ts", "export type T = number;\n")]);

    let replacements = compute_replacements(&options(&config)).await.unwrap();
    assert!(replacements.is_empty());
    apply_replacements(&options(&config), &replacements).unwrap();
    assert_eq!(output(&config, "a.ts"), text);
    assert_eq!(output(&config, "nested/deep/b.ts"), "export type T = number;\n");
}

#[tokio::test]
async fn test_rebuilding_the_output_is_a_no_op() {
    let main = "import { sum } from \"./bar\" with { type: \"comptime\" };\nexport const three = sum(1, 2);\n";
    let (_dir, config) = project(&[("src/main.ts", main), ("src/bar.ts", BAR)]);
    comptime_compiler(&options(&config)).await.unwrap();

    let first = ProjectConfig::from_root(config.root.join("out")).unwrap();
    let replacements = compute_replacements(&options(&first)).await.unwrap();
    assert!(replacements.is_empty());
    comptime_compiler(&options(&first)).await.unwrap();
    assert_eq!(output(&first, "src/main.ts"), output(&config, "src/main.ts"));
    assert_eq!(output(&first, "src/main.ts"), "\nexport const three = 3;\n");
}

#[tokio::test]
async fn test_local_declarations_follow_the_target() {
    let main = "\
import { sum } from \"./bar\" with { type: \"comptime\" };
const base = 10;
function twice(n: number): number {
    return n * 2;
}
interface Unused { x: number }
export const total = sum(twice(base), 1);
";
    let (_dir, config) = project(&[("main.ts", main), ("bar.ts", BAR)]);
    comptime_compiler(&options(&config)).await.unwrap();

    let expected = main
        .replace("import { sum } from \"./bar\" with { type: \"comptime\" };", "")
        .replace("sum(twice(base), 1)", "21");
    assert_eq!(output(&config, "main.ts"), expected);
}

#[tokio::test]
async fn test_targets_run_once_per_build() {
    let counter = "let n = 0;\nexport function tick(a: number): number {\n    n += 1;\n    return n * 100 + a;\n}\n";
    let main = "\
import { tick } from \"./counter\" with { type: \"comptime\" };
const base = 2, first = tick(base);
const k = 1, v = tick(k);
";
    let (_dir, config) = project(&[("main.ts", main), ("counter.ts", counter)]);
    comptime_compiler(&options(&config)).await.unwrap();

    assert_eq!(output(&config, "main.ts"), "\nconst base = 2, first = 102;\nconst k = 1, v = 201;\n");
}

#[tokio::test]
async fn test_failing_target_aborts_the_build() {
    let main = "\
import { boom } from \"./bar\" with { type: \"comptime\" };
import { sum } from \"./sum\" with { type: \"comptime\" };
export const ok = sum(1, 1);
export const value = boom();
";
    let bar = "export function boom(): number {\n    throw new Error(\"kaboom\");\n}\n";
    let (_dir, config) = project(&[("main.ts", main), ("bar.ts", bar), ("sum.ts", BAR)]);

    let err = comptime_compiler(&options(&config)).await.unwrap_err();
    let (start, end) = span_of(main, "boom()");
    match &err {
        ComptimeError::Phase {
            phase,
            file,
            target,
            message,
            ..
        } => {
            assert_eq!(*phase, Phase::Evaluate);
            assert_eq!(file, &config.root.join("main.ts"));
            assert_eq!((target.start, target.end), (start, end));
            assert!(message.contains(&format!("{}:{}:{}", file.display(), start, end)));
            assert!(message.contains("kaboom"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!config.root.join("out").exists());
}

#[tokio::test]
async fn test_two_independent_tagged_imports() {
    let main = "\
import { b } from \"./b\" with { type: \"comptime\" };
import { a } from \"./a\" with { type: \"comptime\" };
export const x = a + b;
";
    let (_dir, config) = project(&[
        ("main.ts", main),
        ("a.ts", "export const a = 1;\n"),
        ("b.ts", "export const b = \"two\";\n"),
    ]);

    let replacements = compute_replacements(&options(&config)).await.unwrap();
    let list = &replacements[&config.root.join("main.ts")];
    assert_eq!(list.len(), 4);
    assert!(list.windows(2).all(|w| w[0].end <= w[1].start));

    apply_replacements(&options(&config), &replacements).unwrap();
    assert_eq!(output(&config, "main.ts"), "\n\nexport const x = 1 + \"two\";\n");
}

#[tokio::test]
async fn test_nested_targets_collapse_to_the_outermost() {
    let main = "\
import { double } from \"./m\" with { type: \"comptime\" };
export const v = double(double(2));
";
    let m = "export const double = (n: number) => n * 2;\n";
    let (_dir, config) = project(&[("main.ts", main), ("m.ts", m)]);

    let replacements = compute_replacements(&options(&config)).await.unwrap();
    let list = &replacements[&config.root.join("main.ts")];
    assert_eq!(list.len(), 2);
    let (start, end) = span_of(main, "double(double(2))");
    assert_eq!((list[1].start, list[1].end), (start, end));
    assert_eq!(list[1].replacement, "8");
}

#[tokio::test]
async fn test_parentheses_bound_the_target() {
    let main = "\
import { config } from \"./config\" with { type: \"comptime\" };
export const n = (config.items).length;
export const o = { config };
";
    let cfg = "export const config = { items: [\"a\", \"b\"] };\n";
    let (_dir, config) = project(&[("main.ts", main), ("config.ts", cfg)]);
    comptime_compiler(&options(&config)).await.unwrap();

    assert_eq!(
        output(&config, "main.ts"),
        "\nexport const n = ([\"a\", \"b\"]).length;\nexport const o = { config: ({\"items\": [\"a\", \"b\"]}) };\n"
    );
}

#[tokio::test]
async fn test_context_and_defer() {
    let marker = tempfile::tempdir().unwrap();
    let marker_path = marker.path().join("deferred.txt");
    let helpers = "\
import { getComptimeContext, defer } from \"comptime.ts\";
import * as fs from \"node:fs\";

export function where(): number[] {
    const { position } = getComptimeContext();
    return [position.start, position.end];
}

export function later(path: string): string {
    defer(() => fs.writeFileSync(path, \"done\"));
    return \"scheduled\";
}
";
    let main = format!(
        "import {{ where, later }} from \"./helpers\" with {{ type: \"comptime\" }};\nexport const at = where();\nexport const s = later({});\n",
        serde_json::to_string(&marker_path.display().to_string()).unwrap()
    );
    let (_dir, config) = project(&[("main.ts", &main), ("helpers.ts", helpers)]);

    let replacements = compute_replacements(&options(&config)).await.unwrap();
    assert_eq!(fs::read_to_string(&marker_path).unwrap(), "done");

    let list = &replacements[&config.root.join("main.ts")];
    let (start, end) = span_of(&main, "where()");
    assert_eq!(list[1].replacement, format!("[{}, {}]", start, end));
    assert_eq!(list[2].replacement, "\"scheduled\"");
}

#[tokio::test]
async fn test_unresolved_import_names_the_specifier() {
    let main = "import { x } from \"./missing\" with { type: \"comptime\" };\nexport const y = x;\n";
    let (_dir, config) = project(&[("main.ts", main)]);

    let err = compute_replacements(&options(&config)).await.unwrap_err();
    assert!(matches!(
        err,
        ComptimeError::Phase {
            phase: Phase::GetEvaluation,
            ..
        }
    ));
    let message = err.to_string();
    assert!(message.contains("./missing"));
    assert!(message.contains("main.ts"));
}

#[tokio::test]
async fn test_filters_and_changed_only() {
    let tagged = "import { sum } from \"../bar\" with { type: \"comptime\" };\nexport const s = sum(2, 2);\n";
    let (_dir, config) = project(&[
        ("app/one.ts", tagged),
        ("app/two.ts", tagged),
        ("app/plain.ts", "export const p = 1;\n"),
        ("bar.ts", BAR),
    ]);
    let root = config.root.clone();

    let only_one = options(&config).with_file_predicate(move |p: &Path| p.ends_with("one.ts"));
    let replacements = compute_replacements(&only_one).await.unwrap();
    assert_eq!(replacements.keys().collect::<Vec<_>>(), [&root.join("app/one.ts")]);

    let mut changed = options(&config).with_output_mode(OutputMode::ChangedOnly);
    changed.exclude = vec!["app/two.ts".to_string()];
    let written = comptime_compiler(&changed).await.unwrap();
    assert_eq!(written, [root.join("out/app/one.ts")]);
    assert_eq!(output(&config, "app/one.ts"), "\nexport const s = 4;\n");
}

#[tokio::test]
async fn test_custom_resolver() {
    let main = "import { sum } from \"@lib/bar\" with { type: \"comptime\" };\nexport const s = sum(20, 22);\n";
    let (_dir, config) = project(&[("main.ts", main), ("lib/bar.ts", BAR)]);
    let lib = config.root.join("lib");

    let resolver = comptime::FnResolver(move |specifier: &str, _importer: &Path| -> Option<PathBuf> {
        specifier.strip_prefix("@lib/").map(|rest| lib.join(format!("{}.ts", rest)))
    });
    let opts = options(&config).with_resolver(std::sync::Arc::new(resolver));
    comptime_compiler(&opts).await.unwrap();
    assert_eq!(output(&config, "main.ts"), "\nexport const s = 42;\n");
}
