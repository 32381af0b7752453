//! Evaluation sandbox
//!
//! Each target becomes the body of an async function: one fragment per
//! dependency, then `return <target>;`. The body is checked as TypeScript,
//! type-erased, parsed again as JavaScript and only then run. Every step has
//! its own [`Phase`], so a failure says how far the target got.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, trace};

use super::analyzer::{AnalyzedTarget, SliceItem};
use super::context::{self, DeferQueue, Deferred, EvaluationContext};
use super::erase::erase_types;
use super::serialize::ResolvedValue;
use crate::backends::interpreter::builtins::json::quote;
use crate::backends::interpreter::{ErrorKind, Interpreter, JsResult};
use crate::frontend::module::{ModuleResolver, ResolveError, VirtualModule};
use crate::frontend::parser::ast::Module;
use crate::frontend::parser::{parse, ParseOptions};
use crate::frontend::program::{Bindings, DeclKind, ImportedName};
use crate::runtime::value::{CallArgs, Value};
use crate::util::diagnostic::{compile_error, format_source_error, Cause, ComptimeError, Phase, SourceErrorInput};
use crate::util::span::SourceFile;

/// Resolution results keyed by `(specifier, importer)`
pub type ResolvedModules = HashMap<(String, PathBuf), Result<PathBuf, ResolveError>>;

/// Piece of an evaluation program
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment<'a> {
    /// `const { imported: local } = await import("…");`
    Named {
        imported: &'a str,
        local: &'a str,
        module: &'a Path,
    },
    /// `const local = await import("…");`
    Namespace { local: &'a str, module: &'a Path },
    /// `const { default: local } = await import("…");`
    Default { local: &'a str, module: &'a Path },
    /// Declaration statement, copied from the source
    Statement(&'a str),
    /// `<keyword> <declarator>, <declarator>;` with declarators copied from the source
    Declarators { keyword: &'a str, declarators: Vec<&'a str> },
    /// `return <expr>;`
    Return(&'a str),
}

impl Fragment<'_> {
    pub fn render(&self) -> String {
        match self {
            Fragment::Named { imported, local, module } => {
                let key = if is_identifier(imported) {
                    imported.to_string()
                } else {
                    quote(imported)
                };
                format!("const {{ {}: {} }} = await import({});", key, local, module_specifier(module))
            }
            Fragment::Namespace { local, module } => {
                format!("const {} = await import({});", local, module_specifier(module))
            }
            Fragment::Default { local, module } => {
                format!("const {{ default: {} }} = await import({});", local, module_specifier(module))
            }
            Fragment::Statement(text) => strip_export(text).to_string(),
            Fragment::Declarators { keyword, declarators } => format!("{} {};", keyword, declarators.join(", ")),
            Fragment::Return(expr) => format!("return {};", expr),
        }
    }
}

/// Quoted specifier for a resolved module path
fn module_specifier(path: &Path) -> String {
    match VirtualModule::from_path(path) {
        Some(module) => quote(module.name()),
        None => quote(&path.to_string_lossy()),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '$' || c == '_' || unicode_ident::is_xid_start(c))
        && chars.all(|c| c == '$' || unicode_ident::is_xid_continue(c))
}

/// Statement text without a leading `export` or `export default`
fn strip_export(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("export") else {
        return text;
    };
    if !rest.starts_with(char::is_whitespace) {
        return text;
    }
    let rest = rest.trim_start();
    match rest.strip_prefix("default") {
        Some(after) if after.starts_with(char::is_whitespace) => after.trim_start(),
        _ => rest,
    }
}

/// Specifiers a target's imports need resolved, as `(specifier, importer)`
pub fn module_requests(
    file: &Path,
    bindings: &Bindings,
    target: &AnalyzedTarget,
) -> Vec<(String, PathBuf)> {
    target
        .slice
        .items
        .iter()
        .filter_map(|item| match item {
            SliceItem::Import(id) => match &bindings.decl(*id).kind {
                DeclKind::Import { source, .. } => Some((source.clone(), file.to_path_buf())),
                _ => None,
            },
            SliceItem::Statement(_) | SliceItem::Declarators { .. } => None,
        })
        .collect()
}

/// Resolve every request concurrently
pub async fn resolve_modules(
    resolver: Arc<dyn ModuleResolver>,
    requests: Vec<(String, PathBuf)>,
) -> ResolvedModules {
    let mut unique = requests;
    unique.sort();
    unique.dedup();

    let mut set = JoinSet::new();
    for (specifier, importer) in unique {
        let resolver = resolver.clone();
        set.spawn(async move {
            let result = resolver.resolve(&specifier, &importer).await;
            ((specifier, importer), result)
        });
    }

    let mut resolved = ResolvedModules::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((key, result)) => {
                trace!("resolved {} from {}: {:?}", key.0, key.1.display(), result);
                resolved.insert(key, result);
            }
            // a resolver that panicked leaves its request unresolved
            Err(e) => debug!("module resolution task failed: {}", e),
        }
    }
    resolved
}

/// A target ready to run
#[derive(Debug, Clone)]
pub struct PreparedTarget {
    pub file: SourceFile,
    pub target: AnalyzedTarget,
    /// Program as assembled from fragments
    pub program: String,
    /// Program after type erasure
    pub erased: Arc<str>,
    pub body: Arc<Module>,
}

impl PreparedTarget {
    /// Phase failure with the full report for this target
    pub fn error(
        &self,
        phase: Phase,
        message: &str,
        cause: Option<Cause>,
    ) -> ComptimeError {
        report(
            &self.file,
            &self.target,
            phase,
            message,
            Some(&self.program),
            Some(&self.erased),
            cause,
        )
    }
}

fn report(
    file: &SourceFile,
    target: &AnalyzedTarget,
    phase: Phase,
    message: &str,
    program: Option<&str>,
    erased: Option<&str>,
    cause: Option<Cause>,
) -> ComptimeError {
    let text = format_source_error(SourceErrorInput {
        file,
        target: target.target.span,
        statement: target.target.statement,
        error: message,
        program,
        erased,
    });
    ComptimeError::phase(phase, file.path(), target.target.span, &text, cause)
}

/// Assemble, check and erase the program of one target
pub fn prepare(
    file: &SourceFile,
    bindings: &Bindings,
    target: &AnalyzedTarget,
    modules: &ResolvedModules,
) -> Result<PreparedTarget, ComptimeError> {
    let fail = |phase: Phase, message: String, program: Option<&str>, erased: Option<&str>, cause: Option<Cause>| {
        report(file, target, phase, &message, program, erased, cause)
    };

    let mut fragments = Vec::with_capacity(target.slice.items.len() + 1);
    for item in &target.slice.items {
        let fragment = match item {
            SliceItem::Statement(span) => Fragment::Statement(file.source_text(*span)),
            SliceItem::Declarators { kind, declarators } => Fragment::Declarators {
                keyword: kind.keyword(),
                declarators: declarators.iter().map(|d| file.source_text(*d)).collect(),
            },
            SliceItem::Import(id) => {
                let decl = bindings.decl(*id);
                let DeclKind::Import { source, imported, .. } = &decl.kind else {
                    continue;
                };
                let key = (source.clone(), file.path().to_path_buf());
                let module = match modules.get(&key) {
                    Some(Ok(path)) => path.as_path(),
                    Some(Err(e)) => {
                        let message = format!("Could not resolve '{}' imported from {}: {}", source, file.name(), e);
                        return Err(fail(Phase::GetEvaluation, message, None, None, Some(Box::new(e.clone()))));
                    }
                    None => {
                        let message = format!("Could not resolve '{}' imported from {}", source, file.name());
                        return Err(fail(Phase::GetEvaluation, message, None, None, None));
                    }
                };
                match imported {
                    ImportedName::Named(name) => Fragment::Named {
                        imported: name,
                        local: &decl.name,
                        module,
                    },
                    ImportedName::Default => Fragment::Default {
                        local: &decl.name,
                        module,
                    },
                    ImportedName::Namespace => Fragment::Namespace {
                        local: &decl.name,
                        module,
                    },
                }
            }
        };
        fragments.push(fragment);
    }
    let expression = file.source_text(target.target.span);
    fragments.push(Fragment::Return(expression));
    let program = fragments.iter().map(Fragment::render).collect::<Vec<_>>().join("\n");

    let checked = parse(&program, ParseOptions::typescript().function_body()).map_err(|e| {
        fail(Phase::SyntaxCheck, e.to_string(), Some(&program), None, Some(Box::new(e)))
    })?;
    let erased = erase_types(&program, &checked).map_err(|e| {
        fail(Phase::EraseTypes, e.to_string(), Some(&program), None, Some(Box::new(e)))
    })?;
    let constructed = parse(&erased, ParseOptions::javascript().function_body()).map_err(|e| {
        fail(Phase::CreateFunction, e.to_string(), Some(&program), Some(&erased), Some(Box::new(e)))
    })?;

    Ok(PreparedTarget {
        file: file.clone(),
        target: target.clone(),
        program,
        erased: Arc::from(erased),
        body: Arc::new(constructed.module),
    })
}

/// Interpreter shared by all evaluations of one build
pub struct Sandbox {
    interp: Interpreter,
    queue: DeferQueue,
}

impl Sandbox {
    pub fn new(resolver: Arc<dyn ModuleResolver>) -> Self {
        let interp = Interpreter::new(resolver);
        install_comptime_module(&interp);
        Sandbox {
            interp,
            queue: DeferQueue::new(),
        }
    }

    pub fn defer_queue(&self) -> &DeferQueue {
        &self.queue
    }

    /// Run a prepared target and print its value as source text
    pub async fn evaluate(
        &self,
        prepared: &PreparedTarget,
    ) -> Result<String, ComptimeError> {
        debug!(
            "evaluating {}:{}:{}",
            prepared.file.name(),
            prepared.target.target.span.start,
            prepared.target.target.span.end
        );
        let ctx = EvaluationContext {
            source_file: prepared.file.path().to_path_buf(),
            position: prepared.target.target.span,
            defer_queue: self.queue.clone(),
        };
        let interp = &self.interp;
        let outcome = context::with_context(ctx, async {
            let value = interp
                .evaluate_body(prepared.erased.clone(), prepared.body.clone(), prepared.file.path())
                .await?;
            ResolvedValue::from_runtime(interp, &value).await
        })
        .await;

        let resolved = outcome.map_err(|throw| {
            let error = interp.describe(&throw);
            prepared.error(Phase::Evaluate, &error.stack_or_message(), Some(Box::new(error)))
        })?;
        resolved
            .to_source()
            .map_err(|e| prepared.error(Phase::Evaluate, &e.to_string(), Some(Box::new(e))))
    }

    /// Run every deferred thunk in registration order, including thunks
    /// registered while draining
    pub async fn drain_deferred(&self) -> Result<usize, ComptimeError> {
        let mut ran = 0;
        loop {
            let batch = self.queue.take();
            if batch.is_empty() {
                return Ok(ran);
            }
            for deferred in batch {
                self.run_deferred(&deferred).await?;
                ran += 1;
            }
        }
    }

    async fn run_deferred(
        &self,
        deferred: &Deferred,
    ) -> Result<(), ComptimeError> {
        let interp = &self.interp;
        let outcome = context::with_context(deferred.context(&self.queue), async {
            let value = interp.call(&deferred.thunk, Value::Undefined, Vec::new()).await?;
            interp.settle(value).await
        })
        .await;
        outcome.map(|_| ()).map_err(|throw| {
            let error = interp.describe(&throw);
            let report = format!(
                "A function passed to defer() at {}:{}:{} failed:\n\n{}",
                deferred.source_file.display(),
                deferred.position.start,
                deferred.position.end,
                error.stack_or_message()
            );
            ComptimeError::Phase {
                phase: Phase::Evaluate,
                file: deferred.source_file.clone(),
                target: deferred.position,
                message: compile_error(Phase::Evaluate, Some(&report)),
                cause: Some(Box::new(error)),
            }
        })
    }
}

/// Register `comptime.ts`: `comptime`, `getComptimeContext` and `defer`
fn install_comptime_module(interp: &Interpreter) {
    fn require_context(interp: &Interpreter) -> JsResult<EvaluationContext> {
        context::current().ok_or_else(|| interp.throw(ErrorKind::Error, compile_error(Phase::NoComptime, None)))
    }

    let comptime = interp.native_fn("comptime", 1, |interp, args: CallArgs| {
        require_context(interp)?;
        Ok(args.arg(0))
    });

    let get_context = interp.native_fn("getComptimeContext", 0, |interp, _args: CallArgs| {
        let ctx = require_context(interp)?;
        let position = interp.object_from(vec![
            ("start", Value::Number(ctx.position.start as f64)),
            ("end", Value::Number(ctx.position.end as f64)),
        ]);
        let result = interp.object_from(vec![
            ("sourceFile", Value::str(&ctx.source_file.to_string_lossy())),
            ("position", Value::Object(position)),
        ]);
        Ok(Value::Object(result))
    });

    let defer = interp.native_fn("defer", 1, |interp, args: CallArgs| {
        let ctx = require_context(interp)?;
        let thunk = args.arg(0);
        if !interp.is_callable(&thunk) {
            return Err(interp.type_error("defer() expects a function"));
        }
        ctx.defer_queue.push(Deferred {
            thunk,
            source_file: ctx.source_file.clone(),
            position: ctx.position,
        });
        Ok(Value::Undefined)
    });

    interp.register_virtual_module(
        VirtualModule::Comptime,
        vec![
            ("comptime".to_string(), Value::Object(comptime)),
            ("getComptimeContext".to_string(), Value::Object(get_context)),
            ("defer".to_string(), Value::Object(defer)),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comptime::analyzer::analyze;
    use crate::frontend::module::NodeResolver;
    use crate::frontend::program::ParsedFile;

    #[test]
    fn test_fragments_render() {
        let module = Path::new("/p/lib/m.ts");
        let named = Fragment::Named {
            imported: "sum",
            local: "add",
            module,
        };
        assert_eq!(named.render(), r#"const { sum: add } = await import("/p/lib/m.ts");"#);
        let odd = Fragment::Named {
            imported: "a-b",
            local: "ab",
            module,
        };
        assert_eq!(odd.render(), r#"const { "a-b": ab } = await import("/p/lib/m.ts");"#);
        let ns = Fragment::Namespace { local: "m", module };
        assert_eq!(ns.render(), r#"const m = await import("/p/lib/m.ts");"#);
        let virtual_path = VirtualModule::Comptime.path();
        let default = Fragment::Default {
            local: "d",
            module: &virtual_path,
        };
        assert_eq!(default.render(), r#"const { default: d } = await import("comptime.ts");"#);
        assert_eq!(Fragment::Statement("export default function f() {}").render(), "function f() {}");
        assert_eq!(Fragment::Statement("exported = 1;").render(), "exported = 1;");
        let declarators = Fragment::Declarators {
            keyword: "let",
            declarators: vec!["a: number = 1", "{ b } = c"],
        };
        assert_eq!(declarators.render(), "let a: number = 1, { b } = c;");
        assert_eq!(Fragment::Return("f(1)").render(), "return f(1);");
    }

    #[test]
    fn test_paths_are_quoted() {
        let module = Path::new("C:\\work\\\"odd\".ts");
        let ns = Fragment::Namespace { local: "m", module };
        assert_eq!(ns.render(), r#"const m = await import("C:\\work\\\"odd\".ts");"#);
    }

    /// Analyze `text` as `/virtual/main.ts` and prepare its first target
    fn prepare_first(text: &str) -> Result<PreparedTarget, ComptimeError> {
        let file = SourceFile::new("/virtual/main.ts", text);
        let output = parse(text, ParseOptions::typescript()).unwrap();
        let bindings = Bindings::bind(&output.module);
        let parsed = ParsedFile {
            module: output.module,
            bindings,
        };
        let analysis = analyze(&file, &parsed);
        let target = &analysis.targets[0];
        let mut modules = ResolvedModules::new();
        for key in module_requests(file.path(), &parsed.bindings, target) {
            let resolved = VirtualModule::from_specifier(&key.0).map(VirtualModule::path).ok_or(ResolveError::NotFound {
                specifier: key.0.clone(),
                importer: key.1.clone(),
                searched: Vec::new(),
            });
            modules.insert(key, resolved);
        }
        prepare(&file, &parsed.bindings, target, &modules)
    }

    const HEADER: &str = "import { comptime } from \"comptime.ts\" with { type: \"comptime\" };\n";

    #[test]
    fn test_prepare_erases_types() {
        let prepared = prepare_first(&format!("{}const n: number = 2;\nconst x = comptime(n as number * 3);\n", HEADER)).unwrap();
        assert_eq!(
            prepared.program,
            "const { comptime: comptime } = await import(\"comptime.ts\");\nconst n: number = 2;\nreturn comptime(n as number * 3);"
        );
        assert!(!prepared.erased.contains("number"));
    }

    #[test]
    fn test_unresolvable_import_is_get_evaluation() {
        let text = format!("{}import {{ missing }} from \"./missing\";\nconst x = comptime(missing());\n", HEADER);
        let err = prepare_first(&text).unwrap_err();
        assert_eq!(err.failed_phase(), Some(Phase::GetEvaluation));
        assert!(err.to_string().contains("./missing"));
    }

    #[test]
    fn test_unerasable_syntax_fails_erase_phase() {
        let text = format!(
            "{}class P {{ constructor(public x: number) {{}} }}\nconst x = comptime(new P(1).x);\n",
            HEADER
        );
        let err = prepare_first(&text).unwrap_err();
        assert_eq!(err.failed_phase(), Some(Phase::EraseTypes));
    }

    #[test]
    fn test_erasure_that_breaks_javascript_fails_create_function() {
        // the blanked return type leaves a line break before `=>`
        let text = format!("{}const x = comptime(((a: number):\n    number => a * 2)(21));\n", HEADER);
        let err = prepare_first(&text).unwrap_err();
        assert_eq!(err.failed_phase(), Some(Phase::CreateFunction));
        assert!(err.to_string().contains("Error occurred while creating a new Function."));
    }

    async fn evaluate(text: String) -> Result<(String, usize), ComptimeError> {
        let prepared = prepare_first(&text)?;
        Interpreter::run_isolated(async move {
            let sandbox = Sandbox::new(Arc::new(NodeResolver::new()));
            let value = sandbox.evaluate(&prepared).await?;
            let deferred = sandbox.drain_deferred().await?;
            Ok((value, deferred))
        })
        .await
        .unwrap_or_else(|e| panic!("evaluation thread failed: {}", e))
    }

    #[tokio::test]
    async fn test_evaluates_with_context() {
        let text = "import { comptime, getComptimeContext, defer } from \"comptime.ts\" with { type: \"comptime\" };\n\
                    const x = comptime((() => { defer(() => {}); return getComptimeContext().position.start; })());\n";
        let (value, deferred) = evaluate(text.to_string()).await.unwrap();
        let start = text.find("comptime((").unwrap();
        assert_eq!(value, start.to_string());
        assert_eq!(deferred, 1);
    }

    #[tokio::test]
    async fn test_promises_are_settled() {
        let text = format!(
            "{}const x = comptime(new Promise<number>(resolve => setTimeout(() => resolve(7), 5)));\n",
            HEADER
        );
        assert_eq!(evaluate(text).await.unwrap().0, "7");
    }

    #[tokio::test]
    async fn test_thrown_errors_fail_evaluation() {
        let text = format!("{}const x = comptime((() => {{ throw new RangeError(\"nope\"); }})());\n", HEADER);
        let err = evaluate(text).await.unwrap_err();
        assert_eq!(err.failed_phase(), Some(Phase::Evaluate));
        let message = err.to_string();
        assert!(message.contains("RangeError: nope"));
        assert!(message.contains("at /virtual/main.ts:"));
    }

    #[tokio::test]
    async fn test_failing_defer_is_reported() {
        let text = "import { comptime, defer } from \"comptime.ts\" with { type: \"comptime\" };\n\
                    const x = comptime((defer(() => { throw new Error(\"cleanup\"); }), 1));\n";
        let err = evaluate(text.to_string()).await.unwrap_err();
        assert!(err.to_string().contains("cleanup"));
    }

    #[tokio::test]
    async fn test_exports_throw_outside_a_context() {
        let messages = Interpreter::run_isolated(async {
            let sandbox = Sandbox::new(Arc::new(NodeResolver::new()));
            let mut messages = Vec::new();
            for name in ["comptime", "getComptimeContext", "defer"] {
                let source = format!("const m = await import(\"comptime.ts\");\nreturn m.{}(() => 1);", name);
                let body = parse(&source, ParseOptions::javascript().function_body()).unwrap().module;
                let outcome = sandbox
                    .interp
                    .evaluate_body(Arc::from(source.as_str()), Arc::new(body), Path::new("/virtual/main.js"))
                    .await;
                match outcome {
                    Ok(_) => messages.push(format!("{} returned", name)),
                    Err(throw) => messages.push(sandbox.interp.describe(&throw).stack_or_message()),
                }
            }
            messages
        })
        .await
        .unwrap();

        assert_eq!(messages.len(), 3);
        for message in &messages {
            assert!(message.contains("comptime() must be called in a comptime context"), "{}", message);
        }
    }
}
