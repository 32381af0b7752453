//! Module loading and linking
//!
//! Modules are loaded once per interpreter and keyed by resolved path. An ES
//! module is linked before it runs: every static import is loaded (and
//! evaluated) first, then bound into the module scope as a live binding that
//! reads through to the exporting module. TypeScript sources are erased
//! before parsing. JSON files and CommonJS scripts are supported in a minimal
//! form; virtual modules are registered by the host.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;

use super::env::{Frame, Lookup};
use super::exec::DEFAULT_EXPORT;
use super::{BoxFuture, Cx, Env, ErrorKind, Interpreter, JsResult, Throw};
use crate::comptime::erase::erase_types;
use crate::frontend::module::resolver::VirtualModule;
use crate::frontend::parser::ast::{ExportDecl, Module, Stmt, StmtKind};
use crate::frontend::parser::{parse, ParseOptions};
use crate::frontend::program::bindings::pattern_idents;
use crate::runtime::value::{Obj, Object, ObjectKind, Property, PropertyKey, Slot, Value};

/// Where an exported name reads its value from
#[derive(Clone)]
enum ExportTarget {
    Binding { env: Env, name: Arc<str> },
    Namespace(Obj),
}

enum ModuleState {
    Linking,
    Evaluated,
    Failed(Value),
}

/// A loaded module
pub struct ModuleRecord {
    pub path: PathBuf,
    namespace: Obj,
    exports: Mutex<IndexMap<String, ExportTarget>>,
    /// Modules re-exported with `export * from`
    star_sources: Mutex<Vec<Arc<ModuleRecord>>>,
    state: Mutex<ModuleState>,
    /// `module.exports` of a CommonJS module
    cjs_exports: Mutex<Option<Value>>,
}

impl ModuleRecord {
    fn new(
        path: PathBuf,
        namespace: Obj,
    ) -> Arc<Self> {
        Arc::new(ModuleRecord {
            path,
            namespace,
            exports: Mutex::new(IndexMap::new()),
            star_sources: Mutex::new(Vec::new()),
            state: Mutex::new(ModuleState::Linking),
            cjs_exports: Mutex::new(None),
        })
    }

    pub fn namespace(&self) -> &Obj {
        &self.namespace
    }

    fn export_binding(
        &self,
        exported: &str,
        env: &Env,
        local: &str,
    ) {
        self.exports.lock().insert(
            exported.to_string(),
            ExportTarget::Binding {
                env: env.clone(),
                name: Arc::from(local),
            },
        );
    }

    /// Follow explicit exports, then `export *` sources
    fn resolve_export(
        &self,
        name: &str,
        visited: &mut Vec<PathBuf>,
    ) -> Option<ExportTarget> {
        if visited.contains(&self.path) {
            return None;
        }
        visited.push(self.path.clone());
        if let Some(target) = self.exports.lock().get(name).cloned() {
            return Some(target);
        }
        if name == "default" {
            return None;
        }
        let sources = self.star_sources.lock().clone();
        sources.iter().find_map(|s| s.resolve_export(name, visited))
    }

    fn export_names(
        &self,
        visited: &mut Vec<PathBuf>,
        out: &mut Vec<String>,
    ) {
        if visited.contains(&self.path) {
            return;
        }
        visited.push(self.path.clone());
        out.extend(self.exports.lock().keys().cloned());
        let sources = self.star_sources.lock().clone();
        for source in sources {
            let mut names = Vec::new();
            source.export_names(visited, &mut names);
            out.extend(names.into_iter().filter(|n| n != "default"));
        }
    }
}

/// Every module loaded by one interpreter
#[derive(Default)]
pub struct ModuleRegistry {
    records: Mutex<HashMap<PathBuf, Arc<ModuleRecord>>>,
    virtual_exports: Mutex<HashMap<VirtualModule, Vec<(String, Value)>>>,
}

impl ModuleRegistry {
    /// Number of loaded modules
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn get(
        &self,
        path: &Path,
    ) -> Option<Arc<ModuleRecord>> {
        self.records.lock().get(path).cloned()
    }

    fn insert(
        &self,
        record: Arc<ModuleRecord>,
    ) {
        self.records.lock().insert(record.path.clone(), record);
    }
}

/// How a file is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    TypeScript,
    JavaScript,
    Json,
}

fn source_kind(path: &Path) -> SourceKind {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ts" | "tsx" | "mts" | "cts") => SourceKind::TypeScript,
        Some("json") => SourceKind::Json,
        _ => SourceKind::JavaScript,
    }
}

/// Scripts without import/export syntax that use the CommonJS globals
fn is_commonjs(
    path: &Path,
    module: &Module,
    source: &str,
) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some("cjs" | "cts") => true,
        Some("mjs" | "mts") => false,
        _ => {
            let has_module_syntax = module
                .body
                .iter()
                .any(|s| matches!(s.kind, StmtKind::Import(_) | StmtKind::Export(_)));
            !has_module_syntax
                && (source.contains("module.exports") || source.contains("exports.") || source.contains("require("))
        }
    }
}

/// Names bound by a declaration statement
fn declared_names(stmt: &Stmt) -> Vec<String> {
    match &stmt.kind {
        StmtKind::Var(decl) => {
            let mut idents = Vec::new();
            for d in &decl.decls {
                pattern_idents(&d.pattern, &mut idents);
            }
            idents.into_iter().map(|i| i.name.clone()).collect()
        }
        StmtKind::Function(f) => f.name.iter().map(|n| n.name.clone()).collect(),
        StmtKind::Class(c) => c.name.iter().map(|n| n.name.clone()).collect(),
        StmtKind::Enum(e) => vec![e.name.name.clone()],
        _ => Vec::new(),
    }
}

impl Interpreter {
    /// Provide the exports of a virtual module
    pub fn register_virtual_module(
        &self,
        module: VirtualModule,
        exports: Vec<(String, Value)>,
    ) {
        self.realm.modules.virtual_exports.lock().insert(module, exports);
    }

    /// `import(specifier)` from the file `referrer`: the module namespace
    pub async fn import_module(
        &self,
        specifier: &str,
        referrer: &Path,
    ) -> JsResult<Value> {
        let record = self.load_module(specifier, referrer).await?;
        Ok(Value::Object(record.namespace.clone()))
    }

    /// Resolve, load, link and evaluate a module, once
    fn load_module<'a>(
        &'a self,
        specifier: &'a str,
        referrer: &'a Path,
    ) -> BoxFuture<'a, JsResult<Arc<ModuleRecord>>> {
        Box::pin(async move {
            let path = if let Some(module) = VirtualModule::from_specifier(specifier) {
                module.path()
            } else if is_resolved_file(specifier).await {
                // already resolved by the host, e.g. the imports of an evaluation program
                PathBuf::from(specifier)
            } else {
                self.realm
                    .resolver
                    .resolve(specifier, referrer)
                    .await
                    .map_err(|e| self.throw(ErrorKind::Error, e.to_string()))?
            };

            if let Some(record) = self.realm.modules.get(&path) {
                if let ModuleState::Failed(error) = &*record.state.lock() {
                    return Err(Throw(error.clone()));
                }
                return Ok(record);
            }

            if let Some(module) = VirtualModule::from_path(&path) {
                return self.load_virtual(module, path);
            }

            debug!("loading module {}", path.display());
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| self.throw(ErrorKind::Error, format!("Cannot read module {}: {}", path.display(), e)))?;

            match source_kind(&path) {
                SourceKind::Json => self.load_json(path, &text),
                kind => {
                    let source = if kind == SourceKind::TypeScript {
                        let parsed = parse(&text, ParseOptions::typescript())
                            .map_err(|e| self.syntax_error(format!("{}: {}", path.display(), e)))?;
                        erase_types(&text, &parsed).map_err(|e| self.syntax_error(format!("{}: {}", path.display(), e)))?
                    } else {
                        text
                    };
                    let parsed = parse(&source, ParseOptions::javascript())
                        .map_err(|e| self.syntax_error(format!("{}: {}", path.display(), e)))?;
                    let source: Arc<str> = Arc::from(source);
                    let module = Arc::new(parsed.module);
                    if is_commonjs(&path, &module, &source) {
                        self.evaluate_commonjs(path, source, module).await
                    } else {
                        self.evaluate_module(path, source, module).await
                    }
                }
            }
        })
    }

    fn new_namespace(&self) -> Obj {
        let mut object = Object::new(None, ObjectKind::Ordinary);
        object.define(
            PropertyKey::Symbol(self.intrinsics().symbols.to_string_tag.clone()),
            Property::constant(Value::str("Module")),
        );
        Obj::new(object)
    }

    /// Publish every export name on the namespace object, sorted
    fn fill_namespace(
        &self,
        record: &ModuleRecord,
    ) {
        let mut names = Vec::new();
        record.export_names(&mut Vec::new(), &mut names);
        names.sort();
        names.dedup();
        for name in names {
            if record.namespace.lock().props.contains_key(&PropertyKey::from(name.as_str())) {
                continue;
            }
            let Some(target) = record.resolve_export(&name, &mut Vec::new()) else {
                continue;
            };
            let prop = match target {
                ExportTarget::Namespace(obj) => Property {
                    slot: Slot::Data(Value::Object(obj)),
                    enumerable: true,
                    writable: true,
                    configurable: false,
                },
                ExportTarget::Binding { env, name: local } => {
                    let exported = name.clone();
                    let getter = self.native_fn(&name, 0, move |interp, _| match env.lookup_local(&local) {
                        Lookup::Found(v) => Ok(v),
                        Lookup::Uninitialized => {
                            Err(interp.reference_error(format!("Cannot access '{}' before initialization", exported)))
                        }
                        Lookup::Missing => Ok(Value::Undefined),
                    });
                    Property::accessor(Some(getter), None, true)
                }
            };
            record.namespace.lock().define(name.as_str(), prop);
        }
    }

    fn finish_record(
        &self,
        record: &ModuleRecord,
        result: JsResult<()>,
    ) -> JsResult<()> {
        let mut state = record.state.lock();
        match result {
            Ok(()) => {
                *state = ModuleState::Evaluated;
                Ok(())
            }
            Err(e) => {
                *state = ModuleState::Failed(e.0.clone());
                Err(e)
            }
        }
    }

    fn load_virtual(
        &self,
        module: VirtualModule,
        path: PathBuf,
    ) -> JsResult<Arc<ModuleRecord>> {
        let exports = match self.realm.modules.virtual_exports.lock().get(&module).cloned() {
            Some(exports) => exports,
            None => super::builtins::node::module_exports(self, module).ok_or_else(|| {
                self.throw(ErrorKind::Error, format!("Cannot find module '{}'", module.name()))
            })?,
        };
        let record = ModuleRecord::new(path, self.new_namespace());
        let env = Env::root();
        for (name, value) in exports {
            env.declare(&name, value, false);
            record.export_binding(&name, &env, &name);
        }
        *record.state.lock() = ModuleState::Evaluated;
        self.fill_namespace(&record);
        self.realm.modules.insert(record.clone());
        Ok(record)
    }

    fn load_json(
        &self,
        path: PathBuf,
        text: &str,
    ) -> JsResult<Arc<ModuleRecord>> {
        let value = super::builtins::json::parse_json(self, text)
            .map_err(|e| self.syntax_error(format!("{}: {}", path.display(), self.describe(&e))))?;
        let record = ModuleRecord::new(path, self.new_namespace());
        let env = Env::root();
        env.declare(DEFAULT_EXPORT, value, false);
        record.export_binding("default", &env, DEFAULT_EXPORT);
        *record.state.lock() = ModuleState::Evaluated;
        self.fill_namespace(&record);
        self.realm.modules.insert(record.clone());
        Ok(record)
    }

    /// Link and run an ES module
    async fn evaluate_module(
        &self,
        path: PathBuf,
        source: Arc<str>,
        module: Arc<Module>,
    ) -> JsResult<Arc<ModuleRecord>> {
        let env = self
            .realm
            .global_env
            .with_frame(Frame::module(Some(Arc::new(path.clone()))));
        let record = ModuleRecord::new(path.clone(), self.new_namespace());

        for stmt in &module.body {
            let StmtKind::Export(export) = &stmt.kind else {
                continue;
            };
            match export {
                ExportDecl::Decl(inner) => {
                    for name in declared_names(inner) {
                        record.export_binding(&name, &env, &name);
                    }
                }
                ExportDecl::Default(_) => record.export_binding("default", &env, DEFAULT_EXPORT),
                ExportDecl::Named {
                    specifiers,
                    source: None,
                    type_only: false,
                } => {
                    for spec in specifiers.iter().filter(|s| !s.type_only) {
                        record.export_binding(&spec.exported, &env, &spec.local.name);
                    }
                }
                _ => {}
            }
        }
        self.fill_namespace(&record);
        // registered before linking so import cycles see the partial module
        self.realm.modules.insert(record.clone());

        let cx = Cx::new(env.clone(), source);
        let result = async {
            self.hoist_declarations(&module.body, &cx, true)?;
            self.link_imports(&record, &module, &env).await?;
            self.fill_namespace(&record);
            self.exec_stmts(&module.body, &cx).await?;
            Ok(())
        }
        .await;
        self.finish_record(&record, result)?;
        debug!("evaluated module {}", path.display());
        Ok(record)
    }

    /// Load every dependency and bind imported names
    async fn link_imports(
        &self,
        record: &ModuleRecord,
        module: &Module,
        env: &Env,
    ) -> JsResult<()> {
        let path = record.path.as_path();
        for stmt in &module.body {
            match &stmt.kind {
                StmtKind::Import(import) if !import.type_only => {
                    let dep = self.load_module(&import.source.value, path).await?;
                    if let Some(default) = &import.default {
                        self.bind_import(env, &default.name, &dep, "default")?;
                    }
                    if let Some(ns) = &import.namespace {
                        env.declare(&ns.name, Value::Object(dep.namespace.clone()), false);
                    }
                    for spec in import.named.iter().filter(|s| !s.type_only) {
                        self.bind_import(env, &spec.local.name, &dep, &spec.imported)?;
                    }
                }
                StmtKind::Export(ExportDecl::Named {
                    specifiers,
                    source: Some(source),
                    type_only: false,
                }) => {
                    let dep = self.load_module(&source.value, path).await?;
                    for spec in specifiers.iter().filter(|s| !s.type_only) {
                        let target = self.require_export(&dep, &spec.local.name)?;
                        record.exports.lock().insert(spec.exported.clone(), target);
                    }
                }
                StmtKind::Export(ExportDecl::All { alias, source }) => {
                    let dep = self.load_module(&source.value, path).await?;
                    match alias {
                        Some(alias) => {
                            record
                                .exports
                                .lock()
                                .insert(alias.clone(), ExportTarget::Namespace(dep.namespace.clone()));
                        }
                        None => record.star_sources.lock().push(dep),
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn require_export(
        &self,
        dep: &ModuleRecord,
        name: &str,
    ) -> JsResult<ExportTarget> {
        dep.resolve_export(name, &mut Vec::new()).ok_or_else(|| {
            self.syntax_error(format!(
                "The requested module '{}' does not provide an export named '{}'",
                dep.path.display(),
                name
            ))
        })
    }

    fn bind_import(
        &self,
        env: &Env,
        local: &str,
        dep: &ModuleRecord,
        imported: &str,
    ) -> JsResult<()> {
        match self.require_export(dep, imported)? {
            ExportTarget::Binding { env: module, name } => env.declare_import(local, module, &name),
            ExportTarget::Namespace(obj) => env.declare(local, Value::Object(obj), false),
        }
        Ok(())
    }

    /// Run a CommonJS script with `module`, `exports` and `require`
    async fn evaluate_commonjs(
        &self,
        path: PathBuf,
        source: Arc<str>,
        module: Arc<Module>,
    ) -> JsResult<Arc<ModuleRecord>> {
        let exports = self.new_object();
        let module_obj = self.new_object();
        module_obj.lock().insert("exports", Value::Object(exports.clone()));

        let referrer = Arc::new(path.clone());
        let env = self.realm.global_env.with_frame(Frame {
            this: Mutex::new(Some(Value::Object(exports.clone()))),
            referrer: Some(referrer.clone()),
            ..Frame::default()
        });
        let require = self.async_native_fn("require", 1, move |interp, args| {
            let referrer = referrer.clone();
            Box::pin(async move {
                let specifier = interp.to_string(&args.arg(0)).await?;
                let dep = interp.load_module(&specifier, &referrer).await?;
                let cjs = dep.cjs_exports.lock().clone();
                Ok(cjs.unwrap_or_else(|| Value::Object(dep.namespace.clone())))
            })
        });
        let dir = path.parent().map(|p| p.display().to_string()).unwrap_or_default();
        env.declare("module", Value::Object(module_obj.clone()), true);
        env.declare("exports", Value::Object(exports.clone()), true);
        env.declare("require", Value::Object(require), true);
        env.declare("__filename", Value::from(path.display().to_string()), true);
        env.declare("__dirname", Value::from(dir), true);

        let record = ModuleRecord::new(path.clone(), self.new_namespace());
        *record.cjs_exports.lock() = Some(Value::Object(exports));
        self.realm.modules.insert(record.clone());

        let cx = Cx::new(env, source);
        let result = async {
            self.hoist_declarations(&module.body, &cx, true)?;
            self.exec_stmts(&module.body, &cx).await?;
            let value = self.get_named(&Value::Object(module_obj.clone()), "exports").await?;
            *record.cjs_exports.lock() = Some(value.clone());

            let exports_env = Env::root();
            exports_env.declare(DEFAULT_EXPORT, value.clone(), false);
            record.export_binding("default", &exports_env, DEFAULT_EXPORT);
            if let Value::Object(obj) = &value {
                for key in self.own_enumerable_keys(obj) {
                    let Some(name) = key.as_str().map(str::to_string) else {
                        continue;
                    };
                    if name == "default" {
                        continue;
                    }
                    let v = self.get(&value, &key).await?;
                    exports_env.declare(&name, v, false);
                    record.export_binding(&name, &exports_env, &name);
                }
            }
            self.fill_namespace(&record);
            Ok(())
        }
        .await;
        self.finish_record(&record, result)?;
        Ok(record)
    }
}

/// Absolute path of an existing file
async fn is_resolved_file(specifier: &str) -> bool {
    Path::new(specifier).is_absolute()
        && tokio::fs::metadata(specifier)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind() {
        assert_eq!(source_kind(Path::new("/a/b.ts")), SourceKind::TypeScript);
        assert_eq!(source_kind(Path::new("/a/b.mts")), SourceKind::TypeScript);
        assert_eq!(source_kind(Path::new("/a/b.json")), SourceKind::Json);
        assert_eq!(source_kind(Path::new("/a/b.mjs")), SourceKind::JavaScript);
    }

    #[test]
    fn test_commonjs_detection() {
        let cjs = "module.exports = { a: 1 };";
        let parsed = parse(cjs, ParseOptions::javascript()).unwrap();
        assert!(is_commonjs(Path::new("a.js"), &parsed.module, cjs));
        assert!(!is_commonjs(Path::new("a.mjs"), &parsed.module, cjs));

        let esm = "export const a = 1;";
        let parsed = parse(esm, ParseOptions::javascript()).unwrap();
        assert!(!is_commonjs(Path::new("a.js"), &parsed.module, esm));
    }

    #[test]
    fn test_declared_names() {
        let parsed = parse("const { a, b: [c] } = x; function f() {} class K {}", ParseOptions::javascript()).unwrap();
        let names: Vec<String> = parsed.module.body.iter().flat_map(declared_names).collect();
        assert_eq!(names, vec!["a", "c", "f", "K"]);
    }
}
