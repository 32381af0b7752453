//! 模块路径解析器
//!
//! Maps an import specifier plus the importing file to an absolute path.
//!
//! # 搜索顺序
//!
//! 1. Built-in virtual modules (`comptime.ts`, `node:fs`, `node:path`)
//! 2. Relative and absolute paths, probing TypeScript and JavaScript extensions
//! 3. Bare package names through `node_modules/<pkg>/package.json`

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;

use thiserror::Error;

/// Pending resolution
pub type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<PathBuf, ResolveError>> + Send + 'a>>;

/// Extensions probed for extensionless specifiers, in order
pub const EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "mjs", "cjs", "json"];

/// Resolution failure
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("Cannot find module '{specifier}' imported from {}", importer.display())]
    NotFound {
        specifier: String,
        importer: PathBuf,
        /// Candidate paths that were probed
        searched: Vec<PathBuf>,
    },

    #[error("built-in module '{specifier}' is not available at compile time")]
    UnsupportedBuiltin { specifier: String },

    #[error("invalid package.json at {}: {message}", path.display())]
    InvalidPackage { path: PathBuf, message: String },
}

/// Resolves import specifiers to module paths
pub trait ModuleResolver: Send + Sync {
    /// Resolve `specifier` as imported from the file `importer`
    fn resolve<'a>(
        &'a self,
        specifier: &'a str,
        importer: &'a Path,
    ) -> ResolveFuture<'a>;
}

/// Modules provided by the evaluator itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualModule {
    /// `comptime.ts`: `comptime`, `getComptimeContext`, `defer`
    Comptime,
    Fs,
    FsPromises,
    Path,
}

const VIRTUAL_PREFIX: &str = "virtual:";

impl VirtualModule {
    pub const ALL: [VirtualModule; 4] = [
        VirtualModule::Comptime,
        VirtualModule::Fs,
        VirtualModule::FsPromises,
        VirtualModule::Path,
    ];

    /// Virtual module named by an import specifier
    pub fn from_specifier(specifier: &str) -> Option<Self> {
        match specifier {
            "comptime.ts" | "comptime" => Some(VirtualModule::Comptime),
            "node:fs" | "fs" => Some(VirtualModule::Fs),
            "node:fs/promises" | "fs/promises" => Some(VirtualModule::FsPromises),
            "node:path" | "path" => Some(VirtualModule::Path),
            _ => None,
        }
    }

    /// Virtual module a resolved path stands for
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.to_str()?.strip_prefix(VIRTUAL_PREFIX)?;
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            VirtualModule::Comptime => "comptime.ts",
            VirtualModule::Fs => "node:fs",
            VirtualModule::FsPromises => "node:fs/promises",
            VirtualModule::Path => "node:path",
        }
    }

    /// Path the module is registered under
    pub fn path(self) -> PathBuf {
        PathBuf::from(format!("{}{}", VIRTUAL_PREFIX, self.name()))
    }
}

/// Lexically normalize `.` and `..` components
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Node-style resolution against the file system
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeResolver;

impl NodeResolver {
    pub fn new() -> Self {
        NodeResolver
    }

    /// Resolve without suspending
    pub fn resolve_sync(
        &self,
        specifier: &str,
        importer: &Path,
    ) -> Result<PathBuf, ResolveError> {
        if let Some(module) = VirtualModule::from_specifier(specifier) {
            return Ok(module.path());
        }
        if specifier.starts_with("node:") {
            return Err(ResolveError::UnsupportedBuiltin {
                specifier: specifier.to_string(),
            });
        }
        let dir = importer.parent().unwrap_or(Path::new("."));
        let mut searched = Vec::new();

        let found = if is_path_specifier(specifier) {
            let base = normalize(&dir.join(specifier));
            self.probe_file(&base, &mut searched)
                .or_else(|| self.probe_directory(&base, &mut searched))
        } else {
            self.probe_packages(specifier, dir, &mut searched)?
        };

        found.ok_or_else(|| ResolveError::NotFound {
            specifier: specifier.to_string(),
            importer: importer.to_path_buf(),
            searched,
        })
    }

    /// `base` itself, `base.<ext>`, or the TypeScript source behind a `.js` specifier
    fn probe_file(
        &self,
        base: &Path,
        searched: &mut Vec<PathBuf>,
    ) -> Option<PathBuf> {
        let mut candidates = vec![base.to_path_buf()];
        let text = base.to_string_lossy();
        for (js, ts) in [(".js", ".ts"), (".js", ".tsx"), (".mjs", ".mts"), (".cjs", ".cts")] {
            if let Some(stem) = text.strip_suffix(js) {
                candidates.push(PathBuf::from(format!("{}{}", stem, ts)));
            }
        }
        candidates.extend(EXTENSIONS.iter().map(|ext| PathBuf::from(format!("{}.{}", text, ext))));

        for candidate in candidates {
            if candidate.is_file() {
                return Some(candidate);
            }
            searched.push(candidate);
        }
        None
    }

    /// `dir/package.json` entry point, then `dir/index.<ext>`
    fn probe_directory(
        &self,
        dir: &Path,
        searched: &mut Vec<PathBuf>,
    ) -> Option<PathBuf> {
        if !dir.is_dir() {
            return None;
        }
        if let Ok(Some(entry)) = self.package_entry(dir) {
            let entry = normalize(&dir.join(entry));
            if let Some(found) = self.probe_file(&entry, searched) {
                return Some(found);
            }
        }
        self.probe_file(&dir.join("index"), searched)
    }

    /// Walk up from `dir` looking in each `node_modules`
    fn probe_packages(
        &self,
        specifier: &str,
        dir: &Path,
        searched: &mut Vec<PathBuf>,
    ) -> Result<Option<PathBuf>, ResolveError> {
        let (package, subpath) = split_package(specifier);
        for ancestor in dir.ancestors() {
            let root = ancestor.join("node_modules").join(package);
            if !root.is_dir() {
                searched.push(root);
                continue;
            }
            if let Some(subpath) = subpath {
                let base = root.join(subpath);
                return Ok(self
                    .probe_file(&base, searched)
                    .or_else(|| self.probe_directory(&base, searched)));
            }
            if let Some(entry) = self.package_entry(&root)? {
                let entry = normalize(&root.join(entry));
                if let Some(found) = self
                    .probe_file(&entry, searched)
                    .or_else(|| self.probe_directory(&entry, searched))
                {
                    return Ok(Some(found));
                }
            }
            return Ok(self.probe_file(&root.join("index"), searched));
        }
        Ok(None)
    }

    /// `module`, `main` or `types` field of `dir/package.json`
    fn package_entry(
        &self,
        dir: &Path,
    ) -> Result<Option<String>, ResolveError> {
        let path = dir.join("package.json");
        let Ok(text) = std::fs::read_to_string(&path) else {
            return Ok(None);
        };
        let manifest: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| ResolveError::InvalidPackage {
                path: path.clone(),
                message: e.to_string(),
            })?;
        Ok(["module", "main", "types"]
            .iter()
            .find_map(|field| manifest.get(field).and_then(|v| v.as_str()))
            .map(str::to_string))
    }
}

impl ModuleResolver for NodeResolver {
    fn resolve<'a>(
        &'a self,
        specifier: &'a str,
        importer: &'a Path,
    ) -> ResolveFuture<'a> {
        Box::pin(async move { self.resolve_sync(specifier, importer) })
    }
}

/// Adapts a synchronous closure; `None` means the module was not found
pub struct FnResolver<F>(pub F);

impl<F> ModuleResolver for FnResolver<F>
where
    F: Fn(&str, &Path) -> Option<PathBuf> + Send + Sync,
{
    fn resolve<'a>(
        &'a self,
        specifier: &'a str,
        importer: &'a Path,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            if let Some(module) = VirtualModule::from_specifier(specifier) {
                return Ok(module.path());
            }
            (self.0)(specifier, importer).ok_or_else(|| ResolveError::NotFound {
                specifier: specifier.to_string(),
                importer: importer.to_path_buf(),
                searched: Vec::new(),
            })
        })
    }
}

fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == ".."
        || Path::new(specifier).is_absolute()
}

/// `@scope/pkg/sub/path` → (`@scope/pkg`, `Some("sub/path")`)
fn split_package(specifier: &str) -> (&str, Option<&str>) {
    let mut slashes = specifier.match_indices('/').map(|(i, _)| i);
    let split = if specifier.starts_with('@') {
        slashes.nth(1)
    } else {
        slashes.next()
    };
    match split {
        Some(i) => (&specifier[..i], Some(&specifier[i + 1..])),
        None => (specifier, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_virtual_modules() {
        let resolver = NodeResolver::new();
        let path = resolver.resolve_sync("comptime.ts", Path::new("/p/a.ts")).unwrap();
        assert_eq!(VirtualModule::from_path(&path), Some(VirtualModule::Comptime));
        assert_eq!(
            VirtualModule::from_path(&resolver.resolve_sync("node:path", Path::new("/p/a.ts")).unwrap()),
            Some(VirtualModule::Path)
        );
        assert!(matches!(
            resolver.resolve_sync("node:crypto", Path::new("/p/a.ts")),
            Err(ResolveError::UnsupportedBuiltin { .. })
        ));
    }

    #[test]
    fn test_relative_extension_probing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sum.ts"), "export const sum = 1;").unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/index.ts"), "").unwrap();
        let importer = dir.path().join("main.ts");

        let resolver = NodeResolver::new();
        assert_eq!(resolver.resolve_sync("./sum", &importer).unwrap(), dir.path().join("sum.ts"));
        assert_eq!(resolver.resolve_sync("./sum.js", &importer).unwrap(), dir.path().join("sum.ts"));
        assert_eq!(resolver.resolve_sync("./lib", &importer).unwrap(), dir.path().join("lib/index.ts"));

        match resolver.resolve_sync("./missing", &importer) {
            Err(ResolveError::NotFound { specifier, searched, .. }) => {
                assert_eq!(specifier, "./missing");
                assert!(!searched.is_empty());
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_package_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("node_modules/@acme/util");
        fs::create_dir_all(pkg.join("dist")).unwrap();
        fs::write(pkg.join("package.json"), r#"{ "main": "./dist/main.js" }"#).unwrap();
        fs::write(pkg.join("dist/main.js"), "").unwrap();
        fs::write(pkg.join("dist/extra.js"), "").unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        let importer = dir.path().join("src/main.ts");

        let resolver = NodeResolver::new();
        assert_eq!(resolver.resolve_sync("@acme/util", &importer).unwrap(), pkg.join("dist/main.js"));
        assert_eq!(
            resolver.resolve_sync("@acme/util/dist/extra", &importer).unwrap(),
            pkg.join("dist/extra.js")
        );
    }

    #[test]
    fn test_split_package() {
        assert_eq!(split_package("lodash"), ("lodash", None));
        assert_eq!(split_package("lodash/fp"), ("lodash", Some("fp")));
        assert_eq!(split_package("@a/b"), ("@a/b", None));
        assert_eq!(split_package("@a/b/c/d"), ("@a/b", Some("c/d")));
    }

    #[tokio::test]
    async fn test_fn_resolver() {
        let resolver = FnResolver(|spec: &str, _: &Path| (spec == "x").then(|| PathBuf::from("/x.ts")));
        assert_eq!(resolver.resolve("x", Path::new("/a.ts")).await.unwrap(), PathBuf::from("/x.ts"));
        assert!(resolver.resolve("y", Path::new("/a.ts")).await.is_err());
        assert!(resolver.resolve("comptime.ts", Path::new("/a.ts")).await.is_ok());
    }
}
