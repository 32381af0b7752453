//! Project configuration
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Environment variables (COMPTIME_OUTDIR)
//! 3. Project-level (comptime.toml next to tsconfig.json)
//! 4. Default values
//! ```
//!
//! The file set itself comes from `tsconfig.json` (`files`, `include`,
//! `exclude`, `extends`), read as JSONC.

pub mod glob;
pub mod jsonc;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

pub use glob::{FileFilter, Glob};

use crate::frontend::module::resolver::normalize;

/// Environment variable overriding the output directory
pub const OUTDIR_ENV: &str = "COMPTIME_OUTDIR";

/// Name of the project-level settings file
pub const SETTINGS_FILE: &str = "comptime.toml";

/// Name searched for when no tsconfig is given
pub const TSCONFIG_FILE: &str = "tsconfig.json";

/// Output directory below the project root when nothing else is configured
pub const DEFAULT_OUTDIR: &str = "out";

/// Directories tsconfig excludes when no `exclude` is given
const DEFAULT_EXCLUDE: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

/// Longest `extends` chain followed
const MAX_EXTENDS_DEPTH: usize = 16;

const TS_EXTENSIONS: &[&str] = &["ts", "mts", "cts"];
const JS_EXTENSIONS: &[&str] = &["js", "mjs", "cjs"];

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find a {TSCONFIG_FILE} in {} or any parent directory", start.display())]
    NotFound { start: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {SETTINGS_FILE} at {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },

    #[error("invalid glob '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// `comptime.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComptimeSettings {
    /// Output directory, relative to the project root
    pub outdir: Option<PathBuf>,
    /// Restrict rewriting to files matching these globs
    pub include: Vec<String>,
    /// Skip files matching these globs
    pub exclude: Vec<String>,
    /// Only write files that changed
    pub changed_only: bool,
}

impl ComptimeSettings {
    /// Settings of the project rooted at `dir`; defaults when there is no file
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(SETTINGS_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        toml::from_str(&text).map_err(|source| ConfigError::Toml { path, source })
    }
}

/// A TypeScript project: where it lives and which files belong to it
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Directory of the tsconfig, or the directory the project was created for
    pub root: PathBuf,
    /// The tsconfig the project was read from
    pub tsconfig: Option<PathBuf>,
    /// Explicitly listed files (absolute)
    pub files: Vec<PathBuf>,
    /// File set patterns; without include patterns only `files` belong to the project
    pub filter: FileFilter,
    /// `compilerOptions.allowJs`
    pub allow_js: bool,
    /// `compilerOptions.outDir` (absolute)
    pub ts_outdir: Option<PathBuf>,
    /// `comptime.toml` next to the tsconfig
    pub settings: ComptimeSettings,
}

impl ProjectConfig {
    /// Project of every TypeScript file below `root`, without a tsconfig
    pub fn from_root(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = normalize(&root.into());
        let exclude: Vec<String> = DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect();
        Ok(ProjectConfig {
            filter: FileFilter::new(&root, &["**/*".to_string()], &exclude)?,
            settings: ComptimeSettings::load(&root)?,
            root,
            tsconfig: None,
            files: Vec::new(),
            allow_js: false,
            ts_outdir: None,
        })
    }

    /// Read a tsconfig, following `extends`
    pub fn from_tsconfig(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = absolute(path.as_ref());
        let root = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("/"));
        let raw = RawTsConfig::read(&path, 0)?;
        tracing::debug!(tsconfig = %path.display(), "loaded project configuration");

        let ts_outdir = raw.out_dir.clone();
        let include = match (&raw.include, &raw.files) {
            (Some(include), _) => include.clone(),
            // an explicit file list without `include` means just those files
            (None, Some(_)) => Vec::new(),
            (None, None) => vec![Pattern::new(&root, "**/*")],
        };
        let exclude = match &raw.exclude {
            Some(exclude) => exclude.clone(),
            None => {
                let mut exclude: Vec<Pattern> = DEFAULT_EXCLUDE.iter().map(|d| Pattern::new(&root, d)).collect();
                if let Some(out) = &ts_outdir {
                    exclude.push(Pattern::new(out, "."));
                }
                exclude
            }
        };

        let filter = FileFilter {
            include: include.iter().map(Pattern::include).collect::<Result<_, _>>()?,
            exclude: exclude.iter().map(Pattern::exclude).collect::<Result<_, _>>()?,
        };

        Ok(ProjectConfig {
            settings: ComptimeSettings::load(&root)?,
            files: raw.files.unwrap_or_default(),
            filter,
            allow_js: raw.allow_js.unwrap_or(false),
            ts_outdir,
            tsconfig: Some(path),
            root,
        })
    }

    /// Find the nearest tsconfig from `start` upwards and read it
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let start = absolute(start.as_ref());
        let found = start.ancestors().map(|dir| dir.join(TSCONFIG_FILE)).find(|p| p.is_file());
        match found {
            Some(path) => Self::from_tsconfig(path),
            None => Err(ConfigError::NotFound { start }),
        }
    }

    /// Output directory: `cli` > `COMPTIME_OUTDIR` > `comptime.toml` > `<root>/out`
    pub fn resolve_outdir(
        &self,
        cli: Option<&Path>,
    ) -> PathBuf {
        let env = std::env::var_os(OUTDIR_ENV).filter(|v| !v.is_empty()).map(PathBuf::from);
        let chosen = cli
            .map(Path::to_path_buf)
            .or(env)
            .or_else(|| self.settings.outdir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTDIR));
        normalize(&self.root.join(chosen))
    }

    /// Whether `path` is a source file by extension
    pub fn is_source_path(
        &self,
        path: &Path,
    ) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        TS_EXTENSIONS.contains(&ext) || (self.allow_js && JS_EXTENSIONS.contains(&ext))
    }

    /// Every file of the project, sorted, never descending into `skip` directories
    pub fn source_files(
        &self,
        skip: &[PathBuf],
    ) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = self.files.iter().filter(|f| f.is_file()).cloned().collect();

        // one walk per include base, skipping bases inside another
        let mut bases: Vec<&Path> = self.filter.include.iter().map(Glob::base).collect();
        bases.sort();
        bases.dedup();
        let bases: Vec<&Path> = bases
            .iter()
            .filter(|b| !bases.iter().any(|other| other != *b && b.starts_with(other)))
            .copied()
            .collect();

        for base in bases {
            let walker = WalkDir::new(base).follow_links(false).into_iter().filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let path = entry.path();
                !(entry.file_name() == "node_modules" || skip.iter().any(|s| s == path) || self.filter.excludes_dir(path))
            });
            for entry in walker.filter_map(|e| e.ok()) {
                let path = entry.path();
                if entry.file_type().is_file() && self.is_source_path(path) && self.filter.is_match(path) {
                    out.push(path.to_path_buf());
                }
            }
        }

        out.sort();
        out.dedup();
        out
    }
}

/// A pattern with the directory it is relative to
#[derive(Debug, Clone)]
struct Pattern {
    base: PathBuf,
    glob: String,
}

impl Pattern {
    fn new(
        base: &Path,
        glob: &str,
    ) -> Self {
        Pattern {
            base: base.to_path_buf(),
            glob: glob.to_string(),
        }
    }

    fn include(&self) -> Result<Glob, ConfigError> {
        Glob::include(&self.base, &self.glob)
    }

    fn exclude(&self) -> Result<Glob, ConfigError> {
        Glob::exclude(&self.base, &self.glob)
    }
}

/// The fields of a tsconfig chain that matter here, with `extends` applied
#[derive(Debug, Default)]
struct RawTsConfig {
    files: Option<Vec<PathBuf>>,
    include: Option<Vec<Pattern>>,
    exclude: Option<Vec<Pattern>>,
    allow_js: Option<bool>,
    out_dir: Option<PathBuf>,
}

impl RawTsConfig {
    fn read(
        path: &Path,
        depth: usize,
    ) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let value: serde_json::Value = serde_json::from_str(&jsonc::strip(&text)).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let invalid = |message: String| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        };
        if !value.is_object() {
            return Err(invalid("expected a JSON object".into()));
        }
        let dir = path.parent().unwrap_or(Path::new("/"));

        let strings = |key: &str| -> Result<Option<Vec<String>>, ConfigError> {
            match value.get(key) {
                None | Some(serde_json::Value::Null) => Ok(None),
                Some(serde_json::Value::Array(items)) => items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string).ok_or_else(|| invalid(format!("'{}' must list strings", key))))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Some),
                Some(_) => Err(invalid(format!("'{}' must be an array", key))),
            }
        };

        let mut config = RawTsConfig {
            files: strings("files")?.map(|f| f.iter().map(|f| normalize(&dir.join(f))).collect()),
            include: strings("include")?.map(|p| p.iter().map(|g| Pattern::new(dir, g)).collect()),
            exclude: strings("exclude")?.map(|p| p.iter().map(|g| Pattern::new(dir, g)).collect()),
            ..Default::default()
        };
        if let Some(options) = value.get("compilerOptions") {
            config.allow_js = options.get("allowJs").and_then(|v| v.as_bool());
            config.out_dir = options
                .get("outDir")
                .and_then(|v| v.as_str())
                .map(|out| normalize(&dir.join(out)));
        }

        match value.get("extends") {
            None => {}
            Some(serde_json::Value::String(base)) => {
                if depth >= MAX_EXTENDS_DEPTH {
                    return Err(invalid("'extends' chain is too deep".into()));
                }
                let base_path = extends_path(dir, base).ok_or_else(|| invalid(format!("cannot find base config '{}'", base)))?;
                let parent = Self::read(&base_path, depth + 1)?;
                config.inherit(parent);
            }
            Some(_) => return Err(invalid("'extends' must be a string".into())),
        }
        Ok(config)
    }

    /// Fill fields this config leaves unset from its base
    fn inherit(
        &mut self,
        base: RawTsConfig,
    ) {
        self.files = self.files.take().or(base.files);
        self.include = self.include.take().or(base.include);
        self.exclude = self.exclude.take().or(base.exclude);
        self.allow_js = self.allow_js.or(base.allow_js);
        self.out_dir = self.out_dir.take().or(base.out_dir);
    }
}

/// File an `extends` value refers to; package bases are looked up in `node_modules`
fn extends_path(
    dir: &Path,
    base: &str,
) -> Option<PathBuf> {
    let candidates: Vec<PathBuf> = if base.starts_with('.') || Path::new(base).is_absolute() {
        let path = normalize(&dir.join(base));
        vec![path.clone(), path.with_extension("json")]
    } else {
        dir.ancestors()
            .map(|d| d.join("node_modules").join(base))
            .flat_map(|p| [p.clone(), p.join(TSCONFIG_FILE), p.with_extension("json")])
            .collect()
    };
    candidates.into_iter().find(|p| p.is_file())
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize(&cwd.join(path)),
        Err(_) => normalize(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(
        dir: &Path,
        name: &str,
        text: &str,
    ) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_default_include_and_exclude() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, "tsconfig.json", "{ // project\n \"compilerOptions\": { \"outDir\": \"dist\", },\n}");
        write(root, "src/a.ts", "");
        write(root, "src/b.d.ts", "");
        write(root, "src/c.js", "");
        write(root, "dist/a.ts", "");
        write(root, "node_modules/p/index.ts", "");

        let config = ProjectConfig::from_tsconfig(root.join("tsconfig.json")).unwrap();
        let files: Vec<PathBuf> = config.source_files(&[]);
        let names: Vec<String> = files
            .iter()
            .map(|f| f.strip_prefix(&config.root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, ["src/a.ts", "src/b.d.ts"]);
    }

    #[test]
    fn test_explicit_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, "tsconfig.json", r#"{ "files": ["main.ts"] }"#);
        write(root, "main.ts", "");
        write(root, "other.ts", "");
        let config = ProjectConfig::from_tsconfig(root.join("tsconfig.json")).unwrap();
        let files = config.source_files(&[]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.ts"));
    }

    #[test]
    fn test_extends_inherits_include() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, "base.json", r#"{ "include": ["lib"], "compilerOptions": { "allowJs": true } }"#);
        write(root, "app/tsconfig.json", r#"{ "extends": "../base.json" }"#);
        write(root, "lib/x.js", "");
        write(root, "app/y.ts", "");
        let config = ProjectConfig::from_tsconfig(root.join("app/tsconfig.json")).unwrap();
        assert!(config.allow_js);
        let files = config.source_files(&[]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("lib/x.js"));
    }

    #[test]
    fn test_discover_walks_up() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, "tsconfig.json", "{}");
        write(root, "a/b/c.ts", "");
        let config = ProjectConfig::discover(root.join("a/b")).unwrap();
        assert_eq!(config.root, normalize(root));
        assert!(matches!(
            ProjectConfig::discover("/nonexistent-comptime-dir/x"),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_settings_and_outdir_precedence() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, "comptime.toml", "outdir = \"build\"\nchanged_only = true\n");
        let config = ProjectConfig::from_root(root).unwrap();
        assert!(config.settings.changed_only);
        assert_eq!(config.resolve_outdir(Some(Path::new("cli"))), normalize(&root.join("cli")));
        if std::env::var_os(OUTDIR_ENV).is_none() {
            assert_eq!(config.resolve_outdir(None), normalize(&root.join("build")));
        }
    }

    #[test]
    fn test_unknown_setting_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "comptime.toml", "outdri = \"x\"\n");
        assert!(matches!(ComptimeSettings::load(tmp.path()), Err(ConfigError::Toml { .. })));
    }
}
