//! Compile-time evaluation
//!
//! The build runs in four stages:
//!
//! 1. analysis: tagged imports, targets and dependency slices per file
//!    ([`analyzer`], parallel)
//! 2. module resolution for every import a slice needs (concurrent)
//! 3. program assembly, syntax check and type erasure per target
//!    ([`sandbox`], parallel)
//! 4. evaluation, one target at a time in file then source order, on a
//!    dedicated interpreter thread; deferred thunks run after the last one
//!
//! The result is a [`Replacements`] map; [`apply_replacements`] writes the
//! rewritten project.

pub mod analyzer;
pub mod context;
pub mod erase;
pub mod rewrite;
pub mod sandbox;
pub mod serialize;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

pub use rewrite::{Replacement, Replacements};

use crate::backends::interpreter::Interpreter;
use crate::frontend::module::{ModuleResolver, NodeResolver};
use crate::frontend::program::Program;
use crate::util::config::{FileFilter, ProjectConfig};
use crate::util::diagnostic::ComptimeError;
use analyzer::FileAnalysis;
use rewrite::OutputPlan;
use sandbox::{PreparedTarget, Sandbox};

/// Predicate selecting the files to evaluate
pub type FilePredicate = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Which files [`apply_replacements`] writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Every project file, rewritten or copied unchanged
    #[default]
    All,
    /// Only files with at least one replacement
    ChangedOnly,
}

/// Where the project configuration comes from
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Nearest `tsconfig.json` at or above this directory
    Discover(PathBuf),
    /// This `tsconfig.json`
    Tsconfig(PathBuf),
    /// Already loaded
    Project(ProjectConfig),
}

impl Default for ConfigSource {
    fn default() -> Self {
        ConfigSource::Discover(PathBuf::from("."))
    }
}

/// Build options
#[derive(Clone, Default)]
pub struct ComptimeOptions {
    pub config: ConfigSource,
    /// Globs restricting the files evaluated and written, relative to the project root
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Evaluate only files accepted by this predicate
    pub file_predicate: Option<FilePredicate>,
    /// Output directory; see [`ProjectConfig::resolve_outdir`]
    pub outdir: Option<PathBuf>,
    /// Resolver for imports of evaluated code; [`NodeResolver`] by default
    pub resolver: Option<Arc<dyn ModuleResolver>>,
    pub output_mode: OutputMode,
}

impl fmt::Debug for ComptimeOptions {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ComptimeOptions")
            .field("config", &self.config)
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("file_predicate", &self.file_predicate.is_some())
            .field("outdir", &self.outdir)
            .field("resolver", &self.resolver.is_some())
            .field("output_mode", &self.output_mode)
            .finish()
    }
}

impl ComptimeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tsconfig(
        mut self,
        path: impl Into<PathBuf>,
    ) -> Self {
        self.config = ConfigSource::Tsconfig(path.into());
        self
    }

    pub fn with_project(
        mut self,
        config: ProjectConfig,
    ) -> Self {
        self.config = ConfigSource::Project(config);
        self
    }

    pub fn with_outdir(
        mut self,
        outdir: impl Into<PathBuf>,
    ) -> Self {
        self.outdir = Some(outdir.into());
        self
    }

    pub fn with_resolver(
        mut self,
        resolver: Arc<dyn ModuleResolver>,
    ) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_file_predicate<F>(
        mut self,
        predicate: F,
    ) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.file_predicate = Some(Arc::new(predicate));
        self
    }

    pub fn with_output_mode(
        mut self,
        mode: OutputMode,
    ) -> Self {
        self.output_mode = mode;
        self
    }

    /// Load the project configuration
    pub fn project(&self) -> Result<ProjectConfig, ComptimeError> {
        Ok(match &self.config {
            ConfigSource::Discover(start) => ProjectConfig::discover(start)?,
            ConfigSource::Tsconfig(path) => ProjectConfig::from_tsconfig(path)?,
            ConfigSource::Project(config) => config.clone(),
        })
    }

    fn resolver(&self) -> Arc<dyn ModuleResolver> {
        self.resolver.clone().unwrap_or_else(|| Arc::new(NodeResolver::new()))
    }

    /// Include/exclude filter from the options, else from `comptime.toml`
    fn filter(
        &self,
        config: &ProjectConfig,
    ) -> Result<Option<FileFilter>, ComptimeError> {
        let (include, exclude) = if self.include.is_empty() && self.exclude.is_empty() {
            (&config.settings.include, &config.settings.exclude)
        } else {
            (&self.include, &self.exclude)
        };
        if include.is_empty() && exclude.is_empty() {
            return Ok(None);
        }
        Ok(Some(FileFilter::new(&config.root, include, exclude)?))
    }

    fn output_mode(
        &self,
        config: &ProjectConfig,
    ) -> OutputMode {
        if config.settings.changed_only {
            OutputMode::ChangedOnly
        } else {
            self.output_mode
        }
    }
}

/// Evaluate every target of the project
///
/// Deferred thunks registered during evaluation run once, after the last
/// target. The first failing target aborts the build.
pub async fn compute_replacements(options: &ComptimeOptions) -> Result<Replacements, ComptimeError> {
    let config = options.project()?;
    let outdir = config.resolve_outdir(options.outdir.as_deref());
    let filter = options.filter(&config)?;
    let program = Program::load(&config, &[outdir])?;
    compute_for_program(&program, options, filter.as_ref()).await
}

async fn compute_for_program(
    program: &Program,
    options: &ComptimeOptions,
    filter: Option<&FileFilter>,
) -> Result<Replacements, ComptimeError> {
    let selected = |path: &Path| {
        filter.is_none_or(|f| f.is_match(path)) && options.file_predicate.as_ref().is_none_or(|p| p(path))
    };

    let analyses: Vec<(usize, FileAnalysis)> = program
        .files()
        .par_iter()
        .enumerate()
        .filter(|(_, file)| selected(file.path()))
        .filter_map(|(i, file)| file.parsed().map(|parsed| (i, analyzer::analyze(&file.source, parsed))))
        .filter(|(_, analysis)| !analysis.is_empty())
        .collect();
    let target_count: usize = analyses.iter().map(|(_, a)| a.targets.len()).sum();
    debug!("{} targets in {} files", target_count, analyses.len());

    let resolver = options.resolver();
    let requests = analyses
        .iter()
        .flat_map(|(i, analysis)| {
            let file = &program.files()[*i];
            let bindings = file.parsed().map(|p| &p.bindings);
            analysis
                .targets
                .iter()
                .filter_map(move |t| bindings.map(|b| sandbox::module_requests(file.path(), b, t)))
                .flatten()
        })
        .collect();
    let modules = sandbox::resolve_modules(resolver.clone(), requests).await;

    let work: Vec<(usize, &analyzer::AnalyzedTarget)> = analyses
        .iter()
        .flat_map(|(i, analysis)| analysis.targets.iter().map(move |t| (*i, t)))
        .collect();
    let prepared = work
        .par_iter()
        .map(|(i, target)| {
            let file = &program.files()[*i];
            match file.parsed() {
                Some(parsed) => sandbox::prepare(&file.source, &parsed.bindings, target, &modules).map(Some),
                None => Ok(None),
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .filter_map(Result::transpose)
        .collect::<Result<Vec<PreparedTarget>, _>>()?;

    let sites: Vec<(PathBuf, analyzer::Target)> = prepared
        .iter()
        .map(|p| (p.file.path().to_path_buf(), p.target.target.clone()))
        .collect();
    let values = evaluate_all(resolver, prepared).await?;

    let mut replacements = Replacements::new();
    for (i, analysis) in &analyses {
        let path = program.files()[*i].path().to_path_buf();
        replacements
            .entry(path)
            .or_default()
            .extend(analysis.tagged_imports.iter().map(|span| Replacement::new(span.start, span.end, "")));
    }
    for ((path, target), value) in sites.into_iter().zip(values) {
        let text = match &target.shorthand {
            Some(name) => format!("{}: {}", name, value),
            None => value,
        };
        replacements
            .entry(path)
            .or_default()
            .push(Replacement::new(target.span.start, target.span.end, text));
    }
    for list in replacements.values_mut() {
        list.sort_by_key(|r| r.start);
    }
    Ok(replacements)
}

/// Run the prepared targets in order on a fresh interpreter
async fn evaluate_all(
    resolver: Arc<dyn ModuleResolver>,
    prepared: Vec<PreparedTarget>,
) -> Result<Vec<String>, ComptimeError> {
    if prepared.is_empty() {
        return Ok(Vec::new());
    }
    Interpreter::run_isolated(async move {
        let sandbox = Sandbox::new(resolver);
        let mut values = Vec::with_capacity(prepared.len());
        for target in &prepared {
            values.push(sandbox.evaluate(target).await?);
        }
        let deferred = sandbox.drain_deferred().await?;
        if deferred > 0 {
            debug!("ran {} deferred functions", deferred);
        }
        Ok(values)
    })
    .await?
}

/// Write the project to the output directory with `replacements` applied
///
/// Returns the written paths.
pub fn apply_replacements(
    options: &ComptimeOptions,
    replacements: &Replacements,
) -> Result<Vec<PathBuf>, ComptimeError> {
    let config = options.project()?;
    let outdir = config.resolve_outdir(options.outdir.as_deref());
    let filter = options.filter(&config)?;
    let plan = OutputPlan {
        config: &config,
        outdir: &outdir,
        filter: filter.as_ref(),
        mode: options.output_mode(&config),
    };
    plan.write(replacements)
}

/// Compute and apply replacements
pub async fn comptime_compiler(options: &ComptimeOptions) -> Result<Vec<PathBuf>, ComptimeError> {
    let replacements = compute_replacements(options).await?;
    apply_replacements(options, &replacements)
}
