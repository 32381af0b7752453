//! tsconfig-style globs
//!
//! `*` and `?` stay within one path segment, `**/` spans any number of
//! directories. An include pattern whose last segment has neither a wildcard
//! nor an extension names a directory and matches everything below it; an
//! exclude pattern also covers everything below whatever it matches.
//! Patterns are anchored at a base directory and matched against absolute paths.

use std::path::{Path, PathBuf};

use regex::Regex;

use super::ConfigError;
use crate::frontend::module::resolver::normalize;

/// One compiled pattern
#[derive(Debug, Clone)]
pub struct Glob {
    pattern: String,
    regex: Regex,
    /// Deepest directory without wildcards that contains every match
    base: PathBuf,
}

impl Glob {
    /// Include pattern relative to `base`
    pub fn include(
        base: &Path,
        pattern: &str,
    ) -> Result<Self, ConfigError> {
        let mut full = anchored(base, pattern);
        let last = full.rsplit('/').next().unwrap_or("");
        if !last.contains(['*', '?']) && !last.contains('.') {
            full.push_str("/**/*");
        }
        Self::compile(pattern, &full, "")
    }

    /// Exclude pattern relative to `base`
    pub fn exclude(
        base: &Path,
        pattern: &str,
    ) -> Result<Self, ConfigError> {
        Self::compile(pattern, &anchored(base, pattern), "(?:/.*)?")
    }

    fn compile(
        pattern: &str,
        full: &str,
        suffix: &str,
    ) -> Result<Self, ConfigError> {
        let source = format!("^{}{}$", translate(full), suffix);
        let regex = Regex::new(&source).map_err(|source| ConfigError::Glob {
            pattern: pattern.to_string(),
            source,
        })?;
        let segments: Vec<&str> = full.split('/').collect();
        let literal = segments[..segments.len().saturating_sub(1)]
            .iter()
            .take_while(|s| !s.contains(['*', '?']))
            .copied()
            .collect::<Vec<_>>()
            .join("/");
        Ok(Glob {
            pattern: pattern.to_string(),
            regex,
            base: PathBuf::from(if literal.is_empty() { "/".to_string() } else { literal }),
        })
    }

    /// Directory a walk for this pattern starts in
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Pattern as written
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(
        &self,
        path: &Path,
    ) -> bool {
        self.regex.is_match(&slashed(path))
    }
}

/// Include/exclude pair
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub include: Vec<Glob>,
    pub exclude: Vec<Glob>,
}

impl FileFilter {
    /// Compile `include`/`exclude` against `base`; an empty include list admits everything
    pub fn new(
        base: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Self, ConfigError> {
        Ok(FileFilter {
            include: include.iter().map(|p| Glob::include(base, p)).collect::<Result<_, _>>()?,
            exclude: exclude.iter().map(|p| Glob::exclude(base, p)).collect::<Result<_, _>>()?,
        })
    }

    pub fn is_match(
        &self,
        path: &Path,
    ) -> bool {
        (self.include.is_empty() || self.include.iter().any(|g| g.is_match(path)))
            && !self.exclude.iter().any(|g| g.is_match(path))
    }

    /// Whether an exclude pattern covers the whole directory `dir`
    pub fn excludes_dir(
        &self,
        dir: &Path,
    ) -> bool {
        self.exclude.iter().any(|g| g.is_match(dir))
    }
}

fn anchored(
    base: &Path,
    pattern: &str,
) -> String {
    let joined: PathBuf = normalize(&base.join(pattern.trim_start_matches("./")));
    slashed(&joined).trim_end_matches('/').to_string()
}

fn slashed(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Glob syntax to a regex body
fn translate(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("(?:[^/]+/)*");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/proj")
    }

    #[test]
    fn test_star_stays_in_segment() {
        let glob = Glob::include(&root(), "src/*.ts").unwrap();
        assert!(glob.is_match(Path::new("/proj/src/a.ts")));
        assert!(!glob.is_match(Path::new("/proj/src/deep/a.ts")));
        assert_eq!(glob.base(), Path::new("/proj/src"));
    }

    #[test]
    fn test_double_star_spans_directories() {
        let glob = Glob::include(&root(), "**/*.ts").unwrap();
        assert!(glob.is_match(Path::new("/proj/a.ts")));
        assert!(glob.is_match(Path::new("/proj/x/y/a.ts")));
        assert!(!glob.is_match(Path::new("/other/a.ts")));
    }

    #[test]
    fn test_directory_include() {
        let glob = Glob::include(&root(), "./src").unwrap();
        assert!(glob.is_match(Path::new("/proj/src/a/b.ts")));
        assert!(!glob.is_match(Path::new("/proj/srcs/b.ts")));
        assert_eq!(glob.base(), Path::new("/proj/src"));
    }

    #[test]
    fn test_exclude_covers_subtree() {
        let filter = FileFilter::new(&root(), &[], &["node_modules".into(), "**/*.spec.ts".into()]).unwrap();
        assert!(!filter.is_match(Path::new("/proj/node_modules/p/index.ts")));
        assert!(!filter.is_match(Path::new("/proj/src/a.spec.ts")));
        assert!(filter.is_match(Path::new("/proj/src/a.ts")));
        assert!(filter.excludes_dir(Path::new("/proj/node_modules")));
    }
}
