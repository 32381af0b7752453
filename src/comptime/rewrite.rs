//! Replacements and output
//!
//! A [`Replacement`] overwrites a byte range of one file's original text.
//! Applying them goes through [`EditBuffer`], which rejects overlapping
//! ranges, so the order replacements are listed in does not matter.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::OutputMode;
use crate::util::config::{FileFilter, ProjectConfig};
use crate::util::diagnostic::ComptimeError;
use crate::util::edit::{EditBuffer, EditError};

/// New text for the half-open range `start..end` of a file's original text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl Replacement {
    pub fn new(
        start: usize,
        end: usize,
        replacement: impl Into<String>,
    ) -> Self {
        Replacement {
            start,
            end,
            replacement: replacement.into(),
        }
    }
}

/// Replacements per absolute file path, each list sorted by start
pub type Replacements = BTreeMap<PathBuf, Vec<Replacement>>;

/// Apply `replacements` to `text`
pub fn rewrite(
    text: &str,
    replacements: &[Replacement],
) -> Result<String, EditError> {
    let mut buffer = EditBuffer::new(text);
    for r in replacements {
        buffer.overwrite(r.start, r.end, r.replacement.as_str())?;
    }
    Ok(buffer.finish())
}

/// Where rewritten files go and which files are written
#[derive(Debug, Clone)]
pub struct OutputPlan<'a> {
    pub config: &'a ProjectConfig,
    pub outdir: &'a Path,
    /// Restricts the files written, on top of the project's own file set
    pub filter: Option<&'a FileFilter>,
    pub mode: OutputMode,
}

impl OutputPlan<'_> {
    /// Output path of a project file, `None` for files outside the project root
    pub fn output_path(
        &self,
        file: &Path,
    ) -> Option<PathBuf> {
        let relative = file.strip_prefix(&self.config.root).ok()?;
        Some(self.outdir.join(relative))
    }

    /// Rewrite the project into the output directory
    ///
    /// Returns the written paths, sorted.
    pub fn write(
        &self,
        replacements: &Replacements,
    ) -> Result<Vec<PathBuf>, ComptimeError> {
        let files = self.config.source_files(&[self.outdir.to_path_buf()]);
        debug!("writing up to {} files to {}", files.len(), self.outdir.display());

        let mut written = Vec::new();
        for file in files {
            if is_skipped(&file, self.outdir) || self.filter.is_some_and(|f| !f.is_match(&file)) {
                continue;
            }
            let edits = replacements.get(&file).map(Vec::as_slice).unwrap_or_default();
            if edits.is_empty() && self.mode == OutputMode::ChangedOnly {
                continue;
            }
            let Some(out) = self.output_path(&file) else {
                warn!("{} is outside {}; not written", file.display(), self.config.root.display());
                continue;
            };

            let text = fs::read_to_string(&file).map_err(|e| ComptimeError::io(&file, e))?;
            let rewritten = rewrite(&text, edits).map_err(|source| ComptimeError::Edit {
                path: file.clone(),
                source,
            })?;
            if let Some(dir) = out.parent() {
                fs::create_dir_all(dir).map_err(|e| ComptimeError::io(dir, e))?;
            }
            fs::write(&out, rewritten).map_err(|e| ComptimeError::io(&out, e))?;
            info!("Writing {}", out.display());
            written.push(out);
        }
        Ok(written)
    }
}

/// Dependencies and earlier output are never rewritten
fn is_skipped(
    file: &Path,
    outdir: &Path,
) -> bool {
    file.starts_with(outdir) || file.components().any(|c| c.as_os_str() == "node_modules")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_in_any_order() {
        let text = "const a = f(1) + g(2);";
        let replacements = [Replacement::new(17, 21, "20"), Replacement::new(10, 14, "10")];
        assert_eq!(rewrite(text, &replacements).unwrap(), "const a = 10 + 20;");
    }

    #[test]
    fn test_empty_replacements_round_trip() {
        let text = "export const x = 1;\n// untouched\n";
        assert_eq!(rewrite(text, &[]).unwrap(), text);
    }

    #[test]
    fn test_overlap_is_rejected() {
        let replacements = [Replacement::new(0, 5, "a"), Replacement::new(3, 8, "b")];
        assert!(matches!(
            rewrite("0123456789", &replacements),
            Err(EditError::Overlap { .. })
        ));
    }

    #[test]
    fn test_replacements_serialize_as_json() {
        let mut replacements = Replacements::new();
        replacements.insert(PathBuf::from("/p/a.ts"), vec![Replacement::new(1, 3, "3")]);
        let json = serde_json::to_string(&replacements).unwrap();
        assert_eq!(json, r#"{"/p/a.ts":[{"start":1,"end":3,"replacement":"3"}]}"#);
    }

    #[test]
    fn test_write_modes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.ts"), "const a = X;\n").unwrap();
        fs::create_dir_all(root.join("lib")).unwrap();
        fs::write(root.join("lib/b.ts"), "export const b = 2;\n").unwrap();
        let config = ProjectConfig::from_root(root).unwrap();
        let outdir = config.root.join("out");

        let mut replacements = Replacements::new();
        replacements.insert(config.root.join("a.ts"), vec![Replacement::new(10, 11, "1")]);

        let plan = OutputPlan {
            config: &config,
            outdir: &outdir,
            filter: None,
            mode: OutputMode::All,
        };
        let written = plan.write(&replacements).unwrap();
        assert_eq!(written, [outdir.join("a.ts"), outdir.join("lib/b.ts")]);
        assert_eq!(fs::read_to_string(outdir.join("a.ts")).unwrap(), "const a = 1;\n");
        assert_eq!(fs::read_to_string(outdir.join("lib/b.ts")).unwrap(), "export const b = 2;\n");

        // a second run must not pick up its own output
        let changed = OutputPlan {
            mode: OutputMode::ChangedOnly,
            ..plan
        };
        assert_eq!(changed.write(&replacements).unwrap(), [outdir.join("a.ts")]);
    }
}
