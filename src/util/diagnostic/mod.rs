//! Diagnostics
//!
//! - [`codes`] - `CT_ERR_*` registry, one code per evaluation [`Phase`]
//! - [`render`] - boxed "Compile Error" rendering
//! - [`source_error`] - failing-expression report with the evaluated program
//!
//! Every failure of the build surfaces as a [`ComptimeError`].

pub mod codes;
pub mod render;
pub mod source_error;

use std::path::PathBuf;

use thiserror::Error;

pub use codes::{ErrorCodeDefinition, Phase};
pub use render::{boxed, compile_error};
pub use source_error::{format_source_error, SourceErrorInput};

use crate::backends::interpreter::RuntimeError;
use crate::frontend::parser::ParseError;
use crate::util::config::ConfigError;
use crate::util::edit::EditError;
use crate::util::span::Span;

/// Originating error of a phase failure
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build error
#[derive(Debug, Error)]
pub enum ComptimeError {
    /// A target failed in one of the evaluation phases
    #[error("{message}")]
    Phase {
        phase: Phase,
        file: PathBuf,
        target: Span,
        /// Fully rendered report
        message: String,
        #[source]
        cause: Option<Cause>,
    },

    /// A project file is not valid TypeScript
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// Two edits of one file overlap
    #[error("{}: {source}", path.display())]
    Edit {
        path: PathBuf,
        #[source]
        source: EditError,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The evaluation thread went away
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ComptimeError {
    /// Phase failure of the target `target` in `file`, with `report` as the context
    /// of the compile-error frame
    pub fn phase(
        phase: Phase,
        file: impl Into<PathBuf>,
        target: Span,
        report: &str,
        cause: Option<Cause>,
    ) -> Self {
        ComptimeError::Phase {
            phase,
            file: file.into(),
            target,
            message: compile_error(phase, Some(report)),
            cause,
        }
    }

    pub fn io(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        ComptimeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Failing phase, for phase errors
    pub fn failed_phase(&self) -> Option<Phase> {
        match self {
            ComptimeError::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Result type of the build
pub type Result<T> = std::result::Result<T, ComptimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_error_renders_report() {
        let err = ComptimeError::phase(Phase::SyntaxCheck, "/p/a.ts", Span::new(1, 4), "1. report", None);
        assert_eq!(err.failed_phase(), Some(Phase::SyntaxCheck));
        let text = err.to_string();
        assert!(text.contains("1. report"));
        assert!(text.contains("Syntax error in comptime evaluation block."));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = ComptimeError::io("/p/missing.ts", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(err.to_string().starts_with("/p/missing.ts: "));
        assert_eq!(err.failed_phase(), None);
    }
}
