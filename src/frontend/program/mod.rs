//! Program model
//!
//! A [`Program`] is every source file of a project, read and parsed once.
//! Files are parsed in parallel; each parsed file carries its [`Bindings`].

pub mod bindings;

pub use bindings::{Bindings, DeclId, DeclKind, Declaration, ImportedName, Reference};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::frontend::parser::ast::Module;
use crate::frontend::parser::{parse, ParseError, ParseOptions};
use crate::util::config::ProjectConfig;
use crate::util::diagnostic::ComptimeError;
use crate::util::span::SourceFile;

/// Syntax tree and symbol table of one file
#[derive(Debug)]
pub struct ParsedFile {
    pub module: Module,
    pub bindings: Bindings,
}

/// One file of the program
#[derive(Debug)]
pub struct ProgramFile {
    pub source: SourceFile,
    /// Files that fail to parse and never mention `comptime` are carried through as text
    pub parsed: Result<Arc<ParsedFile>, ParseError>,
}

impl ProgramFile {
    pub fn path(&self) -> &Path {
        self.source.path()
    }

    pub fn parsed(&self) -> Option<&Arc<ParsedFile>> {
        self.parsed.as_ref().ok()
    }
}

/// All source files of a project
#[derive(Debug)]
pub struct Program {
    config: ProjectConfig,
    files: Vec<ProgramFile>,
}

impl Program {
    /// Read and parse the project's source files
    ///
    /// # Arguments
    /// * `config` - Project configuration
    /// * `skip` - Directories to leave out (the output directory)
    pub fn load(
        config: &ProjectConfig,
        skip: &[PathBuf],
    ) -> Result<Program, ComptimeError> {
        let paths = config.source_files(skip);
        debug!("loading {} source files from {}", paths.len(), config.root.display());

        let sources = paths
            .into_par_iter()
            .map(|path| {
                std::fs::read_to_string(&path)
                    .map(|text| SourceFile::new(path.clone(), text))
                    .map_err(|e| ComptimeError::io(path, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let files = sources
            .into_par_iter()
            .map(parse_file)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Program {
            config: config.clone(),
            files,
        })
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Files in path order
    pub fn files(&self) -> &[ProgramFile] {
        &self.files
    }

    pub fn file(
        &self,
        path: &Path,
    ) -> Option<&ProgramFile> {
        self.files.iter().find(|f| f.path() == path)
    }
}

fn parse_file(source: SourceFile) -> Result<ProgramFile, ComptimeError> {
    let options = if source.is_declaration_file() || is_typescript(source.path()) {
        ParseOptions::typescript()
    } else {
        ParseOptions::javascript()
    };
    let parsed = match parse(&source.content, options) {
        Ok(output) => {
            let bindings = Bindings::bind(&output.module);
            Ok(Arc::new(ParsedFile {
                module: output.module,
                bindings,
            }))
        }
        Err(e) if source.content.contains("comptime") => {
            return Err(ComptimeError::Parse {
                path: source.path().to_path_buf(),
                source: e,
            });
        }
        Err(e) => {
            warn!("{}: {}; copying it unchanged", source.path().display(), e);
            Err(e)
        }
    };
    Ok(ProgramFile { source, parsed })
}

fn is_typescript(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("ts" | "mts" | "cts"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_load_parses_and_binds() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "const x: number = 1;\nexport const y = x + 1;\n").unwrap();
        fs::write(dir.path().join("b.ts"), "import { y } from './a';\nconsole.log(y);\n").unwrap();
        let config = ProjectConfig::from_root(dir.path()).unwrap();
        let program = Program::load(&config, &[]).unwrap();

        assert_eq!(program.files().len(), 2);
        let a = program.file(&config.root.join("a.ts")).unwrap();
        let parsed = a.parsed().unwrap();
        let names: Vec<&str> = parsed.bindings.declarations().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["x", "y"]);
    }

    #[test]
    fn test_unparsable_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("odd.ts"), "let = = ;\n").unwrap();
        let config = ProjectConfig::from_root(dir.path()).unwrap();
        let program = Program::load(&config, &[]).unwrap();
        assert!(program.files()[0].parsed().is_none());

        fs::write(dir.path().join("bad.ts"), "import { comptime } from 'comptime.ts';\nlet = = ;\n").unwrap();
        let err = Program::load(&config, &[]).unwrap_err();
        assert!(matches!(err, ComptimeError::Parse { .. }));
    }
}
