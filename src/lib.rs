//! comptime: compile-time evaluation for TypeScript
//!
//! Expressions built from bindings imported with `with { type: "comptime" }`
//! are evaluated at build time and replaced by their value, printed as
//! source text. The tagged imports themselves are removed.
//!
//! # Example
//!
//! ```no_run
//! use comptime::{comptime_compiler, ComptimeOptions};
//!
//! #[tokio::main]
//! async fn main() -> comptime::Result<()> {
//!     let options = ComptimeOptions::new().with_tsconfig("tsconfig.json").with_outdir("out");
//!     let written = comptime_compiler(&options).await?;
//!     println!("{} files written", written.len());
//!     Ok(())
//! }
//! ```
//!
//! # Layout
//!
//! - [`frontend`]: lexer, parser, bindings and module resolution for TypeScript sources
//! - [`comptime`]: target analysis, evaluation programs, serialization and output
//! - [`backends::interpreter`]: the JavaScript interpreter evaluation runs on
//! - [`runtime`]: interpreter values
//! - [`util`]: configuration, diagnostics, edits, spans and logging

#![warn(rust_2018_idioms)]

pub mod backends;
pub mod comptime;
pub mod frontend;
pub mod runtime;
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use comptime::{
    apply_replacements, compute_replacements, comptime_compiler, ComptimeOptions, ConfigSource, OutputMode,
    Replacement, Replacements,
};
pub use frontend::module::{FnResolver, ModuleResolver, NodeResolver};
pub use util::config::ProjectConfig;
pub use util::diagnostic::ComptimeError;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tool name
pub const NAME: &str = "comptime";
