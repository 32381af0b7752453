//! Frontend
//!
//! Lexer and parser for the TypeScript subset, module resolution, and the
//! program model (files, syntax trees, bindings) the comptime passes run on.

pub mod lexer;
pub mod module;
pub mod parser;
pub mod program;
