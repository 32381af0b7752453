//! Execution backends
//!
//! Evaluation programs run on a tree-walking [`interpreter`] over the
//! parser's syntax tree.

pub mod interpreter;
