//! Utility types and functions

pub mod config;
pub mod diagnostic;
pub mod edit;
pub mod logger;
pub mod span;
