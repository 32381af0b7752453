//! 模块系统
//!
//! Import specifier resolution. Loading and linking happen in the
//! interpreter (`backends::interpreter::modules`), which consults the
//! resolver configured for the build.

pub mod resolver;

pub use resolver::{FnResolver, ModuleResolver, NodeResolver, ResolveError, ResolveFuture, VirtualModule};
