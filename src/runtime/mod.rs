//! Runtime system
//!
//! Values and heap objects shared by the interpreter and the serializer.

pub mod value;
