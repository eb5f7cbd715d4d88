//! Core shared types for Scry.
//!
//! This crate is intentionally small and dependency-light: the name model,
//! source spans, and literal constants used throughout the workspace.

#![forbid(unsafe_code)]

mod constant;
mod names;
mod span;

pub use crate::constant::Constant;
pub use crate::names::{
    to_package_name, Name, ParamSig, QualifiedTag, Signature, SimpleName, SuffixTag, TermName,
    TypeName,
};
pub use crate::span::Span;
