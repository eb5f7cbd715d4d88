//! Classfile inspection for the loader.
//!
//! This crate answers one question per class: what kind of compiled artifact
//! backs it (TASTy, Scala 2 pickle, plain Java, or something to ignore), and
//! for the classfile-only kinds, what members it declares. Descriptors and
//! generic signatures are parsed directly into the `scry-ast` type algebra.

#![forbid(unsafe_code)]

mod descriptor;
mod error;
mod kind;
mod pool;
mod reader;
mod signature;
mod structure;

pub use crate::descriptor::{parse_field_descriptor, parse_method_descriptor};
pub use crate::error::{Error, Result};
pub use crate::kind::{read_kind, ClassKind};
pub use crate::signature::{parse_field_signature, parse_method_signature};
pub use crate::structure::{ClassStructure, MemberData};
