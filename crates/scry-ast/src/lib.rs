//! The typed program representation reconstructed from compiled artifacts.
//!
//! This crate owns the three mutually referential models at the center of
//! Scry and the base context that ties them together:
//!
//! - [`symbols`]: an arena of named declarations (packages, classes, terms)
//!   addressed by stable ids, with one-shot initialization latches and
//!   defining-tree back-pointers;
//! - [`types`]: the immutable type algebra (references, structural types,
//!   method/poly/lambda types) and its operations;
//! - [`trees`]: the closed family of tree nodes with lazily computed,
//!   memoized types and generic traversals.

mod contexts;
mod errors;
pub mod symbols;
pub mod trees;
pub mod types;

pub use crate::contexts::{BaseContext, Definitions};
pub use crate::errors::{SymbolError, TypeError};
pub use crate::symbols::{ClassId, PackageId, RootSymbols, Symbol, SymbolId, SymbolTable};
pub use crate::trees::{
    Parent, ParamList, Refinement, Tree, TreeKind, TypeBoundsDef, TypeCaseDef, TypeTree,
    TypeTreeKind,
};
pub use crate::types::{
    AppliedType, LambdaParam, MatchType, MatchTypeCase, MethodType, PackageRef, PolyType,
    RefinedType, TermRef, ThisType, Type, TypeBounds, TypeDesignator, TypeLambda, TypeParamRef,
    TypeRef,
};
