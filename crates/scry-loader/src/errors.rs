use scry_ast::{SymbolError, TypeError};
use thiserror::Error;

use crate::events::EventTag;

/// Failures reported by (or on behalf of) the TASTy decoder collaborator.
#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("malformed {tag:?} event: expected {expected}")]
    MalformedEvent {
        tag: EventTag,
        expected: &'static str,
    },
    #[error("type parameter reference to unknown binder at address {0}")]
    UnknownBinder(u32),
    #[error("corrupt section: {0}")]
    Corrupt(String),
}

/// Failures of a root scan. These are fatal for the root being scanned: its
/// entry is consumed and the root stays uninitialized.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error(transparent)]
    Decoder(#[from] DecoderError),
    #[error("classfile error: {0}")]
    Classfile(#[from] scry_classfile::Error),
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error("classfile of {0} declares TASTY but no companion .tasty entry exists")]
    MissingTopLevelTasty(String),
}
