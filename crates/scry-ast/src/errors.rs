use scry_core::{Name, Span};
use thiserror::Error;

/// Failures raised while deriving the type of a tree.
///
/// These surface at the call site of `Tree::tpe` on the offending node and
/// are recoverable: a failed computation is not memoized and may be retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("cannot compute the type of a {node} node at {span:?}")]
    TypeComputation { node: &'static str, span: Span },
    #[error("reference does not denote a method: {0}")]
    NonMethodReference(String),
    #[error("cannot select {name} from a non-path type")]
    BadSelection { name: Name },
    #[error("ambiguous overloads of {name}")]
    AmbiguousOverload { name: Name },
    #[error("unresolved reference to {name}")]
    UnresolvedReference { name: Name },
}

/// Failures of the symbol table's creation and one-shot mutation operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("{owner} already declares {name}")]
    DuplicateDeclaration { owner: String, name: Name },
    #[error("defining tree of {name} is already set")]
    TreeAlreadySet { name: Name },
    #[error("{name} is already initialised")]
    AlreadyInitialised { name: Name },
    #[error("declared type of {name} is already set")]
    TypeAlreadySet { name: Name },
    #[error("{name} is not a term symbol")]
    NotATermSymbol { name: Name },
    #[error("symbol is already named {name}")]
    AlreadyNamed { name: Name },
}
