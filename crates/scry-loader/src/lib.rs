//! Demand-driven loading of compiled artifacts into the typed model.
//!
//! A [`Context`] owns a symbol table and a [`Loader`]. The loader builds the
//! package inventory once, registers placeholder root symbols per package on
//! first touch, and inspects a root's backing bytes only when the root is
//! actually requested: TASTy sections go through the decoder glue in
//! [`tasty`], classfile-only roots through the glue in `classfiles`.

mod classfiles;
mod context;
mod errors;
mod events;
mod loader;
mod tasty;

pub use crate::context::Context;
pub use crate::errors::{DecoderError, LoaderError};
pub use crate::events::{EventArg, EventNode, EventTag};
pub use crate::loader::{Entry, LoadRoot, Loader};
pub use crate::tasty::{PositionTable, TastyDecoder, TastyUnpickler};
