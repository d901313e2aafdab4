//! sigbind - binding generator and marshaling runtime for a native
//! signal-processing library
//!
//! The generator side discovers native algorithms, classifies and filters
//! them, and emits one Rust wrapper module per algorithm:
//!
//! - [`discovery`]: introspection of the library's reflective module plus a
//!   header scan, merged first-wins into a [`metadata::MetadataTable`]
//! - [`classify`]: name to [`metadata::Category`]
//! - [`select`]: include/exclude globs, category filter, per-category minimum
//! - [`codegen`]: templated multi-file generation with a skip-if-exists policy
//!
//! The [`runtime`] module is what the generated code links against: lazy
//! native handles, parameter marshaling, input validation and output
//! post-processing.

pub mod classify;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod discovery;
pub mod error;
pub mod metadata;
pub mod runtime;
pub mod select;

pub use error::{ErrorKind, Result, SigbindError};
