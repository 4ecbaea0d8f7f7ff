//! Top-level error type.
//!
//! Failures are tiered: load errors mean the binary could not be parsed,
//! link errors mean it could not be turned into a runtime assembly, and
//! runtime errors unwind an execution in progress. All three are fatal;
//! there is no resumable exception model.

use thiserror::Error;

use crate::data::LoadError;
use crate::runtime::LinkError;
use crate::vm::VmError;

/// Any fatal error the VM can report to its embedder.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Runtime(#[from] VmError),
    #[error("entry path `{0}` has no file name")]
    BadEntryPath(String),
    #[error("assembly `{0}` is not loaded")]
    AssemblyNotLoaded(String),
    #[error("assembly `{0}` has no entry function")]
    NoEntryFunction(String),
}
