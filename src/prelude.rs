//! # aotdbg Prelude
//!
//! The most commonly used types of the crate, for glob imports.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all aotdbg operations
pub use crate::Error;

/// The result type used throughout aotdbg
pub use crate::Result;

/// Configuration of the debugger and the reader
pub use crate::config::{DebuggerConfig, ReaderConfig};

// ================================================================================================
// Debug Information
// ================================================================================================

/// The read model and its builder
pub use crate::information::{DebugInformation, DebugInformationBuilder, DeferredCallSite};

/// Locations and ids
pub use crate::information::{
    ClassId, ExactMethodId, FieldId, FileId, GeneratedLocation, MethodId, MethodRef,
    SourceLocation, VariableId,
};

/// Derived lookups
pub use crate::information::{CallSite, CallSiteKind, Successor};

// ================================================================================================
// Debugger
// ================================================================================================

/// The symbolic debugger and its events
pub use crate::debugger::{Debugger, DebuggerEvent};

/// Breakpoints, frames and values
pub use crate::debugger::{Breakpoint, CallFrame, HasProperties, ObjectValue, Value};

/// Host integration
pub use crate::debugger::{
    DebugInformationProvider, FileProvider, HostDebugger, HostEvent, HostFrame, HostLocation,
    HostValue, MemoryProvider,
};
