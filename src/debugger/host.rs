//! The interface to the host runtime's own debugger.
//!
//! The host debugger only knows about generated code: scripts, generated locations, host
//! breakpoints and raw values. [`HostDebugger`] is the narrow surface the symbolic
//! [`crate::debugger::Debugger`] needs from it. Events flow the other way: whatever drives the
//! host connection hands each [`HostEvent`] to [`crate::debugger::Debugger::handle_event`].

use std::fmt;

use crate::{information::GeneratedLocation, Result};

/// Opaque handle of a breakpoint created by the host debugger.
pub type HostBreakpointId = u64;

/// Opaque handle of an object living in the debuggee.
pub type HostObjectId = u64;

/// A generated location inside a named script.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostLocation {
    /// Name of the generated-code unit
    pub script: String,
    /// Position in that unit
    pub location: GeneratedLocation,
}

impl HostLocation {
    /// Create a new host location.
    pub fn new(script: impl Into<String>, location: GeneratedLocation) -> Self {
        HostLocation {
            script: script.into(),
            location,
        }
    }
}

impl fmt::Display for HostLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.script, self.location)
    }
}

/// A raw value as reported by the host debugger.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// The undefined value
    Undefined,
    /// The null reference
    Null,
    /// A boolean
    Boolean(bool),
    /// A number
    Number(f64),
    /// A string
    String(String),
    /// An object whose properties are fetched on demand
    Object {
        /// Host handle of the object
        handle: HostObjectId,
        /// Generated class name of the object, if the host knows it
        class_name: Option<String>,
    },
}

/// One entry of the host call stack.
#[derive(Debug, Clone, PartialEq)]
pub struct HostFrame {
    /// Where the frame is executing
    pub location: HostLocation,
    /// Generated variable names and their values
    pub variables: Vec<(String, HostValue)>,
}

/// Events the host debugger reports asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Execution stopped, at a host breakpoint if one was hit
    Paused {
        /// The host breakpoint that triggered the pause
        breakpoint: Option<HostBreakpointId>,
    },
    /// Execution continued
    Resumed,
    /// A generated-code unit was loaded
    ScriptAdded(String),
    /// The connection to the debuggee was established. Host breakpoints created before a
    /// detach are gone at this point.
    Attached,
    /// The connection to the debuggee was lost, along with every host breakpoint
    Detached,
}

/// Operations of the host runtime's debugger.
///
/// Every operation may fail with [`crate::Error::Transport`] when the connection to the host is
/// lost. Control operations are requests: their effect is observed later through a
/// [`HostEvent`].
pub trait HostDebugger: Send + Sync {
    /// Request a pause.
    fn suspend(&self) -> Result<()>;

    /// Request execution to continue.
    fn resume(&self) -> Result<()>;

    /// Step into the next call in the generated code.
    fn step_into(&self) -> Result<()>;

    /// Run until the current generated function returns.
    fn step_out(&self) -> Result<()>;

    /// Step over the next statement in the generated code.
    fn step_over(&self) -> Result<()>;

    /// Returns `true` while execution is paused.
    fn is_suspended(&self) -> bool;

    /// Returns `true` while connected to the debuggee.
    fn is_attached(&self) -> bool;

    /// Close the connection to the debuggee. The host reports [`HostEvent::Detached`] once done.
    fn detach(&self) -> Result<()>;

    /// Create a breakpoint at a generated location.
    fn create_breakpoint(&self, location: &HostLocation) -> Result<HostBreakpointId>;

    /// Remove a breakpoint. Called at most once per handle.
    fn destroy_breakpoint(&self, breakpoint: HostBreakpointId) -> Result<()>;

    /// Enable or disable a breakpoint without removing it.
    fn set_breakpoint_enabled(&self, breakpoint: HostBreakpointId, enabled: bool) -> Result<()>;

    /// The current call stack, innermost frame first. Only meaningful while suspended.
    fn call_stack(&self) -> Result<Vec<HostFrame>>;

    /// The properties of an object, by generated property name.
    fn properties(&self, object: HostObjectId) -> Result<Vec<(String, HostValue)>>;
}
