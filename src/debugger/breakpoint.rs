//! Symbolic breakpoints.
//!
//! A symbolic breakpoint lives in the [`Debugger`]'s arena and is realized by zero or more host
//! breakpoints, one per generated location of its source line. [`Breakpoint`] is only a handle;
//! every operation goes through the debugger that owns the breakpoint, so a handle stays safe to
//! use after the breakpoint is gone.

use std::fmt;

use bitflags::bitflags;

use crate::debugger::{Debugger, HostBreakpointId};

/// Arena id of a symbolic breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BreakpointId(pub(crate) u64);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// State of a symbolic breakpoint
    pub struct BreakpointFlags: u8 {
        /// The backing host breakpoints are active
        const ENABLED = 0x01;
        /// Destroyed on the next resume
        const TEMPORARY = 0x02;
    }
}

/// The source position a breakpoint was requested for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BreakpointLocation {
    /// Source file name
    pub file: String,
    /// Source line
    pub line: u32,
}

impl fmt::Display for BreakpointLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Arena entry of a live breakpoint.
#[derive(Debug, Clone)]
pub(crate) struct BreakpointEntry {
    pub(crate) location: BreakpointLocation,
    pub(crate) host_breakpoints: Vec<HostBreakpointId>,
    pub(crate) flags: BreakpointFlags,
}

/// Handle of a symbolic breakpoint.
///
/// Once the breakpoint is destroyed every query on the handle reports the empty state and every
/// operation is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Breakpoint {
    id: BreakpointId,
}

impl Breakpoint {
    pub(crate) fn new(id: BreakpointId) -> Self {
        Breakpoint { id }
    }

    /// Arena id of this breakpoint.
    #[must_use]
    pub fn id(&self) -> BreakpointId {
        self.id
    }

    /// The requested source position, or `None` once destroyed.
    #[must_use]
    pub fn location<'d>(&self, debugger: &'d Debugger) -> Option<&'d BreakpointLocation> {
        debugger.breakpoint_entry(self.id).map(|entry| &entry.location)
    }

    /// The host breakpoints realizing this breakpoint.
    #[must_use]
    pub fn host_breakpoints<'d>(&self, debugger: &'d Debugger) -> &'d [HostBreakpointId] {
        debugger
            .breakpoint_entry(self.id)
            .map_or(&[], |entry| entry.host_breakpoints.as_slice())
    }

    /// Returns `true` while at least one host breakpoint backs this breakpoint.
    #[must_use]
    pub fn is_valid(&self, debugger: &Debugger) -> bool {
        !self.host_breakpoints(debugger).is_empty()
    }

    /// Returns `true` if the breakpoint is live and enabled.
    #[must_use]
    pub fn is_enabled(&self, debugger: &Debugger) -> bool {
        debugger
            .breakpoint_entry(self.id)
            .is_some_and(|entry| entry.flags.contains(BreakpointFlags::ENABLED))
    }

    /// Returns `true` if the breakpoint is live and will be destroyed on the next resume.
    #[must_use]
    pub fn is_temporary(&self, debugger: &Debugger) -> bool {
        debugger
            .breakpoint_entry(self.id)
            .is_some_and(|entry| entry.flags.contains(BreakpointFlags::TEMPORARY))
    }

    /// Returns `true` once the breakpoint has been destroyed.
    #[must_use]
    pub fn is_destroyed(&self, debugger: &Debugger) -> bool {
        debugger.breakpoint_entry(self.id).is_none()
    }

    /// Enable or disable every backing host breakpoint.
    ///
    /// # Errors
    /// Returns [`crate::Error::Transport`] if the host rejects the change.
    pub fn enable(&self, debugger: &mut Debugger, enabled: bool) -> crate::Result<()> {
        debugger.set_breakpoint_enabled(self.id, enabled)
    }

    /// Destroy every backing host breakpoint. Calling this again is a no-op.
    pub fn destroy(&self, debugger: &mut Debugger) {
        debugger.destroy_breakpoint(self.id);
    }
}
