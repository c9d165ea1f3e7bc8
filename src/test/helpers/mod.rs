//! A scriptable host debugger.
//!
//! [`MockHost`] records every call made through [`HostDebugger`] and answers from state the test
//! sets up beforehand. It never emits events; tests feed those to the debugger themselves.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use crate::{
    debugger::{
        HostBreakpointId, HostDebugger, HostFrame, HostLocation, HostObjectId, HostValue,
    },
    information::GeneratedLocation,
    Error, Result,
};

#[derive(Debug, Default)]
struct MockState {
    suspended: bool,
    disconnected: bool,
    detached: bool,
    detaches: usize,
    next_breakpoint: HostBreakpointId,
    breakpoints: BTreeMap<HostBreakpointId, (HostLocation, bool)>,
    destroyed: Vec<HostBreakpointId>,
    failing_scripts: Vec<String>,
    failing_toggles: Vec<HostBreakpointId>,
    call_stack: Vec<HostFrame>,
    call_stack_requests: usize,
    properties: HashMap<HostObjectId, Vec<(String, HostValue)>>,
    resumes: usize,
    steps: usize,
}

/// In-memory [`HostDebugger`].
#[derive(Debug, Default)]
pub struct MockHost {
    state: Mutex<MockState>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame without variables.
    pub fn frame(script: &str, location: GeneratedLocation) -> HostFrame {
        HostFrame {
            location: HostLocation::new(script, location),
            variables: Vec::new(),
        }
    }

    pub fn set_suspended(&self, suspended: bool) {
        self.state.lock().unwrap().suspended = suspended;
    }

    pub fn set_call_stack(&self, frames: Vec<HostFrame>) {
        self.state.lock().unwrap().call_stack = frames;
    }

    pub fn set_properties(&self, object: HostObjectId, properties: Vec<(String, HostValue)>) {
        self.state.lock().unwrap().properties.insert(object, properties);
    }

    /// Make every breakpoint request in `script` fail.
    pub fn fail_breakpoints_in(&self, script: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_scripts
            .push(script.to_string());
    }

    /// Make enabling or disabling `breakpoint` fail.
    pub fn fail_toggle(&self, breakpoint: HostBreakpointId) {
        self.state.lock().unwrap().failing_toggles.push(breakpoint);
    }

    /// Reattach after a detach. The host breakpoints stay gone.
    pub fn reattach(&self) {
        self.state.lock().unwrap().detached = false;
    }

    pub fn detach_count(&self) -> usize {
        self.state.lock().unwrap().detaches
    }

    /// Make every subsequent call fail with a transport error.
    pub fn disconnect(&self) {
        self.state.lock().unwrap().disconnected = true;
    }

    /// Locations of the breakpoints that currently exist, ordered by creation.
    pub fn live_breakpoints(&self) -> Vec<HostLocation> {
        let state = self.state.lock().unwrap();
        state
            .breakpoints
            .values()
            .map(|(location, _)| location.clone())
            .collect()
    }

    pub fn disabled_breakpoints(&self) -> Vec<HostBreakpointId> {
        let state = self.state.lock().unwrap();
        state
            .breakpoints
            .iter()
            .filter(|(_, (_, enabled))| !enabled)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn destroyed_breakpoints(&self) -> Vec<HostBreakpointId> {
        self.state.lock().unwrap().destroyed.clone()
    }

    pub fn resume_count(&self) -> usize {
        self.state.lock().unwrap().resumes
    }

    pub fn step_count(&self) -> usize {
        self.state.lock().unwrap().steps
    }

    pub fn call_stack_requests(&self) -> usize {
        self.state.lock().unwrap().call_stack_requests
    }

    fn connected(&self) -> Result<std::sync::MutexGuard<'_, MockState>> {
        let state = self.state.lock().unwrap();
        if state.disconnected {
            return Err(Error::Transport("connection closed".to_string()));
        }
        Ok(state)
    }
}

impl HostDebugger for MockHost {
    fn suspend(&self) -> Result<()> {
        self.connected()?.suspended = true;
        Ok(())
    }

    fn resume(&self) -> Result<()> {
        let mut state = self.connected()?;
        state.suspended = false;
        state.resumes += 1;
        Ok(())
    }

    fn step_into(&self) -> Result<()> {
        self.connected()?.steps += 1;
        Ok(())
    }

    fn step_out(&self) -> Result<()> {
        self.connected()?.steps += 1;
        Ok(())
    }

    fn step_over(&self) -> Result<()> {
        self.connected()?.steps += 1;
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.suspended && !state.disconnected
    }

    fn is_attached(&self) -> bool {
        let state = self.state.lock().unwrap();
        !state.detached && !state.disconnected
    }

    fn detach(&self) -> Result<()> {
        let mut state = self.connected()?;
        state.detached = true;
        state.suspended = false;
        state.detaches += 1;
        state.breakpoints.clear();
        Ok(())
    }

    fn create_breakpoint(&self, location: &HostLocation) -> Result<HostBreakpointId> {
        let mut state = self.connected()?;
        if state.failing_scripts.contains(&location.script) {
            return Err(Error::Transport(format!("cannot break in {}", location.script)));
        }
        let id = state.next_breakpoint;
        state.next_breakpoint += 1;
        state.breakpoints.insert(id, (location.clone(), true));
        Ok(id)
    }

    fn destroy_breakpoint(&self, breakpoint: HostBreakpointId) -> Result<()> {
        let mut state = self.connected()?;
        if state.breakpoints.remove(&breakpoint).is_some() {
            state.destroyed.push(breakpoint);
        }
        Ok(())
    }

    fn set_breakpoint_enabled(&self, breakpoint: HostBreakpointId, enabled: bool) -> Result<()> {
        let mut state = self.connected()?;
        if state.failing_toggles.contains(&breakpoint) {
            return Err(Error::Transport(format!("cannot toggle breakpoint {breakpoint}")));
        }
        match state.breakpoints.get_mut(&breakpoint) {
            Some((_, flag)) => {
                *flag = enabled;
                Ok(())
            }
            None => Err(Error::Transport(format!("unknown breakpoint {breakpoint}"))),
        }
    }

    fn call_stack(&self) -> Result<Vec<HostFrame>> {
        let mut state = self.connected()?;
        state.call_stack_requests += 1;
        Ok(state.call_stack.clone())
    }

    fn properties(&self, object: HostObjectId) -> Result<Vec<(String, HostValue)>> {
        let state = self.connected()?;
        Ok(state.properties.get(&object).cloned().unwrap_or_default())
    }
}
