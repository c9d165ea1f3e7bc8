//! Symbolic debugging on top of a host debugger.
//!
//! The [`Debugger`] translates between the host runtime's debugger, which only understands
//! generated code, and a view in terms of the original program: breakpoints on source lines,
//! call frames with source locations, variables and fields under their original names.
//!
//! # Architecture
//!
//! The debugger is driven by two kinds of input, both on the caller's thread:
//!
//! - direct calls such as [`Debugger::create_breakpoint`] or [`Debugger::step_over`]
//! - host events, handed over one at a time through [`Debugger::handle_event`]
//!
//! When the host reports a new script, the debugger asks its [`DebugInformationProvider`] for the
//! script's [`DebugInformation`] and indexes it by every source file it covers. A source line can
//! be realized in many places (inlining, several scripts), so one symbolic [`Breakpoint`] fans out
//! to one host breakpoint per generated location.
//!
//! Breakpoints live in an arena owned by the debugger and handles only carry an id. A reverse
//! index maps every host breakpoint back to its symbolic breakpoint, which is how a host pause is
//! reported in terms the caller knows.
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use aotdbg::debugger::{Debugger, HostEvent, MemoryProvider};
//!
//! let provider = Arc::new(MemoryProvider::new());
//! provider.insert("app.js", info);
//!
//! let mut debugger = Debugger::new(host, provider);
//! debugger.handle_event(HostEvent::ScriptAdded("app.js".into()));
//!
//! if let Some(breakpoint) = debugger.create_breakpoint("Main.java", 5) {
//!     println!("{} host breakpoints", breakpoint.host_breakpoints(&debugger).len());
//! }
//! ```

mod breakpoint;
mod callframe;
mod host;
mod provider;
mod value;

pub use breakpoint::{Breakpoint, BreakpointFlags, BreakpointId, BreakpointLocation};
pub use callframe::CallFrame;
pub use host::{
    HostBreakpointId, HostDebugger, HostEvent, HostFrame, HostLocation, HostObjectId, HostValue,
};
pub use provider::{DebugInformationProvider, FileProvider, MemoryProvider, DEFAULT_EXTENSION};
pub use value::{HasProperties, ObjectValue, PropertyMap, Value};

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{Arc, OnceLock},
};

use log::{debug, trace, warn};

use crate::{
    config::DebuggerConfig,
    debugger::breakpoint::BreakpointEntry,
    information::{DebugInformation, SourceLocation, Successor},
    Result,
};

/// Events delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerEvent {
    /// Execution stopped
    Paused {
        /// The symbolic breakpoint that was hit, if the pause was caused by one
        breakpoint: Option<Breakpoint>,
    },
    /// Execution continued
    Resumed,
    /// A script was loaded
    ScriptAdded(String),
    /// The debugger connected to the debuggee
    Attached,
    /// The debugger lost its connection to the debuggee
    Detached,
    /// A breakpoint gained its first host breakpoint or lost all of them, which flips
    /// [`Breakpoint::is_valid`]
    BreakpointStatusChanged(Breakpoint),
}

/// Id of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&DebuggerEvent) + Send + Sync>;

/// The symbolic debugger.
pub struct Debugger {
    host: Arc<dyn HostDebugger>,
    provider: Arc<dyn DebugInformationProvider>,
    config: DebuggerConfig,

    scripts: HashMap<String, Arc<DebugInformation>>,
    /// Source file name to the scripts covering it, in load order
    scripts_by_file: HashMap<String, Vec<String>>,

    breakpoints: BTreeMap<BreakpointId, BreakpointEntry>,
    host_breakpoints: HashMap<HostBreakpointId, BreakpointId>,
    next_breakpoint: u64,
    /// Symbolic breakpoints destroyed on the next resume
    temporary_breakpoints: Vec<BreakpointId>,
    /// Host breakpoints placed by smart stepping, destroyed on the next resume
    step_breakpoints: Vec<HostBreakpointId>,

    call_stack: OnceLock<Arc<[CallFrame]>>,

    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl Debugger {
    /// Create a debugger with the default configuration.
    pub fn new(host: Arc<dyn HostDebugger>, provider: Arc<dyn DebugInformationProvider>) -> Self {
        Self::with_config(host, provider, DebuggerConfig::default())
    }

    /// Create a debugger with an explicit configuration.
    pub fn with_config(
        host: Arc<dyn HostDebugger>,
        provider: Arc<dyn DebugInformationProvider>,
        config: DebuggerConfig,
    ) -> Self {
        Debugger {
            host,
            provider,
            config,
            scripts: HashMap::new(),
            scripts_by_file: HashMap::new(),
            breakpoints: BTreeMap::new(),
            host_breakpoints: HashMap::new(),
            next_breakpoint: 0,
            temporary_breakpoints: Vec::new(),
            step_breakpoints: Vec::new(),
            call_stack: OnceLock::new(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    /// Register a listener for [`DebuggerEvent`]s.
    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&DebuggerEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    /// Request a pause.
    ///
    /// # Errors
    /// Propagates host transport errors.
    pub fn suspend(&self) -> Result<()> {
        self.host.suspend()
    }

    /// Request execution to continue.
    ///
    /// # Errors
    /// Propagates host transport errors.
    pub fn resume(&self) -> Result<()> {
        self.host.resume()
    }

    /// Returns `true` while the debuggee is paused.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.host.is_suspended()
    }

    /// Returns `true` while connected to the debuggee.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.host.is_attached()
    }

    /// Disconnect from the debuggee.
    ///
    /// Breakpoints survive a detach but turn invalid once the host reports
    /// [`HostEvent::Detached`]. They are resolved again on the next [`HostEvent::Attached`].
    ///
    /// # Errors
    /// Propagates host transport errors.
    pub fn detach(&self) -> Result<()> {
        self.host.detach()
    }

    /// Step to the next source line, entering calls.
    ///
    /// # Errors
    /// Propagates host transport errors.
    pub fn step_into(&mut self) -> Result<()> {
        self.step(true)
    }

    /// Step to the next source line, stepping over calls.
    ///
    /// # Errors
    /// Propagates host transport errors.
    pub fn step_over(&mut self) -> Result<()> {
        self.step(false)
    }

    /// Run until the current function returns.
    ///
    /// # Errors
    /// Propagates host transport errors.
    pub fn step_out(&self) -> Result<()> {
        self.host.step_out()
    }

    /// The debug information registered for `script`.
    #[must_use]
    pub fn debug_information(&self, script: &str) -> Option<&Arc<DebugInformation>> {
        self.scripts.get(script)
    }

    /// Names of the scripts whose debug information covers `file`.
    #[must_use]
    pub fn scripts_covering(&self, file: &str) -> &[String] {
        self.scripts_by_file.get(file).map_or(&[], Vec::as_slice)
    }

    /// Resolve a generated location inside a script.
    #[must_use]
    pub fn source_location(&self, location: &HostLocation) -> SourceLocation {
        self.scripts
            .get(&location.script)
            .map_or(SourceLocation::UNKNOWN, |info| {
                info.source_location(location.location)
            })
    }

    /// Set a breakpoint on a source line.
    ///
    /// Returns `None` if no loaded script has generated code for that line. Host breakpoints that
    /// fail to be created are skipped.
    pub fn create_breakpoint(&mut self, file: &str, line: u32) -> Option<Breakpoint> {
        self.create_breakpoint_with(file, line, BreakpointFlags::ENABLED)
    }

    /// Run until execution reaches a source line.
    ///
    /// The host breakpoints placed for this are temporary: they are all destroyed on the next
    /// resume, whichever of them was hit. Does nothing if the debuggee is not paused.
    ///
    /// # Errors
    /// Propagates host transport errors from resuming.
    pub fn continue_to_location(&mut self, file: &str, line: u32) -> Result<Option<Breakpoint>> {
        if !self.is_suspended() {
            return Ok(None);
        }

        let breakpoint = self.create_breakpoint_with(
            file,
            line,
            BreakpointFlags::ENABLED | BreakpointFlags::TEMPORARY,
        );
        if let Some(breakpoint) = breakpoint {
            self.temporary_breakpoints.push(breakpoint.id());
        }

        self.host.resume()?;
        Ok(breakpoint)
    }

    /// All live breakpoints, temporary ones included.
    #[must_use]
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.breakpoints.keys().copied().map(Breakpoint::new).collect()
    }

    /// The symbolic breakpoint a host breakpoint belongs to.
    #[must_use]
    pub fn breakpoint_for_host(&self, host_breakpoint: HostBreakpointId) -> Option<Breakpoint> {
        self.host_breakpoints
            .get(&host_breakpoint)
            .copied()
            .map(Breakpoint::new)
    }

    /// The symbolic call stack, innermost frame first.
    ///
    /// Returns `None` while the debuggee runs. The stack is computed once per pause.
    ///
    /// # Errors
    /// Propagates host transport errors.
    pub fn call_stack(&self) -> Result<Option<Arc<[CallFrame]>>> {
        if !self.is_suspended() {
            return Ok(None);
        }
        if let Some(frames) = self.call_stack.get() {
            return Ok(Some(Arc::clone(frames)));
        }

        let frames = self.resolve_call_stack()?;
        Ok(Some(Arc::clone(self.call_stack.get_or_init(|| frames))))
    }

    /// Source-level variables of a frame. Same as [`CallFrame::variables`].
    #[must_use]
    pub fn variables<'f>(&self, frame: &'f CallFrame) -> &'f PropertyMap {
        frame.variables()
    }

    /// Process one event reported by the host debugger.
    ///
    /// Listeners see a [`DebuggerEvent::BreakpointStatusChanged`] for every breakpoint whose
    /// validity the event flipped, followed by the event itself.
    pub fn handle_event(&mut self, event: HostEvent) {
        let (changed, event) = match event {
            HostEvent::Paused { breakpoint } => {
                self.call_stack = OnceLock::new();
                let breakpoint = breakpoint.and_then(|id| self.breakpoint_for_host(id));
                (Vec::new(), DebuggerEvent::Paused { breakpoint })
            }
            HostEvent::Resumed => {
                self.call_stack = OnceLock::new();
                self.clear_temporary_breakpoints();
                (Vec::new(), DebuggerEvent::Resumed)
            }
            HostEvent::ScriptAdded(name) => {
                let changed = self.add_script(&name);
                (changed, DebuggerEvent::ScriptAdded(name))
            }
            HostEvent::Attached => {
                debug!("Attached, rebuilding {} breakpoints", self.breakpoints.len());
                (self.resolve_pending_breakpoints(None), DebuggerEvent::Attached)
            }
            HostEvent::Detached => {
                self.call_stack = OnceLock::new();
                (self.forget_host_breakpoints(), DebuggerEvent::Detached)
            }
        };

        for breakpoint in changed {
            self.notify(&DebuggerEvent::BreakpointStatusChanged(breakpoint));
        }
        self.notify(&event);
    }

    fn notify(&mut self, event: &DebuggerEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub(crate) fn breakpoint_entry(&self, id: BreakpointId) -> Option<&BreakpointEntry> {
        self.breakpoints.get(&id)
    }

    pub(crate) fn set_breakpoint_enabled(&mut self, id: BreakpointId, enabled: bool) -> Result<()> {
        let Some(entry) = self.breakpoints.get_mut(&id) else {
            return Ok(());
        };
        if entry.flags.contains(BreakpointFlags::ENABLED) == enabled {
            return Ok(());
        }

        // Either every host breakpoint is toggled or none is
        for (index, host_breakpoint) in entry.host_breakpoints.iter().enumerate() {
            if let Err(error) = self.host.set_breakpoint_enabled(*host_breakpoint, enabled) {
                for toggled in &entry.host_breakpoints[..index] {
                    if let Err(error) = self.host.set_breakpoint_enabled(*toggled, !enabled) {
                        warn!("Failed to restore host breakpoint {toggled}: {error}");
                    }
                }
                return Err(error);
            }
        }
        entry.flags.set(BreakpointFlags::ENABLED, enabled);
        Ok(())
    }

    pub(crate) fn destroy_breakpoint(&mut self, id: BreakpointId) {
        let Some(entry) = self.breakpoints.remove(&id) else {
            return;
        };

        for host_breakpoint in entry.host_breakpoints {
            self.host_breakpoints.remove(&host_breakpoint);
            if let Err(error) = self.host.destroy_breakpoint(host_breakpoint) {
                warn!("Failed to destroy host breakpoint {host_breakpoint}: {error}");
            }
        }
        self.temporary_breakpoints.retain(|temporary| *temporary != id);
    }

    fn create_breakpoint_with(
        &mut self,
        file: &str,
        line: u32,
        flags: BreakpointFlags,
    ) -> Option<Breakpoint> {
        let locations = self.resolve_line(file, line, None);
        let host_breakpoints = self.create_host_breakpoints(&locations);
        if host_breakpoints.is_empty() {
            return None;
        }

        let id = BreakpointId(self.next_breakpoint);
        self.next_breakpoint += 1;
        for host_breakpoint in &host_breakpoints {
            self.host_breakpoints.insert(*host_breakpoint, id);
        }
        debug!(
            "Breakpoint at {file}:{line} fans out to {} host breakpoints",
            host_breakpoints.len()
        );

        self.breakpoints.insert(
            id,
            BreakpointEntry {
                location: BreakpointLocation {
                    file: file.to_string(),
                    line,
                },
                host_breakpoints,
                flags,
            },
        );
        Some(Breakpoint::new(id))
    }

    /// Generated locations realizing `line` of `file`, optionally restricted to one script.
    fn resolve_line(&self, file: &str, line: u32, only: Option<&str>) -> BTreeSet<HostLocation> {
        let mut locations = BTreeSet::new();
        for script in self.scripts_covering(file) {
            if only.is_some_and(|only| only != script.as_str()) {
                continue;
            }
            let Some(info) = self.scripts.get(script) else {
                continue;
            };
            for location in info.generated_locations_by_name(file, line) {
                locations.insert(HostLocation::new(script.clone(), *location));
            }
        }
        locations
    }

    fn create_host_breakpoints(&self, locations: &BTreeSet<HostLocation>) -> Vec<HostBreakpointId> {
        locations
            .iter()
            .filter_map(|location| match self.host.create_breakpoint(location) {
                Ok(id) => Some(id),
                Err(error) => {
                    warn!("Failed to create host breakpoint at {location}: {error}");
                    None
                }
            })
            .collect()
    }

    fn clear_temporary_breakpoints(&mut self) {
        let temporary = std::mem::take(&mut self.temporary_breakpoints);
        let steps = std::mem::take(&mut self.step_breakpoints);
        if temporary.is_empty() && steps.is_empty() {
            return;
        }

        debug!(
            "Clearing {} temporary breakpoints and {} step breakpoints",
            temporary.len(),
            steps.len()
        );
        for id in temporary {
            self.destroy_breakpoint(id);
        }
        for host_breakpoint in steps {
            if let Err(error) = self.host.destroy_breakpoint(host_breakpoint) {
                warn!("Failed to destroy step breakpoint {host_breakpoint}: {error}");
            }
        }
    }

    fn add_script(&mut self, name: &str) -> Vec<Breakpoint> {
        if self.scripts.contains_key(name) {
            return Vec::new();
        }
        let Some(info) = self.provider.debug_information(name) else {
            debug!("No debug information for script {name}");
            return Vec::new();
        };

        for file in info.covered_files() {
            self.scripts_by_file
                .entry(file.to_string())
                .or_default()
                .push(name.to_string());
        }
        self.scripts.insert(name.to_string(), info);
        debug!("Registered debug information for script {name}");

        self.resolve_pending_breakpoints(Some(name))
    }

    /// Give permanent breakpoints host breakpoints at newly available locations.
    ///
    /// With a script, every permanent breakpoint is extended with that script's locations.
    /// Without one, every permanent breakpoint is rebuilt: its current host breakpoints are
    /// destroyed and recreated from all loaded scripts. Returns the breakpoints whose validity
    /// flipped.
    fn resolve_pending_breakpoints(&mut self, script: Option<&str>) -> Vec<Breakpoint> {
        let ids: Vec<BreakpointId> = self
            .breakpoints
            .iter()
            .filter(|(_, entry)| !entry.flags.contains(BreakpointFlags::TEMPORARY))
            .map(|(id, _)| *id)
            .collect();

        let mut changed = Vec::new();
        for id in ids {
            let Some(entry) = self.breakpoints.get_mut(&id) else {
                continue;
            };
            let was_valid = !entry.host_breakpoints.is_empty();
            if script.is_none() {
                for host_breakpoint in std::mem::take(&mut entry.host_breakpoints) {
                    self.host_breakpoints.remove(&host_breakpoint);
                    if let Err(error) = self.host.destroy_breakpoint(host_breakpoint) {
                        trace!("Stale host breakpoint {host_breakpoint} not destroyed: {error}");
                    }
                }
            }

            let Some(entry) = self.breakpoints.get(&id) else {
                continue;
            };
            let enabled = entry.flags.contains(BreakpointFlags::ENABLED);
            let locations = self.resolve_line(&entry.location.file, entry.location.line, script);
            let added = self.create_host_breakpoints(&locations);

            for host_breakpoint in &added {
                self.host_breakpoints.insert(*host_breakpoint, id);
                if !enabled {
                    if let Err(error) = self.host.set_breakpoint_enabled(*host_breakpoint, false) {
                        warn!("Failed to disable host breakpoint {host_breakpoint}: {error}");
                    }
                }
            }
            if let Some(entry) = self.breakpoints.get_mut(&id) {
                entry.host_breakpoints.extend(added);
                if was_valid != !entry.host_breakpoints.is_empty() {
                    changed.push(Breakpoint::new(id));
                }
            }
        }
        changed
    }

    /// Drop every host breakpoint handle after the host lost them. Temporary breakpoints go
    /// away entirely. Returns the permanent breakpoints that became invalid.
    fn forget_host_breakpoints(&mut self) -> Vec<Breakpoint> {
        self.host_breakpoints.clear();
        self.step_breakpoints.clear();
        for id in std::mem::take(&mut self.temporary_breakpoints) {
            self.breakpoints.remove(&id);
        }

        let mut changed = Vec::new();
        for (id, entry) in &mut self.breakpoints {
            if !entry.host_breakpoints.is_empty() {
                entry.host_breakpoints.clear();
                changed.push(Breakpoint::new(*id));
            }
        }
        debug!("Detached, {} breakpoints invalidated", changed.len());
        changed
    }

    fn resolve_call_stack(&self) -> Result<Arc<[CallFrame]>> {
        let mut frames = Vec::new();
        let mut previous_unknown = false;

        for host_frame in self.host.call_stack()? {
            let info = self.scripts.get(&host_frame.location.script).cloned();
            let frame = CallFrame::new(host_frame, info, Arc::clone(&self.host));
            trace!(
                "Frame at {} resolved to {:?}",
                frame.host_location(),
                frame.location()
            );

            let unknown = frame.is_unknown();
            if !(unknown && previous_unknown && self.config.collapse_unknown_frames) {
                frames.push(frame);
            }
            previous_unknown = unknown;
        }
        Ok(frames.into())
    }

    fn step(&mut self, enter: bool) -> Result<()> {
        let targets = if self.config.smart_stepping {
            self.step_targets(enter)?
        } else {
            BTreeSet::new()
        };

        if targets.is_empty() {
            return self.host_step(enter);
        }

        let created = self.create_host_breakpoints(&targets);
        if created.is_empty() {
            debug!("No step breakpoint could be placed, stepping in the generated code");
            return self.host_step(enter);
        }
        self.step_breakpoints.extend(created);
        self.host.resume()
    }

    fn host_step(&self, enter: bool) -> Result<()> {
        if enter {
            self.host.step_into()
        } else {
            self.host.step_over()
        }
    }

    /// Generated locations where execution can next reach a new source line.
    ///
    /// Walks the stack from the innermost frame and continues into the caller only while the
    /// current line can leave its method. Calls are only entered from the innermost frame.
    fn step_targets(&self, enter: bool) -> Result<BTreeSet<HostLocation>> {
        let mut targets = BTreeSet::new();
        let Some(frames) = self.call_stack()? else {
            return Ok(targets);
        };
        let Some(top) = frames.first() else {
            return Ok(targets);
        };
        if top.location().file_and_line().is_none() {
            return Ok(targets);
        }

        for (depth, frame) in frames.iter().enumerate() {
            let Some(info) = frame.debug_information() else {
                break;
            };
            let script = &frame.host_location().script;
            let mut exits = false;

            if let Some((file, line)) = frame.location().file_and_line() {
                for successor in info.following_lines(file, line).unwrap_or_default() {
                    match *successor {
                        Successor::Exit => exits = true,
                        Successor::Line { file, line } => {
                            for location in info.generated_locations(file, line) {
                                targets.insert(HostLocation::new(script.clone(), *location));
                            }
                        }
                    }
                }
            }

            if enter && depth == 0 {
                let target = info
                    .call_site(frame.host_location().location)
                    .and_then(|site| site.method());
                if let Some(method) = target {
                    for candidate in info.overriding_methods(method) {
                        for location in info.method_entrances(candidate) {
                            targets.insert(HostLocation::new(script.clone(), *location));
                        }
                    }
                }
            }

            if !exits {
                break;
            }
        }
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{
        factories::{inheritance_info, scenario_info},
        MockHost,
    };
    use crate::information::GeneratedLocation;

    fn loc(line: u32, column: u32) -> GeneratedLocation {
        GeneratedLocation::new(line, column)
    }

    fn debugger_with(scripts: &[(&str, Arc<DebugInformation>)]) -> (Arc<MockHost>, Debugger) {
        let host = Arc::new(MockHost::new());
        let provider = Arc::new(MemoryProvider::new());
        for (name, info) in scripts {
            provider.insert(*name, Arc::clone(info));
        }
        let mut debugger = Debugger::new(host.clone(), provider);
        for (name, _) in scripts {
            debugger.handle_event(HostEvent::ScriptAdded(name.to_string()));
        }
        (host, debugger)
    }

    #[test]
    fn test_breakpoint_fan_out() {
        let (host, mut debugger) =
            debugger_with(&[("a.js", scenario_info()), ("b.js", scenario_info())]);

        let breakpoint = debugger.create_breakpoint("Main.java", 5).unwrap();
        assert_eq!(breakpoint.host_breakpoints(&debugger).len(), 2);
        assert!(breakpoint.is_valid(&debugger));
        assert!(breakpoint.is_enabled(&debugger));
        assert_eq!(host.live_breakpoints().len(), 2);

        let first = breakpoint.host_breakpoints(&debugger)[0];
        assert_eq!(debugger.breakpoint_for_host(first), Some(breakpoint));
    }

    #[test]
    fn test_breakpoint_without_code() {
        let (host, mut debugger) = debugger_with(&[("a.js", scenario_info())]);

        assert!(debugger.create_breakpoint("Main.java", 6).is_none());
        assert!(debugger.create_breakpoint("Missing.java", 5).is_none());
        assert!(debugger.breakpoints().is_empty());
        assert!(host.live_breakpoints().is_empty());
    }

    #[test]
    fn test_breakpoint_skips_failed_host_breakpoints() {
        let (host, mut debugger) =
            debugger_with(&[("a.js", scenario_info()), ("b.js", scenario_info())]);
        host.fail_breakpoints_in("a.js");

        let breakpoint = debugger.create_breakpoint("Main.java", 5).unwrap();
        assert_eq!(breakpoint.host_breakpoints(&debugger).len(), 1);
    }

    #[test]
    fn test_destroy_idempotent() {
        let (host, mut debugger) = debugger_with(&[("a.js", scenario_info())]);
        let breakpoint = debugger.create_breakpoint("Main.java", 7).unwrap();
        let host_breakpoint = breakpoint.host_breakpoints(&debugger)[0];

        breakpoint.destroy(&mut debugger);
        breakpoint.destroy(&mut debugger);

        assert!(breakpoint.is_destroyed(&debugger));
        assert!(!breakpoint.is_valid(&debugger));
        assert_eq!(debugger.breakpoint_for_host(host_breakpoint), None);
        assert_eq!(host.destroyed_breakpoints(), vec![host_breakpoint]);
    }

    #[test]
    fn test_enable_fans_out() {
        let (host, mut debugger) =
            debugger_with(&[("a.js", scenario_info()), ("b.js", scenario_info())]);
        let breakpoint = debugger.create_breakpoint("Main.java", 5).unwrap();

        breakpoint.enable(&mut debugger, false).unwrap();
        assert!(!breakpoint.is_enabled(&debugger));
        assert_eq!(host.disabled_breakpoints().len(), 2);

        breakpoint.enable(&mut debugger, true).unwrap();
        assert!(host.disabled_breakpoints().is_empty());
    }

    #[test]
    fn test_breakpoint_resolved_in_later_script() {
        let host = Arc::new(MockHost::new());
        let provider = Arc::new(MemoryProvider::new());
        provider.insert("a.js", scenario_info());
        provider.insert("late.js", scenario_info());
        let mut debugger = Debugger::new(host.clone(), provider);
        debugger.handle_event(HostEvent::ScriptAdded("a.js".into()));

        let breakpoint = debugger.create_breakpoint("Main.java", 5).unwrap();
        let disabled = debugger.create_breakpoint("Main.java", 7).unwrap();
        disabled.enable(&mut debugger, false).unwrap();
        assert_eq!(breakpoint.host_breakpoints(&debugger).len(), 1);

        debugger.handle_event(HostEvent::ScriptAdded("late.js".into()));
        debugger.handle_event(HostEvent::ScriptAdded("late.js".into()));

        assert_eq!(breakpoint.host_breakpoints(&debugger).len(), 2);
        assert_eq!(disabled.host_breakpoints(&debugger).len(), 2);
        assert_eq!(host.live_breakpoints().len(), 4);
        assert_eq!(host.disabled_breakpoints().len(), 2);
        assert_eq!(debugger.scripts_covering("Main.java"), ["a.js", "late.js"]);
    }

    #[test]
    fn test_continue_to_location_not_suspended() {
        let (host, mut debugger) = debugger_with(&[("a.js", scenario_info())]);

        assert_eq!(debugger.continue_to_location("Main.java", 5).unwrap(), None);
        assert!(host.live_breakpoints().is_empty());
        assert_eq!(host.resume_count(), 0);
    }

    #[test]
    fn test_temporary_breakpoints_cleared_on_resume() {
        let (host, mut debugger) = debugger_with(&[("a.js", scenario_info())]);
        let permanent = debugger.create_breakpoint("Main.java", 7).unwrap();
        host.set_suspended(true);

        let temporary = debugger
            .continue_to_location("Main.java", 5)
            .unwrap()
            .unwrap();
        assert!(temporary.is_temporary(&debugger));
        assert_eq!(host.resume_count(), 1);

        debugger.handle_event(HostEvent::Resumed);
        assert!(temporary.is_destroyed(&debugger));
        assert!(!permanent.is_destroyed(&debugger));

        temporary.destroy(&mut debugger);
        debugger.handle_event(HostEvent::Resumed);
        assert_eq!(host.live_breakpoints().len(), 1);
        assert_eq!(host.destroyed_breakpoints().len(), 1);
    }

    #[test]
    fn test_paused_event_resolves_breakpoint() {
        let (host, mut debugger) = debugger_with(&[("a.js", scenario_info())]);
        let breakpoint = debugger.create_breakpoint("Main.java", 5).unwrap();
        let host_breakpoint = breakpoint.host_breakpoints(&debugger)[0];

        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let listener = debugger.add_listener(move |event| sink.lock().unwrap().push(event.clone()));

        host.set_suspended(true);
        debugger.handle_event(HostEvent::Paused {
            breakpoint: Some(host_breakpoint),
        });
        debugger.handle_event(HostEvent::Paused { breakpoint: None });
        assert!(debugger.remove_listener(listener));
        debugger.handle_event(HostEvent::Resumed);

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                DebuggerEvent::Paused {
                    breakpoint: Some(breakpoint)
                },
                DebuggerEvent::Paused { breakpoint: None },
            ]
        );
    }

    #[test]
    fn test_call_stack_collapses_unknown_frames() {
        let (host, debugger) = debugger_with(&[("a.js", scenario_info())]);
        host.set_suspended(true);
        host.set_call_stack(vec![
            MockHost::frame("a.js", loc(10, 2)),
            MockHost::frame("a.js", loc(1, 0)),
            MockHost::frame("unknown.js", loc(3, 0)),
            MockHost::frame("a.js", loc(12, 0)),
        ]);

        let frames = debugger.call_stack().unwrap().unwrap();
        let lines: Vec<i32> = frames.iter().map(|frame| frame.location().line).collect();
        assert_eq!(lines, vec![5, -1, 7]);
        assert_eq!(frames[0].file_name(), Some("Main.java"));
    }

    #[test]
    fn test_call_stack_keeps_known_frames() {
        let (host, debugger) = debugger_with(&[("a.js", scenario_info())]);
        host.set_suspended(true);
        host.set_call_stack(vec![
            MockHost::frame("a.js", loc(10, 2)),
            MockHost::frame("a.js", loc(12, 0)),
        ]);

        assert_eq!(debugger.call_stack().unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_call_stack_cached_per_pause() {
        let (host, mut debugger) = debugger_with(&[("a.js", scenario_info())]);
        assert!(debugger.call_stack().unwrap().is_none());

        host.set_suspended(true);
        host.set_call_stack(vec![MockHost::frame("a.js", loc(10, 2))]);
        let first = debugger.call_stack().unwrap().unwrap();
        let second = debugger.call_stack().unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(host.call_stack_requests(), 1);

        debugger.handle_event(HostEvent::Paused { breakpoint: None });
        let third = debugger.call_stack().unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_transport_errors_propagate() {
        let (host, mut debugger) = debugger_with(&[("a.js", scenario_info())]);
        host.disconnect();

        assert!(matches!(debugger.suspend(), Err(crate::Error::Transport(_))));
        assert!(matches!(debugger.step_out(), Err(crate::Error::Transport(_))));
        assert!(matches!(debugger.step_over(), Err(crate::Error::Transport(_))));
    }

    #[test]
    fn test_step_without_source_falls_back() {
        let (host, mut debugger) = debugger_with(&[("a.js", scenario_info())]);
        host.set_suspended(true);
        host.set_call_stack(vec![MockHost::frame("unknown.js", loc(1, 0))]);

        debugger.step_over().unwrap();
        debugger.step_into().unwrap();
        assert_eq!(host.step_count(), 2);
        assert_eq!(host.resume_count(), 0);
    }

    #[test]
    fn test_smart_step_over() {
        let (host, mut debugger) = debugger_with(&[("a.js", inheritance_info())]);
        host.set_suspended(true);
        // Base.java line 3, whose successor is line 4 at (11, 0)
        host.set_call_stack(vec![MockHost::frame("a.js", loc(10, 1))]);

        debugger.step_over().unwrap();
        assert_eq!(host.step_count(), 0);
        assert_eq!(host.resume_count(), 1);
        assert_eq!(
            host.live_breakpoints(),
            vec![HostLocation::new("a.js", loc(11, 0))]
        );

        debugger.handle_event(HostEvent::Resumed);
        assert!(host.live_breakpoints().is_empty());
    }

    #[test]
    fn test_smart_step_into_virtual_call() {
        let (host, mut debugger) = debugger_with(&[("a.js", inheritance_info())]);
        host.set_suspended(true);
        // Base.java line 4 holds a virtual call to Base.run and can exit the method
        host.set_call_stack(vec![
            MockHost::frame("a.js", loc(11, 6)),
            MockHost::frame("a.js", loc(10, 1)),
        ]);

        debugger.step_into().unwrap();
        let mut live = host.live_breakpoints();
        live.sort();
        assert_eq!(
            live,
            vec![
                HostLocation::new("a.js", loc(10, 0)),
                HostLocation::new("a.js", loc(11, 0)),
                HostLocation::new("a.js", loc(20, 0)),
                HostLocation::new("a.js", loc(30, 0)),
            ]
        );
    }

    #[test]
    fn test_passthrough_stepping() {
        let host = Arc::new(MockHost::new());
        let provider = Arc::new(MemoryProvider::new());
        provider.insert("a.js", inheritance_info());
        let mut debugger =
            Debugger::with_config(host.clone(), provider, DebuggerConfig::passthrough());
        debugger.handle_event(HostEvent::ScriptAdded("a.js".into()));
        host.set_suspended(true);
        host.set_call_stack(vec![MockHost::frame("a.js", loc(10, 1))]);

        debugger.step_over().unwrap();
        assert_eq!(host.step_count(), 1);
        assert!(host.live_breakpoints().is_empty());
    }

    #[test]
    fn test_smart_step_falls_back_when_breakpoints_fail() {
        let (host, mut debugger) = debugger_with(&[("a.js", inheritance_info())]);
        host.set_suspended(true);
        host.set_call_stack(vec![MockHost::frame("a.js", loc(10, 1))]);
        host.fail_breakpoints_in("a.js");

        debugger.step_over().unwrap();
        assert_eq!(host.step_count(), 1);
        assert_eq!(host.resume_count(), 0);
        assert!(host.live_breakpoints().is_empty());
    }

    #[test]
    fn test_enable_rolls_back_on_failure() {
        let (host, mut debugger) =
            debugger_with(&[("a.js", scenario_info()), ("b.js", scenario_info())]);
        let breakpoint = debugger.create_breakpoint("Main.java", 5).unwrap();
        host.fail_toggle(breakpoint.host_breakpoints(&debugger)[1]);

        assert!(matches!(
            breakpoint.enable(&mut debugger, false),
            Err(crate::Error::Transport(_))
        ));
        assert!(breakpoint.is_enabled(&debugger));
        assert!(host.disabled_breakpoints().is_empty());
    }

    #[test]
    fn test_call_stack_shared_across_threads() {
        let (host, debugger) = debugger_with(&[("a.js", inheritance_info())]);
        host.set_suspended(true);
        host.set_call_stack(vec![HostFrame {
            location: HostLocation::new("a.js", loc(10, 1)),
            variables: vec![(
                "$this".to_string(),
                HostValue::Object {
                    handle: 7,
                    class_name: Some("Derived".to_string()),
                },
            )],
        }]);
        host.set_properties(7, vec![("a".to_string(), HostValue::Number(3.0))]);

        let stacks: Vec<Arc<[CallFrame]>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| debugger.call_stack().unwrap().unwrap()))
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().unwrap())
                .collect()
        });
        for stack in &stacks[1..] {
            assert!(Arc::ptr_eq(&stacks[0], stack));
        }

        let this = &stacks[0][0].variables()["self"];
        let maps: Vec<&PropertyMap> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| scope.spawn(move || this.properties().unwrap()))
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().unwrap())
                .collect()
        });
        for map in &maps {
            assert!(std::ptr::eq(maps[0], *map));
        }
        assert_eq!(maps[0]["count"].as_number(), Some(3.0));
    }

    fn record_events(debugger: &mut Debugger) -> Arc<std::sync::Mutex<Vec<DebuggerEvent>>> {
        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        debugger.add_listener(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    #[test]
    fn test_detach_and_reattach() {
        let (host, mut debugger) = debugger_with(&[("a.js", scenario_info())]);
        let breakpoint = debugger.create_breakpoint("Main.java", 5).unwrap();
        let stale = breakpoint.host_breakpoints(&debugger)[0];
        host.set_suspended(true);
        let temporary = debugger
            .continue_to_location("Main.java", 7)
            .unwrap()
            .unwrap();
        let events = record_events(&mut debugger);
        assert!(debugger.is_attached());

        debugger.detach().unwrap();
        assert!(!debugger.is_attached());
        assert_eq!(host.detach_count(), 1);
        debugger.handle_event(HostEvent::Detached);
        assert!(!breakpoint.is_valid(&debugger));
        assert!(!breakpoint.is_destroyed(&debugger));
        assert!(temporary.is_destroyed(&debugger));
        assert_eq!(debugger.breakpoint_for_host(stale), None);

        host.reattach();
        debugger.handle_event(HostEvent::Attached);
        assert!(debugger.is_attached());
        assert!(breakpoint.is_valid(&debugger));
        assert_eq!(host.live_breakpoints().len(), 1);
        let fresh = breakpoint.host_breakpoints(&debugger)[0];
        assert_eq!(debugger.breakpoint_for_host(fresh), Some(breakpoint));

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                DebuggerEvent::BreakpointStatusChanged(breakpoint),
                DebuggerEvent::Detached,
                DebuggerEvent::BreakpointStatusChanged(breakpoint),
                DebuggerEvent::Attached,
            ]
        );
    }

    #[test]
    fn test_attach_rebuilds_partially_restored_breakpoints() {
        let host = Arc::new(MockHost::new());
        let provider = Arc::new(MemoryProvider::new());
        provider.insert("a.js", scenario_info());
        provider.insert("b.js", scenario_info());
        let mut debugger = Debugger::new(host.clone(), provider);
        debugger.handle_event(HostEvent::ScriptAdded("a.js".into()));
        let breakpoint = debugger.create_breakpoint("Main.java", 5).unwrap();
        let disabled = debugger.create_breakpoint("Main.java", 7).unwrap();
        disabled.enable(&mut debugger, false).unwrap();

        debugger.detach().unwrap();
        debugger.handle_event(HostEvent::Detached);
        host.reattach();
        let events = record_events(&mut debugger);

        // A script reported before the attach only restores its own locations
        debugger.handle_event(HostEvent::ScriptAdded("b.js".into()));
        assert_eq!(breakpoint.host_breakpoints(&debugger).len(), 1);
        debugger.handle_event(HostEvent::Attached);

        assert_eq!(breakpoint.host_breakpoints(&debugger).len(), 2);
        assert_eq!(disabled.host_breakpoints(&debugger).len(), 2);
        assert_eq!(host.live_breakpoints().len(), 4);
        assert_eq!(host.disabled_breakpoints().len(), 2);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                DebuggerEvent::BreakpointStatusChanged(breakpoint),
                DebuggerEvent::BreakpointStatusChanged(disabled),
                DebuggerEvent::ScriptAdded("b.js".to_string()),
                DebuggerEvent::Attached,
            ]
        );
    }
}
