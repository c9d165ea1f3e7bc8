//! Configuration for the debugger and the debug-information reader.
//!
//! Both types are plain structs with sensible defaults and are passed explicitly to
//! [`crate::debugger::Debugger::with_config`] and
//! [`crate::information::DebugInformation::read_with_config`].

/// Configuration for the symbolic [`crate::debugger::Debugger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggerConfig {
    /// Collapse runs of consecutive call frames without source information into their first
    /// frame (default: true).
    pub collapse_unknown_frames: bool,

    /// Step through source lines using the control-flow graphs instead of single-stepping the
    /// generated code (default: true).
    pub smart_stepping: bool,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            collapse_unknown_frames: true,
            smart_stepping: true,
        }
    }
}

impl DebuggerConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration that shows every host frame and always delegates stepping to the
    /// host debugger.
    #[must_use]
    pub fn passthrough() -> Self {
        Self {
            collapse_unknown_frames: false,
            smart_stepping: false,
        }
    }

    /// Sets whether runs of frames without source information are collapsed.
    #[must_use]
    pub fn with_collapse_unknown_frames(mut self, enable: bool) -> Self {
        self.collapse_unknown_frames = enable;
        self
    }

    /// Sets whether stepping uses the control-flow graphs.
    #[must_use]
    pub fn with_smart_stepping(mut self, enable: bool) -> Self {
        self.smart_stepping = enable;
        self
    }
}

/// Limits applied while decoding debug information.
///
/// Any count or string length above a limit is reported as [`crate::Error::Malformed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Maximum number of entries in any table, mapping or graph (default: 2^24).
    pub max_entries: usize,

    /// Maximum byte length of a single string (default: 1 MiB).
    pub max_string_len: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_entries: 1 << 24,
            max_string_len: 1 << 20,
        }
    }
}

impl ReaderConfig {
    /// Creates a new configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of entries per table.
    #[must_use]
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Sets the maximum string length.
    #[must_use]
    pub fn with_max_string_len(mut self, max: usize) -> Self {
        self.max_string_len = max;
        self
    }
}
