//! Sources of debug information for scripts.
//!
//! The [`crate::debugger::Debugger`] asks its provider once per script, the first time the host
//! reports the script as loaded. A provider that has nothing for a script, or fails to decode what
//! it has, answers `None`; the script then runs with generated-code-only information.

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;
use log::{debug, warn};
use memmap2::Mmap;

use crate::{information::DebugInformation, Result};

/// Supplies the debug information of a script.
pub trait DebugInformationProvider: Send + Sync {
    /// The debug information of `script`, if any.
    fn debug_information(&self, script: &str) -> Option<Arc<DebugInformation>>;
}

impl<F> DebugInformationProvider for F
where
    F: Fn(&str) -> Option<Arc<DebugInformation>> + Send + Sync,
{
    fn debug_information(&self, script: &str) -> Option<Arc<DebugInformation>> {
        self(script)
    }
}

/// A thread-safe in-memory provider.
///
/// # Examples
///
/// ```rust
/// use aotdbg::debugger::{DebugInformationProvider, MemoryProvider};
/// use aotdbg::information::DebugInformationBuilder;
///
/// let provider = MemoryProvider::new();
/// provider.insert("app.js", DebugInformationBuilder::new().build());
///
/// assert!(provider.debug_information("app.js").is_some());
/// assert!(provider.debug_information("lib.js").is_none());
/// ```
#[derive(Debug, Default)]
pub struct MemoryProvider {
    scripts: DashMap<String, Arc<DebugInformation>>,
}

impl MemoryProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the debug information of `script`, replacing any previous one.
    pub fn insert(&self, script: impl Into<String>, info: Arc<DebugInformation>) {
        self.scripts.insert(script.into(), info);
    }

    /// Forget the debug information of `script`.
    pub fn remove(&self, script: &str) -> Option<Arc<DebugInformation>> {
        self.scripts.remove(script).map(|(_, info)| info)
    }

    /// Number of registered scripts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Returns `true` if no script is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl DebugInformationProvider for MemoryProvider {
    fn debug_information(&self, script: &str) -> Option<Arc<DebugInformation>> {
        self.scripts.get(script).map(|entry| Arc::clone(entry.value()))
    }
}

/// Default extension of debug-information files.
pub const DEFAULT_EXTENSION: &str = "aotdbg";

/// Reads `<directory>/<script file name>.<extension>` for each script.
#[derive(Debug, Clone)]
pub struct FileProvider {
    directory: PathBuf,
    extension: String,
}

impl FileProvider {
    /// Create a provider reading from `directory` with the default extension.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        FileProvider {
            directory: directory.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Use `extension` instead of the default.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Path of the debug-information file for `script`, or `None` if the script name has no
    /// file name component.
    #[must_use]
    pub fn path_for(&self, script: &str) -> Option<PathBuf> {
        let name = Path::new(script).file_name()?.to_str()?;
        Some(self.directory.join(format!("{}.{}", name, self.extension)))
    }

    fn load(path: &Path) -> Result<DebugInformation> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return DebugInformation::from_bytes(&[]);
        }

        // The mapping is only read while decoding and dropped before returning
        let mmap = unsafe { Mmap::map(&file) }?;
        DebugInformation::from_bytes(&mmap)
    }
}

impl DebugInformationProvider for FileProvider {
    fn debug_information(&self, script: &str) -> Option<Arc<DebugInformation>> {
        let path = self.path_for(script)?;

        match Self::load(&path) {
            Ok(info) => Some(Arc::new(info)),
            Err(crate::Error::FileError(error)) if error.kind() == io::ErrorKind::NotFound => {
                debug!("No debug information for {} at {}", script, path.display());
                None
            }
            Err(error) => {
                warn!(
                    "Failed to load debug information for {} from {}: {}",
                    script,
                    path.display(),
                    error
                );
                None
            }
        }
    }
}
