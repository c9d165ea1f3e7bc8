use thiserror::Error;

use crate::information::GeneratedLocation;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Decode Errors
/// - [`Error::OutOfBounds`] - The input ended in the middle of a value (truncated stream)
/// - [`Error::Malformed`] - The input is structurally invalid
///
/// ## Contract Violations
/// - [`Error::LocationOrder`] - Generated locations were emitted out of order
///
/// ## External Errors
/// - [`Error::Transport`] - A host debugger operation failed
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// Lookup misses are not errors. A generated location before the first recorded transition, or a
/// source line without generated code, is reported as `None` or an empty slice.
///
/// # Examples
///
/// ```rust
/// use aotdbg::{DebugInformation, Error};
///
/// // A string table claiming one entry, cut off before the entry
/// match DebugInformation::from_bytes(&[0x01]) {
///     Err(Error::OutOfBounds) => {}
///     other => panic!("unexpected result: {:?}", other.map(|_| ())),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input ended before a value was complete.
    ///
    /// Raised when a varint continuation chain, a string body or a table runs past the end of the
    /// buffer. This is the "truncated stream" error and is always reported distinctly from
    /// structural problems.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// The input is damaged and could not be decoded.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A generated location was emitted before one that was already recorded.
    ///
    /// The builder relies on non-decreasing emission order to keep every mapping sorted, which
    /// floor search depends on.
    #[error("Generated location {current} emitted after {previous}")]
    LocationOrder {
        /// The last location accepted by the builder
        previous: GeneratedLocation,
        /// The rejected location
        current: GeneratedLocation,
    },

    /// A host debugger operation failed.
    ///
    /// Produced by [`crate::debugger::HostDebugger`] implementations and handed back to the caller
    /// unchanged. The debugger never retries.
    #[error("Host debugger error: {0}")]
    Transport(String),

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}
