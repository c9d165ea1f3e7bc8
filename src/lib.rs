// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'debugger/provider.rs' uses mmap to map debug-information files into memory

//! # aotdbg
//!
//! Symbolic debugging for programs compiled ahead of time to a scripting target.
//!
//! A compiler that translates a class-based language (classes, methods, fields, local variables,
//! source files and lines) into generated script code loses that structure on the way. `aotdbg`
//! keeps it: the compiler records, while emitting code, which source construct every generated
//! location belongs to, and a debugger uses the record to present the running program in source
//! terms again.
//!
//! ## Features
//!
//! - **Compact on-disk format** - varint, zig-zag and run-length coded sections with delta-coded
//!   ids, decoded with full bounds and id validation
//! - **Transition-only recording** - mappings grow with the number of source changes, not with
//!   the number of instructions
//! - **Bidirectional lookup** - generated location to source location and source line to every
//!   generated location realizing it
//! - **Symbolic debugger** - breakpoints on source lines, collapsed call stacks, source-level
//!   variables and fields, line stepping driven by control-flow graphs
//!
//! ## Architecture
//!
//! - [`codec`] - the primitive encodings, [`Parser`] and [`Writer`]
//! - [`information`] - the read model [`DebugInformation`], its builder, reader and writer
//! - [`debugger`] - the [`debugger::Debugger`] bridging a [`debugger::HostDebugger`]
//! - [`config`] - [`config::DebuggerConfig`] and [`config::ReaderConfig`]
//!
//! ## Quick Start
//!
//! ```rust
//! use aotdbg::prelude::*;
//!
//! let mut builder = DebugInformationBuilder::new();
//! builder.emit_method_ref(GeneratedLocation::new(0, 0), Some(("Main", "main()V")))?;
//! builder.emit_location(GeneratedLocation::new(0, 0), Some("Main.java"), 3)?;
//! builder.emit_location(GeneratedLocation::new(0, 40), Some("Main.java"), 4)?;
//! let info = builder.build();
//!
//! // Store and load again
//! let loaded = DebugInformation::from_bytes(&info.to_bytes())?;
//! assert_eq!(loaded, *info);
//!
//! let main = loaded.files().id("Main.java").unwrap();
//! assert_eq!(loaded.generated_locations(main, 4), &[GeneratedLocation::new(0, 40)]);
//! assert_eq!(loaded.source_location(GeneratedLocation::new(0, 50)).line, 4);
//! # Ok::<(), aotdbg::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`]. Decoding errors carry the position in this crate
//! where the input was rejected; host failures surface as [`Error::Transport`].

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use aotdbg::prelude::*;
///
/// let info = DebugInformation::from_bytes(&[0; 12])?;
/// assert!(info.files().is_empty());
/// # Ok::<(), aotdbg::Error>(())
/// ```
pub mod prelude;

pub mod codec;
pub mod config;
pub mod debugger;
pub mod information;

/// `aotdbg` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `aotdbg` Error type
///
/// # Examples
///
/// ```rust
/// use aotdbg::{DebugInformation, Error};
///
/// match DebugInformation::from_bytes(&[0x80]) {
///     Ok(_) => println!("Loaded"),
///     Err(Error::OutOfBounds) => println!("Truncated input"),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// The debug-information read model.
///
/// See [`information::DebugInformation`].
pub use information::DebugInformation;

/// Low-level codec primitives.
pub use codec::{Parser, Writer};
