//! Generated and source locations.

use std::fmt;

/// Index into the file name table.
pub type FileId = u32;
/// Index into the class name table.
pub type ClassId = u32;
/// Index into the method descriptor table.
pub type MethodId = u32;
/// Index into the field name table.
pub type FieldId = u32;
/// Index into the variable name table.
pub type VariableId = u32;
/// Index into the exact-method table, identifying one `(class, descriptor)` pair.
pub type ExactMethodId = u32;

/// A position in the generated code, ordered by line, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GeneratedLocation {
    /// Zero-based line in the generated code
    pub line: u32,
    /// Zero-based column in the generated code
    pub column: u32,
}

impl GeneratedLocation {
    /// Create a new generated location.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        GeneratedLocation { line, column }
    }
}

impl fmt::Display for GeneratedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A method identified by its class and its deduplicated descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodRef {
    /// Index into the class name table
    pub class_id: ClassId,
    /// Index into the method descriptor table
    pub method_descriptor_id: MethodId,
}

impl MethodRef {
    /// Create a new method reference.
    #[must_use]
    pub const fn new(class_id: ClassId, method_descriptor_id: MethodId) -> Self {
        MethodRef {
            class_id,
            method_descriptor_id,
        }
    }
}

/// A position in the original program.
///
/// Each component is resolved independently, so a location may know its file but not its line,
/// or its line but not its method. Such partial locations are valid results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// The source file, if known
    pub file: Option<FileId>,
    /// One-based source line, `-1` when unknown
    pub line: i32,
    /// The enclosing method, if known
    pub method: Option<MethodRef>,
}

impl SourceLocation {
    /// A location without any source information.
    pub const UNKNOWN: SourceLocation = SourceLocation {
        file: None,
        line: -1,
        method: None,
    };

    /// Returns `true` if neither the file nor the line is known.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.file.is_none() && self.line < 0
    }

    /// Returns the file and line if both are known.
    #[must_use]
    pub fn file_and_line(&self) -> Option<(FileId, u32)> {
        match (self.file, u32::try_from(self.line)) {
            (Some(file), Ok(line)) => Some((file, line)),
            _ => None,
        }
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::UNKNOWN
    }
}
