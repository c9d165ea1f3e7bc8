//! Per-file and per-class structures of the read model.

use std::collections::BTreeMap;

use crate::information::{ClassId, FieldId, FileId, GeneratedLocation, MethodId, MethodRef};

/// Reverse index of one source file: for each line, the generated locations realizing it and
/// the method the line belongs to.
///
/// Only lines with generated code are stored, so the size follows the number of transitions and
/// not the highest line number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDescription {
    lines: BTreeMap<u32, LineDescription>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LineDescription {
    method: Option<MethodRef>,
    generated_locations: Vec<GeneratedLocation>,
}

impl FileDescription {
    /// Generated locations at which execution enters `line`.
    #[must_use]
    pub fn generated_locations(&self, line: u32) -> &[GeneratedLocation] {
        self.lines
            .get(&line)
            .map_or(&[], |line| line.generated_locations.as_slice())
    }

    /// The method `line` belongs to, if known.
    #[must_use]
    pub fn method_at_line(&self, line: u32) -> Option<MethodRef> {
        self.lines.get(&line).and_then(|line| line.method)
    }

    /// One past the highest line with any recorded information.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines
            .keys()
            .next_back()
            .map_or(0, |line| *line as usize + 1)
    }

    /// Returns `true` if no generated code maps to this file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines that have generated code, with their locations.
    pub fn lines(&self) -> impl Iterator<Item = (u32, &[GeneratedLocation])> + '_ {
        self.lines
            .iter()
            .map(|(line, description)| (*line, description.generated_locations.as_slice()))
    }

    pub(crate) fn record(
        &mut self,
        line: u32,
        location: GeneratedLocation,
        method: Option<MethodRef>,
    ) {
        let description = self.lines.entry(line).or_default();
        if !description.generated_locations.contains(&location) {
            description.generated_locations.push(location);
        }
        if method.is_some() {
            description.method = method;
        }
    }
}

/// A control-flow edge out of a source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Successor {
    /// Control can leave the method from this line
    Exit,
    /// Control can continue at the given source line
    Line {
        /// File of the successor line
        file: FileId,
        /// The successor line
        line: u32,
    },
}

/// Source-level control-flow graph of one file.
///
/// For every line it lists the lines control can reach next. When inlining collapses several
/// source lines into the same generated code, these edges are what lets stepping find the next
/// line to stop at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFlowGraph {
    /// `offsets[line]..offsets[line + 1]` is the successor range of `line`
    offsets: Vec<usize>,
    successors: Vec<Successor>,
}

impl Default for ControlFlowGraph {
    fn default() -> Self {
        ControlFlowGraph {
            offsets: vec![0],
            successors: Vec::new(),
        }
    }
}

impl ControlFlowGraph {
    /// Build a graph from per-line successor lists. Each list is sorted and de-duplicated.
    #[must_use]
    pub fn from_lines(lines: Vec<Vec<Successor>>) -> Self {
        let mut offsets = Vec::with_capacity(lines.len() + 1);
        let mut successors = Vec::new();
        offsets.push(0);
        for mut line in lines {
            line.sort_unstable();
            line.dedup();
            successors.extend(line);
            offsets.push(successors.len());
        }
        ControlFlowGraph {
            offsets,
            successors,
        }
    }

    /// Number of lines covered by the graph.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// The successors of `line`, or `None` if the graph has no edges for it.
    #[must_use]
    pub fn successors(&self, line: u32) -> Option<&[Successor]> {
        let line = line as usize;
        let start = *self.offsets.get(line)?;
        let end = *self.offsets.get(line + 1)?;
        if start == end {
            return None;
        }
        Some(&self.successors[start..end])
    }

    /// All successor lists in line order, including empty ones.
    pub fn lines(&self) -> impl Iterator<Item = &[Successor]> + '_ {
        self.offsets
            .windows(2)
            .map(|range| &self.successors[range[0]..range[1]])
    }
}

/// Class-level metadata: the parent class and the generated-to-original field name pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassMetadata {
    /// Parent class, if any
    pub parent_id: Option<ClassId>,
    /// Generated field name id to original field name id
    pub(crate) field_renames: BTreeMap<FieldId, FieldId>,
    /// Sorted descriptors of the methods this class declares; derived from the exact-method table
    pub(crate) methods: Vec<MethodId>,
}

impl ClassMetadata {
    /// The original field a generated field name stands for, in this class only.
    #[must_use]
    pub fn original_field(&self, generated: FieldId) -> Option<FieldId> {
        self.field_renames.get(&generated).copied()
    }

    /// `(original, generated)` field id pairs declared by this class.
    pub fn fields(&self) -> impl Iterator<Item = (FieldId, FieldId)> + '_ {
        self.field_renames
            .iter()
            .map(|(generated, original)| (*original, *generated))
    }

    /// Method descriptors declared by this class.
    #[must_use]
    pub fn methods(&self) -> &[MethodId] {
        &self.methods
    }

    pub(crate) fn declares(&self, method: MethodId) -> bool {
        self.methods.binary_search(&method).is_ok()
    }
}
