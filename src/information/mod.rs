//! Debug information: the correspondence between generated code and the original program.
//!
//! This module contains the immutable read model [`DebugInformation`], the incremental
//! [`DebugInformationBuilder`] the compiler feeds while emitting code, and the binary reader and
//! writer that move a model between processes.
//!
//! # Architecture
//!
//! A model stores five string tables (files, classes, fields, method descriptors, variables) and a
//! set of [`Mapping`]s keyed by [`GeneratedLocation`]. The file, line, class and method mappings
//! only record *transitions*, so each one answers a query independently through floor search and a
//! [`SourceLocation`] is the combination of four lookups.
//!
//! Everything else the model answers is derived from those tables by a single rebuild pass that
//! runs whenever a model is finished, whether it came from the builder or from a byte stream:
//!
//! - the per-file reverse index ([`FileDescription`]) used to fan a breakpoint out to generated code
//! - the generated locations at which each method is entered
//! - the override tree used when stepping into a virtual call
//! - the call sites located on each source line
//!
//! Since both producers go through the same derivation, a decoded model answers every query
//! exactly as the model it was encoded from.
//!
//! # Usage Examples
//!
//! ```rust
//! use aotdbg::information::{DebugInformation, DebugInformationBuilder, GeneratedLocation};
//!
//! let mut builder = DebugInformationBuilder::new();
//! builder.emit_location(GeneratedLocation::new(10, 0), Some("Main.java"), 5)?;
//! builder.emit_location(GeneratedLocation::new(12, 0), Some("Main.java"), 7)?;
//! let info = builder.build();
//!
//! let bytes = info.to_bytes();
//! let decoded = DebugInformation::from_bytes(&bytes)?;
//!
//! let location = decoded.source_location(GeneratedLocation::new(11, 3));
//! assert_eq!(location.line, 5);
//! assert_eq!(decoded.generated_locations_by_name("Main.java", 7), &[GeneratedLocation::new(12, 0)]);
//! # Ok::<(), aotdbg::Error>(())
//! ```

mod builder;
mod callsite;
mod description;
mod location;
mod mapping;
mod names;
mod reader;
mod sourcemap;
mod writer;

pub use builder::{DebugInformationBuilder, DeferredCallSite};
pub use callsite::{CallSite, CallSiteKind};
pub use description::{ClassMetadata, ControlFlowGraph, FileDescription, Successor};
pub use location::{
    ClassId, ExactMethodId, FieldId, FileId, GeneratedLocation, MethodId, MethodRef,
    SourceLocation, VariableId,
};
pub use mapping::{Mapping, MultiMapping};
pub use names::NameTable;

use std::{
    collections::{HashMap, HashSet},
    io::{Read, Write},
};

use crate::{
    codec::{Parser, Writer},
    config::ReaderConfig,
    Result,
};

/// Immutable symbolic view of one generated-code unit.
///
/// Built once by [`DebugInformationBuilder::build`] or decoded once by
/// [`DebugInformation::from_bytes`], then shared read-only (usually behind an `Arc`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugInformation {
    pub(crate) files: NameTable,
    pub(crate) classes: NameTable,
    pub(crate) fields: NameTable,
    pub(crate) methods: NameTable,
    pub(crate) variables: NameTable,
    pub(crate) exact_methods: Vec<MethodRef>,
    pub(crate) file_mapping: Mapping<Option<FileId>>,
    pub(crate) line_mapping: Mapping<i32>,
    pub(crate) class_mapping: Mapping<Option<ClassId>>,
    pub(crate) method_mapping: Mapping<Option<MethodId>>,
    pub(crate) call_site_mapping: Mapping<CallSite>,
    /// Indexed by the generated variable's id
    pub(crate) variable_mappings: Vec<Option<MultiMapping<VariableId>>>,
    /// One entry per class name
    pub(crate) class_metadata: Vec<ClassMetadata>,
    /// One graph per file name
    pub(crate) control_flow_graphs: Vec<ControlFlowGraph>,
    derived: Derived,
}

/// Indices computed from the stored tables by [`DebugInformation::rebuild`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Derived {
    exact_method_ids: HashMap<MethodRef, ExactMethodId>,
    file_descriptions: Vec<FileDescription>,
    method_entrances: Vec<Vec<GeneratedLocation>>,
    overriding_methods: Vec<Vec<ExactMethodId>>,
    line_call_sites: HashMap<(FileId, u32), Vec<usize>>,
}

impl DebugInformation {
    /// Decode a model with the default [`ReaderConfig`].
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated input and [`crate::Error::Malformed`]
    /// for structurally invalid input.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_with_config(data, &ReaderConfig::default())
    }

    /// Decode a model, enforcing the limits of `config`.
    ///
    /// # Errors
    /// Same as [`DebugInformation::from_bytes`].
    pub fn read_with_config(data: &[u8], config: &ReaderConfig) -> Result<Self> {
        let mut parser = Parser::new(data);
        reader::read(&mut parser, config)
    }

    /// Read a whole stream and decode it.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if reading fails, otherwise as
    /// [`DebugInformation::from_bytes`].
    pub fn read_from<R: Read>(mut source: R) -> Result<Self> {
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Append the encoded model to `writer`.
    pub fn write(&self, writer: &mut Writer) {
        writer::write(self, writer);
    }

    /// Encode the model into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.write(&mut writer);
        writer.into_bytes()
    }

    /// Encode the model into `sink`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if writing fails.
    pub fn write_to<W: Write>(&self, mut sink: W) -> Result<()> {
        sink.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// File name table.
    #[must_use]
    pub fn files(&self) -> &NameTable {
        &self.files
    }

    /// Class name table.
    #[must_use]
    pub fn classes(&self) -> &NameTable {
        &self.classes
    }

    /// Field name table. Holds both original and generated field names.
    #[must_use]
    pub fn fields(&self) -> &NameTable {
        &self.fields
    }

    /// Method descriptor table.
    #[must_use]
    pub fn methods(&self) -> &NameTable {
        &self.methods
    }

    /// Variable name table. Holds both source and generated variable names.
    #[must_use]
    pub fn variables(&self) -> &NameTable {
        &self.variables
    }

    /// The file transitions.
    #[must_use]
    pub fn file_mapping(&self) -> &Mapping<Option<FileId>> {
        &self.file_mapping
    }

    /// The line transitions.
    #[must_use]
    pub fn line_mapping(&self) -> &Mapping<i32> {
        &self.line_mapping
    }

    /// The class transitions.
    #[must_use]
    pub fn class_mapping(&self) -> &Mapping<Option<ClassId>> {
        &self.class_mapping
    }

    /// The method transitions.
    #[must_use]
    pub fn method_mapping(&self) -> &Mapping<Option<MethodId>> {
        &self.method_mapping
    }

    /// The recorded call sites.
    #[must_use]
    pub fn call_site_mapping(&self) -> &Mapping<CallSite> {
        &self.call_site_mapping
    }

    /// All `(class, descriptor)` pairs, indexed by [`ExactMethodId`].
    #[must_use]
    pub fn exact_methods(&self) -> &[MethodRef] {
        &self.exact_methods
    }

    /// The id of an exact method.
    #[must_use]
    pub fn exact_method_id(&self, method: MethodRef) -> Option<ExactMethodId> {
        self.derived.exact_method_ids.get(&method).copied()
    }

    /// Reverse index of a file.
    #[must_use]
    pub fn file_description(&self, file: FileId) -> Option<&FileDescription> {
        self.derived.file_descriptions.get(file as usize)
    }

    /// Control-flow graph of a file.
    #[must_use]
    pub fn control_flow_graph(&self, file: FileId) -> Option<&ControlFlowGraph> {
        self.control_flow_graphs.get(file as usize)
    }

    /// Metadata of a class.
    #[must_use]
    pub fn class_metadata(&self, class: ClassId) -> Option<&ClassMetadata> {
        self.class_metadata.get(class as usize)
    }

    /// Scope table of a generated variable.
    #[must_use]
    pub fn variable_mapping(&self, variable: VariableId) -> Option<&MultiMapping<VariableId>> {
        self.variable_mappings.get(variable as usize)?.as_ref()
    }

    /// Files that have at least one line realized in generated code.
    pub fn covered_files(&self) -> impl Iterator<Item = &str> + '_ {
        self.derived
            .file_descriptions
            .iter()
            .enumerate()
            .filter(|(_, description)| !description.is_empty())
            .filter_map(|(file, _)| self.files.name(file as FileId))
    }

    /// Resolve a generated location to its source location.
    ///
    /// The file, line, class and method are looked up independently, so the result can be
    /// partially known.
    #[must_use]
    pub fn source_location(&self, location: GeneratedLocation) -> SourceLocation {
        SourceLocation {
            file: self.file_mapping.lookup(location).copied().flatten(),
            line: self.line_mapping.lookup(location).copied().unwrap_or(-1),
            method: self.method_at(location),
        }
    }

    /// The method executing at a generated location.
    #[must_use]
    pub fn method_at(&self, location: GeneratedLocation) -> Option<MethodRef> {
        let class_id = self.class_mapping.lookup(location).copied().flatten()?;
        let method_id = self.method_mapping.lookup(location).copied().flatten()?;
        Some(MethodRef::new(class_id, method_id))
    }

    /// Generated locations at which execution enters `line` of `file`.
    #[must_use]
    pub fn generated_locations(&self, file: FileId, line: u32) -> &[GeneratedLocation] {
        self.file_description(file)
            .map_or(&[], |description| description.generated_locations(line))
    }

    /// Like [`DebugInformation::generated_locations`], with the file given by name.
    #[must_use]
    pub fn generated_locations_by_name(&self, file_name: &str, line: u32) -> &[GeneratedLocation] {
        match self.files.id(file_name) {
            Some(file) => self.generated_locations(file, line),
            None => &[],
        }
    }

    /// Source variable names a generated variable stands for at `location`.
    #[must_use]
    pub fn variable_meaning_at(&self, location: GeneratedLocation, generated_name: &str) -> Vec<&str> {
        let Some(mapping) = self
            .variables
            .id(generated_name)
            .and_then(|id| self.variable_mapping(id))
        else {
            return Vec::new();
        };

        mapping
            .lookup_all(location)
            .iter()
            .filter_map(|id| self.variables.name(*id))
            .collect()
    }

    /// The original name of a generated field, searching `class_name` and then its ancestors.
    #[must_use]
    pub fn field_meaning(&self, class_name: &str, generated_field: &str) -> Option<&str> {
        let generated = self.fields.id(generated_field)?;
        let mut class = self.classes.id(class_name);

        // Guards against parent cycles in hostile input
        for _ in 0..self.class_metadata.len() {
            let metadata = self.class_metadata(class?)?;
            if let Some(original) = metadata.original_field(generated) {
                return self.fields.name(original);
            }
            class = metadata.parent_id;
        }
        None
    }

    /// Lines control can reach after `line` of `file`.
    #[must_use]
    pub fn following_lines(&self, file: FileId, line: u32) -> Option<&[Successor]> {
        self.control_flow_graph(file)?.successors(line)
    }

    /// Generated locations of every line that can follow `line` of `file`.
    ///
    /// [`Successor::Exit`] edges contribute nothing.
    #[must_use]
    pub fn reachable_generated_locations(&self, file: FileId, line: u32) -> Vec<GeneratedLocation> {
        let mut locations = Vec::new();
        for successor in self.following_lines(file, line).unwrap_or_default() {
            if let Successor::Line { file, line } = *successor {
                locations.extend_from_slice(self.generated_locations(file, line));
            }
        }
        locations.sort_unstable();
        locations.dedup();
        locations
    }

    /// The call recorded at `location`, if any.
    #[must_use]
    pub fn call_site(&self, location: GeneratedLocation) -> Option<CallSite> {
        match self.call_site_mapping.lookup(location) {
            Some(CallSite::None) | None => None,
            Some(site) => Some(*site),
        }
    }

    /// All calls located on `line` of `file`.
    #[must_use]
    pub fn call_sites_at(&self, file: FileId, line: u32) -> Vec<(GeneratedLocation, CallSite)> {
        let Some(indices) = self.derived.line_call_sites.get(&(file, line)) else {
            return Vec::new();
        };
        indices
            .iter()
            .filter_map(|index| self.call_site_mapping.get(*index))
            .map(|(location, site)| (location, *site))
            .collect()
    }

    /// Generated locations at which `method` is entered.
    #[must_use]
    pub fn method_entrances(&self, method: ExactMethodId) -> &[GeneratedLocation] {
        self.derived
            .method_entrances
            .get(method as usize)
            .map_or(&[], Vec::as_slice)
    }

    /// Methods that directly override `method` in a subclass.
    #[must_use]
    pub fn direct_overriding_methods(&self, method: ExactMethodId) -> &[ExactMethodId] {
        self.derived
            .overriding_methods
            .get(method as usize)
            .map_or(&[], Vec::as_slice)
    }

    /// `method` and every method overriding it, directly or transitively.
    #[must_use]
    pub fn overriding_methods(&self, method: ExactMethodId) -> Vec<ExactMethodId> {
        if method as usize >= self.exact_methods.len() {
            return Vec::new();
        }

        let mut visited = HashSet::new();
        let mut stack = vec![method];
        let mut result = Vec::new();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            result.push(current);
            stack.extend_from_slice(self.direct_overriding_methods(current));
        }
        result
    }

    /// Recompute every derived index from the stored tables.
    pub(crate) fn rebuild(&mut self) {
        self.derived = Derived::default();
        self.index_exact_methods();
        self.index_files();
        self.index_entrances();
        self.index_overrides();
        self.index_call_sites();
    }

    fn index_exact_methods(&mut self) {
        self.derived.exact_method_ids = self
            .exact_methods
            .iter()
            .enumerate()
            .map(|(id, method)| (*method, id as ExactMethodId))
            .collect();

        for metadata in &mut self.class_metadata {
            metadata.methods.clear();
        }
        for method in &self.exact_methods {
            if let Some(metadata) = self.class_metadata.get_mut(method.class_id as usize) {
                metadata.methods.push(method.method_descriptor_id);
            }
        }
        for metadata in &mut self.class_metadata {
            metadata.methods.sort_unstable();
            metadata.methods.dedup();
        }
    }

    /// Walk the file and line transitions together. Each item is a generated location and the
    /// file and line in effect from there on.
    pub(crate) fn file_line_transitions(&self) -> Vec<(GeneratedLocation, Option<FileId>, i32)> {
        let file_keys = self.file_mapping.keys();
        let line_keys = self.line_mapping.keys();
        let mut transitions = Vec::with_capacity(file_keys.len().max(line_keys.len()));

        let (mut file_index, mut line_index) = (0, 0);
        let mut current_file = None;
        let mut current_line = -1;

        loop {
            let (take_file, take_line) = match (file_keys.get(file_index), line_keys.get(line_index))
            {
                (None, None) => break,
                (Some(_), None) => (true, false),
                (None, Some(_)) => (false, true),
                (Some(file_key), Some(line_key)) => (file_key <= line_key, line_key <= file_key),
            };

            let mut location = GeneratedLocation::default();
            if take_file {
                location = file_keys[file_index];
                current_file = self.file_mapping.values()[file_index];
                file_index += 1;
            }
            if take_line {
                location = line_keys[line_index];
                current_line = self.line_mapping.values()[line_index];
                line_index += 1;
            }
            transitions.push((location, current_file, current_line));
        }
        transitions
    }

    /// Record every generated location at which a new `(file, line)` pair starts.
    fn index_files(&mut self) {
        let mut descriptions = vec![FileDescription::default(); self.files.len()];
        let mut last = None;

        for (location, file, line) in self.file_line_transitions() {
            let (Some(file), Ok(line)) = (file, u32::try_from(line)) else {
                continue;
            };
            if last == Some((file, line)) {
                continue;
            }
            last = Some((file, line));

            let method = self.method_at(location);
            if let Some(description) = descriptions.get_mut(file as usize) {
                description.record(line, location, method);
            }
        }

        self.derived.file_descriptions = descriptions;
    }

    /// Record, for every class or method transition, the first generated location inside the new
    /// method that has a known line.
    fn index_entrances(&mut self) {
        let mut transitions: Vec<GeneratedLocation> = self
            .class_mapping
            .keys()
            .iter()
            .chain(self.method_mapping.keys())
            .copied()
            .collect();
        transitions.sort_unstable();
        transitions.dedup();

        let mut entrances = vec![Vec::new(); self.exact_methods.len()];
        for (index, start) in transitions.iter().enumerate() {
            let Some(exact) = self
                .method_at(*start)
                .and_then(|method| self.exact_method_id(method))
            else {
                continue;
            };
            let end = transitions.get(index + 1).copied();

            if let Some(location) = self.first_known_line(*start, end) {
                let list: &mut Vec<GeneratedLocation> = &mut entrances[exact as usize];
                if !list.contains(&location) {
                    list.push(location);
                }
            }
        }

        self.derived.method_entrances = entrances;
    }

    /// The first location in `start..end` at which the line mapping yields a known line.
    fn first_known_line(
        &self,
        start: GeneratedLocation,
        end: Option<GeneratedLocation>,
    ) -> Option<GeneratedLocation> {
        if matches!(self.line_mapping.lookup(start), Some(line) if *line >= 0) {
            return Some(start);
        }

        let first = self.line_mapping.index_of(start).map_or(0, |index| index + 1);
        self.line_mapping
            .iter()
            .skip(first)
            .take_while(|(key, _)| end.map_or(true, |end| *key < end))
            .find(|(_, line)| **line >= 0)
            .map(|(key, _)| key)
    }

    /// Link each exact method to the nearest ancestor declaration of the same descriptor.
    fn index_overrides(&mut self) {
        let mut overriding = vec![Vec::new(); self.exact_methods.len()];

        for (id, method) in self.exact_methods.iter().enumerate() {
            let mut class = self
                .class_metadata(method.class_id)
                .and_then(|metadata| metadata.parent_id);

            for _ in 0..self.class_metadata.len() {
                let Some(ancestor) = class else { break };
                let Some(metadata) = self.class_metadata(ancestor) else {
                    break;
                };
                if metadata.declares(method.method_descriptor_id) {
                    let overridden = MethodRef::new(ancestor, method.method_descriptor_id);
                    if let Some(parent_id) = self.exact_method_id(overridden) {
                        overriding[parent_id as usize].push(id as ExactMethodId);
                    }
                    break;
                }
                class = metadata.parent_id;
            }
        }

        self.derived.overriding_methods = overriding;
    }

    fn index_call_sites(&mut self) {
        let mut line_call_sites: HashMap<(FileId, u32), Vec<usize>> = HashMap::new();

        for (index, (location, site)) in self.call_site_mapping.iter().enumerate() {
            if *site == CallSite::None {
                continue;
            }
            if let Some((file, line)) = self.source_location(location).file_and_line() {
                line_call_sites.entry((file, line)).or_default().push(index);
            }
        }

        self.derived.line_call_sites = line_call_sites;
    }
}
