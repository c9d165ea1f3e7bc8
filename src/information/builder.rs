//! Incremental construction of [`DebugInformation`] from the compiler's emission stream.
//!
//! The compiler drives a [`DebugInformationBuilder`] while it writes generated code: every time
//! the output position changes its source file, line, class or method, it reports the new value
//! together with the current [`GeneratedLocation`]. The builder keeps a cursor with the last value
//! of each component and only records *changes*, so the mappings grow with the number of
//! transitions instead of the number of instructions.
//!
//! Locations must be reported in non-decreasing order. A location equal to the previous one
//! replaces what was recorded there, an earlier one is rejected with
//! [`crate::Error::LocationOrder`].

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use log::{debug, warn};

use crate::{
    information::{
        CallSite, CallSiteKind, ClassId, ClassMetadata, ControlFlowGraph, DebugInformation,
        ExactMethodId, FileId, GeneratedLocation, Mapping, MethodId, MethodRef, MultiMapping,
        NameTable, Successor, VariableId,
    },
    Error, Result,
};

/// A call site whose target is filled in after the call has been emitted.
///
/// Returned by [`DebugInformationBuilder::emit_call_site`]. The compiler often only knows how a
/// call is dispatched after emitting the code around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredCallSite {
    index: usize,
}

impl DeferredCallSite {
    /// Mark the call as a statically dispatched call to `class.descriptor`.
    pub fn set_static_method(
        &self,
        builder: &mut DebugInformationBuilder,
        class: &str,
        descriptor: &str,
    ) {
        builder.resolve_call_site(self.index, CallSiteKind::Static, class, descriptor);
    }

    /// Mark the call as a virtual call to `class.descriptor` or any of its overrides.
    pub fn set_virtual_method(
        &self,
        builder: &mut DebugInformationBuilder,
        class: &str,
        descriptor: &str,
    ) {
        builder.resolve_call_site(self.index, CallSiteKind::Virtual, class, descriptor);
    }

    /// Reset the call site to "no call".
    pub fn clean(&self, builder: &mut DebugInformationBuilder) {
        builder.set_call_site(self.index, CallSite::None);
    }
}

/// Append-only builder for [`DebugInformation`].
///
/// # Examples
///
/// ```rust
/// use aotdbg::information::{DebugInformationBuilder, GeneratedLocation};
///
/// let mut builder = DebugInformationBuilder::new();
/// builder.emit_class(GeneratedLocation::new(1, 0), Some("Main"))?;
/// builder.emit_method(GeneratedLocation::new(1, 0), Some("main([Ljava/lang/String;)V"))?;
/// builder.emit_location(GeneratedLocation::new(1, 0), Some("Main.java"), 3)?;
/// builder.emit_location(GeneratedLocation::new(1, 20), Some("Main.java"), 4)?;
///
/// let info = builder.build();
/// let location = info.source_location(GeneratedLocation::new(1, 25));
/// assert_eq!(location.line, 4);
/// assert!(location.method.is_some());
/// # Ok::<(), aotdbg::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct DebugInformationBuilder {
    files: NameTable,
    classes: NameTable,
    fields: NameTable,
    methods: NameTable,
    variables: NameTable,
    exact_methods: Vec<MethodRef>,
    exact_method_ids: HashMap<MethodRef, ExactMethodId>,

    file_mapping: Mapping<Option<FileId>>,
    line_mapping: Mapping<i32>,
    class_mapping: Mapping<Option<ClassId>>,
    method_mapping: Mapping<Option<MethodId>>,
    call_site_mapping: Mapping<CallSite>,
    variable_mappings: BTreeMap<VariableId, MultiMapping<VariableId>>,
    class_metadata: BTreeMap<ClassId, ClassMetadata>,
    successors: BTreeMap<FileId, BTreeMap<u32, Vec<Successor>>>,

    current_file: Option<FileId>,
    current_line: Option<i32>,
    current_class: Option<ClassId>,
    current_method: Option<MethodId>,
    current_metadata: Option<ClassId>,
    last_location: Option<GeneratedLocation>,

    built: Option<Arc<DebugInformation>>,
}

impl DebugInformationBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a file name without recording a transition.
    pub fn add_file(&mut self, name: &str) -> FileId {
        self.built = None;
        self.files.intern(name)
    }

    /// Record that the code starting at `location` belongs to `file` and `line`.
    ///
    /// A `line` below zero means the line is unknown.
    ///
    /// # Errors
    /// Returns [`crate::Error::LocationOrder`] if `location` precedes an already emitted one.
    pub fn emit_location(
        &mut self,
        location: GeneratedLocation,
        file: Option<&str>,
        line: i32,
    ) -> Result<()> {
        self.advance(location)?;

        let file = file.map(|name| self.files.intern(name));
        if file != self.current_file {
            self.file_mapping.push(location, file)?;
            self.current_file = file;
        }
        if Some(line) != self.current_line {
            self.line_mapping.push(location, line)?;
            self.current_line = Some(line);
        }
        Ok(())
    }

    /// Record that the code starting at `location` belongs to `class`.
    ///
    /// # Errors
    /// Returns [`crate::Error::LocationOrder`] if `location` precedes an already emitted one.
    pub fn emit_class(&mut self, location: GeneratedLocation, class: Option<&str>) -> Result<()> {
        self.advance(location)?;

        let class = class.map(|name| self.classes.intern(name));
        if class != self.current_class {
            self.class_mapping.push(location, class)?;
            self.current_class = class;
        }
        self.register_current_method();
        Ok(())
    }

    /// Record that the code starting at `location` belongs to the method with `descriptor` in the
    /// current class.
    ///
    /// # Errors
    /// Returns [`crate::Error::LocationOrder`] if `location` precedes an already emitted one.
    pub fn emit_method(
        &mut self,
        location: GeneratedLocation,
        descriptor: Option<&str>,
    ) -> Result<()> {
        self.advance(location)?;

        let method = descriptor.map(|name| self.methods.intern(name));
        if method != self.current_method {
            self.method_mapping.push(location, method)?;
            self.current_method = method;
        }
        self.register_current_method();
        Ok(())
    }

    /// Set the class and the method at once.
    ///
    /// # Errors
    /// Returns [`crate::Error::LocationOrder`] if `location` precedes an already emitted one.
    pub fn emit_method_ref(
        &mut self,
        location: GeneratedLocation,
        method: Option<(&str, &str)>,
    ) -> Result<()> {
        let (class, descriptor) = method.unzip();
        self.emit_class(location, class)?;
        self.emit_method(location, descriptor)
    }

    /// Record that from `location` on, `generated_name` holds the source variables `source_names`.
    ///
    /// # Errors
    /// Returns [`crate::Error::LocationOrder`] if `location` precedes an already emitted one.
    pub fn emit_variable(
        &mut self,
        location: GeneratedLocation,
        source_names: &[&str],
        generated_name: &str,
    ) -> Result<()> {
        self.advance(location)?;

        let mut sources: Vec<VariableId> = source_names
            .iter()
            .map(|name| self.variables.intern(name))
            .collect();
        sources.sort_unstable();
        sources.dedup();

        let generated = self.variables.intern(generated_name);
        self.variable_mappings
            .entry(generated)
            .or_default()
            .push(location, sources)
    }

    /// Reserve a call site at `location`, initially recorded as "no call".
    ///
    /// # Errors
    /// Returns [`crate::Error::LocationOrder`] if `location` precedes an already emitted one.
    pub fn emit_call_site(&mut self, location: GeneratedLocation) -> Result<DeferredCallSite> {
        self.advance(location)?;
        self.call_site_mapping.push(location, CallSite::None)?;
        Ok(DeferredCallSite {
            index: self.call_site_mapping.len() - 1,
        })
    }

    /// Declare a class and its parent. Subsequent [`DebugInformationBuilder::add_field`] calls
    /// apply to it.
    pub fn add_class(&mut self, name: &str, parent: Option<&str>) -> ClassId {
        self.built = None;
        let class = self.classes.intern(name);
        let parent = parent.map(|name| self.classes.intern(name));
        self.class_metadata.entry(class).or_default().parent_id = parent;
        self.current_metadata = Some(class);
        class
    }

    /// Record that the last declared class renamed its field `original_name` to `generated_name`.
    pub fn add_field(&mut self, original_name: &str, generated_name: &str) {
        let Some(class) = self.current_metadata else {
            warn!("Field {original_name} declared before any class; ignored");
            return;
        };
        self.built = None;

        let original = self.fields.intern(original_name);
        let generated = self.fields.intern(generated_name);
        self.class_metadata
            .entry(class)
            .or_default()
            .field_renames
            .insert(generated, original);
    }

    /// Add control-flow edges out of `line` of `file`. A `None` successor means control can leave
    /// the method from this line.
    pub fn add_successors(&mut self, file: &str, line: u32, successors: &[Option<(&str, u32)>]) {
        self.built = None;
        let file = self.files.intern(file);

        let resolved: Vec<Successor> = successors
            .iter()
            .map(|successor| match successor {
                None => Successor::Exit,
                Some((name, line)) => Successor::Line {
                    file: self.files.intern(name),
                    line: *line,
                },
            })
            .collect();

        self.successors
            .entry(file)
            .or_default()
            .entry(line)
            .or_default()
            .extend(resolved);
    }

    /// Finish the model.
    ///
    /// Repeated calls without an intervening emit return the same instance.
    pub fn build(&mut self) -> Arc<DebugInformation> {
        if let Some(info) = &self.built {
            return Arc::clone(info);
        }

        let mut file_mapping = self.file_mapping.clone();
        let mut line_mapping = self.line_mapping.clone();
        let mut class_mapping = self.class_mapping.clone();
        let mut method_mapping = self.method_mapping.clone();
        file_mapping.compact();
        line_mapping.compact();
        class_mapping.compact();
        method_mapping.compact();

        let mut variable_mappings = vec![None; self.variables.len()];
        for (variable, mapping) in &self.variable_mappings {
            variable_mappings[*variable as usize] = Some(mapping.clone());
        }

        let mut class_metadata = vec![ClassMetadata::default(); self.classes.len()];
        for (class, metadata) in &self.class_metadata {
            class_metadata[*class as usize] = metadata.clone();
        }

        let control_flow_graphs = (0..self.files.len() as FileId)
            .map(|file| self.control_flow_graph(file))
            .collect();

        let mut info = DebugInformation {
            files: self.files.clone(),
            classes: self.classes.clone(),
            fields: self.fields.clone(),
            methods: self.methods.clone(),
            variables: self.variables.clone(),
            exact_methods: self.exact_methods.clone(),
            file_mapping,
            line_mapping,
            class_mapping,
            method_mapping,
            call_site_mapping: self.call_site_mapping.clone(),
            variable_mappings,
            class_metadata,
            control_flow_graphs,
            derived: Default::default(),
        };
        info.rebuild();

        debug!(
            "Built debug information: {} files, {} classes, {} exact methods",
            info.files.len(),
            info.classes.len(),
            info.exact_methods.len()
        );

        let info = Arc::new(info);
        self.built = Some(Arc::clone(&info));
        info
    }

    fn control_flow_graph(&self, file: FileId) -> ControlFlowGraph {
        let Some(lines) = self.successors.get(&file) else {
            return ControlFlowGraph::default();
        };
        let line_count = lines.keys().next_back().map_or(0, |line| *line as usize + 1);

        let mut table = vec![Vec::new(); line_count];
        for (line, successors) in lines {
            table[*line as usize] = successors.clone();
        }
        ControlFlowGraph::from_lines(table)
    }

    fn advance(&mut self, location: GeneratedLocation) -> Result<()> {
        if let Some(previous) = self.last_location {
            if location < previous {
                return Err(Error::LocationOrder {
                    previous,
                    current: location,
                });
            }
        }
        self.last_location = Some(location);
        self.built = None;
        Ok(())
    }

    fn register_current_method(&mut self) {
        if let (Some(class), Some(method)) = (self.current_class, self.current_method) {
            self.exact_method(MethodRef::new(class, method));
        }
    }

    fn exact_method(&mut self, method: MethodRef) -> ExactMethodId {
        if let Some(&id) = self.exact_method_ids.get(&method) {
            return id;
        }
        let id = self.exact_methods.len() as ExactMethodId;
        self.exact_methods.push(method);
        self.exact_method_ids.insert(method, id);
        id
    }

    fn resolve_call_site(&mut self, index: usize, kind: CallSiteKind, class: &str, descriptor: &str) {
        let class = self.classes.intern(class);
        let method = self.methods.intern(descriptor);
        let exact = self.exact_method(MethodRef::new(class, method));
        self.set_call_site(index, CallSite::from_kind(kind, exact));
    }

    fn set_call_site(&mut self, index: usize, site: CallSite) {
        self.built = None;
        if let Some(slot) = self.call_site_mapping.value_mut(index) {
            *slot = site;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: u32, column: u32) -> GeneratedLocation {
        GeneratedLocation::new(line, column)
    }

    #[test]
    fn test_transitions_only() {
        let mut builder = DebugInformationBuilder::new();
        builder.emit_location(loc(10, 0), Some("Main.java"), 5).unwrap();
        builder.emit_location(loc(10, 5), Some("Main.java"), 5).unwrap();
        builder.emit_location(loc(12, 0), Some("Main.java"), 7).unwrap();
        let info = builder.build();

        assert_eq!(info.file_mapping().len(), 1);
        assert_eq!(info.line_mapping().keys(), &[loc(10, 0), loc(12, 0)]);
    }

    #[test]
    fn test_rejects_out_of_order() {
        let mut builder = DebugInformationBuilder::new();
        builder.emit_location(loc(4, 2), Some("A.java"), 1).unwrap();

        let result = builder.emit_location(loc(4, 1), Some("A.java"), 2);
        assert!(matches!(
            result,
            Err(Error::LocationOrder { previous, current })
                if previous == loc(4, 2) && current == loc(4, 1)
        ));
        assert!(matches!(
            builder.emit_call_site(loc(3, 0)),
            Err(Error::LocationOrder { .. })
        ));
    }

    #[test]
    fn test_same_location_overwrites() {
        let mut builder = DebugInformationBuilder::new();
        builder.emit_location(loc(1, 0), Some("A.java"), 1).unwrap();
        builder.emit_location(loc(2, 0), Some("A.java"), 2).unwrap();
        builder.emit_location(loc(2, 0), Some("A.java"), 1).unwrap();
        let info = builder.build();

        // The overwrite turns line 2 back into line 1, which compaction folds away
        assert_eq!(info.line_mapping().keys(), &[loc(1, 0)]);
        assert_eq!(info.source_location(loc(2, 0)).line, 1);
    }

    #[test]
    fn test_build_memoized() {
        let mut builder = DebugInformationBuilder::new();
        builder.emit_location(loc(1, 0), Some("A.java"), 1).unwrap();

        let first = builder.build();
        let second = builder.build();
        assert!(Arc::ptr_eq(&first, &second));

        builder.emit_location(loc(2, 0), Some("A.java"), 2).unwrap();
        let third = builder.build();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_deferred_call_site() {
        let mut builder = DebugInformationBuilder::new();
        builder.emit_location(loc(1, 0), Some("A.java"), 1).unwrap();
        let first = builder.emit_call_site(loc(1, 4)).unwrap();
        let second = builder.emit_call_site(loc(1, 9)).unwrap();
        first.set_virtual_method(&mut builder, "A", "run()V");
        second.set_static_method(&mut builder, "A", "helper()V");
        second.clean(&mut builder);
        let info = builder.build();

        assert!(matches!(info.call_site(loc(1, 5)), Some(CallSite::Virtual(0))));
        assert_eq!(info.call_site(loc(1, 9)), None);
        assert_eq!(info.call_sites_at(0, 1).len(), 1);
    }

    #[test]
    fn test_variables() {
        let mut builder = DebugInformationBuilder::new();
        builder.emit_variable(loc(1, 0), &["i", "count", "i"], "$a").unwrap();
        builder.emit_variable(loc(3, 0), &[], "$a").unwrap();
        let info = builder.build();

        let mut names = info.variable_meaning_at(loc(2, 0), "$a");
        names.sort_unstable();
        assert_eq!(names, vec!["count", "i"]);
        assert!(info.variable_meaning_at(loc(3, 0), "$a").is_empty());
        assert!(info.variable_meaning_at(loc(2, 0), "$b").is_empty());
    }

    #[test]
    fn test_successors() {
        let mut builder = DebugInformationBuilder::new();
        builder.add_successors("A.java", 3, &[Some(("A.java", 4)), None]);
        builder.add_successors("A.java", 3, &[Some(("B.java", 1))]);
        let info = builder.build();

        let a = info.files().id("A.java").unwrap();
        let b = info.files().id("B.java").unwrap();
        assert_eq!(
            info.following_lines(a, 3),
            Some(
                &[
                    Successor::Exit,
                    Successor::Line { file: a, line: 4 },
                    Successor::Line { file: b, line: 1 },
                ][..]
            )
        );
        assert_eq!(info.following_lines(a, 2), None);
        assert_eq!(info.following_lines(b, 1), None);
    }
}
