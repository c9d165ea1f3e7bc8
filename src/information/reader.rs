//! Binary decoding of [`DebugInformation`].
//!
//! Mirrors [`super::writer`] section for section. Every id read from the stream is checked against
//! the table it refers to and every count against the [`ReaderConfig`] limits, so hostile input
//! results in an error instead of a panic or an oversized allocation. After the last section the
//! derived indices are rebuilt from the decoded tables.

use std::collections::BTreeMap;

use crate::{
    codec::Parser,
    config::ReaderConfig,
    information::{
        CallSite, CallSiteKind, ClassMetadata, ControlFlowGraph, DebugInformation,
        GeneratedLocation, Mapping, MethodRef, MultiMapping, NameTable, Successor,
    },
    Result,
};

/// Running base of a relatively-coded column. Deltas wrap in 32 bits.
#[derive(Default)]
struct Relative {
    last: i32,
}

impl Relative {
    fn read(&mut self, parser: &mut Parser<'_>) -> Result<i32> {
        self.last = self.last.wrapping_add(parser.read_signed()?);
        Ok(self.last)
    }
}

/// Interpret `value` as an index into a table of `len` entries.
#[allow(clippy::cast_sign_loss)]
fn index(value: i32, len: usize, table: &str) -> Result<u32> {
    let index = value as u32;
    if index as usize >= len {
        return Err(malformed_error!(
            "Index {} out of range for the {} table of {} entries",
            index,
            table,
            len
        ));
    }
    Ok(index)
}

/// Interpret `value` as `index + 1`, with `0` meaning "none".
#[allow(clippy::cast_possible_wrap)]
fn optional_index(value: i32, len: usize, table: &str) -> Result<Option<u32>> {
    if value == 0 {
        return Ok(None);
    }
    index((value as u32).wrapping_sub(1) as i32, len, table).map(Some)
}

struct SectionReader<'p, 'd> {
    parser: &'p mut Parser<'d>,
    config: &'p ReaderConfig,
}

pub(crate) fn read(parser: &mut Parser<'_>, config: &ReaderConfig) -> Result<DebugInformation> {
    let mut reader = SectionReader { parser, config };

    let files = reader.strings()?;
    let classes = reader.strings()?;
    let fields = reader.strings()?;
    let methods = reader.strings()?;
    let variables = reader.strings()?;

    let exact_methods = reader.exact_methods(classes.len(), methods.len())?;

    let file_mapping = reader.mapping(|value| optional_index(value, files.len(), "file"))?;
    let line_mapping = reader.mapping(Ok)?;
    let class_mapping = reader.mapping(|value| optional_index(value, classes.len(), "class"))?;
    let method_mapping = reader.mapping(|value| optional_index(value, methods.len(), "method"))?;

    let call_site_mapping = reader.call_sites(exact_methods.len())?;
    let variable_mappings = reader.variables(variables.len())?;
    let class_metadata = reader.class_metadata(classes.len(), fields.len())?;
    let control_flow_graphs = reader.control_flow_graphs(files.len())?;

    if reader.parser.has_more_data() {
        return Err(malformed_error!(
            "{} trailing bytes after the last section",
            reader.parser.remaining()
        ));
    }

    let mut info = DebugInformation {
        files,
        classes,
        fields,
        methods,
        variables,
        exact_methods,
        file_mapping,
        line_mapping,
        class_mapping,
        method_mapping,
        call_site_mapping,
        variable_mappings,
        class_metadata,
        control_flow_graphs,
        derived: Default::default(),
    };
    info.rebuild();
    Ok(info)
}

impl SectionReader<'_, '_> {
    fn count(&mut self) -> Result<usize> {
        self.parser.read_count(self.config.max_entries)
    }

    fn strings(&mut self) -> Result<NameTable> {
        let count = self.count()?;
        let mut names = Vec::with_capacity(count.min(self.parser.remaining()));
        for _ in 0..count {
            names.push(self.parser.read_string(self.config.max_string_len)?);
        }
        Ok(NameTable::from_names(names))
    }

    fn exact_methods(&mut self, classes: usize, methods: usize) -> Result<Vec<MethodRef>> {
        let count = self.count()?;
        let mut class = Relative::default();
        let mut method = Relative::default();

        let mut exact_methods = Vec::with_capacity(count.min(self.parser.remaining()));
        for _ in 0..count {
            let class_id = index(class.read(self.parser)?, classes, "class")?;
            let method_id = index(method.read(self.parser)?, methods, "method")?;
            exact_methods.push(MethodRef::new(class_id, method_id));
        }
        Ok(exact_methods)
    }

    fn keys(&mut self, count: usize) -> Result<Vec<GeneratedLocation>> {
        // Every key stores at least one column byte
        self.parser.ensure_remaining(count)?;
        let line_deltas = self.parser.read_rle(count)?;

        let mut keys = Vec::with_capacity(line_deltas.len());
        let mut previous = GeneratedLocation::default();
        for delta in line_deltas {
            let column = self.parser.read_varint()?;
            let key = if delta == 0 {
                let column = previous
                    .column
                    .checked_add(column)
                    .ok_or_else(|| malformed_error!("Column overflow after {}", previous))?;
                GeneratedLocation::new(previous.line, column)
            } else {
                let line = previous
                    .line
                    .checked_add(delta)
                    .ok_or_else(|| malformed_error!("Line overflow after {}", previous))?;
                GeneratedLocation::new(line, column)
            };
            keys.push(key);
            previous = key;
        }
        Ok(keys)
    }

    fn mapping<V>(&mut self, decode: impl Fn(i32) -> Result<V>) -> Result<Mapping<V>> {
        let count = self.count()?;
        let keys = self.keys(count)?;

        let mut relative = Relative::default();
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(decode(relative.read(self.parser)?)?);
        }
        Mapping::from_parts(keys, values)
    }

    fn call_sites(&mut self, exact_methods: usize) -> Result<Mapping<CallSite>> {
        let count = self.count()?;
        let keys = self.keys(count)?;

        let mut relative = Relative::default();
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = self.parser.read_u8()?;
            let kind = CallSiteKind::from_repr(tag)
                .ok_or_else(|| malformed_error!("Unknown call site kind {}", tag))?;
            let site = if kind == CallSiteKind::None {
                CallSite::None
            } else {
                let method = index(relative.read(self.parser)?, exact_methods, "exact method")?;
                CallSite::from_kind(kind, method)
            };
            values.push(site);
        }
        Mapping::from_parts(keys, values)
    }

    fn multi_mapping(&mut self, variables: usize) -> Result<MultiMapping<u32>> {
        let count = self.count()?;
        let keys = self.keys(count)?;

        let mut relative = Relative::default();
        let mut groups = Vec::with_capacity(count);
        for _ in 0..count {
            let size = self.count()?;
            let mut group = Vec::with_capacity(size.min(self.parser.remaining()));
            for _ in 0..size {
                group.push(index(relative.read(self.parser)?, variables, "variable")?);
            }
            groups.push(group);
        }
        MultiMapping::from_parts(keys, groups)
    }

    fn variables(&mut self, variables: usize) -> Result<Vec<Option<MultiMapping<u32>>>> {
        let count = self.count()?;
        let mut mappings = vec![None; variables];

        let mut next: u32 = 0;
        for _ in 0..count {
            let variable = next
                .checked_add(self.parser.read_varint()?)
                .ok_or_else(|| malformed_error!("Variable index overflow"))?;
            let slot = mappings.get_mut(variable as usize).ok_or_else(|| {
                malformed_error!(
                    "Variable mapping {} out of range for {} variables",
                    variable,
                    variables
                )
            })?;
            *slot = Some(self.multi_mapping(variables)?);
            next = variable + 1;
        }
        Ok(mappings)
    }

    fn class_metadata(&mut self, classes: usize, fields: usize) -> Result<Vec<ClassMetadata>> {
        let mut original = Relative::default();
        let mut generated = Relative::default();

        let mut metadata = Vec::with_capacity(classes);
        for _ in 0..classes {
            let parent = self.parser.read_varint()?;
            let parent_id = match parent {
                0 => None,
                #[allow(clippy::cast_possible_wrap)]
                parent => Some(index((parent - 1) as i32, classes, "class")?),
            };

            let count = self.count()?;
            let mut field_renames = BTreeMap::new();
            for _ in 0..count {
                let original_id = index(original.read(self.parser)?, fields, "field")?;
                let generated_id = index(generated.read(self.parser)?, fields, "field")?;
                field_renames.insert(generated_id, original_id);
            }

            metadata.push(ClassMetadata {
                parent_id,
                field_renames,
                methods: Vec::new(),
            });
        }
        Ok(metadata)
    }

    fn control_flow_graphs(&mut self, files: usize) -> Result<Vec<ControlFlowGraph>> {
        let mut graphs = Vec::with_capacity(files);
        for _ in 0..files {
            let line_count = self.count()?;
            let sizes = self.parser.read_rle(line_count)?;

            let total = sizes.iter().map(|size| *size as usize).sum::<usize>();
            if total > self.config.max_entries {
                return Err(malformed_error!(
                    "Control-flow graph with {} edges exceeds the limit of {}",
                    total,
                    self.config.max_entries
                ));
            }
            self.parser.ensure_remaining(total)?;

            let mut file = Relative::default();
            let mut line = Relative::default();
            let mut lines = Vec::with_capacity(sizes.len());
            for size in sizes {
                let mut successors = Vec::with_capacity(size as usize);
                for _ in 0..size {
                    let successor = match optional_index(file.read(self.parser)?, files, "file")? {
                        None => Successor::Exit,
                        Some(target) => Successor::Line {
                            file: target,
                            line: u32::try_from(line.read(self.parser)?).map_err(|_| {
                                malformed_error!("Negative successor line in file {}", target)
                            })?,
                        },
                    };
                    successors.push(successor);
                }
                lines.push(successors);
            }
            graphs.push(ControlFlowGraph::from_lines(lines));
        }
        Ok(graphs)
    }
}
