//! Binary encoding of [`DebugInformation`].
//!
//! Sections are written in a fixed order, mirrored by [`super::reader`]:
//!
//! 1. string tables: files, classes, fields, method descriptors, variables
//! 2. exact-method table
//! 3. file, line, class and method mappings
//! 4. call-site mapping
//! 5. variable multi-mappings
//! 6. class metadata
//! 7. one control-flow graph per file
//!
//! Optional ids are stored as `id + 1` inside relative fields, with `0` for "none", so every
//! value column is a plain integer sequence that delta coding can shrink.

use crate::{
    codec::Writer,
    information::{
        CallSite, DebugInformation, GeneratedLocation, Mapping, MultiMapping, NameTable, Successor,
    },
};

/// Running base of a relatively-coded column. Deltas wrap in 32 bits.
#[derive(Default)]
struct Relative {
    last: i32,
}

impl Relative {
    fn write(&mut self, writer: &mut Writer, value: i32) {
        writer.write_signed(value.wrapping_sub(self.last));
        self.last = value;
    }
}

#[allow(clippy::cast_possible_wrap)]
fn id(value: u32) -> i32 {
    value as i32
}

fn optional(value: Option<u32>) -> i32 {
    value.map_or(0, |value| id(value.wrapping_add(1)))
}

pub(crate) fn write(info: &DebugInformation, writer: &mut Writer) {
    for table in [
        &info.files,
        &info.classes,
        &info.fields,
        &info.methods,
        &info.variables,
    ] {
        write_strings(writer, table);
    }

    write_exact_methods(info, writer);

    write_mapping(writer, &info.file_mapping, |v| optional(*v));
    write_mapping(writer, &info.line_mapping, |v| *v);
    write_mapping(writer, &info.class_mapping, |v| optional(*v));
    write_mapping(writer, &info.method_mapping, |v| optional(*v));

    write_call_sites(info, writer);
    write_variables(info, writer);
    write_class_metadata(info, writer);
    write_control_flow_graphs(info, writer);
}

fn write_strings(writer: &mut Writer, table: &NameTable) {
    writer.write_count(table.len());
    for name in table.names() {
        writer.write_string(name);
    }
}

fn write_exact_methods(info: &DebugInformation, writer: &mut Writer) {
    writer.write_count(info.exact_methods.len());
    let mut class = Relative::default();
    let mut method = Relative::default();
    for exact in &info.exact_methods {
        class.write(writer, id(exact.class_id));
        method.write(writer, id(exact.method_descriptor_id));
    }
}

/// Write a strictly increasing key array: run-length coded line deltas, then columns.
///
/// A column is stored relative to the previous column when the line did not change, and as an
/// absolute value otherwise.
fn write_keys(writer: &mut Writer, keys: &[GeneratedLocation]) {
    let mut line_deltas = Vec::with_capacity(keys.len());
    let mut previous = GeneratedLocation::default();
    for key in keys {
        line_deltas.push(key.line - previous.line);
        previous.line = key.line;
    }
    writer.write_rle(&line_deltas);

    previous = GeneratedLocation::default();
    for (key, line_delta) in keys.iter().zip(&line_deltas) {
        if *line_delta == 0 {
            writer.write_varint(key.column - previous.column);
        } else {
            writer.write_varint(key.column);
        }
        previous = *key;
    }
}

fn write_mapping<V>(writer: &mut Writer, mapping: &Mapping<V>, encode: impl Fn(&V) -> i32) {
    writer.write_count(mapping.len());
    write_keys(writer, mapping.keys());

    let mut relative = Relative::default();
    for value in mapping.values() {
        relative.write(writer, encode(value));
    }
}

fn write_call_sites(info: &DebugInformation, writer: &mut Writer) {
    let mapping = &info.call_site_mapping;
    writer.write_count(mapping.len());
    write_keys(writer, mapping.keys());

    let mut relative = Relative::default();
    for site in mapping.values() {
        writer.write_u8(site.kind() as u8);
        if let CallSite::Static(method) | CallSite::Virtual(method) = site {
            relative.write(writer, id(*method));
        }
    }
}

fn write_multi_mapping(writer: &mut Writer, mapping: &MultiMapping<u32>) {
    writer.write_count(mapping.len());
    write_keys(writer, mapping.keys());

    let mut relative = Relative::default();
    for index in 0..mapping.len() {
        let values = mapping.values_at(index);
        writer.write_count(values.len());
        for value in values {
            relative.write(writer, id(*value));
        }
    }
}

fn write_variables(info: &DebugInformation, writer: &mut Writer) {
    let present: Vec<_> = info
        .variable_mappings
        .iter()
        .enumerate()
        .filter_map(|(variable, mapping)| Some((variable as u32, mapping.as_ref()?)))
        .collect();

    writer.write_count(present.len());
    let mut next = 0;
    for (variable, mapping) in present {
        writer.write_varint(variable - next);
        write_multi_mapping(writer, mapping);
        next = variable + 1;
    }
}

fn write_class_metadata(info: &DebugInformation, writer: &mut Writer) {
    let mut original = Relative::default();
    let mut generated = Relative::default();
    for metadata in &info.class_metadata {
        writer.write_varint(metadata.parent_id.map_or(0, |parent| parent.wrapping_add(1)));
        writer.write_count(metadata.field_renames.len());
        for (original_id, generated_id) in metadata.fields() {
            original.write(writer, id(original_id));
            generated.write(writer, id(generated_id));
        }
    }
}

fn write_control_flow_graphs(info: &DebugInformation, writer: &mut Writer) {
    for graph in &info.control_flow_graphs {
        writer.write_count(graph.line_count());
        let sizes: Vec<u32> = graph.lines().map(|line| line.len() as u32).collect();
        writer.write_rle(&sizes);

        let mut file = Relative::default();
        let mut line = Relative::default();
        for successor in graph.lines().flatten() {
            match successor {
                Successor::Exit => file.write(writer, 0),
                Successor::Line {
                    file: target,
                    line: target_line,
                } => {
                    file.write(writer, optional(Some(*target)));
                    line.write(writer, id(*target_line));
                }
            }
        }
    }
}
