//! Export of the file and line mappings as a source map (revision 3).
//!
//! Only what source maps can express survives: each generated position maps to a source file and
//! line, always at column 0. Class, method, variable and call-site information is dropped.

use std::io::Write;

use serde_json::json;

use crate::{
    information::{DebugInformation, FileId},
    Result,
};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Append `value` as a base64 VLQ: sign in bit 0, then 5-bit groups, least significant first.
fn encode_vlq(value: i64, out: &mut String) {
    let mut rest = if value < 0 {
        (value.unsigned_abs() << 1) | 1
    } else {
        value.unsigned_abs() << 1
    };
    loop {
        let mut digit = (rest & 0x1F) as usize;
        rest >>= 5;
        if rest != 0 {
            digit |= 0x20;
        }
        out.push(char::from(BASE64[digit]));
        if rest == 0 {
            break;
        }
    }
}

/// Running state of the `mappings` field. Generated columns restart on every generated line,
/// the source fields run across the whole map.
#[derive(Default)]
struct MappingsWriter {
    mappings: String,
    line: u32,
    column: i64,
    first_on_line: bool,
    source: i64,
    source_line: i64,
}

impl MappingsWriter {
    fn new() -> Self {
        MappingsWriter {
            first_on_line: true,
            ..Default::default()
        }
    }

    fn segment(&mut self, line: u32, column: u32, source: Option<(FileId, u32)>) {
        while self.line < line {
            self.mappings.push(';');
            self.line += 1;
            self.column = 0;
            self.first_on_line = true;
        }
        if !self.first_on_line {
            self.mappings.push(',');
        }
        self.first_on_line = false;

        encode_vlq(i64::from(column) - self.column, &mut self.mappings);
        self.column = i64::from(column);

        if let Some((file, source_line)) = source {
            // Source maps count lines from zero
            let source_line = i64::from(source_line.saturating_sub(1));
            encode_vlq(i64::from(file) - self.source, &mut self.mappings);
            encode_vlq(source_line - self.source_line, &mut self.mappings);
            encode_vlq(0, &mut self.mappings);
            self.source = i64::from(file);
            self.source_line = source_line;
        }
    }
}

impl DebugInformation {
    /// The `mappings` field of a source map for this model.
    ///
    /// A segment starts wherever the `(file, line)` pair changes. Where the source becomes
    /// unknown a one-field segment ends the previous mapping.
    #[must_use]
    pub fn source_map_mappings(&self) -> String {
        let mut writer = MappingsWriter::new();
        let mut last = None;

        for (location, file, line) in self.file_line_transitions() {
            let current = match (file, u32::try_from(line)) {
                (Some(file), Ok(line)) => Some((file, line)),
                _ => None,
            };
            // Nothing to end before the first mapped segment
            if current == last || (current.is_none() && last.is_none()) {
                continue;
            }
            writer.segment(location.line, location.column, current);
            last = current;
        }
        writer.mappings
    }

    /// Render a complete source map document.
    ///
    /// `generated_file` becomes the `file` field and `source_root` the `sourceRoot` field; the
    /// file name table becomes `sources`.
    #[must_use]
    pub fn to_source_map(&self, source_root: &str, generated_file: &str) -> String {
        json!({
            "version": 3,
            "file": generated_file,
            "sourceRoot": source_root,
            "sources": self.files.names(),
            "names": [],
            "mappings": self.source_map_mappings(),
        })
        .to_string()
    }

    /// Write the source map document into `sink`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if writing fails.
    pub fn write_source_map<W: Write>(
        &self,
        mut sink: W,
        source_root: &str,
        generated_file: &str,
    ) -> Result<()> {
        sink.write_all(self.to_source_map(source_root, generated_file).as_bytes())?;
        sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        information::{DebugInformationBuilder, GeneratedLocation},
        test::factories::{inheritance_info, scenario_info},
    };

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(value, &mut out);
        out
    }

    #[test]
    fn test_vlq() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-16), "hB");
        assert_eq!(vlq(1000), "w+B");
    }

    #[test]
    fn test_scenario_mappings() {
        // Main.java is source #1: line 5 at 10:0, line 7 at 12:0
        let expected = format!("{}ACIA;;AAEA", ";".repeat(10));
        assert_eq!(scenario_info().source_map_mappings(), expected);
    }

    #[test]
    fn test_unknown_code_ends_mapping() {
        let expected = format!(
            "{}AAEA;AACA{}ACIA{}ACNA{}A",
            ";".repeat(10),
            ";".repeat(9),
            ";".repeat(10),
            ";".repeat(10)
        );
        assert_eq!(inheritance_info().source_map_mappings(), expected);
    }

    #[test]
    fn test_segments_on_one_line() {
        let mut builder = DebugInformationBuilder::new();
        builder
            .emit_location(GeneratedLocation::new(0, 4), None, -1)
            .unwrap();
        builder
            .emit_location(GeneratedLocation::new(0, 8), Some("A.java"), 3)
            .unwrap();
        builder
            .emit_location(GeneratedLocation::new(0, 20), Some("A.java"), 1)
            .unwrap();
        builder
            .emit_location(GeneratedLocation::new(1, 2), None, -1)
            .unwrap();

        // Leading unknown code produces no segment
        assert_eq!(builder.build().source_map_mappings(), "QAEA,YAFA;E");
    }

    #[test]
    fn test_source_map_document() {
        let mut sink = Vec::new();
        scenario_info()
            .write_source_map(&mut sink, "src", "app.js")
            .unwrap();

        let document: serde_json::Value = serde_json::from_slice(&sink).unwrap();
        assert_eq!(document["version"], 3);
        assert_eq!(document["file"], "app.js");
        assert_eq!(document["sourceRoot"], "src");
        assert_eq!(document["sources"], json!(["Other.java", "Main.java"]));
        assert_eq!(document["names"], json!([]));
        assert_eq!(
            document["mappings"],
            scenario_info().source_map_mappings().as_str()
        );
    }
}
