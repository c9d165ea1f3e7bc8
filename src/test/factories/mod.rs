//! Factories for debug-information models used across the unit tests.

use std::sync::Arc;

use crate::information::{DebugInformation, DebugInformationBuilder, GeneratedLocation};

fn loc(line: u32, column: u32) -> GeneratedLocation {
    GeneratedLocation::new(line, column)
}

/// A single method in `Main.java`.
///
/// `Other.java` is interned first so `Main.java` gets file id 1 without covering any line.
///
/// | generated | source         |
/// |-----------|----------------|
/// | 10:0      | Main.java:5    |
/// | 10:5      | Main.java:5    |
/// | 12:0      | Main.java:7    |
pub fn scenario_info() -> Arc<DebugInformation> {
    let mut builder = DebugInformationBuilder::new();
    builder.add_file("Other.java");

    builder
        .emit_method_ref(loc(10, 0), Some(("Main", "main([Ljava/lang/String;)V")))
        .unwrap();
    builder.emit_location(loc(10, 0), Some("Main.java"), 5).unwrap();
    builder.emit_variable(loc(10, 0), &["args"], "$a").unwrap();
    builder.emit_location(loc(10, 5), Some("Main.java"), 5).unwrap();
    builder.emit_location(loc(12, 0), Some("Main.java"), 7).unwrap();
    builder.emit_variable(loc(12, 0), &["args", "copy"], "$a").unwrap();
    builder.emit_variable(loc(12, 0), &[], "$tmp").unwrap();

    builder.add_successors("Main.java", 5, &[Some(("Main.java", 7))]);
    builder.add_successors("Main.java", 7, &[None]);
    builder.build()
}

/// Three classes `Base`, `Derived extends Base` and `Leaf extends Derived`, each with its own
/// `run()V`.
///
/// - `Base` renames its field `count` to `a`, `Derived` renames `name` to `b`
/// - `Base.run` covers `Base.java` lines 3 (at 10:0) and 4 (at 11:0)
/// - line 4 holds a virtual call to `Base.run` at 11:5 and can exit the method
/// - `Derived.run` starts at 20:0 (`Derived.java:8`), `Leaf.run` at 30:0 (`Leaf.java:2`)
/// - from 40:0 on nothing is known
pub fn inheritance_info() -> Arc<DebugInformation> {
    let mut builder = DebugInformationBuilder::new();
    builder.add_class("Base", None);
    builder.add_field("count", "a");
    builder.add_class("Derived", Some("Base"));
    builder.add_field("name", "b");
    builder.add_class("Leaf", Some("Derived"));

    builder
        .emit_method_ref(loc(10, 0), Some(("Base", "run()V")))
        .unwrap();
    builder.emit_location(loc(10, 0), Some("Base.java"), 3).unwrap();
    builder.emit_variable(loc(10, 0), &["self"], "$this").unwrap();
    builder.emit_location(loc(11, 0), Some("Base.java"), 4).unwrap();
    let call = builder.emit_call_site(loc(11, 5)).unwrap();
    call.set_virtual_method(&mut builder, "Base", "run()V");
    builder.emit_call_site(loc(11, 10)).unwrap();

    builder
        .emit_method_ref(loc(20, 0), Some(("Derived", "run()V")))
        .unwrap();
    builder.emit_location(loc(20, 0), Some("Derived.java"), 8).unwrap();

    builder
        .emit_method_ref(loc(30, 0), Some(("Leaf", "run()V")))
        .unwrap();
    builder.emit_location(loc(30, 0), Some("Leaf.java"), 2).unwrap();

    builder.emit_method_ref(loc(40, 0), None).unwrap();
    builder.emit_location(loc(40, 0), None, -1).unwrap();

    builder.add_successors("Base.java", 3, &[Some(("Base.java", 4))]);
    builder.add_successors("Base.java", 4, &[None]);
    builder.build()
}
