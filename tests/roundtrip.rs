//! Integration tests for building, storing and loading debug information.
//!
//! Every model is built through the public builder, encoded, decoded again and then queried
//! through the decoded copy, the way a debugger sees it after loading a file from disk.

use aotdbg::{
    config::ReaderConfig,
    information::{CallSite, Successor},
    prelude::*,
};

fn loc(line: u32, column: u32) -> GeneratedLocation {
    GeneratedLocation::new(line, column)
}

fn round_trip(info: &DebugInformation) -> Result<DebugInformation> {
    DebugInformation::from_bytes(&info.to_bytes())
}

#[test]
fn test_transition_scenario() -> Result<()> {
    let mut builder = DebugInformationBuilder::new();
    builder.add_file("Prelude.java");
    builder.emit_location(loc(10, 0), Some("Main.java"), 5)?;
    builder.emit_location(loc(10, 5), Some("Main.java"), 5)?;
    builder.emit_location(loc(12, 0), Some("Main.java"), 7)?;
    let info = round_trip(&builder.build())?;

    let main = info.files().id("Main.java").unwrap();
    assert_eq!(main, 1);
    assert_eq!(info.line_mapping().len(), 2);

    let location = info.source_location(loc(11, 0));
    assert_eq!(location.file, Some(main));
    assert_eq!(location.line, 5);
    assert_eq!(info.generated_locations(main, 5), &[loc(10, 0)]);
    assert_eq!(info.generated_locations(main, 7), &[loc(12, 0)]);
    assert!(info.source_location(loc(9, 99)).is_unknown());
    Ok(())
}

#[test]
fn test_round_trip_answers_identically() -> Result<()> {
    let mut builder = DebugInformationBuilder::new();
    builder.add_class("app.Shape", None);
    builder.add_field("area", "$a");
    builder.add_class("app.Circle", Some("app.Shape"));
    builder.add_field("radius", "$r");

    builder.emit_method_ref(loc(0, 0), Some(("app.Shape", "area()D")))?;
    builder.emit_location(loc(0, 0), Some("Shape.java"), 12)?;
    builder.emit_variable(loc(0, 4), &["scale"], "$s")?;
    builder.emit_location(loc(1, 0), Some("Shape.java"), 13)?;
    let call = builder.emit_call_site(loc(1, 8))?;
    call.set_virtual_method(&mut builder, "app.Shape", "area()D");
    builder.emit_call_site(loc(1, 20))?;
    builder.emit_location(loc(2, 0), Some("Shape.java"), 12)?;

    builder.emit_method_ref(loc(5, 0), Some(("app.Circle", "area()D")))?;
    builder.emit_location(loc(5, 0), Some("Circle.java"), 4)?;
    builder.emit_location(loc(5, 30), None, -1)?;
    builder.emit_location(loc(6, 0), Some("Circle.java"), 5)?;
    builder.emit_method_ref(loc(7, 0), None)?;

    builder.add_successors("Shape.java", 12, &[Some(("Shape.java", 13)), None]);
    builder.add_successors("Shape.java", 13, &[Some(("Shape.java", 12))]);

    let built = builder.build();
    let loaded = round_trip(&built)?;
    assert_eq!(loaded, *built);

    let mut keys: Vec<GeneratedLocation> = built
        .file_mapping()
        .keys()
        .iter()
        .chain(built.line_mapping().keys())
        .chain(built.class_mapping().keys())
        .chain(built.method_mapping().keys())
        .copied()
        .collect();
    keys.sort_unstable();
    keys.dedup();
    for key in keys {
        assert_eq!(loaded.source_location(key), built.source_location(key), "at {key}");
    }

    let shape = loaded.files().id("Shape.java").unwrap();
    assert_eq!(loaded.generated_locations(shape, 12), &[loc(0, 0), loc(2, 0)]);
    assert_eq!(
        loaded.following_lines(shape, 12),
        Some(&[Successor::Exit, Successor::Line { file: shape, line: 13 }][..])
    );
    assert_eq!(
        loaded.reachable_generated_locations(shape, 13),
        vec![loc(0, 0), loc(2, 0)]
    );

    let site = loaded.call_site(loc(1, 10)).unwrap();
    assert!(matches!(site, CallSite::Virtual(_)));
    assert_eq!(loaded.call_site(loc(1, 25)), None);
    assert_eq!(loaded.call_sites_at(shape, 13).len(), 1);

    let target = site.method().unwrap();
    assert_eq!(loaded.overriding_methods(target).len(), 2);

    assert_eq!(loaded.variable_meaning_at(loc(0, 10), "$s"), vec!["scale"]);
    assert!(loaded.variable_meaning_at(loc(0, 1), "$s").is_empty());
    assert_eq!(loaded.field_meaning("app.Circle", "$a"), Some("area"));
    assert_eq!(loaded.field_meaning("app.Circle", "$r"), Some("radius"));

    let gap = loaded.source_location(loc(5, 40));
    assert_eq!(gap.file, None);
    assert_eq!(gap.line, -1);
    assert!(gap.method.is_some());
    Ok(())
}

#[test]
fn test_stream_round_trip() -> Result<()> {
    let mut builder = DebugInformationBuilder::new();
    builder.emit_location(loc(3, 1), Some("A.java"), 1)?;
    let info = builder.build();

    let mut bytes = Vec::new();
    info.write_to(&mut bytes)?;
    assert_eq!(bytes, info.to_bytes());

    let loaded = DebugInformation::read_from(bytes.as_slice())?;
    assert_eq!(loaded, *info);
    Ok(())
}

#[test]
fn test_reader_limits() -> Result<()> {
    let mut builder = DebugInformationBuilder::new();
    builder.emit_location(loc(0, 0), Some("AVeryLongFileName.java"), 1)?;
    let bytes = builder.build().to_bytes();

    let strict = ReaderConfig::new().with_max_string_len(4);
    assert!(matches!(
        DebugInformation::read_with_config(&bytes, &strict),
        Err(Error::Malformed { .. })
    ));
    assert!(DebugInformation::read_with_config(&bytes, &ReaderConfig::default()).is_ok());
    Ok(())
}

#[test]
fn test_out_of_order_emission_rejected() -> Result<()> {
    let mut builder = DebugInformationBuilder::new();
    builder.emit_location(loc(4, 0), Some("A.java"), 1)?;

    let error = builder.emit_location(loc(3, 9), Some("A.java"), 2).unwrap_err();
    assert!(matches!(error, Error::LocationOrder { .. }));

    let info = builder.build();
    assert_eq!(info.line_mapping().len(), 1);
    Ok(())
}
