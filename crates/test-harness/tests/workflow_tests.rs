//! Tests for the ModelBuilder workflow API.

use anvil_types::{BooleanOp, SketchPlane};
use file_format::SaveOptions;
use kernel_bridge::KernelCall;
use test_harness::assertions::*;
use test_harness::{HarnessError, ModelBuilder};

/// Unit cube "part" with a centered 0.5 x 0.5 sketch "sk" on its top face.
fn part_with_sketch() -> ModelBuilder {
    let mut m = ModelBuilder::mock();
    m.cube("part", 1.0, [0.0; 3]).unwrap();
    m.rect_sketch("sk", "part", SketchPlane::Xy, 0.5, -0.25, -0.25, 0.5, 0.5)
        .unwrap();
    m
}

#[test]
fn cube_creates_body_with_base_feature() {
    let mut m = ModelBuilder::mock();
    let id = m.cube("part", 1.0, [0.0; 3]).unwrap();
    assert_eq!(m.body_id("part").unwrap(), id);
    m.assert_feature_count("part", 1).unwrap();
    assert_eq!(m.body("part").unwrap().features[0].name, "Base Cube");
}

#[test]
fn named_lookup_returns_correct_uuid() {
    let mut m = part_with_sketch();
    let cut = m.cut("c1", "part", "sk", Some(0.3)).unwrap();
    assert_eq!(m.feature_id("c1").unwrap(), cut);
    assert!(m.feature("sk").unwrap().is_sketch());
    assert!(matches!(
        m.feature_id("nonexistent"),
        Err(HarnessError::FeatureNotFound { .. })
    ));
}

#[test]
fn duplicate_name_returns_error() {
    let mut m = part_with_sketch();
    let err = m.cube("sk", 1.0, [0.0; 3]).unwrap_err();
    assert!(matches!(err, HarnessError::DuplicateName { .. }));
    let err = m
        .rect_sketch("part", "part", SketchPlane::Xy, 0.5, 0.0, 0.0, 0.1, 0.1)
        .unwrap_err();
    assert!(matches!(err, HarnessError::DuplicateName { .. }));
}

#[test]
fn unknown_body_returns_error() {
    let mut m = part_with_sketch();
    let err = m.cut("c1", "missing", "sk", Some(0.3)).unwrap_err();
    assert!(matches!(err, HarnessError::BodyNotFound { .. }));
    assert!(m.feature_id("c1").is_err());
}

#[test]
fn cut_removes_tool_volume() {
    let mut m = part_with_sketch();
    m.cut("c1", "part", "sk", Some(0.3)).unwrap();
    let mesh = m.mesh("part").unwrap();
    // Tool spans the depth plus clearance on both sides.
    assert_volume(&mesh, 1.0 - 0.25 * 0.32, 1e-4, "cut").unwrap();
    m.assert_no_errors().unwrap();
}

#[test]
fn boss_extends_body() {
    let mut m = part_with_sketch();
    m.extrude("boss", "part", "sk", 1.0).unwrap();
    let mesh = m.mesh("part").unwrap();
    assert_bounding_box(&mesh, [-0.5, -0.5, -0.5], [0.5, 0.5, 1.5], 1e-5, "boss").unwrap();
    assert_volume(&mesh, 1.25, 1e-4, "boss").unwrap();
}

#[test]
fn refresh_memoizes_cut() {
    let mut m = part_with_sketch();
    m.cut("c1", "part", "sk", Some(0.3)).unwrap();
    m.assert_uncached("c1").unwrap();
    m.mesh("part").unwrap();
    m.assert_cached("c1").unwrap();
}

#[test]
fn undo_redo_works() {
    let mut m = part_with_sketch();
    m.cut("c1", "part", "sk", Some(0.3)).unwrap();
    m.assert_feature_count("part", 3).unwrap();

    m.undo().unwrap();
    m.assert_feature_count("part", 2).unwrap();

    m.redo().unwrap();
    m.assert_feature_count("part", 3).unwrap();
    assert!(m.redo().is_err(), "nothing left to redo");
}

#[test]
fn undo_on_fresh_builder_fails() {
    let mut m = ModelBuilder::mock();
    assert!(matches!(
        m.undo(),
        Err(HarnessError::AssertionFailed { .. })
    ));
}

#[test]
fn changing_depth_drops_cached_result() {
    let mut m = part_with_sketch();
    m.cut("c1", "part", "sk", Some(0.3)).unwrap();
    m.mesh("part").unwrap();
    m.assert_cached("c1").unwrap();

    m.set_cut_depth("c1", Some(0.5)).unwrap();
    m.assert_uncached("c1").unwrap();
    let mesh = m.mesh("part").unwrap();
    assert_volume(&mesh, 1.0 - 0.25 * 0.52, 1e-4, "deeper cut").unwrap();
}

#[test]
fn set_cut_depth_on_sketch_fails() {
    let mut m = part_with_sketch();
    let err = m.set_cut_depth("sk", Some(0.5)).unwrap_err();
    assert!(matches!(err, HarnessError::Engine(_)));
}

#[test]
fn delete_sketch_removes_consumers() {
    let mut m = part_with_sketch();
    m.cut("c1", "part", "sk", Some(0.2)).unwrap();
    m.cut("c2", "part", "sk", Some(0.4)).unwrap();
    assert_eq!(m.delete_sketch("sk").unwrap(), 3);
    m.assert_feature_count("part", 1).unwrap();
    assert!(m.feature_id("c1").is_err());
    assert!(m.feature_id("sk").is_err());
}

#[test]
fn delete_feature_keeps_the_rest() {
    let mut m = part_with_sketch();
    m.cut("c1", "part", "sk", Some(0.2)).unwrap();
    m.delete_feature("c1").unwrap();
    m.assert_feature_count("part", 2).unwrap();
    assert!(m.feature_id("sk").is_ok());
}

#[test]
fn revolve_and_fillet_evaluate() {
    let mut m = part_with_sketch();
    m.revolve("rev", "part", "sk", Some(360.0)).unwrap();
    m.fillet(
        "round",
        "part",
        anvil_types::EdgeDescriptor {
            start: [-0.5, -0.5, 0.5],
            end: [0.5, -0.5, 0.5],
            normal_a: [0.0, 0.0, 1.0],
            normal_b: Some([0.0, -1.0, 0.0]),
        },
        0.05,
    )
    .unwrap();
    m.mesh("part").unwrap();
    m.assert_no_errors().unwrap();
    assert_eq!(m.kernel().calls(KernelCall::Revolve), 1);
    assert_eq!(m.kernel().calls(KernelCall::Fillet), 1);
}

#[test]
fn boolean_new_keeps_operands() {
    let mut m = ModelBuilder::mock();
    m.cube("a", 1.0, [0.0; 3]).unwrap();
    m.cube("b", 1.0, [0.5, 0.0, 0.0]).unwrap();
    m.boolean_new("both", "a", "b", BooleanOp::Union).unwrap();

    assert_feature_structure(
        m.body("both").unwrap(),
        &[("Add Body", "Add Body"), ("Add Body", "Add Body")],
    )
    .unwrap();
    assert!(m.body("a").unwrap().visible);
    assert!(m.body("b").unwrap().visible);
    assert_eq!(m.state.scene().body_operations.len(), 1);
}

#[test]
fn merge_into_left_hides_right() {
    let mut m = ModelBuilder::mock();
    m.cube("a", 1.0, [0.0; 3]).unwrap();
    m.cube("b", 0.5, [0.5, 0.0, 0.0]).unwrap();
    m.merge_into_left("a", "b", BooleanOp::Difference).unwrap();

    assert_feature_structure(
        m.body("a").unwrap(),
        &[("Base Cube", "Base Cube"), ("Subtract Body", "Subtract Body")],
    )
    .unwrap();
    assert!(!m.body("b").unwrap().visible);
    let mesh = m.mesh("a").unwrap();
    assert_volume(&mesh, 1.0 - 0.125, 1e-4, "a minus b").unwrap();
}

#[test]
fn same_body_boolean_fails() {
    let mut m = ModelBuilder::mock();
    m.cube("a", 1.0, [0.0; 3]).unwrap();
    let err = m.merge_into_left("a", "a", BooleanOp::Union).unwrap_err();
    assert!(matches!(err, HarnessError::Engine(_)));
}

#[test]
fn delete_body_drops_records_and_names() {
    let mut m = ModelBuilder::mock();
    m.cube("a", 1.0, [0.0; 3]).unwrap();
    m.cube("b", 1.0, [2.0, 0.0, 0.0]).unwrap();
    m.boolean_new("both", "a", "b", BooleanOp::Union).unwrap();

    let dropped = m.delete_body("b").unwrap();
    assert_eq!(dropped.len(), 1);
    assert!(m.body_id("b").is_err());
    assert!(m.state.scene().body_operations.is_empty());
}

#[test]
fn failed_body_shows_placeholder() {
    let mut m = part_with_sketch();
    m.cut("c1", "part", "sk", Some(0.3)).unwrap();
    m.kernel_mut().fail_after(KernelCall::Boolean, 0);

    let mesh = m.mesh("part").unwrap();
    assert_volume(&mesh, 1.0, 1e-4, "placeholder").unwrap();
    assert!(m.assert_no_errors().is_err());
    assert_eq!(m.errors().len(), 1);
    assert_eq!(m.errors()[0].0, "part");
    m.assert_uncached("c1").unwrap();
}

#[test]
fn save_and_load_remaps_names() {
    let mut m = part_with_sketch();
    m.cut("c1", "part", "sk", Some(0.3)).unwrap();
    m.mesh("part").unwrap();
    let json = m.save(SaveOptions::default()).unwrap();

    let mut loaded = ModelBuilder::mock();
    loaded.load(&json).unwrap();
    assert!(loaded.body_id("part").is_ok());
    loaded.assert_cached("c1").unwrap();
    assert_eq!(loaded.feature_id("sk").unwrap(), m.feature_id("sk").unwrap());
}

#[test]
fn load_rejects_garbage() {
    let mut m = ModelBuilder::mock();
    let err = m.load("not json").unwrap_err();
    assert!(matches!(err, HarnessError::Load(_)));
}

#[test]
fn history_logs_operations() {
    let mut m = part_with_sketch();
    m.cut("c1", "part", "sk", Some(0.3)).unwrap();
    m.undo().unwrap();
    let actions: Vec<&str> = m.history().iter().map(|(a, _)| a.as_str()).collect();
    assert_eq!(actions, ["CreateBody", "AddFeature", "AddFeature", "Undo"]);
    assert_eq!(m.history()[2].1, "c1");
}
