use anvil_types::*;
use feature_engine::*;
use kernel_bridge::{GeometryKernel, KernelCall, KernelError, MockKernel};
use uuid::Uuid;

/// Sketch feature with a 0.5 x 0.5 square centered on the origin, lying on
/// the top face of a unit cube.
fn top_sketch() -> Feature {
    let mut sketch = Sketch::new(SketchPlane::Xy, 0.5);
    sketch.add_element(SketchElement::Rectangle {
        corner: Point2D::new(-0.25, -0.25),
        width: 0.5,
        height: 0.5,
    });
    Feature::new(
        "Sketch",
        Operation::Sketch {
            sketch,
            transform: Transform::identity(),
        },
    )
}

fn cut(sketch_id: FeatureId, depth: f64) -> Feature {
    Feature::new(
        "Cut",
        Operation::Extrude {
            params: ExtrudeParams::cut(sketch_id, Some(depth)),
        },
    )
}

fn boss(sketch_id: FeatureId, height: f64) -> Feature {
    Feature::new(
        "Boss",
        Operation::Extrude {
            params: ExtrudeParams::boss(sketch_id, height),
        },
    )
}

fn cube() -> Feature {
    Feature::new(
        "Base Cube",
        Operation::BasePrimitive {
            primitive: Primitive::unit_cube(),
            transform: Transform::identity(),
        },
    )
}

/// Cube with a sketch on top and `cuts` cut extrudes from it.
fn cut_body(cuts: usize) -> Body {
    let mut body = Body::new("Part");
    body.features.push(cube());
    let sketch = top_sketch();
    let sketch_id = sketch.id;
    body.features.push(sketch);
    for i in 0..cuts {
        body.features.push(cut(sketch_id, 0.1 * (i + 1) as f64));
    }
    body
}

fn loaded(bodies: Vec<Body>) -> SceneState {
    let mut state = SceneState::default();
    state.set_scene(SceneDescription {
        bodies,
        body_operations: Vec::new(),
    });
    state
}

// ── Evaluator ─────────────────────────────────────────────────────────────

#[test]
fn evaluation_is_deterministic() {
    let body = cut_body(2);
    let config = EngineConfig::default();
    let cache = GeometryCache::new();

    let first = evaluate_body(&body, &cache, &config, &mut MockKernel::new());
    let second = evaluate_body(&body, &cache, &config, &mut MockKernel::new());
    assert!(first.is_ok());
    assert_eq!(first.mesh, second.mesh);
    assert_eq!(first.commits, second.commits);
}

#[test]
fn cut_produces_commit_with_base_mesh() {
    let body = cut_body(1);
    let mut kernel = MockKernel::new();
    let evaluation = evaluate_body(
        &body,
        &GeometryCache::new(),
        &EngineConfig::default(),
        &mut kernel,
    );

    assert_eq!(evaluation.commits.len(), 1);
    let commit = &evaluation.commits[0];
    assert_eq!(commit.feature_id, body.features[2].id);
    assert_eq!(commit.base_mesh, Mesh::placeholder(1.0));
    assert_eq!(Some(&commit.cached_mesh), evaluation.mesh.as_ref());
    assert_eq!(kernel.calls(KernelCall::Boolean), 1);
}

#[test]
fn cached_body_needs_no_kernel_calls() {
    let mut body = cut_body(2);
    let config = EngineConfig::default();
    let first = evaluate_body(&body, &GeometryCache::new(), &config, &mut MockKernel::new());
    for commit in &first.commits {
        body.feature_mut(commit.feature_id)
            .unwrap()
            .commit_cache(commit.cached_mesh.clone(), Some(commit.base_mesh.clone()));
    }

    let mut kernel = MockKernel::new();
    let second = evaluate_body(&body, &GeometryCache::new(), &config, &mut kernel);
    assert_eq!(kernel.solid_calls(), 0);
    assert_eq!(second.mesh, first.mesh);
}

#[test]
fn dangling_sketch_reference_is_skipped() {
    let mut body = Body::new("Part");
    body.features.push(cube());
    let orphan = boss(Uuid::new_v4(), 1.0);
    let orphan_id = orphan.id;
    body.features.push(orphan);

    let evaluation = evaluate_body(
        &body,
        &GeometryCache::new(),
        &EngineConfig::default(),
        &mut MockKernel::new(),
    );
    assert!(evaluation.is_ok());
    assert_eq!(evaluation.skipped, vec![orphan_id]);
    assert_eq!(evaluation.mesh, Some(Mesh::placeholder(1.0)));
}

#[test]
fn sketch_must_precede_its_consumer() {
    let mut body = Body::new("Part");
    body.features.push(cube());
    let sketch = top_sketch();
    body.features.push(cut(sketch.id, 0.2));
    body.features.push(sketch);

    let evaluation = evaluate_body(
        &body,
        &GeometryCache::new(),
        &EngineConfig::default(),
        &mut MockKernel::new(),
    );
    assert_eq!(evaluation.skipped.len(), 1);
    assert!(evaluation.commits.is_empty());
}

#[test]
fn later_boss_is_unioned() {
    let mut body = Body::new("Part");
    body.features.push(cube());
    let sketch = top_sketch();
    let sketch_id = sketch.id;
    body.features.push(sketch);
    body.features.push(boss(sketch_id, 1.0));

    let mut kernel = MockKernel::new();
    let evaluation = evaluate_body(
        &body,
        &GeometryCache::new(),
        &EngineConfig::default(),
        &mut kernel,
    );
    let (min, max) = evaluation.mesh.unwrap().bounds().unwrap();
    assert_eq!(min[2], -0.5);
    assert_eq!(max[2], 1.5);
    assert_eq!(kernel.calls(KernelCall::Boolean), 1);
}

#[test]
fn kernel_failure_yields_placeholder() {
    let body = cut_body(1);
    let config = EngineConfig::default();
    let mut cache = GeometryCache::new();
    cache.set(body.id, Mesh::cuboid([0.0; 3], [5.0; 3]));

    let mut kernel = MockKernel::new();
    kernel.fail_after(KernelCall::Boolean, 0);
    let evaluation = evaluate_into_cache(&body, &mut cache, &config, &mut kernel);

    let failure = evaluation.failure.as_ref().unwrap();
    assert_eq!(failure.feature_id, body.features[2].id);
    assert_eq!(
        failure.error.to_string(),
        "operation error: kernel error: injected Boolean failure"
    );
    assert!(evaluation.mesh.is_none());
    assert_eq!(evaluation.display_mesh(&config), Some(config.placeholder_mesh()));
    assert!(!cache.contains(body.id));
}

#[test]
fn boolean_modify_reads_tool_from_cache() {
    let tool_body = {
        let mut b = Body::new("Tool");
        b.features.push(cube());
        b
    };
    let mut user = Body::new("User");
    user.features.push(Feature::new(
        "Add Body",
        Operation::BooleanModify {
            params: BooleanModifyParams {
                op: BooleanOp::Union,
                tool_body_id: tool_body.id,
            },
        },
    ));

    let config = EngineConfig::default();
    let mut cache = GeometryCache::new();
    let mut kernel = MockKernel::new();

    // Without the tool in the cache the step is skipped.
    let missing = evaluate_body(&user, &cache, &config, &mut kernel);
    assert_eq!(missing.skipped.len(), 1);
    assert!(missing.mesh.is_none());

    evaluate_into_cache(&tool_body, &mut cache, &config, &mut kernel);
    let seeded = evaluate_body(&user, &cache, &config, &mut kernel);
    assert_eq!(seeded.mesh.as_ref(), cache.get(tool_body.id));
}

// ── Scene model ───────────────────────────────────────────────────────────

#[test]
fn mutations_bump_versions() {
    let mut state = SceneState::default();
    let v0 = state.version();
    let body = state.create_body("Part");
    assert!(state.version() > v0);
    let at_create = state.body_version(body);

    state.add_feature(body, cube()).unwrap();
    assert!(state.body_version(body) > at_create);
}

#[test]
fn unknown_ids_are_errors() {
    let mut state = SceneState::default();
    let missing = Uuid::new_v4();
    assert!(matches!(
        state.add_feature(missing, cube()),
        Err(EngineError::BodyNotFound { .. })
    ));
    let body = state.create_body("Part");
    assert!(matches!(
        state.remove_feature(body, missing),
        Err(EngineError::FeatureNotFound { .. })
    ));
}

#[test]
fn undo_undo_redo_restores_two_features() {
    let mut state = SceneState::default();
    let body = state.create_body("Part");
    let a = state.add_feature(body, cube()).unwrap();
    let b = state.add_feature(body, top_sketch()).unwrap();
    state.add_feature(body, top_sketch()).unwrap();

    assert!(state.undo());
    assert!(state.undo());
    assert!(state.redo());

    let ids: Vec<FeatureId> = state.body(body).unwrap().features.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![a, b]);
}

#[test]
fn undo_on_empty_history_is_noop() {
    let mut state = SceneState::default();
    assert!(!state.undo());
    assert!(!state.redo());
    assert!(state.scene().bodies.is_empty());
}

#[test]
fn scene_history_is_bounded() {
    let mut state = SceneState::new(EngineConfig::with_history_limits(3, 50));
    for i in 0..10 {
        state.create_body(format!("Body {i}"));
    }
    let mut undone = 0;
    while state.undo() {
        undone += 1;
    }
    assert_eq!(undone, 3);
    assert_eq!(state.scene().bodies.len(), 7);
}

#[test]
fn removing_sketch_removes_direct_consumers_only() {
    let mut state = SceneState::default();
    let body = state.create_body("Part");
    state.add_feature(body, cube()).unwrap();
    let sketch = top_sketch();
    let sketch_id = sketch.id;
    state.add_feature(body, sketch).unwrap();
    let e1 = state.add_feature(body, boss(sketch_id, 1.0)).unwrap();
    let e2 = state.add_feature(body, cut(sketch_id, 0.2)).unwrap();
    let other = top_sketch();
    let other_id = other.id;
    state.add_feature(body, other).unwrap();
    let e3 = state.add_feature(body, boss(other_id, 1.0)).unwrap();

    let removed = state.remove_sketch_and_dependents(body, sketch_id).unwrap();
    assert_eq!(removed, vec![sketch_id, e1, e2]);

    let left: Vec<FeatureId> = state.body(body).unwrap().features.iter().map(|f| f.id).collect();
    assert_eq!(left.len(), 3);
    assert_eq!(&left[1..], &[other_id, e3]);
}

#[test]
fn removing_non_sketch_through_cascade_is_rejected() {
    let mut state = SceneState::default();
    let body = state.create_body("Part");
    let base = state.add_feature(body, cube()).unwrap();
    assert!(matches!(
        state.remove_sketch_and_dependents(body, base),
        Err(EngineError::WrongOperation { .. })
    ));
}

#[test]
fn selection_visibility_and_reset() {
    let mut state = SceneState::default();
    let body = state.create_body("Part");
    let base = state.add_feature(body, cube()).unwrap();

    state.select_feature(body, base).unwrap();
    assert_eq!(state.selection().feature, Some((body, base)));
    assert!(matches!(
        state.select_feature(body, Uuid::new_v4()),
        Err(EngineError::FeatureNotFound { .. })
    ));

    let version = state.version();
    state.notify_mutated();
    assert_eq!(state.version(), version + 1);

    state.set_body_visible(body, false).unwrap();
    assert!(!state.scene().bodies[0].visible);
    assert!(state.undo());
    assert!(state.scene().bodies[0].visible);

    state.clear();
    assert!(state.scene().bodies.is_empty());
    assert!(!state.can_undo());
    assert!(state.selection().feature.is_none());
}

#[test]
fn orphaned_feature_stays_in_outline_root() {
    let mut state = SceneState::default();
    let body = state.create_body("Part");
    state.add_feature(body, cube()).unwrap();
    let sketch = top_sketch();
    let sketch_id = sketch.id;
    state.add_feature(body, sketch).unwrap();
    let consumer = state.add_feature(body, boss(sketch_id, 1.0)).unwrap();

    state.remove_feature(body, sketch_id).unwrap();
    let outline = state.outline(body).unwrap();
    assert_eq!(outline.len(), 2);
    assert_eq!(outline[1].feature_id, consumer);
}

#[test]
fn editing_sketch_drops_downstream_caches() {
    let mut body = cut_body(2);
    for feature in body.features.iter_mut().skip(2) {
        feature.commit_cache(Mesh::placeholder(1.0), Some(Mesh::placeholder(1.0)));
    }
    let body_id = body.id;
    let sketch_id = body.features[1].id;
    let mut state = loaded(vec![body]);
    assert_eq!(state.scene().cached_feature_count(), 2);

    let mut sketch = match &state.feature(body_id, sketch_id).unwrap().operation {
        Operation::Sketch { sketch, .. } => sketch.clone(),
        _ => unreachable!(),
    };
    sketch.offset = 0.25;
    state.replace_sketch(body_id, sketch_id, sketch).unwrap();
    assert_eq!(state.scene().cached_feature_count(), 0);
}

#[test]
fn editing_one_cut_keeps_earlier_caches() {
    let mut body = cut_body(2);
    for feature in body.features.iter_mut().skip(2) {
        feature.commit_cache(Mesh::placeholder(1.0), Some(Mesh::placeholder(1.0)));
    }
    let body_id = body.id;
    let second = body.features[3].id;
    let mut state = loaded(vec![body]);

    state
        .update_extrude(body_id, second, |p| p.height = Some(0.4))
        .unwrap();
    let body = state.body(body_id).unwrap();
    assert!(body.features[2].cached_mesh.is_some());
    assert!(body.features[3].cached_mesh.is_none());
}

#[test]
fn update_extrude_rejects_other_features() {
    let mut state = SceneState::default();
    let body = state.create_body("Part");
    let base = state.add_feature(body, cube()).unwrap();
    let err = state.update_extrude(body, base, |p| p.cut = true).unwrap_err();
    assert!(matches!(err, EngineError::WrongOperation { expected: "extrude", .. }));
}

#[test]
fn editing_tool_body_invalidates_its_users() {
    let tool = cut_body(0);
    let mut user = cut_body(0);
    user.features.push(Feature::new(
        "Subtract",
        Operation::BooleanModify {
            params: BooleanModifyParams {
                op: BooleanOp::Difference,
                tool_body_id: tool.id,
            },
        },
    ));
    let sketch_id = user.features[1].id;
    let mut late_cut = cut(sketch_id, 0.2);
    late_cut.commit_cache(Mesh::placeholder(1.0), Some(Mesh::placeholder(1.0)));
    user.features.push(late_cut);
    let (tool_id, user_id) = (tool.id, user.id);
    let base_id = tool.features[0].id;
    let mut state = loaded(vec![tool, user]);

    let before = state.body_version(user_id);
    state
        .update_feature(
            tool_id,
            base_id,
            FeaturePatch::operation(Operation::BasePrimitive {
                primitive: Primitive::Sphere { radius: 2.0 },
                transform: Transform::identity(),
            }),
        )
        .unwrap();
    assert!(state.body_version(user_id) > before);
    assert_eq!(state.scene().cached_feature_count(), 0);
}

#[test]
fn removing_body_drops_records_and_selection() {
    let mut state = SceneState::default();
    let a = state.create_body_with_primitive("A", Primitive::unit_cube(), Transform::identity());
    let b = state.create_body_with_primitive("B", Primitive::unit_cube(), Transform::identity());
    let op = state
        .apply_boolean(a, b, BooleanOp::Union, BooleanResult::create_new_body("C"))
        .unwrap();
    state.select_body(a, false).unwrap();

    let dropped = state.remove_body(a).unwrap();
    assert_eq!(dropped, vec![op]);
    assert!(state.scene().body_operations.is_empty());
    assert!(state.selection().is_empty());
}

#[test]
fn visibility_toggle() {
    let mut state = SceneState::default();
    let a = state.create_body("A");
    assert!(!state.toggle_body_visibility(a).unwrap());
    assert!(!state.body(a).unwrap().visible);
    assert!(state.undo());
    assert!(state.body(a).unwrap().visible);
}

// ── Boolean policy ────────────────────────────────────────────────────────

#[test]
fn create_new_body_leaves_operands_alone() {
    let mut state = SceneState::default();
    let a = state.create_body_with_primitive("A", Primitive::unit_cube(), Transform::identity());
    let b = state.create_body_with_primitive(
        "B",
        Primitive::unit_cube(),
        Transform::translation(0.5, 0.0, 0.0),
    );
    let before_a = state.body(a).unwrap().clone();
    let before_b = state.body(b).unwrap().clone();

    let result = BooleanResult::create_new_body("A+B");
    let BooleanResult::CreateNewBody { new_body_id, .. } = result.clone() else {
        unreachable!()
    };
    state
        .apply_boolean(a, b, BooleanOp::Intersection, result)
        .unwrap();

    assert_eq!(state.body(a).unwrap(), &before_a);
    assert_eq!(state.body(b).unwrap(), &before_b);
    assert_eq!(state.scene().bodies.len(), 3);
    assert_eq!(state.scene().body_operations.len(), 1);

    let created = state.body(new_body_id).unwrap();
    assert_eq!(created.name, "A+B");
    assert_eq!(created.tool_bodies(), vec![a, b]);

    let mut kernel = MockKernel::new();
    let mut cache = GeometryCache::new();
    let mut meshes = SceneMeshes::new();
    let order = meshes.refresh(&mut state, &mut kernel, &mut cache);
    assert_eq!(order.last(), Some(&new_body_id));
    let (min, max) = meshes.mesh(new_body_id).unwrap().bounds().unwrap();
    assert_eq!(min[0], 0.0);
    assert_eq!(max[0], 0.5);
}

#[test]
fn merge_into_left_hides_right() {
    let mut state = SceneState::default();
    let a = state.create_body_with_primitive("A", Primitive::unit_cube(), Transform::identity());
    let b = state.create_body_with_primitive("B", Primitive::unit_cube(), Transform::identity());
    state
        .apply_boolean(a, b, BooleanOp::Difference, BooleanResult::MergeIntoLeft)
        .unwrap();

    let left = state.body(a).unwrap();
    assert_eq!(left.features.len(), 2);
    assert_eq!(left.tool_bodies(), vec![b]);
    assert!(!state.body(b).unwrap().visible);
    assert!(state.body(a).unwrap().visible);
}

#[test]
fn merge_into_right_targets_right() {
    let mut state = SceneState::default();
    let a = state.create_body_with_primitive("A", Primitive::unit_cube(), Transform::identity());
    let b = state.create_body_with_primitive("B", Primitive::unit_cube(), Transform::identity());
    state
        .apply_boolean(a, b, BooleanOp::Union, BooleanResult::MergeIntoRight)
        .unwrap();
    assert_eq!(state.body(b).unwrap().tool_bodies(), vec![a]);
    assert!(!state.body(a).unwrap().visible);
}

#[test]
fn boolean_with_itself_is_rejected() {
    let mut state = SceneState::default();
    let a = state.create_body("A");
    assert!(matches!(
        state.apply_boolean(a, a, BooleanOp::Union, BooleanResult::MergeIntoLeft),
        Err(EngineError::SameBody { .. })
    ));
    assert!(state.scene().body_operations.is_empty());
}

// ── Display refresh ───────────────────────────────────────────────────────

#[test]
fn refresh_only_reevaluates_changed_bodies() {
    let mut state = SceneState::default();
    let a = state.create_body_with_primitive("A", Primitive::unit_cube(), Transform::identity());
    let b = state.create_body_with_primitive("B", Primitive::unit_cube(), Transform::identity());
    let mut kernel = MockKernel::new();
    let mut cache = GeometryCache::new();
    let mut meshes = SceneMeshes::new();

    assert_eq!(meshes.refresh(&mut state, &mut kernel, &mut cache), vec![a, b]);
    assert!(meshes.refresh(&mut state, &mut kernel, &mut cache).is_empty());

    state.rename_body(a, "Renamed").unwrap();
    assert!(meshes.refresh(&mut state, &mut kernel, &mut cache).is_empty());

    state.add_feature(b, top_sketch()).unwrap();
    assert_eq!(meshes.refresh(&mut state, &mut kernel, &mut cache), vec![b]);
}

#[test]
fn refresh_follows_tool_dependencies() {
    let mut state = SceneState::default();
    let a = state.create_body_with_primitive("A", Primitive::unit_cube(), Transform::identity());
    let b = state.create_body_with_primitive("B", Primitive::unit_cube(), Transform::identity());
    state
        .apply_boolean(a, b, BooleanOp::Union, BooleanResult::create_new_body("C"))
        .unwrap();
    let mut kernel = MockKernel::new();
    let mut cache = GeometryCache::new();
    let mut meshes = SceneMeshes::new();
    meshes.refresh(&mut state, &mut kernel, &mut cache);

    state.add_feature(b, top_sketch()).unwrap();
    let evaluated = meshes.refresh(&mut state, &mut kernel, &mut cache);
    assert_eq!(evaluated.len(), 2);
    assert_eq!(evaluated[0], b);
}

#[test]
fn refresh_reports_failures_and_hides_removed() {
    let mut state = SceneState::default();
    let a = state.create_body_with_primitive("A", Primitive::unit_cube(), Transform::identity());
    let b = state.create_body_with_primitive("B", Primitive::unit_cube(), Transform::identity());
    let mut kernel = MockKernel::new();
    kernel.fail_after(KernelCall::Primitive, 1);
    let mut cache = GeometryCache::new();
    let mut meshes = SceneMeshes::new();
    meshes.refresh(&mut state, &mut kernel, &mut cache);

    assert!(meshes.error(a).is_none());
    assert!(meshes.error(b).is_some());
    assert_eq!(meshes.mesh(b), Some(&Mesh::placeholder(1.0)));
    assert!(cache.contains(a));
    assert!(!cache.contains(b));

    state.remove_body(a).unwrap();
    meshes.refresh(&mut state, &mut kernel, &mut cache);
    assert!(meshes.mesh(a).is_none());
    assert!(!cache.contains(a));
    assert_eq!(meshes.visible(&state).len(), 1);
}

#[test]
fn refresh_retries_failed_body() {
    let mut state = SceneState::default();
    let a = state.create_body_with_primitive("A", Primitive::unit_cube(), Transform::identity());
    let mut kernel = MockKernel::new();
    kernel.fail_after(KernelCall::Primitive, 0);
    let mut cache = GeometryCache::new();
    let mut meshes = SceneMeshes::new();
    assert_eq!(meshes.refresh(&mut state, &mut kernel, &mut cache), vec![a]);
    assert!(meshes.error(a).is_some());
    assert!(!cache.contains(a));

    // An unrelated edit must not leave the failed body behind.
    kernel.clear_failures();
    kernel.reset_calls();
    let b = state.create_body("B");
    let evaluated = meshes.refresh(&mut state, &mut kernel, &mut cache);
    assert_eq!(evaluated, vec![a, b]);
    assert_eq!(kernel.calls(KernelCall::Primitive), 1);
    assert!(meshes.error(a).is_none());
    assert!(cache.contains(a));

    assert!(meshes.refresh(&mut state, &mut kernel, &mut cache).is_empty());
    assert_eq!(kernel.calls(KernelCall::Primitive), 1);
}

#[test]
fn refresh_persists_recomputed_cuts() {
    let body = cut_body(1);
    let body_id = body.id;
    let mut state = loaded(vec![body]);
    let before = state.version();
    let mut meshes = SceneMeshes::new();
    meshes.refresh(&mut state, &mut MockKernel::new(), &mut GeometryCache::new());

    assert_eq!(state.scene().cached_feature_count(), 1);
    assert!(state.version() > before);
    assert!(!state.can_undo());
    assert!(state.body(body_id).unwrap().features[2].base_mesh.is_some());
}

// ── Rebuild coordinator ───────────────────────────────────────────────────

#[test]
fn rebuild_fills_missing_caches_once() {
    let mut state = loaded(vec![cut_body(2)]);
    let mut coordinator = RebuildCoordinator::new();
    let mut kernel = MockKernel::new();
    let mut cache = GeometryCache::new();

    assert_eq!(coordinator.pending_bodies(&state).len(), 1);
    let report = coordinator.run(&mut state, &mut kernel, &mut cache, &CancelToken::new());
    assert!(report.is_clean());
    assert_eq!(report.committed.len(), 2);
    assert_eq!(state.scene().cached_feature_count(), 2);
    let booleans = kernel.calls(KernelCall::Boolean);

    let again = coordinator.run(&mut state, &mut kernel, &mut cache, &CancelToken::new());
    assert!(again.committed.is_empty());
    assert!(again.bodies.is_empty());
    assert_eq!(kernel.calls(KernelCall::Boolean), booleans);
}

#[test]
fn rebuild_isolates_failures() {
    let body = cut_body(3);
    let body_id = body.id;
    let (f1, f2, f3) = (body.features[2].id, body.features[3].id, body.features[4].id);
    let mut state = loaded(vec![body]);

    let mut kernel = MockKernel::new();
    kernel.fail_after(KernelCall::Boolean, 1);
    let mut coordinator = RebuildCoordinator::new();
    let mut cache = GeometryCache::new();
    let report = coordinator.run(&mut state, &mut kernel, &mut cache, &CancelToken::new());

    assert_eq!(report.committed, vec![f1]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, f2);
    assert_eq!(report.skipped, vec![f3]);

    let features = &state.body(body_id).unwrap().features;
    assert!(features[2].cached_mesh.is_some());
    assert!(features[3].cached_mesh.is_none());
    assert!(features[4].cached_mesh.is_none());
    assert!(!cache.contains(body_id));

    // The failed cut and everything after it are retried on the next pass.
    kernel.clear_failures();
    assert_eq!(coordinator.pending_bodies(&state), vec![body_id]);
    let report = coordinator.run(&mut state, &mut kernel, &mut cache, &CancelToken::new());
    assert!(report.is_clean());
    assert_eq!(report.committed, vec![f2, f3]);
    assert!(cache.contains(body_id));
    assert!(!coordinator.is_marked(f2));
    assert!(coordinator.pending_bodies(&state).is_empty());
}

#[test]
fn cuts_before_last_cached_cut_are_not_rebuilt() {
    let body = cut_body(2);
    let body_id = body.id;
    let (first, last) = (body.features[2].id, body.features[3].id);
    let mut state = loaded(vec![body]);
    state
        .commit_cache(body_id, last, Mesh::placeholder(0.5), None)
        .unwrap();
    let mut coordinator = RebuildCoordinator::new();
    assert!(coordinator.pending_bodies(&state).is_empty());

    let mut kernel = MockKernel::new();
    let mut cache = GeometryCache::new();
    let report = coordinator.run(&mut state, &mut kernel, &mut cache, &CancelToken::new());
    assert!(report.is_clean());
    assert!(report.committed.is_empty());
    assert_eq!(report.bodies, vec![body_id]);
    assert_eq!(kernel.solid_calls(), 0);
    assert!(cache.contains(body_id));

    for _ in 0..2 {
        let again = coordinator.run(&mut state, &mut kernel, &mut cache, &CancelToken::new());
        assert!(again.bodies.is_empty());
    }
    assert!(state.body(body_id).unwrap().features[2].cached_mesh.is_none());
    assert!(!coordinator.is_marked(first));
}

#[test]
fn cancelled_before_start_does_nothing() {
    let mut state = loaded(vec![cut_body(1)]);
    let token = CancelToken::new();
    token.cancel();
    let mut kernel = MockKernel::new();
    let report = RebuildCoordinator::new().run(
        &mut state,
        &mut kernel,
        &mut GeometryCache::new(),
        &token,
    );
    assert!(report.cancelled);
    assert_eq!(kernel.solid_calls(), 0);
    assert_eq!(state.scene().cached_feature_count(), 0);
}

/// Delegates to a MockKernel and fires a cancel token after the first
/// boolean.
struct CancellingKernel {
    inner: MockKernel,
    token: CancelToken,
}

impl GeometryKernel for CancellingKernel {
    fn generate_primitive(
        &mut self,
        primitive: &Primitive,
        transform: &Transform,
    ) -> Result<Mesh, KernelError> {
        self.inner.generate_primitive(primitive, transform)
    }

    fn generate_extrude(
        &mut self,
        request: &kernel_bridge::ExtrudeRequest,
    ) -> Result<Mesh, KernelError> {
        self.inner.generate_extrude(request)
    }

    fn generate_revolve(
        &mut self,
        request: &kernel_bridge::RevolveRequest,
    ) -> Result<Mesh, KernelError> {
        self.inner.generate_revolve(request)
    }

    fn boolean(&mut self, a: &Mesh, b: &Mesh, op: BooleanOp) -> Result<Mesh, KernelError> {
        let result = self.inner.boolean(a, b, op);
        self.token.cancel();
        result
    }

    fn fillet_edges(
        &mut self,
        mesh: &Mesh,
        edges: &[EdgeDescriptor],
        radius: f64,
        segments: u32,
    ) -> Result<Mesh, KernelError> {
        self.inner.fillet_edges(mesh, edges, radius, segments)
    }

    fn chamfer_edges(
        &mut self,
        mesh: &Mesh,
        edges: &[EdgeDescriptor],
        distance: f64,
    ) -> Result<Mesh, KernelError> {
        self.inner.chamfer_edges(mesh, edges, distance)
    }
}

#[test]
fn cancellation_keeps_earlier_commits() {
    let body = cut_body(2);
    let body_id = body.id;
    let mut state = loaded(vec![body]);
    let token = CancelToken::new();
    let mut kernel = CancellingKernel {
        inner: MockKernel::new(),
        token: token.clone(),
    };
    let mut coordinator = RebuildCoordinator::new();
    let mut cache = GeometryCache::new();
    let report = coordinator.run(&mut state, &mut kernel, &mut cache, &token);

    assert!(report.cancelled);
    assert_eq!(report.committed.len(), 1);
    let features = &state.body(body_id).unwrap().features;
    assert!(features[2].cached_mesh.is_some());
    assert!(features[3].cached_mesh.is_none());
}

#[test]
fn rebuild_evaluates_tool_bodies_first() {
    let tool = {
        let mut b = Body::new("Tool");
        b.features.push(cube());
        b
    };
    let mut user = cut_body(0);
    user.features.push(Feature::new(
        "Subtract",
        Operation::BooleanModify {
            params: BooleanModifyParams {
                op: BooleanOp::Difference,
                tool_body_id: tool.id,
            },
        },
    ));
    let sketch_id = user.features[1].id;
    user.features.push(cut(sketch_id, 0.2));
    let (tool_id, user_id) = (tool.id, user.id);
    // The user comes first in the list.
    let mut state = loaded(vec![user, tool]);

    let mut cache = GeometryCache::new();
    let report = RebuildCoordinator::new().run(
        &mut state,
        &mut MockKernel::new(),
        &mut cache,
        &CancelToken::new(),
    );
    assert_eq!(report.bodies, vec![tool_id, user_id]);
    assert_eq!(report.committed.len(), 1);
    assert!(cache.contains(tool_id) && cache.contains(user_id));
}

// ── Sketch editing ────────────────────────────────────────────────────────

fn sketch_scene() -> (SceneState, BodyId, FeatureId) {
    let mut state = SceneState::default();
    let body = state.create_body_with_primitive("A", Primitive::unit_cube(), Transform::identity());
    let sketch = top_sketch();
    let sketch_id = sketch.id;
    state.add_feature(body, sketch).unwrap();
    (state, body, sketch_id)
}

#[test]
fn solve_keeps_ids_and_commit_is_one_undo_step() {
    let (mut state, body, sketch_id) = sketch_scene();
    let mut kernel = MockKernel::new();
    let mut editor = SketchEditor::open(&state, body, sketch_id).unwrap();

    let line = editor.add_element(SketchElement::Line {
        start: Point2D::new(0.0, 0.0),
        end: Point2D::new(1.0, 0.3),
    });
    editor
        .add_constraint(SketchConstraint::Horizontal { element: line })
        .unwrap();
    editor.solve(&mut kernel).unwrap();
    assert_eq!(
        editor.sketch().entry(line).unwrap().element,
        SketchElement::Line {
            start: Point2D::new(0.0, 0.0),
            end: Point2D::new(1.0, 0.0),
        }
    );
    assert!(editor.commit(&mut state).unwrap());

    let committed = match &state.feature(body, sketch_id).unwrap().operation {
        Operation::Sketch { sketch, .. } => sketch.clone(),
        _ => unreachable!(),
    };
    assert_eq!(committed.entries.len(), 2);
    assert!(state.undo());
    let restored = match &state.feature(body, sketch_id).unwrap().operation {
        Operation::Sketch { sketch, .. } => sketch.entries.len(),
        _ => unreachable!(),
    };
    assert_eq!(restored, 1);
}

#[test]
fn editor_undo_and_constraint_validation() {
    let (state, body, sketch_id) = sketch_scene();
    let mut editor = SketchEditor::open(&state, body, sketch_id).unwrap();
    assert!(matches!(
        editor.add_constraint(SketchConstraint::Vertical { element: 99 }),
        Err(EngineError::ElementNotFound { id: 99 })
    ));

    let id = editor.add_element(SketchElement::Circle {
        center: Point2D::new(0.0, 0.0),
        radius: 0.1,
    });
    editor.select(id, false).unwrap();
    assert!(editor.undo());
    assert!(editor.sketch().entry(id).is_none());
    assert!(editor.selection().is_empty());
    assert!(editor.redo());
    assert!(editor.sketch().entry(id).is_some());
}

#[test]
fn trim_splits_element_in_place() {
    let (state, body, sketch_id) = sketch_scene();
    let mut kernel = MockKernel::new();
    let mut editor = SketchEditor::open(&state, body, sketch_id).unwrap();
    let poly = editor.add_element(SketchElement::Polyline {
        points: vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(1.0, 1.0),
        ],
    });
    let line = editor.add_element(SketchElement::Line {
        start: Point2D::new(2.0, 0.0),
        end: Point2D::new(3.0, 0.0),
    });
    editor
        .add_constraint(SketchConstraint::Length {
            element: line,
            value: 2.0,
        })
        .unwrap();

    let kept = editor.trim(&mut kernel, poly, Point2D::new(1.0, 0.1)).unwrap();
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0], poly);
    assert_eq!(editor.sketch().next_element_id, kept[1] + 1);
    let ids: Vec<ElementId> = editor.sketch().entries.iter().map(|e| e.id).collect();
    assert_eq!(ids[1..], [poly, kept[1], line]);

    // The constraint on the element after the split still finds its line.
    editor.solve(&mut kernel).unwrap();
    assert_eq!(
        editor.sketch().entry(line).unwrap().element,
        SketchElement::Line {
            start: Point2D::new(2.0, 0.0),
            end: Point2D::new(4.0, 0.0),
        }
    );
}

#[test]
fn trim_can_remove_element() {
    let (state, body, sketch_id) = sketch_scene();
    let mut kernel = MockKernel::new();
    let mut editor = SketchEditor::open(&state, body, sketch_id).unwrap();
    let circle = editor.add_element(SketchElement::Circle {
        center: Point2D::new(0.0, 0.0),
        radius: 0.2,
    });
    editor
        .add_constraint(SketchConstraint::Radius {
            element: circle,
            value: 0.3,
        })
        .unwrap();
    editor.select(circle, false).unwrap();

    let kept = editor.trim(&mut kernel, circle, Point2D::new(0.2, 0.0)).unwrap();
    assert!(kept.is_empty());
    assert!(editor.sketch().entry(circle).is_none());
    assert_eq!(editor.sketch().entries.len(), 1);
    assert!(editor.sketch().constraints.is_empty());
    assert!(editor.selection().is_empty());

    assert!(editor.undo());
    assert!(editor.sketch().entry(circle).is_some());
    assert_eq!(editor.sketch().constraints.len(), 1);
}

#[test]
fn removing_element_drops_its_constraints() {
    let (state, body, sketch_id) = sketch_scene();
    let mut editor = SketchEditor::open(&state, body, sketch_id).unwrap();
    let line = editor.add_element(SketchElement::Line {
        start: Point2D::new(0.0, 0.0),
        end: Point2D::new(1.0, 0.0),
    });
    editor
        .add_constraint(SketchConstraint::Length {
            element: line,
            value: 2.0,
        })
        .unwrap();
    assert_eq!(editor.remove_elements(&[line]), 1);
    assert!(editor.sketch().constraints.is_empty());
}

#[test]
fn arc_through_collinear_points_is_rejected() {
    let (state, body, sketch_id) = sketch_scene();
    let mut kernel = MockKernel::new();
    let mut editor = SketchEditor::open(&state, body, sketch_id).unwrap();
    let err = editor
        .add_arc_through(
            &mut kernel,
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(2.0, 2.0),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::DegenerateArc));
    assert!(!editor.is_modified());
}

#[test]
fn snap_points_carry_entry_ids() {
    let (state, body, sketch_id) = sketch_scene();
    let mut kernel = MockKernel::new();
    let editor = SketchEditor::open(&state, body, sketch_id).unwrap();
    let rect_id = editor.sketch().entries[0].id;
    let snaps = editor.snap_points(
        &mut kernel,
        Point2D::new(0.0, 0.0),
        &kernel_bridge::SnapSettings::default(),
    );
    assert_eq!(snaps.len(), 1);
    assert_eq!(snaps[0].1, Some(rect_id));
}

#[test]
fn opening_editor_on_non_sketch_fails() {
    let mut state = SceneState::default();
    let body = state.create_body("A");
    let base = state.add_feature(body, cube()).unwrap();
    assert!(SketchEditor::open(&state, body, base).is_err());
}
