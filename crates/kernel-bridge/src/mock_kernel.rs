//! MockKernel: deterministic test double implementing both kernel traits.
//!
//! Solids are bounding-box approximations (see [`crate::primitives`]) and
//! the 2D side applies a small, predictable subset of constraints. Every
//! call is counted, and any call kind can be told to start failing so the
//! engine's error paths can be driven from tests.

use std::collections::HashMap;
use std::f64::consts::PI;

use anvil_types::{
    BooleanOp, EdgeDescriptor, ElementId, Mesh, Point2D, Primitive, Sketch, SketchConstraint,
    SketchElement, Transform,
};

use crate::primitives::{primitive_mesh, profile_prism, PlaneFrame};
use crate::traits::{GeometryKernel, SketchKernel};
use crate::types::*;

/// Deterministic test double for the geometry kernel.
#[derive(Debug, Default)]
pub struct MockKernel {
    calls: HashMap<KernelCall, usize>,
    /// Remaining successes before a call kind starts failing.
    failures: HashMap<KernelCall, usize>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times a call kind has been made.
    pub fn calls(&self, call: KernelCall) -> usize {
        self.calls.get(&call).copied().unwrap_or(0)
    }

    /// Calls of every kind that produce solids.
    pub fn solid_calls(&self) -> usize {
        [
            KernelCall::Primitive,
            KernelCall::Extrude,
            KernelCall::Revolve,
            KernelCall::Boolean,
            KernelCall::Fillet,
            KernelCall::Chamfer,
        ]
        .iter()
        .map(|c| self.calls(*c))
        .sum()
    }

    pub fn reset_calls(&mut self) {
        self.calls.clear();
    }

    /// Let `successes` more calls of this kind through, then fail every
    /// following one until [`MockKernel::clear_failures`].
    pub fn fail_after(&mut self, call: KernelCall, successes: usize) {
        self.failures.insert(call, successes);
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    fn record(&mut self, call: KernelCall) -> Result<(), KernelError> {
        *self.calls.entry(call).or_insert(0) += 1;
        match self.failures.get_mut(&call) {
            Some(0) => Err(KernelError::Other {
                message: format!("injected {call:?} failure"),
            }),
            Some(remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

fn profile_bounds(elements: &[SketchElement]) -> Result<(Point2D, Point2D), KernelError> {
    elements
        .iter()
        .filter_map(SketchElement::bounds)
        .reduce(|(amin, amax), (bmin, bmax)| {
            (
                Point2D::new(amin.x.min(bmin.x), amin.y.min(bmin.y)),
                Point2D::new(amax.x.max(bmax.x), amax.y.max(bmax.y)),
            )
        })
        .ok_or_else(|| KernelError::ProfileFailed {
            reason: "profile has no elements".into(),
        })
}

fn require_solid(mesh: &Mesh, which: &str) -> Result<(), KernelError> {
    if mesh.is_empty() {
        return Err(KernelError::BooleanFailed {
            reason: format!("{which} operand is empty"),
        });
    }
    Ok(())
}

impl GeometryKernel for MockKernel {
    fn generate_primitive(
        &mut self,
        primitive: &Primitive,
        transform: &Transform,
    ) -> Result<Mesh, KernelError> {
        self.record(KernelCall::Primitive)?;
        if primitive.extents().iter().any(|e| *e <= 0.0) {
            return Err(KernelError::Other {
                message: format!("{} has a non-positive dimension", primitive.label()),
            });
        }
        Ok(primitive_mesh(primitive, transform))
    }

    fn generate_extrude(&mut self, request: &ExtrudeRequest) -> Result<Mesh, KernelError> {
        self.record(KernelCall::Extrude)?;
        let (min, max) = profile_bounds(&request.elements)?;
        if request.height + request.height_backward <= 0.0 {
            return Err(KernelError::ProfileFailed {
                reason: "extrude distance must be positive".into(),
            });
        }
        let frame = PlaneFrame::new(
            request.plane,
            request.plane_offset,
            request.face_coord_system.as_ref(),
            &request.transform,
        );
        Ok(profile_prism(
            &frame,
            min,
            max,
            request.height_backward,
            request.height,
        ))
    }

    fn generate_revolve(&mut self, request: &RevolveRequest) -> Result<Mesh, KernelError> {
        self.record(KernelCall::Revolve)?;
        let (min, max) = profile_bounds(&request.elements)?;
        if request.angle <= 0.0 {
            return Err(KernelError::ProfileFailed {
                reason: "revolve angle must be positive".into(),
            });
        }
        // Swept envelope about the sketch's vertical axis.
        let r = min.x.abs().max(max.x.abs());
        let frame = PlaneFrame::new(
            request.plane,
            request.plane_offset,
            request.face_coord_system.as_ref(),
            &request.transform,
        );
        let backward = if request.angle >= 180.0 { r } else { 0.0 };
        Ok(profile_prism(
            &frame,
            Point2D::new(-r, min.y),
            Point2D::new(r, max.y),
            backward,
            r,
        ))
    }

    fn boolean(&mut self, a: &Mesh, b: &Mesh, op: BooleanOp) -> Result<Mesh, KernelError> {
        self.record(KernelCall::Boolean)?;
        require_solid(a, "left")?;
        require_solid(b, "right")?;
        match op {
            BooleanOp::Union => Ok(a.merged(b)),
            BooleanOp::Difference => Ok(a.merged(&b.inverted())),
            BooleanOp::Intersection => {
                let (amin, amax) = a.bounds().unwrap_or_default();
                let (bmin, bmax) = b.bounds().unwrap_or_default();
                let mut min = [0.0f32; 3];
                let mut max = [0.0f32; 3];
                for axis in 0..3 {
                    min[axis] = amin[axis].max(bmin[axis]);
                    max[axis] = amax[axis].min(bmax[axis]);
                    if min[axis] >= max[axis] {
                        return Err(KernelError::BooleanFailed {
                            reason: "operands do not overlap".into(),
                        });
                    }
                }
                Ok(Mesh::cuboid(min, max))
            }
        }
    }

    fn fillet_edges(
        &mut self,
        mesh: &Mesh,
        edges: &[EdgeDescriptor],
        radius: f64,
        _segments: u32,
    ) -> Result<Mesh, KernelError> {
        self.record(KernelCall::Fillet)?;
        if edges.is_empty() || radius <= 0.0 {
            return Err(KernelError::FilletFailed {
                reason: format!("{} edges, radius {radius}", edges.len()),
            });
        }
        Ok(mesh.clone())
    }

    fn chamfer_edges(
        &mut self,
        mesh: &Mesh,
        edges: &[EdgeDescriptor],
        distance: f64,
    ) -> Result<Mesh, KernelError> {
        self.record(KernelCall::Chamfer)?;
        if edges.is_empty() || distance <= 0.0 {
            return Err(KernelError::FilletFailed {
                reason: format!("chamfer of {} edges, distance {distance}", edges.len()),
            });
        }
        Ok(mesh.clone())
    }
}

fn apply_constraint(
    elements: &mut [SketchElement],
    index: usize,
    constraint: &SketchConstraint,
) {
    let element = &mut elements[index];
    match (constraint, element) {
        (SketchConstraint::Horizontal { .. }, SketchElement::Line { start, end }) => {
            end.y = start.y;
        }
        (SketchConstraint::Vertical { .. }, SketchElement::Line { start, end }) => {
            end.x = start.x;
        }
        (SketchConstraint::Length { value, .. }, SketchElement::Line { start, end }) => {
            let len = start.distance(end);
            if len > 1e-12 {
                let k = value / len;
                end.x = start.x + (end.x - start.x) * k;
                end.y = start.y + (end.y - start.y) * k;
            }
        }
        (
            SketchConstraint::Radius { value, .. },
            SketchElement::Circle { radius, .. } | SketchElement::Arc { radius, .. },
        ) => {
            *radius = *value;
        }
        _ => {}
    }
}

fn trim_at(element: &SketchElement, point: Point2D) -> Result<TrimResult, KernelError> {
    match element {
        SketchElement::Line { start, end } => {
            // Drop the half of the line the point falls in.
            let mid = start.midpoint(end);
            let kept = if point.distance(start) <= point.distance(end) {
                SketchElement::Line {
                    start: mid,
                    end: *end,
                }
            } else {
                SketchElement::Line {
                    start: *start,
                    end: mid,
                }
            };
            Ok(TrimResult::Replaced(vec![kept]))
        }
        SketchElement::Polyline { points } if points.len() >= 3 => {
            // Split at the interior vertex nearest the point.
            let split = (1..points.len() - 1)
                .min_by(|a, b| {
                    point
                        .distance(&points[*a])
                        .total_cmp(&point.distance(&points[*b]))
                })
                .unwrap_or(1);
            Ok(TrimResult::Replaced(vec![
                SketchElement::Polyline {
                    points: points[..=split].to_vec(),
                },
                SketchElement::Polyline {
                    points: points[split..].to_vec(),
                },
            ]))
        }
        // A single segment or a full circle has nothing to split at.
        SketchElement::Polyline { points } if points.len() == 2 => Ok(TrimResult::Removed),
        SketchElement::Circle { .. } => Ok(TrimResult::Removed),
        SketchElement::Polyline { .. } => Ok(TrimResult::NoChange),
        other => Err(KernelError::NotSupported {
            operation: format!("trim {}", other.label()),
        }),
    }
}

fn snap_candidates(element: &SketchElement, settings: &SnapSettings) -> Vec<(Point2D, SnapType)> {
    let mut out = Vec::new();
    let endpoint = |p: Point2D, out: &mut Vec<_>| {
        if settings.endpoints {
            out.push((p, SnapType::Endpoint));
        }
    };
    match element {
        SketchElement::Line { start, end } => {
            endpoint(*start, &mut out);
            endpoint(*end, &mut out);
            if settings.midpoints {
                out.push((start.midpoint(end), SnapType::Midpoint));
            }
        }
        SketchElement::Circle { center, .. } => {
            if settings.centers {
                out.push((*center, SnapType::Center));
            }
        }
        SketchElement::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        } => {
            for angle in [start_angle, end_angle] {
                let p = Point2D::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                );
                endpoint(p, &mut out);
            }
            if settings.centers {
                out.push((*center, SnapType::Center));
            }
        }
        SketchElement::Rectangle {
            corner,
            width,
            height,
        } => {
            for (dx, dy) in [(0.0, 0.0), (*width, 0.0), (*width, *height), (0.0, *height)] {
                endpoint(Point2D::new(corner.x + dx, corner.y + dy), &mut out);
            }
            if settings.centers {
                out.push((
                    Point2D::new(corner.x + width / 2.0, corner.y + height / 2.0),
                    SnapType::Center,
                ));
            }
        }
        SketchElement::Polyline { points } | SketchElement::Spline { points } => {
            for p in points {
                endpoint(*p, &mut out);
            }
        }
    }
    out
}

impl SketchKernel for MockKernel {
    fn solve_constraints(&mut self, sketch: &Sketch) -> Result<Vec<SketchElement>, KernelError> {
        self.record(KernelCall::Solve)?;
        let index: HashMap<ElementId, usize> = sketch
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
        let mut elements = sketch.elements();
        for constraint in &sketch.constraints {
            let mut targets = Vec::new();
            for id in constraint.references() {
                let i = index.get(&id).ok_or_else(|| KernelError::SolveFailed {
                    reason: format!("constraint refers to missing element {id}"),
                })?;
                targets.push(*i);
            }
            if let [target] = targets[..] {
                apply_constraint(&mut elements, target, constraint);
            }
        }
        Ok(elements)
    }

    fn trim_element(
        &mut self,
        sketch: &Sketch,
        element_index: usize,
        point: Point2D,
    ) -> Result<TrimResult, KernelError> {
        self.record(KernelCall::Trim)?;
        let target = sketch
            .entries
            .get(element_index)
            .ok_or_else(|| KernelError::Other {
                message: format!("no element at position {element_index}"),
            })?;
        trim_at(&target.element, point)
    }

    fn query_snap_points(
        &mut self,
        sketch: &Sketch,
        cursor: Point2D,
        settings: &SnapSettings,
    ) -> Vec<SnapPoint> {
        let _ = self.record(KernelCall::Snap);
        let mut found: Vec<SnapPoint> = sketch
            .entries
            .iter()
            .enumerate()
            .flat_map(|(i, entry)| {
                snap_candidates(&entry.element, settings)
                    .into_iter()
                    .map(move |(point, snap_type)| SnapPoint {
                        point,
                        snap_type,
                        source_element: Some(i),
                    })
            })
            .filter(|s| s.point.distance(&cursor) <= settings.radius)
            .collect();
        found.sort_by(|a, b| {
            a.point
                .distance(&cursor)
                .total_cmp(&b.point.distance(&cursor))
        });
        found
    }

    fn fit_arc_through_three_points(&mut self, p1: Point2D, p2: Point2D, p3: Point2D) -> ArcFit {
        let _ = self.record(KernelCall::FitArc);
        let d = 2.0 * (p1.x * (p2.y - p3.y) + p2.x * (p3.y - p1.y) + p3.x * (p1.y - p2.y));
        if d.abs() < 1e-12 {
            return ArcFit {
                valid: false,
                center: p2,
                radius: 0.0,
                start_angle: 0.0,
                end_angle: 0.0,
            };
        }
        let s1 = p1.x * p1.x + p1.y * p1.y;
        let s2 = p2.x * p2.x + p2.y * p2.y;
        let s3 = p3.x * p3.x + p3.y * p3.y;
        let center = Point2D::new(
            (s1 * (p2.y - p3.y) + s2 * (p3.y - p1.y) + s3 * (p1.y - p2.y)) / d,
            (s1 * (p3.x - p2.x) + s2 * (p1.x - p3.x) + s3 * (p2.x - p1.x)) / d,
        );
        let angle = |p: Point2D| (p.y - center.y).atan2(p.x - center.x).rem_euclid(2.0 * PI);
        ArcFit {
            valid: true,
            center,
            radius: center.distance(&p1),
            start_angle: angle(p1),
            end_angle: angle(p3),
        }
    }
}
