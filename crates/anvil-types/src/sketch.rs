use serde::{Deserialize, Serialize};

/// Identifier of an entry within one sketch. Stable across edits of that
/// sketch, never reused.
pub type ElementId = u32;

/// Principal plane a sketch lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SketchPlane {
    #[serde(rename = "XY")]
    Xy,
    #[serde(rename = "XZ")]
    Xz,
    #[serde(rename = "YZ")]
    Yz,
}

impl SketchPlane {
    /// Unit normal of the plane (the positive extrusion direction).
    pub fn normal(self) -> [f64; 3] {
        match self {
            SketchPlane::Xy => [0.0, 0.0, 1.0],
            SketchPlane::Xz => [0.0, 1.0, 0.0],
            SketchPlane::Yz => [1.0, 0.0, 0.0],
        }
    }

    /// In-plane (u, v) axes, so that a sketch point (x, y) maps to
    /// `x * u + y * v + offset * normal`.
    pub fn axes(self) -> ([f64; 3], [f64; 3]) {
        match self {
            SketchPlane::Xy => ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            SketchPlane::Xz => ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            SketchPlane::Yz => ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        }
    }
}

/// Local frame of a sketch drawn on an arbitrary model face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceCoordSystem {
    pub origin: [f64; 3],
    pub normal: [f64; 3],
    pub u_axis: [f64; 3],
    pub v_axis: [f64; 3],
}

/// A point on the sketch plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn midpoint(&self, other: &Point2D) -> Point2D {
        Point2D::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// A typed 2D element of a sketch profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SketchElement {
    Line {
        start: Point2D,
        end: Point2D,
    },
    Circle {
        center: Point2D,
        radius: f64,
    },
    Arc {
        center: Point2D,
        radius: f64,
        /// Radians.
        start_angle: f64,
        /// Radians.
        end_angle: f64,
    },
    Rectangle {
        corner: Point2D,
        width: f64,
        height: f64,
    },
    Polyline {
        points: Vec<Point2D>,
    },
    Spline {
        points: Vec<Point2D>,
    },
}

impl SketchElement {
    /// Axis-aligned 2D bounds as (min, max).
    pub fn bounds(&self) -> Option<(Point2D, Point2D)> {
        match self {
            SketchElement::Line { start, end } => bounds_of([*start, *end].iter()),
            SketchElement::Circle { center, radius }
            | SketchElement::Arc { center, radius, .. } => Some((
                Point2D::new(center.x - radius, center.y - radius),
                Point2D::new(center.x + radius, center.y + radius),
            )),
            SketchElement::Rectangle {
                corner,
                width,
                height,
            } => {
                let far = Point2D::new(corner.x + width, corner.y + height);
                bounds_of([*corner, far].iter())
            }
            SketchElement::Polyline { points } | SketchElement::Spline { points } => {
                bounds_of(points.iter())
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SketchElement::Line { .. } => "Line",
            SketchElement::Circle { .. } => "Circle",
            SketchElement::Arc { .. } => "Arc",
            SketchElement::Rectangle { .. } => "Rectangle",
            SketchElement::Polyline { .. } => "Polyline",
            SketchElement::Spline { .. } => "Spline",
        }
    }
}

fn bounds_of<'a>(mut points: impl Iterator<Item = &'a Point2D>) -> Option<(Point2D, Point2D)> {
    let first = points.next()?;
    let (mut min, mut max) = (*first, *first);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Some((min, max))
}

/// One element of a sketch together with its identity and construction flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchEntry {
    pub id: ElementId,
    pub element: SketchElement,
    /// Construction geometry guides constraints but is not part of the profile.
    #[serde(default)]
    pub construction: bool,
}

/// A geometric constraint between sketch entries, referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SketchConstraint {
    Horizontal { element: ElementId },
    Vertical { element: ElementId },
    Fixed { element: ElementId },
    Length { element: ElementId, value: f64 },
    Radius { element: ElementId, value: f64 },
    Coincident { a: ElementId, b: ElementId },
    Parallel { a: ElementId, b: ElementId },
    Perpendicular { a: ElementId, b: ElementId },
    Equal { a: ElementId, b: ElementId },
    Tangent { a: ElementId, b: ElementId },
}

impl SketchConstraint {
    /// Entries this constraint refers to.
    pub fn references(&self) -> Vec<ElementId> {
        match *self {
            SketchConstraint::Horizontal { element }
            | SketchConstraint::Vertical { element }
            | SketchConstraint::Fixed { element }
            | SketchConstraint::Length { element, .. }
            | SketchConstraint::Radius { element, .. } => vec![element],
            SketchConstraint::Coincident { a, b }
            | SketchConstraint::Parallel { a, b }
            | SketchConstraint::Perpendicular { a, b }
            | SketchConstraint::Equal { a, b }
            | SketchConstraint::Tangent { a, b } => vec![a, b],
        }
    }
}

fn default_next_id() -> ElementId {
    1
}

/// A 2D profile: typed elements on a principal plane (at an offset) or on
/// an arbitrary face, with construction flags and constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sketch {
    pub plane: SketchPlane,
    #[serde(default)]
    pub offset: f64,
    /// Set when the sketch was placed on a model face; overrides `plane`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_coord_system: Option<FaceCoordSystem>,
    #[serde(default)]
    pub entries: Vec<SketchEntry>,
    #[serde(default)]
    pub constraints: Vec<SketchConstraint>,
    #[serde(default = "default_next_id")]
    pub next_element_id: ElementId,
}

impl Sketch {
    pub fn new(plane: SketchPlane, offset: f64) -> Self {
        Self {
            plane,
            offset,
            face_coord_system: None,
            entries: Vec::new(),
            constraints: Vec::new(),
            next_element_id: default_next_id(),
        }
    }

    /// A sketch lying on a model face.
    pub fn on_face(face: FaceCoordSystem) -> Self {
        Self {
            face_coord_system: Some(face),
            ..Self::new(SketchPlane::Xy, 0.0)
        }
    }

    /// Reserve a fresh entry id.
    pub fn alloc_id(&mut self) -> ElementId {
        let id = self.next_element_id;
        self.next_element_id += 1;
        id
    }

    /// Append an element and return its id.
    pub fn add_element(&mut self, element: SketchElement) -> ElementId {
        let id = self.alloc_id();
        self.entries.push(SketchEntry {
            id,
            element,
            construction: false,
        });
        id
    }

    pub fn entry(&self, id: ElementId) -> Option<&SketchEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entry_mut(&mut self, id: ElementId) -> Option<&mut SketchEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// All element geometry in entry order.
    pub fn elements(&self) -> Vec<SketchElement> {
        self.entries.iter().map(|e| e.element.clone()).collect()
    }

    /// Element geometry that forms the profile (construction entries excluded).
    pub fn profile_elements(&self) -> Vec<SketchElement> {
        self.entries
            .iter()
            .filter(|e| !e.construction)
            .map(|e| e.element.clone())
            .collect()
    }

    /// 2D bounds of the profile elements.
    pub fn profile_bounds(&self) -> Option<(Point2D, Point2D)> {
        self.entries
            .iter()
            .filter(|e| !e.construction)
            .filter_map(|e| e.element.bounds())
            .reduce(|(amin, amax), (bmin, bmax)| {
                (
                    Point2D::new(amin.x.min(bmin.x), amin.y.min(bmin.y)),
                    Point2D::new(amax.x.max(bmax.x), amax.y.max(bmax.y)),
                )
            })
    }

    /// Remove entries by id together with every constraint that refers to
    /// any of them. Returns how many entries were removed.
    pub fn remove_entries(&mut self, ids: &[ElementId]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !ids.contains(&e.id));
        self.constraints
            .retain(|c| c.references().iter().all(|r| !ids.contains(r)));
        before - self.entries.len()
    }
}
