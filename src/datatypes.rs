use serde::{Deserialize, Serialize};

use crate::{
    beam::{self, Matrix6},
    error::EditError,
    registry::Entity,
};

/// Local DOFs per node: x translation, y translation, rotation
pub const DOF: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub fn distance(&self, other: &Vertex) -> f64 {
        f64::sqrt(f64::powi(other.x - self.x, 2) + f64::powi(other.y - self.y, 2))
    }

    pub fn midpoint(&self, other: &Vertex) -> Vertex {
        Vertex {
            x: 0.5 * (self.x + other.x),
            y: 0.5 * (self.y + other.y),
        }
    }

    /// Whether both coordinates lie within `tol` of the other vertex
    pub fn coincides(&self, other: &Vertex, tol: f64) -> bool {
        (self.x - other.x).abs() <= tol && (self.y - other.y).abs() <= tol
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: usize,
    pub vertex: Vertex,
    /// Global DOFs `[ux, uy, rz]`, 1-based. `None` until DOFs are assigned.
    pub dofs: Option<[usize; DOF]>,
    pub hinge: bool,
    pub dangling: bool,
    /// For hinge duplicates, the node this one was split from
    pub origin: Option<usize>,
}

impl Node {
    pub fn new(id: usize, x: f64, y: f64) -> Node {
        Node {
            id,
            vertex: Vertex { x, y },
            dofs: None,
            hinge: false,
            dangling: false,
            origin: None,
        }
    }

    /// Builds the hinge duplicate of `original`: same position and
    /// translational DOFs, its own rotational DOF.
    pub fn hinge_of(original: &Node, id: usize, rotational_dof: usize) -> Result<Node, EditError> {
        let [ux, uy, _] = original.dofs.ok_or(EditError::MissingDofs(original.id))?;

        Ok(Node {
            id,
            vertex: original.vertex,
            dofs: Some([ux, uy, rotational_dof]),
            hinge: true,
            dangling: false,
            origin: Some(original.origin.unwrap_or(original.id)),
        })
    }

    /// The id this node stands for when comparing element connectivity
    pub fn resolved_id(&self) -> usize {
        self.origin.unwrap_or(self.id)
    }

    pub fn rotational_dof(&self) -> Option<usize> {
        self.dofs.map(|d| d[2])
    }
}

impl Entity for Node {
    fn id(&self) -> usize {
        self.id
    }
}

/// Material and cross-section data of a beam
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionProperties {
    /// Elastic modulus
    pub youngs_modulus: f64,
    /// Cross-section area
    pub area: f64,
    /// Second moment of area
    pub inertia: f64,
    /// Mass density
    pub density: f64,
}

impl SectionProperties {
    pub fn is_valid(&self) -> bool {
        [self.youngs_modulus, self.area, self.inertia, self.density]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }

    pub fn mass_per_length(&self) -> f64 {
        self.density * self.area
    }
}

/// Which element ends carry an internal moment release
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HingeEnds {
    pub at_a: bool,
    pub at_b: bool,
}

impl HingeEnds {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn at_a() -> Self {
        Self {
            at_a: true,
            at_b: false,
        }
    }

    pub fn at_b() -> Self {
        Self {
            at_a: false,
            at_b: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: usize,
    /// Endpoint node ids (hinge duplicates where a hinge was requested)
    pub nodes: [usize; 2],
    /// Endpoint ids as requested, used for duplicate-connection checks
    pub origins: [usize; 2],
    pub vertices: [Vertex; 2],
    /// Global DOFs of both endpoints, 1-based
    pub edof: [usize; 2 * DOF],
    pub properties: SectionProperties,
    pub stiffness: Matrix6,
    pub mass: Matrix6,
}

impl Element {
    /// Checks that an element could join `node_a` and `node_b` without
    /// building its matrices
    pub fn validate(node_a: &Node, node_b: &Node, properties: &SectionProperties) -> Result<(), EditError> {
        if node_a.dofs.is_none() {
            return Err(EditError::MissingDofs(node_a.id));
        }
        if node_b.dofs.is_none() {
            return Err(EditError::MissingDofs(node_b.id));
        }
        if !properties.is_valid() {
            return Err(EditError::InvalidProperties);
        }
        if node_a.vertex.distance(&node_b.vertex) <= f64::EPSILON {
            return Err(EditError::ZeroLength);
        }

        Ok(())
    }

    /// Creates an element between two nodes, computing its matrices
    ///
    /// # Arguments
    /// * `id` - The element id
    /// * `node_a` - The start node
    /// * `node_b` - The end node
    /// * `properties` - Material and section data
    pub fn new(
        id: usize,
        node_a: &Node,
        node_b: &Node,
        properties: SectionProperties,
    ) -> Result<Element, EditError> {
        Element::validate(node_a, node_b, &properties)?;
        let dofs_a = node_a.dofs.ok_or(EditError::MissingDofs(node_a.id))?;
        let dofs_b = node_b.dofs.ok_or(EditError::MissingDofs(node_b.id))?;

        let vertices = [node_a.vertex, node_b.vertex];
        let (stiffness, mass) = beam::compute_element_matrices(&vertices, &properties);

        let mut edof = [0; 2 * DOF];
        edof[..DOF].copy_from_slice(&dofs_a);
        edof[DOF..].copy_from_slice(&dofs_b);

        Ok(Element {
            id,
            nodes: [node_a.id, node_b.id],
            origins: [node_a.resolved_id(), node_b.resolved_id()],
            vertices,
            edof,
            properties,
            stiffness,
            mass,
        })
    }

    pub fn length(&self) -> f64 {
        self.vertices[0].distance(&self.vertices[1])
    }

    pub fn midpoint(&self) -> Vertex {
        self.vertices[0].midpoint(&self.vertices[1])
    }

    /// Whether this element joins the same unordered pair of nodes
    pub fn connects(&self, a: usize, b: usize) -> bool {
        let [p, q] = self.origins;
        (p == a && q == b) || (p == b && q == a)
    }

    pub fn references_node(&self, id: usize) -> bool {
        self.nodes.contains(&id)
    }
}

impl Entity for Element {
    fn id(&self) -> usize {
        self.id
    }
}

/// The six boundary-condition archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportKind {
    Fixed,
    Pinned,
    /// Slides along x
    RollerX,
    /// Slides along y
    RollerY,
    /// Slides along x, rotation locked
    GuidedX,
    /// Slides along y, rotation locked
    GuidedY,
}

impl SupportKind {
    pub const ALL: [SupportKind; 6] = [
        SupportKind::Fixed,
        SupportKind::Pinned,
        SupportKind::RollerX,
        SupportKind::RollerY,
        SupportKind::GuidedX,
        SupportKind::GuidedY,
    ];

    pub fn from_code(code: u8) -> Result<SupportKind, EditError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(EditError::InvalidSupportKind(code))
    }

    pub fn code(&self) -> u8 {
        match self {
            SupportKind::Fixed => 0,
            SupportKind::Pinned => 1,
            SupportKind::RollerX => 2,
            SupportKind::RollerY => 3,
            SupportKind::GuidedX => 4,
            SupportKind::GuidedY => 5,
        }
    }

    /// Local DOFs held at zero: 0 = x, 1 = y, 2 = rotation
    pub fn locked_dofs(&self) -> &'static [usize] {
        match self {
            SupportKind::Fixed => &[0, 1, 2],
            SupportKind::Pinned => &[0, 1],
            SupportKind::RollerX => &[1],
            SupportKind::RollerY => &[0],
            SupportKind::GuidedX => &[1, 2],
            SupportKind::GuidedY => &[0, 2],
        }
    }

    /// Drawing orientation in degrees: the direction of the restraining
    /// surface normal, pointing into the structure.
    pub fn orientation_deg(&self) -> f64 {
        match self {
            SupportKind::RollerY | SupportKind::GuidedY => 0.0,
            _ => 90.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Support {
    pub node: usize,
    pub kind: SupportKind,
}

impl Support {
    pub fn locked_dofs(&self) -> &'static [usize] {
        self.kind.locked_dofs()
    }
}

/// A support is identified by the node it sits on
impl Entity for Support {
    fn id(&self) -> usize {
        self.node
    }
}

/// Tunables of a modeling session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Two nodes closer than this on both axes are the same point
    pub coordinate_tolerance: f64,
    /// Samples per element along a mode shape curve
    pub shape_points: usize,
    /// Largest drawn displacement as a fraction of the model extent
    pub shape_fraction: f64,
    /// Relative size below which a negative eigenvalue counts as round-off
    pub eigenvalue_tolerance: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            coordinate_tolerance: 1e-6,
            shape_points: 21,
            shape_fraction: 0.1,
            eigenvalue_tolerance: 1e-9,
        }
    }
}
