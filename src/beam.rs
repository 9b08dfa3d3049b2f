//! Two-node Euler-Bernoulli beam for planar frames.
//!
//! Local DOFs per element: `[u1, v1, θ1, u2, v2, θ2]` where `u` is the axial
//! and `v` the transverse translation in element axes. Matrices are returned
//! rotated into the global x/y frame.

use nalgebra::{matrix, SMatrix, SVector};

use crate::datatypes::{SectionProperties, Vertex};

pub type Matrix6 = SMatrix<f64, 6, 6>;
pub type Vector6 = SVector<f64, 6>;

/// Direction cosines and length of the element axis
///
/// # Returns
/// `(length, cos, sin)` of the vector from the first to the second vertex
pub fn element_axis(vertices: &[Vertex; 2]) -> (f64, f64, f64) {
    let dx = vertices[1].x - vertices[0].x;
    let dy = vertices[1].y - vertices[0].y;
    let length = f64::sqrt(dx * dx + dy * dy);

    (length, dx / length, dy / length)
}

/// Calculates the rotation from global to element axes
///
/// # Arguments
/// * `cos` - Cosine of the element angle
/// * `sin` - Sine of the element angle
///
/// # Returns
/// A 6x6 matrix `G` such that `local = G * global`
pub fn compute_transformation_matrix(cos: f64, sin: f64) -> Matrix6 {
    matrix![
        cos, sin, 0., 0., 0., 0.;
        -sin, cos, 0., 0., 0., 0.;
        0., 0., 1., 0., 0., 0.;
        0., 0., 0., cos, sin, 0.;
        0., 0., 0., -sin, cos, 0.;
        0., 0., 0., 0., 0., 1.;
    ]
}

/// Computes the element stiffness matrix in element axes
///
/// # Arguments
/// * `length` - The element length
/// * `properties` - Material and section data
///
/// # Returns
/// A 6x6 stiffness matrix
pub fn compute_local_stiffness_matrix(length: f64, properties: &SectionProperties) -> Matrix6 {
    let l = length;
    let ea = properties.youngs_modulus * properties.area / l;
    let ei = properties.youngs_modulus * properties.inertia;

    let k1 = 12.0 * ei / l.powi(3);
    let k2 = 6.0 * ei / l.powi(2);
    let k3 = 4.0 * ei / l;
    let k4 = 2.0 * ei / l;

    matrix![
        ea, 0., 0., -ea, 0., 0.;
        0., k1, k2, 0., -k1, k2;
        0., k2, k3, 0., -k2, k4;
        -ea, 0., 0., ea, 0., 0.;
        0., -k1, -k2, 0., k1, -k2;
        0., k2, k4, 0., -k2, k3;
    ]
}

/// Computes the consistent mass matrix in element axes
///
/// # Arguments
/// * `length` - The element length
/// * `properties` - Material and section data
///
/// # Returns
/// A 6x6 mass matrix
pub fn compute_local_mass_matrix(length: f64, properties: &SectionProperties) -> Matrix6 {
    let l = length;

    let mut mass_mat: Matrix6 = matrix![
        140., 0., 0., 70., 0., 0.;
        0., 156., 22. * l, 0., 54., -13. * l;
        0., 22. * l, 4. * l * l, 0., 13. * l, -3. * l * l;
        70., 0., 0., 140., 0., 0.;
        0., 54., 13. * l, 0., 156., -22. * l;
        0., -13. * l, -3. * l * l, 0., -22. * l, 4. * l * l;
    ];

    mass_mat *= properties.mass_per_length() * l / 420.0;

    mass_mat
}

/// Computes the global-oriented stiffness and mass matrices of an element
///
/// # Arguments
/// * `vertices` - Start and end point of the element
/// * `properties` - Material and section data
///
/// # Returns
/// The stiffness and mass matrices, in that order
pub fn compute_element_matrices(
    vertices: &[Vertex; 2],
    properties: &SectionProperties,
) -> (Matrix6, Matrix6) {
    let (length, cos, sin) = element_axis(vertices);
    let g = compute_transformation_matrix(cos, sin);

    let stiffness = g.transpose() * compute_local_stiffness_matrix(length, properties) * g;
    let mass = g.transpose() * compute_local_mass_matrix(length, properties) * g;

    (stiffness, mass)
}

/// Linear axial and cubic Hermite transverse shape functions at `xi` in [0, 1]
///
/// # Returns
/// `(axial, transverse)`, where `axial` weights `[u1, u2]` and `transverse`
/// weights `[v1, θ1, v2, θ2]`
pub fn shape_functions(xi: f64, length: f64) -> ([f64; 2], [f64; 4]) {
    let xi2 = xi * xi;
    let xi3 = xi2 * xi;

    (
        [1.0 - xi, xi],
        [
            1.0 - 3.0 * xi2 + 2.0 * xi3,
            length * (xi - 2.0 * xi2 + xi3),
            3.0 * xi2 - 2.0 * xi3,
            length * (xi3 - xi2),
        ],
    )
}
