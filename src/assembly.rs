use std::collections::BTreeSet;

use nalgebra::DMatrix;

use crate::{beam::Matrix6, datatypes::Element};

/// Global stiffness and mass of a model
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalAssembly {
    pub stiffness: DMatrix<f64>,
    pub mass: DMatrix<f64>,
    /// Highest DOF referenced by any element; matrices are `num_dofs` square
    pub num_dofs: usize,
    /// DOFs in `1..=num_dofs` that no element references, ascending
    pub dangling_dofs: Vec<usize>,
}

impl GlobalAssembly {
    /// Runs direct stiffness assembly over all elements
    ///
    /// # Arguments
    /// * `elements` - The elements of the model
    pub fn assemble(elements: &[Element]) -> GlobalAssembly {
        let num_dofs = count_dofs(elements);
        let referenced = referenced_dofs(elements);

        let dangling_dofs: Vec<usize> = (1..=num_dofs).filter(|d| !referenced.contains(d)).collect();

        GlobalAssembly {
            stiffness: build_total_matrix(elements, num_dofs, |e| &e.stiffness),
            mass: build_total_matrix(elements, num_dofs, |e| &e.mass),
            num_dofs,
            dangling_dofs,
        }
    }
}

/// The largest DOF index referenced by any element
pub fn count_dofs(elements: &[Element]) -> usize {
    elements
        .iter()
        .flat_map(|e| e.edof.iter().copied())
        .max()
        .unwrap_or(0)
}

/// The set of DOFs referenced by at least one element
pub fn referenced_dofs(elements: &[Element]) -> BTreeSet<usize> {
    elements
        .iter()
        .flat_map(|e| e.edof.iter().copied())
        .collect()
}

/// Compiles element matrices into a total matrix
///
/// # Arguments
/// * `elements` - The elements of the model
/// * `num_dofs` - Size of the global matrix
/// * `select` - Picks the element matrix to scatter (stiffness or mass)
///
/// # Returns
/// A `num_dofs` square matrix where shared DOFs accumulate contributions
pub fn build_total_matrix<F>(elements: &[Element], num_dofs: usize, select: F) -> DMatrix<f64>
where
    F: Fn(&Element) -> &Matrix6,
{
    let mut total_matrix: DMatrix<f64> = DMatrix::zeros(num_dofs, num_dofs);

    for element in elements {
        let element_matrix = select(element);

        for (local_row, global_row) in element.edof.iter().enumerate() {
            for (local_col, global_col) in element.edof.iter().enumerate() {
                total_matrix[(global_row - 1, global_col - 1)] +=
                    element_matrix[(local_row, local_col)];
            }
        }
    }

    total_matrix
}

/// Extracts the sub-matrix on the given 1-based DOFs
///
/// `reduced[i, j] = matrix[dofs[i] - 1, dofs[j] - 1]`
pub fn reduce_matrix(matrix: &DMatrix<f64>, dofs: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(dofs.len(), dofs.len(), |i, j| {
        matrix[(dofs[i] - 1, dofs[j] - 1)]
    })
}
