//! Well-posedness checks run before a model may be solved.

use std::collections::BTreeSet;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{
    assembly::{self, reduce_matrix},
    elements::ElementSet,
    nodes::NodeSet,
    supports::SupportSet,
};

/// Outcome of a model check. Checks run in declaration order and the first
/// failing one is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelStatus {
    NoNodes,
    NoElements,
    /// Some node is not connected to any element
    DanglingNodes,
    NoSupports,
    /// No free DOFs remain, or the constrained stiffness is rank deficient
    Singular,
    Ready,
}

impl ModelStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelStatus::Ready)
    }
}

/// Runs every check against the current model
///
/// # Arguments
/// * `nodes` - The node set
/// * `elements` - The element set
/// * `supports` - The support set
pub fn check_model(nodes: &NodeSet, elements: &ElementSet, supports: &SupportSet) -> ModelStatus {
    if nodes.is_empty() {
        return ModelStatus::NoNodes;
    }
    if elements.is_empty() {
        return ModelStatus::NoElements;
    }
    if !check_dangling_nodes(nodes, elements) {
        return ModelStatus::DanglingNodes;
    }
    if supports.is_empty() {
        return ModelStatus::NoSupports;
    }
    if !check_stiffness_singularity(nodes, elements, supports) {
        return ModelStatus::Singular;
    }

    ModelStatus::Ready
}

/// Whether node DOFs and element DOFs cover exactly the same set
pub fn check_dangling_nodes(nodes: &NodeSet, elements: &ElementSet) -> bool {
    if nodes.iter().any(|n| n.dofs.is_none()) {
        return false;
    }

    nodes.assigned_dofs() == elements.referenced_dofs()
}

/// The element DOFs not locked by any support, ascending
pub fn free_dofs(elements: &ElementSet, constraints: &[usize]) -> Vec<usize> {
    let constrained: BTreeSet<usize> = constraints.iter().copied().collect();

    elements
        .referenced_dofs()
        .into_iter()
        .filter(|d| !constrained.contains(d))
        .collect()
}

/// Whether the free-DOF block of the stiffness matrix is invertible
///
/// Uses the current assembly when one exists, otherwise assembles the
/// stiffness from the elements without storing it.
pub fn check_stiffness_singularity(
    nodes: &NodeSet,
    elements: &ElementSet,
    supports: &SupportSet,
) -> bool {
    let constraints = supports.gather_constraints(nodes);
    let free = free_dofs(elements, &constraints);
    if free.is_empty() {
        return false;
    }

    let k_free = match elements.assembly() {
        Some(assembly) => reduce_matrix(&assembly.stiffness, &free),
        None => {
            let element_slice = elements.as_slice();
            let num_dofs = assembly::count_dofs(element_slice);
            let stiffness = assembly::build_total_matrix(element_slice, num_dofs, |e| &e.stiffness);
            reduce_matrix(&stiffness, &free)
        }
    };

    numerical_rank(&k_free) == free.len()
}

/// Rank of a matrix from its singular values, with the cutoff
/// `σ_max · max(rows, cols) · ε`
pub fn numerical_rank(matrix: &DMatrix<f64>) -> usize {
    if matrix.is_empty() {
        return 0;
    }

    let singular_values = matrix.clone().svd(false, false).singular_values;
    let sigma_max = singular_values.iter().copied().fold(0.0, f64::max);
    let tol = sigma_max * matrix.nrows().max(matrix.ncols()) as f64 * f64::EPSILON;

    singular_values.iter().filter(|s| **s > tol).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{HingeEnds, SectionProperties};

    const TOL: f64 = 1e-6;

    fn props() -> SectionProperties {
        SectionProperties {
            youngs_modulus: 3e10,
            area: 1.03e-3,
            inertia: 1.71e-6,
            density: 2500.0,
        }
    }

    fn cantilever() -> (NodeSet, ElementSet, SupportSet) {
        let mut nodes = NodeSet::new();
        for (id, x) in [(1, 0.0), (2, 1.0)] {
            let node = nodes.create_node(x, 0.0, id, TOL).unwrap();
            nodes.add(node);
        }
        nodes.assign_dofs();

        let mut elements = ElementSet::new();
        elements
            .create_element(&mut nodes, 1, 1, 2, props(), HingeEnds::none())
            .unwrap();

        (nodes, elements, SupportSet::new())
    }

    #[test]
    fn reports_checks_in_order() {
        let empty = (NodeSet::new(), ElementSet::new(), SupportSet::new());
        assert_eq!(check_model(&empty.0, &empty.1, &empty.2), ModelStatus::NoNodes);

        let (nodes, elements, mut supports) = cantilever();
        assert_eq!(
            check_model(&nodes, &ElementSet::new(), &supports),
            ModelStatus::NoElements
        );
        assert_eq!(check_model(&nodes, &elements, &supports), ModelStatus::NoSupports);

        supports.create_support(&nodes, 1, 0).unwrap();
        assert_eq!(check_model(&nodes, &elements, &supports), ModelStatus::Ready);
    }

    #[test]
    fn unconnected_node_is_dangling() {
        let (mut nodes, elements, mut supports) = cantilever();
        let loose = nodes.create_node(5.0, 5.0, 3, TOL).unwrap();
        nodes.add(loose);
        supports.create_support(&nodes, 1, 0).unwrap();

        assert_eq!(check_model(&nodes, &elements, &supports), ModelStatus::DanglingNodes);
    }

    #[test]
    fn pinned_cantilever_is_singular() {
        let (nodes, elements, mut supports) = cantilever();
        supports.create_support(&nodes, 1, 1).unwrap();

        assert_eq!(check_model(&nodes, &elements, &supports), ModelStatus::Singular);
    }

    #[test]
    fn fully_constrained_model_is_singular() {
        let (nodes, elements, mut supports) = cantilever();
        supports.create_support(&nodes, 1, 0).unwrap();
        supports.create_support(&nodes, 2, 0).unwrap();

        assert!(free_dofs(&elements, &supports.gather_constraints(&nodes)).is_empty());
        assert_eq!(check_model(&nodes, &elements, &supports), ModelStatus::Singular);
    }

    #[test]
    fn rank_of_known_matrices() {
        assert_eq!(numerical_rank(&DMatrix::identity(3, 3)), 3);
        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert_eq!(numerical_rank(&singular), 1);
        assert_eq!(numerical_rank(&DMatrix::zeros(0, 0)), 0);
    }
}
