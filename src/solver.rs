//! Free-vibration eigensolver for an assembled frame.
//!
//! Solves the generalized problem `K φ = λ M φ` on the DOFs that are neither
//! constrained by supports nor dangling, where `λ = ω²`. The mass block is
//! factored as `M = L Lᵀ` to reach the standard symmetric problem
//! `L⁻¹ K L⁻ᵀ ψ = λ ψ`, and `φ = L⁻ᵀ ψ` is mass-normalized.

use std::collections::BTreeSet;

use nalgebra::{linalg::SymmetricEigen, DMatrix, DVector};

use crate::{
    assembly::{reduce_matrix, GlobalAssembly},
    error::EigenframeError,
};

/// Eigenpairs of a solved model
#[derive(Debug, Clone, PartialEq)]
pub struct EigenSolution {
    /// Squared angular frequencies, ascending
    pub eigenvalues: Vec<f64>,
    /// One column per eigenvalue, one row per global DOF
    pub eigenvectors: DMatrix<f64>,
}

impl EigenSolution {
    pub fn num_modes(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Angular frequency in rad/s for each mode
    pub fn angular_frequencies(&self) -> Vec<f64> {
        self.eigenvalues.iter().map(|lambda| lambda.sqrt()).collect()
    }

    /// Natural frequency in Hz for each mode
    pub fn frequencies_hz(&self) -> Vec<f64> {
        self.eigenvalues
            .iter()
            .map(|lambda| lambda.sqrt() / (2.0 * std::f64::consts::PI))
            .collect()
    }

    pub fn mode_shape(&self, mode: usize) -> Option<DVector<f64>> {
        if mode >= self.num_modes() {
            return None;
        }
        Some(self.eigenvectors.column(mode).into_owned())
    }
}

/// Solves the modal problem of an assembled model
///
/// Dangling DOFs are removed from the system first and come back as zero
/// rows in the eigenvectors, so rows always line up with global DOFs.
///
/// # Arguments
/// * `assembly` - The assembled stiffness and mass
/// * `constraints` - Constrained 1-based DOFs from supports
/// * `tol` - Relative tolerance for negative round-off eigenvalues
pub fn run(
    assembly: &GlobalAssembly,
    constraints: &[usize],
    tol: f64,
) -> Result<EigenSolution, EigenframeError> {
    if assembly.dangling_dofs.is_empty() {
        return eigen(&assembly.stiffness, &assembly.mass, constraints, tol);
    }

    let kept: Vec<usize> = (1..=assembly.num_dofs)
        .filter(|d| assembly.dangling_dofs.binary_search(d).is_err())
        .collect();
    log::debug!(
        "eliding {} dangling dofs: {:?}",
        assembly.dangling_dofs.len(),
        assembly.dangling_dofs
    );

    let k = reduce_matrix(&assembly.stiffness, &kept);
    let m = reduce_matrix(&assembly.mass, &kept);
    let shifted = shift_constraints(constraints, &assembly.dangling_dofs);

    let reduced = eigen(&k, &m, &shifted, tol)?;

    Ok(EigenSolution {
        eigenvectors: expand_mode_shapes(&reduced.eigenvectors, &kept, assembly.num_dofs),
        eigenvalues: reduced.eigenvalues,
    })
}

/// Renumbers constraint DOFs after removing `removed` DOFs
///
/// Each constraint moves down by the number of removed DOFs below it.
/// Constraints on removed DOFs are dropped.
pub fn shift_constraints(constraints: &[usize], removed: &[usize]) -> Vec<usize> {
    let removed: BTreeSet<usize> = removed.iter().copied().collect();

    constraints
        .iter()
        .filter(|c| !removed.contains(c))
        .map(|&c| c - removed.range(..c).count())
        .collect()
}

/// Solves `K φ = λ M φ` with the given DOFs held at zero
///
/// # Arguments
/// * `k` - Stiffness matrix
/// * `m` - Mass matrix
/// * `constraints` - Constrained 1-based DOFs
/// * `tol` - Relative tolerance for negative round-off eigenvalues
///
/// # Returns
/// Eigenvalues ascending with full-length eigenvectors, zero at constrained
/// DOFs
pub fn eigen(
    k: &DMatrix<f64>,
    m: &DMatrix<f64>,
    constraints: &[usize],
    tol: f64,
) -> Result<EigenSolution, EigenframeError> {
    let num_dofs = k.nrows();
    if k.shape() != (num_dofs, num_dofs) || m.shape() != k.shape() {
        return Err(EigenframeError::Solver(
            "stiffness and mass must be square and of equal size".to_owned(),
        ));
    }

    let constrained: BTreeSet<usize> = constraints.iter().copied().collect();
    let free: Vec<usize> = (1..=num_dofs).filter(|d| !constrained.contains(d)).collect();
    if free.is_empty() {
        return Err(EigenframeError::Solver("no free dofs to solve for".to_owned()));
    }

    let k_free = reduce_matrix(k, &free);
    let m_free = reduce_matrix(m, &free);

    let (eigenvalues, vectors) = solve_generalized(&k_free, &m_free, tol)?;

    Ok(EigenSolution {
        eigenvalues,
        eigenvectors: expand_mode_shapes(&vectors, &free, num_dofs),
    })
}

/// Solves the generalized symmetric problem on already reduced matrices
fn solve_generalized(
    k: &DMatrix<f64>,
    m: &DMatrix<f64>,
    tol: f64,
) -> Result<(Vec<f64>, DMatrix<f64>), EigenframeError> {
    let n = k.nrows();

    let chol_m = m.clone().cholesky().ok_or_else(|| {
        EigenframeError::Solver("mass matrix is not positive definite".to_owned())
    })?;
    let l_inv = chol_m
        .l()
        .try_inverse()
        .ok_or_else(|| EigenframeError::Solver("failed to invert mass factor".to_owned()))?;

    let k_star = &l_inv * k * l_inv.transpose();
    let k_star = (&k_star + k_star.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(k_star);

    let mut pairs: Vec<(f64, DVector<f64>)> = eigen
        .eigenvalues
        .iter()
        .copied()
        .zip(eigen.eigenvectors.column_iter().map(|c| c.into_owned()))
        .collect();

    if pairs.iter().any(|(lambda, psi)| {
        !lambda.is_finite() || psi.iter().any(|v| !v.is_finite())
    }) {
        return Err(EigenframeError::Solver(
            "eigensolution contains non-finite values".to_owned(),
        ));
    }

    let scale = pairs.iter().map(|(lambda, _)| lambda.abs()).fold(0.0, f64::max);
    if let Some((lambda, _)) = pairs.iter().find(|(lambda, _)| *lambda < -tol * scale) {
        return Err(EigenframeError::Solver(format!(
            "negative eigenvalue {lambda:e}; the system is not positive definite"
        )));
    }

    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let l_inv_t = l_inv.transpose();
    let mut eigenvectors = DMatrix::zeros(n, n);
    let eigenvalues: Vec<f64> = pairs
        .iter()
        .enumerate()
        .map(|(i, (lambda, psi))| {
            eigenvectors.set_column(i, &(&l_inv_t * psi));
            lambda.max(0.0)
        })
        .collect();

    Ok((eigenvalues, eigenvectors))
}

/// Spreads reduced mode shapes back over the full DOF range
///
/// # Arguments
/// * `reduced` - Mode shapes over `dofs`, one column per mode
/// * `dofs` - The 1-based global DOF of each reduced row
/// * `num_dofs` - The full DOF count
///
/// # Returns
/// A `num_dofs` by `modes` matrix, zero on rows not listed in `dofs`
pub fn expand_mode_shapes(reduced: &DMatrix<f64>, dofs: &[usize], num_dofs: usize) -> DMatrix<f64> {
    let mut full_shapes = DMatrix::zeros(num_dofs, reduced.ncols());

    for (reduced_row, &dof) in dofs.iter().enumerate() {
        full_shapes
            .row_mut(dof - 1)
            .copy_from(&reduced.row(reduced_row));
    }

    full_shapes
}
