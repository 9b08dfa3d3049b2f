use std::io::Write;

use indicatif::ProgressBar;
use nalgebra::DMatrix;

use crate::{
    beam::{self, Vector6},
    datatypes::{Element, ModelSettings, Vertex},
    error::EigenframeError,
    solver::EigenSolution,
};

/// Deflected centerline of one element for one mode
#[derive(Debug, Clone, PartialEq)]
pub struct ElementCurve {
    pub element: usize,
    pub points: Vec<Vertex>,
}

/// Renderable mode shapes derived from an eigensolution
#[derive(Debug, Clone, PartialEq)]
pub struct ModeShapes {
    /// Unscaled end displacements, indexed `[element][mode]`
    pub local_displacements: Vec<Vec<Vector6>>,
    /// Scaled curves, indexed `[mode][element]`
    pub curves: Vec<Vec<ElementCurve>>,
    /// Scale mapping the largest displacement to a fraction of the model size
    pub base_scale: f64,
    /// User multiplier on `base_scale`
    pub scale_factor: f64,
    points: usize,
}

impl ModeShapes {
    /// Extracts element displacements for every mode and builds their curves
    /// at the default scale
    pub fn build(elements: &[Element], solution: &EigenSolution, settings: &ModelSettings) -> ModeShapes {
        let local_displacements = extract_local_displacements(elements, &solution.eigenvectors);
        let base_scale = default_scale(elements, &local_displacements, settings.shape_fraction);
        let points = settings.shape_points.max(2);

        let curves =
            compute_continuous_shape(elements, &local_displacements, base_scale, points);

        ModeShapes {
            local_displacements,
            curves,
            base_scale,
            scale_factor: 1.0,
            points,
        }
    }

    pub fn scale(&self) -> f64 {
        self.base_scale * self.scale_factor
    }

    pub fn mode_curves(&self, mode: usize) -> Option<&[ElementCurve]> {
        self.curves.get(mode).map(|c| c.as_slice())
    }

    /// Redraws every curve with `factor` times the default scale
    ///
    /// The factor replaces the previous one; it is not cumulative.
    pub fn change_scale(&mut self, elements: &[Element], factor: f64) {
        self.scale_factor = factor;
        self.curves = compute_continuous_shape(
            elements,
            &self.local_displacements,
            self.scale(),
            self.points,
        );
    }

    /// Re-extracts one mode after its eigenvector changed
    pub fn refresh_mode(&mut self, elements: &[Element], eigenvectors: &DMatrix<f64>, mode: usize) {
        let scale = self.scale();
        let Some(curves) = self.curves.get_mut(mode) else {
            return;
        };

        for ((element, per_mode), curve) in elements
            .iter()
            .zip(self.local_displacements.iter_mut())
            .zip(curves.iter_mut())
        {
            per_mode[mode] = gather_element_dofs(element, eigenvectors, mode);
            *curve = element_curve(element, &per_mode[mode], scale, self.points);
        }
    }
}

/// Gathers one element's six global DOF values from an eigenvector column
pub fn gather_element_dofs(element: &Element, eigenvectors: &DMatrix<f64>, mode: usize) -> Vector6 {
    Vector6::from_fn(|i, _| eigenvectors[(element.edof[i] - 1, mode)])
}

/// Picks each element's end displacements out of every eigenvector
///
/// # Arguments
/// * `elements` - The elements of the model
/// * `eigenvectors` - Full-length eigenvectors, one column per mode
///
/// # Returns
/// One 6-vector per element and mode, indexed `[element][mode]`
pub fn extract_local_displacements(elements: &[Element], eigenvectors: &DMatrix<f64>) -> Vec<Vec<Vector6>> {
    elements
        .iter()
        .map(|element| {
            (0..eigenvectors.ncols())
                .map(|mode| gather_element_dofs(element, eigenvectors, mode))
                .collect()
        })
        .collect()
}

/// The largest side of the bounding box around all elements
pub fn model_extent(elements: &[Element]) -> f64 {
    let mut vertices = elements.iter().flat_map(|e| e.vertices.iter());
    let Some(first) = vertices.next() else {
        return 0.0;
    };

    let (mut x_min, mut x_max, mut y_min, mut y_max) = (first.x, first.x, first.y, first.y);
    for v in vertices {
        x_min = x_min.min(v.x);
        x_max = x_max.max(v.x);
        y_min = y_min.min(v.y);
        y_max = y_max.max(v.y);
    }

    (x_max - x_min).max(y_max - y_min)
}

/// Scale that draws the largest nodal translation of any mode at `fraction`
/// of the model extent
///
/// # Returns
/// The scale, or 1 when the model has no size or no motion
pub fn default_scale(elements: &[Element], local_displacements: &[Vec<Vector6>], fraction: f64) -> f64 {
    let max_disp = local_displacements
        .iter()
        .flatten()
        .flat_map(|d| [f64::hypot(d[0], d[1]), f64::hypot(d[3], d[4])])
        .fold(0.0, f64::max);
    let extent = model_extent(elements);

    if max_disp <= 0.0 || extent <= 0.0 {
        return 1.0;
    }

    fraction * extent / max_disp
}

/// Samples the deflected shape of one element
///
/// Axial motion is interpolated linearly and transverse motion with cubic
/// Hermite functions, both in element axes, then added to the undeformed
/// centerline.
///
/// # Arguments
/// * `element` - The element to draw
/// * `displacements` - End displacements in global orientation
/// * `scale` - Multiplier on the displacements
/// * `samples` - Number of evenly spaced points, ends included
pub fn element_curve(element: &Element, displacements: &Vector6, scale: f64, samples: usize) -> ElementCurve {
    let (length, cos, sin) = beam::element_axis(&element.vertices);
    let d = beam::compute_transformation_matrix(cos, sin) * displacements * scale;
    let start = element.vertices[0];

    let points = (0..samples)
        .map(|k| {
            let xi = k as f64 / (samples - 1) as f64;
            let (axial, transverse) = beam::shape_functions(xi, length);

            let u = axial[0] * d[0] + axial[1] * d[3];
            let v = transverse[0] * d[1]
                + transverse[1] * d[2]
                + transverse[2] * d[4]
                + transverse[3] * d[5];

            Vertex {
                x: start.x + xi * length * cos + u * cos - v * sin,
                y: start.y + xi * length * sin + u * sin + v * cos,
            }
        })
        .collect();

    ElementCurve {
        element: element.id,
        points,
    }
}

/// Builds the curves of every mode
///
/// # Returns
/// Curves indexed `[mode][element]`
pub fn compute_continuous_shape(
    elements: &[Element],
    local_displacements: &[Vec<Vector6>],
    scale: f64,
    points: usize,
) -> Vec<Vec<ElementCurve>> {
    let num_modes = local_displacements.first().map_or(0, |d| d.len());

    (0..num_modes)
        .map(|mode| {
            elements
                .iter()
                .zip(local_displacements)
                .map(|(element, per_mode)| element_curve(element, &per_mode[mode], scale, points))
                .collect()
        })
        .collect()
}

/// Writes the curves of one mode to a CSV file
///
/// # Arguments
/// * `curves` - The curves of the mode, one per element
/// * `mode` - The 0-based mode index, written 1-based as the first column
/// * `frequency_hz` - Natural frequency of the mode, logged
/// * `output` - The filename of the output csv
pub fn csv_output(
    curves: &[ElementCurve],
    mode: usize,
    frequency_hz: f64,
    output: &str,
) -> Result<(), EigenframeError> {
    let mut file = match std::fs::File::create(output) {
        Ok(f) => f,
        Err(err) => {
            return Err(EigenframeError::PostProcessor(format!(
                "Failed to create {output}: {err}"
            )));
        }
    };

    let write_err =
        |err: std::io::Error| EigenframeError::PostProcessor(format!("Failed to write {output}: {err}"));

    writeln!(file, "mode,element,point,x,y").map_err(write_err)?;

    let number = mode + 1;

    let bar = ProgressBar::new(curves.len() as u64);
    for curve in curves {
        bar.inc(1);
        for (i, point) in curve.points.iter().enumerate() {
            writeln!(
                file,
                "{number},{element},{i},{x},{y}",
                element = curve.element,
                x = point.x,
                y = point.y
            )
            .map_err(write_err)?;
        }
    }
    bar.finish_and_clear();

    log::info!(
        "wrote mode {} ({:.3} Hz) to {}",
        number,
        frequency_hz,
        output
    );

    Ok(())
}
