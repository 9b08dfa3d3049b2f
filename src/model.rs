//! The modeling session: every operation a front end may call.

use crate::{
    datatypes::{Element, HingeEnds, ModelSettings, Node, SectionProperties, Support, SupportKind, Vertex},
    elements::ElementSet,
    error::{EditError, EigenframeError},
    nodes::NodeSet,
    post_processor::{ElementCurve, ModeShapes},
    solver::{self, EigenSolution},
    supports::SupportSet,
    validator::{self, ModelStatus},
};

/// Result of a successful solve, kept until the next model edit
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub eigen: EigenSolution,
    pub shapes: ModeShapes,
    /// Index of the displayed mode
    pub mode: usize,
}

impl Solution {
    pub fn current_curves(&self) -> &[ElementCurve] {
        self.shapes.mode_curves(self.mode).unwrap_or(&[])
    }
}

/// Drawing data for an element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementSegment {
    pub id: usize,
    pub start: Vertex,
    pub end: Vertex,
    pub midpoint: Vertex,
}

/// Drawing data for a support
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportMarker {
    pub node: usize,
    pub position: Vertex,
    pub kind: SupportKind,
    pub orientation_deg: f64,
}

/// A planar frame under construction together with its modal solution
#[derive(Debug, Clone)]
pub struct Model {
    settings: ModelSettings,
    nodes: NodeSet,
    elements: ElementSet,
    supports: SupportSet,
    status: ModelStatus,
    solution: Option<Solution>,
}

impl Default for Model {
    fn default() -> Self {
        Model::new(ModelSettings::default())
    }
}

impl Model {
    pub fn new(settings: ModelSettings) -> Model {
        Model {
            settings,
            nodes: NodeSet::new(),
            elements: ElementSet::new(),
            supports: SupportSet::new(),
            status: ModelStatus::NoNodes,
            solution: None,
        }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn status(&self) -> ModelStatus {
        self.status
    }

    pub fn nodes(&self) -> &NodeSet {
        &self.nodes
    }

    pub fn elements(&self) -> &ElementSet {
        &self.elements
    }

    pub fn supports(&self) -> &SupportSet {
        &self.supports
    }

    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    pub fn next_node_id(&self) -> usize {
        self.nodes.next_id()
    }

    pub fn next_element_id(&self) -> usize {
        self.elements.next_id()
    }

    /// Drops any solution and re-runs the model checks
    fn refresh(&mut self) {
        self.solution = None;
        self.status = validator::check_model(&self.nodes, &self.elements, &self.supports);
        log::debug!("model status: {:?}", self.status);
    }

    pub fn create_node(&mut self, x: f64, y: f64, id: usize) -> Result<usize, EditError> {
        let node = self
            .nodes
            .create_node(x, y, id, self.settings.coordinate_tolerance)?;
        self.nodes.add(node);
        self.elements.invalidate();

        log::info!("added node {} at ({}, {})", id, x, y);
        self.refresh();
        Ok(id)
    }

    /// Deletes a node along with its elements and support
    ///
    /// Hinge duplicates of the same point go with it, taking their elements
    /// and supports too.
    pub fn delete_node(&mut self, id: usize) -> Result<(), EditError> {
        let removed = self.nodes.delete(id).ok_or(EditError::UnknownNode(id))?;

        let mut element_count = 0;
        let mut support_count = 0;
        for node in &removed {
            element_count += self.elements.delete_attached(node.id).len();
            if self.supports.delete(node.id).is_some() {
                support_count += 1;
            }
        }
        self.elements.invalidate();
        self.drop_unused_hinges();

        log::info!(
            "deleted node {} ({} node(s) at that point) with {} element(s) and {} support(s)",
            id,
            removed.len(),
            element_count,
            support_count
        );
        self.refresh();
        Ok(())
    }

    /// Removes hinge duplicates left without elements
    ///
    /// A support on a removed duplicate moves to another node at the same
    /// point, the origin first, then a remaining duplicate. It is dropped
    /// only when all of those already carry supports.
    fn drop_unused_hinges(&mut self) {
        for node in self.nodes.remove_unused_hinges(&self.elements.referenced_nodes()) {
            log::info!("removed unused hinge node {}", node.id);

            let (Some(origin), Some(_)) = (node.origin, self.supports.get(node.id)) else {
                continue;
            };
            let candidates: Vec<usize> = std::iter::once(origin)
                .filter(|&o| self.nodes.get(o).is_some())
                .chain(self.nodes.hinge_duplicates(origin))
                .collect();

            match candidates
                .into_iter()
                .find(|&target| self.supports.relocate(node.id, target))
            {
                Some(target) => log::info!("moved support from node {} to node {}", node.id, target),
                None => {
                    self.supports.delete(node.id);
                    log::warn!("dropped support at unused hinge node {}", node.id);
                }
            }
        }
    }

    /// Removes every node, which takes all elements and supports with it
    pub fn clear_nodes(&mut self) {
        self.nodes.clear();
        self.elements.clear();
        self.supports.clear();
        self.refresh();
    }

    /// Numbers the DOFs of all nodes by position
    ///
    /// # Returns
    /// The number of DOFs assigned
    pub fn assign_dofs(&mut self) -> Result<usize, EditError> {
        if self.nodes.is_empty() {
            return Err(EditError::NoNodes);
        }
        if !self.elements.is_empty() {
            return Err(EditError::ElementsPresent);
        }

        for node in self.nodes.assign_dofs() {
            if self.supports.delete(node.id).is_some() {
                log::warn!("dropped support at stale hinge node {}", node.id);
            }
        }
        self.elements.invalidate();

        let count = self.nodes.assigned_dofs().len();
        log::info!("assigned {} dofs to {} nodes", count, self.nodes.len());
        self.refresh();
        Ok(count)
    }

    pub fn create_element(
        &mut self,
        id: usize,
        node_a: usize,
        node_b: usize,
        properties: SectionProperties,
        hinges: HingeEnds,
    ) -> Result<usize, EditError> {
        self.elements
            .create_element(&mut self.nodes, id, node_a, node_b, properties, hinges)?;
        self.refresh();
        Ok(id)
    }

    pub fn delete_element(&mut self, id: usize) -> Result<(), EditError> {
        self.elements.delete(id).ok_or(EditError::UnknownElement(id))?;
        self.drop_unused_hinges();

        log::info!("deleted element {}", id);
        self.refresh();
        Ok(())
    }

    pub fn clear_elements(&mut self) {
        self.elements.clear();
        self.drop_unused_hinges();
        self.refresh();
    }

    /// Attaches a support of type `code` (0 through 5) to a node
    pub fn create_support(&mut self, node: usize, code: u8) -> Result<(), EditError> {
        self.supports.create_support(&self.nodes, node, code)?;

        log::info!("added {:?} support at node {}", SupportKind::from_code(code)?, node);
        self.refresh();
        Ok(())
    }

    pub fn delete_support(&mut self, node: usize) -> Result<(), EditError> {
        self.supports.delete(node).ok_or(EditError::UnknownSupport(node))?;

        log::info!("deleted support at node {}", node);
        self.refresh();
        Ok(())
    }

    pub fn clear_supports(&mut self) {
        self.supports.clear();
        self.refresh();
    }

    /// Resets the whole session
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.elements.clear();
        self.supports.clear();
        self.refresh();
    }

    /// Removes unused hinge scaffolding, then builds global K and M
    ///
    /// A support on a removed hinge origin moves to one of its duplicates,
    /// which shares the origin's translational DOFs.
    pub fn assemble(&mut self) {
        let referenced = self.elements.referenced_dofs();
        for node in self.nodes.remove_dangling(&referenced) {
            log::info!("removed unused hinge origin node {}", node.id);
            if self.supports.get(node.id).is_none() {
                continue;
            }

            let moved_to = self
                .nodes
                .hinge_duplicates(node.id)
                .into_iter()
                .find(|&dup| self.supports.relocate(node.id, dup));
            match moved_to {
                Some(dup) => log::info!("moved support from node {} to hinge node {}", node.id, dup),
                None => {
                    self.supports.delete(node.id);
                    log::warn!("dropped support at node {}: its hinge nodes already carry supports", node.id);
                }
            }
        }

        let element_count = self.elements.len();
        let assembly = self.elements.assemble();
        log::info!(
            "assembled {} dofs from {} elements ({} dangling)",
            assembly.num_dofs,
            element_count,
            assembly.dangling_dofs.len()
        );
        self.refresh();
    }

    /// Computes natural frequencies and mode shapes
    ///
    /// Assembles first when the current assembly is out of date.
    pub fn solve(&mut self) -> Result<&Solution, EigenframeError> {
        if !self.status.is_ready() {
            return Err(EigenframeError::NotReady(self.status));
        }
        if self.elements.assembly().is_none() {
            self.assemble();
            if !self.status.is_ready() {
                return Err(EigenframeError::NotReady(self.status));
            }
        }

        let assembly = self
            .elements
            .assembly()
            .ok_or_else(|| EigenframeError::Solver("model is not assembled".to_owned()))?;
        let constraints = self.supports.gather_constraints(&self.nodes);

        log::info!("solving eigenproblem with {} constrained dofs...", constraints.len());
        let start = std::time::Instant::now();
        let eigen = solver::run(assembly, &constraints, self.settings.eigenvalue_tolerance)?;
        log::info!(
            "solved {} modes in {:.3} seconds",
            eigen.num_modes(),
            start.elapsed().as_secs_f32()
        );

        let shapes = ModeShapes::build(self.elements.as_slice(), &eigen, &self.settings);

        Ok(self.solution.insert(Solution {
            eigen,
            shapes,
            mode: 0,
        }))
    }

    fn solution_mut(&mut self) -> Result<&mut Solution, EigenframeError> {
        self.solution
            .as_mut()
            .ok_or_else(|| EigenframeError::PostProcessor("no solution available".to_owned()))
    }

    /// Selects the displayed mode (0-based)
    pub fn change_mode(&mut self, mode: usize) -> Result<(), EigenframeError> {
        let solution = self.solution_mut()?;
        let num_modes = solution.eigen.num_modes();
        if mode >= num_modes {
            return Err(EigenframeError::PostProcessor(format!(
                "mode {mode} out of range, {num_modes} modes available"
            )));
        }

        solution.mode = mode;
        Ok(())
    }

    /// Sets the drawing scale to `factor` times the default scale
    pub fn change_scale(&mut self, factor: f64) -> Result<(), EigenframeError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(EigenframeError::PostProcessor(format!(
                "scale factor must be finite and positive, got {factor}"
            )));
        }

        let solution = self
            .solution
            .as_mut()
            .ok_or_else(|| EigenframeError::PostProcessor("no solution available".to_owned()))?;
        solution.shapes.change_scale(self.elements.as_slice(), factor);
        Ok(())
    }

    /// Negates the displayed mode shape
    pub fn flip_sign(&mut self) -> Result<(), EigenframeError> {
        let solution = self
            .solution
            .as_mut()
            .ok_or_else(|| EigenframeError::PostProcessor("no solution available".to_owned()))?;
        let mode = solution.mode;

        solution.eigen.eigenvectors.column_mut(mode).neg_mut();
        solution
            .shapes
            .refresh_mode(self.elements.as_slice(), &solution.eigen.eigenvectors, mode);
        Ok(())
    }

    pub fn eigenvalues(&self) -> Option<&[f64]> {
        self.solution.as_ref().map(|s| s.eigen.eigenvalues.as_slice())
    }

    pub fn frequencies_hz(&self) -> Option<Vec<f64>> {
        self.solution.as_ref().map(|s| s.eigen.frequencies_hz())
    }

    pub fn current_mode(&self) -> Option<usize> {
        self.solution.as_ref().map(|s| s.mode)
    }

    /// Curves of the displayed mode, one per element
    pub fn current_shape(&self) -> Option<&[ElementCurve]> {
        self.solution.as_ref().map(|s| s.current_curves())
    }

    pub fn node_coordinates(&self) -> Vec<(usize, Vertex)> {
        self.nodes.iter().map(|n: &Node| (n.id, n.vertex)).collect()
    }

    pub fn element_segments(&self) -> Vec<ElementSegment> {
        self.elements
            .iter()
            .map(|e: &Element| ElementSegment {
                id: e.id,
                start: e.vertices[0],
                end: e.vertices[1],
                midpoint: e.midpoint(),
            })
            .collect()
    }

    pub fn support_markers(&self) -> Vec<SupportMarker> {
        self.supports
            .iter()
            .filter_map(|s: &Support| {
                let node = self.nodes.get(s.node)?;
                Some(SupportMarker {
                    node: s.node,
                    position: node.vertex,
                    kind: s.kind,
                    orientation_deg: s.kind.orientation_deg(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concrete() -> SectionProperties {
        SectionProperties {
            youngs_modulus: 3e10,
            area: 1.03e-3,
            inertia: 1.71e-6,
            density: 2500.0,
        }
    }

    #[test]
    fn walks_through_validator_states() {
        let mut model = Model::default();
        assert_eq!(model.status(), ModelStatus::NoNodes);
        assert!(matches!(
            model.solve(),
            Err(EigenframeError::NotReady(ModelStatus::NoNodes))
        ));

        model.create_node(0.0, 0.0, 1).unwrap();
        model.create_node(1.0, 0.0, 2).unwrap();
        assert_eq!(model.status(), ModelStatus::NoElements);

        assert_eq!(model.assign_dofs(), Ok(6));
        model
            .create_element(1, 1, 2, concrete(), HingeEnds::none())
            .unwrap();
        model.assemble();
        assert_eq!(model.status(), ModelStatus::NoSupports);

        model.create_support(1, 0).unwrap();
        assert_eq!(model.status(), ModelStatus::Ready);

        let solution = model.solve().unwrap();
        assert_eq!(solution.eigen.num_modes(), 3);
        assert_eq!(solution.eigen.eigenvectors.shape(), (6, 3));
        assert!(solution.eigen.eigenvalues.iter().all(|l| *l > 0.0));
        for pair in solution.eigen.eigenvalues.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn any_edit_clears_the_solution() {
        let mut model = Model::default();
        model.create_node(0.0, 0.0, 1).unwrap();
        model.create_node(2.0, 0.0, 2).unwrap();
        model.assign_dofs().unwrap();
        model
            .create_element(1, 1, 2, concrete(), HingeEnds::none())
            .unwrap();
        model.create_support(1, 0).unwrap();
        model.solve().unwrap();
        assert!(model.solution().is_some());

        model.create_support(2, 2).unwrap();
        assert!(model.solution().is_none());
        assert_eq!(model.status(), ModelStatus::Ready);

        model.solve().unwrap();
        assert_eq!(model.delete_support(7), Err(EditError::UnknownSupport(7)));
        assert!(model.solution().is_some());

        model.delete_node(2).unwrap();
        assert!(model.solution().is_none());
        assert!(model.elements().is_empty());
        assert!(model.supports().get(2).is_none());
        assert_eq!(model.status(), ModelStatus::NoElements);
    }

    #[test]
    fn hinge_node_replaces_unused_origin() {
        let mut model = Model::default();
        model.create_node(0.0, 0.0, 1).unwrap();
        model.create_node(2.0, 0.0, 2).unwrap();
        model.assign_dofs().unwrap();

        model
            .create_element(1, 1, 2, concrete(), HingeEnds::at_b())
            .unwrap();
        assert_eq!(model.nodes().len(), 3);
        assert_eq!(model.nodes().iter().filter(|n| n.dangling).count(), 1);
        assert_eq!(model.nodes().iter().filter(|n| n.hinge).count(), 1);
        assert_eq!(model.status(), ModelStatus::DanglingNodes);

        model.assemble();
        assert_eq!(model.nodes().len(), 2);
        assert!(model.nodes().get(2).is_none());
        assert!(model.nodes().get(3).is_some_and(|n| n.hinge));
        assert_eq!(model.elements().assembly().unwrap().dangling_dofs, vec![6]);
        assert_eq!(model.status(), ModelStatus::NoSupports);
    }

    #[test]
    fn mode_controls_require_a_solution() {
        let mut model = Model::default();
        assert!(model.change_mode(0).is_err());
        assert!(model.change_scale(2.0).is_err());
        assert!(model.flip_sign().is_err());
        assert!(model.current_shape().is_none());
    }

    #[test]
    fn flip_sign_is_an_involution() {
        let mut model = Model::default();
        model.create_node(0.0, 0.0, 1).unwrap();
        model.create_node(0.0, 3.0, 2).unwrap();
        model.create_node(4.0, 3.0, 3).unwrap();
        model.assign_dofs().unwrap();
        model
            .create_element(1, 1, 2, concrete(), HingeEnds::none())
            .unwrap();
        model
            .create_element(2, 2, 3, concrete(), HingeEnds::none())
            .unwrap();
        model.create_support(1, 0).unwrap();
        model.create_support(3, 1).unwrap();
        model.solve().unwrap();
        model.change_mode(1).unwrap();

        let original = model.current_shape().unwrap().to_vec();
        model.flip_sign().unwrap();
        assert_ne!(model.current_shape().unwrap(), original.as_slice());
        model.flip_sign().unwrap();
        assert_eq!(model.current_shape().unwrap(), original.as_slice());

        assert!(model.change_mode(99).is_err());
        assert!(model.change_scale(0.0).is_err());
    }

    #[test]
    fn assign_dofs_refuses_to_renumber_under_elements() {
        let mut model = Model::default();
        assert_eq!(model.assign_dofs(), Err(EditError::NoNodes));

        model.create_node(0.0, 0.0, 1).unwrap();
        model.create_node(1.0, 1.0, 2).unwrap();
        model.assign_dofs().unwrap();
        model
            .create_element(1, 1, 2, concrete(), HingeEnds::none())
            .unwrap();
        assert_eq!(model.assign_dofs(), Err(EditError::ElementsPresent));
    }

    #[test]
    fn rendering_queries() {
        let mut model = Model::default();
        model.create_node(0.0, 0.0, 1).unwrap();
        model.create_node(2.0, 2.0, 2).unwrap();
        model.assign_dofs().unwrap();
        model
            .create_element(1, 1, 2, concrete(), HingeEnds::none())
            .unwrap();
        model.create_support(2, 3).unwrap();

        assert_eq!(
            model.node_coordinates(),
            vec![(1, Vertex { x: 0.0, y: 0.0 }), (2, Vertex { x: 2.0, y: 2.0 })]
        );
        assert_eq!(model.element_segments()[0].midpoint, Vertex { x: 1.0, y: 1.0 });

        let markers = model.support_markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].kind, SupportKind::RollerY);
        assert_eq!(markers[0].position, Vertex { x: 2.0, y: 2.0 });

        model.clear();
        assert_eq!(model.status(), ModelStatus::NoNodes);
        assert!(model.support_markers().is_empty());
        assert_eq!(model.next_node_id(), 3);
    }
}
