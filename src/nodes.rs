use std::collections::BTreeSet;

use crate::{
    datatypes::{Node, Vertex, DOF},
    error::EditError,
    registry::Registry,
};

/// The node collection of a model, with DOF bookkeeping and hinge scaffolding
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    nodes: Registry<Node>,
    /// Rotational DOFs of hinge originals that may end up unreferenced
    dangling_candidates: BTreeSet<usize>,
}

impl NodeSet {
    pub fn new() -> NodeSet {
        NodeSet::default()
    }

    pub fn registry(&self) -> &Registry<Node> {
        &self.nodes
    }

    pub fn get(&self, id: usize) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn next_id(&self) -> usize {
        self.nodes.next_id()
    }

    pub fn dangling_candidates(&self) -> &BTreeSet<usize> {
        &self.dangling_candidates
    }

    /// Whether a node already sits at `vertex`
    pub fn found_coords(&self, vertex: &Vertex, tol: f64) -> bool {
        self.nodes.iter().any(|n| n.vertex.coincides(vertex, tol))
    }

    /// Builds a node, refusing duplicates
    ///
    /// # Arguments
    /// * `x` - The x coordinate
    /// * `y` - The y coordinate
    /// * `id` - The requested node id
    /// * `tol` - Coordinate tolerance for duplicate detection
    pub fn create_node(&self, x: f64, y: f64, id: usize, tol: f64) -> Result<Node, EditError> {
        if id == 0 {
            return Err(EditError::InvalidId(id));
        }
        if !(x.is_finite() && y.is_finite()) {
            return Err(EditError::InvalidCoordinates);
        }
        if self.nodes.contains(id) {
            return Err(EditError::DuplicateId(id));
        }
        if self.found_coords(&Vertex { x, y }, tol) {
            return Err(EditError::DuplicateCoordinates);
        }

        Ok(Node::new(id, x, y))
    }

    pub fn add(&mut self, node: Node) {
        self.nodes.add(node);
    }

    /// Hinge duplicates split from node `origin`
    pub fn hinge_duplicates(&self, origin: usize) -> Vec<usize> {
        self.nodes
            .iter()
            .filter(|n| n.origin == Some(origin))
            .map(|n| n.id)
            .collect()
    }

    /// Deletes node `id` together with every node standing for the same
    /// point: its origin and all hinge duplicates of that origin.
    ///
    /// # Returns
    /// The removed nodes, or `None` if `id` does not exist
    pub fn delete(&mut self, id: usize) -> Option<Vec<Node>> {
        let point = self.nodes.get(id)?.resolved_id();
        let removed = self.nodes.retain(|n| n.resolved_id() != point);

        for dof in removed.iter().filter_map(|n| n.rotational_dof()) {
            self.dangling_candidates.remove(&dof);
        }

        Some(removed)
    }

    /// Drops hinge duplicates no element uses any more
    ///
    /// An origin left without duplicates gets its plain state back. When the
    /// origin itself was already cleaned up, its last duplicate is kept and
    /// becomes a plain node so the point survives.
    ///
    /// # Arguments
    /// * `in_use` - Ids of all nodes referenced by elements
    ///
    /// # Returns
    /// The removed duplicates
    pub fn remove_unused_hinges(&mut self, in_use: &BTreeSet<usize>) -> Vec<Node> {
        let mut removed = Vec::new();

        let unused: Vec<(usize, usize)> = self
            .nodes
            .iter()
            .filter(|n| n.hinge && !in_use.contains(&n.id))
            .filter_map(|n| n.origin.map(|origin| (n.id, origin)))
            .collect();

        for (id, origin) in unused {
            let siblings = self.hinge_duplicates(origin).len();

            if !self.nodes.contains(origin) && siblings == 1 {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.hinge = false;
                    node.origin = None;
                    log::debug!("hinge node {} promoted to a plain node", id);
                }
                continue;
            }

            if let Some(node) = self.nodes.delete_by_id(id) {
                removed.push(node);
            }
            self.release_origin(origin);
        }

        removed
    }

    /// Clears the hinge bookkeeping of `origin` once no duplicate refers to it
    fn release_origin(&mut self, origin: usize) {
        if !self.hinge_duplicates(origin).is_empty() {
            return;
        }
        if let Some(node) = self.nodes.get_mut(origin) {
            node.dangling = false;
            if let Some(dof) = node.rotational_dof() {
                self.dangling_candidates.remove(&dof);
            }
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.dangling_candidates.clear();
    }

    /// Numbers DOFs by position: the i-th node (0-based) gets
    /// `(3i+1, 3i+2, 3i+3)`.
    ///
    /// Hinge duplicates only make sense against the numbering they were split
    /// from, so any that remain are dropped first.
    ///
    /// # Returns
    /// The dropped hinge duplicates
    pub fn assign_dofs(&mut self) -> Vec<Node> {
        let dropped = self.nodes.retain(|n| !n.hinge);

        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.dofs = Some([DOF * i + 1, DOF * i + 2, DOF * i + 3]);
            node.hinge = false;
            node.dangling = false;
            node.origin = None;
        }
        self.dangling_candidates.clear();

        dropped
    }

    /// Every DOF currently held by a node
    pub fn assigned_dofs(&self) -> BTreeSet<usize> {
        self.nodes
            .iter()
            .filter_map(|n| n.dofs)
            .flat_map(|d| d.into_iter())
            .collect()
    }

    pub fn next_available_dof(&self) -> usize {
        self.assigned_dofs().last().map_or(1, |d| d + 1)
    }

    /// Splits off a hinge duplicate of node `id` and registers it.
    ///
    /// The original keeps its DOFs but its rotation becomes a dangling
    /// candidate, since the duplicate takes over the element connection.
    ///
    /// # Returns
    /// The id of the new hinge node
    pub fn duplicate_for_hinge(&mut self, id: usize) -> Result<usize, EditError> {
        let new_id = self.nodes.next_id();
        let rotational_dof = self.next_available_dof();

        let original = self.nodes.get_mut(id).ok_or(EditError::UnknownNode(id))?;
        let duplicate = Node::hinge_of(original, new_id, rotational_dof)?;

        original.dangling = true;
        if let Some(dof) = original.rotational_dof() {
            self.dangling_candidates.insert(dof);
        }

        log::debug!(
            "node {} duplicated into hinge node {} with rotational dof {}",
            id,
            new_id,
            rotational_dof
        );
        self.nodes.add(duplicate);

        Ok(new_id)
    }

    /// Drops hinge origins whose candidate-dangling rotation no element uses
    ///
    /// # Arguments
    /// * `referenced` - All DOFs referenced by elements
    ///
    /// # Returns
    /// The removed nodes
    pub fn remove_dangling(&mut self, referenced: &BTreeSet<usize>) -> Vec<Node> {
        let orphaned: BTreeSet<usize> = self
            .dangling_candidates
            .iter()
            .copied()
            .filter(|d| !referenced.contains(d))
            .collect();

        if orphaned.is_empty() {
            return Vec::new();
        }

        // an origin is only scaffolding while a duplicate carries its point
        let split: BTreeSet<usize> = self.nodes.iter().filter_map(|n| n.origin).collect();

        let removed = self.nodes.retain(|n| {
            n.hinge
                || !split.contains(&n.id)
                || !n.rotational_dof().is_some_and(|d| orphaned.contains(&d))
        });
        for dof in &orphaned {
            self.dangling_candidates.remove(dof);
        }

        removed
    }
}
