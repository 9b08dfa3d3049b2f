use crate::{
    datatypes::{Support, SupportKind},
    error::EditError,
    nodes::NodeSet,
    registry::Registry,
};

#[derive(Debug, Clone, Default)]
pub struct SupportSet {
    supports: Registry<Support>,
}

impl SupportSet {
    pub fn new() -> SupportSet {
        SupportSet::default()
    }

    pub fn registry(&self) -> &Registry<Support> {
        &self.supports
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Support> {
        self.supports.iter()
    }

    pub fn get(&self, node: usize) -> Option<&Support> {
        self.supports.get(node)
    }

    pub fn len(&self) -> usize {
        self.supports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supports.is_empty()
    }

    /// Attaches a support of the given type code to a node
    ///
    /// # Arguments
    /// * `nodes` - The node set the support refers to
    /// * `node` - Id of the supported node
    /// * `code` - Support type code, 0 through 5
    pub fn create_support(&mut self, nodes: &NodeSet, node: usize, code: u8) -> Result<(), EditError> {
        let kind = SupportKind::from_code(code)?;
        if nodes.get(node).is_none() {
            return Err(EditError::UnknownNode(node));
        }
        if self.supports.contains(node) {
            return Err(EditError::DuplicateSupport(node));
        }

        self.supports.add(Support { node, kind });
        Ok(())
    }

    pub fn delete(&mut self, node: usize) -> Option<Support> {
        self.supports.delete_by_id(node)
    }

    /// Moves the support at node `from` onto node `to`
    ///
    /// # Returns
    /// Whether a support moved. Nothing moves if `to` already has one.
    pub fn relocate(&mut self, from: usize, to: usize) -> bool {
        if self.supports.contains(to) {
            return false;
        }
        let Some(mut support) = self.supports.delete_by_id(from) else {
            return false;
        };

        support.node = to;
        self.supports.add(support);
        true
    }

    pub fn clear(&mut self) {
        self.supports.clear();
    }

    /// Collects the constrained global DOFs of all supports
    ///
    /// Each support's locked local DOFs are mapped through its node's DOF
    /// triple. Nodes without DOFs contribute nothing.
    ///
    /// # Returns
    /// The 1-based constrained DOFs, in support order
    pub fn gather_constraints(&self, nodes: &NodeSet) -> Vec<usize> {
        let mut constraints = Vec::new();

        for support in &self.supports {
            let Some(dofs) = nodes.get(support.node).and_then(|n| n.dofs) else {
                continue;
            };
            constraints.extend(support.locked_dofs().iter().map(|&local| dofs[local]));
        }

        constraints
    }
}
