use std::collections::BTreeSet;

use crate::{
    assembly::{self, GlobalAssembly},
    datatypes::{Element, HingeEnds, SectionProperties},
    error::EditError,
    nodes::NodeSet,
    registry::Registry,
};

/// The element collection of a model together with its global assembly
#[derive(Debug, Clone, Default)]
pub struct ElementSet {
    elements: Registry<Element>,
    assembly: Option<GlobalAssembly>,
}

impl ElementSet {
    pub fn new() -> ElementSet {
        ElementSet::default()
    }

    pub fn registry(&self) -> &Registry<Element> {
        &self.elements
    }

    pub fn as_slice(&self) -> &[Element] {
        self.elements.as_slice()
    }

    pub fn get(&self, id: usize) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn next_id(&self) -> usize {
        self.elements.next_id()
    }

    /// The current assembly, if it is up to date
    pub fn assembly(&self) -> Option<&GlobalAssembly> {
        self.assembly.as_ref()
    }

    /// Whether some element already joins nodes `a` and `b`
    pub fn found_nodes(&self, a: usize, b: usize) -> bool {
        self.elements.iter().any(|e| e.connects(a, b))
    }

    pub fn referenced_dofs(&self) -> BTreeSet<usize> {
        assembly::referenced_dofs(self.elements.as_slice())
    }

    /// Ids of every node some element is attached to
    pub fn referenced_nodes(&self) -> BTreeSet<usize> {
        self.elements.iter().flat_map(|e| e.nodes).collect()
    }

    /// Creates and registers an element, splitting hinge nodes as requested
    ///
    /// # Arguments
    /// * `nodes` - The node set; receives hinge duplicates
    /// * `id` - The element id
    /// * `node_a` - Id of the start node
    /// * `node_b` - Id of the end node
    /// * `properties` - Material and section data
    /// * `hinges` - Element ends with a moment release
    pub fn create_element(
        &mut self,
        nodes: &mut NodeSet,
        id: usize,
        node_a: usize,
        node_b: usize,
        properties: SectionProperties,
        hinges: HingeEnds,
    ) -> Result<usize, EditError> {
        if id == 0 {
            return Err(EditError::InvalidId(id));
        }
        let a = nodes.get(node_a).ok_or(EditError::UnknownNode(node_a))?;
        let b = nodes.get(node_b).ok_or(EditError::UnknownNode(node_b))?;

        let (origin_a, origin_b) = (a.resolved_id(), b.resolved_id());
        if origin_a == origin_b {
            return Err(EditError::SelfConnection(node_a));
        }
        if self.found_nodes(origin_a, origin_b) {
            return Err(EditError::DuplicateConnection(node_a, node_b));
        }
        if self.elements.contains(id) {
            return Err(EditError::DuplicateId(id));
        }

        // no hinge node may exist before the element is known to be valid
        Element::validate(a, b, &properties)?;

        let end_a = match hinges.at_a {
            true => nodes.duplicate_for_hinge(node_a)?,
            false => node_a,
        };
        let end_b = match hinges.at_b {
            true => nodes.duplicate_for_hinge(node_b)?,
            false => node_b,
        };

        let a = nodes.get(end_a).ok_or(EditError::UnknownNode(end_a))?;
        let b = nodes.get(end_b).ok_or(EditError::UnknownNode(end_b))?;
        let element = Element::new(id, a, b, properties)?;

        log::info!(
            "created element {} between nodes {} and {} with dofs {:?}",
            id,
            element.nodes[0],
            element.nodes[1],
            element.edof
        );
        self.elements.add(element);
        self.assembly = None;

        Ok(id)
    }

    pub fn delete(&mut self, id: usize) -> Option<Element> {
        let removed = self.elements.delete_by_id(id);
        if removed.is_some() {
            self.assembly = None;
        }
        removed
    }

    /// Removes every element attached to node `id`
    pub fn delete_attached(&mut self, id: usize) -> Vec<Element> {
        let removed = self.elements.retain(|e| !e.references_node(id));
        if !removed.is_empty() {
            self.assembly = None;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.assembly = None;
    }

    pub fn invalidate(&mut self) {
        self.assembly = None;
    }

    /// Rebuilds the global stiffness and mass matrices from scratch
    pub fn assemble(&mut self) -> &GlobalAssembly {
        self.assembly
            .insert(GlobalAssembly::assemble(self.elements.as_slice()))
    }
}
