use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validator::ModelStatus;

/// Reasons a model edit was turned down.
///
/// These are routine input mistakes. A rejected edit leaves the model exactly
/// as it was, so callers are free to log and move on.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditError {
    #[error("identifier {0} is already in use")]
    DuplicateId(usize),
    #[error("identifiers must be positive, got {0}")]
    InvalidId(usize),
    #[error("a node already exists at these coordinates")]
    DuplicateCoordinates,
    #[error("coordinates must be finite")]
    InvalidCoordinates,
    #[error("node {0} does not exist")]
    UnknownNode(usize),
    #[error("element {0} does not exist")]
    UnknownElement(usize),
    #[error("no support is attached to node {0}")]
    UnknownSupport(usize),
    #[error("node {0} already carries a support")]
    DuplicateSupport(usize),
    #[error("unknown support type code {0}")]
    InvalidSupportKind(u8),
    #[error("nodes {0} and {1} are already connected")]
    DuplicateConnection(usize, usize),
    #[error("an element cannot connect node {0} to itself")]
    SelfConnection(usize),
    #[error("node {0} has no degrees of freedom assigned")]
    MissingDofs(usize),
    #[error("element properties must be finite and positive")]
    InvalidProperties,
    #[error("element endpoints coincide")]
    ZeroLength,
    #[error("degrees of freedom cannot be reassigned while elements exist")]
    ElementsPresent,
    #[error("the node set is empty")]
    NoNodes,
}

#[derive(Error, Debug)]
pub enum EigenframeError {
    #[error("Input error: {0}")]
    Input(String),
    #[error("Model error: model is not ready to solve ({0:?})")]
    NotReady(ModelStatus),
    #[error("Solver error: {0}")]
    Solver(String),
    #[error("Post Processor error: {0}")]
    PostProcessor(String),
}
