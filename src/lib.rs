//! Modal analysis of planar frames built from Euler-Bernoulli beam elements.
//!
//! A [`model::Model`] is edited node by node and element by element, checked
//! for well-posedness, and solved for its natural frequencies and mode shapes.

pub mod assembly;
pub mod beam;
pub mod datatypes;
pub mod elements;
pub mod error;
pub mod input;
pub mod model;
pub mod nodes;
pub mod post_processor;
pub mod registry;
pub mod solver;
pub mod supports;
pub mod validator;

pub use error::{EditError, EigenframeError};
pub use model::Model;
