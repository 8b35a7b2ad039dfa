//! Named action-kind registry and multi-action sequencing (spec §4.4).

pub mod controller;
pub mod errors;
pub mod model;
pub mod registry;

pub use controller::ActionController;
pub use errors::ActionError;
pub use model::Action;
pub use registry::{render_page_actions, ActionSpec, REGISTRY};
