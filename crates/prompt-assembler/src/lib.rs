//! Builds the fixed-order, XML-tagged step prompt (spec §4.6).

pub mod assembler;
pub mod browser_state;
pub mod model;

pub use assembler::PromptAssembler;
pub use model::{AgentState, PromptInputs, StepInfo};
