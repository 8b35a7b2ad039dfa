//! Append-only agent step history with a fixed rendering format (spec §4.5).

pub mod history;
pub mod model;
pub mod render;

pub use history::AgentHistory;
pub use model::{AgentOutput, HistoryError, HistoryItem};
pub use render::{parse_item, render_history, render_item, truncate_error};
