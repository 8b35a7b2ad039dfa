//! Single-agent step loop: capture, prompt-assemble, invoke, act, record
//! (spec §4.7).

pub mod config;
pub mod errors;
pub mod replay;
pub mod sensitive_data;
pub mod step;
pub mod url_shortening;

pub use config::AgentLoopConfig;
pub use errors::AgentLoopError;
pub use replay::{RecordedStep, ReplayOptions, ReplayRunner};
pub use sensitive_data::SensitiveDataMap;
pub use step::{AgentLoop, StepOutcome};
pub use url_shortening::{ReverseMap, UrlShortener};
