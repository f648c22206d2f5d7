pub mod config;
pub mod fast_path;
pub mod orchestrator;
pub mod probe_engine;
pub mod types;

pub use config::Config;
pub use fast_path::{FastPathClient, FastPathError, FastPathOutcome};
pub use orchestrator::Orchestrator;
pub use probe_engine::{ProbeConfig, ProbeEngine, ProbeError};
pub use types::{Signals, Source, Status, VerifyRequest, VerifyResponse, VerifyResult};
