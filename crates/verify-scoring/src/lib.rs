pub mod banner;
pub mod provider;
pub mod queue_id;
pub mod scoring;
pub mod timing;

pub use banner::MtaInfo;
pub use queue_id::QueueIdResult;
pub use scoring::{score, status_for, ScoringInput, Status};
pub use timing::{analyze as analyze_timing, TimingResult, TimingStatus};
