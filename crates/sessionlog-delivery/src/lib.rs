//! Delivery of session snapshots: local persistence, upload, resubmission of
//! stale files and exit gating.

pub mod logger;
pub mod pipeline;
pub mod shutdown;
pub mod sweeper;

#[cfg(test)]
mod testing;

pub use logger::{
    ExitHandle, FrameProbe, FrameSample, SessionLogger, SessionLoggerDeps, FPS_SAMPLE_INTERVAL,
};
pub use pipeline::{DeliveryOutcome, DeliveryPipeline};
pub use shutdown::{ExitDecision, ShutdownCoordinator, ShutdownState};
pub use sweeper::{sweep_unsent, SweepReport};
