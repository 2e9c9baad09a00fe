pub mod client;
pub mod liveness;

pub use client::{ClientError, LevyClient};
pub use liveness::{watch, HttpSessionRefresher, LivenessGuard, LivenessStart, SessionStatus};
