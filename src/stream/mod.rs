//! Streaming scheduler: session state, pacing, and the send loop

pub mod pacer;
pub mod scheduler;
pub mod session;

pub use pacer::Pacer;
pub use scheduler::{StepOutcome, StreamState, StreamStats, Streamer};
pub use session::SessionState;
