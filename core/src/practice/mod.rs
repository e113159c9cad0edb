//! Pronunciation practice sessions: scoring, retry decisions, word sequencing
//! and the per-session state machine.

mod constants;
mod runtime;

pub mod config;
pub mod error;
pub mod policy;
pub mod registry;
pub mod scorer;
pub mod sequencer;
pub mod types;

pub use config::PracticeConfig;
pub use error::PracticeError;
pub use policy::{decide, RetryPolicy};
pub use registry::SessionRegistry;
pub use runtime::{AbortReason, SessionHandle, SessionSnapshot, SessionState};
pub use scorer::score;
pub use sequencer::WordSequencer;
pub use types::{
    Attempt, AudioClip, Decision, InboundEvent, OutboundEvent, Song, Verdict, Word,
};

#[cfg(test)]
mod tests;
