//! Shlok core library
//!
//! Pronunciation practice sessions for song lyrics: scoring spoken attempts,
//! deciding retries, walking a song word by word, and serving sessions over
//! WebSocket.

pub mod audio;
pub mod config;
pub mod corpus;
pub mod practice;
pub mod server;
pub mod telemetry;
