//! Deterministic random number generation
//!
//! Uses xorshift64* so a seeded scenario replays identically.
//! Participant behaviour should draw from the engine's generator (via the
//! step context) rather than from any global source.

mod xorshift;

pub use xorshift::RngManager;
