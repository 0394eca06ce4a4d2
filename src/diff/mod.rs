//! Per-consumer change buffers.
//!
//! Consumers poll for the positions that changed since their own last poll
//! instead of rescanning the model. Buffers store positions only; the current
//! state at each position is looked up when the consumer polls, so several
//! edits to one cell collapse into a single net result.

pub mod registry;

pub use registry::{Channel, Diff, DiffRegistry};
