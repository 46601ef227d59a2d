//! One polling cycle, from raw feeds to ready-to-send messages.

pub mod chunker;
pub mod pipeline;
pub mod window;

pub use pipeline::{Digest, Pipeline};
