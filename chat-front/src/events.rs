//! Event pipeline: normalization, stream encoding and wire frames.

pub mod encoder;
pub mod frame;
pub mod normalizer;

// Re-export main types
pub use encoder::{EventStream, NoopCallbacks, StreamCallbacks, StreamEncoder};
pub use frame::{Frame, FrameEncoder};
pub use normalizer::EventNormalizer;
