//! Host-facing application layer

pub mod frame_loop;

pub use frame_loop::{FrameLoop, FrameOutcome, FrameStats};
