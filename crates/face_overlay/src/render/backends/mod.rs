//! Graphics context implementations

pub mod recording;
