//! # Core
//!
//! Settings structures shared by the renderer, the asset layer and host applications.

pub mod config;

pub use config::{AssetSettings, DemoSettings, OverlayConfig, RenderSettings};
