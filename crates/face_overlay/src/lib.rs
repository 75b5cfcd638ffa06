//! # Face Overlay
//!
//! Renders a textured, lit overlay on every face reported by an augmented-reality
//! tracking session, once per display refresh.
//!
//! ## Features
//!
//! - **Tracking abstraction**: sessions, frames and faces behind traits, with a
//!   scriptable simulated provider
//! - **Face renderer**: per-face transform composition, lighting and blended draw
//! - **Graphics context**: an immediate-mode GPU surface, with a command-recording
//!   implementation for headless hosts
//! - **Assets**: directory and in-memory providers, PNG decoding with premultiplied alpha
//! - **Configuration**: TOML or RON files mapped onto typed settings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use face_overlay::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OverlayConfig::load_or_default("overlay.toml")?;
//!     let mut frame_loop = FrameLoop::start(
//!         Ok(SimulatedSession::new()),
//!         &SessionConfig::default(),
//!         config.render.clone(),
//!     )
//!     .map_err(|reason| reason.user_message())?;
//!     let mut gl = RecordingContext::new();
//!
//!     frame_loop.on_surface_created(&mut gl, &DirectoryAssets::new(config.assets.root.clone()))?;
//!     frame_loop.on_surface_changed(&mut gl, 1080, 1920);
//!     frame_loop.on_draw_frame(&mut gl);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;

pub mod foundation;
pub mod config;
pub mod tracking;
pub mod assets;
pub mod render;
pub mod app;

/// Common imports for overlay hosts
pub mod prelude {
    pub use crate::{
        app::{FrameLoop, FrameOutcome, FrameStats},
        assets::{AssetError, AssetProvider, DirectoryAssets, ImageData, MemoryAssets},
        config::{Config, ConfigError},
        core::config::{AssetSettings, DemoSettings, OverlayConfig, RenderSettings},
        foundation::math::{Mat4, Pose, Quat, Vec3, Vec4},
        render::{
            AugmentedFaceRenderer, GraphicsContext, MaterialProperties, RecordingContext,
            RenderError, RenderResult,
        },
        tracking::{
            simulated::{FaceMeshData, SimulatedSession},
            DisplayRotation, SessionConfig, SessionUnavailable, TrackingError, TrackingSession,
            TrackingState,
        },
    };
}
