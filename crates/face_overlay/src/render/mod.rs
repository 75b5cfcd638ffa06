//! # Rendering System
//!
//! The face overlay render pipeline on top of an immediate-mode graphics context.
//!
//! ## Architecture
//!
//! - **Backend**: the [`GraphicsContext`] trait, the only way GPU state is touched
//! - **Shaders and textures**: program build and mipmapped texture upload helpers
//! - **Face renderer**: per-face transform composition, uniform upload and draw
//! - **Backends**: concrete contexts (currently a command-recording context)

pub mod backend;
pub mod backends;
pub mod face_renderer;
pub mod material;
pub mod shader;
pub mod texture;

pub use backend::{
    AttribLocation, BackendResult, BlendFactor, Capability, ClearMask, GraphicsContext,
    PrimitiveMode, ProgramId, ShaderId, ShaderStage, TextureFilter, TextureId,
    TextureParameter, UniformLocation,
};
pub use backends::recording::RecordingContext;
pub use face_renderer::{AugmentedFaceRenderer, FaceTransforms, RenderContext};
pub use material::MaterialProperties;

use crate::tracking::MeshError;

/// Rendering errors
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// A shader stage failed to compile
    ///
    /// Carries the backend's info log.
    #[error("{stage:?} shader compilation failed: {log}")]
    ShaderCompilation {
        /// Stage that failed
        stage: ShaderStage,
        /// Compiler output
        log: String,
    },

    /// Program linking failed
    #[error("Program link failed: {0}")]
    ProgramLink(String),

    /// Draw requested before the renderer created its GPU state
    #[error("Renderer used before create_on_gl_thread")]
    NotInitialized,

    /// Face mesh buffers are inconsistent
    #[error("Invalid face mesh: {0}")]
    InvalidMesh(#[from] MeshError),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
