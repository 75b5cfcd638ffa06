//! # Tracking Input
//!
//! Traits describing the AR tracking provider as seen by the render pipeline.
//! The provider itself (face detection, pose estimation, mesh triangulation) is an
//! external collaborator; this module only fixes the shape of its per-frame output.
//!
//! ## Ownership
//!
//! Face handles and their mesh buffers belong to the provider. The renderer borrows a
//! [`FaceMesh`] for the duration of a single draw call and never keeps it across frames.

pub mod display_rotation;
pub mod session;
pub mod simulated;

pub use display_rotation::{DisplayRotation, DisplayRotationHelper};
pub use session::{configure_session, CameraFacing, FocusMode, SessionConfig, SessionUnavailable};

use crate::foundation::math::{Mat4, Pose};

/// Tracking state reported for a trackable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingState {
    /// Temporarily lost; may resume
    Paused,
    /// Will never be tracked again
    Stopped,
    /// Pose and mesh are current
    Tracking,
}

/// Validity of a light estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightEstimateState {
    /// Estimate is usable
    Valid,
    /// Estimate could not be computed this frame
    NotValid,
}

/// Ambient lighting approximation derived from the camera image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightEstimate {
    /// Estimate validity
    pub state: LightEstimateState,
    /// Average pixel intensity in gamma space
    pub pixel_intensity: f32,
    /// RGB scale factors plus average intensity in alpha
    pub color_correction: [f32; 4],
}

impl Default for LightEstimate {
    fn default() -> Self {
        Self {
            state: LightEstimateState::Valid,
            pixel_intensity: 1.0,
            color_correction: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Per-frame camera snapshot produced by a tracking update
pub trait FrameSnapshot {
    /// Projection matrix for the given clip planes
    fn projection_matrix(&self, near: f32, far: f32) -> Mat4;

    /// World-to-camera view matrix
    fn view_matrix(&self) -> Mat4;

    /// Lighting estimate for this frame
    fn light_estimate(&self) -> LightEstimate;
}

/// One real-world face currently known to the tracker
pub trait TrackedFace {
    /// Current tracking state
    fn tracking_state(&self) -> TrackingState;

    /// Pose of the face center in world space
    fn center_pose(&self) -> Pose;

    /// Borrowed view over the face mesh buffers
    fn mesh(&self) -> FaceMesh<'_>;
}

/// Tracking session producing per-frame updates
pub trait TrackingSession {
    /// Frame snapshot type returned by [`TrackingSession::update`]
    type Frame: FrameSnapshot;

    /// Face handle type returned by [`TrackingSession::tracked_faces`]
    type Face: TrackedFace;

    /// Whether the session supports this configuration
    fn is_supported(&self, config: &SessionConfig) -> bool;

    /// Apply a configuration
    fn configure(&mut self, config: &SessionConfig) -> TrackingResult<()>;

    /// Advance to the latest camera frame. Synchronous.
    fn update(&mut self) -> TrackingResult<Self::Frame>;

    /// All faces the session currently knows about, in any tracking state
    fn tracked_faces(&self) -> Vec<Self::Face>;

    /// Inform the session of display rotation and viewport size
    fn set_display_geometry(&mut self, rotation: DisplayRotation, width: u32, height: u32);

    /// Stop producing updates; `update` fails with [`TrackingError::Paused`] until resumed
    fn pause(&mut self);

    /// Resume producing updates
    fn resume(&mut self) -> TrackingResult<()>;
}

/// Tracking errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    /// Tracking cannot run on this device or installation
    #[error("Tracking unavailable: {0}")]
    Unavailable(#[from] SessionUnavailable),

    /// Session was queried while paused
    #[error("Tracking session is paused")]
    Paused,

    /// A single update failed; the next frame may succeed
    #[error("Tracking update failed: {0}")]
    Transient(String),
}

/// Result type for tracking operations
pub type TrackingResult<T> = Result<T, TrackingError>;

/// Malformed face mesh buffers
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A buffer length is not a multiple of its component count
    #[error("{buffer} has {len} floats, not a multiple of {components}")]
    Misaligned {
        /// Buffer name
        buffer: &'static str,
        /// Element count
        len: usize,
        /// Expected components per vertex
        components: usize,
    },

    /// A per-vertex buffer disagrees with the position count
    #[error("{buffer} describes {found} vertices but positions describe {expected}")]
    VertexCountMismatch {
        /// Buffer name
        buffer: &'static str,
        /// Vertex count from positions
        expected: usize,
        /// Vertex count from this buffer
        found: usize,
    },

    /// Index count is not a multiple of three
    #[error("{0} triangle indices is not a whole number of triangles")]
    PartialTriangle(usize),

    /// An index refers past the last vertex
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index value
        index: u16,
        /// Number of vertices
        vertex_count: usize,
    },
}

/// Borrowed face mesh buffers
///
/// Layout: positions and normals are 3 floats per vertex, texture coordinates 2 floats
/// per vertex, triangle indices 16-bit.
#[derive(Debug, Clone, Copy)]
pub struct FaceMesh<'a> {
    /// Vertex positions in face-local space
    pub vertices: &'a [f32],
    /// Per-vertex normals
    pub normals: &'a [f32],
    /// Per-vertex texture coordinates
    pub texture_coordinates: &'a [f32],
    /// Triangle list indices
    pub triangle_indices: &'a [u16],
}

impl<'a> FaceMesh<'a> {
    /// Number of vertices described by the position buffer
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of indices to draw
    pub fn index_count(&self) -> usize {
        self.triangle_indices.len()
    }

    /// Positions viewed as `[x, y, z]` triples
    pub fn positions(&self) -> Result<&'a [[f32; 3]], MeshError> {
        bytemuck::try_cast_slice(self.vertices).map_err(|_| MeshError::Misaligned {
            buffer: "vertices",
            len: self.vertices.len(),
            components: 3,
        })
    }

    /// Check that all buffers agree and every index is in range
    pub fn validate(&self) -> Result<(), MeshError> {
        let vertex_count = self.positions()?.len();

        check_per_vertex("normals", self.normals, 3, vertex_count)?;
        check_per_vertex("texture_coordinates", self.texture_coordinates, 2, vertex_count)?;

        if self.triangle_indices.len() % 3 != 0 {
            return Err(MeshError::PartialTriangle(self.triangle_indices.len()));
        }
        if let Some(&index) = self
            .triangle_indices
            .iter()
            .find(|&&index| usize::from(index) >= vertex_count)
        {
            return Err(MeshError::IndexOutOfRange { index, vertex_count });
        }
        Ok(())
    }
}

fn check_per_vertex(
    buffer: &'static str,
    data: &[f32],
    components: usize,
    expected: usize,
) -> Result<(), MeshError> {
    if data.len() % components != 0 {
        return Err(MeshError::Misaligned {
            buffer,
            len: data.len(),
            components,
        });
    }
    let found = data.len() / components;
    if found != expected {
        return Err(MeshError::VertexCountMismatch { buffer, expected, found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTICES: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    const NORMALS: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    const UVS: [f32; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];

    fn mesh<'a>(vertices: &'a [f32], indices: &'a [u16]) -> FaceMesh<'a> {
        FaceMesh {
            vertices,
            normals: &NORMALS,
            texture_coordinates: &UVS,
            triangle_indices: indices,
        }
    }

    #[test]
    fn test_valid_triangle() {
        let m = mesh(&VERTICES, &[0, 1, 2]);
        assert!(m.validate().is_ok());
        assert_eq!(m.vertex_count(), 3);
        assert_eq!(m.index_count(), 3);
        assert_eq!(m.positions().unwrap()[1], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_index_out_of_range() {
        let m = mesh(&VERTICES, &[0, 1, 3]);
        assert_eq!(
            m.validate(),
            Err(MeshError::IndexOutOfRange { index: 3, vertex_count: 3 })
        );
    }

    #[test]
    fn test_partial_triangle() {
        let m = mesh(&VERTICES, &[0, 1]);
        assert_eq!(m.validate(), Err(MeshError::PartialTriangle(2)));
    }

    #[test]
    fn test_misaligned_positions() {
        let m = mesh(&VERTICES[..8], &[0, 1, 2]);
        assert!(matches!(m.validate(), Err(MeshError::Misaligned { buffer: "vertices", .. })));
    }

    #[test]
    fn test_normal_count_mismatch() {
        let m = FaceMesh {
            vertices: &VERTICES,
            normals: &NORMALS[..6],
            texture_coordinates: &UVS,
            triangle_indices: &[0, 1, 2],
        };
        assert_eq!(
            m.validate(),
            Err(MeshError::VertexCountMismatch { buffer: "normals", expected: 3, found: 2 })
        );
    }
}
