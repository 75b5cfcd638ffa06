//! Simulated tracking provider
//!
//! A scriptable in-process [`TrackingSession`] used by the demo host and tests. Faces
//! are added with an explicit state, pose and mesh; failures can be queued to exercise
//! the per-frame recovery path.

use std::collections::VecDeque;
use std::rc::Rc;

use super::{
    DisplayRotation, FaceMesh, FrameSnapshot, LightEstimate, SessionConfig, TrackedFace,
    TrackingError, TrackingResult, TrackingSession, TrackingState,
};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Pose, Vec3};

/// Owned mesh buffers for a simulated face
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMeshData {
    /// Positions, 3 floats per vertex
    pub vertices: Vec<f32>,
    /// Normals, 3 floats per vertex
    pub normals: Vec<f32>,
    /// Texture coordinates, 2 floats per vertex
    pub texture_coordinates: Vec<f32>,
    /// Triangle list
    pub triangle_indices: Vec<u16>,
}

impl FaceMeshData {
    /// Single triangle in the z = 0 plane facing +Z
    pub fn triangle(positions: [[f32; 3]; 3]) -> Self {
        Self {
            vertices: bytemuck::cast_slice(&positions).to_vec(),
            normals: [0.0, 0.0, 1.0].repeat(3),
            texture_coordinates: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            triangle_indices: vec![0, 1, 2],
        }
    }

    /// Front cap of an ellipsoid facing +Z, roughly the shape of a face mesh
    ///
    /// Produces `(columns + 1) * (rows + 1)` vertices, which always fits 16-bit indices.
    pub fn ellipsoid_patch(columns: u8, rows: u8, radii: Vec3) -> Self {
        let columns = u16::from(columns.max(1));
        let rows = u16::from(rows.max(1));
        let span = std::f32::consts::FRAC_PI_3;

        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut texture_coordinates: Vec<[f32; 2]> = Vec::new();

        for j in 0..=rows {
            let t = f32::from(j) / f32::from(rows);
            let latitude = utils::lerp(-span, span, t);
            for i in 0..=columns {
                let s = f32::from(i) / f32::from(columns);
                let longitude = utils::lerp(-span, span, s);

                let p = Vec3::new(
                    radii.x * latitude.cos() * longitude.sin(),
                    radii.y * latitude.sin(),
                    radii.z * latitude.cos() * longitude.cos(),
                );
                let n = Vec3::new(
                    p.x / (radii.x * radii.x),
                    p.y / (radii.y * radii.y),
                    p.z / (radii.z * radii.z),
                )
                .normalize();

                positions.push([p.x, p.y, p.z]);
                normals.push([n.x, n.y, n.z]);
                texture_coordinates.push([s, 1.0 - t]);
            }
        }

        let stride = columns + 1;
        let mut triangle_indices = Vec::with_capacity(usize::from(columns) * usize::from(rows) * 6);
        for j in 0..rows {
            for i in 0..columns {
                let a = j * stride + i;
                let b = a + 1;
                let c = a + stride;
                let d = c + 1;
                triangle_indices.extend_from_slice(&[a, b, c, b, d, c]);
            }
        }

        Self {
            vertices: bytemuck::cast_slice(&positions).to_vec(),
            normals: bytemuck::cast_slice(&normals).to_vec(),
            texture_coordinates: bytemuck::cast_slice(&texture_coordinates).to_vec(),
            triangle_indices,
        }
    }

    /// Borrow as a [`FaceMesh`]
    pub fn as_mesh(&self) -> FaceMesh<'_> {
        FaceMesh {
            vertices: &self.vertices,
            normals: &self.normals,
            texture_coordinates: &self.texture_coordinates,
            triangle_indices: &self.triangle_indices,
        }
    }
}

/// Face handle returned by [`SimulatedSession::tracked_faces`]
#[derive(Debug, Clone)]
pub struct SimulatedFace {
    id: u32,
    state: TrackingState,
    pose: Pose,
    mesh: Rc<FaceMeshData>,
}

impl SimulatedFace {
    /// Identifier assigned by the session
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl TrackedFace for SimulatedFace {
    fn tracking_state(&self) -> TrackingState {
        self.state
    }

    fn center_pose(&self) -> Pose {
        self.pose
    }

    fn mesh(&self) -> FaceMesh<'_> {
        self.mesh.as_mesh()
    }
}

/// Camera snapshot produced by [`SimulatedSession::update`]
#[derive(Debug, Clone)]
pub struct SimulatedFrame {
    fov_y: f32,
    aspect: f32,
    view: Mat4,
    light: LightEstimate,
    projection_override: Option<Mat4>,
}

impl FrameSnapshot for SimulatedFrame {
    fn projection_matrix(&self, near: f32, far: f32) -> Mat4 {
        self.projection_override
            .unwrap_or_else(|| Mat4::gl_perspective(self.fov_y, self.aspect, near, far))
    }

    fn view_matrix(&self) -> Mat4 {
        self.view
    }

    fn light_estimate(&self) -> LightEstimate {
        self.light
    }
}

/// Scriptable tracking session
#[derive(Debug)]
pub struct SimulatedSession {
    faces: Vec<SimulatedFace>,
    next_face_id: u32,
    camera_pose: Pose,
    fov_y: f32,
    light: LightEstimate,
    projection_override: Option<Mat4>,
    queued_failures: VecDeque<TrackingError>,
    paused: bool,
    supported: bool,
    config: Option<SessionConfig>,
    geometry: (DisplayRotation, u32, u32),
    update_count: u64,
    geometry_updates: u64,
}

impl Default for SimulatedSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSession {
    /// Empty, running session with the camera at the origin looking down -Z
    pub fn new() -> Self {
        Self {
            faces: Vec::new(),
            next_face_id: 0,
            camera_pose: Pose::identity(),
            fov_y: utils::deg_to_rad(60.0),
            light: LightEstimate::default(),
            projection_override: None,
            queued_failures: VecDeque::new(),
            paused: false,
            supported: true,
            config: None,
            geometry: (DisplayRotation::Rotation0, 0, 0),
            update_count: 0,
            geometry_updates: 0,
        }
    }

    /// Add a face and return its id
    pub fn add_face(&mut self, state: TrackingState, pose: Pose, mesh: FaceMeshData) -> u32 {
        let id = self.next_face_id;
        self.next_face_id += 1;
        self.faces.push(SimulatedFace {
            id,
            state,
            pose,
            mesh: Rc::new(mesh),
        });
        id
    }

    /// Change a face's tracking state; returns false for unknown ids
    pub fn set_face_state(&mut self, id: u32, state: TrackingState) -> bool {
        self.face_mut(id).map(|face| face.state = state).is_some()
    }

    /// Move a face; returns false for unknown ids
    pub fn set_face_pose(&mut self, id: u32, pose: Pose) -> bool {
        self.face_mut(id).map(|face| face.pose = pose).is_some()
    }

    /// Place the camera in world space
    pub fn set_camera_pose(&mut self, pose: Pose) {
        self.camera_pose = pose;
    }

    /// Use a fixed projection instead of the perspective derived from the viewport
    pub fn set_projection_override(&mut self, projection: Option<Mat4>) {
        self.projection_override = projection;
    }

    /// Light estimate reported by subsequent frames
    pub fn set_light_estimate(&mut self, light: LightEstimate) {
        self.light = light;
    }

    /// Make the next `update` call fail with `error`
    pub fn fail_next_update(&mut self, error: TrackingError) {
        self.queued_failures.push_back(error);
    }

    /// Control the result of [`TrackingSession::is_supported`]
    pub fn set_supported(&mut self, supported: bool) {
        self.supported = supported;
    }

    /// Last configuration applied
    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    /// Last display geometry received
    pub fn display_geometry(&self) -> (DisplayRotation, u32, u32) {
        self.geometry
    }

    /// Number of times display geometry was pushed
    pub fn geometry_updates(&self) -> u64 {
        self.geometry_updates
    }

    /// Number of successful updates
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Whether the session is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn face_mut(&mut self, id: u32) -> Option<&mut SimulatedFace> {
        self.faces.iter_mut().find(|face| face.id == id)
    }

    fn aspect(&self) -> f32 {
        let (_, width, height) = self.geometry;
        if width == 0 || height == 0 {
            return 1.0;
        }
        width as f32 / height as f32
    }
}

impl TrackingSession for SimulatedSession {
    type Frame = SimulatedFrame;
    type Face = SimulatedFace;

    fn is_supported(&self, _config: &SessionConfig) -> bool {
        self.supported
    }

    fn configure(&mut self, config: &SessionConfig) -> TrackingResult<()> {
        self.config = Some(config.clone());
        Ok(())
    }

    fn update(&mut self) -> TrackingResult<SimulatedFrame> {
        if self.paused {
            return Err(TrackingError::Paused);
        }
        if let Some(error) = self.queued_failures.pop_front() {
            return Err(error);
        }

        self.update_count += 1;
        Ok(SimulatedFrame {
            fov_y: self.fov_y,
            aspect: self.aspect(),
            view: self.camera_pose.inverse().to_matrix(),
            light: self.light,
            projection_override: self.projection_override,
        })
    }

    fn tracked_faces(&self) -> Vec<SimulatedFace> {
        self.faces.clone()
    }

    fn set_display_geometry(&mut self, rotation: DisplayRotation, width: u32, height: u32) {
        self.geometry = (rotation, width, height);
        self.geometry_updates += 1;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) -> TrackingResult<()> {
        self.paused = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ellipsoid_patch_is_valid() {
        let mesh = FaceMeshData::ellipsoid_patch(8, 6, Vec3::new(0.07, 0.09, 0.05));
        let view = mesh.as_mesh();
        assert!(view.validate().is_ok());
        assert_eq!(view.vertex_count(), 9 * 7);
        assert_eq!(view.index_count(), 8 * 6 * 6);

        // Center column faces the camera
        let normals: &[[f32; 3]] = bytemuck::cast_slice(&mesh.normals);
        for n in normals {
            let length = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert_relative_eq!(length, 1.0, epsilon = 1e-5);
            assert!(n[2] > 0.0);
        }
    }

    #[test]
    fn test_queued_failure_then_recovery() {
        let mut session = SimulatedSession::new();
        session.fail_next_update(TrackingError::Transient("camera stall".into()));

        assert!(matches!(session.update(), Err(TrackingError::Transient(_))));
        assert!(session.update().is_ok());
        assert_eq!(session.update_count(), 1);
    }

    #[test]
    fn test_paused_session_refuses_updates() {
        let mut session = SimulatedSession::new();
        session.pause();
        assert_eq!(session.update().unwrap_err(), TrackingError::Paused);
        session.resume().unwrap();
        assert!(session.update().is_ok());
    }

    #[test]
    fn test_view_matrix_is_inverse_camera_pose() {
        let mut session = SimulatedSession::new();
        session.set_camera_pose(Pose::from_translation(Vec3::new(0.0, 0.0, 2.0)));
        let frame = session.update().unwrap();
        let p = frame.view_matrix().transform_point(&nalgebra::Point3::origin());
        assert_relative_eq!(p.z, -2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_face_state_updates() {
        let mut session = SimulatedSession::new();
        let id = session.add_face(
            TrackingState::Paused,
            Pose::identity(),
            FaceMeshData::triangle([[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]),
        );
        assert!(session.set_face_state(id, TrackingState::Tracking));
        assert!(!session.set_face_state(id + 1, TrackingState::Tracking));
        assert_eq!(session.tracked_faces()[0].tracking_state(), TrackingState::Tracking);
    }
}
