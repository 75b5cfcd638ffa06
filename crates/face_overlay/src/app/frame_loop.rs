//! # Frame Loop Controller
//!
//! Host-facing driver of the face overlay. The host forwards its surface callbacks
//! (created, changed, draw, destroyed) and lifecycle events (pause, resume, display
//! rotation) and the controller turns each display refresh into one tracking update and
//! one draw per tracked face.
//!
//! ## Failure policy
//!
//! Only startup can fail fatally ([`FrameLoop::start`], [`FrameLoop::on_surface_created`]).
//! [`FrameLoop::on_draw_frame`] never returns an error: a failed tracking update or a
//! rejected face is logged, and the next frame starts from scratch.

use crate::assets::AssetProvider;
use crate::core::config::RenderSettings;
use crate::render::{AugmentedFaceRenderer, ClearMask, GraphicsContext, RenderResult};
use crate::tracking::{
    configure_session, DisplayRotation, DisplayRotationHelper, FrameSnapshot,
    LightEstimateState, SessionConfig, SessionUnavailable, TrackedFace, TrackingResult,
    TrackingSession, TrackingState,
};

/// What a single [`FrameLoop::on_draw_frame`] call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No tracking session; only cleared
    Idle,
    /// Host paused the loop; only cleared
    Paused,
    /// Tracking update failed; only cleared
    Skipped,
    /// Update succeeded and faces were processed
    Rendered {
        /// Faces in state Tracking that were drawn
        faces_drawn: usize,
        /// Faces not drawn (not tracking, or rejected by the renderer)
        faces_skipped: usize,
    },
}

/// Running counters across frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Calls to `on_draw_frame`
    pub frames: u64,
    /// Frames with no session
    pub idle: u64,
    /// Frames while paused
    pub paused: u64,
    /// Frames whose tracking update failed
    pub skipped: u64,
    /// Frames that reached face enumeration
    pub rendered: u64,
    /// Total faces drawn
    pub faces_drawn: u64,
    /// Total faces passed over because they were not tracking
    pub faces_not_tracking: u64,
    /// Total draws rejected by the renderer
    pub draw_failures: u64,
}

/// Per-frame orchestration of tracking and face rendering
pub struct FrameLoop<S: TrackingSession> {
    session: Option<S>,
    renderer: AugmentedFaceRenderer,
    rotation: DisplayRotationHelper,
    settings: RenderSettings,
    paused: bool,
    stats: FrameStats,
}

impl<S: TrackingSession> FrameLoop<S> {
    /// Controller around an already configured session, or none (idle)
    pub fn new(session: Option<S>, settings: RenderSettings) -> Self {
        let mut rotation = DisplayRotationHelper::new();
        rotation.on_resume();
        Self {
            session,
            renderer: AugmentedFaceRenderer::new(),
            rotation,
            settings,
            paused: false,
            stats: FrameStats::default(),
        }
    }

    /// Configure a freshly created session and wrap it
    ///
    /// `session` is the outcome of the provider's session constructor. Any failure is
    /// fatal; show [`SessionUnavailable::user_message`] to the user.
    pub fn start(
        session: Result<S, SessionUnavailable>,
        session_config: &SessionConfig,
        settings: RenderSettings,
    ) -> Result<Self, SessionUnavailable> {
        let mut session = session.map_err(|reason| {
            log::error!("Failed to create tracking session: {}", reason);
            reason
        })?;
        configure_session(&mut session, session_config)?;
        Ok(Self::new(Some(session), settings))
    }

    /// Surface created: set the clear color and build the renderer
    pub fn on_surface_created(
        &mut self,
        gl: &mut dyn GraphicsContext,
        assets: &dyn AssetProvider,
    ) -> RenderResult<()> {
        gl.clear_color(self.settings.clear_color);

        self.renderer
            .create_on_gl_thread(gl, assets, &self.settings.texture_asset)?;
        if let Some(material) = self.settings.material {
            self.renderer.set_material_properties(
                material.ambient,
                material.diffuse,
                material.specular,
                material.specular_power,
            );
        }
        Ok(())
    }

    /// Surface resized
    pub fn on_surface_changed(&mut self, gl: &mut dyn GraphicsContext, width: u32, height: u32) {
        self.rotation.on_surface_changed(width, height);
        gl.viewport(0, 0, width, height);
    }

    /// Display orientation changed
    pub fn on_display_rotated(&mut self, rotation: DisplayRotation) {
        self.rotation.on_display_changed(rotation);
    }

    /// Surface about to be destroyed: release GPU state
    pub fn on_surface_destroyed(&mut self, gl: &mut dyn GraphicsContext) {
        self.renderer.release(gl);
    }

    /// Stop drawing, then pause the session
    pub fn on_pause(&mut self) {
        self.rotation.on_pause();
        self.paused = true;
        if let Some(session) = self.session.as_mut() {
            session.pause();
        }
        log::info!("Frame loop paused");
    }

    /// Resume the session, then resume drawing
    ///
    /// If the session fails to resume the loop stays paused.
    pub fn on_resume(&mut self) -> TrackingResult<()> {
        if let Some(session) = self.session.as_mut() {
            session.resume()?;
        }
        self.rotation.on_resume();
        self.paused = false;
        log::info!("Frame loop resumed");
        Ok(())
    }

    /// Drop the session; subsequent frames are idle
    pub fn close_session(&mut self) -> Option<S> {
        self.session.take()
    }

    /// Render one display refresh. Never fails.
    pub fn on_draw_frame(&mut self, gl: &mut dyn GraphicsContext) -> FrameOutcome {
        // Clear screen so the driver does not load pixels from the previous frame
        gl.clear(ClearMask::COLOR | ClearMask::DEPTH);
        self.stats.frames += 1;

        if self.paused {
            self.stats.paused += 1;
            return FrameOutcome::Paused;
        }
        let Some(session) = self.session.as_mut() else {
            self.stats.idle += 1;
            return FrameOutcome::Idle;
        };

        self.rotation.update_session_if_needed(session);

        let frame = match session.update() {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Tracking update failed on the rendering thread: {}", e);
                self.stats.skipped += 1;
                return FrameOutcome::Skipped;
            }
        };

        let projection = frame.projection_matrix(self.settings.near_clip, self.settings.far_clip);
        let view = frame.view_matrix();
        let light = frame.light_estimate();
        if light.state == LightEstimateState::NotValid {
            log::trace!("Light estimate not valid this frame");
        }
        let color_correction = light.color_correction;

        let mut faces_drawn = 0;
        let mut faces_skipped = 0;
        for face in session.tracked_faces() {
            let state = face.tracking_state();
            if state != TrackingState::Tracking {
                log::trace!("Skipping face in state {:?}", state);
                faces_skipped += 1;
                self.stats.faces_not_tracking += 1;
                continue;
            }

            let model = face.center_pose().to_matrix();
            match self
                .renderer
                .draw(gl, &projection, &view, &model, &color_correction, &face)
            {
                Ok(_) => faces_drawn += 1,
                Err(e) => {
                    log::error!("Failed to draw tracked face: {}", e);
                    faces_skipped += 1;
                    self.stats.draw_failures += 1;
                }
            }
        }

        self.stats.rendered += 1;
        self.stats.faces_drawn += faces_drawn as u64;
        FrameOutcome::Rendered {
            faces_drawn,
            faces_skipped,
        }
    }

    /// Face renderer
    pub fn renderer(&self) -> &AugmentedFaceRenderer {
        &self.renderer
    }

    /// Face renderer, for material changes
    pub fn renderer_mut(&mut self) -> &mut AugmentedFaceRenderer {
        &mut self.renderer
    }

    /// Tracking session, if any
    pub fn session(&self) -> Option<&S> {
        self.session.as_ref()
    }

    /// Tracking session, if any
    pub fn session_mut(&mut self) -> Option<&mut S> {
        self.session.as_mut()
    }

    /// Whether drawing is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Counters so far
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Active render settings
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::foundation::math::{Pose, Vec3};
    use crate::render::backends::recording::{GlCommand, RecordingContext, UniformValue};
    use crate::render::MaterialProperties;
    use crate::tracking::simulated::{FaceMeshData, SimulatedSession};
    use crate::tracking::{LightEstimate, TrackingError};

    fn triangle() -> FaceMeshData {
        FaceMeshData::triangle([[0.0, 0.0, 0.0], [0.1, 0.0, 0.0], [0.0, 0.1, 0.0]])
    }

    fn face_at(z: f32) -> Pose {
        Pose::from_translation(Vec3::new(0.0, 0.0, z))
    }

    fn running_loop(session: SimulatedSession) -> (FrameLoop<SimulatedSession>, RecordingContext) {
        let mut gl = RecordingContext::new();
        let mut frame_loop = FrameLoop::new(Some(session), RenderSettings::default());
        frame_loop.on_surface_created(&mut gl, &MemoryAssets::new()).unwrap();
        frame_loop.on_surface_changed(&mut gl, 640, 480);
        gl.clear_log();
        (frame_loop, gl)
    }

    #[test]
    fn test_idle_without_session() {
        let mut gl = RecordingContext::new();
        let mut frame_loop: FrameLoop<SimulatedSession> = FrameLoop::new(None, RenderSettings::default());

        assert_eq!(frame_loop.on_draw_frame(&mut gl), FrameOutcome::Idle);
        assert_eq!(gl.commands(), &[GlCommand::Clear(ClearMask::COLOR | ClearMask::DEPTH)]);
        assert_eq!(frame_loop.stats().idle, 1);
    }

    #[test]
    fn test_draws_every_tracking_face() {
        let mut session = SimulatedSession::new();
        // Tracking face first: drawing must not stop there
        session.add_face(TrackingState::Tracking, face_at(-0.5), triangle());
        session.add_face(TrackingState::Paused, face_at(-0.6), triangle());
        session.add_face(TrackingState::Tracking, face_at(-0.7), triangle());
        session.add_face(TrackingState::Stopped, face_at(-0.8), triangle());
        let (mut frame_loop, mut gl) = running_loop(session);

        let outcome = frame_loop.on_draw_frame(&mut gl);

        assert_eq!(outcome, FrameOutcome::Rendered { faces_drawn: 2, faces_skipped: 2 });
        assert_eq!(gl.draws().len(), 2);
    }

    #[test]
    fn test_model_matrix_comes_from_center_pose() {
        let mut session = SimulatedSession::new();
        let pose = face_at(-0.5);
        session.add_face(TrackingState::Tracking, pose, triangle());
        session.set_projection_override(Some(crate::foundation::math::Mat4::identity()));
        let (mut frame_loop, mut gl) = running_loop(session);

        frame_loop.on_draw_frame(&mut gl);

        let clip = gl.draws()[0].clip_space_positions("a_Position", "u_ModelViewProjection");
        approx::assert_relative_eq!(clip[0].z, -0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_tracking_failure_skips_frame_and_recovers() {
        let mut session = SimulatedSession::new();
        session.add_face(TrackingState::Tracking, face_at(-0.5), triangle());
        session.fail_next_update(TrackingError::Transient("sensor timeout".into()));
        let (mut frame_loop, mut gl) = running_loop(session);

        assert_eq!(frame_loop.on_draw_frame(&mut gl), FrameOutcome::Skipped);
        assert!(gl.draws().is_empty());
        assert!(matches!(frame_loop.on_draw_frame(&mut gl), FrameOutcome::Rendered { faces_drawn: 1, .. }));

        let stats = frame_loop.stats();
        assert_eq!((stats.frames, stats.skipped, stats.rendered), (2, 1, 1));
    }

    #[test]
    fn test_invalid_mesh_does_not_stop_other_faces() {
        let mut session = SimulatedSession::new();
        let mut broken = triangle();
        broken.triangle_indices = vec![0, 1, 9];
        session.add_face(TrackingState::Tracking, face_at(-0.5), broken);
        session.add_face(TrackingState::Tracking, face_at(-0.6), triangle());
        let (mut frame_loop, mut gl) = running_loop(session);

        let outcome = frame_loop.on_draw_frame(&mut gl);
        assert_eq!(outcome, FrameOutcome::Rendered { faces_drawn: 1, faces_skipped: 1 });
        assert_eq!(frame_loop.stats().draw_failures, 1);
        assert!(gl.depth_write_enabled());
    }

    #[test]
    fn test_rotation_reconciled_before_update() {
        let (mut frame_loop, mut gl) = running_loop(SimulatedSession::new());
        frame_loop.on_draw_frame(&mut gl);
        let sent = frame_loop.session().unwrap().geometry_updates();

        frame_loop.on_display_rotated(DisplayRotation::Rotation90);
        frame_loop.on_draw_frame(&mut gl);

        let session = frame_loop.session().unwrap();
        assert_eq!(session.geometry_updates(), sent + 1);
        assert_eq!(session.display_geometry(), (DisplayRotation::Rotation90, 640, 480));
    }

    #[test]
    fn test_rotation_while_paused_applied_after_resume() {
        let (mut frame_loop, mut gl) = running_loop(SimulatedSession::new());
        frame_loop.on_draw_frame(&mut gl);

        frame_loop.on_pause();
        frame_loop.on_display_rotated(DisplayRotation::Rotation90);
        frame_loop.on_surface_changed(&mut gl, 480, 640);
        frame_loop.on_draw_frame(&mut gl);
        assert_eq!(
            frame_loop.session().unwrap().display_geometry(),
            (DisplayRotation::Rotation0, 640, 480)
        );

        frame_loop.on_resume().unwrap();
        for _ in 0..5 {
            frame_loop.on_draw_frame(&mut gl);
        }
        assert_eq!(
            frame_loop.session().unwrap().display_geometry(),
            (DisplayRotation::Rotation90, 480, 640)
        );
    }

    #[test]
    fn test_invalid_light_estimate_still_color_corrects() {
        let mut session = SimulatedSession::new();
        session.add_face(TrackingState::Tracking, face_at(-0.5), triangle());
        session.set_light_estimate(LightEstimate {
            state: LightEstimateState::NotValid,
            pixel_intensity: 0.0,
            color_correction: [0.25, 0.5, 0.75, 0.4],
        });
        let (mut frame_loop, mut gl) = running_loop(session);

        frame_loop.on_draw_frame(&mut gl);

        assert_eq!(
            gl.draws()[0].uniform("u_ColorCorrectionParameters"),
            Some(&UniformValue::Vec4([0.25, 0.5, 0.75, 0.4]))
        );
    }

    #[test]
    fn test_pause_and_resume_order() {
        let mut session = SimulatedSession::new();
        session.add_face(TrackingState::Tracking, face_at(-0.5), triangle());
        let (mut frame_loop, mut gl) = running_loop(session);

        frame_loop.on_pause();
        assert!(frame_loop.session().unwrap().is_paused());
        assert_eq!(frame_loop.on_draw_frame(&mut gl), FrameOutcome::Paused);
        assert_eq!(frame_loop.session().unwrap().update_count(), 0);

        frame_loop.on_resume().unwrap();
        assert!(!frame_loop.session().unwrap().is_paused());
        assert!(matches!(frame_loop.on_draw_frame(&mut gl), FrameOutcome::Rendered { .. }));
    }

    #[test]
    fn test_surface_created_applies_settings() {
        let mut gl = RecordingContext::new();
        let mut frame_loop: FrameLoop<SimulatedSession> = FrameLoop::new(None, RenderSettings::default());
        frame_loop.on_surface_created(&mut gl, &MemoryAssets::new()).unwrap();

        assert_eq!(gl.current_clear_color(), [0.1, 0.1, 0.1, 1.0]);
        assert_eq!(frame_loop.renderer().material(), MaterialProperties::new(0.0, 1.0, 0.1, 6.0));
        assert!(frame_loop.renderer().is_initialized());

        frame_loop.on_surface_destroyed(&mut gl);
        assert!(!frame_loop.renderer().is_initialized());
    }

    #[test]
    fn test_start_reports_unsupported_device() {
        let mut session = SimulatedSession::new();
        session.set_supported(false);
        let result = FrameLoop::start(Ok(session), &SessionConfig::default(), RenderSettings::default());
        assert_eq!(result.err(), Some(SessionUnavailable::DeviceNotSupported));

        let result: Result<FrameLoop<SimulatedSession>, _> = FrameLoop::start(
            Err(SessionUnavailable::ServiceNotInstalled),
            &SessionConfig::default(),
            RenderSettings::default(),
        );
        assert_eq!(result.err().map(|e| e.user_message()), Some("Please install ARCore".to_string()));
    }

    #[test]
    fn test_shader_failure_is_fatal_at_startup() {
        let mut gl = RecordingContext::new();
        gl.fail_link(true);
        let mut frame_loop: FrameLoop<SimulatedSession> = FrameLoop::new(None, RenderSettings::default());
        assert!(frame_loop.on_surface_created(&mut gl, &MemoryAssets::new()).is_err());
    }
}
