//! Display rotation tracking
//!
//! Orientation and viewport changes arrive from the host between frames. They are only
//! pushed to the tracking session at the start of the next frame, before the update is
//! requested, so the projection for that frame matches the display.

use super::TrackingSession;

/// Display orientation relative to the device's natural orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayRotation {
    /// Natural orientation
    #[default]
    Rotation0,
    /// Rotated 90 degrees
    Rotation90,
    /// Rotated 180 degrees
    Rotation180,
    /// Rotated 270 degrees
    Rotation270,
}

impl DisplayRotation {
    /// Rotation in degrees
    pub fn degrees(self) -> u32 {
        match self {
            Self::Rotation0 => 0,
            Self::Rotation90 => 90,
            Self::Rotation180 => 180,
            Self::Rotation270 => 270,
        }
    }
}

/// Collects display changes and forwards them to the session once per frame
#[derive(Debug, Default)]
pub struct DisplayRotationHelper {
    rotation: DisplayRotation,
    viewport: (u32, u32),
    pending: bool,
    listening: bool,
}

impl DisplayRotationHelper {
    /// Create a helper with no viewport yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume forwarding geometry to the session
    ///
    /// The latest geometry is re-sent on the next frame.
    pub fn on_resume(&mut self) {
        self.listening = true;
        self.pending = true;
    }

    /// Hold back geometry updates until resumed; changes are still recorded
    pub fn on_pause(&mut self) {
        self.listening = false;
    }

    /// Record a new surface size
    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.pending = true;
    }

    /// Record a display rotation event
    pub fn on_display_changed(&mut self, rotation: DisplayRotation) {
        if rotation != self.rotation {
            log::debug!(
                "Display rotation {} -> {} degrees{}",
                self.rotation.degrees(),
                rotation.degrees(),
                if self.listening { "" } else { " (paused)" }
            );
            self.rotation = rotation;
            self.pending = true;
        }
    }

    /// Whether the session has not yet seen the latest geometry
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Current rotation
    pub fn rotation(&self) -> DisplayRotation {
        self.rotation
    }

    /// Current viewport size
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Push pending geometry to the session; returns whether anything was sent
    ///
    /// Nothing is sent while paused.
    pub fn update_session_if_needed<S: TrackingSession>(&mut self, session: &mut S) -> bool {
        if !self.pending || !self.listening {
            return false;
        }
        let (width, height) = self.viewport;
        session.set_display_geometry(self.rotation, width, height);
        self.pending = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::simulated::SimulatedSession;

    #[test]
    fn test_surface_change_sent_once() {
        let mut helper = DisplayRotationHelper::new();
        let mut session = SimulatedSession::new();

        helper.on_resume();
        helper.on_surface_changed(640, 480);
        assert!(helper.update_session_if_needed(&mut session));
        assert_eq!(session.display_geometry(), (DisplayRotation::Rotation0, 640, 480));
        assert!(!helper.update_session_if_needed(&mut session));
    }

    #[test]
    fn test_rotation_while_paused_sent_on_resume() {
        let mut helper = DisplayRotationHelper::new();
        let mut session = SimulatedSession::new();
        helper.on_resume();
        helper.on_surface_changed(720, 1280);
        helper.update_session_if_needed(&mut session);

        helper.on_pause();
        helper.on_display_changed(DisplayRotation::Rotation90);
        helper.on_surface_changed(1280, 720);
        assert_eq!(helper.rotation(), DisplayRotation::Rotation90);
        assert!(!helper.update_session_if_needed(&mut session));
        assert_eq!(session.display_geometry(), (DisplayRotation::Rotation0, 720, 1280));

        helper.on_resume();
        assert!(helper.update_session_if_needed(&mut session));
        assert_eq!(session.display_geometry(), (DisplayRotation::Rotation90, 1280, 720));
    }

    #[test]
    fn test_resume_marks_pending() {
        let mut helper = DisplayRotationHelper::new();
        let mut session = SimulatedSession::new();
        helper.on_resume();
        helper.on_surface_changed(100, 200);
        helper.update_session_if_needed(&mut session);

        helper.on_pause();
        helper.on_resume();
        assert!(helper.update_session_if_needed(&mut session));
    }

    #[test]
    fn test_rotation_degrees() {
        assert_eq!(DisplayRotation::Rotation0.degrees(), 0);
        assert_eq!(DisplayRotation::Rotation270.degrees(), 270);
    }
}
