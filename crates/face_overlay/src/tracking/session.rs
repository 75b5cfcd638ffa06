//! Session availability and configuration
//!
//! Startup failures are the only fatal errors in the pipeline. They surface to the user
//! as a short message and rendering never begins.

use serde::{Serialize, Deserialize};

use super::{TrackingError, TrackingSession};

/// Reason a tracking session could not be created or configured
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionUnavailable {
    /// The tracking service is not installed
    #[error("tracking service not installed")]
    ServiceNotInstalled,

    /// The installed tracking service is older than this client requires
    #[error("tracking service too old")]
    ServiceTooOld,

    /// This client was built against an older tracking SDK than the service requires
    #[error("client SDK too old")]
    SdkTooOld,

    /// The device cannot run the requested configuration
    #[error("device not supported")]
    DeviceNotSupported,

    /// Camera permission was not granted
    #[error("camera permission denied")]
    CameraPermissionDenied,

    /// Any other failure reported by the provider
    #[error("{0}")]
    Other(String),
}

impl SessionUnavailable {
    /// Message shown to the user when the feature cannot start
    pub fn user_message(&self) -> String {
        match self {
            Self::ServiceNotInstalled => "Please install ARCore".to_string(),
            Self::ServiceTooOld => "Please update ARCore".to_string(),
            Self::SdkTooOld => "Please update this app".to_string(),
            Self::DeviceNotSupported => "This device does not support AR".to_string(),
            Self::CameraPermissionDenied => {
                "Camera permission is needed to run this application".to_string()
            }
            Self::Other(message) => message.clone(),
        }
    }
}

/// Camera the session should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraFacing {
    /// Rear camera
    Back,
    /// Selfie camera
    Front,
}

/// Camera focus behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FocusMode {
    /// Fixed focus
    Fixed,
    /// Continuous autofocus
    Auto,
}

/// Session configuration requested at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Camera to track with
    pub camera_facing: CameraFacing,
    /// Focus behaviour
    pub focus_mode: FocusMode,
    /// Whether face meshes are produced
    pub augmented_faces: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            camera_facing: CameraFacing::Back,
            focus_mode: FocusMode::Auto,
            augmented_faces: true,
        }
    }
}

/// Check support and apply `config` to a freshly created session
///
/// Any failure here is fatal for the feature.
pub fn configure_session<S: TrackingSession>(
    session: &mut S,
    config: &SessionConfig,
) -> Result<(), SessionUnavailable> {
    if !session.is_supported(config) {
        log::error!("Session configuration not supported: {:?}", config);
        return Err(SessionUnavailable::DeviceNotSupported);
    }

    session.configure(config).map_err(|e| match e {
        TrackingError::Unavailable(reason) => reason,
        other => SessionUnavailable::Other(other.to_string()),
    })?;

    log::info!(
        "Tracking session configured: {:?} camera, {:?} focus",
        config.camera_facing,
        config.focus_mode
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::simulated::SimulatedSession;

    #[test]
    fn test_user_messages() {
        assert_eq!(SessionUnavailable::ServiceNotInstalled.user_message(), "Please install ARCore");
        assert_eq!(SessionUnavailable::ServiceTooOld.user_message(), "Please update ARCore");
        assert_eq!(SessionUnavailable::SdkTooOld.user_message(), "Please update this app");
        assert_eq!(
            SessionUnavailable::DeviceNotSupported.user_message(),
            "This device does not support AR"
        );
        assert_eq!(SessionUnavailable::Other("boom".into()).user_message(), "boom");
    }

    #[test]
    fn test_configure_session_unsupported() {
        let mut session = SimulatedSession::new();
        session.set_supported(false);
        assert_eq!(
            configure_session(&mut session, &SessionConfig::default()),
            Err(SessionUnavailable::DeviceNotSupported)
        );
    }

    #[test]
    fn test_configure_session_applies_config() {
        let mut session = SimulatedSession::new();
        let config = SessionConfig {
            camera_facing: CameraFacing::Front,
            ..SessionConfig::default()
        };
        configure_session(&mut session, &config).unwrap();
        assert_eq!(session.config(), Some(&config));
    }
}
