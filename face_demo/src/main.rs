//! Face overlay demo application
//!
//! Runs the frame loop headless against the simulated tracking provider and a
//! command-recording graphics context, then reports what was drawn.

use face_overlay::assets::{AssetProvider, DirectoryAssets, MemoryAssets};
use face_overlay::config::{Config, ConfigError};
use face_overlay::foundation::logging;
use face_overlay::foundation::math::{utils, Pose, Quat, Vec3};
use face_overlay::render::{RecordingContext, RenderError};
use face_overlay::tracking::simulated::{FaceMeshData, SimulatedSession};
use face_overlay::tracking::{
    DisplayRotation, SessionConfig, SessionUnavailable, TrackingError, TrackingState,
};
use face_overlay::app::{FrameLoop, FrameOutcome};
use face_overlay::core::config::OverlayConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

const SURFACE_WIDTH: u32 = 1080;
const SURFACE_HEIGHT: u32 = 1920;

/// Demo host errors
#[derive(Error, Debug)]
pub enum DemoError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tracking is not available on this device
    #[error("{}", .0.user_message())]
    Unavailable(#[from] SessionUnavailable),

    /// Renderer could not be created
    #[error("Renderer error: {0}")]
    Render(#[from] RenderError),

    /// Fallback texture could not be encoded
    #[error("Texture generation failed: {0}")]
    Texture(#[from] image::ImageError),
}

pub struct DemoApp {
    config: OverlayConfig,
    frame_loop: FrameLoop<SimulatedSession>,
    gl: RecordingContext,
    face_ids: Vec<u32>,
    rng: StdRng,
}

impl DemoApp {
    pub fn new(config: OverlayConfig) -> Result<Self, DemoError> {
        log::info!("Creating simulated tracking session...");
        let mut session = SimulatedSession::new();
        session.set_camera_pose(Pose::identity());

        let mesh = FaceMeshData::ellipsoid_patch(24, 32, Vec3::new(0.075, 0.1, 0.06));
        let count = config.demo.faces.max(1);
        let face_ids = (0..count)
            .map(|i| {
                let offset = (i as f32 - (count - 1) as f32 * 0.5) * 0.2;
                let pose = Pose::from_translation(Vec3::new(offset, 0.0, -0.6));
                session.add_face(TrackingState::Tracking, pose, mesh.clone())
            })
            .collect();

        let frame_loop = FrameLoop::start(Ok(session), &SessionConfig::default(), config.render.clone())?;

        Ok(Self {
            config,
            frame_loop,
            gl: RecordingContext::new(),
            face_ids,
            rng: StdRng::seed_from_u64(7),
        })
    }

    pub fn initialize(&mut self) -> Result<(), DemoError> {
        let texture = &self.config.render.texture_asset;
        let directory = DirectoryAssets::new(self.config.assets.root.clone());
        let assets: Box<dyn AssetProvider> = if directory.root().join(texture).is_file() {
            log::info!("Using texture {} from {:?}", texture, directory.root());
            Box::new(directory)
        } else {
            log::warn!("Texture {} not found under {:?}, generating one", texture, directory.root());
            Box::new(MemoryAssets::new().with(texture.clone(), freckle_texture(&mut self.rng, 256)?))
        };

        self.frame_loop.on_surface_created(&mut self.gl, assets.as_ref())?;
        self.frame_loop
            .on_surface_changed(&mut self.gl, SURFACE_WIDTH, SURFACE_HEIGHT);
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), DemoError> {
        let frames = self.config.demo.frames;
        log::info!("Running {} frames...", frames);

        for frame in 0..frames {
            self.script_frame(frame, frames);

            let outcome = self.frame_loop.on_draw_frame(&mut self.gl);
            match outcome {
                FrameOutcome::Rendered { faces_drawn, faces_skipped } => log::debug!(
                    "Frame {}: drew {} faces, skipped {}",
                    frame,
                    faces_drawn,
                    faces_skipped
                ),
                other => log::debug!("Frame {}: {:?}", frame, other),
            }
        }

        let stats = self.frame_loop.stats();
        log::info!(
            "Finished: {} frames, {} rendered, {} skipped, {} paused, {} faces drawn, {} not tracking",
            stats.frames,
            stats.rendered,
            stats.skipped,
            stats.paused,
            stats.faces_drawn,
            stats.faces_not_tracking
        );
        log::info!("Recorded {} draw calls", self.gl.draws().len());
        for error in self.gl.errors() {
            log::warn!("Graphics context error: {}", error);
        }
        Ok(())
    }

    pub fn cleanup(&mut self) {
        self.frame_loop.on_surface_destroyed(&mut self.gl);
        self.frame_loop.close_session();
        log::info!("Demo cleaned up");
    }

    /// Head motion, tracking loss, dropped camera frames and lifecycle events
    fn script_frame(&mut self, frame: u32, frames: u32) {
        let t = frame as f32 / 30.0;

        if frame == frames / 2 {
            log::info!("Rotating display to landscape");
            self.frame_loop.on_display_rotated(DisplayRotation::Rotation90);
            self.frame_loop
                .on_surface_changed(&mut self.gl, SURFACE_HEIGHT, SURFACE_WIDTH);
        }
        if frame == frames / 3 {
            self.frame_loop.on_pause();
        }
        if frame == frames / 3 + 5 {
            if let Err(e) = self.frame_loop.on_resume() {
                log::error!("Failed to resume: {}", e);
            }
        }

        let Some(session) = self.frame_loop.session_mut() else {
            return;
        };

        if self.rng.gen_bool(0.05) {
            session.fail_next_update(TrackingError::Transient("camera frame dropped".to_string()));
        }

        let count = self.face_ids.len();
        for (i, &id) in self.face_ids.iter().enumerate() {
            let offset = (i as f32 - (count - 1) as f32 * 0.5) * 0.2;
            let yaw = utils::deg_to_rad(20.0) * (t + i as f32).sin();
            let jitter = Vec3::new(
                self.rng.gen_range(-0.002..0.002),
                self.rng.gen_range(-0.002..0.002),
                self.rng.gen_range(-0.002..0.002),
            );
            let pose = Pose::new(
                Vec3::new(offset, 0.02 * t.sin(), -0.6) + jitter,
                Quat::from_axis_angle(&Vec3::y_axis(), yaw),
            );
            session.set_face_pose(id, pose);

            let state = if self.rng.gen_bool(0.1) {
                TrackingState::Paused
            } else {
                TrackingState::Tracking
            };
            session.set_face_state(id, state);
        }
    }
}

/// Transparent texture with scattered translucent freckles
fn freckle_texture(rng: &mut StdRng, size: u32) -> Result<Vec<u8>, image::ImageError> {
    let mut img = image::RgbaImage::from_pixel(size, size, image::Rgba([0, 0, 0, 0]));
    for _ in 0..size {
        let (cx, cy) = (rng.gen_range(0..size), rng.gen_range(0..size));
        let radius = rng.gen_range(1..4_i32);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                let x = (cx as i32 + dx).clamp(0, size as i32 - 1) as u32;
                let y = (cy as i32 + dy).clamp(0, size as i32 - 1) as u32;
                img.put_pixel(x, y, image::Rgba([120, 70, 40, 160]));
            }
        }
    }

    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

/// Load the config file, falling back to defaults when it does not exist
fn load_config(path: &str) -> Result<OverlayConfig, DemoError> {
    let config = OverlayConfig::load_or_default(path)?;
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "overlay.toml".to_string());
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return Err(e.into());
        }
    };

    logging::init_with_level(&config.demo.log_level);
    log::info!("Starting face overlay demo (config: {})", config_path);

    let mut app = match DemoApp::new(config) {
        Ok(app) => app,
        Err(DemoError::Unavailable(reason)) => {
            eprintln!("{}", reason.user_message());
            return Err(DemoError::Unavailable(reason).into());
        }
        Err(e) => return Err(e.into()),
    };

    let result = app.initialize().and_then(|()| app.run());
    app.cleanup();

    match result {
        Ok(()) => {
            log::info!("Face overlay demo finished successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Application error: {:?}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("face_demo_{}_{}.toml", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let config = load_config("does/not/exist/overlay.toml").unwrap();
        assert_eq!(config, OverlayConfig::default());
    }

    #[test]
    fn test_invalid_config_is_demo_error() {
        let path = write_config("invalid", "[render]\nnear_clip = -1.0\n");
        let result = load_config(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(DemoError::Config(ConfigError::Invalid(_)))));
    }

    #[test]
    fn test_unparseable_config_is_demo_error() {
        let path = write_config("garbled", "[render\nnear_clip = ");
        let result = load_config(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(DemoError::Config(ConfigError::Parse(_)))));
    }
}
