//! # Unified Configuration
//!
//! All tunables for the face overlay live here: camera clip planes, clear colour,
//! the texture asset and the material override applied after renderer creation.
//!
//! ## Example
//!
//! ```toml
//! [render]
//! near_clip = 0.1
//! far_clip = 100.0
//! texture_asset = "freckles.png"
//!
//! [render.material]
//! ambient = 0.0
//! diffuse = 1.0
//! specular = 0.1
//! specular_power = 6.0
//!
//! [assets]
//! root = "assets"
//! ```

use serde::{Serialize, Deserialize};
use std::path::PathBuf;

use crate::config::{Config, ConfigError};
use crate::render::MaterialProperties;

/// Render pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Near clip plane passed to the tracking camera projection
    pub near_clip: f32,
    /// Far clip plane; together with `near_clip` must bracket expected face distances
    pub far_clip: f32,
    /// Colour the frame is cleared to before drawing
    pub clear_color: [f32; 4],
    /// Asset name of the face texture
    pub texture_asset: String,
    /// Material applied right after the renderer is created, if any
    pub material: Option<MaterialProperties>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            near_clip: 0.1,
            far_clip: 100.0,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            texture_asset: "freckles.png".to_string(),
            material: Some(MaterialProperties::new(0.0, 1.0, 0.1, 6.0)),
        }
    }
}

/// Asset lookup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory that asset names are resolved against
    pub root: PathBuf,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
        }
    }
}

/// Settings for the headless demo host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    /// Number of frames to run before exiting
    pub frames: u32,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Number of simulated faces
    pub faces: u32,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            frames: 120,
            log_level: "info".to_string(),
            faces: 2,
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Render pipeline settings
    pub render: RenderSettings,
    /// Asset lookup settings
    pub assets: AssetSettings,
    /// Demo host settings
    pub demo: DemoSettings,
}

impl Config for OverlayConfig {}

impl OverlayConfig {
    /// Check constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let render = &self.render;
        if !(render.near_clip > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "near_clip must be positive, got {}",
                render.near_clip
            )));
        }
        if !(render.far_clip > render.near_clip) {
            return Err(ConfigError::Invalid(format!(
                "far_clip ({}) must be greater than near_clip ({})",
                render.far_clip, render.near_clip
            )));
        }
        if let Some(material) = &render.material {
            if !material.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "material override has non-finite values: {:?}",
                    material
                )));
            }
        }
        if render.texture_asset.is_empty() {
            return Err(ConfigError::Invalid("texture_asset is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_host_values() {
        let config = OverlayConfig::default();
        assert_eq!(config.render.near_clip, 0.1);
        assert_eq!(config.render.far_clip, 100.0);
        assert_eq!(config.render.clear_color, [0.1, 0.1, 0.1, 1.0]);
        assert_eq!(config.render.material, Some(MaterialProperties::new(0.0, 1.0, 0.1, 6.0)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = OverlayConfig::from_toml_str(
            r#"
            [render]
            far_clip = 10.0
            texture_asset = "mask.png"

            [demo]
            frames = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.render.far_clip, 10.0);
        assert_eq!(config.render.near_clip, 0.1);
        assert_eq!(config.render.texture_asset, "mask.png");
        assert_eq!(config.demo.frames, 5);
        assert_eq!(config.demo.log_level, "info");
    }

    #[test]
    fn test_ron_round_trip_through_file() {
        let dir = std::env::temp_dir().join(format!("face_overlay_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("overlay.ron");

        let mut config = OverlayConfig::default();
        config.render.near_clip = 0.05;
        config.save_to_file(&path).unwrap();

        let loaded = OverlayConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_validate_rejects_inverted_clip_planes() {
        let mut config = OverlayConfig::default();
        config.render.near_clip = 5.0;
        config.render.far_clip = 1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.render.near_clip = 0.0;
        config.render.far_clip = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nan_material() {
        let mut config = OverlayConfig::default();
        config.render.material = Some(MaterialProperties::new(f32::NAN, 1.0, 1.0, 6.0));
        assert!(config.validate().is_err());
    }
}
