//! Material parameters for face lighting

use serde::{Serialize, Deserialize};

/// Lighting response of the face surface
///
/// Packed into a single vec4 uniform as (ambient, diffuse, specular, specular_power).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    /// Ambient term
    pub ambient: f32,
    /// Diffuse term
    pub diffuse: f32,
    /// Specular term
    pub specular: f32,
    /// Specular exponent
    pub specular_power: f32,
}

impl MaterialProperties {
    /// Create material properties
    pub const fn new(ambient: f32, diffuse: f32, specular: f32, specular_power: f32) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            specular_power,
        }
    }

    /// Uniform layout
    pub fn as_vec4(&self) -> [f32; 4] {
        [self.ambient, self.diffuse, self.specular, self.specular_power]
    }

    /// Whether every component is finite
    pub fn is_finite(&self) -> bool {
        self.as_vec4().iter().all(|v| v.is_finite())
    }
}

impl Default for MaterialProperties {
    fn default() -> Self {
        Self::new(0.3, 1.0, 1.0, 6.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let m = MaterialProperties::default();
        assert_eq!(m.as_vec4(), [0.3, 1.0, 1.0, 6.0]);
        assert!(m.is_finite());
    }
}
