//! Math utilities and types
//!
//! Provides the matrix and vector types shared by tracking input and the face renderer.
//! All matrices follow the OpenGL convention: column vectors, column-major storage,
//! right-handed view space looking down -Z, clip-space depth in [-1, 1].

pub use nalgebra::{
    Vector3, Vector4,
    Matrix4,
    Quaternion,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Rigid transform (translation + orientation) of a tracked entity in world space
///
/// Unlike a general scene transform a pose never carries scale; converting it to a
/// matrix yields `T * R`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Position in world space
    pub translation: Vec3,

    /// Orientation in world space
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Pose at the world origin with no rotation
    pub fn identity() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }

    /// Create a pose from position and orientation
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self { translation, rotation }
    }

    /// Create a pose with only a position
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    /// Convert to a model matrix: rotation first, then translation
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.translation) * self.rotation.to_homogeneous()
    }

    /// Inverse rigid transform
    pub fn inverse(&self) -> Pose {
        let inv_rotation = self.rotation.inverse();
        Pose {
            translation: inv_rotation * (-self.translation),
            rotation: inv_rotation,
        }
    }
}

/// Normalize the xyz part of `v` in place using a reciprocal square root
///
/// The w component is left untouched. A zero-length xyz yields non-finite output;
/// callers must pass a non-degenerate vector.
pub fn normalize_vec3(v: &mut Vec4) {
    let reciprocal_length = 1.0 / (v.x * v.x + v.y * v.y + v.z * v.z).sqrt();
    v.x *= reciprocal_length;
    v.y *= reciprocal_length;
    v.z *= reciprocal_length;
}

/// Flatten a matrix into the column-major `float[16]` layout uploaded to shaders
pub fn to_column_major(m: &Mat4) -> [f32; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}

/// Build a matrix from a column-major `float[16]` array
pub fn from_column_major(values: &[f32; 16]) -> Mat4 {
    Mat4::from_column_slice(values)
}

/// Math utility functions
pub mod utils {
    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

/// Extension trait for Mat4 with GL-convention camera matrices
pub trait Mat4Ext {
    /// Create a GL perspective projection matrix (depth mapped to [-1, 1])
    fn gl_perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a GL orthographic projection matrix
    fn gl_orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn gl_perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // P = [f/a  0   0            0          ]
        //     [0    f   0            0          ]
        //     [0    0   (f+n)/(n-f)  2fn/(n-f)  ]
        //     [0    0   -1           0          ]
        let f = 1.0 / (fov_y * 0.5).tan();
        let range_inv = 1.0 / (near - far);

        let mut result = Mat4::zeros();
        result[(0, 0)] = f / aspect;
        result[(1, 1)] = f;
        result[(2, 2)] = (far + near) * range_inv;
        result[(2, 3)] = 2.0 * far * near * range_inv;
        result[(3, 2)] = -1.0;
        result
    }

    fn gl_orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let width = right - left;
        let height = top - bottom;
        let depth = far - near;

        Mat4::new(
            2.0 / width, 0.0, 0.0, -(right + left) / width,
            0.0, 2.0 / height, 0.0, -(top + bottom) / height,
            0.0, 0.0, -2.0 / depth, -(far + near) / depth,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_pose_to_matrix_translation_and_rotation() {
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2);
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), rotation);
        let m = pose.to_matrix();

        // Translation lives in the last column
        assert_relative_eq!(m[(0, 3)], 1.0, epsilon = EPSILON);
        assert_relative_eq!(m[(1, 3)], 2.0, epsilon = EPSILON);
        assert_relative_eq!(m[(2, 3)], 3.0, epsilon = EPSILON);

        // +X rotates onto +Y, then translates
        let p = m * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p, Vec4::new(1.0, 3.0, 3.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_pose_inverse_round_trip() {
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), 0.7);
        let pose = Pose::new(Vec3::new(-0.2, 0.1, -0.5), rotation);
        let product = pose.to_matrix() * pose.inverse().to_matrix();
        assert_relative_eq!(product, Mat4::identity(), epsilon = 1e-5);
    }

    #[test]
    fn test_normalize_vec3_keeps_w() {
        let mut v = Vec4::new(3.0, 0.0, 4.0, 9.0);
        normalize_vec3(&mut v);
        assert_relative_eq!(v, Vec4::new(0.6, 0.0, 0.8, 9.0), epsilon = EPSILON);
    }

    #[test]
    fn test_column_major_layout() {
        let m = Mat4::new_translation(&Vec3::new(5.0, 6.0, 7.0));
        let flat = to_column_major(&m);
        assert_eq!(&flat[12..15], &[5.0, 6.0, 7.0]);
        assert_eq!(from_column_major(&flat), m);
    }

    #[test]
    fn test_gl_perspective_maps_clip_planes() {
        let p = Mat4::gl_perspective(utils::deg_to_rad(60.0), 1.0, 0.1, 100.0);

        let near = p * Vec4::new(0.0, 0.0, -0.1, 1.0);
        assert_relative_eq!(near.z / near.w, -1.0, epsilon = 1e-4);

        let far = p * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_look_at_places_target_on_negative_z() {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let p = view * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(p, Vec4::new(0.0, 0.0, -5.0, 1.0), epsilon = 1e-5);
    }
}
