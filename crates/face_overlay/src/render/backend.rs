//! Backend abstraction trait for the rendering system
//!
//! [`GraphicsContext`] is the immediate-mode GPU call surface the face renderer drives:
//! shader compile/link, uniform and attribute binding, texture upload and draw calls.
//! It mirrors an OpenGL ES 2.0 context closely enough that a real binding is a thin
//! wrapper, while the recording backend can log and inspect every call.
//!
//! A context is only ever used from the thread that owns it and is passed to the
//! renderer per call rather than stored.

use bitflags::bitflags;

use crate::assets::ImageData;
use crate::render::RenderError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Compiled shader object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

/// Linked program object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Active uniform location within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub u32);

/// Active vertex attribute location within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttribLocation(pub u32);

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Per-vertex stage
    Vertex,
    /// Per-fragment stage
    Fragment,
}

bitflags! {
    /// Buffers cleared by [`GraphicsContext::clear`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearMask: u32 {
        /// Color buffer
        const COLOR = 0b01;
        /// Depth buffer
        const DEPTH = 0b10;
    }
}

/// Server-side capability toggled with enable/disable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Color blending
    Blend,
    /// Depth testing
    DepthTest,
}

/// Blend equation factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// 0
    Zero,
    /// 1
    One,
    /// Source alpha
    SrcAlpha,
    /// 1 - source alpha
    OneMinusSrcAlpha,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    /// Nearest texel
    Nearest,
    /// Bilinear
    Linear,
    /// Trilinear across mip levels (minification only)
    LinearMipmapLinear,
}

/// Texture parameter set with [`GraphicsContext::tex_parameter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureParameter {
    /// Minification filter
    MinFilter,
    /// Magnification filter
    MagFilter,
}

/// Primitive assembly mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    /// Independent triangles
    Triangles,
}

/// Immediate-mode graphics context
///
/// Vertex attribute data passed to [`GraphicsContext::vertex_attrib_pointer`] is read in
/// place; it is only guaranteed to stay alive until the next draw call returns, so
/// implementations must not read it afterwards.
pub trait GraphicsContext {
    /// Set the color used by [`GraphicsContext::clear`]
    fn clear_color(&mut self, rgba: [f32; 4]);

    /// Clear the selected buffers
    fn clear(&mut self, mask: ClearMask);

    /// Set the viewport rectangle
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Compile a shader stage from GLSL source
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> BackendResult<ShaderId>;

    /// Link compiled shaders into a program
    fn link_program(&mut self, shaders: &[ShaderId]) -> BackendResult<ProgramId>;

    /// Delete a shader object
    fn delete_shader(&mut self, shader: ShaderId);

    /// Delete a program object
    fn delete_program(&mut self, program: ProgramId);

    /// Look up an active uniform; `None` if the program does not use it
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Look up an active attribute; `None` if the program does not use it
    fn attrib_location(&mut self, program: ProgramId, name: &str) -> Option<AttribLocation>;

    /// Make `program` current, or unbind with `None`
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Enable or disable depth buffer writes
    fn depth_mask(&mut self, write: bool);

    /// Enable a capability
    fn enable(&mut self, capability: Capability);

    /// Disable a capability
    fn disable(&mut self, capability: Capability);

    /// Set the blend factors
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);

    /// Set an integer uniform on the current program
    fn uniform_1i(&mut self, location: UniformLocation, value: i32);

    /// Set a vec4 uniform on the current program
    fn uniform_4f(&mut self, location: UniformLocation, value: [f32; 4]);

    /// Set a mat4 uniform on the current program from column-major data
    fn uniform_matrix_4fv(&mut self, location: UniformLocation, value: &[f32; 16]);

    /// Enable the attribute array at `location`
    fn enable_vertex_attrib_array(&mut self, location: AttribLocation);

    /// Point the attribute at tightly packed float data with `components` per vertex
    fn vertex_attrib_pointer(&mut self, location: AttribLocation, components: u8, data: &[f32]);

    /// Select the active texture unit
    fn active_texture(&mut self, unit: u32);

    /// Create a texture object
    fn gen_texture(&mut self) -> TextureId;

    /// Bind a 2D texture to the active unit, or unbind with `None`
    fn bind_texture(&mut self, texture: Option<TextureId>);

    /// Set a sampling parameter on the bound texture
    fn tex_parameter(&mut self, parameter: TextureParameter, filter: TextureFilter);

    /// Upload RGBA8 pixels to a level of the bound texture
    fn tex_image_2d(&mut self, level: u32, image: &ImageData) -> BackendResult<()>;

    /// Generate the mip chain of the bound texture
    fn generate_mipmap(&mut self);

    /// Delete a texture object
    fn delete_texture(&mut self, texture: TextureId);

    /// Draw indexed primitives with 16-bit indices
    fn draw_elements(&mut self, mode: PrimitiveMode, indices: &[u16]);
}
