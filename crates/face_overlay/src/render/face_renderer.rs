//! # Augmented Face Renderer
//!
//! Draws one tracked face mesh per call: lit by a fixed overhead light expressed in view
//! space, textured with a premultiplied-alpha texture, color corrected by the frame's
//! light estimate and blended over the camera image without writing depth.
//!
//! ## Lifecycle
//!
//! 1. [`AugmentedFaceRenderer::create_on_gl_thread`] once the graphics context exists
//! 2. [`AugmentedFaceRenderer::draw`] for every tracked face, every frame
//! 3. [`AugmentedFaceRenderer::release`] before the context is torn down
//!
//! All three must run on the thread that owns the context.

use crate::assets::AssetProvider;
use crate::foundation::math::{normalize_vec3, to_column_major, Mat4, Vec4};
use crate::render::backend::{
    AttribLocation, BlendFactor, Capability, GraphicsContext, PrimitiveMode, ProgramId,
    TextureId, UniformLocation,
};
use crate::render::material::MaterialProperties;
use crate::render::shader::{build_program, FACE_FRAGMENT_SHADER, FACE_VERTEX_SHADER};
use crate::render::texture::load_texture;
use crate::render::{RenderError, RenderResult};
use crate::tracking::TrackedFace;

/// World-space light direction (straight up), as a direction vector
const LIGHT_DIRECTION: [f32; 4] = [0.0, 1.0, 0.0, 0.0];

/// Texture unit the face texture is sampled from
const TEXTURE_UNIT: u32 = 0;

/// Matrices and light direction derived for one draw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceTransforms {
    /// `view * model`
    pub model_view: Mat4,
    /// `projection * view * model`
    pub model_view_projection: Mat4,
    /// Light direction in view space, xyz normalized, w = 0
    pub view_light_direction: Vec4,
}

impl FaceTransforms {
    /// Compose the draw transforms
    ///
    /// `model_view` must not collapse the light direction to zero.
    pub fn compute(projection: &Mat4, view: &Mat4, model: &Mat4) -> Self {
        let model_view_projection = projection * view * model;
        let model_view = view * model;

        let mut view_light_direction = model_view * Vec4::from(LIGHT_DIRECTION);
        normalize_vec3(&mut view_light_direction);

        Self {
            model_view,
            model_view_projection,
            view_light_direction,
        }
    }

    /// Lighting uniform: view-space direction with w forced to 1
    pub fn lighting_parameters(&self) -> [f32; 4] {
        let d = &self.view_light_direction;
        [d.x, d.y, d.z, 1.0]
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct UniformTable {
    model_view: Option<UniformLocation>,
    model_view_projection: Option<UniformLocation>,
    texture: Option<UniformLocation>,
    lighting_parameters: Option<UniformLocation>,
    material_parameters: Option<UniformLocation>,
    color_correction_parameters: Option<UniformLocation>,
    tint_color: Option<UniformLocation>,
}

#[derive(Debug, Clone, Copy, Default)]
struct AttributeTable {
    position: Option<AttribLocation>,
    tex_coord: Option<AttribLocation>,
    normal: Option<AttribLocation>,
}

/// GPU-resident state owned by the renderer
#[derive(Debug)]
pub struct RenderContext {
    program: ProgramId,
    texture: TextureId,
    texture_size: Option<(u32, u32)>,
    uniforms: UniformTable,
    attributes: AttributeTable,
}

impl RenderContext {
    /// Linked face program
    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// Face texture object
    pub fn texture(&self) -> TextureId {
        self.texture
    }

    /// Size of the uploaded texture, `None` if the asset never loaded
    pub fn texture_size(&self) -> Option<(u32, u32)> {
        self.texture_size
    }
}

fn lookup_uniform(
    gl: &mut dyn GraphicsContext,
    program: ProgramId,
    name: &str,
) -> Option<UniformLocation> {
    let location = gl.uniform_location(program, name);
    if location.is_none() {
        log::warn!("Uniform {} is not active in the face program", name);
    }
    location
}

fn lookup_attribute(
    gl: &mut dyn GraphicsContext,
    program: ProgramId,
    name: &str,
) -> Option<AttribLocation> {
    let location = gl.attrib_location(program, name);
    if location.is_none() {
        log::warn!("Attribute {} is not active in the face program", name);
    }
    location
}

/// Renderer for tracked face meshes
#[derive(Debug, Default)]
pub struct AugmentedFaceRenderer {
    context: Option<RenderContext>,
    material: MaterialProperties,
}

impl AugmentedFaceRenderer {
    /// Renderer with default material and no GPU state yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the GPU state on the context's thread
    ///
    /// Shader compile or link failure is returned. A texture asset that cannot be read is
    /// logged and otherwise ignored; faces then sample an empty texture.
    pub fn create_on_gl_thread(
        &mut self,
        gl: &mut dyn GraphicsContext,
        assets: &dyn AssetProvider,
        diffuse_texture_asset: &str,
    ) -> RenderResult<()> {
        if self.context.is_some() {
            log::warn!("Face renderer recreated without release; dropping previous GPU state");
            self.release(gl);
        }

        let program = build_program(gl, FACE_VERTEX_SHADER, FACE_FRAGMENT_SHADER)?;

        let uniforms = UniformTable {
            model_view_projection: lookup_uniform(gl, program, "u_ModelViewProjection"),
            model_view: lookup_uniform(gl, program, "u_ModelView"),
            texture: lookup_uniform(gl, program, "u_Texture"),
            lighting_parameters: lookup_uniform(gl, program, "u_LightingParameters"),
            material_parameters: lookup_uniform(gl, program, "u_MaterialParameters"),
            color_correction_parameters: lookup_uniform(gl, program, "u_ColorCorrectionParameters"),
            tint_color: lookup_uniform(gl, program, "u_TintColor"),
        };
        let attributes = AttributeTable {
            position: lookup_attribute(gl, program, "a_Position"),
            tex_coord: lookup_attribute(gl, program, "a_TexCoord"),
            normal: lookup_attribute(gl, program, "a_Normal"),
        };

        gl.active_texture(TEXTURE_UNIT);
        let texture = gl.gen_texture();
        let texture_size = match load_texture(gl, assets, diffuse_texture_asset, texture) {
            Ok(size) => Some(size),
            Err(e) => {
                log::error!("Failed to read an asset file {}: {}", diffuse_texture_asset, e);
                None
            }
        };

        self.context = Some(RenderContext {
            program,
            texture,
            texture_size,
            uniforms,
            attributes,
        });
        log::info!("Face renderer created (program {:?}, texture {:?})", program, texture);
        Ok(())
    }

    /// Delete the program and texture; the renderer can be created again afterwards
    pub fn release(&mut self, gl: &mut dyn GraphicsContext) {
        if let Some(context) = self.context.take() {
            gl.delete_texture(context.texture);
            gl.delete_program(context.program);
            log::debug!("Face renderer released");
        }
    }

    /// GPU state, if created
    pub fn context(&self) -> Option<&RenderContext> {
        self.context.as_ref()
    }

    /// Whether [`AugmentedFaceRenderer::create_on_gl_thread`] has succeeded
    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    /// Current material
    pub fn material(&self) -> MaterialProperties {
        self.material
    }

    /// Replace the material used from the next draw on
    pub fn set_material_properties(
        &mut self,
        ambient: f32,
        diffuse: f32,
        specular: f32,
        specular_power: f32,
    ) {
        self.material = MaterialProperties::new(ambient, diffuse, specular, specular_power);
    }

    /// Draw one face
    ///
    /// The mesh buffers are bound in place and only read during this call. The mesh is
    /// validated before any GPU state changes; an invalid mesh is rejected with
    /// [`RenderError::InvalidMesh`] and nothing is issued.
    pub fn draw<F: TrackedFace + ?Sized>(
        &self,
        gl: &mut dyn GraphicsContext,
        projection: &Mat4,
        view: &Mat4,
        model: &Mat4,
        color_correction_rgba: &[f32; 4],
        face: &F,
    ) -> RenderResult<FaceTransforms> {
        let context = self.context.as_ref().ok_or(RenderError::NotInitialized)?;
        let mesh = face.mesh();
        mesh.validate()?;

        let transforms = FaceTransforms::compute(projection, view, model);
        let uniforms = &context.uniforms;
        let attributes = &context.attributes;

        gl.use_program(Some(context.program));
        gl.depth_mask(false);

        // Lighting environment
        set_vec4(gl, uniforms.lighting_parameters, transforms.lighting_parameters());
        set_vec4(gl, uniforms.color_correction_parameters, *color_correction_rgba);

        // Object material
        set_vec4(gl, uniforms.material_parameters, self.material.as_vec4());

        set_mat4(gl, uniforms.model_view, &transforms.model_view);
        set_mat4(gl, uniforms.model_view_projection, &transforms.model_view_projection);

        bind_attribute(gl, attributes.position, 3, mesh.vertices);
        bind_attribute(gl, attributes.normal, 3, mesh.normals);
        bind_attribute(gl, attributes.tex_coord, 2, mesh.texture_coordinates);

        gl.active_texture(TEXTURE_UNIT);
        if let Some(location) = uniforms.texture {
            gl.uniform_1i(location, TEXTURE_UNIT as i32);
        }
        gl.bind_texture(Some(context.texture));
        set_vec4(gl, uniforms.tint_color, [0.0, 0.0, 0.0, 0.0]);

        // Textures are decoded with premultiplied alpha
        gl.enable(Capability::Blend);
        gl.blend_func(BlendFactor::One, BlendFactor::OneMinusSrcAlpha);

        gl.draw_elements(PrimitiveMode::Triangles, mesh.triangle_indices);

        gl.use_program(None);
        gl.depth_mask(true);

        log::trace!(
            "Drew face mesh: {} vertices, {} indices",
            mesh.vertex_count(),
            mesh.index_count()
        );
        Ok(transforms)
    }
}

fn set_vec4(gl: &mut dyn GraphicsContext, location: Option<UniformLocation>, value: [f32; 4]) {
    if let Some(location) = location {
        gl.uniform_4f(location, value);
    }
}

fn set_mat4(gl: &mut dyn GraphicsContext, location: Option<UniformLocation>, value: &Mat4) {
    if let Some(location) = location {
        gl.uniform_matrix_4fv(location, &to_column_major(value));
    }
}

fn bind_attribute(
    gl: &mut dyn GraphicsContext,
    location: Option<AttribLocation>,
    components: u8,
    data: &[f32],
) {
    if let Some(location) = location {
        gl.enable_vertex_attrib_array(location);
        gl.vertex_attrib_pointer(location, components, data);
    }
}
