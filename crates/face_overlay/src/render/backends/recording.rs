//! Command-recording graphics context
//!
//! Implements [`GraphicsContext`] without a GPU. Every call is appended to a command log,
//! and enough state is tracked (current program, uniforms, attribute bindings, textures,
//! depth mask, blending) to snapshot each draw call for inspection. Used headless by the
//! demo host and by tests.
//!
//! Active uniforms and attributes are discovered by scanning the GLSL declarations, so
//! location lookups behave like a real driver for the shaders in this crate.

use std::collections::HashMap;

use crate::assets::ImageData;
use crate::foundation::math::{from_column_major, Vec4};
use crate::render::backend::{
    AttribLocation, BackendResult, BlendFactor, Capability, ClearMask, GraphicsContext,
    PrimitiveMode, ProgramId, ShaderId, ShaderStage, TextureFilter, TextureId,
    TextureParameter, UniformLocation,
};
use crate::render::RenderError;

/// Value stored in a uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// int / sampler
    Int(i32),
    /// vec4
    Vec4([f32; 4]),
    /// mat4, column-major
    Mat4([f32; 16]),
}

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum GlCommand {
    /// `clear_color`
    ClearColor([f32; 4]),
    /// `clear`
    Clear(ClearMask),
    /// `viewport`
    Viewport {
        /// Left
        x: i32,
        /// Bottom
        y: i32,
        /// Width
        width: u32,
        /// Height
        height: u32,
    },
    /// `compile_shader` (successful)
    CompileShader(ShaderStage, ShaderId),
    /// `link_program` (successful)
    LinkProgram(ProgramId),
    /// `delete_shader`
    DeleteShader(ShaderId),
    /// `delete_program`
    DeleteProgram(ProgramId),
    /// `use_program`
    UseProgram(Option<ProgramId>),
    /// `depth_mask`
    DepthMask(bool),
    /// `enable`
    Enable(Capability),
    /// `disable`
    Disable(Capability),
    /// `blend_func`
    BlendFunc(BlendFactor, BlendFactor),
    /// Any uniform upload
    Uniform(UniformLocation, UniformValue),
    /// `enable_vertex_attrib_array`
    EnableVertexAttribArray(AttribLocation),
    /// `vertex_attrib_pointer`
    VertexAttribPointer {
        /// Attribute
        location: AttribLocation,
        /// Components per vertex
        components: u8,
        /// Number of floats bound
        len: usize,
    },
    /// `active_texture`
    ActiveTexture(u32),
    /// `gen_texture`
    GenTexture(TextureId),
    /// `bind_texture`
    BindTexture(Option<TextureId>),
    /// `tex_parameter`
    TexParameter(TextureParameter, TextureFilter),
    /// `tex_image_2d`
    TexImage2D {
        /// Mip level
        level: u32,
        /// Width
        width: u32,
        /// Height
        height: u32,
    },
    /// `generate_mipmap`
    GenerateMipmap,
    /// `delete_texture`
    DeleteTexture(TextureId),
    /// `draw_elements`
    DrawElements {
        /// Primitive mode
        mode: PrimitiveMode,
        /// Index count
        count: usize,
    },
}

/// Attribute array state captured at bind time
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBinding {
    /// Components per vertex
    pub components: u8,
    /// Copy of the bound data
    pub data: Vec<f32>,
    /// Whether the array is enabled
    pub enabled: bool,
}

/// Texture object state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureInfo {
    /// Minification filter
    pub min_filter: Option<TextureFilter>,
    /// Magnification filter
    pub mag_filter: Option<TextureFilter>,
    /// Level 0 width, 0 if never uploaded
    pub width: u32,
    /// Level 0 height, 0 if never uploaded
    pub height: u32,
    /// Whether a mip chain was generated
    pub mipmapped: bool,
}

/// Snapshot of the pipeline state at a draw call
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// Program in use
    pub program: ProgramId,
    /// Primitive mode
    pub mode: PrimitiveMode,
    /// Index buffer contents
    pub indices: Vec<u16>,
    /// Depth writes enabled during the draw
    pub depth_write: bool,
    /// Blending enabled during the draw
    pub blend_enabled: bool,
    /// Blend factors during the draw
    pub blend_func: (BlendFactor, BlendFactor),
    /// Texture bound on the active unit
    pub texture: Option<TextureId>,
    /// Uniform values by name
    pub uniforms: HashMap<String, UniformValue>,
    /// Enabled attribute arrays by name
    pub attributes: HashMap<String, AttributeBinding>,
}

impl DrawRecord {
    /// Uniform value by name
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    /// Attribute binding by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeBinding> {
        self.attributes.get(name)
    }

    /// Run the position attribute of every vertex through a mat4 uniform
    ///
    /// Returns an empty list if either is missing.
    pub fn clip_space_positions(&self, position_attribute: &str, matrix_uniform: &str) -> Vec<Vec4> {
        let (Some(binding), Some(UniformValue::Mat4(matrix))) =
            (self.attribute(position_attribute), self.uniform(matrix_uniform))
        else {
            return Vec::new();
        };
        let matrix = from_column_major(matrix);
        let components = usize::from(binding.components.max(1));

        binding
            .data
            .chunks_exact(components)
            .map(|v| {
                let mut p = Vec4::new(0.0, 0.0, 0.0, 1.0);
                for (i, value) in v.iter().take(4).enumerate() {
                    p[i] = *value;
                }
                matrix * p
            })
            .collect()
    }
}

#[derive(Debug)]
struct ShaderObject {
    stage: ShaderStage,
    source: String,
}

#[derive(Debug, Default)]
struct ProgramObject {
    uniforms: Vec<String>,
    attributes: Vec<String>,
    values: HashMap<UniformLocation, UniformValue>,
}

/// Graphics context that records instead of rendering
#[derive(Debug)]
pub struct RecordingContext {
    commands: Vec<GlCommand>,
    draws: Vec<DrawRecord>,
    errors: Vec<String>,

    next_id: u32,
    shaders: HashMap<ShaderId, ShaderObject>,
    programs: HashMap<ProgramId, ProgramObject>,
    textures: HashMap<TextureId, TextureInfo>,

    current_program: Option<ProgramId>,
    depth_write: bool,
    blend_enabled: bool,
    depth_test_enabled: bool,
    blend_func: (BlendFactor, BlendFactor),
    clear_color: [f32; 4],
    viewport: (i32, i32, u32, u32),
    active_unit: u32,
    bound_textures: HashMap<u32, TextureId>,
    attributes: HashMap<AttribLocation, AttributeBinding>,

    fail_compile: Option<ShaderStage>,
    fail_link: bool,
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingContext {
    /// Fresh context with GL default state
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            draws: Vec::new(),
            errors: Vec::new(),
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            current_program: None,
            depth_write: true,
            blend_enabled: false,
            depth_test_enabled: false,
            blend_func: (BlendFactor::One, BlendFactor::Zero),
            clear_color: [0.0; 4],
            viewport: (0, 0, 0, 0),
            active_unit: 0,
            bound_textures: HashMap::new(),
            attributes: HashMap::new(),
            fail_compile: None,
            fail_link: false,
        }
    }

    /// Make compilation of `stage` fail from now on
    pub fn fail_compile(&mut self, stage: Option<ShaderStage>) {
        self.fail_compile = stage;
    }

    /// Make linking fail from now on
    pub fn fail_link(&mut self, fail: bool) {
        self.fail_link = fail;
    }

    /// Every call so far
    pub fn commands(&self) -> &[GlCommand] {
        &self.commands
    }

    /// Every draw so far
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Invalid operations observed (GL errors)
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Forget recorded commands and draws; GPU objects and state are kept
    pub fn clear_log(&mut self) {
        self.commands.clear();
        self.draws.clear();
    }

    /// Number of `clear` calls in the log
    pub fn clear_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, GlCommand::Clear(_)))
            .count()
    }

    /// Program in use
    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    /// Depth write mask
    pub fn depth_write_enabled(&self) -> bool {
        self.depth_write
    }

    /// Whether depth testing is enabled
    pub fn depth_test_enabled(&self) -> bool {
        self.depth_test_enabled
    }

    /// Current clear color
    pub fn current_clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Current viewport
    pub fn current_viewport(&self) -> (i32, i32, u32, u32) {
        self.viewport
    }

    /// Texture object state, `None` if deleted or never created
    pub fn texture(&self, texture: TextureId) -> Option<&TextureInfo> {
        self.textures.get(&texture)
    }

    /// Shader objects not yet deleted
    pub fn live_shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Programs not yet deleted
    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("GL error: {}", message);
        self.errors.push(message);
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.commands.push(GlCommand::Uniform(location, value));
        let Some(program) = self.current_program else {
            self.error("uniform set with no program in use");
            return;
        };
        let stored = self
            .programs
            .get_mut(&program)
            .filter(|object| (location.0 as usize) < object.uniforms.len())
            .map(|object| object.values.insert(location, value))
            .is_some();
        if !stored {
            self.error(format!("uniform location {:?} invalid for {:?}", location, program));
        }
    }

    fn bound_texture(&self) -> Option<TextureId> {
        self.bound_textures.get(&self.active_unit).copied()
    }
}

/// Names declared with `keyword` (`uniform` or `attribute`) in GLSL source
fn declared_names(source: &str, keyword: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            if tokens.next() != Some(keyword) {
                return None;
            }
            let name = tokens.last()?.trim_end_matches(';');
            let name = name.split('[').next().unwrap_or(name);
            Some(name.to_string())
        })
        .collect()
}

impl GraphicsContext for RecordingContext {
    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
        self.commands.push(GlCommand::ClearColor(rgba));
    }

    fn clear(&mut self, mask: ClearMask) {
        self.commands.push(GlCommand::Clear(mask));
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = (x, y, width, height);
        self.commands.push(GlCommand::Viewport { x, y, width, height });
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> BackendResult<ShaderId> {
        if self.fail_compile == Some(stage) {
            return Err(RenderError::ShaderCompilation {
                stage,
                log: "compilation disabled on this context".to_string(),
            });
        }
        if !source.contains("void main") {
            return Err(RenderError::ShaderCompilation {
                stage,
                log: "ERROR: 0:1: missing main()".to_string(),
            });
        }

        let id = ShaderId(self.next_id());
        self.shaders.insert(
            id,
            ShaderObject {
                stage,
                source: source.to_string(),
            },
        );
        self.commands.push(GlCommand::CompileShader(stage, id));
        Ok(id)
    }

    fn link_program(&mut self, shaders: &[ShaderId]) -> BackendResult<ProgramId> {
        if self.fail_link {
            return Err(RenderError::ProgramLink("linking disabled on this context".to_string()));
        }

        let mut vertex = None;
        let mut fragment = None;
        for id in shaders {
            let shader = self
                .shaders
                .get(id)
                .ok_or_else(|| RenderError::ProgramLink(format!("unknown shader {:?}", id)))?;
            match shader.stage {
                ShaderStage::Vertex => vertex = Some(shader),
                ShaderStage::Fragment => fragment = Some(shader),
            }
        }
        let (Some(vertex), Some(fragment)) = (vertex, fragment) else {
            return Err(RenderError::ProgramLink(
                "program needs one vertex and one fragment shader".to_string(),
            ));
        };

        let mut uniforms = declared_names(&vertex.source, "uniform");
        for name in declared_names(&fragment.source, "uniform") {
            if !uniforms.contains(&name) {
                uniforms.push(name);
            }
        }
        let attributes = declared_names(&vertex.source, "attribute");

        let id = ProgramId(self.next_id());
        self.programs.insert(
            id,
            ProgramObject {
                uniforms,
                attributes,
                values: HashMap::new(),
            },
        );
        self.commands.push(GlCommand::LinkProgram(id));
        Ok(id)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
        self.commands.push(GlCommand::DeleteShader(shader));
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.commands.push(GlCommand::DeleteProgram(program));
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let object = self.programs.get(&program)?;
        object
            .uniforms
            .iter()
            .position(|u| u == name)
            .map(|index| UniformLocation(index as u32))
    }

    fn attrib_location(&mut self, program: ProgramId, name: &str) -> Option<AttribLocation> {
        let object = self.programs.get(&program)?;
        object
            .attributes
            .iter()
            .position(|a| a == name)
            .map(|index| AttribLocation(index as u32))
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.commands.push(GlCommand::UseProgram(program));
        match program {
            Some(id) if !self.programs.contains_key(&id) => {
                self.error(format!("use of unknown program {:?}", id));
            }
            _ => self.current_program = program,
        }
    }

    fn depth_mask(&mut self, write: bool) {
        self.depth_write = write;
        self.commands.push(GlCommand::DepthMask(write));
    }

    fn enable(&mut self, capability: Capability) {
        match capability {
            Capability::Blend => self.blend_enabled = true,
            Capability::DepthTest => self.depth_test_enabled = true,
        }
        self.commands.push(GlCommand::Enable(capability));
    }

    fn disable(&mut self, capability: Capability) {
        match capability {
            Capability::Blend => self.blend_enabled = false,
            Capability::DepthTest => self.depth_test_enabled = false,
        }
        self.commands.push(GlCommand::Disable(capability));
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.blend_func = (src, dst);
        self.commands.push(GlCommand::BlendFunc(src, dst));
    }

    fn uniform_1i(&mut self, location: UniformLocation, value: i32) {
        self.set_uniform(location, UniformValue::Int(value));
    }

    fn uniform_4f(&mut self, location: UniformLocation, value: [f32; 4]) {
        self.set_uniform(location, UniformValue::Vec4(value));
    }

    fn uniform_matrix_4fv(&mut self, location: UniformLocation, value: &[f32; 16]) {
        self.set_uniform(location, UniformValue::Mat4(*value));
    }

    fn enable_vertex_attrib_array(&mut self, location: AttribLocation) {
        self.attributes
            .entry(location)
            .or_insert_with(|| AttributeBinding {
                components: 4,
                data: Vec::new(),
                enabled: false,
            })
            .enabled = true;
        self.commands.push(GlCommand::EnableVertexAttribArray(location));
    }

    fn vertex_attrib_pointer(&mut self, location: AttribLocation, components: u8, data: &[f32]) {
        let binding = self.attributes.entry(location).or_insert_with(|| AttributeBinding {
            components,
            data: Vec::new(),
            enabled: false,
        });
        binding.components = components;
        binding.data = data.to_vec();
        self.commands.push(GlCommand::VertexAttribPointer {
            location,
            components,
            len: data.len(),
        });
    }

    fn active_texture(&mut self, unit: u32) {
        self.active_unit = unit;
        self.commands.push(GlCommand::ActiveTexture(unit));
    }

    fn gen_texture(&mut self) -> TextureId {
        let id = TextureId(self.next_id());
        self.textures.insert(id, TextureInfo::default());
        self.commands.push(GlCommand::GenTexture(id));
        id
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.commands.push(GlCommand::BindTexture(texture));
        match texture {
            Some(id) if !self.textures.contains_key(&id) => {
                self.error(format!("bind of unknown texture {:?}", id));
            }
            Some(id) => {
                self.bound_textures.insert(self.active_unit, id);
            }
            None => {
                self.bound_textures.remove(&self.active_unit);
            }
        }
    }

    fn tex_parameter(&mut self, parameter: TextureParameter, filter: TextureFilter) {
        self.commands.push(GlCommand::TexParameter(parameter, filter));
        if parameter == TextureParameter::MagFilter && filter == TextureFilter::LinearMipmapLinear {
            self.error("mipmap filter is not valid for magnification");
            return;
        }
        let bound = self.bound_texture();
        match bound.and_then(|id| self.textures.get_mut(&id)) {
            Some(info) => match parameter {
                TextureParameter::MinFilter => info.min_filter = Some(filter),
                TextureParameter::MagFilter => info.mag_filter = Some(filter),
            },
            None => self.error("tex_parameter with no texture bound"),
        }
    }

    fn tex_image_2d(&mut self, level: u32, image: &ImageData) -> BackendResult<()> {
        let expected = image.pixel_count() * 4;
        if image.data.len() != expected {
            return Err(RenderError::BackendError(format!(
                "image data is {} bytes, expected {} for {}x{} RGBA",
                image.data.len(),
                expected,
                image.width,
                image.height
            )));
        }
        let bound = self.bound_texture();
        let info = bound
            .and_then(|id| self.textures.get_mut(&id))
            .ok_or_else(|| RenderError::BackendError("tex_image_2d with no texture bound".to_string()))?;
        if level == 0 {
            info.width = image.width;
            info.height = image.height;
        }
        self.commands.push(GlCommand::TexImage2D {
            level,
            width: image.width,
            height: image.height,
        });
        Ok(())
    }

    fn generate_mipmap(&mut self) {
        self.commands.push(GlCommand::GenerateMipmap);
        let bound = self.bound_texture();
        match bound.and_then(|id| self.textures.get_mut(&id)) {
            Some(info) => info.mipmapped = true,
            None => self.error("generate_mipmap with no texture bound"),
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.bound_textures.retain(|_, bound| *bound != texture);
        self.commands.push(GlCommand::DeleteTexture(texture));
    }

    fn draw_elements(&mut self, mode: PrimitiveMode, indices: &[u16]) {
        self.commands.push(GlCommand::DrawElements {
            mode,
            count: indices.len(),
        });

        let Some(program_id) = self.current_program else {
            self.error("draw_elements with no program in use");
            return;
        };
        if !self.programs.contains_key(&program_id) {
            self.error(format!("draw with deleted program {:?}", program_id));
            return;
        }
        let program = &self.programs[&program_id];

        let uniforms = program
            .values
            .iter()
            .map(|(location, value)| (program.uniforms[location.0 as usize].clone(), *value))
            .collect();
        let attributes = program
            .attributes
            .iter()
            .enumerate()
            .filter_map(|(index, name)| {
                let binding = self.attributes.get(&AttribLocation(index as u32))?;
                binding.enabled.then(|| (name.clone(), binding.clone()))
            })
            .collect();

        let record = DrawRecord {
            program: program_id,
            mode,
            indices: indices.to_vec(),
            depth_write: self.depth_write,
            blend_enabled: self.blend_enabled,
            blend_func: self.blend_func,
            texture: self.bound_texture(),
            uniforms,
            attributes,
        };
        self.draws.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "uniform mat4 u_M;\nattribute vec4 a_P;\nvoid main() {}\n";
    const FS: &str = "precision mediump float;\nuniform vec4 u_C;\nuniform mat4 u_M;\nvoid main() {}\n";

    fn program(gl: &mut RecordingContext) -> ProgramId {
        let vs = gl.compile_shader(ShaderStage::Vertex, VS).unwrap();
        let fs = gl.compile_shader(ShaderStage::Fragment, FS).unwrap();
        gl.link_program(&[vs, fs]).unwrap()
    }

    #[test]
    fn test_declarations_become_locations() {
        let mut gl = RecordingContext::new();
        let p = program(&mut gl);
        assert_eq!(gl.uniform_location(p, "u_M"), Some(UniformLocation(0)));
        assert_eq!(gl.uniform_location(p, "u_C"), Some(UniformLocation(1)));
        assert_eq!(gl.uniform_location(p, "u_Missing"), None);
        assert_eq!(gl.attrib_location(p, "a_P"), Some(AttribLocation(0)));
    }

    #[test]
    fn test_link_requires_both_stages() {
        let mut gl = RecordingContext::new();
        let vs = gl.compile_shader(ShaderStage::Vertex, VS).unwrap();
        assert!(matches!(gl.link_program(&[vs]), Err(RenderError::ProgramLink(_))));
    }

    #[test]
    fn test_uniform_without_program_is_error() {
        let mut gl = RecordingContext::new();
        gl.uniform_4f(UniformLocation(0), [1.0; 4]);
        assert_eq!(gl.errors().len(), 1);
    }

    #[test]
    fn test_draw_snapshots_state() {
        let mut gl = RecordingContext::new();
        let p = program(&mut gl);
        gl.use_program(Some(p));
        gl.uniform_4f(UniformLocation(1), [0.5; 4]);
        gl.enable_vertex_attrib_array(AttribLocation(0));
        gl.vertex_attrib_pointer(AttribLocation(0), 3, &[1.0, 2.0, 3.0]);
        gl.depth_mask(false);
        gl.draw_elements(PrimitiveMode::Triangles, &[0, 0, 0]);

        let draw = &gl.draws()[0];
        assert_eq!(draw.uniform("u_C"), Some(&UniformValue::Vec4([0.5; 4])));
        assert_eq!(draw.attribute("a_P").unwrap().data, vec![1.0, 2.0, 3.0]);
        assert!(!draw.depth_write);
        assert!(!draw.blend_enabled);
    }

    #[test]
    fn test_draw_without_program_records_no_draw() {
        let mut gl = RecordingContext::new();
        gl.draw_elements(PrimitiveMode::Triangles, &[0, 1, 2]);
        assert!(gl.draws().is_empty());
        assert_eq!(gl.errors().len(), 1);
    }

    #[test]
    fn test_tex_image_rejects_short_data() {
        let mut gl = RecordingContext::new();
        let t = gl.gen_texture();
        gl.bind_texture(Some(t));
        let bad = ImageData {
            data: vec![0; 3],
            width: 1,
            height: 1,
        };
        assert!(gl.tex_image_2d(0, &bad).is_err());
    }
}
