//! Face mesh shaders
//!
//! GLSL ES 1.00 sources for the lit, textured face overlay, plus the helper that
//! compiles and links them on a [`GraphicsContext`].

use crate::render::backend::{BackendResult, GraphicsContext, ProgramId, ShaderStage};

/// Vertex stage: transforms to clip space and passes view-space position and normal
pub const FACE_VERTEX_SHADER: &str = r#"
uniform mat4 u_ModelView;
uniform mat4 u_ModelViewProjection;

attribute vec4 a_Position;
attribute vec3 a_Normal;
attribute vec2 a_TexCoord;

varying vec3 v_ViewPosition;
varying vec3 v_ViewNormal;
varying vec2 v_TexCoord;

void main() {
    v_ViewPosition = (u_ModelView * a_Position).xyz;
    v_ViewNormal = normalize((u_ModelView * vec4(a_Normal, 0.0)).xyz);
    v_TexCoord = a_TexCoord;
    gl_Position = u_ModelViewProjection * a_Position;
}
"#;

/// Fragment stage: Lambert diffuse plus specular, color correction and tint
pub const FACE_FRAGMENT_SHADER: &str = r#"
precision mediump float;

uniform sampler2D u_Texture;

uniform vec4 u_LightingParameters;
uniform vec4 u_MaterialParameters;
uniform vec4 u_ColorCorrectionParameters;
uniform vec4 u_TintColor;

varying vec3 v_ViewPosition;
varying vec3 v_ViewNormal;
varying vec2 v_TexCoord;

void main() {
    // Correction alpha is the average pixel intensity in gamma space
    const float kMiddleGrayGamma = 0.466;

    vec3 viewLightDirection = u_LightingParameters.xyz;
    vec3 colorShift = u_ColorCorrectionParameters.rgb;
    float averagePixelIntensity = u_ColorCorrectionParameters.a;

    float materialAmbient = u_MaterialParameters.x;
    float materialDiffuse = u_MaterialParameters.y;
    float materialSpecular = u_MaterialParameters.z;
    float materialSpecularPower = u_MaterialParameters.w;

    vec3 viewFragmentDirection = normalize(v_ViewPosition);
    vec3 viewNormal = normalize(v_ViewNormal);

    // Texels are premultiplied; keep them that way through lighting
    vec4 objectColor = texture2D(u_Texture, vec2(v_TexCoord.x, 1.0 - v_TexCoord.y));
    objectColor.rgb = mix(objectColor.rgb, u_TintColor.rgb * objectColor.a, u_TintColor.a);

    float ambient = materialAmbient;
    float diffuse = materialDiffuse * 0.5 * (dot(viewNormal, viewLightDirection) + 1.0);

    vec3 reflectedLightDirection = reflect(viewLightDirection, viewNormal);
    float specularStrength = max(0.0, dot(viewFragmentDirection, reflectedLightDirection));
    float specular = materialSpecular * pow(specularStrength, materialSpecularPower);

    vec3 color = objectColor.rgb * (ambient + diffuse) + specular * objectColor.a;
    color *= colorShift * (averagePixelIntensity / kMiddleGrayGamma);

    gl_FragColor = vec4(color, objectColor.a);
}
"#;

/// Compile both stages and link them into a program
///
/// Shader objects are released once the program is linked, or on failure.
pub fn build_program(
    gl: &mut dyn GraphicsContext,
    vertex_source: &str,
    fragment_source: &str,
) -> BackendResult<ProgramId> {
    let vertex = gl.compile_shader(ShaderStage::Vertex, vertex_source)?;
    let fragment = match gl.compile_shader(ShaderStage::Fragment, fragment_source) {
        Ok(fragment) => fragment,
        Err(e) => {
            gl.delete_shader(vertex);
            return Err(e);
        }
    };

    let program = gl.link_program(&[vertex, fragment]);
    gl.delete_shader(vertex);
    gl.delete_shader(fragment);

    let program = program?;
    log::debug!("Linked face shader program {:?}", program);
    Ok(program)
}
