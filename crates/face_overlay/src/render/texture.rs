//! Texture upload

use crate::assets::{AssetError, AssetProvider, ImageData};
use crate::render::backend::{
    BackendResult, GraphicsContext, TextureFilter, TextureId, TextureParameter,
};

/// Upload `image` into `texture` with trilinear minification and a full mip chain
///
/// Leaves no texture bound on the active unit afterwards.
pub fn upload_mipmapped(
    gl: &mut dyn GraphicsContext,
    texture: TextureId,
    image: &ImageData,
) -> BackendResult<()> {
    gl.bind_texture(Some(texture));
    gl.tex_parameter(TextureParameter::MinFilter, TextureFilter::LinearMipmapLinear);
    gl.tex_parameter(TextureParameter::MagFilter, TextureFilter::Linear);
    let uploaded = gl.tex_image_2d(0, image);
    if uploaded.is_ok() {
        gl.generate_mipmap();
        log::debug!(
            "Uploaded {}x{} texture {:?} with {} mip levels",
            image.width,
            image.height,
            texture,
            image.mip_levels()
        );
    }
    gl.bind_texture(None);
    uploaded
}

/// Errors from loading a texture asset into a texture object
#[derive(thiserror::Error, Debug)]
pub enum TextureLoadError {
    /// Reading or decoding the asset failed
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// The backend rejected the upload
    #[error(transparent)]
    Upload(#[from] crate::render::RenderError),
}

/// Decode asset `name` and upload it into `texture`
///
/// The decoded pixels are dropped as soon as the upload returns.
pub fn load_texture(
    gl: &mut dyn GraphicsContext,
    assets: &dyn AssetProvider,
    name: &str,
    texture: TextureId,
) -> Result<(u32, u32), TextureLoadError> {
    let image = ImageData::load(assets, name)?;
    upload_mipmapped(gl, texture, &image)?;
    Ok((image.width, image.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::render::backends::recording::{GlCommand, RecordingContext};

    #[test]
    fn test_upload_sets_filters_and_mips() {
        let mut gl = RecordingContext::new();
        let texture = gl.gen_texture();
        upload_mipmapped(&mut gl, texture, &ImageData::solid_color(8, 4, [255; 4])).unwrap();

        let info = gl.texture(texture).unwrap();
        assert_eq!(info.min_filter, Some(TextureFilter::LinearMipmapLinear));
        assert_eq!(info.mag_filter, Some(TextureFilter::Linear));
        assert_eq!((info.width, info.height), (8, 4));
        assert!(info.mipmapped);
        assert_eq!(gl.commands().last(), Some(&GlCommand::BindTexture(None)));
    }

    #[test]
    fn test_missing_asset_leaves_texture_empty() {
        let mut gl = RecordingContext::new();
        let texture = gl.gen_texture();
        let result = load_texture(&mut gl, &MemoryAssets::new(), "freckles.png", texture);

        assert!(matches!(result, Err(TextureLoadError::Asset(AssetError::NotFound(_)))));
        assert_eq!(gl.texture(texture).unwrap().width, 0);
    }
}
