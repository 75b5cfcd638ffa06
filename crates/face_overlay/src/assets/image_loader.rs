//! Image decoding for texture data
//!
//! Decoded images are converted to RGBA8 with premultiplied alpha, which is what the
//! face renderer's (ONE, ONE_MINUS_SRC_ALPHA) blend expects.

use std::io::{BufReader, Read};

use crate::assets::{AssetError, AssetProvider};

/// Decoded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw RGBA pixel data, rows top to bottom
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Decode an image from an encoded byte stream
    pub fn from_reader(reader: impl Read) -> Result<Self, AssetError> {
        let mut bytes = Vec::new();
        BufReader::new(reader).read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Decode an image from encoded bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::DecodeFailed(format!("Failed to decode image: {}", e)))?;

        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        let mut image = Self {
            data: rgba_img.into_raw(),
            width,
            height,
        };
        image.premultiply_alpha();

        log::debug!("Decoded image {}x{}", width, height);
        Ok(image)
    }

    /// Open `name` from `assets` and decode it
    pub fn load(assets: &dyn AssetProvider, name: &str) -> Result<Self, AssetError> {
        let reader = assets.open(name)?;
        let image = Self::from_reader(reader)?;
        log::info!(
            "Loaded texture image {} ({}x{}, {} bytes)",
            name,
            image.width,
            image.height,
            image.size_bytes()
        );
        Ok(image)
    }

    /// Create a solid color image (useful for testing and defaults)
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = width as usize * height as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
        }
    }

    /// Scale color channels by alpha in place
    pub fn premultiply_alpha(&mut self) {
        for pixel in self.data.chunks_exact_mut(4) {
            let alpha = u16::from(pixel[3]);
            for channel in &mut pixel[..3] {
                // Rounded (c * a) / 255
                *channel = ((u16::from(*channel) * alpha + 127) / 255) as u8;
            }
        }
    }

    /// Number of pixels, computed without 32-bit overflow
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Full mip chain length for this image
    pub fn mip_levels(&self) -> u32 {
        32 - self.width.max(self.height).max(1).leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;

    fn encode_png(width: u32, height: u32, pixel: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(pixel));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_premultiplies() {
        let png = encode_png(2, 2, [255, 128, 0, 128]);
        let img = ImageData::from_bytes(&png).unwrap();
        assert_eq!((img.width, img.height), (2, 2));
        assert_eq!(img.size_bytes(), 16);
        assert_eq!(&img.data[0..4], &[128, 64, 0, 128]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_pixel_count_beyond_u32() {
        let img = ImageData {
            data: Vec::new(),
            width: 70_000,
            height: 70_000,
        };
        assert_eq!(img.pixel_count(), 4_900_000_000);
        assert_eq!(ImageData::solid_color(3, 5, [1; 4]).data.len(), 60);
    }

    #[test]
    fn test_opaque_pixels_unchanged() {
        let mut img = ImageData::solid_color(1, 1, [10, 20, 30, 255]);
        img.premultiply_alpha();
        assert_eq!(img.data, vec![10, 20, 30, 255]);
    }

    #[test]
    fn test_load_from_provider() {
        let assets = MemoryAssets::new().with("freckles.png", encode_png(4, 1, [0, 0, 0, 0]));
        let img = ImageData::load(&assets, "freckles.png").unwrap();
        assert_eq!(img.width, 4);
        assert_eq!(img.mip_levels(), 3);
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(matches!(
            ImageData::from_bytes(b"not an image"),
            Err(AssetError::DecodeFailed(_))
        ));
    }
}
