//! This module contains utilities for loading images to be rendered on the map.

use image::imageops::FilterType;
use image::RgbaImage;

use crate::color::Color;
use crate::error::MapViewError;

/// An image that has been loaded into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    /// Raw bytes of the image, in RGBA order.
    pub(crate) bytes: Vec<u8>,
    /// Width and height of the image.
    pub(crate) dimensions: (u32, u32),
}

impl DecodedImage {
    /// Decode an image from a byte slice.
    ///
    /// Attempts to guess the format of the image from the data. Non-RGBA images
    /// will be converted to RGBA.
    pub fn decode(bytes: &[u8]) -> Result<Self, MapViewError> {
        use image::GenericImageView;
        let decoded = image::load_from_memory(bytes)?;
        let dimensions = decoded.dimensions();
        let bytes = decoded.to_rgba8();

        Ok(Self {
            bytes: bytes.into_vec(),
            dimensions,
        })
    }

    /// Creates an image from raw RGBA bytes.
    pub fn from_raw(bytes: Vec<u8>, width: u32, height: u32) -> Result<Self, MapViewError> {
        if bytes.len() != width as usize * height as usize * 4 {
            return Err(MapViewError::Generic(format!(
                "invalid image buffer size {} for {width}x{height} image",
                bytes.len()
            )));
        }

        Ok(Self {
            bytes,
            dimensions: (width, height),
        })
    }

    /// Creates an image filled with a single color.
    pub fn solid(color: Color, width: u32, height: u32) -> Self {
        let bytes = color
            .to_u8_array()
            .repeat(width as usize * height as usize);
        Self {
            bytes,
            dimensions: (width, height),
        }
    }

    /// Width of the image in pixels.
    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    /// Height of the image in pixels.
    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    /// Raw RGBA bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Color of the pixel, `None` if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width() || y >= self.height() {
            return None;
        }

        let offset = (y as usize * self.width() as usize + x as usize) * 4;
        let p = self.bytes.get(offset..offset + 4)?;
        Some(Color::rgba(p[0], p[1], p[2], p[3]))
    }

    /// Returns a copy of the image scaled to the given size.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if (width, height) == self.dimensions {
            return self.clone();
        }

        let Some(buffer) = RgbaImage::from_raw(self.width(), self.height(), self.bytes.clone())
        else {
            log::warn!("Image buffer does not match its dimensions, skipping resize");
            return self.clone();
        };

        let resized = image::imageops::resize(&buffer, width, height, FilterType::Triangle);
        Self {
            bytes: resized.into_raw(),
            dimensions: (width, height),
        }
    }
}
