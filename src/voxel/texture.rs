//! Texture images and grid import.

use std::sync::OnceLock;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// An RGBA texture tile with a lazily computed content hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Texture {
    #[serde(with = "image_serde")]
    image: RgbaImage,
    #[serde(skip)]
    hash: OnceLock<String>,
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.image == other.image
    }
}

impl Texture {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image,
            hash: OnceLock::new(),
        }
    }

    /// Decode an encoded image (PNG) into a texture.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| Error::Texture(e.to_string()))?;
        Ok(Self::new(image.to_rgba8()))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Hex digest of the pixel content, computed on first request.
    pub fn hash(&self) -> &str {
        self.hash.get_or_init(|| {
            let mut hasher = blake3::Hasher::new();
            hasher.update(&self.image.width().to_le_bytes());
            hasher.update(&self.image.height().to_le_bytes());
            hasher.update(self.image.as_raw());
            hasher.finalize().to_hex().to_string()
        })
    }

    /// Whether the hash has been computed yet.
    pub fn is_hashed(&self) -> bool {
        self.hash.get().is_some()
    }
}

/// Cut an image into `tile` x `tile` textures, row by row.
///
/// Images whose sides are not a multiple of `tile` are padded with
/// transparent pixels first.
pub fn split_grid(image: &RgbaImage, tile: u32) -> Vec<RgbaImage> {
    if tile == 0 || image.width() == 0 || image.height() == 0 {
        return Vec::new();
    }
    let width = image.width().div_ceil(tile) * tile;
    let height = image.height().div_ceil(tile) * tile;
    let mut padded = RgbaImage::new(width, height);
    image::imageops::replace(&mut padded, image, 0, 0);

    let mut tiles = Vec::new();
    for y in (0..height).step_by(tile as usize) {
        for x in (0..width).step_by(tile as usize) {
            tiles.push(image::imageops::crop_imm(&padded, x, y, tile, tile).to_image());
        }
    }
    tiles
}

mod image_serde {
    use image::RgbaImage;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(image: &RgbaImage, serializer: S) -> Result<S::Ok, S::Error> {
        (image.width(), image.height(), image.as_raw()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RgbaImage, D::Error> {
        let (width, height, raw): (u32, u32, Vec<u8>) = Deserialize::deserialize(deserializer)?;
        RgbaImage::from_raw(width, height, raw)
            .ok_or_else(|| D::Error::custom("texture pixels do not match its dimensions"))
    }
}
