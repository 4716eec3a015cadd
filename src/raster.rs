use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use egui::{Color32, ColorImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaskError;

/// Identity of a pixel buffer in the [`AssetStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(Uuid);

impl AssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "asset-{}", self.0.simple())
    }
}

/// An immutable RGBA8 bitmap with straight (unmultiplied) alpha
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("data_len", &self.pixels.len())
            .finish()
    }
}

impl RasterImage {
    /// Wrap raw RGBA bytes. Returns `None` if the buffer length doesn't match the size.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = width as usize * height as usize * 4;
        (pixels.len() == expected).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn filled(width: u32, height: u32, color: Color32) -> Self {
        let [r, g, b, a] = color.to_srgba_unmultiplied();
        let pixels = [r, g, b, a].repeat(width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Decode any format the `image` crate understands
    pub fn decode(bytes: &[u8]) -> Result<Self, TaskError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|err| TaskError::DecodeFailed(err.to_string()))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(TaskError::DecodeFailed("image has no pixels".to_owned()));
        }
        Ok(Self {
            width,
            height,
            pixels: rgba.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Unmultiplied RGBA at the given pixel, `None` outside the bitmap
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn to_color_image(&self) -> ColorImage {
        ColorImage::from_rgba_unmultiplied(
            [self.width as usize, self.height as usize],
            &self.pixels,
        )
    }
}

/// Pixel buffers referenced by image objects.
///
/// Buffers are never mutated after insertion, so the live scene and every history
/// snapshot can share them by id.
#[derive(Debug, Default, Clone)]
pub struct AssetStore {
    assets: HashMap<AssetId, Arc<RasterImage>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image: Arc<RasterImage>) -> AssetId {
        let id = AssetId::new();
        self.assets.insert(id, image);
        id
    }

    pub fn get(&self, id: AssetId) -> Option<&Arc<RasterImage>> {
        self.assets.get(&id)
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.assets.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Drop every asset not in `live`, returning how many were removed
    pub fn retain_live(&mut self, live: &HashSet<AssetId>) -> usize {
        let before = self.assets.len();
        self.assets.retain(|id, _| live.contains(id));
        before - self.assets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(RasterImage::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(RasterImage::from_rgba(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn test_decode_png() {
        let mut source = image::RgbaImage::new(3, 2);
        source.put_pixel(1, 1, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        source
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let decoded = RasterImage::decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(decoded.pixel(1, 1), Some([10, 20, 30, 255]));
        assert_eq!(decoded.pixel(3, 0), None);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            RasterImage::decode(b"definitely not an image"),
            Err(TaskError::DecodeFailed(_))
        ));
    }

    #[test]
    fn test_retain_live() {
        let mut store = AssetStore::new();
        let keep = store.insert(Arc::new(RasterImage::filled(1, 1, Color32::RED)));
        let drop = store.insert(Arc::new(RasterImage::filled(1, 1, Color32::BLUE)));

        let live: HashSet<AssetId> = [keep].into_iter().collect();
        assert_eq!(store.retain_live(&live), 1);
        assert!(store.contains(keep));
        assert!(!store.contains(drop));
    }
}
