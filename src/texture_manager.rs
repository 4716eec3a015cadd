use std::collections::HashMap;

use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};
use thiserror::Error;

use crate::error::ExportError;

/// Errors that can occur during texture generation
#[derive(Error, Debug)]
pub enum TextureGenerationError {
    #[error("Failed to render texture: {0}")]
    Render(#[from] ExportError),
    #[error("Invalid texture dimensions")]
    InvalidDimensions,
}

/// Caches GPU textures by `(key, version)` and evicts the least recently used ones
pub struct TextureManager {
    texture_cache: HashMap<(u64, u64), TextureHandle>,
    last_used: HashMap<(u64, u64), u64>,
    current_frame: u64,
    max_cache_size: usize,
}

impl std::fmt::Debug for TextureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureManager")
            .field("cached", &self.texture_cache.len())
            .field("current_frame", &self.current_frame)
            .field("max_cache_size", &self.max_cache_size)
            .finish()
    }
}

impl TextureManager {
    pub fn new(max_cache_size: usize) -> Self {
        Self {
            texture_cache: HashMap::new(),
            last_used: HashMap::new(),
            current_frame: 0,
            max_cache_size: max_cache_size.max(1),
        }
    }

    /// Should be called at the start of each frame
    pub fn begin_frame(&mut self) {
        self.current_frame += 1;
    }

    /// Return the cached texture for `(key, version)` or build it with `generator`
    pub fn get_or_create_texture<F>(
        &mut self,
        key: u64,
        version: u64,
        generator: F,
        ctx: &Context,
    ) -> Result<TextureId, TextureGenerationError>
    where
        F: FnOnce() -> Result<ColorImage, TextureGenerationError>,
    {
        let cache_key = (key, version);

        if let Some(handle) = self.texture_cache.get(&cache_key) {
            self.last_used.insert(cache_key, self.current_frame);
            return Ok(handle.id());
        }

        let image = generator()?;
        if image.size[0] == 0 || image.size[1] == 0 {
            return Err(TextureGenerationError::InvalidDimensions);
        }

        let name = format!("texture_{key}_v{version}");
        log::debug!("Uploading {name} ({}x{})", image.size[0], image.size[1]);
        let handle = ctx.load_texture(&name, image, TextureOptions::NEAREST);

        self.texture_cache.insert(cache_key, handle.clone());
        self.last_used.insert(cache_key, self.current_frame);
        self.prune_cache_if_needed();

        Ok(handle.id())
    }

    /// Drop every version cached under `key`
    pub fn invalidate(&mut self, key: u64) {
        self.texture_cache.retain(|(k, _), _| *k != key);
        self.last_used.retain(|(k, _), _| *k != key);
    }

    fn prune_cache_if_needed(&mut self) {
        if self.texture_cache.len() <= self.max_cache_size {
            return;
        }

        let mut entries: Vec<((u64, u64), u64)> =
            self.last_used.iter().map(|(k, v)| (*k, *v)).collect();
        // Oldest frame first; older versions break ties
        entries.sort_by_key(|((_, version), frame)| (*frame, *version));

        let to_remove = entries.len().saturating_sub(self.max_cache_size);
        for (key, _) in entries.iter().take(to_remove) {
            self.texture_cache.remove(key);
            self.last_used.remove(key);
        }
    }

    pub fn cache_size(&self) -> usize {
        self.texture_cache.len()
    }

    #[cfg(test)]
    pub fn get_texture(&self, key: u64, version: u64) -> Option<&TextureHandle> {
        self.texture_cache.get(&(key, version))
    }
}
