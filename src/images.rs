//! CPU-side image access for the bake pipeline and mask builders.
//!
//! Decoding goes through `macroquad::texture::Image`, which needs no GPU
//! context, so the offline bake and the tests can read PNG alpha directly.

use crate::error::MapError;
use macroquad::texture::Image;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where the pipeline gets images from, keyed by the path the map references.
pub trait ImageSource {
    /// Load (or fetch from cache) the image at `path`.
    fn image(&mut self, path: &str) -> Result<&Image, MapError>;
}

/// Reads images from disk relative to a base directory, caching each once.
pub struct DirImages {
    base_dir: PathBuf,
    cache: HashMap<String, Image>,
}

impl DirImages {
    /// Images resolved relative to `base_dir` (usually the map's directory).
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache: HashMap::new(),
        }
    }

    /// Base directory used for relative paths.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Decode an image file from disk.
pub fn load_image_file(path: &Path) -> Result<Image, MapError> {
    let bytes = std::fs::read(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Image::from_file_with_format(&bytes, None).map_err(|e| MapError::Image {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl ImageSource for DirImages {
    fn image(&mut self, path: &str) -> Result<&Image, MapError> {
        if !self.cache.contains_key(path) {
            let img = load_image_file(&self.base_dir.join(path))?;
            self.cache.insert(path.to_owned(), img);
        }
        Ok(&self.cache[path])
    }
}

/// Pre-registered in-memory images.
#[derive(Default)]
pub struct MemoryImages {
    images: HashMap<String, Image>,
}

impl MemoryImages {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `image` under `path`.
    pub fn insert(&mut self, path: impl Into<String>, image: Image) {
        self.images.insert(path.into(), image);
    }

    /// Builder-style [`MemoryImages::insert`].
    pub fn with(mut self, path: impl Into<String>, image: Image) -> Self {
        self.insert(path, image);
        self
    }
}

impl ImageSource for MemoryImages {
    fn image(&mut self, path: &str) -> Result<&Image, MapError> {
        self.images.get(path).ok_or_else(|| MapError::Image {
            path: PathBuf::from(path),
            message: "image not registered".into(),
        })
    }
}

/// Alpha byte of pixel `(x, y)`; callers keep coordinates in range.
#[inline]
pub fn alpha_at(image: &Image, x: u32, y: u32) -> u8 {
    image.bytes[(y as usize * image.width as usize + x as usize) * 4 + 3]
}

/// Image size in pixels as `u32`.
#[inline]
pub fn image_size(image: &Image) -> (u32, u32) {
    (image.width as u32, image.height as u32)
}
