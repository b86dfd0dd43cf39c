//! Per-pixel drivable mask composited from the track layer's tile alpha.

use crate::bake::{BakedLayer, BakedMap, BakedTile};
use crate::error::MapError;
use crate::images::{alpha_at, image_size};
use macroquad::texture::Image;
use std::path::PathBuf;
use tracing::info;

/// `true` = drivable; row-major, one entry per world pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl TrackMask {
    /// Wrap precomputed cells. `cells.len()` must equal `width * height`.
    pub fn from_cells(width: u32, height: u32, cells: Vec<bool>) -> Option<Self> {
        (cells.len() == width as usize * height as usize).then_some(Self { width, height, cells })
    }

    /// Composite every textured tile of `layer` into a map-sized mask.
    ///
    /// `textures[i]` is the decoded image for `map.textures[i]`. Each world
    /// pixel centre is mapped back through the tile's rotation and flips to a
    /// source pixel; alpha > 0 there means drivable. Uncovered pixels stay off-track.
    pub fn build(map: &BakedMap, layer: &BakedLayer, textures: &[Image]) -> Result<Self, MapError> {
        let (width, height) = map.pixel_size();
        let mut cells = vec![false; width as usize * height as usize];

        for tile in &layer.tiles {
            let BakedTile::Textured {
                source,
                world,
                rotation,
                flip_horizontal,
                flip_vertical,
                texture,
                ..
            } = tile
            else {
                continue;
            };

            let path = || PathBuf::from(map.textures.get(*texture).map_or("<unknown>", String::as_str));
            let image = textures.get(*texture).ok_or_else(|| MapError::Image {
                path: path(),
                message: format!("texture {texture} not loaded for mask build"),
            })?;
            let (img_w, img_h) = image_size(image);
            if source.x + source.w > img_w || source.y + source.h > img_h || source.w == 0 || source.h == 0 {
                return Err(MapError::Image {
                    path: path(),
                    message: format!("tile source {source:?} outside {img_w}x{img_h} image"),
                });
            }

            let (sin, cos) = rotation.sin_cos();
            let (half_w, half_h) = (world.w as f32 / 2.0, world.h as f32 / 2.0);
            let (scale_x, scale_y) = (source.w as f32 / world.w as f32, source.h as f32 / world.h as f32);

            for dy in 0..world.h {
                let wy = world.y + dy;
                if wy >= height {
                    break;
                }
                for dx in 0..world.w {
                    let wx = world.x + dx;
                    if wx >= width {
                        break;
                    }

                    let px = dx as f32 + 0.5 - half_w;
                    let py = dy as f32 + 0.5 - half_h;
                    // undo rotation
                    let mut qx = px * cos + py * sin;
                    let mut qy = -px * sin + py * cos;
                    if *flip_horizontal {
                        qx = -qx;
                    }
                    if *flip_vertical {
                        qy = -qy;
                    }

                    let sx = (((qx + half_w) * scale_x).floor() as i64).clamp(0, source.w as i64 - 1) as u32;
                    let sy = (((qy + half_h) * scale_y).floor() as i64).clamp(0, source.h as i64 - 1) as u32;

                    if alpha_at(image, source.x + sx, source.y + sy) > 0 {
                        cells[wy as usize * width as usize + wx as usize] = true;
                    }
                }
            }
        }

        let mask = Self { width, height, cells };
        info!(layer = %layer.name, width, height, drivable = mask.drivable_count(), "track mask built");
        Ok(mask)
    }

    /// Mask width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Drivable at integer pixel `(x, y)`; out of range is never drivable.
    #[inline]
    pub fn is_drivable(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.cells[(y * self.width as i64 + x) as usize]
    }

    /// `true` if `(x, y)` lies inside the map.
    #[inline]
    pub fn in_bounds(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width as f32 && y < self.height as f32
    }

    /// Number of drivable pixels.
    pub fn drivable_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }
}
