//! Tileset slicing: atlas image + margin/spacing into per-tile source rects.

use crate::document::Tileset;
use crate::error::MapError;
use crate::images::{image_size, ImageSource};
use macroquad::math::{vec2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Integer pixel rectangle inside a tileset image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width
    pub w: u32,
    /// Height
    pub h: u32,
}

impl SourceRect {
    /// As a macroquad float rect, for draw calls.
    pub fn to_rect(self) -> Rect {
        Rect::new(self.x as f32, self.y as f32, self.w as f32, self.h as f32)
    }
}

/// One physical tile cell of one tileset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileCatalogEntry {
    /// Cell bounds in the tileset image
    pub source: SourceRect,
    /// Index into the baked map's texture list
    pub texture: usize,
    /// Rotation pivot, relative to the cell's top-left
    pub center: Vec2,
}

/// Number of whole cells that fit along one axis.
#[inline]
fn cells_along(extent: u32, margin: u32, tile: u32, spacing: u32) -> u32 {
    if tile == 0 {
        return 0;
    }
    // Every cell is counted with its trailing gap, so a last column that
    // fits only without its gap is dropped.
    extent.saturating_sub(margin.saturating_mul(2)) / tile.saturating_add(spacing)
}

/// Enumerate a tileset's cells in row-major order.
///
/// Partial cells at the right/bottom edge are dropped.
pub fn slice_tileset(
    tileset: &Tileset,
    image_width: u32,
    image_height: u32,
    texture: usize,
) -> Vec<TileCatalogEntry> {
    let (tw, th) = (tileset.tile_width, tileset.tile_height);
    let columns = cells_along(image_width, tileset.margin, tw, tileset.spacing);
    let rows = cells_along(image_height, tileset.margin, th, tileset.spacing);
    let center = vec2(tw as f32 / 2.0, th as f32 / 2.0);

    let mut out = Vec::with_capacity(columns as usize * rows as usize);
    for row in 0..rows {
        for col in 0..columns {
            out.push(TileCatalogEntry {
                source: SourceRect {
                    x: tileset.margin + col * (tw + tileset.spacing),
                    y: tileset.margin + row * (th + tileset.spacing),
                    w: tw,
                    h: th,
                },
                texture,
                center,
            });
        }
    }
    out
}

/// All tilesets' cells concatenated in declaration order; a layer's tile id
/// `n` refers to `entries[n - 1]`.
#[derive(Debug, Clone, Default)]
pub struct TileCatalog {
    /// Flattened entries
    pub entries: Vec<TileCatalogEntry>,
    /// Image path per texture index
    pub textures: Vec<String>,
}

impl TileCatalog {
    /// Slice every tileset of a map, loading atlas sizes from `images`.
    pub fn build(tilesets: &[Tileset], images: &mut dyn ImageSource) -> Result<Self, MapError> {
        let mut catalog = TileCatalog::default();
        for tileset in tilesets {
            let (w, h) = image_size(images.image(&tileset.image_filename)?);

            let expected_first = catalog.entries.len() as u32 + 1;
            if tileset.first_tile_id != expected_first {
                warn!(
                    tileset = %tileset.name,
                    firstgid = tileset.first_tile_id,
                    expected = expected_first,
                    "tileset firstgid does not follow the previous tileset; ids index the flat catalog"
                );
            }

            let texture = catalog.textures.len();
            catalog.textures.push(tileset.image_filename.clone());
            catalog.entries.extend(slice_tileset(tileset, w, h, texture));
        }
        Ok(catalog)
    }

    /// Entry for a 1-based tile id; `None` for 0 or past the end.
    #[inline]
    pub fn get(&self, tile_id: u32) -> Option<&TileCatalogEntry> {
        let index = (tile_id as usize).checked_sub(1)?;
        self.entries.get(index)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when no tileset produced any cell.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::MemoryImages;
    use macroquad::color::WHITE;
    use macroquad::texture::Image;

    fn tileset(tile: u32, margin: u32, spacing: u32) -> Tileset {
        Tileset {
            name: "t".into(),
            first_tile_id: 1,
            tile_width: tile,
            tile_height: tile,
            margin,
            spacing,
            image_filename: "t.png".into(),
            ..Default::default()
        }
    }

    #[test]
    fn slices_row_major_from_margin() {
        // (58 - 2*2) / (16 + 1) = 3 columns, (41 - 2*2) / 17 = 2 rows
        let entries = slice_tileset(&tileset(16, 2, 1), 58, 41, 0);
        assert_eq!(entries.len(), 3 * 2);
        assert_eq!(entries[0].source, SourceRect { x: 2, y: 2, w: 16, h: 16 });
        assert_eq!(entries[1].source.x, 19);
        assert_eq!(entries[2].source.x, 36);
        assert_eq!(entries[3].source, SourceRect { x: 2, y: 19, w: 16, h: 16 });
        assert!(entries.iter().all(|e| e.center == vec2(8.0, 8.0)));
    }

    #[test]
    fn column_count_includes_the_trailing_gap() {
        // 50px of content holds three 16px tiles with two gaps, but each
        // cell is counted as tile + spacing: 50 / 17 = 2.
        let entries = slice_tileset(&tileset(16, 2, 1), 54, 37, 0);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].source, SourceRect { x: 19, y: 2, w: 16, h: 16 });
    }

    #[test]
    fn trailing_partial_cells_are_dropped() {
        let entries = slice_tileset(&tileset(16, 0, 0), 40, 20, 0);
        assert_eq!(entries.len(), 2);
        assert!(slice_tileset(&tileset(16, 0, 0), 10, 10, 0).is_empty());
    }

    #[test]
    fn catalog_concatenates_tilesets_and_indexes_from_one() {
        let mut second = tileset(8, 0, 0);
        second.first_tile_id = 5;
        second.image_filename = "u.png".into();

        let mut images = MemoryImages::new()
            .with("t.png", Image::gen_image_color(32, 32, WHITE))
            .with("u.png", Image::gen_image_color(16, 8, WHITE));
        let catalog = TileCatalog::build(&[tileset(16, 0, 0), second], &mut images).expect("catalog");

        assert_eq!(catalog.len(), 4 + 2);
        assert_eq!(catalog.textures, vec!["t.png".to_string(), "u.png".to_string()]);
        assert!(catalog.get(0).is_none());
        assert_eq!(catalog.get(1).expect("first").texture, 0);
        assert_eq!(catalog.get(5).expect("fifth").texture, 1);
        assert_eq!(catalog.get(6).expect("sixth").source.x, 8);
        assert!(catalog.get(7).is_none());
    }
}
