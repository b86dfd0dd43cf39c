//! Joins decoded layers with the tile catalog into pre-baked, renderable layers.

use crate::document::{TileFlip, TiledDocument};
use crate::error::MapError;
use crate::slicer::{SourceRect, TileCatalog};
use macroquad::math::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::f32::consts::FRAC_PI_2;

/// `[x, y]` serde adapter for `macroquad::math::Vec2`.
pub(crate) mod vec2_serde {
    use macroquad::math::Vec2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vec2, s: S) -> Result<S::Ok, S::Error> {
        [v.x, v.y].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec2, D::Error> {
        let [x, y] = <[f32; 2]>::deserialize(d)?;
        Ok(Vec2::new(x, y))
    }
}

/// Where a tile lands in the world, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width
    pub w: u32,
    /// Height
    pub h: u32,
}

impl WorldRect {
    /// As a macroquad float rect.
    pub fn to_rect(self) -> Rect {
        Rect::new(self.x as f32, self.y as f32, self.w as f32, self.h as f32)
    }
}

/// One baked grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum BakedTile {
    /// Nothing drawn here
    Empty,
    /// A tileset cell placed in the world
    Textured {
        /// Cell in the tileset image
        source: SourceRect,
        /// Cell in the world
        world: WorldRect,
        /// Rotation pivot relative to the cell's top-left
        #[serde(with = "vec2_serde")]
        center: Vec2,
        /// Index into [`BakedMap::textures`]
        texture: usize,
        /// Radians, clockwise, applied after flipping
        rotation: f32,
        /// Mirror about the vertical axis
        flip_horizontal: bool,
        /// Mirror about the horizontal axis
        flip_vertical: bool,
    },
}

/// A baked tile layer; `tiles` is row-major, `width * height` long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakedLayer {
    /// Layer name from the map
    pub name: String,
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    /// Opacity in `[0, 1]`
    pub opacity: f32,
    /// Drawn at all
    pub visible: bool,
    /// Row-major cells
    pub tiles: Vec<BakedTile>,
}

impl BakedLayer {
    /// Textured cells only.
    pub fn textured(&self) -> impl Iterator<Item = &BakedTile> {
        self.tiles
            .iter()
            .filter(|t| matches!(t, BakedTile::Textured { .. }))
    }
}

/// The layered grid shipped to the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakedMap {
    /// Map width in tiles
    pub width: u32,
    /// Map height in tiles
    pub height: u32,
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Tileset image paths, relative to the asset
    pub textures: Vec<String>,
    /// Layers in draw order
    pub layers: Vec<BakedLayer>,
}

/// Index of the drivable layer when no layer is named "track".
pub const DEFAULT_TRACK_LAYER: usize = 1;

impl BakedMap {
    /// Map size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.saturating_mul(self.tile_width),
            self.height.saturating_mul(self.tile_height),
        )
    }

    /// The layer whose opaque pixels are drivable: one named "track"
    /// (any case), otherwise the second layer.
    pub fn track_layer(&self) -> Option<&BakedLayer> {
        self.layers
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case("track"))
            .or_else(|| self.layers.get(DEFAULT_TRACK_LAYER))
    }
}

/// Turn Tiled's three flip bits into `(rotation, flip_h, flip_v)` with
/// flips applied first, then the rotation.
///
/// A diagonal flip is a transpose, which equals a vertical flip followed by
/// a quarter turn; the remaining H/V bits are conjugated through that turn.
pub fn resolve_orientation(flip: TileFlip) -> (f32, bool, bool) {
    let h = flip.contains(TileFlip::HORIZONTAL);
    let v = flip.contains(TileFlip::VERTICAL);
    if flip.contains(TileFlip::DIAGONAL) {
        (FRAC_PI_2, v, !h)
    } else {
        (0.0, h, v)
    }
}

/// Bake every tile layer of `doc` against `catalog`.
///
/// A cell referencing a tile past the end of the catalog fails the bake.
pub fn bake_layers(doc: &TiledDocument, catalog: &TileCatalog) -> Result<BakedMap, MapError> {
    let (tw, th) = (doc.tile_width, doc.tile_height);
    let mut layers = Vec::with_capacity(doc.layers.len());

    for layer in &doc.layers {
        let expected = layer
            .cell_count()
            .filter(|_| layer.pixel_size(tw, th).is_some())
            .ok_or_else(|| MapError::InvalidAttribute {
                element: "layer".into(),
                attribute: "width".into(),
                value: format!("{}x{} tiles of {tw}x{th}px is too large", layer.width, layer.height),
            })?;
        if layer.tile_indices.len() != expected || layer.flip_flags.len() != expected {
            return Err(MapError::LayerSize {
                layer: layer.name.clone(),
                expected,
                actual: layer.tile_indices.len(),
            });
        }

        let mut tiles = Vec::with_capacity(expected);
        for (cell, (&index, &flip)) in layer
            .tile_indices
            .iter()
            .zip(&layer.flip_flags)
            .enumerate()
        {
            if index == 0 {
                tiles.push(BakedTile::Empty);
                continue;
            }

            let entry = catalog.get(index).ok_or_else(|| MapError::TileIndexOutOfRange {
                layer: layer.name.clone(),
                cell,
                index,
                catalog_len: catalog.len(),
            })?;

            let col = cell as u32 % layer.width;
            let row = cell as u32 / layer.width;
            let (rotation, flip_horizontal, flip_vertical) = resolve_orientation(flip);

            tiles.push(BakedTile::Textured {
                source: entry.source,
                world: WorldRect {
                    x: col * tw,
                    y: row * th,
                    w: tw,
                    h: th,
                },
                center: entry.center,
                texture: entry.texture,
                rotation,
                flip_horizontal,
                flip_vertical,
            });
        }

        layers.push(BakedLayer {
            name: layer.name.clone(),
            width: layer.width,
            height: layer.height,
            opacity: layer.opacity,
            visible: layer.visible,
            tiles,
        });
    }

    Ok(BakedMap {
        width: doc.width,
        height: doc.height,
        tile_width: tw,
        tile_height: th,
        textures: catalog.textures.clone(),
        layers,
    })
}
