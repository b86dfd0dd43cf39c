//! Format-faithful in-memory view of a Tiled `.tmx` map.
//!
//! Nothing here is interpreted yet: tile cells keep their raw 1-based ids and
//! flip bits, objects keep their authoring names and types. The bake step
//! turns this into runtime data.

use bitflags::bitflags;
use std::collections::BTreeMap;

bitflags! {
    /// Flip bits stored in the top three bits of every TMX tile cell.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TileFlip: u32 {
        /// bit 31
        const HORIZONTAL = 0x8000_0000;
        /// bit 30
        const VERTICAL = 0x4000_0000;
        /// bit 29, a transpose of the tile's axes
        const DIAGONAL = 0x2000_0000;
    }
}

/// Lower 29 bits of a raw cell: the 1-based tile id.
pub const TILE_ID_MASK: u32 = 0x1FFF_FFFF;

impl TileFlip {
    /// Split a raw 32-bit cell into its flip bits and plain tile id.
    #[inline]
    pub fn split(raw: u32) -> (TileFlip, u32) {
        (TileFlip::from_bits_truncate(raw), raw & TILE_ID_MASK)
    }
}

/// Flat string-keyed `<properties>` block.
///
/// Ordered so that anything derived from it serializes identically run to run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    /// Empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Raw string value.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Value parsed as `f32`, `None` when absent or not a number.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get_string(name)?.trim().parse().ok()
    }

    /// Value parsed as `f64`, `None` when absent or not a number.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get_string(name)?.trim().parse().ok()
    }

    /// `true`/`false` (Tiled writes booleans as words).
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get_string(name)? {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when no property is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Parser output for one `.tmx` file.
#[derive(Debug, Clone, Default)]
pub struct TiledDocument {
    /// Map width in tiles
    pub width: u32,
    /// Map height in tiles
    pub height: u32,
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Tilesets, in declaration order
    pub tilesets: Vec<Tileset>,
    /// Tile layers, in draw order
    pub layers: Vec<TileLayer>,
    /// Object groups, in declaration order
    pub object_groups: Vec<ObjectGroup>,
    /// Map-level properties
    pub properties: Properties,
}

impl TiledDocument {
    /// Find an object group by exact name.
    pub fn object_group(&self, name: &str) -> Option<&ObjectGroup> {
        self.object_groups.iter().find(|g| g.name == name)
    }

    /// Map size in pixels; `None` when it does not fit in a `u32`.
    pub fn pixel_size(&self) -> Option<(u32, u32)> {
        Some((
            self.width.checked_mul(self.tile_width)?,
            self.height.checked_mul(self.tile_height)?,
        ))
    }
}

/// An embedded `<tileset>` with a single atlas image.
#[derive(Debug, Clone, Default)]
pub struct Tileset {
    /// Tileset name
    pub name: String,
    /// `firstgid` attribute
    pub first_tile_id: u32,
    /// Tile width in pixels
    pub tile_width: u32,
    /// Tile height in pixels
    pub tile_height: u32,
    /// Border around the atlas
    pub margin: u32,
    /// Gap between tiles in the atlas
    pub spacing: u32,
    /// Atlas image path, relative to the map file
    pub image_filename: String,
    /// Tileset properties
    pub properties: Properties,
}

/// A `<layer>` with its decoded cell stream.
#[derive(Debug, Clone, Default)]
pub struct TileLayer {
    /// Layer name
    pub name: String,
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    /// Layer opacity in `[0, 1]`
    pub opacity: f32,
    /// `visible` attribute
    pub visible: bool,
    /// 1-based tile ids, 0 = no tile. `len() == width * height`
    pub tile_indices: Vec<u32>,
    /// Flip bits per cell, parallel to `tile_indices`
    pub flip_flags: Vec<TileFlip>,
    /// Layer properties
    pub properties: Properties,
}

impl TileLayer {
    /// `width * height`, if it is addressable.
    pub fn cell_count(&self) -> Option<usize> {
        (self.width as usize).checked_mul(self.height as usize)
    }

    /// Layer size in pixels for `tile_width` x `tile_height` tiles, if it fits a `u32`.
    pub fn pixel_size(&self, tile_width: u32, tile_height: u32) -> Option<(u32, u32)> {
        Some((self.width.checked_mul(tile_width)?, self.height.checked_mul(tile_height)?))
    }
}

/// An `<objectgroup>`.
#[derive(Debug, Clone, Default)]
pub struct ObjectGroup {
    /// Group name
    pub name: String,
    /// Objects in authoring order
    pub objects: Vec<TiledObject>,
    /// Group properties
    pub properties: Properties,
}

impl ObjectGroup {
    /// Objects whose `type` equals `kind`, in authoring order.
    pub fn of_type<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a TiledObject> + 'a {
        self.objects.iter().filter(move |o| o.kind == kind)
    }
}

/// An `<object>` inside an object group.
#[derive(Debug, Clone, Default)]
pub struct TiledObject {
    /// Object id
    pub id: u32,
    /// `name` attribute
    pub name: String,
    /// `type` attribute (or `class` in newer Tiled versions)
    pub kind: String,
    /// Left edge (or point) x, pixels
    pub x: f32,
    /// Top edge (or point) y, pixels
    pub y: f32,
    /// Width in pixels, 0 for points
    pub width: f32,
    /// Height in pixels, 0 for points
    pub height: f32,
    /// Rotation in degrees, clockwise
    pub rotation: f32,
    /// `visible` attribute
    pub visible: bool,
    /// Object properties
    pub properties: Properties,
}

impl TiledObject {
    /// Name if set, otherwise the type; used in error messages.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.kind
        } else {
            &self.name
        }
    }
}
