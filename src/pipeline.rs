//! End-to-end offline bake: `.tmx` -> [`BakedAsset`] -> JSON.

use crate::bake::{bake_layers, BakedMap};
use crate::document::TiledDocument;
use crate::error::MapError;
use crate::gameplay::{extract_extras, BakeProfile, MapExtras};
use crate::images::{DirImages, ImageSource};
use crate::loader::tmx_loader::parse_tmx_file;
use crate::slicer::TileCatalog;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Everything the runtime loads for one map.
///
/// Image paths inside are relative to the directory the map was authored in;
/// keep the asset file next to the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BakedAsset {
    /// Renderable layers
    pub map: BakedMap,
    /// Profile-specific records
    pub extras: MapExtras,
}

/// Bake an already-parsed document.
pub fn bake_document(
    doc: &TiledDocument,
    profile: BakeProfile,
    images: &mut dyn ImageSource,
) -> Result<BakedAsset, MapError> {
    let catalog = TileCatalog::build(&doc.tilesets, images)?;
    let map = bake_layers(doc, &catalog)?;
    let extras = extract_extras(doc, profile, images)?;
    info!(
        profile = %profile,
        layers = map.layers.len(),
        tiles = catalog.len(),
        "map baked"
    );
    Ok(BakedAsset { map, extras })
}

/// Parse and bake a `.tmx` file, reading images relative to it.
pub fn bake_tmx_file(path: &Path, profile: BakeProfile) -> Result<BakedAsset, MapError> {
    let (doc, dir) = parse_tmx_file(path)?;
    let mut images = DirImages::new(dir);
    bake_document(&doc, profile, &mut images)
}

impl BakedAsset {
    /// Pretty JSON; identical input always gives identical bytes.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty JSON to `path`.
    pub fn save(&self, path: &Path) -> Result<(), MapError> {
        let json = self.to_json().map_err(|source| MapError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "asset written");
        Ok(())
    }

    /// Read an asset written by [`BakedAsset::save`].
    pub fn load(path: &Path) -> Result<Self, MapError> {
        let text = std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| MapError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ObjectGroup, TileFlip, TileLayer, Tileset};
    use crate::images::MemoryImages;
    use macroquad::color::WHITE;
    use macroquad::texture::Image;

    fn doc() -> TiledDocument {
        TiledDocument {
            width: 2,
            height: 1,
            tile_width: 8,
            tile_height: 8,
            tilesets: vec![Tileset {
                name: "road".into(),
                first_tile_id: 1,
                tile_width: 8,
                tile_height: 8,
                image_filename: "road.png".into(),
                ..Default::default()
            }],
            layers: vec![TileLayer {
                name: "ground".into(),
                width: 2,
                height: 1,
                opacity: 0.5,
                visible: true,
                tile_indices: vec![1, 2],
                flip_flags: vec![TileFlip::empty(), TileFlip::DIAGONAL],
                ..Default::default()
            }],
            object_groups: vec![ObjectGroup {
                name: "Objects".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn images() -> MemoryImages {
        MemoryImages::new().with("road.png", Image::gen_image_color(16, 8, WHITE))
    }

    #[test]
    fn baking_twice_gives_identical_json() {
        let a = bake_document(&doc(), BakeProfile::Intro, &mut images()).expect("bake a");
        let b = bake_document(&doc(), BakeProfile::Intro, &mut images()).expect("bake b");
        assert_eq!(a.to_json().expect("json a"), b.to_json().expect("json b"));
    }

    #[test]
    fn json_round_trip_preserves_the_asset() {
        let asset = bake_document(&doc(), BakeProfile::Plain, &mut images()).expect("bake");
        let back: BakedAsset = serde_json::from_str(&asset.to_json().expect("json")).expect("parse");
        assert_eq!(back, asset);
        assert_eq!(back.map.layers[0].opacity, 0.5);
    }

    #[test]
    fn missing_tileset_image_fails_the_bake() {
        let err = bake_document(&doc(), BakeProfile::Plain, &mut MemoryImages::new()).expect_err("image");
        assert!(matches!(err, MapError::Image { .. }));
    }
}
