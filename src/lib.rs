#![warn(missing_docs)]

//! Drifted: a top-down drift racer on Macroquad.
//!
//! Tiled `.tmx` maps are baked offline into a JSON asset (layers with
//! resolved tile geometry plus typed gameplay records). At runtime a
//! [`Level`] builds a per-pixel track mask from the baked track layer and
//! drives the vehicle model, lap timer and best-time records against it.

pub mod bake;
pub mod document;
mod error;
pub mod gameplay;
pub mod images;
pub mod lap;
pub mod level;
/// TMX parsing.
pub mod loader {
    pub(crate) mod tile_data;
    /// `.tmx` document reader.
    pub mod tmx_loader;
    pub(crate) mod xml;
}
pub mod mask;
pub mod pipeline;
pub mod record;
pub mod render;
pub mod slicer;
pub mod spatial;
pub mod vehicle;

pub use bake::{bake_layers, BakedLayer, BakedMap, BakedTile, WorldRect};
pub use document::{ObjectGroup, Properties, TileFlip, TileLayer, TiledDocument, TiledObject, Tileset};
pub use error::{ConfigError, LevelError, MapError, ParseErrorKind, RecordError};
pub use gameplay::{
    extract_extras, BakeProfile, GameplayObjects, LevelEntry, LevelScreenAnchors, MapExtras,
    MedalThresholds, PlayerSpawn, TextAnchor, TextStyle, Zone,
};
pub use images::{DirImages, ImageSource, MemoryImages};
pub use lap::{GhostSample, GhostTrack, LapEvent, LapTimer};
pub use level::{Frame, Level};
pub use loader::tmx_loader::{parse_tmx_file, parse_tmx_str};
pub use mask::TrackMask;
pub use pipeline::{bake_document, bake_tmx_file, BakedAsset};
pub use record::{FileRecordStore, LapRecord, Medal, MemoryRecordStore, RecordStore};
pub use slicer::{slice_tileset, SourceRect, TileCatalog, TileCatalogEntry};
pub use vehicle::{step, Coverage, DriftCue, DriveInput, SpriteMask, StepReport, VehicleState, VehicleTuning};
