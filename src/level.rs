//! One running race: baked map, vehicle, lap timer and the lazily built track mask.

use crate::bake::BakedMap;
use crate::error::{LevelError, MapError};
use crate::gameplay::GameplayObjects;
use crate::images::ImageSource;
use crate::lap::{LapEvent, LapTimer};
use crate::mask::TrackMask;
use crate::pipeline::BakedAsset;
use crate::record::RecordStore;
use crate::vehicle::{step, DriveInput, SpriteMask, StepReport, VehicleState, VehicleTuning};
use macroquad::math::Vec2;
use macroquad::texture::Image;
use tracing::info;

/// Outcome of one simulated frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Physics result
    pub step: StepReport,
    /// Lap timer events
    pub events: Vec<LapEvent>,
}

/// A level session. Owns the only mutable vehicle and lap state.
pub struct Level<S: RecordStore> {
    name: String,
    map: BakedMap,
    objects: GameplayObjects,
    tileset_images: Vec<Image>,
    sprite_image: Image,
    sprite: SpriteMask,
    tuning: VehicleTuning,
    mask: Option<TrackMask>,
    vehicle: VehicleState,
    timer: LapTimer<S>,
    paused: bool,
}

fn build_mask(map: &BakedMap, images: &[Image]) -> Result<TrackMask, MapError> {
    let layer = map
        .track_layer()
        .ok_or_else(|| MapError::MissingLayer("track".into()))?;
    TrackMask::build(map, layer, images)
}

/// The mask in `slot`, building it once.
fn ensure_mask<'a>(
    slot: &'a mut Option<TrackMask>,
    map: &BakedMap,
    images: &[Image],
) -> Result<&'a TrackMask, MapError> {
    let mask = match slot.take() {
        Some(mask) => mask,
        None => build_mask(map, images)?,
    };
    Ok(slot.insert(mask))
}

impl<S: RecordStore> Level<S> {
    /// Set up a level from a game-profile asset. `images` resolves the
    /// tileset and vehicle sprite paths stored in the asset.
    pub fn new(
        name: impl Into<String>,
        asset: BakedAsset,
        images: &mut dyn ImageSource,
        tuning: VehicleTuning,
        store: S,
    ) -> Result<Self, MapError> {
        let name = name.into();
        let objects = asset.extras.gameplay.ok_or_else(|| MapError::MissingObject {
            group: crate::gameplay::OBJECTS_GROUP.into(),
            kind: "Player".into(),
        })?;

        let tileset_images = asset
            .map
            .textures
            .iter()
            .map(|path| images.image(path).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        let sprite_image = images.image(&objects.spawn.texture)?.clone();
        let sprite = SpriteMask::from_image(&sprite_image);

        info!(level = %name, sprite_pixels = sprite.len(), "level loaded");
        Ok(Self {
            vehicle: VehicleState::spawn(&objects.spawn),
            timer: LapTimer::new(name.clone(), &objects, store),
            name,
            map: asset.map,
            objects,
            tileset_images,
            sprite_image,
            sprite,
            tuning,
            mask: None,
            paused: false,
        })
    }

    /// The drivable mask, built on first access.
    pub fn track_mask(&mut self) -> Result<&TrackMask, MapError> {
        ensure_mask(&mut self.mask, &self.map, &self.tileset_images)
    }

    /// Has the mask been built yet.
    pub fn mask_built(&self) -> bool {
        self.mask.is_some()
    }

    /// Simulate one frame. Returns `None` while paused.
    pub fn update(&mut self, dt: f32, input: DriveInput) -> Result<Option<Frame>, LevelError> {
        if self.paused {
            return Ok(None);
        }

        let mask = ensure_mask(&mut self.mask, &self.map, &self.tileset_images)?;

        let report = step(&mut self.vehicle, input, dt, &self.tuning, &self.sprite, mask);
        let events = self
            .timer
            .update(dt, self.vehicle.position, self.vehicle.rotation)?;

        Ok(Some(Frame { step: report, events }))
    }

    /// Freeze or resume simulation and lap timing.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Paused state.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Put the car back on the spawn point, at rest. The lap in progress is
    /// abandoned; records and the best ghost are kept.
    pub fn respawn(&mut self) {
        self.vehicle = VehicleState::spawn(&self.objects.spawn);
        self.timer.restart(self.vehicle.position);
    }

    /// Where the best-lap ghost is at the current lap time.
    pub fn ghost_pose(&self) -> Option<(Vec2, f32)> {
        self.timer.best_ghost().pose_at(self.timer.lap_time() as f32)
    }

    /// Level name (save-file key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The vehicle.
    pub fn vehicle(&self) -> &VehicleState {
        &self.vehicle
    }

    /// Lap timer.
    pub fn timer(&self) -> &LapTimer<S> {
        &self.timer
    }

    /// Baked layers.
    pub fn map(&self) -> &BakedMap {
        &self.map
    }

    /// Spawn, zones, thresholds.
    pub fn objects(&self) -> &GameplayObjects {
        &self.objects
    }

    /// Decoded tileset images, parallel to `map().textures`.
    pub fn tileset_images(&self) -> &[Image] {
        &self.tileset_images
    }

    /// Decoded vehicle sprite.
    pub fn sprite_image(&self) -> &Image {
        &self.sprite_image
    }
}
