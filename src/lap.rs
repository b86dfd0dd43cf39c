//! Lap / checkpoint state machine, ghost recording and best-time bookkeeping.

use crate::error::RecordError;
use crate::gameplay::{GameplayObjects, MedalThresholds, Zone};
use crate::record::{LapRecord, Medal, RecordStore};
use macroquad::math::Vec2;
use std::f32::consts::{PI, TAU};
use tracing::{info, warn};

/// One recorded vehicle pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostSample {
    /// Seconds since the lap started
    pub time: f32,
    /// Vehicle centre
    pub position: Vec2,
    /// Heading in radians
    pub rotation: f32,
}

/// A lap trajectory, time-ordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GhostTrack {
    samples: Vec<GhostSample>,
}

impl GhostTrack {
    /// Wrap samples; they are expected in ascending time order.
    pub fn new(samples: Vec<GhostSample>) -> Self {
        Self { samples }
    }

    /// Recorded samples.
    pub fn samples(&self) -> &[GhostSample] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration of the recording.
    pub fn duration(&self) -> f32 {
        self.samples.last().map_or(0.0, |s| s.time)
    }

    /// Interpolated `(position, rotation)` at lap time `t`.
    ///
    /// Clamped to the first/last sample; `None` for an empty track.
    pub fn pose_at(&self, t: f32) -> Option<(Vec2, f32)> {
        let first = self.samples.first()?;
        let after = self.samples.partition_point(|s| s.time <= t);
        if after == 0 {
            return Some((first.position, first.rotation));
        }
        let a = &self.samples[after - 1];
        let Some(b) = self.samples.get(after) else {
            return Some((a.position, a.rotation));
        };

        let span = b.time - a.time;
        let k = if span > 0.0 { (t - a.time) / span } else { 0.0 };
        // shortest way round
        let mut turn = (b.rotation - a.rotation).rem_euclid(TAU);
        if turn > PI {
            turn -= TAU;
        }
        Some((a.position.lerp(b.position, k), a.rotation + turn * k))
    }
}

/// Something the UI layer may want to react to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LapEvent {
    /// First start-line crossing; timing begins
    Armed,
    /// Checkpoint `n` (authoring order) touched this lap
    CheckpointHit(usize),
    /// Valid lap finished
    LapCompleted {
        /// Seconds
        lap_time: f64,
        /// Beat the previous best (or first lap)
        new_best: bool,
    },
    /// Start line crossed without touching every checkpoint
    LapInvalid {
        /// Seconds
        lap_time: f64,
        /// Checkpoints not touched
        missed: usize,
    },
    /// Medal tier improved
    MedalAchieved(Medal),
}

/// Tracks checkpoints and lap times for one level and persists improvements.
pub struct LapTimer<S: RecordStore> {
    level: String,
    store: S,
    checkpoints: Vec<Zone>,
    startline: Zone,
    medals: MedalThresholds,

    hits: Vec<bool>,
    in_start: bool,
    armed: bool,
    lap_time: f64,
    recording: Vec<GhostSample>,

    record: LapRecord,
    loaded: bool,
    save_warned: bool,
}

impl<S: RecordStore> LapTimer<S> {
    /// Timer for `level`. A vehicle spawning inside the start zone is
    /// already armed; otherwise the first start-line entry arms it.
    pub fn new(level: impl Into<String>, objects: &GameplayObjects, store: S) -> Self {
        let in_start = objects.startline.contains(objects.spawn.position);
        Self {
            level: level.into(),
            store,
            checkpoints: objects.checkpoints.clone(),
            startline: objects.startline,
            medals: objects.medals,
            hits: vec![false; objects.checkpoints.len()],
            in_start,
            armed: in_start,
            lap_time: 0.0,
            recording: Vec::new(),
            record: LapRecord::default(),
            loaded: false,
            save_warned: false,
        }
    }

    fn ensure_loaded(&mut self) -> Result<(), RecordError> {
        if !self.loaded {
            if let Some(record) = self.store.load(&self.level)? {
                self.record = record;
            }
            self.loaded = true;
        }
        Ok(())
    }

    /// Advance by `dt` seconds with the vehicle at `position`/`rotation`.
    ///
    /// The stored record is read on the first call; a malformed save file
    /// is the only error.
    pub fn update(&mut self, dt: f32, position: Vec2, rotation: f32) -> Result<Vec<LapEvent>, RecordError> {
        self.ensure_loaded()?;
        let mut events = Vec::new();

        self.lap_time += dt as f64;
        self.recording.push(GhostSample {
            time: self.lap_time as f32,
            position,
            rotation,
        });

        for (i, zone) in self.checkpoints.iter().enumerate() {
            if !self.hits[i] && zone.contains(position) {
                self.hits[i] = true;
                events.push(LapEvent::CheckpointHit(i));
            }
        }

        let inside = self.startline.contains(position);
        if inside && !self.in_start {
            if self.armed {
                self.complete_lap(&mut events);
            } else {
                self.armed = true;
                events.push(LapEvent::Armed);
                info!(level = %self.level, "lap timer armed");
            }
            self.reset_lap();
        }
        self.in_start = inside;

        Ok(events)
    }

    /// Abandon the lap in progress with the vehicle now at `position`.
    ///
    /// Being placed inside the start zone is not a crossing: it arms the
    /// timer like a spawn does, but never completes a lap.
    pub fn restart(&mut self, position: Vec2) {
        self.reset_lap();
        self.in_start = self.startline.contains(position);
        self.armed |= self.in_start;
    }

    fn reset_lap(&mut self) {
        self.hits.iter_mut().for_each(|h| *h = false);
        self.lap_time = 0.0;
        self.recording.clear();
    }

    fn complete_lap(&mut self, events: &mut Vec<LapEvent>) {
        let lap_time = self.lap_time;
        let missed = self.hits.iter().filter(|h| !**h).count();
        if missed > 0 {
            info!(lap_time, missed, "lap invalid");
            events.push(LapEvent::LapInvalid { lap_time, missed });
            return;
        }

        self.record.last_lap = Some(lap_time);
        let new_best = self.record.best_lap.map_or(true, |best| lap_time < best);
        if new_best {
            self.record.best_lap = Some(lap_time);
            self.record.ghost = GhostTrack::new(std::mem::take(&mut self.recording));
        }
        events.push(LapEvent::LapCompleted { lap_time, new_best });
        info!(lap_time, new_best, "lap completed");

        let mut medal_changed = false;
        if let Some(best) = self.record.best_lap {
            let tier = self.medals.medal_for(best);
            if tier > self.record.medal {
                self.record.medal = tier;
                medal_changed = true;
                events.push(LapEvent::MedalAchieved(tier));
                info!(medal = tier.name(), "medal achieved");
            }
        }

        if new_best || medal_changed {
            self.persist();
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.level, &self.record) {
            if !self.save_warned {
                warn!(level = %self.level, error = %e, "could not save lap record; keeping it in memory");
                self.save_warned = true;
            }
        }
    }

    /// Seconds into the current lap.
    pub fn lap_time(&self) -> f64 {
        self.lap_time
    }

    /// Most recent valid lap.
    pub fn last_lap(&self) -> Option<f64> {
        self.record.last_lap
    }

    /// Fastest valid lap.
    pub fn best_lap(&self) -> Option<f64> {
        self.record.best_lap
    }

    /// Best tier so far.
    pub fn medal(&self) -> Medal {
        self.record.medal
    }

    /// The full in-memory record.
    pub fn record(&self) -> &LapRecord {
        &self.record
    }

    /// Trajectory of the best lap.
    pub fn best_ghost(&self) -> &GhostTrack {
        &self.record.ghost
    }

    /// Checkpoints touched this lap, in authoring order.
    pub fn checkpoints_hit(&self) -> &[bool] {
        &self.hits
    }

    /// Has the first start-line crossing happened.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Medal thresholds in use.
    pub fn thresholds(&self) -> &MedalThresholds {
        &self.medals
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
