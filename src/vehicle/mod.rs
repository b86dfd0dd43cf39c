//! Top-down vehicle model: steering, drift blend, throttle, resistances and
//! the per-pixel off-track test against a [`TrackMask`].
//!
//! Rotation 0 faces +x; positive rotation turns clockwise on screen (y down).
//! A positive steering angle turns right.

pub mod tuning;

pub use tuning::VehicleTuning;

use crate::gameplay::PlayerSpawn;
use crate::images::{alpha_at, image_size};
use crate::mask::TrackMask;
use macroquad::math::{vec2, Vec2};
use macroquad::texture::Image;
use std::f32::consts::{PI, TAU};

/// Directional input snapshot for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveInput {
    /// Throttle
    pub forward: bool,
    /// Brake / reverse
    pub backward: bool,
    /// Steer left
    pub left: bool,
    /// Steer right
    pub right: bool,
}

/// Mutable physical state of the player's vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    /// Sprite centre, world pixels
    pub position: Vec2,
    /// Heading, radians in `(-π, π]`
    pub rotation: f32,
    /// Front wheel angle, radians
    pub steering_angle: f32,
    /// px/s
    pub velocity: Vec2,
    /// Moving against the facing direction
    pub in_reverse: bool,
}

impl VehicleState {
    /// At rest at `position`, facing `rotation`.
    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self {
            position,
            rotation: wrap_angle(rotation),
            steering_angle: 0.0,
            velocity: Vec2::ZERO,
            in_reverse: false,
        }
    }

    /// At rest on the map's spawn point.
    pub fn spawn(spawn: &PlayerSpawn) -> Self {
        Self::new(spawn.position, spawn.rotation)
    }

    /// Current speed, px/s.
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Unit vector the nose points along.
    pub fn facing(&self) -> Vec2 {
        Vec2::from_angle(self.rotation)
    }
}

/// Opaque pixel offsets of the vehicle sprite, relative to its centre.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpriteMask {
    offsets: Vec<Vec2>,
}

impl SpriteMask {
    /// Collect pixel centres with alpha > 0.
    pub fn from_image(image: &Image) -> Self {
        let (w, h) = image_size(image);
        let (half_w, half_h) = (w as f32 / 2.0, h as f32 / 2.0);
        let mut offsets = Vec::new();
        for y in 0..h {
            for x in 0..w {
                if alpha_at(image, x, y) > 0 {
                    offsets.push(vec2(x as f32 + 0.5 - half_w, y as f32 + 0.5 - half_h));
                }
            }
        }
        Self { offsets }
    }

    /// Explicit sample offsets.
    pub fn from_offsets(offsets: Vec<Vec2>) -> Self {
        Self { offsets }
    }

    /// Number of opaque samples.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// `true` for a fully transparent sprite.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// How much of the sprite at this pose sits off the track.
    pub fn coverage(&self, position: Vec2, rotation: f32, mask: &TrackMask) -> Coverage {
        if self.offsets.is_empty() {
            return Coverage::Fraction(0.0);
        }
        let rot = Vec2::from_angle(rotation);
        let mut off = 0usize;
        for &offset in &self.offsets {
            let p = position + rot.rotate(offset);
            if !mask.in_bounds(p.x, p.y) {
                return Coverage::OutOfBounds;
            }
            if !mask.is_drivable(p.x.floor() as i64, p.y.floor() as i64) {
                off += 1;
            }
        }
        Coverage::Fraction(off as f32 / self.offsets.len() as f32)
    }
}

/// Result of the off-track query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coverage {
    /// Some sample left the map; the pose must be rejected
    OutOfBounds,
    /// Share of opaque sprite pixels on non-drivable ground, `[0, 1]`
    Fraction(f32),
}

impl Coverage {
    /// Flat encoding: `-1.0` for out of bounds, else the fraction.
    pub fn as_sentinel(self) -> f32 {
        match self {
            Coverage::OutOfBounds => -1.0,
            Coverage::Fraction(f) => f,
        }
    }

    /// Off-track fraction, counting out-of-bounds as fully off.
    pub fn off_track(self) -> f32 {
        match self {
            Coverage::OutOfBounds => 1.0,
            Coverage::Fraction(f) => f,
        }
    }
}

/// Tire-mark / skid-sound trigger for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftCue {
    /// Where the marks go
    pub position: Vec2,
    /// Heading at the time
    pub rotation: f32,
    /// Drift multiplier, above the tuning threshold
    pub intensity: f32,
}

/// What happened during one [`step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Off-track query at the committed pose
    pub coverage: Coverage,
    /// Tentative pose left the map and was discarded
    pub rejected: bool,
    /// Drift multiplier used this frame
    pub drift: f32,
    /// Present when `drift` passed the FX threshold
    pub drift_cue: Option<DriftCue>,
}

/// Wrap into `(-π, π]`.
#[inline]
pub fn wrap_angle(a: f32) -> f32 {
    let r = (a + PI).rem_euclid(TAU) - PI;
    if r <= -PI {
        r + TAU
    } else {
        r
    }
}

fn update_steering(angle: f32, input: DriveInput, speed: f32, dt: f32, t: &VehicleTuning) -> f32 {
    let damping = if speed < 1.0 {
        1.0
    } else {
        speed.powf(-t.steering_damping_exponent)
    };
    let wanted = (input.right as i8 - input.left as i8) as f32;

    let next = if wanted != 0.0 {
        let rate = if wanted * angle < 0.0 {
            t.steering_return_rate
        } else {
            t.steering_rate
        };
        angle + wanted * rate * damping * dt
    } else {
        // ease back to centre without overshooting
        let back = t.steering_return_rate * damping * dt;
        if angle.abs() <= back {
            0.0
        } else {
            angle - back * angle.signum()
        }
    };
    next.clamp(-t.max_steering_angle, t.max_steering_angle)
}

/// Drift multiplier from steering load, `[0, max_drift]`.
pub fn drift_multiplier(steering_angle: f32, speed: f32, t: &VehicleTuning) -> f32 {
    let load = (steering_angle * speed).abs() - t.drift_threshold;
    if load <= 0.0 {
        return 0.0;
    }
    (load * t.drift_scale).sqrt().clamp(0.0, t.max_drift)
}

/// Advance `state` by `dt` seconds.
///
/// A tentative pose with any sprite sample outside the map is rejected:
/// velocity is zeroed and the previous pose kept.
pub fn step(
    state: &mut VehicleState,
    input: DriveInput,
    dt: f32,
    tuning: &VehicleTuning,
    sprite: &SpriteMask,
    mask: &TrackMask,
) -> StepReport {
    let off_track = sprite.coverage(state.position, state.rotation, mask).off_track();

    let speed = state.speed();
    state.steering_angle = update_steering(state.steering_angle, input, speed, dt, tuning);

    // throttle
    let facing = state.facing();
    let mut throttle = 0.0;
    if input.forward {
        throttle += tuning.acceleration;
    }
    if input.backward {
        throttle -= tuning.reverse_acceleration;
    }
    let mut velocity = state.velocity + facing * throttle * dt;
    state.in_reverse = velocity.dot(facing) < 0.0;

    // resistances
    let mut speed = velocity.length();
    let mut loss = tuning.rolling_resistance * dt + tuning.drag * speed * dt;
    if speed > tuning.off_track_min_speed {
        loss += tuning.off_track_resistance * off_track * dt;
    }
    speed = (speed - loss).max(0.0);
    let prior_dir = velocity.normalize_or_zero();

    // grip heading vs momentum
    let sign = if state.in_reverse { -1.0 } else { 1.0 };
    let yaw = sign * speed * dt * state.steering_angle.tan() / tuning.wheelbase.max(f32::EPSILON);
    let grip_dir = Vec2::from_angle(state.rotation + yaw) * sign;
    let drift = drift_multiplier(state.steering_angle, speed, tuning);
    let mut dir = (grip_dir * (1.0 - drift) + prior_dir * drift).normalize_or_zero();
    if dir == Vec2::ZERO {
        dir = grip_dir;
    }
    velocity = dir * speed;

    let mut rotation = grip_dir.y.atan2(grip_dir.x);
    if state.in_reverse {
        rotation += PI;
    }
    let rotation = wrap_angle(rotation);
    let position = state.position + velocity * dt;

    let coverage = sprite.coverage(position, rotation, mask);
    let rejected = coverage == Coverage::OutOfBounds;
    let coverage = if rejected {
        state.velocity = Vec2::ZERO;
        sprite.coverage(state.position, state.rotation, mask)
    } else {
        state.position = position;
        state.rotation = rotation;
        state.velocity = velocity;
        coverage
    };

    let drift_cue = (drift > tuning.drift_fx_threshold).then_some(DriftCue {
        position: state.position,
        rotation: state.rotation,
        intensity: drift,
    });

    StepReport {
        coverage,
        rejected,
        drift,
        drift_cue,
    }
}
