//! Fragment types attached to entities
//!
//! Axis convention: x is the lane axis, y is the forward/scroll axis and z is
//! height above the water.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::pool::PoolCategory;
use super::powerups::PowerUpKind;
use crate::consts::LANE_COUNT;

/// World position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position(pub Vec3);

/// Linear velocity (units/s)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity(pub Vec3);

/// Box extents; overlap tests use width on x and height on y
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl Collider {
    pub const fn new(width: f32, height: f32, depth: f32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Half extents on the lane and forward axes
    #[inline]
    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }
}

/// Kind of scoring collectible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectibleKind {
    Coin,
    Gem,
}

/// Scoring collectible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectibleTag {
    pub kind: CollectibleKind,
    pub value: u32,
}

/// Power-up pickup floating in a lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUpPickup {
    pub kind: PowerUpKind,
    /// Buff duration once collected (0 for the shield)
    pub duration_ticks: u32,
}

/// What produced a particle (renderer picks colours from it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticleKind {
    Splash,
    Shield,
    Hit,
    Coin,
    Gem,
    PowerUp,
    NearMiss,
}

/// Short-lived effect particle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub kind: ParticleKind,
    pub lifetime_ticks: u32,
    pub remaining_ticks: u32,
}

impl Particle {
    pub fn new(kind: ParticleKind, lifetime_ticks: u32) -> Self {
        Self {
            kind,
            lifetime_ticks,
            remaining_ticks: lifetime_ticks,
        }
    }

    /// Fraction of life remaining in [0, 1]
    pub fn life(&self) -> f32 {
        if self.lifetime_ticks == 0 {
            0.0
        } else {
            self.remaining_ticks as f32 / self.lifetime_ticks as f32
        }
    }
}

/// Player hit points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health(pub u8);

/// Discrete lane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lane {
    Left,
    Center,
    Right,
}

impl Lane {
    pub const ALL: [Lane; LANE_COUNT] = [Lane::Left, Lane::Center, Lane::Right];

    /// Signed index in {-1, 0, 1}
    pub fn index(self) -> i8 {
        match self {
            Lane::Left => -1,
            Lane::Center => 0,
            Lane::Right => 1,
        }
    }

    pub fn from_index(index: i8) -> Option<Lane> {
        match index {
            -1 => Some(Lane::Left),
            0 => Some(Lane::Center),
            1 => Some(Lane::Right),
            _ => None,
        }
    }

    /// Neighbouring lane, or `None` past a bank
    pub fn offset(self, delta: i8) -> Option<Lane> {
        Lane::from_index(self.index().checked_add(delta)?)
    }
}

/// Player momentum and animation clocks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OtterPhysics {
    pub target_x: f32,
    pub velocity_x: f32,
    /// Seconds of bobbing accumulated
    pub bob_time: f32,
    /// Seconds spent not transitioning
    pub idle_time: f32,
    pub is_transitioning: bool,
    /// Resting height the bob oscillates around
    pub base_z: f32,
}

impl OtterPhysics {
    pub fn at_rest(x: f32, base_z: f32) -> Self {
        Self {
            target_x: x,
            velocity_x: 0.0,
            bob_time: 0.0,
            idle_time: 0.0,
            is_transitioning: false,
            base_z,
        }
    }
}

/// Euler orientation (x = pitch, y = yaw, z = roll)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RotationState {
    pub current: Vec3,
    pub target: Vec3,
    /// Change applied during the last tick (radians/tick)
    pub velocity: Vec3,
}

/// Jump arc bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpState {
    pub is_jumping: bool,
    pub vertical_velocity: f32,
    /// Tick of the most recent take-off
    pub jump_start_tick: Option<u64>,
    pub ground_z: f32,
    /// Set on the tick the player touches down
    pub is_landing: bool,
}

impl JumpState {
    pub fn grounded(ground_z: f32) -> Self {
        Self {
            is_jumping: false,
            vertical_velocity: 0.0,
            jump_start_tick: None,
            ground_z,
            is_landing: false,
        }
    }
}

/// Animation clip requested of the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationClip {
    Idle,
    Swim,
    Jump,
    Hit,
    Collect,
    Dodge,
    Death,
}

/// Animation selection, tick-counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationState {
    pub current: AnimationClip,
    pub previous: Option<AnimationClip>,
    pub start_tick: u64,
    pub duration_ticks: Option<u32>,
    pub is_one_shot: bool,
    pub return_to: Option<AnimationClip>,
}

impl AnimationState {
    pub fn looping(clip: AnimationClip, now: u64) -> Self {
        Self {
            current: clip,
            previous: None,
            start_tick: now,
            duration_ticks: None,
            is_one_shot: false,
            return_to: None,
        }
    }
}

/// Visual variant index chosen by the spawner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant(pub u8);

/// Pool an entity returns to when purged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pooled(pub PoolCategory);
