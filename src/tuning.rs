//! Data-driven game balance
//!
//! Every balance constant the simulation reads lives here. Durations are
//! authored in seconds and converted to ticks with [`crate::secs_to_ticks`]
//! when a timer is armed, so runtime behaviour stays tick-counted.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::fragments::Collider;

/// Errors raised while loading or validating tuning data
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Lane and river geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneTuning {
    /// Distance between adjacent lane centres
    pub lane_width: f32,
    /// Half width of the navigable river (decorations spawn inside it)
    pub river_half_width: f32,
    /// Forward-axis position of the player
    pub player_y: f32,
    /// Resting height of the player
    pub player_z: f32,
}

impl Default for LaneTuning {
    fn default() -> Self {
        Self {
            lane_width: 2.0,
            river_half_width: 3.0,
            player_y: -3.0,
            player_z: 0.0,
        }
    }
}

/// Momentum-based lane change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementTuning {
    /// Acceleration toward the target lane (units/s²)
    pub acceleration: f32,
    /// Horizontal speed cap (units/s)
    pub max_velocity: f32,
    /// Per-tick velocity damping once inside the snap threshold
    pub damping: f32,
    /// Distance under which the player snaps onto the lane
    pub snap_threshold: f32,
    /// Speed under which the player counts as stopped
    pub velocity_snap_threshold: f32,
    /// Fraction of velocity reflected back on overshoot
    pub bounce_damping: f32,
    /// Speed above which the player counts as moving for orientation
    pub moving_velocity_threshold: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            acceleration: 25.0,
            max_velocity: 12.0,
            damping: 0.92,
            snap_threshold: 0.05,
            velocity_snap_threshold: 0.1,
            bounce_damping: 0.3,
            moving_velocity_threshold: 0.5,
        }
    }
}

/// Orientation limits and smoothing rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationTuning {
    /// Max roll while turning (radians)
    pub max_tilt: f32,
    /// Max yaw while turning (radians)
    pub max_yaw: f32,
    /// Max forward pitch at full speed (radians)
    pub max_pitch: f32,
    /// Roll smoothing rate (1/s)
    pub roll_rate: f32,
    /// Yaw smoothing rate (1/s)
    pub yaw_rate: f32,
    /// Pitch smoothing rate (1/s)
    pub pitch_rate: f32,
    /// Normalized speed above which turn orientation overrides idle motion
    pub active_threshold: f32,
}

impl Default for RotationTuning {
    fn default() -> Self {
        Self {
            max_tilt: PI / 6.0,
            max_yaw: PI / 8.0,
            max_pitch: PI / 12.0,
            roll_rate: 8.0,
            yaw_rate: 6.0,
            pitch_rate: 4.0,
            active_threshold: 0.1,
        }
    }
}

/// Water bobbing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BobTuning {
    /// Primary oscillations per second
    pub frequency: f32,
    /// Primary amplitude
    pub amplitude: f32,
    /// Secondary harmonic frequency as a multiple of the primary
    pub secondary_ratio: f32,
    /// Secondary amplitude as a fraction of the primary
    pub secondary_scale: f32,
    /// Secondary phase offset (radians)
    pub secondary_phase: f32,
}

impl Default for BobTuning {
    fn default() -> Self {
        Self {
            frequency: 2.5,
            amplitude: 0.08,
            secondary_ratio: 1.7,
            secondary_scale: 0.3,
            secondary_phase: 0.5,
        }
    }
}

/// Idle sway, head-bob and breathing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleTuning {
    pub sway_frequency: f32,
    pub sway_amplitude: f32,
    pub breath_frequency: f32,
    pub breath_amplitude: f32,
    pub head_bob_frequency: f32,
    pub head_bob_amplitude: f32,
}

impl Default for IdleTuning {
    fn default() -> Self {
        Self {
            sway_frequency: 0.8,
            sway_amplitude: PI / 36.0,
            breath_frequency: 1.2,
            breath_amplitude: 0.02,
            head_bob_frequency: 1.5,
            head_bob_amplitude: PI / 24.0,
        }
    }
}

/// Jump arc and landing splash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpTuning {
    /// Upward speed at take-off (units/s)
    pub initial_velocity: f32,
    /// Downward acceleration (units/s²)
    pub gravity: f32,
    /// Minimum time between jump starts
    pub cooldown_secs: f32,
    /// Particles in the landing ring
    pub splash_particle_count: u32,
    /// Radius of the landing ring
    pub splash_radius: f32,
}

impl Default for JumpTuning {
    fn default() -> Self {
        Self {
            initial_velocity: 8.0,
            gravity: 20.0,
            cooldown_secs: 1.0,
            splash_particle_count: 8,
            splash_radius: 0.4,
        }
    }
}

/// Collision sizes, near-miss zone, bounce and magnet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionTuning {
    /// Expansion applied to obstacle boxes for near-miss detection
    pub near_miss_margin: f32,
    /// Score awarded per near-miss
    pub near_miss_bonus: u32,
    /// Sideways impulse applied to the player on a hit
    pub bounce_impulse: f32,
    /// Radius in which the magnet pulls collectibles
    pub magnet_radius: f32,
    /// Fraction of the remaining gap a pulled collectible closes per tick
    pub magnet_pull: f32,
    pub player_collider: Collider,
    pub obstacle_collider: Collider,
    pub coin_collider: Collider,
    pub gem_collider: Collider,
    pub power_up_collider: Collider,
    pub hit_particles: u32,
    pub shield_particles: u32,
    pub coin_particles: u32,
    pub gem_particles: u32,
    pub power_up_particles: u32,
    pub near_miss_particles: u32,
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            near_miss_margin: 0.3,
            near_miss_bonus: 50,
            bounce_impulse: 5.0,
            magnet_radius: 3.0,
            magnet_pull: 0.15,
            player_collider: Collider::new(0.8, 1.2, 0.8),
            obstacle_collider: Collider::new(1.2, 1.2, 1.2),
            coin_collider: Collider::new(0.6, 0.6, 0.6),
            gem_collider: Collider::new(0.8, 0.8, 0.8),
            power_up_collider: Collider::new(0.8, 0.8, 0.8),
            hit_particles: 8,
            shield_particles: 10,
            coin_particles: 12,
            gem_particles: 12,
            power_up_particles: 16,
            near_miss_particles: 6,
        }
    }
}

/// Spawn placement and collectible draw bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    /// Forward-axis position where entities appear
    pub spawn_y: f32,
    /// Forward-axis position past which entities are recycled
    pub despawn_y: f32,
    /// Constant decoration interval
    pub decoration_interval_secs: f32,
    /// Probability a collectible spawn is a power-up pickup
    pub power_up_chance: f32,
    /// Probability a collectible spawn is a gem
    pub gem_chance: f32,
    /// Lifetime of effect particles
    pub particle_lifetime_secs: f32,
    /// Max particle drift speed
    pub particle_speed: f32,
    /// Distance at which each later biome begins (canyon, arctic, tropical, volcanic)
    pub biome_thresholds: [f32; 4],
    /// Entities pre-created per pool at run start
    pub pool_prewarm: usize,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            spawn_y: 8.0,
            despawn_y: -10.0,
            decoration_interval_secs: 1.5,
            power_up_chance: 0.05,
            gem_chance: 0.25,
            particle_lifetime_secs: 1.0,
            particle_speed: 1.0,
            biome_thresholds: [500.0, 1000.0, 1500.0, 2000.0],
            pool_prewarm: 16,
        }
    }
}

/// Difficulty curve: spawn intervals and scroll speed versus distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTuning {
    pub base_obstacle_interval: f32,
    pub min_obstacle_interval: f32,
    pub base_collectible_interval: f32,
    pub min_collectible_interval: f32,
    /// Distance at which spawn intervals reach their floor
    pub spawn_rate_max_distance: f32,
    /// World scroll speed at distance 0 (units/s, 1 unit = 1 m)
    pub base_scroll_speed: f32,
    pub speed_increase_per_interval: f32,
    pub speed_increase_distance: f32,
    pub max_speed_multiplier: f32,
}

impl Default for DifficultyTuning {
    fn default() -> Self {
        Self {
            base_obstacle_interval: 2.0,
            min_obstacle_interval: 1.0,
            base_collectible_interval: 3.0,
            min_collectible_interval: 1.5,
            spawn_rate_max_distance: 3000.0,
            base_scroll_speed: 5.0,
            speed_increase_per_interval: 0.1,
            speed_increase_distance: 500.0,
            max_speed_multiplier: 2.0,
        }
    }
}

/// Timed buff durations and strengths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpTuning {
    pub ghost_secs: f32,
    pub magnet_secs: f32,
    pub multiplier_secs: f32,
    pub multiplier_value: u32,
    pub slow_motion_secs: f32,
    /// Scroll speed factor while slow motion is active
    pub slow_motion_factor: f32,
}

impl Default for PowerUpTuning {
    fn default() -> Self {
        Self {
            ghost_secs: 5.0,
            magnet_secs: 8.0,
            multiplier_secs: 10.0,
            multiplier_value: 2,
            slow_motion_secs: 5.0,
            slow_motion_factor: 0.5,
        }
    }
}

/// Combo chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboTuning {
    /// Time without an incrementing event before the combo drops to zero
    pub timeout_secs: f32,
    pub coin_step: u32,
    pub gem_step: u32,
    pub near_miss_step: u32,
    /// Combo multiplier grows by one every this many combo points
    pub multiplier_breakpoint: u32,
}

impl Default for ComboTuning {
    fn default() -> Self {
        Self {
            timeout_secs: 2.0,
            coin_step: 1,
            gem_step: 2,
            near_miss_step: 1,
            multiplier_breakpoint: 10,
        }
    }
}

/// Collectible values and score accrual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringTuning {
    pub coin_value: u32,
    pub gem_value: u32,
    pub distance_points_per_meter: f32,
    /// Minimum distance for a damage-free run to count as perfect
    pub perfect_run_min_distance: f32,
}

impl Default for ScoringTuning {
    fn default() -> Self {
        Self {
            coin_value: 10,
            gem_value: 50,
            distance_points_per_meter: 1.0,
            perfect_run_min_distance: 100.0,
        }
    }
}

/// Per-run rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunTuning {
    pub starting_health: u8,
    /// Invincibility right after the player spawns
    pub spawn_grace_secs: f32,
    /// Invincible tutorial window at the start of a run (0 disables)
    pub tutorial_secs: f32,
    /// Invincibility after an unshielded hit
    pub hit_invulnerability_secs: f32,
    /// Length of a time-trial run
    pub time_trial_secs: f32,
    /// Distances that raise a milestone notification
    pub milestones: Vec<f32>,
}

impl Default for RunTuning {
    fn default() -> Self {
        Self {
            starting_health: 3,
            spawn_grace_secs: 0.5,
            tutorial_secs: 30.0,
            hit_invulnerability_secs: 1.0,
            time_trial_secs: 60.0,
            milestones: vec![100.0, 250.0, 500.0, 1000.0, 2000.0, 3000.0, 5000.0],
        }
    }
}

/// Achievement checking cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementTuning {
    pub check_interval_secs: f32,
}

impl Default for AchievementTuning {
    fn default() -> Self {
        Self {
            check_interval_secs: 1.0,
        }
    }
}

/// Complete balance table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub lanes: LaneTuning,
    pub movement: MovementTuning,
    pub rotation: RotationTuning,
    pub bobbing: BobTuning,
    pub idle: IdleTuning,
    pub jump: JumpTuning,
    pub collision: CollisionTuning,
    pub spawn: SpawnTuning,
    pub difficulty: DifficultyTuning,
    pub power_ups: PowerUpTuning,
    pub combo: ComboTuning,
    pub scoring: ScoringTuning,
    pub run: RunTuning,
    pub achievements: AchievementTuning,
}

fn invalid(field: &'static str, reason: impl Into<String>) -> TuningError {
    TuningError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn require_positive(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive, got {value}")))
    }
}

fn require_unit(field: &'static str, value: f32) -> Result<(), TuningError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("must be within [0, 1], got {value}")))
    }
}

impl Tuning {
    /// Parse tuning from JSON; missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Serialize to pretty JSON (for tooling that edits balance files)
    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check structural constraints the simulation relies on
    pub fn validate(&self) -> Result<(), TuningError> {
        require_positive("lanes.lane_width", self.lanes.lane_width)?;
        require_positive("lanes.river_half_width", self.lanes.river_half_width)?;

        let m = &self.movement;
        require_positive("movement.acceleration", m.acceleration)?;
        require_positive("movement.max_velocity", m.max_velocity)?;
        require_positive("movement.snap_threshold", m.snap_threshold)?;
        require_positive("movement.velocity_snap_threshold", m.velocity_snap_threshold)?;
        if !(0.0..1.0).contains(&m.damping) {
            return Err(invalid("movement.damping", "must be within [0, 1)"));
        }
        require_unit("movement.bounce_damping", m.bounce_damping)?;

        require_positive("jump.gravity", self.jump.gravity)?;
        require_positive("jump.initial_velocity", self.jump.initial_velocity)?;

        require_unit("collision.magnet_pull", self.collision.magnet_pull)?;
        if self.collision.near_miss_margin <= 0.0 {
            return Err(invalid("collision.near_miss_margin", "must be positive"));
        }

        let s = &self.spawn;
        require_unit("spawn.power_up_chance", s.power_up_chance)?;
        require_unit("spawn.gem_chance", s.gem_chance)?;
        if s.power_up_chance + s.gem_chance > 1.0 {
            return Err(invalid(
                "spawn.gem_chance",
                "power-up and gem chances must not exceed 1 combined",
            ));
        }
        if s.despawn_y >= s.spawn_y {
            return Err(invalid("spawn.despawn_y", "must lie behind spawn_y"));
        }
        require_positive("spawn.decoration_interval_secs", s.decoration_interval_secs)?;
        if s.biome_thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("spawn.biome_thresholds", "must be strictly increasing"));
        }

        let d = &self.difficulty;
        require_positive("difficulty.min_obstacle_interval", d.min_obstacle_interval)?;
        require_positive("difficulty.min_collectible_interval", d.min_collectible_interval)?;
        require_positive("difficulty.spawn_rate_max_distance", d.spawn_rate_max_distance)?;
        require_positive("difficulty.speed_increase_distance", d.speed_increase_distance)?;
        if d.min_obstacle_interval > d.base_obstacle_interval {
            return Err(invalid(
                "difficulty.min_obstacle_interval",
                "floor must not exceed the starting interval",
            ));
        }
        if d.min_collectible_interval > d.base_collectible_interval {
            return Err(invalid(
                "difficulty.min_collectible_interval",
                "floor must not exceed the starting interval",
            ));
        }
        if d.max_speed_multiplier < 1.0 {
            return Err(invalid("difficulty.max_speed_multiplier", "must be at least 1"));
        }

        require_positive("power_ups.slow_motion_factor", self.power_ups.slow_motion_factor)?;
        require_positive("combo.timeout_secs", self.combo.timeout_secs)?;
        if self.combo.multiplier_breakpoint == 0 {
            return Err(invalid("combo.multiplier_breakpoint", "must be non-zero"));
        }
        if self.run.starting_health == 0 {
            return Err(invalid("run.starting_health", "must be non-zero"));
        }
        require_positive("achievements.check_interval_secs", self.achievements.check_interval_secs)?;

        Ok(())
    }

    /// World x of a lane index in {-1, 0, 1}
    pub fn lane_x(&self, lane: i8) -> f32 {
        debug_assert!((-1..=1).contains(&lane), "lane index {lane} out of range");
        lane.clamp(-1, 1) as f32 * self.lanes.lane_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning_is_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let tuning = Tuning::from_json(r#"{ "run": { "starting_health": 5 } }"#).unwrap();
        assert_eq!(tuning.run.starting_health, 5);
        assert_eq!(tuning.run.spawn_grace_secs, RunTuning::default().spawn_grace_secs);
        assert_eq!(tuning.movement, MovementTuning::default());
    }

    #[test]
    fn test_rejects_inverted_interval() {
        let json = r#"{ "difficulty": { "base_obstacle_interval": 1.0, "min_obstacle_interval": 2.0 } }"#;
        match Tuning::from_json(json) {
            Err(TuningError::Invalid { field, .. }) => {
                assert_eq!(field, "difficulty.min_obstacle_interval")
            }
            other => panic!("expected invalid tuning, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_overfull_collectible_bands() {
        let mut tuning = Tuning::default();
        tuning.spawn.power_up_chance = 0.6;
        tuning.spawn.gem_chance = 0.6;
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(matches!(
            Tuning::from_json("{ not json"),
            Err(TuningError::Parse(_))
        ));
    }

    #[test]
    fn test_json_round_trip_preserves_values() {
        let mut tuning = Tuning::default();
        tuning.combo.gem_step = 3;
        let json = tuning.to_json().unwrap();
        assert_eq!(Tuning::from_json(&json).unwrap(), tuning);
    }

    #[test]
    fn test_lane_x() {
        let tuning = Tuning::default();
        assert_eq!(tuning.lane_x(-1), -2.0);
        assert_eq!(tuning.lane_x(0), 0.0);
        assert_eq!(tuning.lane_x(1), 2.0);
    }
}
