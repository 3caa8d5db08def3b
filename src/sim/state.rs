//! Per-run game state and core simulation types
//!
//! Everything a run owns lives here: the entity store, its pools, the random
//! stream, spawner counters, buffs, combo and session counters. A new run
//! builds a fresh `GameState`, which is how session-scoped state resets.

use std::f32::consts::TAU;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::fragments::{
    AnimationClip, AnimationState, Collider, Health, JumpState, Lane, OtterPhysics, Particle,
    ParticleKind, Position, RotationState, Velocity,
};
use super::pool::{EntityPools, PoolCategory};
use super::powerups::{Combo, PowerUpKind, PowerUps};
use super::rng::RandomStream;
use super::spawner::{Biome, SpawnerState, speed_multiplier};
use super::world::{EntityId, FragmentMask, World};
use crate::achievements::{AchievementTracker, AchievementUnlocked, StatSnapshot};
use crate::consts::TICKS_PER_SECOND;
use crate::tuning::Tuning;
use crate::{jitter_hash, secs_to_ticks, ticks_to_secs, unit_from_hash};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Ticks are not scheduled
    Paused,
    /// Run ended
    GameOver,
}

/// Rule set for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Classic,
    /// No obstacles spawn
    Zen,
    /// Obstacles never collide; the run ends when the clock runs out
    TimeTrial,
}

impl GameMode {
    pub fn spawns_obstacles(self) -> bool {
        self != GameMode::Zen
    }

    pub fn obstacles_collide(self) -> bool {
        self == GameMode::Classic
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    HealthDepleted,
    TimeUp,
    Quit,
}

/// What the spawner produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnKind {
    Obstacle,
    Coin,
    Gem,
    PowerUp(PowerUpKind),
    Decoration,
}

/// Notifications for audio, scoring and UI collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Unshielded hit; `health` is what remains
    ObstacleHit { position: Vec3, health: u8 },
    /// Shield absorbed a hit and was consumed
    ShieldBlocked { position: Vec3 },
    CoinCollected { value: u32, points: u64 },
    GemCollected { value: u32, points: u64 },
    PowerUpActivated { kind: PowerUpKind },
    PowerUpDeactivated { kind: PowerUpKind },
    NearMiss { position: Vec3, bonus: u32 },
    GameOver { reason: GameOverReason },
    AchievementUnlocked(AchievementUnlocked),
    MilestoneReached { distance: u32 },
    BiomeChanged { biome: Biome },
    Spawned { kind: SpawnKind, lane: Option<Lane>, variant: u8 },
    Jumped,
    Landed { position: Vec3 },
}

/// Session-scoped counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Metres travelled
    pub distance: f32,
    /// Total score (bonus points plus distance points)
    pub score: u64,
    /// Points from pickups and near-misses
    pub bonus_points: u64,
    pub coins: u32,
    pub gems: u32,
    pub near_misses: u32,
    pub power_ups: u32,
    pub hits_taken: u32,
    pub shields_used: u32,
    /// Tick of the last unshielded hit (0 if none)
    pub last_damage_tick: u64,
}

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct GameState {
    pub tuning: Tuning,
    pub mode: GameMode,
    pub phase: GamePhase,
    pub world: World,
    pub pools: EntityPools,
    /// Owned by the run; only the spawner draws from it
    pub rng: RandomStream,
    pub spawner: SpawnerState,
    pub power_ups: PowerUps,
    pub combo: Combo,
    pub stats: RunStats,
    pub biome: Biome,
    pub achievements: AchievementTracker,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Obstacle hits are ignored before this tick
    pub invulnerable_until: u64,
    /// The single player entity
    pub player: EntityId,
    /// Milestones already announced (prefix of the tuning list)
    pub milestones_reached: usize,
    /// Notifications raised since the last drain
    pub events: Vec<GameEvent>,
    bursts: u64,
    malformed_reported: u32,
}

impl GameState {
    /// Build a run: fresh store, player at the centre lane, prewarmed pools
    pub fn new(
        seed_phrase: Option<&str>,
        mode: GameMode,
        tuning: Tuning,
        achievements: AchievementTracker,
    ) -> Self {
        let rng = RandomStream::new(seed_phrase);
        let mut world = World::new();
        let mut pools = EntityPools::new();
        let player = spawn_player(&mut world, &tuning);

        for category in PoolCategory::ALL {
            pools.prewarm(&mut world, category, tuning.spawn.pool_prewarm);
        }

        log::info!("Run start: mode {mode:?}, seed phrase \"{}\"", rng.phrase());

        Self {
            mode,
            phase: GamePhase::Playing,
            world,
            pools,
            rng,
            spawner: SpawnerState::default(),
            power_ups: PowerUps::new(),
            combo: Combo::default(),
            stats: RunStats::default(),
            biome: Biome::Forest,
            achievements,
            time_ticks: 0,
            invulnerable_until: 0,
            player,
            milestones_reached: 0,
            events: Vec::new(),
            bursts: 0,
            malformed_reported: 0,
            tuning,
        }
    }

    #[inline]
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take every pending notification
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn health(&self) -> u8 {
        self.world
            .get::<Health>(self.player)
            .map(|h| h.0)
            .unwrap_or(0)
    }

    pub fn player_lane(&self) -> Lane {
        self.world
            .get::<Lane>(self.player)
            .copied()
            .unwrap_or(Lane::Center)
    }

    pub fn player_position(&self) -> Vec3 {
        self.world
            .get::<Position>(self.player)
            .map(|p| p.0)
            .unwrap_or(Vec3::ZERO)
    }

    /// Spawn grace, tutorial window or post-hit window
    pub fn is_invulnerable(&self) -> bool {
        let run = &self.tuning.run;
        self.time_ticks < secs_to_ticks(run.spawn_grace_secs) as u64
            || self.time_ticks < secs_to_ticks(run.tutorial_secs) as u64
            || self.time_ticks < self.invulnerable_until
    }

    /// World scroll speed this tick (units/s)
    pub fn scroll_speed(&self) -> f32 {
        self.tuning.difficulty.base_scroll_speed
            * speed_multiplier(self.stats.distance, &self.tuning.difficulty)
            * self.power_ups.speed_factor(&self.tuning.power_ups)
    }

    /// Seconds since the last unshielded hit
    pub fn survival_secs(&self) -> f32 {
        ticks_to_secs(self.time_ticks.saturating_sub(self.stats.last_damage_tick))
    }

    /// Damage-free run that went far enough
    pub fn is_perfect(&self) -> bool {
        self.stats.hits_taken == 0
            && self.stats.distance >= self.tuning.scoring.perfect_run_min_distance
    }

    /// Remaining time in a time-trial run
    pub fn time_left_ticks(&self) -> Option<u64> {
        (self.mode == GameMode::TimeTrial).then(|| {
            (secs_to_ticks(self.tuning.run.time_trial_secs) as u64).saturating_sub(self.time_ticks)
        })
    }

    /// Session-scoped stats for achievement checks
    pub fn stat_snapshot(&self) -> StatSnapshot {
        StatSnapshot {
            distance: self.stats.distance as f64,
            coins: self.stats.coins as f64,
            gems: self.stats.gems as f64,
            max_combo: self.combo.max as f64,
            survival_time: self.survival_secs() as f64,
            score: self.stats.score as f64,
            ..Default::default()
        }
    }

    /// Enter game over once; later calls are ignored
    pub fn end_run(&mut self, reason: GameOverReason) {
        if self.phase == GamePhase::GameOver {
            return;
        }
        self.phase = GamePhase::GameOver;
        if let Some(anim) = self.world.get_mut::<AnimationState>(self.player) {
            super::movement::set_animation(anim, AnimationClip::Death, self.time_ticks);
        }
        log::info!(
            "Run over ({reason:?}): {:.0} m, score {}",
            self.stats.distance,
            self.stats.score
        );
        self.emit(GameEvent::GameOver { reason });
    }

    /// Burst of pooled particles drifting outward from `center`
    pub fn spawn_particles(&mut self, kind: ParticleKind, center: Vec3, count: u32) {
        let salt = self.next_burst_salt();
        let speed = self.tuning.spawn.particle_speed;
        let positions: Vec<(Vec3, Vec3)> = (0..count)
            .map(|i| {
                let h = jitter_hash(salt, i);
                let angle = unit_from_hash(h) * TAU;
                let spread = speed * (0.5 + 0.5 * unit_from_hash(h.rotate_left(11)));
                let lift = speed * unit_from_hash(h.rotate_left(22));
                (
                    center,
                    Vec3::new(angle.cos() * spread, angle.sin() * spread, lift),
                )
            })
            .collect();
        self.spawn_particles_at(kind, &positions);
    }

    /// Place particles at explicit positions with explicit velocities
    pub fn spawn_particles_at(&mut self, kind: ParticleKind, particles: &[(Vec3, Vec3)]) {
        let lifetime = secs_to_ticks(self.tuning.spawn.particle_lifetime_secs);
        for (position, velocity) in particles {
            let id = self.pools.acquire(&mut self.world, PoolCategory::Particle);
            self.world.insert(id, Position(*position));
            self.world.insert(id, Velocity(*velocity));
            self.world.insert(id, Particle::new(kind, lifetime));
        }
    }

    /// Distinct hash salt per burst (visual only)
    pub fn next_burst_salt(&mut self) -> u64 {
        self.bursts += 1;
        self.time_ticks
            .wrapping_mul(TICKS_PER_SECOND as u64)
            .wrapping_add(self.bursts.rotate_left(32))
    }

    /// Count of malformed-entity warnings issued this run
    pub fn malformed_reported(&self) -> u32 {
        self.malformed_reported
    }

    pub(crate) fn note_malformed(&mut self) {
        self.malformed_reported += 1;
    }
}

fn spawn_player(world: &mut World, tuning: &Tuning) -> EntityId {
    let lanes = &tuning.lanes;
    let x = tuning.lane_x(Lane::Center.index());
    let player = world.create();
    world.tag(player, FragmentMask::PLAYER);
    world.insert(player, Position(Vec3::new(x, lanes.player_y, lanes.player_z)));
    world.insert(player, tuning.collision.player_collider);
    world.insert(player, Health(tuning.run.starting_health));
    world.insert(player, Lane::Center);
    world.insert(player, OtterPhysics::at_rest(x, lanes.player_z));
    world.insert(player, RotationState::default());
    world.insert(player, JumpState::grounded(lanes.player_z));
    world.insert(player, AnimationState::looping(AnimationClip::Swim, 0));
    player
}

/// Collider used for a spawned kind
pub fn collider_for(kind: SpawnKind, tuning: &Tuning) -> Option<Collider> {
    let c = &tuning.collision;
    match kind {
        SpawnKind::Obstacle => Some(c.obstacle_collider),
        SpawnKind::Coin => Some(c.coin_collider),
        SpawnKind::Gem => Some(c.gem_collider),
        SpawnKind::PowerUp(_) => Some(c.power_up_collider),
        SpawnKind::Decoration => None,
    }
}
