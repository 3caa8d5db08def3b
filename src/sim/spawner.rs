//! Procedural spawner and difficulty curve
//!
//! Per-category tick counters fire a spawn when the elapsed time strictly
//! exceeds the category interval. Obstacle and collectible intervals shrink
//! linearly with distance down to a floor; decorations use a constant interval.
//! Every draw goes through the run's `RandomStream`, in a fixed order, so a
//! seed phrase reproduces the same spawn sequence.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::fragments::{CollectibleKind, CollectibleTag, Lane, Position, PowerUpPickup, Variant, Velocity};
use super::pool::PoolCategory;
use super::powerups::PowerUpKind;
use super::rng::RandomStream;
use super::state::{GameEvent, GamePhase, GameState, SpawnKind, collider_for};
use super::world::{EntityId, FragmentMask};
use crate::consts::TICKS_PER_SECOND;
use crate::tuning::{DifficultyTuning, SpawnTuning};

/// Themed stretch of river
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    Forest,
    Canyon,
    Arctic,
    Tropical,
    Volcanic,
}

impl Biome {
    /// Biome for a distance; `thresholds` start canyon, arctic, tropical, volcanic
    pub fn at_distance(distance: f32, thresholds: &[f32; 4]) -> Biome {
        const LATER: [Biome; 4] = [Biome::Canyon, Biome::Arctic, Biome::Tropical, Biome::Volcanic];
        thresholds
            .iter()
            .zip(LATER)
            .rev()
            .find(|(start, _)| distance >= **start)
            .map(|(_, biome)| biome)
            .unwrap_or(Biome::Forest)
    }

    /// Obstacle looks allowed in this biome
    pub fn obstacle_variants(self) -> &'static [u8] {
        match self {
            // Small rocks, stumps, logs
            Biome::Forest => &[0, 1, 2, 6, 7, 8, 9],
            Biome::Canyon => &[0, 1, 2, 3, 4, 5],
            // Icy, small rocks only
            Biome::Arctic => &[0, 1, 2],
            Biome::Tropical => &[0, 1, 2, 6, 7],
            // Large and tall rocks
            Biome::Volcanic => &[3, 4, 5],
        }
    }

    /// Decoration looks allowed in this biome
    pub fn decoration_variants(self) -> &'static [u8] {
        match self {
            Biome::Forest => &[0, 1, 2, 3, 4, 5, 6, 7],
            Biome::Tropical => &[0, 1, 2, 3, 8],
            Biome::Canyon | Biome::Arctic | Biome::Volcanic => &[0, 1],
        }
    }
}

/// Linear progress toward the difficulty cap, clamped to [0, 1]
fn difficulty_progress(distance: f32, tuning: &DifficultyTuning) -> f32 {
    (distance / tuning.spawn_rate_max_distance).clamp(0.0, 1.0)
}

/// Current obstacle interval in seconds
pub fn obstacle_interval(distance: f32, tuning: &DifficultyTuning) -> f32 {
    let t = difficulty_progress(distance, tuning);
    tuning.base_obstacle_interval - (tuning.base_obstacle_interval - tuning.min_obstacle_interval) * t
}

/// Current collectible interval in seconds
pub fn collectible_interval(distance: f32, tuning: &DifficultyTuning) -> f32 {
    let t = difficulty_progress(distance, tuning);
    tuning.base_collectible_interval
        - (tuning.base_collectible_interval - tuning.min_collectible_interval) * t
}

/// Scroll speed multiplier: a step every `speed_increase_distance`, capped
pub fn speed_multiplier(distance: f32, tuning: &DifficultyTuning) -> f32 {
    let steps = (distance.max(0.0) / tuning.speed_increase_distance).floor();
    (1.0 + steps * tuning.speed_increase_per_interval).min(tuning.max_speed_multiplier)
}

/// Ticks since each category last spawned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnerState {
    pub obstacle_ticks: u32,
    pub collectible_ticks: u32,
    pub decoration_ticks: u32,
}

/// True once `ticks` strictly exceeds `interval_secs`
#[inline]
fn elapsed(ticks: u32, interval_secs: f32) -> bool {
    ticks as f32 > interval_secs * TICKS_PER_SECOND as f32
}

/// Outcome of the three-way collectible draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectibleDraw {
    PowerUp(PowerUpKind),
    Gem(u8),
    Coin(u8),
}

/// One roll decides the band; the band then draws its own type or variant
pub fn draw_collectible(rng: &mut RandomStream, tuning: &SpawnTuning) -> CollectibleDraw {
    let roll = rng.random();
    let power_up_floor = 1.0 - tuning.power_up_chance as f64;
    let gem_floor = power_up_floor - tuning.gem_chance as f64;
    if roll > power_up_floor {
        let kind = rng
            .pick(&PowerUpKind::ALL)
            .copied()
            .unwrap_or(PowerUpKind::Shield);
        CollectibleDraw::PowerUp(kind)
    } else if roll > gem_floor {
        CollectibleDraw::Gem(rng.int(0, 2) as u8)
    } else {
        CollectibleDraw::Coin(rng.int(0, 2) as u8)
    }
}

/// Uniform lane among the three
fn draw_lane(rng: &mut RandomStream) -> Lane {
    Lane::from_index(rng.int(0, 2) as i8 - 1).unwrap_or(Lane::Center)
}

/// Advance spawn counters one tick and spawn whatever is due
pub fn update_spawner(state: &mut GameState) {
    if state.phase != GamePhase::Playing {
        return;
    }

    let distance = state.stats.distance;
    let difficulty = state.tuning.difficulty.clone();
    let biome = state.biome;

    state.spawner.obstacle_ticks += 1;
    state.spawner.collectible_ticks += 1;
    state.spawner.decoration_ticks += 1;

    if state.mode.spawns_obstacles()
        && elapsed(state.spawner.obstacle_ticks, obstacle_interval(distance, &difficulty))
    {
        let lane = draw_lane(&mut state.rng);
        let variant = state
            .rng
            .pick(biome.obstacle_variants())
            .copied()
            .unwrap_or(0);
        spawn_obstacle(state, lane, variant);
        state.spawner.obstacle_ticks = 0;
    }

    if elapsed(state.spawner.collectible_ticks, collectible_interval(distance, &difficulty)) {
        let lane = draw_lane(&mut state.rng);
        let draw = draw_collectible(&mut state.rng, &state.tuning.spawn);
        spawn_collectible(state, lane, draw);
        state.spawner.collectible_ticks = 0;
    }

    if elapsed(state.spawner.decoration_ticks, state.tuning.spawn.decoration_interval_secs) {
        let half = state.tuning.lanes.river_half_width;
        let x = state.rng.float(-half, half);
        let variant = state
            .rng
            .pick(biome.decoration_variants())
            .copied()
            .unwrap_or(0);
        spawn_decoration(state, x, variant);
        state.spawner.decoration_ticks = 0;
    }
}

/// Acquire a pooled entity placed at the spawn line
fn place(state: &mut GameState, category: PoolCategory, x: f32) -> EntityId {
    let id = state.pools.acquire(&mut state.world, category);
    let speed = state.scroll_speed();
    state
        .world
        .insert(id, Position(Vec3::new(x, state.tuning.spawn.spawn_y, 0.0)));
    state.world.insert(id, Velocity(Vec3::new(0.0, -speed, 0.0)));
    id
}

pub fn spawn_obstacle(state: &mut GameState, lane: Lane, variant: u8) -> EntityId {
    let x = state.tuning.lane_x(lane.index());
    let id = place(state, PoolCategory::Obstacle, x);
    if let Some(collider) = collider_for(SpawnKind::Obstacle, &state.tuning) {
        state.world.insert(id, collider);
    }
    state.world.insert(id, lane);
    state.world.insert(id, Variant(variant));
    state.world.tag(id, FragmentMask::OBSTACLE);
    log::debug!("spawn obstacle lane {lane:?} variant {variant}");
    state.emit(GameEvent::Spawned {
        kind: SpawnKind::Obstacle,
        lane: Some(lane),
        variant,
    });
    id
}

pub fn spawn_collectible(state: &mut GameState, lane: Lane, draw: CollectibleDraw) -> EntityId {
    let x = state.tuning.lane_x(lane.index());
    let id = place(state, PoolCategory::Collectible, x);
    let (kind, variant) = match draw {
        CollectibleDraw::PowerUp(kind) => {
            let duration_ticks = kind.duration_ticks(&state.tuning.power_ups);
            state.world.insert(id, PowerUpPickup { kind, duration_ticks });
            (SpawnKind::PowerUp(kind), 0)
        }
        CollectibleDraw::Gem(variant) => {
            state.world.insert(
                id,
                CollectibleTag {
                    kind: CollectibleKind::Gem,
                    value: state.tuning.scoring.gem_value,
                },
            );
            (SpawnKind::Gem, variant)
        }
        CollectibleDraw::Coin(variant) => {
            state.world.insert(
                id,
                CollectibleTag {
                    kind: CollectibleKind::Coin,
                    value: state.tuning.scoring.coin_value,
                },
            );
            (SpawnKind::Coin, variant)
        }
    };
    if let Some(collider) = collider_for(kind, &state.tuning) {
        state.world.insert(id, collider);
    }
    state.world.insert(id, lane);
    state.world.insert(id, Variant(variant));
    log::debug!("spawn {kind:?} lane {lane:?}");
    state.emit(GameEvent::Spawned {
        kind,
        lane: Some(lane),
        variant,
    });
    id
}

pub fn spawn_decoration(state: &mut GameState, x: f32, variant: u8) -> EntityId {
    let id = place(state, PoolCategory::Decoration, x);
    state.world.insert(id, Variant(variant));
    state.world.tag(id, FragmentMask::DECORATION);
    state.emit(GameEvent::Spawned {
        kind: SpawnKind::Decoration,
        lane: None,
        variant,
    });
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::AchievementTracker;
    use crate::sim::state::GameMode;
    use crate::tuning::Tuning;

    #[test]
    fn test_obstacle_interval_scaling() {
        let d = DifficultyTuning::default();
        assert_eq!(obstacle_interval(0.0, &d), d.base_obstacle_interval);
        assert_eq!(obstacle_interval(d.spawn_rate_max_distance, &d), d.min_obstacle_interval);
        assert_eq!(obstacle_interval(d.spawn_rate_max_distance * 4.0, &d), d.min_obstacle_interval);
        let mid = obstacle_interval(d.spawn_rate_max_distance / 2.0, &d);
        assert!(mid > d.min_obstacle_interval && mid < d.base_obstacle_interval);
    }

    #[test]
    fn test_intervals_never_increase() {
        let d = DifficultyTuning::default();
        let mut last_o = f32::MAX;
        let mut last_c = f32::MAX;
        for step in 0..100 {
            let distance = step as f32 * 50.0;
            let o = obstacle_interval(distance, &d);
            let c = collectible_interval(distance, &d);
            assert!(o <= last_o && c <= last_c);
            last_o = o;
            last_c = c;
        }
        assert_eq!(collectible_interval(0.0, &d), d.base_collectible_interval);
        assert_eq!(last_c, d.min_collectible_interval);
    }

    #[test]
    fn test_speed_multiplier_steps_and_caps() {
        let d = DifficultyTuning::default();
        assert_eq!(speed_multiplier(0.0, &d), 1.0);
        assert_eq!(speed_multiplier(499.0, &d), 1.0);
        assert!((speed_multiplier(500.0, &d) - 1.1).abs() < 1e-6);
        assert_eq!(speed_multiplier(100_000.0, &d), d.max_speed_multiplier);
    }

    #[test]
    fn test_biome_progression() {
        let t = SpawnTuning::default().biome_thresholds;
        assert_eq!(Biome::at_distance(0.0, &t), Biome::Forest);
        assert_eq!(Biome::at_distance(499.9, &t), Biome::Forest);
        assert_eq!(Biome::at_distance(500.0, &t), Biome::Canyon);
        assert_eq!(Biome::at_distance(1200.0, &t), Biome::Arctic);
        assert_eq!(Biome::at_distance(1500.0, &t), Biome::Tropical);
        assert_eq!(Biome::at_distance(9000.0, &t), Biome::Volcanic);
    }

    #[test]
    fn test_collectible_draw_bands() {
        let tuning = SpawnTuning::default();
        let mut rng = RandomStream::from_phrase("coral cove quest");
        let (mut coins, mut gems, mut power_ups) = (0, 0, 0);
        for _ in 0..4000 {
            match draw_collectible(&mut rng, &tuning) {
                CollectibleDraw::Coin(v) => {
                    assert!(v <= 2);
                    coins += 1
                }
                CollectibleDraw::Gem(v) => {
                    assert!(v <= 2);
                    gems += 1
                }
                CollectibleDraw::PowerUp(_) => power_ups += 1,
            }
        }
        assert!(coins > gems && gems > power_ups && power_ups > 0);
    }

    fn playing(mode: GameMode) -> GameState {
        GameState::new(
            Some("swift heron glade"),
            mode,
            Tuning::default(),
            AchievementTracker::default(),
        )
    }

    #[test]
    fn test_spawn_fires_strictly_after_interval() {
        let mut state = playing(GameMode::Classic);
        let interval_ticks = (state.tuning.difficulty.base_obstacle_interval
            * TICKS_PER_SECOND as f32) as u32;
        for _ in 0..interval_ticks {
            update_spawner(&mut state);
        }
        assert_eq!(state.world.count(FragmentMask::OBSTACLE), 0);
        update_spawner(&mut state);
        assert_eq!(state.world.count(FragmentMask::OBSTACLE), 1);
        assert_eq!(state.spawner.obstacle_ticks, 0);
    }

    #[test]
    fn test_zen_spawns_no_obstacles() {
        let mut state = playing(GameMode::Zen);
        for _ in 0..1200 {
            update_spawner(&mut state);
        }
        assert_eq!(state.world.count(FragmentMask::OBSTACLE), 0);
        assert!(state.world.count(FragmentMask::DECORATION) > 0);
    }

    #[test]
    fn test_spawned_obstacle_is_lane_locked_with_biome_variant() {
        let mut state = playing(GameMode::Classic);
        for _ in 0..600 {
            update_spawner(&mut state);
        }
        for id in state.world.query(FragmentMask::OBSTACLE) {
            let x = state.world.get::<Position>(id).map(|p| p.0.x).unwrap_or(f32::NAN);
            assert!([-2.0, 0.0, 2.0].contains(&x));
            let variant = state.world.get::<Variant>(id).map(|v| v.0).unwrap_or(u8::MAX);
            assert!(Biome::Forest.obstacle_variants().contains(&variant));
        }
    }
}
