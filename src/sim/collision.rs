//! Collision detection and response
//!
//! Overlap is a strict AABB test on the lane and forward axes: boxes that only
//! touch at an edge do not collide. The near-miss zone is the obstacle box
//! grown by a margin on every side; a pass through that zone without touching
//! the obstacle box awards one bonus per obstacle.

use glam::{Vec2, Vec3};

use super::fragments::{
    AnimationClip, AnimationState, Collider, CollectibleKind, CollectibleTag, Health, OtterPhysics,
    ParticleKind, Position, PowerUpPickup,
};
use super::movement::trigger_animation;
use super::powerups::{ComboSource, PowerUpKind};
use super::state::{GameEvent, GameOverReason, GamePhase, GameState};
use super::world::{EntityId, FragmentMask};
use crate::{jitter_hash, secs_to_ticks};

/// Axis-aligned box on the lane/forward plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(center: Vec3, collider: &Collider) -> Self {
        let half = collider.half_extents();
        let c = center.truncate();
        Self {
            min: c - half,
            max: c + half,
        }
    }

    /// Grow by `margin` on all sides
    pub fn expanded(self, margin: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(margin),
            max: self.max + Vec2::splat(margin),
        }
    }

    /// Strict overlap on both axes
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

/// True iff the two boxes overlap
pub fn check_collision(a_pos: Vec3, a: &Collider, b_pos: Vec3, b: &Collider) -> bool {
    Aabb::new(a_pos, a).overlaps(&Aabb::new(b_pos, b))
}

/// True iff `a` misses `b` but overlaps `b` grown by `margin`
pub fn check_near_miss(a_pos: Vec3, a: &Collider, b_pos: Vec3, b: &Collider, margin: f32) -> bool {
    if check_collision(a_pos, a, b_pos, b) {
        return false;
    }
    Aabb::new(a_pos, a).overlaps(&Aabb::new(b_pos, b).expanded(margin))
}

/// Sideways push after a hit: away from the bank the player is on, otherwise
/// a hashed coin flip
pub fn bounce_direction(x: f32, lane_width: f32, salt: u64) -> f32 {
    if x <= -lane_width {
        1.0
    } else if x >= lane_width {
        -1.0
    } else if jitter_hash(salt, 0x5EED) & 1 == 0 {
        1.0
    } else {
        -1.0
    }
}

/// Player vs obstacles, magnet pull, player vs collectibles
pub fn update_collisions(state: &mut GameState) {
    if state.phase != GamePhase::Playing {
        return;
    }
    report_malformed(state);

    let player = state.player;
    let (Some(player_pos), Some(player_col)) = (
        state.world.get::<Position>(player).map(|p| p.0),
        state.world.get::<Collider>(player).copied(),
    ) else {
        return;
    };

    if state.mode.obstacles_collide() {
        handle_obstacles(state, player_pos, &player_col);
        if state.phase != GamePhase::Playing {
            return;
        }
    }

    if state.power_ups.is_active(PowerUpKind::Magnet) {
        apply_magnet(state, player_pos);
    }

    handle_collectibles(state, player_pos, &player_col);
}

/// Warn once per entity that carries a collider but no position
fn report_malformed(state: &mut GameState) {
    let broken = state.world.query_filtered(
        FragmentMask::COLLIDER,
        FragmentMask::POSITION | FragmentMask::REPORTED,
    );
    for id in broken {
        log::warn!("entity {id:?} has a collider but no position; skipped");
        state.world.tag(id, FragmentMask::REPORTED);
        state.note_malformed();
    }
}

fn handle_obstacles(state: &mut GameState, player_pos: Vec3, player_col: &Collider) {
    let margin = state.tuning.collision.near_miss_margin;
    let obstacles = state.world.query_filtered(
        FragmentMask::OBSTACLE | FragmentMask::POSITION | FragmentMask::COLLIDER,
        FragmentMask::TOMBSTONES,
    );

    for id in obstacles {
        let (Some(pos), Some(col)) = (
            state.world.get::<Position>(id).map(|p| p.0),
            state.world.get::<Collider>(id).copied(),
        ) else {
            continue;
        };

        if check_collision(player_pos, player_col, pos, &col) {
            handle_obstacle_hit(state, id, pos);
            if state.phase != GamePhase::Playing {
                return;
            }
        } else if !state.world.has(id, FragmentMask::NEAR_MISSED)
            && check_near_miss(player_pos, player_col, pos, &col, margin)
        {
            state.world.tag(id, FragmentMask::NEAR_MISSED);
            handle_near_miss(state, pos);
        }
    }
}

fn handle_obstacle_hit(state: &mut GameState, obstacle: EntityId, pos: Vec3) {
    if state.is_invulnerable() || state.power_ups.is_active(PowerUpKind::Ghost) {
        return;
    }

    if state.power_ups.deactivate(PowerUpKind::Shield) {
        state.stats.shields_used += 1;
        state.world.tag(obstacle, FragmentMask::DESTROYED);
        let count = state.tuning.collision.shield_particles;
        state.spawn_particles(ParticleKind::Shield, pos, count);
        log::debug!("shield absorbed hit");
        state.emit(GameEvent::PowerUpDeactivated {
            kind: PowerUpKind::Shield,
        });
        state.emit(GameEvent::ShieldBlocked { position: pos });
        return;
    }

    let now = state.time_ticks;
    let player = state.player;
    let health = match state.world.get_mut::<Health>(player) {
        Some(health) => {
            health.0 = health.0.saturating_sub(1);
            health.0
        }
        None => return,
    };

    state.stats.hits_taken += 1;
    state.stats.last_damage_tick = now;
    state.combo.reset();
    state.invulnerable_until =
        now + secs_to_ticks(state.tuning.run.hit_invulnerability_secs) as u64;

    let salt = state.next_burst_salt();
    let lane_width = state.tuning.lanes.lane_width;
    let impulse = state.tuning.collision.bounce_impulse;
    let player_x = state.player_position().x;
    if let Some(physics) = state.world.get_mut::<OtterPhysics>(player) {
        physics.velocity_x += bounce_direction(player_x, lane_width, salt) * impulse;
    }

    state.world.tag(obstacle, FragmentMask::DESTROYED);
    let count = state.tuning.collision.hit_particles;
    state.spawn_particles(ParticleKind::Hit, pos, count);
    state.emit(GameEvent::ObstacleHit {
        position: pos,
        health,
    });

    if health == 0 {
        state.end_run(GameOverReason::HealthDepleted);
    } else if let Some(anim) = state.world.get_mut::<AnimationState>(player) {
        trigger_animation(anim, AnimationClip::Hit, now);
    }
}

fn handle_near_miss(state: &mut GameState, pos: Vec3) {
    let bonus = state.tuning.collision.near_miss_bonus;
    state.stats.near_misses += 1;
    state.stats.bonus_points += bonus as u64;
    let step = ComboSource::NearMiss.step(&state.tuning.combo);
    state
        .combo
        .increment(step, secs_to_ticks(state.tuning.combo.timeout_secs));
    let count = state.tuning.collision.near_miss_particles;
    state.spawn_particles(ParticleKind::NearMiss, pos, count);
    state.emit(GameEvent::NearMiss {
        position: pos,
        bonus,
    });
}

/// Live coins, gems and power-up pickups
fn live_pickups(state: &GameState) -> Vec<EntityId> {
    let mut ids = state.world.query_filtered(
        FragmentMask::COLLECTIBLE | FragmentMask::POSITION,
        FragmentMask::TOMBSTONES,
    );
    ids.extend(state.world.query_filtered(
        FragmentMask::POWER_UP_PICKUP | FragmentMask::POSITION,
        FragmentMask::TOMBSTONES | FragmentMask::COLLECTIBLE,
    ));
    ids.sort();
    ids
}

/// Close a fixed fraction of the gap for every pickup within the radius
fn apply_magnet(state: &mut GameState, player_pos: Vec3) {
    let radius = state.tuning.collision.magnet_radius;
    let pull = state.tuning.collision.magnet_pull;
    let target = player_pos.truncate();

    for id in live_pickups(state) {
        if let Some(position) = state.world.get_mut::<Position>(id) {
            let gap = target - position.0.truncate();
            let distance = gap.length();
            if distance < radius && distance > f32::EPSILON {
                let step = gap * pull;
                position.0.x += step.x;
                position.0.y += step.y;
            }
        }
    }
}

fn handle_collectibles(state: &mut GameState, player_pos: Vec3, player_col: &Collider) {
    for id in live_pickups(state) {
        let (Some(pos), Some(col)) = (
            state.world.get::<Position>(id).map(|p| p.0),
            state.world.get::<Collider>(id).copied(),
        ) else {
            continue;
        };
        if check_collision(player_pos, player_col, pos, &col) {
            collect(state, id, pos);
        }
    }
}

fn collect(state: &mut GameState, id: EntityId, pos: Vec3) {
    let now = state.time_ticks;
    state.world.tag(id, FragmentMask::COLLECTED);

    if let Some(pickup) = state.world.get::<PowerUpPickup>(id).copied() {
        state.power_ups.activate(pickup.kind, now, pickup.duration_ticks);
        state.stats.power_ups += 1;
        log::debug!("power-up {:?} active for {} ticks", pickup.kind, pickup.duration_ticks);
        let count = state.tuning.collision.power_up_particles;
        state.spawn_particles(ParticleKind::PowerUp, pos, count);
        state.emit(GameEvent::PowerUpActivated { kind: pickup.kind });
    } else if let Some(tag) = state.world.get::<CollectibleTag>(id).copied() {
        let multiplier = state.combo.multiplier(state.tuning.combo.multiplier_breakpoint) as u64
            * state.power_ups.score_multiplier(&state.tuning.power_ups) as u64;
        let points = tag.value as u64 * multiplier;
        state.stats.bonus_points += points;

        let (source, kind, count) = match tag.kind {
            CollectibleKind::Coin => {
                state.stats.coins += 1;
                (
                    ComboSource::Coin,
                    ParticleKind::Coin,
                    state.tuning.collision.coin_particles,
                )
            }
            CollectibleKind::Gem => {
                state.stats.gems += 1;
                (
                    ComboSource::Gem,
                    ParticleKind::Gem,
                    state.tuning.collision.gem_particles,
                )
            }
        };
        let step = source.step(&state.tuning.combo);
        state
            .combo
            .increment(step, secs_to_ticks(state.tuning.combo.timeout_secs));
        state.spawn_particles(kind, pos, count);
        state.emit(match tag.kind {
            CollectibleKind::Coin => GameEvent::CoinCollected {
                value: tag.value,
                points,
            },
            CollectibleKind::Gem => GameEvent::GemCollected {
                value: tag.value,
                points,
            },
        });
    }

    let player = state.player;
    if let Some(anim) = state.world.get_mut::<AnimationState>(player) {
        trigger_animation(anim, AnimationClip::Collect, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::AchievementTracker;
    use crate::sim::fragments::{Lane, Variant};
    use crate::sim::spawner::{CollectibleDraw, spawn_collectible, spawn_obstacle};
    use crate::sim::state::GameMode;
    use crate::tuning::Tuning;
    use proptest::prelude::*;

    /// Run past every grace window so hits count
    fn armed(mode: GameMode) -> GameState {
        let mut tuning = Tuning::default();
        tuning.run.tutorial_secs = 0.0;
        let mut state = GameState::new(
            Some("otter gorge legend"),
            mode,
            tuning,
            AchievementTracker::default(),
        );
        state.time_ticks = 1000;
        state.drain_events();
        state
    }

    fn obstacle_at(state: &mut GameState, pos: Vec3) -> EntityId {
        let id = spawn_obstacle(state, Lane::Center, 0);
        state.world.insert(id, Position(pos));
        state.drain_events();
        id
    }

    fn obstacle_on_player(state: &mut GameState) -> EntityId {
        let p = state.player_position();
        obstacle_at(state, p)
    }

    fn pickup_on_player(state: &mut GameState, draw: CollectibleDraw) -> EntityId {
        let p = state.player_position();
        let id = spawn_collectible(state, Lane::Center, draw);
        state.world.insert(id, Position(p));
        state.drain_events();
        id
    }

    fn count(events: &[GameEvent], pred: impl Fn(&GameEvent) -> bool) -> usize {
        events.iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn test_touching_edges_do_not_collide() {
        let c = Collider::new(1.0, 1.0, 1.0);
        assert!(!check_collision(Vec3::ZERO, &c, Vec3::new(1.0, 0.0, 0.0), &c));
        assert!(check_collision(Vec3::ZERO, &c, Vec3::new(0.99, 0.0, 0.0), &c));
        assert!(!check_collision(Vec3::ZERO, &c, Vec3::new(0.5, 1.0, 0.0), &c));
    }

    #[test]
    fn test_near_miss_zone() {
        let c = Collider::new(1.0, 1.0, 1.0);
        assert!(check_near_miss(Vec3::ZERO, &c, Vec3::new(1.2, 0.0, 0.0), &c, 0.3));
        assert!(!check_near_miss(Vec3::ZERO, &c, Vec3::new(1.35, 0.0, 0.0), &c, 0.3));
        assert!(!check_near_miss(Vec3::ZERO, &c, Vec3::new(0.5, 0.0, 0.0), &c, 0.3));
    }

    #[test]
    fn test_height_is_ignored() {
        let c = Collider::new(1.0, 1.0, 1.0);
        assert!(check_collision(Vec3::ZERO, &c, Vec3::new(0.0, 0.0, 5.0), &c));
    }

    #[test]
    fn test_shield_absorption() {
        let mut state = armed(GameMode::Classic);
        state.power_ups.activate(PowerUpKind::Shield, state.time_ticks, 0);
        let obstacle = obstacle_on_player(&mut state);
        let health = state.health();

        update_collisions(&mut state);

        assert!(!state.power_ups.is_active(PowerUpKind::Shield));
        assert!(state.world.has(obstacle, FragmentMask::DESTROYED));
        assert_eq!(state.health(), health);
        let events = state.drain_events();
        assert_eq!(count(&events, |e| matches!(e, GameEvent::ShieldBlocked { .. })), 1);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::ObstacleHit { .. })), 0);
    }

    #[test]
    fn test_fatal_hit() {
        let mut state = armed(GameMode::Classic);
        state.world.insert(state.player, Health(1));
        obstacle_on_player(&mut state);

        update_collisions(&mut state);
        assert_eq!(state.health(), 0);
        assert_eq!(state.phase, GamePhase::GameOver);
        let mut events = state.drain_events();

        // A second obstacle after death changes nothing
        obstacle_on_player(&mut state);
        update_collisions(&mut state);

        events.extend(state.drain_events());
        assert_eq!(count(&events, |e| matches!(e, GameEvent::GameOver { .. })), 1);
        assert_eq!(state.health(), 0);
    }

    #[test]
    fn test_unshielded_hit_resets_combo_and_bounces() {
        let mut state = armed(GameMode::Classic);
        state.combo.increment(7, 120);
        obstacle_on_player(&mut state);
        update_collisions(&mut state);

        assert_eq!(state.combo.count, 0);
        assert_eq!(state.health(), state.tuning.run.starting_health - 1);
        let vx = state
            .world
            .get::<OtterPhysics>(state.player)
            .map(|p| p.velocity_x)
            .unwrap_or(0.0);
        assert_eq!(vx.abs(), state.tuning.collision.bounce_impulse);
        assert!(state.is_invulnerable());
        assert_eq!(
            state.world.get::<AnimationState>(state.player).map(|a| a.current),
            Some(AnimationClip::Hit)
        );
    }

    #[test]
    fn test_bounce_away_from_bank() {
        assert_eq!(bounce_direction(-2.0, 2.0, 1), 1.0);
        assert_eq!(bounce_direction(2.0, 2.0, 1), -1.0);
        assert_eq!(bounce_direction(0.0, 2.0, 7).abs(), 1.0);
    }

    #[test]
    fn test_grace_and_ghost_ignore_hits() {
        let mut state = armed(GameMode::Classic);
        state.invulnerable_until = state.time_ticks + 10;
        let a = obstacle_on_player(&mut state);
        update_collisions(&mut state);
        assert!(!state.world.has(a, FragmentMask::DESTROYED));

        state.invulnerable_until = 0;
        state.power_ups.activate(PowerUpKind::Ghost, state.time_ticks, 300);
        update_collisions(&mut state);
        assert!(!state.world.has(a, FragmentMask::DESTROYED));
        assert_eq!(state.health(), state.tuning.run.starting_health);
    }

    #[test]
    fn test_time_trial_obstacles_never_collide() {
        let mut state = armed(GameMode::TimeTrial);
        obstacle_on_player(&mut state);
        update_collisions(&mut state);
        assert_eq!(state.health(), state.tuning.run.starting_health);
    }

    #[test]
    fn test_near_miss_bonus_once() {
        let mut state = armed(GameMode::Classic);
        let p = state.player_position();
        let player_half = state.tuning.collision.player_collider.half_extents().x;
        let obstacle_half = state.tuning.collision.obstacle_collider.half_extents().x;
        let margin = state.tuning.collision.near_miss_margin;
        let offset = player_half + obstacle_half + margin * 0.5;
        obstacle_at(&mut state, p + Vec3::new(offset, 0.0, 0.0));

        for _ in 0..10 {
            update_collisions(&mut state);
        }

        let events = state.drain_events();
        let misses: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::NearMiss { bonus, .. } => Some(*bonus),
                _ => None,
            })
            .collect();
        assert_eq!(misses, vec![state.tuning.collision.near_miss_bonus]);
        assert_eq!(state.stats.near_misses, 1);
        assert_eq!(state.combo.count, state.tuning.combo.near_miss_step);
        assert_eq!(count(&events, |e| matches!(e, GameEvent::ObstacleHit { .. })), 0);
    }

    #[test]
    fn test_collect_coin_scores_with_multipliers() {
        let mut state = armed(GameMode::Classic);
        state.power_ups.activate(PowerUpKind::Multiplier, state.time_ticks, 600);
        state.combo.increment(10, 120);
        let coin = pickup_on_player(&mut state, CollectibleDraw::Coin(1));

        update_collisions(&mut state);

        let value = state.tuning.scoring.coin_value as u64;
        let expected = value * 2 * state.tuning.power_ups.multiplier_value as u64;
        assert_eq!(state.stats.bonus_points, expected);
        assert_eq!(state.stats.coins, 1);
        assert!(state.world.has(coin, FragmentMask::COLLECTED));
        assert_eq!(state.world.get::<Variant>(coin), Some(&Variant(1)));
        let events = state.drain_events();
        assert_eq!(count(&events, |e| matches!(e, GameEvent::CoinCollected { .. })), 1);

        // Collected entities are not collected twice before cleanup
        update_collisions(&mut state);
        assert_eq!(state.stats.coins, 1);
    }

    #[test]
    fn test_gem_steps_combo_further_than_coin() {
        let mut state = armed(GameMode::Classic);
        pickup_on_player(&mut state, CollectibleDraw::Gem(0));
        update_collisions(&mut state);
        assert_eq!(state.combo.count, state.tuning.combo.gem_step);
        assert!(state.tuning.combo.gem_step > state.tuning.combo.coin_step);
    }

    #[test]
    fn test_power_up_pickup_activates() {
        let mut state = armed(GameMode::Classic);
        pickup_on_player(&mut state, CollectibleDraw::PowerUp(PowerUpKind::Magnet));
        update_collisions(&mut state);
        assert!(state.power_ups.is_active(PowerUpKind::Magnet));
        assert_eq!(state.stats.power_ups, 1);
    }

    #[test]
    fn test_magnet_pulls_a_fraction_of_the_gap() {
        let mut state = armed(GameMode::Classic);
        state.power_ups.activate(PowerUpKind::Magnet, state.time_ticks, 600);
        let p = state.player_position();
        let coin = spawn_collectible(&mut state, Lane::Center, CollectibleDraw::Coin(0));
        state.world.insert(coin, Position(p + Vec3::new(0.0, 2.0, 0.0)));
        let far = spawn_collectible(&mut state, Lane::Center, CollectibleDraw::Coin(0));
        state.world.insert(far, Position(p + Vec3::new(0.0, 6.0, 0.0)));

        update_collisions(&mut state);

        let pull = state.tuning.collision.magnet_pull;
        let y = state.world.get::<Position>(coin).map(|q| q.0.y).unwrap_or(0.0);
        assert!((y - (p.y + 2.0 * (1.0 - pull))).abs() < 1e-5);
        let far_y = state.world.get::<Position>(far).map(|q| q.0.y).unwrap_or(0.0);
        assert_eq!(far_y, p.y + 6.0);
    }

    #[test]
    fn test_malformed_collider_warned_once() {
        let mut state = armed(GameMode::Classic);
        let broken = state.world.create();
        state.world.insert(broken, Collider::new(1.0, 1.0, 1.0));
        state.world.tag(broken, FragmentMask::OBSTACLE);
        update_collisions(&mut state);
        update_collisions(&mut state);
        assert_eq!(state.malformed_reported(), 1);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    proptest! {
        #[test]
        fn test_collision_excludes_near_miss(
            ax in -5.0f32..5.0, ay in -5.0f32..5.0,
            bx in -5.0f32..5.0, by in -5.0f32..5.0,
            aw in 0.1f32..3.0, ah in 0.1f32..3.0,
            bw in 0.1f32..3.0, bh in 0.1f32..3.0,
            margin in 0.01f32..1.0,
        ) {
            let a = Collider::new(aw, ah, 1.0);
            let b = Collider::new(bw, bh, 1.0);
            let pa = Vec3::new(ax, ay, 0.0);
            let pb = Vec3::new(bx, by, 0.0);
            if check_collision(pa, &a, pb, &b) {
                prop_assert!(!check_near_miss(pa, &a, pb, &b, margin));
            }
        }

        #[test]
        fn test_health_never_increases(shields in prop::collection::vec(prop::bool::ANY, 1..8)) {
            let mut state = armed(GameMode::Classic);
            let mut last = state.health();
            for shield in shields {
                if state.phase != GamePhase::Playing {
                    break;
                }
                state.invulnerable_until = 0;
                if shield {
                    state.power_ups.activate(PowerUpKind::Shield, state.time_ticks, 0);
                }
                obstacle_on_player(&mut state);
                update_collisions(&mut state);
                let health = state.health();
                prop_assert!(health <= last);
                last = health;
            }
        }
    }
}
