//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically. Systems run in a
//! fixed order: spawner, movement and physics, collisions, power-ups and combo,
//! achievement checks, then cleanup. Tombstoned entities are only released in
//! the last step, so every earlier system sees a consistent store.

use glam::Vec3;

use super::collision::update_collisions;
use super::fragments::{AnimationClip, AnimationState, JumpState, Lane, OtterPhysics, ParticleKind, Position};
use super::jump::{splash_ring, trigger_jump, update_jump};
use super::movement::{
    scroll_world, set_lane_target, trigger_animation, update_animation, update_particles,
    update_player_motion,
};
use super::spawner::{Biome, update_spawner};
use super::state::{GameEvent, GameOverReason, GamePhase, GameState};
use super::world::FragmentMask;
use crate::achievements::Scope;
use crate::secs_to_ticks;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Lane steps requested since the last tick (negative is left)
    pub lane_delta: i8,
    /// Jump requested
    pub jump: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    // Don't tick if paused or game over
    if state.phase != GamePhase::Playing {
        return;
    }

    apply_input(state, input);

    state.time_ticks += 1;

    update_spawner(state);
    update_physics(state, dt);
    update_collisions(state);
    update_buffs(state);
    update_progress(state);
    check_achievements(state);
    cleanup(state);
}

/// Lane changes step one lane at a time; steps past a bank are dropped
fn apply_input(state: &mut GameState, input: &TickInput) {
    let now = state.time_ticks;
    let player = state.player;

    if input.lane_delta != 0 {
        let step = input.lane_delta.signum();
        let mut lane = state.player_lane();
        for _ in 0..input.lane_delta.unsigned_abs() {
            match lane.offset(step) {
                Some(next) => lane = next,
                None => break,
            }
        }
        if lane != state.player_lane() {
            change_lane(state, lane);
        }
    }

    if input.jump {
        let tuning = state.tuning.jump.clone();
        let jumped = state
            .world
            .get_mut::<JumpState>(player)
            .is_some_and(|jump| trigger_jump(jump, now, &tuning));
        if jumped {
            if let Some(anim) = state.world.get_mut::<AnimationState>(player) {
                super::movement::set_animation(anim, AnimationClip::Jump, now);
            }
            log::debug!("jump at tick {now}");
            state.emit(GameEvent::Jumped);
        }
    }
}

fn change_lane(state: &mut GameState, lane: Lane) {
    let now = state.time_ticks;
    let player = state.player;
    let target_x = state.tuning.lane_x(lane.index());
    state.world.insert(player, lane);
    if let Some(physics) = state.world.get_mut::<OtterPhysics>(player) {
        set_lane_target(physics, target_x);
    }
    let airborne = state
        .world
        .get::<JumpState>(player)
        .is_some_and(|j| j.is_jumping);
    if !airborne {
        if let Some(anim) = state.world.get_mut::<AnimationState>(player) {
            trigger_animation(anim, AnimationClip::Dodge, now);
        }
    }
}

/// Scroll, player motion, jump arc, particles and animation
fn update_physics(state: &mut GameState, dt: f32) {
    let speed = state.scroll_speed();
    state.stats.distance += speed * dt;
    scroll_world(&mut state.world, speed, dt);

    let player = state.player;
    update_player_motion(&mut state.world, player, &state.tuning, dt);

    let landed_at = match (
        state.world.get::<JumpState>(player).copied(),
        state.world.get::<Position>(player).copied(),
    ) {
        (Some(mut jump), Some(mut position)) => {
            let landed = update_jump(&mut jump, &mut position.0.z, &state.tuning.jump, dt);
            state.world.insert(player, jump);
            state.world.insert(player, position);
            landed.then_some(position.0)
        }
        _ => None,
    };

    if let Some(center) = landed_at {
        let salt = state.next_burst_salt();
        let speed = state.tuning.spawn.particle_speed;
        let splash: Vec<(Vec3, Vec3)> = splash_ring(center, &state.tuning.jump, salt)
            .into_iter()
            .map(|p| {
                let outward = (p - center).normalize_or_zero();
                (p, outward * speed + Vec3::Z * speed)
            })
            .collect();
        state.spawn_particles_at(ParticleKind::Splash, &splash);
        state.emit(GameEvent::Landed { position: center });
    }

    update_particles(&mut state.world);

    let now = state.time_ticks;
    let airborne = state
        .world
        .get::<JumpState>(player)
        .is_some_and(|j| j.is_jumping);
    let game_over = state.phase == GamePhase::GameOver;
    if let Some(anim) = state.world.get_mut::<AnimationState>(player) {
        update_animation(anim, now, airborne, game_over);
    }
}

/// Expire timed power-ups and decay the combo
fn update_buffs(state: &mut GameState) {
    for kind in state.power_ups.expire(state.time_ticks) {
        log::debug!("power-up {kind:?} expired");
        state.emit(GameEvent::PowerUpDeactivated { kind });
    }
    state.combo.tick();
}

/// Score, milestones, biome and the time-trial clock
fn update_progress(state: &mut GameState) {
    let distance = state.stats.distance;
    let distance_points = (distance * state.tuning.scoring.distance_points_per_meter).floor();
    state.stats.score = state.stats.bonus_points + distance_points.max(0.0) as u64;

    while let Some(&milestone) = state.tuning.run.milestones.get(state.milestones_reached) {
        if distance < milestone {
            break;
        }
        state.milestones_reached += 1;
        state.emit(GameEvent::MilestoneReached {
            distance: milestone as u32,
        });
    }

    let biome = Biome::at_distance(distance, &state.tuning.spawn.biome_thresholds);
    if biome != state.biome {
        log::info!("Entering {biome:?} at {distance:.0} m");
        state.biome = biome;
        state.emit(GameEvent::BiomeChanged { biome });
    }

    if state.time_left_ticks() == Some(0) {
        state.end_run(GameOverReason::TimeUp);
    }
}

/// Session-scoped achievements, once per check interval
fn check_achievements(state: &mut GameState) {
    if state.phase != GamePhase::Playing {
        return;
    }
    let interval = secs_to_ticks(state.tuning.achievements.check_interval_secs).max(1) as u64;
    if state.time_ticks % interval != 0 {
        return;
    }
    let stats = state.stat_snapshot();
    for unlocked in state.achievements.check(&stats, &[Scope::Session]) {
        state.emit(GameEvent::AchievementUnlocked(unlocked));
    }
}

/// Return tombstoned and off-screen entities to their pools
fn cleanup(state: &mut GameState) {
    let despawn_y = state.tuning.spawn.despawn_y;
    let mut doomed = state
        .world
        .query_filtered(FragmentMask::empty(), FragmentMask::PLAYER);
    doomed.retain(|&id| {
        state.world.has(id, FragmentMask::DESTROYED)
            || state.world.has(id, FragmentMask::COLLECTED)
            || state
                .world
                .get::<Position>(id)
                .is_some_and(|p| p.0.y < despawn_y)
    });
    for id in doomed {
        state.pools.release(&mut state.world, id);
    }
}
