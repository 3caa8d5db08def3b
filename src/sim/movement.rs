//! Player motion, world scrolling, particles and animation selection
//!
//! Lane changes are momentum based: the player accelerates toward the target
//! lane, snaps on overshoot with a small reflected velocity, then damps to
//! rest. Orientation is always derived from horizontal velocity or, when
//! settled, from slow idle oscillations.

use std::f32::consts::TAU;

use glam::Vec3;

use super::fragments::{
    AnimationClip, AnimationState, JumpState, OtterPhysics, Particle, Position, RotationState,
    Velocity,
};
use super::world::{EntityId, FragmentMask, World};
use crate::tuning::{BobTuning, IdleTuning, MovementTuning, RotationTuning, Tuning};
use crate::{lerp, secs_to_ticks, smoothing_factor};

/// Point the player at a new lane centre
pub fn set_lane_target(physics: &mut OtterPhysics, target_x: f32) {
    physics.target_x = target_x;
    physics.is_transitioning = true;
}

/// Advance lateral position one tick toward `physics.target_x`
pub fn update_lane_momentum(x: &mut f32, physics: &mut OtterPhysics, tuning: &MovementTuning, dt: f32) {
    let diff = physics.target_x - *x;

    if diff.abs() > tuning.snap_threshold {
        let direction = diff.signum();
        physics.velocity_x = (physics.velocity_x + direction * tuning.acceleration * dt)
            .clamp(-tuning.max_velocity, tuning.max_velocity);
        *x += physics.velocity_x * dt;

        // Crossed (or landed on) the target this tick
        let new_diff = physics.target_x - *x;
        if new_diff * diff <= 0.0 {
            *x = physics.target_x;
            physics.velocity_x *= -tuning.bounce_damping;
        }
    } else {
        *x = physics.target_x;
        physics.velocity_x *= tuning.damping;
        if physics.velocity_x.abs() < tuning.velocity_snap_threshold {
            physics.velocity_x = 0.0;
            physics.is_transitioning = false;
        }
    }
}

/// Recompute the orientation target for this tick
pub fn update_target_rotation(
    rotation: &mut RotationState,
    physics: &mut OtterPhysics,
    tuning: &Tuning,
    is_moving: bool,
    dt: f32,
) {
    let rot = &tuning.rotation;
    let normalized = (physics.velocity_x / tuning.movement.max_velocity).clamp(-1.0, 1.0);

    if is_moving || normalized.abs() > rot.active_threshold {
        rotation.target = Vec3::new(
            -normalized.abs() * rot.max_pitch * 0.5,
            -normalized * rot.max_yaw,
            -normalized * rot.max_tilt,
        );
    } else {
        physics.idle_time += dt;
        rotation.target = idle_pose(physics.idle_time, &tuning.idle);
    }
}

/// Idle sway (roll), head-bob (pitch) and a slower yaw drift
pub fn idle_pose(idle_time: f32, idle: &IdleTuning) -> Vec3 {
    let roll = (idle_time * idle.sway_frequency * TAU).sin() * idle.sway_amplitude;
    let pitch = (idle_time * idle.head_bob_frequency * TAU).sin() * idle.head_bob_amplitude;
    let yaw = (idle_time * idle.sway_frequency * 0.7 * TAU).sin() * idle.sway_amplitude * 0.3;
    Vec3::new(pitch, yaw, roll)
}

/// Ease each axis toward its target with its own rate
pub fn smooth_rotation(rotation: &mut RotationState, tuning: &RotationTuning, dt: f32) {
    let previous = rotation.current;
    rotation.current = Vec3::new(
        lerp(
            rotation.current.x,
            rotation.target.x,
            smoothing_factor(tuning.pitch_rate, dt),
        ),
        lerp(
            rotation.current.y,
            rotation.target.y,
            smoothing_factor(tuning.yaw_rate, dt),
        ),
        lerp(
            rotation.current.z,
            rotation.target.z,
            smoothing_factor(tuning.roll_rate, dt),
        ),
    );
    rotation.velocity = rotation.current - previous;
}

/// Vertical bob offset; a pure function of bob time
pub fn bob_offset(bob_time: f32, bob: &BobTuning, idle: &IdleTuning) -> f32 {
    let phase = bob_time * bob.frequency * TAU;
    let primary = phase.sin() * bob.amplitude;
    let secondary = (phase * bob.secondary_ratio + bob.secondary_phase).sin()
        * bob.amplitude
        * bob.secondary_scale;
    let breathing = (bob_time * idle.breath_frequency * TAU).sin() * idle.breath_amplitude;
    primary + secondary + breathing
}

/// Run lane momentum, orientation and bobbing for the player
pub fn update_player_motion(world: &mut World, player: EntityId, tuning: &Tuning, dt: f32) {
    let (Some(mut position), Some(mut physics), Some(mut rotation)) = (
        world.get::<Position>(player).copied(),
        world.get::<OtterPhysics>(player).copied(),
        world.get::<RotationState>(player).copied(),
    ) else {
        return;
    };
    let airborne = world
        .get::<JumpState>(player)
        .is_some_and(|j| j.is_jumping);

    let is_moving = physics.is_transitioning
        || physics.velocity_x.abs() > tuning.movement.moving_velocity_threshold;

    update_lane_momentum(&mut position.0.x, &mut physics, &tuning.movement, dt);
    update_target_rotation(&mut rotation, &mut physics, tuning, is_moving, dt);
    smooth_rotation(&mut rotation, &tuning.rotation, dt);

    physics.bob_time += dt;
    if !airborne {
        position.0.z = physics.base_z + bob_offset(physics.bob_time, &tuning.bobbing, &tuning.idle);
    }

    world.insert(player, position);
    world.insert(player, physics);
    world.insert(player, rotation);
}

/// Entities that drift toward the player with the river
const SCROLLED: [FragmentMask; 4] = [
    FragmentMask::OBSTACLE,
    FragmentMask::COLLECTIBLE,
    FragmentMask::POWER_UP_PICKUP,
    FragmentMask::DECORATION,
];

/// Apply the current scroll speed to river entities, then integrate every
/// non-player velocity
pub fn scroll_world(world: &mut World, scroll_speed: f32, dt: f32) {
    for mask in SCROLLED {
        for id in world.query(mask | FragmentMask::VELOCITY) {
            if let Some(velocity) = world.get_mut::<Velocity>(id) {
                velocity.0.y = -scroll_speed;
            }
        }
    }

    for id in world.query_filtered(
        FragmentMask::POSITION | FragmentMask::VELOCITY,
        FragmentMask::PLAYER,
    ) {
        let Some(velocity) = world.get::<Velocity>(id).map(|v| v.0) else {
            continue;
        };
        if let Some(position) = world.get_mut::<Position>(id) {
            position.0 += velocity * dt;
        }
    }
}

/// Count particle lifetimes down and tombstone expired ones
pub fn update_particles(world: &mut World) {
    for id in world.query(FragmentMask::PARTICLE) {
        let expired = match world.get_mut::<Particle>(id) {
            Some(particle) => {
                particle.remaining_ticks = particle.remaining_ticks.saturating_sub(1);
                particle.remaining_ticks == 0
            }
            None => continue,
        };
        if expired {
            world.tag(id, FragmentMask::DESTROYED);
        }
    }
}

/// Length of a one-shot clip, `None` for looping clips
pub fn one_shot_ticks(clip: AnimationClip) -> Option<u32> {
    match clip {
        AnimationClip::Hit => Some(secs_to_ticks(0.5)),
        AnimationClip::Collect => Some(secs_to_ticks(0.3)),
        AnimationClip::Dodge => Some(secs_to_ticks(0.2)),
        _ => None,
    }
}

/// Start a clip; one-shot clips fall back to `Swim` when done
pub fn trigger_animation(anim: &mut AnimationState, clip: AnimationClip, now: u64) {
    if anim.current == AnimationClip::Death {
        return;
    }
    let duration = one_shot_ticks(clip);
    anim.previous = Some(anim.current);
    anim.current = clip;
    anim.start_tick = now;
    anim.duration_ticks = duration;
    anim.is_one_shot = duration.is_some();
    anim.return_to = duration.map(|_| AnimationClip::Swim);
}

/// Switch to a looping clip if not already on it
pub fn set_animation(anim: &mut AnimationState, clip: AnimationClip, now: u64) {
    if anim.current != clip {
        anim.previous = Some(anim.current);
        anim.current = clip;
        anim.start_tick = now;
        anim.duration_ticks = None;
        anim.is_one_shot = false;
        anim.return_to = None;
    }
}

/// Finish one-shots and pick the looping clip for the player's state
pub fn update_animation(anim: &mut AnimationState, now: u64, airborne: bool, game_over: bool) {
    if game_over {
        set_animation(anim, AnimationClip::Death, now);
        return;
    }

    if anim.is_one_shot {
        let elapsed = now.saturating_sub(anim.start_tick);
        let done = anim.duration_ticks.is_none_or(|d| elapsed >= d as u64);
        if !done {
            return;
        }
        let next = anim.return_to.unwrap_or(AnimationClip::Swim);
        anim.previous = Some(anim.current);
        anim.current = next;
        anim.start_tick = now;
        anim.duration_ticks = None;
        anim.is_one_shot = false;
        anim.return_to = None;
    }

    if airborne {
        set_animation(anim, AnimationClip::Jump, now);
    } else {
        set_animation(anim, AnimationClip::Swim, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use proptest::prelude::*;

    fn settle(x: &mut f32, physics: &mut OtterPhysics, tuning: &MovementTuning, max_ticks: u32) -> u32 {
        for tick in 0..max_ticks {
            if !physics.is_transitioning {
                return tick;
            }
            update_lane_momentum(x, physics, tuning, SIM_DT);
        }
        max_ticks
    }

    #[test]
    fn test_lane_change_converges() {
        let tuning = MovementTuning::default();
        let mut x = 0.0;
        let mut physics = OtterPhysics::at_rest(0.0, 0.0);
        set_lane_target(&mut physics, 2.0);

        let ticks = settle(&mut x, &mut physics, &tuning, 600);
        assert!(ticks < 600);
        assert_eq!(x, 2.0);
        assert_eq!(physics.velocity_x, 0.0);
    }

    #[test]
    fn test_lane_change_is_not_instant() {
        let tuning = MovementTuning::default();
        let mut x = 0.0;
        let mut physics = OtterPhysics::at_rest(0.0, 0.0);
        set_lane_target(&mut physics, 2.0);
        update_lane_momentum(&mut x, &mut physics, &tuning, SIM_DT);
        assert!(x > 0.0 && x < 0.1);
    }

    #[test]
    fn test_overshoot_reflects_damped_velocity() {
        let tuning = MovementTuning::default();
        let mut x = 1.9;
        let mut physics = OtterPhysics::at_rest(1.9, 0.0);
        physics.velocity_x = 12.0;
        set_lane_target(&mut physics, 2.0);
        update_lane_momentum(&mut x, &mut physics, &tuning, SIM_DT);
        assert_eq!(x, 2.0);
        assert!(physics.velocity_x < 0.0);
        assert!(physics.velocity_x.abs() <= 12.0 * tuning.bounce_damping + 1e-4);
    }

    #[test]
    fn test_bob_is_pure_function_of_time() {
        let bob = BobTuning::default();
        let idle = IdleTuning::default();
        assert_eq!(bob_offset(1.234, &bob, &idle), bob_offset(1.234, &bob, &idle));
        let bound = bob.amplitude * (1.0 + bob.secondary_scale) + idle.breath_amplitude;
        for i in 0..600 {
            assert!(bob_offset(i as f32 * SIM_DT, &bob, &idle).abs() <= bound + 1e-6);
        }
    }

    #[test]
    fn test_turn_leans_into_direction() {
        let tuning = Tuning::default();
        let mut physics = OtterPhysics::at_rest(0.0, 0.0);
        physics.velocity_x = tuning.movement.max_velocity;
        let mut rotation = RotationState::default();
        update_target_rotation(&mut rotation, &mut physics, &tuning, true, SIM_DT);
        assert!((rotation.target.z + tuning.rotation.max_tilt).abs() < 1e-6);
        assert!((rotation.target.y + tuning.rotation.max_yaw).abs() < 1e-6);
        assert!(rotation.target.x < 0.0);
        assert_eq!(physics.idle_time, 0.0);
    }

    #[test]
    fn test_idle_resumes_from_last_rotation() {
        let tuning = Tuning::default();
        let mut physics = OtterPhysics::at_rest(0.0, 0.0);
        let mut rotation = RotationState {
            current: Vec3::new(-0.1, -0.3, -0.5),
            ..Default::default()
        };
        update_target_rotation(&mut rotation, &mut physics, &tuning, false, SIM_DT);
        smooth_rotation(&mut rotation, &tuning.rotation, SIM_DT);
        // One tick moves only part of the way toward the idle pose
        assert!(rotation.current.z < -0.4);
        assert!(physics.idle_time > 0.0);
    }

    #[test]
    fn test_particles_expire() {
        let mut world = World::new();
        let p = world.create();
        world.insert(p, Particle::new(crate::sim::fragments::ParticleKind::Hit, 2));
        update_particles(&mut world);
        assert!(!world.has(p, FragmentMask::DESTROYED));
        update_particles(&mut world);
        assert!(world.has(p, FragmentMask::DESTROYED));
    }

    #[test]
    fn test_scroll_moves_river_entities_only() {
        let mut world = World::new();
        let rock = world.create();
        world.insert(rock, Position(Vec3::new(0.0, 8.0, 0.0)));
        world.insert(rock, Velocity::default());
        world.tag(rock, FragmentMask::OBSTACLE);
        let player = world.create();
        world.insert(player, Position(Vec3::ZERO));
        world.insert(player, Velocity(Vec3::new(0.0, 5.0, 0.0)));
        world.tag(player, FragmentMask::PLAYER);

        scroll_world(&mut world, 6.0, 0.5);
        assert_eq!(world.get::<Position>(rock).map(|p| p.0.y), Some(5.0));
        assert_eq!(world.get::<Position>(player).map(|p| p.0.y), Some(0.0));
    }

    #[test]
    fn test_one_shot_returns_to_swim() {
        let mut anim = AnimationState::looping(AnimationClip::Swim, 0);
        trigger_animation(&mut anim, AnimationClip::Hit, 10);
        let ticks = one_shot_ticks(AnimationClip::Hit).unwrap_or(0) as u64;
        update_animation(&mut anim, 10 + ticks - 1, false, false);
        assert_eq!(anim.current, AnimationClip::Hit);
        update_animation(&mut anim, 10 + ticks, false, false);
        assert_eq!(anim.current, AnimationClip::Swim);
        assert_eq!(anim.previous, Some(AnimationClip::Hit));
    }

    #[test]
    fn test_death_is_terminal() {
        let mut anim = AnimationState::looping(AnimationClip::Swim, 0);
        update_animation(&mut anim, 5, false, true);
        trigger_animation(&mut anim, AnimationClip::Collect, 6);
        assert_eq!(anim.current, AnimationClip::Death);
    }

    proptest! {
        #[test]
        fn test_lane_convergence(commands in prop::collection::vec((prop::bool::ANY, 0u32..40), 1..12)) {
            let tuning = MovementTuning::default();
            let lane_width = 2.0;
            let mut lane = 0i8;
            let mut x = 0.0f32;
            let mut physics = OtterPhysics::at_rest(0.0, 0.0);

            for (right, wait) in commands {
                let next = if right { lane + 1 } else { lane - 1 };
                if (-1..=1).contains(&next) {
                    lane = next;
                    set_lane_target(&mut physics, lane as f32 * lane_width);
                }
                for _ in 0..wait {
                    update_lane_momentum(&mut x, &mut physics, &tuning, SIM_DT);
                }
            }

            let target = lane as f32 * lane_width;
            settle(&mut x, &mut physics, &tuning, 2000);
            prop_assert!((x - target).abs() <= tuning.snap_threshold);
            prop_assert!(physics.velocity_x.abs() <= tuning.velocity_snap_threshold);
            prop_assert!(!physics.is_transitioning);
        }
    }
}
