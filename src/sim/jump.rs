//! Jump arc, cooldown and landing splash

use std::f32::consts::TAU;

use glam::Vec3;

use super::fragments::JumpState;
use crate::tuning::JumpTuning;
use crate::{jitter_hash, secs_to_ticks, unit_from_hash};

/// Grounded and the cooldown since the last take-off has elapsed
pub fn can_jump(jump: &JumpState, now: u64, tuning: &JumpTuning) -> bool {
    let cooldown = secs_to_ticks(tuning.cooldown_secs) as u64;
    !jump.is_jumping
        && jump
            .jump_start_tick
            .is_none_or(|start| now.saturating_sub(start) >= cooldown)
}

/// Take off if allowed; returns false (and changes nothing) otherwise
pub fn trigger_jump(jump: &mut JumpState, now: u64, tuning: &JumpTuning) -> bool {
    if !can_jump(jump, now, tuning) {
        return false;
    }
    jump.is_jumping = true;
    jump.vertical_velocity = tuning.initial_velocity;
    jump.jump_start_tick = Some(now);
    jump.is_landing = false;
    true
}

/// Integrate one tick of the arc. Returns true on the tick of touchdown.
pub fn update_jump(jump: &mut JumpState, z: &mut f32, tuning: &JumpTuning, dt: f32) -> bool {
    jump.is_landing = false;
    if !jump.is_jumping {
        return false;
    }

    // Take-off from a bob trough starts at ground level
    *z = z.max(jump.ground_z);
    jump.vertical_velocity -= tuning.gravity * dt;
    *z += jump.vertical_velocity * dt;

    if *z <= jump.ground_z {
        *z = jump.ground_z;
        jump.is_jumping = false;
        jump.vertical_velocity = 0.0;
        jump.is_landing = true;
        return true;
    }
    false
}

/// Ring of splash positions around a landing point
///
/// Radius jitter comes from a hash of `salt`, never from the run stream.
pub fn splash_ring(center: Vec3, tuning: &JumpTuning, salt: u64) -> Vec<Vec3> {
    let count = tuning.splash_particle_count;
    (0..count)
        .map(|i| {
            let angle = i as f32 / count as f32 * TAU;
            let jitter = unit_from_hash(jitter_hash(salt, i)) - 0.5;
            let radius = tuning.splash_radius + jitter * 0.2;
            center + Vec3::new(angle.cos() * radius, angle.sin() * radius, 0.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    /// Tick until touchdown; returns the landing tick
    fn fly(jump: &mut JumpState, z: &mut f32, tuning: &JumpTuning, mut now: u64) -> u64 {
        let mut landings = 0;
        for _ in 0..1000 {
            now += 1;
            if update_jump(jump, z, tuning, SIM_DT) {
                landings += 1;
                break;
            }
        }
        assert_eq!(landings, 1);
        now
    }

    #[test]
    fn test_jump_arc_returns_to_ground() {
        let tuning = JumpTuning::default();
        let mut jump = JumpState::grounded(0.0);
        let mut z = 0.0;
        assert!(trigger_jump(&mut jump, 0, &tuning));
        update_jump(&mut jump, &mut z, &tuning, SIM_DT);
        assert!(z > 0.0);
        fly(&mut jump, &mut z, &tuning, 1);
        assert_eq!(z, 0.0);
        assert!(!jump.is_jumping);
        assert!(jump.is_landing);
    }

    #[test]
    fn test_takeoff_below_ground_does_not_land_at_once() {
        let tuning = JumpTuning {
            initial_velocity: 1.0,
            ..Default::default()
        };
        let mut jump = JumpState::grounded(0.0);
        let mut z = -0.3;
        assert!(trigger_jump(&mut jump, 0, &tuning));
        assert!(!update_jump(&mut jump, &mut z, &tuning, SIM_DT));
        assert!(z > 0.0);
        assert!(jump.is_jumping);
    }

    #[test]
    fn test_no_jump_while_airborne() {
        let tuning = JumpTuning::default();
        let mut jump = JumpState::grounded(0.0);
        assert!(trigger_jump(&mut jump, 0, &tuning));
        let before = jump;
        assert!(!trigger_jump(&mut jump, 500, &tuning));
        assert_eq!(jump, before);
    }

    #[test]
    fn test_landing_fires_once() {
        let tuning = JumpTuning::default();
        let mut jump = JumpState::grounded(0.0);
        let mut z = 0.0;
        trigger_jump(&mut jump, 0, &tuning);
        fly(&mut jump, &mut z, &tuning, 0);
        for _ in 0..120 {
            assert!(!update_jump(&mut jump, &mut z, &tuning, SIM_DT));
        }
        assert!(!jump.is_landing);
    }

    #[test]
    fn test_jump_cooldown() {
        let tuning = JumpTuning {
            cooldown_secs: 1.0,
            ..Default::default()
        };
        let cooldown = secs_to_ticks(tuning.cooldown_secs) as u64;
        let mut jump = JumpState::grounded(0.0);
        let mut z = 0.0;

        assert!(trigger_jump(&mut jump, 0, &tuning));
        let landed_at = fly(&mut jump, &mut z, &tuning, 0);
        assert!(landed_at < cooldown, "arc must end before the cooldown");

        // Immediately after landing: still cooling down
        assert!(!trigger_jump(&mut jump, landed_at + 1, &tuning));
        assert!(!trigger_jump(&mut jump, cooldown - 1, &tuning));
        assert!(trigger_jump(&mut jump, cooldown, &tuning));
    }

    #[test]
    fn test_splash_ring_shape() {
        let tuning = JumpTuning::default();
        let ring = splash_ring(Vec3::new(2.0, -3.0, 0.0), &tuning, 42);
        assert_eq!(ring.len(), tuning.splash_particle_count as usize);
        for p in &ring {
            let r = (p.truncate() - glam::Vec2::new(2.0, -3.0)).length();
            assert!(r >= tuning.splash_radius - 0.1 - 1e-4);
            assert!(r <= tuning.splash_radius + 0.1 + 1e-4);
        }
        assert_eq!(ring, splash_ring(Vec3::new(2.0, -3.0, 0.0), &tuning, 42));
    }
}
