//! River Rush - gameplay core for a 3-lane endless river runner
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entity store, physics, collisions, spawning)
//! - `session`: Fixed-timestep loop and the command interface for input collaborators
//! - `achievements`: Session/lifetime achievement tracking
//! - `progress`: Lifetime counters folded in at run end
//! - `persistence`: Seam for whoever stores lifetime progress
//! - `tuning`: Data-driven game balance

pub mod achievements;
pub mod persistence;
pub mod progress;
pub mod session;
pub mod sim;
pub mod snapshot;
pub mod tuning;

pub use achievements::{AchievementTracker, AchievementUnlocked};
pub use progress::{LifetimeProgress, RunSummary, SavedProgress};
pub use session::Session;
pub use snapshot::RenderSnapshot;
pub use tuning::{Tuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Ticks per simulated second
    pub const TICKS_PER_SECOND: u32 = 60;
    /// Maximum ticks per frame; leftover time stays in the accumulator
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Most unsimulated time the accumulator may hold (15 ticks)
    pub const MAX_BACKLOG_SECS: f32 = 0.25;

    /// Number of lanes
    pub const LANE_COUNT: usize = 3;
}

/// Convert an authored duration in seconds to whole simulation ticks.
///
/// Any positive duration lasts at least one tick.
#[inline]
pub fn secs_to_ticks(secs: f32) -> u32 {
    if secs <= 0.0 {
        return 0;
    }
    ((secs * consts::TICKS_PER_SECOND as f32).round() as u32).max(1)
}

/// Convert a tick count back to seconds
#[inline]
pub fn ticks_to_secs(ticks: u64) -> f32 {
    ticks as f32 * consts::SIM_DT
}

/// Linear interpolation
#[inline]
pub fn lerp(start: f32, end: f32, t: f32) -> f32 {
    start + (end - start) * t
}

/// Frame-rate independent smoothing factor for an exponential approach.
///
/// `rate` is in 1/seconds; the result is the fraction of the remaining gap
/// closed in one step of `dt`.
#[inline]
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// Cheap integer hash for visual-only jitter (never touches the run RNG)
#[inline]
pub fn jitter_hash(a: u64, b: u32) -> u32 {
    let h = (a as u32)
        .wrapping_mul(2654435761)
        .wrapping_add(b.wrapping_mul(31337))
        ^ ((a >> 32) as u32);
    h.wrapping_mul(0x9E37_79B9).rotate_left(13)
}

/// Map a hash to [0, 1)
#[inline]
pub fn unit_from_hash(hash: u32) -> f32 {
    (hash % 1000) as f32 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_to_ticks() {
        assert_eq!(secs_to_ticks(0.0), 0);
        assert_eq!(secs_to_ticks(1.0), 60);
        assert_eq!(secs_to_ticks(0.5), 30);
        assert_eq!(secs_to_ticks(0.001), 1);
    }

    #[test]
    fn test_smoothing_factor_bounds() {
        let t = smoothing_factor(8.0, consts::SIM_DT);
        assert!(t > 0.0 && t < 1.0);
        assert_eq!(smoothing_factor(0.0, consts::SIM_DT), 0.0);
    }
}
