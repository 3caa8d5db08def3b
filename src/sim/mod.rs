//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only, drawn by the spawner alone
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod fragments;
pub mod jump;
pub mod movement;
pub mod pool;
pub mod powerups;
pub mod rng;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod world;

pub use collision::{Aabb, check_collision, check_near_miss, update_collisions};
pub use fragments::{
    AnimationClip, AnimationState, Collider, CollectibleKind, CollectibleTag, Health, JumpState,
    Lane, OtterPhysics, Particle, ParticleKind, Position, PowerUpPickup, RotationState, Variant,
    Velocity,
};
pub use pool::{EntityPools, PoolCategory};
pub use powerups::{Combo, PowerUpKind, PowerUps};
pub use rng::{RandomStream, generate_seed_phrase, is_valid_seed_phrase, phrase_to_seed};
pub use spawner::{Biome, SpawnerState, update_spawner};
pub use state::{
    GameEvent, GameMode, GameOverReason, GamePhase, GameState, RunStats, SpawnKind,
};
pub use tick::{TickInput, tick};
pub use world::{EntityId, FragmentMask, World};
