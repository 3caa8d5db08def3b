//! Read-only view of a run for the render collaborator
//!
//! A snapshot is plain data copied out of the store after a frame's ticks, so
//! a renderer can hold it without borrowing the session.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::sim::{
    AnimationClip, AnimationState, Biome, CollectibleKind, CollectibleTag, EntityId,
    FragmentMask, GameMode, GamePhase, GameState, JumpState, Lane, Particle, ParticleKind,
    Position, PowerUpKind, PowerUpPickup, RotationState, Variant,
};
use crate::ticks_to_secs;

/// What a non-player entity should be drawn as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Obstacle,
    Coin,
    Gem,
    PowerUp(PowerUpKind),
    Decoration,
    Particle(ParticleKind),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec3,
    pub variant: u8,
    /// Remaining particle life in [0, 1]
    pub life: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub position: Vec3,
    /// Pitch, yaw, roll in radians
    pub rotation: Vec3,
    pub animation: AnimationClip,
    pub lane: Lane,
    pub health: u8,
    pub airborne: bool,
    /// Flashing during grace windows
    pub invulnerable: bool,
}

/// Active buff with the seconds it has left (`None` until consumed)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuffView {
    pub kind: PowerUpKind,
    pub remaining_secs: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub phase: GamePhase,
    pub mode: GameMode,
    pub biome: Biome,
    pub player: PlayerView,
    /// Live entities in id order
    pub entities: Vec<EntityView>,
    pub distance: f32,
    pub score: u64,
    pub combo: u32,
    pub combo_multiplier: u32,
    pub buffs: Vec<BuffView>,
    pub time_left_secs: Option<f32>,
}

impl RenderSnapshot {
    pub fn capture(state: &GameState) -> Self {
        let world = &state.world;
        let player = state.player;

        let player_view = PlayerView {
            position: state.player_position(),
            rotation: world
                .get::<RotationState>(player)
                .map(|r| r.current)
                .unwrap_or(Vec3::ZERO),
            animation: world
                .get::<AnimationState>(player)
                .map(|a| a.current)
                .unwrap_or(AnimationClip::Swim),
            lane: state.player_lane(),
            health: state.health(),
            airborne: world.get::<JumpState>(player).is_some_and(|j| j.is_jumping),
            invulnerable: state.is_invulnerable(),
        };

        let entities = world
            .query_filtered(
                FragmentMask::POSITION,
                FragmentMask::PLAYER | FragmentMask::TOMBSTONES,
            )
            .into_iter()
            .filter_map(|id| entity_view(state, id))
            .collect();

        let buffs = state
            .power_ups
            .active_kinds()
            .into_iter()
            .map(|kind| BuffView {
                kind,
                remaining_secs: state
                    .power_ups
                    .remaining_ticks(kind, state.time_ticks)
                    .map(ticks_to_secs),
            })
            .collect();

        Self {
            phase: state.phase,
            mode: state.mode,
            biome: state.biome,
            player: player_view,
            entities,
            distance: state.stats.distance,
            score: state.stats.score,
            combo: state.combo.count,
            combo_multiplier: state
                .combo
                .multiplier(state.tuning.combo.multiplier_breakpoint),
            buffs,
            time_left_secs: state.time_left_ticks().map(ticks_to_secs),
        }
    }

    /// Entities of one kind
    pub fn count(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }
}

fn entity_view(state: &GameState, id: EntityId) -> Option<EntityView> {
    let world = &state.world;
    let position = world.get::<Position>(id)?.0;
    let variant = world.get::<Variant>(id).map(|v| v.0).unwrap_or(0);

    let mut life = None;
    let kind = if world.has(id, FragmentMask::OBSTACLE) {
        EntityKind::Obstacle
    } else if let Some(tag) = world.get::<CollectibleTag>(id) {
        match tag.kind {
            CollectibleKind::Coin => EntityKind::Coin,
            CollectibleKind::Gem => EntityKind::Gem,
        }
    } else if let Some(pickup) = world.get::<PowerUpPickup>(id) {
        EntityKind::PowerUp(pickup.kind)
    } else if world.has(id, FragmentMask::DECORATION) {
        EntityKind::Decoration
    } else if let Some(particle) = world.get::<Particle>(id) {
        life = Some(particle.life());
        EntityKind::Particle(particle.kind)
    } else {
        return None;
    };

    Some(EntityView {
        id,
        kind,
        position,
        variant,
        life,
    })
}
