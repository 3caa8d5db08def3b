//! Entity store
//!
//! Entities are a generational index plus a fragment mask. Data fragments live
//! in one sparse set per type; tag fragments are mask bits only. Queries scan
//! the mask table in index order, so results are always sorted by entity id.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::fragments::{
    AnimationState, Collider, CollectibleTag, Health, JumpState, Lane, OtterPhysics, Particle,
    Pooled, Position, PowerUpPickup, RotationState, Variant, Velocity,
};

/// Generational entity handle
///
/// A handle whose generation no longer matches the slot is stale and resolves
/// to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

bitflags! {
    /// Which fragments an entity carries
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FragmentMask: u32 {
        const POSITION        = 1 << 0;
        const VELOCITY        = 1 << 1;
        const COLLIDER        = 1 << 2;
        const PLAYER          = 1 << 3;
        const OBSTACLE        = 1 << 4;
        const COLLECTIBLE     = 1 << 5;
        const POWER_UP_PICKUP = 1 << 6;
        const PARTICLE        = 1 << 7;
        const DECORATION      = 1 << 8;
        const HEALTH          = 1 << 9;
        const LANE            = 1 << 10;
        const OTTER_PHYSICS   = 1 << 11;
        const ROTATION        = 1 << 12;
        const JUMP            = 1 << 13;
        const ANIMATION       = 1 << 14;
        const VARIANT         = 1 << 15;
        const POOLED          = 1 << 16;
        /// Tombstone: purge at the end of the tick
        const DESTROYED       = 1 << 20;
        /// Tombstone: purge at the end of the tick
        const COLLECTED       = 1 << 21;
        /// Obstacle has already awarded its near-miss bonus
        const NEAR_MISSED     = 1 << 22;
        /// Parked in a pool; invisible to queries
        const DORMANT         = 1 << 23;
        /// Already warned about as malformed
        const REPORTED        = 1 << 24;
    }
}

impl FragmentMask {
    /// Tombstones consumed by cleanup
    pub const TOMBSTONES: Self = Self::DESTROYED.union(Self::COLLECTED);
}

/// Dense storage for one fragment type
#[derive(Debug, Clone)]
pub struct SparseSet<T> {
    sparse: Vec<Option<u32>>,
    dense: Vec<T>,
    owners: Vec<EntityId>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            owners: Vec::new(),
        }
    }
}

impl<T> SparseSet<T> {
    fn slot(&self, id: EntityId) -> Option<usize> {
        let dense = (*self.sparse.get(id.index as usize)?)? as usize;
        (self.owners[dense] == id).then_some(dense)
    }

    /// Insert or replace; returns the previous value
    pub fn insert(&mut self, id: EntityId, value: T) -> Option<T> {
        if let Some(dense) = self.slot(id) {
            return Some(std::mem::replace(&mut self.dense[dense], value));
        }
        let index = id.index as usize;
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, None);
        }
        self.sparse[index] = Some(self.dense.len() as u32);
        self.dense.push(value);
        self.owners.push(id);
        None
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.slot(id).map(|dense| &self.dense[dense])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.slot(id).map(|dense| &mut self.dense[dense])
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.slot(id).is_some()
    }

    /// Remove by swapping the last element into the hole
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let dense = self.slot(id)?;
        self.sparse[id.index as usize] = None;
        let last = self.dense.len() - 1;
        if dense != last {
            let moved = self.owners[last];
            self.sparse[moved.index as usize] = Some(dense as u32);
        }
        self.owners.swap_remove(dense);
        Some(self.dense.swap_remove(dense))
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Iterate in storage order (not id order)
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.owners.clear();
    }
}

/// A data fragment with its own storage
pub trait Fragment: Sized + 'static {
    const MASK: FragmentMask;
    fn storage(world: &World) -> &SparseSet<Self>;
    fn storage_mut(world: &mut World) -> &mut SparseSet<Self>;
}

macro_rules! impl_fragment {
    ($ty:ty, $mask:ident, $field:ident) => {
        impl Fragment for $ty {
            const MASK: FragmentMask = FragmentMask::$mask;

            #[inline]
            fn storage(world: &World) -> &SparseSet<Self> {
                &world.$field
            }

            #[inline]
            fn storage_mut(world: &mut World) -> &mut SparseSet<Self> {
                &mut world.$field
            }
        }
    };
}

impl_fragment!(Position, POSITION, positions);
impl_fragment!(Velocity, VELOCITY, velocities);
impl_fragment!(Collider, COLLIDER, colliders);
impl_fragment!(CollectibleTag, COLLECTIBLE, collectibles);
impl_fragment!(PowerUpPickup, POWER_UP_PICKUP, power_up_pickups);
impl_fragment!(Particle, PARTICLE, particles);
impl_fragment!(Health, HEALTH, healths);
impl_fragment!(Lane, LANE, lanes);
impl_fragment!(OtterPhysics, OTTER_PHYSICS, otter_physics);
impl_fragment!(RotationState, ROTATION, rotations);
impl_fragment!(JumpState, JUMP, jumps);
impl_fragment!(AnimationState, ANIMATION, animations);
impl_fragment!(Variant, VARIANT, variants);
impl_fragment!(Pooled, POOLED, pooled);

/// The entity store
///
/// Single-threaded; owned by the run and mutated only inside a tick.
#[derive(Debug, Clone, Default)]
pub struct World {
    generations: Vec<u32>,
    masks: Vec<FragmentMask>,
    alive: Vec<bool>,
    free: Vec<u32>,
    positions: SparseSet<Position>,
    velocities: SparseSet<Velocity>,
    colliders: SparseSet<Collider>,
    collectibles: SparseSet<CollectibleTag>,
    power_up_pickups: SparseSet<PowerUpPickup>,
    particles: SparseSet<Particle>,
    healths: SparseSet<Health>,
    lanes: SparseSet<Lane>,
    otter_physics: SparseSet<OtterPhysics>,
    rotations: SparseSet<RotationState>,
    jumps: SparseSet<JumpState>,
    animations: SparseSet<AnimationState>,
    variants: SparseSet<Variant>,
    pooled: SparseSet<Pooled>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh entity with no fragments
    pub fn create(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            self.masks[slot] = FragmentMask::empty();
            return EntityId {
                index,
                generation: self.generations[slot],
            };
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.masks.push(FragmentMask::empty());
        self.alive.push(true);
        EntityId {
            index,
            generation: 0,
        }
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        let slot = id.index as usize;
        slot < self.alive.len() && self.alive[slot] && self.generations[slot] == id.generation
    }

    /// Number of live entities (dormant ones included)
    pub fn len(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attach or replace a data fragment. Ignored for stale handles.
    pub fn insert<F: Fragment>(&mut self, id: EntityId, value: F) {
        if !self.is_alive(id) {
            log::debug!("insert on stale entity {id:?} ignored");
            return;
        }
        F::storage_mut(self).insert(id, value);
        self.masks[id.index as usize].insert(F::MASK);
    }

    pub fn get<F: Fragment>(&self, id: EntityId) -> Option<&F> {
        F::storage(self).get(id)
    }

    pub fn get_mut<F: Fragment>(&mut self, id: EntityId) -> Option<&mut F> {
        F::storage_mut(self).get_mut(id)
    }

    /// Detach a data fragment, returning it
    pub fn remove_fragment<F: Fragment>(&mut self, id: EntityId) -> Option<F> {
        let removed = F::storage_mut(self).remove(id);
        if removed.is_some() {
            self.masks[id.index as usize].remove(F::MASK);
        }
        removed
    }

    /// Set tag bits
    pub fn tag(&mut self, id: EntityId, tags: FragmentMask) {
        if self.is_alive(id) {
            self.masks[id.index as usize].insert(tags);
        }
    }

    /// Clear tag bits
    pub fn untag(&mut self, id: EntityId, tags: FragmentMask) {
        if self.is_alive(id) {
            self.masks[id.index as usize].remove(tags);
        }
    }

    pub fn mask(&self, id: EntityId) -> FragmentMask {
        if self.is_alive(id) {
            self.masks[id.index as usize]
        } else {
            FragmentMask::empty()
        }
    }

    /// True if the entity carries every bit in `mask`
    pub fn has(&self, id: EntityId, mask: FragmentMask) -> bool {
        self.mask(id).contains(mask)
    }

    /// Remove every fragment but keep the entity alive
    pub fn strip(&mut self, id: EntityId) {
        if !self.is_alive(id) {
            return;
        }
        self.positions.remove(id);
        self.velocities.remove(id);
        self.colliders.remove(id);
        self.collectibles.remove(id);
        self.power_up_pickups.remove(id);
        self.particles.remove(id);
        self.healths.remove(id);
        self.lanes.remove(id);
        self.otter_physics.remove(id);
        self.rotations.remove(id);
        self.jumps.remove(id);
        self.animations.remove(id);
        self.variants.remove(id);
        self.pooled.remove(id);
        self.masks[id.index as usize] = FragmentMask::empty();
    }

    /// Destroy the entity; its handle becomes stale
    pub fn despawn(&mut self, id: EntityId) {
        if !self.is_alive(id) {
            return;
        }
        self.strip(id);
        let slot = id.index as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(id.index);
    }

    /// Entities carrying all of `required`, sorted by id.
    ///
    /// Dormant entities are skipped unless `required` asks for them. The
    /// result is a snapshot: later mutation never changes it mid-iteration.
    pub fn query(&self, required: FragmentMask) -> Vec<EntityId> {
        self.query_filtered(required, FragmentMask::empty())
    }

    /// Like [`World::query`] but also excluding entities with any `excluded` bit
    pub fn query_filtered(&self, required: FragmentMask, excluded: FragmentMask) -> Vec<EntityId> {
        let mut excluded = excluded;
        if !required.contains(FragmentMask::DORMANT) {
            excluded |= FragmentMask::DORMANT;
        }
        self.masks
            .iter()
            .enumerate()
            .filter(|(slot, mask)| {
                self.alive[*slot] && mask.contains(required) && !mask.intersects(excluded)
            })
            .map(|(slot, _)| EntityId {
                index: slot as u32,
                generation: self.generations[slot],
            })
            .collect()
    }

    /// Count live entities matching `required` without allocating
    pub fn count(&self, required: FragmentMask) -> usize {
        self.masks
            .iter()
            .enumerate()
            .filter(|(slot, mask)| {
                self.alive[*slot]
                    && mask.contains(required)
                    && !mask.contains(FragmentMask::DORMANT)
            })
            .count()
    }

    /// Drop every entity
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Storage view for one fragment type
    pub fn storage<F: Fragment>(&self) -> &SparseSet<F> {
        F::storage(self)
    }
}
