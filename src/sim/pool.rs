//! Entity pools keyed by spawn category
//!
//! Released entities stay alive in the store, stripped of every fragment and
//! tagged `DORMANT`, so queries never see them. Acquiring from an empty pool
//! creates a fresh entity.

use serde::{Deserialize, Serialize};

use super::fragments::Pooled;
use super::world::{EntityId, FragmentMask, World};

/// Spawn categories that recycle entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolCategory {
    Obstacle,
    Collectible,
    Decoration,
    Particle,
}

impl PoolCategory {
    pub const ALL: [PoolCategory; 4] = [
        PoolCategory::Obstacle,
        PoolCategory::Collectible,
        PoolCategory::Decoration,
        PoolCategory::Particle,
    ];

    #[inline]
    fn slot(self) -> usize {
        match self {
            PoolCategory::Obstacle => 0,
            PoolCategory::Collectible => 1,
            PoolCategory::Decoration => 2,
            PoolCategory::Particle => 3,
        }
    }
}

/// Free lists for every category
#[derive(Debug, Clone, Default)]
pub struct EntityPools {
    free: [Vec<EntityId>; 4],
    /// Entities ever created per category
    created: [u32; 4],
}

impl EntityPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create `count` dormant entities for a category
    pub fn prewarm(&mut self, world: &mut World, category: PoolCategory, count: usize) {
        for _ in 0..count {
            let id = self.create(world, category);
            world.remove_fragment::<Pooled>(id);
            world.tag(id, FragmentMask::DORMANT);
            self.free[category.slot()].push(id);
        }
    }

    fn create(&mut self, world: &mut World, category: PoolCategory) -> EntityId {
        self.created[category.slot()] += 1;
        let id = world.create();
        world.insert(id, Pooled(category));
        id
    }

    /// Take an empty entity for `category`, growing the pool if needed
    pub fn acquire(&mut self, world: &mut World, category: PoolCategory) -> EntityId {
        while let Some(id) = self.free[category.slot()].pop() {
            // A dormant slot can only go stale if someone despawned it directly
            if world.is_alive(id) {
                world.untag(id, FragmentMask::DORMANT);
                world.insert(id, Pooled(category));
                return id;
            }
        }
        log::trace!("{category:?} pool empty, growing");
        self.create(world, category)
    }

    /// Return an entity to its pool; unpooled entities are despawned
    pub fn release(&mut self, world: &mut World, id: EntityId) {
        if !world.is_alive(id) || world.has(id, FragmentMask::DORMANT) {
            return;
        }
        match world.get::<Pooled>(id).copied() {
            Some(Pooled(category)) => {
                world.strip(id);
                world.tag(id, FragmentMask::DORMANT);
                self.free[category.slot()].push(id);
            }
            None => world.despawn(id),
        }
    }

    /// Dormant entities ready for reuse
    pub fn available(&self, category: PoolCategory) -> usize {
        self.free[category.slot()].len()
    }

    /// Entities ever allocated for the category
    pub fn created(&self, category: PoolCategory) -> u32 {
        self.created[category.slot()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::fragments::Position;
    use glam::Vec3;

    #[test]
    fn test_acquire_from_empty_pool_grows() {
        let mut world = World::new();
        let mut pools = EntityPools::new();
        let a = pools.acquire(&mut world, PoolCategory::Obstacle);
        let b = pools.acquire(&mut world, PoolCategory::Obstacle);
        assert_ne!(a, b);
        assert_eq!(pools.created(PoolCategory::Obstacle), 2);
    }

    #[test]
    fn test_release_then_acquire_reuses_entity() {
        let mut world = World::new();
        let mut pools = EntityPools::new();
        let a = pools.acquire(&mut world, PoolCategory::Collectible);
        world.insert(a, Position(Vec3::ONE));
        world.tag(a, FragmentMask::COLLECTIBLE | FragmentMask::COLLECTED);

        pools.release(&mut world, a);
        assert!(world.query(FragmentMask::COLLECTIBLE).is_empty());
        assert_eq!(pools.available(PoolCategory::Collectible), 1);

        let b = pools.acquire(&mut world, PoolCategory::Collectible);
        assert_eq!(a, b);
        assert!(world.get::<Position>(b).is_none());
        assert!(!world.has(b, FragmentMask::COLLECTED));
        assert_eq!(pools.created(PoolCategory::Collectible), 1);
    }

    #[test]
    fn test_prewarm_and_double_release() {
        let mut world = World::new();
        let mut pools = EntityPools::new();
        pools.prewarm(&mut world, PoolCategory::Particle, 4);
        assert_eq!(pools.available(PoolCategory::Particle), 4);

        let p = pools.acquire(&mut world, PoolCategory::Particle);
        pools.release(&mut world, p);
        pools.release(&mut world, p);
        assert_eq!(pools.available(PoolCategory::Particle), 4);
    }

    #[test]
    fn test_unpooled_entity_is_despawned() {
        let mut world = World::new();
        let mut pools = EntityPools::new();
        let e = world.create();
        pools.release(&mut world, e);
        assert!(!world.is_alive(e));
    }
}
