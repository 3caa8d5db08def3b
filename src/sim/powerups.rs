//! Power-up slots and the combo chain
//!
//! Each power-up kind owns an independent slot. Timed kinds expire on the
//! first tick at or past their end tick; the shield has no end and is consumed
//! by the hit it absorbs.

use serde::{Deserialize, Serialize};

use crate::secs_to_ticks;
use crate::tuning::{ComboTuning, PowerUpTuning};

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    Shield,
    Magnet,
    Ghost,
    Multiplier,
    SlowMotion,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::Shield,
        PowerUpKind::Magnet,
        PowerUpKind::Ghost,
        PowerUpKind::Multiplier,
        PowerUpKind::SlowMotion,
    ];

    #[inline]
    fn slot(self) -> usize {
        match self {
            PowerUpKind::Shield => 0,
            PowerUpKind::Magnet => 1,
            PowerUpKind::Ghost => 2,
            PowerUpKind::Multiplier => 3,
            PowerUpKind::SlowMotion => 4,
        }
    }

    /// Buff length in ticks; zero for the duration-less shield
    pub fn duration_ticks(self, tuning: &PowerUpTuning) -> u32 {
        match self {
            PowerUpKind::Shield => 0,
            PowerUpKind::Magnet => secs_to_ticks(tuning.magnet_secs),
            PowerUpKind::Ghost => secs_to_ticks(tuning.ghost_secs),
            PowerUpKind::Multiplier => secs_to_ticks(tuning.multiplier_secs),
            PowerUpKind::SlowMotion => secs_to_ticks(tuning.slow_motion_secs),
        }
    }
}

/// State of one power-up kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PowerUpSlot {
    pub active: bool,
    pub activated_tick: u64,
    /// `None` while inactive or for the shield
    pub ends_at_tick: Option<u64>,
}

/// All power-up slots for a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerUps {
    slots: [PowerUpSlot; 5],
}

impl PowerUps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, kind: PowerUpKind) -> &PowerUpSlot {
        &self.slots[kind.slot()]
    }

    pub fn is_active(&self, kind: PowerUpKind) -> bool {
        self.slots[kind.slot()].active
    }

    /// Activate or refresh. A refresh sets the end to `now + duration`; it
    /// never adds the remaining time.
    pub fn activate(&mut self, kind: PowerUpKind, now: u64, duration_ticks: u32) {
        let slot = &mut self.slots[kind.slot()];
        slot.active = true;
        slot.activated_tick = now;
        slot.ends_at_tick = match kind {
            PowerUpKind::Shield => None,
            _ => Some(now + duration_ticks as u64),
        };
    }

    /// Returns true if the kind was active
    pub fn deactivate(&mut self, kind: PowerUpKind) -> bool {
        let slot = &mut self.slots[kind.slot()];
        let was_active = slot.active;
        *slot = PowerUpSlot::default();
        was_active
    }

    /// Deactivate every timed kind whose end tick has been reached
    pub fn expire(&mut self, now: u64) -> Vec<PowerUpKind> {
        let mut expired = Vec::new();
        for kind in PowerUpKind::ALL {
            let slot = &self.slots[kind.slot()];
            if slot.active && slot.ends_at_tick.is_some_and(|end| now >= end) {
                self.deactivate(kind);
                expired.push(kind);
            }
        }
        expired
    }

    /// Ticks left on a timed buff
    pub fn remaining_ticks(&self, kind: PowerUpKind, now: u64) -> Option<u64> {
        let slot = &self.slots[kind.slot()];
        if !slot.active {
            return None;
        }
        slot.ends_at_tick.map(|end| end.saturating_sub(now))
    }

    /// Kinds currently active, in declaration order
    pub fn active_kinds(&self) -> Vec<PowerUpKind> {
        PowerUpKind::ALL
            .into_iter()
            .filter(|k| self.is_active(*k))
            .collect()
    }

    /// Score multiplier contributed by the multiplier buff
    pub fn score_multiplier(&self, tuning: &PowerUpTuning) -> u32 {
        if self.is_active(PowerUpKind::Multiplier) {
            tuning.multiplier_value.max(1)
        } else {
            1
        }
    }

    /// Scroll speed factor contributed by slow motion
    pub fn speed_factor(&self, tuning: &PowerUpTuning) -> f32 {
        if self.is_active(PowerUpKind::SlowMotion) {
            tuning.slow_motion_factor
        } else {
            1.0
        }
    }
}

/// What raised the combo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboSource {
    Coin,
    Gem,
    NearMiss,
}

impl ComboSource {
    pub fn step(self, tuning: &ComboTuning) -> u32 {
        match self {
            ComboSource::Coin => tuning.coin_step,
            ComboSource::Gem => tuning.gem_step,
            ComboSource::NearMiss => tuning.near_miss_step,
        }
    }
}

/// Chained-action counter with a reset timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combo {
    pub count: u32,
    /// Ticks until the combo drops; `None` when idle
    pub timer_ticks: Option<u32>,
    /// Highest count reached this run
    pub max: u32,
}

impl Combo {
    /// Add `step` and restart the timer
    pub fn increment(&mut self, step: u32, timeout_ticks: u32) {
        self.count = self.count.saturating_add(step);
        self.max = self.max.max(self.count);
        self.timer_ticks = Some(timeout_ticks.max(1));
    }

    /// Advance the timer one tick. Returns true if the combo dropped.
    pub fn tick(&mut self) -> bool {
        let Some(remaining) = self.timer_ticks else {
            return false;
        };
        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            let dropped = self.count > 0;
            self.count = 0;
            self.timer_ticks = None;
            dropped
        } else {
            self.timer_ticks = Some(remaining);
            false
        }
    }

    /// Drop the combo immediately (unshielded damage)
    pub fn reset(&mut self) {
        self.count = 0;
        self.timer_ticks = None;
    }

    /// Step multiplier: 1 + count / breakpoint
    pub fn multiplier(&self, breakpoint: u32) -> u32 {
        1 + self.count / breakpoint.max(1)
    }
}
