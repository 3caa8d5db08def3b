//! Achievement definitions and unlock tracking
//!
//! Each definition names a tracked stat, the scope that stat lives in and a
//! threshold. The tracker remembers every id it has ever unlocked, so checking
//! the same snapshot twice never re-fires a notification.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How rare an achievement is (renderer picks badge styling from it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// Grouping used by achievement screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Distance,
    Collection,
    Combo,
    Survival,
    Mastery,
}

/// Whether a stat resets every run or persists across runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Session,
    Lifetime,
}

/// Stat an achievement watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackingKey {
    Distance,
    Coins,
    Gems,
    Combo,
    SurvivalTime,
    Score,
    PerfectRuns,
    TotalDistance,
    TotalCoins,
    TotalGems,
    GamesPlayed,
    HighScore,
    CharactersUnlocked,
}

/// Static achievement definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub rarity: Rarity,
    pub key: TrackingKey,
    pub scope: Scope,
    pub requirement: f64,
}

#[allow(clippy::too_many_arguments)]
const fn def(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: Category,
    rarity: Rarity,
    key: TrackingKey,
    scope: Scope,
    requirement: f64,
) -> AchievementDef {
    AchievementDef {
        id,
        name,
        description,
        category,
        rarity,
        key,
        scope,
        requirement,
    }
}

use Category as C;
use Rarity as R;
use Scope::{Lifetime, Session};
use TrackingKey as K;

/// The achievement catalogue
pub const ACHIEVEMENTS: &[AchievementDef] = &[
    def("first_hundred", "First Splash", "Swim 100 meters in a single run", C::Distance, R::Common, K::Distance, Session, 100.0),
    def("half_kilometer", "River Runner", "Swim 500 meters in a single run", C::Distance, R::Common, K::Distance, Session, 500.0),
    def("kilometer_club", "Kilometer Club", "Swim 1000 meters in a single run", C::Distance, R::Rare, K::Distance, Session, 1000.0),
    def("marathon_swimmer", "Marathon Swimmer", "Swim 5000 meters in a single run", C::Distance, R::Legendary, K::Distance, Session, 5000.0),
    def("first_coin", "Shiny!", "Collect your first coin", C::Collection, R::Common, K::Coins, Session, 1.0),
    def("coin_collector", "Coin Collector", "Collect 100 coins in a single run", C::Collection, R::Common, K::Coins, Session, 100.0),
    def("coin_hoarder", "Coin Hoarder", "Collect 1000 coins total", C::Collection, R::Rare, K::TotalCoins, Lifetime, 1000.0),
    def("golden_otter", "Golden Otter", "Collect 10000 coins total", C::Collection, R::Legendary, K::TotalCoins, Lifetime, 10000.0),
    def("first_gem", "Gem Hunter", "Collect your first gem", C::Collection, R::Common, K::Gems, Session, 1.0),
    def("gem_collector", "Gem Collector", "Collect 50 gems total", C::Collection, R::Rare, K::TotalGems, Lifetime, 50.0),
    def("gem_master", "Gem Master", "Collect 500 gems total", C::Collection, R::Epic, K::TotalGems, Lifetime, 500.0),
    def("combo_starter", "Combo Starter", "Reach a 5x combo", C::Combo, R::Common, K::Combo, Session, 5.0),
    def("combo_master", "Combo Master", "Reach a 10x combo", C::Combo, R::Rare, K::Combo, Session, 10.0),
    def("combo_legend", "Combo Legend", "Reach a 20x combo", C::Combo, R::Epic, K::Combo, Session, 20.0),
    def("combo_god", "Unstoppable", "Reach a 50x combo", C::Combo, R::Legendary, K::Combo, Session, 50.0),
    def("survivor", "Survivor", "Survive for 1 minute without taking damage", C::Survival, R::Rare, K::SurvivalTime, Session, 60.0),
    def("untouchable", "Untouchable", "Survive for 5 minutes without taking damage", C::Survival, R::Epic, K::SurvivalTime, Session, 300.0),
    def("perfect_run", "Perfect Run", "Complete a run without taking any damage", C::Survival, R::Legendary, K::PerfectRuns, Session, 1.0),
    def("first_game", "Welcome to the River", "Play your first game", C::Mastery, R::Common, K::GamesPlayed, Lifetime, 1.0),
    def("dedicated_player", "Dedicated Player", "Play 50 games", C::Mastery, R::Rare, K::GamesPlayed, Lifetime, 50.0),
    def("high_scorer", "High Scorer", "Achieve a score of 10000 points", C::Mastery, R::Epic, K::Score, Session, 10000.0),
    def("character_collector", "Character Collector", "Unlock all otter characters", C::Mastery, R::Legendary, K::CharactersUnlocked, Lifetime, 4.0),
];

/// Look up a definition by id
pub fn find(id: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Values of every tracked stat at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    pub distance: f64,
    pub coins: f64,
    pub gems: f64,
    pub max_combo: f64,
    /// Seconds since the last damage (or since run start)
    pub survival_time: f64,
    pub score: f64,
    /// 1 once a finished run qualifies as perfect
    pub perfect_runs: f64,
    pub total_distance: f64,
    pub total_coins: f64,
    pub total_gems: f64,
    pub games_played: f64,
    pub high_score: f64,
    pub characters_unlocked: f64,
}

impl StatSnapshot {
    pub fn value(&self, key: TrackingKey) -> f64 {
        match key {
            TrackingKey::Distance => self.distance,
            TrackingKey::Coins => self.coins,
            TrackingKey::Gems => self.gems,
            TrackingKey::Combo => self.max_combo,
            TrackingKey::SurvivalTime => self.survival_time,
            TrackingKey::Score => self.score,
            TrackingKey::PerfectRuns => self.perfect_runs,
            TrackingKey::TotalDistance => self.total_distance,
            TrackingKey::TotalCoins => self.total_coins,
            TrackingKey::TotalGems => self.total_gems,
            TrackingKey::GamesPlayed => self.games_played,
            TrackingKey::HighScore => self.high_score,
            TrackingKey::CharactersUnlocked => self.characters_unlocked,
        }
    }
}

/// Notification payload for an unlock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementUnlocked {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
}

impl From<&AchievementDef> for AchievementUnlocked {
    fn from(def: &AchievementDef) -> Self {
        Self {
            id: def.id.to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            rarity: def.rarity,
        }
    }
}

/// Remembers unlocked ids across checks and runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementTracker {
    unlocked: BTreeSet<String>,
}

impl AchievementTracker {
    /// Seed with ids unlocked in earlier sessions
    pub fn new<I, S>(unlocked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unlocked: unlocked.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains(id)
    }

    /// Unlocked ids in sorted order
    pub fn unlocked_ids(&self) -> Vec<String> {
        self.unlocked.iter().cloned().collect()
    }

    /// Unlock every definition in `scopes` whose stat has reached its
    /// requirement. Already-unlocked ids are skipped.
    pub fn check(&mut self, stats: &StatSnapshot, scopes: &[Scope]) -> Vec<AchievementUnlocked> {
        let mut fresh = Vec::new();
        for def in ACHIEVEMENTS {
            if !scopes.contains(&def.scope) || self.unlocked.contains(def.id) {
                continue;
            }
            if stats.value(def.key) >= def.requirement {
                self.unlocked.insert(def.id.to_string());
                log::info!("Achievement unlocked: {} ({})", def.name, def.id);
                fresh.push(AchievementUnlocked::from(def));
            }
        }
        fresh
    }

    /// Fraction toward an achievement in [0, 1]
    pub fn progress(&self, id: &str, stats: &StatSnapshot) -> Option<f64> {
        let def = find(id)?;
        if self.is_unlocked(id) {
            return Some(1.0);
        }
        Some((stats.value(def.key) / def.requirement).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_ids_unique() {
        let ids: HashSet<_> = ACHIEVEMENTS.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), ACHIEVEMENTS.len());
        assert!(ACHIEVEMENTS.iter().all(|a| a.requirement > 0.0));
    }

    #[test]
    fn test_unlock_at_threshold() {
        let mut tracker = AchievementTracker::default();
        let stats = StatSnapshot {
            distance: 99.9,
            ..Default::default()
        };
        assert!(tracker.check(&stats, &[Scope::Session]).is_empty());

        let stats = StatSnapshot {
            distance: 100.0,
            ..Default::default()
        };
        let fresh = tracker.check(&stats, &[Scope::Session]);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "first_hundred");
        assert_eq!(fresh[0].rarity, Rarity::Common);
    }

    #[test]
    fn test_check_is_idempotent() {
        let mut tracker = AchievementTracker::default();
        let stats = StatSnapshot {
            coins: 150.0,
            gems: 2.0,
            max_combo: 12.0,
            ..Default::default()
        };
        let first = tracker.check(&stats, &[Scope::Session, Scope::Lifetime]);
        assert!(!first.is_empty());
        let second = tracker.check(&stats, &[Scope::Session, Scope::Lifetime]);
        assert!(second.is_empty());
    }

    #[test]
    fn test_scope_filter() {
        let mut tracker = AchievementTracker::default();
        let stats = StatSnapshot {
            games_played: 1.0,
            ..Default::default()
        };
        assert!(tracker.check(&stats, &[Scope::Session]).is_empty());
        let fresh = tracker.check(&stats, &[Scope::Lifetime]);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "first_game");
    }

    #[test]
    fn test_previously_unlocked_never_refires() {
        let mut tracker = AchievementTracker::new(["first_coin"]);
        let stats = StatSnapshot {
            coins: 1.0,
            ..Default::default()
        };
        assert!(tracker.check(&stats, &[Scope::Session]).is_empty());
        assert_eq!(tracker.progress("first_coin", &stats), Some(1.0));
        assert_eq!(tracker.progress("coin_collector", &stats), Some(0.01));
    }
}
