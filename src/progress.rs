//! Lifetime progress and run summaries
//!
//! Lifetime counters survive across runs; the session folds each finished run
//! into them before the run-end achievement check.

use serde::{Deserialize, Serialize};

use crate::achievements::StatSnapshot;
use crate::sim::{GameMode, GameOverReason};

/// Counters that persist across runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifetimeProgress {
    pub total_distance: f64,
    pub total_coins: u64,
    pub total_gems: u64,
    pub games_played: u32,
    pub high_score: u64,
    /// Playable characters owned (the starter otter counts)
    pub characters_unlocked: u32,
    pub perfect_runs: u32,
}

impl Default for LifetimeProgress {
    fn default() -> Self {
        Self {
            total_distance: 0.0,
            total_coins: 0,
            total_gems: 0,
            games_played: 0,
            high_score: 0,
            characters_unlocked: 1,
            perfect_runs: 0,
        }
    }
}

impl LifetimeProgress {
    /// Fold a finished run into the lifetime totals
    pub fn fold(&mut self, run: &RunSummary) {
        self.games_played += 1;
        self.total_distance += run.distance as f64;
        self.total_coins += run.coins as u64;
        self.total_gems += run.gems as u64;
        self.high_score = self.high_score.max(run.score);
        if run.perfect {
            self.perfect_runs += 1;
        }
    }

    /// Fill the lifetime half of a stat snapshot
    pub fn with_session(&self, session: StatSnapshot) -> StatSnapshot {
        StatSnapshot {
            total_distance: self.total_distance,
            total_coins: self.total_coins as f64,
            total_gems: self.total_gems as f64,
            games_played: self.games_played as f64,
            high_score: self.high_score as f64,
            characters_unlocked: self.characters_unlocked as f64,
            ..session
        }
    }
}

/// Everything handed to the persistence collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedProgress {
    pub progress: LifetimeProgress,
    /// Achievement ids unlocked so far, sorted
    pub unlocked_ids: Vec<String>,
}

/// Result of one finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub phrase: String,
    pub mode: GameMode,
    pub reason: GameOverReason,
    pub distance: f32,
    pub score: u64,
    pub coins: u32,
    pub gems: u32,
    pub near_misses: u32,
    pub max_combo: u32,
    pub survival_secs: f32,
    /// Finished far enough without an unshielded hit
    pub perfect: bool,
    /// Achievements unlocked during this run, in unlock order
    pub newly_unlocked: Vec<String>,
}
