//! Fixed-timestep loop and command interface
//!
//! A `Session` owns the current run and the lifetime progress. The host calls
//! [`Session::advance`] once per render frame with the elapsed wall-clock time;
//! the session turns that into whole simulation ticks. Input commands are
//! queued and consumed by the next tick, so the same commands at the same
//! ticks replay identically at any frame rate.

use crate::achievements::{AchievementTracker, Scope};
use crate::consts::{MAX_BACKLOG_SECS, MAX_SUBSTEPS, SIM_DT};
use crate::persistence::{ProgressStore, StoreError};
use crate::progress::{LifetimeProgress, RunSummary, SavedProgress};
use crate::sim::{GameEvent, GameMode, GameOverReason, GamePhase, GameState, TickInput, tick};
use crate::snapshot::RenderSnapshot;
use crate::tuning::{Tuning, TuningError};

/// Run owner and tick scheduler
#[derive(Debug)]
pub struct Session {
    tuning: Tuning,
    saved: SavedProgress,
    state: Option<GameState>,
    accumulator: f32,
    pending: TickInput,
    events: Vec<GameEvent>,
    run_unlocked: Vec<String>,
    summary: Option<RunSummary>,
}

impl Session {
    /// Validate the tuning and adopt previously saved progress
    pub fn new(tuning: Tuning, saved: SavedProgress) -> Result<Self, TuningError> {
        if let Err(e) = tuning.validate() {
            log::warn!("Rejected tuning: {e}");
            return Err(e);
        }
        Ok(Self {
            tuning,
            saved,
            state: None,
            accumulator: 0.0,
            pending: TickInput::default(),
            events: Vec::new(),
            run_unlocked: Vec::new(),
            summary: None,
        })
    }

    /// Load progress through a store, then build the session
    pub fn from_store(tuning: Tuning, store: &dyn ProgressStore) -> Result<Self, SessionError> {
        let saved = store.load()?;
        Ok(Self::new(tuning, saved)?)
    }

    /// Hand the current progress to a store
    pub fn save(&self, store: &mut dyn ProgressStore) -> Result<(), StoreError> {
        store.save(&self.saved)
    }

    /// Begin a fresh run. An unfinished run is quit first so its progress and
    /// unlocks are kept. Returns the phrase in use.
    pub fn start_run(&mut self, seed_phrase: Option<&str>, mode: GameMode) -> &str {
        if self.quit().is_some() {
            log::info!("Unfinished run quit before restart");
        }
        let tracker = AchievementTracker::new(self.saved.unlocked_ids.iter().cloned());
        self.accumulator = 0.0;
        self.pending = TickInput::default();
        self.run_unlocked.clear();
        self.summary = None;
        let state = self
            .state
            .insert(GameState::new(seed_phrase, mode, self.tuning.clone(), tracker));
        state.rng.phrase()
    }

    fn is_playing(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.phase == GamePhase::Playing)
    }

    /// Queue a lane change; applied on the next tick
    pub fn move_lane(&mut self, delta: i8) {
        if self.is_playing() && delta != 0 {
            self.pending.lane_delta = (self.pending.lane_delta + delta.signum()).clamp(-2, 2);
        }
    }

    /// Queue a jump; applied on the next tick
    pub fn jump(&mut self) {
        if self.is_playing() {
            self.pending.jump = true;
        }
    }

    pub fn pause(&mut self) {
        if let Some(state) = self.state.as_mut() {
            if state.phase == GamePhase::Playing {
                state.phase = GamePhase::Paused;
                log::debug!("paused at tick {}", state.time_ticks);
            }
        }
    }

    pub fn resume(&mut self) {
        if let Some(state) = self.state.as_mut() {
            if state.phase == GamePhase::Paused {
                state.phase = GamePhase::Playing;
                log::debug!("resumed at tick {}", state.time_ticks);
            }
        }
    }

    /// End the current run now. Returns its summary if one was in progress.
    pub fn quit(&mut self) -> Option<RunSummary> {
        let state = self.state.as_mut()?;
        if state.phase == GamePhase::GameOver {
            return None;
        }
        state.end_run(GameOverReason::Quit);
        self.collect_events();
        self.finish_run();
        self.summary.take()
    }

    /// Run every whole tick the elapsed time allows, up to the substep cap.
    /// Leftover time stays in the accumulator, bounded by `MAX_BACKLOG_SECS`
    /// so a long stall never turns into a fast-forward. Returns the ticks executed.
    pub fn advance(&mut self, frame_secs: f32) -> u32 {
        if !self.is_playing() {
            return 0;
        }
        if frame_secs.is_finite() && frame_secs > 0.0 {
            self.accumulator = (self.accumulator + frame_secs).min(MAX_BACKLOG_SECS);
        }

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = std::mem::take(&mut self.pending);
            let Some(state) = self.state.as_mut() else {
                break;
            };
            tick(state, &input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            let over = state.phase == GamePhase::GameOver;
            self.collect_events();
            if over {
                self.accumulator = 0.0;
                self.finish_run();
                break;
            }
        }
        substeps
    }

    /// Move run notifications into the session queue, noting unlocks
    fn collect_events(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        for event in state.drain_events() {
            if let GameEvent::AchievementUnlocked(unlocked) = &event {
                self.run_unlocked.push(unlocked.id.clone());
            }
            self.events.push(event);
        }
    }

    /// Fold the run into lifetime progress and run the final achievement check
    fn finish_run(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let reason = self
            .events
            .iter()
            .rev()
            .find_map(|e| match e {
                GameEvent::GameOver { reason } => Some(*reason),
                _ => None,
            })
            .unwrap_or(GameOverReason::Quit);

        let perfect = state.is_perfect();
        let mut summary = RunSummary {
            phrase: state.rng.phrase().to_string(),
            mode: state.mode,
            reason,
            distance: state.stats.distance,
            score: state.stats.score,
            coins: state.stats.coins,
            gems: state.stats.gems,
            near_misses: state.stats.near_misses,
            max_combo: state.combo.max,
            survival_secs: state.survival_secs(),
            perfect,
            newly_unlocked: Vec::new(),
        };

        self.saved.progress.fold(&summary);

        let mut session_stats = state.stat_snapshot();
        session_stats.perfect_runs = if perfect { 1.0 } else { 0.0 };
        let stats = self.saved.progress.with_session(session_stats);
        for unlocked in state
            .achievements
            .check(&stats, &[Scope::Session, Scope::Lifetime])
        {
            self.run_unlocked.push(unlocked.id.clone());
            self.events.push(GameEvent::AchievementUnlocked(unlocked));
        }
        self.saved.unlocked_ids = state.achievements.unlocked_ids();

        summary.newly_unlocked = self.run_unlocked.clone();
        log::info!(
            "Run summary: {:?}, score {}, {} new achievements",
            summary.reason,
            summary.score,
            summary.newly_unlocked.len()
        );
        self.summary = Some(summary);
    }

    /// Take every pending notification
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Summary of the run that just ended by death or time-out
    pub fn take_run_summary(&mut self) -> Option<RunSummary> {
        self.summary.take()
    }

    /// Render view of the current run
    pub fn snapshot(&self) -> Option<RenderSnapshot> {
        self.state.as_ref().map(RenderSnapshot::capture)
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn phase(&self) -> Option<GamePhase> {
        self.state.as_ref().map(|s| s.phase)
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn saved_progress(&self) -> &SavedProgress {
        &self.saved
    }

    pub fn lifetime(&self) -> &LifetimeProgress {
        &self.saved.progress
    }
}

/// Failure building a session from stored progress
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Tuning(#[from] TuningError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
