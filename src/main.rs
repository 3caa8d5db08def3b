//! River Rush headless driver
//!
//! Plays one autopiloted run for a seed phrase and logs the notifications the
//! core raises. Usage:
//!
//! ```text
//! river-rush [--zen | --time-trial] [--tuning FILE] [seed words...]
//! ```

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use river_rush::persistence::{MemoryStore, ProgressStore};
    use river_rush::sim::GameMode;
    use river_rush::{Session, Tuning};

    env_logger::init();
    log::info!("River Rush (headless) starting...");

    let mut mode = GameMode::Classic;
    let mut tuning = Tuning::default();
    let mut words = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--zen" => mode = GameMode::Zen,
            "--time-trial" => mode = GameMode::TimeTrial,
            "--tuning" => {
                let path = args.next().ok_or("--tuning needs a file path")?;
                tuning = Tuning::from_json(&std::fs::read_to_string(path)?)?;
            }
            _ => words.push(arg),
        }
    }
    let phrase = (!words.is_empty()).then(|| words.join(" "));

    let mut store = MemoryStore::new();
    let mut session = Session::from_store(tuning, &store)?;
    let phrase = session.start_run(phrase.as_deref(), mode).to_string();
    println!("Seed phrase: {phrase}");

    let summary = autopilot::play(&mut session);
    session.save(&mut store)?;

    match summary {
        Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
        None => println!("Run still going after the time limit"),
    }
    println!(
        "Lifetime: {}",
        serde_json::to_string(&store.load()?.progress)?
    );
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The core is embedded by a host page; nothing to drive here
}

#[cfg(not(target_arch = "wasm32"))]
mod autopilot {
    use river_rush::Session;
    use river_rush::progress::RunSummary;
    use river_rush::sim::{GameEvent, Lane};
    use river_rush::snapshot::{EntityKind, RenderSnapshot};

    /// Uneven frame times, to show the tick count does not depend on them
    const FRAMES: [f32; 4] = [1.0 / 60.0, 1.0 / 45.0, 1.0 / 120.0, 1.0 / 75.0];
    /// Give up after this much simulated time
    const MAX_SECONDS: f32 = 600.0;
    /// How far ahead obstacles are considered a threat
    const LOOKAHEAD: f32 = 5.0;

    /// Steer until the run ends; returns its summary
    pub fn play(session: &mut Session) -> Option<RunSummary> {
        let mut elapsed = 0.0;
        let mut frame = 0usize;
        while elapsed < MAX_SECONDS {
            if let Some(snapshot) = session.snapshot() {
                steer(session, &snapshot);
            }

            let dt = FRAMES[frame % FRAMES.len()];
            frame += 1;
            elapsed += dt;
            session.advance(dt);

            for event in session.drain_events() {
                report(&event);
            }
            if let Some(summary) = session.take_run_summary() {
                return Some(summary);
            }
        }
        session.quit()
    }

    /// Nearest obstacle distance ahead of the player in a lane
    fn clearance(snapshot: &RenderSnapshot, lane: Lane, lane_width: f32) -> f32 {
        let player = snapshot.player.position;
        let x = lane.index() as f32 * lane_width;
        snapshot
            .entities
            .iter()
            .filter(|e| e.kind == EntityKind::Obstacle && (e.position.x - x).abs() < 0.5)
            .map(|e| e.position.y - player.y)
            .filter(|gap| *gap > -1.0)
            .fold(f32::INFINITY, f32::min)
    }

    fn steer(session: &mut Session, snapshot: &RenderSnapshot) {
        let lane_width = session.tuning().lanes.lane_width;
        let current = snapshot.player.lane;
        if clearance(snapshot, current, lane_width) > LOOKAHEAD {
            return;
        }
        let best = Lane::ALL
            .into_iter()
            .filter(|lane| (lane.index() - current.index()).abs() == 1)
            .max_by(|a, b| {
                clearance(snapshot, *a, lane_width).total_cmp(&clearance(snapshot, *b, lane_width))
            });
        if let Some(lane) = best {
            session.move_lane(lane.index() - current.index());
        }
    }

    fn report(event: &GameEvent) {
        match event {
            GameEvent::Spawned { .. } | GameEvent::Jumped | GameEvent::Landed { .. } => {}
            GameEvent::AchievementUnlocked(a) => {
                println!("Achievement: {} ({:?}) - {}", a.name, a.rarity, a.description)
            }
            GameEvent::MilestoneReached { distance } => println!("Milestone: {distance} m"),
            other => log::info!("{other:?}"),
        }
    }
}
