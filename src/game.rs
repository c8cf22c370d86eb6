//! Frame driver
//!
//! Samples the clock once per display frame, feeds whole fixed steps into
//! the simulation, and handles the run lifecycle around it: starting and
//! restarting, recording the score once when a run ends, and offering a
//! reward if a collaborator is present.

use std::cell::Cell;
use std::rc::Rc;

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::error::Result;
use crate::highscores::{HighScores, ScoreEntry, ScoreStore};
use crate::platform::{Clock, InputAxes};
use crate::renderer::FrameSnapshot;
use crate::reward::{RewardService, RewardTier, reward_for_score};
use crate::settings::Settings;
use crate::sim::{Arena, GameEvent, GamePhase, GameState, Hud, TickInput, tick};
use crate::tuning::Tuning;

/// Events kept for the host between `take_events` calls; older ones are dropped
pub const MAX_PENDING_EVENTS: usize = 256;

/// Whether the host should schedule another frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// Cancels the frame loop from outside (teardown, navigation)
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    cancelled: Rc<Cell<bool>>,
}

impl StopHandle {
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    fn reset(&self) {
        self.cancelled.set(false);
    }
}

/// Game instance holding all state
pub struct Game<C: Clock> {
    state: GameState,
    tuning: Tuning,
    clock: C,
    scores: Box<dyn ScoreStore>,
    reward_service: Option<Box<dyn RewardService>>,
    settings: Settings,
    input: TickInput,
    accumulator: f32,
    last_frame_ms: Option<u64>,
    running: bool,
    stop: StopHandle,
    /// Ordered table as of the last completed run
    leaderboard: Vec<ScoreEntry>,
    result_recorded: bool,
    last_reward: Option<RewardTier>,
}

impl<C: Clock> Game<C> {
    /// Validate the tuning and viewport, then sit in the menu
    pub fn new(
        tuning: Tuning,
        clock: C,
        scores: Box<dyn ScoreStore>,
        width: f32,
        height: f32,
        seed: u64,
    ) -> Result<Self> {
        tuning.validate()?;
        let arena = Arena::new(width, height, &tuning)?;
        let leaderboard = scores.load_scores();
        log::info!(
            "Game ready: {}x{} viewport, {} stored scores",
            width,
            height,
            leaderboard.len()
        );
        Ok(Self {
            state: GameState::new(seed, arena, &tuning),
            tuning,
            clock,
            scores,
            reward_service: None,
            settings: Settings::default(),
            input: TickInput::default(),
            accumulator: 0.0,
            last_frame_ms: None,
            running: false,
            stop: StopHandle::default(),
            leaderboard,
            result_recorded: false,
            last_reward: None,
        })
    }

    pub fn with_reward_service(mut self, service: Box<dyn RewardService>) -> Self {
        self.reward_service = Some(service);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    // --- Lifecycle ---

    /// Start a run from the menu, or restart after game over (or a cancel)
    pub fn start(&mut self) -> Result<()> {
        self.settle_cancel();
        let now = self.clock.now_ms();
        if let Err(e) = self.state.begin_run(&self.tuning, now) {
            log::warn!("Ignoring start: {}", e);
            return Err(e);
        }
        self.accumulator = 0.0;
        self.last_frame_ms = Some(now);
        self.running = true;
        self.stop.reset();
        self.result_recorded = false;
        self.last_reward = None;
        log::info!("Run started for {}", self.settings.player_name);
        Ok(())
    }

    /// Leave the game-over screen for the menu
    pub fn return_to_menu(&mut self) -> Result<()> {
        self.settle_cancel();
        let now = self.clock.now_ms();
        self.state.return_to_menu(now)?;
        self.running = false;
        Ok(())
    }

    pub fn resize(&mut self, width: f32, height: f32) -> Result<()> {
        let arena = Arena::new(width, height, &self.tuning)?;
        self.state.resize(arena, &self.tuning);
        log::debug!("Resized to {}x{}", width, height);
        Ok(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // --- Input ---

    pub fn set_input(&mut self, axes: InputAxes) {
        self.input.axes = axes;
    }

    pub fn set_idle_mode(&mut self, idle: bool) {
        self.input.idle_mode = idle;
    }

    // --- Per-frame ---

    /// One display frame: advance by the time since the previous frame
    pub fn frame(&mut self) -> LoopControl {
        if self.stop.is_cancelled() {
            self.settle_cancel();
            return LoopControl::Stop;
        }
        if !self.running {
            return LoopControl::Stop;
        }

        let now = self.clock.now_ms();
        let dt = self
            .last_frame_ms
            .map(|last| now.saturating_sub(last) as f32 / 1000.0)
            .unwrap_or(0.0)
            .min(MAX_FRAME_DT);
        self.last_frame_ms = Some(now);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(&mut self.state, &self.tuning, &self.input, now, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
            if !self.state.phase.is_simulating() {
                break;
            }
        }
        if substeps == MAX_SUBSTEPS {
            // Drop the backlog instead of catching up next frame
            self.accumulator = self.accumulator.min(SIM_DT);
        }

        let pending = self.state.events.len();
        if pending > MAX_PENDING_EVENTS {
            self.state.events.drain(..pending - MAX_PENDING_EVENTS);
        }

        if self.state.phase == GamePhase::GameOver {
            self.finish_run();
            self.running = false;
            return LoopControl::Stop;
        }
        LoopControl::Continue
    }

    /// A cancelled run ends through game over so it is recorded and can restart
    fn settle_cancel(&mut self) {
        if self.stop.is_cancelled() && self.running {
            log::info!("Frame loop cancelled");
            self.abort_run();
            self.running = false;
        }
    }

    fn abort_run(&mut self) {
        if !self.state.phase.is_simulating() {
            return;
        }
        let now = self.clock.now_ms();
        match self.state.transition(GamePhase::GameOver, now) {
            Ok(()) => {
                let score = self.state.score;
                self.state.events.push(GameEvent::GameOver { score });
                self.state.refresh_hud(now);
                self.finish_run();
            }
            Err(e) => log::warn!("Could not end cancelled run: {}", e),
        }
    }

    /// Record the result of a finished run. Runs at most once per run.
    fn finish_run(&mut self) {
        if self.result_recorded {
            return;
        }
        self.result_recorded = true;

        let score = self.state.score;
        let entry = ScoreEntry {
            score,
            timestamp: self.clock.timestamp_ms(),
            player_name: self.settings.player_name.clone(),
        };
        match self.scores.save_score(entry.clone()) {
            Ok(rank) => {
                self.leaderboard = self.scores.load_scores();
                match rank {
                    Some(rank) => log::info!("Score {} saved at rank {}", score, rank),
                    None => log::info!("Score {} did not make the leaderboard", score),
                }
            }
            Err(e) => {
                log::warn!("Could not save score {}: {}", score, e);
                let mut table = HighScores::new(self.tuning.leaderboard.capacity);
                table.entries = self.scores.load_scores();
                table.add(entry);
                self.leaderboard = table.entries;
            }
        }

        self.last_reward = reward_for_score(score);
        if let Some(tier) = self.last_reward {
            match self.reward_service.as_mut() {
                Some(service) => {
                    log::info!("Offering tier {} reward ({})", tier.tier, tier.amount);
                    service.offer_reward(score, tier);
                }
                None => log::debug!("No reward service; skipping tier {} reward", tier.tier),
            }
        }
    }

    // --- Read-only views ---

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn hud(&self) -> &Hud {
        &self.state.hud
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_player_name(&mut self, name: Option<&str>) {
        self.settings.set_player_name(name);
    }

    /// Final score once the run is over
    pub fn final_score(&self) -> Option<u64> {
        (self.state.phase == GamePhase::GameOver).then_some(self.state.score)
    }

    /// Reward earned by the last finished run
    pub fn reward_tier(&self) -> Option<RewardTier> {
        self.last_reward
    }

    pub fn leaderboard(&self) -> &[ScoreEntry] {
        &self.leaderboard
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot::capture(&self.state)
    }

    /// Drain events since the last call
    ///
    /// Hosts should call this every frame. Between calls at most
    /// [`MAX_PENDING_EVENTS`] are kept, oldest dropped first.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        self.state.take_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameError;
    use crate::highscores::KvScoreStore;
    use crate::persistence::{MemoryStore, ReadOnlyStore};
    use crate::platform::FakeClock;

    /// Counts how often the game reports a score; shares its log with the test
    #[derive(Clone, Default)]
    struct CountingStore {
        saved: Rc<std::cell::RefCell<Vec<ScoreEntry>>>,
    }

    impl ScoreStore for CountingStore {
        fn load_scores(&self) -> Vec<ScoreEntry> {
            self.saved.borrow().clone()
        }

        fn save_score(&mut self, entry: ScoreEntry) -> Result<Option<usize>> {
            self.saved.borrow_mut().push(entry);
            Ok(Some(self.saved.borrow().len()))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingRewards {
        offers: Rc<std::cell::RefCell<Vec<(u64, RewardTier)>>>,
    }

    impl RewardService for RecordingRewards {
        fn offer_reward(&mut self, final_score: u64, tier: RewardTier) {
            self.offers.borrow_mut().push((final_score, tier));
        }
    }

    fn new_game(clock: &FakeClock, store: Box<dyn ScoreStore>) -> Game<FakeClock> {
        Game::new(Tuning::default(), clock.clone(), store, 800.0, 600.0, 42).unwrap()
    }

    /// Step frames of `frame_ms` until the loop stops (or `max` frames)
    fn run_frames(game: &mut Game<FakeClock>, clock: &FakeClock, frame_ms: u64, max: usize) -> usize {
        for i in 0..max {
            clock.advance(frame_ms);
            if game.frame() == LoopControl::Stop {
                return i + 1;
            }
        }
        max
    }

    /// Force the run to end on the next simulated tick
    fn drain_health(game: &mut Game<FakeClock>) {
        game.state.set_health(0.0);
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let clock = FakeClock::new(0);
        let err = Game::new(
            Tuning::default(),
            clock.clone(),
            Box::new(CountingStore::default()),
            0.0,
            600.0,
            1,
        )
        .err();
        assert!(matches!(err, Some(GameError::InvalidViewport { .. })));

        let mut tuning = Tuning::default();
        tuning.physics.friction = 1.5;
        let err = Game::new(tuning, clock.clone(), Box::new(CountingStore::default()), 800.0, 600.0, 1).err();
        assert!(matches!(err, Some(GameError::InvalidTuning(_))));

        // Inverted clamp bounds are an error, not a panic inside Arena::new
        let tuning = Tuning::from_json(r#"{ "ball": { "radius_min": 50.0, "radius_max": 40.0 } }"#);
        assert!(tuning.is_err());
        let mut tuning = Tuning::default();
        tuning.ball.radius_min = 50.0;
        tuning.ball.radius_max = 40.0;
        let err = Game::new(tuning, clock, Box::new(CountingStore::default()), 800.0, 600.0, 1).err();
        assert!(matches!(err, Some(GameError::InvalidTuning(_))));
    }

    #[test]
    fn test_menu_does_not_run() {
        let clock = FakeClock::new(0);
        let mut game = new_game(&clock, Box::new(CountingStore::default()));
        assert_eq!(game.phase(), GamePhase::Menu);
        clock.advance(100);
        assert_eq!(game.frame(), LoopControl::Stop);
        assert_eq!(game.state().time_ticks, 0);
    }

    #[test]
    fn test_fixed_step_accumulator() {
        let clock = FakeClock::new(1000);
        let mut game = new_game(&clock, Box::new(CountingStore::default()));
        game.start().unwrap();

        // A long stall is capped at MAX_SUBSTEPS ticks
        clock.advance(1000);
        assert_eq!(game.frame(), LoopControl::Continue);
        assert_eq!(game.state().time_ticks, MAX_SUBSTEPS as u64);

        // 50 ms is exactly three 60 Hz steps, within rounding
        let before = game.state().time_ticks;
        clock.advance(50);
        game.frame();
        let ran = game.state().time_ticks - before;
        assert!((2..=4).contains(&ran));
    }

    #[test]
    fn test_score_saved_exactly_once() {
        let clock = FakeClock::new(0);
        let store = CountingStore::default();
        let saved = store.saved.clone();
        let mut game = new_game(&clock, Box::new(store));
        game.set_player_name(Some("  Hammy "));
        game.start().unwrap();
        assert_eq!(run_frames(&mut game, &clock, 20, 10), 10);

        game.state.score = 2600;
        drain_health(&mut game);
        clock.advance(20);
        assert_eq!(game.frame(), LoopControl::Stop);
        assert_eq!(game.final_score(), Some(2600));

        // Later frames never save again
        for _ in 0..5 {
            clock.advance(20);
            assert_eq!(game.frame(), LoopControl::Stop);
        }
        let saved = saved.borrow();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].score, 2600);
        assert_eq!(saved[0].player_name, "Hammy");
        assert_eq!(game.leaderboard().len(), 1);
        assert_eq!(game.reward_tier().map(|t| t.amount), Some(200));
    }

    #[test]
    fn test_reward_offered_when_service_present() {
        let clock = FakeClock::new(0);
        let rewards = RecordingRewards::default();
        let offers = rewards.offers.clone();
        let mut game = new_game(&clock, Box::new(CountingStore::default())).with_reward_service(Box::new(rewards));
        game.start().unwrap();
        game.state.score = 5200;
        drain_health(&mut game);
        run_frames(&mut game, &clock, 20, 5);

        let offers = offers.borrow();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].0, 5200);
        assert_eq!(offers[0].1.amount, 1000);
    }

    #[test]
    fn test_no_reward_below_threshold_or_without_service() {
        let clock = FakeClock::new(0);
        let rewards = RecordingRewards::default();
        let offers = rewards.offers.clone();
        let mut game = new_game(&clock, Box::new(CountingStore::default())).with_reward_service(Box::new(rewards));
        game.start().unwrap();
        game.state.score = 1499;
        drain_health(&mut game);
        run_frames(&mut game, &clock, 20, 5);
        assert!(offers.borrow().is_empty());
        assert_eq!(game.reward_tier(), None);

        // No service at all: the tier is still reported, nothing is offered
        let mut game = new_game(&clock, Box::new(CountingStore::default()));
        game.start().unwrap();
        game.state.score = 3600;
        drain_health(&mut game);
        run_frames(&mut game, &clock, 20, 5);
        assert_eq!(game.reward_tier().map(|t| t.amount), Some(500));
    }

    #[test]
    fn test_storage_failure_keeps_local_leaderboard() {
        let clock = FakeClock::new(0);
        let store = KvScoreStore::new(ReadOnlyStore::new(MemoryStore::new()), None);
        let mut game = new_game(&clock, Box::new(store));
        game.start().unwrap();
        game.state.score = 300;
        drain_health(&mut game);
        assert_eq!(run_frames(&mut game, &clock, 20, 5), 1);
        assert_eq!(game.leaderboard().len(), 1);
        assert_eq!(game.leaderboard()[0].score, 300);
    }

    #[test]
    fn test_leaderboard_ordered_across_runs() {
        let clock = FakeClock::new(0);
        let store = KvScoreStore::new(MemoryStore::new(), None);
        let mut game = new_game(&clock, Box::new(store));
        for score in [120, 900, 450] {
            game.start().unwrap();
            game.state.score = score;
            drain_health(&mut game);
            run_frames(&mut game, &clock, 20, 5);
        }
        let scores: Vec<u64> = game.leaderboard().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![900, 450, 120]);
    }

    #[test]
    fn test_start_while_running_is_rejected() {
        let clock = FakeClock::new(0);
        let mut game = new_game(&clock, Box::new(CountingStore::default()));
        game.start().unwrap();
        assert!(matches!(game.start(), Err(GameError::InvalidTransition { .. })));
        assert!(game.is_running());
        assert!(game.return_to_menu().is_err());
    }

    #[test]
    fn test_stop_handle_cancels_loop() {
        let clock = FakeClock::new(0);
        let mut game = new_game(&clock, Box::new(CountingStore::default()));
        game.start().unwrap();
        let handle = game.stop_handle();
        clock.advance(20);
        assert_eq!(game.frame(), LoopControl::Continue);

        handle.cancel();
        let ticks = game.state().time_ticks;
        clock.advance(20);
        assert_eq!(game.frame(), LoopControl::Stop);
        assert_eq!(game.state().time_ticks, ticks);
        assert!(!game.is_running());
    }

    #[test]
    fn test_cancel_ends_run_and_allows_restart() {
        let clock = FakeClock::new(0);
        let store = CountingStore::default();
        let saved = store.saved.clone();
        let mut game = new_game(&clock, Box::new(store));
        game.start().unwrap();
        clock.advance(20);
        assert_eq!(game.frame(), LoopControl::Continue);
        game.state.score = 80;

        game.stop_handle().cancel();
        clock.advance(20);
        assert_eq!(game.frame(), LoopControl::Stop);
        assert_eq!(game.phase(), GamePhase::GameOver);
        assert_eq!(game.final_score(), Some(80));
        assert!(game.take_events().contains(&GameEvent::GameOver { score: 80 }));

        // Further frames do not record it again
        clock.advance(20);
        assert_eq!(game.frame(), LoopControl::Stop);
        assert_eq!(saved.borrow().len(), 1);
        assert_eq!(saved.borrow()[0].score, 80);

        game.start().unwrap();
        assert_eq!(game.phase(), GamePhase::Starting);
        clock.advance(20);
        assert_eq!(game.frame(), LoopControl::Continue);
    }

    #[test]
    fn test_cancel_then_start_without_frame() {
        let clock = FakeClock::new(0);
        let mut game = new_game(&clock, Box::new(CountingStore::default()));
        game.start().unwrap();
        game.stop_handle().cancel();

        game.start().unwrap();
        assert_eq!(game.phase(), GamePhase::Starting);
        assert!(game.is_running());
        assert_eq!(game.leaderboard().len(), 1);

        // A cancelled run can also go back to the menu
        game.stop_handle().cancel();
        clock.advance(20);
        game.frame();
        game.return_to_menu().unwrap();
        assert_eq!(game.phase(), GamePhase::Menu);
    }

    #[test]
    fn test_pending_events_are_bounded() {
        let clock = FakeClock::new(0);
        let mut game = new_game(&clock, Box::new(CountingStore::default()));
        game.start().unwrap();
        for _ in 0..(MAX_PENDING_EVENTS + 100) {
            game.state.events.push(GameEvent::EnteredOil);
        }
        clock.advance(20);
        game.frame();
        let events = game.take_events();
        assert_eq!(events.len(), MAX_PENDING_EVENTS);
        assert!(game.take_events().is_empty());
    }

    #[test]
    fn test_return_to_menu_after_game_over() {
        let clock = FakeClock::new(0);
        let mut game = new_game(&clock, Box::new(CountingStore::default()));
        game.start().unwrap();
        drain_health(&mut game);
        run_frames(&mut game, &clock, 20, 5);
        assert_eq!(game.phase(), GamePhase::GameOver);

        game.return_to_menu().unwrap();
        assert_eq!(game.phase(), GamePhase::Menu);
        let events = game.take_events();
        assert!(events.contains(&GameEvent::PhaseChanged {
            from: GamePhase::GameOver,
            to: GamePhase::Menu
        }));
    }

    #[test]
    fn test_resize_rescales_ball() {
        let clock = FakeClock::new(0);
        let mut game = new_game(&clock, Box::new(CountingStore::default()));
        game.resize(300.0, 500.0).unwrap();
        assert_eq!(game.state().ball.radius, 30.0);
        assert_eq!(game.state().ball.pos, glam::Vec2::new(150.0, 250.0));
        assert!(game.resize(-1.0, 500.0).is_err());
        assert_eq!(game.snapshot().width, 300.0);
    }
}
