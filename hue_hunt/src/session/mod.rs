// THEORY:
// A `Session` is the application state the detection loop feeds. It is a plain
// value: the loop owns it while running and returns it on exit, and a host can
// inspect or mutate it between runs. There are no shared handles and no
// interior mutability.
//
// Two kinds of input reach it:
// - "color observed": debounced, then appended to the history
// - "challenge completed": scores points and rotates the target, but only while
//   the game is enabled
//
// Clearing the history is the "start over" action: it also forgets the last
// color and zeroes the score. The challenge target is left alone.

pub mod challenge;
pub mod history;

use crate::config::{ConfigError, DetectionConfig};
use crate::core_modules::color_model::{BucketName, RgbColor};
use crate::driver::DetectionEvent;
use challenge::ChallengeState;
use chrono::Utc;
use history::{ColorHistory, Debouncer, HistorySummary};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Instant;
use tracing::{debug, info};

pub const DEFAULT_CHALLENGE_POINTS: u32 = 10;

#[derive(Debug, Clone)]
pub struct Session {
    history: ColorHistory,
    debouncer: Debouncer,
    challenge: ChallengeState,
    score: u32,
    challenge_points: u32,
    gamification_enabled: bool,
    last_detected: Option<BucketName>,
    rng: StdRng,
}

impl Session {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// A session whose challenge rotation is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            history: ColorHistory::new(),
            debouncer: Debouncer::default(),
            challenge: ChallengeState::standard(),
            score: 0,
            challenge_points: DEFAULT_CHALLENGE_POINTS,
            gamification_enabled: true,
            last_detected: None,
            rng,
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Result<Self, ConfigError> {
        let session = Self::new();
        session.configured(config)
    }

    /// Applies the game settings of `config` to this session.
    pub fn configured(mut self, config: &DetectionConfig) -> Result<Self, ConfigError> {
        let palette = config.palette()?;
        let names = palette.names();
        let start = if names.contains(&BucketName::Blue) {
            BucketName::Blue
        } else {
            names.first().copied().unwrap_or(BucketName::Blue)
        };
        self.challenge = ChallengeState::new(start, names);
        self.debouncer = Debouncer::new(config.debounce_window());
        self.challenge_points = config.challenge_points;
        self.gamification_enabled = config.gamification_enabled;
        Ok(self)
    }

    /// Records an observation unless the debouncer suppresses it.
    pub fn observe_color(&mut self, color: RgbColor, name: BucketName, now: Instant) -> bool {
        if !self.debouncer.accept(name, now) {
            return false;
        }
        self.last_detected = Some(name);
        self.history.push(color, name, Utc::now());
        debug!(color = %color, name = %name, total = self.history.len(), "color recorded");
        true
    }

    /// The bucket the player is asked to find, or `None` when the game is off.
    pub fn active_challenge(&self) -> Option<BucketName> {
        self.gamification_enabled.then(|| self.challenge.target())
    }

    pub fn challenge_prompt(&self) -> Option<String> {
        self.gamification_enabled.then(|| self.challenge.prompt())
    }

    /// Scores the current challenge and picks the next target.
    ///
    /// Returns the new target, or `None` if the game is disabled.
    pub fn complete_challenge(&mut self) -> Option<BucketName> {
        if !self.gamification_enabled {
            return None;
        }
        let completed = self.challenge.target();
        self.score += self.challenge_points;
        let next = self.challenge.advance(&mut self.rng);
        info!(completed = %completed, next = %next, score = self.score, "challenge completed");
        Some(next)
    }

    /// Applies one event from the detection loop. Returns true if it changed
    /// the session.
    pub fn handle_event(&mut self, event: &DetectionEvent, now: Instant) -> bool {
        match *event {
            DetectionEvent::ColorObserved { display_color, bucket } => self.observe_color(display_color, bucket, now),
            DetectionEvent::ChallengeCompleted { bucket } => {
                if self.gamification_enabled && self.challenge.is_completed_by(bucket) {
                    self.complete_challenge().is_some()
                } else {
                    false
                }
            }
        }
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.last_detected = None;
        self.score = 0;
    }

    pub fn toggle_gamification(&mut self) -> bool {
        self.gamification_enabled = !self.gamification_enabled;
        self.gamification_enabled
    }

    pub fn gamification_enabled(&self) -> bool {
        self.gamification_enabled
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn history(&self) -> &ColorHistory {
        &self.history
    }

    pub fn last_detected(&self) -> Option<BucketName> {
        self.last_detected
    }

    pub fn summary(&self) -> HistorySummary {
        self.history.summary()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const BLUE: RgbColor = RgbColor::new(0x00, 0x66, 0xFF);
    const GREEN: RgbColor = RgbColor::new(0x00, 0xFF, 0x00);

    #[test]
    fn fresh_session() {
        let session = Session::with_seed(3);
        assert_eq!(session.score(), 0);
        assert_eq!(session.active_challenge(), Some(BucketName::Blue));
        assert_eq!(session.challenge_prompt().as_deref(), Some("Find something BLUE"));
        assert!(session.history().is_empty());
        assert_eq!(session.last_detected(), None);
    }

    #[test]
    fn repeated_color_is_recorded_once_per_window() {
        let start = Instant::now();
        let mut session = Session::with_seed(3);
        assert!(session.observe_color(GREEN, BucketName::Green, start));
        assert!(!session.observe_color(GREEN, BucketName::Green, start + Duration::from_millis(16)));
        assert!(session.observe_color(BLUE, BucketName::Blue, start + Duration::from_millis(32)));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.last_detected(), Some(BucketName::Blue));
        assert_eq!(session.history().entries()[0].color, GREEN);
    }

    #[test]
    fn completing_a_challenge_scores_and_rotates() {
        let mut session = Session::with_seed(11);
        let next = session.complete_challenge().unwrap();
        assert_ne!(next, BucketName::Blue);
        assert_eq!(session.score(), 10);
        assert_eq!(session.active_challenge(), Some(next));
    }

    #[test]
    fn completion_events_must_match_the_target() {
        let now = Instant::now();
        let mut session = Session::with_seed(5);
        let wrong = DetectionEvent::ChallengeCompleted {
            bucket: BucketName::Pink,
        };
        assert!(!session.handle_event(&wrong, now));
        assert_eq!(session.score(), 0);

        let right = DetectionEvent::ChallengeCompleted {
            bucket: BucketName::Blue,
        };
        assert!(session.handle_event(&right, now));
        assert_eq!(session.score(), 10);
    }

    #[test]
    fn disabled_game_ignores_challenges() {
        let mut session = Session::with_seed(5);
        assert!(!session.toggle_gamification());
        assert_eq!(session.active_challenge(), None);
        assert_eq!(session.challenge_prompt(), None);
        assert_eq!(session.complete_challenge(), None);
        let matching = DetectionEvent::ChallengeCompleted {
            bucket: BucketName::Blue,
        };
        assert!(!session.handle_event(&matching, Instant::now()));
        assert_eq!(session.score(), 0);

        assert!(session.toggle_gamification());
        assert_eq!(session.active_challenge(), Some(BucketName::Blue));
    }

    #[test]
    fn clearing_resets_history_and_score() {
        let now = Instant::now();
        let mut session = Session::with_seed(9);
        session.observe_color(GREEN, BucketName::Green, now);
        let target = session.complete_challenge().unwrap();
        session.clear_history();

        assert!(session.history().is_empty());
        assert_eq!(session.last_detected(), None);
        assert_eq!(session.score(), 0);
        assert_eq!(session.active_challenge(), Some(target));
    }

    #[test]
    fn config_sets_the_game_rules() {
        let config = DetectionConfig {
            challenge_points: 25,
            gamification_enabled: false,
            debounce_window_ms: 0,
            ..DetectionConfig::default()
        };
        let mut session = Session::from_config(&config).unwrap();
        assert_eq!(session.active_challenge(), None);
        session.toggle_gamification();
        session.complete_challenge();
        assert_eq!(session.score(), 25);

        let now = Instant::now();
        assert!(session.observe_color(GREEN, BucketName::Green, now));
        assert!(session.observe_color(GREEN, BucketName::Green, now));
    }
}
