// THEORY:
// The challenge game asks the player to find one bucket at a time. A challenge
// is complete the moment a frame's dominant detection has the target's name;
// the next target is then drawn uniformly from the other buckets, so the same
// color is never asked twice in a row.
//
// The prompt shown to the player is "Find something <NAME>". Hosts that only
// keep the prompt string can recover the target with `parse_prompt`.

use crate::core_modules::color_model::BucketName;
use rand::Rng;
use rand::seq::SliceRandom;

pub const CHALLENGE_PREFIX: &str = "Find something ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeState {
    target: BucketName,
    candidates: Vec<BucketName>,
}

impl ChallengeState {
    /// A challenge over `candidates`, starting at `target`.
    pub fn new(target: BucketName, candidates: Vec<BucketName>) -> Self {
        Self { target, candidates }
    }

    /// The default game: all five buckets, starting with BLUE.
    pub fn standard() -> Self {
        Self::new(BucketName::Blue, BucketName::ALL.to_vec())
    }

    pub fn target(&self) -> BucketName {
        self.target
    }

    pub fn prompt(&self) -> String {
        format!("{CHALLENGE_PREFIX}{}", self.target)
    }

    pub fn parse_prompt(prompt: &str) -> Option<BucketName> {
        prompt.strip_prefix(CHALLENGE_PREFIX)?.trim().parse().ok()
    }

    pub fn is_completed_by(&self, dominant: BucketName) -> bool {
        dominant == self.target
    }

    /// Moves to a random bucket other than the current target.
    ///
    /// With a single candidate there is nothing else to pick and the target
    /// stays put.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> BucketName {
        let remaining: Vec<BucketName> = self
            .candidates
            .iter()
            .copied()
            .filter(|name| *name != self.target)
            .collect();
        if let Some(next) = remaining.choose(rng) {
            self.target = *next;
        }
        self.target
    }
}

impl Default for ChallengeState {
    fn default() -> Self {
        Self::standard()
    }
}
