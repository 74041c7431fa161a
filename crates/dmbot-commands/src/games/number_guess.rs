//! Number-guess game state machine

use dmbot_common::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Points awarded per attempt not used
const POINTS_PER_ATTEMPT: u32 = 10;
/// Score for a first-try win
const MAX_SCORE: u32 = 100;

/// An active number-guess round.
///
/// `min <= target <= max` always holds, and `attempts <= max_attempts` until
/// the round ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberGuessGame {
    /// Number to find
    pub target: i64,
    /// Inclusive lower bound
    pub min: i64,
    /// Inclusive upper bound
    pub max: i64,
    /// Counted guesses so far
    pub attempts: u32,
    /// Guesses allowed
    pub max_attempts: u32,
    /// Round start
    pub started_at: Timestamp,
}

/// Result of one guess
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// Input was not an integer; nothing counted
    NotANumber,
    /// Integer outside the bounds; nothing counted
    OutOfRange {
        /// Lower bound
        min: i64,
        /// Upper bound
        max: i64,
    },
    /// Target is larger
    Higher {
        /// Guesses left
        remaining: u32,
    },
    /// Target is smaller
    Lower {
        /// Guesses left
        remaining: u32,
    },
    /// Target found
    Won {
        /// Guesses used, including this one
        attempts: u32,
        /// `max(0, 100 - 10 * attempts)`
        score: u32,
    },
    /// Out of guesses
    Lost {
        /// The number that was drawn
        target: i64,
    },
}

impl GuessOutcome {
    /// Whether the round is over
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Won { .. } | Self::Lost { .. })
    }

    /// Whether the game state changed and must be persisted
    pub const fn counted(&self) -> bool {
        !matches!(self, Self::NotANumber | Self::OutOfRange { .. })
    }
}

impl fmt::Display for GuessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber => f.write_str("Lütfen geçerli bir sayı gir!"),
            Self::OutOfRange { min, max } => write!(f, "Lütfen {min}-{max} arası bir sayı gir!"),
            Self::Higher { remaining } => {
                write!(f, "⬆️ Daha büyük bir sayı! Kalan deneme: {remaining}")
            }
            Self::Lower { remaining } => {
                write!(f, "⬇️ Daha küçük bir sayı! Kalan deneme: {remaining}")
            }
            Self::Won { attempts, score } => write!(
                f,
                "🎉 TEBRİKLER! {attempts} denemede bildin!\n🏆 Kazandığın puan: {score}"
            ),
            Self::Lost { target } => write!(f, "😔 Hakkın bitti! Sayı: {target}"),
        }
    }
}

impl NumberGuessGame {
    /// Draw a target uniformly from `[min, max]`
    pub fn new(min: i64, max: i64, max_attempts: u32, now: Timestamp) -> Self {
        Self::with_target(fastrand::i64(min..=max), min, max, max_attempts, now)
    }

    /// A round with a known target
    pub const fn with_target(
        target: i64,
        min: i64,
        max: i64,
        max_attempts: u32,
        now: Timestamp,
    ) -> Self {
        Self {
            target,
            min,
            max,
            attempts: 0,
            max_attempts,
            started_at: now,
        }
    }

    /// Opening prompt
    pub fn intro(&self) -> String {
        format!(
            "🎯 {} ile {} arasında bir sayı tuttum! {} deneme hakkın var.",
            self.min, self.max, self.max_attempts
        )
    }

    /// Guesses left
    pub const fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    /// Apply one guess.
    ///
    /// Malformed and out-of-range input leaves the round untouched.
    pub fn guess(&mut self, raw: &str) -> GuessOutcome {
        let Ok(value) = raw.trim().parse::<i64>() else {
            return GuessOutcome::NotANumber;
        };

        if value < self.min || value > self.max {
            return GuessOutcome::OutOfRange {
                min: self.min,
                max: self.max,
            };
        }

        self.attempts = self.attempts.saturating_add(1);

        if value == self.target {
            return GuessOutcome::Won {
                attempts: self.attempts,
                score: MAX_SCORE.saturating_sub(self.attempts.saturating_mul(POINTS_PER_ATTEMPT)),
            };
        }

        let remaining = self.remaining();
        if remaining == 0 {
            return GuessOutcome::Lost {
                target: self.target,
            };
        }

        if value < self.target {
            GuessOutcome::Higher { remaining }
        } else {
            GuessOutcome::Lower { remaining }
        }
    }
}
