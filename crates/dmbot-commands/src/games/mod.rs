//! Interactive and casual games
//!
//! Number-guess and quiz rounds keep their progress in the session row;
//! [`GameEngine`] reads it, applies one turn and writes it back.

pub mod casual;
pub mod number_guess;
pub mod quiz;

pub use casual::{flip_coin, play, rock_paper_scissors, roll_die, Duel, Hand};
pub use number_guess::{GuessOutcome, NumberGuessGame};
pub use quiz::{QuizGame, QuizQuestion, QuizVerdict};

use crate::session::{Session, SessionState, SessionStore};
use crate::store::{StatField, UserStore};
use chrono::Utc;
use dmbot_common::{Result, UserId};
use dmbot_config::GamesConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Reply when a guess arrives without a number-guess round
pub const NO_ACTIVE_GUESS: &str = "Aktif bir tahmin oyunun yok.";
/// Reply when an answer arrives without an open quiz
pub const NO_ACTIVE_QUIZ: &str = "Aktif bir quiz oyunun yok.";

/// Payload of a game session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameRecord {
    /// Number-guess round
    NumberGuess(NumberGuessGame),
    /// Quiz question
    Quiz(QuizGame),
}

/// Runs game turns against the session store
#[derive(Clone)]
pub struct GameEngine {
    sessions: SessionStore,
    users: Arc<dyn UserStore>,
    config: GamesConfig,
}

impl std::fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GameEngine {
    /// Create an engine
    pub fn new(sessions: SessionStore, users: Arc<dyn UserStore>, config: GamesConfig) -> Self {
        Self {
            sessions,
            users,
            config,
        }
    }

    /// Start a number-guess round, replacing any session
    pub async fn start_number_guess(&self, user_id: UserId) -> Result<String> {
        let game = NumberGuessGame::new(
            self.config.number_guess_min,
            self.config.number_guess_max,
            self.config.number_guess_max_attempts,
            Utc::now(),
        );
        let intro = game.intro();
        self.sessions
            .set(
                user_id,
                SessionState::Game(GameRecord::NumberGuess(game)),
                Duration::from_secs(self.config.number_guess_ttl_secs),
            )
            .await?;
        info!(user_id = %user_id, "Number-guess round started");
        Ok(intro)
    }

    /// Take one guess from the stored round
    pub async fn guess_number(&self, user_id: UserId, text: &str) -> Result<String> {
        match self.sessions.get(user_id).await? {
            Some(session) if matches!(session.state, SessionState::Game(GameRecord::NumberGuess(_))) => {
                let reply = self.continue_game(user_id, session, text).await?;
                Ok(reply.unwrap_or_else(|| NO_ACTIVE_GUESS.to_string()))
            }
            _ => Ok(NO_ACTIVE_GUESS.to_string()),
        }
    }

    /// Start a quiz, replacing any session
    pub async fn start_quiz(&self, user_id: UserId) -> Result<String> {
        let game = QuizGame::new(Utc::now());
        let prompt = game.prompt();
        self.sessions
            .set(
                user_id,
                SessionState::Game(GameRecord::Quiz(game)),
                Duration::from_secs(self.config.quiz_ttl_secs),
            )
            .await?;
        info!(user_id = %user_id, "Quiz started");
        Ok(prompt)
    }

    /// Answer the stored quiz
    pub async fn answer_quiz(&self, user_id: UserId, text: &str) -> Result<String> {
        let session = self.sessions.get(user_id).await?;
        match session.map(|s| s.state) {
            Some(SessionState::Game(GameRecord::Quiz(game))) => {
                self.finish_quiz(user_id, &game, text).await
            }
            _ => Ok(NO_ACTIVE_QUIZ.to_string()),
        }
    }

    /// Route a turn to the game held in `session`.
    ///
    /// Returns `None` when the session holds no game.
    pub async fn continue_game(
        &self,
        user_id: UserId,
        session: Session,
        text: &str,
    ) -> Result<Option<String>> {
        let Session { state, expires_at } = session;
        match state {
            SessionState::Game(GameRecord::NumberGuess(mut game)) => {
                let outcome = game.guess(text);
                debug!(user_id = %user_id, ?outcome, attempts = game.attempts, "Number-guess turn");

                if outcome.is_terminal() {
                    self.sessions.clear(user_id).await?;
                    if matches!(outcome, GuessOutcome::Won { .. }) {
                        self.users
                            .increment_stat(user_id, StatField::GameWins)
                            .await?;
                    }
                } else if outcome.counted() {
                    let updated = Session {
                        state: SessionState::Game(GameRecord::NumberGuess(game)),
                        expires_at,
                    };
                    self.sessions.save(user_id, &updated).await?;
                }
                Ok(Some(outcome.to_string()))
            }
            SessionState::Game(GameRecord::Quiz(game)) => {
                self.finish_quiz(user_id, &game, text).await.map(Some)
            }
            SessionState::AwaitingCity => Ok(None),
        }
    }

    async fn finish_quiz(&self, user_id: UserId, game: &QuizGame, text: &str) -> Result<String> {
        let verdict = game.judge(text);
        self.sessions.clear(user_id).await?;
        if verdict == QuizVerdict::Correct {
            self.users
                .increment_stat(user_id, StatField::GameWins)
                .await?;
        }
        debug!(user_id = %user_id, ?verdict, "Quiz answered");
        Ok(verdict.message())
    }
}

/// Games menu
pub fn games_menu() -> String {
    [
        "🎮 OYUN MENÜSÜ 🎮",
        "",
        "1. 🎯 Sayı Tahmin Oyunu - 'sayı tahmin'",
        "2. 🪨📄✂️ Taş Kağıt Makas - 'tkm [seçimin]'",
        "3. ❓ Bilgi Yarışması - 'bilgi yarışması'",
        "4. 🎲 Zar At - 'zar at'",
        "5. 🪙 Yazı Tura - 'yazı tura'",
        "",
        "💡 Örnek: 'sayı tahmin' veya 'tkm taş'",
    ]
    .join("\n")
}
