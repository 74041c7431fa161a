//! Session-or-command routing
//!
//! A live session always owns the turn. Without one, small talk is tried,
//! then the command table in declaration order, then a canned fallback.

use crate::content::{self, SmallTalk};
use crate::games::{self, GameEngine};
use crate::handlers::{self, BotStats, ASK_CITY};
use crate::providers::DataProvider;
use crate::registry::{CommandEntry, CommandKind, CommandRegistry};
use crate::session::{SessionState, SessionStore};
use crate::store::{StatField, UserStore};
use chrono::Utc;
use dmbot_common::utils::contains_word;
use dmbot_common::{Result, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Words that end any open session instead of being routed to it
pub const CANCEL_WORDS: &[&str] = &["iptal", "vazgeç", "vazgeçtim"];
/// Confirms an explicit cancellation
pub const SESSION_CANCELLED: &str = "❎ İptal edildi. Yeni bir şey denemek için 'yardım' yaz.";

/// Routes one normalized message to a reply
#[derive(Clone)]
pub struct Dispatcher {
    registry: CommandRegistry,
    sessions: SessionStore,
    users: Arc<dyn UserStore>,
    games: GameEngine,
    provider: Arc<dyn DataProvider>,
    stats: Arc<BotStats>,
    city_prompt_ttl: Duration,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("city_prompt_ttl", &self.city_prompt_ttl)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Wire a dispatcher over shared collaborators
    pub fn new(
        sessions: SessionStore,
        users: Arc<dyn UserStore>,
        games: GameEngine,
        provider: Arc<dyn DataProvider>,
        stats: Arc<BotStats>,
        city_prompt_ttl: Duration,
    ) -> Self {
        Self {
            registry: CommandRegistry::new(),
            sessions,
            users,
            games,
            provider,
            stats,
            city_prompt_ttl,
        }
    }

    /// Produce the reply for `text`, already trimmed and lowercased.
    ///
    /// `Ok(None)` means nothing should be sent.
    pub async fn dispatch(&self, user_id: UserId, text: &str) -> Result<Option<String>> {
        if text.is_empty() {
            return Ok(None);
        }

        if let Some(session) = self.sessions.get(user_id).await? {
            if CANCEL_WORDS.iter().any(|word| contains_word(text, word)) {
                debug!(user_id = %user_id, tag = %session.tag(), "Session cancelled");
                self.sessions.clear(user_id).await?;
                return Ok(Some(SESSION_CANCELLED.to_string()));
            }

            debug!(user_id = %user_id, tag = %session.tag(), "Routing to session");
            return match session.state {
                SessionState::AwaitingCity => {
                    self.sessions.clear(user_id).await?;
                    Ok(Some(self.weather_for(text).await))
                }
                SessionState::Game(_) => self.games.continue_game(user_id, session, text).await,
            };
        }

        if let Some(talk) = SmallTalk::detect(text) {
            debug!(user_id = %user_id, ?talk, "Small talk");
            return Ok(Some(talk.reply()));
        }

        match self.registry.find(text) {
            Some(command) => {
                debug!(user_id = %user_id, command = command.name, "Command matched");
                self.execute(user_id, command, text).await.map(Some)
            }
            None => Ok(Some(content::unknown_reply())),
        }
    }

    async fn execute(&self, user_id: UserId, command: &CommandEntry, text: &str) -> Result<String> {
        let reply = match command.kind {
            CommandKind::Help => self.registry.help_text(),
            CommandKind::NumberGuess => self.games.start_number_guess(user_id).await?,
            CommandKind::Quiz => self.games.start_quiz(user_id).await?,
            CommandKind::RockPaperScissors => games::rock_paper_scissors(text),
            CommandKind::Dice => games::roll_die(),
            CommandKind::Coin => games::flip_coin(),
            CommandKind::Weather => match handlers::extract_city(text) {
                Some(city) => self.weather_for(&city).await,
                None => {
                    self.sessions
                        .set(user_id, SessionState::AwaitingCity, self.city_prompt_ttl)
                        .await?;
                    ASK_CITY.to_string()
                }
            },
            CommandKind::Joke => {
                self.users
                    .increment_stat(user_id, StatField::FikraCount)
                    .await?;
                content::joke()
            }
            CommandKind::Fact => {
                self.users
                    .increment_stat(user_id, StatField::BilgiCount)
                    .await?;
                content::fact()
            }
            CommandKind::Quote => content::quote(),
            CommandKind::Food => content::food(),
            CommandKind::News => handlers::news_reply(&self.provider.news().await),
            CommandKind::GamesMenu => games::games_menu(),
            CommandKind::Time => handlers::time_reply(Utc::now()),
            CommandKind::Exchange => match self.provider.exchange_rates().await {
                Some(rates) => handlers::exchange_reply(&rates, false, Utc::now()),
                None => handlers::exchange_reply(&handlers::simulated_rates(), true, Utc::now()),
            },
            CommandKind::Stats => {
                let record = self.users.get_user(user_id).await?;
                handlers::stats_reply(user_id, record.as_ref())
            }
            CommandKind::BotInfo => {
                let user_count = self.users.user_count().await?;
                self.stats.info_reply(user_count, Utc::now())
            }
        };
        Ok(reply)
    }

    async fn weather_for(&self, city: &str) -> String {
        match self.provider.weather(city).await {
            Some(report) => handlers::weather_reply(city, &report),
            None => handlers::simulated_weather_reply(city),
        }
    }
}
