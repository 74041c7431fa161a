//! End-to-end tests for the responder pipeline over the real stores.

use dmbot_commands::games::{NO_ACTIVE_GUESS, NO_ACTIVE_QUIZ};
use dmbot_commands::handlers::ASK_CITY;
use dmbot_commands::{
    GateRejection, MemoryStore, OfflineProvider, Responder, SessionBackend, SledStore, UserStore,
};
use dmbot_common::test_utils::{identity_fixtures, init_test_logging};
use dmbot_common::{InboundMessage, MessageId, ThreadId, UserId};
use dmbot_config::Config;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_MESSAGE: AtomicU64 = AtomicU64::new(1);

fn message(user: u64, text: &str) -> InboundMessage {
    let id = NEXT_MESSAGE.fetch_add(1, Ordering::Relaxed);
    InboundMessage {
        message_id: MessageId(format!("m{id}")),
        thread_id: ThreadId(format!("t{user}")),
        user_id: UserId(user),
        display_name: format!("kullanıcı{user}"),
        text: text.to_string(),
    }
}

fn lenient_config() -> Config {
    let mut config = Config::default();
    config.security.max_messages_per_minute = 1000;
    config
}

async fn say(responder: &Responder, user: u64, text: &str) -> String {
    responder
        .handle(&message(user, text))
        .await
        .unwrap_or_else(|| panic!("no reply to {text:?}"))
}

async fn number_target<S: SessionBackend>(store: &S, user: u64) -> i64 {
    let record = store.fetch(UserId(user)).await.unwrap().unwrap();
    let payload: serde_json::Value = serde_json::from_str(&record.payload).unwrap();
    payload["data"]["target"].as_i64().unwrap()
}

#[tokio::test]
async fn test_number_guess_win_scores_and_clears() {
    init_test_logging();
    let store = Arc::new(MemoryStore::new());
    let responder = Responder::new(&lenient_config(), store.clone(), Arc::new(OfflineProvider));

    say(&responder, 1, "sayı tahmin").await;
    let target = number_target(store.as_ref(), 1).await;
    let miss = if target == 1 { 2 } else { 1 };

    say(&responder, 1, &miss.to_string()).await;
    say(&responder, 1, "belki").await;
    let won = say(&responder, 1, &target.to_string()).await;
    assert!(won.contains("2 denemede"), "{won}");
    assert!(won.contains("puan: 80"), "{won}");

    assert!(store.fetch(UserId(1)).await.unwrap().is_none());
    let user = store.get_user(UserId(1)).await.unwrap().unwrap();
    assert_eq!(user.game_wins, 1);

    // "tahmin oyunu" starts a fresh round.
    let fresh = say(&responder, 1, "tahmin oyunu").await;
    assert!(fresh.starts_with("🎯"));
    assert_ne!(fresh, NO_ACTIVE_GUESS);
}

#[tokio::test]
async fn test_number_guess_loses_after_max_attempts() {
    let mut config = lenient_config();
    config.games.number_guess_max_attempts = 3;
    let store = Arc::new(MemoryStore::new());
    let responder = Responder::new(&config, store.clone(), Arc::new(OfflineProvider));

    say(&responder, 2, "sayitahmin").await;
    let target = number_target(store.as_ref(), 2).await;
    let wrong = if target == 100 { 99 } else { target + 1 };

    say(&responder, 2, &wrong.to_string()).await;
    say(&responder, 2, &wrong.to_string()).await;
    let last = say(&responder, 2, &wrong.to_string()).await;
    assert_eq!(last, format!("😔 Hakkın bitti! Sayı: {target}"));
    assert!(store.fetch(UserId(2)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_quiz_clears_on_any_answer() {
    let store = Arc::new(MemoryStore::new());
    let responder = Responder::new(&lenient_config(), store.clone(), Arc::new(OfflineProvider));

    let prompt = say(&responder, 3, "bilgi yarışması").await;
    assert!(prompt.starts_with("❓ Bilgi Yarışması!"));

    let verdict = say(&responder, 3, "dört").await;
    assert!(verdict.starts_with("❌ Yanlış cevap."));
    assert!(store.fetch(UserId(3)).await.unwrap().is_none());

    // The bilgi counter did not move: the quiz won the tie-break.
    let user = store.get_user(UserId(3)).await.unwrap().unwrap();
    assert_eq!(user.bilgi_count, 0);
    assert_ne!(verdict, NO_ACTIVE_QUIZ);
}

#[tokio::test]
async fn test_session_beats_command_keywords() {
    let store = Arc::new(MemoryStore::new());
    let responder = Responder::new(&lenient_config(), store.clone(), Arc::new(OfflineProvider));

    assert_eq!(say(&responder, 4, "hava durumu").await, ASK_CITY);

    // "fıkra" is taken as the city name, not the joke command.
    let weather = say(&responder, 4, "fıkra").await;
    assert!(weather.contains("Fıkra"), "{weather}");
    assert!(weather.contains("(simüle)"));
    let user = store.get_user(UserId(4)).await.unwrap().unwrap();
    assert_eq!(user.fikra_count, 0);

    // Session consumed; the next "fıkra" is a joke.
    assert!(say(&responder, 4, "fıkra").await.starts_with("😂"));
}

#[tokio::test]
async fn test_earlier_command_wins_tie_break() {
    let responder = Responder::new(
        &lenient_config(),
        Arc::new(MemoryStore::new()),
        Arc::new(OfflineProvider),
    );

    // "hava" is declared before "haber".
    let reply = say(&responder, 5, "haber ve hava").await;
    assert_eq!(reply, ASK_CITY);
}

#[tokio::test]
async fn test_rate_limit_is_per_identity() {
    let store = Arc::new(MemoryStore::new());
    let responder = Responder::new(&Config::default(), store, Arc::new(OfflineProvider));

    let busy = identity_fixtures::test_user_id().0;
    let quiet = identity_fixtures::other_user_id().0;
    for _ in 0..10 {
        assert_ne!(
            say(&responder, busy, "zar").await,
            GateRejection::RateLimited.to_string()
        );
    }
    assert_eq!(
        say(&responder, busy, "zar").await,
        GateRejection::RateLimited.to_string()
    );
    assert!(say(&responder, quiet, "zar").await.starts_with("🎲"));
}

#[tokio::test]
async fn test_state_survives_restart_with_sled() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dmbot.db");

    let mut config = lenient_config();
    config.security.block_threshold = 1;

    {
        let store = Arc::new(SledStore::open(&path).unwrap());
        let responder = Responder::new(&config, store.clone(), Arc::new(OfflineProvider));

        say(&responder, 8, "sayı tahmin").await;
        for _ in 0..2 {
            assert_eq!(
                say(&responder, 9, "@herkes bakın").await,
                GateRejection::SpamFlagged.to_string()
            );
        }
        store.flush().await.unwrap();
    }

    let store = Arc::new(SledStore::open(&path).unwrap());
    let responder = Responder::new(&config, store.clone(), Arc::new(OfflineProvider));

    // The open round is still there after a restart.
    let reply = say(&responder, 8, "abc").await;
    assert_eq!(reply, "Lütfen geçerli bir sayı gir!");

    // So is the block.
    assert!(store.is_blocked(UserId(9)).await.unwrap());
    assert!(responder.handle(&message(9, "merhaba")).await.is_none());

    let log = store.logged_messages().unwrap();
    assert!(log.iter().any(|entry| entry.message == "sayı tahmin"));
}
