//! Integration tests for the dmbot binary crate: console transport, poll loop
//! and responder wired together.

use dmbot_bot::{Args, ConsoleTransport, Poller, PollerSettings};
use dmbot_commands::{MemoryStore, OfflineProvider, Responder, SledStore, UserStore};
use dmbot_common::test_utils::{create_temp_dir, init_test_logging};
use dmbot_common::UserId;
use dmbot_config::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{duplex, AsyncReadExt};

async fn run_console<S>(config: &Config, store: Arc<S>, input: &'static [u8]) -> String
where
    S: UserStore + dmbot_commands::SessionBackend + 'static,
{
    let responder = Arc::new(Responder::new(config, store, Arc::new(OfflineProvider)));
    let (writer, mut reader) = duplex(64 * 1024);
    let transport = Arc::new(ConsoleTransport::new(input, writer, UserId(1), "konsol"));

    let mut poller = Poller::new(transport, responder, PollerSettings::from_config(&config.bot));
    tokio::time::timeout(Duration::from_secs(10), poller.run(std::future::pending()))
        .await
        .expect("console session finished")
        .unwrap();
    drop(poller);

    let mut output = String::new();
    reader.read_to_string(&mut output).await.unwrap();
    output
}

#[tokio::test]
async fn test_console_conversation() {
    init_test_logging();
    let store = Arc::new(MemoryStore::new());
    let output = run_console(
        &Config::default(),
        store.clone(),
        b"selam\nsayi\nsay\xc4\xb1 tahmin\nabc\n\n",
    )
    .await;

    assert!(output.contains("'yardım'"), "{output}");
    assert!(output.contains("🎯"));
    assert!(output.contains("Lütfen geçerli bir sayı gir!"));

    let user = store.get_user(UserId(1)).await.unwrap().unwrap();
    assert_eq!(user.username, "konsol");
    // The blank line is admitted but gets no reply.
    assert_eq!(user.message_count, 5);
}

#[tokio::test]
async fn test_console_state_persists_in_sled() {
    let dir = create_temp_dir();
    let path = dir.path().join("db");
    let config = Config::default();

    {
        let store = Arc::new(SledStore::open(&path).unwrap());
        run_console(&config, store.clone(), b"fikra\nf\xc4\xb1kra\n").await;
        store.flush().await.unwrap();
    }

    let store = Arc::new(SledStore::open(&path).unwrap());
    let output = run_console(&config, store.clone(), b"istatistik\n").await;
    assert!(output.contains("Toplam Mesaj: 3"), "{output}");

    let user = store.get_user(UserId(1)).await.unwrap().unwrap();
    assert_eq!(user.fikra_count, 1);
}

#[test]
fn test_cli_defaults() {
    use clap::Parser;
    let args = Args::try_parse_from(["dmbot"]).unwrap();
    assert!(!args.ephemeral);
    assert!(!args.offline);
    assert!(args.log_level.is_none());
}
