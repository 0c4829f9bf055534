use std::sync::Arc;
use std::time::Duration;

use demohelper_bridge::app::{build_session, display_names, run};
use demohelper_bridge::util::panic_message;
use demohelper_core::config::SteamConfig;
use demohelper_core::{Config, DisplayNameProvider, StaticDisplayName, console, protocol};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

async fn next_line<R: tokio::io::AsyncBufRead + Unpin>(lines: &mut tokio::io::Lines<R>) -> String {
    tokio::time::timeout(Duration::from_secs(5), lines.next_line())
        .await
        .expect("nothing written")
        .unwrap()
        .expect("stream closed")
}

// ============================================================================
// Display Name Source Tests
// ============================================================================

#[tokio::test]
async fn test_configured_display_name_skips_steam() {
    let steam = SteamConfig {
        display_name: Some("The Lovely Potato".into()),
        ..SteamConfig::default()
    };
    let names = display_names(&steam).unwrap();
    assert_eq!(names.display_name().await.unwrap(), "The Lovely Potato");
}

#[test]
fn test_steam_details_required_without_display_name() {
    let err = display_names(&SteamConfig::default()).err().unwrap();
    assert!(err.to_string().contains("web_api_key"));

    let blank = SteamConfig {
        display_name: Some(String::new()),
        ..SteamConfig::default()
    };
    assert!(display_names(&blank).is_err());
}

#[test]
fn test_steam_details_build_a_provider() {
    let steam = SteamConfig {
        web_api_key: "0123456789ABCDEF".into(),
        steam_id64: "76561197960287930".into(),
        display_name: None,
    };
    assert!(display_names(&steam).is_ok());
}

// ============================================================================
// Startup Tests
// ============================================================================

#[tokio::test]
async fn test_missing_demos_folder_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.game.demos_folder = dir.path().join("csgo");
    config.steam.display_name = Some("The Lovely Potato".into());

    let err = run(config).await.unwrap_err();
    assert!(err.to_string().contains("demos folder"));
}

// ============================================================================
// Wiring Tests
// ============================================================================

#[tokio::test]
async fn test_wired_session_answers_help_and_welcome() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.game.demos_folder = dir.path().to_path_buf();

    let (ours, theirs) = tokio::io::duplex(64 * 1024);
    let (reader, writer) = tokio::io::split(ours);
    let session = build_session(
        reader,
        writer,
        &config,
        Arc::new(StaticDisplayName("The Lovely Potato".into())),
    )
    .unwrap();
    assert_eq!(session.listener_count(), 4);

    let run = {
        let session = session.clone();
        tokio::spawn(async move { session.run().await })
    };

    let (game_reader, mut game_writer) = tokio::io::split(theirs);
    let mut lines = BufReader::new(game_reader).lines();

    game_writer
        .write_all(format!("{}\n", protocol::HELP).as_bytes())
        .await
        .unwrap();
    for expected in console::HELP_MESSAGE {
        assert_eq!(next_line(&mut lines).await, protocol::echo(expected));
    }

    game_writer
        .write_all(format!("{}\n", protocol::STARTUP_FINISHED).as_bytes())
        .await
        .unwrap();
    assert_eq!(next_line(&mut lines).await, "showconsole");

    drop(lines);
    drop(game_writer);
    run.await.unwrap().unwrap();
}

// ============================================================================
// Panic Reporting Tests
// ============================================================================

#[test]
fn test_panic_message_payloads() {
    let literal = std::panic::catch_unwind(|| panic!("voice table vanished")).unwrap_err();
    assert_eq!(panic_message(literal.as_ref()), "voice table vanished");

    let formatted =
        std::panic::catch_unwind(|| panic!("player {} not found", "R.E.K.")).unwrap_err();
    assert_eq!(panic_message(formatted.as_ref()), "player R.E.K. not found");

    let opaque = std::panic::catch_unwind(|| std::panic::panic_any(7u8)).unwrap_err();
    assert_eq!(panic_message(opaque.as_ref()), "<non-string panic payload>");
}
