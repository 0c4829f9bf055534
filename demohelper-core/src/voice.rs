//! Per-player voice volume through `voice_player_volume`.
//!
//! Without arguments the command prints a table:
//!
//! ```text
//! Player#     Player Name    Volume
//! -------     -----------    ------
//!   4   The Lovely Potato      1.00
//! -------     -----------    ------
//! Use voice_player_volume player# volume -- to set the player's volume to the given amount
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{ConsoleError, ConsoleResult};
use crate::listener::ListenerService;
use crate::protocol::{self, VoicePlayer};
use crate::session::ConsoleSession;
use crate::timeout::WaitKind;

pub const VOICE_PLAYER_VOLUME: &str = "voice_player_volume";

/// Read the whole table.
pub async fn list(console: &ConsoleSession) -> ConsoleResult<Vec<VoicePlayer>> {
    let (reply, table) = oneshot::channel();
    let collector = Arc::new(VoiceTableCollector::new(reply));
    let id = console.subscribe(collector)?;

    let result = async {
        console.send(VOICE_PLAYER_VOLUME).await?;
        console
            .timeouts()
            .guard(
                async { table.await.map_err(|_| ConsoleError::Closed) },
                "Reading the voice_player_volume table",
                WaitKind::Response,
            )
            .await
    }
    .await;

    console.unsubscribe(id);
    result
}

pub async fn set(console: &ConsoleSession, player_number: u32, volume: f32) -> ConsoleResult<()> {
    console
        .send(&format!("{VOICE_PLAYER_VOLUME} {player_number} {volume}"))
        .await
}

/// Set the volume of the player with exactly this name.
///
/// Returns `false` (and logs) when nobody by that name is in the table.
pub async fn set_by_name(console: &ConsoleSession, player_name: &str, volume: f32) -> ConsoleResult<bool> {
    let players = list(console).await?;
    match players.iter().find(|p| p.name == player_name) {
        Some(player) => {
            set(console, player.number, volume).await?;
            debug!(player = player_name, number = player.number, volume, "voice volume set");
            Ok(true)
        }
        None => {
            warn!(
                "Couldn't find player with name '{}' when attempting to set voice volume.",
                player_name
            );
            Ok(false)
        }
    }
}

#[derive(Default)]
struct TableProgress {
    reading: bool,
    players: Vec<VoicePlayer>,
}

/// Temporary listener that collects the rows between the two padding lines.
struct VoiceTableCollector {
    progress: Mutex<TableProgress>,
    reply: Mutex<Option<oneshot::Sender<Vec<VoicePlayer>>>>,
}

impl VoiceTableCollector {
    fn new(reply: oneshot::Sender<Vec<VoicePlayer>>) -> Self {
        Self {
            progress: Mutex::new(TableProgress::default()),
            reply: Mutex::new(Some(reply)),
        }
    }

    fn finish(&self, players: Vec<VoicePlayer>) {
        let reply = self
            .reply
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(reply) = reply {
            let _ = reply.send(players);
        }
    }
}

#[async_trait]
impl ListenerService for VoiceTableCollector {
    fn name(&self) -> &str {
        "VoicePlayerVolumeListener"
    }

    fn can_handle(&self, line: &str) -> bool {
        protocol::is_table_padding(line) || protocol::parse_voice_row(line).is_some()
    }

    async fn handle_line(&self, _console: &ConsoleSession, line: &str) -> anyhow::Result<()> {
        let done = {
            let mut progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
            if !progress.reading {
                // Rows seen before the header padding belong to something else.
                progress.reading = protocol::is_table_padding(line);
                None
            } else if let Some(player) = protocol::parse_voice_row(line) {
                progress.players.push(player);
                None
            } else {
                progress.reading = false;
                Some(std::mem::take(&mut progress.players))
            }
        };

        if let Some(players) = done {
            debug!(count = players.len(), "voice_player_volume table read");
            self.finish(players);
        }
        Ok(())
    }
}
