//! Undo the recorder's self-mute when their demo is played back.
//!
//! The recording side leaves `DemoHelper set the volume of player <name> to 0.`
//! in the demo. When that line replays during playback the player's own voice
//! is muted again, so it is turned back up here.

use async_trait::async_trait;
use tracing::{debug, info};

use super::recording::RecordingFlag;
use crate::config::PlaybackConfig;
use crate::listener::ListenerService;
use crate::protocol;
use crate::session::ConsoleSession;
use crate::timeout::WaitKind;
use crate::voice;

pub const DEMO_INFO: &str = "demo_info";

#[derive(Debug)]
pub struct PlaybackHelper {
    recording: RecordingFlag,
    prefs: PlaybackConfig,
}

impl PlaybackHelper {
    pub fn new(recording: RecordingFlag, prefs: PlaybackConfig) -> Self {
        Self { recording, prefs }
    }
}

#[async_trait]
impl ListenerService for PlaybackHelper {
    fn name(&self) -> &str {
        "PlaybackHelper"
    }

    fn can_handle(&self, line: &str) -> bool {
        // While recording, that line is our own breadcrumb going out.
        !self.recording.is_recording() && protocol::parse_muted_breadcrumb(line).is_some()
    }

    async fn handle_line(&self, console: &ConsoleSession, line: &str) -> anyhow::Result<()> {
        let Some(player) = protocol::parse_muted_breadcrumb(line) else {
            return Ok(());
        };

        let reply = console
            .await_pattern(&[DEMO_INFO], protocol::demo_info_pattern(), WaitKind::Response)
            .await?;

        let Some(demo) = protocol::parse_demo_info(&reply) else {
            debug!(player, "muted breadcrumb seen outside of demo playback");
            return Ok(());
        };

        if self.prefs.playback_voice_player_volume {
            if voice::set_by_name(console, player, 1.0).await? {
                info!(demo, player, "Restored voice volume for demo playback");
            }
        } else {
            info!(
                demo,
                player,
                "Found a line indicating DemoHelper muted a player, but playback_voice_player_volume is off"
            );
        }
        Ok(())
    }
}
