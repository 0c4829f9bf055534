//! # Recording Workflow
//!
//! POV demos only carry your teammates' voices. Turning on `voice_loopback`
//! puts your own voice in the demo too, at the cost of hearing yourself while
//! you talk. So the workflow turns loopback on and sets your own
//! `voice_player_volume` to 0, then echoes a breadcrumb into the demo that the
//! playback helper uses to turn you back up when the demo is watched.
//!
//! `dh rec` drives it:
//!
//! ```text
//! Idle -> Resolving -> ConflictCheck -> [Prompting] -> Committing -> AwaitingResult
//!                                                        ^               |
//!                                                        +-- RoundDelay -+
//! AwaitingResult -> Recording -> (Completed demo ...) -> Idle
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use demohelper_steam::DisplayNameProvider;
use thiserror::Error;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::RecordingConfig;
use crate::console;
use crate::cvars;
use crate::demo::{DemoIdentity, DemoNameResolver, render_name};
use crate::error::{ConsoleError, ConsoleResult};
use crate::listener::ListenerService;
use crate::protocol::{self, Decision, RecordReply};
use crate::session::ConsoleSession;
use crate::timeout::WaitKind;
use crate::voice;

pub const STARTED_MESSAGE: &str = "DemoHelper started recording demo successfully!";
pub const PREFERENCES_MESSAGE: &str =
    "DemoHelper applied recording preferences and recorded a message in demo successfully!";
pub const ALREADY_RECORDING_MESSAGE: &str = "Already recording a demo!!";
pub const FAILED_MESSAGE: &str = "Failed to start recording. Check the log file for details.";
pub const PROMPT_TIMED_OUT_MESSAGE: &str =
    "Timed out or errored out waiting for user to respond to the demo splitting prompt. Cancelling...";
pub const PROMPT_CANCELLED_MESSAGE: &str = "Cancelled the demo splitting prompt!!!";
pub const ROUND_DELAY_MESSAGE: &[&str] = &[
    "The game won't start a demo until the current round is over. DemoHelper will start recording when the next round begins.",
    "If the round is already over, use the command 'echo dh roundover' to start recording now.",
    "",
];

/// Lines pushed out before the conflict prompt so it stands out.
const PROMPT_PADDING: usize = 5;

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error(transparent)]
    Console(#[from] ConsoleError),

    /// A collaborator outside the console (the display-name lookup) failed.
    #[error("upstream lookup failed: {0:#}")]
    Upstream(anyhow::Error),
}

/// Shared "is a demo being recorded right now" bit.
///
/// Readable without awaiting, so other listeners can consult it from
/// `can_handle`.
#[derive(Debug, Clone, Default)]
pub struct RecordingFlag(Arc<AtomicBool>);

impl RecordingFlag {
    pub fn is_recording(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self, recording: bool) {
        self.0.store(recording, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingPhase {
    Idle,
    Resolving,
    ConflictCheck,
    Prompting,
    Committing,
    AwaitingResult,
    RoundDelay,
    Recording,
}

/// How one `dh rec` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingOutcome {
    Started { name: String },
    AlreadyRecording,
    Cancelled,
    PromptTimedOut,
}

pub struct RecordingWorkflow {
    resolver: DemoNameResolver,
    names: Arc<dyn DisplayNameProvider>,
    prefs: RecordingConfig,
    recording: RecordingFlag,
    phase: Mutex<RecordingPhase>,
}

impl std::fmt::Debug for RecordingWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingWorkflow")
            .field("resolver", &self.resolver)
            .field("prefs", &self.prefs)
            .field("recording", &self.recording)
            .field("phase", &self.phase())
            .finish()
    }
}

impl RecordingWorkflow {
    pub fn new(
        resolver: DemoNameResolver,
        names: Arc<dyn DisplayNameProvider>,
        prefs: RecordingConfig,
    ) -> Self {
        Self {
            resolver,
            names,
            prefs,
            recording: RecordingFlag::default(),
            phase: Mutex::new(RecordingPhase::Idle),
        }
    }

    /// Handle for listeners that must know whether a demo is being recorded.
    pub fn recording_flag(&self) -> RecordingFlag {
        self.recording.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_recording()
    }

    pub fn phase(&self) -> RecordingPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, phase: RecordingPhase) {
        let mut current = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(from = ?*current, to = ?phase, "recording phase");
        *current = phase;
    }

    /// Run one `dh rec` from name resolution to a started (or refused) demo.
    pub async fn start_recording(&self, console: &ConsoleSession) -> Result<RecordingOutcome, RecordingError> {
        self.enter(RecordingPhase::Resolving);
        let base = self.resolver.base_name(console).await?;
        console::pad(console, PROMPT_PADDING).await?;

        self.enter(RecordingPhase::ConflictCheck);
        let name = if self.resolver.exists(&base) {
            self.enter(RecordingPhase::Prompting);
            let existing = self.resolver.find_existing_numbering(&base);
            match self.prompt_new_or_split(console, &base, existing).await {
                Ok(Decision::New) => render_name(&base, existing.next_new()),
                Ok(Decision::Split) => render_name(&base, existing.next_split()),
                Ok(Decision::Cancel) => {
                    info!(base = %base, "user cancelled the demo splitting prompt");
                    console::echo(console, PROMPT_CANCELLED_MESSAGE).await?;
                    return Ok(RecordingOutcome::Cancelled);
                }
                Err(e) => {
                    warn!("Demo splitting prompt ended without an answer: {}", e);
                    console::echo(console, PROMPT_TIMED_OUT_MESSAGE).await?;
                    console::echo(console, PROMPT_CANCELLED_MESSAGE).await?;
                    return Ok(RecordingOutcome::PromptTimedOut);
                }
            }
        } else {
            base
        };

        self.commit(console, &name).await
    }

    async fn prompt_new_or_split(
        &self,
        console: &ConsoleSession,
        base: &str,
        existing: DemoIdentity,
    ) -> ConsoleResult<Decision> {
        let lines = [
            format!(
                "Demo with name '{}' already exists.",
                render_name(base, existing)
            ),
            "If you want to record a new demo, use the command 'echo dh new'.".to_string(),
            format!(
                "This will make a demo named '{}'.",
                render_name(base, existing.next_new())
            ),
            "If you're rejoining a game and want to pick up where you left off, use the command 'echo dh split'.".to_string(),
            format!(
                "This will make a demo named '{}'.",
                render_name(base, existing.next_split())
            ),
            "Use the command 'echo dh cancel' to back out of this prompt and cancel the request to record.".to_string(),
        ];
        let commands: Vec<String> = lines.iter().map(|l| protocol::echo(l)).collect();
        let commands: Vec<&str> = commands.iter().map(String::as_str).collect();

        let answer = console
            .await_pattern(&commands, Decision::pattern(), WaitKind::UserDecision)
            .await?;
        Decision::parse(&answer).ok_or(ConsoleError::ProtocolMismatch(answer))
    }

    /// Apply preferences and issue `record`, retrying after each round delay.
    ///
    /// The name is fixed by now; retries reuse it as is.
    async fn commit(&self, console: &ConsoleSession, name: &str) -> Result<RecordingOutcome, RecordingError> {
        let record = format!("record {name}");
        loop {
            self.enter(RecordingPhase::Committing);
            let (player, volume) = self.apply_preferences(console).await?;

            self.enter(RecordingPhase::AwaitingResult);
            let reply = console
                .await_pattern(&[record.as_str()], RecordReply::pattern(), WaitKind::Response)
                .await?;

            match RecordReply::parse(&reply) {
                Some(RecordReply::AlreadyRecording) => {
                    warn!(name, "the game is already recording a demo");
                    console::echo(console, ALREADY_RECORDING_MESSAGE).await?;
                    self.enter(RecordingPhase::Idle);
                    return Ok(RecordingOutcome::AlreadyRecording);
                }
                Some(RecordReply::Started { file }) => {
                    self.recording.set(true);
                    self.enter(RecordingPhase::Recording);
                    info!(demo = %file, "Recording started");
                    let breadcrumb = protocol::volume_breadcrumb(&player, volume);
                    console::echo_lines(console, &[STARTED_MESSAGE, PREFERENCES_MESSAGE, breadcrumb.as_str()])
                        .await?;
                    return Ok(RecordingOutcome::Started {
                        name: name.to_string(),
                    });
                }
                Some(RecordReply::WaitForRoundEnd) => {
                    self.enter(RecordingPhase::RoundDelay);
                    info!(name, "Recording must wait for the round to end");
                    // Listen for the boundary before telling the user to wait for it.
                    let notice: Vec<String> = ROUND_DELAY_MESSAGE.iter().map(|l| protocol::echo(l)).collect();
                    let notice: Vec<&str> = notice.iter().map(String::as_str).collect();
                    let signal = console
                        .await_pattern(&notice, protocol::round_boundary_pattern(), WaitKind::UserDecision)
                        .await?;
                    debug!(%signal, "round boundary, retrying record");
                }
                None => return Err(ConsoleError::ProtocolMismatch(reply).into()),
            }
        }
    }

    /// Voice loopback, then the local player's own volume.
    ///
    /// Returns the player's display name and the volume they were left at.
    async fn apply_preferences(&self, console: &ConsoleSession) -> Result<(String, u8), RecordingError> {
        let loopback = u8::from(self.prefs.record_my_voice_in_demos);
        cvars::set(console, cvars::VOICE_LOOPBACK, loopback).await?;

        let player = self
            .names
            .display_name()
            .await
            .map_err(RecordingError::Upstream)?;

        let volume = if self.prefs.mute_my_voice_while_recording { 0 } else { 1 };
        voice::set_by_name(console, &player, f32::from(volume)).await?;
        Ok((player, volume))
    }

    fn recording_completed(&self) {
        if self.recording.is_recording() {
            info!("Recording finished");
        }
        self.recording.set(false);
        self.enter(RecordingPhase::Idle);
    }
}

#[async_trait]
impl ListenerService for RecordingWorkflow {
    fn name(&self) -> &str {
        "RecordingWorkflow"
    }

    fn can_handle(&self, line: &str) -> bool {
        line == protocol::BEGIN_RECORDING || protocol::is_recording_completed(line)
    }

    async fn handle_line(&self, console: &ConsoleSession, line: &str) -> anyhow::Result<()> {
        if protocol::is_recording_completed(line) {
            self.recording_completed();
            return Ok(());
        }

        if self.recording.is_recording() {
            warn!("dh rec while a demo is already being recorded");
            console::echo(console, ALREADY_RECORDING_MESSAGE).await?;
            return Ok(());
        }

        let attempt = Uuid::new_v4();
        let outcome = self
            .start_recording(console)
            .instrument(info_span!("recording", %attempt))
            .await;

        match outcome {
            Ok(outcome) => {
                debug!(%attempt, ?outcome, "recording request finished");
                if !matches!(outcome, RecordingOutcome::Started { .. }) {
                    self.enter(RecordingPhase::Idle);
                }
            }
            Err(e) => {
                error!(%attempt, "Failed to start recording: {:#}", e);
                self.enter(RecordingPhase::Idle);
                console::echo(console, FAILED_MESSAGE).await?;
            }
        }
        Ok(())
    }
}
