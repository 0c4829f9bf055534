//! The persistent listeners DemoHelper subscribes at startup.

pub mod help;
pub mod playback;
pub mod recording;
pub mod welcome;

pub use help::HelpListener;
pub use playback::PlaybackHelper;
pub use recording::{RecordingError, RecordingFlag, RecordingOutcome, RecordingPhase, RecordingWorkflow};
pub use welcome::WelcomeListener;
