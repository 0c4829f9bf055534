use thiserror::Error;

/// Failures surfaced by the console session to whoever asked.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The stream is gone or refused a write. Fatal to the session.
    #[error("console transport unavailable: {0}")]
    Transport(String),

    /// No matching line arrived before the deadline.
    #[error("{label} timed out in {elapsed_ms}ms{}", user_suffix(.user_decision))]
    Timeout {
        label: String,
        elapsed_ms: u64,
        user_decision: bool,
    },

    /// A line had the shape a waiter expects but could not be parsed.
    #[error("console output did not parse: {0}")]
    ProtocolMismatch(String),

    #[error("console session is already running")]
    AlreadyRunning,

    #[error("console session is closed; build a new session to reconnect")]
    Closed,
}

fn user_suffix(user_decision: &bool) -> &'static str {
    if *user_decision {
        " while waiting for user input"
    } else {
        ""
    }
}

impl ConsoleError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConsoleError::Timeout { .. })
    }

    /// True only for deadlines that were waiting on a human.
    pub fn is_user_timeout(&self) -> bool {
        matches!(
            self,
            ConsoleError::Timeout {
                user_decision: true,
                ..
            }
        )
    }
}

impl From<std::io::Error> for ConsoleError {
    fn from(e: std::io::Error) -> Self {
        ConsoleError::Transport(e.to_string())
    }
}

pub type ConsoleResult<T> = std::result::Result<T, ConsoleError>;
