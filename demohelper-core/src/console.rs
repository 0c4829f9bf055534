//! Small console conveniences: echoing text back to the player and toggling
//! the console window.

use crate::error::ConsoleResult;
use crate::protocol;
use crate::session::ConsoleSession;

pub const WELCOME_MESSAGE: &[&str] = &[
    "Welcome to DemoHelper!",
    "Type 'echo dh help' for available commands.",
    "",
    "",
    "",
];

pub const HELP_MESSAGE: &[&str] = &[
    "Type 'echo dh rec' to record a new POV demo.",
    "Type 'echo dh roundover' to start a delayed recording without waiting for the round to end.",
    "",
    "",
    "",
];

/// Print each line into the console, in order, as one batch.
pub async fn echo_lines(console: &ConsoleSession, lines: &[&str]) -> ConsoleResult<()> {
    let commands: Vec<String> = lines.iter().map(|line| protocol::echo(line)).collect();
    let refs: Vec<&str> = commands.iter().map(String::as_str).collect();
    console.send_all(&refs).await
}

pub async fn echo(console: &ConsoleSession, line: &str) -> ConsoleResult<()> {
    console.send(&protocol::echo(line)).await
}

/// Push `lines` blank lines so the next message stands out.
pub async fn pad(console: &ConsoleSession, lines: usize) -> ConsoleResult<()> {
    let blanks = vec!["echo"; lines];
    console.send_all(&blanks).await
}

pub async fn clear(console: &ConsoleSession) -> ConsoleResult<()> {
    console.send("clear").await
}

pub async fn show(console: &ConsoleSession) -> ConsoleResult<()> {
    console.send("showconsole").await
}

pub async fn hide(console: &ConsoleSession) -> ConsoleResult<()> {
    console.send("hideconsole").await
}
