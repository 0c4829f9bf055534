//! Console variables.
//!
//! Setting a cvar is `<name> <value>`. Reading one is just `<name>`; the game
//! answers with `"<name>" = "<value>" ( def. "0" ) ...`.

use std::fmt::Display;

use tracing::debug;

use crate::error::ConsoleResult;
use crate::session::ConsoleSession;

pub const GAME_MODE: &str = "game_mode";
pub const GAME_TYPE: &str = "game_type";
pub const VOICE_LOOPBACK: &str = "voice_loopback";

pub async fn get(console: &ConsoleSession, name: &str) -> ConsoleResult<f64> {
    debug!("Retrieving value of cvar '{}'...", name);
    let value = console.request_named_value(name).await?;
    debug!(cvar = name, value, "cvar read");
    Ok(value)
}

pub async fn set(console: &ConsoleSession, name: &str, value: impl Display) -> ConsoleResult<()> {
    let value = value.to_string();
    console.send(&format!("{name} {value}")).await?;
    debug!("Set value of cvar '{}' to '{}'.", name, value);
    Ok(())
}
