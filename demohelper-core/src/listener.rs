use async_trait::async_trait;

use crate::session::ConsoleSession;

/// A persistent feature that watches console output.
///
/// `can_handle` runs inline on the read loop for every unclaimed line, so it
/// must be cheap and must not touch the console. `handle_line` runs on the
/// listener's own task and may issue commands and wait for their replies.
#[async_trait]
pub trait ListenerService: Send + Sync {
    fn name(&self) -> &str;

    fn can_handle(&self, line: &str) -> bool;

    async fn handle_line(&self, console: &ConsoleSession, line: &str) -> anyhow::Result<()>;
}
