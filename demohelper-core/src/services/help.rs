use async_trait::async_trait;

use crate::console;
use crate::listener::ListenerService;
use crate::protocol;
use crate::session::ConsoleSession;

/// Answers `echo dh help`.
#[derive(Debug, Default)]
pub struct HelpListener;

#[async_trait]
impl ListenerService for HelpListener {
    fn name(&self) -> &str {
        "HelpListener"
    }

    fn can_handle(&self, line: &str) -> bool {
        line == protocol::HELP
    }

    async fn handle_line(&self, console: &ConsoleSession, _line: &str) -> anyhow::Result<()> {
        console::echo_lines(console, console::HELP_MESSAGE).await?;
        Ok(())
    }
}
