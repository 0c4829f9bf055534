use async_trait::async_trait;
use tracing::info;

use crate::console;
use crate::listener::ListenerService;
use crate::protocol;
use crate::session::ConsoleSession;

/// Greets the player once the game reaches its main menu.
#[derive(Debug, Default)]
pub struct WelcomeListener;

#[async_trait]
impl ListenerService for WelcomeListener {
    fn name(&self) -> &str {
        "WelcomeListener"
    }

    fn can_handle(&self, line: &str) -> bool {
        line == protocol::STARTUP_FINISHED
    }

    async fn handle_line(&self, console: &ConsoleSession, _line: &str) -> anyhow::Result<()> {
        info!("Game reached the main menu, showing welcome message");
        console::show(console).await?;
        console::clear(console).await?;
        console::echo_lines(console, console::WELCOME_MESSAGE).await?;
        console::hide(console).await?;
        Ok(())
    }
}
