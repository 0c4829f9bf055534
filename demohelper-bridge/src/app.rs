//! Wiring: config in, listeners subscribed, session running.

use std::sync::Arc;

use anyhow::{Context, bail};
use demohelper_core::demo::{DemoNameResolver, DemosFolder};
use demohelper_core::services::{HelpListener, PlaybackHelper, RecordingWorkflow, WelcomeListener};
use demohelper_core::{Config, ConsoleSession};
use demohelper_core::config::SteamConfig;
use demohelper_io::Patience;
use demohelper_steam::{CachedDisplayName, DisplayNameProvider, StaticDisplayName, SteamProfileClient};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

/// Where the recorder's display name comes from.
///
/// A configured `display_name` skips Steam entirely. Otherwise the profile is
/// fetched once and reused for the rest of the run.
pub fn display_names(steam: &SteamConfig) -> anyhow::Result<Arc<dyn DisplayNameProvider>> {
    if let Some(name) = steam.display_name.as_deref().filter(|n| !n.is_empty()) {
        return Ok(Arc::new(StaticDisplayName(name.to_string())));
    }
    if steam.web_api_key.is_empty() || steam.steam_id64.is_empty() {
        bail!("set [steam] web_api_key and steam_id64, or display_name, in the config file");
    }
    Ok(Arc::new(CachedDisplayName::new(SteamProfileClient::new(
        &steam.web_api_key,
        &steam.steam_id64,
    ))))
}

/// Build a session over `reader`/`writer` with every listener subscribed.
///
/// Order matters: earlier listeners get first refusal on a line.
pub fn build_session<R, W>(
    reader: R,
    writer: W,
    config: &Config,
    names: Arc<dyn DisplayNameProvider>,
) -> anyhow::Result<Arc<ConsoleSession>>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let session = ConsoleSession::new(reader, writer, config.internals.timeouts());

    let resolver = DemoNameResolver::new(
        DemosFolder::new(&config.game.demos_folder),
        config.naming.clone(),
    );
    let recording = Arc::new(RecordingWorkflow::new(
        resolver,
        names,
        config.recording.clone(),
    ));
    let playback = PlaybackHelper::new(recording.recording_flag(), config.playback.clone());

    session.subscribe(Arc::new(WelcomeListener))?;
    session.subscribe(Arc::new(HelpListener))?;
    session.subscribe(recording)?;
    session.subscribe(Arc::new(playback))?;
    Ok(session)
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let demos = DemosFolder::new(&config.game.demos_folder);
    if !demos.is_present() {
        bail!(
            "demos folder '{}' does not exist; set [game] demos_folder in the config file",
            demos.root().display()
        );
    }

    let names = display_names(&config.steam)?;

    let addr = config.game.netcon_addr();
    let stream = demohelper_io::connect_when_ready(&addr, Patience::patient(config.internals.port_wait()))
        .await
        .context("could not reach the game console")?;

    let session = build_session(stream.reader, stream.writer, &config, names)?;
    info!("DemoHelper is ready. Type 'echo dh help' in the game console for commands");

    session.run().await.context("console session failed")?;
    info!("Console connection closed, exiting");
    Ok(())
}
