//! # DemoHelper Steam
//!
//! Who is recording. The display name ends up in the console breadcrumb that
//! the playback side reads back, so it must match what `voice_player_volume`
//! prints for the local player.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::OnceCell;

pub const STEAM_API_BASE: &str = "https://api.steampowered.com";

/// Source of the local player's current display name.
#[async_trait]
pub trait DisplayNameProvider: Send + Sync {
    async fn display_name(&self) -> Result<String>;
}

/// A fixed name, for users who would rather not set up a Web API key.
#[derive(Debug, Clone)]
pub struct StaticDisplayName(pub String);

#[async_trait]
impl DisplayNameProvider for StaticDisplayName {
    async fn display_name(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Looks the name up through `ISteamUser/GetPlayerSummaries/v0002`.
pub struct SteamProfileClient {
    http: Client,
    base_url: String,
    api_key: String,
    steam_id64: String,
}

impl std::fmt::Debug for SteamProfileClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the key.
        f.debug_struct("SteamProfileClient")
            .field("base_url", &self.base_url)
            .field("steam_id64", &self.steam_id64)
            .finish()
    }
}

impl SteamProfileClient {
    pub fn new(api_key: &str, steam_id64: &str) -> Self {
        Self::with_base_url(STEAM_API_BASE, api_key, steam_id64)
    }

    pub fn with_base_url(base_url: &str, api_key: &str, steam_id64: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            steam_id64: steam_id64.to_string(),
        }
    }

    fn summaries_url(&self) -> String {
        format!(
            "{}/ISteamUser/GetPlayerSummaries/v0002/?key={}&steamids={}",
            self.base_url, self.api_key, self.steam_id64
        )
    }
}

#[async_trait]
impl DisplayNameProvider for SteamProfileClient {
    async fn display_name(&self) -> Result<String> {
        let resp = self
            .http
            .get(self.summaries_url())
            .send()
            .await
            .context("Failed to contact the Steam Web API")?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Steam Web API returned {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            ));
        }

        let parsed: Value = serde_json::from_str(&text)?;
        let name = persona_name(&parsed)?;
        tracing::debug!(steam_id64 = %self.steam_id64, name, "resolved display name");
        Ok(name.to_string())
    }
}

/// `response.players[0].personaname` of a GetPlayerSummaries reply.
pub fn persona_name(summaries: &Value) -> Result<&str> {
    summaries["response"]["players"][0]["personaname"]
        .as_str()
        .context("Steam returned no player for this SteamID64; check steam_id64 and web_api_key")
}

/// Remembers the first successful answer of another provider.
///
/// A display name rarely changes mid-session and every recording asks for it.
pub struct CachedDisplayName<P> {
    inner: P,
    cached: OnceCell<String>,
}

impl<P> CachedDisplayName<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cached: OnceCell::new(),
        }
    }
}

#[async_trait]
impl<P: DisplayNameProvider> DisplayNameProvider for CachedDisplayName<P> {
    async fn display_name(&self) -> Result<String> {
        self.cached
            .get_or_try_init(|| self.inner.display_name())
            .await
            .cloned()
    }
}
