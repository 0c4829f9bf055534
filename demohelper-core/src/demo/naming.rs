//! Demo names are `<mode>-<map>-<M-D-YYYY>`, optionally followed by `-N`
//! when the same mode and map was recorded more than once that day, and by
//! `-ptN` when one game was split across several recordings.

use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use tracing::{debug, error};

use super::storage::{DemosFolder, StorageProbe};
use crate::config::NamingConfig;
use crate::cvars;
use crate::error::{ConsoleError, ConsoleResult};
use crate::protocol;
use crate::session::ConsoleSession;
use crate::timeout::WaitKind;

/// Indexed `[game_mode][game_type]`.
///
/// Scrim competitive 5v5 and 2v2 both land on "wingman".
const GAME_MODE_NAMES: [&[&str]; 3] = [
    &["casual", "armsrace", "training", "custom", "cooperative", "skirmish"],
    &["competitive", "demolition"],
    &["wingman", "deathmatch"],
];

pub const COMPETITIVE: &str = "competitive";
pub const UNKNOWN: &str = "unknown";

pub fn mode_name(game_mode: f64, game_type: f64) -> &'static str {
    let index = |v: f64| (v.fract() == 0.0 && v >= 0.0).then_some(v as usize);
    match (index(game_mode), index(game_type)) {
        (Some(mode), Some(kind)) => GAME_MODE_NAMES
            .get(mode)
            .and_then(|types| types.get(kind))
            .copied()
            .unwrap_or(UNKNOWN),
        _ => UNKNOWN,
    }
}

/// `M-D-YYYY`, no zero padding.
pub fn timestamp(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.month(), date.day(), date.year())
}

/// Drop everything up to and including the first underscore (`de_dust2` -> `dust2`).
pub fn strip_map_prefix(map: &str) -> &str {
    map.split_once('_').map_or(map, |(_, rest)| rest)
}

/// How many numbered recordings of a base name are already on disk.
///
/// `sequence` and `part` of 1 render no suffix. `(0, 0)` means nothing exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoIdentity {
    pub sequence: u32,
    pub part: u32,
}

impl DemoIdentity {
    pub const FIRST: DemoIdentity = DemoIdentity {
        sequence: 1,
        part: 1,
    };

    pub fn new(sequence: u32, part: u32) -> Self {
        Self { sequence, part }
    }

    /// A fresh game after the highest existing one.
    pub fn next_new(self) -> Self {
        Self::new(self.sequence + 1, 1)
    }

    /// Another part of the highest existing game.
    pub fn next_split(self) -> Self {
        Self::new(self.sequence.max(1), self.part + 1)
    }
}

pub fn render_name(base: &str, identity: DemoIdentity) -> String {
    let mut name = base.to_string();
    if identity.sequence > 1 {
        name.push_str(&format!("-{}", identity.sequence));
    }
    if identity.part > 1 {
        name.push_str(&format!("-pt{}", identity.part));
    }
    name
}

/// The pieces a base name is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityBase {
    pub mode: String,
    pub map: String,
    pub date: String,
}

impl IdentityBase {
    /// Competitive is the default assumption, so it is left out unless asked for.
    pub fn base_name(&self, explicitly_mark_competitive: bool) -> String {
        if self.mode == COMPETITIVE && !explicitly_mark_competitive {
            format!("{}-{}", self.map, self.date)
        } else {
            format!("{}-{}-{}", self.mode, self.map, self.date)
        }
    }
}

pub struct DemoNameResolver {
    folder: DemosFolder,
    probe: Arc<dyn StorageProbe>,
    naming: NamingConfig,
    today: Option<NaiveDate>,
}

impl std::fmt::Debug for DemoNameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemoNameResolver")
            .field("folder", &self.folder)
            .field("naming", &self.naming)
            .field("today", &self.today)
            .finish()
    }
}

impl DemoNameResolver {
    pub fn new(folder: DemosFolder, naming: NamingConfig) -> Self {
        let probe: Arc<dyn StorageProbe> = Arc::new(folder.clone());
        Self {
            folder,
            probe,
            naming,
            today: None,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn StorageProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Pin the date used in names instead of reading the local clock.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.today = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Ask the game what is being played right now.
    pub async fn current_identity_base(&self, console: &ConsoleSession) -> ConsoleResult<IdentityBase> {
        let game_mode = cvars::get(console, cvars::GAME_MODE).await?;
        let game_type = cvars::get(console, cvars::GAME_TYPE).await?;
        let mode = mode_name(game_mode, game_type);
        if mode == UNKNOWN {
            error!(game_mode, game_type, "no name for this game mode/type pair");
        }

        let map = self.current_map(console).await?;
        Ok(IdentityBase {
            mode: mode.to_string(),
            map,
            date: timestamp(self.today()),
        })
    }

    async fn current_map(&self, console: &ConsoleSession) -> ConsoleResult<String> {
        let line = console
            .await_pattern(&["status"], protocol::status_map_pattern(), WaitKind::Response)
            .await?;
        let map = protocol::parse_status_map(&line).ok_or_else(|| {
            error!("Failed to match regex when looking for map name.");
            ConsoleError::ProtocolMismatch(line.clone())
        })?;

        let map = if self.naming.attempt_hide_map_prefix {
            strip_map_prefix(map)
        } else {
            map
        };
        debug!(map, "current map");
        Ok(map.to_string())
    }

    /// The base name for whatever is being played right now.
    pub async fn base_name(&self, console: &ConsoleSession) -> ConsoleResult<String> {
        let base = self.current_identity_base(console).await?;
        Ok(base.base_name(self.naming.explicitly_mark_competitive_demos))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.probe.exists(&self.folder.demo_path(name))
    }

    /// Highest `(sequence, part)` already on disk for `base`.
    ///
    /// Counts up until a candidate is missing, then steps back one. Part
    /// numbers are searched under the sequence number found first.
    pub fn find_existing_numbering(&self, base: &str) -> DemoIdentity {
        let mut sequence = 1;
        while self.exists(&render_name(base, DemoIdentity::new(sequence, 1))) {
            sequence += 1;
        }
        sequence -= 1;

        let mut part = 1;
        while self.exists(&render_name(base, DemoIdentity::new(sequence, part))) {
            part += 1;
        }
        part -= 1;

        debug!(base, sequence, part, "existing demo numbering");
        DemoIdentity::new(sequence, part)
    }
}
