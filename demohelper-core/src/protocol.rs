//! The handful of console output shapes this tool understands.
//!
//! None of this is a general grammar for the console. Each function matches
//! exactly one reply shape and pulls out the part a caller needs.

use std::sync::OnceLock;

use regex::Regex;

/// Typed into the console as `echo dh rec`; the echo comes back as this line.
pub const BEGIN_RECORDING: &str = "dh rec";
pub const HELP: &str = "dh help";
pub const ROUND_OVER: &str = "dh roundover";
pub const STARTUP_FINISHED: &str =
    "ChangeGameUIState: CSGO_GAME_UI_STATE_INTROMOVIE -> CSGO_GAME_UI_STATE_MAINMENU";
pub const NOT_PLAYING_DEMO: &str = "Error - Not currently playing back a demo.";

static CVAR_ECHO: OnceLock<Regex> = OnceLock::new();
static STATUS_MAP: OnceLock<Regex> = OnceLock::new();
static RECORD_REPLY: OnceLock<Regex> = OnceLock::new();
static DECISION: OnceLock<Regex> = OnceLock::new();
static ROUND_BOUNDARY: OnceLock<Regex> = OnceLock::new();
static RECORDING_COMPLETED: OnceLock<Regex> = OnceLock::new();
static MUTED_BREADCRUMB: OnceLock<Regex> = OnceLock::new();
static DEMO_INFO: OnceLock<Regex> = OnceLock::new();
static VOICE_ROW: OnceLock<Regex> = OnceLock::new();
static PADDING: OnceLock<Regex> = OnceLock::new();

fn cvar_echo() -> &'static Regex {
    CVAR_ECHO.get_or_init(|| {
        Regex::new(r#"^"([A-Za-z0-9_]+)" = "([^"]*)""#).expect("Invalid cvar echo regex")
    })
}

/// Result of testing a line against the variable echo shape
/// `"<name>" = "<value>" ( def. "0" ) ...`.
#[derive(Debug, Clone, PartialEq)]
pub enum CvarEcho {
    NotAnEcho,
    Value { name: String, value: f64 },
    /// Looked like an echo but the value is not numeric.
    Malformed { name: String, raw: String },
}

pub fn parse_cvar_echo(line: &str) -> CvarEcho {
    let Some(caps) = cvar_echo().captures(line) else {
        return CvarEcho::NotAnEcho;
    };
    let name = caps[1].to_string();
    let raw = caps[2].trim();
    match raw.parse::<f64>() {
        Ok(value) => CvarEcho::Value { name, value },
        Err(_) => CvarEcho::Malformed {
            name,
            raw: raw.to_string(),
        },
    }
}

/// Matches the `map     : de_dust2 ...` line of a `status` report.
pub fn status_map_pattern() -> &'static Regex {
    STATUS_MAP
        .get_or_init(|| Regex::new(r"^map\s+: (\S+)").expect("Invalid status map regex"))
}

pub fn parse_status_map(line: &str) -> Option<&str> {
    status_map_pattern()
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// The three replies the game gives to `record <name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordReply {
    AlreadyRecording,
    Started { file: String },
    WaitForRoundEnd,
}

impl RecordReply {
    pub fn pattern() -> &'static Regex {
        RECORD_REPLY.get_or_init(|| {
            Regex::new(
                r"^(?:(Already recording\.)|Recording to (.*)\.dem\.\.\.|(Please start demo recording after current round is over\.))$",
            )
            .expect("Invalid record reply regex")
        })
    }

    pub fn parse(line: &str) -> Option<Self> {
        let caps = Self::pattern().captures(line)?;
        if caps.get(1).is_some() {
            Some(RecordReply::AlreadyRecording)
        } else if let Some(file) = caps.get(2) {
            Some(RecordReply::Started {
                file: file.as_str().to_string(),
            })
        } else if caps.get(3).is_some() {
            Some(RecordReply::WaitForRoundEnd)
        } else {
            None
        }
    }
}

/// What the user typed in answer to the naming-conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    New,
    Split,
    Cancel,
}

impl Decision {
    pub fn pattern() -> &'static Regex {
        DECISION.get_or_init(|| {
            Regex::new(r"^dh (new|split|cancel)$").expect("Invalid decision regex")
        })
    }

    pub fn parse(line: &str) -> Option<Self> {
        let caps = Self::pattern().captures(line)?;
        match &caps[1] {
            "new" => Some(Decision::New),
            "split" => Some(Decision::Split),
            "cancel" => Some(Decision::Cancel),
            _ => None,
        }
    }
}

/// Either the manual override or the engine's round reset line.
pub fn round_boundary_pattern() -> &'static Regex {
    ROUND_BOUNDARY.get_or_init(|| {
        Regex::new(r"^(?:dh roundover|Resetting player states for new round\.?)$")
            .expect("Invalid round boundary regex")
    })
}

pub fn is_recording_completed(line: &str) -> bool {
    RECORDING_COMPLETED
        .get_or_init(|| {
            Regex::new(r"^Completed demo, recording time \d+\.\d+, game frames \d+\.$")
                .expect("Invalid completed demo regex")
        })
        .is_match(line)
}

fn muted_breadcrumb() -> &'static Regex {
    MUTED_BREADCRUMB.get_or_init(|| {
        Regex::new(r"^DemoHelper set the volume of player (.*) to 0\.$")
            .expect("Invalid breadcrumb regex")
    })
}

/// The line left in a demo when the recorder muted themselves.
pub fn volume_breadcrumb(player: &str, volume: u8) -> String {
    format!("DemoHelper set the volume of player {player} to {volume}.")
}

/// Player name from a muted breadcrumb, if the line is one.
pub fn parse_muted_breadcrumb(line: &str) -> Option<&str> {
    muted_breadcrumb()
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn demo_info_pattern() -> &'static Regex {
    DEMO_INFO.get_or_init(|| {
        Regex::new(r"^(?:Error - Not currently playing back a demo\.|Demo contents for (.*)\.dem:)$")
            .expect("Invalid demo info regex")
    })
}

/// Name of the demo being played back, or `None` when nothing is playing.
pub fn parse_demo_info(line: &str) -> Option<&str> {
    demo_info_pattern()
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// One row of the `voice_player_volume` table.
#[derive(Debug, Clone, PartialEq)]
pub struct VoicePlayer {
    pub number: u32,
    pub name: String,
    pub volume: f32,
}

pub fn parse_voice_row(line: &str) -> Option<VoicePlayer> {
    let caps = VOICE_ROW
        .get_or_init(|| {
            Regex::new(r"^\s*(\d+) +(.*?) +(\d\.\d{2})\s*$").expect("Invalid voice row regex")
        })
        .captures(line)?;
    Some(VoicePlayer {
        number: caps[1].parse().ok()?,
        name: caps[2].trim().to_string(),
        volume: caps[3].parse().ok()?,
    })
}

/// `-------     -----------    ------`
pub fn is_table_padding(line: &str) -> bool {
    let dashes = PADDING.get_or_init(|| Regex::new(r"^-{2,}$").expect("Invalid padding regex"));
    let mut cells = line.split_whitespace().peekable();
    cells.peek().is_some() && cells.all(|cell| dashes.is_match(cell))
}

/// Wrap text so the console prints it back verbatim.
pub fn echo(text: &str) -> String {
    if text.is_empty() {
        "echo".to_string()
    } else {
        format!("echo \"{}\"", text.replace('"', "'"))
    }
}
