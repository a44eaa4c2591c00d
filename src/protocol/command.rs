use std::fmt;
use std::str::FromStr;

use crate::error::{ControlError, ControlResult};
use crate::options::RegionBounds;

/// Field delimiter of the control protocol; there is no escaping
pub const DELIMITER: char = ':';

/// Command vocabulary, matched case-sensitively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    SetOptions,
    Start,
    Stop,
    Pause,
    Resume,
    ListAudioDevices,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetOptions => "set_options",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::ListAudioDevices => "list_audio_devices",
        }
    }

    /// Number of fields expected after the kind
    pub fn arity(&self) -> usize {
        match self {
            Self::SetOptions => 7,
            Self::Start => 3,
            Self::Stop | Self::Pause | Self::Resume | Self::ListAudioDevices => 0,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set_options" => Ok(Self::SetOptions),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "pause" => Ok(Self::Pause),
            "resume" => Ok(Self::Resume),
            "list_audio_devices" => Ok(Self::ListAudioDevices),
            other => Err(ControlError::malformed(
                "kind",
                format!("unknown command `{}`", other),
            )),
        }
    }
}

/// Audio and display overrides shared by `start` and `set_options`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSelection {
    pub audio_disabled: bool,
    /// `None` when the field was empty
    pub display_name: Option<String>,
    pub audio_input_device: Option<String>,
}

/// One parsed control line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetOptions {
        region: RegionBounds,
        sources: SourceSelection,
    },
    Start {
        sources: SourceSelection,
    },
    Stop,
    Pause,
    Resume,
    ListAudioDevices,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::SetOptions { .. } => CommandKind::SetOptions,
            Self::Start { .. } => CommandKind::Start,
            Self::Stop => CommandKind::Stop,
            Self::Pause => CommandKind::Pause,
            Self::Resume => CommandKind::Resume,
            Self::ListAudioDevices => CommandKind::ListAudioDevices,
        }
    }
}

/// Parse a single control line
///
/// Trailing line terminators are ignored. Returns `Ok(None)` for a blank line.
pub fn parse_line(line: &str) -> ControlResult<Option<Command>> {
    let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
    if line.trim().is_empty() {
        return Ok(None);
    }

    let mut parts = line.split(DELIMITER);
    let kind: CommandKind = parts.next().unwrap_or_default().parse()?;
    let fields: Vec<&str> = parts.collect();

    if fields.len() != kind.arity() {
        return Err(ControlError::malformed(
            "arity",
            format!(
                "`{}` expects {} fields, got {}",
                kind,
                kind.arity(),
                fields.len()
            ),
        ));
    }

    let command = match kind {
        CommandKind::SetOptions => Command::SetOptions {
            region: RegionBounds::new(
                parse_int("top", fields[0])?,
                parse_int("bottom", fields[1])?,
                parse_int("left", fields[2])?,
                parse_int("right", fields[3])?,
            ),
            sources: parse_sources(&fields[4..])?,
        },
        CommandKind::Start => Command::Start {
            sources: parse_sources(&fields)?,
        },
        CommandKind::Stop => Command::Stop,
        CommandKind::Pause => Command::Pause,
        CommandKind::Resume => Command::Resume,
        CommandKind::ListAudioDevices => Command::ListAudioDevices,
    };

    Ok(Some(command))
}

// audio_disabled, display_name, audio_input_device
fn parse_sources(fields: &[&str]) -> ControlResult<SourceSelection> {
    Ok(SourceSelection {
        audio_disabled: parse_bool("audio_disabled", fields[0])?,
        display_name: optional(fields[1]),
        audio_input_device: optional(fields[2]),
    })
}

fn parse_int(field: &str, value: &str) -> ControlResult<i32> {
    value
        .trim()
        .parse()
        .map_err(|_| ControlError::malformed(field, format!("`{}` is not an integer", value)))
}

/// Protocol booleans are the literal tokens `True` and `False`
fn parse_bool(field: &str, value: &str) -> ControlResult<bool> {
    match value {
        "True" => Ok(true),
        "False" => Ok(false),
        other => Err(ControlError::malformed(
            field,
            format!("`{}` is not `True` or `False`", other),
        )),
    }
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
