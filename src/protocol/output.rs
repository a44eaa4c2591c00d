use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::devices::DeviceDescriptor;

pub const DEVICE_LIST_START: &str = "list_audio_devices_start";
pub const DEVICE_LIST_END: &str = "list_audio_devices_end";

/// Caller-observable output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    RecordingStarted,
    RecordingPaused,
    RecordingResumed,
    Finishing,
    RecordingCompleted,
    RecordingFailed(String),
    AudioDevices(Vec<DeviceDescriptor>),
    Rejected(String),
    /// Elapsed recording time, rewritten in place with a carriage return
    Progress(Duration),
}

impl Output {
    pub fn is_progress(&self) -> bool {
        matches!(self, Self::Progress(_))
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecordingStarted => f.write_str("Recording started"),
            Self::RecordingPaused => f.write_str("Recording paused"),
            Self::RecordingResumed => f.write_str("Recording resumed"),
            Self::Finishing => f.write_str("Finishing encoding"),
            Self::RecordingCompleted => f.write_str("Recording completed"),
            Self::RecordingFailed(error) => write!(f, "Recording failed with: {}", error),
            Self::AudioDevices(devices) => {
                f.write_str(DEVICE_LIST_START)?;
                f.write_str("{")?;
                for (i, device) in devices.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", json_string(&device.id), json_string(&device.name))?;
                }
                f.write_str("}")?;
                f.write_str(DEVICE_LIST_END)
            }
            Self::Rejected(reason) => write!(f, "Command rejected: {}", reason),
            Self::Progress(elapsed) => write!(
                f,
                "\rElapsed: {}s:{}ms",
                elapsed.as_secs(),
                elapsed.subsec_millis()
            ),
        }
    }
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

pub type OutputSender = mpsc::UnboundedSender<Output>;
pub type OutputReceiver = mpsc::UnboundedReceiver<Output>;

pub fn channel() -> (OutputSender, OutputReceiver) {
    mpsc::unbounded_channel()
}

/// Drain `rx` into `writer` until every sender is gone
///
/// Progress is written without a newline; the next status line starts on a
/// fresh line.
pub async fn write_outputs<W>(mut rx: OutputReceiver, mut writer: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut mid_line = false;

    while let Some(output) = rx.recv().await {
        if output.is_progress() {
            writer.write_all(output.to_string().as_bytes()).await?;
            mid_line = true;
        } else {
            if mid_line {
                writer.write_all(b"\n").await?;
                mid_line = false;
            }
            writer.write_all(format!("{}\n", output).as_bytes()).await?;
        }
        writer.flush().await?;
    }

    if mid_line {
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}
