use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::PlaybackError;

/// Playback that has been accepted by the sink.
///
/// `begin` returns once the player is running; `finish` drives it to the end.
pub enum Playback {
    Process { child: Child, audio: Vec<u8> },
    Done,
}

impl Playback {
    pub async fn finish(self) -> Result<(), PlaybackError> {
        match self {
            Playback::Done => Ok(()),
            Playback::Process { mut child, audio } => {
                if let Some(mut stdin) = child.stdin.take() {
                    stdin.write_all(&audio).await?;
                    stdin.shutdown().await?;
                }
                let status = child.wait().await?;
                if status.success() {
                    Ok(())
                } else {
                    Err(PlaybackError::ExitStatus(status))
                }
            }
        }
    }
}

/// Local audio output for synthesized speech.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn begin(&self, audio: Vec<u8>) -> Result<Playback, PlaybackError>;
}

/// Pipes audio into an external player process.
#[derive(Debug, Clone)]
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// `None` when the command line is empty.
    pub fn from_command_line(parts: &[String]) -> Option<Self> {
        let (program, args) = parts.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self::new(program.clone(), args.to_vec()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl AudioSink for CommandSink {
    async fn begin(&self, audio: Vec<u8>) -> Result<Playback, PlaybackError> {
        debug!(program = %self.program, bytes = audio.len(), "spawning audio player");
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PlaybackError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        Ok(Playback::Process { child, audio })
    }
}

/// Used when no player is configured. Speech requests still reach the
/// backend but end in a playback failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl AudioSink for NullSink {
    async fn begin(&self, audio: Vec<u8>) -> Result<Playback, PlaybackError> {
        warn!(bytes = audio.len(), "audio dropped: no player configured");
        Err(PlaybackError::NoPlayer)
    }
}
