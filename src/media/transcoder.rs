use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context;

use async_trait::async_trait;

use tokio::process::Command;

use super::Transcoder;

/// Transcoder backed by an `ffmpeg` binary
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
    gif_duration_seconds: u32,
    gif_fps: u32,
}

impl Ffmpeg {
    pub fn new(binary: PathBuf, gif_duration_seconds: u32, gif_fps: u32) -> Self {
        Self {
            binary,
            gif_duration_seconds,
            gif_fps,
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args(["-y", "-hide_banner", "-loglevel", "error"])
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }

    async fn run(&self, mut command: Command) -> anyhow::Result<()> {
        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to spawn {}", self.binary.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg exited with {}: {}", output.status, stderr.trim());
        }
        Ok(())
    }
}

#[async_trait]
impl Transcoder for Ffmpeg {
    #[tracing::instrument(name = "Extract GIF", skip(self))]
    async fn extract_gif(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        let mut command = self.command();
        command
            .args(["-ss", "0", "-t"])
            .arg(self.gif_duration_seconds.to_string())
            .arg("-i")
            .arg(input)
            .arg("-vf")
            .arg(format!("fps={}", self.gif_fps))
            .arg(output);

        self.run(command).await
    }

    #[tracing::instrument(name = "Extract audio", skip(self))]
    async fn extract_audio(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        let mut command = self.command();
        command
            .arg("-i")
            .arg(input)
            .args(["-vn", "-acodec", "libmp3lame"])
            .arg(output);

        self.run(command).await
    }
}
