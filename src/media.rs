use std::path::Path;

use async_trait::async_trait;

mod pipeline;
mod transcoder;

pub use pipeline::{Conversion, MediaPipeline, PipelineError};
pub use transcoder::Ffmpeg;

/// Video transcoding into the derived artifacts
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Write a short looping GIF cut from the start of `input`
    async fn extract_gif(&self, input: &Path, output: &Path) -> anyhow::Result<()>;
    /// Write the audio track of `input` as MP3
    async fn extract_audio(&self, input: &Path, output: &Path) -> anyhow::Result<()>;
}

/// Speech-to-text for an audio file
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> anyhow::Result<String>;
}
