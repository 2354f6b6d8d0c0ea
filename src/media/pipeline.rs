use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use super::{Transcoder, Transcriber};

const GIF_FILE_NAME: &str = "clip.gif";
const AUDIO_FILE_NAME: &str = "audio.mp3";

/// Turns an uploaded video into a looping GIF plus a transcript of its audio
#[derive(Clone)]
pub struct MediaPipeline {
    transcoder: Arc<dyn Transcoder>,
    transcriber: Arc<dyn Transcriber>,
}

/// Output of a successful conversion
#[derive(Debug)]
pub struct Conversion {
    pub transcript: String,
    pub gif: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("GIF conversion failed: {0}")]
    GifConversion(anyhow::Error),

    #[error("Audio extraction failed: {0}")]
    AudioExtraction(anyhow::Error),

    #[error("Transcription failed: {0}")]
    Transcription(anyhow::Error),

    #[error("Failed to read converted output")]
    Io(#[from] std::io::Error),
}

impl MediaPipeline {
    pub fn new(transcoder: Arc<dyn Transcoder>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            transcoder,
            transcriber,
        }
    }

    /// Convert `video`, writing intermediate files into `work_dir`
    #[tracing::instrument(name = "Convert video", skip(self))]
    pub async fn convert(&self, video: &Path, work_dir: &Path) -> Result<Conversion, PipelineError> {
        let gif_path = work_dir.join(GIF_FILE_NAME);
        let audio_path = work_dir.join(AUDIO_FILE_NAME);

        self.transcoder
            .extract_gif(video, &gif_path)
            .await
            .map_err(PipelineError::GifConversion)?;
        tracing::info!("GIF created");

        self.transcoder
            .extract_audio(video, &audio_path)
            .await
            .map_err(PipelineError::AudioExtraction)?;
        tracing::info!("Audio extracted");

        let transcript = self
            .transcriber
            .transcribe(&audio_path)
            .await
            .map_err(PipelineError::Transcription)?;
        tracing::info!("Transcription received");

        let gif = tokio::fs::read(&gif_path).await?;

        Ok(Conversion { transcript, gif })
    }
}
