use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;

use pro_webhook::media::{MediaPipeline, Transcoder};

use crate::helpers::{
    media_pipeline, StubTranscoder, StubTranscriber, TestApp, GIF_BYTES, TRANSCRIPT,
};

/// Remembers every input path it was handed
#[derive(Default)]
struct RecordingTranscoder {
    inputs: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Transcoder for RecordingTranscoder {
    async fn extract_gif(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        self.inputs.lock().unwrap().push(input.to_path_buf());
        StubTranscoder.extract_gif(input, output).await
    }

    async fn extract_audio(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        self.inputs.lock().unwrap().push(input.to_path_buf());
        StubTranscoder.extract_audio(input, output).await
    }
}

fn video_part() -> Part {
    Part::bytes(b"\x00\x00\x00\x18ftypmp42 fake video".to_vec())
        .file_name("clip.mp4")
        .mime_str("video/mp4")
        .unwrap()
}

#[tokio::test]
async fn convert_returns_transcript_and_gif() {
    let app = TestApp::spawn_with_media(Some(media_pipeline(false))).await;

    let form = Form::new()
        .text("note", "ignored field")
        .part("video", video_part());

    let res = app.convert(form).await.expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());

    let body: serde_json::Value = res.json().await.expect("Response was not JSON");
    assert_eq!(body["transcript"], TRANSCRIPT);

    let gif_base64 = body["gifBase64"].as_str().expect("Missing gifBase64");
    assert!(!gif_base64.is_empty());
    assert_eq!(BASE64.decode(gif_base64).unwrap(), GIF_BYTES);
}

#[tokio::test]
async fn convert_without_file_is_bad_request() {
    let app = TestApp::spawn_with_media(Some(media_pipeline(false))).await;

    let test_cases = vec![
        (
            "a file under another name",
            Form::new().part("attachment", video_part()),
        ),
        (
            "a text field named video",
            Form::new().text("video", "not a file"),
        ),
    ];

    for (desc, form) in test_cases {
        let res = app.convert(form).await.expect("Failed to execute request");

        assert_eq!(
            StatusCode::BAD_REQUEST,
            res.status(),
            "API did not reject an upload with {}",
            desc
        );
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "No file uploaded.");
    }
}

#[tokio::test]
async fn convert_pipeline_failure_is_server_error() {
    let app = TestApp::spawn_with_media(Some(media_pipeline(true))).await;

    let form = Form::new().part("video", video_part());

    let res = app.convert(form).await.expect("Failed to execute request");

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, res.status());
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Failed to process video");
}

#[tokio::test]
async fn convert_is_not_mounted_without_media() {
    let app = TestApp::spawn().await;

    let form = Form::new().part("video", video_part());

    let res = app.convert(form).await.expect("Failed to execute request");

    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[tokio::test]
async fn convert_removes_scratch_files() {
    let transcoder = Arc::new(RecordingTranscoder::default());
    let pipeline = MediaPipeline::new(
        transcoder.clone(),
        Arc::new(StubTranscriber { fail: false }),
    );
    let app = TestApp::spawn_with_media(Some(pipeline)).await;

    for _ in 0..2 {
        let form = Form::new().part("video", video_part());
        let res = app.convert(form).await.expect("Failed to execute request");
        assert_eq!(StatusCode::OK, res.status());
    }

    let inputs = transcoder.inputs.lock().unwrap().clone();
    assert_eq!(inputs.len(), 4);
    assert_ne!(inputs[0].parent(), inputs[2].parent());
    for input in inputs {
        assert!(!input.exists(), "{:?} was left behind", input);
        assert!(!input.parent().unwrap().exists());
    }
}
