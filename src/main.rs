use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use sqlx::PgPool;

use pro_webhook::app;
use pro_webhook::client::{StripeClient, TranscriptionClient};
use pro_webhook::crypto::{WebhookKey, WebhookVerifier};
use pro_webhook::media::{Ffmpeg, MediaPipeline};
use pro_webhook::settings::{MediaSettings, Settings};
use pro_webhook::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = telemetry::create_subscriber("info".into(), std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let settings = Settings::load().context("Failed to load settings")?;

    let pool = PgPool::connect_with(settings.database.with_db()?)
        .await
        .context("Failed to connect to database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let verifier = WebhookVerifier::new(
        WebhookKey::new(settings.stripe.webhook_secret())?,
        settings.stripe.signature_tolerance(),
    );

    let stripe_client = StripeClient::new(
        settings.stripe.api_timeout(),
        settings.stripe.api_base_url()?,
        settings.stripe.secret_key(),
    )?;

    let media = settings.media.as_ref().map(build_media_pipeline).transpose()?;

    let listener = TcpListener::bind(settings.app.addr())?;
    tracing::info!(
        addr = ?listener.local_addr()?,
        media = media.is_some(),
        "Server listening"
    );

    app::run(
        listener,
        verifier,
        Arc::new(stripe_client),
        Arc::new(pool),
        media,
    )?
    .await
    .context("Failed to run app")
}

fn build_media_pipeline(settings: &MediaSettings) -> anyhow::Result<MediaPipeline> {
    let transcoder = Ffmpeg::new(
        settings.ffmpeg_path(),
        settings.gif_duration_seconds(),
        settings.gif_fps(),
    );

    let transcription = &settings.transcription;
    let transcriber = TranscriptionClient::new(
        transcription.api_timeout(),
        transcription.api_base_url()?,
        transcription.api_key(),
        transcription.model(),
    )?;

    Ok(MediaPipeline::new(Arc::new(transcoder), Arc::new(transcriber)))
}
