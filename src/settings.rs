use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use config::{Config, Environment, File};

use secrecy::Secret;

use serde::Deserialize;
use serde_aux::prelude::*;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use url::Url;

use crate::crypto::{DEFAULT_TOLERANCE_SECONDS, MAX_TOLERANCE_SECONDS};

/// Runtime environment, either `Dev` for local development, or `Prod` for release
#[derive(Debug)]
pub enum Runtime {
    Dev,
    Prod,
}

impl Runtime {
    pub fn as_str(&self) -> &str {
        match self {
            Runtime::Dev => "dev",
            Runtime::Prod => "prod",
        }
    }
}

impl TryFrom<String> for Runtime {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => anyhow::bail!("{} is not a valid runtime environment", other),
        }
    }
}

/// Conventional unprefixed variables and the settings keys they override
const PLAIN_ENV_OVERRIDES: &[(&str, &str)] = &[
    ("PORT", "app.port"),
    ("DATABASE_URL", "database.url"),
    ("STRIPE_SECRET_KEY", "stripe.secret_key"),
    ("STRIPE_WEBHOOK_SECRET", "stripe.webhook_secret"),
    ("OPENAI_API_KEY", "media.transcription.api_key"),
];

/// Application settings wrapper
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: ApplicationSettings,
    pub database: DatabaseSettings,
    pub stripe: StripeSettings,
    /// The video conversion route is only mounted when this section is present
    #[serde(default)]
    pub media: Option<MediaSettings>,
}

impl Settings {
    /// Load application settings from the settings directory
    pub fn load() -> anyhow::Result<Self> {
        // Get the path to the settings directory
        let path = env::current_dir()?.join("settings");
        // Get the current environment based on the `APP_ENV` environment variable, default to `Dev`
        let runtime: Runtime = env::var("APP_ENV")
            .unwrap_or_else(|_| "dev".into())
            .try_into()?;

        Self::load_from(runtime, &path)
    }
    /// Load application settings from a specified path and runtime
    pub fn load_from(runtime: Runtime, base_path: &Path) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            // Include the base settings
            .add_source(File::from(base_path.join("base")).required(true))
            // Include the runtime settings
            .add_source(File::from(base_path.join(runtime.as_str())).required(true))
            // Override/include any settings from environment variables
            // NOTE: Should be used for any prod secrets. Takes the form `APP_<settings category>__<setting name>`.
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__"),
            );

        for (var, key) in PLAIN_ENV_OVERRIDES {
            builder = builder.set_override_option(*key, env::var(var).ok())?;
        }

        let settings: Self = builder
            .build()?
            .try_deserialize()
            .context("Failed to load/deserialize settings")?;
        settings.stripe.validate()?;

        Ok(settings)
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
}

impl ApplicationSettings {
    /// The application address to bind to
    pub fn addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// Full connection URL; takes precedence over the individual fields
    #[serde(default)]
    url: Option<Secret<String>>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,
    host: String,
    name: String,
    username: String,
    password: Secret<String>,
    require_ssl: bool,
}

impl DatabaseSettings {
    /// The database connection options, without specifying the database name
    pub fn without_db(&self) -> PgConnectOptions {
        use secrecy::ExposeSecret;

        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .port(self.port)
            .host(&self.host)
            .ssl_mode(ssl_mode)
            .username(&self.username)
            .password(self.password.expose_secret())
    }
    /// The database connection options, with the database name
    pub fn with_db(&self) -> anyhow::Result<PgConnectOptions> {
        use secrecy::ExposeSecret;

        match &self.url {
            Some(url) => PgConnectOptions::from_str(url.expose_secret())
                .context("Failed to parse database URL"),
            None => Ok(self.without_db().database(&self.name)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeSettings {
    api_base_url: String,
    secret_key: Secret<String>,
    webhook_secret: Secret<String>,
    #[serde(
        default = "default_tolerance_seconds",
        deserialize_with = "deserialize_number_from_string"
    )]
    signature_tolerance_seconds: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    api_timeout_milliseconds: u64,
}

fn default_tolerance_seconds() -> u32 {
    DEFAULT_TOLERANCE_SECONDS as u32
}

impl StripeSettings {
    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            i64::from(self.signature_tolerance_seconds) <= MAX_TOLERANCE_SECONDS,
            "stripe.signature_tolerance_seconds must be at most {}, got {}",
            MAX_TOLERANCE_SECONDS,
            self.signature_tolerance_seconds
        );
        Ok(())
    }
    /// The base URL for the Stripe REST API
    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.api_base_url).context("Failed to parse Stripe API base URL")
    }
    /// The secret API key used to call Stripe
    pub fn secret_key(&self) -> Secret<String> {
        self.secret_key.clone()
    }
    /// The signing secret of the webhook endpoint
    pub fn webhook_secret(&self) -> &Secret<String> {
        &self.webhook_secret
    }
    /// Maximum age of a signed webhook; zero disables the check
    pub fn signature_tolerance(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.signature_tolerance_seconds))
    }
    /// The Stripe REST API timeout duration
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_milliseconds)
    }
}

#[derive(Debug, Deserialize)]
pub struct MediaSettings {
    #[serde(default = "default_ffmpeg_path")]
    ffmpeg_path: PathBuf,
    #[serde(
        default = "default_gif_duration_seconds",
        deserialize_with = "deserialize_number_from_string"
    )]
    gif_duration_seconds: u32,
    #[serde(
        default = "default_gif_fps",
        deserialize_with = "deserialize_number_from_string"
    )]
    gif_fps: u32,
    pub transcription: TranscriptionSettings,
}

fn default_ffmpeg_path() -> PathBuf {
    "ffmpeg".into()
}

fn default_gif_duration_seconds() -> u32 {
    5
}

fn default_gif_fps() -> u32 {
    10
}

impl MediaSettings {
    /// Path or name of the `ffmpeg` executable
    pub fn ffmpeg_path(&self) -> PathBuf {
        self.ffmpeg_path.clone()
    }
    /// Length of the GIF cut from the start of the video
    pub fn gif_duration_seconds(&self) -> u32 {
        self.gif_duration_seconds
    }
    /// GIF frame rate
    pub fn gif_fps(&self) -> u32 {
        self.gif_fps
    }
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionSettings {
    #[serde(default = "default_transcription_base_url")]
    api_base_url: String,
    api_key: Secret<String>,
    #[serde(default = "default_transcription_model")]
    model: String,
    #[serde(
        default = "default_transcription_timeout",
        deserialize_with = "deserialize_number_from_string"
    )]
    api_timeout_milliseconds: u64,
}

fn default_transcription_base_url() -> String {
    "https://api.openai.com".into()
}

fn default_transcription_model() -> String {
    "whisper-1".into()
}

fn default_transcription_timeout() -> u64 {
    120_000
}

impl TranscriptionSettings {
    /// The base URL for the transcription REST API
    pub fn api_base_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.api_base_url).context("Failed to parse transcription API base URL")
    }
    pub fn api_key(&self) -> Secret<String> {
        self.api_key.clone()
    }
    pub fn model(&self) -> String {
        self.model.clone()
    }
    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_milliseconds)
    }
}
