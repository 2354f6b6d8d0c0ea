mod stripe_client;
mod transcription_client;

pub use stripe_client::{Customer, StripeClient};
pub use transcription_client::TranscriptionClient;
