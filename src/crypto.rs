mod signature;
mod webhook_key;

pub use signature::{
    SignatureError, SignatureHeader, SignatureResult, WebhookVerifier, DEFAULT_TOLERANCE_SECONDS,
    MAX_TOLERANCE_SECONDS,
};
pub use webhook_key::WebhookKey;
