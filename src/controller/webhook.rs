use actix_web::dev::HttpServiceFactory;
use actix_web::http::StatusCode;
use actix_web::{post, web, HttpRequest, HttpResponse, Responder, ResponseError};

use thiserror::Error;

use crate::crypto::WebhookVerifier;
use crate::webhook::{
    self, CustomerDirectory, HandlingError, SubscriptionStore, VerificationError, WebhookOutcome,
};

/// Header carrying the timestamped payload signatures
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Webhook receiver endpoint
/// NOTE: The body is taken as raw bytes, since signatures cover the exact payload
#[tracing::instrument(
    name = "Receive a Stripe webhook",
    skip(req, body, verifier, customers, store)
)]
#[post("")]
async fn receive(
    req: HttpRequest,
    body: web::Bytes,
    verifier: web::Data<WebhookVerifier>,
    customers: web::Data<dyn CustomerDirectory>,
    store: web::Data<dyn SubscriptionStore>,
) -> Result<impl Responder, WebhookError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = webhook::process(
        verifier.get_ref(),
        customers.get_ref(),
        store.get_ref(),
        &body,
        signature,
    )
    .await;

    match outcome {
        WebhookOutcome::Persisted(_) | WebhookOutcome::Ignored { .. } => {
            Ok(HttpResponse::Ok().body("Received"))
        }
        WebhookOutcome::Rejected(error) => Err(error.into()),
        WebhookOutcome::Failed(error) => Err(error.into()),
    }
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook Error: {0}")]
    Verification(#[from] VerificationError),

    #[error("Missing email.")]
    MissingIdentity,

    #[error("Customer lookup failed")]
    UpstreamLookup(anyhow::Error),

    #[error("Database error")]
    Persistence(anyhow::Error),
}

impl From<HandlingError> for WebhookError {
    fn from(e: HandlingError) -> Self {
        match e {
            HandlingError::MissingIdentity => Self::MissingIdentity,
            HandlingError::UpstreamLookup(e) => Self::UpstreamLookup(e),
            HandlingError::Persistence(e) => Self::Persistence(e),
        }
    }
}

impl ResponseError for WebhookError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Verification(_) | Self::MissingIdentity => StatusCode::BAD_REQUEST,
            Self::UpstreamLookup(_) | Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Webhook API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/webhook").service(receive)
}
