use async_trait::async_trait;

use thiserror::Error;

use crate::crypto::{SignatureError, WebhookVerifier};
use crate::domain::{CheckoutSession, EmailAddress, Event, CHECKOUT_SESSION_COMPLETED};
use crate::repo::SubscriptionRecord;

/// Lookup of customer records held by the payment provider
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// The email on file for a customer, `None` if the customer is deleted or has no email
    async fn customer_email(&self, customer_id: &str) -> anyhow::Result<Option<String>>;
}

/// Storage for subscription records, keyed by user email
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Write the record, fully replacing any existing record with the same email
    async fn upsert(&self, record: &SubscriptionRecord) -> anyhow::Result<()>;
}

/// The terminal state of a single webhook delivery
#[derive(Debug)]
pub enum WebhookOutcome {
    /// Signature or payload did not verify; nothing was processed
    Rejected(VerificationError),
    /// Verified, but no handler exists for the event type
    Ignored { event_type: String },
    /// Verified and routed, but handling failed before anything was written
    Failed(HandlingError),
    /// The record was written
    Persisted(SubscriptionRecord),
}

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("Malformed event payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum HandlingError {
    #[error("No customer email could be resolved for the checkout session")]
    MissingIdentity,

    #[error("Failed to look up customer: {0}")]
    UpstreamLookup(anyhow::Error),

    #[error("Failed to persist subscription record: {0}")]
    Persistence(anyhow::Error),
}

/// Verify the raw payload against its signature header and parse the event
pub fn construct_event(
    verifier: &WebhookVerifier,
    payload: &[u8],
    signature: Option<&str>,
) -> Result<Event, VerificationError> {
    verifier.verify(payload, signature)?;

    Ok(serde_json::from_slice(payload)?)
}

/// Run one webhook delivery from received bytes to a terminal state
#[tracing::instrument(name = "Process webhook delivery", skip_all)]
pub async fn process(
    verifier: &WebhookVerifier,
    customers: &dyn CustomerDirectory,
    store: &dyn SubscriptionStore,
    payload: &[u8],
    signature: Option<&str>,
) -> WebhookOutcome {
    let event = match construct_event(verifier, payload, signature) {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(error.message = %error, "Webhook verification failed");
            return WebhookOutcome::Rejected(error);
        }
    };

    tracing::info!(event.id = %event.id, event.kind = %event.event_type, "Verified webhook event");

    match event.event_type.as_str() {
        CHECKOUT_SESSION_COMPLETED => {
            let session: CheckoutSession = match serde_json::from_value(event.data.object) {
                Ok(session) => session,
                Err(error) => {
                    tracing::warn!(error.message = %error, "Malformed checkout session");
                    return WebhookOutcome::Rejected(error.into());
                }
            };

            match handle_checkout_completed(customers, store, session).await {
                Ok(record) => {
                    tracing::info!(user_email = %record.user_email, "Pro user saved");
                    WebhookOutcome::Persisted(record)
                }
                Err(error) => {
                    match &error {
                        HandlingError::MissingIdentity => {
                            tracing::warn!("No customer email found, skipping")
                        }
                        other => tracing::error!(error.cause_chain = ?other, "{}", other),
                    }
                    WebhookOutcome::Failed(error)
                }
            }
        }
        other => {
            tracing::debug!(event.kind = other, "Unhandled webhook event type");
            WebhookOutcome::Ignored {
                event_type: other.to_string(),
            }
        }
    }
}

/// Activate a subscription for the user that completed a checkout
#[tracing::instrument(
    name = "Handle completed checkout",
    skip(customers, store, session),
    fields(session.id = ?session.id)
)]
async fn handle_checkout_completed(
    customers: &dyn CustomerDirectory,
    store: &dyn SubscriptionStore,
    session: CheckoutSession,
) -> Result<SubscriptionRecord, HandlingError> {
    let user_email = resolve_email(customers, &session)
        .await?
        .ok_or(HandlingError::MissingIdentity)?;

    let record = SubscriptionRecord::activate(user_email, session.customer, session.subscription);

    store
        .upsert(&record)
        .await
        .map_err(HandlingError::Persistence)?;

    Ok(record)
}

/// Use the session's email, falling back to the customer record when absent
async fn resolve_email(
    customers: &dyn CustomerDirectory,
    session: &CheckoutSession,
) -> Result<Option<EmailAddress>, HandlingError> {
    if let Some(email) = session.customer_email.as_deref().and_then(parse_email) {
        return Ok(Some(email));
    }

    let customer_id = session.customer.as_deref().filter(|id| !id.trim().is_empty());
    let Some(customer_id) = customer_id else {
        return Ok(None);
    };

    let email = customers
        .customer_email(customer_id)
        .await
        .map_err(HandlingError::UpstreamLookup)?;

    Ok(email.as_deref().and_then(parse_email))
}

fn parse_email(value: &str) -> Option<EmailAddress> {
    match value.parse() {
        Ok(email) => Some(email),
        Err(reason) => {
            tracing::warn!(reason = %reason, "Ignoring unusable customer email");
            None
        }
    }
}
