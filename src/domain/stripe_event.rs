use serde::Deserialize;

/// Event type sent when a customer finishes a checkout flow
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// A webhook event envelope as delivered by Stripe
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Unix timestamp of event creation
    #[serde(default)]
    pub created: Option<i64>,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// The API resource the event is about; its shape depends on `type`
    pub object: serde_json::Value,
}

/// The subset of a Checkout Session needed to activate a subscription
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    pub id: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub customer_email: Option<String>,
}
