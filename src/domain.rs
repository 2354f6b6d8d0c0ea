mod email_address;
mod stripe_event;

pub use email_address::EmailAddress;
pub use stripe_event::{CheckoutSession, Event, EventData, CHECKOUT_SESSION_COMPLETED};
