/// Optional video conversion endpoint
pub mod convert;
/// Payment provider webhook endpoint
pub mod webhook;
