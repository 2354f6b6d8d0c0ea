use std::time::Duration;

use anyhow::Context;

use async_trait::async_trait;

use reqwest::Client;

use serde::Deserialize;

use secrecy::Secret;

use url::Url;

use crate::webhook::CustomerDirectory;

const STRIPE_VERSION_HEADER: &str = "Stripe-Version";
/// API version the customer payloads are parsed against
const STRIPE_API_VERSION: &str = "2025-04-30.basil";

/// REST client for the Stripe API
#[derive(Debug)]
pub struct StripeClient {
    client: Client,

    api_base_url: Url,
    secret_key: Secret<String>,
}

impl StripeClient {
    pub fn new(
        api_timeout: Duration,
        api_base_url: Url,
        secret_key: Secret<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .build()
            .context("Failed to build http client")?;

        if api_base_url.cannot_be_a_base() {
            anyhow::bail!("{} cannot be used as a Stripe API base URL", api_base_url);
        }

        Ok(Self {
            client,
            api_base_url,
            secret_key,
        })
    }

    /// Fetch a customer by ID
    #[tracing::instrument(name = "Retrieve Stripe customer", skip(self))]
    pub async fn retrieve_customer(&self, customer_id: &str) -> anyhow::Result<Customer> {
        use secrecy::ExposeSecret;

        let url = self.endpoint(&["v1", "customers", customer_id]);

        let customer = self
            .client
            .get(url)
            .bearer_auth(self.secret_key.expose_secret())
            .header(STRIPE_VERSION_HEADER, STRIPE_API_VERSION)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse Stripe customer")?;

        Ok(customer)
    }

    /// Append percent-encoded path segments to the API base URL
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl CustomerDirectory for StripeClient {
    async fn customer_email(&self, customer_id: &str) -> anyhow::Result<Option<String>> {
        let customer = self.retrieve_customer(customer_id).await?;

        if customer.deleted {
            return Ok(None);
        }
        Ok(customer.email)
    }
}

/// A Stripe customer, or the stub left behind once it is deleted
#[derive(Debug, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}
