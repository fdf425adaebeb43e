//! HTTP client for the PayChangu API.
//!
//! One client serves both the event catalog (events, categories, tickets)
//! and hosted checkout.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use eventhub_core::catalog::{
    CatalogProviderTrait, ExternalCategory, ExternalEvent, ExternalTicket,
};
use eventhub_core::errors::{Error, Result, UpstreamError};
use eventhub_core::payments::{
    CheckoutRequest, CheckoutSession, PaymentGatewayTrait, PaymentVerification,
};

use crate::model::{
    classify_error, decode_ticket, list_items, unwrap_envelope, CheckoutCustomization,
    CheckoutData, CheckoutPayload, VerifyData,
};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_PAYCHANGU_API_URL: &str = "https://api.paychangu.com";

/// Connection settings for [`PayChanguClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayChanguConfig {
    pub base_url: String,
    pub secret_key: String,
    /// Where PayChangu posts payment outcomes.
    pub callback_url: String,
    /// Where the payer is sent after checkout.
    pub return_url: String,
}

/// HTTP client for the PayChangu catalog and checkout API.
///
/// # Example
///
/// ```ignore
/// let client = PayChanguClient::new(config)?;
/// let events = client.list_events(100).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PayChanguClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderValue,
    callback_url: String,
    return_url: String,
}

fn transport(e: reqwest::Error) -> Error {
    UpstreamError::Transport(e.to_string()).into()
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

impl PayChanguClient {
    /// Creates a client. Fails when the secret key cannot be used as a
    /// header value or the HTTP client cannot be initialized.
    pub fn new(config: PayChanguConfig) -> Result<Self> {
        let auth_header = HeaderValue::from_str(&format!("Bearer {}", config.secret_key))
            .map_err(|e| Error::Unexpected(format!("Invalid secret key format: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to initialize HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_header,
            callback_url: config.callback_url,
            return_url: config.return_url,
        })
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, self.auth_header.clone());
        headers
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` and return the envelope's `data`.
    async fn get_data(&self, path: &str, resource: &str) -> Result<Value> {
        let url = self.url(path);
        debug!("[PayChangu] GET {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(transport)?;

        self.parse_response(response, resource).await
    }

    /// POST `body` to `path` and return the envelope's `data`.
    async fn post_data<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        resource: &str,
    ) -> Result<Value> {
        let url = self.url(path);
        debug!("[PayChangu] POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        self.parse_response(response, resource).await
    }

    async fn parse_response(&self, response: reqwest::Response, resource: &str) -> Result<Value> {
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body, resource).into());
        }

        let parsed: Value = serde_json::from_str(&body).map_err(|e| {
            UpstreamError::Decode(format!(
                "{} - {}",
                e,
                body.chars().take(200).collect::<String>()
            ))
        })?;
        Ok(unwrap_envelope(parsed))
    }

    fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
        serde_json::from_value(value)
            .map_err(|e| UpstreamError::Decode(format!("{}: {}", what, e)).into())
    }

    fn decode_list<T: DeserializeOwned>(data: Value, what: &str) -> Result<Vec<T>> {
        list_items(data)?
            .into_iter()
            .map(|item| Self::decode(item, what))
            .collect()
    }

    async fn ticket_action(&self, ticket_id: &str, action: &str) -> Result<ExternalTicket> {
        let path = format!("/tickets/{}/{}", segment(ticket_id), action);
        let data = self
            .post_data(&path, &serde_json::json!({}), &format!("Ticket '{}'", ticket_id))
            .await?;
        info!("[PayChangu] Ticket {} {}", ticket_id, action);
        decode_ticket(data)
    }
}

#[async_trait]
impl CatalogProviderTrait for PayChanguClient {
    async fn list_events(&self, page_size: u32) -> Result<Vec<ExternalEvent>> {
        let data = self
            .get_data(&format!("/events?per_page={}", page_size), "Events")
            .await?;
        Self::decode_list(data, "event")
    }

    async fn get_event(&self, slug: &str) -> Result<ExternalEvent> {
        let data = self
            .get_data(
                &format!("/events/{}", segment(slug)),
                &format!("Event '{}'", slug),
            )
            .await?;
        Self::decode(data, "event")
    }

    async fn list_categories(&self) -> Result<Vec<ExternalCategory>> {
        let data = self.get_data("/event-categories", "Categories").await?;
        Self::decode_list(data, "category")
    }

    async fn list_event_tickets(&self, event_id: &str) -> Result<Vec<ExternalTicket>> {
        let data = self
            .get_data(
                &format!("/events/{}/tickets", segment(event_id)),
                &format!("Tickets for event '{}'", event_id),
            )
            .await?;
        list_items(data)?.into_iter().map(decode_ticket).collect()
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<ExternalTicket> {
        let data = self
            .get_data(
                &format!("/tickets/{}", segment(ticket_id)),
                &format!("Ticket '{}'", ticket_id),
            )
            .await?;
        decode_ticket(data)
    }

    async fn redeem_ticket(&self, ticket_id: &str) -> Result<ExternalTicket> {
        self.ticket_action(ticket_id, "redeem").await
    }

    async fn unredeem_ticket(&self, ticket_id: &str) -> Result<ExternalTicket> {
        self.ticket_action(ticket_id, "unredeem").await
    }
}

#[async_trait]
impl PaymentGatewayTrait for PayChanguClient {
    async fn create_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let payload = CheckoutPayload {
            amount: request.amount.normalize().to_string(),
            currency: request.currency,
            tx_ref: request.tx_ref.clone(),
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            callback_url: self.callback_url.clone(),
            return_url: self.return_url.clone(),
            customization: CheckoutCustomization {
                title: request.title,
                description: request.description,
            },
        };

        let data = self.post_data("/payment", &payload, "Checkout").await?;
        let checkout: CheckoutData = Self::decode(data, "checkout")?;
        info!("[PayChangu] Checkout opened for {}", request.tx_ref);

        Ok(CheckoutSession {
            checkout_url: checkout.checkout_url,
            tx_ref: request.tx_ref,
        })
    }

    async fn verify_payment(&self, tx_ref: &str) -> Result<PaymentVerification> {
        let data = self
            .get_data(
                &format!("/verify-payment/{}", segment(tx_ref)),
                &format!("Payment '{}'", tx_ref),
            )
            .await?;
        let verification = Self::decode::<VerifyData>(data, "payment")?.into_verification(tx_ref)?;
        debug!(
            "[PayChangu] Payment {} verified as {:?}",
            tx_ref, verification.status
        );
        Ok(verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> PayChanguConfig {
        PayChanguConfig {
            base_url: base_url.to_string(),
            secret_key: "sec-test-key".to_string(),
            callback_url: "https://eventhub.example/api/public/payments/callback".to_string(),
            return_url: "https://eventhub.example/wallet".to_string(),
        }
    }

    #[test]
    fn test_client_creation() {
        assert!(PayChanguClient::new(config(DEFAULT_PAYCHANGU_API_URL)).is_ok());
    }

    #[test]
    fn test_client_url_normalization() {
        let client = PayChanguClient::new(config("https://api.paychangu.com/")).unwrap();
        assert_eq!(client.base_url, "https://api.paychangu.com");
        assert_eq!(client.url("/events"), "https://api.paychangu.com/events");
    }

    #[test]
    fn test_invalid_secret_key_is_rejected() {
        let mut bad = config(DEFAULT_PAYCHANGU_API_URL);
        bad.secret_key = "line\nbreak".to_string();
        assert!(PayChanguClient::new(bad).is_err());
    }

    #[test]
    fn test_path_segments_are_encoded() {
        assert_eq!(segment("summer fest/2025"), "summer%20fest%2F2025");
    }

    #[test]
    fn test_decode_list_of_events() {
        let data = serde_json::json!({"data": [
            {"id": 1, "slug": "a", "title": "A"},
            {"id": "2", "slug": "b", "name": "B"}
        ]});
        let events: Vec<ExternalEvent> = PayChanguClient::decode_list(data, "event").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].external_id(), Some("2"));
        assert_eq!(events[1].display_title().as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_transport_error() {
        let client = PayChanguClient::new(config("http://127.0.0.1:9")).unwrap();
        let err = client.list_categories().await.unwrap_err();
        assert!(matches!(err, Error::Upstream(UpstreamError::Transport(_))));
    }

    #[test]
    fn test_checkout_payload_shape() {
        let payload = CheckoutPayload {
            amount: "1500".to_string(),
            currency: "MWK".to_string(),
            tx_ref: "EH-abc".to_string(),
            email: None,
            first_name: Some("Thoko".to_string()),
            last_name: None,
            callback_url: "cb".to_string(),
            return_url: "ret".to_string(),
            customization: CheckoutCustomization {
                title: "Wallet deposit".to_string(),
                description: None,
            },
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["amount"], "1500");
        assert_eq!(value["customization"]["title"], "Wallet deposit");
        assert!(value.get("email").is_none());
    }
}
