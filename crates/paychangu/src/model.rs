//! Wire shapes of the PayChangu API and the helpers that decode them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use eventhub_core::catalog::ExternalTicket;
use eventhub_core::errors::{Result, UpstreamError};
use eventhub_core::payments::{GatewayStatus, PaymentVerification};

/// Error body returned on non-2xx responses. `message` is sometimes a string
/// and sometimes an object of field errors.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckoutCustomization {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckoutPayload {
    pub amount: String,
    pub currency: String,
    pub tx_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub callback_url: String,
    pub return_url: String,
    pub customization: CheckoutCustomization,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CheckoutData {
    pub checkout_url: String,
}

/// `data` of `GET /verify-payment/{tx_ref}`. Amounts come back as numbers
/// or strings depending on the account.
#[derive(Debug, Deserialize)]
pub(crate) struct VerifyData {
    #[serde(default)]
    pub tx_ref: Option<String>,
    pub status: String,
    pub amount: Value,
    #[serde(default)]
    pub currency: Option<String>,
}

impl VerifyData {
    pub(crate) fn into_verification(self, requested_ref: &str) -> Result<PaymentVerification> {
        let status = GatewayStatus::from_str(&self.status).map_err(|_| {
            UpstreamError::Decode(format!("unknown payment status '{}'", self.status))
        })?;
        let amount = match &self.amount {
            Value::Number(n) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .ok(),
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
        .ok_or_else(|| UpstreamError::Decode(format!("payment amount {}", self.amount)))?;

        Ok(PaymentVerification {
            tx_ref: self.tx_ref.unwrap_or_else(|| requested_ref.to_string()),
            status,
            amount,
            currency: self.currency,
        })
    }
}

/// Strips the `{status, message, data}` envelope. Bodies without one are
/// returned as they are.
pub(crate) fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// List payloads arrive either as a bare array or as a paginated object
/// holding the array under its own `data` key.
pub(crate) fn list_items(data: Value) -> Result<Vec<Value>> {
    match data {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(UpstreamError::Decode("expected a list under 'data'".to_string()).into()),
        },
        Value::Null => Ok(Vec::new()),
        other => Err(UpstreamError::Decode(format!("expected a list, got {}", other)).into()),
    }
}

pub(crate) fn decode_ticket(value: Value) -> Result<ExternalTicket> {
    let mut ticket: ExternalTicket = serde_json::from_value(value.clone())
        .map_err(|e| UpstreamError::Decode(format!("ticket: {}", e)))?;
    ticket.raw = value;
    Ok(ticket)
}

fn message_text(status: u16, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(err) => match err.message {
            Some(Value::String(message)) => message,
            Some(Value::Null) | None => err.error.unwrap_or_else(|| format!("HTTP {}", status)),
            Some(other) => other.to_string(),
        },
        Err(_) => body.chars().take(200).collect(),
    }
}

/// Maps a failed response to an [`UpstreamError`].
///
/// The API has no error codes for redemption conflicts, so those are
/// recognized from the message text.
pub(crate) fn classify_error(status: u16, body: &str, resource: &str) -> UpstreamError {
    let message = message_text(status, body);
    let lowered = message.to_ascii_lowercase();

    if lowered.contains("already been redeemed") || lowered.contains("already redeemed") {
        return UpstreamError::AlreadyRedeemed;
    }
    if lowered.contains("not been redeemed") || lowered.contains("not redeemed") {
        return UpstreamError::NotRedeemed;
    }
    if status == 404 {
        return UpstreamError::NotFound(resource.to_string());
    }
    UpstreamError::Http { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_items_accepts_both_shapes() {
        let bare = unwrap_envelope(json!({"status": "success", "data": [{"id": 1}, {"id": 2}]}));
        assert_eq!(list_items(bare).unwrap().len(), 2);

        let paginated = unwrap_envelope(json!({
            "status": "success",
            "data": {"current_page": 1, "data": [{"id": 1}], "total": 1}
        }));
        assert_eq!(list_items(paginated).unwrap().len(), 1);

        let odd = list_items(json!({"items": []})).unwrap_err();
        assert!(odd.to_string().contains("decode"));
    }

    #[test]
    fn test_unwrap_envelope_passes_plain_bodies_through() {
        let body = json!({"id": 5, "slug": "x"});
        assert_eq!(unwrap_envelope(body.clone()), body);
    }

    #[test]
    fn test_decode_ticket_keeps_raw_payload() {
        let value = json!({"id": 77, "event_id": "9", "seat": {"row": "B"}});
        let ticket = decode_ticket(value.clone()).unwrap();
        assert_eq!(ticket.id.as_deref(), Some("77"));
        assert_eq!(ticket.raw, value);
    }

    #[test]
    fn test_verify_data_decoding() {
        let data = unwrap_envelope(json!({
            "status": "success",
            "message": "Payment details retrieved successfully.",
            "data": {
                "event_type": "api.charge.payment",
                "tx_ref": "EH-1",
                "status": "success",
                "amount": 1500,
                "currency": "MWK"
            }
        }));
        let verified = serde_json::from_value::<VerifyData>(data)
            .unwrap()
            .into_verification("EH-1")
            .unwrap();
        assert_eq!(verified.status, GatewayStatus::Success);
        assert_eq!(verified.amount, Decimal::from(1500));
        assert_eq!(verified.currency.as_deref(), Some("MWK"));

        let pending: VerifyData =
            serde_json::from_value(json!({"status": "pending", "amount": "250.50"})).unwrap();
        let pending = pending.into_verification("EH-2").unwrap();
        assert_eq!(pending.tx_ref, "EH-2");
        assert_eq!(pending.amount, Decimal::new(25050, 2));

        let odd: VerifyData =
            serde_json::from_value(json!({"status": "reversed", "amount": 1})).unwrap();
        assert!(odd.into_verification("EH-3").is_err());
    }

    #[test]
    fn test_classify_error() {
        assert!(matches!(
            classify_error(400, r#"{"status":"error","message":"Ticket has already been redeemed"}"#, "Ticket"),
            UpstreamError::AlreadyRedeemed
        ));
        assert!(matches!(
            classify_error(422, r#"{"message":"This ticket has not been redeemed"}"#, "Ticket"),
            UpstreamError::NotRedeemed
        ));
        assert!(matches!(
            classify_error(404, r#"{"message":"No query results"}"#, "Ticket '3'"),
            UpstreamError::NotFound(ref what) if what == "Ticket '3'"
        ));
        match classify_error(500, "<html>boom</html>", "Events") {
            UpstreamError::Http { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "<html>boom</html>");
            }
            other => panic!("unexpected {:?}", other),
        }
        match classify_error(422, r#"{"message":{"amount":["required"]}}"#, "Checkout") {
            UpstreamError::Http { message, .. } => assert!(message.contains("amount")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
