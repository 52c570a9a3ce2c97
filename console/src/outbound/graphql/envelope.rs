//! Decoding of GraphQL responses into tagged results.
//!
//! A response field holds either an envelope `{ success, message?, data? }`
//! or the payload itself. Both shapes end up as `Ok(payload)` or a
//! [`GatewayError`].

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::http_failure::extract_error_message;
use crate::domain::ports::GatewayError;

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Pull the value of `field` out of a successful HTTP response body.
///
/// A non-empty `errors` array is a rejection carrying the first error's
/// message.
pub(super) fn response_field(body: Option<Value>, field: &str) -> Result<Value, GatewayError> {
    let Some(mut body) = body else {
        return Err(GatewayError::decode("response body is not JSON"));
    };
    if body
        .get("errors")
        .and_then(Value::as_array)
        .is_some_and(|errors| !errors.is_empty())
    {
        return Err(extract_error_message(&body)
            .map_or_else(GatewayError::declined, GatewayError::rejected));
    }
    match body.get_mut("data").and_then(|data| data.get_mut(field)) {
        Some(value) if !value.is_null() => Ok(value.take()),
        _ => Err(GatewayError::decode(format!("missing data.{field}"))),
    }
}

/// Decode a field value, unwrapping an envelope when present.
pub(super) fn decode_payload<T: DeserializeOwned>(
    field: &str,
    value: Value,
) -> Result<T, GatewayError> {
    let payload = if is_envelope(&value) {
        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|err| GatewayError::decode(format!("{field}: {err}")))?;
        if !envelope.success {
            return Err(rejection(envelope.message));
        }
        envelope.data.unwrap_or(Value::Null)
    } else {
        value
    };
    serde_json::from_value(payload).map_err(|err| GatewayError::decode(format!("{field}: {err}")))
}

/// Check a field value that carries no payload, such as a delete result.
///
/// A bare `false` or an unsuccessful envelope is a refusal.
pub(super) fn acknowledge(value: &Value) -> Result<(), GatewayError> {
    if is_envelope(value) {
        let succeeded = value.get("success").and_then(Value::as_bool) == Some(true);
        if succeeded {
            return Ok(());
        }
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_owned);
        return Err(rejection(message));
    }
    match value {
        Value::Bool(false) => Err(GatewayError::declined()),
        _ => Ok(()),
    }
}

fn is_envelope(value: &Value) -> bool {
    value.get("success").is_some_and(Value::is_boolean)
}

fn rejection(message: Option<String>) -> GatewayError {
    message
        .filter(|text| !text.trim().is_empty())
        .map_or_else(GatewayError::declined, GatewayError::rejected)
}
