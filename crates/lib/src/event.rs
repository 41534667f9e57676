//! Inbound voice-platform event.
//!
//! The event is kept as the exact JSON value received so it can be forwarded
//! byte-for-byte; accessors read the few fields the forwarder inspects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request event delivered by the voice platform (session, request, context).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InboundEvent(Value);

impl InboundEvent {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse an event from a JSON body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes).map(Self)
    }

    /// `session.application.applicationId`, when present and a string.
    pub fn application_id(&self) -> Option<&str> {
        self.0
            .pointer("/session/application/applicationId")
            .and_then(Value::as_str)
    }

    /// `session.user.accessToken` when it is a non-empty string.
    pub fn access_token(&self) -> Option<&str> {
        self.0
            .pointer("/session/user/accessToken")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Whether the session carries a token. Missing, null, "", false and 0 all count as absent.
    pub fn has_access_token(&self) -> bool {
        self.0
            .pointer("/session/user/accessToken")
            .is_some_and(is_truthy)
    }

    /// The `request` payload (intent, launch, session end...). Opaque to the forwarder.
    pub fn request(&self) -> Option<&Value> {
        self.0.get("request")
    }

    /// Serialize the whole event, unmodified, as the forwarded request body.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.0)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl From<Value> for InboundEvent {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
