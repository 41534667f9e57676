//! Request forwarder: identity check, account-link short-circuit, single upstream POST.
//!
//! [`RequestForwarder::handle`] reports through two channels. The outer `Result` is the
//! invocation fault (the host must fail the invocation); the inner [`Completion`] is the
//! regular outcome handed back to the voice platform.

use crate::config::ForwarderConfig;
use crate::event::InboundEvent;
use crate::relay::ResponseRelay;
use crate::response::account_link_response;
use crate::sink::{LogSink, RequestSink};
use crate::upstream::{OutboundRequest, Upstream, UpstreamError};
use serde_json::Value;
use std::sync::Arc;

/// Outcome reported to the host: the result value or a completion error.
pub type Completion = Result<Value, CompletionError>;

/// Errors reported through the completion channel.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Invalid Application ID")]
    InvalidApplicationId,
    #[error("upstream response failed: {0}")]
    UpstreamStream(String),
    #[error("upstream returned invalid JSON: {0}")]
    InvalidUpstreamJson(String),
}

/// Unrecoverable failures that abort the hosting invocation instead of completing it.
#[derive(Debug, thiserror::Error)]
pub enum InvocationFault {
    /// The request never produced a reply channel (connect or write failed).
    #[error("Error: {0}")]
    Connect(String),
    #[error("serializing event: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<UpstreamError> for InvocationFault {
    fn from(e: UpstreamError) -> Self {
        InvocationFault::Connect(e.to_string())
    }
}

/// Forwards authenticated skill events to the upstream and relays its reply.
#[derive(Clone)]
pub struct RequestForwarder {
    config: Arc<ForwarderConfig>,
    upstream: Arc<dyn Upstream>,
    sink: Arc<dyn RequestSink>,
}

impl RequestForwarder {
    pub fn new(config: ForwarderConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            config: Arc::new(config),
            upstream,
            sink: Arc::new(LogSink),
        }
    }

    /// Replace the default log sink for request diagnostics.
    pub fn with_sink(mut self, sink: Arc<dyn RequestSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    /// Handle one event. At most one upstream call is made; nothing is retried.
    pub async fn handle(&self, event: &InboundEvent) -> Result<Completion, InvocationFault> {
        if event.application_id() != Some(self.config.application_id.as_str()) {
            log::warn!(
                "rejecting event for application {:?}",
                event.application_id().unwrap_or("<missing>")
            );
            return Ok(Err(CompletionError::InvalidApplicationId));
        }

        self.sink.record(event.request().unwrap_or(&Value::Null));

        if !event.has_access_token() {
            log::debug!("no access token in session, asking user to link account");
            return Ok(Ok(account_link_response()));
        }

        let payload = event.to_payload()?;
        let request = OutboundRequest::json(self.config.upstream_url(), payload);
        log::debug!(
            "forwarding event to {} ({} bytes)",
            request.url,
            request.content_length()
        );
        let body = self.upstream.post(request).await.map_err(|e| {
            log::warn!("upstream request failed: {}", e);
            InvocationFault::from(e)
        })?;

        let completion = ResponseRelay::new().drive(body).await;
        if let Err(ref e) = completion {
            log::warn!("upstream reply not relayed: {}", e);
        }
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::{scripted_body, BodyEvent, BodyStream};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    const APP_ID: &str = "amzn1.echo-sdk-ams.app.test";

    enum Script {
        Reply(Vec<BodyEvent>),
        ConnectError(String),
    }

    /// Upstream that records every request and plays back a fixed script.
    struct FakeUpstream {
        script: Mutex<Option<Script>>,
        requests: Mutex<Vec<OutboundRequest>>,
    }

    impl FakeUpstream {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(Some(script)),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<OutboundRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Upstream for FakeUpstream {
        async fn post(&self, request: OutboundRequest) -> Result<BodyStream, UpstreamError> {
            self.requests.lock().unwrap().push(request);
            match self.script.lock().unwrap().take() {
                Some(Script::Reply(events)) => Ok(scripted_body(events)),
                Some(Script::ConnectError(m)) => Err(UpstreamError::Connect(m)),
                None => panic!("upstream called more than once"),
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<Value>>);

    impl RequestSink for RecordingSink {
        fn record(&self, request: &Value) {
            self.0.lock().unwrap().push(request.clone());
        }
    }

    fn config() -> ForwarderConfig {
        ForwarderConfig {
            application_id: APP_ID.to_string(),
            upstream_base_url: "https://upstream.test".to_string(),
            upstream_path: "/ask/v1/request".to_string(),
        }
    }

    fn event(app_id: &str, token: Value) -> InboundEvent {
        InboundEvent::new(json!({
            "version": "1.0",
            "session": {
                "new": false,
                "application": { "applicationId": app_id },
                "user": { "userId": "amzn1.account.U", "accessToken": token }
            },
            "request": { "type": "IntentRequest", "intent": { "name": "Listen" } }
        }))
    }

    fn data(s: &str) -> BodyEvent {
        BodyEvent::Data(s.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn foreign_application_is_rejected_without_io() {
        let upstream = FakeUpstream::new(Script::Reply(vec![BodyEvent::End]));
        let sink = Arc::new(RecordingSink::default());
        let fwd = RequestForwarder::new(config(), upstream.clone()).with_sink(sink.clone());

        let out = fwd.handle(&event("amzn1.other", json!("tok"))).await.unwrap();
        match out {
            Err(e) => assert_eq!(e.to_string(), "Invalid Application ID"),
            Ok(v) => panic!("unexpected success: {}", v),
        }
        assert!(upstream.requests().is_empty());
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_identity_is_rejected() {
        let upstream = FakeUpstream::new(Script::Reply(vec![BodyEvent::End]));
        let fwd = RequestForwarder::new(config(), upstream.clone());
        let out = fwd
            .handle(&InboundEvent::new(json!({ "request": {} })))
            .await
            .unwrap();
        assert!(matches!(out, Err(CompletionError::InvalidApplicationId)));
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn falsy_token_gets_account_link_without_io() {
        for token in [json!(null), json!(""), json!(false)] {
            let upstream = FakeUpstream::new(Script::Reply(vec![BodyEvent::End]));
            let sink = Arc::new(RecordingSink::default());
            let fwd = RequestForwarder::new(config(), upstream.clone()).with_sink(sink.clone());

            let out = fwd.handle(&event(APP_ID, token)).await.unwrap().unwrap();
            assert_eq!(out, account_link_response());
            assert!(upstream.requests().is_empty());
            assert_eq!(
                sink.0.lock().unwrap().as_slice(),
                &[json!({ "type": "IntentRequest", "intent": { "name": "Listen" } })]
            );
        }
    }

    #[tokio::test]
    async fn forwards_event_verbatim_and_relays_json() {
        let upstream = FakeUpstream::new(Script::Reply(vec![
            data("{\"a\":"),
            data("1}"),
            BodyEvent::End,
        ]));
        let fwd = RequestForwarder::new(config(), upstream.clone());
        let ev = event(APP_ID, json!("Atza|token"));

        let out = fwd.handle(&ev).await.unwrap().unwrap();
        assert_eq!(out, json!({ "a": 1 }));

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.url, "https://upstream.test/ask/v1/request");
        assert_eq!(req.content_type, "application/json;charset=UTF-8");
        assert_eq!(req.body, serde_json::to_vec(ev.as_value()).unwrap());
        assert_eq!(req.content_length(), req.body.len());
    }

    #[tokio::test]
    async fn stream_error_completes_with_error() {
        let upstream = FakeUpstream::new(Script::Reply(vec![
            data("{\"a\":"),
            BodyEvent::Error("connection reset by peer".to_string()),
            data("1}"),
            BodyEvent::End,
        ]));
        let fwd = RequestForwarder::new(config(), upstream.clone());

        let out = fwd.handle(&event(APP_ID, json!("tok"))).await.unwrap();
        assert!(matches!(out, Err(CompletionError::UpstreamStream(ref m)) if m == "connection reset by peer"));
        assert_eq!(upstream.requests().len(), 1);
    }

    #[tokio::test]
    async fn stream_error_before_any_chunk() {
        let upstream = FakeUpstream::new(Script::Reply(vec![BodyEvent::Error("eof".to_string())]));
        let fwd = RequestForwarder::new(config(), upstream);
        let out = fwd.handle(&event(APP_ID, json!("tok"))).await.unwrap();
        assert!(matches!(out, Err(CompletionError::UpstreamStream(_))));
    }

    #[tokio::test]
    async fn connect_failure_is_an_invocation_fault() {
        let upstream = FakeUpstream::new(Script::ConnectError("connection refused".to_string()));
        let fwd = RequestForwarder::new(config(), upstream.clone());

        let fault = match fwd.handle(&event(APP_ID, json!("tok"))).await {
            Err(f) => f,
            Ok(c) => panic!("expected fault, got completion {:?}", c),
        };
        assert_eq!(fault.to_string(), "Error: connection refused");
        assert_eq!(upstream.requests().len(), 1);
    }
}
