//! Response relay: accumulates upstream body chunks in order and resolves exactly once.

use crate::forwarder::{Completion, CompletionError};
use crate::upstream::BodyEvent;
use futures_util::{Stream, StreamExt};

/// Accumulation buffer plus a single-fire latch.
///
/// The first `Error` or `End` resolves the relay; every later event is ignored.
#[derive(Debug, Default)]
pub struct ResponseRelay {
    body: Vec<u8>,
    resolved: bool,
}

impl ResponseRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Feed one body event. Returns the completion when this event resolves the relay.
    pub fn on_event(&mut self, event: BodyEvent) -> Option<Completion> {
        if self.resolved {
            return None;
        }
        match event {
            BodyEvent::Data(chunk) => {
                self.body.extend_from_slice(&chunk);
                None
            }
            BodyEvent::Error(message) => {
                self.resolved = true;
                self.body = Vec::new();
                Some(Err(CompletionError::UpstreamStream(message)))
            }
            BodyEvent::End => {
                self.resolved = true;
                let body = std::mem::take(&mut self.body);
                Some(
                    serde_json::from_slice(&body)
                        .map_err(|e| CompletionError::InvalidUpstreamJson(e.to_string())),
                )
            }
        }
    }

    /// Consume a body stream until the relay resolves. A stream that runs dry counts as `End`.
    pub async fn drive<S>(mut self, mut body: S) -> Completion
    where
        S: Stream<Item = BodyEvent> + Unpin,
    {
        while let Some(event) = body.next().await {
            if let Some(completion) = self.on_event(event) {
                return completion;
            }
        }
        self.on_event(BodyEvent::End)
            .unwrap_or_else(|| Err(CompletionError::UpstreamStream("response already resolved".to_string())))
    }
}
