//! Action channel: the sole conduit between a rendering surface or
//! execution context and the host. A handle carries the session's
//! provenance token; everything it submits flows through the capability
//! guard.

use crate::guard::CapabilityGuard;
use crate::protocol::{ActionEnvelope, SubmitOutcome};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub struct ActionChannel {
    guard: Arc<CapabilityGuard>,
    token: Uuid,
    next_correlation_id: AtomicU64,
}

impl ActionChannel {
    pub fn new(guard: Arc<CapabilityGuard>, token: Uuid) -> Self {
        Self {
            guard,
            token,
            next_correlation_id: AtomicU64::new(1),
        }
    }

    /// The provenance token stamped on envelopes sent through this handle.
    /// Held by the surface, never handed to provider content.
    pub fn token(&self) -> Uuid {
        self.token
    }

    pub fn submit(&self, envelope: ActionEnvelope) -> SubmitOutcome {
        self.guard.submit(envelope, self.token)
    }

    /// Submit an `invoke` with a channel-allocated correlation id. Used by
    /// markup and external-reference surfaces; the script executor
    /// allocates its own ids so the program sees them synchronously.
    pub fn invoke(&self, operation: impl Into<String>, args: Value) -> (u64, SubmitOutcome) {
        let correlation_id = self.next_correlation_id.fetch_add(1, Ordering::Relaxed);
        let outcome = self.submit(ActionEnvelope::Invoke {
            operation: operation.into(),
            args,
            correlation_id,
        });
        (correlation_id, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::guard::{GuardConfig, NoopHostActions};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn channel_for(allowlist: &[&str]) -> (ActionChannel, mpsc::Receiver<crate::guard::ToolRequest>)
    {
        let token = Uuid::new_v4();
        let (tool_tx, tool_rx) = mpsc::channel(8);
        let (inbound_tx, _inbound_rx) = mpsc::unbounded_channel();
        let guard = Arc::new(CapabilityGuard::new(
            Uuid::new_v4(),
            token,
            allowlist.iter().map(|s| s.to_string()).collect(),
            GuardConfig::default(),
            tool_tx,
            inbound_tx,
            Arc::new(NoopHostActions),
        ));
        (ActionChannel::new(guard, token), tool_rx)
    }

    #[tokio::test]
    async fn test_invoke_allocates_distinct_correlation_ids() {
        let (channel, mut tool_rx) = channel_for(&["getData"]);
        let (first, outcome) = channel.invoke("getData", json!({"q": 1}));
        assert_eq!(outcome, SubmitOutcome::Accepted);
        let (second, _) = channel.invoke("getData", json!({"q": 2}));
        assert_ne!(first, second);
        assert_eq!(tool_rx.recv().await.unwrap().args, json!({"q": 1}));
    }

    #[tokio::test]
    async fn test_invoke_outside_allowlist_is_rejected() {
        let (channel, mut tool_rx) = channel_for(&[]);
        let (_, outcome) = channel.invoke("deleteAll", json!(null));
        assert!(matches!(
            outcome,
            SubmitOutcome::Rejected(CoreError::CapabilityDenied { .. })
        ));
        assert!(tool_rx.try_recv().is_err());
    }
}
