//! Capability guard: the single checkpoint every outbound request passes
//! before it can touch the host. Validates provenance, enforces the
//! session allowlist, rate-limits, and races host calls against a
//! deadline. Shared by every content mode.

use crate::error::CoreError;
use crate::protocol::{ActionEnvelope, InboundMessage, SubmitOutcome};
use crate::rate::TokenBucket;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GuardConfig {
    /// Token-bucket capacity per rolling minute, all envelope kinds.
    pub max_calls_per_minute: u32,
    /// Per-call deadline for `invoke` responses.
    pub call_deadline_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_calls_per_minute: 60,
            call_deadline_ms: 30_000,
        }
    }
}

impl GuardConfig {
    pub fn call_deadline(&self) -> Duration {
        Duration::from_millis(self.call_deadline_ms)
    }
}

/// A forwarded `invoke`, sent to the external tool-execution collaborator.
/// The guard only decides whether to send this; execution is external.
pub struct ToolRequest {
    pub session_id: Uuid,
    pub operation: String,
    pub args: Value,
    pub reply: oneshot::Sender<Result<Value, String>>,
}

/// Host-level handlers for the non-invoke envelope kinds. Implementations
/// are external; provenance and rate checks have already passed when these
/// fire.
pub trait HostActions: Send + Sync {
    fn on_submit_text(&self, _session_id: Uuid, _text: &str) {}
    fn on_notify(&self, _session_id: Uuid, _message: &str) {}
    fn on_navigate(&self, _session_id: Uuid, _url: &str) {}
}

/// Default host that ignores every action.
pub struct NoopHostActions;

impl HostActions for NoopHostActions {}

/// Bookkeeping for a call awaiting its response. Created on `invoke`,
/// removed on response or deadline expiry, never both: the pending map is
/// the single removal point.
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub correlation_id: u64,
    pub deadline: Instant,
}

pub struct CapabilityGuard {
    session_id: Uuid,
    /// Provenance token held by the surface/context that owns this session.
    token: Uuid,
    /// Copied from the resource at session start; read-only afterwards.
    allowlist: HashSet<String>,
    config: GuardConfig,
    bucket: Mutex<TokenBucket>,
    pending: Arc<Mutex<HashMap<u64, PendingCall>>>,
    tool_tx: mpsc::Sender<ToolRequest>,
    inbound_tx: mpsc::UnboundedSender<InboundMessage>,
    host: Arc<dyn HostActions>,
}

impl CapabilityGuard {
    pub fn new(
        session_id: Uuid,
        token: Uuid,
        allowlist: HashSet<String>,
        config: GuardConfig,
        tool_tx: mpsc::Sender<ToolRequest>,
        inbound_tx: mpsc::UnboundedSender<InboundMessage>,
        host: Arc<dyn HostActions>,
    ) -> Self {
        let bucket = Mutex::new(TokenBucket::per_minute(config.max_calls_per_minute));
        Self {
            session_id,
            token,
            allowlist,
            config,
            bucket,
            pending: Arc::new(Mutex::new(HashMap::new())),
            tool_tx,
            inbound_tx,
            host,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Number of calls currently awaiting a response.
    pub fn outstanding_calls(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Public contract: validate and route one envelope. Must be called
    /// inside a tokio runtime (deadline tasks are spawned here).
    pub fn submit(&self, envelope: ActionEnvelope, token: Uuid) -> SubmitOutcome {
        if token != self.token {
            warn!(session = %self.session_id, "dropping envelope with mismatched provenance");
            return SubmitOutcome::Dropped;
        }
        match envelope {
            ActionEnvelope::Invoke {
                operation,
                args,
                correlation_id,
            } => self.submit_invoke(operation, args, correlation_id),
            other => self.submit_host_action(other),
        }
    }

    fn submit_invoke(&self, operation: String, args: Value, correlation_id: u64) -> SubmitOutcome {
        // Allowlist first: denied calls must have no side effect at all,
        // not even a consumed rate token.
        if !self.allowlist.contains(&operation) {
            let err = CoreError::CapabilityDenied {
                operation: operation.clone(),
            };
            warn!(session = %self.session_id, %operation, "capability denied");
            self.push_call_result(correlation_id, Err(err.clone()));
            return SubmitOutcome::Rejected(err);
        }
        if !self.bucket.lock().unwrap().try_take() {
            let err = self.rate_limited();
            self.push_call_result(correlation_id, Err(err.clone()));
            return SubmitOutcome::Rejected(err);
        }
        {
            let mut pending = self.pending.lock().unwrap();
            if pending.contains_key(&correlation_id) {
                warn!(session = %self.session_id, correlation_id, "duplicate correlation id");
                return SubmitOutcome::Dropped;
            }
            pending.insert(
                correlation_id,
                PendingCall {
                    correlation_id,
                    deadline: Instant::now() + self.config.call_deadline(),
                },
            );
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = ToolRequest {
            session_id: self.session_id,
            operation: operation.clone(),
            args,
            reply: reply_tx,
        };
        if self.tool_tx.try_send(request).is_err() {
            self.pending.lock().unwrap().remove(&correlation_id);
            let err = CoreError::Tool("tool collaborator unavailable".to_string());
            self.push_call_result(correlation_id, Err(err.clone()));
            return SubmitOutcome::Rejected(err);
        }
        debug!(session = %self.session_id, %operation, correlation_id, "invoke forwarded");

        let deadline = self.config.call_deadline();
        let deadline_ms = self.config.call_deadline_ms;
        let pending = Arc::clone(&self.pending);
        let inbound = self.inbound_tx.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(deadline, reply_rx).await {
                Ok(Ok(Ok(value))) => Ok(value),
                Ok(Ok(Err(message))) => Err(CoreError::Tool(message)),
                Ok(Err(_)) => Err(CoreError::Tool("tool collaborator dropped the call".to_string())),
                Err(_) => Err(CoreError::Timeout { deadline_ms }),
            };
            // Deliver only if the call is still pending; disposal may have
            // already rejected it with Cancelled.
            if pending.lock().unwrap().remove(&correlation_id).is_some() {
                let _ = inbound.send(InboundMessage::CallResult {
                    correlation_id,
                    result,
                });
            }
        });
        SubmitOutcome::Accepted
    }

    fn submit_host_action(&self, envelope: ActionEnvelope) -> SubmitOutcome {
        if !self.bucket.lock().unwrap().try_take() {
            return SubmitOutcome::Rejected(self.rate_limited());
        }
        match envelope {
            ActionEnvelope::SubmitText { text } => self.host.on_submit_text(self.session_id, &text),
            ActionEnvelope::Notify { message } => self.host.on_notify(self.session_id, &message),
            ActionEnvelope::Navigate { url } => self.host.on_navigate(self.session_id, &url),
            ActionEnvelope::Invoke { .. } => unreachable!("invoke routed separately"),
        }
        SubmitOutcome::Accepted
    }

    fn rate_limited(&self) -> CoreError {
        warn!(session = %self.session_id, "rate limit exceeded");
        CoreError::RateLimited {
            max: self.config.max_calls_per_minute,
            window_secs: 60,
        }
    }

    fn push_call_result(&self, correlation_id: u64, result: Result<Value, CoreError>) {
        let _ = self.inbound_tx.send(InboundMessage::CallResult {
            correlation_id,
            result,
        });
    }

    /// Synchronously reject every outstanding call with `Cancelled`. Called
    /// exactly once, on session disposal or fatal error.
    pub fn dispose(&self) {
        let drained: Vec<u64> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain().map(|(id, _)| id).collect()
        };
        for correlation_id in drained {
            self.push_call_result(correlation_id, Err(CoreError::Cancelled));
        }
    }
}
