//! Per-session state: one rendering session per delivered resource, owning
//! its guard, channel, and (for scripted programs) the executor/reconciler
//! pipeline. Sessions never share registries; everything here dies with
//! the session.

use crate::channel::ActionChannel;
use crate::error::{CoreError, CoreResult};
use crate::executor::{ExecutorConfig, ScriptExecutor};
use crate::guard::{CapabilityGuard, GuardConfig, HostActions, ToolRequest};
use crate::protocol::{ActionEnvelope, InboundMessage, Operation, SubmitOutcome};
use crate::reconciler::TreeReconciler;
use crate::resource::{ContentType, UiResource};
use crate::surface::SurfaceSpec;
use crate::bridge::EventDispatchBridge;
use glasspane_ui::{ElementKind, NativeNode};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Executing,
    Live,
    Disposed,
    Errored,
}

impl SessionState {
    /// The full transition table. No transition skips `Initializing`;
    /// `Disposed` and `Errored` are terminal.
    pub fn can_transition(from: SessionState, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (from, to),
            (Uninitialized, Initializing)
                | (Initializing, Executing)
                | (Executing, Live)
                | (Initializing, Errored)
                | (Executing, Errored)
                | (Live, Errored)
                | (Initializing, Disposed)
                | (Executing, Disposed)
                | (Live, Disposed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Disposed | SessionState::Errored)
    }
}

/// Friendly failure display: short reason by default, full technical
/// detail on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackPanel {
    pub uri: String,
    pub reason: String,
    pub detail: String,
}

impl FallbackPanel {
    pub fn new(uri: impl Into<String>, error: &CoreError, detail: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            reason: error.to_string(),
            detail: detail.into(),
        }
    }

    /// Project the panel through the same whitelisted vocabulary as any
    /// other content. The detail node ships hidden.
    pub fn to_native(&self) -> NativeNode {
        let mut panel = NativeNode::new(ElementKind::Div);
        panel
            .props
            .insert("class".to_string(), Value::String("glasspane-fallback".to_string()));
        panel
            .children
            .push(NativeNode::with_text(ElementKind::Strong, "Content unavailable"));
        panel.children.push(NativeNode::with_text(
            ElementKind::P,
            format!("Resource: {}", self.uri),
        ));
        panel
            .children
            .push(NativeNode::with_text(ElementKind::P, self.reason.clone()));
        let mut detail = NativeNode::with_text(ElementKind::Pre, self.detail.clone());
        detail.props.insert("hidden".to_string(), Value::Bool(true));
        panel.children.push(detail);
        panel
    }
}

/// Executor + reconciler, present only for scripted-program sessions.
struct ScriptPipeline {
    executor: ScriptExecutor,
    reconciler: TreeReconciler,
}

pub struct RenderSession {
    id: Uuid,
    resource: UiResource,
    spec: SurfaceSpec,
    state: SessionState,
    guard: Arc<CapabilityGuard>,
    channel: ActionChannel,
    inbound_rx: mpsc::UnboundedReceiver<InboundMessage>,
    bridge: EventDispatchBridge,
    pipeline: Option<ScriptPipeline>,
    fallback: Option<FallbackPanel>,
}

impl RenderSession {
    /// Build the session scaffolding in `Uninitialized`; `start` runs it.
    pub fn create(
        resource: UiResource,
        spec: SurfaceSpec,
        guard_config: GuardConfig,
        exec_config: ExecutorConfig,
        tool_tx: mpsc::Sender<ToolRequest>,
        host: Arc<dyn HostActions>,
    ) -> CoreResult<Self> {
        let id = Uuid::new_v4();
        let token = Uuid::new_v4();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        // The allowlist is copied here, at session start, and never read
        // again from provider-influenced state.
        let allowlist: HashSet<String> = resource.capabilities.iter().cloned().collect();
        let guard = Arc::new(CapabilityGuard::new(
            id,
            token,
            allowlist,
            guard_config,
            tool_tx,
            inbound_tx.clone(),
            host,
        ));
        let channel = ActionChannel::new(Arc::clone(&guard), token);
        let bridge = EventDispatchBridge::new(inbound_tx);
        let pipeline = if spec.mode == ContentType::ScriptedProgram {
            Some(ScriptPipeline {
                executor: ScriptExecutor::new(exec_config)?,
                reconciler: TreeReconciler::new(),
            })
        } else {
            None
        };
        Ok(Self {
            id,
            resource,
            spec,
            state: SessionState::Uninitialized,
            guard,
            channel,
            inbound_rx,
            bridge,
            pipeline,
            fallback: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn surface_spec(&self) -> &SurfaceSpec {
        &self.spec
    }

    pub fn resource(&self) -> &UiResource {
        &self.resource
    }

    pub fn fallback(&self) -> Option<&FallbackPanel> {
        self.fallback.as_ref()
    }

    pub fn outstanding_calls(&self) -> usize {
        self.guard.outstanding_calls()
    }

    /// The provenance token this session's surface stamps on envelopes.
    /// Held by the surface, never exposed to provider content.
    pub fn provenance_token(&self) -> Uuid {
        self.channel.token()
    }

    /// Run the session up to `Live`. For scripted programs this executes
    /// the provider program and applies its first operation batch.
    pub fn start(&mut self) -> CoreResult<()> {
        self.transition(SessionState::Initializing);
        self.transition(SessionState::Executing);
        let run_result = match &self.pipeline {
            Some(pipeline) => pipeline.executor.run_program(&self.resource.payload),
            None => Ok(()),
        };
        if let Err(e) = run_result {
            self.fail(e.clone());
            return Err(e);
        }
        self.flush_operations();
        if self.state == SessionState::Executing {
            self.transition(SessionState::Live);
        }
        self.pump();
        Ok(())
    }

    /// Fail before any execution: the session enters `Initializing` and
    /// terminates there. Used when the resource cannot be classified.
    pub fn initialize_failed(&mut self, err: CoreError) {
        self.transition(SessionState::Initializing);
        self.fail(err);
    }

    /// Mark the session failed: fallback panel, pending calls rejected,
    /// execution context terminated. Never re-throws into the host.
    pub fn fail(&mut self, err: CoreError) {
        error!(session = %self.id, %err, "session failed");
        let detail = self
            .pipeline
            .as_ref()
            .map(|p| p.executor.console())
            .unwrap_or_default();
        self.fallback = Some(FallbackPanel::new(&self.resource.uri, &err, detail));
        self.transition(SessionState::Errored);
        self.guard.dispose();
        self.drain_inbound();
        self.pipeline = None;
    }

    /// Process queued inbound messages and flush any operations they
    /// produced. Messages a scripted pipeline consumes internally are not
    /// returned; for markup/external surfaces all messages are returned so
    /// the surface can relay them.
    pub fn pump(&mut self) -> Vec<InboundMessage> {
        if self.state.is_terminal() {
            // Late messages from a terminated session are dropped on arrival.
            self.drain_inbound();
            return Vec::new();
        }
        let mut passthrough = Vec::new();
        let mut failure: Option<CoreError> = None;
        while let Ok(message) = self.inbound_rx.try_recv() {
            match (&self.pipeline, message) {
                (Some(pipeline), InboundMessage::CallResult { correlation_id, result }) => {
                    if let Err(e) = pipeline.executor.deliver_call_result(correlation_id, &result)
                    {
                        failure = Some(e);
                        break;
                    }
                }
                (Some(pipeline), InboundMessage::Event { handler_id, payload }) => {
                    match pipeline.executor.dispatch_event(handler_id, &payload) {
                        Ok(_) => {}
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                (None, message) => passthrough.push(message),
            }
            self.flush_operations();
        }
        if let Some(e) = failure {
            self.fail(e);
        }
        passthrough
    }

    /// Route a native interaction through the event dispatch bridge.
    pub fn dispatch_native_event(&mut self, element_id: u64, event: &str, payload: Value) -> bool {
        if self.state != SessionState::Live {
            return false;
        }
        let Some(pipeline) = &self.pipeline else {
            return false;
        };
        let sent = self
            .bridge
            .dispatch(&pipeline.reconciler, element_id, event, payload);
        if sent {
            self.pump();
        }
        sent
    }

    /// Submit an envelope on behalf of this session's surface. The token
    /// is the caller's proof of provenance.
    pub fn submit_action(&mut self, envelope: ActionEnvelope, token: Uuid) -> SubmitOutcome {
        if self.state.is_terminal() {
            return SubmitOutcome::Dropped;
        }
        let outcome = self.guard.submit(envelope, token);
        // Markup and external surfaces keep their inbound messages for the
        // caller's next pump; only a script pipeline consumes them here.
        if self.pipeline.is_some() {
            self.pump();
        }
        outcome
    }

    /// Current native projection: the reconciled tree for scripted
    /// sessions, the fallback panel after a failure, nothing for surfaces
    /// that render their payload directly.
    pub fn project(&self) -> Option<NativeNode> {
        if let Some(fallback) = &self.fallback {
            return Some(fallback.to_native());
        }
        self.pipeline.as_ref().map(|p| p.reconciler.project())
    }

    /// Change-gated projection: `Some` only when the reconciled tree
    /// changed since the last take. Hosts poll this after pumping instead
    /// of re-rendering unconditionally.
    pub fn take_projection(&mut self) -> Option<NativeNode> {
        let pipeline = self.pipeline.as_mut()?;
        if pipeline.reconciler.take_dirty() {
            Some(pipeline.reconciler.project())
        } else {
            None
        }
    }

    pub fn element_count(&self) -> Option<usize> {
        self.pipeline.as_ref().map(|p| p.reconciler.element_count())
    }

    /// Dispose the session: terminate the execution context and reject all
    /// outstanding calls with `Cancelled`, synchronously.
    pub fn dispose(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.transition(SessionState::Disposed);
        self.guard.dispose();
        self.drain_inbound();
        self.pipeline = None;
        debug!(session = %self.id, "session disposed");
    }

    /// Drain one emitted batch through the guard (host calls) and the
    /// reconciler (tree operations). One drain is the re-render boundary.
    fn flush_operations(&mut self) {
        let ops = match &self.pipeline {
            Some(pipeline) => pipeline.executor.drain_operations(),
            None => return,
        };
        if ops.is_empty() {
            return;
        }
        let mut tree_ops = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                Operation::InvokeHost {
                    operation,
                    args,
                    correlation_id,
                } => {
                    self.channel.submit(ActionEnvelope::Invoke {
                        operation,
                        args,
                        correlation_id,
                    });
                }
                other => tree_ops.push(other),
            }
        }
        if let Some(pipeline) = self.pipeline.as_mut() {
            let released = pipeline.reconciler.apply_batch(&tree_ops);
            for handler_id in released {
                pipeline.executor.remove_handler(handler_id);
            }
        }
    }

    fn drain_inbound(&mut self) {
        while self.inbound_rx.try_recv().is_ok() {}
    }

    fn transition(&mut self, next: SessionState) {
        if SessionState::can_transition(self.state, next) {
            debug!(session = %self.id, from = ?self.state, to = ?next, "state transition");
            self.state = next;
        } else {
            warn!(session = %self.id, from = ?self.state, to = ?next, "illegal state transition ignored");
        }
    }
}
