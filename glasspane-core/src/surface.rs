//! Surface manager: owns every live rendering session, keyed by session
//! id. One isolated surface per delivered resource; surfaces are never
//! pooled or reused across resources.

use crate::classifier::classify;
use crate::error::CoreResult;
use crate::executor::ExecutorConfig;
use crate::guard::{GuardConfig, HostActions, NoopHostActions, ToolRequest};
use crate::protocol::{ActionEnvelope, InboundMessage, SubmitOutcome};
use crate::resource::{ContentType, UiResource};
use crate::session::{FallbackPanel, RenderSession, SessionState};
use dashmap::DashMap;
use glasspane_ui::NativeNode;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Isolation posture for one rendering surface, derived from the
/// resource's content type at classification time and fixed thereafter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceSpec {
    pub mode: ContentType,
    /// Whether the surface itself may run embedded scripts. Scripted
    /// programs run in the executor instead, so their surface stays inert.
    pub allow_scripts: bool,
    pub storage_access: bool,
    /// Same-origin scope for external references; `None` everywhere else.
    pub allowed_origin: Option<String>,
    pub block_navigation: bool,
    pub block_popups: bool,
}

pub struct SurfaceManager {
    sessions: DashMap<Uuid, RenderSession>,
    tool_tx: mpsc::Sender<ToolRequest>,
    host: Arc<dyn HostActions>,
    guard_config: GuardConfig,
    exec_config: ExecutorConfig,
}

impl SurfaceManager {
    pub fn new(tool_tx: mpsc::Sender<ToolRequest>) -> Self {
        Self::with_configs(
            tool_tx,
            Arc::new(NoopHostActions),
            GuardConfig::default(),
            ExecutorConfig::default(),
        )
    }

    pub fn with_configs(
        tool_tx: mpsc::Sender<ToolRequest>,
        host: Arc<dyn HostActions>,
        guard_config: GuardConfig,
        exec_config: ExecutorConfig,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            tool_tx,
            host,
            guard_config,
            exec_config,
        }
    }

    /// Open a surface for a delivered resource and run its session up to
    /// `Live`. A resource the classifier rejects, or a program that faults
    /// during startup, still yields a session id: the session lands in
    /// `Errored` with a fallback panel instead of surfacing raw provider
    /// content. Only a failure to build the isolation context errors out.
    pub fn open(&self, resource: UiResource) -> CoreResult<Uuid> {
        let (spec, classify_err) = match classify(&resource) {
            Ok(spec) => (spec, None),
            Err(e) => (
                SurfaceSpec {
                    mode: ContentType::Unknown,
                    allow_scripts: false,
                    storage_access: false,
                    allowed_origin: None,
                    block_navigation: true,
                    block_popups: true,
                },
                Some(e),
            ),
        };
        let mut session = RenderSession::create(
            resource,
            spec,
            self.guard_config.clone(),
            self.exec_config.clone(),
            self.tool_tx.clone(),
            Arc::clone(&self.host),
        )?;
        let id = session.id();
        match classify_err {
            // An unclassifiable resource never executes: it fails straight
            // out of Initializing.
            Some(e) => session.initialize_failed(e),
            // A startup fault is already captured as the session's
            // fallback panel; the surface stays queryable.
            None => {
                let _ = session.start();
            }
        }
        info!(session = %id, state = ?session.state(), "surface opened");
        self.sessions.insert(id, session);
        Ok(id)
    }

    pub fn state(&self, id: Uuid) -> Option<SessionState> {
        self.sessions.get(&id).map(|s| s.state())
    }

    pub fn surface_spec(&self, id: Uuid) -> Option<SurfaceSpec> {
        self.sessions.get(&id).map(|s| s.surface_spec().clone())
    }

    pub fn fallback(&self, id: Uuid) -> Option<FallbackPanel> {
        self.sessions.get(&id).and_then(|s| s.fallback().cloned())
    }

    pub fn provenance_token(&self, id: Uuid) -> Option<Uuid> {
        self.sessions.get(&id).map(|s| s.provenance_token())
    }

    pub fn outstanding_calls(&self, id: Uuid) -> usize {
        self.sessions.get(&id).map(|s| s.outstanding_calls()).unwrap_or(0)
    }

    /// Drain inbound messages for one session. Messages the session's own
    /// pipeline does not consume come back to the caller.
    pub fn pump(&self, id: Uuid) -> Vec<InboundMessage> {
        match self.sessions.get_mut(&id) {
            Some(mut session) => session.pump(),
            None => Vec::new(),
        }
    }

    pub fn project(&self, id: Uuid) -> Option<NativeNode> {
        self.sessions.get(&id).and_then(|s| s.project())
    }

    /// Change-gated variant of `project`: `None` when the tree has not
    /// changed since the last take.
    pub fn take_projection(&self, id: Uuid) -> Option<NativeNode> {
        self.sessions
            .get_mut(&id)
            .and_then(|mut s| s.take_projection())
    }

    pub fn dispatch_event(&self, id: Uuid, element_id: u64, event: &str, payload: Value) -> bool {
        match self.sessions.get_mut(&id) {
            Some(mut session) => session.dispatch_native_event(element_id, event, payload),
            None => false,
        }
    }

    pub fn submit_action(&self, id: Uuid, envelope: ActionEnvelope, token: Uuid) -> SubmitOutcome {
        match self.sessions.get_mut(&id) {
            Some(mut session) => session.submit_action(envelope, token),
            None => SubmitOutcome::Dropped,
        }
    }

    /// Dispose the session in place. The entry stays queryable in its
    /// terminal state until `close` removes it.
    pub fn dispose(&self, id: Uuid) {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.dispose();
        }
    }

    /// Dispose and remove. Idempotent.
    pub fn close(&self, id: Uuid) {
        if let Some((_, mut session)) = self.sessions.remove(&id) {
            session.dispose();
            info!(session = %id, "surface closed");
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;

    fn manager() -> SurfaceManager {
        let (tool_tx, _tool_rx) = mpsc::channel(8);
        SurfaceManager::new(tool_tx)
    }

    #[test]
    fn test_markup_surface_goes_live() {
        let manager = manager();
        let id = manager
            .open(UiResource::new("ui://a", ContentType::Markup, "<p>hi</p>"))
            .unwrap();
        assert_eq!(manager.state(id), Some(SessionState::Live));
        let spec = manager.surface_spec(id).unwrap();
        assert!(!spec.storage_access);
        assert!(spec.block_navigation);
    }

    #[test]
    fn test_unknown_content_type_yields_fallback_session() {
        let manager = manager();
        let id = manager
            .open(UiResource::new("ui://b", ContentType::Unknown, ""))
            .unwrap();
        assert_eq!(manager.state(id), Some(SessionState::Errored));
        let fallback = manager.fallback(id).unwrap();
        assert!(fallback.reason.contains("Unsupported content type"));
    }

    #[test]
    fn test_dispose_keeps_entry_close_removes_it() {
        let manager = manager();
        let id = manager
            .open(UiResource::new("ui://c", ContentType::Markup, ""))
            .unwrap();
        manager.dispose(id);
        assert_eq!(manager.state(id), Some(SessionState::Disposed));
        assert_eq!(manager.session_count(), 1);
        manager.close(id);
        assert_eq!(manager.state(id), None);
        assert_eq!(manager.session_count(), 0);
        // Idempotent.
        manager.close(id);
    }

    #[tokio::test]
    async fn test_take_projection_reports_changes_once() {
        let manager = manager();
        let program = r#"
            local el = ui.create("p")
            ui.set_text(el, "once")
            ui.append(ui.root(), el)
        "#;
        let id = manager
            .open(UiResource::new(
                "ui://e",
                ContentType::ScriptedProgram,
                program,
            ))
            .unwrap();
        let tree = manager.take_projection(id).unwrap();
        assert_eq!(tree.children[0].text.as_deref(), Some("once"));
        // Nothing changed since, so there is nothing to re-render.
        assert_eq!(manager.take_projection(id), None);
    }

    #[tokio::test]
    async fn test_scripted_surface_projects_its_tree() {
        let manager = manager();
        let program = r#"
            local el = ui.create("p")
            ui.set_text(el, "hello")
            ui.append(ui.root(), el)
        "#;
        let id = manager
            .open(UiResource::new(
                "ui://d",
                ContentType::ScriptedProgram,
                program,
            ))
            .unwrap();
        assert_eq!(manager.state(id), Some(SessionState::Live));
        let tree = manager.project(id).unwrap();
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].text.as_deref(), Some("hello"));
    }
}
