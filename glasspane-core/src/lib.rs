//! Core rendering pipeline for untrusted provider content.
//!
//! Providers deliver [`resource::UiResource`]s in one of three modes:
//! sanitized markup, an external reference rendered in its own origin
//! scope, or a scripted program. Programs run inside an isolated
//! [`executor::ScriptExecutor`] with a fixed builder API and no host
//! reach; everything they do crosses the boundary as serialized
//! [`protocol::Operation`]s, validated by the [`reconciler`], and every
//! outbound request passes the per-session [`guard::CapabilityGuard`].
//! The [`surface::SurfaceManager`] ties one session to one surface.

pub mod bridge;
pub mod channel;
pub mod classifier;
pub mod error;
pub mod executor;
pub mod guard;
pub mod protocol;
pub mod rate;
pub mod reconciler;
pub mod resource;
pub mod session;
pub mod surface;

pub use bridge::EventDispatchBridge;
pub use channel::ActionChannel;
pub use classifier::classify;
pub use error::{CoreError, CoreResult};
pub use executor::{ExecutorConfig, ScriptExecutor};
pub use guard::{CapabilityGuard, GuardConfig, HostActions, NoopHostActions, ToolRequest};
pub use protocol::{ActionEnvelope, InboundMessage, Operation, SubmitOutcome};
pub use reconciler::{TreeReconciler, ROOT_ELEMENT_ID};
pub use resource::{ContentType, RenderHints, UiResource};
pub use session::{FallbackPanel, RenderSession, SessionState};
pub use surface::{SurfaceManager, SurfaceSpec};
