//! Wire shapes exchanged between a rendering surface / execution context
//! and the host. One canonical envelope covers every content mode.

use crate::error::CoreError;
use glasspane_ui::Props;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound request from rendered content to the host. `correlation_id`
/// is present only on calls expecting a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionEnvelope {
    Invoke {
        operation: String,
        args: Value,
        correlation_id: u64,
    },
    SubmitText {
        text: String,
    },
    Notify {
        message: String,
    },
    Navigate {
        url: String,
    },
}

/// One serialized builder-API call, emitted by the execution context and
/// consumed by the reconciler in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Create {
        id: u64,
        kind: String,
        props: Props,
    },
    SetAttribute {
        id: u64,
        key: String,
        value: Value,
    },
    AppendChild {
        parent: u64,
        child: u64,
    },
    RemoveChild {
        parent: u64,
        child: u64,
    },
    SetText {
        id: u64,
        text: String,
    },
    AddEventListener {
        id: u64,
        event: String,
        handler_id: u64,
    },
    InvokeHost {
        operation: String,
        args: Value,
        correlation_id: u64,
    },
}

/// Host-to-context message. Carries handler ids and structured payloads
/// only, never executable code.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Resolution of an earlier `invoke`, matched by correlation id.
    CallResult {
        correlation_id: u64,
        result: Result<Value, CoreError>,
    },
    /// A native interaction routed through the event dispatch bridge.
    Event { handler_id: u64, payload: Value },
}

/// Result of submitting an envelope to the capability guard.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted,
    /// Bad provenance or malformed shape: logged, never processed.
    Dropped,
    /// Checked and refused; the caller sees the reason.
    Rejected(CoreError),
}
