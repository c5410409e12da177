//! Event dispatch bridge: turns native UI interactions into handler-id
//! messages sent back into the execution context. No function reference
//! ever crosses the boundary; a stale element or handler means the event
//! is silently dropped.

use crate::protocol::InboundMessage;
use crate::reconciler::TreeReconciler;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

pub struct EventDispatchBridge {
    inbound_tx: mpsc::UnboundedSender<InboundMessage>,
}

impl EventDispatchBridge {
    pub fn new(inbound_tx: mpsc::UnboundedSender<InboundMessage>) -> Self {
        Self { inbound_tx }
    }

    /// Route one native interaction. Returns false when no live handler is
    /// registered for the element/event pair.
    pub fn dispatch(
        &self,
        reconciler: &TreeReconciler,
        element_id: u64,
        event: &str,
        payload: Value,
    ) -> bool {
        let Some(handler_id) = reconciler.handler_for(element_id, event) else {
            trace!(element_id, event, "no handler registered; event dropped");
            return false;
        };
        self.inbound_tx
            .send(InboundMessage::Event {
                handler_id,
                payload,
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Operation;
    use crate::reconciler::ROOT_ELEMENT_ID;
    use glasspane_ui::Props;
    use serde_json::json;

    fn wired_reconciler() -> TreeReconciler {
        let mut reconciler = TreeReconciler::new();
        reconciler.apply_batch(&[
            Operation::Create {
                id: 1,
                kind: "button".to_string(),
                props: Props::new(),
            },
            Operation::AppendChild {
                parent: ROOT_ELEMENT_ID,
                child: 1,
            },
            Operation::AddEventListener {
                id: 1,
                event: "click".to_string(),
                handler_id: 4,
            },
        ]);
        reconciler
    }

    #[test]
    fn test_dispatch_sends_handler_id_only() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let bridge = EventDispatchBridge::new(tx);
        let reconciler = wired_reconciler();
        assert!(bridge.dispatch(&reconciler, 1, "click", json!({"x": 1})));
        match rx.try_recv().unwrap() {
            InboundMessage::Event {
                handler_id,
                payload,
            } => {
                assert_eq!(handler_id, 4);
                assert_eq!(payload, json!({"x": 1}));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_stale_events_are_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let bridge = EventDispatchBridge::new(tx);
        let reconciler = wired_reconciler();
        assert!(!bridge.dispatch(&reconciler, 1, "change", json!(null)));
        assert!(!bridge.dispatch(&reconciler, 99, "click", json!(null)));
        assert!(rx.try_recv().is_err());
    }
}
