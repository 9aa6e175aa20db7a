//! Events content processes emit over a frame's or a worker's channel.
//!
//! Ids in here are process local, the frame they arrived on turns them into
//! the externally visible [`ProtocolEvent`](crate::protocol::ProtocolEvent)s.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use frameoxide_types::EventMessage;

use crate::protocol::{ConsoleLocation, ExecutionContextId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextCreated {
    pub execution_context_id: ExecutionContextId,
    #[serde(default)]
    pub aux_data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDestroyed {
    pub execution_context_id: ExecutionContextId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleCalled {
    pub execution_context_id: ExecutionContextId,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub location: ConsoleLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStarted {
    /// Local id of the worker, unique within the content process
    pub worker_id: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStopped {
    pub worker_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingCall {
    pub execution_context_id: ExecutionContextId,
    pub name: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEvent {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageError {
    pub message: String,
    #[serde(default)]
    pub stack: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerDispatch {
    pub message: String,
}

/// Events received on a frame's channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ContentEvent {
    #[serde(rename = "Runtime.executionContextCreated")]
    ExecutionContextCreated(ContextCreated),
    #[serde(rename = "Runtime.executionContextDestroyed")]
    ExecutionContextDestroyed(ContextDestroyed),
    #[serde(rename = "Runtime.console")]
    Console(ConsoleCalled),
    #[serde(rename = "Page.workerCreated")]
    WorkerCreated(WorkerStarted),
    #[serde(rename = "Page.workerDestroyed")]
    WorkerDestroyed(WorkerStopped),
    #[serde(rename = "Page.bindingCalled")]
    BindingCalled(BindingCall),
    #[serde(rename = "Page.eventFired")]
    EventFired(DocumentEvent),
    #[serde(rename = "Page.uncaughtError")]
    UncaughtError(PageError),
}

/// Events received on a worker's channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum WorkerEvent {
    #[serde(rename = "Runtime.executionContextCreated")]
    ExecutionContextCreated(ContextCreated),
    #[serde(rename = "Runtime.executionContextDestroyed")]
    ExecutionContextDestroyed(ContextDestroyed),
    #[serde(rename = "Runtime.console")]
    Console(ConsoleCalled),
    #[serde(rename = "Worker.dispatch")]
    Dispatch(WorkerDispatch),
}

fn decode<T: serde::de::DeserializeOwned>(event: EventMessage) -> serde_json::Result<T> {
    serde_json::from_value(json!({
        "method": event.method,
        "params": event.params,
    }))
}

impl ContentEvent {
    /// Decodes a raw event, fails for methods this crate does not know about
    pub fn decode(event: EventMessage) -> serde_json::Result<Self> {
        decode(event)
    }
}

impl WorkerEvent {
    pub fn decode(event: EventMessage) -> serde_json::Result<Self> {
        decode(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_content_events() {
        let ev = EventMessage::new(
            "runtime",
            "Runtime.executionContextCreated",
            json!({"executionContextId": "7", "auxData": {"name": ""}}),
        );
        assert_eq!(
            ContentEvent::decode(ev).unwrap(),
            ContentEvent::ExecutionContextCreated(ContextCreated {
                execution_context_id: ExecutionContextId::new("7"),
                aux_data: json!({"name": ""}),
            })
        );

        let ev = EventMessage::new("page", "Page.eventFired", json!({"name": "load"}));
        assert_eq!(
            ContentEvent::decode(ev).unwrap(),
            ContentEvent::EventFired(DocumentEvent {
                name: "load".to_string()
            })
        );

        let unknown = EventMessage::new("page", "Page.somethingNew", json!({}));
        assert!(ContentEvent::decode(unknown).is_err());
    }

    #[test]
    fn decode_worker_dispatch() {
        let ev = EventMessage::new("worker", "Worker.dispatch", json!({"message": "{}"}));
        assert_eq!(
            WorkerEvent::decode(ev).unwrap(),
            WorkerEvent::Dispatch(WorkerDispatch {
                message: "{}".to_string()
            })
        );
    }
}
