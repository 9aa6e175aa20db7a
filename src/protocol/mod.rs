//! The types exchanged with protocol clients and with content processes.
//!
//! Identifiers are thin newtypes around their wire representation and
//! (de)serialize transparently.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FrameError, Result};

pub mod content;
pub mod notification;
pub mod page;
pub mod runtime;

pub use content::{ContentEvent, WorkerEvent};
pub use notification::{AttachReason, DiscardReason, NavigationNotification, StructuralNotification};
pub use page::*;
pub use runtime::*;

macro_rules! string_id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn inner(&self) -> &String {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

macro_rules! numeric_id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Shared by all content units of one tab.
    BrowserId
);
numeric_id!(
    /// Process assigned identifier of a single content unit.
    ContentUnitId
);

string_id!(
    /// The stable, externally visible identifier of a frame.
    ///
    /// Assigned once per frame and never reused within a tab, it survives
    /// the frame being taken over by another content process.
    FrameId
);
string_id!(NavigationId);
string_id!(
    /// Process local identifier of an execution context or worker, only
    /// unique within the content process that created it.
    ExecutionContextId
);
string_id!(
    /// Externally visible identifier of an execution context, composed of the
    /// owning frame's id and the process local id.
    GlobalId
);
string_id!(
    /// Externally visible identifier of a dedicated worker, composed like
    /// [`GlobalId`].
    WorkerId
);

/// Separates the frame id from the local id in composed identifiers.
pub const GLOBAL_ID_SEPARATOR: char = '/';

impl FrameId {
    /// Frame ids that contain the separator can not be composed into global ids
    pub fn is_composable(&self) -> bool {
        !self.0.contains(GLOBAL_ID_SEPARATOR)
    }
}

fn compose(frame_id: &FrameId, local: &str) -> Result<String> {
    if !frame_id.is_composable() {
        return Err(FrameError::InvalidId(frame_id.to_string()));
    }
    Ok(format!("{}{}{}", frame_id, GLOBAL_ID_SEPARATOR, local))
}

fn decompose(id: &str) -> Option<(FrameId, &str)> {
    id.split_once(GLOBAL_ID_SEPARATOR)
        .map(|(frame, local)| (FrameId::new(frame), local))
}

impl GlobalId {
    /// Composes the global id of the execution context `local` in `frame_id`
    pub fn compose(frame_id: &FrameId, local: &ExecutionContextId) -> Result<Self> {
        compose(frame_id, local.as_ref()).map(Self)
    }

    /// Recovers the `(frame id, local id)` pair this id was composed of
    pub fn decompose(&self) -> Result<(FrameId, ExecutionContextId)> {
        decompose(&self.0)
            .map(|(frame, local)| (frame, ExecutionContextId::new(local)))
            .ok_or_else(|| FrameError::ExecutionContextNotFound(self.clone()))
    }

    /// The frame the execution context lives in
    pub fn frame_id(&self) -> Result<FrameId> {
        self.decompose().map(|(frame, _)| frame)
    }
}

impl WorkerId {
    pub fn compose(frame_id: &FrameId, local: &str) -> Result<Self> {
        compose(frame_id, local).map(Self)
    }

    pub fn decompose(&self) -> Result<(FrameId, String)> {
        decompose(&self.0)
            .map(|(frame, local)| (frame, local.to_string()))
            .ok_or_else(|| FrameError::WorkerNotFound(self.clone()))
    }
}

/// An opaque handle to the live content of one frame.
///
/// Content units are created by content processes, they can be discarded or
/// replaced by a new unit with the same `browser_id` when the tab navigates
/// across process groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUnit {
    pub id: ContentUnitId,
    pub browser_id: BrowserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ContentUnitId>,
}

impl ContentUnit {
    /// A top level unit
    pub fn top_level(id: u64, browser_id: u64) -> Self {
        Self {
            id: ContentUnitId(id),
            browser_id: BrowserId(browser_id),
            parent: None,
        }
    }

    /// A unit nested inside `parent`
    pub fn child_of(id: u64, parent: &ContentUnit) -> Self {
        Self {
            id: ContentUnitId(id),
            browser_id: parent.browser_id,
            parent: Some(parent.id),
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

/// All the events reported to protocol clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum ProtocolEvent {
    #[serde(rename = "Page.frameAttached")]
    FrameAttached(EventFrameAttached),
    #[serde(rename = "Page.frameDetached")]
    FrameDetached(EventFrameDetached),
    #[serde(rename = "Page.navigationStarted")]
    NavigationStarted(EventNavigationStarted),
    #[serde(rename = "Page.navigationCommitted")]
    NavigationCommitted(EventNavigationCommitted),
    #[serde(rename = "Page.navigationAborted")]
    NavigationAborted(EventNavigationAborted),
    #[serde(rename = "Page.sameDocumentNavigation")]
    SameDocumentNavigation(EventSameDocumentNavigation),
    #[serde(rename = "Page.eventFired")]
    EventFired(EventEventFired),
    #[serde(rename = "Page.uncaughtError")]
    UncaughtError(EventUncaughtError),
    #[serde(rename = "Page.bindingCalled")]
    BindingCalled(EventBindingCalled),
    #[serde(rename = "Page.workerCreated")]
    WorkerCreated(EventWorkerCreated),
    #[serde(rename = "Page.workerDestroyed")]
    WorkerDestroyed(EventWorkerDestroyed),
    #[serde(rename = "Page.dispatchMessageFromWorker")]
    DispatchMessageFromWorker(EventDispatchMessageFromWorker),
    #[serde(rename = "Runtime.executionContextCreated")]
    ExecutionContextCreated(EventExecutionContextCreated),
    #[serde(rename = "Runtime.executionContextDestroyed")]
    ExecutionContextDestroyed(EventExecutionContextDestroyed),
    #[serde(rename = "Runtime.console")]
    Console(EventConsole),
    #[serde(rename = "Worker.executionContextCreated")]
    WorkerExecutionContextCreated(EventWorkerExecutionContextCreated),
    #[serde(rename = "Worker.executionContextDestroyed")]
    WorkerExecutionContextDestroyed(EventWorkerExecutionContextDestroyed),
    #[serde(rename = "Worker.console")]
    WorkerConsole(EventWorkerConsole),
}

impl ProtocolEvent {
    /// The protocol method name of this event, like `Page.frameAttached`
    pub fn method(&self) -> &'static str {
        match self {
            ProtocolEvent::FrameAttached(_) => "Page.frameAttached",
            ProtocolEvent::FrameDetached(_) => "Page.frameDetached",
            ProtocolEvent::NavigationStarted(_) => "Page.navigationStarted",
            ProtocolEvent::NavigationCommitted(_) => "Page.navigationCommitted",
            ProtocolEvent::NavigationAborted(_) => "Page.navigationAborted",
            ProtocolEvent::SameDocumentNavigation(_) => "Page.sameDocumentNavigation",
            ProtocolEvent::EventFired(_) => "Page.eventFired",
            ProtocolEvent::UncaughtError(_) => "Page.uncaughtError",
            ProtocolEvent::BindingCalled(_) => "Page.bindingCalled",
            ProtocolEvent::WorkerCreated(_) => "Page.workerCreated",
            ProtocolEvent::WorkerDestroyed(_) => "Page.workerDestroyed",
            ProtocolEvent::DispatchMessageFromWorker(_) => "Page.dispatchMessageFromWorker",
            ProtocolEvent::ExecutionContextCreated(_) => "Runtime.executionContextCreated",
            ProtocolEvent::ExecutionContextDestroyed(_) => "Runtime.executionContextDestroyed",
            ProtocolEvent::Console(_) => "Runtime.console",
            ProtocolEvent::WorkerExecutionContextCreated(_) => "Worker.executionContextCreated",
            ProtocolEvent::WorkerExecutionContextDestroyed(_) => {
                "Worker.executionContextDestroyed"
            }
            ProtocolEvent::WorkerConsole(_) => "Worker.console",
        }
    }

    /// The frame this event is about, if it names one
    pub fn frame_id(&self) -> Option<&FrameId> {
        match self {
            ProtocolEvent::FrameAttached(ev) => Some(&ev.frame_id),
            ProtocolEvent::FrameDetached(ev) => Some(&ev.frame_id),
            ProtocolEvent::NavigationStarted(ev) => Some(&ev.frame_id),
            ProtocolEvent::NavigationCommitted(ev) => Some(&ev.frame_id),
            ProtocolEvent::NavigationAborted(ev) => Some(&ev.frame_id),
            ProtocolEvent::SameDocumentNavigation(ev) => Some(&ev.frame_id),
            ProtocolEvent::EventFired(ev) => Some(&ev.frame_id),
            ProtocolEvent::UncaughtError(ev) => Some(&ev.frame_id),
            ProtocolEvent::WorkerCreated(ev) => Some(&ev.frame_id),
            _ => None,
        }
    }

    /// Serializes the event as `{"method": .., "params": ..}`
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Every command that is routed through the frame tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    #[serde(rename = "Runtime.evaluate")]
    Evaluate(EvaluateParams),
    #[serde(rename = "Runtime.callFunction")]
    CallFunction(CallFunctionParams),
    #[serde(rename = "Runtime.getObjectProperties")]
    GetObjectProperties(GetObjectPropertiesParams),
    #[serde(rename = "Runtime.disposeObject")]
    DisposeObject(DisposeObjectParams),
    #[serde(rename = "Page.navigate")]
    Navigate(NavigateParams),
    #[serde(rename = "Page.goBack")]
    GoBack(GoBackParams),
    #[serde(rename = "Page.goForward")]
    GoForward(GoForwardParams),
    #[serde(rename = "Page.reload")]
    Reload(ReloadParams),
    #[serde(rename = "Page.sendMessageToWorker")]
    SendMessageToWorker(SendMessageToWorkerParams),
    #[serde(rename = "Page.addBinding")]
    AddBinding(AddBindingParams),
    #[serde(rename = "Page.setInitScripts")]
    SetInitScripts(SetInitScriptsParams),
}

macro_rules! page_commands {
    ($($variant:ident($params:ty)),* $(,)?) => {
        $(
            impl From<$params> for PageCommand {
                fn from(params: $params) -> Self {
                    PageCommand::$variant(params)
                }
            }
        )*

        impl PageCommand {
            /// The protocol method name of this command
            pub fn identifier(&self) -> std::borrow::Cow<'static, str> {
                use frameoxide_types::Method;
                match self {
                    $(PageCommand::$variant(params) => params.identifier(),)*
                }
            }
        }
    };
}

page_commands!(
    Evaluate(EvaluateParams),
    CallFunction(CallFunctionParams),
    GetObjectProperties(GetObjectPropertiesParams),
    DisposeObject(DisposeObjectParams),
    Navigate(NavigateParams),
    GoBack(GoBackParams),
    GoForward(GoForwardParams),
    Reload(ReloadParams),
    SendMessageToWorker(SendMessageToWorkerParams),
    AddBinding(AddBindingParams),
    SetInitScripts(SetInitScriptsParams),
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn global_id_round_trip() {
        for (frame, local) in [
            ("frame-1", "1"),
            ("frame-42", "ctx-abc"),
            ("", ""),
            ("x", "with/separator/inside"),
            ("frame-7", "{weird}:id"),
        ] {
            let frame = FrameId::new(frame);
            let local = ExecutionContextId::new(local);
            let global = GlobalId::compose(&frame, &local).unwrap();
            assert_eq!(global.decompose().unwrap(), (frame, local));
        }
    }

    #[test]
    fn reject_frame_ids_with_separator() {
        let frame = FrameId::new("frame/1");
        assert!(!frame.is_composable());
        let err = GlobalId::compose(&frame, &ExecutionContextId::new("1")).unwrap_err();
        assert!(matches!(err, FrameError::InvalidId(_)));
        assert!(WorkerId::compose(&frame, "w").is_err());
    }

    #[test]
    fn unknown_global_id() {
        let err = GlobalId::new("no-separator").decompose().unwrap_err();
        assert!(matches!(err, FrameError::ExecutionContextNotFound(_)));
    }

    #[test]
    fn worker_id_round_trip() {
        let frame = FrameId::new("frame-3");
        let id = WorkerId::compose(&frame, "17").unwrap();
        assert_eq!(id.as_ref(), "frame-3/17");
        assert_eq!(id.decompose().unwrap(), (frame, "17".to_string()));
    }

    #[test]
    fn event_wire_format() {
        let ev = ProtocolEvent::FrameAttached(EventFrameAttached {
            frame_id: FrameId::new("frame-2"),
            parent_frame_id: Some(FrameId::new("frame-1")),
        });
        assert_eq!(
            ev.to_value().unwrap(),
            json!({
                "method": "Page.frameAttached",
                "params": {"frameId": "frame-2", "parentFrameId": "frame-1"}
            })
        );
        assert_eq!(ev.method(), "Page.frameAttached");

        let root = ProtocolEvent::FrameAttached(EventFrameAttached {
            frame_id: FrameId::new("frame-1"),
            parent_frame_id: None,
        });
        assert_eq!(
            root.to_value().unwrap(),
            json!({"method": "Page.frameAttached", "params": {"frameId": "frame-1"}})
        );
    }

    #[test]
    fn decode_command() {
        let cmd: PageCommand = serde_json::from_value(json!({
            "method": "Runtime.evaluate",
            "params": {"executionContextId": "frame-1/3", "expression": "1 + 1"}
        }))
        .unwrap();
        match cmd {
            PageCommand::Evaluate(params) => {
                assert_eq!(params.execution_context_id, GlobalId::new("frame-1/3"));
                assert_eq!(params.return_by_value, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(serde_json::from_value::<PageCommand>(json!({
            "method": "Page.screenshot",
            "params": {}
        }))
        .is_err());
    }
}
