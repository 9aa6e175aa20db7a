use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use frameoxide_types::{Command, Method};

use crate::protocol::{FrameId, GlobalId, NavigationId, WorkerId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameAttached {
    pub frame_id: FrameId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_frame_id: Option<FrameId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrameDetached {
    pub frame_id: FrameId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNavigationStarted {
    pub frame_id: FrameId,
    pub navigation_id: NavigationId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNavigationCommitted {
    pub frame_id: FrameId,
    pub navigation_id: NavigationId,
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNavigationAborted {
    pub frame_id: FrameId,
    pub navigation_id: NavigationId,
    pub error_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSameDocumentNavigation {
    pub frame_id: FrameId,
    pub url: String,
}

/// `DOMContentLoaded` and `load` of a frame's document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEventFired {
    pub frame_id: FrameId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUncaughtError {
    pub frame_id: FrameId,
    pub message: String,
    #[serde(default)]
    pub stack: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBindingCalled {
    pub execution_context_id: GlobalId,
    pub name: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWorkerCreated {
    pub frame_id: FrameId,
    pub worker_id: WorkerId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventWorkerDestroyed {
    pub worker_id: WorkerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDispatchMessageFromWorker {
    pub worker_id: WorkerId,
    pub message: String,
}

/// A script that is evaluated in every new document of every frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitScript {
    pub script: String,
    /// Evaluate in an isolated world with this name instead of the main world
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_name: Option<String>,
}

impl InitScript {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            world_name: None,
        }
    }

    pub fn in_world(mut self, world_name: impl Into<String>) -> Self {
        self.world_name = Some(world_name.into());
        self
    }
}

impl From<String> for InitScript {
    fn from(script: String) -> Self {
        InitScript::new(script)
    }
}

impl From<&str> for InitScript {
    fn from(script: &str) -> Self {
        InitScript::new(script)
    }
}

/// A function exposed to the page; calls are reported via `Page.bindingCalled`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_name: Option<String>,
}

/// Navigates a frame to the given url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    pub frame_id: FrameId,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
}

impl NavigateParams {
    pub fn new(frame_id: impl Into<FrameId>, url: impl Into<String>) -> Self {
        Self {
            frame_id: frame_id.into(),
            url: url.into(),
            referer: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }
}

/// The navigation a navigation command kicked off.
///
/// Both fields are `None` if the command did not result in a new document,
/// like going back with an empty history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateReturns {
    #[serde(default)]
    pub navigation_id: Option<NavigationId>,
    #[serde(default, rename = "navigationURL")]
    pub navigation_url: Option<String>,
}

macro_rules! frame_navigation {
    ($(#[$attr:meta])* $name:ident, $method:literal) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub frame_id: FrameId,
        }

        impl $name {
            pub fn new(frame_id: impl Into<FrameId>) -> Self {
                Self {
                    frame_id: frame_id.into(),
                }
            }
        }

        impl Method for $name {
            fn identifier(&self) -> Cow<'static, str> {
                $method.into()
            }
        }

        impl Command for $name {
            type Response = NavigateReturns;
        }
    };
}

frame_navigation!(
    /// Navigates the frame back in its history
    GoBackParams,
    "Page.goBack"
);
frame_navigation!(
    /// Navigates the frame forward in its history
    GoForwardParams,
    "Page.goForward"
);
frame_navigation!(ReloadParams, "Page.reload");

impl Method for NavigateParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Page.navigate".into()
    }
}

impl Command for NavigateParams {
    type Response = NavigateReturns;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageToWorkerParams {
    pub frame_id: FrameId,
    pub worker_id: WorkerId,
    pub message: String,
}

impl SendMessageToWorkerParams {
    pub fn new(
        frame_id: impl Into<FrameId>,
        worker_id: impl Into<WorkerId>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            frame_id: frame_id.into(),
            worker_id: worker_id.into(),
            message: message.into(),
        }
    }
}

impl Method for SendMessageToWorkerParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Page.sendMessageToWorker".into()
    }
}

impl Command for SendMessageToWorkerParams {
    type Response = SendMessageToWorkerReturns;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageToWorkerReturns {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBindingParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_name: Option<String>,
}

impl AddBindingParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: None,
            world_name: None,
        }
    }
}

impl From<AddBindingParams> for Binding {
    fn from(params: AddBindingParams) -> Self {
        Binding {
            name: params.name,
            script: params.script,
            world_name: params.world_name,
        }
    }
}

impl Method for AddBindingParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Page.addBinding".into()
    }
}

impl Command for AddBindingParams {
    type Response = AddBindingReturns;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBindingReturns {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetInitScriptsParams {
    pub scripts: Vec<InitScript>,
}

impl SetInitScriptsParams {
    pub fn new<I, S>(scripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<InitScript>,
    {
        Self {
            scripts: scripts.into_iter().map(Into::into).collect(),
        }
    }
}

impl Method for SetInitScriptsParams {
    fn identifier(&self) -> Cow<'static, str> {
        "Page.setInitScripts".into()
    }
}

impl Command for SetInitScriptsParams {
    type Response = SetInitScriptsReturns;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetInitScriptsReturns {}
