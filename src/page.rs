use futures::channel::mpsc::Sender;
use futures::channel::oneshot::channel as oneshot_channel;
use futures::SinkExt;

use frameoxide_types::{Command, CommandResponse};

use crate::error::{FrameError, Result};
use crate::handler::cmd::to_command_response;
use crate::handler::frame::FrameInfo;
use crate::handler::{CommandFuture, EventStream, HandlerMessage};
use crate::protocol::*;
use crate::utils;

/// A handle to one tab, commands are routed to the frame, execution context
/// or worker they name.
#[derive(Debug, Clone)]
pub struct Page {
    browser_id: BrowserId,
    sender: Sender<HandlerMessage>,
}

impl Page {
    pub(crate) fn new(browser_id: BrowserId, sender: Sender<HandlerMessage>) -> Self {
        Self { browser_id, sender }
    }

    /// The tab this page controls
    pub fn browser_id(&self) -> BrowserId {
        self.browser_id
    }

    /// Execute a command and return the content process's response
    pub async fn execute<T>(&self, cmd: T) -> Result<CommandResponse<T::Response>>
    where
        T: Command + Into<PageCommand>,
    {
        let method = cmd.identifier();
        let dispatched = CommandFuture::new(self.browser_id, cmd, self.sender.clone()).await?;
        let (id, result) = dispatched.into_response().await?;
        to_command_response::<T>(id, result, method)
    }

    /// Attaches a new protocol session to the tab
    pub async fn events(&self) -> Result<EventStream> {
        let (tx, rx) = oneshot_channel();
        self.sender
            .clone()
            .send(HandlerMessage::Subscribe(self.browser_id, tx))
            .await?;
        rx.await?
    }

    /// All frames of the tab, parents first
    pub async fn frames(&self) -> Result<Vec<FrameInfo>> {
        let (tx, rx) = oneshot_channel();
        self.sender
            .clone()
            .send(HandlerMessage::GetFrames(self.browser_id, tx))
            .await?;
        rx.await?
    }

    /// Return the main frame of the tab
    pub async fn main_frame(&self) -> Result<FrameInfo> {
        self.frames()
            .await?
            .into_iter()
            .next()
            .ok_or(FrameError::PageNotFound(self.browser_id))
    }

    /// Evaluates the expression in the execution context.
    ///
    /// If the expression looks like a function declaration it is called
    /// instead, so `() => document.title` evaluates to the title.
    pub async fn evaluate(
        &self,
        execution_context_id: impl Into<GlobalId>,
        expression: impl Into<String>,
    ) -> Result<EvaluateReturns> {
        let execution_context_id = execution_context_id.into();
        let expression = expression.into();
        if utils::is_likely_js_function(&expression) {
            self.call_function(CallFunctionParams::new(execution_context_id, expression))
                .await
        } else {
            Ok(self
                .execute(EvaluateParams::new(execution_context_id, expression))
                .await?
                .result)
        }
    }

    pub async fn call_function(&self, params: CallFunctionParams) -> Result<EvaluateReturns> {
        Ok(self.execute(params).await?.result)
    }

    pub async fn get_object_properties(
        &self,
        execution_context_id: impl Into<GlobalId>,
        object_id: impl Into<String>,
    ) -> Result<Vec<serde_json::Value>> {
        let res = self
            .execute(GetObjectPropertiesParams::new(
                execution_context_id,
                object_id,
            ))
            .await?;
        Ok(res.result.properties)
    }

    /// Releases a remote object
    pub async fn dispose_object(
        &self,
        execution_context_id: impl Into<GlobalId>,
        object_id: impl Into<String>,
    ) -> Result<()> {
        self.execute(DisposeObjectParams::new(execution_context_id, object_id))
            .await?;
        Ok(())
    }

    /// Navigate the frame to the given URL.
    ///
    /// This resolves once the navigation started, relative urls are resolved
    /// against the frame's current url.
    pub async fn navigate(&self, params: NavigateParams) -> Result<NavigateReturns> {
        Ok(self.execute(params).await?.result)
    }

    pub async fn go_back(&self, frame_id: impl Into<FrameId>) -> Result<NavigateReturns> {
        Ok(self.execute(GoBackParams::new(frame_id)).await?.result)
    }

    pub async fn go_forward(&self, frame_id: impl Into<FrameId>) -> Result<NavigateReturns> {
        Ok(self.execute(GoForwardParams::new(frame_id)).await?.result)
    }

    pub async fn reload(&self, frame_id: impl Into<FrameId>) -> Result<NavigateReturns> {
        Ok(self.execute(ReloadParams::new(frame_id)).await?.result)
    }

    /// Posts a message to the worker's global scope
    pub async fn send_message_to_worker(
        &self,
        frame_id: impl Into<FrameId>,
        worker_id: impl Into<WorkerId>,
        message: impl Into<String>,
    ) -> Result<()> {
        self.execute(SendMessageToWorkerParams::new(frame_id, worker_id, message))
            .await?;
        Ok(())
    }

    /// Exposes a binding to every frame of the tab, current and future.
    ///
    /// A binding with the same name replaces the previous one.
    pub async fn add_binding(&self, params: AddBindingParams) -> Result<()> {
        self.execute(params).await?;
        Ok(())
    }

    /// Replaces the scripts evaluated in every new document of the tab
    pub async fn set_init_scripts<I, S>(&self, scripts: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<InitScript>,
    {
        self.execute(SetInitScriptsParams::new(scripts)).await?;
        Ok(())
    }
}
