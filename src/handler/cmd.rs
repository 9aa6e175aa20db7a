use std::borrow::Cow;
use std::fmt;

use futures::channel::oneshot;
use futures::future::join_all;
use serde_json::Value;

use frameoxide_types::{CallId, Command, CommandResponse};

use crate::conn::ResponseFuture;
use crate::error::{FrameError, Result};
use crate::protocol::{BrowserId, NavigateReturns, PageCommand};

/// A command issued through a [`crate::page::Page`] on its way to the tab's
/// frame tree
#[derive(Debug)]
pub struct CommandMessage {
    pub browser_id: BrowserId,
    pub command: PageCommand,
    pub sender: oneshot::Sender<Result<Dispatched>>,
}

impl CommandMessage {
    pub fn new(
        browser_id: BrowserId,
        command: impl Into<PageCommand>,
        sender: oneshot::Sender<Result<Dispatched>>,
    ) -> Self {
        Self {
            browser_id,
            command: command.into(),
            sender,
        }
    }
}

/// What became of a command once the frame tree routed it.
pub enum Dispatched {
    /// Sent as a single call to one channel
    Call(ResponseFuture),
    /// A navigation request, done once content acknowledged it and the
    /// navigation started
    Navigation {
        ack: ResponseFuture,
        started: oneshot::Receiver<Result<NavigateReturns>>,
    },
    /// Sent to every frame of the tab
    FanOut(Vec<ResponseFuture>),
}

impl fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatched::Call(call) => f.debug_tuple("Call").field(&call.id()).finish(),
            Dispatched::Navigation { ack, .. } => {
                f.debug_struct("Navigation").field("ack", &ack.id()).finish()
            }
            Dispatched::FanOut(calls) => f
                .debug_tuple("FanOut")
                .field(&calls.iter().map(|c| c.id()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

impl Dispatched {
    /// Waits for the outcome of the command.
    ///
    /// Branches of a fan out whose frame detached in the meantime count as
    /// done.
    pub async fn into_response(self) -> Result<(CallId, Value)> {
        match self {
            Dispatched::Call(call) => {
                let id = call.id();
                Ok((id, call.await?))
            }
            Dispatched::Navigation { ack, started } => {
                let id = ack.id();
                let reply = ack.await?;
                if reply.get("navigationId") == Some(&Value::Null) {
                    // nothing to navigate to, e.g. no history entry
                    return Ok((id, serde_json::to_value(NavigateReturns::default())?));
                }
                let returns = started.await.map_err(|_| FrameError::HandlerClosed)??;
                Ok((id, serde_json::to_value(returns)?))
            }
            Dispatched::FanOut(calls) => {
                let id = calls
                    .first()
                    .map(|call| call.id())
                    .unwrap_or_else(|| CallId::new(0));
                for res in join_all(calls).await {
                    match res {
                        Ok(_) => {}
                        Err(err) if err.is_frame_gone() => {
                            tracing::trace!("Frame went away during fan out: {}", err)
                        }
                        Err(err) => return Err(err),
                    }
                }
                Ok((id, Value::Object(Default::default())))
            }
        }
    }
}

/// Decodes the result of a command, content replies to commands without a
/// payload with `null`
pub(crate) fn to_command_response<T: Command>(
    id: CallId,
    result: Value,
    method: Cow<'static, str>,
) -> Result<CommandResponse<T::Response>> {
    let result = match result {
        Value::Null => Value::Object(Default::default()),
        result => result,
    };
    Ok(CommandResponse {
        id,
        result: serde_json::from_value(result)?,
        method,
    })
}
