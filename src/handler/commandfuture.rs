use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::{
    mpsc,
    oneshot::{self, channel as oneshot_channel},
};
use pin_project_lite::pin_project;

use crate::error::{FrameError, Result};
use crate::handler::cmd::{CommandMessage, Dispatched};
use crate::handler::HandlerMessage;
use crate::protocol::{BrowserId, PageCommand};

pin_project! {
    /// Hands a command to the handler and resolves once the tab's frame tree
    /// routed it.
    pub struct CommandFuture {
        #[pin]
        rx_command: oneshot::Receiver<Result<Dispatched>>,
        #[pin]
        sender: mpsc::Sender<HandlerMessage>,
        message: Option<HandlerMessage>,
        method: Cow<'static, str>,
    }
}

impl CommandFuture {
    pub fn new(
        browser_id: BrowserId,
        cmd: impl Into<PageCommand>,
        sender: mpsc::Sender<HandlerMessage>,
    ) -> Self {
        let (tx, rx_command) = oneshot_channel();
        let cmd = cmd.into();
        let method = cmd.identifier();
        let message = Some(HandlerMessage::Command(CommandMessage::new(
            browser_id, cmd, tx,
        )));
        Self {
            rx_command,
            sender,
            message,
            method,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl Future for CommandFuture {
    type Output = Result<Dispatched>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        if this.message.is_some() {
            match this.sender.poll_ready(cx) {
                Poll::Ready(Err(e)) => Poll::Ready(Err(e.into())),
                Poll::Ready(Ok(_)) => {
                    if let Some(message) = this.message.take() {
                        this.sender.start_send(message)?;
                    }
                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
                Poll::Pending => Poll::Pending,
            }
        } else {
            match this.rx_command.as_mut().poll(cx) {
                Poll::Ready(Ok(res)) => Poll::Ready(res),
                Poll::Ready(Err(_)) => Poll::Ready(Err(FrameError::HandlerClosed)),
                Poll::Pending => Poll::Pending,
            }
        }
    }
}
