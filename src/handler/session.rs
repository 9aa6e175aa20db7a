use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender};
use futures::Stream;

use crate::protocol::{BrowserId, ProtocolEvent};

/// Identifier of a protocol session attached to a tab
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// The handler's end of an attached session
#[derive(Debug)]
pub(crate) struct Session {
    id: SessionId,
    browser_id: BrowserId,
    sender: UnboundedSender<ProtocolEvent>,
}

impl Session {
    pub fn new(
        id: SessionId,
        browser_id: BrowserId,
        sender: UnboundedSender<ProtocolEvent>,
    ) -> Self {
        Self {
            id,
            browser_id,
            sender,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn browser_id(&self) -> BrowserId {
        self.browser_id
    }

    /// Queues the event for the session, `false` if the session is gone.
    pub fn send(&self, event: ProtocolEvent) -> bool {
        self.sender.unbounded_send(event).is_ok()
    }
}

/// The events of a tab as seen by one session.
///
/// Starts with the replay of the tab's state at attach time, followed by
/// every live event in emission order. Ends once the tab is gone or the
/// session is detached.
#[derive(Debug)]
pub struct EventStream {
    id: SessionId,
    browser_id: BrowserId,
    events: UnboundedReceiver<ProtocolEvent>,
}

impl EventStream {
    pub(crate) fn new(
        id: SessionId,
        browser_id: BrowserId,
        events: UnboundedReceiver<ProtocolEvent>,
    ) -> Self {
        Self {
            id,
            browser_id,
            events,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.id
    }

    pub fn browser_id(&self) -> BrowserId {
        self.browser_id
    }
}

impl Stream for EventStream {
    type Item = ProtocolEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let pin = self.get_mut();
        Stream::poll_next(Pin::new(&mut pin.events), cx)
    }
}
