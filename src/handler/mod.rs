use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fnv::FnvHashMap;
use futures::channel::mpsc::{unbounded, Receiver};
use futures::channel::oneshot::Sender as OneshotSender;
use futures::stream::{Fuse, FusedStream, Stream, StreamExt};
use futures::task::{Context, Poll};

pub use crate::handler::cmd::{CommandMessage, Dispatched};
pub use crate::handler::commandfuture::CommandFuture;
pub use crate::handler::session::{EventStream, SessionId};

use crate::conn::{InboundMessage, TransportFactory};
use crate::error::{FrameError, Result};
use crate::handler::bootstrap::BootstrapStore;
use crate::handler::frame::FrameInfo;
use crate::handler::job::PeriodicJob;
use crate::handler::session::Session;
use crate::handler::tree::FrameTree;
use crate::host::HandlerConfig;
use crate::protocol::{
    BrowserId, NavigationNotification, ProtocolEvent, StructuralNotification,
};

/// Standard timeout in MS
pub const REQUEST_TIMEOUT: u64 = 30_000;

/// How long to wait for a requested navigation to start, in MS
pub const NAVIGATION_TIMEOUT: u64 = 30_000;

pub mod bootstrap;
pub(crate) mod cmd;
mod commandfuture;
pub mod execution;
pub mod frame;
mod job;
mod session;
pub mod tree;
pub mod worker;

/// An event emitted for a tab
#[derive(Debug, Clone, PartialEq)]
pub struct PageEvent {
    pub browser_id: BrowserId,
    pub event: ProtocolEvent,
}

/// Messages the [`crate::Host`] and its pages send to the [`Handler`]
#[derive(Debug)]
pub enum HandlerMessage {
    Structural(StructuralNotification),
    Navigation(NavigationNotification),
    Inbound(InboundMessage),
    Command(CommandMessage),
    Subscribe(BrowserId, OneshotSender<Result<EventStream>>),
    Unsubscribe(SessionId),
    GetFrames(BrowserId, OneshotSender<Result<Vec<FrameInfo>>>),
}

/// The handler that owns the frame trees of all tabs and drives every
/// notification, message and command.
///
/// Every input is processed to completion before the next one, so the trees
/// never observe interleaved mutations. The handler yields each emitted
/// [`PageEvent`], in emission order.
#[must_use = "streams do nothing unless polled"]
#[derive(Debug)]
pub struct Handler {
    /// Incoming messages from the host and its pages
    from_host: Fuse<Receiver<HandlerMessage>>,
    /// The frame tree of every open tab
    trees: FnvHashMap<BrowserId, FrameTree>,
    /// Protocol sessions attached to tabs
    sessions: FnvHashMap<SessionId, Session>,
    next_session_id: u64,
    /// Events not yet yielded by the stream
    pending_events: VecDeque<PageEvent>,
    factory: Arc<dyn TransportFactory>,
    bootstrap: Arc<dyn BootstrapStore>,
    request_timeout: Duration,
    navigation_timeout: Duration,
    /// Evicts timed out calls and navigation waiters periodically
    evict_command_timeout: PeriodicJob,
}

impl Handler {
    pub(crate) fn new(
        rx: Receiver<HandlerMessage>,
        config: &HandlerConfig,
        factory: Arc<dyn TransportFactory>,
        bootstrap: Arc<dyn BootstrapStore>,
    ) -> Self {
        Self {
            from_host: rx.fuse(),
            trees: Default::default(),
            sessions: Default::default(),
            next_session_id: 0,
            pending_events: Default::default(),
            factory,
            bootstrap,
            request_timeout: config.request_timeout,
            navigation_timeout: config.navigation_timeout,
            evict_command_timeout: PeriodicJob::new(config.eviction_interval),
        }
    }

    /// The frame tree of the tab, if it is open
    pub fn tree(&self, browser_id: BrowserId) -> Option<&FrameTree> {
        self.trees.get(&browser_id)
    }

    /// All open tabs
    pub fn trees(&self) -> impl Iterator<Item = &FrameTree> + '_ {
        self.trees.values()
    }

    fn on_message(&mut self, msg: HandlerMessage, now: Instant) {
        match msg {
            HandlerMessage::Structural(notification) => self.on_structural(notification),
            HandlerMessage::Navigation(notification) => {
                let browser_id = notification.browser_id();
                match self.trees.get_mut(&browser_id) {
                    Some(tree) => match tree.on_navigation(notification) {
                        Ok(()) => {}
                        Err(FrameError::StaleNavigationEvent) => {
                            tracing::trace!(%browser_id, "Dropping stale navigation event")
                        }
                        Err(err) => tracing::debug!(%browser_id, "Dropping navigation: {}", err),
                    },
                    None => tracing::trace!(%browser_id, "Navigation for unknown tab"),
                }
                self.collect_events(browser_id);
            }
            HandlerMessage::Inbound(msg) => {
                let browser_id = msg.channel.browser_id;
                match self.trees.get_mut(&browser_id) {
                    Some(tree) => tree.on_inbound(msg),
                    None => tracing::trace!(channel = %msg.channel, "Message for unknown tab"),
                }
                self.collect_events(browser_id);
            }
            HandlerMessage::Command(cmd) => {
                let CommandMessage {
                    browser_id,
                    command,
                    sender,
                } = cmd;
                let res = match self.trees.get_mut(&browser_id) {
                    Some(tree) => tree.dispatch(command, now),
                    None => Err(FrameError::PageNotFound(browser_id)),
                };
                let _ = sender.send(res);
            }
            HandlerMessage::Subscribe(browser_id, tx) => {
                let _ = tx.send(self.attach_session(browser_id));
            }
            HandlerMessage::Unsubscribe(id) => {
                if self.sessions.remove(&id).is_some() {
                    tracing::debug!(session = %id, "Detached session");
                }
            }
            HandlerMessage::GetFrames(browser_id, tx) => {
                let res = self
                    .trees
                    .get(&browser_id)
                    .map(FrameTree::all_frames)
                    .ok_or(FrameError::PageNotFound(browser_id));
                let _ = tx.send(res);
            }
        }
    }

    fn on_structural(&mut self, notification: StructuralNotification) {
        let browser_id = notification.browser_id();
        let mut disposed = false;
        match notification {
            StructuralNotification::Attached { unit, why } => {
                match self.trees.get_mut(&browser_id) {
                    Some(tree) => {
                        if let Err(err) = tree.attach(unit, why) {
                            tracing::warn!(%browser_id, "{}", err);
                        }
                    }
                    None => match unit.parent {
                        None => {
                            tracing::debug!(%browser_id, unit = %unit.id, "New tab");
                            let tree = FrameTree::new(
                                unit,
                                Arc::clone(&self.factory),
                                Arc::clone(&self.bootstrap),
                            );
                            self.trees.insert(browser_id, tree);
                        }
                        Some(parent) => tracing::warn!(
                            %browser_id,
                            "{}",
                            FrameError::OrphanFrame {
                                unit: unit.id,
                                parent
                            }
                        ),
                    },
                }
            }
            StructuralNotification::Discarded { unit, why } => {
                if let Some(tree) = self.trees.get_mut(&browser_id) {
                    disposed = tree.discard(unit, why);
                }
            }
            StructuralNotification::ProcessSwitch { unit } => {
                if let Some(tree) = self.trees.get_mut(&browser_id) {
                    if let Err(err) = tree.process_switch(unit) {
                        tracing::debug!(%browser_id, "Ignoring process switch: {}", err);
                    }
                }
            }
        }
        self.collect_events(browser_id);
        if disposed {
            self.dispose_tree(browser_id);
        }
    }

    /// The tab's main frame went away, forget everything about it
    fn dispose_tree(&mut self, browser_id: BrowserId) {
        if let Some(mut tree) = self.trees.remove(&browser_id) {
            tree.dispose();
            tracing::debug!(%browser_id, "Tab closed");
        }
        // dropping the senders ends the sessions' streams
        self.sessions
            .retain(|_, session| session.browser_id() != browser_id);
    }

    fn attach_session(&mut self, browser_id: BrowserId) -> Result<EventStream> {
        let tree = self
            .trees
            .get(&browser_id)
            .ok_or(FrameError::PageNotFound(browser_id))?;
        let (tx, rx) = unbounded();
        for event in tree.replay() {
            let _ = tx.unbounded_send(event);
        }
        self.next_session_id += 1;
        let id = SessionId(self.next_session_id);
        tracing::debug!(%browser_id, session = %id, "Attached session");
        self.sessions.insert(id, Session::new(id, browser_id, tx));
        Ok(EventStream::new(id, browser_id, rx))
    }

    /// Moves the events the tab emitted to its sessions and the stream
    fn collect_events(&mut self, browser_id: BrowserId) {
        let tree = match self.trees.get_mut(&browser_id) {
            Some(tree) => tree,
            None => return,
        };
        let sessions = &mut self.sessions;
        let pending = &mut self.pending_events;
        for event in tree.drain_events() {
            sessions.retain(|_, session| {
                if session.browser_id() != browser_id || session.send(event.clone()) {
                    return true;
                }
                tracing::debug!(session = %session.id(), "Session went away");
                false
            });
            pending.push_back(PageEvent { browser_id, event });
        }
    }

    fn evict_timed_out(&mut self, now: Instant) {
        for tree in self.trees.values_mut() {
            tree.evict_timed_out(now, self.request_timeout, self.navigation_timeout);
        }
    }
}

impl Stream for Handler {
    type Item = PageEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let pin = self.get_mut();
        let now = Instant::now();

        // the receiver is fused, exhaustion is checked below
        while let Poll::Ready(Some(msg)) = Pin::new(&mut pin.from_host).poll_next(cx) {
            pin.on_message(msg, now);
        }

        if pin.evict_command_timeout.is_ready(cx) {
            pin.evict_timed_out(Instant::now());
        }

        if let Some(event) = pin.pending_events.pop_front() {
            return Poll::Ready(Some(event));
        }

        if pin.from_host.is_terminated() {
            return Poll::Ready(None);
        }
        Poll::Pending
    }
}
