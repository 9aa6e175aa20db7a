use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use fnv::{FnvHashMap, FnvHashSet};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::channel::oneshot;
use pin_project_lite::pin_project;
use serde_json::Value;

use frameoxide_types::{CallId, EventMessage, Message, MethodCall, Outgoing};

use crate::error::{FrameError, Result};
use crate::protocol::{BrowserId, FrameId, WorkerId};

/// Logical connection for `Page.*` calls and events of a frame
pub const PAGE_SESSION: &str = "page";
/// Logical connection for `Runtime.*` calls and events of a frame
pub const RUNTIME_SESSION: &str = "runtime";
/// The only logical connection on a worker's channel
pub const WORKER_SESSION: &str = "worker";

/// Addresses a channel: the frame it belongs to and, for worker channels, the
/// worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName {
    pub browser_id: BrowserId,
    pub frame_id: FrameId,
    pub worker_id: Option<WorkerId>,
}

impl ChannelName {
    pub fn frame(browser_id: BrowserId, frame_id: FrameId) -> Self {
        Self {
            browser_id,
            frame_id,
            worker_id: None,
        }
    }

    pub fn worker(browser_id: BrowserId, worker_id: WorkerId) -> Result<Self> {
        let (frame_id, _) = worker_id.decompose()?;
        Ok(Self {
            browser_id,
            frame_id,
            worker_id: Some(worker_id),
        })
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.worker_id {
            Some(ref worker) => write!(f, "{}:worker:{}", self.browser_id, worker),
            None => write!(f, "{}:frame:{}", self.browser_id, self.frame_id),
        }
    }
}

/// The underlying byte pipe to one content process.
///
/// Transports are expected to deliver messages in order, delivery of the
/// replies happens through [`InboundMessage`]s handed to the `Handler`.
pub trait Transport: fmt::Debug + Send {
    fn send(&mut self, message: Outgoing) -> Result<()>;
}

/// Creates the transport for a channel whenever it is (re)bound.
pub trait TransportFactory: fmt::Debug + Send + Sync {
    fn create(&self, name: &ChannelName, generation: u64) -> Result<Box<dyn Transport>>;
}

/// A message a content process sent over a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub channel: ChannelName,
    /// The generation of the transport that delivered the message
    pub generation: u64,
    pub message: Message,
}

impl InboundMessage {
    pub fn new(channel: ChannelName, generation: u64, message: impl Into<Message>) -> Self {
        Self {
            channel,
            generation,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
struct PendingCall {
    method: Cow<'static, str>,
    sender: oneshot::Sender<Result<Value>>,
    started: Instant,
}

/// A named, multiplexed call/event channel to the content process currently
/// hosting a frame or worker.
///
/// The channel outlives its transports: `rebind` swaps the transport and bumps
/// the generation, `close` ends the channel for good.
#[derive(Debug)]
pub struct Channel {
    name: ChannelName,
    generation: u64,
    transport: Option<Box<dyn Transport>>,
    /// The identifier for the next call, never reset
    next_id: usize,
    /// Calls awaiting their response
    pending: FnvHashMap<CallId, PendingCall>,
    /// Logical connections that accept events
    registered: FnvHashSet<String>,
    closed: bool,
}

impl Channel {
    /// Creates the channel and binds its first transport
    pub fn new(name: ChannelName, factory: &dyn TransportFactory) -> Self {
        let mut channel = Self {
            name,
            generation: 0,
            transport: None,
            next_id: 0,
            pending: Default::default(),
            registered: Default::default(),
            closed: false,
        };
        channel.rebind(factory);
        channel
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of calls still awaiting a response
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Drops the current transport and binds a new one under the next
    /// generation.
    pub fn rebind(&mut self, factory: &dyn TransportFactory) {
        if self.closed {
            return;
        }
        self.reset_transport();
        self.generation += 1;
        match factory.create(&self.name, self.generation) {
            Ok(transport) => {
                tracing::debug!(
                    channel = %self.name,
                    generation = self.generation,
                    "Bound transport"
                );
                self.transport = Some(transport);
            }
            Err(err) => {
                tracing::error!(channel = %self.name, "Failed to create transport: {}", err);
            }
        }
    }

    /// Detaches the transport, failing all outstanding calls with
    /// [`FrameError::ChannelReset`].
    pub fn reset_transport(&mut self) {
        self.transport = None;
        self.fail_pending(|| FrameError::ChannelReset);
    }

    /// Closes the channel, all outstanding and future calls fail with
    /// [`FrameError::FrameGone`].
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.transport = None;
        self.registered.clear();
        self.fail_pending(|| FrameError::FrameGone);
    }

    fn fail_pending(&mut self, err: impl Fn() -> FrameError) {
        for (id, call) in self.pending.drain() {
            tracing::trace!(channel = %self.name, %id, method = %call.method, "Rejecting call");
            let _ = call.sender.send(Err(err()));
        }
    }

    /// Accept events on the logical connection `session`
    pub fn register(&mut self, session: impl Into<String>) {
        if !self.closed {
            self.registered.insert(session.into());
        }
    }

    pub fn unregister(&mut self, session: &str) {
        self.registered.remove(session);
    }

    /// A caller for the logical connection `session`
    pub fn connect<'a>(&'a mut self, session: &'a str) -> Caller<'a> {
        Caller {
            channel: self,
            session,
        }
    }

    fn next_call_id(&mut self) -> CallId {
        let id = CallId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    fn submit(
        &mut self,
        session: &str,
        method: Cow<'static, str>,
        params: Value,
        now: Instant,
    ) -> ResponseFuture {
        let id = self.next_call_id();
        let (tx, rx) = oneshot::channel();
        let fut = ResponseFuture::new(id, method.clone(), rx);
        if self.closed {
            let _ = tx.send(Err(FrameError::FrameGone));
            return fut;
        }
        let transport = match self.transport.as_mut() {
            Some(transport) => transport,
            None => {
                let _ = tx.send(Err(FrameError::ChannelReset));
                return fut;
            }
        };
        tracing::debug!(channel = %self.name, %id, %method, "Submit call");
        let call = MethodCall {
            id,
            session_id: session.to_string(),
            method: method.clone(),
            params,
        };
        if let Err(err) = transport.send(Outgoing::Call(call)) {
            tracing::error!(channel = %self.name, %method, "Failed to send call: {}", err);
            let _ = tx.send(Err(err));
            return fut;
        }
        self.pending.insert(
            id,
            PendingCall {
                method,
                sender: tx,
                started: now,
            },
        );
        fut
    }

    /// Processes a message read from the transport of `generation`.
    ///
    /// Responses resolve their call, events of registered sessions are
    /// returned to the caller for dispatch. Everything else is dropped.
    pub fn on_message(&mut self, generation: u64, message: Message) -> Option<EventMessage> {
        if self.closed || generation != self.generation {
            tracing::trace!(
                channel = %self.name,
                generation,
                current = self.generation,
                "Dropping message of stale transport"
            );
            return None;
        }
        match message {
            Message::Response(resp) => {
                if let Some(call) = self.pending.remove(&resp.id) {
                    let res = match (resp.result, resp.error) {
                        (_, Some(err)) => Err(err.into()),
                        (result, None) => Ok(result.unwrap_or(Value::Null)),
                    };
                    let _ = call.sender.send(res);
                } else {
                    tracing::trace!(
                        channel = %self.name,
                        id = %resp.id,
                        "Response to unknown call"
                    );
                }
                None
            }
            Message::Event(event) => {
                if self.registered.contains(&event.session_id) {
                    Some(event)
                } else {
                    tracing::trace!(
                        channel = %self.name,
                        session = %event.session_id,
                        method = %event.method,
                        "Dropping event of unregistered session"
                    );
                    None
                }
            }
        }
    }

    /// Rejects every call older than `timeout` with [`FrameError::Timeout`]
    pub fn evict_timed_out(&mut self, now: Instant, timeout: Duration) {
        let expired: Vec<_> = self
            .pending
            .iter()
            .filter(|(_, call)| now.saturating_duration_since(call.started) > timeout)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            if let Some(call) = self.pending.remove(&id) {
                tracing::debug!(channel = %self.name, %id, method = %call.method, "Call timed out");
                let _ = call.sender.send(Err(FrameError::Timeout(timeout)));
            }
        }
    }
}

/// Issues calls and events on one logical connection of a [`Channel`]
#[derive(Debug)]
pub struct Caller<'a> {
    channel: &'a mut Channel,
    session: &'a str,
}

impl<'a> Caller<'a> {
    /// Sends a call, the returned future resolves with the call's result
    pub fn send(self, method: impl Into<Cow<'static, str>>, params: Value) -> ResponseFuture {
        self.send_at(method, params, Instant::now())
    }

    pub(crate) fn send_at(
        self,
        method: impl Into<Cow<'static, str>>,
        params: Value,
        now: Instant,
    ) -> ResponseFuture {
        self.channel.submit(self.session, method.into(), params, now)
    }

    /// Sends a fire and forget event
    pub fn emit(self, method: impl Into<Cow<'static, str>>, params: Value) -> Result<()> {
        if self.channel.closed {
            return Err(FrameError::FrameGone);
        }
        let event = EventMessage::new(self.session, method, params);
        match self.channel.transport.as_mut() {
            Some(transport) => transport.send(Outgoing::Event(event)),
            None => Err(FrameError::ChannelReset),
        }
    }
}

pin_project! {
    /// The pending result of a call issued over a [`Channel`]
    #[derive(Debug)]
    pub struct ResponseFuture {
        id: CallId,
        method: Cow<'static, str>,
        #[pin]
        rx: oneshot::Receiver<Result<Value>>,
    }
}

impl ResponseFuture {
    fn new(id: CallId, method: Cow<'static, str>, rx: oneshot::Receiver<Result<Value>>) -> Self {
        Self { id, method, rx }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl Future for ResponseFuture {
    type Output = Result<Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.rx.poll(cx) {
            Poll::Ready(Ok(res)) => Poll::Ready(res),
            // the channel was dropped along with the handler
            Poll::Ready(Err(_)) => Poll::Ready(Err(FrameError::HandlerClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// A message written to a transport created by [`MpscTransportFactory`]
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub channel: ChannelName,
    pub generation: u64,
    pub message: Outgoing,
}

impl Outbound {
    /// The reply to this message if it is a call
    pub fn reply(&self, result: Value) -> Option<InboundMessage> {
        let call = self.message.as_call()?;
        Some(InboundMessage::new(
            self.channel.clone(),
            self.generation,
            Message::Response(frameoxide_types::Response::ok(call.id, result)),
        ))
    }

    /// The error reply to this message if it is a call
    pub fn reply_err(&self, error: frameoxide_types::Error) -> Option<InboundMessage> {
        let call = self.message.as_call()?;
        Some(InboundMessage::new(
            self.channel.clone(),
            self.generation,
            Message::Response(frameoxide_types::Response::err(call.id, error)),
        ))
    }
}

/// Funnels all outgoing messages of all channels into a single receiver.
///
/// Useful for hosts that multiplex every content process over one pipe
/// themselves.
#[derive(Debug, Clone)]
pub struct MpscTransportFactory {
    tx: UnboundedSender<Outbound>,
}

impl MpscTransportFactory {
    pub fn new() -> (Self, UnboundedReceiver<Outbound>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl TransportFactory for MpscTransportFactory {
    fn create(&self, name: &ChannelName, generation: u64) -> Result<Box<dyn Transport>> {
        Ok(Box::new(MpscTransport {
            name: name.clone(),
            generation,
            tx: self.tx.clone(),
        }))
    }
}

#[derive(Debug)]
struct MpscTransport {
    name: ChannelName,
    generation: u64,
    tx: UnboundedSender<Outbound>,
}

impl Transport for MpscTransport {
    fn send(&mut self, message: Outgoing) -> Result<()> {
        self.tx
            .unbounded_send(Outbound {
                channel: self.name.clone(),
                generation: self.generation,
                message,
            })
            .map_err(|err| FrameError::ChannelSend(err.into_send_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frameoxide_types::Response;
    use futures::executor::block_on;
    use futures::StreamExt;
    use serde_json::json;

    fn channel() -> (Channel, UnboundedReceiver<Outbound>, MpscTransportFactory) {
        let (factory, rx) = MpscTransportFactory::new();
        let name = ChannelName::frame(BrowserId(1), FrameId::new("frame-1"));
        (Channel::new(name, &factory), rx, factory)
    }

    #[test]
    fn resolves_calls_by_id() {
        let (mut channel, mut rx, _factory) = channel();
        let first = channel.connect(RUNTIME_SESSION).send("Runtime.evaluate", json!({}));
        let second = channel.connect(PAGE_SESSION).send("Page.navigate", json!({}));
        assert_ne!(first.id(), second.id());

        let sent = block_on(rx.next()).unwrap();
        assert_eq!(sent.generation, 1);
        assert_eq!(sent.message.method(), "Runtime.evaluate");

        channel.on_message(1, Message::Response(Response::ok(second.id(), json!({"b": 2}))));
        channel.on_message(1, Message::Response(Response::ok(first.id(), json!({"a": 1}))));
        assert_eq!(block_on(first).unwrap(), json!({"a": 1}));
        assert_eq!(block_on(second).unwrap(), json!({"b": 2}));
        assert_eq!(channel.pending_calls(), 0);
    }

    #[test]
    fn remote_errors_reject_the_call() {
        let (mut channel, _rx, _factory) = channel();
        let call = channel.connect(RUNTIME_SESSION).send("Runtime.evaluate", json!({}));
        let err = frameoxide_types::Error::new(-32000, "boom");
        channel.on_message(1, Message::Response(Response::err(call.id(), err.clone())));
        match block_on(call) {
            Err(FrameError::Remote(remote)) => assert_eq!(remote, err),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rebind_rejects_in_flight_calls() {
        let (mut channel, _rx, factory) = channel();
        let call = channel.connect(RUNTIME_SESSION).send("Runtime.evaluate", json!({}));
        let id = call.id();
        channel.rebind(&factory);
        assert_eq!(channel.generation(), 2);
        assert!(matches!(block_on(call), Err(FrameError::ChannelReset)));

        // a late response of the old transport is not misattributed
        assert!(channel
            .on_message(1, Message::Response(Response::ok(id, json!({}))))
            .is_none());
        let next = channel.connect(RUNTIME_SESSION).send("Runtime.evaluate", json!({}));
        assert_ne!(next.id(), id);
    }

    #[test]
    fn closed_channel_fails_calls() {
        let (mut channel, _rx, _factory) = channel();
        let call = channel.connect(PAGE_SESSION).send("Page.reload", json!({}));
        channel.close();
        assert!(matches!(block_on(call), Err(FrameError::FrameGone)));
        let late = channel.connect(PAGE_SESSION).send("Page.reload", json!({}));
        assert!(matches!(block_on(late), Err(FrameError::FrameGone)));
        assert!(matches!(
            channel.connect(PAGE_SESSION).emit("Page.ping", json!({})),
            Err(FrameError::FrameGone)
        ));
    }

    #[test]
    fn drops_events_of_unregistered_sessions_and_stale_generations() {
        let (mut channel, _rx, factory) = channel();
        channel.register(PAGE_SESSION);
        let event = EventMessage::new(PAGE_SESSION, "Page.eventFired", json!({"name": "load"}));
        let unknown = EventMessage::new("other", "Page.eventFired", json!({"name": "load"}));

        assert_eq!(
            channel.on_message(1, Message::Event(event.clone())),
            Some(event.clone())
        );
        assert_eq!(channel.on_message(1, Message::Event(unknown)), None);

        channel.rebind(&factory);
        assert_eq!(channel.on_message(1, Message::Event(event.clone())), None);
        assert_eq!(channel.on_message(2, Message::Event(event.clone())), Some(event));
    }

    #[test]
    fn evicts_timed_out_calls() {
        let (mut channel, _rx, _factory) = channel();
        let start = Instant::now();
        let old = channel
            .connect(RUNTIME_SESSION)
            .send_at("Runtime.evaluate", json!({}), start);
        let fresh = channel.connect(RUNTIME_SESSION).send_at(
            "Runtime.evaluate",
            json!({}),
            start + Duration::from_secs(20),
        );
        channel.evict_timed_out(start + Duration::from_secs(31), Duration::from_secs(30));
        assert!(matches!(block_on(old), Err(FrameError::Timeout(_))));
        assert_eq!(channel.pending_calls(), 1);
        channel.on_message(1, Message::Response(Response::ok(fresh.id(), json!(1))));
        assert_eq!(block_on(fresh).unwrap(), json!(1));
    }
}
