use std::collections::VecDeque;
use std::time::{Duration, Instant};

use fnv::FnvHashMap;
use futures::channel::oneshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conn::{
    Channel, ChannelName, ResponseFuture, TransportFactory, PAGE_SESSION, RUNTIME_SESSION,
};
use crate::error::{FrameError, Result};
use crate::handler::execution::{ExecutionContext, ExecutionContexts};
use crate::handler::worker::Worker;
use crate::protocol::content::{BindingCall, ConsoleCalled, ContextCreated, WorkerStarted};
use crate::protocol::*;
use crate::utils::network_error_text;

/// The navigation a frame is currently performing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingNavigation {
    pub navigation_id: NavigationId,
    pub url: String,
}

/// A snapshot of a single frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub frame_id: FrameId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_frame_id: Option<FrameId>,
    pub content_unit: ContentUnit,
    pub url: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_navigation: Option<PendingNavigation>,
}

/// Someone waiting for the frame's next navigation to start
#[derive(Debug)]
struct NavigationWaiter {
    tx: oneshot::Sender<Result<NavigateReturns>>,
    started: Instant,
}

/// A node of the frame tree, bound to exactly one content unit at a time.
///
/// The frame keeps its id when it is rebound to another unit, everything that
/// lives inside the content process (channel transport, execution contexts,
/// workers) is torn down and rebuilt instead.
#[derive(Debug)]
pub struct Frame {
    id: FrameId,
    parent_frame: Option<FrameId>,
    /// Children in attach order
    child_frames: Vec<FrameId>,
    content_unit: ContentUnit,
    pending_navigation: Option<PendingNavigation>,
    /// Url of the last committed document
    url: String,
    name: String,
    channel: Channel,
    contexts: ExecutionContexts,
    workers: FnvHashMap<WorkerId, Worker>,
    /// Workers in creation order
    worker_ids: Vec<WorkerId>,
    navigation_waiters: Vec<NavigationWaiter>,
}

impl Frame {
    pub fn new(
        id: FrameId,
        parent_frame: Option<FrameId>,
        content_unit: ContentUnit,
        factory: &dyn TransportFactory,
    ) -> Self {
        let mut channel = Channel::new(
            ChannelName::frame(content_unit.browser_id, id.clone()),
            factory,
        );
        channel.register(PAGE_SESSION);
        channel.register(RUNTIME_SESSION);
        Self {
            id,
            parent_frame,
            child_frames: Default::default(),
            content_unit,
            pending_navigation: None,
            url: String::new(),
            name: String::new(),
            channel,
            contexts: Default::default(),
            workers: Default::default(),
            worker_ids: Default::default(),
            navigation_waiters: Default::default(),
        }
    }

    pub fn id(&self) -> &FrameId {
        &self.id
    }

    pub fn parent_frame(&self) -> Option<&FrameId> {
        self.parent_frame.as_ref()
    }

    pub fn child_frames(&self) -> &[FrameId] {
        &self.child_frames
    }

    pub fn content_unit(&self) -> &ContentUnit {
        &self.content_unit
    }

    pub fn pending_navigation(&self) -> Option<&PendingNavigation> {
        self.pending_navigation.as_ref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut Channel {
        &mut self.channel
    }

    pub fn contexts(&self) -> &ExecutionContexts {
        &self.contexts
    }

    /// All workers of this frame in creation order
    pub fn workers(&self) -> impl Iterator<Item = &Worker> + '_ {
        self.worker_ids.iter().filter_map(move |id| self.workers.get(id))
    }

    pub fn worker_mut(&mut self, id: &WorkerId) -> Option<&mut Worker> {
        self.workers.get_mut(id)
    }

    pub(crate) fn add_child(&mut self, child: FrameId) {
        if !self.child_frames.contains(&child) {
            self.child_frames.push(child);
        }
    }

    pub(crate) fn remove_child(&mut self, child: &FrameId) {
        self.child_frames.retain(|id| id != child);
    }

    pub fn info(&self) -> FrameInfo {
        FrameInfo {
            frame_id: self.id.clone(),
            parent_frame_id: self.parent_frame.clone(),
            content_unit: self.content_unit,
            url: self.url.clone(),
            name: self.name.clone(),
            pending_navigation: self.pending_navigation.clone(),
        }
    }

    pub(crate) fn attached_event(&self) -> ProtocolEvent {
        ProtocolEvent::FrameAttached(EventFrameAttached {
            frame_id: self.id.clone(),
            parent_frame_id: self.parent_frame.clone(),
        })
    }

    fn global_id(&self, local: &ExecutionContextId) -> Result<GlobalId> {
        GlobalId::compose(&self.id, local)
    }

    fn context_created_event(&self, context: &ExecutionContext) -> Result<ProtocolEvent> {
        Ok(ProtocolEvent::ExecutionContextCreated(
            EventExecutionContextCreated {
                execution_context_id: self.global_id(context.local_id())?,
                aux_data: context.aux_data().clone(),
            },
        ))
    }

    fn context_destroyed_event(&self, context: &ExecutionContext) -> Result<ProtocolEvent> {
        Ok(ProtocolEvent::ExecutionContextDestroyed(
            EventExecutionContextDestroyed {
                execution_context_id: self.global_id(context.local_id())?,
            },
        ))
    }

    /// The events that describe this frame's current state to a session that
    /// attaches late.
    pub(crate) fn replay(&self, events: &mut Vec<ProtocolEvent>) {
        events.push(self.attached_event());
        if let Some(ref nav) = self.pending_navigation {
            events.push(ProtocolEvent::NavigationStarted(EventNavigationStarted {
                frame_id: self.id.clone(),
                navigation_id: nav.navigation_id.clone(),
                url: nav.url.clone(),
            }));
        }
        events.extend(
            self.contexts
                .iter()
                .filter_map(|ctx| self.context_created_event(ctx).ok()),
        );
        for worker in self.workers() {
            events.push(worker.created_event(&self.id));
            events.extend(
                worker
                    .contexts()
                    .iter()
                    .map(|ctx| worker.context_created_event(ctx)),
            );
        }
    }

    /// `Idle -> Pending`, a start while already pending is stale and dropped
    pub fn on_navigation_started(
        &mut self,
        navigation_id: NavigationId,
        url: String,
        events: &mut VecDeque<ProtocolEvent>,
    ) -> Result<()> {
        if self.pending_navigation.is_some() {
            return Err(FrameError::StaleNavigationEvent);
        }
        self.pending_navigation = Some(PendingNavigation {
            navigation_id: navigation_id.clone(),
            url: url.clone(),
        });
        self.resolve_navigation_waiters(|| NavigateReturns {
            navigation_id: Some(navigation_id.clone()),
            navigation_url: Some(url.clone()),
        });
        events.push_back(ProtocolEvent::NavigationStarted(EventNavigationStarted {
            frame_id: self.id.clone(),
            navigation_id,
            url,
        }));
        Ok(())
    }

    pub fn on_navigation_committed(
        &mut self,
        url: String,
        name: String,
        events: &mut VecDeque<ProtocolEvent>,
    ) -> Result<()> {
        let nav = self
            .pending_navigation
            .take()
            .ok_or(FrameError::StaleNavigationEvent)?;
        self.url = url.clone();
        self.name = name.clone();
        events.push_back(ProtocolEvent::NavigationCommitted(
            EventNavigationCommitted {
                frame_id: self.id.clone(),
                navigation_id: nav.navigation_id,
                url,
                name,
            },
        ));
        Ok(())
    }

    pub fn on_navigation_aborted(
        &mut self,
        error_code: u32,
        events: &mut VecDeque<ProtocolEvent>,
    ) -> Result<()> {
        let nav = self
            .pending_navigation
            .take()
            .ok_or(FrameError::StaleNavigationEvent)?;
        events.push_back(ProtocolEvent::NavigationAborted(EventNavigationAborted {
            frame_id: self.id.clone(),
            navigation_id: nav.navigation_id,
            error_text: network_error_text(error_code),
        }));
        Ok(())
    }

    /// History or fragment navigation, does not touch a pending cross document
    /// navigation.
    pub fn on_same_document_navigation(
        &mut self,
        url: String,
        events: &mut VecDeque<ProtocolEvent>,
    ) {
        self.url = url.clone();
        self.resolve_navigation_waiters(|| NavigateReturns {
            navigation_id: None,
            navigation_url: Some(url.clone()),
        });
        events.push_back(ProtocolEvent::SameDocumentNavigation(
            EventSameDocumentNavigation {
                frame_id: self.id.clone(),
                url,
            },
        ));
    }

    /// Resolves with the next navigation that starts in this frame
    pub(crate) fn wait_for_navigation(
        &mut self,
        now: Instant,
    ) -> oneshot::Receiver<Result<NavigateReturns>> {
        let (tx, rx) = oneshot::channel();
        self.navigation_waiters
            .push(NavigationWaiter { tx, started: now });
        rx
    }

    fn resolve_navigation_waiters(&mut self, returns: impl Fn() -> NavigateReturns) {
        for waiter in self.navigation_waiters.drain(..) {
            let _ = waiter.tx.send(Ok(returns()));
        }
    }

    /// Issues a `Page.*` call to the content process hosting this frame
    pub fn page_call(&mut self, method: &'static str, params: Value) -> ResponseFuture {
        self.channel.connect(PAGE_SESSION).send(method, params)
    }

    /// Issues a `Runtime.*` call on behalf of the execution context `local`.
    pub fn runtime_call(
        &mut self,
        local: &ExecutionContextId,
        method: &'static str,
        mut params: Value,
    ) -> Result<ResponseFuture> {
        if !self.contexts.contains(local) {
            return Err(FrameError::ExecutionContextNotFound(
                self.global_id(local)?,
            ));
        }
        params["executionContextId"] = Value::String(local.to_string());
        Ok(self.channel.connect(RUNTIME_SESSION).send(method, params))
    }

    /// Dispatches an event received on the frame's channel
    pub fn on_event(
        &mut self,
        event: ContentEvent,
        factory: &dyn TransportFactory,
        events: &mut VecDeque<ProtocolEvent>,
    ) {
        match event {
            ContentEvent::ExecutionContextCreated(ContextCreated {
                execution_context_id,
                aux_data,
            }) => {
                let context = ExecutionContext::new(execution_context_id, aux_data);
                match self.context_created_event(&context) {
                    Ok(ev) => {
                        if self.contexts.insert(context) {
                            events.push_back(ev);
                        }
                    }
                    Err(err) => tracing::warn!(frame = %self.id, "{}", err),
                }
            }
            ContentEvent::ExecutionContextDestroyed(ev) => {
                if let Some(context) = self.contexts.remove(&ev.execution_context_id) {
                    if let Ok(ev) = self.context_destroyed_event(&context) {
                        events.push_back(ev);
                    }
                }
            }
            ContentEvent::Console(console) => self.on_console(console, events),
            ContentEvent::WorkerCreated(WorkerStarted { worker_id, url }) => {
                match WorkerId::compose(&self.id, &worker_id) {
                    Ok(id) if self.workers.contains_key(&id) => {
                        tracing::trace!(worker = %id, "Worker already tracked");
                        return;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(frame = %self.id, "{}", err);
                        return;
                    }
                }
                match Worker::new(
                    self.content_unit.browser_id,
                    &self.id,
                    worker_id,
                    url,
                    factory,
                ) {
                    Ok(worker) => {
                        events.push_back(worker.created_event(&self.id));
                        self.worker_ids.push(worker.id().clone());
                        self.workers.insert(worker.id().clone(), worker);
                    }
                    Err(err) => tracing::warn!(frame = %self.id, "{}", err),
                }
            }
            ContentEvent::WorkerDestroyed(ev) => {
                if let Ok(id) = WorkerId::compose(&self.id, &ev.worker_id) {
                    if let Some(worker) = self.workers.remove(&id) {
                        self.worker_ids.retain(|w| w != &id);
                        worker.destroy(events);
                    }
                }
            }
            ContentEvent::BindingCalled(BindingCall {
                execution_context_id,
                name,
                payload,
            }) => match self.global_id(&execution_context_id) {
                Ok(execution_context_id) => {
                    events.push_back(ProtocolEvent::BindingCalled(EventBindingCalled {
                        execution_context_id,
                        name,
                        payload,
                    }))
                }
                Err(err) => tracing::warn!(frame = %self.id, "{}", err),
            },
            ContentEvent::EventFired(ev) => {
                events.push_back(ProtocolEvent::EventFired(EventEventFired {
                    frame_id: self.id.clone(),
                    name: ev.name,
                }));
            }
            ContentEvent::UncaughtError(err) => {
                events.push_back(ProtocolEvent::UncaughtError(EventUncaughtError {
                    frame_id: self.id.clone(),
                    message: err.message,
                    stack: err.stack,
                }));
            }
        }
    }

    fn on_console(&mut self, console: ConsoleCalled, events: &mut VecDeque<ProtocolEvent>) {
        for id in &self.worker_ids {
            if let Some(worker) = self.workers.get_mut(id) {
                if worker.take_console_claim(&console.location) {
                    tracing::trace!(worker = %id, "Console message already reported by worker");
                    return;
                }
            }
        }
        if !self.contexts.contains(&console.execution_context_id) {
            tracing::trace!(
                frame = %self.id,
                context = %console.execution_context_id,
                "Console message of unknown execution context"
            );
            return;
        }
        if let Ok(execution_context_id) = self.global_id(&console.execution_context_id) {
            events.push_back(ProtocolEvent::Console(EventConsole {
                execution_context_id,
                args: console.args,
                r#type: console.r#type,
                location: console.location,
            }));
        }
    }

    fn destroy_workers(&mut self, reset: bool, events: &mut VecDeque<ProtocolEvent>) {
        for id in std::mem::take(&mut self.worker_ids) {
            if let Some(worker) = self.workers.remove(&id) {
                if reset {
                    worker.reset(events);
                } else {
                    worker.destroy(events);
                }
            }
        }
    }

    fn destroy_contexts(&mut self, events: &mut VecDeque<ProtocolEvent>) {
        for context in self.contexts.drain() {
            if let Ok(ev) = self.context_destroyed_event(&context) {
                events.push_back(ev);
            }
        }
    }

    /// Binds the frame to `content_unit`, which lives in a fresh content
    /// process.
    ///
    /// In flight calls fail with [`FrameError::ChannelReset`], workers and
    /// execution contexts are destroyed and will be reported anew by the new
    /// process. A pending navigation survives.
    pub fn rebind(
        &mut self,
        content_unit: ContentUnit,
        factory: &dyn TransportFactory,
        events: &mut VecDeque<ProtocolEvent>,
    ) {
        tracing::debug!(
            frame = %self.id,
            from = %self.content_unit.id,
            to = %content_unit.id,
            "Rebinding frame"
        );
        self.content_unit = content_unit;
        self.channel.rebind(factory);
        self.destroy_workers(true, events);
        self.destroy_contexts(events);
    }

    /// Detaches this frame alone, children are the tree's business.
    pub fn detach(mut self, events: &mut VecDeque<ProtocolEvent>) {
        tracing::debug!(frame = %self.id, "Detaching frame");
        self.destroy_workers(false, events);
        self.destroy_contexts(events);
        self.channel.close();
        for waiter in self.navigation_waiters.drain(..) {
            let _ = waiter.tx.send(Err(FrameError::FrameGone));
        }
        events.push_back(ProtocolEvent::FrameDetached(EventFrameDetached {
            frame_id: self.id,
        }));
    }

    pub fn evict_timed_out(
        &mut self,
        now: Instant,
        request_timeout: Duration,
        navigation_timeout: Duration,
    ) {
        self.channel.evict_timed_out(now, request_timeout);
        for worker in self.workers.values_mut() {
            worker.channel_mut().evict_timed_out(now, request_timeout);
        }
        let (expired, waiting) = std::mem::take(&mut self.navigation_waiters)
            .into_iter()
            .partition::<Vec<_>, _>(|waiter| {
                now.saturating_duration_since(waiter.started) > navigation_timeout
            });
        self.navigation_waiters = waiting;
        for waiter in expired {
            let _ = waiter.tx.send(Err(FrameError::Timeout(navigation_timeout)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::{MpscTransportFactory, Outbound};
    use crate::protocol::content::{DocumentEvent, WorkerStopped};
    use futures::channel::mpsc::UnboundedReceiver;
    use futures::executor::block_on;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn frame() -> (Frame, MpscTransportFactory, UnboundedReceiver<Outbound>) {
        let (factory, rx) = MpscTransportFactory::new();
        let frame = Frame::new(
            FrameId::new("frame-1"),
            None,
            ContentUnit::top_level(1, 1),
            &factory,
        );
        (frame, factory, rx)
    }

    fn context_created(id: &str) -> ContentEvent {
        ContentEvent::ExecutionContextCreated(ContextCreated {
            execution_context_id: ExecutionContextId::new(id),
            aux_data: json!({}),
        })
    }

    fn methods(events: &VecDeque<ProtocolEvent>) -> Vec<&'static str> {
        events.iter().map(|ev| ev.method()).collect()
    }

    #[test]
    fn second_start_is_dropped() {
        let (mut frame, _factory, _rx) = frame();
        let mut events = VecDeque::new();
        frame
            .on_navigation_started(NavigationId::new("1"), "https://a".into(), &mut events)
            .unwrap();
        let err = frame
            .on_navigation_started(NavigationId::new("2"), "https://b".into(), &mut events)
            .unwrap_err();
        assert!(matches!(err, FrameError::StaleNavigationEvent));
        assert_eq!(events.len(), 1);

        frame
            .on_navigation_committed("https://a".into(), "".into(), &mut events)
            .unwrap();
        match events.pop_back() {
            Some(ProtocolEvent::NavigationCommitted(ev)) => {
                assert_eq!(ev.navigation_id, NavigationId::new("1"));
                assert_eq!(ev.url, "https://a");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(frame.url(), "https://a");
        assert!(frame.pending_navigation().is_none());
    }

    #[test]
    fn commit_and_abort_without_start_are_stale() {
        let (mut frame, _factory, _rx) = frame();
        let mut events = VecDeque::new();
        assert!(frame
            .on_navigation_committed("https://a".into(), "".into(), &mut events)
            .is_err());
        assert!(frame.on_navigation_aborted(0x804B0002, &mut events).is_err());
        assert!(events.is_empty());
    }

    #[test]
    fn abort_carries_error_text() {
        let (mut frame, _factory, _rx) = frame();
        let mut events = VecDeque::new();
        frame
            .on_navigation_started(NavigationId::new("7"), "https://a".into(), &mut events)
            .unwrap();
        frame.on_navigation_aborted(0x804B001E, &mut events).unwrap();
        match events.pop_back() {
            Some(ProtocolEvent::NavigationAborted(ev)) => {
                assert_eq!(ev.navigation_id, NavigationId::new("7"));
                assert_eq!(ev.error_text, "NS_ERROR_UNKNOWN_HOST");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn navigation_waiters_resolve_on_start() {
        let (mut frame, _factory, _rx) = frame();
        let mut events = VecDeque::new();
        let rx = frame.wait_for_navigation(Instant::now());
        frame
            .on_navigation_started(NavigationId::new("3"), "https://c".into(), &mut events)
            .unwrap();
        let returns = block_on(rx).unwrap().unwrap();
        assert_eq!(returns.navigation_id, Some(NavigationId::new("3")));
        assert_eq!(returns.navigation_url.as_deref(), Some("https://c"));

        let rx = frame.wait_for_navigation(Instant::now());
        frame.on_same_document_navigation("https://c#x".into(), &mut events);
        let returns = block_on(rx).unwrap().unwrap();
        assert_eq!(returns.navigation_id, None);
        assert_eq!(frame.url(), "https://c#x");
    }

    #[test]
    fn globalizes_context_ids() {
        let (mut frame, factory, _rx) = frame();
        let mut events = VecDeque::new();
        frame.on_event(context_created("4"), &factory, &mut events);
        frame.on_event(context_created("4"), &factory, &mut events);
        assert_eq!(events.len(), 1);
        match events.pop_front() {
            Some(ProtocolEvent::ExecutionContextCreated(ev)) => {
                assert_eq!(ev.execution_context_id, GlobalId::new("frame-1/4"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(frame
            .runtime_call(&ExecutionContextId::new("9"), "Runtime.evaluate", json!({}))
            .is_err());
    }

    #[test]
    fn suppresses_console_claimed_by_worker() {
        let (mut frame, factory, _rx) = frame();
        let mut events = VecDeque::new();
        frame.on_event(context_created("1"), &factory, &mut events);
        frame.on_event(
            ContentEvent::WorkerCreated(WorkerStarted {
                worker_id: "w".into(),
                url: "https://a/w.js".into(),
            }),
            &factory,
            &mut events,
        );
        let location = ConsoleLocation {
            url: "https://a/w.js".into(),
            line_number: 1,
            column_number: 1,
        };
        let console = ConsoleCalled {
            execution_context_id: ExecutionContextId::new("1"),
            args: vec![],
            r#type: "log".into(),
            location,
        };
        let worker_id = WorkerId::new("frame-1/w");
        frame.worker_mut(&worker_id).unwrap().on_event(
            WorkerEvent::Console(console.clone()),
            &mut events,
        );
        events.clear();

        frame.on_event(ContentEvent::Console(console.clone()), &factory, &mut events);
        assert!(events.is_empty());
        frame.on_event(ContentEvent::Console(console), &factory, &mut events);
        assert_eq!(methods(&events), vec!["Runtime.console"]);
    }

    #[test]
    fn detach_order() {
        let (mut frame, factory, _rx) = frame();
        let mut events = VecDeque::new();
        frame.on_event(context_created("1"), &factory, &mut events);
        frame.on_event(
            ContentEvent::WorkerCreated(WorkerStarted {
                worker_id: "w".into(),
                url: String::new(),
            }),
            &factory,
            &mut events,
        );
        let call = frame.page_call("Page.reload", json!({}));
        let waiter = frame.wait_for_navigation(Instant::now());
        events.clear();

        frame.detach(&mut events);
        assert_eq!(
            methods(&events),
            vec![
                "Page.workerDestroyed",
                "Runtime.executionContextDestroyed",
                "Page.frameDetached"
            ]
        );
        assert!(matches!(block_on(call), Err(FrameError::FrameGone)));
        assert!(matches!(block_on(waiter), Ok(Err(FrameError::FrameGone))));
    }

    /// Counts the transports it hands out
    #[derive(Debug)]
    struct CountingFactory {
        inner: MpscTransportFactory,
        created: AtomicUsize,
    }

    impl TransportFactory for CountingFactory {
        fn create(
            &self,
            name: &ChannelName,
            generation: u64,
        ) -> Result<Box<dyn crate::conn::Transport>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            self.inner.create(name, generation)
        }
    }

    #[test]
    fn duplicate_worker_does_not_bind_a_transport() {
        let (inner, _rx) = MpscTransportFactory::new();
        let factory = CountingFactory {
            inner,
            created: AtomicUsize::new(0),
        };
        let mut frame = Frame::new(
            FrameId::new("frame-1"),
            None,
            ContentUnit::top_level(1, 1),
            &factory,
        );
        let mut events = VecDeque::new();
        for _ in 0..2 {
            frame.on_event(
                ContentEvent::WorkerCreated(WorkerStarted {
                    worker_id: "w".into(),
                    url: String::new(),
                }),
                &factory,
                &mut events,
            );
        }
        assert_eq!(methods(&events), vec!["Page.workerCreated"]);
        // the frame's own channel and the first worker
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn rebind_resets_channel_and_state() {
        let (mut frame, factory, _rx) = frame();
        let mut events = VecDeque::new();
        frame.on_event(context_created("1"), &factory, &mut events);
        frame
            .on_navigation_started(NavigationId::new("1"), "https://b".into(), &mut events)
            .unwrap();
        let call = frame.page_call("Page.reload", json!({}));
        events.clear();

        frame.rebind(ContentUnit::top_level(2, 1), &factory, &mut events);
        assert_eq!(frame.content_unit().id, ContentUnitId(2));
        assert_eq!(frame.channel().generation(), 2);
        assert!(matches!(block_on(call), Err(FrameError::ChannelReset)));
        assert_eq!(methods(&events), vec!["Runtime.executionContextDestroyed"]);
        assert!(frame.pending_navigation().is_some());
    }

    #[test]
    fn forwards_page_events() {
        let (mut frame, factory, _rx) = frame();
        let mut events = VecDeque::new();
        frame.on_event(
            ContentEvent::EventFired(DocumentEvent {
                name: "load".into(),
            }),
            &factory,
            &mut events,
        );
        frame.on_event(
            ContentEvent::WorkerDestroyed(WorkerStopped {
                worker_id: "unknown".into(),
            }),
            &factory,
            &mut events,
        );
        assert_eq!(methods(&events), vec!["Page.eventFired"]);
    }
}
