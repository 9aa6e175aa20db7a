use std::collections::VecDeque;

use serde_json::json;

use crate::conn::{Channel, ChannelName, ResponseFuture, TransportFactory, WORKER_SESSION};
use crate::error::Result;
use crate::handler::execution::{ExecutionContext, ExecutionContexts};
use crate::protocol::content::{ConsoleCalled, ContextCreated};
use crate::protocol::{
    BrowserId, ConsoleLocation, EventDispatchMessageFromWorker, EventWorkerConsole,
    EventWorkerCreated, EventWorkerDestroyed, EventWorkerExecutionContextCreated,
    EventWorkerExecutionContextDestroyed, FrameId, ProtocolEvent, WorkerEvent, WorkerId,
};

/// How many console messages a worker remembers for the owning frame, the
/// oldest claim is dropped first
pub const MAX_CONSOLE_CLAIMS: usize = 256;

/// A dedicated worker spawned by a frame's document.
///
/// Workers talk over their own channel, their console messages can also
/// surface through the owning frame, so the worker claims every message it
/// reports.
#[derive(Debug)]
pub struct Worker {
    id: WorkerId,
    local_id: String,
    url: String,
    channel: Channel,
    contexts: ExecutionContexts,
    /// Console locations reported by the worker and not yet seen on the
    /// frame, oldest first
    claimed: VecDeque<ConsoleLocation>,
}

impl Worker {
    pub fn new(
        browser_id: BrowserId,
        frame_id: &FrameId,
        local_id: String,
        url: String,
        factory: &dyn TransportFactory,
    ) -> Result<Self> {
        let id = WorkerId::compose(frame_id, &local_id)?;
        let mut channel = Channel::new(
            ChannelName {
                browser_id,
                frame_id: frame_id.clone(),
                worker_id: Some(id.clone()),
            },
            factory,
        );
        channel.register(WORKER_SESSION);
        Ok(Self {
            id,
            local_id,
            url,
            channel,
            contexts: Default::default(),
            claimed: Default::default(),
        })
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn url(&self) -> &str {
        &self.url
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

    pub(crate) fn created_event(&self, frame_id: &FrameId) -> ProtocolEvent {
        ProtocolEvent::WorkerCreated(EventWorkerCreated {
            frame_id: frame_id.clone(),
            worker_id: self.id.clone(),
            url: self.url.clone(),
        })
    }

    pub(crate) fn context_created_event(&self, context: &ExecutionContext) -> ProtocolEvent {
        ProtocolEvent::WorkerExecutionContextCreated(EventWorkerExecutionContextCreated {
            worker_id: self.id.clone(),
            execution_context_id: context.local_id().clone(),
            aux_data: context.aux_data().clone(),
        })
    }

    /// Delivers a message to the worker's global scope
    pub fn send_message(&mut self, message: String) -> ResponseFuture {
        self.channel
            .connect(WORKER_SESSION)
            .send("Worker.sendMessage", json!({ "message": message }))
    }

    pub fn on_event(&mut self, event: WorkerEvent, events: &mut VecDeque<ProtocolEvent>) {
        match event {
            WorkerEvent::ExecutionContextCreated(ContextCreated {
                execution_context_id,
                aux_data,
            }) => {
                let context = ExecutionContext::new(execution_context_id, aux_data);
                let ev = self.context_created_event(&context);
                if self.contexts.insert(context) {
                    events.push_back(ev);
                }
            }
            WorkerEvent::ExecutionContextDestroyed(ev) => {
                if let Some(context) = self.contexts.remove(&ev.execution_context_id) {
                    events.push_back(self.context_destroyed_event(context));
                }
            }
            WorkerEvent::Console(ConsoleCalled {
                execution_context_id,
                args,
                r#type,
                location,
            }) => {
                if self.claimed.len() == MAX_CONSOLE_CLAIMS {
                    self.claimed.pop_front();
                }
                self.claimed.push_back(location.clone());
                events.push_back(ProtocolEvent::WorkerConsole(EventWorkerConsole {
                    worker_id: self.id.clone(),
                    execution_context_id,
                    args,
                    r#type,
                    location,
                }));
            }
            WorkerEvent::Dispatch(dispatch) => {
                events.push_back(ProtocolEvent::DispatchMessageFromWorker(
                    EventDispatchMessageFromWorker {
                        worker_id: self.id.clone(),
                        message: dispatch.message,
                    },
                ));
            }
        }
    }

    /// Consumes a claim on a console message at `location`.
    ///
    /// Returns `true` if the worker already reported the message.
    pub fn take_console_claim(&mut self, location: &ConsoleLocation) -> bool {
        match self.claimed.iter().position(|claim| claim == location) {
            Some(idx) => {
                self.claimed.remove(idx);
                true
            }
            None => false,
        }
    }

    fn context_destroyed_event(&self, context: ExecutionContext) -> ProtocolEvent {
        ProtocolEvent::WorkerExecutionContextDestroyed(EventWorkerExecutionContextDestroyed {
            worker_id: self.id.clone(),
            execution_context_id: context.local_id().clone(),
        })
    }

    /// Tears the worker down: its contexts are destroyed, in flight calls are
    /// rejected and `workerDestroyed` is the last event about it.
    pub fn destroy(mut self, events: &mut VecDeque<ProtocolEvent>) {
        for context in self.contexts.drain() {
            events.push_back(self.context_destroyed_event(context));
        }
        self.channel.close();
        events.push_back(ProtocolEvent::WorkerDestroyed(EventWorkerDestroyed {
            worker_id: self.id,
        }));
    }

    /// Like [`Worker::destroy`] but in flight calls fail with `ChannelReset`
    /// since the worker's process was swapped out.
    pub fn reset(mut self, events: &mut VecDeque<ProtocolEvent>) {
        self.channel.reset_transport();
        self.destroy(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::MpscTransportFactory;
    use crate::protocol::content::WorkerDispatch;
    use crate::protocol::ExecutionContextId;
    use serde_json::json;

    fn worker() -> Worker {
        let (factory, _rx) = MpscTransportFactory::new();
        let frame = FrameId::new("frame-1");
        Worker::new(
            BrowserId(1),
            &frame,
            "5".to_string(),
            "https://a/worker.js".to_string(),
            &factory,
        )
        .unwrap()
    }

    fn console(line: i64) -> ConsoleCalled {
        ConsoleCalled {
            execution_context_id: ExecutionContextId::new("1"),
            args: vec![json!("hi")],
            r#type: "log".to_string(),
            location: ConsoleLocation {
                url: "https://a/worker.js".to_string(),
                line_number: line,
                column_number: 3,
            },
        }
    }

    #[test]
    fn composes_worker_id() {
        let worker = worker();
        assert_eq!(worker.id().as_ref(), "frame-1/5");
        assert_eq!(worker.channel().name().worker_id, Some(worker.id().clone()));
    }

    #[test]
    fn claims_console_messages() {
        let mut worker = worker();
        let mut events = VecDeque::new();
        worker.on_event(WorkerEvent::Console(console(10)), &mut events);
        worker.on_event(WorkerEvent::Console(console(10)), &mut events);
        assert_eq!(events.len(), 2);

        let location = console(10).location;
        assert!(worker.take_console_claim(&location));
        assert!(worker.take_console_claim(&location));
        assert!(!worker.take_console_claim(&location));
        assert!(!worker.take_console_claim(&console(11).location));
    }

    #[test]
    fn console_claims_are_capped() {
        let mut worker = worker();
        let mut events = VecDeque::new();
        let total = MAX_CONSOLE_CLAIMS as i64 + 100;
        for line in 0..total {
            worker.on_event(WorkerEvent::Console(console(line)), &mut events);
        }
        assert_eq!(events.len(), total as usize);
        assert_eq!(worker.claimed.len(), MAX_CONSOLE_CLAIMS);

        // the oldest claims were dropped, the recent ones are still honored
        assert!(!worker.take_console_claim(&console(0).location));
        assert!(worker.take_console_claim(&console(total - 1).location));
        assert_eq!(worker.claimed.len(), MAX_CONSOLE_CLAIMS - 1);
    }

    #[test]
    fn destroy_reports_contexts_first() {
        let mut worker = worker();
        let mut events = VecDeque::new();
        worker.on_event(
            WorkerEvent::ExecutionContextCreated(ContextCreated {
                execution_context_id: ExecutionContextId::new("1"),
                aux_data: json!({}),
            }),
            &mut events,
        );
        worker.on_event(
            WorkerEvent::Dispatch(WorkerDispatch {
                message: "ping".to_string(),
            }),
            &mut events,
        );
        events.clear();

        worker.destroy(&mut events);
        let methods: Vec<_> = events.iter().map(|ev| ev.method()).collect();
        assert_eq!(
            methods,
            vec!["Worker.executionContextDestroyed", "Page.workerDestroyed"]
        );
    }
}
