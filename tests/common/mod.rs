#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures::channel::mpsc::{unbounded, UnboundedReceiver};
use futures::{FutureExt, StreamExt};
use serde_json::Value;

use frameoxide::conn::{ChannelName, InboundMessage, MpscTransportFactory, Outbound};
use frameoxide::handler::bootstrap::{BootstrapSnapshot, BootstrapStore, SharedBootstrap};
use frameoxide::handler::frame::FrameInfo;
use frameoxide::handler::EventStream;
use frameoxide::protocol::*;
use frameoxide::types::{EventMessage, Message, MethodCall, Outgoing};
use frameoxide::{HandlerConfig, Host, PageEvent};

const WAIT: Duration = Duration::from_secs(5);

/// A running handler with the parent process side wired up
pub struct Harness {
    pub host: Host,
    pub outbound: UnboundedReceiver<Outbound>,
    pub bootstrap: SharedBootstrap,
    /// Everything the handler yielded, in order
    pub yielded: UnboundedReceiver<PageEvent>,
}

pub fn harness() -> Harness {
    harness_with(HandlerConfig::default())
}

pub fn harness_with(config: HandlerConfig) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
    let (factory, outbound) = MpscTransportFactory::new();
    let bootstrap = SharedBootstrap::new();
    let (host, mut handler) = Host::new(config, Arc::new(factory), Arc::new(bootstrap.clone()));
    let (tx, yielded) = unbounded();
    async_std::task::spawn(async move {
        while let Some(event) = handler.next().await {
            let _ = tx.unbounded_send(event);
        }
    });
    Harness {
        host,
        outbound,
        bootstrap,
        yielded,
    }
}

impl Harness {
    pub async fn attach(&self, unit: ContentUnit) {
        self.structural(StructuralNotification::Attached {
            unit,
            why: AttachReason::Attach,
        })
        .await
    }

    pub async fn replace(&self, unit: ContentUnit) {
        self.structural(StructuralNotification::Attached {
            unit,
            why: AttachReason::Replace,
        })
        .await
    }

    pub async fn discard(&self, unit: ContentUnit, why: DiscardReason) {
        self.structural(StructuralNotification::Discarded { unit, why })
            .await
    }

    pub async fn structural(&self, notification: StructuralNotification) {
        self.host.notify_structural(notification).await.unwrap()
    }

    pub async fn started(&self, unit: ContentUnit, navigation_id: &str, url: &str) {
        self.host
            .notify_navigation(NavigationNotification::Started {
                unit,
                navigation_id: NavigationId::new(navigation_id),
                url: url.to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn committed(&self, unit: ContentUnit, url: &str) {
        self.host
            .notify_navigation(NavigationNotification::Committed {
                unit,
                url: url.to_string(),
                name: String::new(),
            })
            .await
            .unwrap()
    }

    /// Emits an event on the channel as the content process would
    pub async fn content_event(
        &self,
        channel: ChannelName,
        generation: u64,
        session: &str,
        method: &'static str,
        params: Value,
    ) {
        let event = EventMessage::new(session, method, params);
        self.host
            .deliver(InboundMessage::new(channel, generation, Message::Event(event)))
            .await
            .unwrap()
    }

    pub async fn reply(&self, outbound: &Outbound, result: Value) {
        self.host
            .deliver(outbound.reply(result).expect("not a call"))
            .await
            .unwrap()
    }

    pub async fn next_outbound(&mut self) -> Outbound {
        async_std::future::timeout(WAIT, self.outbound.next())
            .await
            .expect("timed out waiting for an outbound message")
            .expect("outbound closed")
    }

    /// Attaches a protocol session to the tab
    pub async fn session(&self, browser_id: u64) -> EventStream {
        self.host.attach_session(BrowserId(browser_id)).await.unwrap()
    }

    /// Every event the session received so far.
    ///
    /// Sessions are fed while the handler processes a message, the frames
    /// request makes sure everything sent before was processed.
    pub async fn drain(&self, session: &mut EventStream) -> Vec<ProtocolEvent> {
        let _ = self.host.frames(session.browser_id()).await;
        let mut events = Vec::new();
        while let Some(Some(event)) = session.next().now_or_never() {
            events.push(event);
        }
        events
    }

    pub fn bootstrap_snapshot(&self, browser_id: u64) -> Option<BootstrapSnapshot> {
        self.bootstrap.read(BrowserId(browser_id))
    }

    pub async fn frames(&self, browser_id: u64) -> Vec<FrameInfo> {
        self.host.frames(BrowserId(browser_id)).await.unwrap()
    }
}

pub fn call(outbound: &Outbound) -> &MethodCall {
    match outbound.message {
        Outgoing::Call(ref call) => call,
        ref other => panic!("expected a call, got {:?}", other),
    }
}

pub fn frame_channel(browser_id: u64, frame_id: &str) -> ChannelName {
    ChannelName::frame(BrowserId(browser_id), FrameId::new(frame_id))
}

pub fn methods(events: &[ProtocolEvent]) -> Vec<&'static str> {
    events.iter().map(|ev| ev.method()).collect()
}
