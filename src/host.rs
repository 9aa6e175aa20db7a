use std::sync::Arc;
use std::time::Duration;

use futures::channel::mpsc::{channel, Sender};
use futures::channel::oneshot::channel as oneshot_channel;
use futures::SinkExt;

use crate::conn::{InboundMessage, TransportFactory};
use crate::error::{FrameError, Result};
use crate::handler::bootstrap::BootstrapStore;
use crate::handler::frame::FrameInfo;
use crate::handler::{
    EventStream, Handler, HandlerMessage, SessionId, NAVIGATION_TIMEOUT, REQUEST_TIMEOUT,
};
use crate::page::Page;
use crate::protocol::{BrowserId, NavigationNotification, StructuralNotification};

/// How the [`Handler`] is tuned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Calls to content that did not get a reply within this time fail with
    /// [`FrameError::Timeout`]
    pub request_timeout: Duration,
    /// Callers waiting for a navigation to start give up after this
    pub navigation_timeout: Duration,
    /// How often timed out calls are looked for
    pub eviction_interval: Duration,
    /// Capacity of the channel between the handles and the handler
    pub channel_capacity: usize,
}

impl HandlerConfig {
    pub fn builder() -> HandlerConfigBuilder {
        HandlerConfigBuilder::default()
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT),
            navigation_timeout: Duration::from_millis(NAVIGATION_TIMEOUT),
            eviction_interval: Duration::from_secs(1),
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HandlerConfigBuilder {
    request_timeout: Duration,
    navigation_timeout: Duration,
    eviction_interval: Duration,
    channel_capacity: usize,
}

impl Default for HandlerConfigBuilder {
    fn default() -> Self {
        let config = HandlerConfig::default();
        Self {
            request_timeout: config.request_timeout,
            navigation_timeout: config.navigation_timeout,
            eviction_interval: config.eviction_interval,
            channel_capacity: config.channel_capacity,
        }
    }
}

impl HandlerConfigBuilder {
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = interval;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn build(self) -> std::result::Result<HandlerConfig, String> {
        if self.request_timeout.is_zero() {
            return Err("request timeout must not be zero".to_string());
        }
        if self.navigation_timeout.is_zero() {
            return Err("navigation timeout must not be zero".to_string());
        }
        if self.eviction_interval.is_zero() {
            return Err("eviction interval must not be zero".to_string());
        }
        if self.channel_capacity == 0 {
            return Err("channel capacity must not be zero".to_string());
        }
        Ok(HandlerConfig {
            request_timeout: self.request_timeout,
            navigation_timeout: self.navigation_timeout,
            eviction_interval: self.eviction_interval,
            channel_capacity: self.channel_capacity,
        })
    }
}

/// The parent process's handle to the [`Handler`].
///
/// Feeds the notifications of the content units, the messages read from the
/// content processes and the protocol sessions into the handler. Cheap to
/// clone.
#[derive(Debug, Clone)]
pub struct Host {
    /// The `Sender` to send messages to the handler that owns all frame trees
    sender: Sender<HandlerMessage>,
    config: HandlerConfig,
}

impl Host {
    /// Creates the handle and the [`Handler`] it talks to, the handler must be
    /// polled for anything to happen.
    pub fn new(
        config: HandlerConfig,
        factory: Arc<dyn TransportFactory>,
        bootstrap: Arc<dyn BootstrapStore>,
    ) -> (Self, Handler) {
        let (tx, rx) = channel(config.channel_capacity);
        let handler = Handler::new(rx, &config, factory, bootstrap);
        (Self { sender: tx, config }, handler)
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    async fn send(&self, msg: HandlerMessage) -> Result<()> {
        self.sender.clone().send(msg).await?;
        Ok(())
    }

    /// A content unit was attached, discarded or is switching processes
    pub async fn notify_structural(&self, notification: StructuralNotification) -> Result<()> {
        self.send(HandlerMessage::Structural(notification)).await
    }

    /// A content unit's navigation progressed
    pub async fn notify_navigation(&self, notification: NavigationNotification) -> Result<()> {
        self.send(HandlerMessage::Navigation(notification)).await
    }

    /// Delivers a message read from a content process transport
    pub async fn deliver(&self, msg: InboundMessage) -> Result<()> {
        self.send(HandlerMessage::Inbound(msg)).await
    }

    /// Attaches a protocol session to the tab.
    ///
    /// The stream replays the tab's current state before any live event.
    pub async fn attach_session(&self, browser_id: BrowserId) -> Result<EventStream> {
        let (tx, rx) = oneshot_channel();
        self.send(HandlerMessage::Subscribe(browser_id, tx)).await?;
        rx.await?
    }

    pub async fn detach_session(&self, session: SessionId) -> Result<()> {
        self.send(HandlerMessage::Unsubscribe(session)).await
    }

    /// Snapshot of the tab's frames, parents first
    pub async fn frames(&self, browser_id: BrowserId) -> Result<Vec<FrameInfo>> {
        let (tx, rx) = oneshot_channel();
        self.send(HandlerMessage::GetFrames(browser_id, tx)).await?;
        rx.await?
    }

    /// A handle to issue commands to the tab
    pub async fn page(&self, browser_id: BrowserId) -> Result<Page> {
        let frames = self.frames(browser_id).await?;
        if frames.is_empty() {
            return Err(FrameError::PageNotFound(browser_id));
        }
        Ok(Page::new(browser_id, self.sender.clone()))
    }
}
