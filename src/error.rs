use std::fmt;
use std::time::Duration;

use futures::channel::mpsc::SendError;
use futures::channel::oneshot::Canceled;
use thiserror::Error;

use crate::protocol::{BrowserId, ContentUnitId, FrameId, GlobalId, WorkerId};

pub type Result<T, E = FrameError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum FrameError {
    /// A structural notification referenced a parent that is not tracked.
    #[error("No frame for parent content unit {parent} of {unit}")]
    OrphanFrame {
        unit: ContentUnitId,
        parent: ContentUnitId,
    },
    #[error("Failed to find frame with {0}")]
    FrameNotFound(FrameLookup),
    #[error("Failed to find execution context with id = {0}")]
    ExecutionContextNotFound(GlobalId),
    #[error("Failed to find worker with id = {0}")]
    WorkerNotFound(WorkerId),
    #[error("No page for browser id {0}")]
    PageNotFound(BrowserId),
    /// The transport of the channel was swapped while the call was in flight
    #[error("Channel was reset while the call was in flight")]
    ChannelReset,
    /// The frame or worker owning the channel was detached
    #[error("Frame was detached while the call was in flight")]
    FrameGone,
    #[error("Navigation event without a matching pending navigation")]
    StaleNavigationEvent,
    #[error("Invalid id \"{0}\"")]
    InvalidId(String),
    #[error("Invalid url: \"{0}\"")]
    InvalidUrl(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Remote(#[from] frameoxide_types::Error),
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    ChannelSend(#[from] SendError),
    #[error("{0}")]
    Canceled(#[from] Canceled),
    #[error("The handler is no longer running")]
    HandlerClosed,
}

/// The key a frame was looked up by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameLookup {
    Id(FrameId),
    ContentUnit(ContentUnitId),
}

impl fmt::Display for FrameLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameLookup::Id(id) => write!(f, "id = {}", id),
            FrameLookup::ContentUnit(unit) => write!(f, "content unit {}", unit),
        }
    }
}

impl FrameError {
    /// Whether this error only signals that the targeted frame went away or was
    /// taken over by another process.
    pub fn is_frame_gone(&self) -> bool {
        matches!(self, FrameError::FrameGone | FrameError::ChannelReset)
    }
}
