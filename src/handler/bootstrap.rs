//! Bootstrap state for content processes that are not yet talking to us.
//!
//! A freshly spawned content process reads the snapshot of its tab once,
//! before its first message, so it agrees with the frame tree on frame ids,
//! init scripts and bindings.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use fnv::FnvHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::protocol::{Binding, BrowserId, ContentUnitId, FrameId, InitScript};

/// Everything a new content process of a tab needs to know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapSnapshot {
    /// Increases with every write of the tab's snapshot
    pub version: u64,
    pub frame_ids: BTreeMap<ContentUnitId, FrameId>,
    pub init_scripts: Vec<InitScript>,
    pub bindings: Vec<Binding>,
}

impl BootstrapSnapshot {
    /// The frame id assigned to `unit`
    pub fn frame_id(&self, unit: ContentUnitId) -> Option<&FrameId> {
        self.frame_ids.get(&unit)
    }
}

/// Shared slot per tab, readable from other processes.
///
/// Writes always replace the whole snapshot and reads always return a full
/// copy.
pub trait BootstrapStore: fmt::Debug + Send + Sync {
    fn write(&self, browser_id: BrowserId, snapshot: BootstrapSnapshot);

    fn read(&self, browser_id: BrowserId) -> Option<BootstrapSnapshot>;

    fn remove(&self, browser_id: BrowserId);
}

/// An in memory [`BootstrapStore`], shared by cloning.
#[derive(Debug, Clone, Default)]
pub struct SharedBootstrap {
    inner: Arc<RwLock<FnvHashMap<BrowserId, BootstrapSnapshot>>>,
}

impl SharedBootstrap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BootstrapStore for SharedBootstrap {
    fn write(&self, browser_id: BrowserId, snapshot: BootstrapSnapshot) {
        let mut slots = self.inner.write();
        match slots.get(&browser_id) {
            Some(current) if current.version >= snapshot.version => {
                tracing::trace!(
                    %browser_id,
                    version = snapshot.version,
                    "Ignoring outdated snapshot"
                );
            }
            _ => {
                slots.insert(browser_id, snapshot);
            }
        }
    }

    fn read(&self, browser_id: BrowserId) -> Option<BootstrapSnapshot> {
        self.inner.read().get(&browser_id).cloned()
    }

    fn remove(&self, browser_id: BrowserId) {
        self.inner.write().remove(&browser_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(version: u64, frames: &[(u64, &str)]) -> BootstrapSnapshot {
        BootstrapSnapshot {
            version,
            frame_ids: frames
                .iter()
                .map(|(unit, frame)| (ContentUnitId(*unit), FrameId::new(*frame)))
                .collect(),
            init_scripts: vec![InitScript::new("window.x = 1")],
            bindings: vec![],
        }
    }

    #[test]
    fn full_replace_with_monotonic_versions() {
        let store = SharedBootstrap::new();
        let browser = BrowserId(1);
        assert!(store.read(browser).is_none());

        store.write(browser, snapshot(1, &[(10, "frame-1")]));
        store.write(browser, snapshot(2, &[(10, "frame-1"), (11, "frame-2")]));
        // a late write of an older snapshot does not win
        store.write(browser, snapshot(1, &[(10, "frame-1")]));

        let read = store.read(browser).unwrap();
        assert_eq!(read.version, 2);
        assert_eq!(read.frame_id(ContentUnitId(11)), Some(&FrameId::new("frame-2")));

        store.remove(browser);
        assert!(store.read(browser).is_none());
    }
}
