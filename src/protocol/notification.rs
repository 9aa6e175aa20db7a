//! Notifications the host process delivers about content units.

use serde::{Deserialize, Serialize};

use crate::protocol::{BrowserId, ContentUnit, NavigationId};

/// Why a content unit was attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttachReason {
    /// A new frame was created
    Attach,
    /// The unit takes over an existing frame, like after a cross group
    /// navigation
    Replace,
}

/// Why a content unit was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscardReason {
    /// The frame is gone for good
    Discard,
    /// The unit was replaced, the frame lives on in another unit
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum StructuralNotification {
    Attached { unit: ContentUnit, why: AttachReason },
    Discarded { unit: ContentUnit, why: DiscardReason },
    /// The unit is about to be hosted by another content process
    ProcessSwitch { unit: ContentUnit },
}

impl StructuralNotification {
    pub fn unit(&self) -> &ContentUnit {
        match self {
            StructuralNotification::Attached { unit, .. } => unit,
            StructuralNotification::Discarded { unit, .. } => unit,
            StructuralNotification::ProcessSwitch { unit } => unit,
        }
    }

    pub fn browser_id(&self) -> BrowserId {
        self.unit().browser_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NavigationNotification {
    Started {
        unit: ContentUnit,
        navigation_id: NavigationId,
        url: String,
    },
    Committed {
        unit: ContentUnit,
        url: String,
        name: String,
    },
    Aborted {
        unit: ContentUnit,
        error_code: u32,
    },
    SameDocument {
        unit: ContentUnit,
        url: String,
    },
}

impl NavigationNotification {
    pub fn unit(&self) -> &ContentUnit {
        match self {
            NavigationNotification::Started { unit, .. } => unit,
            NavigationNotification::Committed { unit, .. } => unit,
            NavigationNotification::Aborted { unit, .. } => unit,
            NavigationNotification::SameDocument { unit, .. } => unit,
        }
    }

    pub fn browser_id(&self) -> BrowserId {
        self.unit().browser_id
    }
}
