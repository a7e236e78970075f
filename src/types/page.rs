use serde::{Deserialize, Serialize};

/// Stable handle for a page node, assigned by the host.
pub type NodeId = u64;

/// An `img` or `[role="img"]` element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageNode {
    pub id: NodeId,
    pub alt: Option<String>,
    pub aria_label: Option<String>,
    pub title: Option<String>,
}

/// A badge/tag/status-like element that may encode meaning in its background color.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LegendCandidate {
    pub id: NodeId,
    pub background_color: Option<String>,
    pub text: Option<String>,
    pub aria_label: Option<String>,
    pub title: Option<String>,
}

/// One coalesced batch of DOM mutation records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MutationBatch {
    /// Images found in (or being) the added nodes.
    pub added_images: Vec<ImageNode>,
    /// Ids of removed nodes and their image descendants.
    pub removed_nodes: Vec<NodeId>,
    pub added_count: usize,
}

impl MutationBatch {
    pub fn has_additions(&self) -> bool {
        self.added_count > 0 || !self.added_images.is_empty()
    }
}

/// Host-side registrations made while the reader is active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ListenerKind {
    MutationObserver,
    PointerMove,
    Scroll,
    Resize,
}

/// Handle returned by the host for a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub u64);
