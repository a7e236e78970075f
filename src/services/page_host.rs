//! The live page the reader styles.
//!
//! Reads (computed styles, candidate nodes, viewport) go through [`PageHost`] queries;
//! every write is a [`PageCommand`] so hosts can forward them over any transport.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::services::color_legend::LegendEntry;
use crate::services::reading_mask::MaskGeometry;
use crate::types::errors::HostError;
use crate::types::page::{ImageNode, LegendCandidate, ListenerKind, NodeId, RegistrationId};
use crate::types::theme::PageStyleSnapshot;

/// A paint-affecting write to the page.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum PageCommand {
    SetProperty { name: String, value: String },
    RemoveProperty { name: String },
    ShowLegend { entries: Vec<LegendEntry> },
    ClearLegend,
    Annotate { annotations: Vec<(NodeId, String)> },
    RemoveAnnotations { nodes: Vec<NodeId> },
    Mask { geometry: Option<MaskGeometry> },
    Status { text: String },
    Onboarding { visible: bool },
    ListenerAdded { kind: ListenerKind, id: u64 },
    ListenerRemoved { id: u64 },
}

/// Fresh page observations pushed by the host.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PageUpdate {
    pub snapshot: Option<PageStyleSnapshot>,
    pub legend_candidates: Option<Vec<LegendCandidate>>,
    pub images: Option<Vec<ImageNode>>,
    pub viewport_height: Option<f64>,
    pub pointer_y: Option<f64>,
}

pub trait PageHost: Send {
    fn snapshot(&self) -> Result<PageStyleSnapshot, HostError>;
    fn legend_candidates(&self) -> Vec<LegendCandidate>;
    fn images(&self) -> Vec<ImageNode>;
    fn viewport_height(&self) -> f64;
    fn register_listener(&mut self, kind: ListenerKind) -> Result<RegistrationId, HostError>;
    fn release_listener(&mut self, id: RegistrationId);
    fn apply(&mut self, command: PageCommand);

    /// Accepts new observations. Hosts that read the page directly ignore this.
    fn ingest(&mut self, _update: &PageUpdate) {}

    /// Commands not yet forwarded to the real page.
    fn drain_commands(&mut self) -> Vec<PageCommand> {
        Vec::new()
    }
}

/// A page described by pushed observations, recording every command it receives.
#[derive(Debug, Default)]
pub struct StaticPage {
    snapshot: Option<PageStyleSnapshot>,
    candidates: Vec<LegendCandidate>,
    images: Vec<ImageNode>,
    viewport_height: f64,
    next_registration: u64,
    live: BTreeSet<u64>,
    properties: BTreeMap<String, String>,
    outbox: Vec<PageCommand>,
}

impl StaticPage {
    pub fn new(snapshot: Option<PageStyleSnapshot>) -> Self {
        Self {
            snapshot,
            viewport_height: 800.0,
            ..Default::default()
        }
    }

    pub fn with_candidates(mut self, candidates: Vec<LegendCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_images(mut self, images: Vec<ImageNode>) -> Self {
        self.images = images;
        self
    }

    /// Current value of a root style property.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn live_registrations(&self) -> usize {
        self.live.len()
    }
}

impl PageHost for StaticPage {
    fn snapshot(&self) -> Result<PageStyleSnapshot, HostError> {
        self.snapshot
            .clone()
            .ok_or_else(|| HostError::SnapshotFailed("no style snapshot received".into()))
    }

    fn legend_candidates(&self) -> Vec<LegendCandidate> {
        self.candidates.clone()
    }

    fn images(&self) -> Vec<ImageNode> {
        self.images.clone()
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn register_listener(&mut self, kind: ListenerKind) -> Result<RegistrationId, HostError> {
        self.next_registration += 1;
        let id = self.next_registration;
        self.live.insert(id);
        self.outbox.push(PageCommand::ListenerAdded { kind, id });
        Ok(RegistrationId(id))
    }

    fn release_listener(&mut self, id: RegistrationId) {
        if self.live.remove(&id.0) {
            self.outbox.push(PageCommand::ListenerRemoved { id: id.0 });
        }
    }

    fn apply(&mut self, command: PageCommand) {
        match &command {
            PageCommand::SetProperty { name, value } => {
                self.properties.insert(name.clone(), value.clone());
            }
            PageCommand::RemoveProperty { name } => {
                self.properties.remove(name);
            }
            _ => {}
        }
        self.outbox.push(command);
    }

    fn ingest(&mut self, update: &PageUpdate) {
        if let Some(snapshot) = &update.snapshot {
            self.snapshot = Some(snapshot.clone());
        }
        if let Some(candidates) = &update.legend_candidates {
            self.candidates = candidates.clone();
        }
        if let Some(images) = &update.images {
            self.images = images.clone();
        }
        if let Some(height) = update.viewport_height.filter(|h| h.is_finite() && *h >= 0.0) {
            self.viewport_height = height;
        }
    }

    fn drain_commands(&mut self) -> Vec<PageCommand> {
        std::mem::take(&mut self.outbox)
    }
}
