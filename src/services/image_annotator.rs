//! Image annotations — visible text labels derived from image alt text.

use std::collections::BTreeMap;

use crate::types::page::{ImageNode, NodeId};

/// Labels longer than this are truncated.
pub const MAX_LABEL_CHARS: usize = 160;
const TRUNCATED_CHARS: usize = 157;

/// First non-empty of alt, aria-label, title; trimmed and truncated.
pub fn annotation_label(image: &ImageNode) -> Option<String> {
    let raw = [&image.alt, &image.aria_label, &image.title]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().count() > MAX_LABEL_CHARS {
        let head: String = trimmed.chars().take(TRUNCATED_CHARS).collect();
        return Some(format!("{}…", head));
    }
    Some(trimmed.to_string())
}

/// Tracks which images currently carry an annotation.
#[derive(Debug, Default)]
pub struct ImageAnnotator {
    annotations: BTreeMap<NodeId, String>,
}

impl ImageAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotates images not yet annotated. Returns the newly added annotations.
    pub fn annotate<'a, I>(&mut self, images: I) -> Vec<(NodeId, String)>
    where
        I: IntoIterator<Item = &'a ImageNode>,
    {
        let mut added = Vec::new();
        for image in images {
            if self.annotations.contains_key(&image.id) {
                continue;
            }
            if let Some(label) = annotation_label(image) {
                self.annotations.insert(image.id, label.clone());
                added.push((image.id, label));
            }
        }
        added
    }

    /// Drops annotations of removed nodes. Returns the ids actually removed.
    pub fn remove_nodes(&mut self, nodes: &[NodeId]) -> Vec<NodeId> {
        nodes
            .iter()
            .filter(|id| self.annotations.remove(*id).is_some())
            .copied()
            .collect()
    }

    /// Removes every annotation.
    pub fn clear(&mut self) -> Vec<NodeId> {
        let ids = self.annotations.keys().copied().collect();
        self.annotations.clear();
        ids
    }

    pub fn label_for(&self, id: NodeId) -> Option<&str> {
        self.annotations.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}
