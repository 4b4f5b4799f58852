//! Id-keyed anchor registry

use std::collections::HashMap;

use xrspace_core::{XrError, XrResult};

use super::{Anchor, AnchorId, PlaneGeometry};

/// Anchor registry owned by a reality
#[derive(Debug, Default)]
pub struct AnchorTable {
    anchors: HashMap<AnchorId, Anchor>,
}

impl AnchorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an anchor; ids are unique per table
    pub fn insert(&mut self, anchor: Anchor) -> XrResult<AnchorId> {
        let uid = anchor.uid().clone();
        if self.anchors.contains_key(&uid) {
            return Err(XrError::AlreadyExists(format!("anchor '{}'", uid)));
        }
        self.anchors.insert(uid.clone(), anchor);
        Ok(uid)
    }

    pub fn get(&self, uid: &AnchorId) -> Option<&Anchor> {
        self.anchors.get(uid)
    }

    pub fn get_mut(&mut self, uid: &AnchorId) -> Option<&mut Anchor> {
        self.anchors.get_mut(uid)
    }

    pub fn remove(&mut self, uid: &AnchorId) -> Option<Anchor> {
        self.anchors.remove(uid)
    }

    pub fn contains(&self, uid: &AnchorId) -> bool {
        self.anchors.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// All anchor ids, sorted
    pub fn ids(&self) -> Vec<AnchorId> {
        let mut ids: Vec<_> = self.anchors.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.values()
    }

    /// Plane anchors and their geometry
    pub fn planes(&self) -> impl Iterator<Item = (&Anchor, &PlaneGeometry)> {
        self.anchors
            .values()
            .filter_map(|anchor| anchor.plane_geometry().map(|plane| (anchor, plane)))
    }

    pub fn clear(&mut self) {
        self.anchors.clear();
    }
}
