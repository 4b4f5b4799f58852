//! Rolling camera-anchor window
//!
//! Once per interval the session drops an anchor at the current head pose.
//! Video frames are re-expressed in the frame of the entry closest in time,
//! so a tracker-origin correction between two entries never shows up as a
//! jump in the video.

use std::collections::VecDeque;

use xrspace_core::SessionConfig;

use crate::anchor::AnchorId;

#[derive(Debug, Clone, PartialEq)]
pub struct RollingEntry {
    pub uid: AnchorId,
    pub timestamp: f64,
}

/// Newest entry first
#[derive(Debug, Clone)]
pub struct RollingAnchorWindow {
    entries: VecDeque<RollingEntry>,
    capacity: usize,
    interval_ms: f64,
}

impl RollingAnchorWindow {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.rolling_anchor_capacity + 1),
            capacity: config.rolling_anchor_capacity.max(1),
            interval_ms: config.rolling_anchor_interval_ms,
        }
    }

    /// A new entry is due when the window is empty or the newest one is an interval old
    pub fn is_due(&self, timestamp: f64) -> bool {
        match self.entries.front() {
            None => true,
            Some(newest) => timestamp - newest.timestamp >= self.interval_ms,
        }
    }

    /// Push a new entry and return the ids that fell out of the window
    pub fn push(&mut self, uid: AnchorId, timestamp: f64) -> Vec<AnchorId> {
        self.entries.push_front(RollingEntry { uid, timestamp });
        let mut evicted = Vec::new();
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.entries.pop_back() {
                evicted.push(oldest.uid);
            }
        }
        evicted
    }

    /// Entry whose timestamp is closest to `timestamp`
    pub fn nearest(&self, timestamp: f64) -> Option<&RollingEntry> {
        self.entries.iter().min_by(|a, b| {
            let da = (a.timestamp - timestamp).abs();
            let db = (b.timestamp - timestamp).abs();
            da.total_cmp(&db)
        })
    }

    /// Forget an entry whose anchor was removed elsewhere
    pub fn remove(&mut self, uid: &AnchorId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| &entry.uid != uid);
        self.entries.len() != before
    }

    pub fn ids(&self) -> Vec<AnchorId> {
        self.entries.iter().map(|entry| entry.uid.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Empty the window, newest first
    pub fn drain(&mut self) -> Vec<AnchorId> {
        self.entries.drain(..).map(|entry| entry.uid).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(capacity: usize) -> RollingAnchorWindow {
        RollingAnchorWindow::new(&SessionConfig {
            rolling_anchor_capacity: capacity,
            rolling_anchor_interval_ms: 1000.0,
            ..SessionConfig::default()
        })
    }

    #[test]
    fn test_due_after_interval() {
        let mut w = window(5);
        assert!(w.is_due(0.0));
        w.push("a".into(), 0.0);
        assert!(!w.is_due(999.0));
        assert!(w.is_due(1000.0));
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut w = window(2);
        assert!(w.push("a".into(), 0.0).is_empty());
        assert!(w.push("b".into(), 1000.0).is_empty());
        let evicted = w.push("c".into(), 2000.0);
        assert_eq!(evicted, vec![AnchorId::from("a")]);
        assert_eq!(w.ids(), vec![AnchorId::from("c"), AnchorId::from("b")]);
    }

    #[test]
    fn test_nearest_by_timestamp() {
        let mut w = window(5);
        w.push("a".into(), 0.0);
        w.push("b".into(), 1000.0);
        w.push("c".into(), 2000.0);
        assert_eq!(w.nearest(1400.0).unwrap().uid.as_str(), "b");
        assert_eq!(w.nearest(1600.0).unwrap().uid.as_str(), "c");
        assert_eq!(w.nearest(-50.0).unwrap().uid.as_str(), "a");
        assert!(window(5).nearest(0.0).is_none());
    }

    #[test]
    fn test_remove_and_drain() {
        let mut w = window(5);
        w.push("a".into(), 0.0);
        w.push("b".into(), 1000.0);
        assert!(w.remove(&"a".into()));
        assert!(!w.remove(&"a".into()));
        assert_eq!(w.drain(), vec![AnchorId::from("b")]);
        assert!(w.is_empty());
    }
}
