//! Raw camera frame delivery

use crate::anchor::AnchorTable;
use crate::bridge::VideoFrame;
use crate::coordinate::PoseContext;

use super::rolling::RollingAnchorWindow;

/// Called once per delivered camera frame, on the frame loop
pub type VideoFrameHandler = Box<dyn FnMut(&VideoFrame) + Send>;

/// Rewrite a frame's view into the frame of the rolling anchor closest in time.
///
/// Returns false and leaves the frame untouched when the window is empty or
/// its nearest anchor is no longer registered.
pub(crate) fn rebase_video_frame(
    frame: &mut VideoFrame,
    window: &RollingAnchorWindow,
    anchors: &AnchorTable,
    ctx: &PoseContext,
) -> bool {
    let Some(entry) = window.nearest(frame.timestamp) else {
        return false;
    };
    let Some(anchor) = anchors.get(&entry.uid) else {
        log::trace!("rolling anchor '{}' is gone; video frame not rebased", entry.uid);
        return false;
    };
    frame.view *= anchor.resolve_pose(ctx);
    frame.anchor_id = Some(entry.uid.clone());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use xrspace_core::math::{self, Vec3};
    use xrspace_core::SessionConfig;

    use crate::anchor::Anchor;
    use crate::coordinate::CoordinateSystem;

    fn frame(timestamp: f64) -> VideoFrame {
        VideoFrame {
            timestamp,
            width: 4,
            height: 4,
            pixels: Arc::new(vec![0; 16]),
            view: math::identity(),
            projection: math::identity(),
            anchor_id: None,
        }
    }

    #[test]
    fn test_view_multiplied_by_nearest_anchor() {
        let ctx = PoseContext::identity(0);
        let mut anchors = AnchorTable::new();
        let pose = math::from_translation(&Vec3::new(1.0, 0.0, 0.0));
        let uid = anchors
            .insert(Anchor::new(CoordinateSystem::tracker_relative(0, pose), Some("roll".into())))
            .unwrap();
        let mut window = RollingAnchorWindow::new(&SessionConfig::default());
        window.push(uid.clone(), 100.0);

        let mut f = frame(120.0);
        assert!(rebase_video_frame(&mut f, &window, &anchors, &ctx));
        assert_eq!(f.view, pose);
        assert_eq!(f.anchor_id, Some(uid));
    }

    #[test]
    fn test_missing_anchor_leaves_frame() {
        let ctx = PoseContext::identity(0);
        let mut window = RollingAnchorWindow::new(&SessionConfig::default());
        window.push("gone".into(), 0.0);
        let mut f = frame(0.0);
        assert!(!rebase_video_frame(&mut f, &window, &AnchorTable::new(), &ctx));
        assert_eq!(f.view, math::identity());
        assert!(f.anchor_id.is_none());
    }
}
