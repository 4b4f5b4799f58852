//! Augmentation sessions over the simulated native AR bridge: plane hit
//! testing, anchor relay, video frames and optional capabilities.

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use xrspace::bridge::{
    BridgeAnchor, BridgeAnchorGeometry, BridgeFrame, BridgeMessage, SimulatedArBridge,
    SimulatedBridgeHandle, VideoFrame, WorldMap,
};
use xrspace::prelude::*;
use xrspace::session::SessionEvent;

fn bridged_session(params: SessionParams) -> (XrRuntime, Session, SimulatedBridgeHandle) {
    let (bridge, handle) = SimulatedArBridge::new();
    let platform = Platform::new().with_native_bridge(Box::new(bridge));
    let runtime = XrRuntime::new(platform, XrConfig::handheld()).unwrap();
    let mut session = runtime.request_session(FLAT_DISPLAY_ID, params).unwrap();
    // First tick completes bridge initialization and starts the watch
    tick(&mut session, 0.0);
    assert!(handle.is_watching());
    (runtime, session, handle)
}

fn tick(session: &mut Session, timestamp: f64) -> bool {
    session.request_frame(|_| {}).unwrap();
    session.on_animation_frame(timestamp)
}

fn camera_looking_down(x: f64, height: f64) -> Mat4 {
    math::from_rotation_translation(
        &Quat::from_axis_angle(&Vec3::x_axis(), -FRAC_PI_2),
        &Vec3::new(x, height, 0.0),
    )
}

fn horizontal_plane(uid: &str, height: f64, extent: f64) -> BridgeAnchor {
    BridgeAnchor {
        uid: uid.into(),
        transform: math::from_translation(&Vec3::new(0.0, height, 0.0)),
        geometry: BridgeAnchorGeometry::Plane(PlaneGeometry::new(
            Vec3::zeros(),
            [extent, extent],
            PlaneAlignment::Horizontal,
        )),
    }
}

fn deliver(handle: &SimulatedBridgeHandle, frame: BridgeFrame) {
    assert!(handle.push_frame(frame));
}

// ============================================================================
// Plane hit testing
// ============================================================================

#[test]
fn test_straight_down_ray_hits_plane_once() {
    let (_runtime, mut session, handle) = bridged_session(SessionParams::augmentation());
    let mut frame = BridgeFrame::at(16.0, camera_looking_down(0.0, 1.5));
    frame.new_anchors.push(horizontal_plane("floor", 0.0, 2.0));
    deliver(&handle, frame);
    tick(&mut session, 16.0);

    let hits = session.hit_test(0.5, 0.5).unwrap();
    assert_eq!(hits.len(), 1);
    assert!((hits[0].distance - 1.5).abs() < 1e-9);
    assert_eq!(hits[0].anchor_id, Some(AnchorId::from("floor")));
}

#[test]
fn test_hits_sorted_by_distance() {
    let (_runtime, mut session, handle) = bridged_session(SessionParams::augmentation());
    let mut frame = BridgeFrame::at(16.0, camera_looking_down(0.0, 3.5));
    frame.new_anchors.push(horizontal_plane("one", 2.5, 2.0));
    frame.new_anchors.push(horizontal_plane("three", 0.5, 2.0));
    frame.new_anchors.push(horizontal_plane("two", 1.5, 2.0));
    deliver(&handle, frame);
    tick(&mut session, 16.0);

    let hits = session.hit_test(0.5, 0.5).unwrap();
    let order: Vec<&str> = hits
        .iter()
        .map(|hit| hit.anchor_id.as_ref().unwrap().as_str())
        .collect();
    assert_eq!(order, vec!["one", "two", "three"]);
    for (hit, expected) in hits.iter().zip([1.0, 2.0, 3.0]) {
        assert!((hit.distance - expected).abs() < 1e-9);
    }
}

#[test]
fn test_extent_tolerance() {
    let (_runtime, mut session, handle) = bridged_session(SessionParams::augmentation());
    let mut frame = BridgeFrame::at(16.0, camera_looking_down(1.02, 1.5));
    frame.new_anchors.push(horizontal_plane("plane", 0.0, 2.0));
    deliver(&handle, frame);
    tick(&mut session, 16.0);
    assert!(session.hit_test(0.5, 0.5).unwrap().is_empty());

    deliver(&handle, BridgeFrame::at(33.0, camera_looking_down(1.005, 1.5)));
    tick(&mut session, 33.0);
    assert_eq!(session.hit_test(0.5, 0.5).unwrap().len(), 1);
}

#[test]
fn test_off_centre_hit_uses_bridge_projection() {
    let (_runtime, mut session, handle) = bridged_session(SessionParams::augmentation());
    let projection = math::perspective(1.2, 0.5, 0.01, 50.0);
    let mut frame = BridgeFrame::at(16.0, camera_looking_down(0.0, 1.5));
    frame.projection = projection;
    frame.new_anchors.push(horizontal_plane("floor", 0.0, 2.0));
    deliver(&handle, frame);
    tick(&mut session, 16.0);

    assert_eq!(session.views()[0].projection, projection);

    // Right screen edge: half-width of the frustum at the plane's depth
    let hits = session.hit_test(1.0, 0.5).unwrap();
    assert_eq!(hits.len(), 1);
    let expected_x = 1.5 * (0.6f64).tan() * 0.5;
    let point = math::translation(&hits[0].world_transform);
    assert!((point - Vec3::new(expected_x, 0.0, 0.0)).norm() < 1e-9);
    assert!((hits[0].distance - (1.5f64.powi(2) + expected_x.powi(2)).sqrt()).abs() < 1e-9);
}

#[test]
fn test_find_anchor_reuses_plane_and_tracks_it() {
    let (_runtime, mut session, handle) = bridged_session(SessionParams::augmentation());
    let mut frame = BridgeFrame::at(16.0, camera_looking_down(0.3, 1.5));
    frame.new_anchors.push(horizontal_plane("floor", 0.0, 2.0));
    deliver(&handle, frame);
    tick(&mut session, 16.0);

    let offset = session.find_anchor(0.5, 0.5).unwrap().unwrap();
    assert_eq!(offset.anchor_id().as_str(), "floor");
    assert!(!session.owned_anchor_ids().contains(offset.anchor_id()));
    let hit_world = session.hit_test(0.5, 0.5).unwrap()[0].world_transform;
    let world = session.anchor_world_transform(&offset).unwrap();
    assert!(math::approx_eq(&world, &hit_world, 1e-9));

    // The backend moves the plane; the offset follows the new pose
    let moved = math::from_translation(&Vec3::new(0.0, 0.25, 0.0));
    let mut update = BridgeFrame::at(33.0, camera_looking_down(0.3, 1.5));
    update.updated_anchors.push(BridgeAnchor {
        transform: moved,
        ..horizontal_plane("floor", 0.0, 2.0)
    });
    deliver(&handle, update);
    tick(&mut session, 33.0);

    let world = session.anchor_world_transform(&offset).unwrap();
    assert_eq!(world, offset.local_pose() * moved);
}

#[test]
fn test_floor_anchor_detected() {
    let (_runtime, mut session, handle) = bridged_session(SessionParams::augmentation());
    let mut frame = BridgeFrame::at(16.0, camera_looking_down(0.0, 1.5));
    frame.new_anchors.push(horizontal_plane("table", 0.8, 1.0));
    frame.new_anchors.push(horizontal_plane("floor", -0.1, 4.0));
    deliver(&handle, frame);
    tick(&mut session, 16.0);

    let floor = session.find_floor_anchor(None).unwrap();
    assert_eq!(floor.source, FloorSource::Detected);
    assert_eq!(floor.offset.anchor_id().as_str(), "floor");
    let world = session.anchor_world_transform(&floor.offset).unwrap();
    assert!((math::translation(&world).y + 0.1).abs() < 1e-12);
}

#[test]
fn test_floor_falls_back_to_tracker_origin() {
    let (_runtime, mut session, _handle) = bridged_session(SessionParams::augmentation());
    let floor = session.find_floor_anchor(Some("floor".into())).unwrap();
    assert_eq!(floor.source, FloorSource::TrackerOrigin);
    assert!(!floor.source.is_authoritative());
    assert!(floor.created);
}

// ============================================================================
// Anchor relay and faults
// ============================================================================

#[test]
fn test_backend_anchor_events_reach_subscribers() {
    let (_runtime, mut session, handle) = bridged_session(SessionParams::augmentation());
    let events = session.subscribe();

    let mut frame = BridgeFrame::at(16.0, camera_looking_down(0.0, 1.5));
    frame.new_anchors.push(horizontal_plane("p", 0.0, 1.0));
    deliver(&handle, frame);
    tick(&mut session, 16.0);

    let mut frame = BridgeFrame::at(33.0, camera_looking_down(0.0, 1.5));
    frame.updated_anchors.push(horizontal_plane("p", 0.1, 1.0));
    deliver(&handle, frame);
    tick(&mut session, 33.0);

    let mut frame = BridgeFrame::at(50.0, camera_looking_down(0.0, 1.5));
    frame.removed_anchor_ids.push("p".into());
    deliver(&handle, frame);
    tick(&mut session, 50.0);

    assert_eq!(
        events.drain(),
        vec![
            SessionEvent::AnchorAdded("p".into()),
            SessionEvent::AnchorUpdated("p".into()),
            SessionEvent::AnchorRemoved("p".into()),
        ]
    );
    assert!(session.get_anchor(&"p".into()).is_none());
}

#[test]
fn test_backend_fault_keeps_session_running() {
    let (_runtime, mut session, handle) = bridged_session(SessionParams::augmentation());
    let events = session.subscribe();
    assert!(handle.push_error("tracking lost"));
    assert!(handle.push(BridgeMessage::TrackingChanged(TrackingState::Limited)));
    assert!(tick(&mut session, 16.0));

    let received = events.drain();
    assert!(received.iter().any(|event| matches!(
        event,
        SessionEvent::BackendFault { message, .. } if message == "tracking lost"
    )));
    assert!(received.contains(&SessionEvent::TrackingChanged(TrackingState::Limited)));
    assert_eq!(session.tracking_state(), TrackingState::Limited);
    assert!(!session.is_ended());
    assert!(tick(&mut session, 33.0));
}

#[test]
fn test_init_failure_reported_as_fault() {
    let (bridge, handle) = SimulatedArBridge::new();
    handle.fail_next_init("camera permission denied");
    let runtime = XrRuntime::new(
        Platform::new().with_native_bridge(Box::new(bridge)),
        XrConfig::handheld(),
    )
    .unwrap();
    let mut session = runtime
        .request_session(FLAT_DISPLAY_ID, SessionParams::augmentation())
        .unwrap();
    let events = session.subscribe();
    assert!(tick(&mut session, 0.0));
    assert!(!handle.is_watching());
    assert!(events
        .drain()
        .iter()
        .any(|event| matches!(event, SessionEvent::BackendFault { .. })));
}

#[test]
fn test_end_releases_anchors_despite_bridge_failure() {
    let (runtime, mut session, handle) = bridged_session(SessionParams::augmentation());
    let uid = session
        .add_anchor(Anchor::new(CoordinateSystem::tracker(FLAT_DISPLAY_ID), None))
        .unwrap();
    assert!(handle.added_anchors().iter().any(|(added, _)| added == &uid));

    handle.fail_next_remove();
    session.end().try_take().unwrap().unwrap();
    let camera = runtime.camera_reality().unwrap();
    assert!(camera.lock().get_anchor(&uid).is_none());
    assert!(camera.lock().anchors().is_empty());
    assert!(handle.is_stopped());
}

// ============================================================================
// Optional capabilities
// ============================================================================

#[test]
fn test_light_and_mapping_status() {
    let (_runtime, mut session, handle) = bridged_session(SessionParams::augmentation());
    assert_eq!(
        session.light_ambient_intensity().unwrap(),
        Capability::Supported(None)
    );

    let mut frame = BridgeFrame::at(16.0, camera_looking_down(0.0, 1.5));
    frame.light_intensity = Some(850.0);
    frame.world_mapping_status = WorldMappingStatus::Mapped;
    deliver(&handle, frame);
    tick(&mut session, 16.0);

    assert_eq!(
        session.light_ambient_intensity().unwrap(),
        Capability::Supported(Some(850.0))
    );
    assert_eq!(
        session.world_mapping_status().unwrap(),
        Capability::Supported(WorldMappingStatus::Mapped)
    );
}

#[test]
fn test_world_map_round_trip_through_bridge() {
    let (_runtime, mut session, _handle) = bridged_session(SessionParams::augmentation());
    assert!(matches!(
        session.get_world_map().try_take(),
        Some(Err(XrError::NotFound(_)))
    ));
    let map = WorldMap { data: vec![1, 2, 3] };
    session.set_world_map(&map).try_take().unwrap().unwrap();
    assert_eq!(session.get_world_map().try_take().unwrap().unwrap(), map);
}

#[test]
fn test_backend_hit_test_filters_mask() {
    let (_runtime, mut session, handle) = bridged_session(SessionParams::augmentation());
    let hit = |hit_type, distance| Hit {
        hit_type,
        distance,
        world_transform: math::identity(),
        local_transform: math::identity(),
        anchor_id: None,
    };
    handle.set_hit_results(vec![
        hit(HitType::FeaturePoint, 0.5),
        hit(HitType::ExistingPlaneUsingExtent, 1.0),
    ]);
    let hits = session
        .request_backend_hit_test(0.5, 0.5, HitTypeMask::EXISTING_PLANE_USING_EXTENT)
        .try_take()
        .unwrap()
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].hit_type, HitType::ExistingPlaneUsingExtent);
}

// ============================================================================
// Video frames
// ============================================================================

#[test]
fn test_video_frames_rebased_into_rolling_anchor() {
    let (_runtime, mut session, handle) =
        bridged_session(SessionParams::augmentation().with_video_frames());
    assert!(handle.video_frames_enabled());

    let received = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = received.clone();
    session
        .set_video_frame_handler(move |frame: &VideoFrame| sink.lock().push(frame.clone()))
        .unwrap();

    assert!(handle.push(BridgeMessage::VideoFrame(VideoFrame {
        timestamp: 10.0,
        width: 2,
        height: 2,
        pixels: Arc::new(vec![0; 16]),
        view: math::identity(),
        projection: math::identity(),
        anchor_id: None,
    })));
    tick(&mut session, 16.0);

    let frames = received.lock();
    assert_eq!(frames.len(), 1);
    let rolling = session.rolling_anchor_ids();
    assert_eq!(frames[0].anchor_id.as_ref(), rolling.first());

    let anchor = session.get_anchor(&rolling[0]).unwrap();
    let anchor_world = anchor.resolve_pose(&session.pose_context());
    assert!(math::approx_eq(&frames[0].view, &anchor_world, 1e-12));
}
