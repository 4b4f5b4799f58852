//! Sessions: one display bound to one reality
//!
//! A [`Session`] runs the per-tick loop. Each delivered tick:
//!
//! 1. extends the rolling camera-anchor window when an interval has passed
//! 2. lets the reality drain its backend, then the display pull its pose
//! 3. forwards reality events and rebased video frames
//! 4. invokes the pending frame callback with a [`PresentationFrame`]
//! 5. lets the display submit the rendered frame
//!
//! A skip flag re-schedules the callback without running the tick, halving
//! the effective frame rate under load. Ending the session stops frame
//! delivery at once and releases every anchor it created.

mod frame;
mod params;
mod rolling;
mod video;

pub use frame::PresentationFrame;
pub use params::{SessionParams, SessionType};
pub use rolling::{RollingAnchorWindow, RollingEntry};
pub use video::VideoFrameHandler;

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use xrspace_core::math::Mat4;
use xrspace_core::{
    EventBus, FrameClock, FramePacer, Pending, SessionConfig, Subscription, XrError, XrResult,
};

use crate::anchor::{Anchor, AnchorId, AnchorOffset};
use crate::bridge::{DetectionImage, TrackingState, VideoFrame, WorldMap, WorldMappingStatus};
use crate::coordinate::{CoordinateSystem, CoordinateSystemType, DisplayContext, PoseContext};
use crate::display::{SharedDisplay, View};
use crate::hit_test::{Hit, HitTypeMask};
use crate::reality::{Capability, FloorAnchor, RealityEvent, SharedReality};

/// Unique identifier for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new unique session ID.
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }

    /// Create a session ID from a specific UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        SessionId(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        SessionId(uuid)
    }
}

/// Lifecycle of a session.
///
/// `Created -> Running -> Ended`; running starts with the first delivered
/// frame and ended is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Created,
    Running,
    Ended,
}

/// Notifications delivered to session subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    AnchorAdded(AnchorId),
    AnchorUpdated(AnchorId),
    AnchorRemoved(AnchorId),
    TrackingChanged(TrackingState),
    /// A backend failed; the session keeps running
    BackendFault { backend: String, message: String },
    Ended,
}

impl From<RealityEvent> for SessionEvent {
    fn from(event: RealityEvent) -> Self {
        match event {
            RealityEvent::AnchorAdded(uid) => SessionEvent::AnchorAdded(uid),
            RealityEvent::AnchorUpdated(uid) => SessionEvent::AnchorUpdated(uid),
            RealityEvent::AnchorRemoved(uid) => SessionEvent::AnchorRemoved(uid),
            RealityEvent::TrackingChanged(state) => SessionEvent::TrackingChanged(state),
            RealityEvent::BackendFault { backend, message } => {
                SessionEvent::BackendFault { backend, message }
            }
        }
    }
}

/// Per-tick callback, consumed when it runs
pub type FrameCallback = Box<dyn FnOnce(&mut PresentationFrame<'_>) + Send>;

pub struct Session {
    id: SessionId,
    display: SharedDisplay,
    reality: SharedReality,
    params: SessionParams,
    config: SessionConfig,
    state: SessionState,
    pending_callback: Option<FrameCallback>,
    skip_next: bool,
    rolling: RollingAnchorWindow,
    /// Anchors this session created and must release on end
    owned_anchors: Vec<AnchorId>,
    video_handler: Option<VideoFrameHandler>,
    events: EventBus<SessionEvent>,
    reality_events: Subscription<RealityEvent>,
    last_timestamp: Option<f64>,
    frames_delivered: u64,
}

impl Session {
    /// Bind `display` to `reality`.
    ///
    /// The parameters are validated against the display before anything
    /// starts; exclusive sessions take over the display.
    pub fn new(
        display: SharedDisplay,
        reality: SharedReality,
        params: SessionParams,
        config: &SessionConfig,
    ) -> XrResult<Self> {
        {
            let mut guard = display.lock();
            guard.request_session(&params)?;
            if params.exclusive {
                guard.begin_presenting()?;
            }
        }

        let reality_events = {
            let mut guard = reality.lock();
            let subscription = guard.subscribe();
            if let Err(err) = guard.start(&params) {
                drop(guard);
                if params.exclusive {
                    display.lock().end_presenting();
                }
                return Err(err);
            }
            subscription
        };

        let id = SessionId::new();
        log::info!(
            "session {} created ({:?}{}) on display '{}' with reality '{}'",
            id,
            params.session_type,
            if params.exclusive { ", exclusive" } else { "" },
            display.lock().name(),
            reality.lock().name()
        );

        Ok(Self {
            id,
            display,
            reality,
            params,
            config: config.clone(),
            state: SessionState::Created,
            pending_callback: None,
            skip_next: false,
            rolling: RollingAnchorWindow::new(config),
            owned_anchors: Vec::new(),
            video_handler: None,
            events: EventBus::new(),
            reality_events,
            last_timestamp: None,
            frames_delivered: 0,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ended(&self) -> bool {
        self.state == SessionState::Ended
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn display(&self) -> &SharedDisplay {
        &self.display
    }

    pub fn reality(&self) -> &SharedReality {
        &self.reality
    }

    /// Number of ticks whose callback ran
    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered
    }

    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    /// Rolling camera anchors, newest first
    pub fn rolling_anchor_ids(&self) -> Vec<AnchorId> {
        self.rolling.ids()
    }

    pub fn owned_anchor_ids(&self) -> &[AnchorId] {
        &self.owned_anchors
    }

    fn ensure_active(&self) -> XrResult<()> {
        if self.is_ended() {
            return Err(XrError::SessionEnded);
        }
        Ok(())
    }

    fn ended<T>(&self) -> Option<Pending<T>> {
        self.is_ended().then(|| Pending::rejected(XrError::SessionEnded))
    }

    pub fn pose_context(&self) -> PoseContext {
        self.display.lock().pose_context()
    }

    pub fn display_context(&self) -> DisplayContext {
        self.display.lock().context()
    }

    pub fn views(&self) -> Vec<View> {
        self.display.lock().views().to_vec()
    }

    pub fn coordinate_system(&self, kind: CoordinateSystemType) -> CoordinateSystem {
        self.display.lock().coordinate_system(kind)
    }

    pub fn subscribe(&mut self) -> Subscription<SessionEvent> {
        self.events.subscribe()
    }

    /// Schedule `callback` for the next tick, replacing any pending one
    pub fn request_frame<F>(&mut self, callback: F) -> XrResult<()>
    where
        F: FnOnce(&mut PresentationFrame<'_>) + Send + 'static,
    {
        self.ensure_active()?;
        if self.pending_callback.replace(Box::new(callback)).is_some() {
            log::debug!("session {}: pending frame callback replaced", self.id);
        }
        Ok(())
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending_callback.is_some()
    }

    /// Re-schedule the next tick without running it
    pub fn skip_next_frame(&mut self) {
        self.skip_next = true;
    }

    /// Deliver one tick. Returns true when a frame callback ran.
    ///
    /// Backend trouble during the tick is reported as a
    /// [`SessionEvent::BackendFault`]; it never aborts the loop.
    pub fn on_animation_frame(&mut self, timestamp: f64) -> bool {
        if self.is_ended() {
            return false;
        }
        let Some(callback) = self.pending_callback.take() else {
            return false;
        };
        if self.skip_next {
            self.skip_next = false;
            self.pending_callback = Some(callback);
            log::trace!("session {} skipped frame at {:.1} ms", self.id, timestamp);
            return false;
        }
        if self.state == SessionState::Created {
            self.state = SessionState::Running;
            log::info!("session {} running", self.id);
        }
        self.last_timestamp = Some(timestamp);

        let ctx = self.pose_context();
        if self.rolling.is_due(timestamp) {
            if let Err(err) = self.push_rolling_anchor(timestamp, &ctx) {
                let backend = self.reality.lock().backend_name();
                self.report_fault(&backend, format!("rolling anchor: {}", err));
            }
        }

        let (sample, video_frames) = {
            let mut reality = self.reality.lock();
            let sample = reality.handle_new_frame(timestamp, &ctx);
            (sample, reality.take_video_frames())
        };
        self.display.lock().handle_new_frame(timestamp, &sample);
        self.forward_reality_events();
        self.dispatch_video_frames(video_frames);

        let started = Instant::now();
        {
            let mut frame = PresentationFrame::new(self, timestamp);
            callback(&mut frame);
        }
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.frames_delivered += 1;

        if self.is_ended() {
            return true;
        }
        let submitted = self.display.lock().handle_after_frame();
        if let Err(err) = submitted {
            let backend = self.display.lock().name().to_string();
            self.report_fault(&backend, err.to_string());
        }
        if self.config.adaptive_frame_skip && elapsed_ms > self.config.frame_budget_ms {
            log::debug!(
                "session {}: frame took {:.2} ms (budget {:.2} ms), skipping next",
                self.id,
                elapsed_ms,
                self.config.frame_budget_ms
            );
            self.skip_next = true;
        }
        true
    }

    /// Drive the loop until no frame is pending, the session ends or
    /// `max_frames` ticks elapsed. Returns the number of ticks.
    pub fn run(
        &mut self,
        clock: &dyn FrameClock,
        pacer: &mut FramePacer,
        max_frames: Option<u64>,
    ) -> XrResult<u64> {
        self.ensure_active()?;
        let mut ticks = 0;
        while !self.is_ended() && self.pending_callback.is_some() {
            if max_frames.map_or(false, |max| ticks >= max) {
                break;
            }
            let timestamp = pacer.wait_for_next_frame(clock);
            self.on_animation_frame(timestamp);
            ticks += 1;
        }
        log::debug!("session {} loop exited after {} ticks", self.id, ticks);
        Ok(ticks)
    }

    fn push_rolling_anchor(&mut self, timestamp: f64, ctx: &PoseContext) -> XrResult<()> {
        let relative = ctx.to_tracker_relative(&ctx.head_model)?;
        let mut anchor = Anchor::new(CoordinateSystem::tracker_relative(ctx.display, relative), None);
        anchor.set_timestamp(timestamp);

        let mut reality = self.reality.lock();
        let uid = reality.add_anchor(anchor, ctx)?;
        log::trace!("session {} rolling anchor '{}' at {:.1} ms", self.id, uid, timestamp);
        for evicted in self.rolling.push(uid, timestamp) {
            if let Err(err) = reality.remove_anchor(&evicted) {
                log::debug!("session {}: evicting rolling anchor '{}': {}", self.id, evicted, err);
            }
        }
        Ok(())
    }

    fn forward_reality_events(&mut self) {
        for event in self.reality_events.drain() {
            self.events.publish(event.into());
        }
    }

    fn dispatch_video_frames(&mut self, mut frames: Vec<VideoFrame>) {
        if frames.is_empty() {
            return;
        }
        if self.video_handler.is_none() {
            log::trace!("session {}: {} video frames without a handler", self.id, frames.len());
            return;
        }
        let ctx = self.pose_context();
        {
            let reality = self.reality.lock();
            for frame in &mut frames {
                video::rebase_video_frame(frame, &self.rolling, reality.anchors(), &ctx);
            }
        }
        if let Some(handler) = self.video_handler.as_mut() {
            for frame in &frames {
                handler(frame);
            }
        }
    }

    fn report_fault(&mut self, backend: &str, message: String) {
        log::warn!("session {}: backend '{}' fault: {}", self.id, backend, message);
        self.events.publish(SessionEvent::BackendFault {
            backend: backend.to_string(),
            message,
        });
    }

    /// All hits at a normalized screen point, nearest first
    pub fn hit_test(&self, x: f64, y: f64) -> XrResult<Vec<Hit>> {
        self.ensure_active()?;
        let display = self.display_context();
        self.reality.lock().hit_test_no_anchor(x, y, &display)
    }

    /// Anchor the nearest hit at a screen point; `None` on a miss
    pub fn find_anchor(&mut self, x: f64, y: f64) -> XrResult<Option<AnchorOffset>> {
        self.ensure_active()?;
        let display = self.display_context();
        let found = self.reality.lock().find_anchor(x, y, &display)?;
        Ok(found.map(|found| {
            if found.created {
                self.owned_anchors.push(found.offset.anchor_id().clone());
            }
            found.offset
        }))
    }

    pub fn find_floor_anchor(&mut self, uid: Option<AnchorId>) -> XrResult<FloorAnchor> {
        self.ensure_active()?;
        let ctx = self.pose_context();
        let floor = self.reality.lock().find_floor_anchor(&ctx, uid)?;
        if floor.created {
            self.owned_anchors.push(floor.offset.anchor_id().clone());
        }
        Ok(floor)
    }

    /// Register an anchor owned by this session
    pub fn add_anchor(&mut self, anchor: Anchor) -> XrResult<AnchorId> {
        self.ensure_active()?;
        let ctx = self.pose_context();
        let uid = self.reality.lock().add_anchor(anchor, &ctx)?;
        self.owned_anchors.push(uid.clone());
        Ok(uid)
    }

    pub fn remove_anchor(&mut self, uid: &AnchorId) -> XrResult<()> {
        self.ensure_active()?;
        self.owned_anchors.retain(|owned| owned != uid);
        self.rolling.remove(uid);
        self.reality.lock().remove_anchor(uid)
    }

    pub fn get_anchor(&self, uid: &AnchorId) -> Option<Anchor> {
        self.reality.lock().get_anchor(uid).cloned()
    }

    /// Every anchor in the bound reality, ordered by id
    pub fn anchors(&self) -> Vec<Anchor> {
        let mut anchors: Vec<Anchor> = self.reality.lock().anchors().iter().cloned().collect();
        anchors.sort_by(|a, b| a.uid().cmp(b.uid()));
        anchors
    }

    /// Current world pose of an anchor offset
    pub fn anchor_world_transform(&self, offset: &AnchorOffset) -> XrResult<Mat4> {
        let ctx = self.pose_context();
        self.reality.lock().resolve_offset(offset, &ctx)
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.reality.lock().tracking_state()
    }

    pub fn light_ambient_intensity(&self) -> XrResult<Capability<Option<f64>>> {
        self.ensure_active()?;
        Ok(self.reality.lock().light_ambient_intensity())
    }

    pub fn world_mapping_status(&self) -> XrResult<Capability<WorldMappingStatus>> {
        self.ensure_active()?;
        Ok(self.reality.lock().world_mapping_status())
    }

    pub fn get_world_map(&mut self) -> Pending<WorldMap> {
        if let Some(ended) = self.ended() {
            return ended;
        }
        self.reality.lock().get_world_map()
    }

    pub fn set_world_map(&mut self, map: &WorldMap) -> Pending<()> {
        if let Some(ended) = self.ended() {
            return ended;
        }
        self.reality.lock().set_world_map(map)
    }

    pub fn create_image_anchor(&mut self, image: DetectionImage) -> Pending<()> {
        if let Some(ended) = self.ended() {
            return ended;
        }
        self.reality.lock().create_image_anchor(image)
    }

    pub fn activate_detection_image(&mut self, name: &str) -> Pending<()> {
        if let Some(ended) = self.ended() {
            return ended;
        }
        self.reality.lock().activate_detection_image(name)
    }

    pub fn deactivate_detection_image(&mut self, name: &str) -> Pending<()> {
        if let Some(ended) = self.ended() {
            return ended;
        }
        self.reality.lock().deactivate_detection_image(name)
    }

    /// The backend's own hit test, filtered by `mask`
    pub fn request_backend_hit_test(&mut self, x: f64, y: f64, mask: HitTypeMask) -> Pending<Vec<Hit>> {
        if let Some(ended) = self.ended() {
            return ended;
        }
        self.reality.lock().request_backend_hit_test(x, y, mask)
    }

    /// Receive raw camera frames, rebased into the nearest rolling anchor's frame
    pub fn set_video_frame_handler<F>(&mut self, handler: F) -> XrResult<()>
    where
        F: FnMut(&VideoFrame) + Send + 'static,
    {
        self.ensure_active()?;
        self.reality.lock().set_video_frames_enabled(true)?;
        self.video_handler = Some(Box::new(handler));
        Ok(())
    }

    pub fn clear_video_frame_handler(&mut self) {
        self.video_handler = None;
    }

    /// End the session.
    ///
    /// Frame delivery stops immediately and every anchor the session created
    /// is released, whatever the backend says about the removal. Calling it
    /// again does nothing. The result settles when the reality has stopped.
    pub fn end(&mut self) -> Pending<()> {
        if self.is_ended() {
            log::debug!("session {} already ended", self.id);
            return Pending::resolved(());
        }
        self.state = SessionState::Ended;
        self.pending_callback = None;
        self.video_handler = None;
        self.skip_next = false;

        let mut released = self.rolling.drain();
        released.append(&mut self.owned_anchors);
        let stopped = {
            let mut reality = self.reality.lock();
            for uid in &released {
                if !reality.anchors().contains(uid) {
                    continue;
                }
                if let Err(err) = reality.remove_anchor(uid) {
                    log::debug!("session {}: releasing anchor '{}': {}", self.id, uid, err);
                }
            }
            reality.stop()
        };
        if self.params.exclusive {
            self.display.lock().end_presenting();
        }

        log::info!(
            "session {} ended after {} frames ({} anchors released)",
            self.id,
            self.frames_delivered,
            released.len()
        );
        self.events.publish(SessionEvent::Ended);
        stopped
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.is_ended() {
            let _ = self.end();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("params", &self.params)
            .field("frames_delivered", &self.frames_delivered)
            .field("rolling_anchors", &self.rolling.len())
            .field("owned_anchors", &self.owned_anchors.len())
            .finish()
    }
}
