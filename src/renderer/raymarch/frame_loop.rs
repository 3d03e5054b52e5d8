use std::sync::Arc;

use crate::renderer::resources::{LoopLease, ResourceSink};

/// Start/stop logic for one node's per-frame callback chain.
///
/// The loop runs while the node is wanted on screen and has motion to show.
/// A node that is idle but receives new input (a swapped-in texture, a
/// resize) gets a single redraw without restarting the loop.
#[derive(Debug)]
pub struct FrameLoop {
    owner: String,
    sink: Arc<dyn ResourceSink>,
    lease: Option<LoopLease>,
    suspend_when_offscreen: bool,
    visible: bool,
    idle: bool,
    redraw_requested: bool,
}

impl FrameLoop {
    pub fn new(owner: impl Into<String>, sink: Arc<dyn ResourceSink>, suspend_when_offscreen: bool) -> Self {
        let mut frame_loop = Self {
            owner: owner.into(),
            sink,
            lease: None,
            suspend_when_offscreen,
            // Until the first intersection report, assume on screen.
            visible: true,
            idle: false,
            redraw_requested: true,
        };
        frame_loop.sync();
        frame_loop
    }

    fn should_run(&self) -> bool {
        let on_screen = self.visible || !self.suspend_when_offscreen;
        on_screen && !self.idle
    }

    fn sync(&mut self) {
        match (self.should_run(), self.lease.is_some()) {
            (true, false) => {
                self.lease = Some(LoopLease::start(self.sink.clone(), self.owner.clone()));
            }
            (false, true) => self.lease = None,
            _ => {}
        }
    }

    /// Intersection report from the host.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.sync();
    }

    /// The node has nothing left to animate.
    pub fn set_idle(&mut self, idle: bool) {
        self.idle = idle;
        self.sync();
    }

    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    pub fn is_running(&self) -> bool {
        self.lease.is_some()
    }

    /// Whether the host should render this frame. Consumes a pending redraw.
    pub fn take_frame(&mut self) -> bool {
        let on_screen = self.visible || !self.suspend_when_offscreen;
        let redraw = std::mem::take(&mut self.redraw_requested) && on_screen;
        self.is_running() || redraw
    }
}
