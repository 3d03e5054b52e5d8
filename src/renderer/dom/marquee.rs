//! Frame-driven offset for a DOM marquee track.
//!
//! The track holds its items twice (A then B). Each frame the host measures
//! how far the first B item sits from the first A item; that span is the
//! content width. The offset then wraps by exactly one span, which lands
//! every item on its twin and hides the seam.

use std::sync::Arc;

use crate::renderer::resources::{LoopLease, ResourceSink};
use crate::scene::{Direction, ListConfig};

/// Layout introspection supplied by the host.
pub trait LayoutProbe {
    /// Distance in pixels from the first child of track `track_id` to its
    /// `item_count`-th child (the first of the duplicate half), if laid out.
    fn measure_span(&self, track_id: &str, item_count: usize) -> Option<f32>;
}

impl<F> LayoutProbe for F
where
    F: Fn(&str, usize) -> Option<f32>,
{
    fn measure_span(&self, track_id: &str, item_count: usize) -> Option<f32> {
        self(track_id, item_count)
    }
}

/// Probe that assumes every item is `item_width` wide. For hosts without a
/// real layout engine.
#[derive(Debug, Clone, Copy)]
pub struct FixedWidthLayout {
    pub item_width: f32,
    pub gap: f32,
}

impl FixedWidthLayout {
    pub fn for_list(list: &ListConfig) -> Self {
        Self {
            item_width: list.item_width,
            gap: list.gap,
        }
    }
}

impl LayoutProbe for FixedWidthLayout {
    fn measure_span(&self, _track_id: &str, item_count: usize) -> Option<f32> {
        (item_count > 0).then(|| item_count as f32 * (self.item_width + self.gap))
    }
}

#[derive(Debug)]
pub struct DomMarqueeTrack {
    id: String,
    item_count: usize,
    /// Pixels per frame at 60fps.
    speed: f32,
    direction: Direction,
    pause_on_hover: bool,
    offset: f32,
    content_width: f32,
    hovered: bool,
    _lease: LoopLease,
}

impl DomMarqueeTrack {
    pub fn new(id: impl Into<String>, list: &ListConfig, sink: Arc<dyn ResourceSink>) -> Self {
        let id = id.into();
        Self {
            _lease: LoopLease::start(sink, id.clone()),
            id,
            item_count: list.capped_items().len(),
            speed: list.speed,
            direction: list.direction,
            pause_on_hover: list.pause_on_hover,
            offset: 0.0,
            content_width: 0.0,
            hovered: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn content_width(&self) -> f32 {
        self.content_width
    }

    /// Pointer entered or left the track or its parent.
    pub fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    pub fn is_paused(&self) -> bool {
        self.pause_on_hover && self.hovered
    }

    /// One frame. Measures every frame since image loads change widths.
    /// Returns the new offset in pixels.
    pub fn tick(&mut self, dt: f32, probe: &dyn LayoutProbe) -> f32 {
        if let Some(width) = probe
            .measure_span(&self.id, self.item_count)
            .filter(|w| w.is_finite() && *w > 0.0)
        {
            self.content_width = width;
        }
        if self.is_paused() {
            return self.offset;
        }
        self.offset += self.speed * 60.0 * self.direction.sign() * dt;
        let w = self.content_width;
        if w > 0.0 {
            // Keep the offset in (-w, 0].
            let back = if self.offset.is_finite() {
                (-self.offset).rem_euclid(w)
            } else {
                0.0
            };
            // rem_euclid may round up to exactly `w`.
            self.offset = if back >= w { 0.0 } else { -back };
        }
        self.offset
    }

    /// CSS transform for the inner track element.
    pub fn transform(&self) -> String {
        format!("translate3d({}, 0, 0)", super::node::px(self.offset))
    }
}
