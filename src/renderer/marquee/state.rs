//! Per-frame state of a GPU marquee track: scroll offset, pointer, and the
//! eased hover look of each item.

use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::color::{Rgba, parse_hex_or};
use crate::scene::{Direction, ListConfig, SceneObject, ShapeKind};

use super::radius::CornerRadii;

/// Upper bound on copies of the item row drawn per frame.
pub const MAX_PASSES: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct MarqueeItem {
    pub id: String,
    pub image_url: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemVisual {
    pub scale: f32,
    pub grayscale: f32,
}

/// One quad to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarqueeInstance {
    pub item: usize,
    /// x, y, width, height in track pixels, before hover scaling.
    pub rect: [f32; 4],
    pub scale: f32,
    pub grayscale: f32,
}

impl MarqueeInstance {
    pub fn contains(&self, [x, y]: [f32; 2]) -> bool {
        let [rx, ry, w, h] = self.rect;
        x >= rx && x < rx + w && y >= ry && y < ry + h
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackStyle {
    pub item_width: f32,
    pub item_height: f32,
    pub gap: f32,
    pub radii: CornerRadii,
    pub border_width: f32,
    pub border_color: Rgba,
    pub hover_scale: f32,
    pub idle_grayscale: f32,
    /// Fraction of the remaining distance covered per 60fps frame.
    pub smoothing: f32,
    pub speed: f32,
    pub direction: Direction,
    pub pause_on_hover: bool,
}

impl TrackStyle {
    pub fn from_list(list: &ListConfig) -> Self {
        let item_width = list.item_width.max(1.0);
        let item_height = list.item_height.max(1.0);
        Self {
            item_width,
            item_height,
            gap: list.gap.max(0.0),
            radii: CornerRadii::parse_or(&list.item_radius, CornerRadii::default()).fit(item_width, item_height),
            border_width: list.item_border_width.max(0.0),
            border_color: parse_hex_or(&list.item_border_color, Rgba::TRANSPARENT),
            hover_scale: list.hover_scale,
            idle_grayscale: list.idle_grayscale.clamp(0.0, 1.0),
            smoothing: list.hover_smoothing.clamp(0.0, 1.0),
            speed: list.speed,
            direction: list.direction,
            pause_on_hover: list.pause_on_hover,
        }
    }

    fn stride(&self) -> f32 {
        self.item_width + self.gap
    }
}

#[derive(Debug, Clone)]
pub struct MarqueeTrackState {
    id: String,
    items: Vec<MarqueeItem>,
    style: TrackStyle,
    visuals: HashMap<String, ItemVisual>,
    offset: f32,
    size: [f32; 2],
    pointer: Option<[f32; 2]>,
    hovered: Option<usize>,
}

impl MarqueeTrackState {
    /// Builds the track for a `list` node; items come from its template.
    pub fn from_node(node: &SceneObject) -> Result<Self> {
        let ShapeKind::List(list) = &node.kind else {
            bail!("marquee track '{}' must be a list, got {}", node.id, node.shape_name());
        };
        let items = list
            .effective_children(&node.id, list.capped_items())
            .into_iter()
            .map(|child| item_from_child(&child))
            .collect();
        Ok(Self::new(
            node.id.clone(),
            items,
            TrackStyle::from_list(list),
            [node.transform.frame_width.max(1.0), node.transform.frame_height.max(1.0)],
        ))
    }

    pub fn new(id: String, items: Vec<MarqueeItem>, style: TrackStyle, size: [f32; 2]) -> Self {
        let visuals = items
            .iter()
            .map(|i| {
                (
                    i.id.clone(),
                    ItemVisual {
                        scale: 1.0,
                        grayscale: style.idle_grayscale,
                    },
                )
            })
            .collect();
        Self {
            id,
            items,
            style,
            visuals,
            offset: 0.0,
            size,
            pointer: None,
            hovered: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn items(&self) -> &[MarqueeItem] {
        &self.items
    }

    pub fn style(&self) -> &TrackStyle {
        &self.style
    }

    pub fn size(&self) -> [f32; 2] {
        self.size
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn visual(&self, item_id: &str) -> Option<ItemVisual> {
        self.visuals.get(item_id).copied()
    }

    pub fn hovered_item(&self) -> Option<&MarqueeItem> {
        self.hovered.and_then(|i| self.items.get(i))
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.size = [width.max(1.0), height.max(1.0)];
    }

    /// Pointer in track pixels, `None` when it left the canvas.
    pub fn set_pointer(&mut self, pointer: Option<[f32; 2]>) {
        self.pointer = pointer;
    }

    /// Width of one copy of the item row.
    pub fn pass_width(&self) -> f32 {
        self.items.len() as f32 * self.style.stride()
    }

    fn row_top(&self) -> f32 {
        (self.size[1] - self.style.item_height) * 0.5
    }

    /// Whether the pointer is inside the horizontal band the items occupy.
    pub fn pointer_in_band(&self) -> bool {
        let top = self.row_top();
        self.pointer
            .is_some_and(|[_, y]| y >= top && y < top + self.style.item_height)
    }

    pub fn is_paused(&self) -> bool {
        self.style.pause_on_hover && self.pointer_in_band()
    }

    /// One frame of `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        let pass = self.pass_width();
        if pass > 0.0 && !self.is_paused() {
            let advance = self.style.speed * 60.0 * self.style.direction.sign() * dt;
            self.offset = (self.offset + advance).rem_euclid(pass);
        }

        self.hovered = match self.pointer {
            Some(p) => self.layout().into_iter().find(|inst| inst.contains(p)).map(|inst| inst.item),
            None => None,
        };

        let k = 1.0 - (1.0 - self.style.smoothing).powf(dt.max(0.0) * 60.0);
        for (index, item) in self.items.iter().enumerate() {
            let hovered = self.hovered == Some(index);
            let (target_scale, target_gray) = if hovered {
                (self.style.hover_scale, 0.0)
            } else {
                (1.0, self.style.idle_grayscale)
            };
            if let Some(v) = self.visuals.get_mut(&item.id) {
                v.scale += (target_scale - v.scale) * k;
                v.grayscale += (target_gray - v.grayscale) * k;
            }
        }
    }

    /// Unscaled item rectangles covering the canvas width, leftmost first.
    pub fn layout(&self) -> Vec<MarqueeInstance> {
        let pass = self.pass_width();
        if pass <= 0.0 {
            return Vec::new();
        }
        let top = self.row_top();
        let stride = self.style.stride();
        let mut out = Vec::new();
        let start = self.offset - pass;
        for n in 0..MAX_PASSES {
            let base = start + n as f32 * pass;
            if base >= self.size[0] {
                break;
            }
            for (index, _) in self.items.iter().enumerate() {
                let x = base + index as f32 * stride;
                if x + self.style.item_width <= 0.0 || x >= self.size[0] {
                    continue;
                }
                out.push(MarqueeInstance {
                    item: index,
                    rect: [x, top, self.style.item_width, self.style.item_height],
                    scale: 1.0,
                    grayscale: self.style.idle_grayscale,
                });
            }
        }
        out
    }

    /// [`Self::layout`] with each item's eased hover look applied.
    pub fn instances(&self) -> Vec<MarqueeInstance> {
        self.layout()
            .into_iter()
            .map(|mut inst| {
                if let Some(v) = self.items.get(inst.item).and_then(|i| self.visuals.get(&i.id)) {
                    inst.scale = v.scale;
                    inst.grayscale = v.grayscale;
                }
                inst
            })
            .collect()
    }
}

fn item_from_child(child: &SceneObject) -> MarqueeItem {
    let (image_url, label) = match &child.kind {
        ShapeKind::Tile(c) | ShapeKind::Card(c) => {
            let url = if c.media_url.is_empty() { &c.leading_image } else { &c.media_url };
            (url.clone(), c.heading.clone())
        }
        ShapeKind::Plane(p) => (p.image_url.clone(), String::new()),
        ShapeKind::Text(t) => (String::new(), t.text.clone()),
        _ => (String::new(), String::new()),
    };
    MarqueeItem {
        id: child.id.clone(),
        image_url,
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ListItem, ListLayout, RenderPolicy, RendererKind};

    fn track(n: usize, width: f32) -> MarqueeTrackState {
        let list = ListConfig {
            list_layout: ListLayout::Marquee,
            item_width: 100.0,
            item_height: 80.0,
            gap: 20.0,
            speed: 1.0,
            hover_scale: 1.2,
            idle_grayscale: 1.0,
            hover_smoothing: 0.5,
            render_policy: RenderPolicy {
                renderer: RendererKind::Webgl,
                ..RenderPolicy::default()
            },
            list_items: (0..n)
                .map(|i| ListItem {
                    id: Some(format!("i{i}")),
                    media_url: Some(format!("/img/{i}.png")),
                    ..ListItem::default()
                })
                .collect(),
            ..ListConfig::default()
        };
        let mut node = SceneObject::new("track", ShapeKind::List(list));
        node.transform.frame_width = width;
        node.transform.frame_height = 200.0;
        MarqueeTrackState::from_node(&node).unwrap()
    }

    #[test]
    fn items_come_from_the_template_merge() {
        let t = track(3, 600.0);
        assert_eq!(t.items().len(), 3);
        assert_eq!(t.items()[1].id, "track/i1");
        assert_eq!(t.items()[1].image_url, "/img/1.png");
        assert_eq!(t.pass_width(), 360.0);
    }

    #[test]
    fn offset_wraps_modulo_the_pass_width() {
        let mut t = track(3, 600.0);
        // Left at 60 px/s for 7 s = -420 px; -420 mod 360 = 300.
        for _ in 0..7 {
            t.tick(1.0);
        }
        assert!((t.offset() - 300.0).abs() < 1e-3, "got {}", t.offset());
        assert!(t.offset() >= 0.0 && t.offset() < t.pass_width());
    }

    #[test]
    fn passes_cover_the_canvas_without_gaps() {
        let mut t = track(2, 1000.0);
        t.tick(0.37);
        let layout = t.layout();
        assert!(layout.first().unwrap().rect[0] <= 0.0);
        let last = layout.last().unwrap();
        assert!(last.rect[0] + last.rect[2] + t.style().gap >= 1000.0);
        for pair in layout.windows(2) {
            assert!((pair[1].rect[0] - pair[0].rect[0] - 120.0).abs() < 1e-3);
        }
    }

    #[test]
    fn pass_count_is_capped() {
        let t = track(1, 1.0e6);
        let layout = t.layout();
        assert!(layout.len() <= MAX_PASSES);
        assert!(!layout.is_empty());
    }

    #[test]
    fn hover_eases_hit_item_and_pauses_scrolling() {
        let mut t = track(3, 600.0);
        t.tick(0.0);
        let target = t.layout().into_iter().find(|i| i.rect[0] >= 0.0).unwrap();
        let id = t.items()[target.item].id.clone();
        let point = [target.rect[0] + 10.0, target.rect[1] + 10.0];
        t.set_pointer(Some(point));
        assert!(t.is_paused());
        let before = t.offset();
        for _ in 0..30 {
            t.tick(1.0 / 60.0);
        }
        assert_eq!(t.offset(), before);
        assert_eq!(t.hovered_item().map(|i| i.id.as_str()), Some(id.as_str()));
        let v = t.visual(&id).unwrap();
        assert!((v.scale - 1.2).abs() < 1e-3);
        assert!(v.grayscale < 1e-3);
        let other = &t.items()[(target.item + 1) % 3].id;
        assert_eq!(t.visual(other).unwrap().grayscale, 1.0);

        // Outside the band: scrolling resumes and the item eases back.
        t.set_pointer(Some([5.0, 5.0]));
        assert!(!t.is_paused());
        for _ in 0..30 {
            t.tick(1.0 / 60.0);
        }
        assert_ne!(t.offset(), before);
        assert!((t.visual(&id).unwrap().scale - 1.0).abs() < 1e-3);
    }

    #[test]
    fn non_list_nodes_are_rejected() {
        let node = SceneObject::new("x", ShapeKind::Text(Default::default()));
        assert!(MarqueeTrackState::from_node(&node).is_err());
    }
}
