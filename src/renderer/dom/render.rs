//! Scene tree to DOM layers.
//!
//! Recurses structurally so parent/child layout survives: top-level nodes
//! and group children sit absolutely at their container centre, list items
//! flow inside their container. Nodes the dispatch plan gives to the GPU
//! become empty mount points.

use crate::color::{Rgba, parse_hex};
use crate::renderer::dispatch::{DispatchPlan, RenderTarget};
use crate::renderer::raymarch::RaymarchProgram;
use crate::scene::{
    ContentConfig, ImageFit, LeadingKind, LeadingPlacement, ListConfig, ListLayout, SceneObject,
    ShapeKind, TextAlign, TextConfig,
};

use super::node::{DomNode, css_num, px};

/// Nodes whose resolved opacity falls below this are not emitted.
pub const OPACITY_CULL: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Positioning {
    /// Centred in the parent and moved by the resolved transform.
    Absolute,
    /// In the parent's flow (list items).
    Flow,
}

pub struct DomRenderer<'a> {
    plan: &'a DispatchPlan,
    progress: f32,
}

impl<'a> DomRenderer<'a> {
    pub fn new(plan: &'a DispatchPlan, progress: f32) -> Self {
        Self { plan, progress }
    }

    /// `None` when the node is culled.
    pub fn render(&self, node: &SceneObject) -> Option<DomNode> {
        self.render_at(node, Positioning::Absolute)
    }

    fn render_at(&self, node: &SceneObject, pos: Positioning) -> Option<DomNode> {
        let opacity = node.transform.opacity.resolve(self.progress);
        if opacity < OPACITY_CULL {
            return None;
        }
        if self.plan.owner(&node.id) == RenderTarget::Gpu {
            return Some(self.mount_point(node, pos));
        }
        let el = match &node.kind {
            ShapeKind::Tile(c) => self.content(node, c, "sf-tile"),
            ShapeKind::Card(c) => self.content(node, c, "sf-card"),
            ShapeKind::Text(t) => self.text(t),
            ShapeKind::List(l) => self.list(node, l),
            ShapeKind::Group(g) => {
                let el = DomNode::new("div").class("sf-group");
                if g.clip_children {
                    el.style("overflow", "hidden")
                } else {
                    el
                }
            }
            // GPU shapes the plan does not own: nested in a DOM-only path
            // such as a list template. Draw nothing rather than guess.
            _ => return None,
        };
        let mut el = self.place(el.attr("data-node-id", node.id.clone()), node, opacity, pos);
        // List children are generated from the template, not the scene tree.
        if !matches!(node.kind, ShapeKind::List(_)) {
            el = el.children(node.children.iter().filter_map(|c| self.render_at(c, Positioning::Absolute)));
        }
        Some(el)
    }

    fn place(&self, el: DomNode, node: &SceneObject, opacity: f32, pos: Positioning) -> DomNode {
        let t = &node.transform;
        let el = el
            .style("width", px(t.frame_width))
            .style("height", px(t.frame_height))
            .style("opacity", css_num(opacity.min(1.0)));
        match pos {
            Positioning::Absolute => el
                .style("position", "absolute")
                .style("left", "50%")
                .style("top", "50%")
                .style("z-index", t.z_index.to_string())
                .style(
                    "transform",
                    format!(
                        "translate(-50%, -50%) translate3d({}, {}, 0) scale({}) rotate({}deg)",
                        px(t.offset_x.resolve(self.progress)),
                        px(t.offset_y.resolve(self.progress)),
                        css_num(t.scale.resolve(self.progress)),
                        css_num(t.rotation.resolve(self.progress)),
                    ),
                ),
            Positioning::Flow => el
                .style("position", "relative")
                .style("flex", "0 0 auto")
                .style("transform", format!("scale({})", css_num(t.scale.resolve(self.progress)))),
        }
    }

    /// Sized, translated host for a GPU canvas. Scale and opacity are
    /// applied by the canvas itself.
    fn mount_point(&self, node: &SceneObject, pos: Positioning) -> DomNode {
        let t = &node.transform;
        let (kind_attr, program) = match &node.kind {
            ShapeKind::List(_) => ("data-gpu-track", "marquee"),
            kind => ("data-gpu-node", RaymarchProgram::for_kind(kind).map_or("unknown", RaymarchProgram::name)),
        };
        let el = DomNode::new("div")
            .class("sf-gpu-mount")
            .attr(kind_attr, node.id.clone())
            .attr("data-program", program)
            .style("width", px(t.frame_width))
            .style("height", px(t.frame_height));
        match pos {
            Positioning::Absolute => el
                .style("position", "absolute")
                .style("left", "50%")
                .style("top", "50%")
                .style("z-index", t.z_index.to_string())
                .style(
                    "transform",
                    format!(
                        "translate(-50%, -50%) translate3d({}, {}, 0)",
                        px(t.offset_x.resolve(self.progress)),
                        px(t.offset_y.resolve(self.progress)),
                    ),
                ),
            Positioning::Flow => el.style("position", "relative").style("flex", "0 0 auto"),
        }
    }

    fn content(&self, node: &SceneObject, c: &ContentConfig, class: &str) -> DomNode {
        let tag = if c.href.is_empty() { "div" } else { "a" };
        let direction = match c.leading_placement {
            LeadingPlacement::Above => "column",
            LeadingPlacement::Left | LeadingPlacement::None => "row",
        };
        let mut el = DomNode::new(tag)
            .class(class)
            .style("display", "flex")
            .style("flex-direction", direction)
            .style("gap", px(c.leading_gap))
            .style("box-sizing", "border-box")
            .style("padding", px(c.padding))
            .style("border-radius", px(c.radius))
            .style("background", css_color(&c.background))
            .style("border", format!("{} solid {}", px(c.border_width), css_color(&c.border_color)))
            .style("color", css_color(&c.text_color))
            .style("overflow", "hidden");
        if !c.href.is_empty() {
            el = el.attr("href", c.href.clone());
        }
        if let Some(leading) = leading_element(c) {
            el = el.child(leading);
        }

        let mut body = DomNode::new("div").class("sf-body");
        if !c.media_url.is_empty() {
            let mut media = DomNode::new("img")
                .class("sf-media")
                .attr("src", c.media_url.clone())
                .attr("alt", "")
                .attr("loading", "lazy")
                .style("object-fit", object_fit(c.media_fit))
                .style("width", "100%");
            if c.media_height > 0.0 {
                media = media.style("height", px(c.media_height));
            }
            body = body.child(media);
        }
        if !c.label.is_empty() {
            body = body.child(DomNode::new("span").class("sf-label").text(c.label.clone()));
        }
        if !c.heading.is_empty() {
            body = body.child(DomNode::new("h3").class("sf-heading").text(c.heading.clone()));
        }
        if !c.subtitle.is_empty() {
            body = body.child(DomNode::new("p").class("sf-subtitle").text(c.subtitle.clone()));
        }
        tracing::trace!(node = %node.id, "content node");
        el.child(body)
    }

    fn text(&self, t: &TextConfig) -> DomNode {
        let mut el = DomNode::new("p")
            .class("sf-text")
            .style("margin", "0")
            .style("font-size", px(t.font_size.resolve(self.progress)))
            .style("font-weight", t.font_weight.to_string())
            .style("color", css_color(&t.color))
            .style(
                "text-align",
                match t.align {
                    TextAlign::Left => "left",
                    TextAlign::Center => "center",
                    TextAlign::Right => "right",
                },
            )
            .text(t.text.clone());
        if t.max_width > 0.0 {
            el = el.style("max-width", px(t.max_width));
        }
        el
    }

    fn list(&self, node: &SceneObject, list: &ListConfig) -> DomNode {
        match list.list_layout {
            ListLayout::Grid | ListLayout::Stack => {
                let range = list.page_range();
                let start = range.start;
                let items = &list.capped_items()[range];
                let children = items.iter().enumerate().filter_map(|(i, item)| {
                    let child = list.effective_child(&node.id, start + i, item);
                    self.render_at(&child, Positioning::Flow)
                });
                let el = DomNode::new("div").class("sf-list").style("gap", px(list.gap));
                let el = if list.list_layout == ListLayout::Grid {
                    el.class("sf-grid")
                        .style("display", "grid")
                        .style("grid-template-columns", format!("repeat({}, minmax(0, 1fr))", list.columns.max(1)))
                } else {
                    el.class("sf-stack").style("display", "flex").style("flex-direction", "column")
                };
                el.attr("data-page", list.page.to_string()).children(children)
            }
            ListLayout::Marquee => self.marquee(node, list),
        }
    }

    /// Two identical halves so the track can wrap by one content width.
    fn marquee(&self, node: &SceneObject, list: &ListConfig) -> DomNode {
        let children = list.effective_children(&node.id, list.capped_items());
        let half = |name: &str| {
            children
                .iter()
                .filter_map(|c| self.render_at(c, Positioning::Flow))
                .map(|el| el.attr("data-half", name.to_string()))
                .collect::<Vec<_>>()
        };
        let b_half: Vec<DomNode> = half("b").into_iter().map(|el| el.attr("aria-hidden", "true")).collect();
        let track = DomNode::new("div")
            .class("sf-marquee-track")
            .style("display", "flex")
            .style("gap", px(list.gap))
            .style("width", "max-content")
            .style("transform", "translate3d(0px, 0, 0)")
            .children(half("a"))
            .children(b_half);
        DomNode::new("div")
            .class("sf-list")
            .class("sf-marquee")
            .attr("data-marquee-track", node.id.clone())
            .attr("data-item-count", children.len().to_string())
            .attr("data-speed", css_num(list.speed))
            .attr("data-direction", css_num(list.direction.sign()))
            .attr("data-pause-on-hover", list.pause_on_hover.to_string())
            .style("overflow", "hidden")
            .child(track)
    }
}

fn leading_element(c: &ContentConfig) -> Option<DomNode> {
    if c.leading_placement == LeadingPlacement::None {
        return None;
    }
    let el = match c.leading_kind {
        LeadingKind::Icon if !c.leading_icon.is_empty() => DomNode::new("span")
            .class("sf-leading")
            .class("sf-icon")
            .attr("data-icon", c.leading_icon.clone())
            .attr("aria-hidden", "true"),
        LeadingKind::Image if !c.leading_image.is_empty() => DomNode::new("img")
            .class("sf-leading")
            .attr("src", c.leading_image.clone())
            .attr("alt", "")
            .style("object-fit", "cover"),
        _ => return None,
    };
    Some(
        el.style("width", px(c.leading_size))
            .style("height", px(c.leading_size))
            .style("flex", "0 0 auto")
            .style("opacity", css_num(c.leading_opacity))
            .style("border-radius", px(c.leading_radius)),
    )
}

fn object_fit(fit: ImageFit) -> &'static str {
    match fit {
        ImageFit::Cover => "cover",
        ImageFit::Contain => "contain",
        ImageFit::Native => "none",
    }
}

/// Normalises authoring colours to `rgba()`; unparsable input passes through.
fn css_color(s: &str) -> String {
    match parse_hex(s) {
        Ok(c) => rgba_css(c),
        Err(_) if s.is_empty() => "transparent".to_string(),
        Err(_) => s.to_string(),
    }
}

pub fn rgba_css(c: Rgba) -> String {
    let [r, g, b, _] = c.to_rgba8();
    format!("rgba({r}, {g}, {b}, {})", css_num(c.a))
}
