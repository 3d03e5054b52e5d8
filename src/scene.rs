//! Scene object model.
//!
//! A scene object is a node in a section's scene tree. The JSON form is one
//! flat record per node (`shape` discriminates the rest of the fields); in
//! Rust the shape-specific fields live in [`ShapeKind`] while the transform
//! block shared by every shape is composed in via [`Transform`].

use serde::{Deserialize, Serialize};

use crate::param::AnimatedParam;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObject {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Editor-only disclosure state.
    #[serde(default)]
    pub is_expanded: bool,
    #[serde(flatten)]
    pub transform: Transform,
    #[serde(flatten)]
    pub kind: ShapeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneObject>,
}

/// Placement block shared by every shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Transform {
    pub offset_x: AnimatedParam,
    pub offset_y: AnimatedParam,
    pub scale: AnimatedParam,
    pub opacity: AnimatedParam,
    /// Degrees, applied in the DOM transform.
    pub rotation: AnimatedParam,
    /// Container size in CSS pixels.
    pub frame_width: f32,
    pub frame_height: f32,
    pub z_index: i32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            offset_x: AnimatedParam::fixed(0.0),
            offset_y: AnimatedParam::fixed(0.0),
            scale: AnimatedParam::fixed(1.0),
            opacity: AnimatedParam::fixed(1.0),
            rotation: AnimatedParam::fixed(0.0),
            frame_width: 320.0,
            frame_height: 320.0,
            z_index: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum ShapeKind {
    Tetrahedron(PrimitiveConfig),
    Cube(PrimitiveConfig),
    Sphere(PrimitiveConfig),
    Cylinder(PrimitiveConfig),
    Torus(PrimitiveConfig),
    Column(PrimitiveConfig),
    Storm(StormConfig),
    Plane(PlaneConfig),
    Tile(ContentConfig),
    Card(ContentConfig),
    Text(TextConfig),
    List(ListConfig),
    Group(GroupConfig),
}

/// Signed-distance primitive selected for a GPU node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdfShape {
    Tetrahedron,
    Cube,
    Sphere,
    Cylinder,
    Torus,
    Column,
    Plane,
}

impl SdfShape {
    pub fn as_str(self) -> &'static str {
        match self {
            SdfShape::Tetrahedron => "tetrahedron",
            SdfShape::Cube => "cube",
            SdfShape::Sphere => "sphere",
            SdfShape::Cylinder => "cylinder",
            SdfShape::Torus => "torus",
            SdfShape::Column => "column",
            SdfShape::Plane => "plane",
        }
    }
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Tetrahedron(_) => "tetrahedron",
            ShapeKind::Cube(_) => "cube",
            ShapeKind::Sphere(_) => "sphere",
            ShapeKind::Cylinder(_) => "cylinder",
            ShapeKind::Torus(_) => "torus",
            ShapeKind::Column(_) => "column",
            ShapeKind::Storm(_) => "storm",
            ShapeKind::Plane(_) => "plane",
            ShapeKind::Tile(_) => "tile",
            ShapeKind::Card(_) => "card",
            ShapeKind::Text(_) => "text",
            ShapeKind::List(_) => "list",
            ShapeKind::Group(_) => "group",
        }
    }

    /// Geometric configuration for raymarched primitives (including the textured plane).
    pub fn primitive(&self) -> Option<(SdfShape, &PrimitiveConfig)> {
        match self {
            ShapeKind::Tetrahedron(p) => Some((SdfShape::Tetrahedron, p)),
            ShapeKind::Cube(p) => Some((SdfShape::Cube, p)),
            ShapeKind::Sphere(p) => Some((SdfShape::Sphere, p)),
            ShapeKind::Cylinder(p) => Some((SdfShape::Cylinder, p)),
            ShapeKind::Torus(p) => Some((SdfShape::Torus, p)),
            ShapeKind::Column(p) => Some((SdfShape::Column, p)),
            ShapeKind::Plane(p) => Some((SdfShape::Plane, &p.primitive)),
            _ => None,
        }
    }

    pub fn content(&self) -> Option<&ContentConfig> {
        match self {
            ShapeKind::Tile(c) | ShapeKind::Card(c) => Some(c),
            _ => None,
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut ContentConfig> {
        match self {
            ShapeKind::Tile(c) | ShapeKind::Card(c) => Some(c),
            _ => None,
        }
    }

    pub fn list(&self) -> Option<&ListConfig> {
        match self {
            ShapeKind::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn list_mut(&mut self) -> Option<&mut ListConfig> {
        match self {
            ShapeKind::List(l) => Some(l),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationMode {
    #[default]
    Static,
    Rotate,
    Hover,
    #[serde(rename = "3drotate")]
    ThreeDRotate,
    Marquee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Left,
    Right,
}

impl Direction {
    /// Sign applied to horizontal advance.
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}

/// Fields of a raymarched primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrimitiveConfig {
    pub height: AnimatedParam,
    pub base_width: AnimatedParam,
    pub color: String,
    pub glow: AnimatedParam,
    pub bloom: AnimatedParam,
    /// Degrees.
    pub hue_rotation: AnimatedParam,
    pub noise: AnimatedParam,
    pub saturation: AnimatedParam,
    pub color_frequency: AnimatedParam,

    pub animation_mode: AnimationMode,
    /// Static Euler angles in degrees.
    pub rotation_x: AnimatedParam,
    pub rotation_y: AnimatedParam,
    pub rotation_z: AnimatedParam,
    pub rotate_speed: f32,
    /// Per-second smoothing rate for hover mode.
    pub hover_smoothing: f32,
    /// Max yaw/pitch in degrees reached at the container edge.
    pub hover_range: f32,
    pub marquee_speed: f32,
    pub marquee_direction: Direction,
    pub suspend_when_offscreen: bool,
}

impl Default for PrimitiveConfig {
    fn default() -> Self {
        Self {
            height: AnimatedParam::fixed(1.0),
            base_width: AnimatedParam::fixed(1.0),
            color: "#7c5cff".to_string(),
            glow: AnimatedParam::fixed(1.0),
            bloom: AnimatedParam::fixed(0.5),
            hue_rotation: AnimatedParam::fixed(0.0),
            noise: AnimatedParam::fixed(0.0),
            saturation: AnimatedParam::fixed(1.0),
            color_frequency: AnimatedParam::fixed(1.0),
            animation_mode: AnimationMode::Static,
            rotation_x: AnimatedParam::fixed(0.0),
            rotation_y: AnimatedParam::fixed(0.0),
            rotation_z: AnimatedParam::fixed(0.0),
            rotate_speed: 1.0,
            hover_smoothing: 6.0,
            hover_range: 25.0,
            marquee_speed: 0.25,
            marquee_direction: Direction::Left,
            suspend_when_offscreen: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    #[default]
    Cover,
    Contain,
    Native,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaneConfig {
    #[serde(flatten)]
    pub primitive: PrimitiveConfig,
    pub image_url: String,
    pub image_fit: ImageFit,
    pub corner_radius: f32,
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self {
            primitive: PrimitiveConfig {
                glow: AnimatedParam::fixed(0.25),
                bloom: AnimatedParam::fixed(0.0),
                ..PrimitiveConfig::default()
            },
            image_url: String::new(),
            image_fit: ImageFit::Cover,
            corner_radius: 0.05,
        }
    }
}

/// Volumetric storm / atmosphere effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StormConfig {
    pub color: String,
    pub flash_color: String,
    pub density: AnimatedParam,
    pub speed: f32,
    pub flash_frequency: f32,
    pub flash_intensity: AnimatedParam,
    pub hue_rotation: AnimatedParam,
    pub saturation: AnimatedParam,
    pub noise: AnimatedParam,
    pub suspend_when_offscreen: bool,
}

impl Default for StormConfig {
    fn default() -> Self {
        Self {
            color: "#1b2140".to_string(),
            flash_color: "#cfd8ff".to_string(),
            density: AnimatedParam::fixed(0.6),
            speed: 0.2,
            flash_frequency: 0.35,
            flash_intensity: AnimatedParam::fixed(0.8),
            hue_rotation: AnimatedParam::fixed(0.0),
            saturation: AnimatedParam::fixed(1.0),
            noise: AnimatedParam::fixed(0.02),
            suspend_when_offscreen: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadingKind {
    #[default]
    None,
    Icon,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadingPlacement {
    #[default]
    Left,
    Above,
    None,
}

/// Content-bearing tile/card fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentConfig {
    pub heading: String,
    pub label: String,
    pub subtitle: String,
    pub href: String,

    pub leading_kind: LeadingKind,
    pub leading_placement: LeadingPlacement,
    pub leading_icon: String,
    pub leading_image: String,
    pub leading_size: f32,
    pub leading_gap: f32,
    pub leading_opacity: f32,
    pub leading_radius: f32,

    pub padding: f32,
    pub radius: f32,
    pub background: String,
    pub border_color: String,
    pub border_width: f32,
    pub text_color: String,

    pub media_url: String,
    pub media_fit: ImageFit,
    pub media_height: f32,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            heading: String::new(),
            label: String::new(),
            subtitle: String::new(),
            href: String::new(),
            leading_kind: LeadingKind::None,
            leading_placement: LeadingPlacement::Left,
            leading_icon: String::new(),
            leading_image: String::new(),
            leading_size: 40.0,
            leading_gap: 12.0,
            leading_opacity: 1.0,
            leading_radius: 8.0,
            padding: 16.0,
            radius: 16.0,
            background: "#ffffff14".to_string(),
            border_color: "#ffffff29".to_string(),
            border_width: 1.0,
            text_color: "#f5f6fa".to_string(),
            media_url: String::new(),
            media_fit: ImageFit::Cover,
            media_height: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextConfig {
    pub text: String,
    pub font_size: AnimatedParam,
    pub font_weight: u16,
    pub color: String,
    pub align: TextAlign,
    pub max_width: f32,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: AnimatedParam::fixed(32.0),
            font_weight: 600,
            color: "#f5f6fa".to_string(),
            align: TextAlign::Center,
            max_width: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupConfig {
    pub clip_children: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListLayout {
    #[default]
    Grid,
    Stack,
    Marquee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    #[default]
    Dom,
    Webgl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderPolicy {
    pub renderer: RendererKind,
    pub overscan: u32,
    pub max_items: Option<u32>,
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self {
            renderer: RendererKind::Dom,
            overscan: 2,
            max_items: None,
        }
    }
}

/// Partial override merged onto a list template to produce one child.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leading_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leading_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListConfig {
    pub list_layout: ListLayout,
    pub template: Box<SceneObject>,
    pub list_items: Vec<ListItem>,
    pub gap: f32,
    pub columns: u32,
    pub rows: u32,
    pub page: u32,
    /// Pixels per frame at 60fps.
    pub speed: f32,
    pub direction: Direction,
    pub pause_on_hover: bool,
    pub render_policy: RenderPolicy,

    pub item_width: f32,
    pub item_height: f32,
    /// CSS-style radius, one or four values.
    pub item_radius: String,
    pub item_border_width: f32,
    pub item_border_color: String,
    pub hover_scale: f32,
    pub idle_grayscale: f32,
    /// Fraction of the remaining distance covered per frame.
    pub hover_smoothing: f32,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            list_layout: ListLayout::Grid,
            template: Box::new(SceneObject::new("template", ShapeKind::Card(ContentConfig::default()))),
            list_items: Vec::new(),
            gap: 16.0,
            columns: 3,
            rows: 2,
            page: 0,
            speed: 0.5,
            direction: Direction::Left,
            pause_on_hover: true,
            render_policy: RenderPolicy::default(),
            item_width: 220.0,
            item_height: 140.0,
            item_radius: "16px".to_string(),
            item_border_width: 1.0,
            item_border_color: "#ffffff29".to_string(),
            hover_scale: 1.06,
            idle_grayscale: 1.0,
            hover_smoothing: 0.15,
        }
    }
}

impl ListConfig {
    /// Items after the render-policy cap.
    pub fn capped_items(&self) -> &[ListItem] {
        match self.render_policy.max_items {
            Some(max) => &self.list_items[..self.list_items.len().min(max as usize)],
            None => &self.list_items,
        }
    }

    /// Index range of the current grid page within [`Self::capped_items`]:
    /// `page * columns * rows` offset, `columns * rows` long.
    pub fn page_range(&self) -> std::ops::Range<usize> {
        let len = self.capped_items().len();
        let per_page = (self.columns.max(1) as usize).saturating_mul(self.rows.max(1) as usize);
        let start = (self.page as usize).saturating_mul(per_page).min(len);
        start..start.saturating_add(per_page).min(len)
    }

    pub fn page_slice(&self) -> &[ListItem] {
        &self.capped_items()[self.page_range()]
    }

    /// Merge one item onto the template. The template itself is never mutated.
    pub fn effective_child(&self, list_id: &str, index: usize, item: &ListItem) -> SceneObject {
        let mut child = (*self.template).clone();
        let suffix = item.id.clone().unwrap_or_else(|| index.to_string());
        child.id = format!("{list_id}/{suffix}");
        child.children.clear();
        if let Some(opacity) = item.opacity {
            child.transform.opacity = AnimatedParam::fixed(opacity);
        }
        match &mut child.kind {
            ShapeKind::Tile(c) | ShapeKind::Card(c) => {
                overlay(&mut c.heading, &item.heading);
                overlay(&mut c.label, &item.label);
                overlay(&mut c.subtitle, &item.subtitle);
                overlay(&mut c.href, &item.href);
                overlay(&mut c.leading_icon, &item.leading_icon);
                overlay(&mut c.leading_image, &item.leading_image);
                overlay(&mut c.media_url, &item.media_url);
            }
            ShapeKind::Text(t) => overlay(&mut t.text, &item.heading),
            ShapeKind::Plane(p) => {
                overlay(&mut p.image_url, &item.media_url);
                overlay(&mut p.image_url, &item.leading_image);
            }
            _ => {}
        }
        child
    }

    pub fn effective_children(&self, list_id: &str, items: &[ListItem]) -> Vec<SceneObject> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.effective_child(list_id, i, item))
            .collect()
    }
}

fn overlay(dst: &mut String, src: &Option<String>) {
    if let Some(v) = src {
        dst.clone_from(v);
    }
}

impl SceneObject {
    pub fn new(id: impl Into<String>, kind: ShapeKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            is_expanded: false,
            transform: Transform::default(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<SceneObject>) -> Self {
        self.children = children;
        self
    }

    pub fn shape_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Depth-first search by id.
    pub fn find(&self, id: &str) -> Option<&SceneObject> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut SceneObject> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Pre-order visit of this node and all descendants.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a SceneObject)) {
        f(self);
        for c in &self.children {
            c.visit(f);
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneObject::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_json_round_trips_through_tagged_union() {
        let json = r##"{
            "id": "hero",
            "shape": "tetrahedron",
            "offsetX": {"value": 0, "endValue": 120, "isLinked": true},
            "opacity": 0.8,
            "frameWidth": 400,
            "height": 1.5,
            "color": "#ff8800",
            "animationMode": "3drotate"
        }"##;
        let node: SceneObject = serde_json::from_str(json).unwrap();
        assert_eq!(node.id, "hero");
        assert_eq!(node.transform.offset_x.resolve(0.5), 60.0);
        assert_eq!(node.transform.opacity.value, 0.8);
        assert_eq!(node.transform.frame_width, 400.0);
        let (shape, prim) = node.kind.primitive().unwrap();
        assert_eq!(shape, SdfShape::Tetrahedron);
        assert_eq!(prim.height.value, 1.5);
        assert_eq!(prim.animation_mode, AnimationMode::ThreeDRotate);
        assert_eq!(prim.base_width.value, 1.0);

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["shape"], "tetrahedron");
        assert_eq!(back["animationMode"], "3drotate");
        let again: SceneObject = serde_json::from_value(back).unwrap();
        assert_eq!(again, node);
    }

    #[test]
    fn plane_flattens_primitive_fields() {
        let json = r#"{"id": "p", "shape": "plane", "imageUrl": "hero.png", "imageFit": "contain", "glow": 0.5}"#;
        let node: SceneObject = serde_json::from_str(json).unwrap();
        let ShapeKind::Plane(plane) = &node.kind else {
            panic!("expected plane");
        };
        assert_eq!(plane.image_url, "hero.png");
        assert_eq!(plane.image_fit, ImageFit::Contain);
        assert_eq!(plane.primitive.glow.value, 0.5);
        assert_eq!(node.kind.primitive().unwrap().0, SdfShape::Plane);
    }

    #[test]
    fn list_effective_child_merges_without_touching_template() {
        let mut list = ListConfig::default();
        if let ShapeKind::Card(c) = &mut list.template.kind {
            c.heading = "Template".to_string();
            c.subtitle = "Default subtitle".to_string();
        }
        let item = ListItem {
            id: Some("p1".to_string()),
            heading: Some("Product One".to_string()),
            ..ListItem::default()
        };
        let child = list.effective_child("products", 0, &item);
        assert_eq!(child.id, "products/p1");
        let c = child.kind.content().unwrap();
        assert_eq!(c.heading, "Product One");
        assert_eq!(c.subtitle, "Default subtitle");
        assert_eq!(list.template.kind.content().unwrap().heading, "Template");
    }

    #[test]
    fn grid_page_slice_uses_columns_times_rows() {
        let list = ListConfig {
            columns: 2,
            rows: 2,
            page: 1,
            list_items: (0..7)
                .map(|i| ListItem {
                    id: Some(format!("i{i}")),
                    ..ListItem::default()
                })
                .collect(),
            ..ListConfig::default()
        };
        let ids: Vec<_> = list.page_slice().iter().map(|i| i.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["i4", "i5", "i6"]);

        let past_end = ListConfig { page: 5, ..list };
        assert!(past_end.page_slice().is_empty());
    }

    #[test]
    fn huge_grid_dimensions_saturate() {
        let list = ListConfig {
            columns: u32::MAX,
            rows: u32::MAX,
            page: u32::MAX,
            list_items: vec![ListItem::default(); 4],
            ..ListConfig::default()
        };
        assert_eq!(list.page_range(), 4..4);

        let first = ListConfig { page: 0, ..list };
        assert_eq!(first.page_range(), 0..4);
    }

    #[test]
    fn max_items_caps_before_pagination() {
        let list = ListConfig {
            render_policy: RenderPolicy {
                max_items: Some(3),
                ..RenderPolicy::default()
            },
            list_items: vec![ListItem::default(); 10],
            ..ListConfig::default()
        };
        assert_eq!(list.capped_items().len(), 3);
    }

    #[test]
    fn find_walks_nested_children() {
        let tree = SceneObject::new("root", ShapeKind::Group(GroupConfig::default())).with_children(vec![
            SceneObject::new("a", ShapeKind::Text(TextConfig::default())),
            SceneObject::new("g", ShapeKind::Group(GroupConfig::default())).with_children(vec![
                SceneObject::new("deep", ShapeKind::Sphere(PrimitiveConfig::default())),
            ]),
        ]);
        assert_eq!(tree.find("deep").map(|n| n.shape_name()), Some("sphere"));
        assert!(tree.find("missing").is_none());
        assert_eq!(tree.node_count(), 4);
    }
}
