//! Routes scene nodes to the DOM or GPU renderers.
//!
//! GPU work is discovered by flattening the tree depth-first so primitives
//! nested under groups and lists are still found. Lists whose render policy
//! asks for `webgl` become a marquee-track job and are owned by the GPU side
//! only; the DOM renderer consults the plan and draws a mount point instead.
//!
//! A list is a leaf for dispatch: its children are generated from the
//! template and items, and any `children` on the list node itself are never
//! drawn by either renderer.

use std::collections::HashSet;

use crate::scene::{RendererKind, SceneObject, ShapeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Dom,
    Gpu,
}

/// Fixed shape partition.
pub fn classify(kind: &ShapeKind) -> RenderTarget {
    match kind {
        ShapeKind::Tile(_)
        | ShapeKind::Card(_)
        | ShapeKind::Text(_)
        | ShapeKind::List(_)
        | ShapeKind::Group(_) => RenderTarget::Dom,
        _ => RenderTarget::Gpu,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuJobKind {
    /// One raymarch canvas for a primitive, storm or plane node.
    Raymarch,
    /// One shared canvas for every item of a `webgl` list.
    MarqueeTrack,
}

#[derive(Debug, Clone)]
pub struct GpuJob {
    pub kind: GpuJobKind,
    /// The node without its children; nested GPU nodes get their own jobs.
    pub node: SceneObject,
}

#[derive(Debug, Clone, Default)]
pub struct DispatchPlan {
    pub gpu_jobs: Vec<GpuJob>,
    gpu_owned: HashSet<String>,
}

impl DispatchPlan {
    pub fn build(root: &SceneObject) -> Self {
        let mut plan = Self::default();
        plan.collect(root);
        plan
    }

    fn collect(&mut self, node: &SceneObject) {
        match &node.kind {
            ShapeKind::List(list) => {
                if list.render_policy.renderer == RendererKind::Webgl {
                    self.push(node, GpuJobKind::MarqueeTrack);
                } else if classify(&list.template.kind) == RenderTarget::Gpu {
                    for child in list.effective_children(&node.id, list.capped_items()) {
                        self.collect(&child);
                    }
                }
                return;
            }
            kind if classify(kind) == RenderTarget::Gpu => self.push(node, GpuJobKind::Raymarch),
            _ => {}
        }
        for child in &node.children {
            self.collect(child);
        }
    }

    fn push(&mut self, node: &SceneObject, kind: GpuJobKind) {
        let mut flat = node.clone();
        flat.children.clear();
        self.gpu_owned.insert(node.id.clone());
        self.gpu_jobs.push(GpuJob { kind, node: flat });
    }

    /// Which renderer draws the node with `id`.
    pub fn owner(&self, id: &str) -> RenderTarget {
        if self.gpu_owned.contains(id) {
            RenderTarget::Gpu
        } else {
            RenderTarget::Dom
        }
    }

    pub fn raymarch_jobs(&self) -> impl Iterator<Item = &GpuJob> {
        self.gpu_jobs.iter().filter(|j| j.kind == GpuJobKind::Raymarch)
    }

    pub fn marquee_jobs(&self) -> impl Iterator<Item = &GpuJob> {
        self.gpu_jobs.iter().filter(|j| j.kind == GpuJobKind::MarqueeTrack)
    }

    pub fn job(&self, id: &str) -> Option<&GpuJob> {
        self.gpu_jobs.iter().find(|j| j.node.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{
        ContentConfig, GroupConfig, ListConfig, ListItem, PrimitiveConfig, RenderPolicy, StormConfig,
    };

    fn group(id: &str, children: Vec<SceneObject>) -> SceneObject {
        SceneObject::new(id, ShapeKind::Group(GroupConfig::default())).with_children(children)
    }

    #[test]
    fn partition_is_fixed() {
        assert_eq!(classify(&ShapeKind::Card(ContentConfig::default())), RenderTarget::Dom);
        assert_eq!(classify(&ShapeKind::Group(GroupConfig::default())), RenderTarget::Dom);
        assert_eq!(classify(&ShapeKind::Torus(PrimitiveConfig::default())), RenderTarget::Gpu);
        assert_eq!(classify(&ShapeKind::Storm(StormConfig::default())), RenderTarget::Gpu);
    }

    #[test]
    fn nested_gpu_nodes_flatten_depth_first_in_order() {
        let tree = group(
            "root",
            vec![
                SceneObject::new("a", ShapeKind::Cube(PrimitiveConfig::default())).with_children(vec![
                    SceneObject::new("a1", ShapeKind::Sphere(PrimitiveConfig::default())),
                ]),
                group(
                    "g",
                    vec![
                        SceneObject::new("t", ShapeKind::Text(Default::default())),
                        SceneObject::new("b", ShapeKind::Torus(PrimitiveConfig::default())),
                    ],
                ),
                SceneObject::new("c", ShapeKind::Storm(StormConfig::default())),
            ],
        );
        let plan = DispatchPlan::build(&tree);
        let ids: Vec<_> = plan.gpu_jobs.iter().map(|j| j.node.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "a1", "b", "c"]);
        assert!(plan.gpu_jobs.iter().all(|j| j.node.children.is_empty()));
        assert_eq!(plan.owner("t"), RenderTarget::Dom);
        assert_eq!(plan.owner("b"), RenderTarget::Gpu);
    }

    #[test]
    fn webgl_list_goes_to_marquee_track_only() {
        let list = ListConfig {
            render_policy: RenderPolicy {
                renderer: RendererKind::Webgl,
                ..RenderPolicy::default()
            },
            list_items: vec![ListItem::default(); 4],
            ..ListConfig::default()
        };
        let tree = group("root", vec![SceneObject::new("l", ShapeKind::List(list))]);
        let plan = DispatchPlan::build(&tree);
        assert_eq!(plan.marquee_jobs().count(), 1);
        assert_eq!(plan.raymarch_jobs().count(), 0);
        assert_eq!(plan.owner("l"), RenderTarget::Gpu);
    }

    #[test]
    fn list_with_gpu_template_yields_one_job_per_item() {
        let list = ListConfig {
            template: Box::new(SceneObject::new("tpl", ShapeKind::Sphere(PrimitiveConfig::default()))),
            list_items: vec![
                ListItem {
                    id: Some("x".to_string()),
                    ..ListItem::default()
                },
                ListItem::default(),
            ],
            ..ListConfig::default()
        };
        let plan = DispatchPlan::build(&SceneObject::new("orbs", ShapeKind::List(list)));
        let ids: Vec<_> = plan.gpu_jobs.iter().map(|j| j.node.id.as_str()).collect();
        assert_eq!(ids, vec!["orbs/x", "orbs/1"]);
        assert_eq!(plan.owner("orbs"), RenderTarget::Dom);
    }

    #[test]
    fn list_node_children_are_not_dispatched() {
        let stray = SceneObject::new("stray", ShapeKind::Sphere(PrimitiveConfig::default()));
        for renderer in [RendererKind::Dom, RendererKind::Webgl] {
            let list = ListConfig {
                render_policy: RenderPolicy {
                    renderer,
                    ..RenderPolicy::default()
                },
                list_items: vec![ListItem::default(); 2],
                ..ListConfig::default()
            };
            let node = SceneObject::new("l", ShapeKind::List(list)).with_children(vec![stray.clone()]);
            let plan = DispatchPlan::build(&group("root", vec![node]));
            assert!(plan.job("stray").is_none());
            assert_eq!(plan.owner("stray"), RenderTarget::Dom);
        }
    }
}
