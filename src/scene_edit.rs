//! Editor operations on a scene forest.
//!
//! Every edit is copy-on-write: the input slice is left as it was and a new
//! forest is returned, so a render pass holding the old snapshot never sees
//! a half-applied change. Node ids are stable; only duplication mints new ones.

use std::collections::HashSet;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;

use crate::scene::SceneObject;

/// Mints ids that do not collide with anything already in the forest.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    prefix: String,
    next: u64,
    taken: HashSet<String>,
}

impl IdAllocator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
            taken: HashSet::new(),
        }
    }

    /// Allocator that knows every id currently used in `forest`.
    pub fn for_forest(prefix: impl Into<String>, forest: &[SceneObject]) -> Self {
        let mut alloc = Self::new(prefix);
        for root in forest {
            root.visit(&mut |n| {
                alloc.taken.insert(n.id.clone());
            });
        }
        alloc
    }

    pub fn next_id(&mut self) -> String {
        loop {
            let id = format!("{}-{}", self.prefix, self.next);
            self.next += 1;
            if self.taken.insert(id.clone()) {
                return id;
            }
        }
    }
}

pub fn find_node<'a>(forest: &'a [SceneObject], id: &str) -> Option<&'a SceneObject> {
    forest.iter().find_map(|n| n.find(id))
}

/// Locate the owning array of `id` and the node's index in it.
fn with_owner<T>(
    forest: &mut Vec<SceneObject>,
    id: &str,
    f: &mut impl FnMut(&mut Vec<SceneObject>, usize) -> T,
) -> Option<T> {
    if let Some(i) = forest.iter().position(|n| n.id == id) {
        return Some(f(forest, i));
    }
    forest
        .iter_mut()
        .find_map(|n| with_owner(&mut n.children, id, f))
}

fn reassign_ids(node: &mut SceneObject, alloc: &mut IdAllocator) {
    node.id = alloc.next_id();
    for child in &mut node.children {
        reassign_ids(child, alloc);
    }
}

/// Deep-copy `id` and insert the copy right after it. Returns the new forest
/// and the copy's id.
pub fn duplicate_node(
    forest: &[SceneObject],
    id: &str,
    alloc: &mut IdAllocator,
) -> Result<(Vec<SceneObject>, String)> {
    let mut next = forest.to_vec();
    let new_id = with_owner(&mut next, id, &mut |owner, i| {
        let mut copy = owner[i].clone();
        reassign_ids(&mut copy, alloc);
        copy.is_expanded = true;
        if !copy.name.is_empty() {
            copy.name = format!("{} copy", copy.name);
        }
        let new_id = copy.id.clone();
        owner.insert(i + 1, copy);
        new_id
    })
    .ok_or_else(|| anyhow!("cannot duplicate missing node '{id}'"))?;
    tracing::debug!(source = id, copy = %new_id, "duplicated scene node");
    Ok((next, new_id))
}

/// Replace the node with `id` by `node`, keeping its position.
pub fn replace_node(forest: &[SceneObject], id: &str, node: SceneObject) -> Result<Vec<SceneObject>> {
    let mut next = forest.to_vec();
    let mut node = Some(node);
    with_owner(&mut next, id, &mut |owner, i| {
        if let Some(n) = node.take() {
            owner[i] = n;
        }
    })
    .ok_or_else(|| anyhow!("cannot replace missing node '{id}'"))?;
    Ok(next)
}

pub fn remove_node(forest: &[SceneObject], id: &str) -> Result<Vec<SceneObject>> {
    let mut next = forest.to_vec();
    with_owner(&mut next, id, &mut |owner, i| {
        owner.remove(i);
    })
    .ok_or_else(|| anyhow!("cannot remove missing node '{id}'"))?;
    Ok(next)
}

pub fn add_child(forest: &[SceneObject], parent_id: &str, child: SceneObject) -> Result<Vec<SceneObject>> {
    if find_node(forest, &child.id).is_some() {
        bail!("node id '{}' already exists", child.id);
    }
    let mut next = forest.to_vec();
    let parent = next
        .iter_mut()
        .find_map(|n| n.find_mut(parent_id))
        .ok_or_else(|| anyhow!("cannot add child to missing node '{parent_id}'"))?;
    parent.children.push(child);
    Ok(next)
}

/// Set one camelCase field on a node through its JSON form.
///
/// The value has to deserialize into the node's shape; `id` and `children`
/// are not editable this way.
pub fn update_field(
    forest: &[SceneObject],
    id: &str,
    field: &str,
    value: Value,
) -> Result<Vec<SceneObject>> {
    if matches!(field, "id" | "children") {
        bail!("field '{field}' cannot be edited directly");
    }
    let current = find_node(forest, id).ok_or_else(|| anyhow!("cannot update missing node '{id}'"))?;
    let mut json = serde_json::to_value(current).context("failed to serialize scene node")?;
    let Value::Object(obj) = &mut json else {
        bail!("scene node '{id}' did not serialize to an object");
    };
    obj.insert(field.to_string(), value);
    let updated: SceneObject = serde_json::from_value(json)
        .with_context(|| format!("invalid value for field '{field}' on node '{id}'"))?;
    replace_node(forest, id, updated)
}
