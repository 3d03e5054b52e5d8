//! Preset instantiation: section overrides, then binding data injection.
//!
//! Overrides carry explicit intent. Every `(node id, field)` pair an override
//! names is recorded in [`TouchedFields`], and injection never writes a
//! touched field. Untouched fields follow the value rule: inject when the
//! node still equals the preset baseline, or is empty.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

use crate::binding::{Binding, Record};
use crate::preset::Preset;
use crate::scene::{ContentConfig, ListItem, SceneObject, ShapeKind};

/// Partial field objects keyed by preset node id.
pub type Overrides = BTreeMap<String, Map<String, Value>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchedFields {
    set: HashSet<(String, String)>,
}

impl TouchedFields {
    pub fn from_overrides(overrides: &Overrides) -> Self {
        let set = overrides
            .iter()
            .flat_map(|(id, fields)| fields.keys().map(move |f| (id.clone(), f.clone())))
            .collect();
        Self { set }
    }

    pub fn contains(&self, node_id: &str, field: &str) -> bool {
        self.set
            .contains(&(node_id.to_string(), field.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// A preset turned into a section's own scene.
#[derive(Debug, Clone)]
pub struct Instantiation {
    /// Preset config with overrides merged, before injection.
    pub baseline: SceneObject,
    pub scene: SceneObject,
    pub touched: TouchedFields,
    /// Override keys that named no node in the preset.
    pub unmatched_overrides: Vec<String>,
}

/// Merge `overrides` onto a fresh copy of the preset config and inject
/// `records`. Never mutates the preset.
pub fn instantiate(
    preset: &Preset,
    overrides: &Overrides,
    binding: &Binding,
    records: &[Record],
) -> Result<Instantiation> {
    if let Some(id) = overrides.iter().find_map(|(id, f)| f.contains_key("children").then_some(id)) {
        bail!("override for node '{id}' in preset '{}' may not replace its children", preset.key);
    }
    let mut config = preset.config.clone();
    let mut matched = HashSet::new();
    merge_overrides(&mut config, overrides, &mut matched);
    let baseline: SceneObject = serde_json::from_value(config)
        .with_context(|| format!("overrides for preset '{}' produce an invalid scene", preset.key))?;

    let unmatched_overrides: Vec<String> = overrides
        .keys()
        .filter(|id| !matched.contains(id.as_str()))
        .cloned()
        .collect();
    if !unmatched_overrides.is_empty() {
        tracing::warn!(
            preset = %preset.key,
            ids = ?unmatched_overrides,
            "overrides name nodes missing from preset"
        );
    }

    let touched = TouchedFields::from_overrides(overrides);
    let mut scene = baseline.clone();
    inject_binding_data(&mut scene, records, &preset.scene, &touched);
    tracing::debug!(
        preset = %preset.key,
        binding = ?binding,
        records = records.len(),
        "instantiated preset"
    );
    Ok(Instantiation {
        baseline,
        scene,
        touched,
        unmatched_overrides,
    })
}

fn merge_overrides(node: &mut Value, overrides: &Overrides, matched: &mut HashSet<String>) {
    let Value::Object(obj) = node else {
        return;
    };
    let id = obj.get("id").and_then(Value::as_str).map(str::to_string);
    if let Some((id, fields)) = id.and_then(|id| overrides.get(&id).map(|f| (id, f))) {
        for (k, v) in fields {
            obj.insert(k.clone(), v.clone());
        }
        matched.insert(id);
    }
    if let Some(Value::Array(children)) = obj.get_mut("children") {
        for child in children {
            merge_overrides(child, overrides, matched);
        }
    }
}

/// Copy resolved records into the content-bearing nodes of `node`.
///
/// `original` is the un-injected preset tree with the same shape as `node`.
/// Tile and card leaves take their fields from the first record. List nodes
/// take the full record array as `listItems`, whatever the binding kind.
pub fn inject_binding_data(
    node: &mut SceneObject,
    records: &[Record],
    original: &SceneObject,
    touched: &TouchedFields,
) {
    let id = node.id.clone();
    match (&mut node.kind, &original.kind) {
        (ShapeKind::Tile(c) | ShapeKind::Card(c), ShapeKind::Tile(o) | ShapeKind::Card(o)) => {
            if let Some(record) = records.first() {
                inject_content(&id, c, o, record, touched);
            }
        }
        (ShapeKind::List(list), _) => {
            if !touched.contains(&id, "listItems") {
                list.list_items = records.iter().map(list_item_from_record).collect();
            }
        }
        _ => {}
    }
    for (i, child) in node.children.iter_mut().enumerate() {
        // Overrides never touch children, so the trees stay aligned.
        if let Some(orig) = original.children.get(i) {
            inject_binding_data(child, records, orig, touched);
        }
    }
}

/// Record fields feeding each content field.
const CONTENT_FIELDS: &[(&str, &str)] = &[
    ("heading", "title"),
    ("subtitle", "description"),
    ("label", "category"),
    ("href", "href"),
    ("leadingIcon", "icon"),
    ("leadingImage", "image"),
    ("mediaUrl", "image"),
];

fn inject_content(
    id: &str,
    node: &mut ContentConfig,
    original: &ContentConfig,
    record: &Record,
    touched: &TouchedFields,
) {
    for &(field, source) in CONTENT_FIELDS {
        let value = record.get(source);
        if value.is_empty() || touched.contains(id, field) {
            continue;
        }
        let (Some(current), Some(baseline)) = (content_field_mut(node, field), content_field(original, field))
        else {
            continue;
        };
        if current == baseline || current.is_empty() {
            *current = value.to_string();
        }
    }
}

fn content_field<'a>(c: &'a ContentConfig, field: &str) -> Option<&'a String> {
    Some(match field {
        "heading" => &c.heading,
        "subtitle" => &c.subtitle,
        "label" => &c.label,
        "href" => &c.href,
        "leadingIcon" => &c.leading_icon,
        "leadingImage" => &c.leading_image,
        "mediaUrl" => &c.media_url,
        _ => return None,
    })
}

fn content_field_mut<'a>(c: &'a mut ContentConfig, field: &str) -> Option<&'a mut String> {
    Some(match field {
        "heading" => &mut c.heading,
        "subtitle" => &mut c.subtitle,
        "label" => &mut c.label,
        "href" => &mut c.href,
        "leadingIcon" => &mut c.leading_icon,
        "leadingImage" => &mut c.leading_image,
        "mediaUrl" => &mut c.media_url,
        _ => return None,
    })
}

pub fn list_item_from_record(record: &Record) -> ListItem {
    let field = |name: &str| Some(record.get(name)).filter(|v| !v.is_empty()).map(str::to_string);
    ListItem {
        id: field("id"),
        heading: field("title"),
        label: field("category"),
        subtitle: field("description"),
        href: field("href"),
        leading_icon: field("icon"),
        leading_image: field("image"),
        media_url: field("image"),
        opacity: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Cardinality, Target};
    use crate::preset::PresetRegistry;
    use serde_json::json;

    fn product(id: &str, title: &str) -> Record {
        Record::default()
            .with("id", id)
            .with("title", title)
            .with("image", format!("/images/{id}.png"))
    }

    fn overrides(v: Value) -> Overrides {
        serde_json::from_value(v).unwrap()
    }

    fn card_preset() -> Preset {
        let config = json!({
            "id": "root",
            "shape": "group",
            "children": [
                {"id": "c", "shape": "card", "heading": "Default heading", "subtitle": ""},
                {"id": "l", "shape": "list", "listItems": [{"heading": "placeholder"}]}
            ]
        });
        Preset {
            key: "test.card.v1".to_string(),
            signature: crate::preset::Signature::Any,
            scene: serde_json::from_value(config.clone()).unwrap(),
            config,
        }
    }

    fn card(scene: &SceneObject) -> &ContentConfig {
        scene.find("c").unwrap().kind.content().unwrap()
    }

    fn items(scene: &SceneObject) -> &[ListItem] {
        &scene.find("l").unwrap().kind.list().unwrap().list_items
    }

    #[test]
    fn untouched_fields_receive_first_record() {
        let preset = card_preset();
        let binding = Binding::related(Target::Product, Cardinality::Many);
        let records = vec![product("p1", "One"), product("p2", "Two")];
        let inst = instantiate(&preset, &Overrides::new(), &binding, &records).unwrap();
        assert_eq!(card(&inst.scene).heading, "One");
        assert_eq!(card(&inst.scene).leading_image, "/images/p1.png");
        assert_eq!(items(&inst.scene).len(), 2);
        assert_eq!(items(&inst.scene)[1].heading.as_deref(), Some("Two"));
        assert_eq!(card(&preset.scene).heading, "Default heading");
    }

    #[test]
    fn overridden_fields_are_not_clobbered() {
        let preset = card_preset();
        let binding = Binding::related(Target::Product, Cardinality::Many);
        let ov = overrides(json!({"c": {"heading": "Editor wrote this"}}));
        let inst = instantiate(&preset, &ov, &binding, &[product("p1", "One")]).unwrap();
        assert_eq!(card(&inst.scene).heading, "Editor wrote this");
        assert_eq!(card(&inst.scene).media_url, "/images/p1.png");
    }

    #[test]
    fn override_equal_to_default_still_blocks_injection() {
        let preset = card_preset();
        let binding = Binding::related(Target::Product, Cardinality::Many);
        let ov = overrides(json!({"c": {"heading": "Default heading"}}));
        let inst = instantiate(&preset, &ov, &binding, &[product("p1", "One")]).unwrap();
        assert_eq!(card(&inst.scene).heading, "Default heading");
    }

    #[test]
    fn touched_list_items_block_injection() {
        let preset = card_preset();
        let binding = Binding::related(Target::Product, Cardinality::Many);
        let ov = overrides(json!({"l": {"listItems": [{"heading": "placeholder"}]}}));
        let inst = instantiate(&preset, &ov, &binding, &[product("p1", "One")]).unwrap();
        assert_eq!(items(&inst.scene).len(), 1);
        assert_eq!(items(&inst.scene)[0].heading.as_deref(), Some("placeholder"));
    }

    #[test]
    fn self_binding_fills_lists_with_the_self_record() {
        let preset = card_preset();
        let record = Record::default().with("title", "Acme");
        let inst = instantiate(&preset, &Overrides::new(), &Binding::SelfSubject, &[record]).unwrap();
        assert_eq!(card(&inst.scene).heading, "Acme");
        assert_eq!(items(&inst.scene).len(), 1);
        assert_eq!(items(&inst.scene)[0].heading.as_deref(), Some("Acme"));
    }

    #[test]
    fn children_overrides_are_rejected() {
        let preset = card_preset();
        let ov = overrides(json!({"root": {"children": []}}));
        let err = instantiate(&preset, &ov, &Binding::SelfSubject, &[]).unwrap_err();
        assert!(err.to_string().contains("children"), "{err}");
        assert_eq!(preset.scene.children.len(), 2);
    }

    #[test]
    fn unmatched_override_ids_are_reported() {
        let preset = card_preset();
        let ov = overrides(json!({"ghost": {"opacity": 0.5}}));
        let inst = instantiate(&preset, &ov, &Binding::SelfSubject, &[]).unwrap();
        assert_eq!(inst.unmatched_overrides, vec!["ghost".to_string()]);
    }

    #[test]
    fn ill_typed_override_is_an_error() {
        let preset = card_preset();
        let ov = overrides(json!({"c": {"frameWidth": "wide"}}));
        assert!(instantiate(&preset, &ov, &Binding::SelfSubject, &[]).is_err());
    }

    #[test]
    fn repeated_instantiation_does_not_accumulate_items() {
        let reg = PresetRegistry::bundled().unwrap();
        let preset = reg.get("related.product.many.marquee.v1").unwrap();
        let binding = Binding::related(Target::Product, Cardinality::Many);
        let records: Vec<_> = (0..6).map(|i| product(&format!("p{i}"), "P")).collect();
        for _ in 0..3 {
            let inst = instantiate(preset, &Overrides::new(), &binding, &records).unwrap();
            let list = inst.scene.find("products-marquee").unwrap().kind.list().unwrap();
            assert_eq!(list.list_items.len(), 6);
        }
    }
}
