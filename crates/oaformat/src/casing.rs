//! Identifier casing across a document.
//!
//! Component keys are renamed first and every rename is recorded, then one
//! walk rewrites everything else: pointers to renamed components, operation
//! ids, parameter names, schema property names with their `required` lists,
//! security requirement keys, and summary/description text. Pointers are
//! rewritten from the recorded renames, never re-derived from the pointer
//! text.

use crate::case::{self, CaseStyle};
use crate::error::{Result, ensure_object};
use crate::graph::{self, ComponentId, retarget_ref};
use crate::types::CasingSet;
use crate::walk::{self, Key, Visit};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Component renames made by one casing run.
type Renames = HashMap<ComponentId, ComponentId>;

/// Apply `set` to a copy of `document`.
///
/// ```
/// use oaformat::{change_case, CasingSet};
/// use serde_json::json;
///
/// let set = CasingSet::from_value(json!({"componentsSchemas": "snake_case"}));
/// let doc = json!({
///     "paths": {"/a": {"get": {"schema": {"$ref": "#/components/schemas/MySchema"}}}},
///     "components": {"schemas": {"MySchema": {}}}
/// });
/// let out = change_case(&doc, &set).unwrap();
/// assert!(out["components"]["schemas"].get("my_schema").is_some());
/// assert_eq!(out["paths"]["/a"]["get"]["schema"]["$ref"], "#/components/schemas/my_schema");
/// ```
pub fn change_case(document: &Value, set: &CasingSet) -> Result<Value> {
    ensure_object(document)?;
    let mut data = document.clone();

    let renames = rename_components(&mut data, set);
    if let Some(style) = set.parameters_path
        && let Some(Value::Object(paths)) = data.get_mut("paths")
    {
        rename_keys(paths, |key| Some(rename_placeholders(key, style)), "path");
    }

    walk::walk(&mut data, |visit| rewrite(visit, set, &renames));
    Ok(data)
}

fn rename_components(data: &mut Value, set: &CasingSet) -> Renames {
    let mut renames = Renames::new();
    let Some(Value::Object(components)) = data.get_mut("components") else {
        return renames;
    };
    for (category, entries) in components.iter_mut() {
        let Value::Object(entries) = entries else {
            continue;
        };
        let old = std::mem::take(entries);
        for (name, value) in old {
            let style = if category == "parameters" {
                value
                    .get("in")
                    .and_then(Value::as_str)
                    .and_then(|location| set.component_parameter_style(location))
            } else {
                set.component_style(category)
            };
            let new_name = style
                .map(|style| case::change_case(&name, style))
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| name.clone());
            if entries.contains_key(&new_name) {
                tracing::warn!(
                    "components.{}: {} collides with an existing name, last one wins",
                    category,
                    new_name
                );
            }
            if new_name != name {
                tracing::debug!(category = %category, from = %name, to = %new_name, "renaming component");
                renames.insert(
                    ComponentId::new(category.as_str(), name),
                    ComponentId::new(category.as_str(), new_name.as_str()),
                );
            }
            entries.insert(new_name, value);
        }
    }
    renames
}

/// Rebuild `map` with renamed keys, keeping order. On collision the later
/// entry wins.
fn rename_keys<F>(map: &mut Map<String, Value>, mut rename: F, what: &str)
where
    F: FnMut(&str) -> Option<String>,
{
    let old = std::mem::take(map);
    for (key, value) in old {
        let new_key = rename(&key).filter(|k| !k.is_empty()).unwrap_or(key);
        if map.contains_key(&new_key) {
            tracing::warn!("{} {} collides with an existing name, last one wins", what, new_key);
        }
        map.insert(new_key, value);
    }
}

/// Recase `{placeholders}` in a path template.
fn rename_placeholders(path: &str, style: CaseStyle) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        out.push_str(&rest[..=open]);
        out.push_str(&case::change_case(&rest[open + 1..open + close], style));
        out.push('}');
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}

fn rewrite(visit: &mut Visit<'_>, set: &CasingSet, renames: &Renames) {
    let path = visit.path();
    let key = visit.key_name();
    match visit.value_mut() {
        Value::String(text) => {
            if graph::is_reference_slot(path) {
                rewrite_reference(text, path, renames);
                return;
            }
            let style = match key {
                Some("operationId") => set.operation_id,
                Some("summary") => set.summary,
                Some("description") => set.description,
                _ => None,
            };
            if let Some(style) = style {
                *text = case::change_case(text, style);
            }
        }
        Value::Object(map) => {
            if is_parameter(path) {
                rename_parameter(map, set);
            }
            if let Some(style) = set.properties
                && !is_properties_map(path)
            {
                rename_properties(map, style);
            }
        }
        Value::Array(items) if key == Some("security") => {
            for requirement in items.iter_mut() {
                if let Value::Object(requirement) = requirement {
                    rename_keys(
                        requirement,
                        |name| {
                            renames
                                .get(&ComponentId::new("securitySchemes", name))
                                .map(|to| to.name.clone())
                        },
                        "security requirement",
                    );
                }
            }
        }
        _ => {}
    }
}

fn rewrite_reference(text: &mut String, path: &[Key], renames: &Renames) {
    if let Some(id) = ComponentId::from_ref(text) {
        if let Some(to) = renames.get(&id)
            && let Some(rewritten) = retarget_ref(text, to)
        {
            *text = rewritten;
        }
        return;
    }
    // Discriminator mappings may name a schema without a pointer.
    if path.len() >= 2
        && path[path.len() - 2].is("mapping")
        && let Some(to) = renames.get(&ComponentId::new("schemas", text.as_str()))
    {
        *text = to.name.clone();
    }
}

/// Elements of a `parameters` list and entries of `components.parameters`.
fn is_parameter(path: &[Key]) -> bool {
    match path {
        [components, parameters, Key::Name(_)] => {
            components.is("components") && parameters.is("parameters")
        }
        [.., parameters, Key::Index(_)] => parameters.is("parameters"),
        _ => false,
    }
}

/// A `properties` map itself, as opposed to a property named `properties`.
fn is_properties_map(path: &[Key]) -> bool {
    match path {
        [.., parent, last] => last.is("properties") && !parent.is("properties"),
        [last] => last.is("properties"),
        [] => false,
    }
}

fn rename_parameter(map: &mut Map<String, Value>, set: &CasingSet) {
    let style = map
        .get("in")
        .and_then(Value::as_str)
        .and_then(|location| set.parameter_style(location));
    if let Some(style) = style
        && let Some(Value::String(name)) = map.get_mut("name")
    {
        *name = case::change_case(name, style);
    }
}

fn rename_properties(schema: &mut Map<String, Value>, style: CaseStyle) {
    if let Some(Value::Object(properties)) = schema.get_mut("properties") {
        rename_keys(properties, |name| Some(case::change_case(name, style)), "property");
    }
    if let Some(Value::Array(required)) = schema.get_mut("required") {
        for name in required.iter_mut() {
            if let Value::String(name) = name {
                *name = case::change_case(name, style);
            }
        }
    }
    if let Some(Value::String(name)) = schema
        .get_mut("discriminator")
        .and_then(|d| d.get_mut("propertyName"))
    {
        *name = case::change_case(name, style);
    }
}
