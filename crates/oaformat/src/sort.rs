//! Key and element ordering.
//!
//! Sorting never adds or drops anything: every object keeps its keys and
//! every array its elements, only their order changes.

use crate::error::{Result, ensure_object};
use crate::filter::HTTP_METHODS;
use crate::types::{SortPathsBy, SortSet};
use crate::walk;
use serde_json::{Map, Value};
use std::cmp::Ordering;

const BUILTIN_SORT: &str = include_str!("../defaults/sort.json");

impl SortSet {
    /// The built-in priority table.
    pub fn builtin() -> Self {
        match serde_json::from_str(BUILTIN_SORT) {
            Ok(value) => SortSet::from_value(value),
            Err(err) => {
                tracing::warn!("built-in sort set is unreadable: {}", err);
                SortSet::default()
            }
        }
    }
}

/// Reorder a copy of `document` according to `set`.
///
/// ```
/// use oaformat::{sort, SortSet};
/// use serde_json::json;
///
/// let set = SortSet::from_value(json!({"root": ["openapi", "info"]}));
/// let out = sort(&json!({"paths": {}, "info": {}, "openapi": "3.1.0"}), &set).unwrap();
/// let keys: Vec<_> = out.as_object().unwrap().keys().collect();
/// assert_eq!(keys, ["openapi", "info", "paths"]);
/// ```
pub fn sort(document: &Value, set: &SortSet) -> Result<Value> {
    ensure_object(document)?;
    let mut data = document.clone();

    walk::walk(&mut data, |visit| {
        let key = if visit.is_root() {
            Some("root")
        } else {
            visit.key_name()
        };
        let Some(key) = key else {
            return;
        };
        if let Some(order) = set.priority(key) {
            match visit.value_mut() {
                Value::Object(map) => order_keys(map, order),
                Value::Array(items) => {
                    for item in items.iter_mut() {
                        if let Value::Object(map) = item {
                            order_keys(map, order);
                        }
                    }
                }
                _ => {}
            }
        }
        if let Some(field) = set.sort_arrays_by.get(key)
            && let Value::Array(items) = visit.value_mut()
        {
            sort_by_field(items, field);
        }
    });

    if let Some(Value::Object(paths)) = data.get_mut("paths") {
        match set.sort_paths_by {
            SortPathsBy::Original => {}
            SortPathsBy::Path => reorder(paths, |(a, _), (b, _)| compare_paths(a, b)),
            SortPathsBy::Tags => reorder(paths, |(_, a), (_, b)| compare_tags(first_tag(a), first_tag(b))),
        }
    }

    if let Some(Value::Object(components)) = data.get_mut("components") {
        for category in &set.sort_components_set {
            if let Some(Value::Object(entries)) = components.get_mut(category) {
                reorder(entries, |(a, _), (b, _)| a.cmp(b));
            }
        }
        if set.sort_components_props
            && let Some(schemas) = components.get_mut("schemas")
        {
            walk::walk(schemas, |visit| {
                if visit.key_name() == Some("properties")
                    && let Value::Object(properties) = visit.value_mut()
                {
                    reorder(properties, |(a, _), (b, _)| a.cmp(b));
                }
            });
        }
    }

    Ok(data)
}

/// Listed keys first, in list order; the rest keep their relative order.
fn order_keys(map: &mut Map<String, Value>, order: &[String]) {
    if order.is_empty() {
        return;
    }
    let mut rest = std::mem::take(map);
    for key in order {
        if let Some(value) = rest.shift_remove(key) {
            map.insert(key.clone(), value);
        }
    }
    map.extend(rest);
}

/// Stable reorder of an object's entries.
fn reorder<F>(map: &mut Map<String, Value>, mut compare: F)
where
    F: FnMut(&(String, Value), &(String, Value)) -> Ordering,
{
    let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
    entries.sort_by(|a, b| compare(a, b));
    map.extend(entries);
}

/// Sort array elements by a field's value. Elements without the field stay
/// in their slots; the others are sorted among the remaining slots.
fn sort_by_field(items: &mut [Value], field: &str) {
    let slots: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.get(field).is_some())
        .map(|(i, _)| i)
        .collect();
    let mut keyed: Vec<Value> = slots.iter().map(|&i| std::mem::take(&mut items[i])).collect();
    keyed.sort_by(|a, b| field_text(a, field).cmp(&field_text(b, field)));
    for (slot, value) in slots.into_iter().zip(keyed) {
        items[slot] = value;
    }
}

fn field_text(item: &Value, field: &str) -> String {
    match item.get(field) {
        Some(Value::String(s)) => s.to_lowercase(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Segment-wise comparison; a path that is a prefix of another comes first.
fn compare_paths(a: &str, b: &str) -> Ordering {
    let a: Vec<&str> = a.split('/').collect();
    let b: Vec<&str> = b.split('/').collect();
    a.cmp(&b)
}

/// First tag of the first operation of a path item.
fn first_tag(item: &Value) -> Option<&str> {
    item.as_object()?
        .iter()
        .find(|(k, _)| HTTP_METHODS.contains(&k.as_str()))
        .and_then(|(_, op)| op.get("tags")?.get(0)?.as_str())
}

/// Alphabetical by tag; untagged last.
fn compare_tags(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::Key;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn keys(value: &Value) -> Vec<String> {
        value.as_object().unwrap().keys().cloned().collect()
    }

    /// Every object's keys and every array's length, by path with indices
    /// collapsed.
    fn inventory(value: &Value) -> BTreeMap<String, Vec<String>> {
        let mut out = BTreeMap::new();
        walk::for_each(value, |path, node| {
            let mut items: Vec<String> = match node {
                Value::Object(map) => map.keys().cloned().collect(),
                Value::Array(items) => vec![format!("len={}", items.len())],
                _ => return,
            };
            items.sort();
            let key = path
                .iter()
                .map(|k| match k {
                    Key::Index(_) => "#".to_string(),
                    Key::Name(n) => n.clone(),
                })
                .collect::<Vec<_>>()
                .join(".");
            out.entry(key).or_insert_with(Vec::new).extend(items);
        });
        for list in out.values_mut() {
            list.sort();
        }
        out
    }

    fn spec() -> Value {
        json!({
            "paths": {
                "/users/{id}": {"get": {"tags": ["users"], "responses": {}, "operationId": "getUser"}},
                "/pets": {"post": {"tags": ["pets"]}, "get": {"tags": ["zoo"]}},
                "/health": {"get": {}},
                "/users": {"get": {"tags": ["users"], "parameters": [
                    {"schema": {}, "in": "query", "name": "limit"}
                ]}}
            },
            "tags": [{"name": "zoo"}, {"description": "no name"}, {"name": "Alpha"}, {"name": "pets"}],
            "info": {"version": "1", "title": "t"},
            "openapi": "3.0.0",
            "components": {"schemas": {
                "Pet": {"properties": {"name": {}, "id": {}, "age": {"properties": {"z": {}, "a": {}}}}},
                "Error": {}
            }}
        })
    }

    #[test]
    fn test_builtin_set_loads() {
        let set = SortSet::builtin();
        assert_eq!(set.priority("root").unwrap()[0], "openapi");
        assert!(set.priority("get").is_some());
        assert_eq!(set.sort_paths_by, SortPathsBy::Original);
    }

    #[test]
    fn test_priority_orders_root_operations_and_array_elements() {
        let out = sort(&spec(), &SortSet::builtin()).unwrap();
        assert_eq!(keys(&out), vec!["openapi", "info", "paths", "components", "tags"]);
        assert_eq!(keys(&out["info"]), vec!["title", "version"]);
        assert_eq!(
            keys(&out["paths"]["/users/{id}"]["get"]),
            vec!["operationId", "tags", "responses"]
        );
        assert_eq!(
            keys(&out["paths"]["/users"]["get"]["parameters"][0]),
            vec!["name", "in", "schema"]
        );
        assert_eq!(keys(&out["paths"]), vec!["/users/{id}", "/pets", "/health", "/users"]);
    }

    #[test]
    fn test_sort_paths_by_path() {
        let set = SortSet::from_value(json!({"sortPathsBy": "path"}));
        let out = sort(&spec(), &set).unwrap();
        assert_eq!(keys(&out["paths"]), vec!["/health", "/pets", "/users", "/users/{id}"]);
    }

    #[test]
    fn test_sort_paths_by_tags() {
        let set = SortSet::from_value(json!({"sortPathsBy": "tags"}));
        let out = sort(&spec(), &set).unwrap();
        assert_eq!(keys(&out["paths"]), vec!["/pets", "/users/{id}", "/users", "/health"]);
    }

    #[test]
    fn test_sort_arrays_by_field_keeps_fieldless_slots() {
        let set = SortSet::from_value(json!({"sortArraysBy": {"tags": "name"}}));
        let out = sort(&spec(), &set).unwrap();
        assert_eq!(
            out["tags"],
            json!([{"name": "Alpha"}, {"description": "no name"}, {"name": "pets"}, {"name": "zoo"}])
        );
        assert_eq!(out["paths"]["/pets"]["post"]["tags"], json!(["pets"]));
    }

    #[test]
    fn test_sort_components() {
        let set = SortSet::from_value(json!({
            "sortComponentsSet": ["schemas"],
            "sortComponentsProps": true
        }));
        let out = sort(&spec(), &set).unwrap();
        let schemas = &out["components"]["schemas"];
        assert_eq!(keys(schemas), vec!["Error", "Pet"]);
        assert_eq!(keys(&schemas["Pet"]["properties"]), vec!["age", "id", "name"]);
        assert_eq!(keys(&schemas["Pet"]["properties"]["age"]["properties"]), vec!["a", "z"]);
    }

    #[test]
    fn test_sorting_is_a_pure_reordering() {
        let input = spec();
        let set = SortSet::from_value(json!({
            "root": ["tags", "openapi"],
            "get": ["responses"],
            "sortPathsBy": "tags",
            "sortComponentsSet": ["schemas"],
            "sortComponentsProps": true,
            "sortArraysBy": {"tags": "name"}
        }));
        let out = sort(&input, &set).unwrap();
        assert_eq!(inventory(&out), inventory(&input));
        assert_ne!(serde_json::to_string(&out).unwrap(), serde_json::to_string(&input).unwrap());
    }

    #[test]
    fn test_empty_set_changes_nothing() {
        let input = spec();
        let out = sort(&input, &SortSet::default()).unwrap();
        assert_eq!(serde_json::to_string(&out).unwrap(), serde_json::to_string(&input).unwrap());
    }

    #[test]
    fn test_compare_paths_prefix_first() {
        assert_eq!(compare_paths("/a", "/a/b"), Ordering::Less);
        assert_eq!(compare_paths("/a/b", "/a-b"), Ordering::Less);
    }
}
