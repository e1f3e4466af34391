//! Deep merge for overlay updates.

use serde_json::Value;

/// Merge `source` into `target`.
///
/// Objects merge key by key, recursively. Scalars and `null` from `source`
/// replace what is in `target`. When both sides are arrays, a source element
/// that is an object carrying the same `(name, in)` pair as a target element
/// is merged into that element; every other source element is appended.
/// An object merged into an array is treated as a one-element array.
///
/// `source` is only read, so one payload can be merged into any number of
/// targets.
///
/// ```
/// use oaformat::merge::deep_merge;
/// use serde_json::json;
///
/// let mut target = json!({"parameters": [{"name": "id", "in": "path"}], "info": {"title": "t"}});
/// deep_merge(&mut target, &json!({
///     "parameters": [{"name": "id", "in": "path", "required": true}, {"name": "q", "in": "query"}],
///     "info": {"version": "1"}
/// }));
/// assert_eq!(target, json!({
///     "parameters": [{"name": "id", "in": "path", "required": true}, {"name": "q", "in": "query"}],
///     "info": {"title": "t", "version": "1"}
/// }));
/// ```
pub fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(target_items), Value::Array(source_items)) => {
            for item in source_items {
                merge_element(target_items, item);
            }
        }
        (Value::Array(target_items), item @ Value::Object(_)) => merge_element(target_items, item),
        (target_slot, source_value) => {
            *target_slot = source_value.clone();
        }
    }
}

fn merge_element(target_items: &mut Vec<Value>, item: &Value) {
    let existing = identity(item).and_then(|id| {
        target_items
            .iter_mut()
            .find(|candidate| identity(candidate) == Some(id))
    });
    match existing {
        Some(existing) => deep_merge(existing, item),
        None => target_items.push(item.clone()),
    }
}

/// The `(name, in)` pair that identifies a parameter-like array element.
fn identity(value: &Value) -> Option<(&str, &str)> {
    let name = value.get("name")?.as_str()?;
    let location = value.get("in")?.as_str()?;
    Some((name, location))
}
