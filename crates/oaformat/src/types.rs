use crate::case::CaseStyle;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============================================================================
// Lenient field decoding
// ============================================================================

/// Decode a field, falling back to its default when it has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_else(|err| {
        tracing::warn!("ignoring malformed rule-set field: {}", err);
        T::default()
    }))
}

/// Decode a list, dropping entries that have the wrong shape. A non-list is
/// treated as empty.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => {
            tracing::warn!("ignoring rule-set field: expected a list, found {}", other);
            return Ok(Vec::new());
        }
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::warn!("ignoring malformed rule-set entry: {}", err);
                None
            }
        })
        .collect())
}

/// Parse a rule set from a JSON value. Anything but an object yields the
/// default (empty) rule set.
fn from_value_or_default<T: DeserializeOwned + Default>(value: Value, what: &str) -> T {
    if !value.is_object() {
        if !value.is_null() {
            tracing::warn!("ignoring {}: expected an object", what);
        }
        return T::default();
    }
    serde_json::from_value(value).unwrap_or_else(|err| {
        tracing::warn!("ignoring {}: {}", what, err);
        T::default()
    })
}

// ============================================================================
// Filter
// ============================================================================

/// Declarative filter rules.
///
/// Positive rules remove what matches; `inverse*` rules keep only what
/// matches. All fields are optional.
///
/// # JSON shape
///
/// ```json
/// {
///   "methods": ["post"],
///   "inverseTags": ["pets"],
///   "flags": ["x-internal"],
///   "flagValues": [{"x-audience": "private"}],
///   "unusedComponents": ["schemas", "responses"],
///   "textReplace": [{"searchFor": "Pets", "replaceWith": "Animals"}],
///   "stripFlags": ["x-internal"],
///   "preserveEmptyObjects": ["example"]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSet {
    #[serde(deserialize_with = "lenient_seq")]
    pub methods: Vec<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub inverse_methods: Vec<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub inverse_tags: Vec<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub operation_ids: Vec<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub inverse_operation_ids: Vec<String>,
    /// `METHOD::/path` selectors; either side may be `*`, and a path may end
    /// in `*` to match a prefix.
    #[serde(deserialize_with = "lenient_seq")]
    pub operations: Vec<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub flags: Vec<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub inverse_flags: Vec<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub flag_values: Vec<Map<String, Value>>,
    #[serde(deserialize_with = "lenient_seq")]
    pub inverse_flag_values: Vec<Map<String, Value>>,
    #[serde(deserialize_with = "lenient_seq")]
    pub response_content: Vec<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub inverse_response_content: Vec<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub request_content: Vec<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub inverse_request_content: Vec<String>,
    /// Component categories pruned when nothing reaches them.
    #[serde(deserialize_with = "lenient_seq")]
    pub unused_components: Vec<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub text_replace: Vec<TextReplace>,
    /// Flag keys deleted from the output once filtering is done.
    #[serde(deserialize_with = "lenient_seq")]
    pub strip_flags: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub preserve_empty_objects: PreserveEmpty,
}

impl FilterSet {
    pub fn from_value(value: Value) -> Self {
        from_value_or_default(value, "filter set")
    }
}

/// One free-text substitution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextReplace {
    pub search_for: String,
    #[serde(default)]
    pub replace_with: String,
}

/// Which objects survive when filtering leaves them empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PreserveEmpty {
    /// Remove emptied objects, except the built-in exceptions.
    #[default]
    Builtin,
    /// Keep every emptied object.
    All,
    /// Built-in exceptions plus these keys or dotted paths.
    Keys(Vec<String>),
}

impl Serialize for PreserveEmpty {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PreserveEmpty::Builtin => serializer.serialize_bool(false),
            PreserveEmpty::All => serializer.serialize_bool(true),
            PreserveEmpty::Keys(keys) => keys.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PreserveEmpty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Flag(bool),
            Keys(Vec<String>),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Flag(true) => PreserveEmpty::All,
            Repr::Flag(false) => PreserveEmpty::Builtin,
            Repr::Keys(keys) => PreserveEmpty::Keys(keys),
        })
    }
}

// ============================================================================
// Sort
// ============================================================================

/// How the `paths` map is ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortPathsBy {
    #[default]
    Original,
    Path,
    Tags,
}

/// Sort rules: a priority table of key orders plus a few named options.
///
/// Every key whose value is a list of strings is a priority entry; `root`
/// applies to the document itself.
///
/// # JSON shape
///
/// ```json
/// {
///   "root": ["openapi", "info", "paths", "components"],
///   "get": ["operationId", "summary", "parameters", "responses"],
///   "sortPathsBy": "path",
///   "sortComponentsSet": ["schemas"],
///   "sortComponentsProps": true,
///   "sortArraysBy": {"tags": "name"}
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSet {
    #[serde(flatten)]
    pub priorities: BTreeMap<String, Vec<String>>,
    pub sort_paths_by: SortPathsBy,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort_components_set: Vec<String>,
    pub sort_components_props: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sort_arrays_by: BTreeMap<String, String>,
}

const SORT_OPTION_KEYS: [&str; 4] = [
    "sortPathsBy",
    "sortComponentsSet",
    "sortComponentsProps",
    "sortArraysBy",
];

impl SortSet {
    pub fn from_value(value: Value) -> Self {
        let Value::Object(map) = value else {
            if !value.is_null() {
                tracing::warn!("ignoring sort set: expected an object");
            }
            return SortSet::default();
        };

        fn field<T: DeserializeOwned + Default>(map: &Map<String, Value>, key: &str) -> T {
            match map.get(key) {
                None | Some(Value::Null) => T::default(),
                Some(value) => T::deserialize(value).unwrap_or_else(|err| {
                    tracing::warn!("ignoring sort option {}: {}", key, err);
                    T::default()
                }),
            }
        }

        let mut set = SortSet {
            priorities: BTreeMap::new(),
            sort_paths_by: field(&map, "sortPathsBy"),
            sort_components_set: field(&map, "sortComponentsSet"),
            sort_components_props: field(&map, "sortComponentsProps"),
            sort_arrays_by: field(&map, "sortArraysBy"),
        };
        for (key, value) in &map {
            if SORT_OPTION_KEYS.contains(&key.as_str()) {
                continue;
            }
            match Vec::<String>::deserialize(value) {
                Ok(order) => {
                    set.priorities.insert(key.clone(), order);
                }
                Err(err) => tracing::warn!("ignoring sort priority for {}: {}", key, err),
            }
        }
        set
    }

    /// Priority order for nodes stored under `key`.
    pub fn priority(&self, key: &str) -> Option<&[String]> {
        self.priorities.get(key).map(Vec::as_slice)
    }
}

impl<'de> Deserialize<'de> for SortSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(SortSet::from_value(Value::deserialize(deserializer)?))
    }
}

// ============================================================================
// Casing
// ============================================================================

/// Case style per document region. Unset regions are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CasingSet {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub properties: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub parameters_query: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub parameters_path: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub parameters_header: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub parameters_cookie: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub components_schemas: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub components_examples: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub components_headers: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub components_responses: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub components_request_bodies: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub components_security_schemes: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub components_parameters_query: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub components_parameters_path: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub components_parameters_header: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub components_parameters_cookie: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub summary: Option<CaseStyle>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<CaseStyle>,
}

impl CasingSet {
    pub fn from_value(value: Value) -> Self {
        from_value_or_default(value, "casing set")
    }

    /// Style for parameter `name` values located `location` (`query`, `path`,
    /// `header`, `cookie`).
    pub fn parameter_style(&self, location: &str) -> Option<CaseStyle> {
        match location {
            "query" => self.parameters_query,
            "path" => self.parameters_path,
            "header" => self.parameters_header,
            "cookie" => self.parameters_cookie,
            _ => None,
        }
    }

    /// Style for keys of `components.parameters` by the parameter's location.
    pub fn component_parameter_style(&self, location: &str) -> Option<CaseStyle> {
        match location {
            "query" => self.components_parameters_query,
            "path" => self.components_parameters_path,
            "header" => self.components_parameters_header,
            "cookie" => self.components_parameters_cookie,
            _ => None,
        }
    }

    /// Style for keys of a component category other than `parameters`.
    pub fn component_style(&self, category: &str) -> Option<CaseStyle> {
        match category {
            "schemas" => self.components_schemas,
            "examples" => self.components_examples,
            "headers" => self.components_headers,
            "responses" => self.components_responses,
            "requestBodies" => self.components_request_bodies,
            "securitySchemes" => self.components_security_schemes,
            _ => None,
        }
    }
}

// ============================================================================
// Overlay
// ============================================================================

/// An overlay document: an ordered list of patch actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySet {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub overlay: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(deserialize_with = "lenient_seq")]
    pub actions: Vec<OverlayAction>,
}

impl OverlaySet {
    pub fn from_value(value: Value) -> Self {
        from_value_or_default(value, "overlay")
    }
}

/// A single patch instruction addressed by a path expression.
///
/// ```json
/// { "target": "$.info", "update": { "description": "x" } }
/// { "target": "$.paths['/pets'].post", "remove": true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayAction {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Value>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "std::ops::Not::not")]
    pub remove: bool,
}

impl OverlayAction {
    pub fn update(target: impl Into<String>, update: Value) -> Self {
        Self {
            target: Some(target.into()),
            update: Some(update),
            ..Default::default()
        }
    }

    pub fn remove(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            remove: true,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
