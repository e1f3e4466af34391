//! Rule-based filtering with unused-component pruning.
//!
//! A filter pass applies, in order:
//!
//! 1. content-type rules on response and request-body media types,
//! 2. method rules on path items,
//! 3. tag, operation id, operation selector, and flag rules,
//! 4. free-text replacement (first pass only),
//! 5. removal of components no root reaches, in the `unusedComponents`
//!    categories,
//! 6. cleanup of path items that lost their last operation and of objects the
//!    pass left empty.
//!
//! Removing a component can orphan the components it referenced, so passes
//! repeat until one removes nothing, up to [`MAX_PASSES`]. Flag keys listed in
//! `stripFlags` are deleted once the passes are done.
//!
//! # Example
//!
//! ```
//! use oaformat::{filter, FilterSet};
//! use serde_json::json;
//!
//! let doc = json!({"paths": {"/a": {"get": {}, "post": {}}}});
//! let rules = FilterSet { methods: vec!["post".into()], ..Default::default() };
//! let filtered = filter(&doc, &rules).unwrap();
//! assert_eq!(filtered.data, json!({"paths": {"/a": {"get": {}}}}));
//! ```

use crate::error::{Result, ensure_object};
use crate::graph::{self, ComponentId};
use crate::types::{FilterSet, PreserveEmpty};
use crate::walk::{self, Key, Visit};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};

/// Upper bound on filter passes.
pub const MAX_PASSES: usize = 10;

/// Keys of a path item that hold operations.
pub const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

const TEXT_KEYS: [&str; 4] = ["description", "summary", "title", "url"];

/// Keys whose value may legitimately be an empty object.
const PRESERVED_EMPTY_KEYS: [&str; 2] = ["schema", "paths"];

/// Output of [`filter`].
#[derive(Debug, Clone)]
pub struct Filtered {
    pub data: Value,
    pub report: FilterReport,
}

/// What filtering removed, accumulated over all passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterReport {
    /// Names of components pruned as unreachable, by category.
    pub unused_components: BTreeMap<String, Vec<String>>,
    /// Components declared in the input, by category.
    pub total_components: BTreeMap<String, usize>,
    /// Passes run, including the final one that removed nothing.
    pub passes: usize,
    /// False when [`MAX_PASSES`] ran out while removals were still happening.
    pub converged: bool,
}

impl FilterReport {
    pub fn unused_count(&self) -> usize {
        self.unused_components.values().map(Vec::len).sum()
    }

    pub fn total_count(&self) -> usize {
        self.total_components.values().sum()
    }

    /// JSON form: per-category entries plus `meta.total` on both maps.
    pub fn to_json(&self) -> Value {
        let mut unused: Map<String, Value> = self
            .unused_components
            .iter()
            .map(|(category, names)| (category.clone(), json!(names)))
            .collect();
        unused.insert("meta".into(), json!({"total": self.unused_count()}));

        let mut total: Map<String, Value> = self
            .total_components
            .iter()
            .map(|(category, count)| (category.clone(), json!(count)))
            .collect();
        total.insert("meta".into(), json!({"total": self.total_count()}));

        json!({
            "unusedComponents": unused,
            "totalComponents": total,
            "passes": self.passes,
            "converged": self.converged,
        })
    }

    fn record(&mut self, id: ComponentId) {
        self.unused_components
            .entry(id.category)
            .or_default()
            .push(id.name);
    }
}

impl Serialize for FilterReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Filter a copy of `document` with `rules`.
pub fn filter(document: &Value, rules: &FilterSet) -> Result<Filtered> {
    filter_with_limit(document, rules, MAX_PASSES)
}

fn filter_with_limit(document: &Value, rules: &FilterSet, max_passes: usize) -> Result<Filtered> {
    ensure_object(document)?;
    let mut data = document.clone();
    let selectors: Vec<Selector> = rules
        .operations
        .iter()
        .filter_map(|s| Selector::parse(s))
        .collect();

    let mut report = FilterReport {
        total_components: graph::build_graph(&data).counts(),
        ..Default::default()
    };

    for pass in 0..max_passes {
        let mut tracker = Tracker::default();
        run_pass(&mut data, rules, &selectors, pass == 0, &mut tracker, &mut report);
        report.passes = pass + 1;
        tracing::debug!(pass = pass + 1, removed = tracker.removed, "filter pass");
        if tracker.removed == 0 {
            report.converged = true;
            break;
        }
    }
    if !report.converged {
        tracing::warn!(
            "filter stopped after {} passes with removals still pending",
            max_passes
        );
    }

    if !rules.strip_flags.is_empty() {
        walk::walk(&mut data, |visit| {
            if visit
                .key_name()
                .is_some_and(|k| rules.strip_flags.iter().any(|f| f == k))
            {
                visit.remove();
            }
        });
    }

    Ok(Filtered { data, report })
}

fn run_pass(
    data: &mut Value,
    rules: &FilterSet,
    selectors: &[Selector],
    first: bool,
    tracker: &mut Tracker,
    report: &mut FilterReport,
) {
    // 1. Content types
    if has_content_rules(rules) {
        let mut removed = Vec::new();
        walk::walk(data, |visit| {
            if let Some(media_type) = response_media_type(visit.path())
                && !keep(media_type, &rules.response_content, &rules.inverse_response_content)
            {
                drop_node(visit, &mut removed);
            } else if let Some(media_type) = request_media_type(visit.path())
                && !keep(media_type, &rules.request_content, &rules.inverse_request_content)
            {
                drop_node(visit, &mut removed);
            }
        });
        tracker.absorb(removed);
    }

    // 2. Methods
    if !rules.methods.is_empty() || !rules.inverse_methods.is_empty() {
        let mut removed = Vec::new();
        walk::walk(data, |visit| {
            if let Some((_, method)) = operation_slot(visit.path()) {
                let listed = |list: &[String]| list.iter().any(|m| m.eq_ignore_ascii_case(method));
                if listed(&rules.methods)
                    || (!rules.inverse_methods.is_empty() && !listed(&rules.inverse_methods))
                {
                    drop_node(visit, &mut removed);
                }
            }
        });
        tracker.absorb(removed);
    }

    // 3. Tags, operation ids, selectors, flags
    let mut removed = Vec::new();
    walk::walk(data, |visit| {
        if visit.is_root() {
            return;
        }
        if let Some((path, method)) = operation_slot(visit.path())
            && !keep_operation(visit.value(), path, method, rules, selectors)
        {
            drop_node(visit, &mut removed);
            return;
        }
        if is_top_level_tag(visit.path())
            && let Some(name) = visit.value().get("name").and_then(Value::as_str)
        {
            let listed = |list: &[String]| list.iter().any(|t| t == name);
            if listed(&rules.tags) || (!rules.inverse_tags.is_empty() && !listed(&rules.inverse_tags)) {
                drop_node(visit, &mut removed);
                return;
            }
        }
        if let Value::Object(node) = visit.value()
            && (has_flag(node, &rules.flags) || matches_flag_values(node, &rules.flag_values))
        {
            drop_node(visit, &mut removed);
        }
    });
    tracker.absorb(removed);

    // 4. Text replacement
    if first && !rules.text_replace.is_empty() {
        walk::walk(data, |visit| {
            if !visit.key_name().is_some_and(|k| TEXT_KEYS.contains(&k)) {
                return;
            }
            if let Value::String(text) = visit.value_mut() {
                for replace in &rules.text_replace {
                    if !replace.search_for.is_empty() {
                        *text = text.replace(&replace.search_for, &replace.replace_with);
                    }
                }
            }
        });
    }

    // 5. Unreachable components
    if !rules.unused_components.is_empty() {
        let graph = graph::build_graph(data);
        for id in graph::unreachable(&graph, &rules.unused_components) {
            let path = vec![
                Key::name("components"),
                Key::name(id.category.as_str()),
                Key::name(id.name.as_str()),
            ];
            if walk::remove(data, &path).is_some() {
                tracing::debug!(component = %id, "removing unused component");
                tracker.absorb(vec![path]);
                report.record(id);
            }
        }
    }

    // 6. Cleanup
    cleanup(data, &rules.preserve_empty_objects, tracker);
}

fn drop_node(visit: &mut Visit<'_>, removed: &mut Vec<Vec<Key>>) {
    removed.push(visit.path().to_vec());
    visit.remove();
}

/// Remove path items without operations and emptied objects, deepest first.
fn cleanup(data: &mut Value, preserve: &PreserveEmpty, tracker: &mut Tracker) {
    while let Some(path) = tracker.pop_deepest() {
        let Some(node) = walk::get(data, &path) else {
            continue;
        };
        let Value::Object(map) = node else {
            continue;
        };
        let orphaned_item = is_path_item(&path)
            && !map.keys().any(|k| HTTP_METHODS.contains(&k.to_ascii_lowercase().as_str()));
        let emptied = map.is_empty() && !preserved(&path, preserve);
        if (orphaned_item || emptied) && walk::remove(data, &path).is_some() {
            tracing::debug!(path = %walk::path_string(&path), "removing emptied object");
            tracker.absorb(vec![path]);
        }
    }
}

fn preserved(path: &[Key], preserve: &PreserveEmpty) -> bool {
    let Some((last, parent)) = path.split_last() else {
        return true;
    };
    if parent.last().is_some_and(|k| k.is("security")) && last.as_index().is_some() {
        return true;
    }
    let key = last.as_name().unwrap_or_default();
    match preserve {
        PreserveEmpty::All => true,
        PreserveEmpty::Builtin => PRESERVED_EMPTY_KEYS.contains(&key),
        PreserveEmpty::Keys(keys) => {
            PRESERVED_EMPTY_KEYS.contains(&key) || {
                let dotted = walk::path_string(path);
                keys.iter().any(|k| k == key || *k == dotted)
            }
        }
    }
}

// ============================================================================
// Removal tracking
// ============================================================================

/// Containers that lost entries during the current pass, kept valid across
/// array splices.
#[derive(Debug, Default)]
struct Tracker {
    touched: BTreeSet<Vec<Key>>,
    removed: usize,
}

impl Tracker {
    /// Account for nodes removed at `paths`, all given in the coordinates of
    /// the tree before their removal.
    fn absorb(&mut self, paths: Vec<Vec<Key>>) {
        if paths.is_empty() {
            return;
        }
        self.removed += paths.len();
        let mut touched: BTreeSet<Vec<Key>> = self
            .touched
            .iter()
            .filter_map(|p| rebase(p, &paths))
            .collect();
        for path in &paths {
            if let Some((_, parent)) = path.split_last()
                && let Some(parent) = rebase(parent, &paths)
            {
                touched.insert(parent);
            }
        }
        self.touched = touched;
    }

    fn pop_deepest(&mut self) -> Option<Vec<Key>> {
        let deepest = self.touched.iter().max_by_key(|p| p.len())?.clone();
        self.touched.remove(&deepest);
        Some(deepest)
    }
}

/// Translate `path` to the tree after the entries at `removed` are gone.
/// Returns `None` when `path` was inside a removed subtree.
fn rebase(path: &[Key], removed: &[Vec<Key>]) -> Option<Vec<Key>> {
    let mut out = path.to_vec();
    for gone in removed {
        if path.starts_with(gone) {
            return None;
        }
        let Some((Key::Index(gone_index), parent)) = gone.split_last() else {
            continue;
        };
        if path.len() > parent.len()
            && path.starts_with(parent)
            && let Key::Index(index) = &path[parent.len()]
            && index > gone_index
            && let Key::Index(shifted) = &mut out[parent.len()]
        {
            *shifted -= 1;
        }
    }
    Some(out)
}

// ============================================================================
// Matching
// ============================================================================

/// `METHOD::/path` operation selector.
#[derive(Debug, Clone)]
struct Selector {
    method: Option<String>,
    path: PathPattern,
}

#[derive(Debug, Clone)]
enum PathPattern {
    Any,
    Prefix(String),
    Exact(String),
}

impl Selector {
    fn parse(raw: &str) -> Option<Self> {
        let Some((method, path)) = raw.split_once("::") else {
            tracing::warn!("ignoring operation selector without '::': {}", raw);
            return None;
        };
        let method = match method.trim() {
            "*" | "" => None,
            m => Some(m.to_ascii_lowercase()),
        };
        let path = match path.trim() {
            "*" | "" => PathPattern::Any,
            p => match p.strip_suffix('*') {
                Some(prefix) => PathPattern::Prefix(prefix.to_string()),
                None => PathPattern::Exact(p.to_string()),
            },
        };
        Some(Self { method, path })
    }

    fn matches(&self, path: &str, method: &str) -> bool {
        let method_ok = self
            .method
            .as_deref()
            .is_none_or(|m| m.eq_ignore_ascii_case(method));
        let path_ok = match &self.path {
            PathPattern::Any => true,
            PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
            PathPattern::Exact(exact) => path == exact,
        };
        method_ok && path_ok
    }
}

fn is_path_item(path: &[Key]) -> bool {
    matches!(path, [root, _] if root.is("paths") || root.is("webhooks"))
}

/// `(path, method)` when `path` addresses an operation.
fn operation_slot(path: &[Key]) -> Option<(&str, &str)> {
    match path {
        [root, item, method] if root.is("paths") || root.is("webhooks") => {
            let method = method.as_name()?;
            HTTP_METHODS
                .iter()
                .any(|m| m.eq_ignore_ascii_case(method))
                .then_some((item.as_name()?, method))
        }
        _ => None,
    }
}

fn is_top_level_tag(path: &[Key]) -> bool {
    matches!(path, [tags, Key::Index(_)] if tags.is("tags"))
}

fn response_media_type(path: &[Key]) -> Option<&str> {
    match path {
        [.., responses, _, content, media_type] if responses.is("responses") && content.is("content") => {
            media_type.as_name()
        }
        _ => None,
    }
}

fn request_media_type(path: &[Key]) -> Option<&str> {
    match path {
        [.., body, content, media_type] if body.is("requestBody") && content.is("content") => {
            media_type.as_name()
        }
        [.., bodies, _, content, media_type] if bodies.is("requestBodies") && content.is("content") => {
            media_type.as_name()
        }
        _ => None,
    }
}

fn has_content_rules(rules: &FilterSet) -> bool {
    !(rules.response_content.is_empty()
        && rules.inverse_response_content.is_empty()
        && rules.request_content.is_empty()
        && rules.inverse_request_content.is_empty())
}

/// `application/*` and `*/*` match by prefix.
fn media_type_matches(pattern: &str, media_type: &str) -> bool {
    if pattern == "*/*" || pattern.eq_ignore_ascii_case(media_type) {
        return true;
    }
    pattern
        .strip_suffix("/*")
        .is_some_and(|prefix| media_type.split('/').next() == Some(prefix))
}

fn keep(media_type: &str, remove: &[String], keep_only: &[String]) -> bool {
    let listed = |list: &[String]| list.iter().any(|p| media_type_matches(p, media_type));
    !listed(remove) && (keep_only.is_empty() || listed(keep_only))
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn has_flag(node: &Map<String, Value>, flags: &[String]) -> bool {
    flags
        .iter()
        .any(|flag| node.get(flag).is_some_and(is_truthy))
}

fn matches_flag_values(node: &Map<String, Value>, pairs: &[Map<String, Value>]) -> bool {
    pairs.iter().any(|pair| {
        !pair.is_empty()
            && pair.iter().all(|(key, expected)| match node.get(key) {
                Some(Value::Array(values)) => values.contains(expected) || Some(values) == expected.as_array(),
                Some(actual) => actual == expected,
                None => false,
            })
    })
}

fn keep_operation(
    operation: &Value,
    path: &str,
    method: &str,
    rules: &FilterSet,
    selectors: &[Selector],
) -> bool {
    let tags: Vec<&str> = operation
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let tagged = |list: &[String]| tags.iter().any(|t| list.iter().any(|l| l == t));
    if tagged(&rules.tags) || (!rules.inverse_tags.is_empty() && !tagged(&rules.inverse_tags)) {
        return false;
    }

    let operation_id = operation.get("operationId").and_then(Value::as_str);
    let listed = |list: &[String]| operation_id.is_some_and(|id| list.iter().any(|l| l == id));
    if listed(&rules.operation_ids)
        || (!rules.inverse_operation_ids.is_empty() && !listed(&rules.inverse_operation_ids))
    {
        return false;
    }

    if selectors.iter().any(|s| s.matches(path, method)) {
        return false;
    }

    let node = operation.as_object();
    if !rules.inverse_flags.is_empty()
        && !node.is_some_and(|n| has_flag(n, &rules.inverse_flags))
    {
        return false;
    }
    if !rules.inverse_flag_values.is_empty()
        && !node.is_some_and(|n| matches_flag_values(n, &rules.inverse_flag_values))
    {
        return false;
    }
    true
}
