//! Component reference graph and reachability analysis.
//!
//! Components live under `components/<category>/<name>` and are addressed by
//! `$ref` pointers such as `#/components/schemas/Pet`. [`build_graph`] scans a
//! document once and records, for every pointer, either an edge from the
//! component that contains it or a root (pointers from the operational body
//! of the document). [`reachable`] then marks everything reachable from the
//! roots, and [`unreachable`] sweeps what is left.

use crate::walk::{self, Key};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt;

/// Component categories that take part in reachability analysis.
pub const COMPONENT_CATEGORIES: [&str; 6] = [
    "schemas",
    "responses",
    "parameters",
    "examples",
    "requestBodies",
    "headers",
];

const REF_PREFIX: &str = "#/components/";

/// Identity of a component: its category and its name within that category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId {
    pub category: String,
    pub name: String,
}

impl ComponentId {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }

    /// Parse a local pointer such as `#/components/schemas/Pet`.
    ///
    /// Segments after the name address into the component and resolve to the
    /// component itself. JSON-pointer escapes (`~1`, `~0`) are decoded.
    ///
    /// ```
    /// use oaformat::graph::ComponentId;
    ///
    /// let id = ComponentId::from_ref("#/components/schemas/Pet/properties/id").unwrap();
    /// assert_eq!(id, ComponentId::new("schemas", "Pet"));
    /// assert!(ComponentId::from_ref("other.yaml#/Pet").is_none());
    /// ```
    pub fn from_ref(reference: &str) -> Option<Self> {
        let rest = reference.strip_prefix(REF_PREFIX)?;
        let mut segments = rest.split('/');
        let category = segments.next().filter(|s| !s.is_empty())?;
        let name = segments.next().filter(|s| !s.is_empty())?;
        Some(Self::new(unescape(category), unescape(name)))
    }

    /// The pointer that addresses this component.
    pub fn to_ref(&self) -> String {
        format!(
            "{}{}/{}",
            REF_PREFIX,
            escape(&self.category),
            escape(&self.name)
        )
    }

    pub fn is_known_category(&self) -> bool {
        COMPONENT_CATEGORIES.contains(&self.category.as_str())
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Rewrite the component part of a pointer, keeping any trailing segments.
pub(crate) fn retarget_ref(reference: &str, to: &ComponentId) -> Option<String> {
    let rest = reference.strip_prefix(REF_PREFIX)?;
    let mut parts = rest.splitn(3, '/');
    parts.next()?;
    parts.next()?;
    Some(match parts.next() {
        Some(tail) => format!("{}/{}", to.to_ref(), tail),
        None => to.to_ref(),
    })
}

/// Directed graph of component references.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    /// Components declared in the known categories.
    pub components: BTreeSet<ComponentId>,
    /// Component → components its subtree points to.
    pub edges: BTreeMap<ComponentId, BTreeSet<ComponentId>>,
    /// Components pointed to from outside the known component categories.
    pub roots: BTreeSet<ComponentId>,
}

impl ReferenceGraph {
    /// Number of declared components per category.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for id in &self.components {
            *counts.entry(id.category.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// True for a string that is a reference: the value of a `$ref` key, or a
/// `discriminator.mapping` entry.
pub(crate) fn is_reference_slot(path: &[Key]) -> bool {
    match path {
        [.., last] if last.is("$ref") => true,
        [.., discriminator, mapping, _] => discriminator.is("discriminator") && mapping.is("mapping"),
        _ => false,
    }
}

/// The known-category component whose subtree contains `path`.
fn enclosing_component(path: &[Key]) -> Option<ComponentId> {
    match path {
        [components, category, name, ..] if components.is("components") => {
            let category = category.as_name()?;
            let name = name.as_name()?;
            let id = ComponentId::new(category, name);
            id.is_known_category().then_some(id)
        }
        _ => None,
    }
}

/// Scan `document` for component definitions and pointer references.
///
/// References to components that are not declared are ignored.
pub fn build_graph(document: &Value) -> ReferenceGraph {
    let mut graph = ReferenceGraph::default();

    if let Some(components) = document.get("components").and_then(Value::as_object) {
        for category in COMPONENT_CATEGORIES {
            if let Some(entries) = components.get(category).and_then(Value::as_object) {
                for name in entries.keys() {
                    graph.components.insert(ComponentId::new(category, name.as_str()));
                }
            }
        }
    }

    let mut references = Vec::new();
    walk::for_each(document, |path, value| {
        if let Value::String(reference) = value
            && is_reference_slot(path)
            && let Some(target) = ComponentId::from_ref(reference)
        {
            references.push((enclosing_component(path), target));
        }
    });

    for (source, target) in references {
        if !graph.components.contains(&target) {
            continue;
        }
        match source {
            Some(source) => {
                graph.edges.entry(source).or_default().insert(target);
            }
            None => {
                graph.roots.insert(target);
            }
        }
    }

    graph
}

/// All components reachable from the graph's roots, breadth first.
pub fn reachable(graph: &ReferenceGraph) -> HashSet<ComponentId> {
    let mut visited: HashSet<ComponentId> = HashSet::new();
    let mut queue: VecDeque<&ComponentId> = VecDeque::new();

    for root in &graph.roots {
        if visited.insert(root.clone()) {
            queue.push_back(root);
        }
    }

    while let Some(id) = queue.pop_front() {
        if let Some(targets) = graph.edges.get(id) {
            for target in targets {
                if visited.insert(target.clone()) {
                    queue.push_back(target);
                }
            }
        }
    }

    visited
}

/// Declared components in `categories` that no root reaches, in category then
/// name order.
pub fn unreachable(graph: &ReferenceGraph, categories: &[String]) -> Vec<ComponentId> {
    let live = reachable(graph);
    graph
        .components
        .iter()
        .filter(|id| categories.iter().any(|c| c == &id.category))
        .filter(|id| !live.contains(*id))
        .cloned()
        .collect()
}
