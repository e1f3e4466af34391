//! Transformations for OpenAPI documents held as [`serde_json::Value`] trees.
//!
//! Four independent stages, each taking a document and a declarative rule
//! set and returning a new document:
//!
//! - [`filter`] removes operations, tags, content types and flagged nodes,
//!   then prunes components nothing reaches any more, repeating until the
//!   document stops changing.
//! - [`apply_overlay`] applies path-addressed `update` and `remove` actions.
//! - [`sort`] reorders keys and elements by a priority table.
//! - [`change_case`] re-cases identifiers and keeps every `$ref` pointing at
//!   the renamed component.
//!
//! [`format`] chains them in that order. The input document is never
//! mutated.
//!
//! # Example
//!
//! ```
//! use oaformat::{filter, FilterSet};
//! use serde_json::json;
//!
//! let doc = json!({
//!     "paths": {"/pets": {"get": {"responses": {"200": {"$ref": "#/components/responses/Pets"}}}}},
//!     "components": {
//!         "responses": {"Pets": {"description": "ok"}},
//!         "schemas": {"Orphan": {}}
//!     }
//! });
//! let rules = FilterSet::from_value(json!({"unusedComponents": ["schemas", "responses"]}));
//! let out = filter(&doc, &rules).unwrap();
//! assert!(out.data["components"].get("schemas").is_none());
//! assert_eq!(out.report.unused_components["schemas"], vec!["Orphan"]);
//! ```

pub mod case;
pub mod casing;
pub mod error;
pub mod filter;
pub mod graph;
pub mod jsonpath;
pub mod merge;
pub mod overlay;
pub mod pipeline;
pub mod sort;
pub mod types;
pub mod walk;

pub use case::CaseStyle;
pub use casing::change_case;
pub use error::{Error, Result};
pub use filter::{FilterReport, Filtered, filter};
pub use graph::{ComponentId, ReferenceGraph, build_graph, reachable, unreachable};
pub use overlay::{Overlaid, OverlayReport, apply_overlay};
pub use pipeline::{FormatOptions, Formatted, format};
pub use sort::sort;
pub use types::{
    CasingSet, FilterSet, OverlayAction, OverlaySet, PreserveEmpty, SortPathsBy, SortSet,
    TextReplace,
};
