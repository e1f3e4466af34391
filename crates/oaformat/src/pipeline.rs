//! The full transformation pipeline: filter, overlay, sort, casing.

use crate::casing::change_case;
use crate::error::{Result, ensure_object};
use crate::filter::{FilterReport, filter};
use crate::overlay::{OverlayReport, apply_overlay};
use crate::sort::sort;
use crate::types::{CasingSet, FilterSet, OverlaySet, SortSet};
use serde_json::Value;

/// Which stages run, and with what rules. A stage whose rule set is `None`
/// is skipped.
#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    pub filter: Option<FilterSet>,
    pub overlay: Option<OverlaySet>,
    pub sort: Option<SortSet>,
    pub casing: Option<CasingSet>,
    /// Replacement for `info.title`.
    pub rename: Option<String>,
}

impl FormatOptions {
    /// Sort with the built-in table and nothing else.
    pub fn builtin() -> Self {
        Self {
            sort: Some(SortSet::builtin()),
            ..Default::default()
        }
    }
}

/// Output of [`format`].
#[derive(Debug, Clone)]
pub struct Formatted {
    pub data: Value,
    pub filter: Option<FilterReport>,
    pub overlay: Option<OverlayReport>,
}

/// Run every configured stage over `document`, each on the previous stage's
/// output.
///
/// ```
/// use oaformat::{format, FilterSet, FormatOptions};
/// use serde_json::json;
///
/// let options = FormatOptions {
///     filter: Some(FilterSet { methods: vec!["post".into()], ..Default::default() }),
///     rename: Some("Renamed".into()),
///     ..FormatOptions::builtin()
/// };
/// let doc = json!({"paths": {"/a": {"get": {}, "post": {}}}, "info": {"title": "t"}, "openapi": "3.0.0"});
/// let out = format(&doc, &options).unwrap();
/// assert_eq!(out.data["info"]["title"], "Renamed");
/// assert!(out.data["paths"]["/a"].get("post").is_none());
/// assert_eq!(out.data.as_object().unwrap().keys().next().unwrap(), "openapi");
/// ```
pub fn format(document: &Value, options: &FormatOptions) -> Result<Formatted> {
    ensure_object(document)?;
    let mut data = document.clone();
    let mut filter_report = None;
    let mut overlay_report = None;

    if let Some(rules) = &options.filter {
        let filtered = filter(&data, rules)?;
        data = filtered.data;
        filter_report = Some(filtered.report);
    }
    if let Some(overlay) = &options.overlay {
        let overlaid = apply_overlay(&data, overlay)?;
        data = overlaid.data;
        overlay_report = Some(overlaid.report);
    }
    if let Some(set) = &options.sort {
        data = sort(&data, set)?;
    }
    if let Some(set) = &options.casing {
        data = change_case(&data, set)?;
    }
    if let Some(title) = &options.rename {
        rename_title(&mut data, title);
    }

    Ok(Formatted {
        data,
        filter: filter_report,
        overlay: overlay_report,
    })
}

fn rename_title(data: &mut Value, title: &str) {
    let Some(root) = data.as_object_mut() else {
        return;
    };
    let info = root
        .entry("info")
        .or_insert_with(|| Value::Object(Default::default()));
    match info {
        Value::Object(info) => {
            info.insert("title".into(), Value::String(title.to_string()));
        }
        _ => tracing::warn!("info is not an object, cannot rename"),
    }
}
