//! Overlay actions: path-addressed updates and removals.

use crate::error::{Result, ensure_object};
use crate::jsonpath::JsonPath;
use crate::merge::deep_merge;
use crate::types::{OverlayAction, OverlaySet};
use crate::walk;
use serde::Serialize;
use serde_json::Value;

/// Output of [`apply_overlay`].
#[derive(Debug, Clone)]
pub struct Overlaid {
    pub data: Value,
    pub report: OverlayReport,
}

/// Which actions matched something.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayReport {
    pub applied_actions: Vec<OverlayAction>,
    pub unused_actions: Vec<OverlayAction>,
    pub total_actions: usize,
    pub total_used_actions: usize,
    pub total_unused_actions: usize,
}

enum Outcome {
    Applied,
    Unused,
}

/// Apply every action of `overlay` to a copy of `document`, in order.
///
/// An action that cannot be resolved (no target, bad syntax, no match) is
/// logged and reported as unused; the remaining actions still run.
///
/// ```
/// use oaformat::{apply_overlay, OverlayAction, OverlaySet};
/// use serde_json::json;
///
/// let overlay = OverlaySet {
///     actions: vec![OverlayAction::update("$.info", json!({"description": "x"}))],
///     ..Default::default()
/// };
/// let out = apply_overlay(&json!({"info": {"title": "t"}}), &overlay).unwrap();
/// assert_eq!(out.data, json!({"info": {"title": "t", "description": "x"}}));
/// assert_eq!(out.report.total_used_actions, 1);
/// ```
pub fn apply_overlay(document: &Value, overlay: &OverlaySet) -> Result<Overlaid> {
    ensure_object(document)?;
    let mut data = document.clone();
    let mut report = OverlayReport {
        total_actions: overlay.actions.len(),
        ..Default::default()
    };

    for action in &overlay.actions {
        match apply_action(&mut data, action) {
            Outcome::Applied => report.applied_actions.push(action.clone()),
            Outcome::Unused => report.unused_actions.push(action.clone()),
        }
    }

    report.total_used_actions = report.applied_actions.len();
    report.total_unused_actions = report.unused_actions.len();
    tracing::debug!(
        applied = report.total_used_actions,
        unused = report.total_unused_actions,
        "overlay applied"
    );
    Ok(Overlaid { data, report })
}

fn apply_action(data: &mut Value, action: &OverlayAction) -> Outcome {
    let Some(target) = action.target.as_deref() else {
        tracing::error!(
            description = action.description.as_deref().unwrap_or_default(),
            "overlay action with missing target"
        );
        return Outcome::Unused;
    };
    let path = match JsonPath::parse(target) {
        Ok(path) => path,
        Err(err) => {
            tracing::error!("skipping overlay action: {}", err);
            return Outcome::Unused;
        }
    };

    if path.is_root() {
        return apply_to_root(data, action);
    }

    let mut matches = path.resolve(data);
    if matches.is_empty() {
        tracing::debug!(expression = target, "overlay target matched nothing");
        return Outcome::Unused;
    }

    if action.remove {
        // Highest index and deepest path first.
        matches.sort();
        for matched in matches.iter().rev() {
            walk::remove(data, matched);
        }
        tracing::debug!(expression = target, count = matches.len(), "overlay removed");
    } else if let Some(update) = &action.update {
        for matched in &matches {
            if let Some(node) = walk::get_mut(data, matched) {
                deep_merge(node, update);
            }
        }
        tracing::debug!(expression = target, count = matches.len(), "overlay updated");
    }
    Outcome::Applied
}

fn apply_to_root(data: &mut Value, action: &OverlayAction) -> Outcome {
    if action.remove {
        tracing::error!("refusing to remove the document root");
        return Outcome::Unused;
    }
    match &action.update {
        Some(update @ Value::Object(_)) => deep_merge(data, update),
        Some(_) => {
            tracing::error!("root update must be an object");
            return Outcome::Unused;
        }
        None => {}
    }
    Outcome::Applied
}
