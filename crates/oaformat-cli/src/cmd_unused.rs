use crate::io;
use anyhow::{Context, Result};
use oaformat::graph::COMPONENT_CATEGORIES;
use oaformat::{FilterSet, filter};
use serde_json::Value;

/// Report which components filtering would prune, without writing anything.
///
/// Runs the full fixpoint, so components that only become unreachable once
/// another unused component is gone are counted too.
pub fn run(input: String, categories: Vec<String>, pretty: bool) -> Result<()> {
    let (doc, _) = io::read_document(&input)?;
    let report = unused_report(&doc, categories)?;
    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);
    Ok(())
}

fn unused_report(doc: &Value, categories: Vec<String>) -> Result<Value> {
    let rules = FilterSet {
        unused_components: if categories.is_empty() {
            COMPONENT_CATEGORIES.iter().map(|c| c.to_string()).collect()
        } else {
            categories
        },
        ..Default::default()
    };
    let filtered = filter(doc, &rules).context("failed to analyze document")?;
    Ok(filtered.report.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn doc() -> Value {
        json!({
            "paths": {"/a": {"get": {"responses": {"200": {"$ref": "#/components/responses/Ok"}}}}},
            "components": {
                "responses": {"Ok": {"description": "ok"}, "Gone": {"description": "gone"}},
                "schemas": {"Lonely": {}}
            }
        })
    }

    #[test]
    fn test_all_categories_by_default() {
        let report = unused_report(&doc(), Vec::new()).unwrap();
        assert_eq!(report["unusedComponents"]["responses"], json!(["Gone"]));
        assert_eq!(report["unusedComponents"]["schemas"], json!(["Lonely"]));
        assert_eq!(report["unusedComponents"]["meta"]["total"], 2);
        assert_eq!(report["totalComponents"]["meta"]["total"], 3);
    }

    #[test]
    fn test_selected_categories() {
        let report = unused_report(&doc(), vec!["schemas".into()]).unwrap();
        assert!(report["unusedComponents"].get("responses").is_none());
        assert_eq!(report["unusedComponents"]["meta"]["total"], 1);
    }

    #[test]
    fn test_run_unused() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{}", doc()).unwrap();
        f.flush().unwrap();
        let result = run(f.path().to_string_lossy().into_owned(), Vec::new(), true);
        assert!(result.is_ok());
    }
}
