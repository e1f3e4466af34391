use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn petstore() -> Value {
    json!({
        "paths": {
            "/pets": {
                "get": {
                    "operationId": "list-pets",
                    "tags": ["pets"],
                    "responses": {"200": {"$ref": "#/components/responses/PetList"}}
                },
                "delete": {"operationId": "purge-pets", "x-internal": true}
            }
        },
        "info": {"version": "1.0.0", "title": "Petstore"},
        "openapi": "3.0.3",
        "components": {
            "responses": {"PetList": {
                "description": "pets",
                "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Pet"}}}
            }},
            "schemas": {
                "Pet": {"type": "object", "properties": {"name": {"type": "string"}}},
                "Orphan": {"type": "object", "properties": {"owner": {"$ref": "#/components/schemas/Owner"}}},
                "Owner": {"type": "object"}
            }
        }
    })
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn format_applies_builtin_sort() {
    let dir = TempDir::new().unwrap();
    let input = write_json(dir.path(), "api.json", &petstore());

    let output = cargo_bin_cmd!("oaformat")
        .arg("format")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());
    let out: Value = serde_json::from_slice(&output.stdout).unwrap();
    let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["openapi", "info", "paths", "components"]);
}

#[test]
fn format_filters_and_prunes() {
    let dir = TempDir::new().unwrap();
    let input = write_json(dir.path(), "api.json", &petstore());
    let rules = write_json(
        dir.path(),
        "filter.json",
        &json!({"flags": ["x-internal"], "unusedComponents": ["schemas", "responses"]}),
    );
    let out_path = dir.path().join("out.json");

    cargo_bin_cmd!("oaformat")
        .arg("format")
        .arg(&input)
        .arg("--filter-file")
        .arg(&rules)
        .arg("-o")
        .arg(&out_path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Removed 2 unused"));

    let out = read_json(&out_path);
    assert!(out["paths"]["/pets"].get("delete").is_none());
    let schemas: Vec<_> = out["components"]["schemas"]
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    assert_eq!(schemas, vec!["Pet"]);
}

#[test]
fn format_writes_yaml_by_extension() {
    let dir = TempDir::new().unwrap();
    let input = write_json(dir.path(), "api.json", &petstore());
    let casing = write_json(dir.path(), "casing.json", &json!({"operationId": "camelCase"}));
    let out_path = dir.path().join("out.yaml");

    cargo_bin_cmd!("oaformat")
        .arg("format")
        .arg(&input)
        .arg("--casing-file")
        .arg(&casing)
        .arg("--rename")
        .arg("Animals")
        .arg("--output")
        .arg(&out_path)
        .assert()
        .success();

    let yaml = fs::read_to_string(&out_path).unwrap();
    assert!(yaml.starts_with("openapi:"));
    assert!(yaml.contains("operationId: listPets"));
    assert!(yaml.contains("title: Animals"));
}

#[test]
fn format_reads_yaml_from_stdin() {
    cargo_bin_cmd!("oaformat")
        .args(["format", "-", "--no-sort", "--format", "json"])
        .write_stdin("info:\n  title: t\nopenapi: 3.1.0\n")
        .assert()
        .success()
        .stdout("{\"info\":{\"title\":\"t\"},\"openapi\":\"3.1.0\"}\n");
}

#[test]
fn format_uses_config_file() {
    let dir = TempDir::new().unwrap();
    let input = write_json(dir.path(), "api.json", &petstore());
    write_json(
        dir.path(),
        "filter.json",
        &json!({"methods": ["delete"]}),
    );
    fs::write(
        dir.path().join("oaformat.yaml"),
        "filterFile: filter.json\nrename: From Config\n",
    )
    .unwrap();

    let output = cargo_bin_cmd!("oaformat")
        .arg("format")
        .arg(&input)
        .arg("--config")
        .arg(dir.path().join("oaformat.yaml"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let out: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(out["info"]["title"], "From Config");
    assert!(out["paths"]["/pets"].get("delete").is_none());
}

#[test]
fn format_diff() {
    let dir = TempDir::new().unwrap();
    let input = write_json(dir.path(), "api.json", &petstore());

    cargo_bin_cmd!("oaformat")
        .arg("format")
        .arg(&input)
        .args(["--rename", "Changed", "--no-sort", "--diff", "--pretty"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-    \"title\": \"Petstore\""))
        .stdout(predicate::str::contains("+    \"title\": \"Changed\""));
}

#[test]
fn format_missing_input_fails() {
    cargo_bin_cmd!("oaformat")
        .args(["format", "/nonexistent/api.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn format_rejects_unknown_path_order() {
    cargo_bin_cmd!("oaformat")
        .args(["format", "-", "--sort-paths-by", "size"])
        .write_stdin("{}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown ordering"));
}

#[test]
fn overlay_with_report() {
    let dir = TempDir::new().unwrap();
    let input = write_json(dir.path(), "api.json", &petstore());
    let overlay = write_json(
        dir.path(),
        "overlay.json",
        &json!({
            "overlay": "1.0.0",
            "actions": [
                {"target": "$.info", "update": {"description": "All the pets"}},
                {"target": "$.paths['/pets'].delete", "remove": true},
                {"target": "$.paths['/owners']", "remove": true}
            ]
        }),
    );

    let output = cargo_bin_cmd!("oaformat")
        .arg("overlay")
        .arg(&input)
        .arg("--overlay-file")
        .arg(&overlay)
        .arg("--report")
        .output()
        .unwrap();
    assert!(output.status.success());

    let out: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(out["info"]["description"], "All the pets");
    assert!(out["paths"]["/pets"].get("delete").is_none());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("\"totalUsedActions\":2"));
    assert!(stderr.contains("\"totalUnusedActions\":1"));
}

#[test]
fn unused_reports_transitive_orphans() {
    let dir = TempDir::new().unwrap();
    let input = write_json(dir.path(), "api.json", &petstore());

    let output = cargo_bin_cmd!("oaformat")
        .arg("unused")
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["unusedComponents"]["schemas"], json!(["Orphan", "Owner"]));
    assert_eq!(report["unusedComponents"]["meta"]["total"], 2);
    assert_eq!(report["totalComponents"]["meta"]["total"], 4);
    // The input file is left alone.
    assert_eq!(read_json(&input), petstore());
}

#[test]
fn unused_limited_to_categories() {
    let dir = TempDir::new().unwrap();
    let input = write_json(dir.path(), "api.json", &petstore());

    let output = cargo_bin_cmd!("oaformat")
        .args(["unused", "--categories", "responses"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["unusedComponents"]["meta"]["total"], 0);
}
