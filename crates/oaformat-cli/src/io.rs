use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value;
use similar::TextDiff;
use std::io::{self, Read};
use std::path::Path;

/// Serialization of a document on disk or on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// `.yaml` and `.yml` are YAML; anything else is JSON.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

pub fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

/// Read a document from a file, or stdin when `input` is `-`. Returns the
/// parsed tree and the format it was written in.
pub fn read_document(input: &str) -> Result<(Value, Format)> {
    let (text, hint) = if input == "-" {
        (read_stdin()?, None)
    } else {
        let path = Path::new(input);
        let text =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        (text, Format::from_path(path))
    };
    let format = hint.unwrap_or_else(|| sniff(&text));
    let value = parse(&text, format).with_context(|| format!("Failed to parse {}", input))?;
    if !value.is_object() {
        bail!("{} is not an OpenAPI document: the top level must be a mapping", input);
    }
    Ok((value, format))
}

/// Read a rule file (filter, sort, casing, overlay or config).
pub fn read_rules(path: &Path) -> Result<Value> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let format = Format::from_path(path).unwrap_or_else(|| sniff(&text));
    parse(&text, format).with_context(|| format!("Failed to parse {:?}", path))
}

/// JSON documents start with `{` or `[`; everything else is treated as YAML.
fn sniff(text: &str) -> Format {
    match text.trim_start().chars().next() {
        Some('{') | Some('[') => Format::Json,
        _ => Format::Yaml,
    }
}

pub fn parse(text: &str, format: Format) -> Result<Value> {
    match format {
        Format::Json => serde_json::from_str(text).context("invalid JSON"),
        Format::Yaml => serde_yaml::from_str(text).context("invalid YAML"),
    }
}

/// Serialize `value`, always ending in a newline.
pub fn render(value: &Value, format: Format, pretty: bool) -> Result<String> {
    match format {
        Format::Json => {
            let mut out = if pretty {
                serde_json::to_string_pretty(value)
            } else {
                serde_json::to_string(value)
            }
            .context("failed to serialize JSON")?;
            out.push('\n');
            Ok(out)
        }
        Format::Yaml => serde_yaml::to_string(value).context("failed to serialize YAML"),
    }
}

/// Replace `path` with `content` through a temp file in the same directory.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir)
        .context("failed to create temp file for atomic write")?;
    std::fs::write(tmp.path(), content)
        .with_context(|| format!("failed to write {}", tmp.path().display()))?;
    tmp.persist(path)
        .with_context(|| format!("failed to persist output file: {}", path.display()))?;
    Ok(())
}

pub fn compute_diff(old: &str, new: &str) -> Option<String> {
    let diff = TextDiff::from_lines(old, new);
    let unified = diff.unified_diff().context_radius(3).to_string();
    if unified.is_empty() {
        None
    } else {
        Some(unified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("a.yaml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("a.YML")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("a.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("a.txt")), None);
        assert_eq!(Format::from_path(Path::new("openapi")), None);
    }

    #[test]
    fn test_sniff() {
        assert_eq!(sniff("  {\"a\": 1}"), Format::Json);
        assert_eq!(sniff("openapi: 3.0.0\n"), Format::Yaml);
    }

    #[test]
    fn test_yaml_keeps_key_order() {
        let value = parse("openapi: 3.0.0\ninfo:\n  title: t\npaths: {}\n", Format::Yaml).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["openapi", "info", "paths"]);
        let yaml = render(&value, Format::Yaml, false).unwrap();
        assert!(yaml.find("openapi").unwrap() < yaml.find("paths").unwrap());
    }

    #[test]
    fn test_render_json() {
        let value = json!({"b": 1, "a": [true]});
        assert_eq!(render(&value, Format::Json, false).unwrap(), "{\"b\":1,\"a\":[true]}\n");
        let pretty = render(&value, Format::Json, true).unwrap();
        assert!(pretty.contains("\n  \"b\": 1"));
        assert!(pretty.ends_with("}\n"));
    }

    #[test]
    fn test_read_document_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("api.yml");
        std::fs::write(&path, "openapi: 3.1.0\n").unwrap();
        let (value, format) = read_document(path.to_str().unwrap()).unwrap();
        assert_eq!(format, Format::Yaml);
        assert_eq!(value, json!({"openapi": "3.1.0"}));
    }

    #[test]
    fn test_read_document_rejects_non_mapping() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(read_document(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_read_document_missing_file() {
        let err = read_document("/nonexistent/api.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_write_atomic_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "old").unwrap();
        write_atomic(&path, "new\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn test_compute_diff_identical() {
        assert!(compute_diff("a\nb\n", "a\nb\n").is_none());
    }

    #[test]
    fn test_compute_diff_changed() {
        let diff = compute_diff("a\nb\n", "a\nc\n").unwrap();
        assert!(diff.contains("-b"));
        assert!(diff.contains("+c"));
    }
}
