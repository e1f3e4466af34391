use crate::config::Config;
use crate::io::{self, Format};
use anyhow::{Context, Result};
use clap::Args;
use oaformat::{CasingSet, FilterSet, FormatOptions, OverlaySet, SortPathsBy, SortSet};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Default)]
pub struct FormatArgs {
    /// Input document, JSON or YAML (use - for stdin)
    pub input: String,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Filter rules: methods, tags, flags, unusedComponents, ...
    #[arg(long)]
    pub filter_file: Option<PathBuf>,

    /// Overlay document with update/remove actions
    #[arg(long)]
    pub overlay_file: Option<PathBuf>,

    /// Sort rules replacing the built-in priority table
    #[arg(long)]
    pub sort_file: Option<PathBuf>,

    /// Casing rules for identifiers and component names
    #[arg(long)]
    pub casing_file: Option<PathBuf>,

    /// Order of the paths map: original, path, or tags
    #[arg(long, value_parser = parse_sort_paths_by)]
    pub sort_paths_by: Option<SortPathsBy>,

    /// Skip sorting entirely
    #[arg(long)]
    pub no_sort: bool,

    /// Replace info.title
    #[arg(long)]
    pub rename: Option<String>,

    /// Read defaults for these options from a JSON or YAML file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format (default: from the output extension, else the input's)
    #[arg(long, value_enum)]
    pub format: Option<Format>,

    /// Print a unified diff of input and output
    #[arg(long)]
    pub diff: bool,
}

fn parse_sort_paths_by(s: &str) -> Result<SortPathsBy, String> {
    serde_json::from_value(Value::String(s.to_string()))
        .map_err(|_| format!("unknown ordering {:?} (expected original, path, or tags)", s))
}

/// Flags merged over the config file.
#[derive(Debug, Default)]
struct Resolved {
    output: Option<PathBuf>,
    filter_file: Option<PathBuf>,
    overlay_file: Option<PathBuf>,
    sort_file: Option<PathBuf>,
    casing_file: Option<PathBuf>,
    sort_paths_by: Option<SortPathsBy>,
    no_sort: bool,
    rename: Option<String>,
    format: Option<Format>,
}

fn resolve(args: FormatArgs, config: Config) -> Resolved {
    Resolved {
        output: args.output.or(config.output),
        filter_file: args.filter_file.or(config.filter_file),
        overlay_file: args.overlay_file.or(config.overlay_file),
        sort_file: args.sort_file.or(config.sort_file),
        casing_file: args.casing_file.or(config.casing_file),
        sort_paths_by: args.sort_paths_by.or(config.sort_paths_by),
        no_sort: args.no_sort || config.no_sort,
        rename: args.rename.or(config.rename),
        format: args.format.or(config.format),
    }
}

fn load<T>(path: Option<&Path>, from_value: fn(Value) -> T) -> Result<Option<T>> {
    path.map(|p| io::read_rules(p).map(from_value)).transpose()
}

fn build_options(resolved: &Resolved) -> Result<FormatOptions> {
    let mut sort = if resolved.no_sort {
        None
    } else {
        Some(match &resolved.sort_file {
            Some(path) => SortSet::from_value(io::read_rules(path)?),
            None => SortSet::builtin(),
        })
    };
    if let Some(order) = resolved.sort_paths_by {
        sort.get_or_insert_with(SortSet::default).sort_paths_by = order;
    }

    Ok(FormatOptions {
        filter: load(resolved.filter_file.as_deref(), FilterSet::from_value)?,
        overlay: load(resolved.overlay_file.as_deref(), OverlaySet::from_value)?,
        sort,
        casing: load(resolved.casing_file.as_deref(), CasingSet::from_value)?,
        rename: resolved.rename.clone(),
    })
}

pub fn run(args: FormatArgs, pretty: bool) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let input = args.input.clone();
    let diff = args.diff;
    let resolved = resolve(args, config);

    let (doc, input_format) = io::read_document(&input)?;
    let options = build_options(&resolved)?;
    let formatted = oaformat::format(&doc, &options).context("failed to format document")?;

    if let Some(report) = &formatted.filter {
        let removed = report.unused_count();
        if removed > 0 {
            eprintln!(
                "Removed {} unused of {} components",
                removed,
                report.total_count()
            );
        }
    }

    let format = resolved
        .format
        .or_else(|| resolved.output.as_deref().and_then(Format::from_path))
        .unwrap_or(input_format);
    let rendered = io::render(&formatted.data, format, pretty)?;

    if let Some(path) = &resolved.output {
        io::write_atomic(path, &rendered)?;
    }
    if diff {
        let before = io::render(&doc, format, pretty)?;
        match io::compute_diff(&before, &rendered) {
            Some(unified) => print!("{}", unified),
            None => eprintln!("No changes."),
        }
    } else if resolved.output.is_none() {
        print!("{}", rendered);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn rules_file(content: &str) -> NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(f, "{}", content).unwrap();
        f
    }

    #[test]
    fn test_parse_sort_paths_by() {
        assert_eq!(parse_sort_paths_by("tags").unwrap(), SortPathsBy::Tags);
        assert_eq!(parse_sort_paths_by("path").unwrap(), SortPathsBy::Path);
        assert!(parse_sort_paths_by("alpha").is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = FormatArgs {
            input: "api.json".into(),
            rename: Some("Flag".into()),
            ..Default::default()
        };
        let config = Config {
            rename: Some("Config".into()),
            no_sort: true,
            filter_file: Some(PathBuf::from("filter.json")),
            ..Default::default()
        };
        let resolved = resolve(args, config);
        assert_eq!(resolved.rename.as_deref(), Some("Flag"));
        assert!(resolved.no_sort);
        assert_eq!(resolved.filter_file, Some(PathBuf::from("filter.json")));
    }

    #[test]
    fn test_builtin_sort_by_default() {
        let options = build_options(&Resolved::default()).unwrap();
        let sort = options.sort.unwrap();
        assert_eq!(sort.priority("root").unwrap()[0], "openapi");
        assert!(options.filter.is_none());
    }

    #[test]
    fn test_no_sort_with_path_order() {
        let options = build_options(&Resolved {
            no_sort: true,
            sort_paths_by: Some(SortPathsBy::Path),
            ..Default::default()
        })
        .unwrap();
        let sort = options.sort.unwrap();
        assert!(sort.priorities.is_empty());
        assert_eq!(sort.sort_paths_by, SortPathsBy::Path);
    }

    #[test]
    fn test_sort_file_replaces_builtin() {
        let file = rules_file(r#"{"root": ["paths"]}"#);
        let options = build_options(&Resolved {
            sort_file: Some(file.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        let sort = options.sort.unwrap();
        assert_eq!(sort.priority("root").unwrap(), ["paths".to_string()]);
        assert!(sort.priority("get").is_none());
    }

    #[test]
    fn test_rule_files_loaded() {
        let filter = rules_file(r#"{"methods": ["delete"]}"#);
        let casing = rules_file(r#"{"operationId": "snake_case"}"#);
        let options = build_options(&Resolved {
            filter_file: Some(filter.path().to_path_buf()),
            casing_file: Some(casing.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(options.filter.unwrap().methods, vec!["delete"]);
        assert!(options.casing.unwrap().operation_id.is_some());
    }

    #[test]
    fn test_missing_rule_file_is_an_error() {
        let result = build_options(&Resolved {
            overlay_file: Some(PathBuf::from("/nonexistent/overlay.json")),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
