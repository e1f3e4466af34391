use crate::io::{self, Format};
use anyhow::{Context, Result};
use oaformat::SortPathsBy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Options read from a `--config` file. Command-line flags win over these.
///
/// Relative file paths are resolved against the directory holding the
/// config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub output: Option<PathBuf>,
    pub filter_file: Option<PathBuf>,
    pub overlay_file: Option<PathBuf>,
    pub sort_file: Option<PathBuf>,
    pub casing_file: Option<PathBuf>,
    pub sort_paths_by: Option<SortPathsBy>,
    pub no_sort: bool,
    pub rename: Option<String>,
    pub format: Option<Format>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let value = io::read_rules(path)?;
        let mut config: Config = serde_json::from_value(value)
            .with_context(|| format!("Invalid config file {:?}", path))?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for slot in [
            &mut self.output,
            &mut self.filter_file,
            &mut self.overlay_file,
            &mut self.sort_file,
            &mut self.casing_file,
        ] {
            if let Some(path) = slot
                && path.is_relative()
            {
                *path = base.join(&*path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_yaml_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("oaformat.yaml");
        std::fs::write(
            &path,
            "filterFile: rules/filter.json\nsortPathsBy: tags\nnoSort: true\nrename: Pets\nformat: yaml\n",
        )
        .unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.filter_file, Some(dir.path().join("rules/filter.json")));
        assert_eq!(config.sort_paths_by, Some(SortPathsBy::Tags));
        assert!(config.no_sort);
        assert_eq!(config.rename.as_deref(), Some("Pets"));
        assert_eq!(config.format, Some(Format::Yaml));
        assert!(config.output.is_none());
    }

    #[test]
    fn test_absolute_paths_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"output": "/tmp/out.json"}"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.output, Some(PathBuf::from("/tmp/out.json")));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"noSort": "maybe"}"#).unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }
}
