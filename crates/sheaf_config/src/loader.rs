//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SheafConfig;
use std::collections::HashSet;
use std::path::{Component, Path};

/// File name looked up inside a project directory.
pub const CONFIG_FILE: &str = "sheaf.toml";

/// Loads and validates `<project_dir>/sheaf.toml`.
pub fn load_config(project_dir: &Path) -> Result<SheafConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<SheafConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `sheaf.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<SheafConfig, ConfigError> {
    let config: SheafConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks bundle names and the output directory.
///
/// Bundle names become file names under the output directory, so they must
/// be non-empty, unique, relative and free of `..`.
fn validate_config(config: &SheafConfig) -> Result<(), ConfigError> {
    if !is_contained(&config.combine.output_dir) {
        return Err(ConfigError::ValidationError(format!(
            "combine.output_dir '{}' must be a relative path without '..'",
            config.combine.output_dir
        )));
    }

    let mut seen = HashSet::new();
    for (i, bundle) in config.bundles.iter().enumerate() {
        if bundle.name.trim().is_empty() {
            return Err(ConfigError::MissingField(format!("bundles[{i}].name")));
        }
        if !is_contained(&bundle.name) {
            return Err(ConfigError::ValidationError(format!(
                "bundle name '{}' must be a relative path without '..'",
                bundle.name
            )));
        }
        if !seen.insert(bundle.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate bundle '{}'",
                bundle.name
            )));
        }
    }
    Ok(())
}

fn is_contained(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') {
        return false;
    }
    Path::new(path)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config = load_config_from_str("").unwrap();
        assert!(config.combine.enabled);
        assert!(config.bundles.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[site]
root = "public"
base_url = "/static/"

[combine]
enabled = false
output_dir = "assets/_combined"
write_header_comment = false
suffix_requirements = false
blocked = ["js/legacy.js"]

[[bundles]]
name = "all.js"
sources = ["js/a.js", "js/b.js"]

[[bundles]]
name = "site.css"
sources = ["css/a.css"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.site.root, "public");
        assert_eq!(config.site.base_url, "/static/");
        assert!(!config.combine.enabled);
        assert!(!config.combine.write_header_comment);
        assert!(!config.combine.suffix_requirements);
        assert_eq!(config.combine.output_dir, "assets/_combined");
        assert_eq!(config.combine.blocked, vec!["js/legacy.js"]);
        assert_eq!(config.bundles.len(), 2);
        assert_eq!(config.bundles[0].name, "all.js");
        assert_eq!(config.bundles[0].sources, vec!["js/a.js", "js/b.js"]);
        assert_eq!(config.bundles[1].name, "site.css");
    }

    #[test]
    fn bundle_order_is_declaration_order() {
        let toml = r#"
[[bundles]]
name = "z.js"
[[bundles]]
name = "a.js"
"#;
        let config = load_config_from_str(toml).unwrap();
        let names: Vec<_> = config.bundles.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["z.js", "a.js"]);
    }

    #[test]
    fn empty_bundle_name_errors() {
        let toml = r#"
[[bundles]]
name = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "bundles[0].name"));
    }

    #[test]
    fn duplicate_bundle_name_errors() {
        let toml = r#"
[[bundles]]
name = "all.js"
[[bundles]]
name = "all.js"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn escaping_names_error() {
        for name in ["../evil.js", "/abs.js", "a/../../b.js"] {
            let toml = format!("[[bundles]]\nname = \"{name}\"\n");
            let err = load_config_from_str(&toml).unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError(_)), "{name}");
        }
    }

    #[test]
    fn nested_bundle_name_allowed() {
        let toml = "[[bundles]]\nname = \"js/all.js\"\n";
        assert!(load_config_from_str(toml).is_ok());
    }

    #[test]
    fn absolute_output_dir_errors() {
        let toml = "[combine]\noutput_dir = \"/var/www\"\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn unknown_field_errors() {
        let err = load_config_from_str("[combine]\nenable = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[[bundles]]\nname = \"all.js\"\nsources = [\"a.js\"]\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.bundles[0].sources, vec!["a.js"]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
