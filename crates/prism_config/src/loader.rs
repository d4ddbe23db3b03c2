//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ExportConfig;
use std::path::Path;

/// Name of the configuration file inside a project directory.
pub const CONFIG_FILE: &str = "prism.toml";

/// Loads and validates a `prism.toml` configuration from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ExportConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `prism.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ExportConfig, ConfigError> {
    let config: ExportConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
///
/// An empty identity marker is deliberately not rejected here: the export
/// session reports it as a setup error when a pass is started.
fn validate_config(config: &ExportConfig) -> Result<(), ConfigError> {
    if config.cache.version.trim().is_empty() {
        return Err(ConfigError::MissingField("cache.version".to_string()));
    }
    if !is_plain_component(&config.cache.version)
        || config.cache.version.contains(char::is_whitespace)
    {
        return Err(ConfigError::ValidationError(format!(
            "cache.version '{}' must be a single path component",
            config.cache.version
        )));
    }
    if config.strip.max_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "strip.max_iterations must be positive".to_string(),
        ));
    }
    if config.exporter.extension.is_empty() {
        return Err(ConfigError::MissingField("exporter.extension".to_string()));
    }
    let extension = &config.exporter.extension;
    if !is_plain_component(extension) || extension.starts_with('.') {
        return Err(ConfigError::ValidationError(format!(
            "exporter.extension '{extension}' must be a bare extension such as \"fbx\""
        )));
    }
    Ok(())
}

/// A name that stays inside its parent directory when joined onto it.
fn is_plain_component(name: &str) -> bool {
    name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pivot;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[cache]
version = "1.0.0"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.cache.version, "1.0.0");
        assert_eq!(config.cache.dir, Path::new(".prism-cache"));
        assert!(config.cache.checkpoint);
        assert!(config.markers.identity.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[cache]
dir = "Cache"
version = "2.3.1"
checkpoint = false

[markers]
identity = "TrackObject"
excluded = ["TrackingManager", "DebugOverlay"]
renderable = ["MeshRenderer"]

[markers.reserved]
primary_viewpoint = "Eye"
left_manipulator = "HandL"
right_manipulator = "HandR"

[strip]
visual = ["Transform", "MeshRenderer", "MeshFilter"]
tolerated_prefixes = ["Autohand."]
max_iterations = 50
drop_inactive = false

[exporter]
binary = false
pivot = "world"
extension = "glb"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.cache.dir, Path::new("Cache"));
        assert!(!config.cache.checkpoint);
        assert_eq!(config.markers.identity, "TrackObject");
        assert_eq!(config.markers.excluded.len(), 2);
        assert_eq!(config.markers.reserved.left_manipulator, "HandL");
        assert_eq!(config.strip.visual.len(), 3);
        assert_eq!(config.strip.tolerated_prefixes, vec!["Autohand."]);
        assert_eq!(config.strip.max_iterations, 50);
        assert!(!config.strip.drop_inactive);
        assert!(!config.exporter.binary);
        assert!(config.exporter.embed_textures);
        assert_eq!(config.exporter.pivot, Pivot::World);
        assert_eq!(config.exporter.extension, "glb");
    }

    #[test]
    fn default_values() {
        let config = load_config_from_str("[cache]\nversion = \"1\"\n").unwrap();
        assert!(config.strip.visual.iter().any(|t| t == "MeshRenderer"));
        assert!(config.strip.visual.iter().any(|t| t == "Animator"));
        assert_eq!(config.strip.max_iterations, 1000);
        assert!(config.strip.drop_inactive);
        assert_eq!(config.markers.renderable.len(), 2);
        assert_eq!(config.markers.reserved.primary_viewpoint, "CenterEyeAnchor");
        assert!(config.exporter.binary && config.exporter.all_lods);
        assert_eq!(config.exporter.pivot, Pivot::LocalCentered);
        assert_eq!(config.exporter.extension, "fbx");
    }

    #[test]
    fn missing_version_errors() {
        let err = load_config_from_str("[cache]\nversion = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn version_with_separator_errors() {
        let err = load_config_from_str("[cache]\nversion = \"a/b\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn version_naming_a_parent_or_current_dir_errors() {
        for version in [".", ".."] {
            let toml = format!("[cache]\nversion = \"{version}\"\n");
            let err = load_config_from_str(&toml).unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError(_)), "{version}");
        }
        assert!(load_config_from_str("[cache]\nversion = \"1..2\"\n").is_ok());
    }

    #[test]
    fn extension_that_escapes_the_artifact_dir_errors() {
        for extension in ["../fbx", "a/b", "a\\\\b", ".", "..", ".fbx"] {
            let toml =
                format!("[cache]\nversion = \"1\"\n[exporter]\nextension = \"{extension}\"\n");
            let err = load_config_from_str(&toml).unwrap_err();
            assert!(matches!(err, ConfigError::ValidationError(_)), "{extension}");
        }
        let config =
            load_config_from_str("[cache]\nversion = \"1\"\n[exporter]\nextension = \"tar.gz\"\n")
                .unwrap();
        assert_eq!(config.exporter.extension, "tar.gz");
    }

    #[test]
    fn zero_iterations_errors() {
        let toml = "[cache]\nversion = \"1\"\n[strip]\nmax_iterations = 0\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn missing_cache_section_errors() {
        let err = load_config_from_str("[markers]\nidentity = \"X\"\n").unwrap_err();
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
            "[cache]\nversion = \"0.9\"\n[markers]\nidentity = \"TrackObject\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.markers.identity, "TrackObject");
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
