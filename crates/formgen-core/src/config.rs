//! Layered settings
//!
//! Settings come from `~/.config/formgen/config.yaml`, then `FORMGEN_*`
//! environment variables, then command-line flags. Every field is optional;
//! later layers override earlier ones field by field.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::crd::CrdExtractor;
use crate::error::{CoreError, Result};
use crate::field::FieldBuilder;
use crate::pipeline::{DEFAULT_DEPTH, DEFAULT_INSERT_AT, PipelineConfig};
use crate::template::TemplateMetadata;

/// Prefix of the environment variables read by [`Settings::from_env`]
pub const ENV_PREFIX: &str = "FORMGEN_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapse: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifiers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infer_object_defaults: Option<bool>,
}

impl Settings {
    /// Load settings from the default location, if the file exists
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| CoreError::InvalidConfig {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// `<config dir>/formgen/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("formgen").join("config.yaml"))
    }

    /// Read `FORMGEN_*` variables from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Read `FORMGEN_*` variables from an iterator of key/value pairs
    ///
    /// Unknown keys are ignored. `FORMGEN_VERIFIERS` is space separated.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut settings = Self::default();
        for (key, value) in vars {
            let Some(key) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value: String = value.into();
            match key {
                "INPUT_DIR" => settings.input_dir = Some(value.into()),
                "OUTPUT_DIR" => settings.output_dir = Some(value.into()),
                "TEMPLATE_PATH" => settings.template_path = Some(value.into()),
                "INSERT_AT" => settings.insert_at = Some(value),
                "DEPTH" => {
                    let depth = value.trim().parse().map_err(|_| CoreError::InvalidConfig {
                        message: format!("{ENV_PREFIX}DEPTH must be a number, got '{value}'"),
                    })?;
                    settings.depth = Some(depth);
                }
                "COLLAPSE" => settings.collapse = Some(parse_flag(key, &value)?),
                "RAW" => settings.raw = Some(parse_flag(key, &value)?),
                "INFER_OBJECT_DEFAULTS" => {
                    settings.infer_object_defaults = Some(parse_flag(key, &value)?)
                }
                "VERIFIERS" => {
                    settings.verifiers =
                        Some(value.split_whitespace().map(str::to_string).collect());
                }
                "TEMPLATE_NAME" => settings.template_name = Some(value),
                "TEMPLATE_TITLE" => settings.template_title = Some(value),
                "TEMPLATE_DESCRIPTION" => settings.template_description = Some(value),
                _ => {}
            }
        }
        Ok(settings)
    }

    /// Override fields with every field set in `overlay`
    pub fn merge(&mut self, overlay: Settings) {
        fn take<T>(base: &mut Option<T>, overlay: Option<T>) {
            if overlay.is_some() {
                *base = overlay;
            }
        }

        take(&mut self.input_dir, overlay.input_dir);
        take(&mut self.output_dir, overlay.output_dir);
        take(&mut self.template_path, overlay.template_path);
        take(&mut self.insert_at, overlay.insert_at);
        take(&mut self.depth, overlay.depth);
        take(&mut self.collapse, overlay.collapse);
        take(&mut self.raw, overlay.raw);
        take(&mut self.verifiers, overlay.verifiers);
        take(&mut self.template_name, overlay.template_name);
        take(&mut self.template_title, overlay.template_title);
        take(&mut self.template_description, overlay.template_description);
        take(&mut self.infer_object_defaults, overlay.infer_object_defaults);
    }

    /// Extractor for CRD/XRD definitions
    pub fn crd_extractor(&self) -> CrdExtractor {
        CrdExtractor::new(self.verifiers.clone().unwrap_or_default())
    }

    /// Field builder for Terraform variables
    pub fn field_builder(&self) -> FieldBuilder {
        FieldBuilder::new().infer_object_defaults(self.infer_object_defaults.unwrap_or(false))
    }

    /// Resolve defaults and validate into a pipeline configuration
    pub fn into_pipeline_config(self) -> Result<PipelineConfig> {
        let input_dir = self.input_dir.ok_or_else(|| CoreError::InvalidConfig {
            message: "an input directory is required".to_string(),
        })?;
        let output_dir = self.output_dir.ok_or_else(|| CoreError::InvalidConfig {
            message: "an output directory is required".to_string(),
        })?;

        let config = PipelineConfig {
            input_dir,
            output_dir,
            template: self.template_path,
            insert_at: self
                .insert_at
                .unwrap_or_else(|| DEFAULT_INSERT_AT.to_string()),
            depth: self.depth.unwrap_or(DEFAULT_DEPTH),
            collapsed: self.collapse.unwrap_or(false),
            raw: self.raw.unwrap_or(false),
            metadata: TemplateMetadata {
                name: self.template_name,
                title: self.template_title,
                description: self.template_description,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(CoreError::InvalidConfig {
            message: format!("{ENV_PREFIX}{key} must be a boolean, got '{value}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_yaml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(
            &path,
            "inputDir: ./crds\ninsertAt: .spec.parameters[1]\ndepth: 4\nverifiers: [regex]\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.input_dir, Some(PathBuf::from("./crds")));
        assert_eq!(settings.insert_at.as_deref(), Some(".spec.parameters[1]"));
        assert_eq!(settings.depth, Some(4));
        assert_eq!(settings.verifiers, Some(vec!["regex".to_string()]));
        assert!(settings.raw.is_none());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "inputDirectory: ./crds\n").unwrap();
        assert!(matches!(
            Settings::load_from(&path),
            Err(CoreError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_from_vars() {
        let settings = Settings::from_vars([
            ("FORMGEN_OUTPUT_DIR", "out"),
            ("FORMGEN_COLLAPSE", "true"),
            ("FORMGEN_VERIFIERS", "regex  crossplane"),
            ("FORMGEN_DEPTH", "3"),
            ("HOME", "/root"),
        ])
        .unwrap();

        assert_eq!(settings.output_dir, Some(PathBuf::from("out")));
        assert_eq!(settings.collapse, Some(true));
        assert_eq!(
            settings.verifiers,
            Some(vec!["regex".to_string(), "crossplane".to_string()])
        );
        assert_eq!(settings.depth, Some(3));
        assert!(settings.input_dir.is_none());
    }

    #[test]
    fn test_from_vars_rejects_bad_values() {
        assert!(Settings::from_vars([("FORMGEN_RAW", "maybe")]).is_err());
        assert!(Settings::from_vars([("FORMGEN_DEPTH", "deep")]).is_err());
    }

    #[test]
    fn test_merge_overlay_wins() {
        let mut base = Settings {
            input_dir: Some("a".into()),
            depth: Some(1),
            raw: Some(true),
            ..Default::default()
        };
        base.merge(Settings {
            depth: Some(5),
            raw: Some(false),
            template_name: Some("db".into()),
            ..Default::default()
        });

        assert_eq!(base.input_dir, Some(PathBuf::from("a")));
        assert_eq!(base.depth, Some(5));
        assert_eq!(base.raw, Some(false));
        assert_eq!(base.template_name.as_deref(), Some("db"));
    }

    #[test]
    fn test_into_pipeline_config() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings {
            input_dir: Some(tmp.path().to_path_buf()),
            output_dir: Some(tmp.path().join("out")),
            raw: Some(true),
            template_title: Some("Databases".into()),
            ..Default::default()
        };

        let config = settings.into_pipeline_config().unwrap();
        assert_eq!(config.insert_at, DEFAULT_INSERT_AT);
        assert_eq!(config.depth, DEFAULT_DEPTH);
        assert!(config.raw);
        assert_eq!(config.metadata.title.as_deref(), Some("Databases"));

        let missing = Settings::default().into_pipeline_config();
        assert!(matches!(missing, Err(CoreError::InvalidConfig { .. })));
    }
}
