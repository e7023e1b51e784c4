//! Discovery → extraction → merge/write orchestration
//!
//! A [`Pipeline`] walks the input directory through a [`DefinitionSource`],
//! extracts one [`ResourceSchema`] per definition and writes it out in one of
//! three [`OutputMode`]s. Unsupported definitions are skipped; any other
//! failure aborts the run. Files written before an abort are left in place.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::crd::CrdExtractor;
use crate::error::{CoreError, Result};
use crate::field::FieldBuilder;
use crate::path::PathExpr;
use crate::resource::ResourceSchema;
use crate::template::{
    CollapsedAggregate, FieldSet, MergeRequest, RESOURCES_DIR, Template, TemplateMetadata,
};
use crate::terraform;
use crate::value;

/// Default insertion point in scaffolding templates
pub const DEFAULT_INSERT_AT: &str = ".spec.parameters[0]";

/// Default search depth below the input directory
pub const DEFAULT_DEPTH: usize = 2;

/// File name of the aggregate template in collapsed mode
pub const COLLAPSED_TEMPLATE: &str = "template.yaml";

/// A kind of resource definition the pipeline can process
pub trait DefinitionSource {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Candidate definitions under `root`, in processing order
    fn discover(&self, root: &Path, depth: usize) -> Result<Vec<PathBuf>>;

    /// Extract one definition; `NotSupported` means skip it
    fn extract(&self, path: &Path) -> Result<ResourceSchema>;
}

/// CRD/XRD files
#[derive(Debug, Clone, Default)]
pub struct CrdSource {
    extractor: CrdExtractor,
}

impl CrdSource {
    pub fn new(extractor: CrdExtractor) -> Self {
        Self { extractor }
    }
}

impl DefinitionSource for CrdSource {
    fn name(&self) -> &'static str {
        "crd"
    }

    /// Every file within `depth` directory levels, sorted by name per directory
    fn discover(&self, root: &Path, depth: usize) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .max_depth(depth + 1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn extract(&self, path: &Path) -> Result<ResourceSchema> {
        self.extractor.extract_file(path)
    }
}

/// Terraform module directories
#[derive(Debug, Clone, Default)]
pub struct TerraformSource {
    builder: FieldBuilder,
}

impl TerraformSource {
    pub fn new(builder: FieldBuilder) -> Self {
        Self { builder }
    }
}

impl DefinitionSource for TerraformSource {
    fn name(&self) -> &'static str {
        "terraform"
    }

    fn discover(&self, root: &Path, depth: usize) -> Result<Vec<PathBuf>> {
        terraform::discover_modules(root, depth)
    }

    fn extract(&self, path: &Path) -> Result<ResourceSchema> {
        terraform::load_module(path)?.to_schema(&self.builder)
    }
}

/// How synthesized schemas are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One merged copy of the template per resource
    Merge,
    /// One resource file each, plus a single template selecting among them
    Collapsed,
    /// Bare `{properties, required}` documents, no template
    Raw,
}

impl OutputMode {
    /// Raw wins over collapsed
    pub fn from_flags(collapsed: bool, raw: bool) -> Self {
        match (collapsed, raw) {
            (_, true) => Self::Raw,
            (true, false) => Self::Collapsed,
            (false, false) => Self::Merge,
        }
    }
}

/// Inputs of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub template: Option<PathBuf>,
    pub insert_at: String,
    pub depth: usize,
    pub collapsed: bool,
    pub raw: bool,
    pub metadata: TemplateMetadata,
}

impl PipelineConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            template: None,
            insert_at: DEFAULT_INSERT_AT.to_string(),
            depth: DEFAULT_DEPTH,
            collapsed: false,
            raw: false,
            metadata: TemplateMetadata::default(),
        }
    }

    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn mode(&self) -> OutputMode {
        OutputMode::from_flags(self.collapsed, self.raw)
    }

    /// Check the configuration before anything is read or written
    pub fn validate(&self) -> Result<()> {
        if !self.input_dir.is_dir() {
            return Err(CoreError::InvalidConfig {
                message: format!(
                    "input directory {} is not a directory",
                    self.input_dir.display()
                ),
            });
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(CoreError::InvalidConfig {
                message: format!(
                    "output directory {} exists and is not a directory",
                    self.output_dir.display()
                ),
            });
        }

        if self.template.is_none() {
            match self.mode() {
                OutputMode::Raw => {}
                OutputMode::Collapsed => {
                    return Err(CoreError::InvalidConfig {
                        message: "a template path is required to collapse resources".to_string(),
                    });
                }
                OutputMode::Merge => {
                    return Err(CoreError::InvalidConfig {
                        message: "either set a template path or request raw output".to_string(),
                    });
                }
            }
        }

        PathExpr::parse(&self.insert_at)?;
        Ok(())
    }
}

/// What a pipeline run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Per-resource files, in processing order
    pub written: Vec<PathBuf>,
    /// Definitions skipped as not supported
    pub skipped: Vec<PathBuf>,
    /// Definitions skipped because an earlier one produced the same file
    pub duplicates: Vec<PathBuf>,
    /// Aggregate template, in collapsed mode
    pub template: Option<PathBuf>,
}

/// A configured pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline over every definition `source` discovers
    pub fn run(&self, source: &dyn DefinitionSource) -> Result<PipelineReport> {
        self.config.validate()?;
        let mode = self.config.mode();
        let insert_at = PathExpr::parse(&self.config.insert_at)?;
        let template = match (&self.config.template, mode) {
            (Some(path), OutputMode::Merge | OutputMode::Collapsed) => {
                Some(Template::load(path)?)
            }
            _ => None,
        };

        let definitions = source.discover(&self.config.input_dir, self.config.depth)?;
        tracing::info!("processing {} definitions", definitions.len());

        let mut report = PipelineReport::default();
        let mut aggregate = CollapsedAggregate::new();
        let mut emitted = HashSet::new();

        for definition in &definitions {
            let schema = match source.extract(definition) {
                Ok(schema) => schema,
                Err(e) if e.is_not_supported() => {
                    tracing::warn!("skipping {}: {}", definition.display(), e);
                    report.skipped.push(definition.clone());
                    continue;
                }
                Err(e) => return Err(e.in_definition(definition.display().to_string())),
            };

            let output = self.output_path(&schema, mode);
            if !emitted.insert(output.clone()) {
                tracing::warn!(
                    "skipping {}: resource {} was already written to {}",
                    definition.display(),
                    schema.resource_name,
                    output.display()
                );
                report.duplicates.push(definition.clone());
                continue;
            }

            self.write_resource(&schema, mode, template.as_ref(), &insert_at, &output)
                .map_err(|e| e.in_definition(definition.display().to_string()))?;
            tracing::debug!(
                source = source.name(),
                resource = %schema.resource_name,
                output = %output.display(),
                "wrote resource"
            );

            if mode == OutputMode::Collapsed {
                aggregate.push(&output);
            }
            report.written.push(output);
        }

        if let (OutputMode::Collapsed, Some(template)) = (mode, template) {
            if aggregate.is_empty() {
                tracing::warn!("no resources were generated, skipping the collapsed template");
            } else {
                let path = self.config.output_dir.join(COLLAPSED_TEMPLATE);
                self.write_merged(template, aggregate.field_set()?, &insert_at, &path)?;
                report.template = Some(path);
            }
        }

        Ok(report)
    }

    /// Output file of a resource; file names are lowercased
    fn output_path(&self, schema: &ResourceSchema, mode: OutputMode) -> PathBuf {
        let output_dir = &self.config.output_dir;
        match mode {
            OutputMode::Collapsed => output_dir.join(RESOURCES_DIR).join(schema.file_name()),
            OutputMode::Merge | OutputMode::Raw => output_dir.join(schema.file_name()),
        }
    }

    fn write_resource(
        &self,
        schema: &ResourceSchema,
        mode: OutputMode,
        template: Option<&Template>,
        insert_at: &PathExpr,
        path: &Path,
    ) -> Result<()> {
        match (mode, template) {
            (OutputMode::Merge, Some(template)) => {
                let fields = FieldSet::from_schema(schema)?;
                self.write_merged(template.clone(), fields, insert_at, path)
            }
            (OutputMode::Collapsed, _) => {
                value::write_yaml_file(path, &CollapsedAggregate::resource_document(schema)?)
            }
            _ => value::write_yaml_file(path, &schema.to_document()?),
        }
    }

    fn write_merged(
        &self,
        mut template: Template,
        fields: FieldSet,
        insert_at: &PathExpr,
        path: &Path,
    ) -> Result<()> {
        template.merge(&MergeRequest::new(insert_at.clone(), fields))?;
        template.apply_metadata(&self.config.metadata)?;
        template.write(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_precedence() {
        assert_eq!(OutputMode::from_flags(false, false), OutputMode::Merge);
        assert_eq!(OutputMode::from_flags(true, false), OutputMode::Collapsed);
        assert_eq!(OutputMode::from_flags(true, true), OutputMode::Raw);
        assert_eq!(OutputMode::from_flags(false, true), OutputMode::Raw);
    }

    #[test]
    fn test_validate() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path();
        let output = tmp.path().join("out");

        let config = PipelineConfig::new(input.join("missing"), &output);
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig { .. })));

        let config = PipelineConfig::new(input, &output);
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig { .. })));

        let mut config = PipelineConfig::new(input, &output);
        config.raw = true;
        config.collapsed = true;
        assert!(config.validate().is_ok());

        let mut config = PipelineConfig::new(input, &output).with_template("template.yaml");
        config.insert_at = "spec.parameters".to_string();
        assert!(matches!(config.validate(), Err(CoreError::InvalidPath { .. })));
    }

    #[test]
    fn test_crd_discovery_depth() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for file in ["b.yaml", "a.yaml", "one/c.yaml", "one/two/d.yaml", "one/two/three/e.yaml"] {
            let path = root.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "").unwrap();
        }

        let files = CrdSource::default().discover(root, 2).unwrap();
        let relative: Vec<PathBuf> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            [
                PathBuf::from("a.yaml"),
                PathBuf::from("b.yaml"),
                PathBuf::from("one/c.yaml"),
                PathBuf::from("one/two/d.yaml"),
            ]
        );
    }
}
