//! CLI commands

pub mod crd;
pub mod tf;

use clap::Args;
use console::style;
use formgen_core::{DefinitionSource, Pipeline, PipelineReport, Settings};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Flags shared by every `template` subcommand
///
/// Every flag is optional so that unset flags fall back to the environment
/// and the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Directory to search for definitions
    #[arg(short = 'i', long, alias = "inputDir")]
    pub input_dir: Option<PathBuf>,

    /// Directory to write generated files to
    #[arg(short = 'o', long, alias = "outputDir")]
    pub output_dir: Option<PathBuf>,

    /// Template to merge generated parameters into
    #[arg(short = 't', long, alias = "templatePath")]
    pub template_path: Option<PathBuf>,

    /// Path of the node to merge into [default: .spec.parameters[0]]
    #[arg(short = 'p', long, alias = "insertAt")]
    pub insert_at: Option<String>,

    /// How many directory levels to search [default: 2]
    #[arg(long)]
    pub depth: Option<usize>,

    /// Write one file per resource plus a single template selecting among them
    ///
    /// `--collapse=false` turns off a collapse set by the config file or environment.
    #[arg(
        short = 'c',
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub collapse: Option<bool>,

    /// Write bare {properties, required} documents, ignoring the template
    ///
    /// `--raw=false` turns off raw output set by the config file or environment.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub raw: Option<bool>,
}

impl CommonArgs {
    fn to_settings(&self) -> Settings {
        Settings {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            template_path: self.template_path.clone(),
            insert_at: self.insert_at.clone(),
            depth: self.depth,
            collapse: self.collapse,
            raw: self.raw,
            ..Default::default()
        }
    }
}

/// Config file, then environment, then flags
fn resolve_settings(config: Option<&Path>, flags: Settings) -> Result<Settings> {
    let mut settings = match config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    settings.merge(Settings::from_env()?);
    settings.merge(flags);
    tracing::debug!(?settings, "resolved settings");
    Ok(settings)
}

fn run_pipeline(settings: Settings, source: &dyn DefinitionSource) -> Result<()> {
    let config = settings.into_pipeline_config()?;
    let report = Pipeline::new(config).run(source)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &PipelineReport) {
    for path in report.written.iter().chain(report.template.iter()) {
        println!("{} {}", style("wrote").green(), path.display());
    }
    if !report.duplicates.is_empty() {
        println!(
            "{} {} duplicate resource(s)",
            style("skipped").yellow(),
            report.duplicates.len()
        );
    }
    if !report.skipped.is_empty() {
        println!(
            "{} {} unsupported definition(s)",
            style("skipped").yellow(),
            report.skipped.len()
        );
    }
}
