//! `template crd` - generate parameters from CRDs and XRDs

use clap::Args;
use formgen_core::{CrdSource, Settings};
use std::path::Path;

use super::CommonArgs;
use crate::error::Result;

#[derive(Args, Debug, Clone, Default)]
pub struct CrdArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Verifier to list in the generated `verifiers` field (repeatable)
    #[arg(short = 'v', long = "verifier")]
    pub verifiers: Vec<String>,

    /// Set metadata.name of generated templates
    #[arg(long, alias = "templateName")]
    pub template_name: Option<String>,

    /// Set metadata.title of generated templates
    #[arg(long, alias = "templateTitle")]
    pub template_title: Option<String>,

    /// Set metadata.description of generated templates
    #[arg(long, alias = "templateDescription")]
    pub template_description: Option<String>,
}

impl CrdArgs {
    fn to_settings(&self) -> Settings {
        Settings {
            verifiers: (!self.verifiers.is_empty()).then(|| self.verifiers.clone()),
            template_name: self.template_name.clone(),
            template_title: self.template_title.clone(),
            template_description: self.template_description.clone(),
            ..self.common.to_settings()
        }
    }
}

pub fn run(config: Option<&Path>, args: &CrdArgs) -> Result<()> {
    let settings = super::resolve_settings(config, args.to_settings())?;
    let source = CrdSource::new(settings.crd_extractor());
    super::run_pipeline(settings, &source)
}
