//! `template tf` - generate parameters from Terraform module variables

use clap::Args;
use formgen_core::{Settings, TerraformSource};
use std::path::Path;

use super::CommonArgs;
use crate::error::Result;

#[derive(Args, Debug, Clone, Default)]
pub struct TfArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Turn the keys of map/object defaults into named properties
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub infer_object_defaults: Option<bool>,
}

impl TfArgs {
    fn to_settings(&self) -> Settings {
        Settings {
            infer_object_defaults: self.infer_object_defaults,
            ..self.common.to_settings()
        }
    }
}

pub fn run(config: Option<&Path>, args: &TfArgs) -> Result<()> {
    let settings = super::resolve_settings(config, args.to_settings())?;
    let source = TerraformSource::new(settings.field_builder());
    super::run_pipeline(settings, &source)
}
