//! Formgen Core - schema synthesis and template merging
//!
//! This crate turns resource definitions found on disk into the parameter
//! schema dialect understood by scaffolding-template form renderers, and
//! merges that schema into an existing template document:
//! - `types`: Terraform type-expression parser
//! - `field`: normalized parameter fields and the field builder
//! - `crd`: CRD/XRD extraction
//! - `terraform`: Terraform module loading and extraction
//! - `path` / `template`: path-addressed template merging
//! - `pipeline`: discovery → extraction → merge/write orchestration

pub mod config;
pub mod crd;
pub mod error;
pub mod field;
pub mod path;
pub mod pipeline;
pub mod resource;
pub mod template;
pub mod terraform;
pub mod types;
pub mod value;

pub use config::Settings;
pub use crd::{CrdExtractor, Definition};
pub use error::{CoreError, Result};
pub use field::{AdditionalProperties, FieldBuilder, FieldType, ParamField};
pub use path::PathExpr;
pub use pipeline::{
    CrdSource, DefinitionSource, OutputMode, Pipeline, PipelineConfig, PipelineReport,
    TerraformSource,
};
pub use resource::{ResourceSchema, SchemaNode};
pub use template::{CollapsedAggregate, FieldSet, MergeRequest, Template, TemplateMetadata};
pub use terraform::{TerraformModule, Variable};
pub use types::{Primitive, TypeDescriptor};
