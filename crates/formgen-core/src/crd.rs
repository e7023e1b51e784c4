//! CRD and XRD extraction
//!
//! Turns a CustomResourceDefinition or a Crossplane
//! CompositeResourceDefinition into a [`ResourceSchema`]:
//!
//! ```text
//! properties:
//!   config:      spec schema of the first version, titled
//!   apiVersion:  default {group}/{version}
//!   kind:        default claim kind or kind
//!   namespace:   only for namespaced resources
//!   verifiers:   only when verifiers are configured
//! ```

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue, json};
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::field::{FieldType, ParamField};
use crate::resource::{ResourceSchema, SchemaNode};
use crate::value::{self, normalize_integers};

pub const KIND_XRD: &str = "CompositeResourceDefinition";
pub const KIND_CRD: &str = "CustomResourceDefinition";

/// The parts of a CRD/XRD this tool reads
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    pub kind: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub spec: DefinitionSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSpec {
    /// Present on XRDs that offer a claim
    #[serde(default)]
    pub claim_names: Option<Names>,
    pub group: String,
    pub names: Names,
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Names {
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    pub name: String,
    #[serde(default)]
    pub schema: Option<VersionSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionSchema {
    #[serde(rename = "openAPIV3Schema", default)]
    pub open_api_v3_schema: Option<OpenApiSchema>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenApiSchema {
    #[serde(default)]
    pub properties: Map<String, JsonValue>,
}

impl Definition {
    /// Claim kind when the XRD offers a claim, otherwise the plain kind
    pub fn effective_kind(&self) -> &str {
        self.spec
            .claim_names
            .as_ref()
            .map(|c| c.kind.as_str())
            .unwrap_or(self.spec.names.kind.as_str())
    }

    /// Claim kind, or `{group}.{kind}`
    pub fn resource_name(&self) -> String {
        match &self.spec.claim_names {
            Some(claim) => claim.kind.clone(),
            None => format!("{}.{}", self.spec.group, self.spec.names.kind),
        }
    }

    pub fn is_namespaced(&self) -> bool {
        self.spec.scope.as_deref() == Some("Namespaced")
    }

    /// Top-level OpenAPI properties of the first version
    fn first_version_properties(&self) -> Option<&Map<String, JsonValue>> {
        self.spec
            .versions
            .first()
            .and_then(|v| v.schema.as_ref())
            .and_then(|s| s.open_api_v3_schema.as_ref())
            .map(|s| &s.properties)
    }
}

/// Extracts resource schemas from CRD/XRD documents
#[derive(Debug, Clone, Default)]
pub struct CrdExtractor {
    verifiers: Vec<String>,
}

impl CrdExtractor {
    /// Create an extractor; non-empty `verifiers` add a `verifiers` field
    pub fn new(verifiers: Vec<String>) -> Self {
        Self { verifiers }
    }

    /// Read and extract a definition file
    ///
    /// Files that are not YAML, or not a CRD/XRD, yield `NotSupported`.
    pub fn extract_file(&self, path: &Path) -> Result<ResourceSchema> {
        let origin = path.display().to_string();
        let content = String::from_utf8(std::fs::read(path)?)
            .map_err(|_| CoreError::not_supported(&origin, "not a text file"))?;
        self.extract_str(&content, &origin)
    }

    /// Extract from YAML/JSON source; `origin` names the source in errors
    ///
    /// In a multi-document stream the first CRD/XRD is used.
    pub fn extract_str(&self, content: &str, origin: &str) -> Result<ResourceSchema> {
        let mut unsupported = None;
        for doc in value::yaml_documents(content) {
            let doc = doc.map_err(|e| {
                CoreError::not_supported(origin, format!("not a kubernetes file: {}", e))
            })?;
            match self.extract(&doc, origin) {
                Err(e) if e.is_not_supported() => {
                    unsupported.get_or_insert(e);
                }
                result => return result,
            }
        }
        Err(unsupported.unwrap_or_else(|| CoreError::not_supported(origin, "empty file")))
    }

    /// Extract from an already decoded document
    pub fn extract(&self, doc: &JsonValue, origin: &str) -> Result<ResourceSchema> {
        let kind = doc.get("kind").and_then(JsonValue::as_str).unwrap_or_default();
        if kind != KIND_XRD && kind != KIND_CRD {
            return Err(CoreError::not_supported(origin, "not a CRD or XRD"));
        }

        let definition: Definition = serde_json::from_value(doc.clone()).map_err(|e| {
            CoreError::not_supported(origin, format!("malformed {}: {}", kind, e))
        })?;

        self.extract_definition(&definition, origin)
    }

    /// Build the resource schema of a decoded definition
    pub fn extract_definition(
        &self,
        definition: &Definition,
        origin: &str,
    ) -> Result<ResourceSchema> {
        let resource_name = definition.resource_name();
        let mut schema = ResourceSchema::new(&resource_name);

        let properties = definition.first_version_properties();
        let mut config = match properties.and_then(|p| p.get("spec")) {
            Some(spec) => normalize_integers(spec.clone()),
            None => JsonValue::Object(properties.cloned().unwrap_or_default()),
        };
        let found = value::kind_name(&config);
        let config_map = config.as_object_mut().ok_or_else(|| {
            CoreError::not_supported(
                origin,
                format!("spec schema is a {}, expected a mapping", found),
            )
        })?;
        config_map.insert(
            "title".to_string(),
            json!(format!("{} configuration options", resource_name)),
        );
        let config_has_required = config_map
            .get("required")
            .and_then(JsonValue::as_array)
            .is_some_and(|r| !r.is_empty());

        schema.insert("config", SchemaNode::OpenApi(config));
        if config_has_required {
            schema.require("config");
        }

        if let Some(version) = definition.spec.versions.first() {
            schema.insert(
                "apiVersion",
                ParamField::new(FieldType::String)
                    .with_description("APIVersion for the resource")
                    .with_default(json!(format!(
                        "{}/{}",
                        definition.spec.group, version.name
                    ))),
            );
            schema.insert(
                "kind",
                ParamField::new(FieldType::String)
                    .with_description("Kind for the resource")
                    .with_default(json!(definition.effective_kind())),
            );
        }

        if definition.is_namespaced() {
            schema.insert(
                "namespace",
                ParamField::new(FieldType::String)
                    .with_description("Namespace for the resource")
                    .with_default(json!("default")),
            );
        }

        if !self.verifiers.is_empty() {
            schema.insert(
                "verifiers",
                ParamField::new(FieldType::Array)
                    .with_description("verifiers to be used against the resource")
                    .with_items(ParamField::new(FieldType::String))
                    .with_default(json!(self.verifiers)),
            );
        }

        tracing::debug!(
            resource = %resource_name,
            properties = schema.properties.len(),
            "extracted definition"
        );
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGET_CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.io
spec:
  group: example.io
  scope: Namespaced
  names:
    kind: Widget
    plural: widgets
  versions:
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              properties:
                size:
                  type: integer
                  default: 3
                color:
                  type: string
            status:
              type: object
"#;

    const DATABASE_XRD: &str = r#"
apiVersion: apiextensions.crossplane.io/v1
kind: CompositeResourceDefinition
metadata:
  name: xdatabases.platform.example.org
spec:
  group: platform.example.org
  names:
    kind: XDatabase
    plural: xdatabases
  claimNames:
    kind: Database
    plural: databases
  versions:
    - name: v1alpha1
      served: true
      referenceable: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              required: [engine]
              properties:
                engine:
                  type: string
                  enum: [postgres, mysql]
"#;

    #[test]
    fn test_namespaced_crd() {
        let schema = CrdExtractor::default()
            .extract_str(WIDGET_CRD, "widget.yaml")
            .unwrap();

        assert_eq!(schema.resource_name, "example.io.Widget");
        assert_eq!(
            schema.properties.keys().collect::<Vec<_>>(),
            ["config", "apiVersion", "kind", "namespace"]
        );
        assert!(schema.required.is_empty());

        let api_version = schema.properties["apiVersion"].as_field().unwrap();
        assert_eq!(api_version.default, Some(json!("example.io/v1")));
        let kind = schema.properties["kind"].as_field().unwrap();
        assert_eq!(kind.default, Some(json!("Widget")));

        let config = serde_json::to_value(&schema.properties["config"]).unwrap();
        assert_eq!(config["title"], "example.io.Widget configuration options");
        assert_eq!(config["type"], "object");
        assert_eq!(config["properties"]["size"]["default"], 3);
        assert!(config.get("status").is_none());
    }

    #[test]
    fn test_xrd_with_claim_and_verifiers() {
        let extractor = CrdExtractor::new(vec!["regex".into(), "crossplane".into()]);
        let schema = extractor.extract_str(DATABASE_XRD, "db.yaml").unwrap();

        assert_eq!(schema.resource_name, "Database");
        assert_eq!(schema.file_name(), "database.yaml");
        assert_eq!(
            schema.properties.keys().collect::<Vec<_>>(),
            ["config", "apiVersion", "kind", "verifiers"]
        );
        assert_eq!(schema.required, ["config"]);

        let kind = schema.properties["kind"].as_field().unwrap();
        assert_eq!(kind.default, Some(json!("Database")));

        let verifiers = serde_json::to_value(&schema.properties["verifiers"]).unwrap();
        assert_eq!(
            verifiers,
            json!({
                "type": "array",
                "description": "verifiers to be used against the resource",
                "default": ["regex", "crossplane"],
                "items": {"type": "string"}
            })
        );
    }

    #[test]
    fn test_properties_used_as_is_without_spec() {
        let crd = r#"
kind: CustomResourceDefinition
spec:
  group: example.io
  scope: Cluster
  names: {kind: Gadget}
  versions:
    - name: v2
      schema:
        openAPIV3Schema:
          properties:
            replicas: {type: integer}
"#;
        let schema = CrdExtractor::default().extract_str(crd, "gadget.yaml").unwrap();
        let config = serde_json::to_value(&schema.properties["config"]).unwrap();
        assert_eq!(
            config,
            json!({
                "replicas": {"type": "integer"},
                "title": "example.io.Gadget configuration options"
            })
        );
        assert!(!schema.properties.contains_key("namespace"));
    }

    #[test]
    fn test_no_versions_has_no_gvk_fields() {
        let crd = r#"
kind: CustomResourceDefinition
spec:
  group: example.io
  names: {kind: Empty}
"#;
        let schema = CrdExtractor::default().extract_str(crd, "empty.yaml").unwrap();
        assert_eq!(schema.properties.keys().collect::<Vec<_>>(), ["config"]);
    }

    #[test]
    fn test_first_definition_of_a_stream_is_used() {
        let extractor = CrdExtractor::default();

        let bundle = format!(
            "{}\n---\napiVersion: v1\nkind: ConfigMap\nmetadata: {{name: settings}}\n",
            WIDGET_CRD
        );
        let schema = extractor.extract_str(&bundle, "bundle.yaml").unwrap();
        assert_eq!(schema.resource_name, "example.io.Widget");

        let bundle = format!(
            "apiVersion: v1\nkind: Namespace\nmetadata: {{name: db}}\n---{}---\n{}",
            DATABASE_XRD, WIDGET_CRD
        );
        let schema = extractor.extract_str(&bundle, "bundle.yaml").unwrap();
        assert_eq!(schema.resource_name, "Database");

        let bundle = "kind: ConfigMap\n---\nkind: Secret\n";
        let err = extractor.extract_str(bundle, "bundle.yaml").unwrap_err();
        assert!(err.is_not_supported());
        assert!(err.to_string().contains("not a CRD or XRD"));
    }

    #[test]
    fn test_non_definitions_are_not_supported() {
        let extractor = CrdExtractor::default();

        let deployment = "apiVersion: apps/v1\nkind: Deployment\nmetadata: {name: web}\n";
        assert!(extractor
            .extract_str(deployment, "deploy.yaml")
            .unwrap_err()
            .is_not_supported());

        assert!(extractor
            .extract_str("just: [unbalanced", "broken.yaml")
            .unwrap_err()
            .is_not_supported());

        let missing_spec = "kind: CustomResourceDefinition\n";
        assert!(extractor
            .extract_str(missing_spec, "crd.yaml")
            .unwrap_err()
            .is_not_supported());
    }
}
