//! The CloudFormation template document and the fragments stages produce.
//!
//! Stages never touch the template directly: each returns a [`Fragment`]
//! that the orchestrator folds in with [`Template::merge`]. Merging is
//! non-destructive. Mappings are merged key by key and any other value is
//! replaced, so keys a fragment does not mention survive.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// CloudFormation resource type of API Gateway deployments.
pub const DEPLOYMENT_TYPE: &str = "AWS::ApiGateway::Deployment";

/// A CloudFormation-like template with `Resources` and `Outputs` sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Top-level keys other than `Resources` and `Outputs`.
    head: Map<String, Value>,
    resources: Map<String, Value>,
    outputs: Map<String, Value>,
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    /// An empty template.
    #[must_use]
    pub fn new() -> Self {
        let mut head = Map::new();
        head.insert(
            "AWSTemplateFormatVersion".to_string(),
            Value::String("2010-09-09".to_string()),
        );
        Self {
            head,
            resources: Map::new(),
            outputs: Map::new(),
        }
    }

    /// Wrap an existing template document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document, its `Resources` or its
    /// `Outputs` is not a mapping.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut head) = value else {
            return Err(Error::config("template document must be a mapping"));
        };
        let resources = take_section(&mut head, "Resources")?;
        let outputs = take_section(&mut head, "Outputs")?;
        Ok(Self {
            head,
            resources,
            outputs,
        })
    }

    /// Parse an existing template from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON or not a template mapping.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// The `Resources` section.
    #[must_use]
    pub fn resources(&self) -> &Map<String, Value> {
        &self.resources
    }

    /// One resource by logical id.
    #[must_use]
    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources.get(logical_id)
    }

    /// The `Outputs` section.
    #[must_use]
    pub fn outputs(&self) -> &Map<String, Value> {
        &self.outputs
    }

    /// First resource of the given CloudFormation type.
    #[must_use]
    pub fn find_resource_of_type(&self, resource_type: &str) -> Option<(&str, &Value)> {
        self.resources
            .iter()
            .find(|(_, resource)| resource.get("Type").and_then(Value::as_str) == Some(resource_type))
            .map(|(id, resource)| (id.as_str(), resource))
    }

    /// Fold a fragment in, returning the method ids it tracked.
    pub fn merge(&mut self, fragment: Fragment) -> Vec<String> {
        for (id, resource) in fragment.resources {
            merge_entry(&mut self.resources, id, resource);
        }
        for (id, output) in fragment.outputs {
            merge_entry(&mut self.outputs, id, output);
        }
        fragment.method_ids
    }

    /// The full document. Empty `Outputs` are left out.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut doc = self.head.clone();
        doc.insert("Resources".to_string(), Value::Object(self.resources.clone()));
        if !self.outputs.is_empty() {
            doc.insert("Outputs".to_string(), Value::Object(self.outputs.clone()));
        }
        Value::Object(doc)
    }

    /// Pretty-printed JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }
}

fn take_section(head: &mut Map<String, Value>, key: &str) -> Result<Map<String, Value>> {
    match head.remove(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(section)) => Ok(section),
        Some(_) => Err(Error::config(format!("template {key} must be a mapping"))),
    }
}

fn merge_entry(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(existing) => deep_merge(existing, value),
        None => {
            map.insert(key, value);
        }
    }
}

/// Merge `source` into `target`: mappings key by key, anything else replaced.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                merge_entry(target, key, value);
            }
        }
        (target, source) => *target = source,
    }
}

/// Resources, outputs and tracked method ids produced by one stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    resources: Map<String, Value>,
    outputs: Map<String, Value>,
    method_ids: Vec<String>,
}

impl Fragment {
    /// An empty fragment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource.
    pub fn add_resource(&mut self, logical_id: impl Into<String>, resource: Value) {
        self.resources.insert(logical_id.into(), resource);
    }

    /// Add a REST method and track its id for deployment wiring.
    pub fn add_method(&mut self, logical_id: impl Into<String>, resource: Value) {
        let logical_id = logical_id.into();
        self.method_ids.push(logical_id.clone());
        self.resources.insert(logical_id, resource);
    }

    /// Add a template output.
    pub fn add_output(&mut self, name: impl Into<String>, output: Value) {
        self.outputs.insert(name.into(), output);
    }

    /// Resources in insertion order.
    #[must_use]
    pub fn resources(&self) -> &Map<String, Value> {
        &self.resources
    }

    /// Outputs in insertion order.
    #[must_use]
    pub fn outputs(&self) -> &Map<String, Value> {
        &self.outputs
    }

    /// Tracked method ids in insertion order.
    #[must_use]
    pub fn method_ids(&self) -> &[String] {
        &self.method_ids
    }

    /// Whether the fragment adds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.outputs.is_empty()
    }

    /// Move everything from `other` into this fragment.
    pub fn append(&mut self, other: Self) {
        self.resources.extend(other.resources);
        self.outputs.extend(other.outputs);
        self.method_ids.extend(other.method_ids);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn deep_merge_keeps_unrelated_keys() {
        let mut target = json!({ "a": { "x": 1, "y": [1, 2] }, "b": true });
        deep_merge(&mut target, json!({ "a": { "y": [3], "z": "new" } }));
        assert_eq!(
            target,
            json!({ "a": { "x": 1, "y": [3], "z": "new" }, "b": true })
        );
    }

    #[test]
    fn merge_returns_tracked_method_ids() {
        let mut fragment = Fragment::new();
        fragment.add_resource("Role", json!({ "Type": "AWS::IAM::Role" }));
        fragment.add_method("Method", json!({ "Type": "AWS::ApiGateway::Method" }));

        let mut template = Template::new();
        let ids = template.merge(fragment);

        assert_eq!(ids, vec!["Method"]);
        assert_eq!(template.resources().len(), 2);
    }

    #[test]
    fn merge_into_existing_resource_is_non_destructive() {
        let mut template = Template::from_value(json!({
            "Resources": {
                "Bucket": { "Type": "AWS::S3::Bucket", "Properties": { "BucketName": "b" } }
            }
        }))
        .unwrap();

        let mut fragment = Fragment::new();
        fragment.add_resource("Bucket", json!({ "DependsOn": ["X"] }));
        template.merge(fragment);

        assert_eq!(
            template.resource("Bucket").unwrap(),
            &json!({
                "Type": "AWS::S3::Bucket",
                "Properties": { "BucketName": "b" },
                "DependsOn": ["X"]
            })
        );
    }

    #[test]
    fn finds_resource_by_type() {
        let template = Template::from_value(json!({
            "Resources": {
                "A": { "Type": "AWS::S3::Bucket" },
                "Deploy": { "Type": DEPLOYMENT_TYPE }
            }
        }))
        .unwrap();
        assert_eq!(
            template.find_resource_of_type(DEPLOYMENT_TYPE).map(|(id, _)| id),
            Some("Deploy")
        );
    }

    #[test]
    fn rejects_non_mapping_documents() {
        assert!(Template::from_value(json!([])).is_err());
        assert!(Template::from_value(json!({ "Resources": [] })).is_err());
        assert!(Template::from_json_str("{not json").is_err());
    }

    #[test]
    fn to_value_keeps_head_keys() {
        let template = Template::from_value(json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Description": "stack"
        }))
        .unwrap();
        assert_eq!(
            template.to_value(),
            json!({
                "AWSTemplateFormatVersion": "2010-09-09",
                "Description": "stack",
                "Resources": {}
            })
        );
    }
}
