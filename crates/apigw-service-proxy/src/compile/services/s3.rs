//! S3 object proxies over the S3 REST path API.
//!
//! Unlike the action-style services, S3 calls are path based: the bucket and
//! object key become `{bucket}` / `{object}` path parameters of the
//! integration URI. Every integration parameter that reads a `method.*`
//! value must also be declared on the method, so those are mirrored.

use apigw_service_proxy_core::model::{ObjectKey, ProxyTarget, S3Action, S3Target};
use apigw_service_proxy_core::{NormalizedEvent, ServiceKind};
use serde_json::{json, Map, Value};

use super::{resource_arn, ServiceCompiler};
use crate::compile::helpers::{self, Integration};

/// S3 compiler.
pub struct S3;

impl ServiceCompiler for S3 {
    type Target = S3Target;

    const KIND: ServiceKind = ServiceKind::S3;

    fn target(target: &ProxyTarget) -> Option<&S3Target> {
        match target {
            ProxyTarget::S3(target) => Some(target),
            _ => None,
        }
    }

    fn policy_statements(&self, targets: &[&S3Target]) -> Vec<Value> {
        helpers::unique(targets.iter().map(|t| (t.action, &t.bucket)))
            .into_iter()
            .map(|(action, bucket)| {
                json!({
                    "Effect": "Allow",
                    "Action": format!("s3:{}", action.as_str()),
                    "Resource": resource_arn(
                        "arn:${AWS::Partition}:s3:::${bucket}/*",
                        "bucket",
                        bucket.to_value(),
                    )
                })
            })
            .collect()
    }

    fn integration(&self, _event: &NormalizedEvent, target: &S3Target) -> Integration {
        let mut parameters = Map::new();
        parameters.insert(
            "integration.request.path.bucket".into(),
            helpers::sub_with("'${bucket}'", helpers::vars([("bucket", target.bucket.to_value())])),
        );
        let object = match &target.key {
            ObjectKey::Static(key) => helpers::quoted(key),
            ObjectKey::PathParam(name) => json!(format!("method.request.path.{name}")),
            ObjectKey::QueryStringParam(name) => json!(format!("method.request.querystring.{name}")),
        };
        parameters.insert("integration.request.path.object".into(), object);
        if target.partial_content {
            parameters.insert(
                "integration.request.header.Range".into(),
                json!("method.request.header.Range"),
            );
        }
        for (name, value) in &target.request_parameters {
            parameters.insert(name.clone(), json!(value));
        }

        let method_parameters: Map<String, Value> = parameters
            .values()
            .filter_map(Value::as_str)
            .filter(|source| source.starts_with("method."))
            .map(|source| (source.to_string(), Value::Bool(true)))
            .collect();

        let headers: &[&str] = match target.action {
            S3Action::GetObject | S3Action::PutObject => &["Content-Type", "Content-Length"],
            S3Action::DeleteObject => &["Content-Type", "Date"],
        };
        let success_parameters = headers
            .iter()
            .map(|header| {
                (
                    format!("method.response.header.{header}"),
                    json!(format!("integration.response.header.{header}")),
                )
            })
            .collect();

        Integration {
            http_method: target.action.http_method(),
            uri: helpers::sub("arn:${AWS::Partition}:apigateway:${AWS::Region}:s3:path/{bucket}/{object}"),
            passthrough: "WHEN_NO_MATCH",
            request_parameters: parameters,
            request_templates: None,
            method_parameters,
            success_parameters,
            partial_content: target.partial_content,
        }
    }
}
