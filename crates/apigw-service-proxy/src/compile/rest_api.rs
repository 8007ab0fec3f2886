//! REST API and resource tree.

use apigw_service_proxy_core::NormalizedEvent;
use serde_json::{json, Map};

use super::{Stage, StageContext};
use crate::error::{Error, Result};
use crate::naming;
use crate::template::Fragment;

const ENDPOINT_TYPES: [&str; 3] = ["EDGE", "REGIONAL", "PRIVATE"];

/// Creates `ApiGatewayRestApi` unless the proxies attach to a shared API.
pub struct RestApi;

impl Stage for RestApi {
    fn name(&self) -> &'static str {
        "rest-api"
    }

    fn compile(&self, cx: &StageContext<'_>) -> Result<Fragment> {
        let mut fragment = Fragment::new();
        let provider = cx.provider;
        if provider.uses_shared_api() {
            return Ok(fragment);
        }

        let endpoint_type = match &provider.endpoint_type {
            None => "EDGE",
            Some(raw) => {
                let upper = raw.to_ascii_uppercase();
                ENDPOINT_TYPES
                    .into_iter()
                    .find(|t| *t == upper)
                    .ok_or_else(|| {
                        Error::config(format!(
                            "endpointType must be one of {}, got \"{raw}\"",
                            ENDPOINT_TYPES.join(", ")
                        ))
                    })?
            }
        };

        let gateway = &provider.api_gateway;
        let mut properties = Map::new();
        properties.insert("Name".into(), json!(provider.api_name()));
        properties.insert(
            "EndpointConfiguration".into(),
            json!({ "Types": [endpoint_type] }),
        );
        if let Some(types) = &gateway.binary_media_types {
            properties.insert("BinaryMediaTypes".into(), json!(types));
        }
        if let Some(size) = gateway.minimum_compression_size {
            properties.insert("MinimumCompressionSize".into(), json!(size));
        }
        if let Some(statements) = &gateway.resource_policy {
            properties.insert(
                "Policy".into(),
                json!({ "Version": "2012-10-17", "Statement": statements }),
            );
        }

        fragment.add_resource(
            naming::REST_API,
            json!({ "Type": "AWS::ApiGateway::RestApi", "Properties": properties }),
        );
        Ok(fragment)
    }
}

/// Creates one `AWS::ApiGateway::Resource` per path prefix.
pub struct ResourceTree;

impl Stage for ResourceTree {
    fn name(&self) -> &'static str {
        "resources"
    }

    fn compile(&self, cx: &StageContext<'_>) -> Result<Fragment> {
        let mut fragment = Fragment::new();
        for path in resource_paths(&cx.normalized.events) {
            if cx.api.is_existing(&path) {
                continue;
            }
            let (parent, part) = path.rsplit_once('/').unwrap_or(("", path.as_str()));
            let resource = json!({
                "Type": "AWS::ApiGateway::Resource",
                "Properties": {
                    "ParentId": cx.api.resource_id(parent),
                    "PathPart": part,
                    "RestApiId": cx.api.rest_api_id()
                }
            });
            tracing::debug!(path = %path, "compiled resource");
            fragment.add_resource(naming::resource(&path), resource);
        }
        Ok(fragment)
    }
}

/// Every distinct non-empty path prefix, parents before children.
fn resource_paths(events: &[NormalizedEvent]) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for event in events {
        let path = &event.http.path;
        if path.is_empty() {
            continue;
        }
        let mut prefix = String::new();
        for part in path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            if !paths.contains(&prefix) {
                paths.push(prefix.clone());
            }
        }
    }
    paths.sort_by_key(|path| path.matches('/').count());
    paths
}
