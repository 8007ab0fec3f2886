//! `OPTIONS` preflight methods for CORS-enabled paths.

use apigw_service_proxy_core::model::HttpMethod;
use apigw_service_proxy_core::CorsDescriptor;
use serde_json::{json, Map, Value};

use super::helpers::{self, ApiRefs, ALLOW_ORIGIN};
use super::{Stage, StageContext};
use crate::error::Result;
use crate::naming;
use crate::template::Fragment;

/// One mock `OPTIONS` method per path in the preflight map.
pub struct Cors;

impl Stage for Cors {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn compile(&self, cx: &StageContext<'_>) -> Result<Fragment> {
        let mut fragment = Fragment::new();
        for (path, cors) in &cx.normalized.cors_preflight {
            let logical_id = naming::method(path, HttpMethod::Options);
            tracing::debug!(method = %logical_id, "compiled preflight");
            fragment.add_method(logical_id, preflight_method(path, cors, cx.api));
        }
        Ok(fragment)
    }
}

fn preflight_headers(cors: &CorsDescriptor) -> Map<String, Value> {
    let mut headers = Map::new();
    headers.insert(ALLOW_ORIGIN.to_string(), helpers::quoted(&cors.allow_origin()));
    headers.insert(
        "method.response.header.Access-Control-Allow-Headers".to_string(),
        helpers::quoted(&cors.headers.join(",")),
    );
    headers.insert(
        "method.response.header.Access-Control-Allow-Methods".to_string(),
        helpers::quoted(&cors.methods.join(",")),
    );
    if cors.allow_credentials {
        headers.insert(
            "method.response.header.Access-Control-Allow-Credentials".to_string(),
            helpers::quoted("true"),
        );
    }
    if let Some(max_age) = cors.max_age {
        headers.insert(
            "method.response.header.Access-Control-Max-Age".to_string(),
            helpers::quoted(&max_age.to_string()),
        );
    }
    if let Some(cache_control) = &cors.cache_control {
        headers.insert(
            "method.response.header.Cache-Control".to_string(),
            helpers::quoted(cache_control),
        );
    }
    headers
}

fn preflight_method(path: &str, cors: &CorsDescriptor, api: &ApiRefs) -> Value {
    let headers = preflight_headers(cors);
    let declared: Map<String, Value> = headers
        .keys()
        .map(|name| (name.clone(), Value::Bool(true)))
        .collect();

    json!({
        "Type": "AWS::ApiGateway::Method",
        "Properties": {
            "AuthorizationType": "NONE",
            "HttpMethod": "OPTIONS",
            "MethodResponses": [{
                "StatusCode": "200",
                "ResponseParameters": declared,
                "ResponseModels": {}
            }],
            "RequestParameters": {},
            "Integration": {
                "Type": "MOCK",
                "RequestTemplates": { "application/json": "{statusCode:200}" },
                "ContentHandling": "CONVERT_TO_TEXT",
                "IntegrationResponses": [{
                    "StatusCode": "200",
                    "ResponseParameters": headers,
                    "ResponseTemplates": { "application/json": "" }
                }]
            },
            "ResourceId": api.resource_id(path),
            "RestApiId": api.rest_api_id()
        }
    })
}

#[cfg(test)]
mod tests {
    use apigw_service_proxy_core::{normalize, parse};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::ProviderContext;

    fn compile(descriptors: &[Value]) -> Fragment {
        let normalized = normalize(&parse(descriptors).unwrap());
        let provider = ProviderContext::new("svc", "dev", "1");
        let api = ApiRefs::new(&provider);
        Cors.compile(&StageContext {
            provider: &provider,
            normalized: &normalized,
            api: &api,
        })
        .unwrap()
    }

    #[test]
    fn default_preflight() {
        let fragment = compile(&[json!({
            "kinesis": { "path": "/kinesis", "method": "post", "streamName": "s", "cors": true }
        })]);
        assert_eq!(fragment.method_ids(), ["ApiGatewayMethodKinesisOptions"]);

        let properties = &fragment.resources()["ApiGatewayMethodKinesisOptions"]["Properties"];
        assert_eq!(
            properties["Integration"]["IntegrationResponses"][0]["ResponseParameters"],
            json!({
                "method.response.header.Access-Control-Allow-Origin": "'*'",
                "method.response.header.Access-Control-Allow-Headers":
                    "'Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token,X-Amz-User-Agent'",
                "method.response.header.Access-Control-Allow-Methods": "'OPTIONS,POST'"
            })
        );
        assert_eq!(
            properties["MethodResponses"][0]["ResponseParameters"]
                ["method.response.header.Access-Control-Allow-Methods"],
            json!(true)
        );
        assert_eq!(properties["Integration"]["Type"], json!("MOCK"));
        assert_eq!(
            properties["ResourceId"],
            json!({ "Ref": "ApiGatewayResourceKinesis" })
        );
    }

    #[test]
    fn merged_preflight_for_shared_path() {
        let fragment = compile(&[
            json!({ "sqs": { "path": "p", "method": "post", "queueName": "q",
                "cors": { "origins": ["https://a.test"], "maxAge": 300 } } }),
            json!({ "sns": { "path": "p", "method": "get", "topicName": "t",
                "cors": { "origins": ["https://b.test"], "allowCredentials": true, "cacheControl": "max-age=300" } } }),
        ]);
        assert_eq!(fragment.resources().len(), 1);

        let headers = &fragment.resources()["ApiGatewayMethodPOptions"]["Properties"]["Integration"]
            ["IntegrationResponses"][0]["ResponseParameters"];
        assert_eq!(
            headers["method.response.header.Access-Control-Allow-Origin"],
            json!("'https://a.test,https://b.test'")
        );
        assert_eq!(
            headers["method.response.header.Access-Control-Allow-Methods"],
            json!("'OPTIONS,POST,GET'")
        );
        assert_eq!(
            headers["method.response.header.Access-Control-Allow-Credentials"],
            json!("'true'")
        );
        assert_eq!(headers["method.response.header.Access-Control-Max-Age"], json!("'300'"));
        assert_eq!(headers["method.response.header.Cache-Control"], json!("'max-age=300'"));
    }

    #[test]
    fn no_cors_no_preflight() {
        let fragment = compile(&[json!({
            "sqs": { "path": "p", "method": "post", "queueName": "q" }
        })]);
        assert!(fragment.is_empty());
    }
}
