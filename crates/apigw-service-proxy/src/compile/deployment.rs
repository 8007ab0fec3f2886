//! Deployment wiring.
//!
//! Every generated method must exist before the stage is deployed. When the
//! template already has a deployment its `DependsOn` is extended; otherwise
//! a new one is synthesized together with the `ServiceEndpoint` output.

use serde_json::{json, Map, Value};

use super::StageContext;
use crate::naming;
use crate::template::{Fragment, Template, DEPLOYMENT_TYPE};

/// The deployment fragment and the logical id of the deployment it targets.
pub fn merge_deployment(
    template: &Template,
    method_ids: &[String],
    cx: &StageContext<'_>,
) -> (Fragment, String) {
    let mut fragment = Fragment::new();

    if let Some((logical_id, existing)) = template.find_resource_of_type(DEPLOYMENT_TYPE) {
        let mut depends_on = match existing.get("DependsOn") {
            Some(Value::Array(ids)) => ids.clone(),
            Some(Value::String(id)) => vec![Value::String(id.clone())],
            _ => Vec::new(),
        };
        depends_on.extend(method_ids.iter().map(|id| Value::String(id.clone())));

        tracing::debug!(deployment = logical_id, added = method_ids.len(), "extended deployment");
        fragment.add_resource(logical_id, json!({ "DependsOn": depends_on }));
        return (fragment, logical_id.to_string());
    }

    let provider = cx.provider;
    let logical_id = naming::deployment(&provider.instance_id);

    let mut properties = Map::new();
    properties.insert("RestApiId".into(), cx.api.rest_api_id().clone());
    properties.insert("StageName".into(), json!(provider.stage));
    if let Some(description) = &provider.api_gateway.description {
        properties.insert("Description".into(), json!(description));
    }

    tracing::debug!(deployment = %logical_id, methods = method_ids.len(), "created deployment");
    fragment.add_resource(
        &logical_id,
        json!({
            "Type": DEPLOYMENT_TYPE,
            "Properties": properties,
            "DependsOn": method_ids
        }),
    );
    fragment.add_output(
        "ServiceEndpoint",
        json!({
            "Description": "URL of the service endpoint",
            "Value": {
                "Fn::Join": ["", [
                    "https://",
                    cx.api.rest_api_id(),
                    ".execute-api.",
                    { "Ref": "AWS::Region" },
                    ".",
                    { "Ref": "AWS::URLSuffix" },
                    format!("/{}", provider.stage)
                ]]
            }
        }),
    );
    (fragment, logical_id)
}

#[cfg(test)]
mod tests {
    use apigw_service_proxy_core::Normalized;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::compile::helpers::ApiRefs;
    use crate::config::ProviderContext;

    fn merge(template: &Template, method_ids: &[&str]) -> (Fragment, String) {
        let mut provider = ProviderContext::new("svc", "dev", "1700");
        provider.api_gateway.description = Some("release".into());
        let api = ApiRefs::new(&provider);
        let normalized = Normalized::default();
        let ids: Vec<String> = method_ids.iter().map(ToString::to_string).collect();
        merge_deployment(
            template,
            &ids,
            &StageContext {
                provider: &provider,
                normalized: &normalized,
                api: &api,
            },
        )
    }

    #[test]
    fn extends_existing_deployment() {
        let mut template = Template::from_value(json!({
            "Resources": {
                "Deploy": { "Type": "AWS::ApiGateway::Deployment", "DependsOn": ["a", "b"] }
            }
        }))
        .unwrap();

        let (fragment, id) = merge(&template, &["c"]);
        assert_eq!(id, "Deploy");
        template.merge(fragment);

        assert_eq!(
            template.resource("Deploy").unwrap()["DependsOn"],
            json!(["a", "b", "c"])
        );
        assert_eq!(template.resources().len(), 1);
        assert!(template.outputs().is_empty());
    }

    #[test]
    fn normalizes_single_dependency() {
        let template = Template::from_value(json!({
            "Resources": {
                "Deploy": { "Type": "AWS::ApiGateway::Deployment", "DependsOn": "a" }
            }
        }))
        .unwrap();
        let (fragment, _) = merge(&template, &["b"]);
        assert_eq!(fragment.resources()["Deploy"], json!({ "DependsOn": ["a", "b"] }));
    }

    #[test]
    fn creates_deployment_and_endpoint_output() {
        let (fragment, id) = merge(&Template::new(), &["m1", "m2"]);
        assert_eq!(id, "ApiGatewayDeployment1700");
        assert_eq!(
            fragment.resources()["ApiGatewayDeployment1700"],
            json!({
                "Type": "AWS::ApiGateway::Deployment",
                "Properties": {
                    "RestApiId": { "Ref": "ApiGatewayRestApi" },
                    "StageName": "dev",
                    "Description": "release"
                },
                "DependsOn": ["m1", "m2"]
            })
        );
        assert_eq!(
            fragment.outputs()["ServiceEndpoint"]["Value"]["Fn::Join"][1][6],
            json!("/dev")
        );
    }
}
