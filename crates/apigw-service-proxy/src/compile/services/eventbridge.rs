//! EventBridge `PutEvents` proxies.

use apigw_service_proxy_core::model::{EventBridgeTarget, ProxyTarget};
use apigw_service_proxy_core::{NormalizedEvent, ServiceKind};
use serde_json::{json, Map, Value};

use super::{resource_arn, ServiceCompiler};
use crate::compile::helpers::{self, Integration};

const PUT_EVENTS_TEMPLATE: &str = r#"{"Entries":[{"Detail": "${Detail}","DetailType": "${DetailType}","EventBusName": "${EventBusName}","Source": "${Source}"}]}"#;

/// EventBridge compiler.
pub struct EventBridge;

impl ServiceCompiler for EventBridge {
    type Target = EventBridgeTarget;

    const KIND: ServiceKind = ServiceKind::EventBridge;

    fn target(target: &ProxyTarget) -> Option<&EventBridgeTarget> {
        match target {
            ProxyTarget::EventBridge(target) => Some(target),
            _ => None,
        }
    }

    fn policy_statements(&self, targets: &[&EventBridgeTarget]) -> Vec<Value> {
        let resources: Vec<Value> = helpers::unique(targets.iter().map(|t| &t.event_bus_name))
            .into_iter()
            .map(|bus| {
                resource_arn(
                    "arn:${AWS::Partition}:events:${AWS::Region}:${AWS::AccountId}:event-bus/${eventBusName}",
                    "eventBusName",
                    bus.to_value(),
                )
            })
            .collect();

        vec![json!({
            "Effect": "Allow",
            "Action": ["events:PutEvents"],
            "Resource": resources
        })]
    }

    fn integration(&self, event: &NormalizedEvent, target: &EventBridgeTarget) -> Integration {
        let detail = target
            .detail
            .as_ref()
            .map_or_else(|| "$input.body".to_string(), |source| source.template_expression());
        let detail_type = target
            .detail_type
            .as_ref()
            .map_or_else(|| "$context.requestId".to_string(), |source| source.template_expression());

        let template = helpers::sub_with(
            PUT_EVENTS_TEMPLATE,
            helpers::vars([
                ("EventBusName", target.event_bus_name.to_value()),
                ("Detail", json!(format!("$util.escapeJavaScript({detail})"))),
                ("DetailType", json!(detail_type)),
                ("Source", json!(target.source.template_expression())),
            ]),
        );

        let mut integration = Integration::action(helpers::sub(
            "arn:${AWS::Partition}:apigateway:${AWS::Region}:events:action/PutEvents",
        ));
        let mut parameters = Map::new();
        parameters.insert(
            "integration.request.header.X-Amz-Target".into(),
            helpers::quoted("AWSEvents.PutEvents"),
        );
        parameters.insert(
            "integration.request.header.Content-Type".into(),
            helpers::quoted("application/x-amz-json-1.1"),
        );
        integration.request_parameters = parameters;
        integration.request_templates = Some(helpers::request_templates(
            [
                ("application/json", template.clone()),
                ("application/x-www-form-urlencoded", template),
            ],
            event,
        ));
        integration
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::super::test_support::{api, normalized};
    use super::*;

    fn sub_vars(descriptor: Value) -> Value {
        let normalized = normalized(&[descriptor]);
        let fragment = EventBridge.compile_methods(&normalized, &api());
        fragment.resources()["ApiGatewayMethodEventsPost"]["Properties"]["Integration"]
            ["RequestTemplates"]["application/json"]["Fn::Sub"][1]
            .clone()
    }

    #[test]
    fn defaults_detail_to_body_and_type_to_request_id() {
        let vars = sub_vars(json!({ "eventbridge": {
            "path": "events", "method": "post", "eventBusName": "bus", "source": "my.app"
        } }));
        assert_eq!(
            vars,
            json!({
                "EventBusName": "bus",
                "Detail": "$util.escapeJavaScript($input.body)",
                "DetailType": "$context.requestId",
                "Source": "my.app"
            })
        );
    }

    #[test]
    fn resolves_parameter_sources() {
        let vars = sub_vars(json!({ "eventbridge": {
            "path": "events", "method": "post", "eventBusName": { "Ref": "Bus" },
            "source": { "queryStringParam": "src" },
            "detailType": { "pathParam": "type" },
            "detail": { "bodyParam": "payload" }
        } }));
        assert_eq!(vars["Source"], json!("$input.params().querystring.src"));
        assert_eq!(vars["DetailType"], json!("$input.params().path.type"));
        assert_eq!(
            vars["Detail"],
            json!("$util.escapeJavaScript($util.parseJson($input.body).payload)")
        );
        assert_eq!(vars["EventBusName"], json!({ "Ref": "Bus" }));
    }

    #[test]
    fn sets_put_events_headers() {
        let normalized = normalized(&[json!({ "eventbridge": {
            "path": "events", "method": "post", "eventBusName": "bus", "source": "s"
        } })]);
        let fragment = EventBridge.compile_methods(&normalized, &api());
        let integration = &fragment.resources()["ApiGatewayMethodEventsPost"]["Properties"]["Integration"];
        assert_eq!(
            integration["RequestParameters"],
            json!({
                "integration.request.header.X-Amz-Target": "'AWSEvents.PutEvents'",
                "integration.request.header.Content-Type": "'application/x-amz-json-1.1'"
            })
        );
        assert_eq!(
            integration["Uri"]["Fn::Sub"],
            json!("arn:${AWS::Partition}:apigateway:${AWS::Region}:events:action/PutEvents")
        );
    }
}
