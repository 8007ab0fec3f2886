//! SQS `SendMessage` proxies.

use apigw_service_proxy_core::model::{ProxyTarget, SqsTarget};
use apigw_service_proxy_core::{NormalizedEvent, ServiceKind};
use serde_json::{json, Map, Value};

use super::{resource_arn, ServiceCompiler};
use crate::compile::helpers::{self, Integration};

/// SQS compiler.
pub struct Sqs;

impl ServiceCompiler for Sqs {
    type Target = SqsTarget;

    const KIND: ServiceKind = ServiceKind::Sqs;

    fn target(target: &ProxyTarget) -> Option<&SqsTarget> {
        match target {
            ProxyTarget::Sqs(target) => Some(target),
            _ => None,
        }
    }

    fn policy_statements(&self, targets: &[&SqsTarget]) -> Vec<Value> {
        let resources: Vec<Value> = helpers::unique(targets.iter().map(|t| &t.queue_name))
            .into_iter()
            .map(|queue| {
                resource_arn(
                    "arn:${AWS::Partition}:sqs:${AWS::Region}:${AWS::AccountId}:${queueName}",
                    "queueName",
                    queue.to_value(),
                )
            })
            .collect();

        vec![json!({
            "Effect": "Allow",
            "Action": ["sqs:SendMessage"],
            "Resource": resources
        })]
    }

    fn integration(&self, event: &NormalizedEvent, target: &SqsTarget) -> Integration {
        let mut integration = Integration::action(helpers::sub_with(
            "arn:${AWS::Partition}:apigateway:${AWS::Region}:sqs:path//${AWS::AccountId}/${queueName}",
            helpers::vars([("queueName", target.queue_name.to_value())]),
        ));

        let mut parameters = Map::new();
        parameters.insert(
            "integration.request.querystring.Action".into(),
            helpers::quoted("SendMessage"),
        );
        parameters.insert(
            "integration.request.querystring.MessageBody".into(),
            json!("method.request.body"),
        );
        for (name, value) in &target.request_parameters {
            parameters.insert(name.clone(), json!(value));
        }
        integration.request_parameters = parameters;

        integration.method_parameters = target
            .accept_parameters
            .iter()
            .map(|(name, required)| (name.clone(), Value::Bool(*required)))
            .collect();

        integration.request_templates = Some(helpers::request_templates(
            [("application/json", json!("{statusCode:200}"))],
            event,
        ));
        integration
    }
}
