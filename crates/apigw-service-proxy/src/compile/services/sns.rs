//! SNS `Publish` proxies.

use apigw_service_proxy_core::model::{ProxyTarget, SnsTarget};
use apigw_service_proxy_core::{NormalizedEvent, ServiceKind};
use serde_json::{json, Map, Value};

use super::{resource_arn, ServiceCompiler};
use crate::compile::helpers::{self, Integration};

const TOPIC_ARN: &str = "arn:${AWS::Partition}:sns:${AWS::Region}:${AWS::AccountId}:${topicName}";

/// SNS compiler.
pub struct Sns;

impl ServiceCompiler for Sns {
    type Target = SnsTarget;

    const KIND: ServiceKind = ServiceKind::Sns;

    fn target(target: &ProxyTarget) -> Option<&SnsTarget> {
        match target {
            ProxyTarget::Sns(target) => Some(target),
            _ => None,
        }
    }

    fn policy_statements(&self, targets: &[&SnsTarget]) -> Vec<Value> {
        let resources: Vec<Value> = helpers::unique(targets.iter().map(|t| &t.topic_name))
            .into_iter()
            .map(|topic| resource_arn(TOPIC_ARN, "topicName", topic.to_value()))
            .collect();

        vec![json!({
            "Effect": "Allow",
            "Action": ["sns:Publish"],
            "Resource": resources
        })]
    }

    fn integration(&self, event: &NormalizedEvent, target: &SnsTarget) -> Integration {
        let template = helpers::sub_with(
            &format!(
                "Action=Publish&Message=$util.urlEncode($input.body)&TopicArn=$util.urlEncode('{TOPIC_ARN}')"
            ),
            helpers::vars([("topicName", target.topic_name.to_value())]),
        );

        let mut integration = Integration::action(helpers::sub(
            "arn:${AWS::Partition}:apigateway:${AWS::Region}:sns:path//",
        ));
        let mut parameters = Map::new();
        parameters.insert(
            "integration.request.header.Content-Type".into(),
            helpers::quoted("application/x-www-form-urlencoded"),
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
