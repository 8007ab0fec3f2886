//! Kinesis `PutRecord` / `PutRecords` proxies.

use apigw_service_proxy_core::model::{KinesisAction, KinesisTarget, ProxyTarget};
use apigw_service_proxy_core::{NormalizedEvent, ServiceKind};
use serde_json::{json, Value};

use super::{resource_arn, ServiceCompiler};
use crate::compile::helpers::{self, Integration};

const PUT_RECORD_TEMPLATE: &str =
    r#"{"StreamName":"${StreamName}","Data":"${Data}","PartitionKey":"${PartitionKey}"}"#;

const PUT_RECORDS_TEMPLATE: &str = concat!(
    r#"{"StreamName":"${StreamName}","Records":["#,
    r#"#foreach($elem in $input.path('$.records')){"Data":"$util.base64Encode($elem.data)","PartitionKey":"${PartitionKey}"}"#,
    r#"#if($foreach.hasNext),#end#end]}"#,
);

/// Kinesis compiler.
pub struct Kinesis;

impl ServiceCompiler for Kinesis {
    type Target = KinesisTarget;

    const KIND: ServiceKind = ServiceKind::Kinesis;

    fn target(target: &ProxyTarget) -> Option<&KinesisTarget> {
        match target {
            ProxyTarget::Kinesis(target) => Some(target),
            _ => None,
        }
    }

    fn policy_statements(&self, targets: &[&KinesisTarget]) -> Vec<Value> {
        let actions = helpers::unique(
            targets
                .iter()
                .map(|target| format!("kinesis:{}", target.action.as_str())),
        );
        let resources: Vec<Value> = helpers::unique(targets.iter().map(|t| &t.stream_name))
            .into_iter()
            .map(|stream| {
                resource_arn(
                    "arn:${AWS::Partition}:kinesis:${AWS::Region}:${AWS::AccountId}:stream/${streamName}",
                    "streamName",
                    stream.to_value(),
                )
            })
            .collect();

        vec![json!({
            "Effect": "Allow",
            "Action": actions,
            "Resource": resources
        })]
    }

    fn integration(&self, event: &NormalizedEvent, target: &KinesisTarget) -> Integration {
        let (skeleton, default_partition_key, data) = match target.action {
            KinesisAction::PutRecord => (
                PUT_RECORD_TEMPLATE,
                "$context.requestId",
                Some("$util.base64Encode($input.body)"),
            ),
            KinesisAction::PutRecords => (PUT_RECORDS_TEMPLATE, "$elem.partitionKey", None),
        };
        let partition_key = target
            .partition_key
            .as_ref()
            .map_or_else(|| default_partition_key.to_string(), |source| source.template_expression());

        let mut vars = helpers::vars([
            ("StreamName", target.stream_name.to_value()),
            ("PartitionKey", Value::String(partition_key)),
        ]);
        if let Some(data) = data {
            vars.insert("Data".to_string(), json!(data));
        }
        let template = helpers::sub_with(skeleton, vars);

        let mut integration = Integration::action(helpers::sub(&format!(
            "arn:${{AWS::Partition}}:apigateway:${{AWS::Region}}:kinesis:action/{}",
            target.action.as_str()
        )));
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
