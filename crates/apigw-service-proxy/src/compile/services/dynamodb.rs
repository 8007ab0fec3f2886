//! DynamoDB single-item proxies (`PutItem`, `GetItem`, `DeleteItem`).
//!
//! All three go through the DynamoDB action API, so the integration verb is
//! always `POST`. `PutItem` copies every top-level body field into the item
//! as a string attribute; the configured keys are written alongside.

use apigw_service_proxy_core::model::{DynamodbAction, DynamodbTarget, ProxyTarget, TableKey};
use apigw_service_proxy_core::{NormalizedEvent, ServiceKind};
use serde_json::{json, Map, Value};

use super::{resource_arn, ServiceCompiler};
use crate::compile::helpers::{self, Integration};

const HASH_KEY: &str = r#""${HashKey}": {"${HashAttributeType}": "${HashAttributeValue}"}"#;
const RANGE_KEY: &str = r#""${RangeKey}": {"${RangeAttributeType}": "${RangeAttributeValue}"}"#;
const BODY_ATTRIBUTE: &str = r#""$key": {"S": "$item.get($key)"}"#;

/// DynamoDB compiler.
pub struct Dynamodb;

impl ServiceCompiler for Dynamodb {
    type Target = DynamodbTarget;

    const KIND: ServiceKind = ServiceKind::Dynamodb;

    fn target(target: &ProxyTarget) -> Option<&DynamodbTarget> {
        match target {
            ProxyTarget::Dynamodb(target) => Some(target),
            _ => None,
        }
    }

    fn policy_statements(&self, targets: &[&DynamodbTarget]) -> Vec<Value> {
        helpers::unique(targets.iter().map(|t| (t.action, &t.table_name)))
            .into_iter()
            .map(|(action, table)| {
                json!({
                    "Effect": "Allow",
                    "Action": format!("dynamodb:{}", action.as_str()),
                    "Resource": resource_arn(
                        "arn:${AWS::Partition}:dynamodb:${AWS::Region}:${AWS::AccountId}:table/${tableName}",
                        "tableName",
                        table.to_value(),
                    )
                })
            })
            .collect()
    }

    fn integration(&self, event: &NormalizedEvent, target: &DynamodbTarget) -> Integration {
        let mut vars = helpers::vars([("TableName", target.table_name.to_value())]);
        let mut keys = Vec::new();
        if let Some(hash) = &target.hash_key {
            insert_key_vars(&mut vars, "Hash", hash);
            keys.push(HASH_KEY);
        }
        if let Some(range) = &target.range_key {
            insert_key_vars(&mut vars, "Range", range);
            keys.push(RANGE_KEY);
        }

        let mut skeleton = match target.action {
            DynamodbAction::PutItem => {
                let attributes = if keys.is_empty() {
                    format!("#foreach($key in $item.keySet()){BODY_ATTRIBUTE}#if($foreach.hasNext),#end#end")
                } else {
                    format!("#foreach($key in $item.keySet()){BODY_ATTRIBUTE},#end{}", keys.join(", "))
                };
                format!(
                    r#"#set($item = $input.path('$')){{"TableName": "${{TableName}}", "Item": {{{attributes}}}"#
                )
            }
            DynamodbAction::GetItem | DynamodbAction::DeleteItem => format!(
                r#"{{"TableName": "${{TableName}}", "Key": {{{}}}"#,
                keys.join(", ")
            ),
        };
        if let Some(condition) = &target.condition {
            vars.insert("ConditionExpression".into(), json!(condition));
            skeleton.push_str(r#", "ConditionExpression": "${ConditionExpression}""#);
        }
        skeleton.push('}');

        let template = helpers::sub_with(&skeleton, vars);
        let mut integration = Integration::action(helpers::sub(&format!(
            "arn:${{AWS::Partition}}:apigateway:${{AWS::Region}}:dynamodb:action/{}",
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

fn insert_key_vars(vars: &mut Map<String, Value>, prefix: &str, key: &TableKey) {
    vars.insert(format!("{prefix}Key"), json!(key.source.name()));
    vars.insert(format!("{prefix}AttributeType"), json!(key.attribute_type));
    vars.insert(
        format!("{prefix}AttributeValue"),
        json!(key.source.template_expression()),
    );
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::super::test_support::{api, normalized};
    use super::*;

    fn template_of(descriptor: Value, id: &str) -> Value {
        let normalized = normalized(&[descriptor]);
        let fragment = Dynamodb.compile_methods(&normalized, &api());
        fragment.resources()[id]["Properties"]["Integration"]["RequestTemplates"]["application/json"]
            ["Fn::Sub"]
            .clone()
    }

    #[test]
    fn get_item_reads_by_key() {
        let sub = template_of(
            json!({ "dynamodb": {
                "path": "items/{id}", "method": "get", "tableName": { "Ref": "Table" },
                "action": "GetItem", "hashKey": { "pathParam": "id", "attributeType": "S" }
            } }),
            "ApiGatewayMethodItemsIdVarGet",
        );
        assert_eq!(
            sub[0],
            json!(r#"{"TableName": "${TableName}", "Key": {"${HashKey}": {"${HashAttributeType}": "${HashAttributeValue}"}}}"#)
        );
        assert_eq!(
            sub[1],
            json!({
                "TableName": { "Ref": "Table" },
                "HashKey": "id",
                "HashAttributeType": "S",
                "HashAttributeValue": "$input.params().path.id"
            })
        );
    }

    #[test]
    fn delete_item_with_range_key_and_condition() {
        let sub = template_of(
            json!({ "dynamodb": {
                "path": "items", "method": "delete", "tableName": "t", "action": "DeleteItem",
                "hashKey": { "queryStringParam": "id", "attributeType": "S" },
                "rangeKey": { "queryStringParam": "sort", "attributeType": "N" },
                "condition": "attribute_exists(id)"
            } }),
            "ApiGatewayMethodItemsDelete",
        );
        let skeleton = sub[0].as_str().unwrap();
        assert!(skeleton.contains(r#""${RangeKey}": {"${RangeAttributeType}": "${RangeAttributeValue}"}"#));
        assert!(skeleton.ends_with(r#", "ConditionExpression": "${ConditionExpression}"}"#));
        assert_eq!(sub[1]["RangeAttributeValue"], json!("$input.params().querystring.sort"));
        assert_eq!(sub[1]["ConditionExpression"], json!("attribute_exists(id)"));
    }

    #[test]
    fn put_item_copies_body_fields() {
        let sub = template_of(
            json!({ "dynamodb": {
                "path": "items", "method": "post", "tableName": "t", "action": "PutItem"
            } }),
            "ApiGatewayMethodItemsPost",
        );
        assert_eq!(
            sub[0],
            json!(concat!(
                r#"#set($item = $input.path('$')){"TableName": "${TableName}", "Item": {"#,
                r#"#foreach($key in $item.keySet())"$key": {"S": "$item.get($key)"}#if($foreach.hasNext),#end#end}}"#
            ))
        );
    }

    #[test]
    fn put_item_appends_configured_key() {
        let sub = template_of(
            json!({ "dynamodb": {
                "path": "items/{id}", "method": "put", "tableName": "t", "action": "PutItem",
                "hashKey": { "pathParam": "id", "attributeType": "S" }
            } }),
            "ApiGatewayMethodItemsIdVarPut",
        );
        assert!(sub[0].as_str().unwrap().ends_with(
            r#"{"S": "$item.get($key)"},#end"${HashKey}": {"${HashAttributeType}": "${HashAttributeValue}"}}}"#
        ));
    }

    #[test]
    fn integration_is_post_action() {
        let normalized = normalized(&[json!({ "dynamodb": {
            "path": "items", "method": "get", "tableName": "t", "action": "GetItem",
            "hashKey": { "queryStringParam": "id", "attributeType": "S" }
        } })]);
        let fragment = Dynamodb.compile_methods(&normalized, &api());
        let integration = &fragment.resources()["ApiGatewayMethodItemsGet"]["Properties"]["Integration"];
        assert_eq!(integration["IntegrationHttpMethod"], json!("POST"));
        assert_eq!(
            integration["Uri"]["Fn::Sub"],
            json!("arn:${AWS::Partition}:apigateway:${AWS::Region}:dynamodb:action/GetItem")
        );
    }

    #[test]
    fn role_has_one_statement_per_action_and_table() {
        let normalized = normalized(&[
            json!({ "dynamodb": { "path": "a", "method": "post", "tableName": "t", "action": "PutItem" } }),
            json!({ "dynamodb": { "path": "b", "method": "get", "tableName": "t", "action": "GetItem",
                "hashKey": { "pathParam": "id", "attributeType": "S" } } }),
            json!({ "dynamodb": { "path": "c", "method": "post", "tableName": "t", "action": "PutItem" } }),
        ]);
        let fragment = Dynamodb.compile_iam_role(&normalized);
        let statements = fragment.resources()["ApigatewayToDynamodbRole"]["Properties"]["Policies"][0]
            ["PolicyDocument"]["Statement"]
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[1]["Action"], json!("dynamodb:PutItem"));
        assert_eq!(statements[2]["Action"], json!("dynamodb:GetItem"));
    }
}
