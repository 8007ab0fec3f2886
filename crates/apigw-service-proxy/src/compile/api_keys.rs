//! API keys, the usage plan and the keys bound to it.

use serde_json::{json, Map, Value};

use super::StageContext;
use crate::config::UsagePlanConfig;
use crate::error::{Error, Result};
use crate::naming;
use crate::template::Fragment;

/// Check the raw `apiKeys` value: a list of strings.
///
/// # Errors
///
/// Returns [`Error::Config`] for any other shape.
pub fn api_key_names(raw: Option<&Value>) -> Result<Vec<String>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let Value::Array(items) = raw else {
        return Err(Error::config("apiKeys property must be an array"));
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(ToString::to_string)
                .ok_or_else(|| Error::config("API Keys must be strings"))
        })
        .collect()
}

/// Keys, usage plan and usage plan keys, all depending on `deployment_id`.
///
/// Nothing is emitted when neither `apiKeys` nor `usagePlan` is configured.
///
/// # Errors
///
/// Returns [`Error::Config`] if `apiKeys` is malformed.
pub fn compile_api_keys(cx: &StageContext<'_>, deployment_id: &str) -> Result<Fragment> {
    let provider = cx.provider;
    let names = api_key_names(provider.api_keys.as_ref())?;
    let mut fragment = Fragment::new();

    for (n, name) in names.iter().enumerate() {
        fragment.add_resource(
            naming::api_key(n + 1),
            json!({
                "Type": "AWS::ApiGateway::ApiKey",
                "Properties": {
                    "Enabled": true,
                    "Name": name,
                    "StageKeys": [{
                        "RestApiId": cx.api.rest_api_id(),
                        "StageName": provider.stage
                    }]
                },
                "DependsOn": deployment_id
            }),
        );
    }

    if provider.api_keys.is_none() && provider.usage_plan.is_none() {
        return Ok(fragment);
    }

    fragment.add_resource(
        naming::USAGE_PLAN,
        usage_plan(cx, deployment_id, provider.usage_plan.as_ref()),
    );

    for n in 1..=names.len() {
        fragment.add_resource(
            naming::usage_plan_key(n),
            json!({
                "Type": "AWS::ApiGateway::UsagePlanKey",
                "Properties": {
                    "KeyId": { "Ref": naming::api_key(n) },
                    "KeyType": "API_KEY",
                    "UsagePlanId": { "Ref": naming::USAGE_PLAN }
                }
            }),
        );
    }

    tracing::debug!(keys = names.len(), "compiled usage plan");
    Ok(fragment)
}

fn usage_plan(cx: &StageContext<'_>, deployment_id: &str, config: Option<&UsagePlanConfig>) -> Value {
    let provider = cx.provider;
    let mut properties = Map::new();
    properties.insert(
        "ApiStages".into(),
        json!([{ "ApiId": cx.api.rest_api_id(), "Stage": provider.stage }]),
    );
    properties.insert(
        "Description".into(),
        json!(format!(
            "Usage plan for {} {} stage",
            provider.service, provider.stage
        )),
    );
    properties.insert(
        "UsagePlanName".into(),
        json!(format!("{}-{}", provider.service, provider.stage)),
    );

    if let Some(quota) = config.and_then(|c| c.quota.as_ref()) {
        let mut block = Map::new();
        if let Some(limit) = quota.limit {
            block.insert("Limit".into(), json!(limit));
        }
        if let Some(offset) = quota.offset {
            block.insert("Offset".into(), json!(offset));
        }
        if let Some(period) = &quota.period {
            block.insert("Period".into(), json!(period));
        }
        properties.insert("Quota".into(), Value::Object(block));
    }
    if let Some(throttle) = config.and_then(|c| c.throttle.as_ref()) {
        let mut block = Map::new();
        if let Some(burst) = throttle.burst_limit {
            block.insert("BurstLimit".into(), json!(burst));
        }
        if let Some(rate) = throttle.rate_limit {
            block.insert("RateLimit".into(), json!(rate));
        }
        properties.insert("Throttle".into(), Value::Object(block));
    }

    json!({
        "Type": "AWS::ApiGateway::UsagePlan",
        "DependsOn": deployment_id,
        "Properties": properties
    })
}
