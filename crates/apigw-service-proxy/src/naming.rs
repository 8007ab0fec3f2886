//! Deterministic logical ids for generated resources.

use apigw_service_proxy_core::model::HttpMethod;
use apigw_service_proxy_core::ServiceKind;

/// Logical id of the created REST API.
pub const REST_API: &str = "ApiGatewayRestApi";

/// Logical id of the usage plan.
pub const USAGE_PLAN: &str = "ApiGatewayUsagePlan";

/// Logical id fragment for one path segment.
///
/// The segment is capitalized (rest lower-cased), `-` becomes `Dash`,
/// `{param}` becomes `ParamVar` and anything else non-alphanumeric is dropped.
#[must_use]
pub fn normalize_path_part(part: &str) -> String {
    let capitalized = capitalize(part).replace('-', "Dash");
    let with_vars = match (capitalized.find('{'), capitalized.rfind('}')) {
        (Some(open), Some(close)) if open < close => format!(
            "{}{}Var{}",
            &capitalized[..open],
            &capitalized[open + 1..close],
            &capitalized[close + 1..]
        ),
        _ => capitalized,
    };
    let cleaned: String = with_vars
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    upper_first(&cleaned)
}

/// Logical id fragment for a normalized path (`users/{id}` → `UsersIdVar`).
#[must_use]
pub fn normalize_path(path: &str) -> String {
    path.split('/').map(normalize_path_part).collect()
}

/// `ApiGatewayResource<Path>`
#[must_use]
pub fn resource(path: &str) -> String {
    format!("ApiGatewayResource{}", normalize_path(path))
}

/// `ApiGatewayMethod<Path><Method>`
#[must_use]
pub fn method(path: &str, method: HttpMethod) -> String {
    format!(
        "ApiGatewayMethod{}{}",
        normalize_path(path),
        upper_first(method.as_lower())
    )
}

/// `ApiGatewayDeployment<instance>`
#[must_use]
pub fn deployment(instance_id: &str) -> String {
    format!("ApiGatewayDeployment{instance_id}")
}

/// `ApiGatewayApiKey<n>` (1-based).
#[must_use]
pub fn api_key(n: usize) -> String {
    format!("ApiGatewayApiKey{n}")
}

/// `ApiGatewayUsagePlanKey<n>` (1-based).
#[must_use]
pub fn usage_plan_key(n: usize) -> String {
    format!("ApiGatewayUsagePlanKey{n}")
}

/// Shared execution role of one service.
#[must_use]
pub const fn role(service: ServiceKind) -> &'static str {
    match service {
        ServiceKind::Kinesis => "ApigatewayToKinesisRole",
        ServiceKind::Sqs => "ApigatewayToSqsRole",
        ServiceKind::S3 => "ApigatewayToS3Role",
        ServiceKind::Sns => "ApigatewayToSnsRole",
        ServiceKind::Dynamodb => "ApigatewayToDynamodbRole",
        ServiceKind::EventBridge => "ApigatewayToEventBridgeRole",
    }
}

/// Inline policy name of a service's shared role.
#[must_use]
pub fn role_policy(service: ServiceKind) -> String {
    format!("apigatewayto{}", service.tag())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
