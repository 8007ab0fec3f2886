//! Shared template builders used across the compile stages.

use std::collections::BTreeMap;

use apigw_service_proxy_core::{normalize_path, NormalizedEvent, ServiceKind};
use serde_json::{json, Map, Value};

use crate::config::ProviderContext;
use crate::naming;

/// Header carrying the allowed origin on CORS-enabled responses.
pub const ALLOW_ORIGIN: &str = "method.response.header.Access-Control-Allow-Origin";

/// Where the REST API and its resources live.
#[derive(Debug, Clone)]
pub struct ApiRefs {
    rest_api_id: Value,
    root_resource_id: Value,
    existing_resources: BTreeMap<String, Value>,
}

impl ApiRefs {
    pub fn new(provider: &ProviderContext) -> Self {
        let gateway = &provider.api_gateway;
        let rest_api_id = gateway
            .rest_api_id
            .clone()
            .unwrap_or_else(|| json!({ "Ref": naming::REST_API }));
        let root_resource_id = gateway
            .rest_api_root_resource_id
            .clone()
            .unwrap_or_else(|| json!({ "Fn::GetAtt": [naming::REST_API, "RootResourceId"] }));
        let existing_resources = gateway
            .rest_api_resources
            .iter()
            .map(|(path, id)| (normalize_path(path), id.clone()))
            .collect();
        Self {
            rest_api_id,
            root_resource_id,
            existing_resources,
        }
    }

    /// `RestApiId` value.
    pub fn rest_api_id(&self) -> &Value {
        &self.rest_api_id
    }

    /// Whether `path` is served by a preconfigured resource.
    pub fn is_existing(&self, path: &str) -> bool {
        self.existing_resources.contains_key(path)
    }

    /// `ResourceId` value for a normalized path.
    pub fn resource_id(&self, path: &str) -> Value {
        if path.is_empty() {
            return self.root_resource_id.clone();
        }
        match self.existing_resources.get(path) {
            Some(id) => id.clone(),
            None => json!({ "Ref": naming::resource(path) }),
        }
    }
}

/// `{ "Fn::Sub": template }`
pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

/// `{ "Fn::Sub": [template, vars] }`
pub fn sub_with(template: &str, vars: Map<String, Value>) -> Value {
    json!({ "Fn::Sub": [template, vars] })
}

/// Build a `Fn::Sub` variable map from pairs.
pub fn vars<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// `'value'`, the static-value form of API Gateway parameter mappings.
pub fn quoted(value: &str) -> Value {
    Value::String(format!("'{value}'"))
}

/// Distinct items in first-seen order.
pub fn unique<T: PartialEq + Clone>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Shared execution role of one service.
///
/// Always grants CloudWatch Logs writes; `statements` add the
/// service-specific grants.
pub fn iam_role(service: ServiceKind, statements: Vec<Value>) -> Value {
    let mut statement = vec![json!({
        "Effect": "Allow",
        "Action": ["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
        "Resource": "*"
    })];
    statement.extend(statements);

    json!({
        "Type": "AWS::IAM::Role",
        "Properties": {
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": "apigateway.amazonaws.com" },
                    "Action": "sts:AssumeRole"
                }]
            },
            "Policies": [{
                "PolicyName": naming::role_policy(service),
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": statement
                }
            }]
        }
    })
}

/// The integration half of a method, as produced by a service compiler.
#[derive(Debug, Clone)]
pub struct Integration {
    /// `IntegrationHttpMethod`
    pub http_method: &'static str,
    /// `Uri`
    pub uri: Value,
    /// `PassthroughBehavior`
    pub passthrough: &'static str,
    /// Integration `RequestParameters`; omitted when empty.
    pub request_parameters: Map<String, Value>,
    /// `RequestTemplates`; omitted when `None`.
    pub request_templates: Option<Map<String, Value>>,
    /// Method `RequestParameters` declarations.
    pub method_parameters: Map<String, Value>,
    /// Extra 2xx response mappings (`method.response.*` → `integration.response.*`).
    pub success_parameters: Map<String, Value>,
    /// Add a 206 response.
    pub partial_content: bool,
}

impl Integration {
    /// An action-style integration (`POST`, `NEVER` passthrough).
    pub fn action(uri: Value) -> Self {
        Self {
            http_method: "POST",
            uri,
            passthrough: "NEVER",
            request_parameters: Map::new(),
            request_templates: None,
            method_parameters: Map::new(),
            success_parameters: Map::new(),
            partial_content: false,
        }
    }
}

/// Request templates: generated defaults, then caller templates on top.
pub fn request_templates(
    defaults: impl IntoIterator<Item = (&'static str, Value)>,
    event: &NormalizedEvent,
) -> Map<String, Value> {
    let mut templates: Map<String, Value> = defaults
        .into_iter()
        .map(|(content_type, template)| (content_type.to_string(), template))
        .collect();
    for (content_type, template) in &event.http.request_templates {
        templates.insert(content_type.clone(), Value::String(template.clone()));
    }
    templates
}

/// Build one REST method resource and its logical id.
pub fn method_resource(
    event: &NormalizedEvent,
    integration: Integration,
    api: &ApiRefs,
) -> (String, Value) {
    let http = &event.http;
    let logical_id = naming::method(&http.path, http.method);

    let mut properties = Map::new();
    properties.insert("HttpMethod".into(), json!(http.method.as_upper()));
    properties.insert(
        "RequestParameters".into(),
        Value::Object(integration.method_parameters.clone()),
    );
    properties.insert(
        "AuthorizationType".into(),
        json!(http.auth.authorization_type.as_str()),
    );
    if let Some(authorizer_id) = &http.auth.authorizer_id {
        properties.insert("AuthorizerId".into(), authorizer_id.clone());
    }
    if let Some(scopes) = &http.auth.authorization_scopes {
        properties.insert("AuthorizationScopes".into(), json!(scopes));
    }
    properties.insert("ApiKeyRequired".into(), json!(http.private));
    properties.insert("ResourceId".into(), api.resource_id(&http.path));
    properties.insert("RestApiId".into(), api.rest_api_id().clone());

    let credentials = http
        .role_arn
        .clone()
        .unwrap_or_else(|| json!({ "Fn::GetAtt": [naming::role(event.service()), "Arn"] }));

    let mut block = Map::new();
    block.insert("IntegrationHttpMethod".into(), json!(integration.http_method));
    block.insert("Type".into(), json!("AWS"));
    block.insert("Credentials".into(), credentials);
    block.insert("Uri".into(), integration.uri.clone());
    block.insert("PassthroughBehavior".into(), json!(integration.passthrough));
    if !integration.request_parameters.is_empty() {
        block.insert(
            "RequestParameters".into(),
            Value::Object(integration.request_parameters.clone()),
        );
    }
    if let Some(templates) = &integration.request_templates {
        block.insert("RequestTemplates".into(), Value::Object(templates.clone()));
    }
    block.insert(
        "IntegrationResponses".into(),
        integration_responses(event, &integration),
    );

    properties.insert("Integration".into(), Value::Object(block));
    properties.insert("MethodResponses".into(), method_responses(event, &integration));

    let resource = json!({
        "Type": "AWS::ApiGateway::Method",
        "Properties": properties
    });
    (logical_id, resource)
}

struct ResponseKind {
    status: u16,
    pattern: &'static str,
    success: bool,
}

fn response_kinds(partial_content: bool) -> Vec<ResponseKind> {
    let mut kinds = vec![ResponseKind {
        status: 200,
        pattern: "2\\d{2}",
        success: true,
    }];
    if partial_content {
        kinds.push(ResponseKind {
            status: 206,
            pattern: "206",
            success: true,
        });
    }
    kinds.push(ResponseKind {
        status: 400,
        pattern: "4\\d{2}",
        success: false,
    });
    kinds.push(ResponseKind {
        status: 500,
        pattern: "5\\d{2}",
        success: false,
    });
    kinds
}

fn response_parameters(
    event: &NormalizedEvent,
    integration: &Integration,
    success: bool,
) -> Map<String, Value> {
    let mut parameters = Map::new();
    if let Some(cors) = &event.http.cors {
        parameters.insert(ALLOW_ORIGIN.to_string(), quoted(&cors.allow_origin()));
    }
    if success {
        for (name, value) in &integration.success_parameters {
            parameters.insert(name.clone(), value.clone());
        }
    }
    parameters
}

fn response_template(event: &NormalizedEvent, status: u16) -> Map<String, Value> {
    let mut templates = Map::new();
    let Some(custom) = &event.http.response_templates else {
        return templates;
    };
    let template = match status {
        200..=299 => &custom.success,
        400..=499 => &custom.client_error,
        _ => &custom.server_error,
    };
    if let Some(template) = template {
        templates.insert("application/json".into(), json!(template));
    }
    templates
}

fn integration_responses(event: &NormalizedEvent, integration: &Integration) -> Value {
    response_kinds(integration.partial_content)
        .into_iter()
        .map(|kind| {
            json!({
                "StatusCode": kind.status,
                "SelectionPattern": kind.pattern,
                "ResponseParameters": response_parameters(event, integration, kind.success),
                "ResponseTemplates": response_template(event, kind.status)
            })
        })
        .collect()
}

fn method_responses(event: &NormalizedEvent, integration: &Integration) -> Value {
    response_kinds(integration.partial_content)
        .into_iter()
        .map(|kind| {
            let declared: Map<String, Value> =
                response_parameters(event, integration, kind.success)
                    .into_iter()
                    .map(|(name, _)| (name, Value::Bool(true)))
                    .collect();
            json!({
                "StatusCode": kind.status,
                "ResponseParameters": declared,
                "ResponseModels": {}
            })
        })
        .collect()
}
