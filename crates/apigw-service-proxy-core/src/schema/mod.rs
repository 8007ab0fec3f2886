//! Closed-schema validation of raw service proxy descriptors.
//!
//! Each descriptor must be a single-key mapping naming one of the six
//! supported services, whose body matches that service's shape exactly.
//! Validation stops at the first violation inside a descriptor but keeps
//! going across the list, so [`ValidationError`] carries one entry per
//! broken descriptor. Descriptors that pass on their own are then checked
//! against each other for colliding routes.

mod error;

use std::collections::BTreeMap;

use serde_json::{Map, Value};

pub use error::{SchemaError, SchemaErrorKind, ValidationError};

use crate::model::{
    AuthorizationType, CorsConfig, CorsSetting, DynamodbAction, DynamodbTarget,
    EventBridgeTarget, HttpMethod, HttpSpec, KeySource, KinesisAction, KinesisTarget, ObjectKey,
    ParamSource, ProxyTarget, ResourceName, ResponseTemplates, S3Action, S3Target, ServiceKind,
    ServiceProxy, SnsTarget, SqsTarget, TableKey,
};
use crate::normalize::normalize_path;

type FieldResult<T> = Result<T, SchemaError>;

/// Fields accepted by every service shape.
const HTTP_FIELDS: &[&str] = &[
    "path",
    "method",
    "cors",
    "authorizationType",
    "authorizerId",
    "authorizationScopes",
    "private",
    "roleArn",
];

/// Custom mapping template fields (all services except `s3`).
const TEMPLATE_FIELDS: &[&str] = &["request", "response"];

const CORS_FIELDS: &[&str] = &[
    "origin",
    "origins",
    "methods",
    "headers",
    "allowCredentials",
    "maxAge",
    "cacheControl",
];

const PARAM_KEYS: &[&str] = &["pathParam", "queryStringParam", "bodyParam"];
const KEY_PARAM_KEYS: &[&str] = &["pathParam", "queryStringParam"];

const TEMPLATE_ONLY: &[&str] = &["template"];
const RESPONSE_TEMPLATE_FIELDS: &[&str] = &["success", "clientError", "serverError"];

const INTRINSIC: &str = "a string or an intrinsic function mapping";

/// Validate and convert raw descriptors into typed [`ServiceProxy`] values.
///
/// # Errors
///
/// Returns a [`ValidationError`] listing the first violation of every
/// descriptor that does not match its service shape.
pub fn parse(descriptors: &[Value]) -> Result<Vec<ServiceProxy>, ValidationError> {
    let mut parsed = Vec::with_capacity(descriptors.len());
    let mut errors = Vec::new();

    for (index, descriptor) in descriptors.iter().enumerate() {
        match parse_descriptor(index, descriptor) {
            Ok(proxy) => parsed.push((index, proxy)),
            Err(err) => errors.push(err),
        }
    }

    errors.extend(route_conflicts(&parsed));
    errors.sort_by_key(|err| err.index);

    if errors.is_empty() {
        tracing::debug!(count = parsed.len(), "service proxies validated");
        Ok(parsed.into_iter().map(|(_, proxy)| proxy).collect())
    } else {
        Err(ValidationError::new(errors))
    }
}

/// Check raw descriptors against the schema without keeping the result.
///
/// # Errors
///
/// Same as [`parse`].
pub fn validate(descriptors: &[Value]) -> Result<(), ValidationError> {
    parse(descriptors).map(|_| ())
}

/// Routes that would compile to the same method logical id.
///
/// A (path, method) pair may be bound once, and an `OPTIONS` method cannot
/// share a path with a CORS preflight.
fn route_conflicts(parsed: &[(usize, ServiceProxy)]) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    let mut routes: BTreeMap<(String, &'static str), usize> = BTreeMap::new();
    let mut preflights: BTreeMap<String, usize> = BTreeMap::new();

    for (index, proxy) in parsed {
        let path = normalize_path(&proxy.http.path);
        let method = proxy.http.method.as_upper();
        match routes.get(&(path.clone(), method)) {
            Some(&first) => errors.push(SchemaError::new(
                *index,
                Some(proxy.service()),
                "method",
                SchemaErrorKind::DuplicateRoute {
                    first,
                    path: path.clone(),
                    method,
                },
            )),
            None => {
                routes.insert((path.clone(), method), *index);
            }
        }
        if proxy.http.cors.is_some() {
            preflights.entry(path).or_insert(*index);
        }
    }

    for (index, proxy) in parsed {
        if proxy.http.method != HttpMethod::Options {
            continue;
        }
        let path = normalize_path(&proxy.http.path);
        if let Some(&cors_index) = preflights.get(&path) {
            let field = if cors_index == *index { "cors" } else { "method" };
            errors.push(SchemaError::new(
                *index,
                Some(proxy.service()),
                field,
                SchemaErrorKind::PreflightConflict { cors_index, path },
            ));
        }
    }

    errors
}

fn parse_descriptor(index: usize, descriptor: &Value) -> FieldResult<ServiceProxy> {
    let top_level = |kind| SchemaError::new(index, None, "", kind);

    let Some(map) = descriptor.as_object() else {
        return Err(top_level(SchemaErrorKind::NotAnObject));
    };

    let (tag, body) = match map.len() {
        0 => return Err(top_level(SchemaErrorKind::NoService)),
        1 => map.iter().next().ok_or_else(|| top_level(SchemaErrorKind::NoService))?,
        _ => {
            let kind = match map.keys().find(|k| ServiceKind::from_tag(k).is_none()) {
                Some(unknown) => SchemaErrorKind::UnsupportedProxy {
                    tag: unknown.clone(),
                },
                None => SchemaErrorKind::MultipleServices {
                    tags: map.keys().cloned().collect(),
                },
            };
            return Err(top_level(kind));
        }
    };

    let Some(service) = ServiceKind::from_tag(tag) else {
        return Err(top_level(SchemaErrorKind::UnsupportedProxy { tag: tag.clone() }));
    };

    let Some(body) = body.as_object() else {
        return Err(SchemaError::new(
            index,
            Some(service),
            tag.as_str(),
            SchemaErrorKind::TypeMismatch {
                expected: "a mapping",
            },
        ));
    };

    let fields = Fields {
        index,
        service,
        prefix: String::new(),
        map: body,
    };

    let http = parse_http(&fields)?;
    let target = match service {
        ServiceKind::Kinesis => parse_kinesis(&fields)?,
        ServiceKind::Sqs => parse_sqs(&fields)?,
        ServiceKind::S3 => parse_s3(&fields)?,
        ServiceKind::Sns => parse_sns(&fields)?,
        ServiceKind::Dynamodb => parse_dynamodb(&fields)?,
        ServiceKind::EventBridge => parse_eventbridge(&fields)?,
    };

    let templates: &[&str] = if service == ServiceKind::S3 {
        &[]
    } else {
        TEMPLATE_FIELDS
    };
    fields.deny_unknown(&[HTTP_FIELDS, service_fields(service), templates])?;

    Ok(ServiceProxy { http, target })
}

fn service_fields(service: ServiceKind) -> &'static [&'static str] {
    match service {
        ServiceKind::Kinesis => &["streamName", "partitionKey", "action"],
        ServiceKind::Sqs => &["queueName", "requestParameters", "acceptParameters"],
        ServiceKind::S3 => &["action", "bucket", "key", "partialContent", "requestParameters"],
        ServiceKind::Sns => &["topicName"],
        ServiceKind::Dynamodb => &["tableName", "action", "hashKey", "rangeKey", "condition"],
        ServiceKind::EventBridge => &["eventBusName", "source", "detailType", "detail"],
    }
}

// --- HTTP side ---

fn parse_http(fields: &Fields<'_>) -> FieldResult<HttpSpec> {
    let path = fields.required_str("path")?;

    let raw_method = fields.required_str("method")?;
    let method = HttpMethod::parse(&raw_method).ok_or_else(|| {
        fields.error(
            "method",
            SchemaErrorKind::InvalidValue {
                value: raw_method.clone(),
                allowed: HttpMethod::ALL.iter().map(|m| m.as_lower()).collect(),
            },
        )
    })?;

    let cors = parse_cors(fields)?;

    fields.exclusive("authorizerId", "authorizationScopes")?;
    let authorizer_id = fields.optional_intrinsic("authorizerId")?;
    let authorization_scopes = fields.optional_string_list("authorizationScopes")?;
    let authorization_type = fields
        .optional_str("authorizationType")?
        .map(|raw| {
            fields.enumerated("authorizationType", &raw, AuthorizationType::parse, || {
                AuthorizationType::ALL.iter().map(|t| t.as_str()).collect()
            })
        })
        .transpose()?;

    if authorizer_id.is_some() && authorization_type != Some(AuthorizationType::Custom) {
        return Err(fields.error(
            "authorizationType",
            SchemaErrorKind::Conditional {
                expected: "CUSTOM",
                because: "authorizerId",
            },
        ));
    }
    if authorization_scopes.is_some()
        && authorization_type != Some(AuthorizationType::CognitoUserPools)
    {
        return Err(fields.error(
            "authorizationType",
            SchemaErrorKind::Conditional {
                expected: "COGNITO_USER_POOLS",
                because: "authorizationScopes",
            },
        ));
    }

    let (request_templates, response_templates) = if fields.service == ServiceKind::S3 {
        (BTreeMap::new(), None)
    } else {
        (parse_request(fields)?, parse_response(fields)?)
    };

    Ok(HttpSpec {
        path,
        method,
        cors,
        authorization_type,
        authorizer_id,
        authorization_scopes,
        private: fields.optional_bool("private")?,
        role_arn: fields.optional_intrinsic("roleArn")?,
        request_templates,
        response_templates,
    })
}

fn parse_cors(fields: &Fields<'_>) -> FieldResult<Option<CorsSetting>> {
    let value = match fields.get("cors") {
        None | Some(Value::Bool(false)) => return Ok(None),
        Some(Value::Bool(true)) => return Ok(Some(CorsSetting::Enabled)),
        Some(value @ Value::Object(_)) => value,
        Some(_) => {
            return Err(fields.error(
                "cors",
                SchemaErrorKind::TypeMismatch {
                    expected: "a boolean or a mapping",
                },
            ))
        }
    };

    let cors = fields.nested("cors", value)?;
    cors.deny_unknown(&[CORS_FIELDS])?;
    cors.exclusive("origin", "origins")?;

    let max_age = cors
        .get("maxAge")
        .map(|v| {
            v.as_u64().filter(|age| *age > 0).ok_or_else(|| {
                cors.error(
                    "maxAge",
                    SchemaErrorKind::TypeMismatch {
                        expected: "a positive integer",
                    },
                )
            })
        })
        .transpose()?;

    Ok(Some(CorsSetting::Custom(CorsConfig {
        origin: cors.optional_str("origin")?,
        origins: cors.optional_string_list("origins")?,
        methods: cors.optional_string_list("methods")?,
        headers: cors.optional_string_list("headers")?,
        allow_credentials: cors.optional_bool("allowCredentials")?,
        max_age,
        cache_control: cors.optional_str("cacheControl")?,
    })))
}

fn parse_request(fields: &Fields<'_>) -> FieldResult<BTreeMap<String, String>> {
    let Some(value) = fields.get("request") else {
        return Ok(BTreeMap::new());
    };
    let request = fields.nested("request", value)?;
    request.deny_unknown(&[TEMPLATE_ONLY])?;
    request.optional_string_map("template")
}

fn parse_response(fields: &Fields<'_>) -> FieldResult<Option<ResponseTemplates>> {
    let Some(value) = fields.get("response") else {
        return Ok(None);
    };
    let response = fields.nested("response", value)?;
    response.deny_unknown(&[TEMPLATE_ONLY])?;

    let Some(template) = response.get("template") else {
        return Ok(Some(ResponseTemplates::default()));
    };
    let template = response.nested("template", template)?;
    template.deny_unknown(&[RESPONSE_TEMPLATE_FIELDS])?;

    Ok(Some(ResponseTemplates {
        success: template.optional_str("success")?,
        client_error: template.optional_str("clientError")?,
        server_error: template.optional_str("serverError")?,
    }))
}

// --- Service side ---

fn parse_kinesis(fields: &Fields<'_>) -> FieldResult<ProxyTarget> {
    let stream_name = fields.resource_name("streamName", RefForm::Ref)?;
    let partition_key = fields
        .get("partitionKey")
        .map(|v| fields.param_source("partitionKey", v, true))
        .transpose()?;
    let action = match fields.optional_str("action")? {
        None => KinesisAction::default(),
        Some(raw) => fields.enumerated(
            "action",
            &raw,
            |s| {
                [KinesisAction::PutRecord, KinesisAction::PutRecords]
                    .into_iter()
                    .find(|a| a.as_str() == s)
            },
            || vec!["PutRecord", "PutRecords"],
        )?,
    };

    Ok(ProxyTarget::Kinesis(KinesisTarget {
        stream_name,
        partition_key,
        action,
    }))
}

fn parse_sqs(fields: &Fields<'_>) -> FieldResult<ProxyTarget> {
    Ok(ProxyTarget::Sqs(SqsTarget {
        queue_name: fields.resource_name("queueName", RefForm::GetAtt("QueueName"))?,
        request_parameters: fields.optional_string_map("requestParameters")?,
        accept_parameters: fields.optional_bool_map("acceptParameters")?,
    }))
}

fn parse_s3(fields: &Fields<'_>) -> FieldResult<ProxyTarget> {
    let raw_action = fields.required_str("action")?;
    let action = fields.enumerated("action", &raw_action, S3Action::parse, || {
        S3Action::ALL.iter().map(|a| a.as_str()).collect()
    })?;
    let bucket = fields.resource_name("bucket", RefForm::Ref)?;

    let key = match fields.required("key")? {
        Value::String(key) => ObjectKey::Static(key.clone()),
        value @ Value::Object(_) => {
            let (_, source, name) = fields.one_of("key", value, KEY_PARAM_KEYS, &[])?;
            if source == "pathParam" {
                ObjectKey::PathParam(name)
            } else {
                ObjectKey::QueryStringParam(name)
            }
        }
        _ => {
            return Err(fields.error(
                "key",
                SchemaErrorKind::TypeMismatch {
                    expected: "a string or a mapping with one of pathParam, queryStringParam",
                },
            ))
        }
    };

    Ok(ProxyTarget::S3(S3Target {
        action,
        bucket,
        key,
        partial_content: fields.optional_bool("partialContent")?,
        request_parameters: fields.optional_string_map("requestParameters")?,
    }))
}

fn parse_sns(fields: &Fields<'_>) -> FieldResult<ProxyTarget> {
    Ok(ProxyTarget::Sns(SnsTarget {
        topic_name: fields.resource_name("topicName", RefForm::GetAtt("TopicName"))?,
    }))
}

fn parse_dynamodb(fields: &Fields<'_>) -> FieldResult<ProxyTarget> {
    let table_name = fields.resource_name("tableName", RefForm::Ref)?;
    let raw_action = fields.required_str("action")?;
    let action = fields.enumerated("action", &raw_action, DynamodbAction::parse, || {
        DynamodbAction::ALL.iter().map(|a| a.as_str()).collect()
    })?;

    let hash_key = fields
        .get("hashKey")
        .map(|v| parse_table_key(fields, "hashKey", v))
        .transpose()?;
    if hash_key.is_none() && action != DynamodbAction::PutItem {
        return Err(fields.error("hashKey", SchemaErrorKind::MissingField));
    }
    let range_key = fields
        .get("rangeKey")
        .map(|v| parse_table_key(fields, "rangeKey", v))
        .transpose()?;

    let condition = fields.optional_str("condition")?;
    if condition.is_some() && action == DynamodbAction::GetItem {
        return Err(fields.error("condition", SchemaErrorKind::UnknownField));
    }

    Ok(ProxyTarget::Dynamodb(DynamodbTarget {
        table_name,
        action,
        hash_key,
        range_key,
        condition,
    }))
}

fn parse_table_key(fields: &Fields<'_>, field: &str, value: &Value) -> FieldResult<TableKey> {
    let (key, source, name) = fields.one_of(field, value, KEY_PARAM_KEYS, &["attributeType"])?;
    let source = if source == "pathParam" {
        KeySource::PathParam(name)
    } else {
        KeySource::QueryStringParam(name)
    };
    Ok(TableKey {
        source,
        attribute_type: key.required_str("attributeType")?,
    })
}

fn parse_eventbridge(fields: &Fields<'_>) -> FieldResult<ProxyTarget> {
    let event_bus_name = fields.resource_name("eventBusName", RefForm::Ref)?;
    let source = fields.param_source("source", fields.required("source")?, true)?;
    let detail_type = fields
        .get("detailType")
        .map(|v| fields.param_source("detailType", v, true))
        .transpose()?;
    let detail = fields
        .get("detail")
        .map(|v| fields.param_source("detail", v, false))
        .transpose()?;

    Ok(ProxyTarget::EventBridge(EventBridgeTarget {
        event_bus_name,
        source,
        detail_type,
        detail,
    }))
}

// --- Field access ---

/// Intrinsic forms accepted for a resource name besides a plain string.
#[derive(Clone, Copy)]
enum RefForm {
    /// `{ Ref: id }`
    Ref,
    /// `{ 'Fn::GetAtt': [id, <attribute>] }` with exactly this attribute.
    GetAtt(&'static str),
}

impl RefForm {
    fn expected(self) -> &'static str {
        match self {
            Self::Ref => "a string or {Ref: <logical id>}",
            Self::GetAtt("QueueName") => "a string or {'Fn::GetAtt': [<logical id>, 'QueueName']}",
            Self::GetAtt("TopicName") => "a string or {'Fn::GetAtt': [<logical id>, 'TopicName']}",
            Self::GetAtt(_) => "a string or {'Fn::GetAtt': [<logical id>, <attribute>]}",
        }
    }
}

/// A mapping being validated, with its position for error reporting.
struct Fields<'a> {
    index: usize,
    service: ServiceKind,
    prefix: String,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn path(&self, field: &str) -> String {
        if self.prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{field}", self.prefix)
        }
    }

    fn error(&self, field: &str, kind: SchemaErrorKind) -> SchemaError {
        SchemaError::new(self.index, Some(self.service), self.path(field), kind)
    }

    fn mismatch(&self, field: &str, expected: &'static str) -> SchemaError {
        self.error(field, SchemaErrorKind::TypeMismatch { expected })
    }

    /// Present, non-null field value.
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    fn required(&self, field: &str) -> FieldResult<&'a Value> {
        self.get(field)
            .ok_or_else(|| self.error(field, SchemaErrorKind::MissingField))
    }

    fn nested(&self, field: &str, value: &'a Value) -> FieldResult<Fields<'a>> {
        let map = value
            .as_object()
            .ok_or_else(|| self.mismatch(field, "a mapping"))?;
        Ok(Fields {
            index: self.index,
            service: self.service,
            prefix: self.path(field),
            map,
        })
    }

    fn required_str(&self, field: &str) -> FieldResult<String> {
        self.required(field)?
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| self.mismatch(field, "a string"))
    }

    fn optional_str(&self, field: &str) -> FieldResult<Option<String>> {
        self.get(field)
            .map(|v| {
                v.as_str()
                    .map(ToString::to_string)
                    .ok_or_else(|| self.mismatch(field, "a string"))
            })
            .transpose()
    }

    /// Absent booleans are `false`.
    fn optional_bool(&self, field: &str) -> FieldResult<bool> {
        self.get(field).map_or(Ok(false), |v| {
            v.as_bool().ok_or_else(|| self.mismatch(field, "a boolean"))
        })
    }

    fn optional_intrinsic(&self, field: &str) -> FieldResult<Option<Value>> {
        match self.get(field) {
            None => Ok(None),
            Some(v @ (Value::String(_) | Value::Object(_))) => Ok(Some(v.clone())),
            Some(_) => Err(self.mismatch(field, INTRINSIC)),
        }
    }

    fn optional_string_list(&self, field: &str) -> FieldResult<Option<Vec<String>>> {
        let Some(value) = self.get(field) else {
            return Ok(None);
        };
        value
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .map(|item| item.as_str().map(ToString::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .map(Some)
            .ok_or_else(|| self.mismatch(field, "a list of strings"))
    }

    fn optional_string_map(&self, field: &str) -> FieldResult<BTreeMap<String, String>> {
        let Some(value) = self.get(field) else {
            return Ok(BTreeMap::new());
        };
        value
            .as_object()
            .and_then(|map| {
                map.iter()
                    .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect::<Option<BTreeMap<_, _>>>()
            })
            .ok_or_else(|| self.mismatch(field, "a mapping of strings to strings"))
    }

    fn optional_bool_map(&self, field: &str) -> FieldResult<BTreeMap<String, bool>> {
        let Some(value) = self.get(field) else {
            return Ok(BTreeMap::new());
        };
        value
            .as_object()
            .and_then(|map| {
                map.iter()
                    .map(|(k, v)| v.as_bool().map(|b| (k.clone(), b)))
                    .collect::<Option<BTreeMap<_, _>>>()
            })
            .ok_or_else(|| self.mismatch(field, "a mapping of strings to booleans"))
    }

    fn enumerated<T>(
        &self,
        field: &str,
        raw: &str,
        parse: impl Fn(&str) -> Option<T>,
        allowed: impl FnOnce() -> Vec<&'static str>,
    ) -> FieldResult<T> {
        parse(raw).ok_or_else(|| {
            self.error(
                field,
                SchemaErrorKind::InvalidValue {
                    value: raw.to_string(),
                    allowed: allowed(),
                },
            )
        })
    }

    /// Reject the mapping when both `a` and `b` are present.
    fn exclusive(&self, a: &str, b: &str) -> FieldResult<()> {
        if self.get(a).is_some() && self.get(b).is_some() {
            return Err(SchemaError::new(
                self.index,
                Some(self.service),
                self.prefix.clone(),
                SchemaErrorKind::MutuallyExclusive {
                    fields: [self.path(a), self.path(b)],
                },
            ));
        }
        Ok(())
    }

    /// Reject the first key not listed in any of `allowed`.
    fn deny_unknown(&self, allowed: &[&[&str]]) -> FieldResult<()> {
        let unknown = self
            .map
            .keys()
            .find(|key| !allowed.iter().any(|set| set.contains(&key.as_str())));
        match unknown {
            Some(key) => Err(self.error(key, SchemaErrorKind::UnknownField)),
            None => Ok(()),
        }
    }

    fn resource_name(&self, field: &str, form: RefForm) -> FieldResult<ResourceName> {
        let value = self.required(field)?;
        let mismatch = || self.mismatch(field, form.expected());

        match value {
            Value::String(name) => Ok(ResourceName::Literal(name.clone())),
            Value::Object(obj) if obj.len() == 1 => match form {
                RefForm::Ref => obj
                    .get("Ref")
                    .and_then(Value::as_str)
                    .map(|id| ResourceName::Ref(id.to_string()))
                    .ok_or_else(mismatch),
                RefForm::GetAtt(attribute) => {
                    let pair = obj
                        .get("Fn::GetAtt")
                        .and_then(Value::as_array)
                        .ok_or_else(mismatch)?;
                    match pair.as_slice() {
                        [Value::String(id), Value::String(attr)] if attr == attribute => {
                            Ok(ResourceName::GetAtt {
                                logical_id: id.clone(),
                                attribute: attr.clone(),
                            })
                        }
                        _ => Err(mismatch()),
                    }
                }
            },
            _ => Err(mismatch()),
        }
    }

    /// Read a mapping that must hold exactly one of `keys` (plus any of `extra`).
    ///
    /// Returns the nested mapping, the key found, and its string value.
    fn one_of(
        &self,
        field: &str,
        value: &'a Value,
        keys: &'static [&'static str],
        extra: &[&str],
    ) -> FieldResult<(Fields<'a>, &'static str, String)> {
        let nested = self.nested(field, value)?;
        nested.deny_unknown(&[keys, extra])?;

        let present: Vec<&'static str> = keys
            .iter()
            .copied()
            .filter(|k| nested.get(k).is_some())
            .collect();

        match present.as_slice() {
            [] => Err(self.error(
                field,
                SchemaErrorKind::MissingOneOf {
                    fields: keys.to_vec(),
                },
            )),
            [key] => {
                let name = nested.required_str(key)?;
                Ok((nested, *key, name))
            }
            [a, b, ..] => Err(nested
                .exclusive(a, b)
                .err()
                .unwrap_or_else(|| self.error(field, SchemaErrorKind::UnknownField))),
        }
    }

    fn param_source(
        &self,
        field: &str,
        value: &'a Value,
        allow_literal: bool,
    ) -> FieldResult<ParamSource> {
        match value {
            Value::String(literal) if allow_literal => Ok(ParamSource::Literal(literal.clone())),
            Value::Object(_) => {
                let (_, key, name) = self.one_of(field, value, PARAM_KEYS, &[])?;
                Ok(match key {
                    "pathParam" => ParamSource::PathParam(name),
                    "queryStringParam" => ParamSource::QueryStringParam(name),
                    _ => ParamSource::BodyParam(name),
                })
            }
            _ if allow_literal => Err(self.mismatch(
                field,
                "a string or a mapping with one of pathParam, queryStringParam, bodyParam",
            )),
            _ => Err(self.mismatch(
                field,
                "a mapping with one of pathParam, queryStringParam, bodyParam",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn first_error(descriptor: Value) -> SchemaError {
        parse(&[descriptor])
            .expect_err("descriptor should be rejected")
            .first()
            .clone()
    }

    #[test]
    fn accepts_minimal_kinesis_proxy() {
        let proxies = parse(&[json!({
            "kinesis": { "path": "/kinesis", "method": "POST", "streamName": "stream" }
        })])
        .unwrap();

        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].service(), ServiceKind::Kinesis);
        assert_eq!(proxies[0].http.method, HttpMethod::Post);
        let ProxyTarget::Kinesis(target) = &proxies[0].target else {
            panic!("expected kinesis target");
        };
        assert_eq!(target.stream_name, ResourceName::Literal("stream".into()));
        assert_eq!(target.action, KinesisAction::PutRecord);
    }

    #[test]
    fn rejects_unknown_service_tag() {
        let err = first_error(json!({ "lambda": { "path": "x", "method": "post" } }));
        assert_eq!(
            err.kind,
            SchemaErrorKind::UnsupportedProxy {
                tag: "lambda".into()
            }
        );
        assert!(err.to_string().contains("kinesis, sqs, s3, sns, dynamodb, eventbridge"));
    }

    #[test]
    fn rejects_two_service_tags() {
        let err = first_error(json!({
            "sqs": { "path": "a", "method": "post", "queueName": "q" },
            "sns": { "path": "b", "method": "post", "topicName": "t" }
        }));
        assert!(matches!(err.kind, SchemaErrorKind::MultipleServices { ref tags } if tags.len() == 2));
    }

    #[test]
    fn rejects_empty_descriptor() {
        assert_eq!(first_error(json!({})).kind, SchemaErrorKind::NoService);
        assert_eq!(first_error(json!("sqs")).kind, SchemaErrorKind::NotAnObject);
    }

    #[test]
    fn rejects_same_route_on_two_descriptors() {
        let err = parse(&[
            json!({ "sqs": { "path": "/q", "method": "post", "queueName": "q" } }),
            json!({ "sns": { "path": "q", "method": "POST", "topicName": "t" } }),
        ])
        .expect_err("duplicate route should be rejected");

        assert_eq!(err.errors().len(), 1);
        let err = err.first();
        assert_eq!(err.index, 1);
        assert_eq!(err.service, Some(ServiceKind::Sns));
        assert_eq!(
            err.kind,
            SchemaErrorKind::DuplicateRoute {
                first: 0,
                path: "q".into(),
                method: "POST"
            }
        );
        assert_eq!(
            err.to_string(),
            "service proxy #1 (\"sns\"): POST /q is already bound by service proxy #0"
        );
    }

    #[test]
    fn same_path_with_other_method_is_fine() {
        let proxies = parse(&[
            json!({ "sqs": { "path": "/q", "method": "post", "queueName": "q" } }),
            json!({ "sns": { "path": "q", "method": "put", "topicName": "t" } }),
        ])
        .unwrap();
        assert_eq!(proxies.len(), 2);
    }

    #[test]
    fn rejects_cors_on_options_method() {
        let err = first_error(json!({
            "sqs": { "path": "/q", "method": "options", "queueName": "q", "cors": true }
        }));
        assert_eq!(err.path, "cors");
        assert_eq!(
            err.kind,
            SchemaErrorKind::PreflightConflict {
                cors_index: 0,
                path: "q".into()
            }
        );
    }

    #[test]
    fn rejects_options_method_beside_cors_preflight() {
        let err = parse(&[
            json!({ "sqs": { "path": "q", "method": "post", "queueName": "q", "cors": true } }),
            json!({ "sns": { "path": "/q/", "method": "options", "topicName": "t" } }),
        ])
        .expect_err("options method should collide with the preflight")
        .first()
        .clone();

        assert_eq!(err.index, 1);
        assert_eq!(err.path, "method");
        assert_eq!(
            err.kind,
            SchemaErrorKind::PreflightConflict {
                cors_index: 0,
                path: "q".into()
            }
        );
    }

    #[test]
    fn options_method_without_cors_is_fine() {
        assert!(parse(&[json!({
            "sqs": { "path": "q", "method": "options", "queueName": "q" }
        })])
        .is_ok());
    }

    #[test]
    fn rejects_s3_key_with_both_sources() {
        let err = first_error(json!({
            "s3": {
                "path": "s3", "method": "get", "action": "GetObject", "bucket": "b",
                "key": { "pathParam": "k", "queryStringParam": "k" }
            }
        }));
        assert_eq!(err.service, Some(ServiceKind::S3));
        assert_eq!(
            err.kind,
            SchemaErrorKind::MutuallyExclusive {
                fields: ["key.pathParam".into(), "key.queryStringParam".into()]
            }
        );
        let message = err.to_string();
        assert!(message.contains("key.pathParam"));
        assert!(message.contains("key.queryStringParam"));
    }

    #[test]
    fn rejects_s3_key_without_source() {
        let err = first_error(json!({
            "s3": { "path": "s3", "method": "get", "action": "GetObject", "bucket": "b", "key": {} }
        }));
        assert_eq!(err.path, "key");
        assert!(matches!(err.kind, SchemaErrorKind::MissingOneOf { .. }));
    }

    #[test]
    fn rejects_invalid_s3_action() {
        let err = first_error(json!({
            "s3": { "path": "s3", "method": "get", "action": "ListBucket", "bucket": "b", "key": "k" }
        }));
        assert_eq!(err.path, "action");
        assert_eq!(
            err.kind,
            SchemaErrorKind::InvalidValue {
                value: "ListBucket".into(),
                allowed: vec!["GetObject", "PutObject", "DeleteObject"],
            }
        );
    }

    #[test]
    fn rejects_cors_origin_and_origins() {
        let err = first_error(json!({
            "sqs": {
                "path": "sqs", "method": "post", "queueName": "q",
                "cors": { "origin": "*", "origins": ["*"] }
            }
        }));
        let message = err.to_string();
        assert!(message.contains("cors.origin\""), "{message}");
        assert!(message.contains("cors.origins\""), "{message}");
    }

    #[test]
    fn rejects_non_positive_max_age() {
        let err = first_error(json!({
            "sqs": { "path": "sqs", "method": "post", "queueName": "q", "cors": { "maxAge": 0 } }
        }));
        assert_eq!(err.path, "cors.maxAge");
    }

    #[test]
    fn topic_name_get_att_must_name_topic_name() {
        let ok = parse(&[json!({
            "sns": { "path": "sns", "method": "post", "topicName": { "Fn::GetAtt": ["MyTopic", "TopicName"] } }
        })]);
        assert!(ok.is_ok());

        let err = first_error(json!({
            "sns": { "path": "sns", "method": "post", "topicName": { "Fn::GetAtt": ["MyTopic", "Arn"] } }
        }));
        assert_eq!(err.path, "topicName");
        assert!(matches!(err.kind, SchemaErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn stream_name_accepts_ref_only() {
        let err = first_error(json!({
            "kinesis": { "path": "k", "method": "post", "streamName": { "Fn::GetAtt": ["S", "Arn"] } }
        }));
        assert_eq!(err.path, "streamName");

        let err = first_error(json!({ "kinesis": { "path": "k", "method": "post" } }));
        assert_eq!(err.kind, SchemaErrorKind::MissingField);
        assert_eq!(err.to_string(), "service proxy #0 (\"kinesis\"): \"streamName\" is required");
    }

    #[test]
    fn partition_key_rejects_two_sources() {
        let err = first_error(json!({
            "kinesis": {
                "path": "k", "method": "post", "streamName": "s",
                "partitionKey": { "pathParam": "a", "bodyParam": "b" }
            }
        }));
        assert!(matches!(err.kind, SchemaErrorKind::MutuallyExclusive { .. }));
    }

    #[test]
    fn authorizer_id_requires_custom_type() {
        let err = first_error(json!({
            "sqs": { "path": "sqs", "method": "post", "queueName": "q", "authorizerId": "abc" }
        }));
        assert_eq!(
            err.kind,
            SchemaErrorKind::Conditional {
                expected: "CUSTOM",
                because: "authorizerId"
            }
        );

        let ok = parse(&[json!({
            "sqs": {
                "path": "sqs", "method": "post", "queueName": "q",
                "authorizationType": "CUSTOM", "authorizerId": { "Ref": "Authorizer" }
            }
        })]);
        assert!(ok.is_ok());
    }

    #[test]
    fn authorizer_id_and_scopes_are_exclusive() {
        let err = first_error(json!({
            "sqs": {
                "path": "sqs", "method": "post", "queueName": "q",
                "authorizationType": "CUSTOM", "authorizerId": "abc",
                "authorizationScopes": ["admin"]
            }
        }));
        assert!(matches!(err.kind, SchemaErrorKind::MutuallyExclusive { .. }));
    }

    #[test]
    fn rejects_unknown_fields_and_s3_templates() {
        let err = first_error(json!({
            "sqs": { "path": "sqs", "method": "post", "queueName": "q", "bucket": "b" }
        }));
        assert_eq!(err.kind, SchemaErrorKind::UnknownField);
        assert_eq!(err.path, "bucket");

        let err = first_error(json!({
            "s3": {
                "path": "s3", "method": "get", "action": "GetObject", "bucket": "b", "key": "k",
                "request": { "template": { "application/json": "{}" } }
            }
        }));
        assert_eq!(err.path, "request");
    }

    #[test]
    fn dynamodb_reads_require_hash_key() {
        let err = first_error(json!({
            "dynamodb": { "path": "d", "method": "get", "tableName": "t", "action": "GetItem" }
        }));
        assert_eq!(err.path, "hashKey");

        let err = first_error(json!({
            "dynamodb": {
                "path": "d", "method": "get", "tableName": "t", "action": "GetItem",
                "hashKey": { "pathParam": "id" }
            }
        }));
        assert_eq!(err.path, "hashKey.attributeType");
    }

    #[test]
    fn eventbridge_detail_rejects_literal() {
        let err = first_error(json!({
            "eventbridge": {
                "path": "e", "method": "post", "eventBusName": "bus", "source": "app",
                "detail": "static"
            }
        }));
        assert_eq!(err.path, "detail");
    }

    #[test]
    fn aggregates_errors_across_descriptors() {
        let err = parse(&[
            json!({ "kinesis": { "path": "k", "method": "post" } }),
            json!({ "sqs": { "path": "s", "method": "post", "queueName": "q" } }),
            json!({ "sns": { "path": "t", "method": "teleport", "topicName": "t" } }),
        ])
        .unwrap_err();

        assert_eq!(err.errors().len(), 2);
        assert_eq!(err.errors()[0].index, 0);
        assert_eq!(err.errors()[1].index, 2);
        assert_eq!(err.to_string(), err.errors()[0].to_string());
    }
}
